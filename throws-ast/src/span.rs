//! Source positions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a compilation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(u32);

impl FileId {
    pub const INVALID: FileId = FileId(u32::MAX);

    pub fn new(id: u32) -> Self {
        FileId(id)
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }
}

/// A byte range inside one compilation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub file: FileId,
    pub start: u32,
    pub len: u32,
}

impl Span {
    pub fn new(file: FileId, start: u32, len: u32) -> Self {
        Span { file, start, len }
    }

    /// A span carrying no real position, for synthetic elements.
    pub fn synthetic() -> Self {
        Span::new(FileId::INVALID, 0, 0)
    }

    pub fn end(&self) -> u32 {
        self.start + self.len
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_end() {
        let span = Span::new(FileId::new(0), 10, 5);
        assert_eq!(span.end(), 15);
        assert_eq!(span.to_string(), "10..15");
    }
}
