//! Symbol interning for identifiers, library URIs and type names.
//!
//! All names flowing through the checker are interned once and compared by
//! id afterwards, which keeps `ElementLocation` keys and type lookups cheap.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{OnceLock, RwLock};

/// Interned string handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol(u32);

impl Symbol {
    /// Intern a string, returning the canonical symbol for it.
    pub fn intern(text: &str) -> Self {
        interner().intern(text)
    }

    /// The interned text. Symbols live for the whole process.
    pub fn as_str(self) -> &'static str {
        interner().resolve(self)
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Symbol {
    fn from(text: &str) -> Self {
        Symbol::intern(text)
    }
}

struct Interner {
    // Interned strings are leaked: a symbol's text must stay valid for the
    // process lifetime because `as_str` hands out `'static` references.
    table: RwLock<InternerTable>,
}

#[derive(Default)]
struct InternerTable {
    strings: Vec<&'static str>,
    ids: HashMap<&'static str, u32>,
}

impl Interner {
    fn intern(&self, text: &str) -> Symbol {
        if let Some(&id) = self.table.read().unwrap().ids.get(text) {
            return Symbol(id);
        }
        let mut table = self.table.write().unwrap();
        // Re-check under the write lock; another thread may have won the race.
        if let Some(&id) = table.ids.get(text) {
            return Symbol(id);
        }
        let leaked: &'static str = Box::leak(text.to_owned().into_boxed_str());
        let id = table.strings.len() as u32;
        table.strings.push(leaked);
        table.ids.insert(leaked, id);
        Symbol(id)
    }

    fn resolve(&self, symbol: Symbol) -> &'static str {
        self.table.read().unwrap().strings[symbol.0 as usize]
    }
}

fn interner() -> &'static Interner {
    static INTERNER: OnceLock<Interner> = OnceLock::new();
    INTERNER.get_or_init(|| Interner {
        table: RwLock::new(InternerTable::default()),
    })
}

/// Well-known names used throughout the checker.
pub mod well_known {
    use super::Symbol;
    use std::sync::OnceLock;

    macro_rules! known_symbols {
        ($($name:ident => $text:literal),* $(,)?) => {
            $(
                pub fn $name() -> Symbol {
                    static CACHE: OnceLock<Symbol> = OnceLock::new();
                    *CACHE.get_or_init(|| Symbol::intern($text))
                }
            )*
        };
    }

    known_symbols! {
        object => "Object",
        exception => "Exception",
        error => "Error",
        future => "Future",
        future_or => "FutureOr",
        call => "call",
        new_ctor => "new",
        type_error => "TypeError",
        no_such_method_error => "NoSuchMethodError",
        state_error => "StateError",
        format_exception => "FormatException",
        core_library => "dart:core",
        async_library => "dart:async",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_stable() {
        let a = Symbol::intern("configuration");
        let b = Symbol::intern("configuration");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "configuration");
    }

    #[test]
    fn distinct_strings_get_distinct_symbols() {
        assert_ne!(Symbol::intern("invoke"), Symbol::intern("await"));
    }

    #[test]
    fn well_known_names_resolve() {
        assert_eq!(well_known::exception().as_str(), "Exception");
        assert_eq!(well_known::new_ctor().as_str(), "new");
    }
}
