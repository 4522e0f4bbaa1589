//! External override tables.
//!
//! Override files assign configurations to elements the user cannot
//! annotate (SDK and third-party code). The resolver consults this table
//! before anything else. Files load lowest-precedence first: the packaged
//! defaults, then each package's `checked_exceptions.yaml`, then the
//! project's `lib/checked_exceptions.yaml`; later entries replace earlier
//! ones for the same element.

use crate::configuration::{Configuration, PromotionKind};
use crate::throws::Throws;
use anyhow::Context as _;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use throws_ast::{ElementLocation, Program, Symbol, TypeId};
use tracing::{debug, warn};

const PACKAGED_DEFAULTS: &str = include_str!("../defaults/checked_exceptions.yaml");

#[derive(Debug, Error)]
pub enum OverrideError {
    #[error("failed to parse override file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("unknown type `{0}` in override entry")]
    UnknownType(String),
    #[error("malformed type expression `{0}`")]
    MalformedType(String),
}

#[derive(Debug, Deserialize)]
struct OverrideDocument {
    checked_exceptions: Vec<OverrideRecord>,
}

#[derive(Debug, Deserialize)]
struct OverrideRecord {
    library: String,
    element: String,
    #[serde(default)]
    imports: Vec<String>,
    #[serde(flatten)]
    config: OverrideConfig,
}

#[derive(Debug, Deserialize, Default)]
struct OverrideConfig {
    #[serde(default)]
    throws: Vec<String>,
    #[serde(default)]
    allows_undeclared: Option<bool>,
    #[serde(default)]
    invoke: Option<Box<OverrideConfig>>,
    #[serde(default, rename = "await")]
    awaited: Option<Box<OverrideConfig>>,
}

/// Configurations indexed by element location.
#[derive(Debug, Default)]
pub struct OverrideTable {
    entries: HashMap<ElementLocation, Configuration>,
}

impl OverrideTable {
    pub fn new() -> Self {
        OverrideTable::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lookup(&self, location: &ElementLocation) -> Option<&Configuration> {
        self.entries.get(location)
    }

    pub fn insert(&mut self, location: ElementLocation, configuration: Configuration) {
        self.entries.insert(location, configuration);
    }

    /// Load one override file. A YAML-level failure rejects the whole file;
    /// a record whose type expressions cannot be resolved is skipped alone.
    /// Returns how many records were stored.
    pub fn load_str(
        &mut self,
        source: &str,
        program: &mut Program,
    ) -> Result<usize, OverrideError> {
        let document: OverrideDocument = serde_yaml::from_str(source)?;
        let mut stored = 0;
        for record in &document.checked_exceptions {
            let mut scope: Vec<Symbol> =
                record.imports.iter().map(|uri| Symbol::intern(uri)).collect();
            scope.push(Symbol::intern(&record.library));
            match record_configuration(&record.config, &scope, program) {
                Ok(configuration) => {
                    let location = ElementLocation::parse(&record.library, &record.element);
                    self.entries.insert(location, configuration);
                    stored += 1;
                }
                Err(error) => {
                    warn!(
                        library = %record.library,
                        element = %record.element,
                        %error,
                        "skipping unresolvable override record"
                    );
                }
            }
        }
        Ok(stored)
    }

    /// Load several files in precedence order, lowest first. A malformed
    /// file is skipped whole; the others still load.
    pub fn load_layers(&mut self, layers: &[&str], program: &mut Program) -> usize {
        let mut stored = 0;
        for (index, layer) in layers.iter().enumerate() {
            match self.load_str(layer, program) {
                Ok(count) => stored += count,
                Err(error) => warn!(layer = index, %error, "skipping malformed override file"),
            }
        }
        stored
    }

    /// Read and load one override file from disk. Malformed content is
    /// skipped with a warning like any other layer; an unreadable file is
    /// an error for the caller.
    pub fn load_file(&mut self, path: &Path, program: &mut Program) -> anyhow::Result<usize> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading override file {}", path.display()))?;
        match self.load_str(&text, program) {
            Ok(stored) => Ok(stored),
            Err(error) => {
                warn!(path = %path.display(), %error, "skipping malformed override file");
                Ok(0)
            }
        }
    }

    /// Load the project's own overrides from `lib/checked_exceptions.yaml`
    /// under `root`, the highest-precedence layer. Absent file means no
    /// overrides.
    pub fn load_project(&mut self, root: &Path, program: &mut Program) -> anyhow::Result<usize> {
        let path = root.join("lib").join("checked_exceptions.yaml");
        if !path.exists() {
            return Ok(0);
        }
        self.load_file(&path, program)
    }

    /// The defaults shipped with the checker, covering the host core
    /// libraries. Entries whose types the program does not know are skipped.
    pub fn load_packaged_defaults(&mut self, program: &mut Program) {
        match self.load_str(PACKAGED_DEFAULTS, program) {
            Ok(count) => debug!(count, "loaded packaged override defaults"),
            Err(error) => warn!(%error, "packaged override defaults failed to load"),
        }
    }
}

fn record_configuration(
    config: &OverrideConfig,
    scope: &[Symbol],
    program: &mut Program,
) -> Result<Configuration, OverrideError> {
    let mut throws = Throws::explicit(config.allows_undeclared.unwrap_or(false));
    for expr in &config.throws {
        let ty = parse_type_expr(expr, scope, program)?;
        throws.insert(ty, program);
    }
    let mut value = std::collections::BTreeMap::new();
    if let Some(invoke) = &config.invoke {
        value.insert(PromotionKind::Invoke, record_configuration(invoke, scope, program)?);
    }
    if let Some(awaited) = &config.awaited {
        value.insert(PromotionKind::Await, record_configuration(awaited, scope, program)?);
    }
    Ok(Configuration { throws, value })
}

/// Parse a throws-type expression (`Name`, `Name<Args>`, optional `?`
/// suffix) and resolve it against the record's import scope.
fn parse_type_expr(
    text: &str,
    scope: &[Symbol],
    program: &mut Program,
) -> Result<TypeId, OverrideError> {
    let text = text.trim();
    let (base, nullable) = match text.strip_suffix('?') {
        Some(stripped) => (stripped.trim_end(), true),
        None => (text, false),
    };

    let (name, args) = match base.find('<') {
        Some(open) => {
            if !base.ends_with('>') {
                return Err(OverrideError::MalformedType(text.to_string()));
            }
            let inner = &base[open + 1..base.len() - 1];
            let args = split_type_args(inner)
                .into_iter()
                .map(|arg| parse_type_expr(arg, scope, program))
                .collect::<Result<Vec<_>, _>>()?;
            (base[..open].trim(), args)
        }
        None => (base, Vec::new()),
    };

    if name == "dynamic" {
        return Ok(program.types.dynamic());
    }

    let name_symbol = Symbol::intern(name);
    for &uri in scope {
        if let Some(class) = program.class_named(uri, name_symbol) {
            let ty = program.types.interface(class, args);
            return Ok(if nullable { program.types.nullable(ty) } else { ty });
        }
    }
    Err(OverrideError::UnknownType(name.to_string()))
}

/// Split generic arguments on top-level commas.
fn split_type_args(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}
