//! Method-table directives
//!
//! Immutable match-token → payload entries resolved against a method
//! descriptor by walking the declaring class toward the root of its
//! hierarchy. At each class, in priority order: class-name prefix entries,
//! exact `Class:methodName`, exact `Class:methodName(type,...)` signature
//! (parameter types only), then the `Class:*` wildcard. First match at the
//! nearest ancestor wins; an exhausted hierarchy is a normal "no match".

use rustc_hash::FxHashMap;

use crate::config::Config;
use crate::errors::{InstrumentError, Result};
use crate::shared::models::{MethodRef, Program, Type};

/// Directive table for method-table mode matching
#[derive(Debug, Clone, Default)]
pub struct MethodDirectives {
    by_class: FxHashMap<String, FxHashMap<String, String>>,
    prefixes: Vec<(String, String)>,
}

impl MethodDirectives {
    pub fn new() -> Self {
        MethodDirectives::default()
    }

    /// Build from a whitespace-separated spec; every token maps to the one
    /// shared payload. Tokens without `:` that are not `prefix*` entries are
    /// unparseable and fatal.
    pub fn from_spec(spec: &str, payload: &str) -> Result<Self> {
        let mut directives = MethodDirectives::new();
        for token in spec.split_whitespace() {
            directives.add(token, payload)?;
        }
        Ok(directives)
    }

    /// Build from a configuration namespace: every key `<prefix><token>`
    /// maps to its own payload. Keys naming reserved pass options are
    /// skipped; any other token without `:` is fatal.
    pub fn from_config(config: &Config, prefix: &str, reserved: &[&str]) -> Result<Self> {
        let mut directives = MethodDirectives::new();
        for (token, payload) in config.with_prefix(prefix) {
            if reserved.contains(&token) {
                continue;
            }
            directives.add(token, payload)?;
        }
        Ok(directives)
    }

    /// Insert one entry; used by built-in tables.
    pub fn add(&mut self, token: &str, payload: &str) -> Result<()> {
        match token.split_once(':') {
            Some((class, method)) => {
                self.by_class
                    .entry(class.trim().to_string())
                    .or_default()
                    .insert(method.trim().to_string(), payload.to_string());
            }
            None => {
                let Some(prefix) = token.strip_suffix('*') else {
                    return Err(InstrumentError::config(format!(
                        "malformed method directive token {:?}",
                        token
                    )));
                };
                self.prefixes.push((prefix.to_string(), payload.to_string()));
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.by_class.is_empty() && self.prefixes.is_empty()
    }

    /// Payloads of all entries, for eager template compilation.
    pub fn payloads(&self) -> impl Iterator<Item = &str> {
        self.by_class
            .values()
            .flat_map(|entries| entries.values())
            .chain(self.prefixes.iter().map(|(_, payload)| payload))
            .map(String::as_str)
    }

    /// Resolve a callee reference. `None` is a normal outcome.
    pub fn resolve<'a>(&'a self, program: &Program, callee: &MethodRef) -> Option<&'a str> {
        self.resolve_parts(program, &callee.class, &callee.name, &callee.params)
    }

    pub fn resolve_parts<'a>(
        &'a self,
        program: &Program,
        class: &str,
        name: &str,
        params: &[Type],
    ) -> Option<&'a str> {
        for ancestor in program.ancestors(class) {
            for (prefix, payload) in &self.prefixes {
                if ancestor.starts_with(prefix.as_str()) {
                    return Some(payload);
                }
            }
            if let Some(entries) = self.by_class.get(ancestor) {
                if let Some(payload) = entries.get(name) {
                    return Some(payload);
                }
                let signature = format!(
                    "{}({})",
                    name,
                    params.iter().map(Type::name).collect::<Vec<_>>().join(",")
                );
                if let Some(payload) = entries.get(&signature) {
                    return Some(payload);
                }
                if let Some(payload) = entries.get("*") {
                    return Some(payload);
                }
            }
        }
        None
    }
}
