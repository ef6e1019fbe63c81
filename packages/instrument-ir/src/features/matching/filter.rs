//! Coarse include filter over method bodies
//!
//! Whitespace-separated tokens: a bare qualified class name (exact match),
//! `prefix*` (class-name prefix), or a signature-shaped method token.
//! `name()` matches only zero-parameter methods, `name(int,...)` the exact
//! parameter-type list; the name part matches either a bare method name or
//! `declaringClass.methodName`. A body matches if any token matches.

use rustc_hash::FxHashSet;

use crate::errors::{InstrumentError, Result};
use crate::shared::models::{Body, MethodRef, Type};

#[derive(Debug, Clone, PartialEq, Eq)]
struct MethodToken {
    /// Bare method name, or `declaringClass.methodName`
    name: String,
    /// Parameter-type display names; empty means zero parameters
    params: Vec<String>,
}

/// Filter-mode matcher, built once per pass from the `filter` option
#[derive(Debug, Clone, Default)]
pub struct Filter {
    prefixes: Vec<String>,
    classes: FxHashSet<String>,
    methods: Vec<MethodToken>,
}

impl Filter {
    /// Parse a filter spec. Malformed tokens are fatal.
    pub fn parse(spec: &str) -> Result<Self> {
        let mut filter = Filter::default();
        for token in spec.split_whitespace() {
            if let Some(open) = token.find('(') {
                let inner = token[open + 1..].strip_suffix(')').ok_or_else(|| {
                    InstrumentError::config(format!("unterminated method token {:?}", token))
                })?;
                let params = if inner.is_empty() {
                    Vec::new()
                } else {
                    inner.split(',').map(|ty| ty.trim().to_string()).collect()
                };
                filter.methods.push(MethodToken {
                    name: token[..open].to_string(),
                    params,
                });
            } else if let Some(prefix) = token.strip_suffix('*') {
                filter.prefixes.push(prefix.to_string());
            } else {
                filter.classes.insert(token.to_string());
            }
        }
        Ok(filter)
    }

    pub fn matches_body(&self, body: &Body) -> bool {
        self.matches(&body.method)
    }

    pub fn matches(&self, method: &MethodRef) -> bool {
        if self.classes.contains(&method.class) {
            return true;
        }
        if self
            .prefixes
            .iter()
            .any(|prefix| method.class.starts_with(prefix.as_str()))
        {
            return true;
        }
        let qualified = format!("{}.{}", method.class, method.name);
        let param_names: Vec<String> = method.params.iter().map(Type::name).collect();
        self.methods.iter().any(|token| {
            (token.name == method.name || token.name == qualified) && token.params == param_names
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(class: &str, name: &str, params: Vec<Type>) -> MethodRef {
        MethodRef {
            class: class.into(),
            name: name.into(),
            params,
            ret: Type::Void,
            is_static: false,
        }
    }

    #[test]
    fn test_exact_class_matches_any_method() {
        let filter = Filter::parse("com.example.Foo com.example.Bar.baz()").unwrap();
        assert!(filter.matches(&descriptor("com.example.Foo", "anything", vec![Type::Int])));
        assert!(!filter.matches(&descriptor("com.example.Other", "anything", vec![])));
    }

    #[test]
    fn test_method_token_is_arity_sensitive() {
        let filter = Filter::parse("com.example.Foo com.example.Bar.baz()").unwrap();
        assert!(filter.matches(&descriptor("com.example.Bar", "baz", vec![])));
        assert!(!filter.matches(&descriptor("com.example.Bar", "baz", vec![Type::Int])));
    }

    #[test]
    fn test_bare_method_token_ignores_class() {
        let filter = Filter::parse("baz(int)").unwrap();
        assert!(filter.matches(&descriptor("a.B", "baz", vec![Type::Int])));
        assert!(filter.matches(&descriptor("c.D", "baz", vec![Type::Int])));
        assert!(!filter.matches(&descriptor("a.B", "baz", vec![Type::Long])));
    }

    #[test]
    fn test_prefix_token() {
        let filter = Filter::parse("com.example.*").unwrap();
        assert!(filter.matches(&descriptor("com.example.deep.Cls", "m", vec![])));
        assert!(!filter.matches(&descriptor("org.other.Cls", "m", vec![])));
    }

    #[test]
    fn test_unterminated_token_is_fatal() {
        assert!(Filter::parse("baz(int").is_err());
    }
}
