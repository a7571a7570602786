//! The value that crosses the process boundary.
//!
//! A [`CommandContext`] is flat and owns only JSON values: positional
//! arguments in order, plus a flag map. It is built field by field from
//! what the front end parsed, never by copying "the whole command object
//! minus some keys".

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::error::DomainError;

/// Flags whose name starts with this prefix are internal and never forwarded.
pub const PRIVATE_PREFIX: char = '_';

/// Invocation context handed to a dispatched package.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandContext {
    pub positional_arguments: Vec<String>,
    pub flags: BTreeMap<String, Value>,
}

impl CommandContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_argument(mut self, arg: impl Into<String>) -> Self {
        self.positional_arguments.push(arg.into());
        self
    }

    /// Add a flag. Private names are dropped.
    pub fn with_flag(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_flag(name, value);
        self
    }

    pub fn set_flag(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        if is_private(&name) {
            return;
        }
        self.flags.insert(name, value.into());
    }

    /// Build from a split invocation: positional values plus an options
    /// record. Non-string positional scalars are rendered as text.
    pub fn from_parts(
        arguments: &[Value],
        options: &Map<String, Value>,
    ) -> Result<Self, DomainError> {
        let mut ctx = Self::new();
        for arg in arguments {
            let text = match arg {
                Value::String(s) => s.clone(),
                Value::Number(_) | Value::Bool(_) => arg.to_string(),
                Value::Null => continue,
                Value::Array(_) | Value::Object(_) => {
                    return Err(DomainError::InvalidInvocation(format!(
                        "positional arguments must be scalars, got {arg}"
                    )));
                }
            };
            ctx.positional_arguments.push(text);
        }
        for (name, value) in options {
            ctx.set_flag(name.clone(), value.clone());
        }
        Ok(ctx)
    }

    /// Serialize for the child process.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

fn is_private(name: &str) -> bool {
    name.is_empty() || name.starts_with(PRIVATE_PREFIX)
}

/// Split trailing command-line words into positional arguments and flags.
///
/// `--key=value` and `--key value` carry a string; a bare `--flag` or `-f`
/// is `true`; `--no-flag` is `false`; everything after `--` is positional.
pub fn parse_trailing_args(args: &[String]) -> (Vec<Value>, Map<String, Value>) {
    let mut positional = Vec::new();
    let mut flags = Map::new();
    let mut iter = args.iter().peekable();
    let mut only_positional = false;

    while let Some(arg) = iter.next() {
        if only_positional {
            positional.push(Value::String(arg.clone()));
            continue;
        }
        if arg == "--" {
            only_positional = true;
            continue;
        }
        if let Some(long) = arg.strip_prefix("--") {
            if let Some((name, value)) = long.split_once('=') {
                flags.insert(name.to_string(), Value::String(value.to_string()));
            } else if let Some(name) = long.strip_prefix("no-") {
                flags.insert(name.to_string(), Value::Bool(false));
            } else if let Some(value) = iter.next_if(|next| !next.starts_with('-')) {
                flags.insert(long.to_string(), Value::String(value.clone()));
            } else {
                flags.insert(long.to_string(), Value::Bool(true));
            }
        } else if let Some(short) = arg.strip_prefix('-').filter(|s| !s.is_empty()) {
            for c in short.chars() {
                flags.insert(c.to_string(), Value::Bool(true));
            }
        } else {
            positional.push(Value::String(arg.clone()));
        }
    }

    (positional, flags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_to_camel_case_wire_shape() {
        let ctx = CommandContext::new()
            .with_argument("my-app")
            .with_flag("force", true);
        let value: Value = serde_json::from_str(&ctx.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({ "positionalArguments": ["my-app"], "flags": { "force": true } })
        );
    }

    #[test]
    fn private_flags_are_not_forwarded() {
        let ctx = CommandContext::new()
            .with_flag("_parent", "registry")
            .with_flag("force", true);
        assert_eq!(ctx.flags.len(), 1);
        assert!(ctx.flags.contains_key("force"));
    }

    #[test]
    fn from_parts_renders_scalars_and_rejects_nested() {
        let mut opts = Map::new();
        opts.insert("_cmd".into(), json!("internal"));
        opts.insert("template".into(), json!("react"));

        let arguments = [json!("app"), json!(3), Value::Null];
        let ctx = CommandContext::from_parts(&arguments, &opts).unwrap();
        assert_eq!(ctx.positional_arguments, vec!["app", "3"]);
        assert_eq!(ctx.flags.get("template"), Some(&json!("react")));
        assert!(!ctx.flags.contains_key("_cmd"));

        assert!(CommandContext::from_parts(&[json!(["nested"])], &Map::new()).is_err());
    }

    #[test]
    fn trailing_args_split() {
        let args: Vec<String> = [
            "site",
            "--env",
            "prod",
            "--dry-run",
            "--level=3",
            "-y",
            "--no-cache",
            "--",
            "--raw",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let (positional, flags) = parse_trailing_args(&args);

        assert_eq!(positional, vec![json!("site"), json!("--raw")]);
        assert_eq!(flags.get("env"), Some(&json!("prod")));
        assert_eq!(flags.get("dry-run"), Some(&json!(true)));
        assert_eq!(flags.get("level"), Some(&json!("3")));
        assert_eq!(flags.get("y"), Some(&json!(true)));
        assert_eq!(flags.get("cache"), Some(&json!(false)));
    }
}
