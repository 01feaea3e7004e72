// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Conversion of free-form task params to CLI arguments.

use indexmap::IndexMap;
use serde_yaml::Value;

/// Convert a params map to CLI argument strings.
///
/// Keys become `--kebab-case` flags. Booleans are bare flags (emitted only
/// when true), sequences repeat the flag per element, and everything else
/// is a single `--flag value` pair with the value shell-quoted.
pub fn params_as_cli_args(params: &IndexMap<String, Value>) -> Vec<String> {
    let mut args = Vec::new();
    for (key, value) in params {
        let flag = format!("--{}", key.replace('_', "-"));
        match value {
            Value::Bool(true) => args.push(flag),
            Value::Bool(false) => {}
            Value::Sequence(items) => {
                for item in items {
                    args.push(format!("{flag} {}", quote_value(item)));
                }
            }
            other => args.push(format!("{flag} {}", quote_value(other))),
        }
    }
    args
}

fn quote_value(value: &Value) -> String {
    match value {
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::String(s) => shell_quote(s),
        Value::Null => String::new(),
        other => shell_quote(&serde_yaml::to_string(other).unwrap_or_default().trim().to_string()),
    }
}

/// Single-quote a string for `bash -c`, escaping embedded single quotes.
pub(crate) fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

#[cfg(test)]
#[path = "params_tests.rs"]
mod tests;
