// src/commands/parser.rs — Console line tokenizing and option parsing

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{CommandError, OptionSpec, ResolvedOption, SubCommand};
use crate::plugins::context::PluginLog;

/// Value of a parsed option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Number(f64),
    Str(String),
}

impl OptionValue {
    /// Coerce the text after `=`: numeric → number, `true`/`false` → bool,
    /// anything else stays a string.
    pub fn coerce(raw: &str) -> Self {
        if let Some(n) = numeric(raw) {
            return Self::Number(n);
        }
        if raw.eq_ignore_ascii_case("true") {
            Self::Bool(true)
        } else if raw.eq_ignore_ascii_case("false") {
            Self::Bool(false)
        } else {
            Self::Str(raw.to_string())
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for OptionValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) if n.is_infinite() => {
                f.write_str(if *n > 0.0 { "Infinity" } else { "-Infinity" })
            }
            Self::Number(n) => write!(f, "{n}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

/// Numeric literal rules for option values: decimal and exponent forms,
/// unsigned `0x`/`0o`/`0b` literals, signed `Infinity`, and empty as zero.
fn numeric(raw: &str) -> Option<f64> {
    if raw.is_empty() {
        return Some(0.0);
    }
    for (prefix, radix) in [("0x", 16), ("0o", 8), ("0b", 2)] {
        let lower = raw.get(..2).map(str::to_ascii_lowercase);
        if lower.as_deref() == Some(prefix) {
            return radix_literal(&raw[2..], radix);
        }
    }

    let (sign, body) = match raw.as_bytes()[0] {
        b'-' => (-1.0, &raw[1..]),
        b'+' => (1.0, &raw[1..]),
        _ => (1.0, raw),
    };
    if body == "Infinity" {
        return Some(sign * f64::INFINITY);
    }
    // Keep out the `inf`/`nan` spellings `f64::from_str` also takes.
    let decimal = body
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'));
    if !decimal {
        return None;
    }
    raw.parse::<f64>().ok()
}

fn radix_literal(digits: &str, radix: u32) -> Option<f64> {
    if digits.is_empty() {
        return None;
    }
    digits.chars().try_fold(0.0, |acc: f64, c| {
        c.to_digit(radix).map(|d| acc * f64::from(radix) + f64::from(d))
    })
}

/// Split on whitespace, dropping empty tokens.
pub fn tokenize(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}

/// Result of parsing the tokens after the command name.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedArgs {
    /// Every declared option, in declaration order, with its value.
    pub options: Vec<ResolvedOption>,
    pub unused: Vec<String>,
    /// Index into the command's subcommands when the first positional names one.
    pub sub_command: Option<usize>,
}

/// Parse `args` (the line minus the command name) against a command's
/// declared options and subcommands.
///
/// Errors are logged through `log` before being returned.
pub fn parse_args(
    args: &[String],
    options: &[OptionSpec],
    sub_commands: &[SubCommand],
    log: &PluginLog,
) -> Result<ParsedArgs, CommandError> {
    let mut values: HashMap<&str, OptionValue> = HashMap::new();
    let mut first_positional: Option<&String> = None;
    let mut tail: Vec<String> = Vec::new();

    for token in args {
        if !token.starts_with('-') {
            if first_positional.is_none() {
                first_positional = Some(token);
            } else {
                tail.push(token.clone());
            }
            continue;
        }

        let (raw_name, value) = match token.split_once('=') {
            Some((name, value)) => (name, Some(OptionValue::coerce(value))),
            None => (token.as_str(), None),
        };

        let spec = if let Some(long) = raw_name.strip_prefix("--") {
            match options.iter().find(|o| o.name == long) {
                Some(spec) => spec,
                None => {
                    log.warn(&format!("unknown option {token}, ignored"));
                    continue;
                }
            }
        } else {
            let short = &raw_name[1..];
            match options.iter().find(|o| o.alias.as_deref() == Some(short)) {
                Some(spec) => spec,
                None => {
                    tail.push(token.clone());
                    continue;
                }
            }
        };

        let value = match (spec.required, value) {
            (true, None) => {
                log.error(&format!("option {token} requires a value"));
                return Err(CommandError::MissingValue {
                    option: token.clone(),
                });
            }
            (_, Some(v)) => v,
            (false, None) => OptionValue::Bool(true),
        };
        values.insert(spec.name.as_str(), value);
    }

    let mut resolved = Vec::with_capacity(options.len());
    for spec in options {
        let value = match values.remove(spec.name.as_str()) {
            Some(v) => v,
            None => match (&spec.default_value, spec.required) {
                (Some(default), _) => default.clone(),
                (None, true) => {
                    log.error(&format!("missing required option: --{}", spec.name));
                    return Err(CommandError::MissingRequired {
                        option: spec.name.clone(),
                    });
                }
                (None, false) => OptionValue::Bool(false),
            },
        };
        resolved.push(ResolvedOption {
            spec: spec.clone(),
            value,
        });
    }

    let sub_command =
        first_positional.and_then(|first| sub_commands.iter().position(|s| &s.name == first));

    let mut unused = Vec::with_capacity(tail.len() + 1);
    if let (Some(first), None) = (first_positional, sub_command) {
        unused.push(first.clone());
    }
    unused.extend(tail);

    Ok(ParsedArgs {
        options: resolved,
        unused,
        sub_command,
    })
}
