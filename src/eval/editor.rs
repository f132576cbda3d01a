use std::collections::HashSet;

use regex::Regex;

use crate::error::EvalError;
use crate::pdata::{Map, Value};

use super::context::TransformContext;
use super::expression::Getter;
use super::path::CompiledPath;

/// Which part of a map entry `replace_all_patterns` rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum PatternMode {
    Key,
    Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum MergeStrategy {
    Insert,
    Update,
    Upsert,
}

/// Mutating functions. Every statement starts with exactly one.
#[derive(Debug)]
pub enum Editor {
    Set {
        target: CompiledPath,
        value: Getter,
    },
    DeleteKey {
        target: CompiledPath,
        key: Getter,
    },
    DeleteMatchingKeys {
        target: CompiledPath,
        pattern: Regex,
    },
    KeepKeys {
        target: CompiledPath,
        keys: Getter,
    },
    KeepMatchingKeys {
        target: CompiledPath,
        pattern: Regex,
    },
    ReplacePattern {
        target: CompiledPath,
        pattern: Regex,
        replacement: Getter,
    },
    ReplaceAllPatterns {
        target: CompiledPath,
        mode: PatternMode,
        pattern: Regex,
        replacement: Getter,
    },
    ReplaceMatch {
        target: CompiledPath,
        pattern: Regex,
        replacement: Getter,
    },
    MergeMaps {
        target: CompiledPath,
        source: Getter,
        strategy: MergeStrategy,
    },
    TruncateAll {
        target: CompiledPath,
        limit: usize,
    },
}

impl Editor {
    pub fn apply(&self, context: &mut TransformContext<'_>) -> Result<(), EvalError> {
        match self {
            Editor::Set { target, value } => match value.get(context)? {
                Value::Nil => Ok(()),
                value => context.set(target, value),
            },
            Editor::DeleteKey { target, key } => {
                let key = expect_string(key.get(context)?)?;
                edit_map(context, target, |map| {
                    map.shift_remove(&key);
                    Ok(())
                })
            }
            Editor::DeleteMatchingKeys { target, pattern } => edit_map(context, target, |map| {
                map.retain(|k, _| !pattern.is_match(k));
                Ok(())
            }),
            Editor::KeepKeys { target, keys } => {
                let keys = match keys.get(context)? {
                    Value::Slice(items) => items
                        .into_iter()
                        .map(expect_string)
                        .collect::<Result<HashSet<_>, _>>()?,
                    Value::Str(key) => HashSet::from([key]),
                    other => return Err(EvalError::type_mismatch("slice", other.type_name())),
                };
                edit_map(context, target, |map| {
                    map.retain(|k, _| keys.contains(k));
                    Ok(())
                })
            }
            Editor::KeepMatchingKeys { target, pattern } => edit_map(context, target, |map| {
                map.retain(|k, _| pattern.is_match(k));
                Ok(())
            }),
            Editor::ReplacePattern {
                target,
                pattern,
                replacement,
            } => {
                let replacement = expect_string(replacement.get(context)?)?;
                match context.get(target)? {
                    Value::Str(s) if pattern.is_match(&s) => {
                        let replaced = pattern.replace_all(&s, replacement.as_str()).into_owned();
                        context.set(target, Value::Str(replaced))
                    }
                    _ => Ok(()),
                }
            }
            Editor::ReplaceAllPatterns {
                target,
                mode,
                pattern,
                replacement,
            } => {
                let replacement = expect_string(replacement.get(context)?)?;
                edit_map(context, target, |map| {
                    *map = std::mem::take(map)
                        .into_iter()
                        .map(|(k, v)| match (mode, v) {
                            (PatternMode::Key, v) => {
                                (pattern.replace_all(&k, replacement.as_str()).into_owned(), v)
                            }
                            (PatternMode::Value, Value::Str(s)) => {
                                let replaced = pattern.replace_all(&s, replacement.as_str()).into_owned();
                                (k, Value::Str(replaced))
                            }
                            (PatternMode::Value, v) => (k, v),
                        })
                        .collect();
                    Ok(())
                })
            }
            Editor::ReplaceMatch {
                target,
                pattern,
                replacement,
            } => {
                let replacement = expect_string(replacement.get(context)?)?;
                match context.get(target)? {
                    Value::Str(s) if pattern.is_match(&s) => context.set(target, Value::Str(replacement)),
                    _ => Ok(()),
                }
            }
            Editor::MergeMaps {
                target,
                source,
                strategy,
            } => {
                let source = match source.get(context)? {
                    Value::Map(map) => map,
                    Value::Nil => return Ok(()),
                    other => return Err(EvalError::type_mismatch("map", other.type_name())),
                };
                edit_map(context, target, |map| {
                    for (k, v) in source {
                        match strategy {
                            MergeStrategy::Insert => {
                                map.entry(k).or_insert(v);
                            }
                            MergeStrategy::Update => {
                                if let Some(existing) = map.get_mut(&k) {
                                    *existing = v;
                                }
                            }
                            MergeStrategy::Upsert => {
                                map.insert(k, v);
                            }
                        }
                    }
                    Ok(())
                })
            }
            Editor::TruncateAll { target, limit } => edit_map(context, target, |map| {
                for value in map.values_mut() {
                    if let Value::Str(s) = value {
                        truncate_on_boundary(s, *limit);
                    }
                }
                Ok(())
            }),
        }
    }
}

/// Runs `f` on the map at `target` and writes the result back. Nil targets
/// are left alone.
fn edit_map<F>(context: &mut TransformContext<'_>, target: &CompiledPath, f: F) -> Result<(), EvalError>
where
    F: FnOnce(&mut Map) -> Result<(), EvalError>,
{
    match context.get(target)? {
        Value::Map(mut map) => {
            f(&mut map)?;
            context.set(target, Value::Map(map))
        }
        Value::Nil => Ok(()),
        other => Err(EvalError::type_mismatch("map", other.type_name())),
    }
}

fn expect_string(value: Value) -> Result<String, EvalError> {
    match value {
        Value::Str(s) => Ok(s),
        other => Err(EvalError::type_mismatch("string", other.type_name())),
    }
}

fn truncate_on_boundary(s: &mut String, limit: usize) {
    if s.len() <= limit {
        return;
    }
    let mut end = limit;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
}

/// Translates a glob (`*`, `?`) into an anchored regex.
pub fn glob_to_regex(glob: &str) -> Result<Regex, regex::Error> {
    let mut pattern = String::from("^");
    for c in glob.chars() {
        match c {
            '*' => pattern.push_str(".*"),
            '?' => pattern.push('.'),
            c => pattern.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }
    pattern.push('$');
    Regex::new(&pattern)
}
