use regex::Regex;

use crate::error::EvalError;
use crate::pdata::Value;

use super::context::TransformContext;
use super::expression::Getter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Case {
    Lower,
    Upper,
    Snake,
    Camel,
}

/// Value-producing functions callable inside statements and conditions.
#[derive(Debug)]
pub enum Converter {
    Concat { values: Getter, delimiter: String },
    Split { target: Getter, delimiter: String },
    Substring { target: Getter, start: i64, length: i64 },
    ConvertCase { target: Getter, case: Case },
    IsMatch { target: Getter, pattern: Regex },
    ParseJson { target: Getter },
    TraceId { bytes: Getter },
    SpanId { bytes: Getter },
    ProfileId { bytes: Getter },
    Len { target: Getter },
    Log { target: Getter },
    Int { target: Getter },
}

impl Converter {
    pub fn call(&self, context: &TransformContext<'_>) -> Result<Value, EvalError> {
        match self {
            Converter::Concat { values, delimiter } => match values.get(context)? {
                Value::Slice(items) => Ok(Value::Str(
                    items
                        .iter()
                        .map(Value::to_string)
                        .collect::<Vec<_>>()
                        .join(delimiter),
                )),
                other => Err(EvalError::type_mismatch("slice", other.type_name())),
            },
            Converter::Split { target, delimiter } => match target.get(context)? {
                Value::Nil => Ok(Value::Nil),
                Value::Str(s) => Ok(Value::Slice(
                    s.split(delimiter.as_str()).map(Value::from).collect(),
                )),
                other => Err(EvalError::type_mismatch("string", other.type_name())),
            },
            Converter::Substring {
                target,
                start,
                length,
            } => match target.get(context)? {
                Value::Nil => Ok(Value::Nil),
                Value::Str(s) => substring(&s, *start, *length).map(Value::from),
                other => Err(EvalError::type_mismatch("string", other.type_name())),
            },
            Converter::ConvertCase { target, case } => match target.get(context)? {
                Value::Nil => Ok(Value::Nil),
                Value::Str(s) => Ok(Value::Str(convert_case(&s, *case))),
                other => Err(EvalError::type_mismatch("string", other.type_name())),
            },
            Converter::IsMatch { target, pattern } => match target.get(context)? {
                Value::Nil => Ok(Value::Bool(false)),
                value @ (Value::Str(_) | Value::Int(_) | Value::Double(_) | Value::Bool(_)) => {
                    Ok(Value::Bool(pattern.is_match(&value.to_string())))
                }
                other => Err(EvalError::type_mismatch("string", other.type_name())),
            },
            Converter::ParseJson { target } => match target.get(context)? {
                Value::Str(s) => serde_json::from_str::<serde_json::Value>(&s)
                    .map(Value::from_json)
                    .map_err(|e| EvalError::invalid_argument("ParseJSON", e.to_string())),
                other => Err(EvalError::type_mismatch("string", other.type_name())),
            },
            Converter::TraceId { bytes } => fixed_bytes(bytes.get(context)?, 16, "TraceID"),
            Converter::SpanId { bytes } => fixed_bytes(bytes.get(context)?, 8, "SpanID"),
            Converter::ProfileId { bytes } => fixed_bytes(bytes.get(context)?, 16, "ProfileID"),
            Converter::Len { target } => {
                let len = match target.get(context)? {
                    Value::Str(s) => s.chars().count(),
                    Value::Slice(items) => items.len(),
                    Value::Map(map) => map.len(),
                    Value::Bytes(bytes) => bytes.len(),
                    other => return Err(EvalError::type_mismatch("string, slice or map", other.type_name())),
                };
                Ok(Value::Int(i64::try_from(len).unwrap_or(i64::MAX)))
            }
            Converter::Log { target } => {
                let x = match target.get(context)? {
                    Value::Int(i) => i as f64,
                    Value::Double(d) => d,
                    other => return Err(EvalError::type_mismatch("number", other.type_name())),
                };
                if x <= 0.0 {
                    return Err(EvalError::invalid_argument(
                        "Log",
                        format!("{x} is not greater than zero"),
                    ));
                }
                Ok(Value::Double(x.ln()))
            }
            Converter::Int { target } => Ok(match target.get(context)? {
                Value::Int(i) => Value::Int(i),
                Value::Double(d) => Value::Int(d.trunc() as i64),
                Value::Bool(b) => Value::Int(i64::from(b)),
                Value::Str(s) => s.trim().parse::<i64>().map(Value::Int).unwrap_or_default(),
                _ => Value::Nil,
            }),
        }
    }
}

fn substring(s: &str, start: i64, length: i64) -> Result<String, EvalError> {
    let invalid = |message: String| EvalError::invalid_argument("Substring", message);
    let start = usize::try_from(start).map_err(|_| invalid(format!("invalid start {start}")))?;
    let length = usize::try_from(length)
        .ok()
        .filter(|l| *l > 0)
        .ok_or_else(|| invalid(format!("invalid length {length}")))?;
    let end = start
        .checked_add(length)
        .filter(|end| *end <= s.len())
        .ok_or_else(|| invalid(format!("range {start}..{} exceeds length {}", start.saturating_add(length), s.len())))?;
    s.get(start..end)
        .map(str::to_string)
        .ok_or_else(|| invalid(format!("range {start}..{end} is not on a character boundary")))
}

fn fixed_bytes(value: Value, len: usize, function: &'static str) -> Result<Value, EvalError> {
    match value {
        Value::Bytes(bytes) if bytes.len() == len => Ok(Value::Bytes(bytes)),
        Value::Bytes(bytes) => Err(EvalError::invalid_argument(
            function,
            format!("expected {len} bytes, got {}", bytes.len()),
        )),
        other => Err(EvalError::type_mismatch("bytes", other.type_name())),
    }
}

/// Splits on non-alphanumerics and on lower-to-upper transitions.
fn words(s: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut previous_lower = false;
    for c in s.chars() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            previous_lower = false;
            continue;
        }
        if c.is_uppercase() && previous_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        previous_lower = c.is_lowercase() || c.is_numeric();
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

pub fn convert_case(s: &str, case: Case) -> String {
    match case {
        Case::Lower => s.to_lowercase(),
        Case::Upper => s.to_uppercase(),
        Case::Snake => words(s)
            .iter()
            .map(|w| w.to_lowercase())
            .collect::<Vec<_>>()
            .join("_"),
        Case::Camel => words(s).iter().map(|w| capitalize(w)).collect(),
    }
}
