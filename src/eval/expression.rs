use std::cmp::Ordering;

use crate::ast::CompareOperator;
use crate::error::EvalError;
use crate::pdata::Value;

use super::context::TransformContext;
use super::converter::Converter;
use super::path::CompiledPath;

/// Something that produces a value when evaluated against a node.
#[derive(Debug)]
pub enum Getter {
    Literal(Value),
    Path(CompiledPath),
    List(Vec<Getter>),
    Converter(Box<Converter>),
}

impl Getter {
    pub fn get(&self, context: &TransformContext<'_>) -> Result<Value, EvalError> {
        match self {
            Getter::Literal(value) => Ok(value.clone()),
            Getter::Path(path) => context.get(path),
            Getter::List(items) => items
                .iter()
                .map(|item| item.get(context))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Slice),
            Getter::Converter(converter) => converter.call(context),
        }
    }
}

#[derive(Debug)]
pub enum BoolExpr {
    Literal(bool),
    Comparison {
        left: Getter,
        op: CompareOperator,
        right: Getter,
    },
    Value(Getter),
    Not(Box<BoolExpr>),
    And(Box<BoolExpr>, Box<BoolExpr>),
    Or(Box<BoolExpr>, Box<BoolExpr>),
}

impl BoolExpr {
    pub fn evaluate(&self, context: &TransformContext<'_>) -> Result<bool, EvalError> {
        match self {
            BoolExpr::Literal(b) => Ok(*b),
            BoolExpr::Comparison { left, op, right } => {
                Ok(compare(&left.get(context)?, *op, &right.get(context)?))
            }
            BoolExpr::Value(getter) => match getter.get(context)? {
                Value::Bool(b) => Ok(b),
                other => Err(EvalError::type_mismatch("bool", other.type_name())),
            },
            BoolExpr::Not(inner) => Ok(!inner.evaluate(context)?),
            BoolExpr::And(left, right) => Ok(left.evaluate(context)? && right.evaluate(context)?),
            BoolExpr::Or(left, right) => Ok(left.evaluate(context)? || right.evaluate(context)?),
        }
    }
}

/// Compares two values. Ints and doubles compare numerically; any other mix
/// of kinds is unequal and unordered.
pub fn compare(left: &Value, op: CompareOperator, right: &Value) -> bool {
    let ordering = match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Int(a), Value::Double(b)) => (*a as f64).partial_cmp(b),
        (Value::Double(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
        (Value::Double(a), Value::Double(b)) => a.partial_cmp(b),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Bytes(a), Value::Bytes(b)) => Some(a.cmp(b)),
        (Value::Nil, Value::Nil) => Some(Ordering::Equal),
        _ => None,
    };
    match (op, ordering) {
        (CompareOperator::Equal, Some(ordering)) => ordering == Ordering::Equal,
        (CompareOperator::Equal, None) => left == right,
        (CompareOperator::NotEqual, _) => !compare(left, CompareOperator::Equal, right),
        (CompareOperator::LessThan, Some(ordering)) => ordering == Ordering::Less,
        (CompareOperator::GreaterThan, Some(ordering)) => ordering == Ordering::Greater,
        (CompareOperator::LessThanEqual, Some(ordering)) => ordering != Ordering::Greater,
        (CompareOperator::GreaterThanEqual, Some(ordering)) => ordering != Ordering::Less,
        (_, None) => false,
    }
}
