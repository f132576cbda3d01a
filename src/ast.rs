use core::fmt;

use crate::level::ContextLevel;

/// `editor(args) [where condition]`
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub editor: FunctionCall,
    pub condition: Option<BoolExpression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Literal),
    List(Vec<Expression>),
    Converter(FunctionCall),
    Path(Path),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Integer(i64),
    Float(f64),
    Bytes(Vec<u8>),
    Boolean(bool),
    Nil,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Key {
    String(String),
    Integer(i64),
}

/// Dotted path with optional index keys, e.g. `resource.attributes["host.name"]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub segments: Vec<String>,
    pub keys: Vec<Key>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoolExpression {
    Comparison {
        left: Expression,
        op: CompareOperator,
        right: Expression,
    },
    Value(Expression),
    Not(Box<BoolExpression>),
    And(Box<BoolExpression>, Box<BoolExpression>),
    Or(Box<BoolExpression>, Box<BoolExpression>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum CompareOperator {
    #[strum(serialize = "==")]
    Equal,
    #[strum(serialize = "!=")]
    NotEqual,
    #[strum(serialize = "<")]
    LessThan,
    #[strum(serialize = ">")]
    GreaterThan,
    #[strum(serialize = "<=")]
    LessThanEqual,
    #[strum(serialize = ">=")]
    GreaterThanEqual,
}

impl Path {
    /// The context a path names with its first segment. A single segment is
    /// always a field, never a context.
    pub fn context_prefix(&self) -> Option<ContextLevel> {
        if self.segments.len() < 2 {
            return None;
        }
        self.segments[0].parse().ok()
    }

    pub fn field_segments(&self) -> &[String] {
        match self.context_prefix() {
            Some(_) => &self.segments[1..],
            None => &self.segments,
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))?;
        for key in &self.keys {
            match key {
                Key::String(s) => write!(f, "[{}]", s)?,
                Key::Integer(i) => write!(f, "[{}]", i)?,
            }
        }
        Ok(())
    }
}

impl Statement {
    /// Every path the statement reads or writes, in source order.
    pub fn paths(&self) -> Vec<&Path> {
        let mut paths = Vec::new();
        self.editor.collect_paths(&mut paths);
        if let Some(condition) = &self.condition {
            condition.collect_paths(&mut paths);
        }
        paths
    }
}

impl FunctionCall {
    fn collect_paths<'a>(&'a self, paths: &mut Vec<&'a Path>) {
        for argument in &self.arguments {
            argument.collect_paths(paths);
        }
    }
}

impl Expression {
    fn collect_paths<'a>(&'a self, paths: &mut Vec<&'a Path>) {
        match self {
            Expression::Literal(_) => {}
            Expression::List(items) => items.iter().for_each(|item| item.collect_paths(paths)),
            Expression::Converter(call) => call.collect_paths(paths),
            Expression::Path(path) => paths.push(path),
        }
    }
}

impl BoolExpression {
    pub fn paths(&self) -> Vec<&Path> {
        let mut paths = Vec::new();
        self.collect_paths(&mut paths);
        paths
    }

    fn collect_paths<'a>(&'a self, paths: &mut Vec<&'a Path>) {
        match self {
            BoolExpression::Comparison { left, right, .. } => {
                left.collect_paths(paths);
                right.collect_paths(paths);
            }
            BoolExpression::Value(expr) => expr.collect_paths(paths),
            BoolExpression::Not(inner) => inner.collect_paths(paths),
            BoolExpression::And(left, right) | BoolExpression::Or(left, right) => {
                left.collect_paths(paths);
                right.collect_paths(paths);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(segments: &[&str], keys: Vec<Key>) -> Path {
        Path {
            segments: segments.iter().map(|s| s.to_string()).collect(),
            keys,
        }
    }

    #[test]
    fn test_context_prefix() {
        let p = path(&["resource", "attributes"], vec![]);
        assert_eq!(p.context_prefix(), Some(ContextLevel::Resource));
        assert_eq!(p.field_segments(), &["attributes".to_string()]);

        let bare = path(&["cache"], vec![Key::String("test".into())]);
        assert_eq!(bare.context_prefix(), None);
        assert_eq!(bare.to_string(), "cache[test]");

        let scope = path(&["instrumentation_scope", "name"], vec![]);
        assert_eq!(scope.context_prefix(), Some(ContextLevel::Scope));
    }
}
