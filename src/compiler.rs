use regex::Regex;
use tracing::{debug, instrument};

use crate::ast::{self, BoolExpression, Expression, FunctionCall, Literal};
use crate::error::{ParseError, TransformResult};
use crate::eval::converter::{Case, Converter};
use crate::eval::editor::{glob_to_regex, Editor, MergeStrategy, PatternMode};
use crate::eval::path::{Accessor, CompiledPath};
use crate::eval::{
    BoolExpr, CompiledCondition, CompiledStatement, ExecutableCondition, ExecutableStatement,
    Getter,
};
use crate::level::ContextLevel;
use crate::parser::{parse_condition, parse_statement};
use crate::pdata::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Statement,
    Condition,
}

/// A path found in a statement or condition, with the context it names.
#[derive(Debug, Clone, PartialEq)]
pub struct PathReference {
    pub context: Option<ContextLevel>,
    pub text: String,
}

/// Turns statement and condition text into executables bound to a level.
///
/// Everything that can be checked without data is checked here, so a
/// processor that builds successfully can only fail at runtime on values.
pub trait StatementCompiler: Send + Sync {
    fn referenced_paths(&self, source: &str, kind: SourceKind) -> Result<Vec<PathReference>, ParseError>;

    fn compile_statement(
        &self,
        source: &str,
        level: ContextLevel,
    ) -> TransformResult<Box<dyn ExecutableStatement>>;

    fn compile_condition(
        &self,
        source: &str,
        level: ContextLevel,
    ) -> TransformResult<Box<dyn ExecutableCondition>>;
}

/// Compiler for the built-in statement language.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinCompiler;

impl StatementCompiler for BuiltinCompiler {
    fn referenced_paths(&self, source: &str, kind: SourceKind) -> Result<Vec<PathReference>, ParseError> {
        let references = |paths: Vec<&ast::Path>| -> Vec<PathReference> {
            paths
                .into_iter()
                .map(|path| PathReference {
                    context: path.context_prefix(),
                    text: path.to_string(),
                })
                .collect()
        };
        match kind {
            SourceKind::Statement => Ok(references(parse_statement(source)?.paths())),
            SourceKind::Condition => Ok(references(parse_condition(source)?.paths())),
        }
    }

    #[instrument(level = "debug", skip(self))]
    fn compile_statement(
        &self,
        source: &str,
        level: ContextLevel,
    ) -> TransformResult<Box<dyn ExecutableStatement>> {
        let statement = parse_statement(source)?;
        let unit = Unit { source, level };
        let editor = unit.editor(&statement.editor)?;
        let condition = statement
            .condition
            .as_ref()
            .map(|condition| unit.condition(condition))
            .transpose()?;
        debug!("compiled statement at {} level", level);
        Ok(Box::new(CompiledStatement::new(
            source.to_string(),
            editor,
            condition,
        )))
    }

    #[instrument(level = "debug", skip(self))]
    fn compile_condition(
        &self,
        source: &str,
        level: ContextLevel,
    ) -> TransformResult<Box<dyn ExecutableCondition>> {
        let condition = parse_condition(source)?;
        let expr = Unit { source, level }.condition(&condition)?;
        Ok(Box::new(CompiledCondition::new(source.to_string(), expr)))
    }
}

/// One source text being compiled at one level.
struct Unit<'s> {
    source: &'s str,
    level: ContextLevel,
}

impl<'s> Unit<'s> {
    fn error<M: Into<String>>(&self, message: M) -> ParseError {
        ParseError::new(self.source, message)
    }

    fn path(&self, path: &ast::Path) -> Result<CompiledPath, ParseError> {
        let target = path.context_prefix().unwrap_or(self.level);
        if !self.level.can_access(target) {
            return Err(self.error(format!(
                "path {} refers to {} data, which is not reachable from the {} context",
                path, target, self.level
            )));
        }
        let field = match path.field_segments() {
            [field] => field,
            _ => return Err(self.error(format!("unsupported path {}", path))),
        };
        let accessor = Accessor::resolve(target, field)
            .ok_or_else(|| self.error(format!("unknown {} field {:?} in path {}", target, field, path)))?;
        Ok(CompiledPath::new(accessor, path.keys.clone(), path.to_string()))
    }

    fn getter(&self, expr: &Expression) -> Result<Getter, ParseError> {
        Ok(match expr {
            Expression::Literal(literal) => Getter::Literal(literal_value(literal)),
            Expression::List(items) => Getter::List(
                items
                    .iter()
                    .map(|item| self.getter(item))
                    .collect::<Result<_, _>>()?,
            ),
            Expression::Converter(call) => Getter::Converter(Box::new(self.converter(call)?)),
            Expression::Path(path) => Getter::Path(self.path(path)?),
        })
    }

    fn condition(&self, condition: &BoolExpression) -> Result<BoolExpr, ParseError> {
        Ok(match condition {
            BoolExpression::Comparison { left, op, right } => BoolExpr::Comparison {
                left: self.getter(left)?,
                op: *op,
                right: self.getter(right)?,
            },
            BoolExpression::Value(Expression::Literal(Literal::Boolean(b))) => BoolExpr::Literal(*b),
            BoolExpression::Value(expr @ (Expression::Path(_) | Expression::Converter(_))) => {
                BoolExpr::Value(self.getter(expr)?)
            }
            BoolExpression::Value(_) => {
                return Err(self.error("condition must be a comparison, a boolean or a converter"))
            }
            BoolExpression::Not(inner) => BoolExpr::Not(Box::new(self.condition(inner)?)),
            BoolExpression::And(left, right) => BoolExpr::And(
                Box::new(self.condition(left)?),
                Box::new(self.condition(right)?),
            ),
            BoolExpression::Or(left, right) => BoolExpr::Or(
                Box::new(self.condition(left)?),
                Box::new(self.condition(right)?),
            ),
        })
    }

    fn arity(&self, call: &FunctionCall, expected: usize) -> Result<(), ParseError> {
        if call.arguments.len() != expected {
            return Err(self.error(format!(
                "{} expects {} arguments, got {}",
                call.name,
                expected,
                call.arguments.len()
            )));
        }
        Ok(())
    }

    fn target(&self, call: &FunctionCall, index: usize) -> Result<CompiledPath, ParseError> {
        match &call.arguments[index] {
            Expression::Path(path) => self.path(path),
            _ => Err(self.error(format!("argument {} of {} must be a path", index, call.name))),
        }
    }

    fn string_literal(&self, call: &FunctionCall, index: usize) -> Result<String, ParseError> {
        match &call.arguments[index] {
            Expression::Literal(Literal::String(s)) => Ok(s.clone()),
            _ => Err(self.error(format!(
                "argument {} of {} must be a string literal",
                index, call.name
            ))),
        }
    }

    fn int_literal(&self, call: &FunctionCall, index: usize) -> Result<i64, ParseError> {
        match &call.arguments[index] {
            Expression::Literal(Literal::Integer(i)) => Ok(*i),
            _ => Err(self.error(format!(
                "argument {} of {} must be an integer literal",
                index, call.name
            ))),
        }
    }

    fn regex(&self, call: &FunctionCall, index: usize) -> Result<Regex, ParseError> {
        let pattern = self.string_literal(call, index)?;
        Regex::new(&pattern).map_err(|e| self.error(format!("invalid regex {:?}: {}", pattern, e)))
    }

    fn glob(&self, call: &FunctionCall, index: usize) -> Result<Regex, ParseError> {
        let glob = self.string_literal(call, index)?;
        glob_to_regex(&glob).map_err(|e| self.error(format!("invalid glob {:?}: {}", glob, e)))
    }

    fn named<T: std::str::FromStr>(&self, call: &FunctionCall, index: usize) -> Result<T, ParseError> {
        let name = self.string_literal(call, index)?;
        name.parse()
            .map_err(|_| self.error(format!("invalid option {:?} for {}", name, call.name)))
    }

    fn editor(&self, call: &FunctionCall) -> Result<Editor, ParseError> {
        let editor = match call.name.as_str() {
            "set" => {
                self.arity(call, 2)?;
                Editor::Set {
                    target: self.target(call, 0)?,
                    value: self.getter(&call.arguments[1])?,
                }
            }
            "delete_key" => {
                self.arity(call, 2)?;
                Editor::DeleteKey {
                    target: self.target(call, 0)?,
                    key: self.getter(&call.arguments[1])?,
                }
            }
            "delete_matching_keys" => {
                self.arity(call, 2)?;
                Editor::DeleteMatchingKeys {
                    target: self.target(call, 0)?,
                    pattern: self.regex(call, 1)?,
                }
            }
            "keep_keys" => {
                self.arity(call, 2)?;
                Editor::KeepKeys {
                    target: self.target(call, 0)?,
                    keys: self.getter(&call.arguments[1])?,
                }
            }
            "keep_matching_keys" => {
                self.arity(call, 2)?;
                Editor::KeepMatchingKeys {
                    target: self.target(call, 0)?,
                    pattern: self.regex(call, 1)?,
                }
            }
            "replace_pattern" => {
                self.arity(call, 3)?;
                Editor::ReplacePattern {
                    target: self.target(call, 0)?,
                    pattern: self.regex(call, 1)?,
                    replacement: self.getter(&call.arguments[2])?,
                }
            }
            "replace_all_patterns" => {
                self.arity(call, 4)?;
                Editor::ReplaceAllPatterns {
                    target: self.target(call, 0)?,
                    mode: self.named::<PatternMode>(call, 1)?,
                    pattern: self.regex(call, 2)?,
                    replacement: self.getter(&call.arguments[3])?,
                }
            }
            "replace_match" => {
                self.arity(call, 3)?;
                Editor::ReplaceMatch {
                    target: self.target(call, 0)?,
                    pattern: self.glob(call, 1)?,
                    replacement: self.getter(&call.arguments[2])?,
                }
            }
            "merge_maps" => {
                self.arity(call, 3)?;
                Editor::MergeMaps {
                    target: self.target(call, 0)?,
                    source: self.getter(&call.arguments[1])?,
                    strategy: self.named::<MergeStrategy>(call, 2)?,
                }
            }
            "truncate_all" => {
                self.arity(call, 2)?;
                let limit = self.int_literal(call, 1)?;
                Editor::TruncateAll {
                    target: self.target(call, 0)?,
                    limit: usize::try_from(limit)
                        .map_err(|_| self.error(format!("invalid truncate limit {}", limit)))?,
                }
            }
            other => return Err(self.error(format!("undefined editor {:?}", other))),
        };
        Ok(editor)
    }

    fn converter(&self, call: &FunctionCall) -> Result<Converter, ParseError> {
        let converter = match call.name.as_str() {
            "Concat" => {
                self.arity(call, 2)?;
                Converter::Concat {
                    values: self.getter(&call.arguments[0])?,
                    delimiter: self.string_literal(call, 1)?,
                }
            }
            "Split" => {
                self.arity(call, 2)?;
                Converter::Split {
                    target: self.getter(&call.arguments[0])?,
                    delimiter: self.string_literal(call, 1)?,
                }
            }
            "Substring" => {
                self.arity(call, 3)?;
                Converter::Substring {
                    target: self.getter(&call.arguments[0])?,
                    start: self.int_literal(call, 1)?,
                    length: self.int_literal(call, 2)?,
                }
            }
            "ConvertCase" => {
                self.arity(call, 2)?;
                Converter::ConvertCase {
                    target: self.getter(&call.arguments[0])?,
                    case: self.named::<Case>(call, 1)?,
                }
            }
            "IsMatch" => {
                self.arity(call, 2)?;
                Converter::IsMatch {
                    target: self.getter(&call.arguments[0])?,
                    pattern: self.regex(call, 1)?,
                }
            }
            "ParseJSON" => {
                self.arity(call, 1)?;
                Converter::ParseJson {
                    target: self.getter(&call.arguments[0])?,
                }
            }
            "TraceID" => {
                self.arity(call, 1)?;
                Converter::TraceId {
                    bytes: self.getter(&call.arguments[0])?,
                }
            }
            "SpanID" => {
                self.arity(call, 1)?;
                Converter::SpanId {
                    bytes: self.getter(&call.arguments[0])?,
                }
            }
            "ProfileID" => {
                self.arity(call, 1)?;
                Converter::ProfileId {
                    bytes: self.getter(&call.arguments[0])?,
                }
            }
            "Len" => {
                self.arity(call, 1)?;
                Converter::Len {
                    target: self.getter(&call.arguments[0])?,
                }
            }
            "Log" => {
                self.arity(call, 1)?;
                Converter::Log {
                    target: self.getter(&call.arguments[0])?,
                }
            }
            "Int" => {
                self.arity(call, 1)?;
                Converter::Int {
                    target: self.getter(&call.arguments[0])?,
                }
            }
            other => return Err(self.error(format!("undefined converter {:?}", other))),
        };
        Ok(converter)
    }
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::String(s) => Value::Str(s.clone()),
        Literal::Integer(i) => Value::Int(*i),
        Literal::Float(f) => Value::Double(*f),
        Literal::Bytes(bytes) => Value::Bytes(bytes.clone()),
        Literal::Boolean(b) => Value::Bool(*b),
        Literal::Nil => Value::Nil,
    }
}
