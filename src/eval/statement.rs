use core::fmt;

use crate::error::EvalError;

use super::context::TransformContext;
use super::editor::Editor;
use super::expression::BoolExpr;

/// A compiled statement ready to run against nodes of its level.
pub trait ExecutableStatement: Send + Sync + fmt::Debug {
    fn source(&self) -> &str;

    /// Runs the statement. Returns `false` when its own `where` clause did
    /// not hold and nothing was changed.
    fn execute(&self, context: &mut TransformContext<'_>) -> Result<bool, EvalError>;
}

/// A compiled group-level guard condition.
pub trait ExecutableCondition: Send + Sync + fmt::Debug {
    fn source(&self) -> &str;

    fn evaluate(&self, context: &TransformContext<'_>) -> Result<bool, EvalError>;
}

#[derive(Debug)]
pub struct CompiledStatement {
    source: String,
    editor: Editor,
    condition: Option<BoolExpr>,
}

impl CompiledStatement {
    pub fn new(source: String, editor: Editor, condition: Option<BoolExpr>) -> Self {
        Self {
            source,
            editor,
            condition,
        }
    }
}

impl ExecutableStatement for CompiledStatement {
    fn source(&self) -> &str {
        &self.source
    }

    fn execute(&self, context: &mut TransformContext<'_>) -> Result<bool, EvalError> {
        if let Some(condition) = &self.condition {
            if !condition.evaluate(context)? {
                return Ok(false);
            }
        }
        self.editor.apply(context)?;
        Ok(true)
    }
}

#[derive(Debug)]
pub struct CompiledCondition {
    source: String,
    expr: BoolExpr,
}

impl CompiledCondition {
    pub fn new(source: String, expr: BoolExpr) -> Self {
        Self { source, expr }
    }
}

impl ExecutableCondition for CompiledCondition {
    fn source(&self) -> &str {
        &self.source
    }

    fn evaluate(&self, context: &TransformContext<'_>) -> Result<bool, EvalError> {
        self.expr.evaluate(context)
    }
}
