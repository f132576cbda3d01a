use serde::{Deserialize, Serialize};
use tracing::{debug, debug_span, instrument};

use crate::cache::CacheManager;
use crate::compiler::{BuiltinCompiler, StatementCompiler};
use crate::error::{Error, EvalError, TransformResult};
use crate::error_mode::ErrorMode;
use crate::eval::{ExecutableCondition, ExecutableStatement, TransformContext};
use crate::level::{deserialize_optional_context, ContextLevel};
use crate::pdata::Profiles;
use crate::resolver::ContextResolver;
use crate::telemetry::{DiagnosticLevel, TelemetrySettings};
use crate::walker::HierarchyWalker;

/// Statements that run together at one context level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementGroup {
    /// Unset or empty means the level is inferred from the paths used.
    #[serde(
        default,
        deserialize_with = "deserialize_optional_context",
        skip_serializing_if = "Option::is_none"
    )]
    pub context: Option<ContextLevel>,
    #[serde(default)]
    pub statements: Vec<String>,
    /// Guards checked once per node before any statement; all must hold.
    #[serde(default)]
    pub conditions: Vec<String>,
    /// Overrides the processor's default error mode for this group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_mode: Option<ErrorMode>,
}

impl StatementGroup {
    pub fn new<I, S>(statements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            statements: statements.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_context(mut self, context: ContextLevel) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_conditions<I, S>(mut self, conditions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.conditions = conditions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_error_mode(mut self, error_mode: ErrorMode) -> Self {
        self.error_mode = Some(error_mode);
        self
    }
}

#[derive(Debug)]
struct CompiledGroup {
    level: ContextLevel,
    statements: Vec<Box<dyn ExecutableStatement>>,
    conditions: Vec<Box<dyn ExecutableCondition>>,
    error_mode: Option<ErrorMode>,
}

/// Applies statement groups, in order, to batches of profiles.
///
/// Built once from configuration and reused for any number of batches.
/// Nothing but the batch under processing is mutated by [`Processor::process`],
/// so a processor can be shared across threads.
#[derive(Debug)]
pub struct Processor {
    groups: Vec<CompiledGroup>,
    default_error_mode: ErrorMode,
    telemetry: TelemetrySettings,
}

impl Processor {
    pub fn new(
        groups: Vec<StatementGroup>,
        default_error_mode: ErrorMode,
        telemetry: TelemetrySettings,
    ) -> TransformResult<Self> {
        Self::with_compiler(groups, default_error_mode, telemetry, &BuiltinCompiler)
    }

    /// Builds a processor with a custom statement language.
    #[instrument(level = "debug", skip_all, fields(groups = groups.len()))]
    pub fn with_compiler(
        groups: Vec<StatementGroup>,
        default_error_mode: ErrorMode,
        telemetry: TelemetrySettings,
        compiler: &dyn StatementCompiler,
    ) -> TransformResult<Self> {
        let resolver = ContextResolver::new(compiler);
        let groups = groups
            .iter()
            .map(|group| {
                let resolution = resolver.resolve(group)?;
                let statements = group
                    .statements
                    .iter()
                    .map(|s| compiler.compile_statement(s, resolution.level))
                    .collect::<TransformResult<Vec<_>>>()?;
                let conditions = group
                    .conditions
                    .iter()
                    .map(|c| compiler.compile_condition(c, resolution.level))
                    .collect::<TransformResult<Vec<_>>>()?;
                debug!(
                    level = %resolution.level,
                    inferred = resolution.inferred,
                    statements = statements.len(),
                    "compiled statement group"
                );
                Ok(CompiledGroup {
                    level: resolution.level,
                    statements,
                    conditions,
                    error_mode: group.error_mode,
                })
            })
            .collect::<TransformResult<Vec<_>>>()?;

        Ok(Self {
            groups,
            default_error_mode,
            telemetry,
        })
    }

    /// The resolved level of every group, in execution order.
    pub fn levels(&self) -> Vec<ContextLevel> {
        self.groups.iter().map(|group| group.level).collect()
    }

    /// Runs every group over `batch`, mutating it in place.
    ///
    /// Caches start empty on each call. On error the batch keeps whatever
    /// changes were applied before the failure.
    pub fn process<'b>(&self, batch: &'b mut Profiles) -> TransformResult<&'b mut Profiles> {
        let mut caches = CacheManager::new();
        for (index, group) in self.groups.iter().enumerate() {
            let mode = ErrorMode::effective(group.error_mode, self.default_error_mode);
            let span = debug_span!("statement_group", index, level = %group.level, %mode);
            let _guard = span.enter();
            self.execute_group(group, mode, batch, &mut caches)?;
        }
        self.telemetry.metrics.batch_processed();
        Ok(batch)
    }

    fn execute_group(
        &self,
        group: &CompiledGroup,
        mode: ErrorMode,
        batch: &mut Profiles,
        caches: &mut CacheManager,
    ) -> TransformResult<()> {
        let mut walker = HierarchyWalker::new(group.level);
        while let Some(node) = walker.next_node(batch) {
            let mut context = TransformContext::new(batch, node, caches)?;
            if !self.conditions_hold(group, mode, &context)? {
                self.telemetry.metrics.node_skipped();
                continue;
            }
            for statement in &group.statements {
                match statement.execute(&mut context) {
                    Ok(applied) => self.telemetry.metrics.statement_executed(applied),
                    Err(error) => self.handle_failure(mode, statement.source(), error)?,
                }
            }
        }
        Ok(())
    }

    /// A failing condition counts as not holding once its error was handled.
    fn conditions_hold(
        &self,
        group: &CompiledGroup,
        mode: ErrorMode,
        context: &TransformContext<'_>,
    ) -> TransformResult<bool> {
        for condition in &group.conditions {
            match condition.evaluate(context) {
                Ok(true) => {}
                Ok(false) => return Ok(false),
                Err(error) => {
                    self.handle_failure(mode, condition.source(), error)?;
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    fn handle_failure(&self, mode: ErrorMode, source: &str, error: EvalError) -> TransformResult<()> {
        if let EvalError::Traversal(error) = error {
            self.telemetry.metrics.error_handled(ErrorMode::Propagate);
            return Err(Error::Traversal(error));
        }
        self.telemetry.metrics.error_handled(mode);
        match mode {
            ErrorMode::Propagate => Err(Error::evaluation(source, error)),
            ErrorMode::Ignore => {
                self.telemetry.diagnostics.emit(
                    DiagnosticLevel::Warn,
                    &format!("failed to execute statement {:?}: {}", source, error),
                );
                Ok(())
            }
            ErrorMode::Silent => Ok(()),
        }
    }
}
