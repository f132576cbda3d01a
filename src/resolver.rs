use tracing::debug;

use crate::compiler::{SourceKind, StatementCompiler};
use crate::error::{ContextInferenceError, TransformResult};
use crate::level::ContextLevel;
use crate::processor::StatementGroup;

/// The level a group runs at and whether it had to be inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub level: ContextLevel,
    pub inferred: bool,
}

/// Decides the context level of statement groups.
///
/// An explicit context always wins. Otherwise every path in the group's
/// statements and conditions must name its context, and the group runs at
/// the most specific one named.
pub struct ContextResolver<'c> {
    compiler: &'c dyn StatementCompiler,
}

impl<'c> ContextResolver<'c> {
    pub fn new(compiler: &'c dyn StatementCompiler) -> Self {
        Self { compiler }
    }

    pub fn resolve(&self, group: &StatementGroup) -> TransformResult<Resolution> {
        if let Some(level) = group.context {
            return Ok(Resolution {
                level,
                inferred: false,
            });
        }

        let sources = group
            .statements
            .iter()
            .map(|s| (s, SourceKind::Statement))
            .chain(group.conditions.iter().map(|c| (c, SourceKind::Condition)));

        let mut inferred: Option<ContextLevel> = None;
        for (source, kind) in sources {
            for reference in self.compiler.referenced_paths(source, kind)? {
                match reference.context {
                    Some(level) => inferred = inferred.max(Some(level)),
                    None => {
                        return Err(ContextInferenceError::MissingContext {
                            path: reference.text,
                            statement: source.clone(),
                        }
                        .into())
                    }
                }
            }
        }

        let level = inferred.ok_or_else(|| ContextInferenceError::Undetermined {
            statements: group.statements.clone(),
        })?;
        debug!("inferred {} context for {} statements", level, group.statements.len());
        Ok(Resolution {
            level,
            inferred: true,
        })
    }
}
