use serde::{Deserialize, Serialize};

/// Policy applied when a statement or condition fails to evaluate.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ErrorMode {
    /// Abort the batch and return the error.
    #[default]
    Propagate,
    /// Report the error as a warning and continue with the next statement.
    Ignore,
    /// Continue with the next statement without reporting anything.
    Silent,
}

impl ErrorMode {
    /// The mode a group runs with: its own override, or the processor default.
    pub fn effective(group: Option<ErrorMode>, default: ErrorMode) -> ErrorMode {
        group.unwrap_or(default)
    }
}
