use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path};

use crate::error::{Error, TransformResult};
use crate::error_mode::ErrorMode;
use crate::processor::{Processor, StatementGroup};
use crate::telemetry::TelemetrySettings;

/// Processor configuration, as read from JSON.
///
/// ```json
/// {
///   "error_mode": "ignore",
///   "profile_statements": [
///     { "context": "profile", "statements": ["set(attributes[\"x\"], \"y\")"] }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub error_mode: ErrorMode,

    #[serde(default)]
    pub profile_statements: Vec<StatementGroup>,
}

pub fn from_file<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(path: P) -> TransformResult<T> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let config = serde_json::from_reader(reader)?;
    Ok(config)
}

pub fn from_str<T: for<'de> Deserialize<'de>>(s: &str) -> TransformResult<T> {
    let config = serde_json::from_str(s)?;
    Ok(config)
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> TransformResult<Self> {
        from_file(path)
    }

    pub fn from_json(s: &str) -> TransformResult<Self> {
        from_str(s)
    }

    /// Checks that the configuration would build a processor.
    pub fn validate(&self) -> TransformResult<()> {
        if self.profile_statements.is_empty() {
            return Err(Error::config("no profile_statements configured"));
        }
        if let Some(index) = self
            .profile_statements
            .iter()
            .position(|group| group.statements.is_empty())
        {
            return Err(Error::config(format!(
                "profile_statements[{}] has no statements",
                index
            )));
        }
        self.build_processor(TelemetrySettings::nop()).map(|_| ())
    }

    pub fn build_processor(&self, telemetry: TelemetrySettings) -> TransformResult<Processor> {
        Processor::new(self.profile_statements.clone(), self.error_mode, telemetry)
    }
}
