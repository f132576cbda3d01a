use thiserror::Error;

/// A statement or condition could not be turned into an executable form.
///
/// Raised at construction time only: syntax errors, unknown functions,
/// wrong arities, invalid literal arguments and paths a context may not
/// reach all end up here.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("unable to parse {statement:?}: {message}{}", location(.position, .fragment))]
pub struct ParseError {
    pub statement: String,
    pub message: String,
    pub position: Option<usize>,
    pub fragment: String,
}

fn location(position: &Option<usize>, fragment: &str) -> String {
    match position {
        Some(position) if fragment.is_empty() => format!(" at position {position}"),
        Some(position) => format!(" at position {position} near {fragment:?}"),
        None => String::new(),
    }
}

impl ParseError {
    pub fn new<S: Into<String>, M: Into<String>>(statement: S, message: M) -> Self {
        Self {
            statement: statement.into(),
            message: message.into(),
            position: None,
            fragment: String::new(),
        }
    }

    pub fn at<F: Into<String>>(mut self, position: usize, fragment: F) -> Self {
        self.position = Some(position);
        self.fragment = fragment.into();
        self
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContextInferenceError {
    /// A group without an explicit context referenced a path with no context prefix.
    #[error("missing context name for path \"{path}\" in {statement:?}")]
    MissingContext { path: String, statement: String },
    /// None of the group's paths named a context.
    #[error("unable to infer context from statements {statements:?}, path's first segment must be a valid context name")]
    Undetermined { statements: Vec<String> },
}

/// The batch does not have the shape the walker or an accessor expected.
///
/// Never downgraded by an error mode.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TraversalError {
    #[error("attribute index {index} out of range for dictionary of {len} entries")]
    AttributeIndexOutOfRange { index: i32, len: usize },
    #[error("attribute table is full ({len} entries)")]
    DictionaryFull { len: usize },
    #[error("node {0} does not exist in batch")]
    MissingNode(String),
    #[error("{level} data is not reachable from node {node}")]
    Unreachable { level: String, node: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("expected {expected} but got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },
    #[error("invalid argument for {function}: {message}")]
    InvalidArgument {
        function: &'static str,
        message: String,
    },
    #[error("cannot index {kind} with {key}")]
    InvalidIndex { kind: &'static str, key: String },
    #[error("index {index} out of bounds for slice of length {len}")]
    IndexOutOfBounds { index: i64, len: usize },
    #[error(transparent)]
    Traversal(#[from] TraversalError),
}

impl EvalError {
    pub fn type_mismatch(expected: &'static str, actual: &'static str) -> Self {
        EvalError::TypeMismatch { expected, actual }
    }

    pub fn invalid_argument<S: Into<String>>(function: &'static str, message: S) -> Self {
        EvalError::InvalidArgument {
            function,
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("Context inference error: {0}")]
    ContextInference(#[from] ContextInferenceError),
    #[error("failed to execute statement {statement:?}: {error}")]
    Evaluation { statement: String, error: EvalError },
    #[error("Traversal error: {0}")]
    Traversal(#[from] TraversalError),
    #[error("Config error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type TransformResult<T> = Result<T, Error>;

impl Error {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config(message.into())
    }

    pub fn evaluation<S: Into<String>>(statement: S, error: EvalError) -> Self {
        Error::Evaluation {
            statement: statement.into(),
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_context_message() {
        let err = Error::from(ContextInferenceError::MissingContext {
            path: "cache[test]".to_string(),
            statement: "cache[\"test\"] == \"\"".to_string(),
        });
        assert!(err
            .to_string()
            .contains("missing context name for path \"cache[test]\""));
    }

    #[test]
    fn test_type_mismatch_message() {
        let err = Error::evaluation(
            "set(attributes[\"test\"], ParseJSON(true))",
            EvalError::type_mismatch("string", "bool"),
        );
        assert!(err.to_string().contains("expected string but got bool"));
    }

    #[test]
    fn test_parse_error_location() {
        let err = ParseError::new("set(", "unexpected end of input").at(4, "");
        assert_eq!(
            err.to_string(),
            "unable to parse \"set(\": unexpected end of input at position 4"
        );
    }
}
