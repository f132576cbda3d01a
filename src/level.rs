use serde::{Deserialize, Deserializer, Serialize};

/// Granularity a statement group operates at.
///
/// Ordered from outermost to innermost, so `Resource < Scope < Profile`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum ContextLevel {
    #[strum(serialize = "resource")]
    Resource,
    #[serde(alias = "instrumentation_scope")]
    #[strum(to_string = "scope", serialize = "instrumentation_scope")]
    Scope,
    #[strum(serialize = "profile")]
    Profile,
}

impl ContextLevel {
    /// Whether a statement running at `self` may read or write `target` data.
    /// Only the own level and its ancestors are reachable.
    pub fn can_access(self, target: ContextLevel) -> bool {
        target <= self
    }
}

/// Reads an optional context name where an empty string means "infer".
pub fn deserialize_optional_context<'de, D>(
    deserializer: D,
) -> Result<Option<ContextLevel>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(name) => name
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("unknown context {name:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_parse_and_display() {
        assert_eq!("resource".parse::<ContextLevel>(), Ok(ContextLevel::Resource));
        assert_eq!("scope".parse::<ContextLevel>(), Ok(ContextLevel::Scope));
        assert_eq!(
            "instrumentation_scope".parse::<ContextLevel>(),
            Ok(ContextLevel::Scope)
        );
        assert_eq!("profile".parse::<ContextLevel>(), Ok(ContextLevel::Profile));
        assert!("log".parse::<ContextLevel>().is_err());
        assert_eq!(ContextLevel::Scope.to_string(), "scope");
    }

    #[test]
    fn test_access_rules() {
        for level in ContextLevel::iter() {
            assert!(level.can_access(level));
            assert!(level.can_access(ContextLevel::Resource));
        }
        assert!(!ContextLevel::Resource.can_access(ContextLevel::Scope));
        assert!(!ContextLevel::Scope.can_access(ContextLevel::Profile));
        assert!(ContextLevel::Profile.can_access(ContextLevel::Scope));
    }
}
