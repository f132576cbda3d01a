use crate::cache::CacheManager;
use crate::error::{EvalError, TraversalError};
use crate::level::ContextLevel;
use crate::pdata::{
    InstrumentationScope, Map, Profile, Profiles, ProfilesDictionary, Resource, ResourceProfiles,
    ScopeProfiles, Value,
};
use crate::walker::NodeId;

use super::path::{index_value, set_indexed, Accessor, CompiledPath, ProfileField, ResourceField, ScopeField};

/// Mutable view of one node and its ancestors while statements run on it.
///
/// Borrows the node's own data, the data of its ancestors, the batch
/// dictionary and the invocation's caches, and nothing else.
pub struct TransformContext<'a> {
    node: NodeId,
    resource: &'a mut Resource,
    resource_schema_url: &'a mut String,
    scope: Option<(&'a mut InstrumentationScope, &'a mut String)>,
    profile: Option<&'a mut Profile>,
    dictionary: &'a mut ProfilesDictionary,
    caches: &'a mut CacheManager,
}

impl<'a> TransformContext<'a> {
    pub fn new(
        batch: &'a mut Profiles,
        node: NodeId,
        caches: &'a mut CacheManager,
    ) -> Result<Self, TraversalError> {
        let missing = || TraversalError::MissingNode(node.to_string());
        let Profiles {
            resource_profiles,
            dictionary,
        } = batch;
        let ResourceProfiles {
            resource,
            schema_url: resource_schema_url,
            scope_profiles,
        } = resource_profiles
            .get_mut(node.resource_index())
            .ok_or_else(missing)?;

        let (scope, profile) = match node {
            NodeId::Resource { .. } => (None, None),
            NodeId::Scope { scope: s, .. } => {
                let ScopeProfiles {
                    scope, schema_url, ..
                } = scope_profiles.get_mut(s).ok_or_else(missing)?;
                (Some((scope, schema_url)), None)
            }
            NodeId::Profile {
                scope: s,
                profile: p,
                ..
            } => {
                let ScopeProfiles {
                    scope,
                    schema_url,
                    profiles,
                } = scope_profiles.get_mut(s).ok_or_else(missing)?;
                let profile = profiles.get_mut(p).ok_or_else(missing)?;
                (Some((scope, schema_url)), Some(profile))
            }
        };

        Ok(Self {
            node,
            resource,
            resource_schema_url,
            scope,
            profile,
            dictionary,
            caches,
        })
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn get(&self, path: &CompiledPath) -> Result<Value, EvalError> {
        index_value(self.read_field(path.accessor)?, &path.keys)
    }

    /// Writes `value` at `path`. Keyed writes read the field, update the
    /// nested entry and store the whole field back.
    pub fn set(&mut self, path: &CompiledPath, value: Value) -> Result<(), EvalError> {
        if path.keys.is_empty() {
            return self.write_field(path.accessor, value);
        }
        let mut root = self.read_field(path.accessor)?;
        set_indexed(&mut root, &path.keys, value)?;
        self.write_field(path.accessor, root)
    }

    /// The cache of this node's ancestor (or self) at `level`.
    pub fn cache_mut(&mut self, level: ContextLevel) -> Result<&mut Map, EvalError> {
        let node = self.node_at(level)?;
        Ok(self.caches.cache(node))
    }

    fn node_at(&self, level: ContextLevel) -> Result<NodeId, EvalError> {
        self.node
            .ancestor(level)
            .ok_or_else(|| unreachable(level, self.node))
    }

    fn scope_ref(&self) -> Result<(&InstrumentationScope, &String), EvalError> {
        self.scope
            .as_ref()
            .map(|(scope, schema_url)| (&**scope, &**schema_url))
            .ok_or_else(|| unreachable(ContextLevel::Scope, self.node))
    }

    fn scope_mut(&mut self) -> Result<(&mut InstrumentationScope, &mut String), EvalError> {
        let node = self.node;
        self.scope
            .as_mut()
            .map(|(scope, schema_url)| (&mut **scope, &mut **schema_url))
            .ok_or_else(|| unreachable(ContextLevel::Scope, node))
    }

    fn profile_ref(&self) -> Result<&Profile, EvalError> {
        self.profile
            .as_deref()
            .ok_or_else(|| unreachable(ContextLevel::Profile, self.node))
    }

    fn read_field(&self, accessor: Accessor) -> Result<Value, EvalError> {
        let value = match accessor {
            Accessor::Resource(field) => match field {
                ResourceField::Attributes => Value::Map(self.resource.attributes.clone()),
                ResourceField::DroppedAttributesCount => {
                    Value::Int(i64::from(self.resource.dropped_attributes_count))
                }
                ResourceField::SchemaUrl => Value::Str(self.resource_schema_url.clone()),
            },
            Accessor::Scope(field) => {
                let (scope, schema_url) = self.scope_ref()?;
                match field {
                    ScopeField::Name => Value::Str(scope.name.clone()),
                    ScopeField::Version => Value::Str(scope.version.clone()),
                    ScopeField::Attributes => Value::Map(scope.attributes.clone()),
                    ScopeField::DroppedAttributesCount => {
                        Value::Int(i64::from(scope.dropped_attributes_count))
                    }
                    ScopeField::SchemaUrl => Value::Str(schema_url.clone()),
                }
            }
            Accessor::Profile(field) => {
                let profile = self.profile_ref()?;
                match field {
                    ProfileField::Attributes => Value::Map(self.dictionary.attributes(profile)?),
                    ProfileField::Body => profile.body.clone(),
                    ProfileField::ProfileId => Value::Bytes(profile.profile_id.to_vec()),
                    ProfileField::TraceId => Value::Bytes(profile.trace_id.to_vec()),
                    ProfileField::SpanId => Value::Bytes(profile.span_id.to_vec()),
                    ProfileField::TimeUnixNano => Value::Int(saturating_int(profile.time_unix_nano)),
                    ProfileField::DurationNanos => Value::Int(saturating_int(profile.duration_nanos)),
                    ProfileField::DroppedAttributesCount => {
                        Value::Int(i64::from(profile.dropped_attributes_count))
                    }
                    ProfileField::Flags => Value::Int(i64::from(profile.flags)),
                    ProfileField::OriginalPayloadFormat => {
                        Value::Str(profile.original_payload_format.clone())
                    }
                    ProfileField::OriginalPayload => Value::Bytes(profile.original_payload.clone()),
                }
            }
            Accessor::Cache(level) => {
                let node = self.node_at(level)?;
                Value::Map(self.caches.peek(node).cloned().unwrap_or_default())
            }
        };
        Ok(value)
    }

    fn write_field(&mut self, accessor: Accessor, value: Value) -> Result<(), EvalError> {
        match accessor {
            Accessor::Resource(field) => match field {
                ResourceField::Attributes => self.resource.attributes = expect_map(value)?,
                ResourceField::DroppedAttributesCount => {
                    self.resource.dropped_attributes_count = expect_u32(value, "dropped_attributes_count")?
                }
                ResourceField::SchemaUrl => *self.resource_schema_url = expect_string(value)?,
            },
            Accessor::Scope(field) => {
                let (scope, schema_url) = self.scope_mut()?;
                match field {
                    ScopeField::Name => scope.name = expect_string(value)?,
                    ScopeField::Version => scope.version = expect_string(value)?,
                    ScopeField::Attributes => scope.attributes = expect_map(value)?,
                    ScopeField::DroppedAttributesCount => {
                        scope.dropped_attributes_count = expect_u32(value, "dropped_attributes_count")?
                    }
                    ScopeField::SchemaUrl => *schema_url = expect_string(value)?,
                }
            }
            Accessor::Profile(field) => {
                let node = self.node;
                let profile = self
                    .profile
                    .as_deref_mut()
                    .ok_or_else(|| unreachable(ContextLevel::Profile, node))?;
                match field {
                    ProfileField::Attributes => {
                        let attributes = expect_map(value)?;
                        profile.attribute_indices = self.dictionary.indices_for(&attributes)?;
                    }
                    ProfileField::Body => profile.body = value,
                    ProfileField::ProfileId => profile.profile_id = expect_array(value, "profile_id")?,
                    ProfileField::TraceId => profile.trace_id = expect_array(value, "trace_id")?,
                    ProfileField::SpanId => profile.span_id = expect_array(value, "span_id")?,
                    ProfileField::TimeUnixNano => {
                        profile.time_unix_nano = expect_u64(value, "time_unix_nano")?
                    }
                    ProfileField::DurationNanos => {
                        profile.duration_nanos = expect_u64(value, "duration_nanos")?
                    }
                    ProfileField::DroppedAttributesCount => {
                        profile.dropped_attributes_count = expect_u32(value, "dropped_attributes_count")?
                    }
                    ProfileField::Flags => profile.flags = expect_u32(value, "flags")?,
                    ProfileField::OriginalPayloadFormat => {
                        profile.original_payload_format = expect_string(value)?
                    }
                    ProfileField::OriginalPayload => profile.original_payload = expect_bytes(value)?,
                }
            }
            Accessor::Cache(level) => {
                let map = expect_map(value)?;
                *self.cache_mut(level)? = map;
            }
        }
        Ok(())
    }
}

fn unreachable(level: ContextLevel, node: NodeId) -> EvalError {
    EvalError::Traversal(TraversalError::Unreachable {
        level: level.to_string(),
        node: node.to_string(),
    })
}

fn saturating_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn expect_map(value: Value) -> Result<Map, EvalError> {
    match value {
        Value::Map(map) => Ok(map),
        other => Err(EvalError::type_mismatch("map", other.type_name())),
    }
}

fn expect_string(value: Value) -> Result<String, EvalError> {
    match value {
        Value::Str(s) => Ok(s),
        other => Err(EvalError::type_mismatch("string", other.type_name())),
    }
}

fn expect_bytes(value: Value) -> Result<Vec<u8>, EvalError> {
    match value {
        Value::Bytes(bytes) => Ok(bytes),
        other => Err(EvalError::type_mismatch("bytes", other.type_name())),
    }
}

fn expect_array<const N: usize>(value: Value, field: &str) -> Result<[u8; N], EvalError> {
    let bytes = expect_bytes(value)?;
    let len = bytes.len();
    bytes.try_into().map_err(|_| {
        EvalError::invalid_argument("set", format!("{field} needs {N} bytes, got {len}"))
    })
}

fn expect_u32(value: Value, field: &str) -> Result<u32, EvalError> {
    match value {
        Value::Int(i) => u32::try_from(i)
            .map_err(|_| EvalError::invalid_argument("set", format!("{i} is out of range for {field}"))),
        other => Err(EvalError::type_mismatch("int", other.type_name())),
    }
}

fn expect_u64(value: Value, field: &str) -> Result<u64, EvalError> {
    match value {
        Value::Int(i) => u64::try_from(i)
            .map_err(|_| EvalError::invalid_argument("set", format!("{i} is out of range for {field}"))),
        other => Err(EvalError::type_mismatch("int", other.type_name())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Key;

    fn batch() -> Profiles {
        let mut batch = Profiles::new();
        let mut profile = Profile::default();
        batch
            .dictionary
            .put_attribute(&mut profile, "http.method", "get")
            .unwrap();
        batch.resource_profiles.push(ResourceProfiles {
            scope_profiles: vec![ScopeProfiles {
                scope: InstrumentationScope {
                    name: "scope".into(),
                    ..Default::default()
                },
                profiles: vec![profile],
                ..Default::default()
            }],
            ..Default::default()
        });
        batch
    }

    fn path(accessor: Accessor, keys: Vec<Key>) -> CompiledPath {
        CompiledPath::new(accessor, keys, String::new())
    }

    const PROFILE: NodeId = NodeId::Profile {
        resource: 0,
        scope: 0,
        profile: 0,
    };

    #[test]
    fn test_reads_ancestor_fields() {
        let mut batch = batch();
        let mut caches = CacheManager::new();
        let context = TransformContext::new(&mut batch, PROFILE, &mut caches).unwrap();
        assert_eq!(
            context.get(&path(Accessor::Scope(ScopeField::Name), vec![])),
            Ok(Value::from("scope"))
        );
        assert_eq!(
            context.get(&path(
                Accessor::Profile(ProfileField::Attributes),
                vec![Key::String("http.method".into())]
            )),
            Ok(Value::from("get"))
        );
    }

    #[test]
    fn test_profile_attribute_write_interns() {
        let mut batch = batch();
        let mut caches = CacheManager::new();
        {
            let mut context = TransformContext::new(&mut batch, PROFILE, &mut caches).unwrap();
            context
                .set(
                    &path(
                        Accessor::Profile(ProfileField::Attributes),
                        vec![Key::String("test".into())],
                    ),
                    Value::from("pass"),
                )
                .unwrap();
        }
        assert_eq!(batch.dictionary.len(), 2);
        let attributes = batch
            .dictionary
            .attributes(&batch.resource_profiles[0].scope_profiles[0].profiles[0])
            .unwrap();
        assert_eq!(attributes["test"], Value::from("pass"));
        assert_eq!(attributes["http.method"], Value::from("get"));
    }

    #[test]
    fn test_typed_field_writes() {
        let mut batch = batch();
        let mut caches = CacheManager::new();
        let mut context = TransformContext::new(&mut batch, PROFILE, &mut caches).unwrap();
        assert_eq!(
            context.set(&path(Accessor::Profile(ProfileField::Flags), vec![]), Value::from("x")),
            Err(EvalError::type_mismatch("int", "string"))
        );
        assert!(context
            .set(&path(Accessor::Profile(ProfileField::SpanId), vec![]), Value::Bytes(vec![1; 3]))
            .is_err());
        context
            .set(&path(Accessor::Profile(ProfileField::SpanId), vec![]), Value::Bytes(vec![1; 8]))
            .unwrap();
        assert_eq!(
            context.get(&path(Accessor::Profile(ProfileField::SpanId), vec![])),
            Ok(Value::Bytes(vec![1; 8]))
        );
    }

    #[test]
    fn test_cache_write_targets_level() {
        let mut batch = batch();
        let mut caches = CacheManager::new();
        {
            let mut context = TransformContext::new(&mut batch, PROFILE, &mut caches).unwrap();
            context
                .set(
                    &path(Accessor::Cache(ContextLevel::Scope), vec![Key::String("k".into())]),
                    Value::Int(1),
                )
                .unwrap();
        }
        let scope = NodeId::Scope {
            resource: 0,
            scope: 0,
        };
        assert_eq!(caches.peek(scope).unwrap()["k"], Value::Int(1));
        assert!(caches.peek(PROFILE).is_none());
    }

    #[test]
    fn test_missing_node() {
        let mut batch = batch();
        let mut caches = CacheManager::new();
        let node = NodeId::Scope {
            resource: 0,
            scope: 4,
        };
        assert!(matches!(
            TransformContext::new(&mut batch, node, &mut caches),
            Err(TraversalError::MissingNode(_))
        ));
    }
}
