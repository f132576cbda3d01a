use serde::{Deserialize, Serialize};

use super::dictionary::ProfilesDictionary;
use super::value::{Map, Value};

/// A batch of profiles: resources, their scopes, the scopes' profile records
/// and the dictionary every record indexes into.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profiles {
    #[serde(default)]
    pub resource_profiles: Vec<ResourceProfiles>,
    #[serde(default)]
    pub dictionary: ProfilesDictionary,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceProfiles {
    pub resource: Resource,
    pub schema_url: String,
    pub scope_profiles: Vec<ScopeProfiles>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Resource {
    pub attributes: Map,
    pub dropped_attributes_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeProfiles {
    pub scope: InstrumentationScope,
    pub schema_url: String,
    pub profiles: Vec<Profile>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentationScope {
    pub name: String,
    pub version: String,
    pub attributes: Map,
    pub dropped_attributes_count: u32,
}

/// A single profile record. Its attributes live in the batch dictionary and
/// are referenced through `attribute_indices`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub attribute_indices: Vec<i32>,
    pub body: Value,
    pub profile_id: [u8; 16],
    pub trace_id: [u8; 16],
    pub span_id: [u8; 8],
    pub time_unix_nano: u64,
    pub duration_nanos: u64,
    pub dropped_attributes_count: u32,
    pub flags: u32,
    pub original_payload_format: String,
    pub original_payload: Vec<u8>,
}

impl Profiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn profile_count(&self) -> usize {
        self.resource_profiles
            .iter()
            .flat_map(|rp| rp.scope_profiles.iter())
            .map(|sp| sp.profiles.len())
            .sum()
    }

    pub fn resource(&self, resource: usize) -> Option<&ResourceProfiles> {
        self.resource_profiles.get(resource)
    }

    pub fn scope(&self, resource: usize, scope: usize) -> Option<&ScopeProfiles> {
        self.resource(resource)?.scope_profiles.get(scope)
    }

    pub fn profile(&self, resource: usize, scope: usize, profile: usize) -> Option<&Profile> {
        self.scope(resource, scope)?.profiles.get(profile)
    }
}
