#![allow(dead_code)]

use telemetry_transform::{
    ErrorMode, InstrumentationScope, Map, Processor, Profile, Profiles, ProfilesDictionary,
    Resource, ResourceProfiles, ScopeProfiles, StatementGroup, TelemetrySettings, Value,
};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[ctor::ctor]
fn init_tests() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

pub const TRACE_ID: [u8; 16] = [
    0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f, 0x10,
];
pub const SPAN_ID: [u8; 8] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
pub const START_TIME: u64 = 1_581_452_772_000_000_321;

/// One resource (`host.name=localhost`) with one scope holding two profiles.
pub fn construct_profiles() -> Profiles {
    let mut resource = Resource::default();
    resource.attributes.insert("host.name".into(), Value::from("localhost"));

    let mut dictionary = ProfilesDictionary::new();

    let mut first = Profile {
        body: Value::from("operationA"),
        trace_id: TRACE_ID,
        span_id: SPAN_ID,
        time_unix_nano: START_TIME,
        duration_nanos: 1_000,
        dropped_attributes_count: 1,
        flags: 1,
        ..Default::default()
    };
    fill_attributes(&mut dictionary, &mut first, "A|B|C", "123456789");

    let mut second = Profile {
        body: Value::from("operationB"),
        time_unix_nano: START_TIME,
        ..Default::default()
    };
    fill_attributes(&mut dictionary, &mut second, "C|D", "345678");

    Profiles {
        resource_profiles: vec![ResourceProfiles {
            resource,
            schema_url: String::new(),
            scope_profiles: vec![ScopeProfiles {
                scope: InstrumentationScope {
                    name: "scope".into(),
                    ..Default::default()
                },
                schema_url: "test_schema_url".into(),
                profiles: vec![first, second],
            }],
        }],
        dictionary,
    }
}

fn fill_attributes(
    dictionary: &mut ProfilesDictionary,
    profile: &mut Profile,
    flags: &str,
    total: &str,
) {
    let mut attributes = Map::new();
    attributes.insert("http.method".into(), Value::from("get"));
    attributes.insert("http.path".into(), Value::from("/health"));
    attributes.insert("http.url".into(), Value::from("http://localhost/health"));
    attributes.insert("flags".into(), Value::from(flags));
    attributes.insert("total.string".into(), Value::from(total));
    dictionary.set_attributes(profile, &attributes).unwrap();
}

pub fn profile_mut(batch: &mut Profiles, index: usize) -> &mut Profile {
    &mut batch.resource_profiles[0].scope_profiles[0].profiles[index]
}

pub fn profile_attributes(batch: &Profiles, index: usize) -> Map {
    let profile = &batch.resource_profiles[0].scope_profiles[0].profiles[index];
    batch.dictionary.attributes(profile).unwrap()
}

pub fn put_profile_attribute<V: Into<Value>>(batch: &mut Profiles, index: usize, key: &str, value: V) {
    let Profiles {
        resource_profiles,
        dictionary,
    } = batch;
    let profile = &mut resource_profiles[0].scope_profiles[0].profiles[index];
    dictionary.put_attribute(profile, key, value).unwrap();
}

pub fn update_profile_attributes<F: FnOnce(&mut Map)>(batch: &mut Profiles, index: usize, f: F) {
    let mut attributes = profile_attributes(batch, index);
    f(&mut attributes);
    let Profiles {
        resource_profiles,
        dictionary,
    } = batch;
    let profile = &mut resource_profiles[0].scope_profiles[0].profiles[index];
    dictionary.set_attributes(profile, &attributes).unwrap();
}

pub fn resource_attributes(batch: &mut Profiles) -> &mut Map {
    &mut batch.resource_profiles[0].resource.attributes
}

pub fn scope_attributes(batch: &mut Profiles) -> &mut Map {
    &mut batch.resource_profiles[0].scope_profiles[0].scope.attributes
}

/// Rebuilds the dictionary from the resolved attributes of every profile so
/// that batches with the same observable content compare equal regardless
/// of how their tables grew.
pub fn canonical(batch: &Profiles) -> Profiles {
    let mut canonical = batch.clone();
    let mut dictionary = ProfilesDictionary::new();
    for resource in &mut canonical.resource_profiles {
        for scope in &mut resource.scope_profiles {
            for profile in &mut scope.profiles {
                let attributes = batch.dictionary.attributes(profile).unwrap();
                dictionary.set_attributes(profile, &attributes).unwrap();
            }
        }
    }
    canonical.dictionary = dictionary;
    canonical
}

pub fn processor(groups: Vec<StatementGroup>, mode: ErrorMode) -> Processor {
    Processor::new(groups, mode, TelemetrySettings::nop()).unwrap()
}

/// Runs `groups` over a fresh fixture and returns the result alongside the
/// expected batch produced by `want`.
pub fn run_and_expect<F: FnOnce(&mut Profiles)>(
    groups: Vec<StatementGroup>,
    mode: ErrorMode,
    want: F,
) -> (Profiles, Profiles) {
    let mut actual = construct_profiles();
    processor(groups, mode).process(&mut actual).unwrap();
    let mut expected = construct_profiles();
    want(&mut expected);
    (canonical(&actual), canonical(&expected))
}
