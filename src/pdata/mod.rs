//! In-memory profile data model.
mod dictionary;
mod profiles;
mod value;

pub use dictionary::{KeyValue, ProfilesDictionary};
pub use profiles::{
    InstrumentationScope, Profile, Profiles, Resource, ResourceProfiles, ScopeProfiles,
};
pub use value::{Map, Value};
pub(crate) use value::decode_hex;
