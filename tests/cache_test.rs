mod common;

use common::*;
use pretty_assertions::assert_eq;
use telemetry_transform::{ContextLevel, ErrorMode, StatementGroup, Value};

#[test]
fn test_cache_access() {
    let groups = [
        StatementGroup::new([
            r#"set(cache["test"], "pass")"#,
            r#"set(attributes["test"], cache["test"])"#,
        ])
        .with_context(ContextLevel::Profile),
        StatementGroup::new([
            r#"set(profile.cache["test"], "pass")"#,
            r#"set(profile.attributes["test"], profile.cache["test"])"#,
        ]),
    ];
    for group in groups {
        let (actual, expected) = run_and_expect(vec![group], ErrorMode::Ignore, |td| {
            put_profile_attribute(td, 0, "test", "pass");
            put_profile_attribute(td, 1, "test", "pass");
        });
        assert_eq!(actual, expected);
    }
}

#[test]
fn test_cache_holds_nested_values() {
    let group = StatementGroup::new([
        r#"set(cache["parsed"], ParseJSON("{\"a\":{\"b\":\"c\"}}"))"#,
        r#"set(cache["parsed"]["a"]["d"], body)"#,
        r#"set(attributes["b"], cache["parsed"]["a"]["b"])"#,
        r#"set(attributes["d"], cache["parsed"]["a"]["d"])"#,
    ])
    .with_context(ContextLevel::Profile);
    let (actual, expected) = run_and_expect(vec![group], ErrorMode::Propagate, |td| {
        put_profile_attribute(td, 0, "b", "c");
        put_profile_attribute(td, 0, "d", "operationA");
        put_profile_attribute(td, 1, "b", "c");
        put_profile_attribute(td, 1, "d", "operationB");
    });
    assert_eq!(actual, expected);
}

#[test]
fn test_cache_persists_across_groups_for_the_same_node() {
    let groups = vec![
        StatementGroup::new([r#"set(cache["shared"], "pass") where body == "operationA""#])
            .with_context(ContextLevel::Profile),
        StatementGroup::new([r#"set(profile.attributes["seen"], profile.cache["shared"])"#]),
    ];
    let (actual, expected) = run_and_expect(groups, ErrorMode::Propagate, |td| {
        put_profile_attribute(td, 0, "seen", "pass");
    });
    assert_eq!(actual, expected);
}

#[test]
fn test_cache_is_isolated_between_levels() {
    let groups = vec![
        StatementGroup::new([r#"set(cache["shared"], "fail")"#]).with_context(ContextLevel::Profile),
        StatementGroup::new([r#"set(attributes["seen"], cache["shared"])"#]).with_context(ContextLevel::Scope),
        StatementGroup::new([r#"set(attributes["seen"], cache["shared"])"#]).with_context(ContextLevel::Resource),
    ];
    let (actual, expected) = run_and_expect(groups, ErrorMode::Propagate, |_| {});
    assert_eq!(actual, expected);
}

#[test]
fn test_ancestor_cache_is_shared_by_descendants() {
    let groups = vec![
        StatementGroup::new([r#"set(scope.cache["last"], profile.body)"#]),
        StatementGroup::new([r#"set(attributes["last"], cache["last"])"#]).with_context(ContextLevel::Scope),
    ];
    let (actual, expected) = run_and_expect(groups, ErrorMode::Propagate, |td| {
        scope_attributes(td).insert("last".into(), Value::from("operationB"));
    });
    assert_eq!(actual, expected);
}

#[test]
fn test_cache_starts_empty_on_every_invocation() {
    let processor = processor(
        vec![StatementGroup::new([
            r#"set(attributes["prior"], cache["mark"])"#,
            r#"set(cache["mark"], "set")"#,
        ])
        .with_context(ContextLevel::Profile)],
        ErrorMode::Propagate,
    );

    let mut batch = construct_profiles();
    for _ in 0..2 {
        processor.process(&mut batch).unwrap();
        for index in 0..2 {
            assert_eq!(profile_attributes(&batch, index).get("prior"), None);
        }
    }
}

#[test]
fn test_cache_is_not_written_to_the_batch() {
    let mut batch = construct_profiles();
    processor(
        vec![StatementGroup::new([r#"set(resource.cache["k"], "v")"#])],
        ErrorMode::Propagate,
    )
    .process(&mut batch)
    .unwrap();
    assert_eq!(batch, construct_profiles());
}
