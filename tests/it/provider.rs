use crate::helpers::*;
use active_directory::path::LdapPath;
use active_directory::provider::{
    ClassSchema, InMemoryProvider, Provider, QueryRequest, RawRecord, RawValue,
};
use active_directory::search::Predicate;
use active_directory::Directory;
use std::sync::Arc;
use tempfile::tempdir;

#[test]
fn test_persistence_round_trip() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("directory.json");

    let provider = fixture_provider();
    provider.save_to_file(&file).unwrap();
    let loaded = InMemoryProvider::load_from_file(&file).unwrap();
    assert_eq!(loaded.len(), provider.len());
    assert_eq!(loaded.all_paths(), provider.all_paths());

    // Binary values and schemas survive the trip.
    let directory = Directory::new(Arc::new(loaded));
    let alice = directory.get(ALICE).unwrap();
    assert_eq!(
        alice.get("objectGUID").unwrap().unwrap().to_string(),
        "{01010101-0101-0101-0101-010101010101}"
    );
    assert_eq!(directory.root().unwrap().to_string(), "dc=example,dc=com");
}

#[test]
fn test_load_missing_file_is_empty() {
    let dir = tempdir().unwrap();
    let provider = InMemoryProvider::load_from_file(dir.path().join("nothing.json")).unwrap();
    assert!(provider.is_empty());
}

#[test]
fn test_binary_values_are_base64_in_json() {
    let record = RawRecord::new("CN=A,DC=x", "user")
        .with_attribute("objectGUID", RawValue::binary(vec![0xff, 0x00, 0x10]));
    let json = serde_json::to_string(&record).unwrap();
    assert!(json.contains(r#"{"binary":"/wAQ"}"#), "{json}");
    let back: RawRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(back, record);
}

#[test]
fn test_insert_replaces_and_remove_deletes() {
    let mut provider = InMemoryProvider::new();
    provider
        .insert(RawRecord::new("CN=A,DC=x", "user").with_attribute("cn", "old"))
        .unwrap();
    provider
        .insert(RawRecord::new("LDAP://cn=A,dc=x", "user").with_attribute("cn", "new"))
        .unwrap();
    assert_eq!(provider.len(), 1);
    assert_eq!(
        provider.fetch("LDAP://CN=A,DC=x").unwrap().get_attribute("CN"),
        Some(&RawValue::from("new"))
    );

    let removed = provider.remove(&LdapPath::parse("CN=A,DC=x").unwrap());
    assert!(removed.is_some());
    assert!(provider.is_empty());
    assert!(provider.insert(RawRecord::new("not a path", "user")).is_err());
}

#[test]
fn test_category_matches_schema_dn() {
    let provider = fixture_provider();
    let mut with_category = provider.clone();
    with_category
        .insert(
            RawRecord::new("CN=Carol,OU=People,DC=example,DC=com", "user")
                .with_attribute("cn", "Carol")
                .with_attribute(
                    "objectCategory",
                    "CN=Person,CN=Schema,CN=Configuration,DC=example,DC=com",
                ),
        )
        .unwrap();
    let request = QueryRequest::new(
        LdapPath::parse("OU=People,DC=example,DC=com").unwrap(),
        Predicate::equals("objectCategory", "person"),
        50,
    );
    let found: Vec<String> = with_category
        .execute_query(&request)
        .unwrap()
        .map(|record| record.unwrap().path().to_string())
        .collect();
    assert_eq!(found.len(), 3);
    assert_eq!(provider.execute_query(&request).unwrap().count(), 2);
}

#[test]
fn test_schema_attribute_names_are_unique() {
    let schema = ClassSchema::new(["cn", "objectGUID"], ["CN", "mail", "objectGuid"]);
    assert_eq!(schema.attribute_names(), vec!["cn", "objectGUID", "mail"]);
    assert!(!schema.container);
}

#[test]
fn test_ticks_split_into_signed_halves() {
    assert_eq!(
        RawValue::from_ticks(0xffff_ffff_ffff_ffff),
        RawValue::large_integer(-1, -1)
    );
    assert_eq!(RawValue::from_ticks(10_000_000), RawValue::large_integer(0, 10_000_000));
    assert!(RawValue::list([RawValue::Handle("x".into())]).is_handle());
    assert!(!RawValue::list(Vec::<RawValue>::new()).is_handle());
}
