use active_directory::config::DirectoryConfig;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_defaults() {
    let config = DirectoryConfig::default();
    assert_eq!(config.server, None);
    assert_eq!(config.page_size, 50);
    assert_eq!(config.cache_capacity, None);
    assert_eq!(
        config.user_search_fields,
        vec!["sAMAccountName", "displayName", "cn"]
    );
    assert!(config.is_ignored("ntsecuritydescriptor"));
    assert!(!config.is_ignored("cn"));
}

#[test]
fn test_missing_file_yields_defaults() {
    let dir = tempdir().unwrap();
    let config = DirectoryConfig::load_from_file(dir.path().join("absent.json")).unwrap();
    assert_eq!(config, DirectoryConfig::default());
}

#[test]
fn test_partial_file_keeps_other_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("directory.json");
    fs::write(&path, r#"{ "server": "dc01", "cache_capacity": 1000 }"#).unwrap();

    let config = DirectoryConfig::load_from_file(&path).unwrap();
    assert_eq!(config.server.as_deref(), Some("dc01"));
    assert_eq!(config.cache_capacity, Some(1000));
    assert_eq!(config.page_size, 50);
}

#[test]
fn test_save_and_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("directory.json");
    let config = DirectoryConfig::default()
        .with_server("dc02.example.com")
        .with_page_size(200)
        .with_cache_capacity(64);
    config.save_to_file(&path).unwrap();
    assert_eq!(DirectoryConfig::load_from_file(&path).unwrap(), config);
}

#[test]
fn test_invalid_file_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("directory.json");
    fs::write(&path, "{ not json").unwrap();
    assert!(matches!(
        DirectoryConfig::load_from_file(&path),
        Err(active_directory::Error::Serialize(_))
    ));
}
