use crate::helpers::*;
use active_directory::path::LdapPath;
use active_directory::search::{FilterKind, Predicate, SearchFilter};
use active_directory::{Directory, Error};
use std::sync::Arc;

fn paths(directory: &Directory, predicate: &Predicate, active: Option<bool>) -> Vec<String> {
    let mut found: Vec<String> = directory
        .search(&directory.root().unwrap(), predicate, active)
        .unwrap()
        .map(|path| path.unwrap().rdn().to_string())
        .collect();
    found.sort();
    found
}

#[test]
fn test_empty_predicate_matches_everything() {
    let directory = fixture_directory();
    let predicate = SearchFilter::unrestricted().build_predicate(Vec::new(), &[], None);
    assert!(predicate.is_empty());
    assert_eq!(paths(&directory, &predicate, None).len(), 11);

    let search = directory
        .search(&directory.root().unwrap(), &predicate, None)
        .unwrap();
    assert_eq!(
        search.query(),
        "SELECT ADsPath, userAccountControl\nFROM 'LDAP://dc=example,dc=com'"
    );
}

#[test]
fn test_preset_query_text() {
    let directory = fixture_directory();
    let predicate = SearchFilter::preset(FilterKind::UserId).build_predicate(
        Vec::new(),
        &[],
        Some("alice"),
    );
    let search = directory
        .search(&directory.root().unwrap(), &predicate, None)
        .unwrap();
    assert_eq!(
        search.query(),
        "SELECT ADsPath, userAccountControl\n\
         FROM 'LDAP://dc=example,dc=com'\n\
         WHERE sAMAccountName='alice' AND objectCategory='Person' AND objectClass='User'"
    );
    let found: Vec<LdapPath> = search.map(|path| path.unwrap()).collect();
    assert_eq!(found, vec![LdapPath::parse(ALICE).unwrap()]);
}

#[test]
fn test_active_filter_uses_account_disabled_flag() {
    let directory = fixture_directory();
    let people = SearchFilter::preset(FilterKind::UserId).build_predicate(Vec::new(), &[], None);

    assert_eq!(paths(&directory, &people, None), vec!["Alice", "Bob"]);
    assert_eq!(paths(&directory, &people, Some(true)), vec!["Alice"]);
    assert_eq!(paths(&directory, &people, Some(false)), vec!["Bob"]);
}

#[test]
fn test_records_without_account_control_pass_the_active_filter() {
    let directory = fixture_directory();
    let groups = SearchFilter::preset(FilterKind::Group).build_predicate(Vec::new(), &[], None);
    let expected = vec!["Admins", "Machines", "Staff"];
    assert_eq!(paths(&directory, &groups, Some(true)), expected);
    assert_eq!(paths(&directory, &groups, Some(false)), expected);
}

#[test]
fn test_wildcards_and_alternatives() {
    let directory = fixture_directory();
    let predicate = Predicate::and([
        Predicate::or([
            Predicate::equals("cn", "Al*"),
            Predicate::equals("cn", "*min*"),
        ]),
        Predicate::equals("objectClass", "*"),
    ]);
    assert_eq!(paths(&directory, &predicate, None), vec!["Admins", "Alice"]);
}

#[test]
fn test_mid_stream_failure_ends_the_search() {
    let directory = Directory::new(Arc::new(FailingProvider::new(fixture_provider())));
    let mut search = directory
        .search(&directory.root().unwrap(), &Predicate::everything(), None)
        .unwrap();

    assert!(search.next().unwrap().is_ok());
    match search.next() {
        Some(Err(Error::Query { query, source })) => {
            assert!(query.starts_with("SELECT ADsPath"));
            assert_eq!(source.to_string(), "Provider failure: connection reset");
        }
        Some(Ok(path)) => panic!("Expected a failure, got {path}"),
        Some(Err(other)) => panic!("Expected Query error, got {other:?}"),
        None => panic!("Expected a failure, got the end of the search"),
    }
    assert!(search.next().is_none());
}

#[test]
fn test_search_is_lazy() {
    // Taking one result must not drain the provider's stream into the failure.
    let directory = Directory::new(Arc::new(FailingProvider::new(fixture_provider())));
    let first = directory
        .search(&directory.root().unwrap(), &Predicate::everything(), None)
        .unwrap()
        .next()
        .unwrap();
    assert!(first.is_ok());
}

#[test]
fn test_page_size_comes_from_config() {
    let provider = fixture_provider();
    let directory = Directory::with_config(
        Arc::new(provider),
        active_directory::config::DirectoryConfig::default().with_page_size(7),
    );
    assert_eq!(directory.config().page_size, 7);
    assert_eq!(
        paths(&directory, &Predicate::equals("cn", "Bob"), None),
        vec!["Bob"]
    );
}
