use active_directory::Directory;
use active_directory::provider::{
    ClassSchema, InMemoryProvider, Provider, ProviderError, ProviderResult, QueryRequest,
    RawRecord, RawValue, RecordStream,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const ROOT: &str = "DC=example,DC=com";
pub const ALICE: &str = "LDAP://CN=Alice,OU=People,DC=example,DC=com";
pub const BOB: &str = "LDAP://CN=Bob,OU=People,DC=example,DC=com";
pub const WORKSTATION: &str = "LDAP://CN=WS01,OU=Computers,DC=example,DC=com";
pub const STAFF: &str = "LDAP://CN=Staff,OU=Groups,DC=example,DC=com";
pub const ADMINS: &str = "LDAP://CN=Admins,OU=Groups,DC=example,DC=com";
pub const MACHINES: &str = "LDAP://CN=Machines,OU=Groups,DC=example,DC=com";

/// Installs a test subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A 16-byte GUID blob filled with `seed`.
pub fn guid_bytes(seed: u8) -> Vec<u8> {
    vec![seed; 16]
}

/// Binary form of the NT authority SID `S-1-5-<sub_authorities>`.
pub fn sid_bytes(sub_authorities: &[u32]) -> Vec<u8> {
    let mut bytes = vec![1, sub_authorities.len() as u8, 0, 0, 0, 0, 0, 5];
    for sub in sub_authorities {
        bytes.extend_from_slice(&sub.to_le_bytes());
    }
    bytes
}

/// Sub-authorities of the fixture domain's SID.
pub const DOMAIN_SID: [u32; 4] = [21, 1004336348, 1177238915, 682003330];

/// Binary SID of the fixture domain account with relative identifier `rid`.
pub fn account_sid_bytes(rid: u32) -> Vec<u8> {
    let mut subs = DOMAIN_SID.to_vec();
    subs.push(rid);
    sid_bytes(&subs)
}

/// Class schemas for every class in the fixture.
pub fn add_schemas(provider: &mut InMemoryProvider) {
    provider.add_schema(
        "user",
        ClassSchema::new(
            ["cn", "objectGUID"],
            [
                "sAMAccountName",
                "displayName",
                "userAccountControl",
                "accountExpires",
                "pwdLastSet",
                "lockoutTime",
                "objectSid",
                "sAMAccountType",
                "mail",
                "memberOf",
                "terminalServer",
                "nTSecurityDescriptor",
            ],
        ),
    );
    provider.add_schema(
        "computer",
        ClassSchema::new(
            ["cn", "objectGUID"],
            ["sAMAccountName", "userAccountControl", "sAMAccountType", "lastLogon"],
        ),
    );
    provider.add_schema(
        "group",
        ClassSchema::new(
            ["cn", "objectGUID", "groupType"],
            ["member", "sAMAccountType", "description"],
        ),
    );
    provider.add_schema(
        "organizationalUnit",
        ClassSchema::new(["ou"], ["description"]).with_container(true),
    );
    provider.add_schema(
        "domainDNS",
        ClassSchema::new(["dc"], ["objectGUID", "objectSid", "maxPwdAge"]).with_container(true),
    );
    provider.add_schema(
        "publicFolder",
        ClassSchema::new(["cn"], ["displayName"]),
    );
}

/// A small domain:
///
/// - users Alice (enabled) and Bob (disabled), computer WS01
/// - groups Staff {Alice, Admins}, Admins {Bob, Staff} (a cycle), Machines {WS01}
/// - organizational units People, Groups, Computers and one public folder
pub fn fixture_provider() -> InMemoryProvider {
    let mut provider = InMemoryProvider::new().with_naming_context(ROOT);
    add_schemas(&mut provider);

    let records = vec![
        RawRecord::new(format!("LDAP://{ROOT}"), "domainDNS")
            .with_attribute("dc", "example")
            .with_attribute("objectGUID", RawValue::binary(guid_bytes(0xd0)))
            .with_attribute("objectSid", RawValue::binary(sid_bytes(&DOMAIN_SID)))
            .with_attribute("maxPwdAge", RawValue::large_integer(-1, -1)),
        RawRecord::new("LDAP://OU=People,DC=example,DC=com", "organizationalUnit")
            .with_attribute("ou", "People"),
        RawRecord::new("LDAP://OU=Groups,DC=example,DC=com", "organizationalUnit")
            .with_attribute("ou", "Groups")
            .with_attribute("description", RawValue::Null),
        RawRecord::new("LDAP://OU=Computers,DC=example,DC=com", "organizationalUnit")
            .with_attribute("ou", "Computers"),
        RawRecord::new(ALICE, "user")
            .with_attribute("cn", "Alice")
            .with_attribute("sAMAccountName", "alice")
            .with_attribute("displayName", "Alice Liddell")
            .with_attribute("objectGUID", RawValue::binary(guid_bytes(1)))
            .with_attribute("userAccountControl", 0x200)
            .with_attribute("accountExpires", RawValue::large_integer(0x7fff_ffff, -1))
            .with_attribute("pwdLastSet", RawValue::from_ticks(132_555_312_000_000_000))
            .with_attribute("lockoutTime", RawValue::Integer(0))
            .with_attribute("objectSid", RawValue::binary(account_sid_bytes(1104)))
            .with_attribute("sAMAccountType", 0x3000_0000)
            .with_attribute("mail", RawValue::Null)
            .with_attribute("memberOf", RawValue::list([STAFF]))
            .with_attribute("terminalServer", RawValue::Handle("IDispatch".into()))
            .with_attribute("nTSecurityDescriptor", RawValue::Handle("IDispatch".into())),
        RawRecord::new(BOB, "user")
            .with_attribute("cn", "Bob")
            .with_attribute("sAMAccountName", "bob")
            .with_attribute("displayName", "Bob Builder")
            .with_attribute("objectGUID", RawValue::binary(guid_bytes(2)))
            .with_attribute("userAccountControl", 0x202)
            .with_attribute("sAMAccountType", 0x3000_0000),
        RawRecord::new(WORKSTATION, "computer")
            .with_attribute("cn", "WS01")
            .with_attribute("sAMAccountName", "WS01$")
            .with_attribute("objectGUID", RawValue::binary(guid_bytes(3)))
            .with_attribute("userAccountControl", 0x1000)
            .with_attribute("sAMAccountType", 0x3000_0001),
        RawRecord::new(STAFF, "group")
            .with_attribute("cn", "Staff")
            .with_attribute("objectGUID", RawValue::binary(guid_bytes(4)))
            .with_attribute("groupType", -2147483646_i64)
            .with_attribute("sAMAccountType", 0x1000_0000)
            .with_attribute("member", RawValue::list([ALICE, ADMINS])),
        RawRecord::new(ADMINS, "group")
            .with_attribute("cn", "Admins")
            .with_attribute("objectGUID", RawValue::binary(guid_bytes(5)))
            .with_attribute("groupType", -2147483646_i64)
            .with_attribute("member", RawValue::list([BOB, STAFF])),
        RawRecord::new(MACHINES, "group")
            .with_attribute("cn", "Machines")
            .with_attribute("objectGUID", RawValue::binary(guid_bytes(6)))
            .with_attribute("groupType", 0x2)
            .with_attribute("member", WORKSTATION),
        RawRecord::new("LDAP://CN=Announcements,DC=example,DC=com", "publicFolder")
            .with_attribute("cn", "Announcements")
            .with_attribute("displayName", "Company Announcements"),
    ];
    for record in records {
        provider.insert(record).expect("Fixture paths are valid");
    }
    provider
}

/// A `Directory` over the fixture domain.
pub fn fixture_directory() -> Directory {
    init_tracing();
    Directory::new(Arc::new(fixture_provider()))
}

/// Delegates to an inner provider and counts fetches.
pub struct CountingProvider {
    inner: InMemoryProvider,
    fetches: AtomicUsize,
}

impl CountingProvider {
    pub fn new(inner: InMemoryProvider) -> Self {
        Self {
            inner,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl Provider for CountingProvider {
    fn fetch(&self, url: &str) -> ProviderResult<RawRecord> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch(url)
    }

    fn execute_query(&self, request: &QueryRequest) -> ProviderResult<RecordStream<'_>> {
        self.inner.execute_query(request)
    }

    fn schema(&self, object_class: &str) -> ProviderResult<ClassSchema> {
        self.inner.schema(object_class)
    }

    fn default_naming_context(&self, server: Option<&str>) -> ProviderResult<String> {
        self.inner.default_naming_context(server)
    }
}

/// Delegates to an inner provider, but every query breaks down after
/// delivering its first record.
pub struct FailingProvider {
    inner: InMemoryProvider,
}

impl FailingProvider {
    pub fn new(inner: InMemoryProvider) -> Self {
        Self { inner }
    }
}

impl Provider for FailingProvider {
    fn fetch(&self, url: &str) -> ProviderResult<RawRecord> {
        self.inner.fetch(url)
    }

    fn execute_query(&self, request: &QueryRequest) -> ProviderResult<RecordStream<'_>> {
        let first = self.inner.execute_query(request)?.take(1);
        let failure = std::iter::once(Err(ProviderError::Failed("connection reset".into())));
        let after = std::iter::once(Err(ProviderError::Failed("still broken".into())));
        Ok(Box::new(first.chain(failure).chain(after)))
    }

    fn schema(&self, object_class: &str) -> ProviderResult<ClassSchema> {
        self.inner.schema(object_class)
    }

    fn default_naming_context(&self, server: Option<&str>) -> ProviderResult<String> {
        self.inner.default_naming_context(server)
    }
}
