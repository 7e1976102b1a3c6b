use active_directory::data::mapping::{
    AUTHENTICATION_TYPES, FlagsMapping, GROUP_TYPES, SAM_ACCOUNT_TYPES, USER_ACCOUNT_CONTROL,
};
use active_directory::data::{
    Conversion, SecurityIdentifier, Timestamp, Value, filetime_to_timestamp, hex, to_unsigned,
    values,
};
use active_directory::provider::RawValue;
use active_directory::Error;
use chrono::NaiveDate;
use std::collections::BTreeSet;

#[test]
fn test_flag_names_require_full_mask() {
    let flags = FlagsMapping::new("ABC", &[("A", 0x1), ("B", 0x2), ("C", 0x4)]);
    assert_eq!(flags.flag_names(0x3), BTreeSet::from(["A", "B"]));
    assert_eq!(flags.flag_names(0x5), BTreeSet::from(["A", "C"]));
    assert_eq!(flags.flag_names(0x0), BTreeSet::new());
    assert_eq!(flags.number("C"), Some(0x4));
}

#[test]
fn test_never_sentinel_for_any_low_part() {
    for low in [0, 1, 0x7fff_ffff, 0x8000_0000, 0xffff_ffff] {
        let ts = filetime_to_timestamp(0x7fff_ffff, low);
        assert!(ts.is_never());
        assert_eq!(ts.instant(), None);
    }
}

#[test]
fn test_one_second_after_epoch() {
    let expected = NaiveDate::from_ymd_opt(1601, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 1)
        .unwrap();
    assert_eq!(filetime_to_timestamp(0, 10_000_000), Timestamp::At(expected));
}

#[test]
fn test_timestamp_conversion_from_signed_halves() {
    // Signed readings of both halves must be reinterpreted, not truncated.
    let raw = RawValue::from_ticks(0x01d6_ee5f_8000_0000);
    assert!(matches!(raw, RawValue::LargeInteger { low, .. } if low < 0));
    let value = Conversion::Timestamp
        .apply("pwdLastSet", &raw)
        .unwrap()
        .unwrap();
    let instant = value.as_timestamp().unwrap().instant().unwrap();
    assert_eq!(
        instant,
        filetime_to_timestamp(0x01d6_ee5f, 0x8000_0000)
            .instant()
            .unwrap()
    );
}

#[test]
fn test_never_is_distinct_from_every_date() {
    let never = Conversion::Timestamp
        .apply("accountExpires", &RawValue::large_integer(0x7fff_ffff, -1))
        .unwrap()
        .unwrap();
    assert_eq!(never, Value::Timestamp(Timestamp::Never));
    assert_eq!(never.to_string(), "<never>");
}

#[test]
fn test_hex_and_guid_rendering() {
    assert_eq!(hex(&[0xde, 0xad, 0xbe, 0xef]), "deadbeef");

    let bytes: Vec<u8> = (0x10u8..0x20).collect();
    let guid = Conversion::Guid
        .apply("objectGUID", &RawValue::binary(bytes))
        .unwrap()
        .unwrap();
    assert_eq!(guid.to_string(), "{10111213-1415-1617-1819-1a1b1c1d1e1f}");
}

#[test]
fn test_guid_of_wrong_length_is_a_conversion_error() {
    match Conversion::Guid.apply("objectGUID", &RawValue::binary(vec![0u8; 15])) {
        Err(Error::Conversion { attribute, .. }) => assert_eq!(attribute, "objectGUID"),
        other => panic!("Expected Conversion error, got {other:?}"),
    }
}

#[test]
fn test_sid_conversion_from_binary_and_string() {
    let mut bytes = vec![1, 2, 0, 0, 0, 0, 0, 5];
    bytes.extend_from_slice(&32u32.to_le_bytes());
    bytes.extend_from_slice(&544u32.to_le_bytes());

    let from_binary = Conversion::Sid
        .apply("objectSid", &RawValue::binary(bytes))
        .unwrap()
        .unwrap();
    let from_string = Conversion::Sid
        .apply("objectSid", &RawValue::from("S-1-5-32-544"))
        .unwrap()
        .unwrap();
    assert_eq!(from_binary, from_string);
    assert_eq!(from_binary.as_sid().unwrap().rid(), Some(544));

    let sid = SecurityIdentifier::new(1, 5, vec![18]);
    assert_eq!(sid.to_string(), "S-1-5-18");
    assert_eq!(SecurityIdentifier::from_bytes(&sid.to_bytes()).unwrap(), sid);
}

#[test]
fn test_group_type_flags_from_negative_reading() {
    let value = Conversion::Flags(&GROUP_TYPES)
        .apply("groupType", &RawValue::Integer(-2147483644))
        .unwrap()
        .unwrap();
    assert_eq!(
        value.as_flags().unwrap(),
        &BTreeSet::from(["DOMAIN_LOCAL_GROUP", "LOCAL_GROUP", "SECURITY_ENABLED"])
    );
}

#[test]
fn test_enum_name_and_unknown_value() {
    assert_eq!(SAM_ACCOUNT_TYPES.name(0x3000_0002).unwrap(), "SAM_TRUST_ACCOUNT");
    assert_eq!(SAM_ACCOUNT_TYPES.number("SAM_DOMAIN_OBJECT"), Some(0));

    match Conversion::EnumName(&SAM_ACCOUNT_TYPES).apply("sAMAccountType", &RawValue::Integer(-5)) {
        Err(Error::UnknownEnumValue { mapping, value }) => {
            assert_eq!(mapping, "SAM_ACCOUNT_TYPES");
            assert_eq!(value, -5);
        }
        other => panic!("Expected UnknownEnumValue, got {other:?}"),
    }
}

#[test]
fn test_registries_round_trip_every_name() {
    for (name, number) in USER_ACCOUNT_CONTROL.items() {
        assert!(USER_ACCOUNT_CONTROL.flag_names(number).contains(name));
    }
    for (name, number) in AUTHENTICATION_TYPES.items() {
        assert!(AUTHENTICATION_TYPES.contains(number, name));
    }
    assert!(AUTHENTICATION_TYPES.flag_names(0x2).contains("USE_SSL"));
    assert_eq!(to_unsigned(-1).unwrap(), u32::MAX);
}

#[test]
fn test_values_normalizes_scalar_and_sequence() {
    assert!(values(None).is_empty());
    let scalar = Value::from("only");
    assert_eq!(values(Some(&scalar)), vec![&scalar]);
    let list = Value::List(vec![Value::from(1_i64), Value::from(2_i64)]);
    assert_eq!(values(Some(&list)).len(), 2);
}
