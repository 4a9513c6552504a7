//! Email address shape tests

use tipline_core::{EmailAddress, Error};

/// Test: ordinary addresses are accepted
#[test]
fn test_accepts_well_formed_addresses() {
    for raw in [
        "alice@gratipay.com",
        "alice@gratipay.co.uk",
        "alice+tag@example.museum",
        "foo'bar@example.com",
    ] {
        let addr = EmailAddress::parse(raw).expect(raw);
        assert_eq!(addr.as_str(), raw);
    }
}

/// Test: an address without `@` is malformed
#[test]
fn test_rejects_missing_at_symbol() {
    let err = EmailAddress::parse("gratipay.com").unwrap_err();
    assert_eq!(err, Error::MalformedAddress("gratipay.com".to_string()));
}

/// Test: a domain without a period is malformed
#[test]
fn test_rejects_domain_without_period() {
    assert!(matches!(
        EmailAddress::parse("test@gratipay"),
        Err(Error::MalformedAddress(_))
    ));
}

/// Test: empty local part and embedded whitespace are malformed
#[test]
fn test_rejects_other_shapes() {
    assert!(EmailAddress::parse("").is_err());
    assert!(EmailAddress::parse("@example.com").is_err());
    assert!(EmailAddress::parse("al ice@example.com").is_err());
}

/// Test: addresses deserialize through the same checks
#[test]
fn test_deserialize_validates() {
    let ok: EmailAddress = serde_json::from_str("\"alice@example.com\"").unwrap();
    assert_eq!(ok.domain(), "example.com");

    let bad: Result<EmailAddress, _> = serde_json::from_str("\"alice@example\"");
    assert!(bad.is_err());
}
