//! Init-data signature checks.

use dribbling_server::auth::{TelegramUser, TokenVerifier, VerifyError};
use dribbling_server::auth::verifier::{canonical_string, parse_fields};

const BOT_TOKEN: &str = "123456:TEST-TOKEN";
const USER_JSON: &str = r#"{"id":42,"first_name":"Ali","username":"ali"}"#;

fn signed_payload() -> String {
    TokenVerifier::new(BOT_TOKEN).sign(&[
        ("query_id", "AAH"),
        ("user", USER_JSON),
        ("auth_date", "1700000000"),
    ])
}

#[test]
fn matches_known_signature() {
    let verifier = TokenVerifier::new(BOT_TOKEN);
    let dcs = format!("auth_date=1700000000\nquery_id=AAH\nuser={USER_JSON}");
    assert_eq!(
        verifier.signature(&dcs),
        "363e603772438169c4ecabcac5ff4c7c327cbd609cf2764a60486e3c3c92a810"
    );
}

#[test]
fn valid_payload_yields_user() {
    let user = TokenVerifier::new(BOT_TOKEN)
        .verify(&signed_payload())
        .expect("payload should verify");
    assert_eq!(
        user,
        TelegramUser {
            id: 42,
            first_name: "Ali".into(),
            username: Some("ali".into()),
            photo_url: None,
        }
    );
}

#[test]
fn recomputed_signature_equals_hash() {
    let payload = signed_payload();
    let mut fields = parse_fields(&payload);
    let hash = fields.remove("hash").unwrap();
    let verifier = TokenVerifier::new(BOT_TOKEN);
    assert_eq!(verifier.signature(&canonical_string(&fields)), hash);
}

#[test]
fn any_single_character_flip_invalidates() {
    let verifier = TokenVerifier::new(BOT_TOKEN);
    let payload = signed_payload();
    for (i, c) in payload.char_indices() {
        let replacement = if c == 'x' { "y" } else { "x" };
        let mut tampered = payload.clone();
        tampered.replace_range(i..i + c.len_utf8(), replacement);
        assert!(
            verifier.verify(&tampered).is_err(),
            "flip at {i} ({c:?}) still verified"
        );
    }
}

#[test]
fn wrong_token_is_bad_signature() {
    let err = TokenVerifier::new("other-token")
        .verify(&signed_payload())
        .unwrap_err();
    assert_eq!(err, VerifyError::BadSignature);
}

#[test]
fn missing_hash() {
    let err = TokenVerifier::new(BOT_TOKEN)
        .verify("auth_date=1&user={}")
        .unwrap_err();
    assert_eq!(err, VerifyError::MissingHash);
    assert_eq!(
        TokenVerifier::new(BOT_TOKEN).verify("").unwrap_err(),
        VerifyError::MissingHash
    );
}

#[test]
fn garbage_hash_is_bad_signature() {
    let v = TokenVerifier::new(BOT_TOKEN);
    assert_eq!(
        v.verify("auth_date=1&hash=zz").unwrap_err(),
        VerifyError::BadSignature
    );
}

#[test]
fn uppercase_hash_is_rejected() {
    let payload = signed_payload();
    let (head, hash) = payload.rsplit_once("hash=").unwrap();
    let upper = format!("{head}hash={}", hash.to_ascii_uppercase());
    assert_eq!(
        TokenVerifier::new(BOT_TOKEN).verify(&upper).unwrap_err(),
        VerifyError::BadSignature
    );
}

#[test]
fn signed_without_user_is_missing_user() {
    let v = TokenVerifier::new(BOT_TOKEN);
    let payload = v.sign(&[("auth_date", "1700000000")]);
    assert_eq!(v.verify(&payload).unwrap_err(), VerifyError::MissingUser);
}

#[test]
fn signed_garbage_user_is_malformed() {
    let v = TokenVerifier::new(BOT_TOKEN);
    let payload = v.sign(&[("auth_date", "1700000000"), ("user", "{not json")]);
    assert!(matches!(
        v.verify(&payload).unwrap_err(),
        VerifyError::MalformedUser(_)
    ));
}

#[test]
fn duplicate_keys_overwrite_and_sort_bytewise() {
    let fields = parse_fields("b=2&a=1&B=3&a=9&novalue&c=x=y");
    assert_eq!(canonical_string(&fields), "B=3\na=9\nb=2\nc=x=y");
}
