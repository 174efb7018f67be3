use super::*;
use crate::config::HttpTimeouts;
use crate::profile::Role;

const ROW: &str = r#"{
    "id": "6f1c2b0e-1d7a-4c53-9d7e-2a4f1e0b9c11",
    "email": "a@b.com",
    "name": "A",
    "role": "client",
    "status": null,
    "specialty": null,
    "phone": "555-0100",
    "created_at": "2024-05-01T12:00:00.000000+00:00"
}"#;

#[test]
fn parse_rows_reads_profile_columns() {
    let rows = parse_rows(&format!("[{ROW}]")).unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.role, Role::Client);
    assert_eq!(row.name, "A");
    assert_eq!(row.phone.as_deref(), Some("555-0100"));
    assert!(row.status.is_none());
    assert_eq!(row.created_at, "2024-05-01T12:00:00.000000+00:00");
}

#[test]
fn parse_rows_then_single_row_rejects_empty_and_duplicates() {
    assert_eq!(single_row(parse_rows("[]").unwrap()), Err(ProfileError::NotFound));
    let dup = parse_rows(&format!("[{ROW},{ROW}]")).unwrap();
    assert_eq!(single_row(dup), Err(ProfileError::Ambiguous(2)));
}

#[test]
fn parse_rows_unknown_role_is_kept() {
    let json = ROW.replace("\"client\"", "\"manager\"");
    let rows = parse_rows(&format!("[{json}]")).unwrap();
    assert_eq!(rows[0].role, Role::Unknown);
}

#[test]
fn parse_rows_error_object_is_decode_error() {
    let err = parse_rows(r#"{"message":"permission denied"}"#).unwrap_err();
    assert!(matches!(err, ProfileError::Decode(_)));
}

#[tokio::test]
async fn fetch_profile_network_failure_is_retryable() {
    let http = crate::backend::build_http(HttpTimeouts { request_secs: 2, connect_secs: 1 }).unwrap();
    let endpoint = Endpoint { base: "http://127.0.0.1:9".into(), anon_key: "anon".into() };
    let store = HttpProfileStore::new(http, endpoint, SessionCell::default());

    let err = store.fetch_profile(uuid::Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, ProfileError::Network(_)));
    assert!(err.retryable());
}
