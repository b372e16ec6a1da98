use loginstress::engine::credentials::{parse_line, CredentialError};
use loginstress::{load_credentials, parse_credentials, Credential};
use std::io::Write;

#[test]
fn test_single_colon_line_splits_identity_and_secret() {
    assert_eq!(
        parse_line("alice:s3cret"),
        Some(Credential::new("alice", "s3cret"))
    );
    // Empty halves are still exactly one delimiter.
    assert_eq!(parse_line("bob:"), Some(Credential::new("bob", "")));
}

#[test]
fn test_zero_or_many_colons_are_discarded() {
    assert_eq!(parse_line("no-delimiter-here"), None);
    assert_eq!(parse_line("carol:pass:extra"), None);
    assert_eq!(parse_line("::"), None);
    assert_eq!(parse_line(""), None);
}

#[test]
fn test_parse_keeps_order_and_reports_skipped_lines() {
    let content = "alice:one\nbroken\n  bob:two  \ncarol:a:b\n\ndave:three\n";
    let parsed = parse_credentials(content);

    let names: Vec<&str> = parsed
        .credentials
        .iter()
        .map(|c| c.username.as_str())
        .collect();
    assert_eq!(names, vec!["alice", "bob", "dave"]);
    assert_eq!(parsed.credentials[1].password, "two");
    assert_eq!(parsed.skipped, vec![2, 4, 5]);
}

#[test]
fn test_debug_output_redacts_password() {
    let rendered = format!("{:?}", Credential::new("alice", "hunter2"));
    assert!(rendered.contains("alice"));
    assert!(!rendered.contains("hunter2"));
}

#[tokio::test]
async fn test_load_credentials_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "alice:one").unwrap();
    writeln!(file, "not valid").unwrap();
    writeln!(file, "bob:two").unwrap();

    let parsed = load_credentials(file.path()).await.unwrap();
    assert_eq!(parsed.credentials.len(), 2);
    assert_eq!(parsed.skipped, vec![2]);
}

#[tokio::test]
async fn test_missing_credential_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("credentials.txt");

    let err = load_credentials(&missing).await.unwrap_err();
    assert!(matches!(err, CredentialError::Io { .. }));
}
