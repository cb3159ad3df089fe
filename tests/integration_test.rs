use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use nameplate::directory::{DirectoryError, DirectorySource};
use nameplate::resolver::AddressResolver;
use nameplate::{resolve_display_name, resolve_with_timeout, ContactSource, DirectoryContact};
use pretty_assertions::assert_eq;

fn sample_contacts() -> Vec<DirectoryContact> {
    vec![
        DirectoryContact {
            address: "alice@example.com".into(),
            display_name: Some("Alice Johnson".into()),
            aliases: vec!["sip:ajohnson@old.example.com".into()],
        },
        DirectoryContact {
            address: "tel:+15551234567".into(),
            display_name: Some("Front Desk".into()),
            aliases: vec![],
        },
        DirectoryContact {
            address: "blank@example.com".into(),
            display_name: Some("".into()),
            aliases: vec![],
        },
    ]
}

#[tokio::test]
async fn resolves_known_address() -> Result<()> {
    let source = DirectorySource::new(sample_contacts());
    let name = resolve_display_name(&source, "alice@example.com").await?;
    assert_eq!(name, Some("Alice Johnson".to_string()));
    Ok(())
}

#[tokio::test]
async fn resolves_scheme_prefixed_and_aliased_addresses() -> Result<()> {
    let source = DirectorySource::new(sample_contacts());

    let name = resolve_display_name(&source, "SIP:Alice@Example.com;transport=tcp").await?;
    assert_eq!(name, Some("Alice Johnson".to_string()));

    let name = resolve_display_name(&source, "ajohnson@old.example.com").await?;
    assert_eq!(name, Some("Alice Johnson".to_string()));

    let name = resolve_display_name(&source, "+15551234567").await?;
    assert_eq!(name, Some("Front Desk".to_string()));
    Ok(())
}

#[tokio::test]
async fn unknown_address_resolves_to_none() -> Result<()> {
    let source = DirectorySource::new(sample_contacts());
    let name = resolve_display_name(&source, "stranger@example.com").await?;
    assert_eq!(name, None);
    Ok(())
}

#[tokio::test]
async fn blank_display_name_is_not_a_resolution() -> Result<()> {
    let source = DirectorySource::new(sample_contacts());
    let name = resolve_display_name(&source, "blank@example.com").await?;
    assert_eq!(name, None);
    Ok(())
}

#[tokio::test]
async fn timeout_variant_still_resolves_fast_lookups() -> Result<()> {
    let source = DirectorySource::new(sample_contacts());
    let name =
        resolve_with_timeout(&source, "alice@example.com", Duration::from_secs(5)).await?;
    assert_eq!(name, Some("Alice Johnson".to_string()));
    Ok(())
}

#[tokio::test]
async fn stopping_before_the_query_starts_yields_no_name() -> Result<()> {
    let source = DirectorySource::new(sample_contacts());
    let resolver = Arc::new(AddressResolver::new("alice@example.com"));
    let query = source.search("alice@example.com").await?;
    resolver.start(query.clone())?;

    resolver.stop();
    query.start();

    assert!(!resolver.is_running());
    assert_eq!(resolver.wait().await, None);
    Ok(())
}

#[tokio::test]
async fn listener_attached_after_completion_is_still_notified() -> Result<()> {
    let source = DirectorySource::new(sample_contacts());
    let query = source.search("alice@example.com").await?;
    query.start();
    // Let the worker drain the directory and signal completion.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let resolver = Arc::new(AddressResolver::new("alice@example.com"));
    resolver.start(query)?;

    // The finished signal must reach the late listener, or wait() hangs.
    let name = tokio::time::timeout(Duration::from_secs(1), resolver.wait()).await?;
    assert!(!resolver.is_running());
    // Results streamed before the resolver attached, so none was captured.
    assert_eq!(name, None);
    Ok(())
}

#[tokio::test]
async fn loads_contacts_from_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("contacts.json");
    let json = r#"[
        {"address": "alice@example.com", "display_name": "Alice Johnson"},
        {"address": "bob@example.com", "display_name": "Bob Smith",
         "aliases": ["sip:bsmith@example.com"]}
    ]"#;
    std::fs::write(&path, json)?;

    let source = DirectorySource::from_file(&path)?;
    assert_eq!(source.len(), 2);

    let name = resolve_display_name(&source, "bsmith@example.com").await?;
    assert_eq!(name, Some("Bob Smith".to_string()));
    Ok(())
}

#[test]
fn missing_contacts_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nonexistent.json");
    match DirectorySource::from_file(&path) {
        Err(DirectoryError::NotFound(p)) => assert_eq!(p, path),
        other => panic!("expected NotFound, got {:?}", other.map(|s| s.len())),
    }
}

#[test]
fn malformed_contacts_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("contacts.json");
    std::fs::write(&path, "not json").unwrap();
    assert!(matches!(
        DirectorySource::from_file(&path),
        Err(DirectoryError::Parse(_))
    ));
}
