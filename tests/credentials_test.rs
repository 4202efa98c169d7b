use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use google_services::{AuthFlow, Config, Error, GoogleServices, InstalledFlow};
use serde_json::json;

#[tokio::test]
async fn test_missing_token_file_means_no_stored_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::default().with_credential_path(dir.path());

    let stored = InstalledFlow.load_stored(&config).await.unwrap();
    assert!(stored.is_none());
}

fn write_client_secret(dir: &Path) {
    let secret = json!({
        "installed": {
            "client_id": "test-client.apps.googleusercontent.com",
            "project_id": "google-services-test",
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": "https://oauth2.googleapis.com/token",
            "client_secret": "test-secret",
            "redirect_uris": ["http://localhost"]
        }
    });
    std::fs::write(dir.join("client_id.json"), secret.to_string()).unwrap();
}

fn write_token(dir: &Path, scopes: &[String]) {
    let token = json!([{
        "scopes": scopes,
        "token": {"access_token": null, "refresh_token": "refresh", "expires_at": null, "id_token": null}
    }]);
    std::fs::write(dir.join("token.json"), token.to_string()).unwrap();
}

#[tokio::test]
async fn test_empty_token_file_returns_promptly() {
    let dir = tempfile::tempdir().unwrap();
    write_client_secret(dir.path());
    std::fs::write(dir.path().join("token.json"), "[]").unwrap();
    let config = Config::default().with_credential_path(dir.path());

    let stored = tokio::time::timeout(Duration::from_secs(5), InstalledFlow.load_stored(&config))
        .await
        .expect("load_stored waited for a consent redirect");
    assert!(stored.unwrap().is_none());
}

#[tokio::test]
async fn test_token_for_other_scopes_is_not_used() {
    let dir = tempfile::tempdir().unwrap();
    write_client_secret(dir.path());
    write_token(dir.path(), &["https://www.googleapis.com/auth/calendar".to_string()]);
    let config = Config::default().with_credential_path(dir.path());

    let stored = tokio::time::timeout(Duration::from_secs(5), InstalledFlow.load_stored(&config))
        .await
        .expect("load_stored waited for a consent redirect");
    assert!(stored.unwrap().is_none());
}

#[tokio::test]
async fn test_corrupt_token_file_is_an_authentication_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("token.json"), "not json").unwrap();
    let config = Config::default().with_credential_path(dir.path());

    let err = InstalledFlow.load_stored(&config).await.err().unwrap();
    assert!(matches!(err, Error::Authentication(_)));
}

#[tokio::test]
async fn test_token_without_client_secret_fails_authentication() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::default().with_credential_path(dir.path());
    write_token(dir.path(), &config.scopes);

    let err = InstalledFlow.load_stored(&config).await.err().unwrap();
    assert!(matches!(err, Error::Authentication(_)));
    assert!(err.to_string().contains("client_id.json"));
}

#[tokio::test]
async fn test_credential_path_must_be_a_directory() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let config = Config::default().with_credential_path(file.path());
    let services = GoogleServices::with_auth_flow(
        config,
        Default::default(),
        Arc::new(InstalledFlow),
    )
    .unwrap();

    let err = services.credentials().await.unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

#[tokio::test]
async fn test_empty_scopes_are_rejected_before_any_flow() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::default()
        .with_credential_path(dir.path())
        .with_scopes(Vec::<String>::new());
    let services = GoogleServices::new(config).unwrap();

    let err = services.drive_service().await.err().unwrap();
    assert!(matches!(err, Error::Configuration(_)));
}
