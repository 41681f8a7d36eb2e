use std::sync::Arc;

use authlink::auth::storage::{DurableStorage, MemoryStorage};
use authlink::client::AuthlinkClient;
use authlink::config::Config;

/// Builds a [`Config`] whose API points at a mock server.
#[allow(dead_code)]
pub fn mock_config(base_url: &str) -> Config {
    let mut config = Config::default();
    config.api.base_url = base_url.to_string();
    config.api.timeout_seconds = 5;
    config.storage.backend = "memory".to_string();
    config
}

/// Builds a client on in-memory storage pre-populated with `entries`.
///
/// The storage handle is returned too, so tests can inspect what was
/// persisted.
#[allow(dead_code)]
pub fn client_with_entries(
    base_url: &str,
    entries: &[(&str, &str)],
) -> (AuthlinkClient, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::with_entries(entries.iter().copied()));
    let client = AuthlinkClient::with_storage(
        &mock_config(base_url),
        Arc::clone(&storage) as Arc<dyn DurableStorage>,
    )
    .expect("client builds against mock server");
    (client, storage)
}

/// Builds a client holding the `T1`/`R1` session.
#[allow(dead_code)]
pub fn signed_in_client(base_url: &str) -> (AuthlinkClient, Arc<MemoryStorage>) {
    client_with_entries(base_url, &[("access_token", "T1"), ("refresh_token", "R1")])
}

/// Writes `contents` to a config file in a fresh temp dir.
///
/// Keep the returned `TempDir` alive for as long as the file is needed.
#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, contents).expect("write config");
    (dir, path)
}

/// Config file contents pointing file storage at `storage_path`.
#[allow(dead_code)]
pub fn file_storage_config(storage_path: &std::path::Path) -> String {
    format!(
        "api:\n  base_url: http://127.0.0.1:9\nstorage:\n  backend: file\n  path: {}\n",
        storage_path.display()
    )
}
