use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("cachetrigger.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Complete configuration pointing at the given admin and cache services,
/// with the credential descriptor placed in `dir`.
#[allow(dead_code)]
pub fn config_yaml(dir: &Path, admin_url: &str, cache_url: &str) -> String {
    format!(
        r#"
topic: api
trigger_message: refresh_cache
kafka:
  brokers: "127.0.0.1:1"
  username: token
  password: s3cret
  credentials_path: "{}"
  connect_timeout_seconds: 1
admin:
  url: "{}"
  api_key: abc123
  partitions: 1
  timeout_seconds: 5
cache:
  refresh_url: "{}"
logging:
  level: warn
"#,
        dir.join("jaas.conf").display(),
        admin_url,
        cache_url
    )
}
