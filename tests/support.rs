use std::ffi::OsString;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, OnceLock};

use tempfile::TempDir;

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

/// Every variable the bridge reads; cleared for each test so the host environment never leaks in.
const MANAGED_VARS: &[&str] = &[
    "OAUTH_BRIDGE_CONFIG",
    "HOST",
    "PORT",
    "PUBLIC_BASE_URL",
    "STATIC_DIR",
    "HTTP_TIMEOUT_SECS",
    "GCP_PROJECT_ID",
    "BQ_DATASET",
    "BQ_TABLE",
    "GCP_SERVICE_ACCOUNT_JSON",
    "GOOGLE_APPLICATION_CREDENTIALS",
    "SAGE_AUTH_URL",
    "SAGE_TOKEN_URL",
    "SAGE_CLIENT_ID",
    "SAGE_CLIENT_SECRET",
    "SAGE_SCOPE",
    "EBAY_AUTH_URL",
    "EBAY_TOKEN_URL",
    "EBAY_CLIENT_ID",
    "EBAY_CLIENT_SECRET",
    "EBAY_REDIRECT_URI",
    "EBAY_SCOPE",
    "AMZ_AUTH_URL",
    "AMZ_TOKEN_URL",
    "AMZ_CLIENT_ID",
    "AMZ_CLIENT_SECRET",
    "AMZ_REDIRECT_URI",
    "AMZ_SCOPE",
];

fn env_lock() -> MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
struct EnvRestore {
    saved: Vec<(&'static str, Option<OsString>)>,
}

impl EnvRestore {
    fn save_once(&mut self, key: &'static str) {
        if self.saved.iter().any(|(k, _)| *k == key) {
            return;
        }
        self.saved.push((key, std::env::var_os(key)));
    }

    fn set_var(&mut self, key: &'static str, value: impl Into<OsString>) {
        self.save_once(key);
        std::env::set_var(key, value.into());
    }

    fn remove_var(&mut self, key: &'static str) {
        self.save_once(key);
        std::env::remove_var(key);
    }
}

impl Drop for EnvRestore {
    fn drop(&mut self) {
        for (key, value) in self.saved.drain(..).rev() {
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
    }
}

/// Serialized access to the process environment with every bridge variable unset.
pub struct TestEnv {
    _lock: MutexGuard<'static, ()>,
    env: EnvRestore,
    dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        let lock = env_lock();
        let dir = tempfile::tempdir().expect("tempdir");
        let mut env = EnvRestore::default();
        for key in MANAGED_VARS {
            env.remove_var(key);
        }
        Self {
            _lock: lock,
            env,
            dir,
        }
    }

    pub fn set(&mut self, key: &'static str, value: impl Into<OsString>) {
        self.env.set_var(key, value);
    }

    /// Write `contents` to a file in the test's scratch directory.
    pub fn write_file(&self, name: &str, contents: &str) -> std::path::PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, contents).expect("write file");
        path
    }

    #[allow(dead_code)]
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(dead_code)]
pub fn json_str<'a>(value: &'a serde_json::Value, key: &str) -> &'a str {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_else(|| panic!("missing string field {key} in {value}"))
}
