//! Usage: Process settings (defaults, optional TOML file, environment overrides).
//!
//! Built once at startup and handed to every component; nothing here is global.

use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_STATIC_DIR: &str = "public";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_DATASET: &str = "etl_tokens";
pub const DEFAULT_TABLE: &str = "oauth_tokens";
pub const CONFIG_PATH_ENV: &str = "OAUTH_BRIDGE_CONFIG";

const SAGE_DEFAULT_AUTH_URL: &str = "https://oauth.accounting.sage.com/authorize";
const SAGE_DEFAULT_TOKEN_URL: &str = "https://oauth.accounting.sage.com/token";
const SAGE_DEFAULT_SCOPE: &str = "full_access";

/// Reads one named configuration value. Set-but-empty values must come back as `None`.
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderSettings {
    pub auth_url: String,
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    /// `None` means "derive from the public base URL".
    pub redirect_uri: Option<String>,
    pub scope: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvidersSettings {
    pub sage: ProviderSettings,
    pub ebay: ProviderSettings,
    pub amazon: ProviderSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarehouseSettings {
    pub project_id: Option<String>,
    pub dataset: String,
    pub table: String,
}

impl WarehouseSettings {
    /// `dataset.table`, as shown on the confirmation page.
    pub fn table_label(&self) -> String {
        format!("{}.{}", self.dataset, self.table)
    }
}

impl Default for WarehouseSettings {
    fn default() -> Self {
        Self {
            project_id: None,
            dataset: DEFAULT_DATASET.to_string(),
            table: DEFAULT_TABLE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub public_base_url: String,
    pub static_dir: PathBuf,
    pub http_timeout_secs: u64,
    pub warehouse: WarehouseSettings,
    pub providers: ProvidersSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            public_base_url: format!("http://localhost:{DEFAULT_PORT}"),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            warehouse: WarehouseSettings::default(),
            providers: ProvidersSettings {
                sage: ProviderSettings {
                    auth_url: SAGE_DEFAULT_AUTH_URL.to_string(),
                    token_url: SAGE_DEFAULT_TOKEN_URL.to_string(),
                    scope: SAGE_DEFAULT_SCOPE.to_string(),
                    ..ProviderSettings::default()
                },
                ebay: ProviderSettings::default(),
                amazon: ProviderSettings::default(),
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileProviderSettings {
    auth_url: Option<String>,
    token_url: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    redirect_uri: Option<String>,
    scope: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileProviders {
    sage: FileProviderSettings,
    ebay: FileProviderSettings,
    amazon: FileProviderSettings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileSettings {
    host: Option<String>,
    port: Option<u16>,
    public_base_url: Option<String>,
    static_dir: Option<PathBuf>,
    http_timeout_secs: Option<u64>,
    project_id: Option<String>,
    dataset: Option<String>,
    table: Option<String>,
    providers: FileProviders,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn read_file_settings(path: &Path) -> Option<FileSettings> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            tracing::error!(path = %path.display(), "settings file unreadable, ignoring: {err}");
            return None;
        }
    };
    match toml::from_str::<FileSettings>(&raw) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            tracing::error!(path = %path.display(), "settings file invalid, ignoring: {err}");
            None
        }
    }
}

fn apply_provider_file(target: &mut ProviderSettings, file: FileProviderSettings) {
    if let Some(v) = non_empty(file.auth_url) {
        target.auth_url = v;
    }
    if let Some(v) = non_empty(file.token_url) {
        target.token_url = v;
    }
    if let Some(v) = non_empty(file.client_id) {
        target.client_id = v;
    }
    if let Some(v) = non_empty(file.client_secret) {
        target.client_secret = v;
    }
    if let Some(v) = non_empty(file.redirect_uri) {
        target.redirect_uri = Some(v);
    }
    if let Some(v) = non_empty(file.scope) {
        target.scope = v;
    }
}

fn apply_file(settings: &mut Settings, file: FileSettings) -> bool {
    let mut public_base_url_set = false;
    if let Some(v) = non_empty(file.host) {
        settings.host = v;
    }
    if let Some(v) = file.port {
        settings.port = v;
    }
    if let Some(v) = non_empty(file.public_base_url) {
        settings.public_base_url = v;
        public_base_url_set = true;
    }
    if let Some(v) = file.static_dir {
        settings.static_dir = v;
    }
    if let Some(v) = file.http_timeout_secs {
        settings.http_timeout_secs = v;
    }
    if let Some(v) = non_empty(file.project_id) {
        settings.warehouse.project_id = Some(v);
    }
    if let Some(v) = non_empty(file.dataset) {
        settings.warehouse.dataset = v;
    }
    if let Some(v) = non_empty(file.table) {
        settings.warehouse.table = v;
    }
    apply_provider_file(&mut settings.providers.sage, file.providers.sage);
    apply_provider_file(&mut settings.providers.ebay, file.providers.ebay);
    apply_provider_file(&mut settings.providers.amazon, file.providers.amazon);
    public_base_url_set
}

fn parse_or_warn<T: std::str::FromStr>(key: &str, raw: &str, current: T) -> T {
    match raw.parse::<T>() {
        Ok(v) => v,
        Err(_) => {
            tracing::warn!(key, value = raw, "invalid numeric setting, keeping previous value");
            current
        }
    }
}

struct ProviderEnvKeys {
    auth_url: &'static str,
    token_url: &'static str,
    client_id: &'static str,
    client_secret: &'static str,
    redirect_uri: Option<&'static str>,
    scope: &'static str,
}

const SAGE_ENV: ProviderEnvKeys = ProviderEnvKeys {
    auth_url: "SAGE_AUTH_URL",
    token_url: "SAGE_TOKEN_URL",
    client_id: "SAGE_CLIENT_ID",
    client_secret: "SAGE_CLIENT_SECRET",
    redirect_uri: None,
    scope: "SAGE_SCOPE",
};

const EBAY_ENV: ProviderEnvKeys = ProviderEnvKeys {
    auth_url: "EBAY_AUTH_URL",
    token_url: "EBAY_TOKEN_URL",
    client_id: "EBAY_CLIENT_ID",
    client_secret: "EBAY_CLIENT_SECRET",
    redirect_uri: Some("EBAY_REDIRECT_URI"),
    scope: "EBAY_SCOPE",
};

const AMAZON_ENV: ProviderEnvKeys = ProviderEnvKeys {
    auth_url: "AMZ_AUTH_URL",
    token_url: "AMZ_TOKEN_URL",
    client_id: "AMZ_CLIENT_ID",
    client_secret: "AMZ_CLIENT_SECRET",
    redirect_uri: Some("AMZ_REDIRECT_URI"),
    scope: "AMZ_SCOPE",
};

fn apply_provider_env(target: &mut ProviderSettings, keys: &ProviderEnvKeys, lookup: EnvLookup) {
    if let Some(v) = lookup(keys.auth_url) {
        target.auth_url = v;
    }
    if let Some(v) = lookup(keys.token_url) {
        target.token_url = v;
    }
    if let Some(v) = lookup(keys.client_id) {
        target.client_id = v;
    }
    if let Some(v) = lookup(keys.client_secret) {
        target.client_secret = v;
    }
    if let Some(v) = keys.redirect_uri.and_then(|key| lookup(key)) {
        target.redirect_uri = Some(v);
    }
    if let Some(v) = lookup(keys.scope) {
        target.scope = v;
    }
}

impl Settings {
    /// Load from the real process environment.
    pub fn load() -> Self {
        Self::from_lookup(&process_env)
    }

    /// Defaults, then the TOML file named by `OAUTH_BRIDGE_CONFIG`, then env values.
    pub fn from_lookup(lookup: EnvLookup) -> Self {
        let mut settings = Settings::default();
        let mut public_base_url_set = false;

        if let Some(path) = lookup(CONFIG_PATH_ENV) {
            if let Some(file) = read_file_settings(Path::new(&path)) {
                public_base_url_set = apply_file(&mut settings, file);
            }
        }

        if let Some(v) = lookup("HOST") {
            settings.host = v;
        }
        if let Some(v) = lookup("PORT") {
            settings.port = parse_or_warn("PORT", &v, settings.port);
        }
        if let Some(v) = lookup("PUBLIC_BASE_URL") {
            settings.public_base_url = v;
            public_base_url_set = true;
        }
        if !public_base_url_set {
            settings.public_base_url = format!("http://localhost:{}", settings.port);
        }
        settings.public_base_url = settings.public_base_url.trim_end_matches('/').to_string();

        if let Some(v) = lookup("STATIC_DIR") {
            settings.static_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("HTTP_TIMEOUT_SECS") {
            settings.http_timeout_secs =
                parse_or_warn("HTTP_TIMEOUT_SECS", &v, settings.http_timeout_secs);
        }
        if let Some(v) = lookup("GCP_PROJECT_ID") {
            settings.warehouse.project_id = Some(v);
        }
        if let Some(v) = lookup("BQ_DATASET") {
            settings.warehouse.dataset = v;
        }
        if let Some(v) = lookup("BQ_TABLE") {
            settings.warehouse.table = v;
        }

        apply_provider_env(&mut settings.providers.sage, &SAGE_ENV, lookup);
        apply_provider_env(&mut settings.providers.ebay, &EBAY_ENV, lookup);
        apply_provider_env(&mut settings.providers.amazon, &AMAZON_ENV, lookup);

        settings
    }
}
