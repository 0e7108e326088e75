mod support;

use support::json_str;

#[test]
fn defaults_without_environment() {
    let _env = support::TestEnv::new();
    let settings = oauth_token_bridge_lib::test_support::settings_summary_from_process_env();

    assert_eq!(json_str(&settings, "host"), "0.0.0.0");
    assert_eq!(settings["port"], 3000);
    assert_eq!(json_str(&settings, "public_base_url"), "http://localhost:3000");
    assert_eq!(json_str(&settings, "static_dir"), "public");
    assert_eq!(settings["http_timeout_secs"], 30);
    assert!(settings["project_id"].is_null());
    assert_eq!(json_str(&settings, "table"), "etl_tokens.oauth_tokens");
    assert_eq!(
        json_str(&settings, "sage_auth_url"),
        "https://oauth.accounting.sage.com/authorize"
    );
    assert_eq!(json_str(&settings, "sage_scope"), "full_access");
    assert!(settings["ebay_redirect_uri"].is_null());
    assert_eq!(json_str(&settings, "amazon_client_id"), "");
}

#[test]
fn environment_overrides_defaults() {
    let mut env = support::TestEnv::new();
    env.set("PORT", "8080");
    env.set("BQ_DATASET", "tokens");
    env.set("BQ_TABLE", "rows");
    env.set("GCP_PROJECT_ID", "acme-data");
    env.set("EBAY_REDIRECT_URI", "Acme-Bridge-PRD-RuName");
    env.set("AMZ_CLIENT_ID", "amzn1.application-oa2-client.1");

    let settings = oauth_token_bridge_lib::test_support::settings_summary_from_process_env();
    assert_eq!(settings["port"], 8080);
    assert_eq!(json_str(&settings, "public_base_url"), "http://localhost:8080");
    assert_eq!(json_str(&settings, "table"), "tokens.rows");
    assert_eq!(json_str(&settings, "project_id"), "acme-data");
    assert_eq!(json_str(&settings, "ebay_redirect_uri"), "Acme-Bridge-PRD-RuName");
    assert_eq!(
        json_str(&settings, "amazon_client_id"),
        "amzn1.application-oa2-client.1"
    );
}

#[test]
fn empty_values_count_as_unset() {
    let mut env = support::TestEnv::new();
    env.set("BQ_TABLE", "");
    env.set("SAGE_SCOPE", "  ");

    let settings = oauth_token_bridge_lib::test_support::settings_summary_from_process_env();
    assert_eq!(json_str(&settings, "table"), "etl_tokens.oauth_tokens");
    assert_eq!(json_str(&settings, "sage_scope"), "full_access");
}

#[test]
fn config_file_is_layered_under_environment() {
    let mut env = support::TestEnv::new();
    let path = env.write_file(
        "bridge.toml",
        r#"
port = 4000
public_base_url = "https://bridge.example.com/"
dataset = "file_dataset"

[providers.sage]
scope = "readonly"
"#,
    );
    env.set("OAUTH_BRIDGE_CONFIG", path.into_os_string());
    env.set("BQ_DATASET", "env_dataset");

    let settings = oauth_token_bridge_lib::test_support::settings_summary_from_process_env();
    assert_eq!(settings["port"], 4000);
    assert_eq!(
        json_str(&settings, "public_base_url"),
        "https://bridge.example.com"
    );
    assert_eq!(json_str(&settings, "table"), "env_dataset.oauth_tokens");
    assert_eq!(json_str(&settings, "sage_scope"), "readonly");
}

#[test]
fn unreadable_config_file_falls_back_to_defaults() {
    let mut env = support::TestEnv::new();
    let path = env.write_file("broken.toml", "port = \"not a number");
    env.set("OAUTH_BRIDGE_CONFIG", path.into_os_string());

    let settings = oauth_token_bridge_lib::test_support::settings_summary_from_process_env();
    assert_eq!(settings["port"], 3000);
}
