//! Configuration resolution tests
//!
//! Note: Uses serial_test to prevent ENV variable race conditions.
//! Tests that manipulate GALAXY_* variables are marked with #[serial].

use galaxy_common::config::{
    load_toml_config, resolve_config_path, TomlConfig, ENV_CONFIG_PATH, ENV_CONTACT_EMAIL,
    ENV_SERPAPI_KEY,
};
use galaxy_common::Error;
use serial_test::serial;
use std::io::Write;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
#[serial]
fn test_cli_path_overrides_env_path() {
    let cli_file = write_config("[resolver]\nhigh_thresh = 91\n");
    let env_file = write_config("[resolver]\nhigh_thresh = 92\n");
    std::env::set_var(ENV_CONFIG_PATH, env_file.path());

    let resolved = resolve_config_path(Some(cli_file.path())).unwrap();
    assert_eq!(resolved, cli_file.path());

    let config = TomlConfig::load(Some(cli_file.path())).unwrap();
    assert_eq!(config.resolver.high_thresh, 91);

    std::env::remove_var(ENV_CONFIG_PATH);
}

#[test]
#[serial]
fn test_env_path_used_without_cli_argument() {
    let env_file = write_config("[display]\nagency_short_len = 20\n");
    std::env::set_var(ENV_CONFIG_PATH, env_file.path());

    let config = TomlConfig::load(None).unwrap();
    assert_eq!(config.display.agency_short_len, 20);

    std::env::remove_var(ENV_CONFIG_PATH);
}

#[test]
#[serial]
fn test_env_values_override_toml_values() {
    let file = write_config(
        r#"
        [contact]
        email = "toml@example.org"

        [keys]
        serpapi = "toml-key"
        "#,
    );
    std::env::set_var(ENV_CONTACT_EMAIL, "env@example.org");
    std::env::set_var(ENV_SERPAPI_KEY, "env-key");

    let config = TomlConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.contact.email, "env@example.org");
    assert_eq!(config.serpapi_key(), Some("env-key"));

    std::env::remove_var(ENV_CONTACT_EMAIL);
    std::env::remove_var(ENV_SERPAPI_KEY);
}

#[test]
#[serial]
fn test_blank_env_value_is_ignored() {
    let file = write_config("[keys]\nserpapi = \"toml-key\"\n");
    std::env::set_var(ENV_SERPAPI_KEY, "   ");

    let config = TomlConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.serpapi_key(), Some("toml-key"));

    std::env::remove_var(ENV_SERPAPI_KEY);
}

#[test]
fn test_malformed_toml_is_config_error() {
    let file = write_config("[resolver\nhigh_thresh = ");
    let result = load_toml_config(file.path());
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_invalid_thresholds_rejected_on_load() {
    let file = write_config("[resolver]\nhigh_thresh = 70\nmid_thresh = 80\n");
    let result = TomlConfig::load(Some(file.path()));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_empty_file_yields_defaults() {
    let file = write_config("");
    let config = load_toml_config(file.path()).unwrap();
    assert_eq!(config.resolver.max_candidates, 10);
    assert_eq!(config.resolver.max_pages, 2);
    assert_eq!(config.http.timeout_secs, 30);
    assert_eq!(config.display.placeholders, vec!["pending input".to_string()]);
}
