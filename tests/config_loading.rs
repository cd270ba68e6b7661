//! Integration tests for config loading across all file formats.

use gatehouse::config::model::Config;
use gatehouse::config::sources::builtin::BuiltinSource;
use gatehouse::config::sources::parse_config_str;
use gatehouse::config::validation::validate;
use gatehouse::error::GatewayError;

fn load_example(name: &str) -> String {
    let path = format!("example/{name}");
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("failed to read {path}: {e}"))
}

#[cfg(feature = "yaml")]
#[test]
fn yaml_example_loads_and_validates() {
    let content = load_example("gatehouse.yaml");
    let config = parse_config_str("yaml", &content, "gatehouse.yaml").unwrap();
    validate(&config).unwrap();
    assert_eq!(config.services.len(), 5);
    assert_eq!(config.routes.len(), 6);
    assert_eq!(config.routes_for("video"), 2);
    assert_eq!(config.service("video").unwrap().timeout, Some(30_000));
}

#[cfg(feature = "json")]
#[test]
fn json_example_loads_and_validates() {
    let content = load_example("gatehouse.json");
    let config = parse_config_str("json", &content, "gatehouse.json").unwrap();
    validate(&config).unwrap();
    assert_eq!(config.routes.len(), 6);
}

#[cfg(feature = "toml")]
#[test]
fn toml_example_loads_and_validates() {
    let content = load_example("gatehouse.toml");
    let config = parse_config_str("toml", &content, "gatehouse.toml").unwrap();
    validate(&config).unwrap();
    assert_eq!(config.routes.len(), 6);
}

#[cfg(all(feature = "yaml", feature = "json", feature = "toml"))]
#[test]
fn all_formats_produce_equivalent_configs() {
    let yaml_config = parse_config_str("yaml", &load_example("gatehouse.yaml"), "yaml").unwrap();
    let json_config = parse_config_str("json", &load_example("gatehouse.json"), "json").unwrap();
    let toml_config = parse_config_str("toml", &load_example("gatehouse.toml"), "toml").unwrap();

    for other in [&json_config, &toml_config] {
        assert_eq!(yaml_config.services.len(), other.services.len());
        let yaml_paths: Vec<&str> = yaml_config.routes.iter().map(|r| r.path.as_str()).collect();
        let other_paths: Vec<&str> = other.routes.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(yaml_paths, other_paths);
    }
}

#[test]
fn unsupported_format_returns_error() {
    let result = parse_config_str("xml", "{}", "test.xml");
    assert!(matches!(result, Err(GatewayError::UnsupportedFormat(_))));
}

#[test]
fn empty_tables_fail_validation() {
    let config: Config = serde_json::from_str(r#"{"services": [], "routes": []}"#).unwrap();
    let errors = validate(&config).unwrap_err();
    assert!(errors.len() >= 2);
}

#[test]
fn unknown_fields_are_rejected() {
    let json = r#"{
        "services": [{"name": "auth", "base_url": "http://auth:80", "retries": 3}],
        "routes": []
    }"#;
    assert!(serde_json::from_str::<Config>(json).is_err());
}

#[tokio::test]
async fn env_override_replaces_builtin_base_url() {
    let lookup = |var: &str| match var {
        "AUTH_SERVICE_URL" => Some("http://auth.internal:8080".to_string()),
        "VIDEO_SERVICE_URL" => Some("   ".to_string()),
        _ => None,
    };
    let (config, _) = gatehouse::config::load(&BuiltinSource, lookup).await.unwrap();
    assert_eq!(
        config.service("auth").unwrap().base_url.as_deref(),
        Some("http://auth.internal:8080")
    );
    assert_eq!(
        config.service("video").unwrap().base_url.as_deref(),
        Some("http://localhost:4005")
    );
}

#[tokio::test]
async fn invalid_env_override_blocks_startup() {
    let lookup = |var: &str| (var == "EMOTION_SERVICE_URL").then(|| "ftp://nope".to_string());
    let result = gatehouse::config::load(&BuiltinSource, lookup).await;
    assert!(matches!(result, Err(GatewayError::ConfigValidation { .. })));
}
