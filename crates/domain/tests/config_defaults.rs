use oats_domain::config::Config;

#[test]
fn default_host_is_localhost() {
    let config = Config::default();
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 8080);
}

#[test]
fn explicit_zero_host_parses() {
    let toml_str = r#"
[server]
host = "0.0.0.0"
port = 9090
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 9090);
}

#[test]
fn orchestrator_defaults() {
    let config = Config::default();
    assert_eq!(config.orchestrator.namespace, "default");
    assert_eq!(config.orchestrator.job_ttl_secs, 300);
    assert_eq!(config.orchestrator.hard_deadline_secs, 1800);
}

#[test]
fn partial_orchestrator_section_fills_defaults() {
    let toml_str = r#"
[orchestrator]
namespace = "sre-investigations"
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.orchestrator.namespace, "sre-investigations");
    assert_eq!(config.orchestrator.job_ttl_secs, 300);
}

#[test]
fn llm_section_parses() {
    let toml_str = r#"
[llm]
provider = "anthropic"
model = "claude-sonnet-4-20250514"
temperature = 0.2
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.llm.provider.as_deref(), Some("anthropic"));
    assert_eq!(config.llm.temperature, Some(0.2));
    assert!(config.llm.max_tokens.is_none());
}

#[test]
fn empty_config_parses_to_defaults() {
    let config: Config = toml::from_str("").unwrap();
    assert_eq!(config.investigations.evict_after_secs, 3600);
    assert_eq!(config.investigations.max_turn_budget, 100);
}
