use super::*;

fn base() -> Config {
    Config {
        port: 8080,
        host: "0.0.0.0".into(),
        jwt_secret: None,
        db_path: ":memory:".into(),
        modules_dir: None,
        ssh_host_key_policy: "trust-on-first-use".into(),
        ssh_known_hosts: None,
        ai_driver: "none".into(),
        ai_base_url: None,
        ai_model: None,
        ai_api_key_env: None,
        hunt_concurrency: 1,
        default_step_timeout_secs: 30,
        log_format: "json".into(),
        log_level: "info".into(),
        auth_username: "admin".into(),
        auth_password: "admin".into(),
        access_token_ttl_secs: 900,
        refresh_token_ttl_secs: 604_800,
    }
}

#[test]
fn default_config_validates() {
    assert!(base().validate().is_ok());
}

#[test]
fn pinned_policy_requires_known_hosts() {
    let mut cfg = base();
    cfg.ssh_host_key_policy = "pinned".into();
    assert!(cfg.validate().is_err());
    cfg.ssh_known_hosts = Some("/etc/huntd/known_hosts".into());
    assert!(cfg.validate().is_ok());
}

#[test]
fn ai_driver_requires_model_and_key_env() {
    let mut cfg = base();
    cfg.ai_driver = "anthropic".into();
    assert!(cfg.validate().is_err());
    cfg.ai_model = Some("claude-sonnet".into());
    assert!(cfg.validate().is_err());
    cfg.ai_api_key_env = Some("ANTHROPIC_API_KEY".into());
    assert!(cfg.validate().is_ok());
}

#[test]
fn ollama_does_not_require_key_env() {
    let mut cfg = base();
    cfg.ai_driver = "ollama".into();
    cfg.ai_model = Some("llama3".into());
    assert!(cfg.validate().is_ok());
}

#[test]
fn zero_hunt_concurrency_rejected() {
    let mut cfg = base();
    cfg.hunt_concurrency = 0;
    assert!(cfg.validate().is_err());
}
