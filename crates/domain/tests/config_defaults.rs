use ab_domain::Config;

#[test]
fn empty_toml_document_loads_all_defaults() {
    let cfg: Config = toml::from_str("").expect("empty document should use all defaults");
    assert_eq!(cfg.server.port, 8787);
    assert_eq!(cfg.sessions.idle_timeout_minutes, 20_160);
    assert_eq!(cfg.tools.roll_dice_timeout_secs, 30);
    assert_eq!(cfg.collector.item_cap, 100);
    assert!(cfg.llm.providers.is_empty());
}

#[test]
fn partial_toml_overrides_only_named_fields() {
    let toml_src = r#"
        [server]
        port = 9000

        [[llm.providers]]
        id = "openai"
        kind = "openai_compat"
        base_url = "https://api.openai.com/v1"

        [llm.providers.auth]
        mode = "api_key"
        env = "OPENAI_API_KEY"
    "#;
    let cfg: Config = toml::from_str(toml_src).expect("valid partial config");
    assert_eq!(cfg.server.port, 9000);
    assert_eq!(cfg.server.host, "127.0.0.1");
    assert_eq!(cfg.llm.providers.len(), 1);
    assert_eq!(cfg.llm.providers[0].id, "openai");

    let issues = cfg.validate();
    let errors: Vec<_> = issues.iter().filter(|e| e.severity == ab_domain::ConfigSeverity::Error).collect();
    assert!(errors.is_empty(), "expected no errors, got: {errors:?}");
}
