use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use ab_domain::config::{Config, ConfigSeverity};
use ab_domain::settings::{LlmFamilySettings, Settings};
use ab_gateway::clients::ClientRegistry;
use ab_gateway::link;
use ab_gateway::session_lock::SessionLockMap;
use ab_gateway::state::AppState;
use ab_pending::PendingCallRegistry;
use ab_providers::{EnvKeyStore, ProviderGateway};
use ab_sessions::SessionStore;
use ab_tools::{tool_definitions, OutboundSink, ToolExecutor};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let (config, config_path) = load_config()?;
    run_server(Arc::new(config), &config_path).await
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,ab_gateway=debug")))
        .json()
        .init();
}

fn load_config() -> anyhow::Result<(Config, String)> {
    let config_path = std::env::var("AB_CONFIG").unwrap_or_else(|_| "config.toml".into());

    let config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path).with_context(|| format!("reading {config_path}"))?;
        toml::from_str(&raw).with_context(|| format!("parsing {config_path}"))?
    } else {
        Config::default()
    };

    Ok((config, config_path))
}

/// A `Settings` bundle seeded from the config's registered providers, used
/// until the frontend sends its own `settings_sync`. The first registered
/// provider covers "general"; the second (if any) covers "tactical",
/// falling back to the first when only one provider is configured.
fn default_settings(config: &Config) -> Settings {
    let family_from = |provider_id: &str, model: Option<&str>| LlmFamilySettings {
        provider: provider_id.to_string(),
        model: model.unwrap_or("gpt-4o").to_string(),
        base_url: None,
        api_version: None,
        timeout_sec: 30,
        max_retries: 2,
        custom_headers: Default::default(),
    };

    let general = config
        .llm
        .providers
        .first()
        .map(|p| family_from(&p.id, p.default_model.as_deref()))
        .unwrap_or_else(|| family_from("openai", Some("gpt-4o")));
    let tactical = config
        .llm
        .providers
        .get(1)
        .map(|p| family_from(&p.id, p.default_model.as_deref()))
        .unwrap_or_else(|| general.clone());

    Settings {
        general,
        tactical,
        maximum_message_context: 20,
        ai_role: "You are an assistant helping run a tabletop session.".into(),
        chat_processing_mode: None,
    }
}

async fn run_server(config: Arc<Config>, config_path: &str) -> anyhow::Result<()> {
    tracing::info!(config_path = %config_path, "ab-gateway starting");

    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues.iter().filter(|i| i.severity == ConfigSeverity::Error).count()
        );
    }

    let providers = Arc::new(ProviderGateway::new(&config.llm, Arc::new(EnvKeyStore))?);
    let sessions = Arc::new(SessionStore::new(
        config.sessions.idle_timeout_minutes,
        config.sessions.chars_per_token,
        config.sessions.default_token_budget,
    ));
    let collector = Arc::new(ab_collector::MessageCollector::new(config.collector.clone()));
    let pending = Arc::new(PendingCallRegistry::new());
    let clients = Arc::new(ClientRegistry::new());
    let tools = Arc::new(ToolExecutor::new(
        pending.clone(),
        collector.clone(),
        clients.clone() as Arc<dyn OutboundSink>,
        config.tools.clone(),
    ));

    let state = Arc::new(AppState {
        config: config.clone(),
        providers,
        tool_definitions: Arc::new(tool_definitions()),
        sessions: sessions.clone(),
        session_locks: Arc::new(SessionLockMap::new()),
        collector,
        pending,
        tools,
        clients,
        settings: Arc::new(parking_lot::RwLock::new(default_settings(&config))),
    });

    let cleanup_interval = std::time::Duration::from_secs(config.sessions.cleanup_interval_minutes * 60);
    let cleanup_sessions = sessions.clone();
    let cleanup_locks = state.session_locks.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(cleanup_interval);
        loop {
            ticker.tick().await;
            let evicted = cleanup_sessions.auto_evict();
            cleanup_locks.prune_idle();
            if evicted > 0 {
                tracing::info!(evicted, "session cleanup sweep");
            }
        }
    });

    let app = link::router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.with_context(|| format!("binding to {addr}"))?;
    tracing::info!(addr = %addr, "listening");

    axum::serve(listener, app).await.context("axum server error")?;

    Ok(())
}
