use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use claudecube::approval::ApprovalCoordinator;
use claudecube::audit::{AuditSink, CostSink};
use claudecube::config;
use claudecube::installer;
use claudecube::llm::{AnthropicClient, LlmClient, ReplyClassifier, ToolCallEvaluator};
use claudecube::multiplexer::traits::MultiplexerAdapter;
use claudecube::pipeline::PipelineDeps;
use claudecube::policy::PolicyStore;
use claudecube::rules::{self, RuleEngine, RulesHandle, RulesWatcher};
use claudecube::session::SessionRegistry;
use claudecube::transcript::TranscriptSummarizer;

#[derive(Parser, Debug)]
#[command(name = "claudecube", about = "Local permission-mediation service for an automated coding agent.")]
struct Cli {
    /// Install the hook bridge into the agent's settings file and exit.
    #[arg(long)]
    install: bool,

    /// Remove the hook bridge from the agent's settings file and exit.
    #[arg(long)]
    uninstall: bool,

    /// Print the running service's session table as JSON and exit.
    #[arg(long)]
    status: bool,

    /// HTTP port to bind (overrides config and `CLAUDECUBE_PORT`).
    #[arg(long)]
    port: Option<u16>,

    /// Path to `config.yaml` (default: `~/.claudecube/config.yaml`).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to `rules.yaml` (default: `~/.claudecube/rules.yaml`).
    #[arg(short, long)]
    rules: Option<PathBuf>,

    /// Increase log verbosity to debug.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.status {
        run_status(cli.port).await;
        return;
    }

    if cli.install {
        run_install(cli.port);
        return;
    }

    if cli.uninstall {
        run_uninstall();
        return;
    }

    claudecube::logging::init(cli.verbose);

    let mut app_config = match &cli.config {
        Some(path) => config::load_config(path).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to load config, using defaults");
            config::AppConfig::default()
        }),
        None => config::load_default_config(),
    };
    if let Some(port) = cli.port {
        app_config.server.port = port;
    }

    let data_dir = config::default_data_dir().unwrap_or_else(|_| PathBuf::from(".claudecube"));
    let rules_path = cli
        .rules
        .or_else(|| std::env::var("CLAUDECUBE_RULES").ok().map(PathBuf::from))
        .unwrap_or_else(|| data_dir.join("rules.yaml"));
    let policies_path = data_dir.join("policies.yaml");
    let audit_dir = data_dir.join("audit");
    let cost_dir = data_dir.join("costs");

    let rules_config = match rules::load_or_init_rules(&rules_path) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "failed to load rules, aborting");
            std::process::exit(1);
        }
    };
    let engine = match RuleEngine::build(&rules_config) {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!(error = %e, "rules file is invalid, aborting");
            std::process::exit(1);
        }
    };
    let rules_handle = RulesHandle::new(engine);
    let _watcher = RulesWatcher::spawn(rules_path.clone(), rules_handle.clone())
        .inspect_err(|e| tracing::warn!(error = %e, "rules watcher failed to start; edits won't hot-reload"))
        .ok();

    let audit = Arc::new(AuditSink::new(audit_dir));
    let cost_sink = Arc::new(CostSink::new(cost_dir));
    let policies = Arc::new(PolicyStore::load(policies_path));

    let multiplexer: Option<Arc<dyn MultiplexerAdapter>> = tmux_adapter();
    let sessions = Arc::new(SessionRegistry::new(multiplexer.clone()));
    sessions.register_from_tmux().await;

    let llm_client: Option<Arc<dyn LlmClient>> = match AnthropicClient::from_env(app_config.escalation.evaluator_model.clone()) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            tracing::warn!(error = %e, "no Anthropic client configured; escalations will go straight to Telegram or time out");
            None
        }
    };

    let evaluator = Arc::new(match &llm_client {
        Some(client) => ToolCallEvaluator::new(client.clone(), app_config.escalation.evaluator_model.clone(), Some(cost_sink.clone())),
        None => ToolCallEvaluator::new(Arc::new(AlwaysUnconfident), "unconfigured".to_owned(), None),
    });
    let summarizer = Arc::new(match &llm_client {
        Some(client) => TranscriptSummarizer::new(client.clone()),
        None => TranscriptSummarizer::new(Arc::new(AlwaysUnconfident)),
    });

    let coordinator = telegram_coordinator(
        &app_config,
        &sessions,
        &multiplexer,
        &llm_client,
        &summarizer,
        &rules_path,
        &cost_sink,
    );

    let deps = Arc::new(PipelineDeps::new(
        rules_handle,
        sessions,
        evaluator,
        policies,
        coordinator,
        summarizer,
        audit,
        app_config.stop.clone(),
    ));

    let router = claudecube::ingress::router(deps);
    let addr = format!("0.0.0.0:{}", app_config.server.port);
    tracing::info!(%addr, "claudecube listening");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %addr, "failed to bind");
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        tracing::error!(error = %e, "server exited with an error");
        std::process::exit(1);
    }
}

#[cfg(feature = "telegram")]
fn telegram_coordinator(
    app_config: &config::AppConfig,
    sessions: &Arc<SessionRegistry>,
    multiplexer: &Option<Arc<dyn MultiplexerAdapter>>,
    llm_client: &Option<Arc<dyn LlmClient>>,
    summarizer: &Arc<TranscriptSummarizer>,
    rules_path: &std::path::Path,
    cost_sink: &Arc<CostSink>,
) -> Option<Arc<ApprovalCoordinator>> {
    use claudecube::channels::telegram::{self, TelegramConfig};

    if !app_config.telegram.enabled {
        return None;
    }
    let bot_token = std::env::var("TELEGRAM_BOT_TOKEN").ok()?;
    let chat_id = std::env::var("TELEGRAM_CHAT_ID").ok()?.parse::<i64>().ok()?;
    let telegram_config = TelegramConfig { bot_token, chat_id, polling_timeout_secs: 30 };

    let chat = Arc::new(telegram::TelegramChatAdapter::new(&telegram_config));
    let reply_classifier = Arc::new(match llm_client {
        Some(client) => ReplyClassifier::new(client.clone())
            .with_cost_sink(app_config.escalation.evaluator_model.clone(), cost_sink.clone()),
        None => ReplyClassifier::new(Arc::new(AlwaysUnconfident)),
    });

    let coordinator = Arc::new(ApprovalCoordinator::new(
        chat,
        sessions.clone(),
        multiplexer.clone(),
        reply_classifier,
        summarizer.clone(),
        rules_path.to_path_buf(),
        app_config.escalation.telegram_timeout_seconds * 1000,
    ));

    let coordinator_clone = coordinator.clone();
    tokio::spawn(telegram::run_polling(telegram_config, coordinator_clone));

    Some(coordinator)
}

#[cfg(not(feature = "telegram"))]
fn telegram_coordinator(
    _app_config: &config::AppConfig,
    _sessions: &Arc<SessionRegistry>,
    _multiplexer: &Option<Arc<dyn MultiplexerAdapter>>,
    _llm_client: &Option<Arc<dyn LlmClient>>,
    _summarizer: &Arc<TranscriptSummarizer>,
    _rules_path: &std::path::Path,
    _cost_sink: &Arc<CostSink>,
) -> Option<Arc<ApprovalCoordinator>> {
    None
}

#[cfg(feature = "tmux")]
fn tmux_adapter() -> Option<Arc<dyn MultiplexerAdapter>> {
    Some(Arc::new(claudecube::multiplexer::TmuxAdapter::new()))
}

#[cfg(not(feature = "tmux"))]
fn tmux_adapter() -> Option<Arc<dyn MultiplexerAdapter>> {
    None
}

/// Stand-in client used when `ANTHROPIC_API_KEY` is unset: always returns a
/// non-confident verdict so the pipeline escalates further instead of
/// silently trusting an unreachable model.
struct AlwaysUnconfident;

#[async_trait::async_trait]
impl LlmClient for AlwaysUnconfident {
    async fn complete(&self, _system: &str, _user_message: &str, _max_tokens: u32) -> Result<(String, claudecube::llm::client::Usage), String> {
        Err("ANTHROPIC_API_KEY is not set".to_owned())
    }
}

fn run_install(port: Option<u16>) {
    let Some(settings_path) = installer::default_settings_path() else {
        eprintln!("could not determine home directory");
        std::process::exit(1);
    };
    let Some(bridge_path) = installer::default_bridge_script_path() else {
        eprintln!("could not determine home directory");
        std::process::exit(1);
    };
    let port = port.unwrap_or_else(|| config::load_default_config().server.port);

    match installer::install(&settings_path, &bridge_path, port) {
        Ok(()) => println!("installed hook bridge into {}", settings_path.display()),
        Err(e) => {
            eprintln!("install failed: {e}");
            std::process::exit(1);
        }
    }
}

fn run_uninstall() {
    let Some(settings_path) = installer::default_settings_path() else {
        eprintln!("could not determine home directory");
        std::process::exit(1);
    };
    match installer::uninstall(&settings_path) {
        Ok(()) => println!("removed hook bridge from {}", settings_path.display()),
        Err(e) => {
            eprintln!("uninstall failed: {e}");
            std::process::exit(1);
        }
    }
}

async fn run_status(port: Option<u16>) {
    let port = port.unwrap_or_else(|| config::load_default_config().server.port);
    let url = format!("http://localhost:{port}/status");
    match reqwest::get(&url).await {
        Ok(response) => match response.text().await {
            Ok(body) => println!("{body}"),
            Err(e) => {
                eprintln!("failed to read response body: {e}");
                std::process::exit(1);
            }
        },
        Err(e) => {
            eprintln!("failed to reach {url}: {e}");
            std::process::exit(1);
        }
    }
}
