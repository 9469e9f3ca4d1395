//! Command implementations for the corpus daemon.
//!
//! Handles:
//! - start: Load config and a fixture, serve the HTTP API until interrupted
//! - search: Run one session against a JSON fixture and print the page
//! - config: Print the effective configuration

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use corpus_search::{
    tokenize_phrase, KeywordContext, OrderByColumn, SearchError, SearchLayer, SearchOrder,
    SearchSession, SearchType, SessionId, SessionSummary,
};
use corpus_session::{SessionError, SessionManager, SessionManagerConfig};
use corpus_types::{AnnotationSearchResult, DocumentId, MetadataFilter, Settings};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use crate::cli::SearchArgs;
use crate::fixture::{Fixture, FixtureExecutor};
use crate::server::{run_server_with_shutdown, AppState};

/// Load settings and apply the global CLI log level override.
pub fn load_settings(config_path: Option<&str>, log_level: Option<&str>) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;
    if let Some(log_level) = log_level {
        settings.log_level = log_level.to_string();
    }
    Ok(settings)
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level. Output goes to stderr so
/// command output on stdout stays machine-readable.
pub fn init_tracing(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}

/// Start the corpus daemon.
///
/// 1. Load configuration (defaults -> file -> env -> CLI)
/// 2. Load the fixture corpus that answers page requests
/// 3. Create the session manager and its cleanup sweeper
/// 4. Serve the HTTP API until SIGINT/SIGTERM
pub async fn start_daemon(
    config_path: Option<&str>,
    log_level_override: Option<&str>,
    fixture_path: &Path,
    port_override: Option<u16>,
    cleanup_interval_override: Option<u64>,
    idle_timeout_override: Option<u64>,
    max_sessions_override: Option<usize>,
) -> Result<()> {
    let mut settings = load_settings(config_path, log_level_override)?;

    if let Some(port) = port_override {
        settings.http_port = port;
    }
    if let Some(secs) = cleanup_interval_override {
        settings.session.cleanup_interval_secs = secs;
    }
    if let Some(secs) = idle_timeout_override {
        settings.session.idle_timeout_secs = secs;
    }
    if let Some(max) = max_sessions_override {
        settings.session.max_sessions = max;
    }
    settings.validate().context("Invalid configuration")?;

    init_tracing(&settings.log_level)?;

    info!("Corpus daemon starting...");
    info!("Configuration:");
    info!("  HTTP address: {}", settings.http_addr());
    info!("  Fixture: {:?}", fixture_path);
    info!(
        "  Cleanup interval: {}s",
        settings.session.cleanup_interval_secs
    );
    info!("  Idle timeout: {}s", settings.session.idle_timeout_secs);
    info!("  Max sessions: {}", settings.session.max_sessions);
    info!("  Log level: {}", settings.log_level);

    let fixture = Fixture::load(fixture_path)?;
    let executor = FixtureExecutor::new(fixture, settings.search.snippet_words);

    let manager = Arc::new(
        SessionManager::new(SessionManagerConfig::from_settings(&settings))
            .context("Failed to create session manager")?,
    );
    let sweeper = manager.clone().spawn_sweeper();

    let listener = TcpListener::bind(settings.http_addr())
        .await
        .with_context(|| format!("Failed to bind {}", settings.http_addr()))?;
    let state = AppState::new(manager.clone(), Arc::new(executor));
    let result = run_server_with_shutdown(listener, state, shutdown_signal()).await;

    sweeper.shutdown().await;
    info!(live_sessions = manager.len(), "Corpus daemon stopped");
    result.context("HTTP server error")
}

fn default_page() -> usize {
    1
}

fn default_layers() -> Vec<SearchLayer> {
    vec![SearchLayer::Fulltext]
}

/// Query of a session, as sent by a client or given on the command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    pub query: String,

    #[serde(default = "default_page")]
    pub page: usize,

    /// Page size; the session keeps its current one when unset
    #[serde(default)]
    pub take: Option<usize>,

    #[serde(default = "default_layers")]
    pub layers: Vec<SearchLayer>,

    #[serde(default)]
    pub order_by: OrderByColumn,

    #[serde(default)]
    pub order: SearchOrder,

    #[serde(default)]
    pub filters: Vec<MetadataFilter>,
}

impl SearchParams {
    fn validate(&self) -> Result<(), SearchError> {
        let problem = if self.layers.is_empty() {
            "at least one search layer is required"
        } else if self.page == 0 {
            "current page must be >= 1"
        } else if self.take == Some(0) {
            "page size must be > 0"
        } else {
            return Ok(());
        };
        Err(SearchError::InvalidConfiguration(problem.to_string()))
    }

    /// Write the query into a session.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::InvalidConfiguration` for page 0, a page size
    /// of 0 or an empty layer set. The session is left unchanged then.
    pub fn apply(&self, session: &mut SearchSession) -> Result<(), SearchError> {
        self.validate()?;

        session.set_search_layers(self.layers.clone())?;
        session.set_current_page_number(self.page)?;
        if let Some(take) = self.take {
            session.set_take(take)?;
        }
        session.set_search_phrase(self.query.clone());
        session.set_search_tokens(tokenize_phrase(&self.query));
        session.set_order_by(self.order_by);
        session.set_order(self.order);
        session.set_metadata_filters(self.filters.clone());
        Ok(())
    }
}

impl From<&SearchArgs> for SearchParams {
    fn from(args: &SearchArgs) -> Self {
        Self {
            query: args.query.clone(),
            page: args.page,
            take: args.take,
            layers: args.layers.clone(),
            order_by: args.order_by,
            order: if args.desc {
                SearchOrder::Desc
            } else {
                SearchOrder::Asc
            },
            filters: args.filters.clone(),
        }
    }
}

/// One document of a rendered result page.
#[derive(Debug, Serialize)]
pub struct PageEntry {
    pub id: DocumentId,
    pub document_id: String,
    pub title: String,
    pub hits: i64,
    pub rank: f32,
    pub snippet: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keyword_in_context: Vec<KeywordContext>,
}

/// A rendered result page, returned by `search` and the HTTP API.
#[derive(Debug, Serialize)]
pub struct SearchReport {
    pub session: SessionSummary,
    pub tokens: String,
    pub documents: Vec<PageEntry>,
    pub named_entities: Vec<AnnotationSearchResult>,
    pub taxa: Vec<AnnotationSearchResult>,
    pub times: Vec<AnnotationSearchResult>,
}

/// Render the current page of a session.
///
/// # Errors
///
/// Returns `SessionError::NotFound` for an unknown id.
pub async fn build_report(
    manager: &SessionManager,
    id: SessionId,
    summary: SessionSummary,
) -> Result<SearchReport, SessionError> {
    manager
        .with_session(id, |session| {
            let documents = session
                .current_page_documents()
                .iter()
                .enumerate()
                .map(|(idx, view)| PageEntry {
                    id: view.document.id,
                    document_id: view.document.document_id.clone(),
                    title: view.document.display_title().to_string(),
                    hits: session.search_hits_of_document(view.document.id),
                    rank: session.possible_rank_of_document_idx(idx),
                    snippet: session.possible_snippet_of_document_idx(idx).map(str::to_string),
                    keyword_in_context: session
                        .keyword_in_context_state()
                        .map(|state| state.contexts_of(view.document.id).to_vec())
                        .unwrap_or_default(),
                })
                .collect();

            SearchReport {
                session: summary,
                tokens: session.search_tokens_as_string(),
                documents,
                named_entities: session.named_entities().to_vec(),
                taxa: session.taxa().to_vec(),
                times: session.times().to_vec(),
            }
        })
        .await
}

/// Run one search session against a fixture.
///
/// The session is created through a manager like any daemon session, and
/// flagged for cleanup once the report is built.
pub async fn execute_search(settings: &Settings, args: &SearchArgs) -> Result<SearchReport> {
    let fixture = Fixture::load(&args.fixture)?;
    let executor = FixtureExecutor::new(fixture, settings.search.snippet_words);

    let manager = SessionManager::new(SessionManagerConfig::from_settings(settings))
        .context("Failed to create session manager")?;

    let params = SearchParams::from(args);
    let id = manager.create_session(SearchType::Default)?;
    manager
        .with_session(id, |session| params.apply(session))
        .await?
        .context("Invalid search parameters")?;

    let summary = manager
        .execute_page(id, &executor)
        .await
        .context("Search failed")?;
    let report = build_report(&manager, id, summary).await?;

    manager.mark_for_cleanup(id).await?;
    manager.sweep().await;

    Ok(report)
}

/// Handle the `search` command.
pub async fn run_search(settings: &Settings, args: &SearchArgs) -> Result<()> {
    let report = execute_search(settings, args).await?;
    let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
    println!("{}", json);
    Ok(())
}

/// Handle the `config` command.
pub fn show_config(settings: &Settings) -> Result<()> {
    let rendered = toml::to_string_pretty(settings).context("Failed to render configuration")?;
    print!("{}", rendered);
    Ok(())
}
