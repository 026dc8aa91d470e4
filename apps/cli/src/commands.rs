//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use url::Url;

use evidencer_core::{AcquireConfig, AcquireReport, ProgressReporter, acquire};
use evidencer_fetch::{WebFetchOptions, WebFetcher};
use evidencer_registry::SourceRegistry;
use evidencer_shared::{
    AppConfig, EvidencerError, GithubConfig, SourceEntry, config_file_path, init_config,
    load_config,
};
use evidencer_storage::{DurableStore, GithubOptions, GithubStore, LocalStore};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Evidencer — acquire web sources as content-addressed evidence snapshots.
#[derive(Parser)]
#[command(
    name = "evidencer",
    version,
    about = "Acquire a web source into evidence/parsed/<domain>/ and update the source registry.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run one acquisition against a registered source.
    ///
    /// Exit status: 0 success, 1 failure, 2 blocked by content policy.
    Acquire {
        /// Source URL (defaults to `defaults.source_url` from the config).
        url: Option<String>,

        /// Project root the evidence tree and registry live under.
        #[arg(long)]
        root: Option<PathBuf>,

        /// Write to the local filesystem even if a remote store is available.
        #[arg(long)]
        local: bool,

        /// Disable the rendering-capable parser identity.
        #[arg(long)]
        no_render: bool,
    },

    /// Source registry management.
    Sources {
        #[command(subcommand)]
        action: SourcesAction,
    },

    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Registry subcommands.
#[derive(Subcommand)]
pub(crate) enum SourcesAction {
    /// Register a new source (acquisition runs never do this implicitly).
    Add {
        /// Source URL.
        url: String,

        /// Human-readable name (defaults to the URL hostname).
        #[arg(short, long)]
        name: Option<String>,

        /// Operator notes.
        #[arg(long)]
        notes: Option<String>,
    },
    /// List registered sources with their acquisition history.
    List,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "evidencer=info",
        1 => "evidencer=debug",
        _ => "evidencer=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command and map failures to process exit codes.
pub(crate) async fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Acquire {
            url,
            root,
            local,
            no_render,
        } => cmd_acquire(url.as_deref(), root, local, no_render).await,
        Command::Sources { action } => match action {
            SourcesAction::Add { url, name, notes } => {
                cmd_sources_add(&url, name.as_deref(), notes).await
            }
            SourcesAction::List => cmd_sources_list().await,
        },
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_failure(&err);
            ExitCode::from(err.exit_code())
        }
    }
}

/// Print a failure with remediation guidance for policy blocks.
fn report_failure(err: &EvidencerError) {
    match err {
        EvidencerError::BlockedByPolicy(message) => {
            eprintln!();
            eprintln!("BLOCKED BY CONTENT POLICY");
            eprintln!("  {message}");
            eprintln!();
            eprintln!("Next steps:");
            eprintln!("  1. Annotate the tracking issue with this block");
            eprintln!("  2. Request the domain be added to the allowlist");
            eprintln!("  3. Re-run once the allowlist is updated (do not retry before)");
        }
        _ => eprintln!("error: {err}"),
    }
    tracing::error!(error = %err, "command failed");
}

// ---------------------------------------------------------------------------
// acquire
// ---------------------------------------------------------------------------

async fn cmd_acquire(
    url: Option<&str>,
    root: Option<PathBuf>,
    local: bool,
    no_render: bool,
) -> Result<(), EvidencerError> {
    let config = load_config()?;

    let url_str = url
        .map(str::to_string)
        .or_else(|| config.defaults.source_url.clone())
        .ok_or_else(|| {
            EvidencerError::config(
                "no source URL: pass one as an argument or set defaults.source_url",
            )
        })?;
    let url = Url::parse(&url_str)
        .map_err(|e| EvidencerError::config(format!("invalid URL '{url_str}': {e}")))?;

    let project_root = root.unwrap_or_else(|| PathBuf::from(&config.defaults.project_root));

    println!("Starting acquisition for: {url}");

    // Constructor-time backend selection: remote when available, local
    // filesystem otherwise.
    let store: Box<dyn DurableStore> = if local {
        println!("  using local filesystem (--local)");
        Box::new(LocalStore::new(&project_root))
    } else {
        match github_store(&config.github) {
            Some(github) => {
                println!("  remote storage client initialized");
                Box::new(github)
            }
            None => {
                println!("  remote storage unavailable — using local filesystem");
                Box::new(LocalStore::new(&project_root))
            }
        }
    };

    let fetcher = WebFetcher::new(WebFetchOptions {
        enable_rendering: config.fetch.enable_rendering && !no_render,
        timeout: Duration::from_secs(config.fetch.timeout_secs),
    })?;

    let mut registry =
        SourceRegistry::open(project_root.join(&config.defaults.registry_file))?;

    info!(%url, store = store.name(), "starting acquisition");

    let reporter = CliProgress::new();
    let report = acquire(
        &AcquireConfig { url: url.clone() },
        &fetcher,
        store.as_ref(),
        &mut registry,
        &reporter,
    )
    .await?;

    println!();
    println!("  Acquisition completed successfully!");
    println!("  Source:   {url}");
    println!("  Hash:     {}…", short_hash(&report.content_hash));
    println!("  Parser:   {}", report.parser);
    println!("  Segments: {}", report.segments);
    println!("  Markdown: {} characters", report.markdown_chars);
    println!("  Stored:   {}/ via {}", report.target_dir, report.store);
    println!("  Time:     {:.1}s", report.elapsed.as_secs_f64());
    if !report.warnings.is_empty() {
        println!("  Warnings:");
        for warning in &report.warnings {
            println!("    - {warning}");
        }
    }
    println!();

    Ok(())
}

/// Build the GitHub store when the configured env vars are present.
fn github_store(config: &GithubConfig) -> Option<GithubStore> {
    let token = std::env::var(&config.token_env)
        .ok()
        .filter(|v| !v.is_empty())?;
    let repository = std::env::var(&config.repository_env)
        .ok()
        .filter(|v| !v.is_empty())?;

    match GithubStore::new(GithubOptions {
        token,
        repository,
        branch: config.branch.clone(),
        api_base: config.api_base.clone(),
    }) {
        Ok(store) => Some(store),
        Err(e) => {
            warn!(error = %e, "remote store misconfigured, falling back to local");
            None
        }
    }
}

fn short_hash(hash: &str) -> &str {
    &hash[..hash.len().min(16)]
}

// ---------------------------------------------------------------------------
// sources
// ---------------------------------------------------------------------------

async fn cmd_sources_add(
    url: &str,
    name: Option<&str>,
    notes: Option<String>,
) -> Result<(), EvidencerError> {
    let config = load_config()?;
    let parsed = Url::parse(url)
        .map_err(|e| EvidencerError::config(format!("invalid URL '{url}': {e}")))?;

    let name = name
        .map(str::to_string)
        .unwrap_or_else(|| parsed.host_str().unwrap_or("unknown").to_string());

    let mut entry = SourceEntry::new(name.clone(), parsed.to_string());
    entry.notes = notes;

    let project_root = PathBuf::from(&config.defaults.project_root);
    let mut registry =
        SourceRegistry::open(project_root.join(&config.defaults.registry_file))?;
    registry.add_source(entry)?;

    println!("Registered source '{name}' ({parsed})");
    println!("  registry: {}", registry.path().display());
    Ok(())
}

async fn cmd_sources_list() -> Result<(), EvidencerError> {
    let config = load_config()?;
    let project_root = PathBuf::from(&config.defaults.project_root);
    let registry = SourceRegistry::open(project_root.join(&config.defaults.registry_file))?;

    if registry.list().is_empty() {
        println!("No sources registered.");
        return Ok(());
    }

    for entry in registry.list() {
        println!("{}  {}", entry.name, entry.url);
        match (&entry.last_content_hash, &entry.last_checked) {
            (Some(hash), Some(checked)) => {
                println!("    last checked {} ({}…)", checked.to_rfc3339(), short_hash(hash));
            }
            _ => println!("    never acquired"),
        }
        if let Some(notes) = &entry.notes {
            println!("    notes: {notes}");
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<(), EvidencerError> {
    let path = init_config()?;
    println!("Created config at {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<(), EvidencerError> {
    let config: AppConfig = load_config()?;
    let path = config_file_path()?;
    println!("# resolved from {}", path.display());
    let rendered =
        toml::to_string_pretty(&config).map_err(|e| EvidencerError::config(e.to_string()))?;
    println!("{rendered}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Progress reporter printing stage headers and detail lines around an
/// indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .expect("valid template")
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
        self.spinner.println(format!("» {name}"));
    }

    fn note(&self, line: &str) {
        self.spinner.println(format!("    {line}"));
    }

    fn done(&self, _report: &AcquireReport) {
        self.spinner.finish_and_clear();
    }
}
