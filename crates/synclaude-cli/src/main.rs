//! synclaude CLI - launch Claude Code against Synthetic models
//!
//! Picks models from the Synthetic catalog (cached on disk), composes the
//! environment Claude Code needs to talk to the Synthetic endpoint, and hands
//! the terminal over to Claude Code.

mod selector;
mod setup;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use selector::{choose_model, fetch_with_spinner, print_models, SelectionKind};
use setup::SetupWizard;
use synclaude_core::config::ConfigManager;
use synclaude_core::launcher::{Endpoint, LaunchRequest, ProcessLauncher, Tier, TierSelection};
use synclaude_core::models::{preferred_model, HttpCatalogFetcher, ModelCache, ModelCoordinator};
use synclaude_core::tool::{ClaudeCodeManager, ToolStatus};

#[derive(Parser)]
#[command(name = "synclaude")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Launch Claude Code with models from the Synthetic catalog", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Model for every tier without its own override
    #[arg(short, long)]
    model: Option<String>,

    /// Model for extended thinking (unset means no thinking model)
    #[arg(long)]
    thinking_model: Option<String>,

    /// Model for the opus tier
    #[arg(long)]
    opus: Option<String>,

    /// Model for the sonnet tier
    #[arg(long)]
    sonnet: Option<String>,

    /// Model for the haiku tier
    #[arg(long)]
    haiku: Option<String>,

    /// Model for subagents
    #[arg(long)]
    subagent: Option<String>,

    /// Maximum output tokens for Claude Code
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Arguments passed through to Claude Code (after `--`)
    #[arg(last = true)]
    claude_args: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Choose the default model interactively
    Model {
        /// Ignore the cache and fetch the catalog
        #[arg(long)]
        refresh: bool,
    },

    /// Choose the thinking model interactively
    ThinkingModel {
        /// Ignore the cache and fetch the catalog
        #[arg(long)]
        refresh: bool,

        /// Clear the saved thinking model instead
        #[arg(long)]
        clear: bool,
    },

    /// List available models
    Models {
        /// Ignore the cache and fetch the catalog
        #[arg(long)]
        refresh: bool,

        /// Only show models matching this text
        #[arg(long)]
        search: Option<String>,

        /// Print raw model entries as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search models by id or provider
    Search {
        /// Text to look for (case-insensitive)
        query: String,

        /// Ignore the cache and fetch the catalog
        #[arg(long)]
        refresh: bool,
    },

    /// Show or change configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Inspect or clear the model cache
    #[command(subcommand)]
    Cache(CacheCommands),

    /// Run the setup wizard
    Setup,

    /// Check the Claude Code installation and configuration
    Doctor {
        /// Also run `claude update`
        #[arg(long)]
        update: bool,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the current configuration
    Show,

    /// Set a configuration value (use `tiers.<tier>` for tier overrides)
    Set {
        /// Config key
        key: String,
        /// New value (empty clears optional values)
        value: String,
    },

    /// Restore defaults, keeping the API key
    Reset,
}

#[derive(Subcommand)]
enum CacheCommands {
    /// Show cache location, age, and validity
    Info,

    /// Delete the cached model list
    Clear,
}

impl Cli {
    /// Tier overrides given on the command line
    fn tier_overrides(&self) -> TierSelection {
        let mut tiers = TierSelection::default();
        tiers.set(Tier::Default, self.model.clone());
        tiers.set(Tier::Thinking, self.thinking_model.clone());
        tiers.set(Tier::Opus, self.opus.clone());
        tiers.set(Tier::Sonnet, self.sonnet.clone());
        tiers.set(Tier::Haiku, self.haiku.clone());
        tiers.set(Tier::Subagent, self.subagent.clone());
        tiers
    }
}

fn build_coordinator(manager: &ConfigManager) -> ModelCoordinator {
    let config = manager.config();
    ModelCoordinator::new(
        ModelCache::new(manager.cache_path(), config.cache_duration_hours),
        Arc::new(HttpCatalogFetcher::with_timeout(config.request_timeout())),
        config.api_key().unwrap_or_default(),
        config.models_api_url.clone(),
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Stay quiet by default; Claude Code owns the terminal once launched
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "info,synclaude=debug,synclaude_core=debug".to_string()
        } else {
            "warn".to_string()
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let manager = ConfigManager::new().context("Failed to load configuration")?;

    match &cli.command {
        Some(Commands::Model { refresh }) => select_model(manager, *refresh).await?,
        Some(Commands::ThinkingModel { refresh, clear }) => {
            select_thinking_model(manager, *refresh, *clear).await?
        }
        Some(Commands::Models {
            refresh,
            search,
            json,
        }) => list_models(&manager, *refresh, search.as_deref(), *json).await?,
        Some(Commands::Search { query, refresh }) => {
            list_models(&manager, *refresh, Some(query), false).await?
        }
        Some(Commands::Config(cmd)) => handle_config_command(manager, cmd)?,
        Some(Commands::Cache(cmd)) => handle_cache_command(&manager, cmd).await,
        Some(Commands::Setup) => {
            SetupWizard::new(manager).run().await?;
        }
        Some(Commands::Doctor { update }) => run_doctor(&manager, *update).await?,
        None => {
            let code = run_launch(manager, &cli).await?;
            std::process::exit(code);
        }
    }

    Ok(())
}

/// Launch Claude Code and return the exit code to propagate.
async fn run_launch(mut manager: ConfigManager, cli: &Cli) -> anyhow::Result<i32> {
    if SetupWizard::should_run(&manager) {
        if !Term::stdout().is_term() {
            bail!(
                "No API key configured. Set {} or run `synclaude setup`.",
                manager.config().api_key_env
            );
        }
        let mut wizard = SetupWizard::new(manager);
        if !wizard.run().await? {
            return Ok(1);
        }
        manager = wizard.into_config_manager();
    }

    let mut tiers = manager.config().tier_selection().merged_with(&cli.tier_overrides());
    if !tiers.has_launch_model() {
        let coordinator = build_coordinator(&manager);
        let saved = manager.config().selected_model.clone();
        if Term::stdout().is_term() {
            println!("{}", style("No model selected yet.").yellow());
            let records = fetch_with_spinner(&coordinator, false).await?;
            let preferred = preferred_model(&records, saved.as_deref()).map(|r| r.id().to_string());
            match choose_model(&records, SelectionKind::Default, preferred.as_deref())? {
                Some(model) => {
                    info!("Saving {} as the default model", model.id());
                    manager.set_selected_model(Some(model.id().to_string()));
                    manager.save()?;
                    tiers.set(Tier::Default, Some(model.id().to_string()));
                }
                None => bail!("No model selected. Run `synclaude model` to choose one."),
            }
        } else {
            tiers = coordinator.resolve_tiers(tiers, saved.as_deref()).await?;
            if !tiers.has_launch_model() {
                bail!("No model selected and the catalog offered none. Run `synclaude model` to choose one.");
            }
        }
    }
    debug!("Launching with tiers {:?}", tiers);

    let config = manager.config();
    let api_key = config.api_key().unwrap_or_default();
    let request = LaunchRequest {
        tiers,
        model: None,
        thinking_model: None,
        max_tokens: Some(cli.max_tokens.unwrap_or(config.max_token_size)),
        env_overrides: Default::default(),
        args: cli.claude_args.clone(),
    };

    let tool = Arc::new(ClaudeCodeManager::new(config.claude_path.clone()));
    let launcher = ProcessLauncher::new(
        config.claude_path.clone(),
        Endpoint {
            base_url: config.anthropic_base_url.clone(),
            auth_token: api_key,
        },
    )
    .with_tool_status(tool);

    let launched = launcher.launch(&request).await;
    if !launched.outcome.success {
        warn!("Launch failed: {:?}", launched.outcome.error);
        eprintln!(
            "{} {}",
            style("✗").red().bold(),
            style(launched.outcome.error.as_deref().unwrap_or("launch failed")).red()
        );
        eprintln!(
            "  {}",
            style("Run `synclaude doctor` to check the Claude Code installation.").dim()
        );
        return Ok(1);
    }

    let code = launched.wait().await;
    info!("Claude Code exited with code {:?}", code);
    Ok(code.unwrap_or(1))
}

async fn select_model(mut manager: ConfigManager, refresh: bool) -> anyhow::Result<()> {
    let coordinator = build_coordinator(&manager);
    let records = fetch_with_spinner(&coordinator, refresh).await?;
    let current = manager.config().selected_model.clone();

    match choose_model(&records, SelectionKind::Default, current.as_deref())? {
        Some(model) => {
            manager.set_selected_model(Some(model.id().to_string()));
            manager.save()?;
            println!(
                "  {} Default model set to {}",
                style("✓").green().bold(),
                style(model.id()).green()
            );
        }
        None => println!("  {}", style("No change.").dim()),
    }
    Ok(())
}

async fn select_thinking_model(
    mut manager: ConfigManager,
    refresh: bool,
    clear: bool,
) -> anyhow::Result<()> {
    if clear {
        manager.set_selected_thinking_model(None);
        manager.save()?;
        println!("  {} Thinking model cleared", style("✓").green().bold());
        return Ok(());
    }

    let coordinator = build_coordinator(&manager);
    let records = fetch_with_spinner(&coordinator, refresh).await?;
    let current = manager.config().selected_thinking_model.clone();

    match choose_model(&records, SelectionKind::Thinking, current.as_deref())? {
        Some(model) => {
            manager.set_selected_thinking_model(Some(model.id().to_string()));
            manager.save()?;
            println!(
                "  {} Thinking model set to {}",
                style("✓").green().bold(),
                style(model.id()).green()
            );
        }
        None => println!("  {}", style("No change.").dim()),
    }
    Ok(())
}

async fn list_models(
    manager: &ConfigManager,
    refresh: bool,
    query: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    if !manager.has_api_key() {
        bail!(
            "No API key configured. Set {} or run `synclaude setup`.",
            manager.config().api_key_env
        );
    }

    let coordinator = build_coordinator(manager);
    let records = if json {
        coordinator.fetch_models(refresh).await?
    } else {
        fetch_with_spinner(&coordinator, refresh).await?
    };
    let records = match query {
        Some(query) => coordinator.search(query, Some(&records)).await?,
        None => records,
    };

    if json {
        let raw: Vec<_> = records.iter().map(|r| r.to_raw()).collect();
        println!("{}", serde_json::to_string_pretty(&raw)?);
        return Ok(());
    }

    if let Some(query) = query {
        println!(
            "{} {}",
            style("Models matching").bold(),
            style(format!("'{}'", query)).cyan()
        );
        println!();
    }
    print_models(&records);
    Ok(())
}

fn handle_config_command(mut manager: ConfigManager, cmd: &ConfigCommands) -> anyhow::Result<()> {
    match cmd {
        ConfigCommands::Show => show_config(&manager),
        ConfigCommands::Set { key, value } => {
            manager.config_mut().set_value(key, value)?;
            manager.save()?;
            println!("  {} {} updated", style("✓").green().bold(), style(key).cyan());
        }
        ConfigCommands::Reset => {
            manager.reset();
            manager.save()?;
            println!(
                "  {} Configuration reset to defaults (API key kept)",
                style("✓").green().bold()
            );
        }
    }
    Ok(())
}

fn mask_key(key: &str) -> String {
    let visible: String = key.chars().take(4).collect();
    if key.chars().count() <= 8 {
        "****".to_string()
    } else {
        format!("{}****", visible)
    }
}

fn show_config(manager: &ConfigManager) {
    let config = manager.config();
    let unset = || style("(not set)".to_string()).dim();

    println!("{}", style("Configuration:").bold());
    println!();
    println!("  Config file:     {}", style(manager.config_path().display()).dim());
    println!(
        "  API key:         {}",
        match config.api_key() {
            Some(key) => style(mask_key(&key)).green(),
            None => unset(),
        }
    );
    println!("  API key env:     {}", config.api_key_env);
    println!("  Models API:      {}", config.models_api_url);
    println!("  Endpoint:        {}", config.anthropic_base_url);
    println!("  Cache duration:  {}h", config.cache_duration_hours);
    println!("  Request timeout: {}s", config.request_timeout_secs);
    println!("  Claude path:     {}", config.claude_path);
    println!("  Max tokens:      {}", config.max_token_size);
    println!(
        "  Default model:   {}",
        config
            .selected_model
            .as_ref()
            .map(|m| style(m.clone()).green())
            .unwrap_or_else(unset)
    );
    println!(
        "  Thinking model:  {}",
        config
            .selected_thinking_model
            .as_ref()
            .map(|m| style(m.clone()).green())
            .unwrap_or_else(unset)
    );

    let tiers = &config.tiers;
    if !tiers.is_empty() {
        println!();
        println!("{}", style("Tier overrides:").bold());
        for tier in Tier::ALL {
            if let Some(model) = tiers.get(tier) {
                println!("  {:<9} {}", tier.as_str(), style(model).green());
            }
        }
    }
}

async fn handle_cache_command(manager: &ConfigManager, cmd: &CacheCommands) {
    let coordinator = build_coordinator(manager);
    match cmd {
        CacheCommands::Info => {
            let info = coordinator.cache_info().await;
            println!("{}", style("Model cache:").bold());
            println!();
            println!("  Path:     {}", style(info.path.display()).dim());
            if !info.exists {
                println!("  Status:   {}", style("empty").dim());
                return;
            }
            println!(
                "  Status:   {}",
                if info.is_valid {
                    style("valid").green()
                } else {
                    style("expired").yellow()
                }
            );
            println!("  Models:   {}", info.record_count);
            println!("  Size:     {} bytes", info.size_bytes);
            if let Some(modified) = info.modified_at {
                println!("  Updated:  {}", modified.format("%Y-%m-%d %H:%M:%S UTC"));
            }
            println!("  TTL:      {}h", coordinator.cache().ttl().num_hours());
        }
        CacheCommands::Clear => {
            if coordinator.clear_cache().await {
                println!("  {} Model cache cleared", style("✓").green().bold());
            } else {
                println!("  {} Could not clear model cache", style("✗").red().bold());
            }
        }
    }
}

async fn run_doctor(manager: &ConfigManager, update: bool) -> anyhow::Result<()> {
    let config = manager.config();
    let tool = ClaudeCodeManager::new(config.claude_path.clone());
    let ok = style("✓").green().bold();
    let bad = style("✗").red().bold();

    println!("{}", style("synclaude doctor").bold());
    println!();

    match tool.locate() {
        Some(path) => println!("  {} Claude Code found at {}", ok, style(path.display()).dim()),
        None => println!(
            "  {} {} not found on PATH (install with `npm install -g @anthropic-ai/claude-code`)",
            bad, config.claude_path
        ),
    }
    match tool.current_version().await {
        Some(version) => println!("  {} Claude Code version {}", ok, style(version).green()),
        None => println!("  {} Could not read the Claude Code version", bad),
    }

    if manager.has_api_key() {
        println!("  {} API key configured", ok);
    } else {
        println!(
            "  {} No API key (set {} or run `synclaude setup`)",
            bad, config.api_key_env
        );
    }
    if let Err(e) = config.validate() {
        println!("  {} {}", bad, e);
    }
    match config.tier_selection().get(Tier::Default) {
        Some(model) => println!("  {} Default model {}", ok, style(model).green()),
        None => println!("  {} No default model (run `synclaude model`)", bad),
    }

    let info = build_coordinator(manager).cache_info().await;
    if info.is_valid {
        println!("  {} Model cache holds {} models", ok, info.record_count);
    } else {
        println!("  {} Model cache is empty or expired", style("-").dim());
    }

    if update {
        println!();
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.blue} {msg}")?);
        spinner.set_message("Updating Claude Code...");
        spinner.enable_steady_tick(Duration::from_millis(100));
        let outcome = tool.update().await;
        spinner.finish_and_clear();

        if outcome.success {
            println!("  {} Claude Code updated", ok);
            let output = outcome.stdout.trim();
            if !output.is_empty() {
                println!("  {}", style(output).dim());
            }
        } else if outcome.timed_out {
            println!("  {} Update timed out", bad);
        } else {
            println!("  {} Update failed", bad);
            let output = outcome.stderr.trim();
            if !output.is_empty() {
                println!("  {}", style(output).dim());
            }
        }
    }

    Ok(())
}
