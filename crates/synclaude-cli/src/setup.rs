//! Setup wizard for first-run configuration
//!
//! Guides new users through API key entry, a catalog connection test, and
//! picking a default model.

use std::sync::Arc;
use std::time::Duration;

use console::style;
use dialoguer::{theme::ColorfulTheme, Password, Select};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use synclaude_core::config::ConfigManager;
use synclaude_core::models::{HttpCatalogFetcher, ModelCache, ModelCoordinator};
use synclaude_core::ModelRecord;

use crate::selector::{choose_model, SelectionKind};

const SIGNUP_URL: &str = "https://synthetic.new/";

/// What to do after a failed connection test
enum ConnectionRetry {
    TryAgain,
    Continue,
    Cancel,
}

/// Setup wizard for first-run configuration
pub struct SetupWizard {
    config_manager: ConfigManager,
}

impl SetupWizard {
    pub fn new(config_manager: ConfigManager) -> Self {
        Self { config_manager }
    }

    /// Setup is needed until an API key is available from the config or the
    /// environment.
    pub fn should_run(config_manager: &ConfigManager) -> bool {
        !config_manager.has_api_key()
    }

    /// Consume the wizard and return the config manager
    pub fn into_config_manager(self) -> ConfigManager {
        self.config_manager
    }

    /// Run the wizard. Returns `false` if the user cancelled.
    pub async fn run(&mut self) -> anyhow::Result<bool> {
        self.show_welcome();

        let (api_key, records) = loop {
            let api_key = self.input_api_key()?;
            match self.test_connection(&api_key).await? {
                Ok(records) => break (api_key, records),
                Err(ConnectionRetry::TryAgain) => {
                    println!("{}", style("Let's try again...").dim());
                    println!();
                }
                Err(ConnectionRetry::Continue) => break (api_key, Vec::new()),
                Err(ConnectionRetry::Cancel) => {
                    println!("{}", style("Setup cancelled.").yellow());
                    return Ok(false);
                }
            }
        };

        self.config_manager.set_api_key(api_key);
        let model = self.select_default_model(&records)?;
        if let Some(model) = &model {
            self.config_manager
                .set_selected_model(Some(model.id().to_string()));
        }
        self.config_manager.mark_first_run_completed();
        self.config_manager.save()?;
        info!(
            "Setup completed; configuration saved to {}",
            self.config_manager.config_path().display()
        );

        self.show_completion(model.as_ref());
        Ok(true)
    }

    fn show_welcome(&self) {
        println!();
        println!(
            "{}",
            style("┌─────────────────────────────────────────────────────┐").cyan()
        );
        println!(
            "{}  {}  {}",
            style("│").cyan(),
            style("Welcome to synclaude!").bold().white(),
            style("                         │").cyan()
        );
        println!(
            "{}  {}  {}",
            style("│").cyan(),
            style("Claude Code on Synthetic models").dim(),
            style("               │").cyan()
        );
        println!(
            "{}",
            style("└─────────────────────────────────────────────────────┘").cyan()
        );
        println!();
    }

    fn input_api_key(&self) -> anyhow::Result<String> {
        println!(
            "{} {}",
            style("Step 1 of 3:").bold().cyan(),
            style("Enter your API key").bold()
        );
        println!();
        println!(
            "  Get your API key at: {}",
            style(SIGNUP_URL).cyan().underlined()
        );
        println!();
        println!(
            "  {}",
            style(format!(
                "Tip: You can also set the {} environment variable.",
                self.config_manager.config().api_key_env
            ))
            .dim()
        );
        println!();

        let api_key: String = Password::with_theme(&ColorfulTheme::default())
            .with_prompt("API key")
            .interact()?;

        println!();
        Ok(api_key.trim().to_string())
    }

    /// Fetch the catalog with `api_key`. The inner `Err` says how to go on
    /// after a failure.
    async fn test_connection(
        &self,
        api_key: &str,
    ) -> anyhow::Result<Result<Vec<ModelRecord>, ConnectionRetry>> {
        println!(
            "{} {}",
            style("Step 2 of 3:").bold().cyan(),
            style("Testing connection").bold()
        );
        println!();

        let config = self.config_manager.config();
        let coordinator = ModelCoordinator::new(
            ModelCache::new(self.config_manager.cache_path(), config.cache_duration_hours),
            Arc::new(HttpCatalogFetcher::with_timeout(config.request_timeout())),
            api_key,
            config.models_api_url.clone(),
        );

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.blue} {msg}")?);
        spinner.set_message("Connecting to the model catalog...");
        spinner.enable_steady_tick(Duration::from_millis(100));

        let result = coordinator.fetch_models(true).await;
        spinner.finish_and_clear();

        let error = match result {
            Ok(records) if !records.is_empty() => {
                println!(
                    "  {} {}",
                    style("✓").green().bold(),
                    style(format!("Connection successful! {} models available.", records.len()))
                        .green()
                );
                println!();
                return Ok(Ok(records));
            }
            Ok(_) => "the catalog returned no models".to_string(),
            Err(e) => e.to_string(),
        };
        warn!("Setup connection test failed: {}", error);

        println!(
            "  {} {}",
            style("✗").red().bold(),
            style("Connection failed").red()
        );
        println!("  {}", style(format!("Error: {}", error)).dim());
        println!();

        let options = [
            "Try again with different API key",
            "Continue anyway (save current settings)",
            "Exit setup",
        ];
        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("What would you like to do?")
            .items(&options)
            .default(0)
            .interact()?;
        println!();

        Ok(Err(match selection {
            0 => ConnectionRetry::TryAgain,
            1 => ConnectionRetry::Continue,
            _ => ConnectionRetry::Cancel,
        }))
    }

    fn select_default_model(&self, records: &[ModelRecord]) -> anyhow::Result<Option<ModelRecord>> {
        println!(
            "{} {}",
            style("Step 3 of 3:").bold().cyan(),
            style("Choose your default model").bold()
        );
        println!();

        if records.is_empty() {
            println!(
                "  {}",
                style("Skipped. Run `synclaude model` once the catalog is reachable.").dim()
            );
            return Ok(None);
        }

        let current = self.config_manager.config().selected_model.clone();
        choose_model(records, SelectionKind::Default, current.as_deref())
    }

    fn show_completion(&self, model: Option<&ModelRecord>) {
        println!();
        println!(
            "{}",
            style("┌─────────────────────────────────────────────────────┐").green()
        );
        println!(
            "{}  {}  {}",
            style("│").green(),
            style("Setup Complete!").bold().white(),
            style("                              │").green()
        );
        println!(
            "{}",
            style("└─────────────────────────────────────────────────────┘").green()
        );
        println!();

        println!("{}", style("Configuration saved to:").bold());
        println!(
            "  {}",
            style(self.config_manager.config_path().display()).cyan()
        );
        println!();

        println!("{}", style("Your setup:").bold());
        println!(
            "  Model:    {}",
            style(model.map(|m| m.id()).unwrap_or("(not selected)")).green()
        );
        println!(
            "  Endpoint: {}",
            style(&self.config_manager.config().anthropic_base_url).green()
        );
        println!();
        println!(
            "Run {} to start Claude Code.",
            style("synclaude").bold().cyan()
        );
        println!();
    }
}
