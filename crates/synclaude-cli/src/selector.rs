//! Model listing and interactive selection

use std::time::Duration;

use console::style;
use dialoguer::{theme::ColorfulTheme, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};

use synclaude_core::models::{models_by_provider, search_models, thinking_capable, ModelCoordinator};
use synclaude_core::ModelRecord;

/// Fetch models behind a spinner.
pub async fn fetch_with_spinner(
    coordinator: &ModelCoordinator,
    force_refresh: bool,
) -> anyhow::Result<Vec<ModelRecord>> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.blue} {msg}")?);
    spinner.set_message(if force_refresh {
        "Refreshing model catalog..."
    } else {
        "Loading models..."
    });
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = coordinator.fetch_models(force_refresh).await;
    spinner.finish_and_clear();
    Ok(result?)
}

/// One line per model: id, context size, and a thinking marker.
pub fn model_line(record: &ModelRecord) -> String {
    let context = record
        .context_label()
        .map(|c| format!("{} ctx", c))
        .unwrap_or_default();
    let thinking = if record.is_thinking_capable() {
        style("thinking").magenta().to_string()
    } else {
        String::new()
    };
    format!("{:<48} {:>9} {}", record.id(), context, thinking)
        .trim_end()
        .to_string()
}

/// Print models grouped by provider.
pub fn print_models(records: &[ModelRecord]) {
    if records.is_empty() {
        println!("  {}", style("No models found").dim());
        return;
    }

    for (provider, models) in models_by_provider(records) {
        println!("{} {}", style(&provider).bold().cyan(), style(format!("({})", models.len())).dim());
        for model in &models {
            println!("  {}", model_line(model));
        }
        println!();
    }
    println!("{}", style(format!("{} models", records.len())).dim());
}

/// Which list a selection is made from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionKind {
    Default,
    Thinking,
}

/// Ask the user to pick a model. `None` if nothing matched or the prompt was
/// cancelled.
pub fn choose_model(
    records: &[ModelRecord],
    kind: SelectionKind,
    current: Option<&str>,
) -> anyhow::Result<Option<ModelRecord>> {
    let pool = match kind {
        SelectionKind::Default => records.to_vec(),
        SelectionKind::Thinking => {
            let thinking = thinking_capable(records);
            if thinking.is_empty() {
                println!(
                    "  {}",
                    style("No models advertise thinking support; showing all models.").dim()
                );
                records.to_vec()
            } else {
                thinking
            }
        }
    };
    if pool.is_empty() {
        println!("  {}", style("No models available. Check your API key.").yellow());
        return Ok(None);
    }

    let filter: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Filter models (blank for all)")
        .allow_empty(true)
        .interact_text()?;
    let matches = search_models(&filter, &pool);
    if matches.is_empty() {
        println!("  {}", style(format!("No models match '{}'", filter.trim())).yellow());
        return Ok(None);
    }

    let items: Vec<String> = matches.iter().map(model_line).collect();
    let default_index = current
        .and_then(|id| matches.iter().position(|r| r.id() == id))
        .unwrap_or(0);

    let prompt = match kind {
        SelectionKind::Default => "Select a model",
        SelectionKind::Thinking => "Select a thinking model",
    };
    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .items(&items)
        .default(default_index)
        .max_length(15)
        .interact_opt()?;

    Ok(selection.map(|index| matches[index].clone()))
}
