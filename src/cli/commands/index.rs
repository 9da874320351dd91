//! Index management commands.

use crate::cli::preflight::{self, Operation};
use crate::cli::{IndexAction, Output};
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::video::VideoId;
use anyhow::Result;
use std::io::{self, BufRead, Write};

/// Run an index subcommand.
pub async fn run_index(action: &IndexAction, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Index, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let index_name = settings.vector_store.index_name.clone();
    let orchestrator = Orchestrator::new(settings)?;

    match action {
        IndexAction::Ensure => {
            let handle = orchestrator.ensure_index().await?;
            if handle.created {
                Output::success(&format!("Created index '{}'", handle.spec.name));
            } else {
                Output::info(&format!("Index '{}' already exists", handle.spec.name));
            }
            Output::kv("Dimension", &handle.spec.dimension.to_string());
            Output::kv("Metric", &handle.spec.metric);
            if let Some(host) = &handle.host {
                Output::kv("Host", host);
            }
        }

        IndexAction::Stats => {
            let stats = orchestrator.stats().await?;
            Output::header(&format!("Index '{}'", index_name));
            Output::kv("Dimension", &stats.dimension.to_string());
            Output::kv("Total vectors", &stats.total_vector_count.to_string());
            Output::kv("Namespaces", &stats.namespaces.len().to_string());
            for (namespace, count) in &stats.namespaces {
                Output::list_item(&format!("{}: {} vectors", namespace, count));
            }
        }

        IndexAction::Delete { yes } => {
            if !yes && !confirm(&format!("Delete index '{}' and every stored vector?", index_name))? {
                Output::info("Aborted.");
                return Ok(());
            }
            if orchestrator.delete_index().await? {
                Output::success(&format!("Deleted index '{}'", index_name));
            } else {
                Output::info(&format!("Index '{}' does not exist", index_name));
            }
        }

        IndexAction::Reindex { video } => {
            let id = VideoId::parse(video)
                .ok_or_else(|| anyhow::anyhow!("Not a YouTube URL or video ID: {}", video))?;
            orchestrator.reindex(&id).await?;
            Output::success(&format!(
                "Cleared vectors for {} (namespace {}); the next question re-indexes it",
                id,
                id.namespace()
            ));
        }
    }

    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
