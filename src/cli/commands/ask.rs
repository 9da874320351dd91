//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use std::time::Instant;
use tracing::info;

/// Run the ask command.
pub async fn run_ask(video: &str, question: &str, settings: Settings) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'vidqa doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Reading the video...");
    let start = Instant::now();
    let answer = orchestrator.answer_question(video, question).await;
    let elapsed = start.elapsed().as_secs_f64();
    spinner.finish_and_clear();

    info!("Question processed in {:.2} seconds", elapsed);

    println!("\n{}\n", answer);
    Output::kv("Processing time", &format!("{:.2}s", elapsed));

    Ok(())
}
