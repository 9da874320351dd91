//! Doctor command - verify credentials, storage and index reachability.

use crate::cli::Output;
use crate::config::{Settings, VectorStoreProvider};
use crate::orchestrator::{Credentials, Orchestrator};
use console::style;
use std::path::PathBuf;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub async fn run_doctor(config_path: Option<PathBuf>, settings: Settings) -> anyhow::Result<()> {
    Output::header("vidqa Doctor");
    println!();
    println!("Checking credentials and configuration...\n");

    let mut checks = Vec::new();
    let credentials = Credentials::resolve(&settings);

    // Check API keys
    println!("{}", style("API Configuration").bold());
    let key_checks = check_credentials(&settings, &credentials);
    for check in &key_checks {
        check.print();
    }
    checks.extend(key_checks);

    println!();

    // Check providers
    println!("{}", style("Providers").bold());
    let provider_checks = vec![
        CheckResult::ok("Transcripts", &settings.transcript.provider.to_string()),
        CheckResult::ok(
            "Models",
            &format!("{} / {}", settings.embedding.model, settings.generation.model),
        ),
    ];
    for check in &provider_checks {
        check.print();
    }
    checks.extend(provider_checks);

    println!();

    // Check directories
    println!("{}", style("Directories").bold());
    let dir_checks = check_directories(&settings);
    for check in &dir_checks {
        check.print();
    }
    checks.extend(dir_checks);

    println!();

    // Check configuration
    println!("{}", style("Configuration").bold());
    let config_check = check_config_file(config_path.unwrap_or_else(Settings::default_config_path));
    config_check.print();
    checks.push(config_check);

    println!();

    // Check the index
    println!("{}", style("Vector Index").bold());
    let index_check = check_index(settings).await;
    index_check.print();
    checks.push(index_check);

    println!();

    // Summary
    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using vidqa.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!(
            "All checks passed with {} warning(s).",
            warnings
        ));
    } else {
        Output::success("All checks passed! vidqa is ready to use.");
    }

    Ok(())
}

/// Check that each required API key is configured.
fn check_credentials(settings: &Settings, credentials: &Credentials) -> Vec<CheckResult> {
    let mut results = vec![check_key(
        &settings.google.api_key_env,
        credentials.google_api_key.as_deref(),
    )];

    if credentials.pinecone_required {
        results.push(check_key(
            &settings.vector_store.api_key_env,
            credentials.pinecone_api_key.as_deref(),
        ));
    }

    results
}

fn check_key(name: &str, key: Option<&str>) -> CheckResult {
    let hint = format!("Set with: export {}='...' (or api_key in the config file)", name);
    match key {
        Some(key) => CheckResult::ok(name, &format!("configured ({})", mask_key(key))),
        None => CheckResult::error(name, "not set", &hint),
    }
}

/// Show only the ends of a secret.
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Check data directories.
fn check_directories(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let data_dir = settings.data_dir();
    if data_dir.exists() {
        results.push(CheckResult::ok(
            "Data directory",
            &format!("{}", data_dir.display()),
        ));
    } else {
        results.push(CheckResult::warning(
            "Data directory",
            &format!("{} (will be created)", data_dir.display()),
            "Directory will be created on first use",
        ));
    }

    if settings.vector_store.provider == VectorStoreProvider::Sqlite {
        let db_path = settings.sqlite_path();
        if db_path.exists() {
            let size = std::fs::metadata(&db_path)
                .map(|m| format_size(m.len()))
                .unwrap_or_else(|_| "unknown size".to_string());
            results.push(CheckResult::ok(
                "Vector database",
                &format!("{} ({})", db_path.display(), size),
            ));
        } else {
            results.push(CheckResult::warning(
                "Vector database",
                &format!("{} (not created yet)", db_path.display()),
                "Database will be created on the first question",
            ));
        }
    }

    results
}

/// Check if config file exists.
fn check_config_file(config_path: PathBuf) -> CheckResult {
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: vidqa config init",
        )
    }
}

/// Check that the configured index answers a stats request.
async fn check_index(settings: Settings) -> CheckResult {
    let name = format!(
        "{} '{}'",
        settings.vector_store.provider, settings.vector_store.index_name
    );

    let orchestrator = match Orchestrator::new(settings) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            return CheckResult::error(
                &name,
                &format!("error: {}", e),
                "Check the vector_store section of the config",
            )
        }
    };

    match orchestrator.stats().await {
        Ok(stats) => CheckResult::ok(
            &name,
            &format!(
                "reachable ({} vectors in {} namespaces)",
                stats.total_vector_count,
                stats.namespaces.len()
            ),
        ),
        Err(e) => CheckResult::warning(
            &name,
            &format!("not available: {}", e),
            "The index is created on the first question (or with: vidqa index ensure)",
        ),
    }
}

/// Format file size in human-readable format.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
