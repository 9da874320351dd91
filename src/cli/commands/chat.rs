//! Interactive chat command.
//!
//! Questions share the orchestrator's conversation memory for the lifetime
//! of the session, so follow-ups can refer to earlier answers.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::video::VideoId;
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};

/// A line typed at the chat prompt.
#[derive(Debug, PartialEq)]
enum ChatInput {
    Question(String),
    Switch(String),
    History { all: bool },
    Memories,
    Clear { all: bool },
    Help,
    Exit,
    Empty,
}

impl ChatInput {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return ChatInput::Empty;
        }
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            return ChatInput::Exit;
        }

        let Some(command) = line.strip_prefix('/') else {
            return ChatInput::Question(line.to_string());
        };

        let mut parts = command.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let arg = parts.next();
        match (name, arg) {
            ("video", Some(url)) => ChatInput::Switch(url.to_string()),
            ("history", arg) => ChatInput::History { all: arg == Some("all") },
            ("memories", _) => ChatInput::Memories,
            ("clear", arg) => ChatInput::Clear { all: arg == Some("all") },
            ("exit", _) | ("quit", _) => ChatInput::Exit,
            _ => ChatInput::Help,
        }
    }
}

fn print_help() {
    Output::info("Commands:");
    Output::list_item("/video <url>    switch to another video");
    Output::list_item("/history [all]  show this video's conversation (or every video's)");
    Output::list_item("/memories       message counts per video");
    Output::list_item("/clear [all]    forget this video's conversation (or everything)");
    Output::list_item("exit            leave the chat");
}

/// Run the interactive chat command.
pub async fn run_chat(video: &str, settings: Settings) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'vidqa doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let mut current = VideoId::parse(video)
        .ok_or_else(|| anyhow::anyhow!("Not a YouTube URL or video ID: {}", video))?;

    let orchestrator = Orchestrator::new(settings)?;

    println!("\n{} {}", style("vidqa chat").bold().cyan(), style(current.watch_url()).dim());
    println!(
        "{}\n",
        style("Ask about the video, '/help' for commands, or 'exit' to quit.").dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        match ChatInput::parse(&line) {
            ChatInput::Empty => continue,
            ChatInput::Exit => {
                Output::info("Goodbye!");
                break;
            }
            ChatInput::Help => print_help(),
            ChatInput::Switch(url) => match VideoId::parse(&url) {
                Some(id) => {
                    current = id;
                    Output::info(&format!("Now asking about {}", current.watch_url()));
                }
                None => Output::warning(&format!("Not a YouTube URL or video ID: {}", url)),
            },
            ChatInput::History { all } => {
                let scope = if all { None } else { Some(&current) };
                let messages = orchestrator.history(scope);
                if messages.is_empty() {
                    Output::info("No conversation yet.");
                }
                for message in &messages {
                    Output::chat_message(message, all);
                }
            }
            ChatInput::Memories => {
                let memories = orchestrator.all_memories();
                Output::header(&format!("Memories ({} videos)", memories.len()));
                for (id, count) in &memories {
                    Output::kv(id.as_str(), &format!("{} messages", count));
                }
            }
            ChatInput::Clear { all } => {
                if all {
                    orchestrator.clear_memory(None);
                    Output::info("All conversation memory cleared.");
                } else {
                    orchestrator.clear_memory(Some(&current));
                    Output::info(&format!("Conversation about {} cleared.", current));
                }
            }
            ChatInput::Question(question) => {
                let spinner = Output::spinner("Thinking...");
                let answer = orchestrator
                    .answer_question(current.as_str(), &question)
                    .await;
                spinner.finish_and_clear();
                println!("\n{} {}\n", style("vidqa:").cyan().bold(), answer);
            }
        }
    }

    Ok(())
}
