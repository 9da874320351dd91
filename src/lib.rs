//! vidqa - Question answering over YouTube videos
//!
//! Fetches a video's captions, indexes them as embedded chunks in a shared
//! vector index (one namespace per video), and answers questions with the
//! most relevant passages plus the recent conversation about that video.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `video` - Video ID extraction and validation
//! - `transcript` - Caption fetching (YouTube, local files)
//! - `chunking` - Recursive character splitting
//! - `embedding` - Embedding generation
//! - `vector_store` - Vector index abstraction (Pinecone, SQLite, in-memory)
//! - `generation` - Answer generation
//! - `rag` - Retrieval with fallbacks and prompt composition
//! - `memory` - Per-video conversation memory
//! - `orchestrator` - Request pipeline
//!
//! # Example
//!
//! ```rust,no_run
//! use vidqa::config::Settings;
//! use vidqa::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let answer = orchestrator
//!         .answer_question("https://www.youtube.com/watch?v=dQw4w9WgXcQ", "What is this video about?")
//!         .await;
//!     println!("{}", answer);
//!
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod memory;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod transcript;
pub mod vector_store;
pub mod video;

pub use error::{Result, VidqaError};
