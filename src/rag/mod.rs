//! Retrieval-augmented answering for a single video.
//!
//! [`RetrievalEngine`] makes sure the video's namespace is populated and finds
//! context for a question, falling back through [`FallbackStrategy`] rungs
//! when search comes up empty. [`AnswerComposer`] turns that context and the
//! recent conversation into a prompt and asks the model.

mod composer;
pub mod fallback;
mod retrieval;

pub use composer::AnswerComposer;
pub use fallback::{FallbackLadder, FallbackStrategy, PassageSearch, NO_CONTENT_SENTINEL};
pub use retrieval::{ContextSource, IndexState, NamespaceSearch, RetrievalEngine, RetrievedContext};
