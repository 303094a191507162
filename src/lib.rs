/// vidscout - find downloadable videos on a web page
///
/// A page URL is handed to a generative model together with a discovery
/// prompt. The structured reply is validated, its links are made absolute,
/// and the result is cached for the session and shown as a filterable,
/// sortable list of video groups.

pub mod config;
pub mod error;
pub mod llm;
pub mod presentation;
pub mod storage;
pub mod videos;

// Re-export main types for easy access
pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::{AnalysisError, LinkResolutionError, PersistenceError, ValidationError};
pub use crate::llm::{LLMConfig, LLMProvider, LLM};
pub use crate::presentation::{
    CategoryFilter, CopyFeedback, PresentationState, SearchHistory, SearchSession, SortKey,
    SubmitOutcome,
};
pub use crate::storage::{FileStore, KeyValueStore, MemoryStore};
pub use crate::videos::{VideoAnalyzer, VideoGroup, VideoVariant};
