//! Retrieval-augmented answers about ingested videos.

mod engine;
pub mod intent;
mod metadata;

pub use engine::{overfetch_count, RagEngine, NO_MATCHES};
pub use intent::{is_metadata_question, is_recommendation_question};
pub use metadata::MetadataView;
