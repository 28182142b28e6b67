//! Research agent for quick-research.
//!
//! This crate provides:
//! - `Depth` tiers and their length profiles
//! - System prompt construction with the embedded record schema
//! - `normalize` for turning free-form model output into a `ResearchRecord`
//! - `Researcher`, the end-to-end pipeline

pub mod depth;
pub mod normalize;
pub mod prompt;
pub mod record;
pub mod researcher;

pub use depth::{Depth, DepthProfile};
pub use normalize::{normalize, normalize_outcome, Normalized, Stage};
pub use prompt::{build_system_prompt, record_schema};
pub use record::{
    AgentResponse, ResearchQuery, ResearchRecord, NO_QUERY_MESSAGE, SERVER_ERROR_RAW_RESPONSE,
};
pub use researcher::{ResearchSettings, Researcher};
