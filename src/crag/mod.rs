//! Corrective retrieval pipeline for recipe discovery.

pub mod adaptation;
pub mod excerpt;
pub mod formatter;
pub mod intent;
pub mod json_extract;
pub mod judge;
pub mod prompts;
pub mod query_optimizer;
pub mod retriever;
pub mod title;
pub mod types;
pub mod web_fallback;
pub mod workflow;

pub use adaptation::{option_to_recipe, render_option};
pub use title::extract_title;
pub use types::{
    AdaptationOption, CandidateRecipe, IntentAnalysis, RecipeSource, Requirement, Restriction, RunContext,
    SearchMode,
};
pub use web_fallback::WebSearchLimits;
pub use workflow::{CragWorkflow, PipelineLimits, WorkflowEvent};
