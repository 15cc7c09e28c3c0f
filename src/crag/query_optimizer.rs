use tracing::debug;

use crate::api_connection::{ApiConnectionError, LanguageModel};

use super::prompts::query_optimizer_prompt;
use super::types::RunContext;

/// Appended to the optimized query for the web search call.
pub const WEB_QUERY_SUFFIX: &str = "recipe full ingredients directions";

/// Collapses the model's answer onto one line. Degenerate answers are kept
/// as they are.
pub fn normalize_optimized_query(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn web_query(optimized_query: &str) -> String {
    format!("{} {}", optimized_query, WEB_QUERY_SUFFIX)
}

pub async fn optimize_query(
    model: &dyn LanguageModel,
    ctx: &mut RunContext,
) -> Result<String, ApiConnectionError> {
    ctx.record_llm_call("query_optimizer");
    let raw = model.complete(&query_optimizer_prompt(&ctx.user_query)).await?;
    let optimized = normalize_optimized_query(&raw);
    debug!("Optimized Query: '{}'", optimized);
    Ok(optimized)
}
