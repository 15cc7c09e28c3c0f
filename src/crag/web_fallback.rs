//! Web branch: search, model-formatted extraction, then the shared judge.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::api_connection::{LanguageModel, WebResult, WebSearch, WebSearchRequest};

use super::intent::ensure_intent;
use super::json_extract::{parse_json_list, string_field};
use super::judge::judge_candidates;
use super::prompts::web_extraction_prompt;
use super::query_optimizer::web_query;
use super::types::{CandidateRecipe, RecipeSource, RunContext};

#[derive(Debug, Clone)]
pub struct WebSearchLimits {
    pub result_count: usize,
    pub depth: String,
    pub judge_cap: usize,
}

impl Default for WebSearchLimits {
    fn default() -> Self {
        Self {
            result_count: 5,
            depth: "advanced".to_string(),
            judge_cap: 10,
        }
    }
}

/// Renders snippets as numbered `Source i` blocks for the extraction prompt.
pub fn format_search_results(results: &[WebResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, r)| format!("Source {}: {}\n{}\nURL: {}\n\n", i + 1, r.title, r.content, r.url))
        .collect()
}

/// Recipes from the extraction answer. Untitled entries are numbered, blank
/// texts dropped and repeated titles keep their first occurrence.
pub fn parse_web_recipes(raw: &str) -> Vec<CandidateRecipe> {
    let mut seen = HashSet::new();
    parse_json_list(raw)
        .iter()
        .enumerate()
        .filter_map(|(i, item)| {
            let title = match string_field(item, "title") {
                t if t.is_empty() => format!("Recipe {}", i + 1),
                t => t,
            };
            let recipe_text = string_field(item, "recipe_text");
            if recipe_text.is_empty() || !seen.insert(title.clone()) {
                return None;
            }
            Some(CandidateRecipe::new(title, recipe_text, RecipeSource::Web))
        })
        .collect()
}

/// Runs the whole web branch. Every failure ends in an empty list.
pub async fn search_web(
    model: &dyn LanguageModel,
    search: &dyn WebSearch,
    ctx: &mut RunContext,
    optimized_query: &str,
    limits: &WebSearchLimits,
) -> Vec<CandidateRecipe> {
    let request = WebSearchRequest {
        query: web_query(optimized_query),
        result_count: limits.result_count,
        depth: limits.depth.clone(),
    };
    debug!("Searching web for '{}'...", request.query);

    let results = match search.search(&request).await {
        Ok(results) => results,
        Err(err) => {
            warn!("Web search failed: {}", err);
            return Vec::new();
        }
    };
    let results_context = format_search_results(&results);
    if results_context.is_empty() {
        return Vec::new();
    }

    ctx.record_llm_call("web_search_formatter");
    let raw = match model
        .complete(&web_extraction_prompt(&ctx.user_query, &results_context))
        .await
    {
        Ok(raw) => raw,
        Err(err) => {
            warn!("Web result formatting failed: {}", err);
            return Vec::new();
        }
    };
    let web_recipes = parse_web_recipes(&raw);
    if web_recipes.is_empty() {
        return Vec::new();
    }

    let intent = ensure_intent(model, ctx, "intent_analyzer_web").await;
    let judged = judge_candidates(model, ctx, &web_recipes, &intent, limits.judge_cap, "judge_web_results").await;

    if judged.is_empty() {
        // Extraction already targeted the query; an empty judgement here is
        // treated as over-filtering.
        info!("Web judge kept nothing; returning {} extracted recipes.", web_recipes.len());
        return web_recipes
            .into_iter()
            .filter(|recipe| !ctx.is_excluded(&recipe.title))
            .collect();
    }
    judged
}
