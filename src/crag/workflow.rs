//! The retrieval pipeline as an explicit state machine.
//!
//! Each step consumes the previous [`WorkflowEvent`] and produces the next
//! one; the driver loop in [`CragWorkflow::run_recipes`] stops on
//! [`WorkflowEvent::Stop`]. Steps swallow their own failures, so a run always
//! ends with a (possibly empty) recipe list.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::api_connection::{ApiConnectionError, LanguageModel, WebSearch};
use crate::search::{ScoredNode, VectorStore};

use super::adaptation::generate_adaptations;
use super::formatter;
use super::intent::ensure_intent;
use super::judge::judge_candidates;
use super::query_optimizer::optimize_query;
use super::retriever::{dedup_candidates, retrieve_nodes};
use super::types::{AdaptationOption, CandidateRecipe, RunContext, SearchMode};
use super::web_fallback::{search_web, WebSearchLimits};

#[derive(Debug, Clone)]
pub struct PipelineLimits {
    pub top_k: usize,
    pub judge_cap: usize,
    pub web: WebSearchLimits,
}

impl Default for PipelineLimits {
    fn default() -> Self {
        Self {
            top_k: 30,
            judge_cap: 30,
            web: WebSearchLimits::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum WorkflowEvent {
    Start { mode: SearchMode },
    QueryOptimized { mode: SearchMode, optimized_query: String },
    Retrieved { nodes: Vec<ScoredNode> },
    Judged { recipes: Vec<CandidateRecipe> },
    Stop(Vec<CandidateRecipe>),
}

impl WorkflowEvent {
    fn name(&self) -> &'static str {
        match self {
            WorkflowEvent::Start { .. } => "start",
            WorkflowEvent::QueryOptimized { .. } => "query_optimized",
            WorkflowEvent::Retrieved { .. } => "retrieved",
            WorkflowEvent::Judged { .. } => "judged",
            WorkflowEvent::Stop(_) => "stop",
        }
    }
}

pub struct CragWorkflow {
    model: Arc<dyn LanguageModel>,
    store: Arc<dyn VectorStore>,
    search: Arc<dyn WebSearch>,
    limits: PipelineLimits,
}

impl CragWorkflow {
    pub fn new(model: Arc<dyn LanguageModel>, store: Arc<dyn VectorStore>, search: Arc<dyn WebSearch>) -> Self {
        Self {
            model,
            store,
            search,
            limits: PipelineLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: PipelineLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> &PipelineLimits {
        &self.limits
    }

    /// Runs the pipeline and serializes the result as a JSON array.
    pub async fn run<I, S>(&self, query: &str, mode: SearchMode, excluded_titles: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let recipes = self.run_recipes(query, mode, excluded_titles).await;
        to_json_array(&recipes)
    }

    pub async fn run_recipes<I, S>(&self, query: &str, mode: SearchMode, excluded_titles: I) -> Vec<CandidateRecipe>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let query = query.trim();
        if query.is_empty() {
            debug!("Empty query; nothing to search.");
            return Vec::new();
        }

        let mut ctx = RunContext::new(query, excluded_titles);
        let mut event = WorkflowEvent::Start { mode };
        let recipes = loop {
            debug!("Workflow step: {}", event.name());
            event = match event {
                WorkflowEvent::Start { mode } => self.optimize_step(&mut ctx, mode).await,
                WorkflowEvent::QueryOptimized {
                    mode: SearchMode::Db,
                    optimized_query,
                } => self.retrieve_step(&optimized_query).await,
                WorkflowEvent::QueryOptimized {
                    mode: SearchMode::Web,
                    optimized_query,
                } => self.web_search_step(&mut ctx, &optimized_query).await,
                WorkflowEvent::Retrieved { nodes } => self.eval_relevance_step(&mut ctx, &nodes).await,
                WorkflowEvent::Judged { recipes } => Self::decide_step(recipes),
                WorkflowEvent::Stop(recipes) => break recipes,
            };
        };

        info!(
            mode = %mode,
            results = recipes.len(),
            llm_calls = ctx.llm_call_count,
            "Workflow finished for '{}'",
            ctx.user_query
        );
        recipes
    }

    async fn optimize_step(&self, ctx: &mut RunContext, mode: SearchMode) -> WorkflowEvent {
        match optimize_query(self.model.as_ref(), ctx).await {
            Ok(optimized_query) => WorkflowEvent::QueryOptimized { mode, optimized_query },
            Err(err) => {
                warn!("Query optimization failed: {}", err);
                WorkflowEvent::Stop(Vec::new())
            }
        }
    }

    async fn retrieve_step(&self, optimized_query: &str) -> WorkflowEvent {
        match retrieve_nodes(self.store.as_ref(), optimized_query, self.limits.top_k).await {
            Ok(nodes) => WorkflowEvent::Retrieved { nodes },
            Err(err) => {
                warn!("Vector store query failed: {:#}", err);
                WorkflowEvent::Stop(Vec::new())
            }
        }
    }

    async fn web_search_step(&self, ctx: &mut RunContext, optimized_query: &str) -> WorkflowEvent {
        let recipes = search_web(
            self.model.as_ref(),
            self.search.as_ref(),
            ctx,
            optimized_query,
            &self.limits.web,
        )
        .await;
        WorkflowEvent::Stop(recipes)
    }

    async fn eval_relevance_step(&self, ctx: &mut RunContext, nodes: &[ScoredNode]) -> WorkflowEvent {
        let candidates = dedup_candidates(nodes);
        if candidates.is_empty() {
            return WorkflowEvent::Stop(Vec::new());
        }
        debug!("Judging {} unique candidates.", candidates.len());
        let intent = ensure_intent(self.model.as_ref(), ctx, "intent_analyzer").await;
        let recipes = judge_candidates(
            self.model.as_ref(),
            ctx,
            &candidates,
            &intent,
            self.limits.judge_cap,
            "judge_candidates",
        )
        .await;
        WorkflowEvent::Judged { recipes }
    }

    fn decide_step(recipes: Vec<CandidateRecipe>) -> WorkflowEvent {
        if recipes.is_empty() {
            debug!("Judge found no relevant recipes.");
        }
        WorkflowEvent::Stop(recipes)
    }

    /// Adaptation options serialized as a JSON array.
    pub async fn adapt(&self, user_query: &str, recipe_text: &str, goal: &str) -> String {
        let options = self.adapt_options(user_query, recipe_text, goal).await;
        serde_json::to_string(&options).unwrap_or_else(|_| "[]".to_string())
    }

    pub async fn adapt_options(&self, user_query: &str, recipe_text: &str, goal: &str) -> Vec<AdaptationOption> {
        generate_adaptations(self.model.as_ref(), user_query, recipe_text, goal).await
    }

    pub async fn format_recipe(&self, user_query: &str, recipe_text: &str) -> Result<String, ApiConnectionError> {
        formatter::format_recipe(self.model.as_ref(), user_query, recipe_text).await
    }
}

fn to_json_array(recipes: &[CandidateRecipe]) -> String {
    serde_json::to_string(recipes).unwrap_or_else(|_| "[]".to_string())
}
