//! Interactive search state layered over [`CragWorkflow`].
//!
//! The session remembers every title it has shown so that follow-up searches
//! never repeat one, tracks corpus exhaustion, and holds the recipe currently
//! being adapted together with its adaptation history.

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};

use crate::api_connection::ApiConnectionError;
use crate::crag::{option_to_recipe, AdaptationOption, CandidateRecipe, CragWorkflow, RecipeSource, SearchMode};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Search query is empty")]
    EmptyQuery,
    #[error("No active search; run a search first")]
    NoActiveQuery,
    #[error("No recipe selected")]
    NoRecipeSelected,
    #[error("Adaptation goal is empty")]
    EmptyGoal,
    #[error("Index {index} is out of range ({len} available)")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("Formatting timed out after {0:?}")]
    FormatTimeout(Duration),
    #[error("Model call failed: {0}")]
    Model(#[from] ApiConnectionError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdaptationStep {
    pub goal: String,
    pub source_recipe: String,
    pub options_generated: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSession {
    pub last_query: Option<String>,
    pub recipes: Vec<CandidateRecipe>,
    pub shown_titles: BTreeSet<String>,
    pub corpus_exhausted: bool,
    pub selected_index: Option<usize>,
    pub current_recipe: Option<CandidateRecipe>,
    pub formatted: Option<String>,
    pub adaptation_goal: Option<String>,
    pub adaptation_options: Vec<AdaptationOption>,
    pub adaptation_history: Vec<AdaptationStep>,
}

impl SearchSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot from `path`, or a fresh session when the file does not exist.
    pub async fn load(path: &Path) -> Result<Self> {
        if !fs::try_exists(path).await.unwrap_or(false) {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read session file '{}'", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse session file '{}'", path.display()))
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize session")?;
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write session file '{}'", path.display()))
    }

    fn active_query(&self) -> Result<String, SessionError> {
        self.last_query.clone().ok_or(SessionError::NoActiveQuery)
    }

    fn current(&self) -> Result<&CandidateRecipe, SessionError> {
        self.current_recipe.as_ref().ok_or(SessionError::NoRecipeSelected)
    }

    fn clear_selection(&mut self) {
        self.selected_index = None;
        self.current_recipe = None;
        self.formatted = None;
        self.adaptation_goal = None;
        self.adaptation_options.clear();
        self.adaptation_history.clear();
    }

    /// Keeps recipes whose titles have not been shown yet and records them.
    fn admit_unseen(&mut self, found: Vec<CandidateRecipe>) -> Vec<CandidateRecipe> {
        let fresh: Vec<CandidateRecipe> = found
            .into_iter()
            .filter(|recipe| self.shown_titles.insert(recipe.title.clone()))
            .collect();
        self.recipes.extend(fresh.iter().cloned());
        fresh
    }

    /// Starts over with `query`, discarding earlier results and selection.
    pub async fn new_search(&mut self, workflow: &CragWorkflow, query: &str) -> Result<Vec<CandidateRecipe>, SessionError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SessionError::EmptyQuery);
        }
        self.recipes.clear();
        self.shown_titles.clear();
        self.corpus_exhausted = false;
        self.clear_selection();
        self.last_query = Some(query.to_string());

        let found = workflow.run_recipes(query, SearchMode::Db, Vec::<String>::new()).await;
        let fresh = self.admit_unseen(found);
        info!("New search '{}' returned {} recipes.", query, fresh.len());
        Ok(fresh)
    }

    /// Re-runs the corpus search excluding every title shown so far. An
    /// empty answer marks the corpus as exhausted.
    pub async fn more_results(&mut self, workflow: &CragWorkflow) -> Result<Vec<CandidateRecipe>, SessionError> {
        let query = self.active_query()?;
        let found = workflow
            .run_recipes(&query, SearchMode::Db, self.shown_titles.iter())
            .await;
        let fresh = self.admit_unseen(found);
        if fresh.is_empty() {
            info!("No more unique recipes in the corpus for '{}'.", query);
            self.corpus_exhausted = true;
        }
        Ok(fresh)
    }

    pub async fn search_web(&mut self, workflow: &CragWorkflow) -> Result<Vec<CandidateRecipe>, SessionError> {
        let query = self.active_query()?;
        let found = workflow
            .run_recipes(&query, SearchMode::Web, self.shown_titles.iter())
            .await
            .into_iter()
            .map(|mut recipe| {
                recipe.source = RecipeSource::Web;
                recipe
            })
            .collect();
        let fresh = self.admit_unseen(found);
        info!("Web search for '{}' returned {} recipes.", query, fresh.len());
        Ok(fresh)
    }

    /// Makes `recipes[index]` the current recipe; adaptation state restarts.
    pub fn select(&mut self, index: usize) -> Result<&CandidateRecipe, SessionError> {
        let recipe = self
            .recipes
            .get(index)
            .cloned()
            .ok_or(SessionError::IndexOutOfRange {
                index,
                len: self.recipes.len(),
            })?;
        self.clear_selection();
        self.selected_index = Some(index);
        debug!("Selected recipe '{}'.", recipe.title);
        Ok(self.current_recipe.insert(recipe))
    }

    pub async fn adapt(&mut self, workflow: &CragWorkflow, goal: &str) -> Result<&[AdaptationOption], SessionError> {
        let goal = goal.trim();
        if goal.is_empty() {
            return Err(SessionError::EmptyGoal);
        }
        let recipe_text = self.current()?.recipe_text.clone();
        let user_query = self.last_query.clone().unwrap_or_default();

        self.adaptation_goal = Some(goal.to_string());
        self.adaptation_options = workflow.adapt_options(&user_query, &recipe_text, goal).await;
        Ok(&self.adaptation_options)
    }

    /// Replaces the current recipe with option `index` so it can be adapted
    /// again, recording the step in the history.
    pub fn apply_option(&mut self, index: usize) -> Result<&CandidateRecipe, SessionError> {
        let current = self.current()?;
        let option = self
            .adaptation_options
            .get(index)
            .ok_or(SessionError::IndexOutOfRange {
                index,
                len: self.adaptation_options.len(),
            })?;

        let adapted = option_to_recipe(option, current.source);
        let step = AdaptationStep {
            goal: self.adaptation_goal.clone().unwrap_or_default(),
            source_recipe: current.title.clone(),
            options_generated: self.adaptation_options.len(),
        };
        self.adaptation_history.push(step);
        self.adaptation_options.clear();
        self.adaptation_goal = None;
        self.formatted = None;
        info!("Current recipe is now '{}'.", adapted.title);
        Ok(self.current_recipe.insert(adapted))
    }

    /// Formats the current recipe, giving up after `limit`. A timeout leaves
    /// the selection untouched.
    pub async fn format(&mut self, workflow: &CragWorkflow, limit: Duration) -> Result<&str, SessionError> {
        let recipe_text = self.current()?.recipe_text.clone();
        let user_query = self.last_query.clone().unwrap_or_default();

        let formatted = tokio::time::timeout(limit, workflow.format_recipe(&user_query, &recipe_text))
            .await
            .map_err(|_| SessionError::FormatTimeout(limit))??;
        Ok(self.formatted.insert(formatted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn session_with(titles: &[&str]) -> SearchSession {
        let mut session = SearchSession::new();
        session.last_query = Some("vegan dinner".to_string());
        let found = titles
            .iter()
            .map(|t| CandidateRecipe::new(*t, format!("Title: {}\nIngredients: tofu", t), RecipeSource::Corpus))
            .collect();
        session.admit_unseen(found);
        session
    }

    fn option(title: &str) -> AdaptationOption {
        AdaptationOption {
            title: title.to_string(),
            approach: "swap".to_string(),
            summary: format!("{} summary", title),
            ingredients: vec!["tempeh".to_string()],
            directions: vec!["Cook.".to_string()],
        }
    }

    #[test]
    fn repeated_titles_are_not_admitted() {
        let mut session = session_with(&["Tofu Bowl", "Lentil Soup"]);
        let fresh = session.admit_unseen(vec![
            CandidateRecipe::new("Tofu Bowl", "again", RecipeSource::Corpus),
            CandidateRecipe::new("Chickpea Stew", "new", RecipeSource::Corpus),
        ]);
        assert_eq!(fresh.len(), 1);
        assert_eq!(session.recipes.len(), 3);
        assert!(session.shown_titles.contains("Chickpea Stew"));
    }

    #[test]
    fn select_checks_bounds_and_resets_adaptation() {
        let mut session = session_with(&["Tofu Bowl"]);
        session.adaptation_history.push(AdaptationStep {
            goal: "spicier".to_string(),
            source_recipe: "Old".to_string(),
            options_generated: 3,
        });
        assert!(matches!(
            session.select(4),
            Err(SessionError::IndexOutOfRange { index: 4, len: 1 })
        ));
        assert_eq!(session.select(0).unwrap().title, "Tofu Bowl");
        assert!(session.adaptation_history.is_empty());
        assert_eq!(session.selected_index, Some(0));
    }

    #[test]
    fn applying_an_option_chains_the_recipe() {
        let mut session = session_with(&["Tofu Bowl"]);
        session.select(0).unwrap();
        session.adaptation_goal = Some("more protein".to_string());
        session.adaptation_options = vec![option("Tempeh Bowl"), option("Tofu Bowl Plus"), option("Seitan Plate")];

        let adapted = session.apply_option(0).unwrap();
        assert_eq!(adapted.title, "Tempeh Bowl");
        assert!(adapted.recipe_text.starts_with("Title: Tempeh Bowl"));
        assert_eq!(
            session.adaptation_history,
            vec![AdaptationStep {
                goal: "more protein".to_string(),
                source_recipe: "Tofu Bowl".to_string(),
                options_generated: 3,
            }]
        );
        assert!(session.adaptation_options.is_empty());
        assert!(matches!(session.apply_option(0), Err(SessionError::IndexOutOfRange { .. })));
    }

    #[test]
    fn apply_without_selection_fails() {
        let mut session = session_with(&["Tofu Bowl"]);
        session.adaptation_options = vec![option("Tempeh Bowl")];
        assert!(matches!(session.apply_option(0), Err(SessionError::NoRecipeSelected)));
    }

    #[tokio::test]
    async fn snapshot_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("session.json");

        assert!(SearchSession::load(&path).await?.last_query.is_none());

        let mut session = session_with(&["Tofu Bowl", "Lentil Soup"]);
        session.select(1).unwrap();
        session.corpus_exhausted = true;
        session.save(&path).await?;

        let restored = SearchSession::load(&path).await?;
        assert_eq!(restored.last_query.as_deref(), Some("vegan dinner"));
        assert_eq!(restored.recipes.len(), 2);
        assert!(restored.corpus_exhausted);
        assert_eq!(restored.current_recipe.map(|r| r.title), Some("Lentil Soup".to_string()));
        Ok(())
    }
}
