use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

pub const DEFAULT_EVALUATION_FOCUS: &str = "ingredients and directions";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    #[default]
    Db,
    Web,
}

impl FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "db" | "corpus" => Ok(SearchMode::Db),
            "web" => Ok(SearchMode::Web),
            other => Err(format!("unknown search mode '{}', expected \"db\" or \"web\"", other)),
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMode::Db => write!(f, "db"),
            SearchMode::Web => write!(f, "web"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipeSource {
    #[default]
    Corpus,
    Web,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Requirement {
    #[serde(default)]
    pub attribute: String,
    #[serde(default)]
    pub qualifier: String,
    #[serde(default)]
    pub look_for: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Restriction {
    #[serde(default)]
    pub attribute: String,
    #[serde(default)]
    pub avoid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentAnalysis {
    pub primary_goal: String,
    pub requirements: Vec<Requirement>,
    pub restrictions: Vec<Restriction>,
    pub evaluation_focus: String,
}

impl IntentAnalysis {
    /// Used whenever the analyzer response is unusable.
    pub fn fallback(user_query: &str) -> Self {
        Self {
            primary_goal: user_query.to_string(),
            requirements: Vec::new(),
            restrictions: Vec::new(),
            evaluation_focus: DEFAULT_EVALUATION_FOCUS.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRecipe {
    pub title: String,
    pub recipe_text: String,
    #[serde(default)]
    pub source: RecipeSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_reason: Option<String>,
}

impl CandidateRecipe {
    pub fn new(title: impl Into<String>, recipe_text: impl Into<String>, source: RecipeSource) -> Self {
        Self {
            title: title.into(),
            recipe_text: recipe_text.into(),
            source,
            match_reason: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeSelection {
    pub title: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AdaptationOption {
    pub title: String,
    pub approach: String,
    pub summary: String,
    pub ingredients: Vec<String>,
    pub directions: Vec<String>,
}

/// State carried through one pipeline execution, then dropped.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub user_query: String,
    pub excluded_titles: BTreeSet<String>,
    pub intent_analysis: Option<IntentAnalysis>,
    pub llm_call_count: u32,
}

impl RunContext {
    pub fn new<I, S>(user_query: &str, excluded_titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let excluded_titles = excluded_titles
            .into_iter()
            .map(|t| t.as_ref().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        Self {
            user_query: user_query.to_string(),
            excluded_titles,
            intent_analysis: None,
            llm_call_count: 0,
        }
    }

    pub fn record_llm_call(&mut self, label: &str) {
        self.llm_call_count += 1;
        debug!("LLM call {} - {}", self.llm_call_count, label);
    }

    pub fn is_excluded(&self, title: &str) -> bool {
        self.excluded_titles.contains(title.trim())
    }
}
