#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use recipe_crag::api_connection::{ApiConnectionError, LanguageModel, WebResult, WebSearch, WebSearchRequest};
use recipe_crag::crag::CragWorkflow;
use recipe_crag::search::{ScoredNode, VectorStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Optimizer,
    Intent,
    Judge,
    WebExtraction,
    Adaptation,
    Format,
    Unknown,
}

impl PromptKind {
    pub fn of(prompt: &str) -> Self {
        if prompt.starts_with("You are a culinary search expert") {
            PromptKind::Optimizer
        } else if prompt.starts_with("Analyze this recipe request") {
            PromptKind::Intent
        } else if prompt.starts_with("You are an expert culinary judge") {
            PromptKind::Judge
        } else if prompt.starts_with("You are a culinary assistant. Extract") {
            PromptKind::WebExtraction
        } else if prompt.starts_with("You are a culinary assistant adapting") {
            PromptKind::Adaptation
        } else if prompt.starts_with("You are a helpful culinary assistant") {
            PromptKind::Format
        } else {
            PromptKind::Unknown
        }
    }
}

type Responder = dyn Fn(PromptKind, &str) -> Result<String, ApiConnectionError> + Send + Sync;

/// Answers each prompt through a closure and records every call.
pub struct ScriptedModel {
    responder: Box<Responder>,
    calls: Mutex<Vec<(PromptKind, String)>>,
    delay: Option<Duration>,
}

impl ScriptedModel {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(PromptKind, &str) -> Result<String, ApiConnectionError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<(PromptKind, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, kind: PromptKind) -> usize {
        self.calls.lock().unwrap().iter().filter(|(k, _)| *k == kind).count()
    }

    pub fn prompts(&self, kind: PromptKind) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, p)| p.clone())
            .collect()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<String, ApiConnectionError> {
        let kind = PromptKind::of(prompt);
        self.calls.lock().unwrap().push((kind, prompt.to_string()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.responder)(kind, prompt)
    }
}

pub struct FakeStore {
    nodes: Vec<ScoredNode>,
    fail: bool,
    queries: Mutex<Vec<(String, usize)>>,
}

impl FakeStore {
    pub fn with_recipes(texts: &[&str]) -> Self {
        let count = texts.len() as f32;
        Self {
            nodes: texts
                .iter()
                .enumerate()
                .map(|(i, text)| ScoredNode {
                    text: text.to_string(),
                    score: 1.0 - i as f32 / count,
                })
                .collect(),
            fail: false,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            nodes: Vec::new(),
            fail: true,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<(String, usize)> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl VectorStore for FakeStore {
    async fn query(&self, query: &str, top_k: usize) -> anyhow::Result<Vec<ScoredNode>> {
        self.queries.lock().unwrap().push((query.to_string(), top_k));
        if self.fail {
            anyhow::bail!("index unavailable");
        }
        Ok(self.nodes.iter().take(top_k).cloned().collect())
    }
}

pub struct FakeSearch {
    results: Vec<WebResult>,
    fail: bool,
    requests: Mutex<Vec<WebSearchRequest>>,
}

impl FakeSearch {
    pub fn with_results(results: Vec<WebResult>) -> Self {
        Self {
            results,
            fail: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self::with_results(Vec::new())
    }

    pub fn failing() -> Self {
        Self {
            results: Vec::new(),
            fail: true,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<WebSearchRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebSearch for FakeSearch {
    async fn search(&self, request: &WebSearchRequest) -> Result<Vec<WebResult>, ApiConnectionError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail {
            return Err(ApiConnectionError::EmptyResponse);
        }
        Ok(self.results.iter().take(request.result_count).cloned().collect())
    }
}

pub fn web_result(title: &str, content: &str) -> WebResult {
    WebResult {
        title: title.to_string(),
        content: content.to_string(),
        url: format!("https://recipes.test/{}", title.to_lowercase().replace(' ', "-")),
    }
}

pub fn workflow(model: &Arc<ScriptedModel>, store: &Arc<FakeStore>, search: &Arc<FakeSearch>) -> CragWorkflow {
    CragWorkflow::new(model.clone(), store.clone(), search.clone())
}

/// Candidate titles in a judge prompt, read from its `Title:` excerpt lines.
pub fn titles_in_judge_prompt(prompt: &str) -> Vec<String> {
    prompt
        .lines()
        .filter_map(|line| line.strip_prefix("Title: "))
        .map(|t| t.trim().to_string())
        .collect()
}

/// Titles listed under "Excluded Recipe Titles:" in a judge prompt.
pub fn excluded_in_judge_prompt(prompt: &str) -> Vec<String> {
    prompt
        .split("Excluded Recipe Titles:\n")
        .nth(1)
        .map(|rest| {
            rest.lines()
                .take_while(|line| line.starts_with("- "))
                .map(|line| line.trim_start_matches("- ").to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// A judge answer selecting `titles` in order.
pub fn judge_answer<S: AsRef<str>>(titles: &[S]) -> String {
    let items: Vec<serde_json::Value> = titles
        .iter()
        .map(|t| serde_json::json!({"title": t.as_ref(), "reason": "matches the request"}))
        .collect();
    serde_json::Value::Array(items).to_string()
}

pub const VEGAN_INTENT: &str = r#"{
  "primary_goal": "vegan dinner",
  "requirements": [{"attribute": "protein", "qualifier": "high", "look_for": "tofu, beans, lentils"}],
  "restrictions": [{"attribute": "animal products", "avoid": "meat, dairy, eggs"}],
  "evaluation_focus": "ingredients for protein and animal products"
}"#;
