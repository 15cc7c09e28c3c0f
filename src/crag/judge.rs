use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::api_connection::LanguageModel;

use super::excerpt::{build_candidate_excerpt, number_excerpts};
use super::json_extract::{parse_json_list, string_field};
use super::prompts::{judge_prompt, JudgePromptInput};
use super::types::{CandidateRecipe, IntentAnalysis, JudgeSelection, RunContext};

const GENERAL_FOCUS: &str = "general match";

/// `{title, reason}` entries with a non-blank title, in model order.
pub fn parse_selections(raw: &str) -> Vec<JudgeSelection> {
    parse_json_list(raw)
        .iter()
        .map(|item| JudgeSelection {
            title: string_field(item, "title"),
            reason: string_field(item, "reason"),
        })
        .filter(|selection| !selection.title.is_empty())
        .collect()
}

/// Resolves selections against the candidate set.
///
/// Unknown titles, excluded titles and repeats are dropped; at most
/// `max_results` recipes survive, in selection order.
pub fn apply_selections(
    selections: &[JudgeSelection],
    candidates: &[CandidateRecipe],
    ctx: &RunContext,
    max_results: usize,
) -> Vec<CandidateRecipe> {
    let by_title: HashMap<&str, &CandidateRecipe> =
        candidates.iter().map(|c| (c.title.as_str(), c)).collect();
    let mut taken = HashSet::new();
    let mut chosen = Vec::new();

    for selection in selections {
        let Some(candidate) = by_title.get(selection.title.as_str()) else {
            debug!("Judge referenced unknown title '{}'; dropped.", selection.title);
            continue;
        };
        if ctx.is_excluded(&selection.title) || !taken.insert(selection.title.as_str()) {
            continue;
        }
        let mut recipe = (*candidate).clone();
        recipe.match_reason = (!selection.reason.is_empty()).then(|| selection.reason.clone());
        chosen.push(recipe);
        if chosen.len() >= max_results {
            break;
        }
    }
    chosen
}

fn excluded_titles_block(ctx: &RunContext) -> String {
    if ctx.excluded_titles.is_empty() {
        return "None".to_string();
    }
    ctx.excluded_titles
        .iter()
        .map(|title| format!("- {}", title))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One judge call over intent-focused excerpts of `candidates`.
///
/// Model failures and unparseable answers produce an empty selection.
pub async fn judge_candidates(
    model: &dyn LanguageModel,
    ctx: &mut RunContext,
    candidates: &[CandidateRecipe],
    intent: &IntentAnalysis,
    cap: usize,
    label: &str,
) -> Vec<CandidateRecipe> {
    if candidates.is_empty() {
        return Vec::new();
    }

    let excerpts: Vec<String> = candidates
        .iter()
        .map(|c| build_candidate_excerpt(&c.title, &c.recipe_text, intent))
        .collect();
    let candidates_block = number_excerpts(excerpts.iter().map(String::as_str));
    let requirements = serde_json::to_string_pretty(&intent.requirements).unwrap_or_else(|_| "[]".into());
    let restrictions = serde_json::to_string_pretty(&intent.restrictions).unwrap_or_else(|_| "[]".into());
    let evaluation_focus = if intent.evaluation_focus.trim().is_empty() {
        GENERAL_FOCUS
    } else {
        intent.evaluation_focus.as_str()
    };
    let excluded = excluded_titles_block(ctx);
    let max_results = candidates.len().min(cap);

    let prompt = judge_prompt(&JudgePromptInput {
        user_query: &ctx.user_query,
        requirements: &requirements,
        restrictions: &restrictions,
        evaluation_focus,
        excluded_titles: &excluded,
        candidates: &candidates_block,
        max_results,
    });

    ctx.record_llm_call(label);
    let raw = match model.complete(&prompt).await {
        Ok(raw) => raw,
        Err(err) => {
            warn!("Judge call failed: {}", err);
            return Vec::new();
        }
    };

    let selections = parse_selections(&raw);
    let chosen = apply_selections(&selections, candidates, ctx, max_results);
    debug!(
        candidates = candidates.len(),
        selected = selections.len(),
        kept = chosen.len(),
        "judge finished"
    );
    chosen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crag::types::RecipeSource;

    fn pool() -> Vec<CandidateRecipe> {
        ["Lentil Curry", "Tofu Scramble", "Beef Stew"]
            .iter()
            .map(|t| CandidateRecipe::new(*t, format!("Title: {}\nIngredients: ...", t), RecipeSource::Corpus))
            .collect()
    }

    fn selection(title: &str) -> JudgeSelection {
        JudgeSelection {
            title: title.to_string(),
            reason: format!("{} fits", title),
        }
    }

    #[test]
    fn parse_drops_blank_titles() {
        let raw = r#"[{"title": " Tofu Scramble ", "reason": "protein"}, {"title": ""}, {"reason": "x"}]"#;
        let selections = parse_selections(raw);
        assert_eq!(selections.len(), 1);
        assert_eq!(selections[0].title, "Tofu Scramble");
    }

    #[test]
    fn hallucinated_titles_are_dropped() {
        let ctx = RunContext::new("vegan", Vec::<String>::new());
        let chosen = apply_selections(
            &[selection("Imaginary Pie"), selection("Lentil Curry")],
            &pool(),
            &ctx,
            10,
        );
        assert_eq!(chosen.len(), 1);
        assert_eq!(chosen[0].title, "Lentil Curry");
        assert_eq!(chosen[0].match_reason.as_deref(), Some("Lentil Curry fits"));
    }

    #[test]
    fn excluded_and_repeated_titles_are_dropped() {
        let ctx = RunContext::new("vegan", ["Lentil Curry"]);
        let chosen = apply_selections(
            &[selection("Lentil Curry"), selection("Tofu Scramble"), selection("Tofu Scramble")],
            &pool(),
            &ctx,
            10,
        );
        let titles: Vec<_> = chosen.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Tofu Scramble"]);
    }

    #[test]
    fn selections_are_capped() {
        let ctx = RunContext::new("anything", Vec::<String>::new());
        let chosen = apply_selections(
            &[selection("Beef Stew"), selection("Tofu Scramble"), selection("Lentil Curry")],
            &pool(),
            &ctx,
            2,
        );
        assert_eq!(chosen.len(), 2);
        assert_eq!(chosen[0].title, "Beef Stew");
    }

    #[test]
    fn excluded_block_lists_titles_or_none() {
        assert_eq!(excluded_titles_block(&RunContext::new("q", Vec::<String>::new())), "None");
        assert_eq!(
            excluded_titles_block(&RunContext::new("q", ["B", "A"])),
            "- A\n- B"
        );
    }
}
