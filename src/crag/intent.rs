use serde_json::Value;
use tracing::{debug, warn};

use crate::api_connection::LanguageModel;

use super::json_extract::{parse_json_object, string_field, JsonObject};
use super::prompts::intent_analyzer_prompt;
use super::types::{IntentAnalysis, Requirement, Restriction, RunContext, DEFAULT_EVALUATION_FOCUS};

/// Builds an analysis from the analyzer's raw output, or the fallback when the
/// output holds no usable object.
pub fn parse_intent(raw: &str, user_query: &str) -> IntentAnalysis {
    let object = match parse_json_object(raw) {
        Some(object) if !object.is_empty() => object,
        _ => return IntentAnalysis::fallback(user_query),
    };

    let primary_goal = match string_field(&object, "primary_goal") {
        goal if goal.is_empty() => user_query.to_string(),
        goal => goal,
    };
    let evaluation_focus = match string_field(&object, "evaluation_focus") {
        focus if focus.is_empty() => DEFAULT_EVALUATION_FOCUS.to_string(),
        focus => focus,
    };

    IntentAnalysis {
        primary_goal,
        requirements: objects_in(&object, "requirements")
            .map(|item| Requirement {
                attribute: string_field(item, "attribute"),
                qualifier: string_field(item, "qualifier"),
                look_for: string_field(item, "look_for"),
            })
            .collect(),
        restrictions: objects_in(&object, "restrictions")
            .map(|item| Restriction {
                attribute: string_field(item, "attribute"),
                avoid: string_field(item, "avoid"),
            })
            .collect(),
        evaluation_focus,
    }
}

fn objects_in<'a>(object: &'a JsonObject, key: &str) -> impl Iterator<Item = &'a JsonObject> {
    object
        .get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

/// One analyzer call. A failed call degrades to the fallback analysis.
pub async fn analyze_intent(model: &dyn LanguageModel, ctx: &mut RunContext, label: &str) -> IntentAnalysis {
    ctx.record_llm_call(label);
    match model.complete(&intent_analyzer_prompt(&ctx.user_query)).await {
        Ok(raw) => {
            let intent = parse_intent(&raw, &ctx.user_query);
            debug!(
                requirements = intent.requirements.len(),
                restrictions = intent.restrictions.len(),
                "intent analyzed"
            );
            intent
        }
        Err(err) => {
            warn!("Intent analysis failed, using default focus: {}", err);
            IntentAnalysis::fallback(&ctx.user_query)
        }
    }
}

/// The run's analysis, computed on first use and reused afterwards.
pub async fn ensure_intent(model: &dyn LanguageModel, ctx: &mut RunContext, label: &str) -> IntentAnalysis {
    if let Some(intent) = &ctx.intent_analysis {
        return intent.clone();
    }
    let intent = analyze_intent(model, ctx, label).await;
    ctx.intent_analysis = Some(intent.clone());
    intent
}
