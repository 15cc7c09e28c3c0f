use tracing::{debug, warn};

use crate::api_connection::LanguageModel;

use super::json_extract::{parse_json_list, string_field, string_list_field};
use super::prompts::adaptation_prompt;
use super::types::{AdaptationOption, CandidateRecipe, RecipeSource};

pub const OPTION_COUNT: usize = 3;

pub fn parse_adaptation_options(raw: &str) -> Vec<AdaptationOption> {
    parse_json_list(raw)
        .iter()
        .take(OPTION_COUNT)
        .enumerate()
        .map(|(i, item)| AdaptationOption {
            title: match string_field(item, "title") {
                t if t.is_empty() => format!("Option {}", i + 1),
                t => t,
            },
            approach: string_field(item, "approach"),
            summary: string_field(item, "summary"),
            ingredients: string_list_field(item, "ingredients"),
            directions: string_list_field(item, "directions"),
        })
        .collect()
}

/// Three variants of `recipe_text` toward `goal`: a substitution, an
/// add-on/modification and a new recipe. Any failure yields no options.
pub async fn generate_adaptations(
    model: &dyn LanguageModel,
    user_query: &str,
    recipe_text: &str,
    goal: &str,
) -> Vec<AdaptationOption> {
    let goal = goal.trim();
    if goal.is_empty() {
        return Vec::new();
    }
    match model.complete(&adaptation_prompt(user_query, recipe_text, goal)).await {
        Ok(raw) => {
            let options = parse_adaptation_options(&raw);
            debug!("Generated {} adaptation options for '{}'", options.len(), goal);
            options
        }
        Err(err) => {
            warn!("Adaptation call failed: {}", err);
            Vec::new()
        }
    }
}

/// Recipe text for an applied option, laid out so it can be adapted again.
pub fn render_option(option: &AdaptationOption) -> String {
    let ingredients = option
        .ingredients
        .iter()
        .map(|i| format!("- {}", i))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Title: {}\n\nSummary: {}\n\nIngredients:\n{}\n\nDirections:\n{}",
        option.title,
        option.summary,
        ingredients,
        option.directions.join("\n")
    )
}

pub fn option_to_recipe(option: &AdaptationOption, source: RecipeSource) -> CandidateRecipe {
    CandidateRecipe::new(option.title.clone(), render_option(option), source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crag::title::extract_title;

    #[test]
    fn parses_three_options_and_ignores_extras() {
        let raw = r#"Options:
        [
          {"title": "Tofu Tikka", "approach": "swap", "summary": "Paneer to tofu",
           "ingredients": ["tofu", "yogurt"], "directions": ["Marinate", "Grill"]},
          {"title": "Extra Veg Tikka", "approach": "add-on", "summary": "More veg",
           "ingredients": "peppers", "directions": []},
          {"approach": "new", "summary": "Chickpea curry", "ingredients": [], "directions": []},
          {"title": "Fourth", "approach": "", "summary": "", "ingredients": [], "directions": []}
        ]"#;
        let options = parse_adaptation_options(raw);
        assert_eq!(options.len(), 3);
        assert_eq!(options[0].ingredients, vec!["tofu", "yogurt"]);
        assert_eq!(options[1].ingredients, vec!["peppers"]);
        assert_eq!(options[2].title, "Option 3");
    }

    #[test]
    fn malformed_output_gives_no_options() {
        assert!(parse_adaptation_options("Here you go: {oops").is_empty());
        assert!(parse_adaptation_options("").is_empty());
    }

    #[test]
    fn rendered_option_round_trips_its_title() {
        let option = AdaptationOption {
            title: "Smoky Bean Chili".to_string(),
            approach: "swap".to_string(),
            summary: "Beans instead of beef".to_string(),
            ingredients: vec!["black beans".to_string(), "chipotle".to_string()],
            directions: vec!["Simmer 20 min.".to_string()],
        };
        let text = render_option(&option);
        assert_eq!(extract_title(&text), "Smoky Bean Chili");
        assert!(text.contains("Ingredients:\n- black beans\n- chipotle"));
        assert!(text.ends_with("Directions:\nSimmer 20 min."));
    }
}
