use crate::api_connection::{ApiConnectionError, LanguageModel};

use super::prompts::format_recipe_prompt;

/// Markdown presentation of one selected recipe.
///
/// Unlike the pipeline steps this surfaces the error: the caller wraps it in
/// its own timeout and reports failures to the user.
pub async fn format_recipe(
    model: &dyn LanguageModel,
    user_query: &str,
    recipe_text: &str,
) -> Result<String, ApiConnectionError> {
    let formatted = model
        .complete(&format_recipe_prompt(user_query, recipe_text))
        .await?;
    Ok(formatted.trim().to_string())
}
