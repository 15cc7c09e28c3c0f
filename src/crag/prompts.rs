//! Prompt templates for every model call the pipeline makes.

pub fn query_optimizer_prompt(user_query: &str) -> String {
    format!(
        "You are a culinary search expert. Your goal is to translate a user's natural language request into a specific, keyword-rich search query that will match recipe titles, ingredients, and categories.

User Request: \"{user_query}\"

Instructions:
- Expand abstract concepts into concrete ingredients (e.g., \"high protein\" -> \"chicken beans tofu fish\").
- Expand dietary needs into concrete food classes (e.g., \"vegan\" -> \"plant-based no-dairy no-meat\").
- Expand situational requests into dish categories (e.g., \"cold day\" -> \"soup stew warm comfort\").
- Keep it concise and keyword-focused.
- Output ONLY the optimized query string on a single line.

Optimized Query:"
    )
}

pub fn intent_analyzer_prompt(user_query: &str) -> String {
    format!(
        "Analyze this recipe request to understand exactly what the user wants.

User Request: \"{user_query}\"

Provide a structured analysis as JSON:
{{
    \"primary_goal\": \"what type of dish/meal\",
    \"requirements\": [
        {{\"attribute\": \"...\", \"qualifier\": \"high/low/with/without/etc\", \"look_for\": \"specific things to find\"}}
    ],
    \"restrictions\": [
        {{\"attribute\": \"...\", \"avoid\": \"specific things to avoid\"}}
    ],
    \"evaluation_focus\": \"describe what recipe sections matter and why\"
}}

Examples:
- \"high protein\" -> requirement {{\"attribute\": \"protein\", \"qualifier\": \"high\", \"look_for\": \"meat, fish, eggs, legumes, tofu\"}}
- \"low carb\" -> restriction {{\"attribute\": \"carbs\", \"avoid\": \"pasta, rice, bread, potatoes, sugar\"}}
- \"without nuts\" -> restriction {{\"attribute\": \"nuts\", \"avoid\": \"almonds, walnuts, peanuts, cashews, pine nuts\"}}
- \"quick meal\" -> requirement {{\"attribute\": \"time\", \"qualifier\": \"short\", \"look_for\": \"under 30 minutes\"}}
- \"very spicy\" -> requirement {{\"attribute\": \"spice\", \"qualifier\": \"high\", \"look_for\": \"hot peppers, chili, cayenne\"}}
- \"mild flavor\" -> restriction {{\"attribute\": \"spice\", \"avoid\": \"hot peppers, strong spices\"}}

Output JSON only.

Analysis:"
    )
}

pub struct JudgePromptInput<'a> {
    pub user_query: &'a str,
    pub requirements: &'a str,
    pub restrictions: &'a str,
    pub evaluation_focus: &'a str,
    pub excluded_titles: &'a str,
    pub candidates: &'a str,
    pub max_results: usize,
}

pub fn judge_prompt(input: &JudgePromptInput<'_>) -> String {
    format!(
        "You are an expert culinary judge. Evaluate recipes against the user's specific requirements.

User Request: \"{user_query}\"

Requirements (must have):
{requirements}

Restrictions (must avoid):
{restrictions}

Evaluation Focus:
{evaluation_focus}

Excluded Recipe Titles:
{excluded_titles}

Candidate Recipes (relevant content only):
-------------------
{candidates}
-------------------

Instructions:
- A recipe must match the user's primary request (dish type, cuisine, or specific recipe name).
- A recipe must satisfy all Requirements to be selected.
- Reject any recipe that violates any Restrictions.
- Exclude any recipe whose title matches the Excluded Recipe Titles.
- IMPORTANT: If no recipes match the user's request, return an empty array: [].
- It is better to return no results than to return irrelevant recipes.
- Select up to {max_results} genuinely relevant recipes.
- Ensure each recipe title is unique.
- Return a JSON array with objects: {{\"title\": \"exact title\", \"reason\": \"brief explanation\"}}.
- Rank results by relevance (best first).
- Output JSON only.

Selected Recipes:",
        user_query = input.user_query,
        requirements = input.requirements,
        restrictions = input.restrictions,
        evaluation_focus = input.evaluation_focus,
        excluded_titles = input.excluded_titles,
        candidates = input.candidates,
        max_results = input.max_results,
    )
}

pub fn web_extraction_prompt(user_query: &str, results_context: &str) -> String {
    format!(
        "You are a culinary assistant. Extract and format recipes from the following web search results.

User Query: \"{user_query}\"

Web Results:
{results_context}

Instructions:
- Extract distinct recipes found in the text.
- Return a JSON array of objects with keys: \"title\", \"recipe_text\".
- \"recipe_text\" should include Title, Ingredients, and Directions.
- If ingredients/directions are missing, summarize what is available and include the Source URL.
- Output JSON only.

Formatted Recipes:"
    )
}

pub fn adaptation_prompt(user_query: &str, recipe_text: &str, adaptation_goal: &str) -> String {
    format!(
        "You are a culinary assistant adapting a recipe to better meet a user's goal.

User Request: \"{user_query}\"
Adaptation Goal: \"{adaptation_goal}\"
Selected Recipe:
{recipe_text}

Instructions:
- Provide exactly 3 options.
- Option 1: ingredient swaps for the goal that keep the dish recognizable.
- Option 2: add-ons or modifications that increase the goal.
- Option 3: a new recipe aligned with the goal and user request.
- Return a JSON array of objects with keys: \"title\", \"approach\", \"summary\", \"ingredients\", \"directions\".
- \"ingredients\" should be a list of strings.
- \"directions\" should be a list of strings.
- Output JSON only.

Options:"
    )
}

pub fn format_recipe_prompt(user_query: &str, recipe_text: &str) -> String {
    format!(
        "You are a helpful culinary assistant. Present the following recipe to the user in a clear, appetizing format.

Recipe:
{recipe_text}

User Request: \"{user_query}\"

Instructions:
- Provide the Title (in bold), a one-sentence summary of why it fits their request, the Ingredients list, and Directions.
- Format it using Markdown.
- Do NOT invent nutritional values.
- If the user asked for something specific (e.g., \"no pepper\"), mention whether the recipe is a good fit or which ingredient they need to omit.

Response:"
    )
}
