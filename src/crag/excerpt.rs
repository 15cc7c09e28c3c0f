//! Intent-focused views of recipe text, sent to the judge instead of the
//! full recipe.

use super::types::IntentAnalysis;

const INGREDIENT_KEYWORDS: &[&str] = &[
    "ingredient", "protein", "carb", "calorie", "fat", "fiber", "sugar", "dairy", "gluten", "nut",
    "vegan", "vegetarian", "meat", "fish", "chicken", "beef", "tofu", "legume", "allergen", "spice",
];

const DIRECTION_KEYWORDS: &[&str] = &[
    "direction", "instruction", "method", "step", "cook", "bake", "grill", "roast", "fry", "prep",
    "time", "quick", "slow",
];

const TIME_KEYWORDS: &[&str] = &["time", "minute", "hour", "quick", "slow"];

const SECTION_HEADERS: &[&str] = &[
    "ingredients", "directions", "instructions", "method", "steps", "prep", "cook", "time",
];

const INGREDIENT_HEADERS: &[&str] = &["ingredients"];
const DIRECTION_HEADERS: &[&str] = &["directions", "instructions", "method", "steps"];

const TIME_LINE_MARKERS: &[&str] = &["time", "min", "hour"];
const MAX_TIME_LINES: usize = 5;
const RAW_FALLBACK_CHARS: usize = 800;
const NOT_SPECIFIED: &str = "Not specified";

/// Which sections an excerpt should carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExcerptPlan {
    pub ingredients: bool,
    pub directions: bool,
    pub time: bool,
}

impl ExcerptPlan {
    pub fn for_intent(intent: &IntentAnalysis) -> Self {
        let blob = focus_blob(intent);
        let mentions = |keywords: &[&str]| keywords.iter().any(|k| blob.contains(k));
        Self {
            ingredients: mentions(INGREDIENT_KEYWORDS),
            directions: mentions(DIRECTION_KEYWORDS),
            time: mentions(TIME_KEYWORDS),
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.ingredients || self.directions || self.time)
    }
}

fn focus_blob(intent: &IntentAnalysis) -> String {
    let requirements = serde_json::to_string(&intent.requirements).unwrap_or_default();
    let restrictions = serde_json::to_string(&intent.restrictions).unwrap_or_default();
    format!("{} {} {}", intent.evaluation_focus, requirements, restrictions).to_lowercase()
}

/// Text from the first matching header up to the first other header found,
/// checked in `SECTION_HEADERS` order, or to the end of the text.
///
/// Headers are matched case-insensitively; an absent section yields "".
/// Header words inside the section (`cooked`, `prepared`) only end it when no
/// higher-ranked header follows.
pub fn extract_section(recipe_text: &str, headers: &[&str]) -> String {
    // ASCII lowercasing keeps byte offsets aligned with the original text.
    let lower = recipe_text.to_ascii_lowercase();
    let Some((header, start)) = headers
        .iter()
        .find_map(|header| lower.find(header).map(|idx| (*header, idx)))
    else {
        return String::new();
    };

    let remaining_lower = &lower[start..];
    let end = SECTION_HEADERS
        .iter()
        .filter(|next| **next != header)
        .find_map(|next| remaining_lower.find(next).filter(|idx| *idx > 0))
        .unwrap_or(remaining_lower.len());

    recipe_text[start..start + end].trim().to_string()
}

/// Up to five lines that mention a duration.
pub fn extract_time_lines(recipe_text: &str) -> String {
    recipe_text
        .lines()
        .map(str::trim)
        .filter(|line| {
            let lower = line.to_lowercase();
            !line.is_empty() && TIME_LINE_MARKERS.iter().any(|m| lower.contains(m))
        })
        .take(MAX_TIME_LINES)
        .collect::<Vec<_>>()
        .join("\n")
}

fn or_not_specified(section: String) -> String {
    if section.is_empty() {
        NOT_SPECIFIED.to_string()
    } else {
        section
    }
}

/// Never empty: at minimum the title line plus a slice of the raw text.
pub fn build_candidate_excerpt(title: &str, recipe_text: &str, intent: &IntentAnalysis) -> String {
    let plan = ExcerptPlan::for_intent(intent);
    let mut parts = vec![format!("Title: {}", title)];

    if plan.ingredients {
        let section = or_not_specified(extract_section(recipe_text, INGREDIENT_HEADERS));
        parts.push(format!("Ingredients:\n{}", section));
    }
    if plan.time {
        let section = or_not_specified(extract_time_lines(recipe_text));
        parts.push(format!("Time:\n{}", section));
    }
    if plan.directions {
        let section = or_not_specified(extract_section(recipe_text, DIRECTION_HEADERS));
        parts.push(format!("Directions:\n{}", section));
    }
    if plan.is_empty() {
        parts.push(recipe_text.chars().take(RAW_FALLBACK_CHARS).collect());
    }

    parts.join("\n\n")
}

/// Numbered candidate block for the judge prompt.
pub fn number_excerpts<'a, I>(excerpts: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    excerpts
        .into_iter()
        .enumerate()
        .map(|(i, excerpt)| format!("Recipe {}:\n{}\n\n", i + 1, excerpt))
        .collect()
}
