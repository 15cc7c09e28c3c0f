const TITLE_PREFIXES: &[&str] = &["title:", "recipe:", "name:"];
const HEADER_SCAN_LINES: usize = 5;
const MAX_TITLE_CHARS: usize = 100;

/// Derives the dedup title of a recipe text block.
pub fn extract_title(recipe_text: &str) -> String {
    let lines: Vec<&str> = recipe_text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let Some(first) = lines.first() else {
        return "Recipe".to_string();
    };

    for line in lines.iter().take(HEADER_SCAN_LINES) {
        let lower = line.to_lowercase();
        if TITLE_PREFIXES.iter().any(|prefix| lower.starts_with(prefix)) {
            match line.split_once(':').map(|(_, rest)| rest.trim()) {
                Some(rest) if !rest.is_empty() => return rest.to_string(),
                _ => continue,
            }
        }
    }

    first.chars().take(MAX_TITLE_CHARS).collect()
}
