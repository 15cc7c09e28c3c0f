use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use recipe_crag::api_connection::TavilySearch;
use recipe_crag::cli::{init_tracing, list_index, parse_args, Command};
use recipe_crag::config::Settings;
use recipe_crag::crag::{AdaptationOption, CandidateRecipe, CragWorkflow, RecipeSource};
use recipe_crag::search::{Embedder, EmbeddingEngine, LazyRecipeIndex};
use recipe_crag::session::SearchSession;

const SNIPPET_CHARS: usize = 300;

fn build_workflow(settings: &Settings) -> CragWorkflow {
    let store = LazyRecipeIndex::new(settings.index_path.clone(), || {
        Ok(Box::new(EmbeddingEngine::new()?) as Box<dyn Embedder>)
    });
    CragWorkflow::new(
        Arc::new(settings.build_provider()),
        Arc::new(store),
        Arc::new(TavilySearch::new(&settings.search_api_key_env)),
    )
    .with_limits(settings.limits())
}

fn snippet(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(SNIPPET_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

fn print_recipes(recipes: &[CandidateRecipe], first_number: usize) {
    for (offset, recipe) in recipes.iter().enumerate() {
        let marker = if recipe.source == RecipeSource::Web { " [web]" } else { "" };
        println!("\nOption {}: {}{}", first_number + offset, recipe.title, marker);
        if let Some(reason) = &recipe.match_reason {
            println!("  why: {}", reason);
        }
        println!("  {}", snippet(&recipe.recipe_text).replace('\n', "\n  "));
    }
}

fn print_options(options: &[AdaptationOption]) {
    for (idx, option) in options.iter().enumerate() {
        println!("\nOption {}: {}", idx + 1, option.title);
        if !option.approach.is_empty() {
            println!("  approach: {}", option.approach);
        }
        if !option.summary.is_empty() {
            println!("  {}", option.summary);
        }
        for ingredient in &option.ingredients {
            println!("  - {}", ingredient);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = parse_args();
    init_tracing(&cli);

    let settings = Settings::from_env();
    let session_path = cli.session.clone().unwrap_or_else(|| settings.session_file.clone());
    let mut session = SearchSession::load(&session_path).await?;
    let workflow = build_workflow(&settings);

    match cli.command {
        Command::Search { query } => {
            let query = query.join(" ");
            let found = session.new_search(&workflow, &query).await?;
            if found.is_empty() {
                println!("No recipes were returned. Try another query, or `web` to search online.");
            } else {
                println!("Found {} recipes. Choose one with `select <n>`.", found.len());
                print_recipes(&found, 1);
            }
        }
        Command::More => {
            let first_number = session.recipes.len() + 1;
            let found = session.more_results(&workflow).await?;
            if found.is_empty() {
                println!("No more unique recipes in the database. Try `web` to search online.");
            } else {
                println!("Found {} new recipes!", found.len());
                print_recipes(&found, first_number);
            }
        }
        Command::Web => {
            let first_number = session.recipes.len() + 1;
            let found = session.search_web(&workflow).await?;
            if found.is_empty() {
                println!("Could not find relevant recipes online.");
            } else {
                println!("Found {} recipes from the web!", found.len());
                print_recipes(&found, first_number);
            }
        }
        Command::Select { number } => {
            let index = list_index(number).ok_or_else(|| anyhow!("Recipe numbers start at 1"))?;
            let recipe = session.select(index)?;
            println!("Selected: {}\n\n{}", recipe.title, recipe.recipe_text);
        }
        Command::Adapt { goal } => {
            let options = session.adapt(&workflow, &goal.join(" ")).await?;
            if options.is_empty() {
                println!("No adaptation options were generated. Try rephrasing the goal.");
            } else {
                print_options(options);
                println!("\nApply one with `use <n>`.");
            }
        }
        Command::Use { number } => {
            let index = list_index(number).ok_or_else(|| anyhow!("Option numbers start at 1"))?;
            let recipe = session.apply_option(index)?;
            println!("Updated recipe to: {}\n\n{}", recipe.title, recipe.recipe_text);
        }
        Command::Format => {
            let formatted = session.format(&workflow, settings.format_timeout).await?;
            println!("{}", formatted);
        }
        Command::Show => {
            match &session.last_query {
                Some(query) => println!("Query: {}", query),
                None => println!("No active search."),
            }
            print_recipes(&session.recipes, 1);
            if let Some(current) = &session.current_recipe {
                println!("\nCurrent recipe: {}", current.title);
            }
            for (step, entry) in session.adaptation_history.iter().enumerate() {
                println!("  step {}: {} (from {})", step + 1, entry.goal, entry.source_recipe);
            }
        }
    }

    session
        .save(&session_path)
        .await
        .with_context(|| format!("Failed to persist session to {}", session_path.display()))
}
