pub mod connection;
pub mod endpoints;
pub mod web_search;

pub use connection::{ApiConnectionError, LanguageModel};
pub use endpoints::{Provider, RetryPolicy};
pub use web_search::{TavilySearch, WebResult, WebSearch, WebSearchRequest};
