pub mod api_connection;
pub mod cli;
pub mod config;
pub mod crag;
pub mod search;
pub mod session;
