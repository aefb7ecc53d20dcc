// Public API for integration tests and the server binary

pub mod api;
pub mod auth;
pub mod config;
pub mod deck;
pub mod error;
pub mod guard;
pub mod handlers;
pub mod state;
pub mod store;
pub mod types;
