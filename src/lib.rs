//! News Reader - a paginated news client core
//!
//! Fetches pages of articles from a NewsAPI-compatible service, accumulates
//! them per feed (breaking news, search), and keeps saved articles in a local
//! SQLite store. A small JSON HTTP surface drives it from a UI process.

pub mod accumulator;
pub mod api;
pub mod config;
pub mod connectivity;
pub mod db;
pub mod error;
pub mod model;
pub mod repository;
pub mod routes;
