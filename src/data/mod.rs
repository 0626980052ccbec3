//! Database models and per-table repositories.

pub mod caching_results;
pub mod classes;
pub mod games;
pub mod health;
pub mod jobs;
pub mod models;
pub mod tables;
pub mod weeks;
