//! Web API module exposing the job and caching boundary.

pub mod caching;
pub mod error;
pub mod jobs;
pub mod routes;
pub mod status;

pub use routes::create_router;
