//! # wisemark-api
//!
//! HTTP surface of wisemark: bearer-authenticated REST endpoints for lenses,
//! projects, documents, and highlights, with the middleware stack and
//! configuration the server binary assembles.

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod logging;
pub mod openapi;
pub mod router;
pub mod state;

pub use config::ApiConfig;
pub use error::ApiError;
pub use router::{build_router, RouterConfig};
pub use state::AppState;
