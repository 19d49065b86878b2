//! API Module
//!
//! HTTP handlers and routing for the profile service and cache administration.
//!
//! # Endpoints
//! - `GET /profiles`, `GET /profiles/:id`, `PUT /profiles/:id`
//! - `DELETE /cache/:key`, `POST /cache/invalidate`, `DELETE /cache`
//! - `GET /stats`, `GET /health`

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
