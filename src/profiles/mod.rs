//! Profiles Module
//!
//! Profile data access: the backend interface, an in-memory backend, and the
//! service that routes reads through the query cache.

mod backend;
mod model;
mod service;

pub use backend::{InMemoryBackend, ProfileBackend};
pub use model::{Profile, ProfileUpdate};
pub use service::{ProfileParams, ProfileService, GET_PROFILE_FN, LIST_PROFILES_FN};
