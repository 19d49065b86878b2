//! API Handlers
//!
//! HTTP request handlers for profile reads/writes and cache administration.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::cache::QueryCache;
use crate::config::Config;
use crate::error::{CacheError, ServiceError};
use crate::models::{
    ClearResponse, HealthResponse, InvalidatePatternRequest, InvalidatePatternResponse,
    InvalidateResponse, StatsResponse,
};
use crate::profiles::{InMemoryBackend, Profile, ProfileBackend, ProfileService, ProfileUpdate};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Query cache shared by every service
    pub cache: QueryCache,
    /// Cached profile data access
    pub profiles: Arc<ProfileService>,
}

impl AppState {
    /// Creates a new AppState serving profiles from `backend`.
    pub fn new(
        cache: QueryCache,
        backend: Arc<dyn ProfileBackend>,
        config: &Config,
    ) -> Result<Self, CacheError> {
        let profiles = ProfileService::new(cache.clone(), backend, config.profile_ttl())?;
        Ok(Self {
            cache,
            profiles: Arc::new(profiles),
        })
    }

    /// Creates a new AppState from configuration.
    ///
    /// Uses a seeded in-memory backend with the configured latency.
    pub fn from_config(config: &Config) -> Result<Self, CacheError> {
        let backend = Arc::new(InMemoryBackend::seeded(config.backend_latency()));
        Self::new(QueryCache::from_config(config), backend, config)
    }
}

/// Handler for GET /profiles
pub async fn list_profiles_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<Profile>>, ServiceError> {
    let profiles = state.profiles.list_user_profiles().await?;
    Ok(Json(profiles))
}

/// Handler for GET /profiles/:id
///
/// Served from the cache when fresh; 404 when the profile does not exist.
pub async fn get_profile_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Profile>, ServiceError> {
    state
        .profiles
        .get_user_profile(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ServiceError::NotFound(format!("profile '{}'", id)))
}

/// Handler for PUT /profiles/:id
///
/// Writes through to the backend, then invalidates the profile and listings.
pub async fn update_profile_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<Profile>, ServiceError> {
    if update.is_empty() {
        return Err(ServiceError::InvalidRequest(
            "Update must set at least one field".to_string(),
        ));
    }

    let profile = state.profiles.update_user_profile(&id, update).await?;
    Ok(Json(profile))
}

/// Handler for DELETE /cache/:key
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<InvalidateResponse> {
    let removed = state.cache.invalidate(&key);
    Json(InvalidateResponse::new(key, removed))
}

/// Handler for POST /cache/invalidate
pub async fn invalidate_pattern_handler(
    State(state): State<AppState>,
    Json(req): Json<InvalidatePatternRequest>,
) -> Result<Json<InvalidatePatternResponse>, ServiceError> {
    if let Some(error_msg) = req.validate() {
        return Err(ServiceError::InvalidRequest(error_msg));
    }

    let removed = state.cache.invalidate_pattern(&req.pattern)?;
    Ok(Json(InvalidatePatternResponse::new(req.pattern, removed)))
}

/// Handler for DELETE /cache
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    let removed = state.cache.stats().total;
    state.cache.clear();
    Json(ClearResponse::new(removed))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(
        state.cache.stats(),
        state.cache.pending_requests(),
    ))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
