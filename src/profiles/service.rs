//! Cached profile reads and invalidating profile writes.

use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use serde::Serialize;
use tracing::info;

use super::{Profile, ProfileBackend, ProfileUpdate};
use crate::cache::{generate_cache_key, CacheOptions, CachedFn, Invalidation, QueryCache};
use crate::error::{CacheError, ServiceError};

/// Function name keyed for single-profile reads.
pub const GET_PROFILE_FN: &str = "getUserProfile";
/// Function name keyed for profile listings.
pub const LIST_PROFILES_FN: &str = "listUserProfiles";

type ReadFn<P, T> = Box<dyn Fn(P) -> BoxFuture<'static, Result<T, ServiceError>> + Send + Sync>;
type CachedRead<P, T> = CachedFn<P, T, ServiceError, ReadFn<P, T>>;

/// Parameters of `getUserProfile`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileParams {
    #[serde(rename = "userId")]
    pub user_id: String,
}

impl ProfileParams {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

// == Profile Service ==
/// Profile data access with reads served through the query cache.
pub struct ProfileService {
    cache: QueryCache,
    backend: Arc<dyn ProfileBackend>,
    get_profile: CachedRead<ProfileParams, Option<Profile>>,
    list_profiles: CachedRead<(), Vec<Profile>>,
}

impl ProfileService {
    /// Wires cached reads for `backend` into `cache`.
    pub fn new(
        cache: QueryCache,
        backend: Arc<dyn ProfileBackend>,
        profile_ttl: Duration,
    ) -> Result<Self, CacheError> {
        let fetch_backend = Arc::clone(&backend);
        let fetch: ReadFn<ProfileParams, Option<Profile>> = Box::new(move |params: ProfileParams| {
            let backend = Arc::clone(&fetch_backend);
            async move { backend.fetch_profile(&params.user_id).await }.boxed()
        });

        let list_backend = Arc::clone(&backend);
        let list: ReadFn<(), Vec<Profile>> = Box::new(move |()| {
            let backend = Arc::clone(&list_backend);
            async move { backend.list_profiles().await }.boxed()
        });

        let get_profile = cache.wrap(GET_PROFILE_FN, fetch, CacheOptions::new().ttl(profile_ttl))?;
        let list_profiles = cache.wrap(LIST_PROFILES_FN, list, CacheOptions::new().ttl(profile_ttl))?;

        Ok(Self {
            cache,
            backend,
            get_profile,
            list_profiles,
        })
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Cache key of the `getUserProfile` entry for `user_id`.
    pub fn profile_cache_key(user_id: &str) -> Result<String, CacheError> {
        generate_cache_key(GET_PROFILE_FN, &ProfileParams::new(user_id))
    }

    // == Get User Profile ==
    /// Loads one profile through the cache. A missing profile is cached too.
    pub async fn get_user_profile(&self, user_id: &str) -> Result<Option<Profile>, ServiceError> {
        self.get_profile.call(ProfileParams::new(user_id)).await
    }

    // == List User Profiles ==
    pub async fn list_user_profiles(&self) -> Result<Vec<Profile>, ServiceError> {
        self.list_profiles.call(()).await
    }

    // == Update User Profile ==
    /// Writes `update` to the backend, then drops the profile's entry and
    /// every listing. Nothing is invalidated if the write fails.
    pub async fn update_user_profile(
        &self,
        user_id: &str,
        update: ProfileUpdate,
    ) -> Result<Profile, ServiceError> {
        let plan = Invalidation::new()
            .key(Self::profile_cache_key(user_id)?)
            .pattern(format!("^{}", LIST_PROFILES_FN));

        let write = async {
            self.backend
                .update_profile(user_id, update)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("profile '{}'", user_id)))
        };

        let profile = self.cache.after_write(write, &plan).await?;
        info!(user_id, "profile updated");
        Ok(profile)
    }
}
