//! Backing store interface for profiles and an in-memory implementation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{Profile, ProfileUpdate};
use crate::error::ServiceError;

// == Profile Backend ==
/// The hosted data store as seen by the profile service.
#[async_trait]
pub trait ProfileBackend: Send + Sync {
    /// Loads one profile, `None` if it does not exist.
    async fn fetch_profile(&self, id: &str) -> Result<Option<Profile>, ServiceError>;

    /// Loads every profile, ordered by id.
    async fn list_profiles(&self) -> Result<Vec<Profile>, ServiceError>;

    /// Applies `update`; `None` if the profile does not exist.
    async fn update_profile(
        &self,
        id: &str,
        update: ProfileUpdate,
    ) -> Result<Option<Profile>, ServiceError>;
}

// == In-Memory Backend ==
/// Map-backed store with optional simulated latency and call counters.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    profiles: RwLock<HashMap<String, Profile>>,
    latency: Duration,
    reads: AtomicUsize,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
}

impl InMemoryBackend {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    pub fn with_profiles(latency: Duration, profiles: impl IntoIterator<Item = Profile>) -> Self {
        let profiles = profiles.into_iter().map(|p| (p.id.clone(), p)).collect();
        Self {
            profiles: RwLock::new(profiles),
            latency,
            ..Self::default()
        }
    }

    /// Backend holding a few staff profiles.
    pub fn seeded(latency: Duration) -> Self {
        Self::with_profiles(
            latency,
            [
                Profile::new("u1", "Maya Okafor", "maya@example.com", "trainer"),
                Profile::new("u2", "Tomas Lindqvist", "tomas@example.com", "trainer"),
                Profile::new("u3", "Priya Raman", "priya@example.com", "admin"),
            ],
        )
    }

    /// Number of read calls served so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of write calls attempted so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Makes subsequent writes fail with a backend error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl ProfileBackend for InMemoryBackend {
    async fn fetch_profile(&self, id: &str) -> Result<Option<Profile>, ServiceError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        debug!(id, "backend fetch_profile");
        Ok(self.profiles.read().await.get(id).cloned())
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, ServiceError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        let mut profiles: Vec<Profile> = self.profiles.read().await.values().cloned().collect();
        profiles.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(profiles)
    }

    async fn update_profile(
        &self,
        id: &str,
        update: ProfileUpdate,
    ) -> Result<Option<Profile>, ServiceError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ServiceError::Backend(format!("write to profile '{}' rejected", id)));
        }

        let mut profiles = self.profiles.write().await;
        Ok(profiles.get_mut(id).map(|profile| {
            profile.apply(update);
            profile.clone()
        }))
    }
}
