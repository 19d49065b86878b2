//! Profile records as returned by the backing store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// == Profile ==
/// A user profile shown on staff and trainer pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub role: String,
    #[serde(default)]
    pub bio: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn new(
        id: impl Into<String>,
        full_name: impl Into<String>,
        email: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            full_name: full_name.into(),
            email: email.into(),
            role: role.into(),
            bio: None,
            updated_at: Utc::now(),
        }
    }

    /// Applies the set fields of `update` and bumps `updated_at`.
    pub fn apply(&mut self, update: ProfileUpdate) {
        if let Some(full_name) = update.full_name {
            self.full_name = full_name;
        }
        if let Some(email) = update.email {
            self.email = email;
        }
        if let Some(role) = update.role {
            self.role = role;
        }
        if let Some(bio) = update.bio {
            self.bio = Some(bio);
        }
        self.updated_at = Utc::now();
    }
}

// == Profile Update ==
/// Partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

impl ProfileUpdate {
    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.email.is_none() && self.role.is_none() && self.bio.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_update() {
        let mut profile = Profile::new("u1", "Ada Lovelace", "ada@example.com", "trainer");
        let before = profile.updated_at;

        profile.apply(ProfileUpdate {
            full_name: Some("Ada King".into()),
            bio: Some("Analytical engines".into()),
            ..Default::default()
        });

        assert_eq!(profile.full_name, "Ada King");
        assert_eq!(profile.email, "ada@example.com");
        assert_eq!(profile.bio.as_deref(), Some("Analytical engines"));
        assert!(profile.updated_at >= before);
    }

    #[test]
    fn test_update_deserialize_partial() {
        let update: ProfileUpdate = serde_json::from_str(r#"{"role": "admin"}"#).unwrap();
        assert_eq!(update.role.as_deref(), Some("admin"));
        assert!(update.full_name.is_none());
        assert!(!update.is_empty());
        assert!(ProfileUpdate::default().is_empty());
    }
}
