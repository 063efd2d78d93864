use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::identity::UserId;

/// A neighbor's profile. Fully replaced on save; there is no partial update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    /// Inline data URL.
    #[serde(default)]
    pub photo: Option<String>,
    pub street: String,
    pub house_number: String,
    /// Free-text "what I grow".
    #[serde(default)]
    pub produces_available: Option<String>,
    #[serde(default)]
    pub looking_for: Option<String>,
}

impl UserProfile {
    /// Name, street and house number are required before a profile can be saved.
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty()
            && !self.street.trim().is_empty()
            && !self.house_number.trim().is_empty()
    }
}

/// The shared directory of all neighbors' profiles, keyed by user id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileDirectory {
    pub profiles: BTreeMap<UserId, UserProfile>,
}

impl ProfileDirectory {
    /// Insert or whole-value replace a user's profile.
    pub fn upsert(&mut self, user: UserId, profile: UserProfile) {
        self.profiles.insert(user, profile);
    }

    pub fn get(&self, user: &UserId) -> Option<&UserProfile> {
        self.profiles.get(user)
    }
}
