//! Listing lifecycle: load, submit, approve/reject, requests, expiry, and
//! the first-come-first-served admin claim.
//!
//! The board keeps two ordered shared collections (approved and pending
//! listings, newest first) plus the per-device profile and the shared
//! profile directory. Shared keys are whole-value overwrites with no
//! conflict detection: two devices writing concurrently race and the later
//! write wins. That is an accepted limitation of the storage model, not a
//! bug this module tries to fix.

use anyhow::Result;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, warn};

use veggieswap_common::identity::UserId;
use veggieswap_common::listing::{
    dedup_by_id, Listing, ListingDraft, ListingId, ListingStatus, Request, RequestDraft,
    RequestId,
};
use veggieswap_common::profile::{ProfileDirectory, UserProfile};
use veggieswap_store::{LocalStore, Partition};

/// Shared key holding the approved listings.
pub const LISTINGS_KEY: &str = "veggie-listings";
/// Shared key holding the listings awaiting approval.
pub const PENDING_KEY: &str = "pending-listings";
/// Shared key holding the directory of all profiles.
pub const ALL_PROFILES_KEY: &str = "all-profiles";
/// Shared key holding the admin's user id.
pub const ADMIN_KEY: &str = "admin-user-id";
/// Device key holding this device's user id.
pub const DEVICE_ID_KEY: &str = "veggie-swap-user-id";

/// Device key holding a user's own profile.
pub fn profile_key(user: &UserId) -> String {
    format!("profile-{user}")
}

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// The swap board as seen from one device: a store handle plus the device's
/// user identity.
pub struct SwapBoard {
    store: LocalStore,
    user_id: UserId,
}

impl SwapBoard {
    /// Open the board, loading the device's user id or generating and
    /// persisting a fresh one on first use.
    pub fn open(store: LocalStore) -> Result<Self> {
        let user_id = match store.get(DEVICE_ID_KEY, Partition::Device)? {
            Some(raw) => UserId(raw),
            None => {
                let id = UserId::generate();
                store.set(DEVICE_ID_KEY, id.as_str(), Partition::Device)?;
                debug!(user = %id, "generated device user id");
                id
            }
        };
        Ok(Self { store, user_id })
    }

    /// Open the board as a specific user, without touching the persisted
    /// device id. Lets several identities share one board database.
    pub fn open_as(store: LocalStore, user_id: UserId) -> Self {
        Self { store, user_id }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    // ── Listings ────────────────────────────────────────────────────────

    /// The approved listings, newest first. Read failures and absent data
    /// both yield an empty collection; duplicate ids are dropped keep-first.
    pub fn listings(&self) -> Vec<Listing> {
        self.load_collection(LISTINGS_KEY)
    }

    /// The listings awaiting approval, newest first.
    pub fn pending_listings(&self) -> Vec<Listing> {
        self.load_collection(PENDING_KEY)
    }

    fn load_collection(&self, key: &str) -> Vec<Listing> {
        match self.store.get_json::<Vec<Listing>>(key, Partition::Shared) {
            Ok(Some(raw)) => dedup_by_id(raw),
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!(key, %err, "failed to load listing collection, treating as empty");
                Vec::new()
            }
        }
    }

    fn save_listings(&self, listings: &[Listing]) -> Result<()> {
        self.store.set_json(LISTINGS_KEY, &listings, Partition::Shared)
    }

    fn save_pending(&self, pending: &[Listing]) -> Result<()> {
        self.store.set_json(PENDING_KEY, &pending, Partition::Shared)
    }

    /// Submit a listing for approval. Title, owner name, street and house
    /// number are required (address and owner name fall back to the
    /// submitter's profile); a validation failure creates no record.
    pub fn submit_listing(&self, draft: ListingDraft) -> Result<Listing, BoardError> {
        let profile = self.profile();

        if draft.title.trim().is_empty() {
            return Err(BoardError::MissingField("title"));
        }
        let owner_name = profile
            .as_ref()
            .map(|p| p.name.clone())
            .filter(|n| !n.trim().is_empty())
            .or_else(|| draft.owner_name.clone().filter(|n| !n.trim().is_empty()))
            .ok_or(BoardError::MissingField("owner name"))?;
        let street = draft
            .street
            .clone()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| profile.as_ref().map(|p| p.street.clone()))
            .filter(|s| !s.trim().is_empty())
            .ok_or(BoardError::MissingField("street"))?;
        let house_number = draft
            .house_number
            .clone()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| profile.as_ref().map(|p| p.house_number.clone()))
            .filter(|s| !s.trim().is_empty())
            .ok_or(BoardError::MissingField("house number"))?;

        let now = Utc::now();
        let listing = Listing {
            id: ListingId(now.timestamp_millis()),
            created_at: now,
            title: draft.title,
            description: draft.description,
            category: draft.category,
            item_type: draft.item_type,
            availability: draft.availability,
            quantity: draft.quantity,
            photo: draft.photo,
            street_number: format!("{house_number} {street}"),
            street,
            house_number,
            owner_name,
            owner_id: self.user_id.clone(),
            owner_photo: profile.and_then(|p| p.photo),
            looking_for: draft.looking_for,
            expiry_date: draft.expiry_date,
            status: ListingStatus::Pending,
            requests: Vec::new(),
        };

        let mut pending = self.pending_listings();
        pending.insert(0, listing.clone());
        self.save_pending(&pending)?;
        debug!(id = %listing.id, "listing submitted for approval");
        Ok(listing)
    }

    /// Move a pending listing to the approved collection, flipping its
    /// status. Silent no-op returning `false` if the id is not pending.
    ///
    /// The two writes are not atomic: a crash between them leaves the
    /// listing in neither collection. Accepted inconsistency window.
    pub fn approve(&self, id: ListingId) -> Result<bool> {
        let mut pending = self.pending_listings();
        let Some(pos) = pending.iter().position(|l| l.id == id) else {
            return Ok(false);
        };
        let mut listing = pending.remove(pos);
        listing.status = ListingStatus::Approved;

        let mut active = self.listings();
        active.insert(0, listing);

        self.save_pending(&pending)?;
        self.save_listings(&active)?;
        Ok(true)
    }

    /// Drop a pending listing. Silent no-op if the id is not pending.
    pub fn reject(&self, id: ListingId) -> Result<bool> {
        let mut pending = self.pending_listings();
        let before = pending.len();
        pending.retain(|l| l.id != id);
        if pending.len() == before {
            return Ok(false);
        }
        self.save_pending(&pending)?;
        Ok(true)
    }

    /// Remove one of the approved listings (owner deletion). No-op if absent.
    pub fn delete_listing(&self, id: ListingId) -> Result<bool> {
        let mut active = self.listings();
        let before = active.len();
        active.retain(|l| l.id != id);
        if active.len() == before {
            return Ok(false);
        }
        self.save_listings(&active)?;
        Ok(true)
    }

    /// Append a request to an active listing. The requester name is required
    /// (falling back to the sender's profile name); requests are never
    /// updated or removed afterwards. Returns `false` if the listing is gone.
    pub fn add_request(&self, id: ListingId, draft: RequestDraft) -> Result<bool, BoardError> {
        let requester = draft
            .requester
            .filter(|r| !r.trim().is_empty())
            .or_else(|| self.profile().map(|p| p.name))
            .filter(|r| !r.trim().is_empty())
            .ok_or(BoardError::MissingField("requester name"))?;

        let mut active = self.listings();
        let Some(listing) = active.iter_mut().find(|l| l.id == id) else {
            return Ok(false);
        };
        listing.requests.push(Request {
            id: RequestId(Utc::now().timestamp_millis()),
            requester,
            message: draft.message,
            offer: draft.offer,
        });
        self.save_listings(&active)?;
        Ok(true)
    }

    /// Drop approved listings whose expiry date has passed, persisting only
    /// if the collection actually shrank. Returns the number removed.
    /// Requests attached to an expired listing are discarded with it.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let current = self.listings();
        let live: Vec<Listing> = current
            .iter()
            .filter(|l| !l.is_expired(now))
            .cloned()
            .collect();
        let removed = current.len() - live.len();
        if removed > 0 {
            self.save_listings(&live)?;
            debug!(removed, "expired listings swept");
        }
        Ok(removed)
    }

    // ── Profiles & admin ────────────────────────────────────────────────

    /// This device's profile, if one has been saved.
    pub fn profile(&self) -> Option<UserProfile> {
        let key = profile_key(&self.user_id);
        match self.store.get_json(&key, Partition::Device) {
            Ok(profile) => profile,
            Err(err) => {
                warn!(%err, "failed to load profile, treating as absent");
                None
            }
        }
    }

    /// The shared directory of all profiles.
    pub fn all_profiles(&self) -> ProfileDirectory {
        match self.store.get_json(ALL_PROFILES_KEY, Partition::Shared) {
            Ok(Some(dir)) => dir,
            Ok(None) => ProfileDirectory::default(),
            Err(err) => {
                warn!(%err, "failed to load profile directory, treating as empty");
                ProfileDirectory::default()
            }
        }
    }

    /// Replace this device's profile, upsert it into the shared directory,
    /// then try the admin claim. Returns `true` if this save made the user
    /// the admin.
    pub fn save_profile(&self, profile: UserProfile) -> Result<bool, BoardError> {
        if profile.name.trim().is_empty() {
            return Err(BoardError::MissingField("name"));
        }
        if profile.street.trim().is_empty() {
            return Err(BoardError::MissingField("street"));
        }
        if profile.house_number.trim().is_empty() {
            return Err(BoardError::MissingField("house number"));
        }

        let key = profile_key(&self.user_id);
        self.store.set_json(&key, &profile, Partition::Device)?;

        let mut directory = self.all_profiles();
        directory.upsert(self.user_id.clone(), profile);
        self.store
            .set_json(ALL_PROFILES_KEY, &directory, Partition::Shared)?;

        Ok(self.claim_admin()?)
    }

    /// First-come-first-served admin claim: if no admin id is set (or the
    /// value is unreadable, which counts as unset), write our own id.
    ///
    /// The store offers no compare-and-set, so two users claiming
    /// concurrently can both observe "unset" and the later write wins.
    pub fn claim_admin(&self) -> Result<bool> {
        let existing = match self.store.get(ADMIN_KEY, Partition::Shared) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(err) => {
                warn!(%err, "failed to read admin id, treating as unset");
                None
            }
        };
        if existing.is_some() {
            return Ok(false);
        }
        self.store
            .set(ADMIN_KEY, self.user_id.as_str(), Partition::Shared)?;
        debug!(user = %self.user_id, "claimed admin");
        Ok(true)
    }

    /// The current admin's user id, if one has been claimed.
    pub fn admin_id(&self) -> Option<UserId> {
        match self.store.get(ADMIN_KEY, Partition::Shared) {
            Ok(Some(raw)) if !raw.is_empty() => Some(UserId(raw)),
            Ok(_) => None,
            Err(err) => {
                warn!(%err, "failed to read admin id");
                None
            }
        }
    }

    pub fn is_admin(&self) -> bool {
        self.admin_id().as_ref() == Some(&self.user_id)
    }
}
