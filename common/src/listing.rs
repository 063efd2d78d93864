use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::UserId;

/// Unique listing identifier: creation time in Unix milliseconds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ListingId(pub i64);

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique request identifier: creation time in Unix milliseconds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct RequestId(pub i64);

/// Category of homegrown produce (or garden surplus) on offer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Vegetables,
    Fruits,
    Herbs,
    Seeds,
    Preserves,
    Eggs,
    Honey,
    Compost,
    Tools,
    Flowers,
    Other(String),
}

impl FromStr for Category {
    type Err = std::convert::Infallible;

    /// Unknown names fall through to `Other`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "vegetables" => Category::Vegetables,
            "fruits" => Category::Fruits,
            "herbs" => Category::Herbs,
            "seeds" => Category::Seeds,
            "preserves" => Category::Preserves,
            "eggs" => Category::Eggs,
            "honey" => Category::Honey,
            "compost" => Category::Compost,
            "tools" => Category::Tools,
            "flowers" => Category::Flowers,
            "other" => Category::Other(String::new()),
            other => Category::Other(other.to_string()),
        })
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Vegetables => f.write_str("vegetables"),
            Category::Fruits => f.write_str("fruits"),
            Category::Herbs => f.write_str("herbs"),
            Category::Seeds => f.write_str("seeds"),
            Category::Preserves => f.write_str("preserves"),
            Category::Eggs => f.write_str("eggs"),
            Category::Honey => f.write_str("honey"),
            Category::Compost => f.write_str("compost"),
            Category::Tools => f.write_str("tools"),
            Category::Flowers => f.write_str("flowers"),
            Category::Other(s) if s.is_empty() => f.write_str("other"),
            Category::Other(s) => f.write_str(s),
        }
    }
}

/// Physical form of the item (seedling tray, fresh produce, seed packet...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemType {
    Seedlings,
    Produce,
    Seeds,
    Cuttings,
    Bulbs,
    Preserves,
}

impl FromStr for ItemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "seedlings" => Ok(ItemType::Seedlings),
            "produce" => Ok(ItemType::Produce),
            "seeds" => Ok(ItemType::Seeds),
            "cuttings" => Ok(ItemType::Cuttings),
            "bulbs" => Ok(ItemType::Bulbs),
            "preserves" => Ok(ItemType::Preserves),
            other => Err(format!("unknown item type: {other}")),
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemType::Seedlings => f.write_str("seedlings"),
            ItemType::Produce => f.write_str("produce"),
            ItemType::Seeds => f.write_str("seeds"),
            ItemType::Cuttings => f.write_str("cuttings"),
            ItemType::Bulbs => f.write_str("bulbs"),
            ItemType::Preserves => f.write_str("preserves"),
        }
    }
}

/// Whether the owner wants something in return or is giving the item away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Availability {
    Swap,
    Free,
}

impl FromStr for Availability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "swap" => Ok(Availability::Swap),
            "free" => Ok(Availability::Free),
            other => Err(format!("unknown availability: {other}")),
        }
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Availability::Swap => f.write_str("swap"),
            Availability::Free => f.write_str("free"),
        }
    }
}

/// Lifecycle state of a listing. Pending listings are only visible to the
/// admin; a listing transitions at most once, to Approved, or is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListingStatus {
    Pending,
    Approved,
}

/// An expression of interest in an active listing. Append-only: requests are
/// never updated or removed once attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub requester: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub offer: Option<String>,
}

/// A produce-sharing offer, pending or approved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub item_type: ItemType,
    pub availability: Availability,
    #[serde(default)]
    pub quantity: Option<String>,
    /// Inline data URL; no separate blob store.
    #[serde(default)]
    pub photo: Option<String>,
    pub street: String,
    pub house_number: String,
    /// Combined display address, `"<house number> <street>"`.
    pub street_number: String,
    pub owner_name: String,
    pub owner_id: UserId,
    #[serde(default)]
    pub owner_photo: Option<String>,
    #[serde(default)]
    pub looking_for: Option<String>,
    pub expiry_date: DateTime<Utc>,
    pub status: ListingStatus,
    pub requests: Vec<Request>,
}

impl Listing {
    /// A listing is live only while its expiry date is strictly in the
    /// future; at the expiry instant it is eligible for the sweep.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry_date <= now
    }
}

/// Default lifetime of a new listing.
pub fn default_expiry(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::days(7)
}

/// Form content for a new listing, before the board fills in identity and
/// lifecycle fields. Optional address/owner fields fall back to the
/// submitter's profile.
#[derive(Debug, Clone)]
pub struct ListingDraft {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub item_type: ItemType,
    pub availability: Availability,
    pub quantity: Option<String>,
    pub photo: Option<String>,
    pub street: Option<String>,
    pub house_number: Option<String>,
    pub owner_name: Option<String>,
    pub looking_for: Option<String>,
    pub expiry_date: DateTime<Utc>,
}

/// Form content for a new request. A missing requester name falls back to
/// the sender's profile name.
#[derive(Debug, Clone, Default)]
pub struct RequestDraft {
    pub requester: Option<String>,
    pub message: Option<String>,
    pub offer: Option<String>,
}

/// Drop duplicate ids, keeping the first occurrence in encounter order.
/// Guards against double-writes of the shared collections.
pub fn dedup_by_id(listings: Vec<Listing>) -> Vec<Listing> {
    let mut seen = BTreeSet::new();
    listings.into_iter().filter(|l| seen.insert(l.id)).collect()
}
