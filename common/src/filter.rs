use crate::listing::{Availability, Category, ItemType, Listing};

/// Free-text search plus facet filters over the active listings. A `None`
/// facet matches everything (the "all" choice); the query matches on a
/// case-insensitive substring of title or description.
#[derive(Debug, Clone, Default)]
pub struct ListingFilter {
    pub query: Option<String>,
    pub category: Option<Category>,
    pub item_type: Option<ItemType>,
    pub availability: Option<Availability>,
}

impl ListingFilter {
    pub fn matches(&self, listing: &Listing) -> bool {
        let matches_query = match &self.query {
            Some(q) if !q.trim().is_empty() => {
                let q = q.to_lowercase();
                listing.title.to_lowercase().contains(&q)
                    || listing.description.to_lowercase().contains(&q)
            }
            _ => true,
        };

        matches_query
            && self.category.as_ref().is_none_or(|c| listing.category == *c)
            && self.item_type.as_ref().is_none_or(|t| listing.item_type == *t)
            && self
                .availability
                .is_none_or(|a| listing.availability == a)
    }

    /// The matching subsequence, in the collection's order.
    pub fn apply<'a>(&self, listings: &'a [Listing]) -> Vec<&'a Listing> {
        listings.iter().filter(|l| self.matches(l)).collect()
    }
}
