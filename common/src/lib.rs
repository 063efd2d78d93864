pub mod filter;
pub mod identity;
pub mod listing;
pub mod profile;
