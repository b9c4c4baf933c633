// FSBid-backed features: clients, classifications, bids and client suggestions.
// All HTTP traffic to FSBid goes through fsbid_client; modules here build
// queries and translate records.

pub mod bids;
pub mod classifications;
pub mod clients;
pub mod csv_export;
pub mod handlers;
pub mod lookup;
pub mod pagination;
pub mod query;
pub mod suggestions;
