//! Call history feed engine.
//!
//! The feed assembles a sectioned, grouped call list from an external
//! call-record store and enriches it with caller identities resolved
//! asynchronously through an external directory. The expensive pieces
//! (lookups and the two-part store query) run on background tasks; every
//! consumer-facing read is non-blocking and served from an expiring
//! in-memory cache.
//!
//! The embedding application supplies the collaborators ([`store`]) and
//! listens on the coalesced change-notification stream to know when to
//! re-read.

pub mod cache;
pub mod config;
pub mod enrich;
pub mod error;
pub mod events;
pub mod feed;
pub mod group;
pub mod merge;
pub mod number;
pub mod store;
pub mod types;

pub use cache::ExpiringCache;
pub use config::FeedConfig;
pub use error::StoreError;
pub use events::FeedEvent;
pub use feed::CallFeed;
pub use group::{compute_groups, CallSequence};
pub use merge::merge_call_sections;
pub use store::{CallRecordStore, IdentityResolver, NumberFormatter, PlainFormatter, RecordBatch};
pub use types::{CallDetails, CallRecord, CallType, ContactInfo, Group, RowView, Section};
