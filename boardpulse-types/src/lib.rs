//! # boardpulse-types
//!
//! Wire types for Trello board snapshots. This crate defines the shape of one
//! board fetch (board metadata, lists, members, labels, cards and their action
//! histories) shared by the remote client and the metric engine.
//!
//! ## Design Goals
//!
//! - **Faithful to the API**: field names match Trello's JSON when the `serde`
//!   feature is enabled, so responses deserialize without an intermediate layer
//! - **Explicit time zones**: [`Timestamp`] keeps aware and naive values apart
//!   and refuses to compare them
//! - **Versioned schema**: saved snapshots carry a [`SchemaVersion`]
//! - **Ergonomic builders**: fluent construction of snapshots for tests and
//!   fixtures
//!
//! ## Features
//!
//! - `serde`: JSON serialization via serde
//!
//! ## Example
//!
//! ```rust
//! use boardpulse_types::{Action, Snapshot};
//!
//! let snapshot = Snapshot::builder()
//!     .board("b1", "Team board")
//!     .list("l-done", "Done")
//!     .card("c1", "Release notes", |c| {
//!         c.list("l-done")
//!             .action(Action::created("2024-01-01T09:00:00Z".parse().unwrap()))
//!             .action(Action::moved("2024-01-05T09:00:00Z".parse().unwrap(), "Doing", "Done"))
//!     })
//!     .build();
//!
//! assert_eq!(snapshot.action_count(), 2);
//! ```

mod board;
mod snapshot;
mod timestamp;

pub use board::*;
pub use snapshot::*;
pub use timestamp::*;

/// Current schema version.
///
/// Increment this when making breaking changes to the snapshot format.
pub const SCHEMA_VERSION: u32 = 1;
