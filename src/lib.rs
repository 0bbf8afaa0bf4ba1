//! # boardpulse
//!
//! Team productivity metrics computed from Trello board snapshots.
//!
//! This crate fetches a board (lists, members, labels, cards and each card's
//! action history), reconstructs when every card was created and completed,
//! and derives throughput, completion rates, overdue items and per-member and
//! per-label breakdowns for a date range.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Application                         │
//! │  ┌─────────┐    ┌──────────┐    ┌──────────┐    ┌─────────┐  │
//! │  │ source  │───▶│  model   │───▶│ metrics  │───▶│ report  │  │
//! │  │(Snapshot)    │(DerivedCard)  │ (engine) │    │text/json│  │
//! │  └────┬────┘    └──────────┘    └──────────┘    └─────────┘  │
//! │       │                                                      │
//! │       ▼                                                      │
//! │  TrelloSource | FileSource, optionally behind CachedSource   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`source`]**: Data source abstraction ([`DataSource`] trait) with
//!   implementations for the live Trello API, saved snapshot files and a
//!   time-boxed cache
//! - **[`data`]**: Card chronology ([`BoardModel`]), date ranges
//!   ([`DateRange`], [`Period`]) and the [`MetricEngine`]
//! - **[`report`]**: Bundles every metric into a [`Report`] for the terminal
//!   or a JSON file
//! - **[`config`]**: Layered [`Settings`] from file and environment
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Report on the last 30 days of the board in TRELLO_BOARD_ID
//! boardpulse
//!
//! # Custom range from a saved snapshot, exported as JSON
//! boardpulse --file board.json --from 2024-01-01 --to 2024-03-31 --export report.json
//! ```
//!
//! ### As a library
//!
//! ```
//! use boardpulse::{BoardModel, DateRange, MetricEngine, ModelOptions};
//! use boardpulse_types::{Action, Snapshot};
//! use chrono::{FixedOffset, NaiveDate};
//!
//! let snapshot = Snapshot::builder()
//!     .list("l-doing", "Doing")
//!     .card("c1", "Write docs", |c| {
//!         c.list("l-doing")
//!             .action(Action::created("2024-01-02T09:00:00Z".parse().unwrap()))
//!     })
//!     .build();
//!
//! let model = BoardModel::build(&snapshot, &ModelOptions::default()).unwrap();
//! let engine = MetricEngine::new(&model);
//! let range = DateRange::from_dates(
//!     NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2024, 1, 7).unwrap(),
//!     FixedOffset::east_opt(0).unwrap(),
//! )
//! .unwrap();
//!
//! assert_eq!(engine.created_count(&range).unwrap(), 1);
//! assert_eq!(engine.in_progress_count(), 1);
//! ```

pub mod config;
pub mod data;
pub mod report;
pub mod source;

// Re-export main types for convenience
pub use config::Settings;
pub use data::{
    BoardModel, DateRange, DayZone, DerivedCard, ListMatcher, MetricEngine, MetricError,
    ModelOptions, Period,
};
pub use report::Report;
pub use source::{CachedSource, DataSource, FileSource, TrelloSource};
