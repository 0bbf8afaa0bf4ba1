//! Board models and metric computation.
//!
//! This module turns a raw [`Snapshot`](boardpulse_types::Snapshot) into
//! per-card derived records and computes every reporting value from them.
//!
//! ## Submodules
//!
//! - [`names`]: Display sentinels and the [`ListMatcher`] used for done and
//!   in-progress list names
//! - [`model`]: Chronology reconstruction ([`BoardModel`], [`DerivedCard`])
//! - [`range`]: Inclusive date ranges and period presets
//! - [`metrics`]: The [`MetricEngine`] and its result rows
//!
//! ## Data Flow
//!
//! ```text
//! Snapshot (raw board export)
//!        │
//!        ▼
//! BoardModel::build()  ──▶ DerivedCard per open card
//!        │
//!        ▼
//! MetricEngine::new(&model)
//!        │
//!        └──▶ counts, timeline, groupings, ranking (per DateRange)
//! ```

pub mod metrics;
pub mod model;
pub mod names;
pub mod range;

pub use metrics::{
    BoardTotals, LabelCount, ListCount, MemberCount, MetricEngine, RankingRow, TimelineRow,
};
pub use model::{BoardModel, DerivedCard, ModelOptions};
pub use names::ListMatcher;
pub use range::{DateRange, DayZone, Period};

use boardpulse_types::TimezoneMismatchError;
use thiserror::Error;

/// Failure while building the model or computing a metric.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetricError {
    /// Aware and naive timestamps met in one comparison.
    #[error(transparent)]
    TimezoneMismatch(#[from] TimezoneMismatchError),

    /// Range end precedes its start, or a bound cannot be represented.
    #[error("invalid date range: {reason}")]
    InvalidRange { reason: String },
}

impl MetricError {
    pub(crate) fn invalid_range(reason: impl Into<String>) -> Self {
        MetricError::InvalidRange {
            reason: reason.into(),
        }
    }
}
