//! Metric computation over a [`BoardModel`].
//!
//! Every operation is a pure function of the model and its arguments. Ranged
//! operations take an inclusive [`DateRange`]; a card timestamp whose
//! awareness differs from the range's fails the whole operation with
//! [`MetricError::TimezoneMismatch`].

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use boardpulse_types::Timestamp;

use super::model::{ensure_uniform, BoardModel, DerivedCard};
use super::names::{ListMatcher, NO_LABEL, UNASSIGNED};
use super::range::DateRange;
use super::MetricError;

/// Cards created and completed by one member.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberCount {
    pub member: String,
    pub created: usize,
    pub completed: usize,
}

/// A [`MemberCount`] with its completion rate, in percent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingRow {
    pub member: String,
    pub created: usize,
    pub completed: usize,
    pub completion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListCount {
    pub list: String,
    pub count: usize,
}

/// Creations and completions on one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineRow {
    pub date: NaiveDate,
    pub created: usize,
    pub completed: usize,
}

/// Board-wide counts that need no date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoardTotals {
    pub lists: usize,
    pub members: usize,
    pub labels: usize,
    /// Open cards only.
    pub cards: usize,
}

/// Computes reporting values from a model.
///
/// # Example
///
/// ```
/// use boardpulse::data::{BoardModel, DateRange, MetricEngine, ModelOptions};
/// use boardpulse_types::{Action, Snapshot};
/// use chrono::{FixedOffset, NaiveDate};
///
/// let snapshot = Snapshot::builder()
///     .list("l-done", "Done")
///     .card("c1", "Ship", |c| {
///         c.list("l-done")
///             .action(Action::created("2024-01-01T09:00:00Z".parse().unwrap()))
///             .action(Action::moved("2024-01-03T09:00:00Z".parse().unwrap(), "Doing", "Done"))
///     })
///     .build();
///
/// let model = BoardModel::build(&snapshot, &ModelOptions::default()).unwrap();
/// let engine = MetricEngine::new(&model);
/// let range = DateRange::from_dates(
///     NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
///     NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
///     FixedOffset::east_opt(0).unwrap(),
/// )
/// .unwrap();
///
/// assert_eq!(engine.completed_count(&range).unwrap(), 1);
/// assert_eq!(engine.average_cycle_time(&range).unwrap(), 2.0);
/// ```
#[derive(Debug, Clone)]
pub struct MetricEngine<'a> {
    model: &'a BoardModel,
    in_progress: ListMatcher,
}

impl<'a> MetricEngine<'a> {
    pub fn new(model: &'a BoardModel) -> Self {
        Self {
            model,
            in_progress: ListMatcher::in_progress(),
        }
    }

    pub fn with_in_progress_lists(mut self, in_progress: ListMatcher) -> Self {
        self.in_progress = in_progress;
        self
    }

    pub fn model(&self) -> &'a BoardModel {
        self.model
    }

    /// Cards created within `range`.
    pub fn created_count(&self, range: &DateRange) -> Result<usize, MetricError> {
        Ok(self.created_in(range)?.len())
    }

    /// Cards completed within `range`.
    pub fn completed_count(&self, range: &DateRange) -> Result<usize, MetricError> {
        Ok(self.completed_in(range)?.len())
    }

    /// Cards currently in an in-progress list, regardless of dates.
    pub fn in_progress_count(&self) -> usize {
        self.cards()
            .iter()
            .filter(|c| self.in_progress.matches(&c.current_list))
            .count()
    }

    /// Overdue cards, earliest deadline first.
    pub fn overdue_cards(&self) -> Result<Vec<&'a DerivedCard>, MetricError> {
        let mut overdue: Vec<&DerivedCard> = self.cards().iter().filter(|c| c.is_overdue).collect();

        ensure_uniform(overdue.iter().filter_map(|c| c.due_at.as_ref()))?;
        overdue.sort_by(|a, b| match (&a.due_at, &b.due_at) {
            (Some(a), Some(b)) => a.try_cmp(b).unwrap_or(std::cmp::Ordering::Equal),
            _ => std::cmp::Ordering::Equal,
        });
        Ok(overdue)
    }

    /// One row per calendar day of `range`, zero-filled.
    pub fn timeline(&self, range: &DateRange) -> Result<Vec<TimelineRow>, MetricError> {
        let start = range.start_date();
        let mut rows: Vec<TimelineRow> = range
            .days()
            .map(|date| TimelineRow {
                date,
                created: 0,
                completed: 0,
            })
            .collect();

        for card in self.cards() {
            if let Some(created) = in_range(card.created_at.as_ref(), range)? {
                if let Some(row) = row_for(&mut rows, start, range.date_of(created)) {
                    row.created += 1;
                }
            }
            if let Some(completed) = in_range(card.completed_at.as_ref(), range)? {
                if let Some(row) = row_for(&mut rows, start, range.date_of(completed)) {
                    row.completed += 1;
                }
            }
        }

        Ok(rows)
    }

    /// Cards created within `range`, counted once per member.
    ///
    /// Sorted by `created`, descending.
    pub fn by_member(&self, range: &DateRange) -> Result<Vec<MemberCount>, MetricError> {
        let mut groups: Groups<MemberCount> = Groups::default();

        for card in self.created_in(range)? {
            let completed = usize::from(card.completed_at.is_some());
            for member in names_or(&card.members, UNASSIGNED) {
                let row = groups.entry(member, |m| MemberCount {
                    member: m.to_string(),
                    created: 0,
                    completed: 0,
                });
                row.created += 1;
                row.completed += completed;
            }
        }

        let mut rows = groups.into_rows();
        rows.sort_by(|a, b| b.created.cmp(&a.created));
        Ok(rows)
    }

    /// Cards created within `range`, counted once per label.
    ///
    /// Sorted by `count`, descending.
    pub fn by_label(&self, range: &DateRange) -> Result<Vec<LabelCount>, MetricError> {
        let mut groups: Groups<LabelCount> = Groups::default();

        for card in self.created_in(range)? {
            for label in names_or(&card.labels, NO_LABEL) {
                groups
                    .entry(label, |l| LabelCount {
                        label: l.to_string(),
                        count: 0,
                    })
                    .count += 1;
            }
        }

        let mut rows = groups.into_rows();
        rows.sort_by(|a, b| b.count.cmp(&a.count));
        Ok(rows)
    }

    /// Mean cycle time in days of cards completed within `range`; `0.0`
    /// when there are none.
    pub fn average_cycle_time(&self, range: &DateRange) -> Result<f64, MetricError> {
        let cycle_times: Vec<f64> = self
            .completed_in(range)?
            .iter()
            .filter_map(|c| c.cycle_time_days)
            .collect();

        if cycle_times.is_empty() {
            return Ok(0.0);
        }
        Ok(cycle_times.iter().sum::<f64>() / cycle_times.len() as f64)
    }

    /// [`by_member`](Self::by_member) with completion rates, sorted by
    /// `completed`, descending.
    pub fn productivity_ranking(&self, range: &DateRange) -> Result<Vec<RankingRow>, MetricError> {
        let mut rows: Vec<RankingRow> = self
            .by_member(range)?
            .into_iter()
            .map(|m| RankingRow {
                completion_rate: percentage(m.completed, m.created).unwrap_or(0.0),
                member: m.member,
                created: m.created,
                completed: m.completed,
            })
            .collect();

        // Stable: ties keep by_member order.
        rows.sort_by(|a, b| b.completed.cmp(&a.completed));
        Ok(rows)
    }

    /// Completed over created within `range`, in percent. `None` when
    /// nothing was created.
    pub fn completion_rate(&self, range: &DateRange) -> Result<Option<f64>, MetricError> {
        let created = self.created_count(range)?;
        let completed = self.completed_count(range)?;
        Ok(percentage(completed, created))
    }

    pub fn board_totals(&self) -> BoardTotals {
        BoardTotals {
            lists: self.model.list_count(),
            members: self.model.member_count(),
            labels: self.model.label_count(),
            cards: self.cards().len(),
        }
    }

    /// Open cards per current list, sorted by count, descending.
    pub fn by_list(&self) -> Vec<ListCount> {
        let mut groups: Groups<ListCount> = Groups::default();
        for card in self.cards() {
            groups
                .entry(&card.current_list, |l| ListCount {
                    list: l.to_string(),
                    count: 0,
                })
                .count += 1;
        }

        let mut rows = groups.into_rows();
        rows.sort_by(|a, b| b.count.cmp(&a.count));
        rows
    }

    fn cards(&self) -> &'a [DerivedCard] {
        self.model.cards()
    }

    fn created_in(&self, range: &DateRange) -> Result<Vec<&'a DerivedCard>, MetricError> {
        self.filter_by(range, |c| c.created_at.as_ref())
    }

    fn completed_in(&self, range: &DateRange) -> Result<Vec<&'a DerivedCard>, MetricError> {
        self.filter_by(range, |c| c.completed_at.as_ref())
    }

    fn filter_by<F>(&self, range: &DateRange, date: F) -> Result<Vec<&'a DerivedCard>, MetricError>
    where
        F: Fn(&'a DerivedCard) -> Option<&'a Timestamp>,
    {
        let mut matched = Vec::new();
        for card in self.cards() {
            if in_range(date(card), range)?.is_some() {
                matched.push(card);
            }
        }
        Ok(matched)
    }
}

/// `ts` if present and within `range`.
fn in_range<'t>(
    ts: Option<&'t Timestamp>,
    range: &DateRange,
) -> Result<Option<&'t Timestamp>, MetricError> {
    match ts {
        Some(ts) => Ok(range.contains(ts)?.then_some(ts)),
        None => Ok(None),
    }
}

fn row_for(
    rows: &mut [TimelineRow],
    start: NaiveDate,
    date: NaiveDate,
) -> Option<&mut TimelineRow> {
    let index = usize::try_from((date - start).num_days()).ok()?;
    rows.get_mut(index)
}

/// `names`, or the sentinel alone when there are none.
fn names_or<'n>(names: &'n [String], sentinel: &'n str) -> Vec<&'n str> {
    if names.is_empty() {
        vec![sentinel]
    } else {
        names.iter().map(String::as_str).collect()
    }
}

/// `part / whole * 100`, one decimal.
fn percentage(part: usize, whole: usize) -> Option<f64> {
    if whole == 0 {
        return None;
    }
    let rate = part as f64 / whole as f64 * 100.0;
    Some((rate * 10.0).round() / 10.0)
}

/// Group rows keyed by name, in order of first appearance.
struct Groups<T> {
    index: HashMap<String, usize>,
    rows: Vec<T>,
}

impl<T> Default for Groups<T> {
    fn default() -> Self {
        Self {
            index: HashMap::new(),
            rows: Vec::new(),
        }
    }
}

impl<T> Groups<T> {
    fn entry(&mut self, key: &str, init: impl FnOnce(&str) -> T) -> &mut T {
        let position = match self.index.get(key) {
            Some(&i) => i,
            None => {
                self.rows.push(init(key));
                let i = self.rows.len() - 1;
                self.index.insert(key.to_string(), i);
                i
            }
        };
        &mut self.rows[position]
    }

    fn into_rows(self) -> Vec<T> {
        self.rows
    }
}
