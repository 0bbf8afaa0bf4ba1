//! Snapshot model and card chronology.
//!
//! [`BoardModel::build`] resolves every open card of a snapshot into a
//! [`DerivedCard`]: list, member and label names looked up, creation and
//! completion dates inferred from the card's action log.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, Local};
use serde::Serialize;

use boardpulse_types::{Action, Board, Card, Snapshot, Timestamp};

use super::names::{ListMatcher, UNKNOWN};
use super::MetricError;

/// Inputs to a model build besides the snapshot itself.
#[derive(Debug, Clone)]
pub struct ModelOptions {
    /// Names of the list(s) that mean "done".
    pub done_lists: ListMatcher,
    /// Reference instant for overdue checks.
    pub now: DateTime<FixedOffset>,
}

impl ModelOptions {
    pub fn new(done_lists: ListMatcher, now: DateTime<FixedOffset>) -> Self {
        Self { done_lists, now }
    }

    pub fn with_done_lists(mut self, done_lists: ListMatcher) -> Self {
        self.done_lists = done_lists;
        self
    }

    pub fn with_now(mut self, now: DateTime<FixedOffset>) -> Self {
        self.now = now;
        self
    }
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            done_lists: ListMatcher::done(),
            now: Local::now().fixed_offset(),
        }
    }
}

/// One open card with its inferred dates and resolved names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedCard {
    pub id: String,
    pub name: String,
    pub current_list: String,
    pub created_at: Option<Timestamp>,
    /// Only set while the card sits in a done list.
    pub completed_at: Option<Timestamp>,
    pub due_at: Option<Timestamp>,
    pub due_complete: bool,
    pub is_overdue: bool,
    pub members: Vec<String>,
    pub labels: Vec<String>,
    pub cycle_time_days: Option<f64>,
}

/// Normalized view of one snapshot.
///
/// Immutable once built; a new snapshot means a new model.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardModel {
    board: Board,
    list_count: usize,
    member_count: usize,
    label_count: usize,
    cards: Vec<DerivedCard>,
}

impl BoardModel {
    /// Derive every open card of `snapshot`.
    ///
    /// Fails with [`MetricError::TimezoneMismatch`] when a card mixes aware
    /// and naive timestamps in a way that must be compared (its action log,
    /// its deadline against `now`, or its creation against its completion).
    pub fn build(snapshot: &Snapshot, options: &ModelOptions) -> Result<Self, MetricError> {
        let lists: HashMap<&str, &str> = snapshot
            .lists
            .iter()
            .map(|l| (l.id.as_str(), l.name.as_str()))
            .collect();
        let members: HashMap<&str, &str> = snapshot
            .members
            .iter()
            .map(|m| (m.id.as_str(), m.full_name.as_str()))
            .collect();
        let labels: HashMap<&str, &str> = snapshot
            .labels
            .iter()
            .map(|l| (l.id.as_str(), l.name.as_str()))
            .collect();

        let lookups = Lookups {
            lists,
            members,
            labels,
        };

        let cards = snapshot
            .cards
            .iter()
            .filter(|c| !c.closed)
            .map(|c| derive_card(c, &lookups, options))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            board: snapshot.board.clone(),
            list_count: snapshot.lists.len(),
            member_count: snapshot.members.len(),
            label_count: snapshot.labels.len(),
            cards,
        })
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Derived cards, in snapshot order. Archived cards are absent.
    pub fn cards(&self) -> &[DerivedCard] {
        &self.cards
    }

    pub fn list_count(&self) -> usize {
        self.list_count
    }

    pub fn member_count(&self) -> usize {
        self.member_count
    }

    pub fn label_count(&self) -> usize {
        self.label_count
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

struct Lookups<'a> {
    lists: HashMap<&'a str, &'a str>,
    members: HashMap<&'a str, &'a str>,
    labels: HashMap<&'a str, &'a str>,
}

fn derive_card(
    card: &Card,
    lookups: &Lookups<'_>,
    options: &ModelOptions,
) -> Result<DerivedCard, MetricError> {
    let current_list = card
        .id_list
        .as_deref()
        .and_then(|id| lookups.lists.get(id))
        .copied()
        .unwrap_or(UNKNOWN)
        .to_string();

    let actions = chronological(&card.actions)?;

    let created_at = actions
        .iter()
        .find(|a| a.kind.is_creation())
        .map(|a| a.date)
        .or(card.date_last_activity);

    let completed_at = if options.done_lists.matches(&current_list) {
        actions
            .iter()
            .rev()
            .find(|a| a.moved_to().is_some_and(|to| options.done_lists.matches(to)))
            .map(|a| a.date)
            .or(card.date_last_activity)
    } else {
        None
    };

    let is_overdue = match card.due {
        Some(due) if !card.due_complete => is_before_now(&due, &options.now),
        _ => false,
    };

    let cycle_time_days = match (&created_at, &completed_at) {
        (Some(created), Some(completed)) => Some(completed.days_since(created)?),
        _ => None,
    };

    let members = card
        .id_members
        .iter()
        .map(|id| {
            lookups
                .members
                .get(id.as_str())
                .copied()
                .unwrap_or(UNKNOWN)
                .to_string()
        })
        .collect();

    let labels = card
        .labels
        .iter()
        .filter_map(|label| {
            let name = lookups
                .labels
                .get(label.id.as_str())
                .copied()
                .filter(|n| !n.is_empty())
                .unwrap_or(label.name.as_str());
            (!name.trim().is_empty()).then(|| name.to_string())
        })
        .collect();

    Ok(DerivedCard {
        id: card.id.clone(),
        name: card.name.clone(),
        current_list,
        created_at,
        completed_at,
        due_at: card.due,
        due_complete: card.due_complete,
        is_overdue,
        members,
        labels,
        cycle_time_days,
    })
}

/// Naive deadlines are read as wall-clock time in `now`'s offset.
fn is_before_now(due: &Timestamp, now: &DateTime<FixedOffset>) -> bool {
    match due {
        Timestamp::Aware(dt) => dt < now,
        Timestamp::Naive(dt) => *dt < now.naive_local(),
    }
}

/// Actions sorted ascending by date; equal dates keep log order.
fn chronological(actions: &[Action]) -> Result<Vec<&Action>, MetricError> {
    let dates: Vec<&Timestamp> = actions.iter().map(|a| &a.date).collect();
    ensure_uniform(dates)?;

    let mut sorted: Vec<&Action> = actions.iter().collect();
    sorted.sort_by(|a, b| a.date.try_cmp(&b.date).unwrap_or(Ordering::Equal));
    Ok(sorted)
}

/// Fails unless every timestamp has the same awareness as the first.
///
/// Callers check this before sorting so comparisons inside the sort cannot
/// fail.
pub(crate) fn ensure_uniform<'a, I>(timestamps: I) -> Result<(), MetricError>
where
    I: IntoIterator<Item = &'a Timestamp>,
{
    let mut iter = timestamps.into_iter();
    if let Some(first) = iter.next() {
        for ts in iter {
            first.ensure_same_awareness(ts)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::names::NO_LABEL;
    use boardpulse_types::{Action, ActionKind};

    fn ts(s: &str) -> Timestamp {
        s.parse().unwrap()
    }

    fn options() -> ModelOptions {
        ModelOptions::default()
            .with_now(DateTime::parse_from_rfc3339("2024-01-10T12:00:00Z").unwrap())
    }

    fn board() -> boardpulse_types::SnapshotBuilder {
        Snapshot::builder()
            .board("b1", "Platform")
            .list("l-todo", "To do")
            .list("l-doing", "Doing")
            .list("l-done", "Done")
            .member("m1", "Ana")
            .member("m2", "Bruno")
            .label("lb1", "bug", "red")
    }

    fn only_card(snapshot: &Snapshot) -> DerivedCard {
        let model = BoardModel::build(snapshot, &options()).unwrap();
        assert_eq!(model.cards().len(), 1);
        model.cards()[0].clone()
    }

    #[test]
    fn test_created_and_completed_from_actions() {
        let snapshot = board()
            .card("c1", "Ship", |c| {
                c.list("l-done")
                    .last_activity(ts("2024-01-09T00:00:00Z"))
                    // Log order is not chronological.
                    .action(Action::moved(ts("2024-01-05T10:00:00Z"), "Doing", "Done"))
                    .action(Action::created(ts("2024-01-01T10:00:00Z")))
                    .action(Action::moved(ts("2024-01-03T10:00:00Z"), "To do", "Doing"))
            })
            .build();

        let card = only_card(&snapshot);
        assert_eq!(card.current_list, "Done");
        assert_eq!(card.created_at, Some(ts("2024-01-01T10:00:00Z")));
        assert_eq!(card.completed_at, Some(ts("2024-01-05T10:00:00Z")));
        assert_eq!(card.cycle_time_days, Some(4.0));
    }

    #[test]
    fn test_copy_counts_as_creation() {
        let snapshot = board()
            .card("c1", "Copied", |c| {
                c.list("l-todo")
                    .action(Action::new(ActionKind::CopyCard, ts("2024-01-02T00:00:00Z")))
            })
            .build();

        assert_eq!(only_card(&snapshot).created_at, Some(ts("2024-01-02T00:00:00Z")));
    }

    #[test]
    fn test_fallback_to_last_activity() {
        let snapshot = board()
            .card("c1", "Moved only", |c| {
                c.list("l-doing")
                    .last_activity(ts("2024-01-07T08:00:00Z"))
                    .action(Action::moved(ts("2024-01-04T10:00:00Z"), "To do", "Doing"))
            })
            .build();

        let card = only_card(&snapshot);
        assert_eq!(card.created_at, Some(ts("2024-01-07T08:00:00Z")));
        assert_eq!(card.completed_at, None);
        assert_eq!(card.cycle_time_days, None);
    }

    #[test]
    fn test_no_dates_at_all() {
        let snapshot = board().card("c1", "Bare", |c| c.list("l-todo")).build();

        let card = only_card(&snapshot);
        assert_eq!(card.created_at, None);
        assert_eq!(card.completed_at, None);
    }

    #[test]
    fn test_moved_out_of_done_loses_completion() {
        let snapshot = board()
            .card("c1", "Reopened", |c| {
                c.list("l-doing")
                    .action(Action::created(ts("2024-01-01T10:00:00Z")))
                    .action(Action::moved(ts("2024-01-03T10:00:00Z"), "Doing", "Done"))
                    .action(Action::moved(ts("2024-01-04T10:00:00Z"), "Done", "Doing"))
            })
            .build();

        let card = only_card(&snapshot);
        assert_eq!(card.current_list, "Doing");
        assert_eq!(card.completed_at, None);
    }

    #[test]
    fn test_most_recent_entry_into_done_wins() {
        let snapshot = board()
            .card("c1", "Bounced", |c| {
                c.list("l-done")
                    .action(Action::created(ts("2024-01-01T00:00:00Z")))
                    .action(Action::moved(ts("2024-01-02T00:00:00Z"), "Doing", "Done"))
                    .action(Action::moved(ts("2024-01-03T00:00:00Z"), "Done", "Doing"))
                    .action(Action::moved(ts("2024-01-06T00:00:00Z"), "Doing", "done "))
            })
            .build();

        let card = only_card(&snapshot);
        assert_eq!(card.completed_at, Some(ts("2024-01-06T00:00:00Z")));
        assert_eq!(card.cycle_time_days, Some(5.0));
    }

    #[test]
    fn test_done_without_move_uses_last_activity() {
        let snapshot = board()
            .card("c1", "Created in done", |c| {
                c.list("l-done")
                    .last_activity(ts("2024-01-08T00:00:00Z"))
                    .action(Action::created(ts("2024-01-06T00:00:00Z")))
            })
            .build();

        let card = only_card(&snapshot);
        assert_eq!(card.completed_at, Some(ts("2024-01-08T00:00:00Z")));
        assert_eq!(card.cycle_time_days, Some(2.0));
    }

    #[test]
    fn test_custom_done_list() {
        let snapshot = Snapshot::builder()
            .list("l-shipped", "Shipped")
            .card("c1", "Release", |c| {
                c.list("l-shipped")
                    .action(Action::created(ts("2024-01-01T00:00:00Z")))
                    .action(Action::moved(ts("2024-01-02T00:00:00Z"), "QA", "Shipped"))
            })
            .build();

        let default = BoardModel::build(&snapshot, &options()).unwrap();
        assert_eq!(default.cards()[0].completed_at, None);

        let custom = options().with_done_lists(ListMatcher::new(["shipped"]));
        let model = BoardModel::build(&snapshot, &custom).unwrap();
        assert_eq!(model.cards()[0].completed_at, Some(ts("2024-01-02T00:00:00Z")));
    }

    #[test]
    fn test_overdue() {
        let snapshot = board()
            .card("late", "Late", |c| c.list("l-doing").due(ts("2024-01-09T00:00:00Z")))
            .card("finished", "Finished", |c| {
                c.list("l-doing")
                    .due(ts("2024-01-09T00:00:00Z"))
                    .due_complete(true)
            })
            .card("future", "Future", |c| c.list("l-doing").due(ts("2024-01-11T00:00:00Z")))
            .card("naive", "Naive late", |c| c.list("l-doing").due(ts("2024-01-10T11:59:00")))
            .card("none", "No due", |c| c.list("l-doing"))
            .build();

        let model = BoardModel::build(&snapshot, &options()).unwrap();
        let overdue: Vec<&str> = model
            .cards()
            .iter()
            .filter(|c| c.is_overdue)
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(overdue, vec!["late", "naive"]);
    }

    #[test]
    fn test_due_exactly_now_is_not_overdue() {
        let snapshot = board()
            .card("c1", "Due now", |c| c.list("l-doing").due(ts("2024-01-10T12:00:00Z")))
            .build();
        assert!(!only_card(&snapshot).is_overdue);
    }

    #[test]
    fn test_names_resolved_with_sentinels() {
        let snapshot = board()
            .card("c1", "Orphan", |c| {
                c.list("l-gone")
                    .member("m1")
                    .member("m-gone")
                    .label("lb1", "")
                    .label("lb-x", "")
                    .label("lb-y", "chore")
            })
            .build();

        let card = only_card(&snapshot);
        assert_eq!(card.current_list, UNKNOWN);
        assert_eq!(card.members, vec!["Ana".to_string(), UNKNOWN.to_string()]);
        assert_eq!(card.labels, vec!["bug".to_string(), "chore".to_string()]);
        assert!(!card.labels.iter().any(|l| l == NO_LABEL));
    }

    #[test]
    fn test_archived_cards_excluded() {
        let snapshot = board()
            .card("c1", "Open", |c| c.list("l-todo"))
            .card("c2", "Archived", |c| c.list("l-todo").closed(true))
            .build();

        let model = BoardModel::build(&snapshot, &options()).unwrap();
        assert_eq!(model.cards().len(), 1);
        assert_eq!(model.cards()[0].id, "c1");
        assert_eq!(model.list_count(), 3);
        assert_eq!(model.member_count(), 2);
        assert_eq!(model.label_count(), 1);
    }

    #[test]
    fn test_mixed_action_awareness_fails() {
        let snapshot = board()
            .card("c1", "Mixed", |c| {
                c.list("l-doing")
                    .action(Action::created(ts("2024-01-01T00:00:00Z")))
                    .action(Action::moved(ts("2024-01-02T00:00:00"), "To do", "Doing"))
            })
            .build();

        let err = BoardModel::build(&snapshot, &options()).unwrap_err();
        assert!(matches!(err, MetricError::TimezoneMismatch(_)));
    }

    #[test]
    fn test_naive_chronology() {
        let snapshot = board()
            .card("c1", "Local", |c| {
                c.list("l-done")
                    .action(Action::moved(ts("2024-01-03 12:00:00"), "Doing", "Done"))
                    .action(Action::created(ts("2024-01-01 00:00:00")))
            })
            .build();

        let card = only_card(&snapshot);
        assert_eq!(card.cycle_time_days, Some(2.5));
        assert!(!card.created_at.unwrap().is_aware());
    }

    #[test]
    fn test_empty_snapshot() {
        let model = BoardModel::build(&Snapshot::builder().build(), &options()).unwrap();
        assert!(model.is_empty());
        assert_eq!(model.list_count(), 0);
    }
}
