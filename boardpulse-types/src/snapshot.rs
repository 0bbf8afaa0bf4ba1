//! Snapshot - one complete fetch of a board.

use crate::{Board, BoardList, Card, CardBuilder, Label, Member, Timestamp, SCHEMA_VERSION};

/// Schema version embedded in saved snapshots.
///
/// Lets a reader reject files written by an incompatible build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SchemaVersion {
    /// Breaking changes increment this.
    pub major: u32,
    /// Backwards-compatible additions increment this.
    pub minor: u32,
}

impl SchemaVersion {
    pub const fn current() -> Self {
        Self {
            major: SCHEMA_VERSION,
            minor: 0,
        }
    }

    /// Same major version as this library.
    pub fn is_compatible(&self) -> bool {
        self.major == SCHEMA_VERSION
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self::current()
    }
}

/// Everything fetched from the board in one refresh.
///
/// A snapshot is never updated in place; the next refresh builds a new one.
///
/// # Example
///
/// ```rust
/// use boardpulse_types::{Action, Snapshot};
///
/// let snapshot = Snapshot::builder()
///     .board("b1", "Team board")
///     .list("l-doing", "Doing")
///     .list("l-done", "Done")
///     .member("m1", "Ana Souza")
///     .card("c1", "Ship release", |c| {
///         c.list("l-done")
///             .member("m1")
///             .action(Action::created("2024-01-01T09:00:00Z".parse().unwrap()))
///     })
///     .build();
///
/// assert_eq!(snapshot.cards.len(), 1);
/// assert_eq!(snapshot.list_name("l-doing"), Some("Doing"));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Snapshot {
    #[cfg_attr(feature = "serde", serde(default))]
    pub version: SchemaVersion,
    pub fetched_at: Timestamp,
    pub board: Board,
    pub lists: Vec<BoardList>,
    pub members: Vec<Member>,
    pub labels: Vec<Label>,
    pub cards: Vec<Card>,
}

impl Snapshot {
    /// Create a builder for constructing snapshots.
    pub fn builder() -> SnapshotBuilder {
        SnapshotBuilder::new()
    }

    /// No cards on the board.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn list_name(&self, list_id: &str) -> Option<&str> {
        self.lists
            .iter()
            .find(|l| l.id == list_id)
            .map(|l| l.name.as_str())
    }

    /// Total number of actions attached across all cards.
    pub fn action_count(&self) -> usize {
        self.cards.iter().map(|c| c.actions.len()).sum()
    }
}

/// Builder for constructing `Snapshot` instances.
#[derive(Debug)]
pub struct SnapshotBuilder {
    fetched_at: Option<Timestamp>,
    board: Board,
    lists: Vec<BoardList>,
    members: Vec<Member>,
    labels: Vec<Label>,
    cards: Vec<Card>,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self {
            fetched_at: None,
            board: Board::default(),
            lists: Vec::new(),
            members: Vec::new(),
            labels: Vec::new(),
            cards: Vec::new(),
        }
    }

    pub fn fetched_at(mut self, at: Timestamp) -> Self {
        self.fetched_at = Some(at);
        self
    }

    pub fn board(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.board.id = id.into();
        self.board.name = name.into();
        self
    }

    pub fn board_info(mut self, board: Board) -> Self {
        self.board = board;
        self
    }

    pub fn list(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.lists.push(BoardList {
            id: id.into(),
            name: name.into(),
            closed: false,
            pos: None,
        });
        self
    }

    pub fn member(mut self, id: impl Into<String>, full_name: impl Into<String>) -> Self {
        self.members.push(Member {
            id: id.into(),
            full_name: full_name.into(),
            username: None,
        });
        self
    }

    pub fn label(
        mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        color: impl Into<String>,
    ) -> Self {
        self.labels.push(Label {
            id: id.into(),
            name: name.into(),
            color: Some(color.into()),
        });
        self
    }

    /// Add a card built using a closure.
    pub fn card<F>(mut self, id: impl Into<String>, name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(CardBuilder) -> CardBuilder,
    {
        self.cards.push(f(CardBuilder::new(id, name)).build());
        self
    }

    /// Add a pre-built card.
    pub fn raw_card(mut self, card: Card) -> Self {
        self.cards.push(card);
        self
    }

    /// Build the snapshot, stamping it with the current time unless a
    /// `fetched_at` was given.
    pub fn build(self) -> Snapshot {
        Snapshot {
            version: SchemaVersion::current(),
            fetched_at: self.fetched_at.unwrap_or_else(Timestamp::now_utc),
            board: self.board,
            lists: self.lists,
            members: self.members,
            labels: self.labels,
            cards: self.cards,
        }
    }
}

impl Default for SnapshotBuilder {
    fn default() -> Self {
        Self::new()
    }
}
