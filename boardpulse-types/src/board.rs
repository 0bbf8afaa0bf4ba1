//! Board entities as exported by the Trello REST API.
//!
//! Field names follow the API's camelCase JSON when the `serde` feature is
//! enabled, so a response body deserializes straight into these types.

use crate::Timestamp;

/// Board metadata.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Board {
    pub id: String,
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub desc: String,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub url: Option<String>,
}

/// A column of the board ("To do", "Doing", "Done", ...).
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct BoardList {
    pub id: String,
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub closed: bool,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub pos: Option<f64>,
}

/// A board member.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Member {
    pub id: String,
    pub full_name: String,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub username: Option<String>,
}

/// A label, either from the board's label set or embedded in a card.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Label {
    pub id: String,
    /// Trello allows unnamed (color-only) labels, reported as "".
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub color: Option<String>,
}

/// A card together with the action history fetched for it.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Card {
    pub id: String,
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub desc: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub due: Option<Timestamp>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub due_complete: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub id_list: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub id_members: Vec<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub labels: Vec<Label>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub date_last_activity: Option<Timestamp>,
    /// Archived flag.
    #[cfg_attr(feature = "serde", serde(default))]
    pub closed: bool,
    /// Not part of the cards endpoint; attached by the client from the
    /// card's own actions endpoint. Empty when that request failed.
    #[cfg_attr(feature = "serde", serde(default))]
    pub actions: Vec<Action>,
}

impl Card {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Create a builder for a card.
    pub fn builder(id: impl Into<String>, name: impl Into<String>) -> CardBuilder {
        CardBuilder::new(id, name)
    }
}

/// Type of a card action.
///
/// Only the kinds the metrics care about get their own variant; anything
/// else is preserved verbatim in [`ActionKind::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "String", into = "String"))]
pub enum ActionKind {
    CreateCard,
    CopyCard,
    UpdateCard,
    Other(String),
}

impl ActionKind {
    /// Whether this action marks the birth of a card.
    pub fn is_creation(&self) -> bool {
        matches!(self, ActionKind::CreateCard | ActionKind::CopyCard)
    }

    pub fn as_str(&self) -> &str {
        match self {
            ActionKind::CreateCard => "createCard",
            ActionKind::CopyCard => "copyCard",
            ActionKind::UpdateCard => "updateCard",
            ActionKind::Other(kind) => kind,
        }
    }
}

impl From<String> for ActionKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "createCard" => ActionKind::CreateCard,
            "copyCard" => ActionKind::CopyCard,
            "updateCard" => ActionKind::UpdateCard,
            _ => ActionKind::Other(kind),
        }
    }
}

impl From<ActionKind> for String {
    fn from(kind: ActionKind) -> Self {
        kind.as_str().to_string()
    }
}

/// Reference to a list inside an action payload.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ListRef {
    #[cfg_attr(feature = "serde", serde(default))]
    pub id: String,
    pub name: String,
}

/// Kind-specific payload of an action. Only list moves are modelled.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ActionData {
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub list_before: Option<ListRef>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub list_after: Option<ListRef>,
}

/// A timestamped event in a card's history.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Action {
    #[cfg_attr(feature = "serde", serde(default))]
    pub id: String,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: ActionKind,
    pub date: Timestamp,
    #[cfg_attr(feature = "serde", serde(default))]
    pub data: ActionData,
}

impl Action {
    pub fn new(kind: ActionKind, date: Timestamp) -> Self {
        Self {
            id: String::new(),
            kind,
            date,
            data: ActionData::default(),
        }
    }

    /// A `createCard` action.
    pub fn created(date: Timestamp) -> Self {
        Self::new(ActionKind::CreateCard, date)
    }

    /// An `updateCard` action moving the card between two lists.
    pub fn moved(date: Timestamp, from: impl Into<String>, to: impl Into<String>) -> Self {
        let mut action = Self::new(ActionKind::UpdateCard, date);
        action.data.list_before = Some(ListRef {
            id: String::new(),
            name: from.into(),
        });
        action.data.list_after = Some(ListRef {
            id: String::new(),
            name: to.into(),
        });
        action
    }

    /// Destination list name if this action is a list move.
    pub fn moved_to(&self) -> Option<&str> {
        match self.kind {
            ActionKind::UpdateCard => self.data.list_after.as_ref().map(|l| l.name.as_str()),
            _ => None,
        }
    }
}

// ============================================================================
// Builders
// ============================================================================

/// Builder for `Card`.
#[derive(Debug)]
pub struct CardBuilder {
    card: Card,
}

impl CardBuilder {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            card: Card::new(id, name),
        }
    }

    /// Set the id of the list the card currently sits in.
    pub fn list(mut self, list_id: impl Into<String>) -> Self {
        self.card.id_list = Some(list_id.into());
        self
    }

    /// Assign a member by id.
    pub fn member(mut self, member_id: impl Into<String>) -> Self {
        self.card.id_members.push(member_id.into());
        self
    }

    /// Attach an embedded label.
    pub fn label(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.card.labels.push(Label {
            id: id.into(),
            name: name.into(),
            color: None,
        });
        self
    }

    pub fn due(mut self, due: Timestamp) -> Self {
        self.card.due = Some(due);
        self
    }

    pub fn due_complete(mut self, complete: bool) -> Self {
        self.card.due_complete = complete;
        self
    }

    pub fn last_activity(mut self, at: Timestamp) -> Self {
        self.card.date_last_activity = Some(at);
        self
    }

    pub fn closed(mut self, closed: bool) -> Self {
        self.card.closed = closed;
        self
    }

    pub fn action(mut self, action: Action) -> Self {
        self.card.actions.push(action);
        self
    }

    pub fn build(self) -> Card {
        self.card
    }
}
