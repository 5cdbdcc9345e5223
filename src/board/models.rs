use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the three fixed lanes a card can sit in.
///
/// The wire names are the client's column keys, so a card's `column` can be
/// used directly to index the client-side projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Column {
    #[serde(rename = "todoCards")]
    Todo,
    #[serde(rename = "inProgressCards")]
    InProgress,
    #[serde(rename = "doneCards")]
    Done,
}

impl Column {
    /// Display order of the lanes.
    pub const ALL: [Column; 3] = [Column::Todo, Column::InProgress, Column::Done];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "todoCards",
            Self::InProgress => "inProgressCards",
            Self::Done => "doneCards",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Todo => "TODO",
            Self::InProgress => "IN PROGRESS",
            Self::Done => "DONE",
        }
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Column {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todoCards" => Ok(Self::Todo),
            "inProgressCards" => Ok(Self::InProgress),
            "doneCards" => Ok(Self::Done),
            _ => Err(format!("Invalid column: {}", s)),
        }
    }
}

/// A task unit embedded in exactly one board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Unset until the card is placed; such cards show up in no column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<Column>,
}

/// A named board owning its cards by embedding. This is the stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: String,
    pub board_name: String,
    #[serde(default)]
    pub cards: Vec<Card>,
}

impl Board {
    pub fn new(id: impl Into<String>, board_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            board_name: board_name.into(),
            cards: Vec::new(),
        }
    }

    pub fn card(&self, card_id: &str) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == card_id)
    }

    pub fn card_mut(&mut self, card_id: &str) -> Option<&mut Card> {
        self.cards.iter_mut().find(|c| c.id == card_id)
    }

    /// Cards in `column`, in stored order.
    pub fn cards_in(&self, column: Column) -> impl Iterator<Item = &Card> {
        self.cards.iter().filter(move |c| c.column == Some(column))
    }
}

/// Fields for a card that does not exist yet; the store assigns the id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewCard {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<Column>,
}

/// Partial card update. `None` leaves the field as it is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<Column>,
}

impl CardPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.column.is_none()
    }

    pub fn apply(&self, card: &mut Card) {
        if let Some(title) = &self.title {
            card.title = title.clone();
        }
        if let Some(description) = &self.description {
            card.description = Some(description.clone());
        }
        if let Some(column) = self.column {
            card.column = Some(column);
        }
    }
}

// API view types

/// Body returned by card update and move.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardEnvelope {
    pub message: String,
    pub card: Card,
}

/// Body returned by card deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDeleted {
    pub message: String,
    pub card_id: String,
}

/// Body returned by board deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardDeleted {
    pub message: String,
    pub id: String,
}

/// Error body shared by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}
