use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::board::models::{Board, Card, Column};

/// Per-board projection of cards into the three fixed lanes.
///
/// Cards whose column is unset are left out of every lane.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Columns {
    pub todo_cards: Vec<Card>,
    pub in_progress_cards: Vec<Card>,
    pub done_cards: Vec<Card>,
}

impl Columns {
    /// Group cards by their column, keeping their relative order.
    pub fn from_cards(cards: &[Card]) -> Self {
        let mut columns = Self::default();
        for card in cards {
            if let Some(column) = card.column {
                columns.get_mut(column).push(card.clone());
            }
        }
        columns
    }

    pub fn get(&self, column: Column) -> &[Card] {
        match column {
            Column::Todo => &self.todo_cards,
            Column::InProgress => &self.in_progress_cards,
            Column::Done => &self.done_cards,
        }
    }

    pub fn get_mut(&mut self, column: Column) -> &mut Vec<Card> {
        match column {
            Column::Todo => &mut self.todo_cards,
            Column::InProgress => &mut self.in_progress_cards,
            Column::Done => &mut self.done_cards,
        }
    }

    /// Total number of cards across all lanes.
    pub fn len(&self) -> usize {
        self.todo_cards.len() + self.in_progress_cards.len() + self.done_cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Where a card currently sits.
    pub fn position(&self, card_id: &str) -> Option<(Column, usize)> {
        Column::ALL.iter().find_map(|&column| {
            self.get(column)
                .iter()
                .position(|c| c.id == card_id)
                .map(|index| (column, index))
        })
    }

    /// Splice a card out of one lane and into another (or the same one).
    ///
    /// The destination index is clamped to the lane length. When
    /// `expected_id` is given the card at the source index must have that
    /// id. Returns whether anything moved.
    fn splice(&mut self, mv: &CardMove, expected_id: Option<&str>) -> bool {
        let source = self.get_mut(mv.source_column);
        let Some(card) = source.get(mv.source_index) else {
            return false;
        };
        if expected_id.is_some_and(|id| card.id != id) {
            return false;
        }
        let card = source.remove(mv.source_index);
        let dest = self.get_mut(mv.dest_column);
        let index = mv.dest_index.min(dest.len());
        dest.insert(index, card);
        true
    }
}

/// Lifecycle of a fetch: `Idle → Loading → (Succeeded | Failed)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FetchStatus {
    #[default]
    Idle,
    Loading,
    Succeeded,
    Failed(String),
}

impl FetchStatus {
    pub fn is_loading(&self) -> bool {
        matches!(self, FetchStatus::Loading)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            FetchStatus::Failed(msg) => Some(msg),
            _ => None,
        }
    }
}

/// A card relocation between two lane positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardMove {
    pub board_id: String,
    pub source_column: Column,
    pub dest_column: Column,
    pub source_index: usize,
    pub dest_index: usize,
}

impl CardMove {
    /// The move that undoes this one, given where the card actually landed.
    pub fn reversed(&self, landed_at: usize) -> CardMove {
        CardMove {
            board_id: self.board_id.clone(),
            source_column: self.dest_column,
            dest_column: self.source_column,
            source_index: landed_at,
            dest_index: self.source_index,
        }
    }
}

/// Everything that can change the client cache.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheAction {
    FetchBoardsRequest,
    FetchBoardsSuccess(Vec<Board>),
    FetchBoardsFailure(String),
    /// Insert at the front unless a board with the same id is present.
    AddBoard(Board),
    SearchBoard(Option<Board>),
    DeleteBoard(String),
    UpdateBoard { id: String, board_name: String },
    FetchCardsRequest,
    FetchCardsSuccess { board_id: String, cards: Columns },
    FetchCardsFailure(String),
    /// Seed (replace) the projection of one board.
    AddCards { board_id: String, cards: Columns },
    AddCard { board_id: String, column: Column, card: Card },
    DeleteCard { board_id: String, column: Column, card_id: String },
    UpdateCard {
        board_id: String,
        column: Column,
        card_id: String,
        updated: Card,
    },
    /// Server-confirmed move.
    MoveCard(CardMove),
    /// Optimistic move; skipped unless the card at the source index is `card_id`.
    MoveCardLocally { mv: CardMove, card_id: String },
}

impl CacheAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::FetchBoardsRequest => "boards/fetchBoardsRequest",
            Self::FetchBoardsSuccess(_) => "boards/fetchBoardsSuccess",
            Self::FetchBoardsFailure(_) => "boards/fetchBoardsFailure",
            Self::AddBoard(_) => "boards/addBoard",
            Self::SearchBoard(_) => "boards/searchBoard",
            Self::DeleteBoard(_) => "boards/deleteBoard",
            Self::UpdateBoard { .. } => "boards/updateBoard",
            Self::FetchCardsRequest => "cards/fetchCardsRequest",
            Self::FetchCardsSuccess { .. } => "cards/fetchCardsSuccess",
            Self::FetchCardsFailure(_) => "cards/fetchCardsFailure",
            Self::AddCards { .. } => "cards/addCards",
            Self::AddCard { .. } => "cards/addCard",
            Self::DeleteCard { .. } => "cards/deleteCard",
            Self::UpdateCard { .. } => "cards/updateCard",
            Self::MoveCard(_) => "cards/moveCard",
            Self::MoveCardLocally { .. } => "cards/moveCardLocally",
        }
    }
}

/// Board list, current search result and board-list fetch status.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardsState {
    pub boards: Vec<Board>,
    pub search_board: Option<Board>,
    pub status: FetchStatus,
}

impl BoardsState {
    pub fn reduce(&mut self, action: &CacheAction) {
        match action {
            CacheAction::FetchBoardsRequest => self.status = FetchStatus::Loading,
            CacheAction::FetchBoardsSuccess(boards) => {
                self.boards = boards.clone();
                self.status = FetchStatus::Succeeded;
            }
            CacheAction::FetchBoardsFailure(msg) => self.status = FetchStatus::Failed(msg.clone()),
            CacheAction::AddBoard(board) => {
                if !self.boards.iter().any(|b| b.id == board.id) {
                    self.boards.insert(0, board.clone());
                }
            }
            CacheAction::SearchBoard(board) => self.search_board = board.clone(),
            CacheAction::DeleteBoard(id) => {
                self.boards.retain(|b| &b.id != id);
                if self.search_board.as_ref().is_some_and(|b| &b.id == id) {
                    self.search_board = None;
                }
            }
            CacheAction::UpdateBoard { id, board_name } => {
                for board in self.boards.iter_mut().filter(|b| &b.id == id) {
                    board.board_name = board_name.clone();
                }
                if let Some(board) = self.search_board.as_mut().filter(|b| &b.id == id) {
                    board.board_name = board_name.clone();
                }
            }
            _ => {}
        }
    }
}

/// Per-board lane projections and the card fetch status.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardsState {
    pub cards_by_board_id: HashMap<String, Columns>,
    pub status: FetchStatus,
}

impl CardsState {
    pub fn reduce(&mut self, action: &CacheAction) {
        match action {
            CacheAction::FetchCardsRequest => self.status = FetchStatus::Loading,
            CacheAction::FetchCardsSuccess { board_id, cards } => {
                self.cards_by_board_id.insert(board_id.clone(), cards.clone());
                self.status = FetchStatus::Succeeded;
            }
            CacheAction::FetchCardsFailure(msg) => self.status = FetchStatus::Failed(msg.clone()),
            CacheAction::AddCards { board_id, cards } => {
                self.cards_by_board_id.insert(board_id.clone(), cards.clone());
            }
            CacheAction::DeleteBoard(id) => {
                self.cards_by_board_id.remove(id);
            }
            CacheAction::AddCard {
                board_id,
                column,
                card,
            } => {
                self.board_mut(board_id).get_mut(*column).push(card.clone());
            }
            CacheAction::DeleteCard {
                board_id,
                column,
                card_id,
            } => {
                if let Some(columns) = self.cards_by_board_id.get_mut(board_id) {
                    columns.get_mut(*column).retain(|c| &c.id != card_id);
                }
            }
            CacheAction::UpdateCard {
                board_id,
                column,
                card_id,
                updated,
            } => {
                let Some(columns) = self.cards_by_board_id.get_mut(board_id) else {
                    return;
                };
                let lane = columns.get_mut(*column);
                let Some(index) = lane.iter().position(|c| &c.id == card_id) else {
                    return;
                };
                match updated.column {
                    Some(new_column) if new_column != *column => {
                        lane.remove(index);
                        columns.get_mut(new_column).push(updated.clone());
                    }
                    _ => lane[index] = updated.clone(),
                }
            }
            CacheAction::MoveCard(mv) => {
                if let Some(columns) = self.cards_by_board_id.get_mut(&mv.board_id) {
                    columns.splice(mv, None);
                }
            }
            CacheAction::MoveCardLocally { mv, card_id } => {
                if let Some(columns) = self.cards_by_board_id.get_mut(&mv.board_id) {
                    columns.splice(mv, Some(card_id));
                }
            }
            _ => {}
        }
    }

    fn board_mut(&mut self, board_id: &str) -> &mut Columns {
        self.cards_by_board_id
            .entry(board_id.to_string())
            .or_default()
    }
}

/// The client's local, possibly stale mirror of server state.
///
/// Owned by one writer; every change goes through [`ClientCache::dispatch`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientCache {
    pub boards: BoardsState,
    pub cards: CardsState,
}

impl ClientCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatch(&mut self, action: CacheAction) {
        tracing::debug!(action = action.name(), "dispatch");
        self.boards.reduce(&action);
        self.cards.reduce(&action);
    }

    pub fn board(&self, board_id: &str) -> Option<&Board> {
        self.boards.boards.iter().find(|b| b.id == board_id)
    }

    pub fn columns(&self, board_id: &str) -> Option<&Columns> {
        self.cards.cards_by_board_id.get(board_id)
    }
}
