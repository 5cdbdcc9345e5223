//! Async actions: call the service, then reconcile the cache.

use std::collections::HashSet;

use super::api::{BoardApi, HttpBoardApi};
use super::cache::{CacheAction, CardMove, ClientCache, Columns};
use crate::board::models::{Board, Card, CardPatch, Column, NewCard};
use crate::errors::SyncError;

/// A lane position, as reported by a drag-and-drop gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropLocation {
    pub column: Column,
    pub index: usize,
}

/// The end of a drag gesture. `destination` is `None` when the card was
/// dropped outside any lane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragEnd {
    pub card_id: String,
    pub source: DropLocation,
    pub destination: Option<DropLocation>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MoveOutcome {
    /// Nothing to do: dropped outside a lane or back where it started.
    Unchanged,
    Moved(Card),
}

/// Pairs a `BoardApi` with the cache it keeps up to date.
pub struct SyncClient<A: BoardApi = HttpBoardApi> {
    api: A,
    cache: ClientCache,
}

impl<A: BoardApi> SyncClient<A> {
    pub fn new(api: A) -> Self {
        Self::with_cache(api, ClientCache::new())
    }

    pub fn with_cache(api: A, cache: ClientCache) -> Self {
        Self { api, cache }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn cache(&self) -> &ClientCache {
        &self.cache
    }

    pub fn into_cache(self) -> ClientCache {
        self.cache
    }

    /// Create a board. Cards without an id get one before sending.
    pub async fn add_board(&mut self, mut board: Board) -> Result<Board, SyncError> {
        stamp_card_ids(&mut board.cards);
        let created = self.api.create_board(&board).await?;
        self.cache.dispatch(CacheAction::AddBoard(created.clone()));
        self.cache.dispatch(CacheAction::AddCards {
            board_id: created.id.clone(),
            cards: Columns::from_cards(&created.cards),
        });
        Ok(created)
    }

    /// Refresh the board list, seeding every board's lanes.
    pub async fn fetch_boards(&mut self) -> Result<Vec<Board>, SyncError> {
        self.cache.dispatch(CacheAction::FetchBoardsRequest);
        match self.api.list_boards().await {
            Ok(boards) => {
                for board in &boards {
                    self.cache.dispatch(CacheAction::AddCards {
                        board_id: board.id.clone(),
                        cards: Columns::from_cards(&board.cards),
                    });
                }
                self.cache
                    .dispatch(CacheAction::FetchBoardsSuccess(boards.clone()));
                Ok(boards)
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to fetch boards");
                self.cache
                    .dispatch(CacheAction::FetchBoardsFailure(e.message()));
                Err(e)
            }
        }
    }

    /// Look a board up by id. A status error from the service (such as 404)
    /// clears the search result and yields `Ok(None)`.
    pub async fn search_board(&mut self, id: &str) -> Result<Option<Board>, SyncError> {
        match self.api.get_board(id).await {
            Ok(board) => {
                self.remember_board(&board);
                Ok(Some(board))
            }
            Err(SyncError::Status { status, message }) => {
                tracing::debug!(id, status, %message, "board search missed");
                self.cache.dispatch(CacheAction::SearchBoard(None));
                Ok(None)
            }
            Err(e) => {
                self.cache.dispatch(CacheAction::SearchBoard(None));
                Err(e)
            }
        }
    }

    /// Like `search_board`, but every failure is returned, 404 included, so
    /// callers can tell a missing board from a failing service.
    pub async fn open_board(&mut self, id: &str) -> Result<Board, SyncError> {
        let board = self.api.get_board(id).await?;
        self.remember_board(&board);
        Ok(board)
    }

    fn remember_board(&mut self, board: &Board) {
        self.cache.dispatch(CacheAction::AddBoard(board.clone()));
        self.cache.dispatch(CacheAction::AddCards {
            board_id: board.id.clone(),
            cards: Columns::from_cards(&board.cards),
        });
        self.cache
            .dispatch(CacheAction::SearchBoard(Some(board.clone())));
    }

    /// Fetch one board and replace its lanes, tracking the card fetch status.
    pub async fn load_board_cards(&mut self, board_id: &str) -> Result<Columns, SyncError> {
        self.cache.dispatch(CacheAction::FetchCardsRequest);
        match self.api.get_board(board_id).await {
            Ok(board) => {
                let cards = Columns::from_cards(&board.cards);
                self.cache.dispatch(CacheAction::FetchCardsSuccess {
                    board_id: board.id,
                    cards: cards.clone(),
                });
                Ok(cards)
            }
            Err(e) => {
                tracing::warn!(board_id, error = %e, "failed to load cards");
                self.cache
                    .dispatch(CacheAction::FetchCardsFailure(e.message()));
                Err(e)
            }
        }
    }

    pub async fn delete_board(&mut self, id: &str) -> Result<(), SyncError> {
        self.api.delete_board(id).await?;
        self.cache.dispatch(CacheAction::DeleteBoard(id.to_string()));
        Ok(())
    }

    pub async fn update_board(&mut self, id: &str, board_name: &str) -> Result<Board, SyncError> {
        let board = self.api.rename_board(id, board_name).await?;
        self.cache.dispatch(CacheAction::UpdateBoard {
            id: board.id.clone(),
            board_name: board.board_name.clone(),
        });
        Ok(board)
    }

    /// Add a card. It lands in the cache only if the service placed it in a lane.
    pub async fn add_card(&mut self, board_id: &str, card: NewCard) -> Result<Card, SyncError> {
        let created = self.api.add_card(board_id, &card).await?;
        if let Some(column) = created.column {
            self.cache.dispatch(CacheAction::AddCard {
                board_id: board_id.to_string(),
                column,
                card: created.clone(),
            });
        }
        Ok(created)
    }

    /// Patch a card currently shown in `column`.
    pub async fn update_card(
        &mut self,
        board_id: &str,
        column: Column,
        card_id: &str,
        patch: CardPatch,
    ) -> Result<Card, SyncError> {
        let updated = self.api.update_card(board_id, card_id, &patch).await?;
        self.cache.dispatch(CacheAction::UpdateCard {
            board_id: board_id.to_string(),
            column,
            card_id: card_id.to_string(),
            updated: updated.clone(),
        });
        Ok(updated)
    }

    pub async fn delete_card(
        &mut self,
        board_id: &str,
        column: Column,
        card_id: &str,
    ) -> Result<(), SyncError> {
        self.api.delete_card(board_id, card_id).await?;
        self.cache.dispatch(CacheAction::DeleteCard {
            board_id: board_id.to_string(),
            column,
            card_id: card_id.to_string(),
        });
        Ok(())
    }

    /// Optimistic move: splice the cache first, then tell the service.
    ///
    /// If the request fails the splice is undone and the error returned, so
    /// the cache never keeps a position the service rejected.
    pub async fn move_card(&mut self, board_id: &str, drag: DragEnd) -> Result<MoveOutcome, SyncError> {
        let Some(mv) = self.plan_move(board_id, &drag)? else {
            return Ok(MoveOutcome::Unchanged);
        };

        self.cache.dispatch(CacheAction::MoveCardLocally {
            mv: mv.clone(),
            card_id: drag.card_id.clone(),
        });

        match self
            .api
            .move_card(board_id, &drag.card_id, mv.dest_column)
            .await
        {
            Ok(card) => Ok(MoveOutcome::Moved(card)),
            Err(e) => {
                tracing::warn!(
                    board_id,
                    card_id = %drag.card_id,
                    error = %e,
                    "move rejected, rolling back"
                );
                self.cache.dispatch(CacheAction::MoveCardLocally {
                    mv: mv.reversed(mv.dest_index),
                    card_id: drag.card_id.clone(),
                });
                Err(e)
            }
        }
    }

    /// Request first, then splice the cache once the service confirms.
    pub async fn move_card_confirmed(
        &mut self,
        board_id: &str,
        drag: DragEnd,
    ) -> Result<MoveOutcome, SyncError> {
        let Some(mv) = self.plan_move(board_id, &drag)? else {
            return Ok(MoveOutcome::Unchanged);
        };
        let card = self
            .api
            .move_card(board_id, &drag.card_id, mv.dest_column)
            .await?;
        self.cache.dispatch(CacheAction::MoveCard(mv));
        Ok(MoveOutcome::Moved(card))
    }

    /// Check the drag against the cache and clamp the destination index to
    /// where the card will actually land. `None` means nothing to do.
    fn plan_move(&self, board_id: &str, drag: &DragEnd) -> Result<Option<CardMove>, SyncError> {
        let Some(dest) = drag.destination else {
            return Ok(None);
        };
        if dest == drag.source {
            return Ok(None);
        }

        let not_in_cache = || SyncError::CardNotInCache {
            board_id: board_id.to_string(),
            card_id: drag.card_id.clone(),
            column: drag.source.column.to_string(),
            index: drag.source.index,
        };
        let columns = self.cache.columns(board_id).ok_or_else(not_in_cache)?;
        let source_lane = columns.get(drag.source.column);
        match source_lane.get(drag.source.index) {
            Some(card) if card.id == drag.card_id => {}
            _ => return Err(not_in_cache()),
        }

        let mut dest_len = columns.get(dest.column).len();
        if dest.column == drag.source.column {
            dest_len -= 1;
        }
        let dest_index = dest.index.min(dest_len);
        if dest.column == drag.source.column && dest_index == drag.source.index {
            return Ok(None);
        }

        Ok(Some(CardMove {
            board_id: board_id.to_string(),
            source_column: drag.source.column,
            dest_column: dest.column,
            source_index: drag.source.index,
            dest_index,
        }))
    }
}

/// Give every card without an id a millisecond-timestamp id, unique among
/// `cards`.
fn stamp_card_ids(cards: &mut [Card]) {
    let mut taken: HashSet<String> = cards
        .iter()
        .filter(|c| !c.id.is_empty())
        .map(|c| c.id.clone())
        .collect();
    let mut next = chrono::Utc::now().timestamp_millis();
    for card in cards.iter_mut().filter(|c| c.id.is_empty()) {
        while taken.contains(&next.to_string()) {
            next += 1;
        }
        card.id = next.to_string();
        taken.insert(card.id.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::cache::FetchStatus;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory service. `fail_moves` makes every move answer 500, `fail_reads`
    /// does the same for board reads.
    #[derive(Default)]
    struct MockBoardApi {
        boards: Mutex<HashMap<String, Board>>,
        fail_moves: bool,
        fail_reads: bool,
        next_id: AtomicUsize,
        move_calls: AtomicUsize,
    }

    fn not_found(what: &str) -> SyncError {
        SyncError::Status {
            status: 404,
            message: format!("{} not found", what),
        }
    }

    #[async_trait]
    impl BoardApi for MockBoardApi {
        async fn create_board(&self, board: &Board) -> Result<Board, SyncError> {
            let mut boards = self.boards.lock().unwrap();
            if boards.contains_key(&board.id) {
                return Err(SyncError::Status {
                    status: 400,
                    message: "Duplicate key error".into(),
                });
            }
            boards.insert(board.id.clone(), board.clone());
            Ok(board.clone())
        }

        async fn list_boards(&self) -> Result<Vec<Board>, SyncError> {
            let mut boards: Vec<Board> = self.boards.lock().unwrap().values().cloned().collect();
            boards.sort_by(|a, b| a.id.cmp(&b.id));
            Ok(boards)
        }

        async fn get_board(&self, id: &str) -> Result<Board, SyncError> {
            if self.fail_reads {
                return Err(SyncError::Status {
                    status: 500,
                    message: "Error fetching board".into(),
                });
            }
            self.boards
                .lock()
                .unwrap()
                .get(id)
                .cloned()
                .ok_or_else(|| not_found("Board"))
        }

        async fn rename_board(&self, id: &str, board_name: &str) -> Result<Board, SyncError> {
            let mut boards = self.boards.lock().unwrap();
            let board = boards.get_mut(id).ok_or_else(|| not_found("Board"))?;
            board.board_name = board_name.to_string();
            Ok(board.clone())
        }

        async fn delete_board(&self, id: &str) -> Result<(), SyncError> {
            self.boards
                .lock()
                .unwrap()
                .remove(id)
                .map(|_| ())
                .ok_or_else(|| not_found("Board"))
        }

        async fn add_card(&self, board_id: &str, card: &NewCard) -> Result<Card, SyncError> {
            let mut boards = self.boards.lock().unwrap();
            let board = boards.get_mut(board_id).ok_or_else(|| not_found("Board"))?;
            let id = 1000 + self.next_id.fetch_add(1, Ordering::SeqCst);
            let created = Card {
                id: id.to_string(),
                title: card.title.clone(),
                description: card.description.clone(),
                column: card.column,
            };
            board.cards.push(created.clone());
            Ok(created)
        }

        async fn update_card(
            &self,
            board_id: &str,
            card_id: &str,
            patch: &CardPatch,
        ) -> Result<Card, SyncError> {
            let mut boards = self.boards.lock().unwrap();
            let board = boards.get_mut(board_id).ok_or_else(|| not_found("Board"))?;
            let card = board.card_mut(card_id).ok_or_else(|| not_found("Card"))?;
            patch.apply(card);
            Ok(card.clone())
        }

        async fn delete_card(&self, board_id: &str, card_id: &str) -> Result<(), SyncError> {
            let mut boards = self.boards.lock().unwrap();
            let board = boards.get_mut(board_id).ok_or_else(|| not_found("Board"))?;
            let before = board.cards.len();
            board.cards.retain(|c| c.id != card_id);
            if board.cards.len() == before {
                return Err(not_found("Card"));
            }
            Ok(())
        }

        async fn move_card(
            &self,
            board_id: &str,
            card_id: &str,
            dest_column: Column,
        ) -> Result<Card, SyncError> {
            self.move_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_moves {
                return Err(SyncError::Status {
                    status: 500,
                    message: "Error moving card".into(),
                });
            }
            let mut boards = self.boards.lock().unwrap();
            let board = boards.get_mut(board_id).ok_or_else(|| not_found("Board"))?;
            let card = board.card_mut(card_id).ok_or_else(|| not_found("Card"))?;
            card.column = Some(dest_column);
            Ok(card.clone())
        }
    }

    fn card(id: &str, column: Column) -> Card {
        Card {
            id: id.into(),
            title: format!("card {}", id),
            description: None,
            column: Some(column),
        }
    }

    fn lane_ids(client: &SyncClient<MockBoardApi>, column: Column) -> Vec<String> {
        client
            .cache()
            .columns("b1")
            .map(|c| c.get(column).iter().map(|c| c.id.clone()).collect())
            .unwrap_or_default()
    }

    async fn client_with_board(fail_moves: bool) -> SyncClient<MockBoardApi> {
        let api = MockBoardApi {
            fail_moves,
            ..Default::default()
        };
        let mut client = SyncClient::new(api);
        let mut board = Board::new("b1", "Work");
        board.cards = vec![
            card("a", Column::Todo),
            card("b", Column::Todo),
            card("c", Column::Done),
        ];
        client.add_board(board).await.unwrap();
        client
    }

    fn drag(card_id: &str, from: (Column, usize), to: Option<(Column, usize)>) -> DragEnd {
        DragEnd {
            card_id: card_id.into(),
            source: DropLocation {
                column: from.0,
                index: from.1,
            },
            destination: to.map(|(column, index)| DropLocation { column, index }),
        }
    }

    #[test]
    fn test_stamp_card_ids_fills_blanks_uniquely() {
        let mut cards = vec![
            Card {
                id: String::new(),
                title: "x".into(),
                description: None,
                column: None,
            },
            Card {
                id: String::new(),
                title: "y".into(),
                description: None,
                column: None,
            },
            card("keep", Column::Todo),
        ];
        stamp_card_ids(&mut cards);
        assert!(!cards[0].id.is_empty());
        assert_ne!(cards[0].id, cards[1].id);
        assert_eq!(cards[2].id, "keep");
    }

    #[tokio::test]
    async fn test_add_board_seeds_list_and_lanes() {
        let client = client_with_board(false).await;
        assert_eq!(client.cache().board("b1").unwrap().board_name, "Work");
        assert_eq!(lane_ids(&client, Column::Todo), vec!["a", "b"]);
        assert_eq!(lane_ids(&client, Column::Done), vec!["c"]);
    }

    #[tokio::test]
    async fn test_add_duplicate_board_leaves_cache() {
        let mut client = client_with_board(false).await;
        let before = client.cache().clone();
        let err = client.add_board(Board::new("b1", "Again")).await.unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert_eq!(client.cache(), &before);
    }

    #[tokio::test]
    async fn test_fetch_boards_replaces_list() {
        let mut client = client_with_board(false).await;
        client
            .api()
            .boards
            .lock()
            .unwrap()
            .insert("b2".into(), Board::new("b2", "Home"));
        let boards = client.fetch_boards().await.unwrap();
        assert_eq!(boards.len(), 2);
        assert_eq!(client.cache().boards.boards.len(), 2);
        assert_eq!(client.cache().boards.status, FetchStatus::Succeeded);
        assert!(client.cache().columns("b2").is_some());
    }

    #[tokio::test]
    async fn test_search_miss_clears_result() {
        let mut client = client_with_board(false).await;
        assert!(client.search_board("b1").await.unwrap().is_some());
        assert!(client.cache().boards.search_board.is_some());

        assert!(client.search_board("nope").await.unwrap().is_none());
        assert!(client.cache().boards.search_board.is_none());
    }

    #[tokio::test]
    async fn test_open_board_seeds_cache_and_reports_every_failure() {
        let mut client = client_with_board(false).await;
        let board = client.open_board("b1").await.unwrap();
        assert_eq!(board.board_name, "Work");
        assert!(client.cache().boards.search_board.is_some());

        let err = client.open_board("nope").await.unwrap_err();
        assert_eq!(err.status(), Some(404));

        let failing = MockBoardApi {
            fail_reads: true,
            ..Default::default()
        };
        let mut client = SyncClient::new(failing);
        let err = client.open_board("b1").await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        // search_board still folds a failing service into a miss
        assert!(client.search_board("b1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rename_and_delete_board() {
        let mut client = client_with_board(false).await;
        client.update_board("b1", "Chores").await.unwrap();
        assert_eq!(client.cache().board("b1").unwrap().board_name, "Chores");

        client.delete_board("b1").await.unwrap();
        assert!(client.cache().board("b1").is_none());
        assert!(client.cache().columns("b1").is_none());
    }

    #[tokio::test]
    async fn test_card_crud_updates_lanes() {
        let mut client = client_with_board(false).await;
        let created = client
            .add_card(
                "b1",
                NewCard {
                    title: "new".into(),
                    description: Some("d".into()),
                    column: Some(Column::InProgress),
                },
            )
            .await
            .unwrap();
        assert_eq!(lane_ids(&client, Column::InProgress), vec![created.id.clone()]);

        let patch = CardPatch {
            column: Some(Column::Done),
            ..Default::default()
        };
        client
            .update_card("b1", Column::InProgress, &created.id, patch)
            .await
            .unwrap();
        assert!(lane_ids(&client, Column::InProgress).is_empty());
        assert_eq!(lane_ids(&client, Column::Done), vec!["c".to_string(), created.id.clone()]);

        client
            .delete_card("b1", Column::Done, &created.id)
            .await
            .unwrap();
        assert_eq!(lane_ids(&client, Column::Done), vec!["c"]);
    }

    #[tokio::test]
    async fn test_add_unplaced_card_skips_lanes() {
        let mut client = client_with_board(false).await;
        client
            .add_card(
                "b1",
                NewCard {
                    title: "floating".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(client.cache().columns("b1").unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_optimistic_move_success() {
        let mut client = client_with_board(false).await;
        let outcome = client
            .move_card("b1", drag("a", (Column::Todo, 0), Some((Column::Done, 0))))
            .await
            .unwrap();
        match outcome {
            MoveOutcome::Moved(card) => assert_eq!(card.column, Some(Column::Done)),
            MoveOutcome::Unchanged => panic!("Expected Moved"),
        }
        assert_eq!(lane_ids(&client, Column::Todo), vec!["b"]);
        assert_eq!(lane_ids(&client, Column::Done), vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_optimistic_move_rolls_back_on_failure() {
        let mut client = client_with_board(true).await;
        let before = client.cache().clone();
        let err = client
            .move_card("b1", drag("b", (Column::Todo, 1), Some((Column::Done, 1))))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(client.cache(), &before);
    }

    #[tokio::test]
    async fn test_rollback_restores_within_lane_reorder() {
        let mut client = client_with_board(true).await;
        let before = client.cache().clone();
        client
            .move_card("b1", drag("a", (Column::Todo, 0), Some((Column::Todo, 5))))
            .await
            .unwrap_err();
        assert_eq!(client.cache(), &before);
    }

    #[tokio::test]
    async fn test_drop_outside_or_in_place_is_unchanged() {
        let mut client = client_with_board(false).await;
        let outside = client
            .move_card("b1", drag("a", (Column::Todo, 0), None))
            .await
            .unwrap();
        assert_eq!(outside, MoveOutcome::Unchanged);

        let in_place = client
            .move_card("b1", drag("a", (Column::Todo, 0), Some((Column::Todo, 0))))
            .await
            .unwrap();
        assert_eq!(in_place, MoveOutcome::Unchanged);
        assert_eq!(client.api().move_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_move_with_stale_index_is_rejected() {
        let mut client = client_with_board(false).await;
        let err = client
            .move_card("b1", drag("a", (Column::Todo, 1), Some((Column::Done, 0))))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::CardNotInCache { .. }));
        assert_eq!(client.api().move_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_confirmed_move_leaves_cache_on_failure() {
        let mut client = client_with_board(true).await;
        let before = client.cache().clone();
        client
            .move_card_confirmed("b1", drag("a", (Column::Todo, 0), Some((Column::Done, 0))))
            .await
            .unwrap_err();
        assert_eq!(client.cache(), &before);
    }

    #[tokio::test]
    async fn test_confirmed_move_applies_after_success() {
        let mut client = client_with_board(false).await;
        client
            .move_card_confirmed("b1", drag("c", (Column::Done, 0), Some((Column::InProgress, 0))))
            .await
            .unwrap();
        assert_eq!(lane_ids(&client, Column::InProgress), vec!["c"]);
        assert!(lane_ids(&client, Column::Done).is_empty());
    }

    #[tokio::test]
    async fn test_load_board_cards_tracks_status() {
        let mut client = client_with_board(false).await;
        let columns = client.load_board_cards("b1").await.unwrap();
        assert_eq!(columns.len(), 3);
        assert!(client.cache().cards.status.error().is_none());

        client.load_board_cards("missing").await.unwrap_err();
        assert!(client.cache().cards.status.error().is_some());
    }
}
