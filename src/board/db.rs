use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};

use super::models::*;
use crate::errors::BoardError;

pub type DbResult<T> = Result<T, BoardError>;

/// Async-safe handle to the board store.
///
/// Wraps `BoardDb` behind `Arc<Mutex>` and runs all access on tokio's
/// blocking thread pool via `spawn_blocking`, so synchronous SQLite I/O
/// never ties up async worker threads.
#[derive(Clone)]
pub struct DbHandle {
    inner: Arc<std::sync::Mutex<BoardDb>>,
}

impl DbHandle {
    pub fn new(db: BoardDb) -> Self {
        Self {
            inner: Arc::new(std::sync::Mutex::new(db)),
        }
    }

    /// Run a closure with access to the store on a blocking thread.
    /// All data passed into `f` must be owned (`'static`).
    pub async fn call<F, R>(&self, f: F) -> DbResult<R>
    where
        F: FnOnce(&BoardDb) -> DbResult<R> + Send + 'static,
        R: Send + 'static,
    {
        let db = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = db.lock().map_err(|_| BoardError::LockPoisoned)?;
            f(&guard)
        })
        .await
        .context("DB task panicked")?
    }

    #[cfg(test)]
    fn lock_sync(&self) -> DbResult<std::sync::MutexGuard<'_, BoardDb>> {
        self.inner.lock().map_err(|_| BoardError::LockPoisoned)
    }
}

/// Document store for boards.
///
/// Every board is one JSON document with its cards embedded. Card mutations
/// load the whole document, change it in memory and write it back; there is
/// no version check, so the last save wins.
pub struct BoardDb {
    conn: Connection,
}

impl BoardDb {
    /// Open (or create) a SQLite database at the given path and run migrations.
    pub fn new(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite database at {}", path.display()))?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Create an in-memory SQLite database (for testing).
    pub fn new_in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> DbResult<()> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS boards (
                    seq INTEGER PRIMARY KEY AUTOINCREMENT,
                    id TEXT NOT NULL UNIQUE,
                    document TEXT NOT NULL,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                );
                ",
            )
            .context("Failed to create boards table")?;
        Ok(())
    }

    // ── Board CRUD ────────────────────────────────────────────────────

    /// Insert a new board document. Rejects a duplicate id without
    /// touching the stored one.
    pub fn create_board(&self, board: &Board) -> DbResult<Board> {
        validate_new_board(board)?;
        let document = encode(board)?;
        match self.conn.execute(
            "INSERT INTO boards (id, document) VALUES (?1, ?2)",
            params![board.id, document],
        ) {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                return Err(BoardError::DuplicateBoard {
                    id: board.id.clone(),
                });
            }
            Err(e) => return Err(e.into()),
        }
        tracing::info!(board_id = %board.id, cards = board.cards.len(), "board created");
        Ok(board.clone())
    }

    pub fn get_board(&self, id: &str) -> DbResult<Option<Board>> {
        let document: Option<String> = self
            .conn
            .query_row(
                "SELECT document FROM boards WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        document.map(|doc| decode(id, &doc)).transpose()
    }

    /// All boards in creation order.
    pub fn list_boards(&self) -> DbResult<Vec<Board>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, document FROM boards ORDER BY seq")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut boards = Vec::new();
        for row in rows {
            let (id, doc) = row?;
            boards.push(decode(&id, &doc)?);
        }
        Ok(boards)
    }

    pub fn rename_board(&self, id: &str, board_name: &str) -> DbResult<Board> {
        if is_blank(board_name) {
            return Err(BoardError::Validation("boardName is required".into()));
        }
        let mut board = self.load(id)?;
        board.board_name = board_name.to_string();
        self.save(&board)?;
        tracing::info!(board_id = %id, board_name, "board renamed");
        Ok(board)
    }

    pub fn delete_board(&self, id: &str) -> DbResult<()> {
        let affected = self
            .conn
            .execute("DELETE FROM boards WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(BoardError::BoardNotFound { id: id.to_string() });
        }
        tracing::info!(board_id = %id, "board deleted");
        Ok(())
    }

    // ── Card operations ───────────────────────────────────────────────

    /// Append a card to the end of the board's card list and stamp its id.
    pub fn add_card(&self, board_id: &str, new_card: NewCard) -> DbResult<Card> {
        if is_blank(&new_card.title) {
            return Err(BoardError::Validation("card title is required".into()));
        }
        let mut board = self.load(board_id)?;
        let card = Card {
            id: next_card_id(&board),
            title: new_card.title,
            description: new_card.description,
            column: new_card.column,
        };
        board.cards.push(card.clone());
        self.save(&board)?;
        tracing::info!(board_id, card_id = %card.id, "card added");
        Ok(card)
    }

    pub fn update_card(&self, board_id: &str, card_id: &str, patch: &CardPatch) -> DbResult<Card> {
        if patch.title.as_deref().is_some_and(is_blank) {
            return Err(BoardError::Validation("card title is required".into()));
        }
        let mut board = self.load(board_id)?;
        let card = board
            .card_mut(card_id)
            .ok_or_else(|| card_not_found(board_id, card_id))?;
        patch.apply(card);
        let card = card.clone();
        self.save(&board)?;
        tracing::info!(board_id, card_id, "card updated");
        Ok(card)
    }

    /// Remove a card. A miss is an error and leaves the document untouched.
    pub fn delete_card(&self, board_id: &str, card_id: &str) -> DbResult<()> {
        let mut board = self.load(board_id)?;
        let before = board.cards.len();
        board.cards.retain(|c| c.id != card_id);
        if board.cards.len() == before {
            return Err(card_not_found(board_id, card_id));
        }
        self.save(&board)?;
        tracing::info!(board_id, card_id, "card deleted");
        Ok(())
    }

    /// Reassign a card's column. The card keeps its place in the stored
    /// list; ordering within a column is a client concern.
    pub fn move_card(&self, board_id: &str, card_id: &str, dest: Column) -> DbResult<Card> {
        let mut board = self.load(board_id)?;
        let card = board
            .card_mut(card_id)
            .ok_or_else(|| card_not_found(board_id, card_id))?;
        let from = card.column;
        card.column = Some(dest);
        let card = card.clone();
        self.save(&board)?;
        tracing::info!(board_id, card_id, ?from, to = %dest, "card moved");
        Ok(card)
    }

    // ── Document helpers ──────────────────────────────────────────────

    fn load(&self, id: &str) -> DbResult<Board> {
        self.get_board(id)?
            .ok_or_else(|| BoardError::BoardNotFound { id: id.to_string() })
    }

    fn save(&self, board: &Board) -> DbResult<()> {
        let document = encode(board)?;
        let affected = self.conn.execute(
            "UPDATE boards SET document = ?1, updated_at = datetime('now') WHERE id = ?2",
            params![document, board.id],
        )?;
        // Deleted between load and save.
        if affected == 0 {
            return Err(BoardError::BoardNotFound {
                id: board.id.clone(),
            });
        }
        Ok(())
    }
}

fn card_not_found(board_id: &str, card_id: &str) -> BoardError {
    BoardError::CardNotFound {
        board_id: board_id.to_string(),
        card_id: card_id.to_string(),
    }
}

fn encode(board: &Board) -> DbResult<String> {
    serde_json::to_string(board)
        .with_context(|| format!("Failed to encode board {}", board.id))
        .map_err(BoardError::from)
}

fn decode(id: &str, document: &str) -> DbResult<Board> {
    serde_json::from_str(document).map_err(|source| BoardError::CorruptDocument {
        id: id.to_string(),
        source,
    })
}

fn validate_new_board(board: &Board) -> DbResult<()> {
    if is_blank(&board.id) {
        return Err(BoardError::Validation("board id is required".into()));
    }
    if is_blank(&board.board_name) {
        return Err(BoardError::Validation("boardName is required".into()));
    }
    let mut seen = std::collections::HashSet::new();
    for card in &board.cards {
        if is_blank(&card.id) {
            return Err(BoardError::Validation("every card needs an id".into()));
        }
        if is_blank(&card.title) {
            return Err(BoardError::Validation(format!(
                "card {} has no title",
                card.id
            )));
        }
        if !seen.insert(card.id.as_str()) {
            return Err(BoardError::Validation(format!(
                "card id {} appears twice",
                card.id
            )));
        }
    }
    Ok(())
}

/// Empty or whitespace only.
fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// Millisecond timestamp, bumped until it is unused on this board.
fn next_card_id(board: &Board) -> String {
    let mut stamp = chrono::Utc::now().timestamp_millis();
    loop {
        let candidate = stamp.to_string();
        if board.card(&candidate).is_none() {
            return candidate;
        }
        stamp += 1;
    }
}
