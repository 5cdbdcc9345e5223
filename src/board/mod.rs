//! Board service: REST back-end for the task board.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────┐   HTTP   ┌──────────────────────────────────────────────────┐
//! │  Client  │ ───────> │  server.rs  (axum Router, ServerConfig)          │
//! │ (client) │ <─────── │    └─ api.rs  (route handlers, AppState)         │
//! └──────────┘          │         │                                        │
//!                       │         │ DbHandle::call(|db| ...)               │
//!                       │         v                                        │
//!                       │  db.rs  (BoardDb: one JSON document per board)   │
//!                       └──────────────────────────────────────────────────┘
//! ```
//!
//! | Module   | Responsibility                                           |
//! |----------|----------------------------------------------------------|
//! | `models` | Shared types: `Board`, `Card`, `Column`, response bodies |
//! | `db`     | SQLite document store via `DbHandle` (`Arc<Mutex<_>>`)   |
//! | `api`    | Handlers, request payloads, `ApiError` → JSON body       |
//! | `server` | Router assembly, CORS/trace layers, bind + shutdown      |
//!
//! ## Typical Request Flow (drag a card to "Done")
//!
//! 1. `PUT /boards/:boardId/cards/:cardId/move` → `api::move_card()`
//! 2. `destColumn` is parsed into a `Column`; unknown names are a 400.
//! 3. `BoardDb::move_card()` loads the board document, rewrites the card's
//!    column and saves the whole document back. Last save wins.
//! 4. The handler answers `{ message: "Card moved", card }`.

pub mod api;
pub mod db;
pub mod models;
pub mod server;
