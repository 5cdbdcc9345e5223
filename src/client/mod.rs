//! Client side of the task board: a local cache of boards and lanes kept in
//! step with the board service.
//!
//! | Module  | Responsibility                                               |
//! |---------|--------------------------------------------------------------|
//! | `cache` | `ClientCache`, `CacheAction` and the per-slice reducers      |
//! | `api`   | `BoardApi` trait and its reqwest implementation              |
//! | `sync`  | `SyncClient`: request, then dispatch; optimistic card moves  |
//!
//! The cache has a single writer. Every mutation is a `CacheAction` passed
//! to `ClientCache::dispatch`, which runs the boards reducer and then the
//! cards reducer.

pub mod api;
pub mod cache;
pub mod sync;

pub use api::{BoardApi, HttpBoardApi};
pub use cache::{CacheAction, ClientCache, Columns, FetchStatus};
pub use sync::{DragEnd, DropLocation, MoveOutcome, SyncClient};
