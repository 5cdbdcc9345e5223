//! CLI command implementations.
//!
//! | Module   | Commands handled                                              |
//! |----------|---------------------------------------------------------------|
//! | `serve`  | `Serve`, `Init`                                               |
//! | `boards` | `Boards`, `Board`, `AddBoard`, `RenameBoard`, `DeleteBoard`,  |
//! |          | `AddCard`, `EditCard`, `DeleteCard`, `MoveCard`               |

pub mod boards;
pub mod serve;

pub use boards::{
    cmd_add_board, cmd_add_card, cmd_board, cmd_boards, cmd_delete_board, cmd_delete_card,
    cmd_edit_card, cmd_move_card, cmd_rename_board,
};
pub use serve::{ServeOverrides, cmd_init, cmd_serve};
