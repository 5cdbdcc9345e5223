//! Client commands: talk to a running service through `SyncClient` and print
//! the resulting lanes.

use anyhow::{Context, Result, bail};
use taskboard::board::models::{Board, CardPatch, Column, NewCard};
use taskboard::client::{Columns, DragEnd, DropLocation, HttpBoardApi, MoveOutcome, SyncClient};
use taskboard::errors::SyncError;

fn connect(base_url: &str) -> Result<SyncClient> {
    let api = HttpBoardApi::new(base_url)?;
    tracing::debug!(base_url = api.base_url(), "using board service");
    Ok(SyncClient::new(api))
}

/// Trim a user-supplied value and refuse it if nothing is left.
fn required<'a>(what: &str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        bail!("{} must not be empty", what);
    }
    Ok(trimmed)
}

/// Fetch a board so its lanes are cached. Only a 404 reads as "not found".
async fn load_board(client: &mut SyncClient, id: &str) -> Result<Board> {
    match client.open_board(id).await {
        Ok(board) => Ok(board),
        Err(SyncError::Status { status: 404, .. }) => bail!("Board {} not found", id),
        Err(e) => Err(e).with_context(|| format!("Failed to fetch board {}", id)),
    }
}

fn locate(client: &SyncClient, board_id: &str, card_id: &str) -> Result<Column> {
    client
        .cache()
        .columns(board_id)
        .and_then(|columns| columns.position(card_id))
        .map(|(column, _)| column)
        .with_context(|| format!("Card {} is not in any column of board {}", card_id, board_id))
}

fn print_board(board: &Board, columns: &Columns) {
    println!("{} ({})", board.board_name, board.id);
    for column in Column::ALL {
        let cards = columns.get(column);
        println!("  {} [{}]", column.title(), cards.len());
        for (index, card) in cards.iter().enumerate() {
            match &card.description {
                Some(description) => {
                    println!("    {}. {}  {} - {}", index, card.id, card.title, description)
                }
                None => println!("    {}. {}  {}", index, card.id, card.title),
            }
        }
    }
}

fn print_cached(client: &SyncClient, board_id: &str) {
    let cache = client.cache();
    if let (Some(board), Some(columns)) = (cache.board(board_id), cache.columns(board_id)) {
        print_board(board, columns);
    }
}

pub async fn cmd_boards(base_url: &str) -> Result<()> {
    let mut client = connect(base_url)?;
    let boards = client
        .fetch_boards()
        .await
        .context("Failed to fetch boards")?;
    if boards.is_empty() {
        println!("No boards.");
        return Ok(());
    }
    let empty = Columns::default();
    for board in &boards {
        let columns = client.cache().columns(&board.id).unwrap_or(&empty);
        println!(
            "{:<16} {:<24} todo {:>3}  in progress {:>3}  done {:>3}",
            board.id,
            board.board_name,
            columns.todo_cards.len(),
            columns.in_progress_cards.len(),
            columns.done_cards.len()
        );
    }
    Ok(())
}

pub async fn cmd_board(base_url: &str, id: &str) -> Result<()> {
    let id = required("Board id", id)?;
    let mut client = connect(base_url)?;
    load_board(&mut client, id).await?;
    print_cached(&client, id);
    Ok(())
}

pub async fn cmd_add_board(base_url: &str, name: &str, id: Option<String>) -> Result<()> {
    let name = required("Board name", name)?;
    let id = match id {
        Some(id) => required("Board id", &id)?.to_string(),
        None => chrono::Utc::now().timestamp_millis().to_string(),
    };
    let mut client = connect(base_url)?;
    let board = client
        .add_board(Board::new(id, name))
        .await
        .context("Failed to create board")?;
    println!("Created board {} ({})", board.board_name, board.id);
    Ok(())
}

pub async fn cmd_rename_board(base_url: &str, id: &str, name: &str) -> Result<()> {
    let name = required("Board name", name)?;
    let mut client = connect(base_url)?;
    let board = client
        .update_board(id, name)
        .await
        .with_context(|| format!("Failed to rename board {}", id))?;
    println!("Renamed board {} to {}", board.id, board.board_name);
    Ok(())
}

pub async fn cmd_delete_board(base_url: &str, id: &str) -> Result<()> {
    let mut client = connect(base_url)?;
    client
        .delete_board(id)
        .await
        .with_context(|| format!("Failed to delete board {}", id))?;
    println!("Deleted board {}", id);
    Ok(())
}

pub async fn cmd_add_card(
    base_url: &str,
    board_id: &str,
    title: &str,
    description: Option<String>,
    column: Column,
) -> Result<()> {
    let title = required("Card title", title)?;
    let description = description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());
    let mut client = connect(base_url)?;
    load_board(&mut client, board_id).await?;
    let card = client
        .add_card(
            board_id,
            NewCard {
                title: title.to_string(),
                description,
                column: Some(column),
            },
        )
        .await
        .context("Failed to add card")?;
    println!("Added card {} to {}", card.id, column.title());
    print_cached(&client, board_id);
    Ok(())
}

pub async fn cmd_edit_card(
    base_url: &str,
    board_id: &str,
    card_id: &str,
    title: Option<String>,
    description: Option<String>,
) -> Result<()> {
    let title = title
        .map(|t| required("Card title", &t).map(str::to_string))
        .transpose()?;
    let patch = CardPatch {
        title,
        description: description.map(|d| d.trim().to_string()),
        column: None,
    };
    if patch.is_empty() {
        bail!("Nothing to change: pass --title and/or --description");
    }
    let mut client = connect(base_url)?;
    load_board(&mut client, board_id).await?;
    let column = locate(&client, board_id, card_id)?;
    client
        .update_card(board_id, column, card_id, patch)
        .await
        .with_context(|| format!("Failed to update card {}", card_id))?;
    print_cached(&client, board_id);
    Ok(())
}

pub async fn cmd_delete_card(base_url: &str, board_id: &str, card_id: &str) -> Result<()> {
    let mut client = connect(base_url)?;
    load_board(&mut client, board_id).await?;
    let column = locate(&client, board_id, card_id)?;
    client
        .delete_card(board_id, column, card_id)
        .await
        .with_context(|| format!("Failed to delete card {}", card_id))?;
    println!("Deleted card {}", card_id);
    Ok(())
}

/// Drag the card at `from[from_index]` to `to[to_index]`.
pub async fn cmd_move_card(
    base_url: &str,
    board_id: &str,
    from: DropLocation,
    to: DropLocation,
) -> Result<()> {
    let mut client = connect(base_url)?;
    load_board(&mut client, board_id).await?;
    let card_id = client
        .cache()
        .columns(board_id)
        .and_then(|columns| columns.get(from.column).get(from.index))
        .map(|card| card.id.clone())
        .with_context(|| {
            format!(
                "No card at {} index {} on board {}",
                from.column, from.index, board_id
            )
        })?;

    let outcome = client
        .move_card(
            board_id,
            DragEnd {
                card_id,
                source: from,
                destination: Some(to),
            },
        )
        .await
        .context("Failed to move card")?;
    match outcome {
        MoveOutcome::Moved(card) => println!("Moved card {} to {}", card.id, to.column.title()),
        MoveOutcome::Unchanged => println!("Card is already there"),
    }
    print_cached(&client, board_id);
    Ok(())
}
