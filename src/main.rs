use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use taskboard::board::models::Column;
use taskboard::client::DropLocation;
use taskboard::config::TaskboardConfig;

mod cmd;

#[derive(Parser)]
#[command(name = "taskboard")]
#[command(version, about = "Kanban task board service and client")]
pub struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a taskboard.toml. Defaults to ./taskboard.toml when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Base URL of the board service. Overrides [client] base_url.
    #[arg(long, global = true)]
    pub url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the board service
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(short, long)]
        port: Option<u16>,

        /// SQLite database path
        #[arg(long)]
        db_path: Option<PathBuf>,

        /// Do not send CORS headers
        #[arg(long)]
        no_cors: bool,
    },
    /// Create the board database and exit
    Init {
        #[arg(long)]
        db_path: Option<PathBuf>,
    },
    /// List all boards with their column counts
    Boards,
    /// Show one board's columns
    Board { id: String },
    /// Create a board
    AddBoard {
        name: String,

        /// Board id; a millisecond timestamp when omitted
        #[arg(long)]
        id: Option<String>,
    },
    /// Rename a board
    RenameBoard { id: String, name: String },
    /// Delete a board and all of its cards
    DeleteBoard { id: String },
    /// Add a card to a board
    AddCard {
        board: String,
        title: String,

        #[arg(short, long)]
        description: Option<String>,

        /// todoCards, inProgressCards or doneCards
        #[arg(short, long, default_value = "todoCards")]
        column: Column,
    },
    /// Change a card's title or description
    EditCard {
        board: String,
        card: String,

        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long)]
        description: Option<String>,
    },
    /// Delete a card
    DeleteCard { board: String, card: String },
    /// Move the card at FROM[FROM_INDEX] to TO[TO_INDEX]
    MoveCard {
        board: String,
        from: Column,
        from_index: usize,
        to: Column,
        to_index: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = TaskboardConfig::resolve(cli.config.as_deref())?;
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    if let Some(url) = &cli.url {
        config.client.base_url = url.clone();
    }
    let _log_guard = taskboard::logging::init(&config.logging)?;
    for warning in config.validate() {
        tracing::warn!("{}", warning);
    }

    let url = config.client.base_url.as_str();
    match cli.command {
        Commands::Serve {
            host,
            port,
            db_path,
            no_cors,
        } => {
            let overrides = cmd::ServeOverrides {
                host,
                port,
                db_path,
                no_cors,
            };
            cmd::cmd_serve(&config, overrides).await?;
        }
        Commands::Init { db_path } => cmd::cmd_init(&config, db_path)?,
        Commands::Boards => cmd::cmd_boards(url).await?,
        Commands::Board { id } => cmd::cmd_board(url, &id).await?,
        Commands::AddBoard { name, id } => cmd::cmd_add_board(url, &name, id).await?,
        Commands::RenameBoard { id, name } => cmd::cmd_rename_board(url, &id, &name).await?,
        Commands::DeleteBoard { id } => cmd::cmd_delete_board(url, &id).await?,
        Commands::AddCard {
            board,
            title,
            description,
            column,
        } => cmd::cmd_add_card(url, &board, &title, description, column).await?,
        Commands::EditCard {
            board,
            card,
            title,
            description,
        } => cmd::cmd_edit_card(url, &board, &card, title, description).await?,
        Commands::DeleteCard { board, card } => cmd::cmd_delete_card(url, &board, &card).await?,
        Commands::MoveCard {
            board,
            from,
            from_index,
            to,
            to_index,
        } => {
            let from = DropLocation {
                column: from,
                index: from_index,
            };
            let to = DropLocation {
                column: to,
                index: to_index,
            };
            cmd::cmd_move_card(url, &board, from, to).await?;
        }
    }

    Ok(())
}
