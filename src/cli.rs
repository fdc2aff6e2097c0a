use std::net::SocketAddr;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::model::Shelf;

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Serve(ServeArgs),
    Books(BooksArgs),
    Page(PageArgs),
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:8080")]
    pub addr: SocketAddr,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ShelfArg {
    Reading,
    Finished,
}

impl From<ShelfArg> for Shelf {
    fn from(value: ShelfArg) -> Self {
        match value {
            ShelfArg::Reading => Shelf::Reading,
            ShelfArg::Finished => Shelf::Finished,
        }
    }
}

#[derive(Debug, Args)]
pub struct BooksArgs {
    /// Which shelf to list.
    #[arg(long, value_enum, default_value = "finished")]
    pub status: ShelfArg,

    /// Books per page (1-100).
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Cursor returned as `nextCursor` by a previous call.
    #[arg(long)]
    pub cursor: Option<String>,

    /// Follow cursors and print every book on the shelf.
    #[arg(long, conflicts_with = "cursor")]
    pub all: bool,
}

#[derive(Debug, Args)]
pub struct PageArgs {
    /// Page identifier of the book.
    #[arg(long)]
    pub page_id: String,
}
