use std::io::Write as _;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser as _;
use tokio_util::sync::CancellationToken;

use readshelf::cli::{BooksArgs, Cli, Command, PageArgs};
use readshelf::config::Config;
use readshelf::library::{Fetched, Library};
use readshelf::server::AppState;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    readshelf::logging::init().context("init logging")?;

    let cli = Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    let config = Config::from_env().context("load configuration")?;
    tracing::debug!(?config, "loaded configuration");
    let library = Arc::new(Library::from_config(&config)?);

    match cli.command {
        Command::Serve(args) => {
            tracing::info!(addr = %args.addr, "starting readshelf");
            readshelf::server::serve(args.addr, AppState::new(library))
                .await
                .context("serve")?;
        }
        Command::Books(args) => books(&library, args).await.context("books")?,
        Command::Page(args) => page(&library, args).await.context("page")?,
    }

    Ok(())
}

async fn books(library: &Library, args: BooksArgs) -> anyhow::Result<()> {
    let page = if args.all {
        library.fetcher().fetch_all(args.status.into()).await?
    } else {
        library
            .list_books(args.status.into(), args.page_size, args.cursor.as_deref())
            .await
            .page
    };
    let json = serde_json::to_string_pretty(&page).context("serialize books")?;
    writeln!(std::io::stdout(), "{json}").context("write stdout")?;
    Ok(())
}

async fn page(library: &Library, args: PageArgs) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    match library.page_content(args.page_id.trim(), &cancel).await? {
        Fetched::Ready(content) => {
            let mut stdout = std::io::stdout();
            writeln!(stdout, "<h1>{}</h1>", readshelf::render::escape_html(&content.title))
                .context("write stdout")?;
            write!(stdout, "{}", content.content).context("write stdout")?;
        }
        Fetched::Cancelled => tracing::info!("cancelled"),
    }
    Ok(())
}
