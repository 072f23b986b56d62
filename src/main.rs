//! Line-based REPL hosting the command surface for a single guild.
//!
//! Stands in for a chat dispatcher: each stdin line is one command,
//! executed in the configured guild's namespace.

use clap::Parser;
use guildhall::provider::DEFAULT_API_BASE;
use guildhall::{commands, Command, Dnd5eProvider, GameSession, GuildId, SessionStore};
use std::sync::Arc;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "guildhall", about = "Guild tabletop session REPL")]
struct Args {
    /// Path to the persisted session data file.
    #[arg(long, default_value = "guildhall.json")]
    data: String,

    /// Guild namespace to operate in.
    #[arg(long, default_value = "local")]
    guild: String,

    /// Base URL of the 5e data API.
    #[arg(long, default_value = DEFAULT_API_BASE)]
    api_base: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let store = Arc::new(SessionStore::open(&args.data).await);
    let provider = Arc::new(Dnd5eProvider::with_base_url(&args.api_base));
    let session = GameSession::new(store, provider);
    let guild = GuildId::new(args.guild);

    let mut lines = BufReader::new(io::stdin()).lines();
    let mut stdout = io::stdout();

    stdout
        .write_all(format!("guildhall ready (guild '{guild}'). Type 'help'.\n> ").as_bytes())
        .await?;
    stdout.flush().await?;

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            stdout.write_all(b"> ").await?;
            stdout.flush().await?;
            continue;
        }
        if line.trim() == "quit" || line.trim() == "exit" {
            break;
        }

        let reply = match Command::parse(&line) {
            Ok(command) => match commands::dispatch(&session, &guild, command).await {
                Ok(reply) => reply,
                Err(err) => err.to_string(),
            },
            Err(err) => err.to_string(),
        };

        stdout.write_all(format!("{reply}\n> ").as_bytes()).await?;
        stdout.flush().await?;
    }

    Ok(())
}
