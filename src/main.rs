use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use xfchess_sync::cli;
use xfchess_sync::core::config::{default_config_path, ClientConfig};
use xfchess_sync::core::identity::{default_identity_path, FileIdentityStore, IdentityKey, IdentityStore, LocalIdentity};
use xfchess_sync::game::PlayerColor;
use xfchess_sync::networking::{ClientCommand, ConnectionManager, SessionClient, WebSocketConnector};

#[derive(Parser, Debug)]
#[command(name = "xfchess-sync", version, about = "Play an online chess game from the terminal")]
struct Args {
    /// WebSocket endpoint of the game server
    #[arg(long, env = "XFCHESS_SERVER")]
    server: Option<String>,

    /// Failed connection attempts before giving up
    #[arg(long)]
    max_retries: Option<u32>,

    /// Display name to store with the identity
    #[arg(long)]
    name: Option<String>,

    /// Identity file (player id, last game id)
    #[arg(long)]
    identity_file: Option<PathBuf>,

    /// Client config file
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Create a new game
    Create {
        #[arg(long, value_enum, default_value_t = ColorArg::White)]
        color: ColorArg,
    },
    /// Join an existing game by id
    Join { game_id: String },
    /// Continue the last game
    Resume,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ColorArg {
    White,
    Black,
}

impl From<ColorArg> for PlayerColor {
    fn from(color: ColorArg) -> Self {
        match color {
            ColorArg::White => PlayerColor::White,
            ColorArg::Black => PlayerColor::Black,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let mut config = ClientConfig::load_or_default(&config_path);
    if let Some(server) = args.server {
        config.endpoint = server;
    }
    if let Some(max_retries) = args.max_retries {
        config.max_retries = max_retries;
    }
    let endpoint = config.endpoint_url().context("Invalid server endpoint")?;

    let identity_path = args.identity_file.unwrap_or_else(default_identity_path);
    let mut store = FileIdentityStore::open(identity_path);
    if let Some(name) = &args.name {
        store.set(IdentityKey::DisplayName, name)?;
    }
    let identity = LocalIdentity::load_or_create(&mut store).context("Could not load identity")?;
    info!(
        "[IDENTITY] Player {} ({})",
        identity.player_id,
        identity.display_name.as_deref().unwrap_or("anonymous")
    );

    let connection = ConnectionManager::start(
        WebSocketConnector::new(identity.player_id.clone()),
        endpoint,
        config.reconnect_policy(),
        config.event_channel_capacity,
    );
    let (ui_tx, mut ui_rx) = mpsc::unbounded_channel();
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let client = SessionClient::new(identity.player_id.clone(), Box::new(store), connection, ui_tx);

    let first = match args.mode {
        Some(Mode::Create { color }) => Some(ClientCommand::CreateGame(color.into())),
        Some(Mode::Join { game_id }) => Some(ClientCommand::JoinGame(game_id)),
        Some(Mode::Resume) => Some(ClientCommand::Resume),
        None if identity.game_id.is_some() => Some(ClientCommand::Resume),
        None => None,
    };
    if let Some(command) = first {
        cmd_tx.send(command).await?;
    }

    let printer = tokio::spawn(async move {
        while let Some(update) = ui_rx.recv().await {
            let text = cli::render(&update);
            if !text.is_empty() {
                println!("{}", text);
            }
        }
    });
    let reader = tokio::spawn(read_commands(cmd_tx));

    client.run(cmd_rx).await;
    reader.abort();
    printer.await?;
    Ok(())
}

async fn read_commands(cmd_tx: mpsc::Sender<ClientCommand>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        match cli::parse_command(&line) {
            Ok(ClientCommand::Shutdown) => break,
            Ok(command) => {
                if cmd_tx.send(command).await.is_err() {
                    return;
                }
            }
            Err(e) => eprintln!("{}", e),
        }
    }
    let _ = cmd_tx.send(ClientCommand::Shutdown).await;
}
