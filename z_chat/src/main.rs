mod keyboard;
mod term_display;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context};
use clap::Parser;
use console::Term;
use term_display::{prompt_for, TermDisplay};
use tokio_util::sync::CancellationToken;
use zenoh_chat::{generate_nickname, ChatConfig, ChatSession, SessionExt};

/// z_chat - peer-to-peer chat rooms over Zenoh
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Nickname (prompted for when omitted)
    #[arg(short, long)]
    nick: Option<String>,

    /// Room name (prompted for when omitted)
    #[arg(short, long)]
    room: Option<String>,

    /// Path to Zenoh config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn ask(term: &Term, question: &str) -> std::io::Result<String> {
    term.write_line(question)?;
    Ok(term.read_line()?.trim().to_string())
}

#[tokio::main(flavor = "multi_thread", worker_threads = 1)]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Logs go to stderr, stdout belongs to the chat screen
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(tracing::Level::WARN)
        .init();

    let term = Term::stdout();
    let nickname = match args.nick {
        Some(nick) => nick,
        None => ask(&term, "Enter Your Nickname: ")?,
    };
    let nickname = if nickname.is_empty() {
        generate_nickname()
    } else {
        nickname
    };
    let room_name = match args.room {
        Some(room) => room,
        None => ask(&term, "Enter Your Room Name: ")?,
    };

    // Create zenoh config
    let zenoh_config = if let Some(config_path) = args.config {
        zenoh::Config::from_file(config_path)
            .map_err(|e| anyhow!("Failed to load config file: {}", e))?
    } else {
        zenoh::Config::default()
    };

    // Create zenoh session
    let session = zenoh::open(zenoh_config)
        .await
        .map_err(|e| anyhow!("Failed to open zenoh session: {}", e))?;

    let config = ChatConfig::default();
    let cancel = CancellationToken::new();
    let room = session
        .join_chat_room(room_name.as_str())
        .nickname(nickname.as_str())
        .config(config.clone())
        .cancellation(cancel.clone())
        .await
        .with_context(|| format!("Failed to join room '{}'", room_name))?;

    println!("room: {}", room.room_name());
    println!("nick: {}", room.nickname());
    println!("peer: {}", room.self_id());

    let draft = Arc::new(Mutex::new(String::new()));
    let display = TermDisplay::new(Term::stdout(), room.room_name(), room.nickname(), draft.clone());
    let prompt = prompt_for(room.nickname());
    let mut chat = ChatSession::new(room, display, &config);

    // Ctrl-C outside raw key reading cancels the whole session
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_cancel.cancel();
        }
    });

    term.clear_screen()?;
    let _keyboard = keyboard::spawn(chat.input(), prompt, draft);

    let reason = chat.run().await;
    drop(chat);

    term.clear_screen()?;
    println!("Session ended: {}", reason);
    Ok(())
}
