//! Wayfarer application binary - composition root.
//!
//! Ties the Wayfarer crates together into a terminal chat loop:
//! 1. Load configuration from TOML
//! 2. Open the SQLite-backed session store
//! 3. Wire the router, conversation engine, media coordinator, and assistant
//! 4. Read submissions from stdin and print the resulting messages
//!
//! The generative backends are pluggable traits; this binary wires the
//! in-crate mock implementations so the whole flow runs without credentials.

mod cli;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use wayfarer_chat::{Assistant, ConversationEngine, MockChatBackend, ReplyChunk};
use wayfarer_core::config::WayfarerConfig;
use wayfarer_core::types::{Message, Sender};
use wayfarer_core::WayfarerError;
use wayfarer_live::{LiveEvent, LiveSession, MockMicrophone, MockRealtimeBackend};
use wayfarer_media::{ImageResult, InlineImage, MediaCoordinator, MockMediaBackend, VideoStatus};
use wayfarer_router::Submission;
use wayfarer_store::{SessionStore, SqliteKv};

use cli::CliArgs;

/// Expand ~ to home directory in a path string.
fn resolve_data_dir(data_dir: &str) -> PathBuf {
    if data_dir.starts_with("~/") || data_dir.starts_with("~\\") {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(&data_dir[2..])
    } else {
        PathBuf::from(data_dir)
    }
}

/// Scripted stand-in backends, used until real credentials are wired.
fn mock_backends() -> (Arc<MockChatBackend>, Arc<MockMediaBackend>) {
    let chat = Arc::new(
        MockChatBackend::new()
            .with_reply(vec![
                ReplyChunk::text("Here's a thought: pick one neighbourhood and "),
                ReplyChunk::text("explore it slowly rather than racing between sights."),
            ]),
    );
    let media = Arc::new(
        MockMediaBackend::new()
            .with_image_result(ImageResult {
                image: Some(InlineImage {
                    mime_type: "image/png".to_string(),
                    data: "iVBORw0KGgo=".to_string(),
                }),
                text: Some("Here's your image.".to_string()),
                ..ImageResult::default()
            })
            .with_poll_sequence(vec![
                VideoStatus {
                    done: false,
                    result_uri: None,
                },
                VideoStatus {
                    done: true,
                    result_uri: Some("https://example.com/clip.mp4".to_string()),
                },
            ]),
    );
    (chat, media)
}

fn print_message(msg: &Message) {
    let who = match msg.sender {
        Sender::User => "you",
        Sender::Bot if msg.system => "note",
        Sender::Bot => "wayfarer",
    };
    if !msg.text.is_empty() {
        println!("[{}] {}", who, msg.text);
    }
    for src in &msg.sources {
        println!("        source: {} ({})", src.title, src.uri);
    }
    for img in &msg.images {
        let preview: String = img.chars().take(48).collect();
        println!("        image: {}...", preview);
    }
    if let Some(url) = &msg.video_url {
        println!("        video: {}", url);
    }
    if !msg.suggestions.is_empty() {
        let chips: Vec<&str> = msg.suggestions.iter().map(|s| s.text.as_str()).collect();
        println!("        try: {}", chips.join(" | "));
    }
}

/// Print messages appended to the active session since the last watermark.
fn print_new_messages(store: &SessionStore, after: u64) -> u64 {
    let session = store.active_session();
    let mut last = after;
    for msg in session.messages.iter().filter(|m| m.id > after) {
        print_message(msg);
        last = last.max(msg.id);
    }
    last
}

fn print_help() {
    println!("Commands:");
    println!("  /new              start a new chat");
    println!("  /sessions         list sessions");
    println!("  /open <n>         switch to session n");
    println!("  /delete <n>       delete session n");
    println!("  /gallery          list generated images");
    println!("  /animate <n> <p>  animate gallery image n with prompt p");
    println!("  /tts on|off       toggle spoken replies");
    println!("  /cancel           drop a pending image prompt");
    println!("  /live             run a short live-voice exchange");
    println!("  /quit             exit");
    println!("Anything else is sent to the assistant.");
}

/// Drive one scripted live exchange end to end and print the transcript.
async fn run_live_demo(config: &WayfarerConfig, language: &str) -> Result<(), WayfarerError> {
    let backend = Arc::new(MockRealtimeBackend::new().with_events(vec![
        LiveEvent::InputTranscript {
            text: "what's worth seeing near the harbour".to_string(),
            finished: true,
        },
        LiveEvent::OutputTranscript {
            text: "The old lighthouse walk is lovely at sunset, ".to_string(),
            finished: false,
        },
        LiveEvent::OutputTranscript {
            text: "and the fish market opens at six.".to_string(),
            finished: true,
        },
        LiveEvent::TurnComplete,
    ]));
    let mic = Arc::new(MockMicrophone::new().with_frames(vec![vec![0.0; 1600]]));

    let session = LiveSession::start(backend, mic, config.live.clone(), language).await?;
    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    for turn in session.turns() {
        println!("[you, voice] {}", turn.user);
        println!("[wayfarer, voice] {}", turn.bot);
    }
    session.stop();
    println!("(live session {})", session.state());
    Ok(())
}

async fn handle_command(
    line: &str,
    assistant: &Assistant,
    store: &SessionStore,
    config: &WayfarerConfig,
    language: &str,
) -> Result<bool, WayfarerError> {
    let mut parts = line.splitn(3, ' ');
    let command = parts.next().unwrap_or_default();
    match command {
        "/quit" | "/exit" => return Ok(true),
        "/help" => print_help(),
        "/new" => {
            assistant.new_chat(language)?;
            println!("Started a new chat.");
        }
        "/sessions" => {
            let active = store.active_id();
            for (i, s) in store.sessions().iter().enumerate() {
                let marker = if s.id == active { "*" } else { " " };
                println!("{} {:>2}. {} ({})", marker, i + 1, s.title, s.language);
            }
        }
        "/open" | "/delete" => {
            let index: usize = match parts.next().and_then(|p| p.parse().ok()) {
                Some(n) => n,
                None => {
                    println!("Usage: {} <n>", command);
                    return Ok(false);
                }
            };
            let sessions = store.sessions();
            match sessions.get(index.wrapping_sub(1)) {
                Some(s) if command == "/open" => {
                    assistant.set_active(s.id)?;
                    println!("Switched to '{}'.", s.title);
                }
                Some(s) => {
                    assistant.delete_session(s.id)?;
                    println!("Deleted '{}'.", s.title);
                }
                None => println!("No session {}.", index),
            }
        }
        "/gallery" => {
            let gallery = assistant.gallery();
            if gallery.is_empty() {
                println!("No generated images yet.");
            }
            for (i, img) in gallery.iter().enumerate() {
                let preview: String = img.src.chars().take(48).collect();
                println!("{:>2}. {}... (session {})", i + 1, preview, img.session_id);
            }
        }
        "/animate" => {
            let index: usize = match parts.next().and_then(|p| p.parse().ok()) {
                Some(n) => n,
                None => {
                    println!("Usage: /animate <n> <prompt>");
                    return Ok(false);
                }
            };
            let prompt = parts.next().unwrap_or("bring this scene to life");
            match assistant.gallery().get(index.wrapping_sub(1)) {
                Some(img) => {
                    assistant
                        .animate_image(img.session_id, &img.src, prompt)
                        .await?;
                    println!("Video ready:");
                }
                None => println!("No gallery image {}.", index),
            }
        }
        "/tts" => match parts.next() {
            Some("on") => {
                assistant.set_tts_enabled(true)?;
                println!("Spoken replies on.");
            }
            Some("off") => {
                assistant.set_tts_enabled(false)?;
                println!("Spoken replies off.");
            }
            _ => println!(
                "Spoken replies are {}.",
                if assistant.tts_enabled()? { "on" } else { "off" }
            ),
        },
        "/cancel" => {
            assistant.cancel_pending_prompt();
            println!("Pending image prompt dropped.");
        }
        "/live" => run_live_demo(config, language).await?,
        other => println!("Unknown command {}. Try /help.", other),
    }
    Ok(false)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Tracing: CLI flag > RUST_LOG > config default.
    let config_file = args.resolve_config_path();
    let mut config = WayfarerConfig::load_or_default(&config_file);
    if let Some(dir) = args.resolve_data_dir() {
        config.general.data_dir = dir;
    }
    let log_level = args
        .resolve_log_level()
        .unwrap_or_else(|| config.general.log_level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    tracing::info!("Starting Wayfarer v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    let language = args
        .language
        .clone()
        .unwrap_or_else(|| config.general.default_language.clone());

    // Storage.
    let data_dir = resolve_data_dir(&config.general.data_dir);
    std::fs::create_dir_all(&data_dir)?;
    let db_path = data_dir.join("wayfarer.db");
    let kv = Arc::new(SqliteKv::open(&db_path)?);
    tracing::info!(path = %db_path.display(), "SQLite database opened");

    let store = Arc::new(SessionStore::init(kv, &language)?);

    // Backends and orchestration.
    let (chat_backend, media_backend) = mock_backends();
    let engine = Arc::new(ConversationEngine::new(
        chat_backend,
        Arc::clone(&store),
        config.chat.clone(),
    ));
    let media = Arc::new(MediaCoordinator::new(
        media_backend,
        Arc::clone(&store),
        config.media.clone(),
    ));
    let assistant = Assistant::new(engine, media, Arc::clone(&store));

    println!("Wayfarer travel companion. Type /help for commands.");
    let mut watermark = 0;
    watermark = print_new_messages(&store, watermark);

    // REPL.
    use tokio::io::{AsyncBufReadExt, BufReader};
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }
        if line.starts_with('/') {
            if handle_command(&line, &assistant, &store, &config, &language).await? {
                break;
            }
            watermark = print_new_messages(&store, watermark);
            continue;
        }

        if let Err(e) = assistant.submit(Submission::text(&line), None).await {
            tracing::error!(error = %e, "Submission failed");
        }
        watermark = print_new_messages(&store, watermark);
    }

    tracing::info!("Wayfarer shutting down");
    Ok(())
}
