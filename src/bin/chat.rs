//! character-chat interactive client.
//!
//! Chats with characters extracted from a book through the inference
//! service. The conversation survives restarts.
//!
//! # Environment Variables
//!
//! - `CHAT_API_BASE_URL`: inference service (default: http://127.0.0.1:5000)
//! - `CHAT_USER_ID`: user id sent with each turn (default: 1)
//! - `CHAT_STORE`: "file" (default), "sqlite" or "memory"
//! - `CHAT_STORE_PATH`: session file or database location
//! - `CHAT_STORAGE_DIR`: data directory override
//! - `RUST_LOG`: tracing filter (default: "info,character_chat=debug")
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin character-chat
//! ```

use std::path::Path;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};

use character_chat::cli::{parse_command, ReplCommand, HELP};
use character_chat::config::ClientConfig;
use character_chat::engine::ChatEngine;
use character_chat::error::ChatError;
use character_chat::reconcile::ReconcileOutcome;
use character_chat::transport::ExtractionSource;
use character_chat::utilities::printer::{character_lines, Printer, PrinterColor};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,character_chat=debug".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::from_env();
    tracing::info!(
        "character-chat {} using {} ({:?} store at {})",
        character_chat::VERSION,
        config.api_base_url,
        config.store,
        config.store_path.display()
    );

    let mut engine = ChatEngine::from_config(&config).context("failed to start the client")?;
    let printer = Printer::new();

    printer.print(
        &format!("Chatting with: {}", engine.selected_character_name()),
        PrinterColor::BoldWhite,
    );
    print_history(&engine, &printer);
    printer.print("Type /help for commands.", PrinterColor::White);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(usage) => {
                printer.print_error(&usage);
                continue;
            }
        };
        if command == ReplCommand::Quit {
            break;
        }
        if let Err(e) = run_command(&mut engine, &printer, command).await {
            printer.print_error(&format!("{:#}", e));
            if needs_selection(&e) {
                print_characters(&engine, &printer);
            }
        }
    }

    tracing::info!("bye");
    Ok(())
}

async fn run_command(
    engine: &mut ChatEngine,
    printer: &Printer,
    command: ReplCommand,
) -> anyhow::Result<()> {
    match command {
        ReplCommand::Say(text) => {
            let outcome = engine.send(&text).await?;
            let name = engine.selected_character_name();
            match outcome {
                ReconcileOutcome::Appended { sequence } => {
                    if let Some(reply) = engine.session().message_at(sequence) {
                        printer.print_message(reply, &name);
                    }
                }
                ReconcileOutcome::Replaced { .. } => print_history(engine, printer),
                ReconcileOutcome::AlreadyApplied => {}
            }
            if let Some(traits) = engine.insight().and_then(|i| i.traits.as_deref()) {
                printer.print(&format!("({})", traits), PrinterColor::Yellow);
            }
        }
        ReplCommand::Extract { path, title } => {
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            let file_name = file_name_of(&path);
            let source = ExtractionSource::pdf(file_name, bytes, title);
            let count = engine.extract_characters(&source).await?;
            printer.print(&format!("{} characters extracted", count), PrinterColor::Green);
            print_characters(engine, printer);
        }
        ReplCommand::ExtractText { title, text } => {
            let source = ExtractionSource::Text {
                text,
                book_title: title,
            };
            let count = engine.extract_characters(&source).await?;
            printer.print(&format!("{} characters extracted", count), PrinterColor::Green);
            print_characters(engine, printer);
        }
        ReplCommand::Characters => print_characters(engine, printer),
        ReplCommand::Select { id } => {
            engine.select_character(&id)?;
            printer.print(
                &format!("Chatting with: {}", engine.selected_character_name()),
                PrinterColor::BoldWhite,
            );
        }
        ReplCommand::Set { name, value } => {
            let applied = engine.set_parameter(name, value);
            printer.print(&format!("{} = {:.1}", name.label(), applied), PrinterColor::Blue);
        }
        ReplCommand::Params => {
            printer.print_parameters(&engine.session().parameters);
            if let Some(params) = engine.insight().and_then(|i| i.parameters) {
                printer.print("Last reply", PrinterColor::White);
                printer.print_parameters(&params);
            }
        }
        ReplCommand::Emotions => printer.print_emotions(&engine.current_emotion()),
        ReplCommand::History => print_history(engine, printer),
        ReplCommand::Help => printer.print(HELP, PrinterColor::White),
        ReplCommand::Quit => {}
    }
    Ok(())
}

fn print_history(engine: &ChatEngine, printer: &Printer) {
    let name = engine.selected_character_name();
    for message in &engine.session().messages {
        printer.print_message(message, &name);
    }
}

fn print_characters(engine: &ChatEngine, printer: &Printer) {
    let session = engine.session();
    if session.characters.is_empty() {
        printer.print("No characters yet, try /extract", PrinterColor::White);
        return;
    }
    for line in character_lines(&session.characters, session.selected_character_id.as_deref()) {
        printer.print(&line, PrinterColor::White);
    }
}

/// Whether the failed command should send the user to the character list.
fn needs_selection(error: &anyhow::Error) -> bool {
    matches!(
        error.downcast_ref::<ChatError>(),
        Some(ChatError::NoCharacterSelected)
    )
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
