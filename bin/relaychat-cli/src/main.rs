//! relaychat – terminal chat client.
//!
//! Startup order:
//! 1. Parse flags (with `RELAYCHAT_*` environment fallbacks).
//! 2. Initialise tracing to stderr so logs never interleave with replies.
//! 3. Open the local store and restore sessions and settings.
//! 4. Run the prompt loop until `/quit`, end of input, or Ctrl-C while idle.

mod cli;
mod render;

use std::io::Write;

use anyhow::Result;
use clap::Parser;
use relaychat_client::{ChatController, ChatStorage, SqliteStore, StreamConsumer, TurnOutcome};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::{Cli, Input};
use crate::render::DeltaPrinter;

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Flags ───────────────────────────────────────────────────────────────
    let cli = Cli::parse();

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    let env_filter = match cli.log.parse::<tracing_subscriber::EnvFilter>() {
        Ok(f) => f,
        Err(e) => {
            eprintln!("WARN: --log '{}' is not a valid tracing filter ({e}); falling back to 'warn'", cli.log);
            tracing_subscriber::EnvFilter::new("warn")
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    // ── 3. Store and controller ────────────────────────────────────────────────
    let store = SqliteStore::connect(&cli.database_url).await?;
    let consumer = StreamConsumer::new(cli.relay_url.clone());
    let mut chat = ChatController::open(ChatStorage::new(store), consumer).await?;
    info!(relay = %cli.relay_url, "relaychat ready");

    // Ctrl-C cancels a reply in progress; when nothing is running it quits.
    let slot = chat.request_slot();
    let quit = CancellationToken::new();
    {
        let quit = quit.clone();
        tokio::spawn(async move {
            loop {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!(error = %e, "failed to install CTRL+C signal handler");
                    return;
                }
                if !slot.cancel() {
                    quit.cancel();
                    return;
                }
            }
        });
    }

    // ── 4. Prompt loop ─────────────────────────────────────────────────────────
    let mut out = std::io::stdout();
    if let Some(session) = chat.current_session() {
        render::transcript(&mut out, session)?;
    }
    writeln!(out, "type /help for commands")?;

    let mut events = chat.subscribe();
    let mut printer = DeltaPrinter::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        write!(out, "> ")?;
        out.flush()?;

        let line = tokio::select! {
            _ = quit.cancelled() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        let input = match Input::parse(&line) {
            Ok(input) => input,
            Err(message) => {
                writeln!(out, "{message}")?;
                continue;
            }
        };

        match input {
            Input::Send(text) => {
                let turn = chat.send_message(&text);
                let outcome = stream_turn(turn, &mut events, &mut printer, &mut out).await?;
                report(&mut out, &outcome)?;
            }
            Input::Retry => {
                let Some(last) = chat
                    .current_session()
                    .and_then(|s| s.messages.last())
                    .map(|m| m.id.clone())
                else {
                    writeln!(out, "nothing to retry")?;
                    continue;
                };
                let turn = chat.retry_message(&last);
                match stream_turn(turn, &mut events, &mut printer, &mut out).await {
                    Ok(outcome) => report(&mut out, &outcome)?,
                    Err(e) => writeln!(out, "{e}")?,
                }
            }
            Input::New => {
                let id = chat.create_new_session().await?;
                writeln!(out, "started session {id}")?;
            }
            Input::List => render::session_list(&mut out, chat.sessions(), chat.current_session_id())?,
            Input::Switch(id) => match chat.switch_session(&id).await {
                Ok(()) => {
                    if let Some(session) = chat.current_session() {
                        render::transcript(&mut out, session)?;
                    }
                }
                Err(e) => writeln!(out, "{e}")?,
            },
            Input::Delete(id) => {
                if chat.delete_session(&id).await? {
                    writeln!(out, "deleted session {id}")?;
                } else {
                    writeln!(out, "no session {id}")?;
                }
            }
            Input::Model(model) => chat.update_settings(|s| s.model = model).await?,
            Input::System(prompt) => chat.update_settings(|s| s.system_prompt = prompt).await?,
            Input::Temperature(t) => chat.update_settings(|s| s.temperature = Some(t)).await?,
            Input::MaxTokens(n) => chat.update_settings(|s| s.max_tokens = Some(n)).await?,
            Input::Settings => render::settings(&mut out, chat.settings())?,
            Input::Clear => {
                chat.clear_all_data().await?;
                writeln!(out, "all sessions and settings deleted")?;
            }
            Input::Help => writeln!(out, "{}", cli::HELP)?,
            Input::Quit => break,
        }
    }

    info!("relaychat stopped");
    Ok(())
}

/// Drive `turn` to completion while printing the deltas it broadcasts.
async fn stream_turn<F>(
    turn: F,
    events: &mut broadcast::Receiver<relaychat_client::ChatEvent>,
    printer: &mut DeltaPrinter,
    out: &mut impl Write,
) -> Result<TurnOutcome>
where
    F: std::future::Future<Output = Result<TurnOutcome, relaychat_client::ClientError>>,
{
    tokio::pin!(turn);
    loop {
        tokio::select! {
            outcome = &mut turn => {
                while let Ok(event) = events.try_recv() {
                    printer.render(out, &event)?;
                }
                return Ok(outcome?);
            }
            event = events.recv() => match event {
                Ok(event) => printer.render(out, &event)?,
                Err(broadcast::error::RecvError::Lagged(n)) => warn!(skipped = n, "renderer fell behind"),
                Err(broadcast::error::RecvError::Closed) => {}
            },
        }
    }
}

fn report(out: &mut impl Write, outcome: &TurnOutcome) -> std::io::Result<()> {
    match outcome {
        TurnOutcome::Cancelled { .. } => writeln!(out, "(reply cancelled)"),
        TurnOutcome::Skipped => writeln!(out, "(a reply is already in progress)"),
        TurnOutcome::Completed { .. } | TurnOutcome::Failed { .. } => Ok(()),
    }
}
