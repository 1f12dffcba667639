//! Interactive chat REPL
//!
//! One turn at a time: the prompt returns, the turn streams to stdout,
//! then the next line is read. Slash commands manage sessions in place.
//! A session is created on the first submission or an explicit /new.

use anyhow::Result;
use console::style;
use dialoguer::Input;
use parlor_chat::{ChatEvent, ChatLoop, ChatOptions};
use parlor_core::session::{ChatSession, HistoryStore, Role};
use parlor_ollama::TokenSource;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

enum Turn {
    Submit(String),
    Edit { index: usize, content: String },
}

/// Run the interactive chat loop until /quit or end of input
pub async fn run_chat(
    source: Arc<dyn TokenSource>,
    store: HistoryStore,
    options: ChatOptions,
    model: String,
    resume: Option<String>,
) -> Result<()> {
    let mut chat = ChatLoop::new(source, store, options);

    let mut session: Option<ChatSession> = match resume {
        Some(id) => match chat.store().list().into_iter().find(|s| s.id == id) {
            Some(session) => Some(session),
            None => {
                println!("{} session {} not found", style("✗").red(), id);
                return Ok(());
            }
        },
        None => None,
    };

    println!("{}", style("parlor").bold().cyan());
    match &session {
        Some(session) => println!("Model: {}  Session: {}", session.model, session.id),
        None => println!("Model: {}", model),
    }
    println!(
        "{}",
        style("Enter to send. /new /sessions /switch <id> /edit <index> <text> /rename <title> /quit")
            .dim()
    );
    println!();
    if let Some(session) = &session {
        replay(session);
    }

    loop {
        let line: String = match Input::new()
            .with_prompt("you")
            .allow_empty(true)
            .interact_text()
        {
            Ok(line) => line,
            // End of input reads as a quit
            Err(_) => break,
        };
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix('/') {
            let mut parts = rest.splitn(2, ' ');
            let command = parts.next().unwrap_or("");
            let arg = parts.next().unwrap_or("").trim().to_string();

            match command {
                "quit" | "q" => break,
                "new" => {
                    let created = chat.store().create(&model);
                    println!("{}", style(format!("new session: {}", created.id)).dim());
                    session = Some(created);
                }
                "sessions" => {
                    let sessions = chat.store().list();
                    if sessions.is_empty() {
                        println!("{}", style("no stored sessions").dim());
                    }
                    let current_id = session.as_ref().map(|s| s.id.clone());
                    for s in sessions {
                        let marker = if Some(&s.id) == current_id.as_ref() {
                            "*"
                        } else {
                            " "
                        };
                        println!(
                            "{} {} ({}, {} messages)",
                            marker,
                            style(&s.title).bold(),
                            s.id,
                            s.messages.len()
                        );
                    }
                }
                "switch" => match chat.store().list().into_iter().find(|s| s.id == arg) {
                    Some(found) => {
                        println!("{}", style(format!("switched to: {}", found.title)).dim());
                        replay(&found);
                        session = Some(found);
                    }
                    None => println!("{} session {} not found", style("✗").red(), arg),
                },
                "rename" => match (&mut session, arg.is_empty()) {
                    (_, true) => println!("usage: /rename <title>"),
                    (None, _) => println!("{}", style("no active session yet").dim()),
                    (Some(session), _) => {
                        session.title = arg.clone();
                        chat.store().rename(&session.id, &arg);
                        println!("{}", style(format!("renamed to: {}", arg)).dim());
                    }
                },
                "edit" => {
                    let mut pieces = arg.splitn(2, ' ');
                    let index = pieces.next().and_then(|i| i.parse::<usize>().ok());
                    let content = pieces.next().map(|c| c.trim().to_string());
                    match (&mut session, index, content) {
                        (Some(session), Some(index), Some(content)) if !content.is_empty() => {
                            if index >= session.messages.len() {
                                println!("{} no message at index {}", style("✗").red(), index);
                            } else {
                                run_turn(&mut chat, session, Turn::Edit { index, content }).await;
                            }
                        }
                        (None, Some(_), Some(_)) => {
                            println!("{}", style("no active session yet").dim())
                        }
                        _ => println!("usage: /edit <index> <new text>"),
                    }
                }
                _ => println!("unknown command: /{}", command),
            }
            continue;
        }

        let active = session.get_or_insert_with(|| chat.store().create(&model));
        run_turn(&mut chat, active, Turn::Submit(line)).await;
    }

    Ok(())
}

/// Drive one turn, printing streamed output as it arrives.
///
/// The printer task drains the event channel; dropping the sender after
/// the turn ends closes the channel, so awaiting the printer guarantees
/// everything was flushed before the next prompt.
async fn run_turn(chat: &mut ChatLoop, session: &mut ChatSession, turn: Turn) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        use std::io::Write;
        let mut started = false;
        let mut stdout = std::io::stdout();
        while let Some(event) = rx.recv().await {
            match event {
                ChatEvent::AssistantDelta { text } => {
                    if !started {
                        started = true;
                        print!("{} ", style("assistant").green().bold());
                    }
                    print!("{}", text);
                    let _ = stdout.flush();
                }
                ChatEvent::Completed { .. } => {
                    println!();
                }
                ChatEvent::Error { message } => {
                    if started {
                        println!();
                    }
                    println!("{} {}", style("error:").red().bold(), message);
                }
            }
        }
    });

    let result = match turn {
        Turn::Submit(text) => chat.submit(session, text, &tx).await,
        Turn::Edit { index, content } => {
            chat.edit_and_regenerate(session, index, content, &tx).await
        }
    };
    drop(tx);
    let _ = printer.await;

    if let Err(e) = result {
        // already surfaced to the user through the error event
        debug!("turn failed: {}", e);
    }
}

/// Print a session transcript with editable indexes
fn replay(session: &ChatSession) {
    for (index, message) in session.messages.iter().enumerate() {
        let label = match message.role {
            Role::User => style("user").cyan().bold(),
            Role::Assistant => style("assistant").green().bold(),
        };
        println!(
            "{} {} {}",
            style(format!("[{}]", index)).dim(),
            label,
            message.content
        );
    }
    if !session.messages.is_empty() {
        println!();
    }
}
