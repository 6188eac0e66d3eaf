use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use intellibuddy_core::constants::storage_keys;
use intellibuddy_core::session::{Message, ReactionKind, Sender};
use intellibuddy_core::{Coordinator, HttpRelay, Settings, Storage};

pub async fn run(settings: Settings, language: Option<String>, ephemeral: bool) -> Result<()> {
    let relay = Arc::new(HttpRelay::with_timeout(
        settings.relay.base_url.clone(),
        settings.relay.timeout_secs,
    ));

    let coordinator = if ephemeral {
        Coordinator::with_settings(relay, settings)
    } else {
        match Storage::new() {
            Ok(storage) => Coordinator::with_storage(relay, settings, storage),
            Err(e) => {
                tracing::warn!("durable storage unavailable, running in memory: {}", e);
                Coordinator::with_settings(relay, settings)
            }
        }
    };

    if let Some(ref language) = language {
        coordinator.switch_language(language).await;
    }

    let messages = coordinator.bootstrap().await;
    render_new(&[], &messages);
    println!("(commands: /lang <code>, /react <emoji-name>, /clear, /offline, /online, /quit)");

    let mut seen = messages;
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    while let Some(line) = lines.next_line().await? {
        let input = line.trim().to_string();
        if input.is_empty() {
            continue;
        }

        let updated = match input.as_str() {
            "/quit" | "/exit" => break,
            "/clear" => coordinator.clear_chat().await,
            "/offline" => {
                coordinator.set_online(false).await;
                println!("[connectivity: offline]");
                continue;
            }
            "/online" => {
                coordinator.set_online(true).await;
                if coordinator.take_reconnected_notice().await {
                    println!("[connected to internet]");
                }
                continue;
            }
            _ if input.starts_with("/lang ") => {
                let code = input.trim_start_matches("/lang ").trim();
                coordinator.switch_language(code).await
            }
            _ if input.starts_with("/theme ") => {
                set_theme(input.trim_start_matches("/theme ").trim());
                continue;
            }
            _ if input.starts_with("/react ") => {
                let kind = input.trim_start_matches("/react ").trim();
                match parse_reaction(kind) {
                    Some(kind) => react_to_last_bot_message(&coordinator, kind).await,
                    None => {
                        println!("[unknown reaction: {kind}]");
                        continue;
                    }
                }
            }
            // A bare number picks the matching quick reply on the last bot
            // message.
            _ if input.parse::<usize>().is_ok() => {
                let index = input.parse::<usize>().unwrap_or(0);
                match quick_reply_trigger(&seen, index) {
                    Some(trigger) => coordinator.handle_quick_reply(&trigger).await,
                    None => {
                        println!("[no such quick reply]");
                        continue;
                    }
                }
            }
            _ => coordinator.handle_user_message(&input).await,
        };

        render_new(&seen, &updated);
        if let Some(notice) = coordinator.rate_limit_notice().await {
            println!(
                "[{} ({}s left)]",
                notice.message,
                notice.seconds_left()
            );
        }
        seen = updated;
    }

    Ok(())
}

/// Print only the messages appended (or changed) since the last snapshot.
fn render_new(seen: &[Message], updated: &[Message]) {
    let seen_ids: Vec<&str> = seen.iter().map(|m| m.id.as_str()).collect();
    for message in updated {
        if seen_ids.contains(&message.id.as_str()) {
            continue;
        }
        let speaker = match message.sender {
            Sender::User => "you",
            Sender::Bot => "intellibuddy",
        };
        println!("{speaker}> {}", message.text);
        for (i, reply) in message.quick_replies.iter().enumerate() {
            println!("    [{}] {}", i + 1, reply.label);
        }
    }
}

fn quick_reply_trigger(messages: &[Message], index: usize) -> Option<String> {
    let last_bot = messages.iter().rev().find(|m| m.sender == Sender::Bot)?;
    last_bot
        .quick_replies
        .get(index.checked_sub(1)?)
        .map(|r| r.trigger_text.clone())
}

async fn react_to_last_bot_message(coordinator: &Coordinator, kind: ReactionKind) -> Vec<Message> {
    let messages = coordinator.messages().await;
    match messages
        .iter()
        .rev()
        .find(|m| m.sender == Sender::Bot && !m.is_reaction_ack)
    {
        Some(target) => coordinator.toggle_reaction(&target.id, kind).await,
        None => messages,
    }
}

fn parse_reaction(name: &str) -> Option<ReactionKind> {
    match name.to_lowercase().as_str() {
        "heart" => Some(ReactionKind::Heart),
        "laugh" => Some(ReactionKind::Laugh),
        "wow" => Some(ReactionKind::Wow),
        "smile" => Some(ReactionKind::Smile),
        "sad" => Some(ReactionKind::Sad),
        "angry" => Some(ReactionKind::Angry),
        _ => None,
    }
}

/// The theme flag is presentation state; the engine only stores it.
fn set_theme(theme: &str) {
    match Storage::new() {
        Ok(storage) => {
            if storage.set(storage_keys::THEME, &theme).is_ok() {
                println!("[theme set to {theme}]");
            }
        }
        Err(e) => tracing::warn!("could not persist theme: {}", e),
    }
}
