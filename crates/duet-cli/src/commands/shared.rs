use super::{App, print_message};
use anyhow::Result;
use duet_application::{CachePolicy, SharedTranscriptFetcher};
use duet_core::shared::{parse_share_link, share_link};
use duet_infrastructure::RestRemoteStore;
use std::sync::Arc;

/// Prints a shared transcript up to the requested position.
pub async fn view(app: &App, link: &str, at: Option<String>, next: bool) -> Result<()> {
    let (share_id, linked_message) = match parse_share_link(link) {
        Some(parsed) => parsed,
        None => (link.to_string(), None),
    };
    let mut position = at.or(linked_message);

    let source = Arc::new(RestRemoteStore::from_settings(
        &app.config.remote,
        app.config.generation.request_timeout(),
    )?);
    let fetcher = SharedTranscriptFetcher::new(source, CachePolicy::from_settings(&app.config.sync));
    let transcript = fetcher.fetch(&share_id).await?;

    if next {
        let current = position
            .clone()
            .or_else(|| transcript.messages.first().map(|m| m.id.clone()));
        if let Some(current) = current {
            match transcript.next_message_after(&current) {
                Some(message) => position = Some(message.id.clone()),
                None => println!("(already at the last message)"),
            }
        }
    }

    println!("# {}", transcript.topic);
    let visible = transcript.visible_until(position.as_deref());
    for message in visible {
        print_message(message);
    }

    if let Some(last) = visible.last() {
        let base = &app.config.remote.share_base_url;
        println!();
        println!("link: {}", share_link(base, &share_id, Some(&last.id)));
        if let Some(next) = transcript.next_message_after(&last.id) {
            println!("next: {}", share_link(base, &share_id, Some(&next.id)));
        }
    }
    Ok(())
}

pub fn print_link(app: &App, share_id: &str, message_id: Option<&str>) {
    println!("{}", share_link(&app.config.remote.share_base_url, share_id, message_id));
}
