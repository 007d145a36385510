//! Feed rendering and the Datastar event that carries it.

use std::fmt::Write;
use std::time::Duration;

use axum::response::sse::Event;
use chrono::{DateTime, Utc};

use crate::types::Message;

/// Id of the container every fragment replaces.
pub const FEED_CONTAINER_ID: &str = "messages";

const MERGE_FRAGMENTS_EVENT: &str = "datastar-merge-fragments";
const RETRY: Duration = Duration::from_millis(1000);

/// Opacity of a message `age` old: 1 when fresh, 0 at the TTL.
pub fn opacity(age: chrono::Duration, ttl: Duration) -> f64 {
    let ttl = ttl.as_secs_f64();
    if ttl <= 0.0 {
        return 0.0;
    }
    let age = age.num_milliseconds() as f64 / 1000.0;
    (1.0 - age / ttl).clamp(0.0, 1.0)
}

/// Render the full contents of the feed container.
///
/// Output depends only on `messages`, `now` and `ttl`: messages are ordered
/// by creation time, then id.
pub fn render_feed(messages: &[Message], now: DateTime<Utc>, ttl: Duration) -> String {
    let mut ordered: Vec<&Message> = messages.iter().collect();
    ordered.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

    let mut html = format!(r#"<div id="{FEED_CONTAINER_ID}">"#);
    for message in ordered {
        let _ = write!(
            html,
            r#"<div id="{id}" class="message" style="opacity:{opacity:.3};top:{y}%;left:{x}%;background:{colour};">{text}</div>"#,
            id = message.id,
            opacity = opacity(message.age(now), ttl),
            y = message.position.y,
            x = message.position.x,
            colour = message.colour,
            text = escape_html(&message.text),
        );
    }
    html.push_str("</div>");
    html
}

/// Wrap a fragment in a Datastar merge-fragments event.
pub fn merge_fragments_event(fragment: &str) -> Event {
    Event::default()
        .event(MERGE_FRAGMENTS_EVENT)
        .retry(RETRY)
        .data(merge_fragments_data(fragment))
}

/// Every line of the fragment goes out as its own `fragments` data line.
fn merge_fragments_data(fragment: &str) -> String {
    fragment
        .lines()
        .map(|line| format!("fragments {}", line.replace('\r', "")))
        .collect::<Vec<_>>()
        .join("\n")
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            _ => out.push(c),
        }
    }
    out
}
