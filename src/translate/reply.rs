//! Reply rendering
//!
//! Converts a backend [`Reply`] into the assistant message text returned to
//! clients. Images are appended as markdown image links, an extension to the
//! plain OpenAI message shape.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::gemini::Reply;

static GOOGLE_SEARCH_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(\()?\[`([^`]+?)`\]\((https://www\.google\.com/search\?q=)((?:\\.|[^\\)])*)\)\)*(\))?",
    )
    .expect("valid regex")
});
static WRAPPED_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`(\[[^\]]+\]\([^\)]+\))`").expect("valid regex"));
static HOST_PORT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([^:]+:\d+)").expect("valid regex"));

/// Undo the HTML and markdown escaping the web client applies
pub fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("\\<", "<")
        .replace("\\_", "_")
        .replace("\\>", ">")
}

/// Rewrite Google-search-wrapped links and unwrap code-quoted links
pub fn correct_markdown(text: &str) -> String {
    let fixed = GOOGLE_SEARCH_LINK_RE.replace_all(text, |caps: &Captures| {
        let display = &caps[2];
        let target = HOST_PORT_RE
            .captures(display)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
            .unwrap_or(display);
        let link = format!("[`{}`]({})", display, target);
        match caps.get(1) {
            Some(open) => format!("{}{})", open.as_str(), link),
            None => link,
        }
    });

    WRAPPED_LINK_RE.replace_all(&fixed, "$1").into_owned()
}

/// Final assistant content for a reply
pub fn render_reply(reply: &Reply) -> String {
    let mut text = String::new();
    if let Some(thoughts) = &reply.thoughts {
        text.push_str(&format!("<think>{}</think>", thoughts));
    }
    text.push_str(&reply.text);

    let mut content = correct_markdown(&unescape(&text));

    for image in &reply.images {
        let fallback = if image.generated {
            "generated image"
        } else {
            "image"
        };
        let title = image
            .title
            .as_deref()
            .or(image.alt.as_deref())
            .unwrap_or(fallback);
        if !content.is_empty() {
            content.push_str("\n\n");
        }
        content.push_str(&format!("![{}]({})", title, image.url));
    }

    content
}
