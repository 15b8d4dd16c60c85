use std::time::Duration;

use axum::http::StatusCode;
use reqwest::Client;
use scraper::Html;

use crate::error::{AppError, Result};

/// Appended when scraped text exceeds the configured cap.
pub const TRUNCATION_MARKER: &str = "\n\n[Content truncated]";

/// Elements whose text is never visible to a reader.
const HIDDEN_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Fetches a page, reading at most `max_bytes` of its body.
pub async fn fetch_html(
    client: &Client,
    url: &str,
    timeout: Duration,
    max_bytes: usize,
) -> Result<String> {
    let mut response = client.get(url).timeout(timeout).send().await?;

    if !response.status().is_success() {
        tracing::error!(%url, status = response.status().as_u16(), "failed to fetch website content");
        return Err(AppError::FetchError {
            status: StatusCode::BAD_REQUEST,
            message: "Could not fetch website content.".to_string(),
        });
    }

    if let Some(len) = response.content_length() {
        if len > max_bytes as u64 {
            tracing::warn!(%url, content_length = len, max_bytes, "page exceeds size cap, reading a prefix");
        }
    }

    let mut body: Vec<u8> = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let remaining = max_bytes - body.len();
        if chunk.len() >= remaining {
            body.extend_from_slice(&chunk[..remaining]);
            break;
        }
        body.extend_from_slice(&chunk);
    }

    Ok(String::from_utf8_lossy(&body).into_owned())
}

/// Visible text of a document: every text node outside script/style
/// markup, trimmed, empties dropped, newline-joined.
pub fn extract_visible_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let mut lines = Vec::new();
    for node in document.tree.root().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| HIDDEN_ELEMENTS.contains(&el.name()))
        });
        if hidden {
            continue;
        }
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            lines.push(trimmed);
        }
    }

    lines.join("\n")
}

/// Caps `text` at `max_chars` characters, appending [`TRUNCATION_MARKER`] when cut.
pub fn truncate_content(text: String, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text,
        Some((byte_idx, _)) => {
            let mut truncated = String::with_capacity(byte_idx + TRUNCATION_MARKER.len());
            truncated.push_str(&text[..byte_idx]);
            truncated.push_str(TRUNCATION_MARKER);
            truncated
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_and_style_contents_are_dropped() {
        let html = r#"
            <html>
              <head>
                <title>Daily News</title>
                <style>body { color: red; }</style>
                <script>var tracking = "secret";</script>
              </head>
              <body>
                <h1>Headline</h1>
                <p>First   paragraph.</p>
                <script type="text/javascript">alert("hidden");</script>
                <noscript>Enable JavaScript</noscript>
                <div><span>Nested</span> text</div>
              </body>
            </html>
        "#;

        let text = extract_visible_text(html);

        assert_eq!(text, "Daily News\nHeadline\nFirst   paragraph.\nNested\ntext");
        assert!(!text.contains("secret"));
        assert!(!text.contains("alert"));
        assert!(!text.contains("color"));
    }

    #[test]
    fn empty_document_yields_empty_text() {
        assert_eq!(extract_visible_text(""), "");
        assert_eq!(extract_visible_text("<html><body>  \n </body></html>"), "");
        assert_eq!(extract_visible_text("<script>only()</script>"), "");
    }

    #[test]
    fn short_text_is_not_truncated() {
        assert_eq!(truncate_content("hello".to_string(), 5), "hello");
        assert_eq!(truncate_content("hello".to_string(), 50), "hello");
    }

    #[test]
    fn long_text_is_cut_on_char_boundary() {
        let text = "héllo wörld".to_string();
        let truncated = truncate_content(text, 4);
        assert_eq!(truncated, format!("héll{}", TRUNCATION_MARKER));
    }
}
