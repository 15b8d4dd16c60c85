use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

pub const SEARCH_ERROR_PLACEHOLDER: &str = "No updated info available due to search API error.";
pub const NO_SNIPPET_PLACEHOLDER: &str = "No updated info available.";
pub const EXCEPTION_PLACEHOLDER: &str = "No updated info available due to an exception.";

#[derive(Deserialize)]
struct InstantAnswer {
    #[serde(rename = "AbstractText", default)]
    abstract_text: String,
}

/// Fetches a short grounding snippet from an instant-answer search API.
///
/// Best effort: every failure degrades to a placeholder sentence so the
/// analysis can still proceed.
pub async fn fetch_latest_info(
    client: &Client,
    search_api_url: &str,
    query: &str,
    timeout: Duration,
) -> String {
    let response = client
        .get(search_api_url)
        .query(&[
            ("q", query),
            ("format", "json"),
            ("no_html", "1"),
            ("skip_disambig", "1"),
        ])
        .timeout(timeout)
        .send()
        .await;

    let response = match response {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "search API request failed");
            return EXCEPTION_PLACEHOLDER.to_string();
        }
    };

    if !response.status().is_success() {
        tracing::error!(status = response.status().as_u16(), "search API error");
        return SEARCH_ERROR_PLACEHOLDER.to_string();
    }

    // The instant-answer API does not always label its JSON as such.
    let parsed = match response.text().await {
        Ok(body) => serde_json::from_str::<InstantAnswer>(&body).map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };

    match parsed {
        Ok(answer) if !answer.abstract_text.trim().is_empty() => {
            tracing::info!(snippet = %answer.abstract_text, "search snippet found");
            answer.abstract_text.trim().to_string()
        }
        Ok(_) => {
            tracing::info!("search returned no snippet");
            NO_SNIPPET_PLACEHOLDER.to_string()
        }
        Err(e) => {
            tracing::error!(error = %e, "could not decode search response");
            EXCEPTION_PLACEHOLDER.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TIMEOUT: Duration = Duration::from_secs(5);

    async fn search_returning(template: ResponseTemplate) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "vice president"))
            .and(query_param("no_html", "1"))
            .and(query_param("skip_disambig", "1"))
            .respond_with(template)
            .expect(1)
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn abstract_text_is_returned_trimmed() {
        let server = search_returning(ResponseTemplate::new(200).set_body_raw(
            r#"{"AbstractText": "  A short answer.  ", "Heading": "x"}"#,
            "application/x-javascript",
        ))
        .await;

        let info = fetch_latest_info(&Client::new(), &server.uri(), "vice president", TIMEOUT).await;
        assert_eq!(info, "A short answer.");
    }

    #[tokio::test]
    async fn empty_abstract_gives_no_snippet_placeholder() {
        let server = search_returning(
            ResponseTemplate::new(200).set_body_raw(r#"{"AbstractText": ""}"#, "application/json"),
        )
        .await;

        let info = fetch_latest_info(&Client::new(), &server.uri(), "vice president", TIMEOUT).await;
        assert_eq!(info, NO_SNIPPET_PLACEHOLDER);
    }

    #[tokio::test]
    async fn non_json_body_gives_exception_placeholder() {
        let server = search_returning(
            ResponseTemplate::new(200).set_body_raw("<html>captcha</html>", "text/html"),
        )
        .await;

        let info = fetch_latest_info(&Client::new(), &server.uri(), "vice president", TIMEOUT).await;
        assert_eq!(info, EXCEPTION_PLACEHOLDER);
    }

    #[tokio::test]
    async fn error_status_gives_search_error_placeholder() {
        let server = search_returning(ResponseTemplate::new(503)).await;

        let info = fetch_latest_info(&Client::new(), &server.uri(), "vice president", TIMEOUT).await;
        assert_eq!(info, SEARCH_ERROR_PLACEHOLDER);
    }

    #[tokio::test]
    async fn unreachable_search_gives_exception_placeholder() {
        let info = fetch_latest_info(
            &Client::new(),
            "http://127.0.0.1:1/",
            "vice president",
            TIMEOUT,
        )
        .await;
        assert_eq!(info, EXCEPTION_PLACEHOLDER);
    }
}
