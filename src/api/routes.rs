use axum::{
    Router,
    extract::{Json, State, rejection::JsonRejection},
    http::{Method, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;
use crate::api::models::{AnalysisResult, AnalyzeRequest};
use crate::api::response;
use crate::error::{AppError, Result};
use crate::grounding::fetch_latest_info;
use crate::llm::{build_messages, call_openrouter};
use crate::scraper::{extract_visible_text, fetch_html, truncate_content};

pub fn create_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(app_state.config.allowed_origin.clone())
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(root_handler))
        .route("/analyze", post(analyze_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn root_handler() -> impl IntoResponse {
    response::liveness()
}

async fn analyze_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Response {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            tracing::error!(error = %rejection.body_text(), "rejected analysis request body");
            return AppError::InvalidInput(rejection.body_text()).into_response();
        }
    };

    tracing::info!("received analysis request");
    let start_time = std::time::Instant::now();

    let result = tokio::time::timeout(
        state.config.request_timeout,
        process_analyze_request(&state, &req),
    )
    .await;

    let elapsed = start_time.elapsed();
    tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "request processing finished");

    match result {
        Ok(Ok(analysis)) => {
            tracing::info!(paragraphs = analysis.analysis.len(), "analysis completed successfully");
            response::success(analysis).into_response()
        }
        Ok(Err(err)) => {
            tracing::error!(status = err.status_code().as_u16(), error = %err, "analysis failed");
            err.into_response()
        }
        Err(_) => {
            tracing::error!(elapsed_ms = elapsed.as_millis() as u64, "request timed out");
            AppError::RequestTimeout.into_response()
        }
    }
}

pub async fn process_analyze_request(state: &AppState, req: &AnalyzeRequest) -> Result<AnalysisResult> {
    let input_text = resolve_input(state, req).await?;

    if input_text.trim().is_empty() {
        return Err(AppError::NoContent);
    }

    let latest_info = match &state.config.grounding_query {
        Some(query) => Some(
            fetch_latest_info(
                &state.http,
                &state.config.search_api_url,
                query,
                state.config.fetch_timeout,
            )
            .await,
        ),
        None => None,
    };

    let messages = build_messages(&input_text, latest_info.as_deref());
    let reply = call_openrouter(&state.http, &state.config, &messages).await?;

    Ok(AnalysisResult::from_reply(&reply))
}

/// Direct text wins; otherwise the URL is fetched and reduced to visible text.
async fn resolve_input(state: &AppState, req: &AnalyzeRequest) -> Result<String> {
    if let Some(text) = req.direct_text() {
        return Ok(text.to_string());
    }

    let Some(url) = req.target_url() else {
        return Err(AppError::InvalidInput(
            "Please provide either a URL or text to analyze.".to_string(),
        ));
    };

    tracing::info!(%url, "fetching content from URL");
    let html = fetch_html(
        &state.http,
        url,
        state.config.fetch_timeout,
        state.config.max_page_bytes,
    )
    .await?;

    let text = extract_visible_text(&html);
    let chars = text.chars().count();
    tracing::info!(%url, chars, "extracted text from webpage");

    if chars > state.config.max_content_chars {
        tracing::warn!(chars, max = state.config.max_content_chars, "truncating scraped content");
    }
    Ok(truncate_content(text, state.config.max_content_chars))
}
