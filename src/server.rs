use axum::{
    Form, Json, Router,
    extract::{DefaultBodyLimit, Path, Request, State},
    http::{HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{
        Html, IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::get,
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::{Stream, StreamExt, wrappers::BroadcastStream};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::AppState;
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::store::WidgetStore;
use crate::widget::{
    ChatWidget, Entry, MESSAGE_FORM_ID, MESSAGE_INPUT_ID, MESSAGES_ID, Sender, Submission,
};

/// Name of the SSE event carrying one entry's markup.
pub const ENTRY_EVENT: &str = "entry";

const BODY_LIMIT: usize = 64 * 1024;

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let widgets = WidgetStore::new(config.widget.settings());
    widgets.spawn_sweeper(config.widget.sweep_interval(), config.widget.idle_timeout());

    info!(
        name: "widget.config.loaded",
        echo_delay_ms = config.widget.echo_delay_ms,
        escape_markup = config.widget.escape_markup,
        idle_timeout_secs = config.widget.idle_timeout_secs,
        "Widget configuration loaded"
    );

    let state = AppState {
        widgets,
        config: Arc::clone(&config),
    };
    let app = router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

/// Build the application router with all middleware applied.
pub fn router(state: AppState) -> Router {
    let timeout_duration = state.config.resilience.request_timeout();
    let cors = cors_layer(&state.config.server.cors_origins);

    let app = Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/api", get(api_info_handler))
        .route(
            "/api/widgets/{id}",
            axum::routing::delete(api_unmount_widget),
        )
        .route(
            "/api/widgets/{id}/messages",
            get(api_get_messages).post(api_submit_message),
        )
        .route("/api/widgets/{id}/events", get(api_widget_events))
        .nest_service("/static", ServeDir::new(&state.config.server.static_dir))
        .layer(DefaultBodyLimit::max(BODY_LIMIT));

    with_request_timeout(app, timeout_duration)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Answer `408` when a handler runs longer than `duration`.
fn with_request_timeout<S>(router: Router<S>, duration: Duration) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(axum::middleware::from_fn(
        move |req: Request, next: Next| async move {
            match tokio::time::timeout(duration, next.run(req)).await {
                Ok(res) => res,
                Err(_) => (StatusCode::REQUEST_TIMEOUT, "Request timed out").into_response(),
            }
        },
    ))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(name: "server.cors.invalid_origin", origin = %origin, error = %e, "Ignoring CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

fn lookup(state: &AppState, id: String) -> Result<ChatWidget, ApiError> {
    state.widgets.get(&id).ok_or(ApiError::WidgetNotFound(id))
}

// ─────────────────────────────────────────────────────────────────────────────
// HTML Page Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Generate the HTML shell for the application.
fn html_shell(title: &str, content: &str) -> String {
    format!(r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="description" content="Intellius Chat Service">
    <title>{title} - Intellius</title>

    <!-- HTMX and Extensions (local) -->
    <script src="/static/vendor/htmx-2.0.8.min.js"></script>
    <script src="/static/vendor/htmx-sse.js"></script>

    <link rel="stylesheet" href="/static/app.css">
</head>
<body>
    <main id="app" class="container">
        {content}
    </main>
</body>
</html>"#)
}

/// The message input, optionally as an out-of-band swap that resets it.
fn message_input(out_of_band: bool) -> String {
    let oob = if out_of_band { r#" hx-swap-oob="true""# } else { "" };
    format!(
        r#"<input id="{MESSAGE_INPUT_ID}" name="message" type="text" value="" autocomplete="off" placeholder="Type a message..."{oob}>"#
    )
}

/// Chat page content for a mounted widget.
fn chat_content(widget: &ChatWidget) -> String {
    let id = widget.id();
    let messages = widget.messages_html();
    let input = message_input(false);

    format!(
        r##"
    <div class="chat-shell">
        <header class="chat-header">
            <h2>Intellius Chat</h2>
        </header>

        <div id="{MESSAGES_ID}" class="messages"
             hx-ext="sse"
             sse-connect="/api/widgets/{id}/events"
             sse-swap="{ENTRY_EVENT}"
             hx-swap="beforeend scroll:bottom">{messages}</div>

        <form id="{MESSAGE_FORM_ID}" class="message-form"
              hx-post="/api/widgets/{id}/messages"
              hx-target="#{MESSAGES_ID}"
              hx-swap="beforeend scroll:bottom">
            {input}
            <button type="submit">Send</button>
        </form>

        <script>
            window.addEventListener("pagehide", () =>
                fetch("/api/widgets/{id}", {{ method: "DELETE", keepalive: true }}));
        </script>
    </div>
    "##
    )
}

/// GET / - Mount a widget and render the chat page.
async fn index_handler(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    let widget = state.widgets.mount()?;
    Ok(Html(html_shell("Chat", &chat_content(&widget))))
}

// ─────────────────────────────────────────────────────────────────────────────
// API Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Form body posted by `#messageForm`.
#[derive(Debug, Deserialize)]
struct MessageForm {
    #[serde(default)]
    message: String,
}

/// POST /api/widgets/:id/messages - Submit the draft.
///
/// Accepted submissions answer with the user entry plus an out-of-band empty
/// input; ignored ones answer `204` so the page is left untouched.
async fn api_submit_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<MessageForm>,
) -> Result<Response, ApiError> {
    let widget = lookup(&state, id)?;

    match widget.submit_draft(&form.message) {
        Submission::Accepted { entry } => {
            Ok(Html(format!("{}{}", entry.html, message_input(true))).into_response())
        }
        Submission::Ignored => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

/// GET /api/widgets/:id/messages - Transcript as JSON.
async fn api_get_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let widget = lookup(&state, id)?;
    Ok(Json(widget.transcript()))
}

/// GET /api/widgets/:id/events - Bot entries as they are appended.
///
/// User entries travel in the submit response, so only bot entries are
/// streamed here.
async fn api_widget_events(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>> + Send>, ApiError> {
    let widget = lookup(&state, id)?;
    let widget_id = widget.id().to_string();

    let stream = BroadcastStream::new(widget.subscribe()).filter_map(move |item| match item {
        Ok(entry) => entry_event(entry).map(Ok),
        Err(err) => {
            warn!(
                name: "widget.events.lagged",
                widget_id = %widget_id,
                error = %err,
                "SSE subscriber lagged; entries skipped"
            );
            None
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}

fn entry_event(entry: Entry) -> Option<Event> {
    (entry.message.sender == Sender::Bot)
        .then(|| Event::default().event(ENTRY_EVENT).data(entry.html))
}

/// DELETE /api/widgets/:id - Unmount a widget (page unload).
async fn api_unmount_widget(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    match state.widgets.remove(&id) {
        Some(_) => {
            info!(name: "widget.unmounted", widget_id = %id, "Chat widget unmounted");
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err(ApiError::WidgetNotFound(id)),
    }
}

/// GET /api - Service banner.
async fn api_info_handler() -> Json<Value> {
    Json(json!({
        "message": "Intellius Chat Service API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /health - Liveness probe.
async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResilienceConfig;
    use crate::widget::{Document, Message, WidgetSettings};

    #[test]
    fn test_message_input_oob() {
        assert!(!message_input(false).contains("hx-swap-oob"));
        let oob = message_input(true);
        assert!(oob.contains(r#"id="messageInput""#));
        assert!(oob.contains(r#"hx-swap-oob="true""#));
        assert!(oob.contains(r#"value="""#));
    }

    #[test]
    fn test_only_bot_entries_are_streamed() {
        let policy = WidgetSettings::default().markup;
        assert!(entry_event(Entry::render(Message::user("hi"), policy)).is_none());
        assert!(entry_event(Entry::render(Message::bot("yo"), policy)).is_some());
    }

    #[tokio::test]
    async fn test_chat_content_binds_widget() {
        let widget =
            ChatWidget::mount("w-1", Document::chat_page(), WidgetSettings::default()).unwrap();
        let html = chat_content(&widget);

        assert!(html.contains(r#"id="messages""#));
        assert!(html.contains(r#"id="messageForm""#));
        assert!(html.contains(r#"hx-post="/api/widgets/w-1/messages""#));
        assert!(html.contains(r##"hx-target="#messages""##));
        assert!(html.contains(r#"fetch("/api/widgets/w-1", { method: "DELETE", keepalive: true })"#));
        assert!(html.contains(r#"sse-connect="/api/widgets/w-1/events""#));
        assert!(html.contains(&widget.messages_html()));
    }

    fn slow_router() -> Router {
        Router::new().route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                "done"
            }),
        )
    }

    fn slow_request() -> axum::http::Request<axum::body::Body> {
        axum::http::Request::builder()
            .uri("/slow")
            .body(axum::body::Body::empty())
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_timeout_layer() {
        use tower::ServiceExt;

        let mut resilience = ResilienceConfig {
            timeout_disabled: false,
            request_timeout_secs: 30,
        };
        let app = with_request_timeout(slow_router(), resilience.request_timeout());
        let resp = app.oneshot(slow_request()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::REQUEST_TIMEOUT);

        resilience.timeout_disabled = true;
        let app = with_request_timeout(slow_router(), resilience.request_timeout());
        let resp = app.oneshot(slow_request()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
