use anyhow::Result;
use async_trait::async_trait;
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use teloxide::prelude::*;
use tour_sales_bot::catalog::Catalog;
use tour_sales_bot::completion::CompletionClient;
use tour_sales_bot::format::CHEAPEST_HEADING;
use tour_sales_bot::handlers::{handle_callback_query, handle_message, TourAssistant};
use tour_sales_bot::leads::SqliteLeadStore;

const TOURS_JSON: &str = r#"[
    {"destination": "Istanbul", "price": 1000, "duration": "4 شب",
     "satisfaction": 4, "details": "هتل ۳ ستاره"},
    {"destination": "Dubai", "price": 500, "duration": "5 شب",
     "satisfaction": 5, "details": "هتل ۵ ستاره"}
]"#;

/// Stand-in for the Bot API: delivers messages, but rejects chat actions as
/// rate limited and callback answers as expired
#[derive(Default)]
struct FakeTelegram {
    methods: Mutex<Vec<String>>,
    sent: Mutex<Vec<String>>,
}

impl FakeTelegram {
    fn methods(&self) -> Vec<String> {
        self.methods.lock().unwrap().clone()
    }

    fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

async fn bot_api(
    State(api): State<Arc<FakeTelegram>>,
    uri: Uri,
    body: String,
) -> (StatusCode, Json<Value>) {
    let method = uri
        .path()
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    api.methods.lock().unwrap().push(method.clone());

    match method.as_str() {
        "sendmessage" => {
            let params: Value = serde_json::from_str(&body).unwrap_or_default();
            let text = params["text"].as_str().unwrap_or_default().to_string();
            api.sent.lock().unwrap().push(text.clone());
            (
                StatusCode::OK,
                Json(json!({"ok": true, "result": message_json(&text)})),
            )
        }
        "sendchataction" => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "ok": false,
                "error_code": 429,
                "description": "Too Many Requests: retry after 5",
                "parameters": {"retry_after": 5}
            })),
        ),
        "answercallbackquery" => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "ok": false,
                "error_code": 400,
                "description": "Bad Request: query is too old and response timeout expired or query ID is invalid"
            })),
        ),
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({"ok": false, "error_code": 404, "description": "Not Found"})),
        ),
    }
}

fn user_json() -> Value {
    json!({"id": 42, "is_bot": false, "first_name": "Sara", "username": "sara"})
}

fn message_json(text: &str) -> Value {
    json!({
        "message_id": 1,
        "date": 1_700_000_000,
        "chat": {"id": 42, "type": "private", "first_name": "Sara", "username": "sara"},
        "from": user_json(),
        "text": text
    })
}

fn incoming_message(text: &str) -> Message {
    serde_json::from_value(message_json(text)).unwrap()
}

fn incoming_button_press(data: &str) -> CallbackQuery {
    serde_json::from_value(json!({
        "id": "4382bfdwdsb323b2d9",
        "from": user_json(),
        "message": message_json("menu"),
        "chat_instance": "-8164383934418727826",
        "data": data
    }))
    .unwrap()
}

/// Serve the fake Bot API on a free local port and point a bot at it
async fn fake_telegram() -> (Bot, Arc<FakeTelegram>) {
    let api = Arc::new(FakeTelegram::default());
    let app = Router::new().fallback(bot_api).with_state(api.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let url = reqwest::Url::parse(&format!("http://{}", addr)).unwrap();
    (Bot::new("123456:TEST").set_api_url(url), api)
}

struct CountingCompletion {
    calls: AtomicUsize,
}

#[async_trait]
impl CompletionClient for CountingCompletion {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("برای پاریس فعلاً تور نداریم".to_string())
    }
}

async fn lead_count(store: &SqliteLeadStore) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM leads")
        .fetch_one(store.pool())
        .await
        .unwrap()
}

async fn assistant_with_model() -> (Arc<TourAssistant>, Arc<SqliteLeadStore>, Arc<CountingCompletion>) {
    let leads = SqliteLeadStore::connect("sqlite::memory:").await.unwrap();
    leads.initialize().await.unwrap();
    let leads = Arc::new(leads);
    let completion = Arc::new(CountingCompletion {
        calls: AtomicUsize::new(0),
    });

    let assistant = TourAssistant::new(
        Arc::new(Catalog::from_json(TOURS_JSON).unwrap()),
        leads.clone(),
        Some(completion.clone()),
    );

    (Arc::new(assistant), leads, completion)
}

#[tokio::test]
async fn rate_limited_typing_action_still_records_and_replies() {
    let (bot, api) = fake_telegram().await;
    let (assistant, leads, completion) = assistant_with_model().await;

    handle_message(bot, incoming_message("paris"), assistant)
        .await
        .unwrap();

    assert!(api.methods().contains(&"sendchataction".to_string()));
    assert_eq!(api.sent(), vec!["برای پاریس فعلاً تور نداریم".to_string()]);
    assert_eq!(completion.calls.load(Ordering::SeqCst), 1);
    assert_eq!(lead_count(&leads).await, 1);
}

#[tokio::test]
async fn catalog_match_skips_typing_action() {
    let (bot, api) = fake_telegram().await;
    let (assistant, leads, completion) = assistant_with_model().await;

    handle_message(bot, incoming_message("dubai"), assistant)
        .await
        .unwrap();

    assert_eq!(api.methods(), vec!["sendmessage".to_string()]);
    let sent = api.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("Dubai"));
    assert_eq!(completion.calls.load(Ordering::SeqCst), 0);
    assert_eq!(lead_count(&leads).await, 1);
}

#[tokio::test]
async fn expired_button_press_still_gets_its_reply() {
    let (bot, api) = fake_telegram().await;
    let (assistant, leads, _) = assistant_with_model().await;

    handle_callback_query(bot, incoming_button_press("cheap"), assistant)
        .await
        .unwrap();

    assert_eq!(
        api.methods(),
        vec!["answercallbackquery".to_string(), "sendmessage".to_string()]
    );
    let sent = api.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].starts_with(CHEAPEST_HEADING));
    assert_eq!(lead_count(&leads).await, 0);
}
