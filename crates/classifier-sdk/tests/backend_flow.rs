use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use classifier_sdk::{
    ApiError, ClassifierApi, ClassifierClient, ClientConfig, Connectivity, ConnectivityView,
    Feedback, HistorySource, HistoryView, InputSurface, MessageKind, PageState, PredictionId,
    PredictionRecord, PredictionView, RequestExecutor, RetryPolicy, UserMessage, Views,
    WordCount, Workbench,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use url::Url;

#[derive(Default)]
struct Backend {
    predict_hits: AtomicUsize,
    failures_left: AtomicUsize,
    reject_predict: AtomicBool,
    legacy_history: AtomicBool,
    feedback: Mutex<Vec<(u64, bool)>>,
    rows: Mutex<Vec<Value>>,
}

async fn predict(State(backend): State<Arc<Backend>>, Json(body): Json<Value>) -> Response {
    backend.predict_hits.fetch_add(1, Ordering::SeqCst);
    let failing = backend
        .failures_left
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
        .is_ok();
    if failing {
        return (StatusCode::INTERNAL_SERVER_ERROR, "model crashed").into_response();
    }
    if backend.reject_predict.load(Ordering::SeqCst) {
        let detail = json!({
            "detail": {
                "error": "Text is too short",
                "suggestion": "Add a few more words"
            }
        });
        return (StatusCode::BAD_REQUEST, Json(detail)).into_response();
    }
    let row = json!({
        "id": 42,
        "text_input": body["text_input"],
        "label_classified": "LABEL_0",
        "accuracy": 91.2,
        "created_at": "2024-05-01T10:00:00.123456",
        "feedback": null
    });
    backend.rows.lock().insert(0, row.clone());
    Json(row).into_response()
}

async fn segment(Json(body): Json<Value>) -> Json<Value> {
    let text = body["text_input"].as_str().unwrap_or_default().to_string();
    Json(json!({
        "original_text": text,
        "cleaned_text": text,
        "khmer_words": ["ប្រាក់", "ដុល្លារ", "ឡើងថ្លៃ"],
        "khmer_word_count": 3,
        "truncated": false
    }))
}

async fn feedback(
    State(backend): State<Arc<Backend>>,
    Path(id): Path<u64>,
    Json(body): Json<Value>,
) -> Response {
    let Some(liked) = body["feedback"].as_bool() else {
        return (StatusCode::UNPROCESSABLE_ENTITY, "missing feedback").into_response();
    };
    backend.feedback.lock().push((id, liked));
    for row in backend.rows.lock().iter_mut() {
        if row["id"] == json!(id) {
            row["feedback"] = json!(liked);
        }
    }
    Json(json!({ "message": "Feedback updated successfully" })).into_response()
}

async fn history(
    State(backend): State<Arc<Backend>>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let rows = backend.rows.lock().clone();
    if backend.legacy_history.load(Ordering::SeqCst) {
        return Json(Value::Array(rows));
    }
    let page: usize = params
        .get("page")
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(1);
    let limit: usize = params
        .get("limit")
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(10);
    let total_pages = rows.len().div_ceil(limit);
    let predictions: Vec<Value> = rows.into_iter().skip((page - 1) * limit).take(limit).collect();
    Json(json!({
        "predictions": predictions,
        "total_pages": total_pages,
        "current_page": page
    }))
}

async fn spawn_backend(backend: Arc<Backend>) -> SocketAddr {
    let router = Router::new()
        .route("/api/v1/predict", post(predict))
        .route("/api/v1/segment", post(segment))
        .route("/api/v1/predictions", get(history))
        .route("/api/v1/predictions/:id/feedback", post(feedback))
        .with_state(backend);
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock backend");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });
    addr
}

fn client_for(addr: SocketAddr) -> ClassifierClient {
    ClassifierClient::new(
        Url::parse(&format!("http://{addr}/api/v1")).expect("base url"),
        RequestExecutor::new(RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(10),
            attempt_timeout: Duration::from_secs(2),
        }),
    )
}

#[tokio::test]
async fn server_errors_are_retried_until_success() {
    let backend = Arc::new(Backend::default());
    backend.failures_left.store(2, Ordering::SeqCst);
    let addr = spawn_backend(backend.clone()).await;
    let client = client_for(addr);

    let record = client.predict("ប្រាក់ដុល្លារឡើងថ្លៃ").await.expect("predict");

    assert_eq!(backend.predict_hits.load(Ordering::SeqCst), 3);
    assert_eq!(record.id, PredictionId::from(42));
    assert_eq!(record.input_text, "ប្រាក់ដុល្លារឡើងថ្លៃ");
}

#[tokio::test]
async fn exhausted_budget_reports_last_server_error() {
    let backend = Arc::new(Backend::default());
    backend.failures_left.store(5, Ordering::SeqCst);
    let addr = spawn_backend(backend.clone()).await;
    let client = client_for(addr);

    let err = client.predict("text").await.expect_err("should fail");

    assert_eq!(backend.predict_hits.load(Ordering::SeqCst), 3);
    match &err {
        ApiError::RetriesExhausted { attempts, last } => {
            assert_eq!(*attempts, 3);
            assert!(matches!(**last, ApiError::ServerError { .. }));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.user_message().kind, MessageKind::TryAgain);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let backend = Arc::new(Backend::default());
    backend.reject_predict.store(true, Ordering::SeqCst);
    let addr = spawn_backend(backend.clone()).await;
    let client = client_for(addr);

    let err = client.predict("text").await.expect_err("should be rejected");

    assert_eq!(backend.predict_hits.load(Ordering::SeqCst), 1);
    match err {
        ApiError::ClientError { status, detail } => {
            assert_eq!(status.as_u16(), 400);
            assert_eq!(detail.message, "Text is too short");
            assert_eq!(detail.suggestion.as_deref(), Some("Add a few more words"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn legacy_history_array_is_paged_client_side() {
    let backend = Arc::new(Backend::default());
    backend.legacy_history.store(true, Ordering::SeqCst);
    {
        let mut rows = backend.rows.lock();
        for (id, day) in [(1, 1), (3, 3), (2, 2)] {
            rows.push(json!({
                "id": id,
                "text_input": format!("text {id}"),
                "label_classified": "LABEL_4",
                "accuracy": 50.0,
                "created_at": format!("2024-05-0{day}T08:00:00"),
                "feedback": null
            }));
        }
    }
    let addr = spawn_backend(backend).await;
    let client = client_for(addr);

    let first = client.predictions(1, 2).await.expect("page 1");
    let second = client.predictions(2, 2).await.expect("page 2");

    assert_eq!(first.source, HistorySource::Legacy);
    assert_eq!(first.total_pages, 2);
    let ids: Vec<_> = first.rows.iter().map(|row| row.id.to_string()).collect();
    assert_eq!(ids, vec!["3", "2"]);
    assert_eq!(second.rows.len(), 1);
    assert_eq!(second.rows[0].id, PredictionId::from(1));
}

#[tokio::test]
async fn missing_health_endpoint_reads_as_unavailable() {
    let addr = spawn_backend(Arc::new(Backend::default())).await;
    let client = client_for(addr);

    let err = client.health().await.expect_err("no health route");
    assert_eq!(err.status().map(|status| status.as_u16()), Some(404));

    let mut config = ClientConfig::default();
    config.api_base_url = format!("http://{addr}/api/v1");
    let views = Recorders::default();
    let workbench = Workbench::new(&config, Arc::new(client), views.views(""));
    assert_eq!(workbench.health.probe().await, Connectivity::Unavailable);
    assert_eq!(*views.connectivity.seen.lock(), vec![Connectivity::Unavailable]);
}

#[tokio::test]
async fn predict_like_and_reload_history() {
    let backend = Arc::new(Backend::default());
    let addr = spawn_backend(backend.clone()).await;
    let mut config = ClientConfig::default();
    config.api_base_url = format!("http://{addr}/api/v1");
    config.retry_base_ms = 10;
    let api = Arc::new(ClassifierClient::from_config(&config).expect("client"));
    let text = "ប្រាក់ដុល្លារឡើងថ្លៃ";
    let recorders = Recorders::default();
    let workbench = Workbench::new(&config, api, recorders.views(text));

    workbench.segmenter.on_paste(text).await;
    let count = recorders.surface.counts.lock().last().copied().expect("count");
    assert_eq!(count.to_string(), "3 / 512 words");
    assert!(count.authoritative);

    let record = workbench.session.submit(text).await.expect("submit");
    assert_eq!(record.label.to_string(), "សេដ្ឋកិច្ច / Economic");
    assert_eq!(
        classifier_sdk::label::format_confidence(record.confidence),
        "91.20 %"
    );
    assert_eq!(recorders.prediction.shown.lock().len(), 1);

    let feedback = workbench.session.like().await.expect("like");
    assert_eq!(feedback, Feedback::Liked);
    assert_eq!(*backend.feedback.lock(), vec![(42, true)]);

    let page = recorders
        .history
        .pages
        .lock()
        .last()
        .cloned()
        .expect("history shown");
    assert_eq!(page.page_number, 1);
    assert_eq!(page.rows.len(), 1);
    assert_eq!(page.rows[0].id, PredictionId::from(42));
    assert_eq!(page.rows[0].feedback, Feedback::Liked);
    assert_eq!(page.position_label(), "Page 1 of 1");
}

#[derive(Default)]
struct Surface {
    text: Mutex<String>,
    counts: Mutex<Vec<WordCount>>,
}

impl InputSurface for Surface {
    fn caret(&self) -> usize {
        self.text.lock().chars().count()
    }

    fn replace_text(&self, text: &str) {
        *self.text.lock() = text.to_string();
    }

    fn set_caret(&self, _offset: usize) {}

    fn show_word_count(&self, count: WordCount) {
        self.counts.lock().push(count);
    }

    fn warn_truncated(&self, _max_words: usize) {}
}

#[derive(Default)]
struct PredictionLog {
    shown: Mutex<Vec<PredictionRecord>>,
}

impl PredictionView for PredictionLog {
    fn show_submitting(&self) {}

    fn show_prediction(&self, record: &PredictionRecord) {
        self.shown.lock().push(record.clone());
    }

    fn show_failure(&self, _message: &UserMessage) {}

    fn show_feedback(&self, _feedback: Feedback) {}

    fn show_feedback_error(&self, _message: &UserMessage) {}
}

#[derive(Default)]
struct HistoryLog {
    pages: Mutex<Vec<PageState>>,
}

impl HistoryView for HistoryLog {
    fn show_loading(&self, _page: u32) {}

    fn show_page(&self, page: &PageState) {
        self.pages.lock().push(page.clone());
    }

    fn show_error(&self, _message: &UserMessage) {}
}

#[derive(Default)]
struct ConnectivityLog {
    seen: Mutex<Vec<Connectivity>>,
}

impl ConnectivityView for ConnectivityLog {
    fn show_connectivity(&self, connectivity: Connectivity) {
        self.seen.lock().push(connectivity);
    }
}

#[derive(Default)]
struct Recorders {
    surface: Arc<Surface>,
    prediction: Arc<PredictionLog>,
    history: Arc<HistoryLog>,
    connectivity: Arc<ConnectivityLog>,
}

impl Recorders {
    fn views(&self, text: &str) -> Views {
        *self.surface.text.lock() = text.to_string();
        Views {
            input: self.surface.clone(),
            prediction: self.prediction.clone(),
            history: self.history.clone(),
            connectivity: self.connectivity.clone(),
        }
    }
}
