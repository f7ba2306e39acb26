//! End-to-end pipeline tests against local mock servers.
//!
//! Each test stands up a throwaway axum server playing the document service
//! and/or the model API on an ephemeral port, points the engine at it, and
//! asserts on the outcome plus what the mock observed (auth headers, poll
//! counts, PATCH bodies). The mock serves PNG renders so the PDF rasteriser
//! is never required on the test host.

use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use invoice_crosscheck::{
    ComparisonEngine, CredentialStore, CrossCheckError, EngineConfig, ExtractedFields, FieldKind,
    MemoryCredentials, MISSING, MODEL_API_KEY, SERVICE_API_KEY,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Harness ──────────────────────────────────────────────────────────────

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn engine(base_url: &str) -> ComparisonEngine {
    let credentials = MemoryCredentials::new();
    credentials.set(SERVICE_API_KEY, "svc-secret");
    credentials.set(MODEL_API_KEY, "sk-model-secret");

    let config = EngineConfig::builder()
        .service_base_url(base_url)
        .model_base_url(base_url)
        .poll_interval(Duration::from_millis(5))
        .build()
        .unwrap();

    ComparisonEngine::new(config, Arc::new(credentials)).unwrap()
}

fn png_bytes() -> Vec<u8> {
    use image::{DynamicImage, RgbImage};
    let image = DynamicImage::ImageRgb8(RgbImage::new(16, 16));
    let mut bytes = Vec::new();
    image
        .write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .unwrap();
    bytes
}

fn service_fields_body() -> Value {
    json!({
        "invoiceNo": { "value": "FV/2024/001" },
        "payee": {
            "name": { "value": "ACME Sp. z o.o." },
            "streetName": { "value": "Polna" },
            "buildingNo": { "value": "12A" },
            "postalCode": { "value": "00-001" },
            "city": { "value": "Warszawa" }
        },
        "payer": { "name": { "value": "Client S.A." } },
        "dates": {
            "issue": { "value": "15.03.2024" },
            "due": { "value": "29.03.2024" }
        },
        "amounts": {
            "gross": { "value": "1 230,00" },
            "net": { "value": "1 000,00" },
            "vat": { "value": "230,00" }
        },
        "currency": { "value": "PLN" }
    })
}

fn model_reply_body() -> Value {
    let fields = json!({
        "invoice_number": "FV/2024/001",
        "vendor_name": "ACME Sp. z o.o.",
        "vendor_address": "Polna 12A, 00-001 Warszawa",
        "client_name": "Client S.A.",
        "client_address": null,
        "invoice_date": "2024-03-15",
        "due_date": "2024-03-29",
        "total_amount": "1230.00",
        "currency": "PLN",
        "tax_amount": "230.00",
        "net_amount": "1000.00",
        "items": [
            { "description": "Widget", "quantity": 10, "unit_price": "100.00", "total": "1000.00" }
        ]
    });
    let content = format!("Here is the extracted data:\n```json\n{fields}\n```");
    json!({ "choices": [ { "message": { "role": "assistant", "content": content } } ] })
}

/// The service endpoints (no model), with a configurable number of pending
/// polls before the render finishes. Tests add their own `/chat/completions`.
fn service_router(pending_polls: usize, polls_seen: Arc<AtomicUsize>) -> Router {
    Router::new()
        .route(
            "/invoices/:id/data",
            get(|headers: HeaderMap| async move {
                assert_eq!(
                    headers.get("authorization").unwrap(),
                    "Scanye svc-secret",
                    "service auth header must carry the scheme prefix"
                );
                Json(service_fields_body())
            }),
        )
        .route("/printouts", post(|| async { "\"job-42\"" }))
        .route(
            "/printouts/:job",
            get(move |Path(job): Path<String>| {
                let polls_seen = polls_seen.clone();
                async move {
                    assert_eq!(job, "job-42");
                    let n = polls_seen.fetch_add(1, Ordering::SeqCst);
                    if n < pending_polls {
                        Json(json!({ "status": "Pending", "fileType": null }))
                    } else {
                        Json(json!({ "status": "Finished", "fileType": "Png" }))
                    }
                }
            }),
        )
        .route("/printouts/:job/data", get(|| async { png_bytes() }))
}

/// Service endpoints plus a model endpoint that answers the canned reply.
fn happy_router(pending_polls: usize, polls_seen: Arc<AtomicUsize>) -> Router {
    service_router(pending_polls, polls_seen).route(
        "/chat/completions",
        post(|headers: HeaderMap, Json(body): Json<Value>| async move {
            assert_eq!(
                headers.get("authorization").unwrap(),
                "Bearer sk-model-secret"
            );
            assert_eq!(body["max_tokens"], 2000);
            let content = &body["messages"][0]["content"];
            assert_eq!(content[0]["type"], "text");
            assert!(content[1]["image_url"]["url"]
                .as_str()
                .unwrap()
                .starts_with("data:image/png;base64,"));
            Json(model_reply_body())
        }),
    )
}

// ── Full-run tests ───────────────────────────────────────────────────────

#[tokio::test]
async fn full_run_compares_both_extractions() {
    let polls = Arc::new(AtomicUsize::new(0));
    let base = serve(happy_router(2, polls.clone())).await;

    let outcome = engine(&base).run("doc-1").await.unwrap().unwrap();

    assert_eq!(polls.load(Ordering::SeqCst), 3, "two pending polls, one finished");

    let report = &outcome.report;
    assert_eq!(report.rows.len(), 11);

    let row = |f: FieldKind| report.rows.iter().find(|r| r.field == f).unwrap();

    assert!(row(FieldKind::InvoiceNumber).matched);
    assert!(row(FieldKind::VendorName).matched);
    assert!(
        row(FieldKind::InvoiceDate).matched,
        "15.03.2024 must match 2024-03-15"
    );
    assert!(row(FieldKind::DueDate).matched);
    assert!(
        row(FieldKind::TotalAmount).matched,
        "'1 230,00' must match '1230.00'"
    );
    assert!(row(FieldKind::Currency).matched);
    assert!(row(FieldKind::TaxAmount).matched);
    assert!(row(FieldKind::NetAmount).matched);

    // The model found no client address; missing never matches.
    let client_address = row(FieldKind::ClientAddress);
    assert_eq!(client_address.service_value, MISSING);
    assert_eq!(client_address.model_value, MISSING);
    assert!(!client_address.matched);

    // Address joining differs between the two sides; the matcher does not
    // paper over wording differences in text fields.
    assert!(!row(FieldKind::VendorAddress).matched);

    assert_eq!(outcome.model_fields.items.len(), 1);
    assert_eq!(
        outcome.model_fields.items[0].quantity.as_deref(),
        Some("10")
    );
}

#[tokio::test]
async fn immediate_finish_polls_once() {
    let polls = Arc::new(AtomicUsize::new(0));
    let base = serve(happy_router(0, polls.clone())).await;

    engine(&base).run("doc-1").await.unwrap().unwrap();
    assert_eq!(polls.load(Ordering::SeqCst), 1);
}

// ── Render-protocol failure modes ────────────────────────────────────────

/// Service router whose render never finishes; field data still works.
fn pending_forever_router() -> Router {
    Router::new()
        .route(
            "/invoices/:id/data",
            get(|| async { Json(service_fields_body()) }),
        )
        .route("/printouts", post(|| async { "\"job-1\"" }))
        .route(
            "/printouts/:job",
            get(|| async { Json(json!({ "status": "Pending", "fileType": null })) }),
        )
}

#[tokio::test]
async fn render_timeout_after_poll_ceiling() {
    let base = serve(pending_forever_router()).await;

    let err = engine(&base).run("doc-1").await.unwrap_err();
    assert!(
        matches!(err, CrossCheckError::RenderTimeout { attempts: 30 }),
        "got: {err}"
    );
}

#[tokio::test]
async fn render_failed_is_terminal_after_one_poll() {
    let polls = Arc::new(AtomicUsize::new(0));
    let polls_handler = polls.clone();
    let app = Router::new()
        .route(
            "/invoices/:id/data",
            get(|| async { Json(service_fields_body()) }),
        )
        .route("/printouts", post(|| async { "\"job-1\"" }))
        .route(
            "/printouts/:job",
            get(move || {
                let polls = polls_handler.clone();
                async move {
                    polls.fetch_add(1, Ordering::SeqCst);
                    Json(json!({ "status": "Failed", "fileType": null }))
                }
            }),
        );
    let base = serve(app).await;

    let err = engine(&base).run("doc-1").await.unwrap_err();
    assert!(matches!(err, CrossCheckError::RenderFailed), "got: {err}");
    assert_eq!(polls.load(Ordering::SeqCst), 1, "Failed must not be retried");
}

#[tokio::test]
async fn render_request_error_carries_status() {
    let app = Router::new()
        .route(
            "/invoices/:id/data",
            get(|| async { Json(service_fields_body()) }),
        )
        .route(
            "/printouts",
            post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
        );
    let base = serve(app).await;

    let err = engine(&base).run("doc-1").await.unwrap_err();
    match err {
        CrossCheckError::RenderRequest { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("expected RenderRequest, got: {other}"),
    }
}

// ── Service failure modes ────────────────────────────────────────────────

/// Field data fails immediately; the render path stays pending so the field
/// error deterministically wins the race.
fn failing_fields_router(status: StatusCode) -> Router {
    Router::new()
        .route(
            "/invoices/:id/data",
            get(move || async move { (status, "denied") }),
        )
        .route("/printouts", post(|| async { "\"job-1\"" }))
        .route(
            "/printouts/:job",
            get(|| async { Json(json!({ "status": "Pending", "fileType": null })) }),
        )
}

#[tokio::test]
async fn service_401_maps_to_auth_error() {
    let base = serve(failing_fields_router(StatusCode::UNAUTHORIZED)).await;
    let err = engine(&base).run("doc-1").await.unwrap_err();
    assert!(matches!(err, CrossCheckError::Auth), "got: {err}");
}

#[tokio::test]
async fn service_404_names_the_document() {
    let base = serve(failing_fields_router(StatusCode::NOT_FOUND)).await;
    let err = engine(&base).run("doc-7").await.unwrap_err();
    match err {
        CrossCheckError::NotFound { id } => assert_eq!(id, "doc-7"),
        other => panic!("expected NotFound, got: {other}"),
    }
}

#[tokio::test]
async fn malformed_field_body_is_a_decode_error() {
    let app = Router::new()
        .route("/invoices/:id/data", get(|| async { "not json at all" }))
        .route("/printouts", post(|| async { "\"job-1\"" }))
        .route(
            "/printouts/:job",
            get(|| async { Json(json!({ "status": "Pending", "fileType": null })) }),
        );
    let base = serve(app).await;

    let err = engine(&base).run("doc-1").await.unwrap_err();
    assert!(matches!(err, CrossCheckError::Decode { .. }), "got: {err}");
}

// ── Model failure modes ──────────────────────────────────────────────────

fn model_status_router(status: StatusCode) -> Router {
    service_router(0, Arc::new(AtomicUsize::new(0))).route(
        "/chat/completions",
        post(move || async move { (status, "model says no") }),
    )
}

#[tokio::test]
async fn model_401_maps_to_model_auth() {
    let base = serve(model_status_router(StatusCode::UNAUTHORIZED)).await;
    let err = engine(&base).run("doc-1").await.unwrap_err();
    assert!(matches!(err, CrossCheckError::ModelAuth), "got: {err}");
}

#[tokio::test]
async fn model_429_maps_to_rate_limit() {
    let base = serve(model_status_router(StatusCode::TOO_MANY_REQUESTS)).await;
    let err = engine(&base).run("doc-1").await.unwrap_err();
    assert!(matches!(err, CrossCheckError::ModelRateLimit), "got: {err}");
}

#[tokio::test]
async fn unparseable_model_reply_is_a_parse_error() {
    let app = service_router(0, Arc::new(AtomicUsize::new(0))).route(
        "/chat/completions",
        post(|| async {
            Json(json!({
                "choices": [ { "message": { "role": "assistant",
                    "content": "I could not read this document, sorry." } } ]
            }))
        }),
    );
    let base = serve(app).await;

    let err = engine(&base).run("doc-1").await.unwrap_err();
    assert!(
        matches!(err, CrossCheckError::ModelResponseParse { .. }),
        "got: {err}"
    );
}

// ── Single-flight guard ──────────────────────────────────────────────────

#[tokio::test]
async fn second_trigger_is_a_no_op_while_running() {
    let polls = Arc::new(AtomicUsize::new(0));
    // 20 pending polls at 5 ms keeps the first run busy long enough.
    let base = serve(happy_router(20, polls)).await;

    let engine = Arc::new(engine(&base));
    let first = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.run("doc-1").await })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(engine.is_running());
    let second = engine.run("doc-1").await.unwrap();
    assert!(second.is_none(), "concurrent trigger must be ignored");

    let pushed = engine
        .push_corrections("doc-1", &ExtractedFields::default())
        .await
        .unwrap();
    assert!(!pushed, "push must not interleave with a run");

    let outcome = first.await.unwrap().unwrap();
    assert!(outcome.is_some(), "the first run still completes");
    assert!(!engine.is_running());

    // The engine is free again for a follow-up run.
    assert!(engine.run("doc-1").await.unwrap().is_some());
}

// ── Push-back ────────────────────────────────────────────────────────────

#[tokio::test]
async fn push_corrections_patches_the_wrapped_payload() {
    let captured: Arc<Mutex<Option<(String, Value)>>> = Arc::new(Mutex::new(None));
    let captured_handler = captured.clone();
    let app = Router::new().route(
        "/invoices/:id/data",
        get(|| async { Json(service_fields_body()) }),
    ).route(
        "/invoices/:id",
        patch(
            move |Path(id): Path<String>, headers: HeaderMap, Json(body): Json<Value>| {
                let captured = captured_handler.clone();
                async move {
                    assert_eq!(headers.get("authorization").unwrap(), "Scanye svc-secret");
                    *captured.lock().unwrap() = Some((id, body));
                    StatusCode::NO_CONTENT
                }
            },
        ),
    );
    let base = serve(app).await;

    let mut fields = ExtractedFields::default();
    fields.set(FieldKind::InvoiceNumber, "FV/2024/001");
    fields.set(FieldKind::InvoiceDate, "2024-03-15");
    fields.set(FieldKind::Currency, "PLN");
    fields.set(FieldKind::VendorName, "N/A");

    let pushed = engine(&base).push_corrections("doc-9", &fields).await.unwrap();
    assert!(pushed);

    let (id, body) = captured.lock().unwrap().clone().unwrap();
    assert_eq!(id, "doc-9");
    assert_eq!(body["invoiceNo"]["value"], "FV/2024/001");
    assert_eq!(body["currency"]["value"], "PLN");
    assert_eq!(body["dates"]["issue"]["value"], "2024-03-15");
    assert_eq!(
        body["dates"]["due"]["value"], "2024-03-15",
        "due date falls back to the issue date"
    );
    assert_eq!(
        body["payee"]["name"],
        json!({}),
        "the missing sentinel must not be written back"
    );
}

#[tokio::test]
async fn push_surfaces_service_errors() {
    let app = Router::new().route(
        "/invoices/:id",
        patch(|| async { (StatusCode::UNPROCESSABLE_ENTITY, "bad payload") }),
    );
    let base = serve(app).await;

    let err = engine(&base)
        .push_corrections("doc-1", &ExtractedFields::default())
        .await
        .unwrap_err();
    match err {
        CrossCheckError::Service { status, .. } => assert_eq!(status, 422),
        other => panic!("expected Service, got: {other}"),
    }
}
