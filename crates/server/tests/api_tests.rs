use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::Utc;
use tower::ServiceExt;
use uuid::Uuid;

use freightwatch_core::{
    Coordinates, Customer, Delivery, NotificationChannel, Route, Threshold,
};
use freightwatch_engine::LocalEngine;
use freightwatch_notify::NotificationService;
use freightwatch_server::api::{self, AppState};
use freightwatch_server::config::ProvidersSection;
use freightwatch_server::providers::build_providers;
use freightwatch_store::Repository;
use freightwatch_store_memory::MemoryRepository;
use freightwatch_sweep::FleetSweep;
use freightwatch_workflow::{
    Activities, DelayNotificationWorkflow, Pipeline, RecurringTrafficCheckWorkflow,
    ThresholdResolver, WorkflowConfig, WorkflowService,
};

const CRON_SECRET: &str = "test-cron-secret";

struct TestApp {
    app: axum::Router,
    repo: Arc<MemoryRepository>,
}

fn build_app() -> TestApp {
    let repo = Arc::new(MemoryRepository::new());
    let repo_dyn: Arc<dyn Repository> = repo.clone();

    let providers = build_providers(&ProvidersSection {
        force_mock_adapters: true,
        ..ProvidersSection::default()
    })
    .expect("mock providers should build");

    let notifier = Arc::new(
        NotificationService::builder()
            .email_adapters(providers.email)
            .sms_adapters(providers.sms)
            .build(),
    );

    let config = WorkflowConfig::default();
    let resolver = ThresholdResolver::new(repo_dyn.clone(), config.default_threshold_minutes);
    let activities = Arc::new(Activities::new(
        repo_dyn.clone(),
        providers.traffic.clone(),
        providers.generators,
        notifier,
        resolver,
        config.activity.clone(),
    ));
    let pipeline = Arc::new(Pipeline::new(repo_dyn.clone(), activities));

    let engine = Arc::new(
        LocalEngine::builder()
            .register(Arc::new(DelayNotificationWorkflow::new(
                repo_dyn.clone(),
                pipeline.clone(),
            )))
            .register(Arc::new(RecurringTrafficCheckWorkflow::new(
                repo_dyn.clone(),
                pipeline,
                config.clone(),
            )))
            .build(),
    );

    let workflows = Arc::new(WorkflowService::new(engine, repo_dyn, config));
    let sweep = Arc::new(FleetSweep::new(repo.clone(), providers.traffic));

    let state = AppState {
        workflows,
        sweep,
        geocoders: Arc::new(providers.geocoders),
        cron_secret: Some(CRON_SECRET.to_owned()),
    };

    TestApp {
        app: api::router(state),
        repo,
    }
}

async fn seed_delivery(repo: &MemoryRepository, recurring: bool) -> Delivery {
    let now = Utc::now();
    repo.create_threshold(
        Threshold::new(
            "standard",
            20,
            vec![NotificationChannel::Email, NotificationChannel::Sms],
        )
        .unwrap()
        .as_default()
        .as_system(),
    )
    .await
    .ok();
    let customer = repo
        .create_customer(
            Customer::new("Ada", format!("{}@example.com", Uuid::new_v4()), now)
                .with_phone("+15550001111"),
        )
        .await
        .unwrap();
    let route = repo
        .create_route(
            Route::new("Newark, NJ", "Boston, MA", now)
                .with_coords(Coordinates::new(40.73, -74.17), Coordinates::new(42.36, -71.06)),
        )
        .await
        .unwrap();
    let mut delivery = Delivery::new(
        format!("TRK-{}", &Uuid::new_v4().to_string()[..8]),
        customer.id,
        route.id,
        now + chrono::Duration::hours(6),
        now,
    );
    if recurring {
        delivery = delivery.with_recurring_checks(60, -1);
    }
    repo.create_delivery(delivery).await.unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn get_with_bearer(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_returns_ok() {
    let test = build_app();
    let response = test.app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn sweep_requires_bearer_secret() {
    let test = build_app();

    let response = test
        .app
        .clone()
        .oneshot(get("/api/traffic/check-all"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = test
        .app
        .clone()
        .oneshot(get_with_bearer("/api/traffic/check-all", "wrong"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn sweep_returns_summary_with_valid_secret() {
    let test = build_app();
    seed_delivery(&test.repo, false).await;

    let response = test
        .app
        .oneshot(get_with_bearer("/api/traffic/check-all", CRON_SECRET))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["routes_checked"], 1);
    assert_eq!(body["snapshots_saved"], 1);
    assert_eq!(body["notifications_triggered"], 0);
    assert!(body["errors"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn workflow_start_returns_handle_and_is_idempotent() {
    let test = build_app();
    let delivery = seed_delivery(&test.repo, true).await;

    let response = test
        .app
        .clone()
        .oneshot(post_json(
            "/api/workflows",
            serde_json::json!({ "delivery_id": delivery.id }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let first = body_json(response).await;
    assert_eq!(
        first["workflow_id"],
        format!("recurring-check-{}", delivery.id)
    );

    let response = test
        .app
        .clone()
        .oneshot(post_json(
            "/api/workflows",
            serde_json::json!({ "delivery_id": delivery.id }),
        ))
        .await
        .unwrap();
    let second = body_json(response).await;
    assert_eq!(first["run_id"], second["run_id"]);

    // Clean up the long-lived run.
    let response = test
        .app
        .oneshot(post_json(
            "/api/workflows/cancel",
            serde_json::json!({ "workflow_id": first["workflow_id"], "force": true }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn workflow_start_unknown_delivery_is_404() {
    let test = build_app();
    let response = test
        .app
        .oneshot(post_json(
            "/api/workflows",
            serde_json::json!({ "delivery_id": Uuid::new_v4() }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn workflow_status_reports_terminal_one_shot() {
    let test = build_app();
    let delivery = seed_delivery(&test.repo, false).await;

    let response = test
        .app
        .clone()
        .oneshot(post_json(
            "/api/workflows",
            serde_json::json!({ "delivery_id": delivery.id }),
        ))
        .await
        .unwrap();
    let started = body_json(response).await;
    let workflow_id = started["workflow_id"].as_str().unwrap().to_owned();

    // Poll until the one-shot run closes.
    let mut status = serde_json::Value::Null;
    for _ in 0..200 {
        let response = test
            .app
            .clone()
            .oneshot(get(&format!("/api/workflows?workflow_id={workflow_id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        status = body_json(response).await;
        if status["status"] != "running" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(status["status"], "completed");
    assert_eq!(status["source"], "engine");
}

#[tokio::test]
async fn workflow_status_falls_back_to_store() {
    let test = build_app();
    let delivery = seed_delivery(&test.repo, false).await;

    // Simulate a run from before a restart: only the store knows it.
    let workflow_id = format!("delay-notification-{}", delivery.id);
    let mut execution = freightwatch_core::WorkflowExecution::begin(
        &workflow_id,
        "run-before-restart",
        delivery.id,
        Utc::now() - chrono::Duration::hours(2),
    );
    execution.complete(Utc::now() - chrono::Duration::hours(1));
    test.repo.create_workflow_execution(execution).await.unwrap();

    let response = test
        .app
        .oneshot(get(&format!("/api/workflows?workflow_id={workflow_id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "completed");
    assert_eq!(body["source"], "store");
    assert_eq!(body["run_id"], "run-before-restart");
}

#[tokio::test]
async fn workflow_status_unknown_id_is_404() {
    let test = build_app();
    let response = test
        .app
        .oneshot(get("/api/workflows?workflow_id=delay-notification-nope"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn geocode_resolves_through_mock_chain() {
    let test = build_app();
    let response = test
        .app
        .clone()
        .oneshot(get("/api/geocode?address=Newark%2C%20NJ"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["lat"].is_number());
    assert!(body["lng"].is_number());

    let response = test
        .app
        .oneshot(get("/api/geocode?address=%20"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
