//! End-to-end chat turn: configuration service -> registry -> fan-out -> synthesis

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use agent_portal::{
    AgentClient, AgentRegistry, AskPayload, ClientConfig, Health, HttpConfigSource, Synthesizer,
    FAILURE_SUMMARY,
};

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    base
}

fn answering(answer: &'static str, delay_ms: u64) -> Router {
    Router::new()
        .route(
            "/ask",
            post(move |Json(body): Json<Value>| async move {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Json(json!({
                    "answer": format!("{} ({})", answer, body["prompt"].as_str().unwrap_or("")),
                    "sources": [{ "title": answer }]
                }))
            }),
        )
        .route(
            "/metadata",
            get(move || async move { Json(json!({ "name": answer, "status": "active" })) }),
        )
}

struct Portal {
    client: AgentClient,
    config_hits: Arc<AtomicUsize>,
    broken_hits: Arc<AtomicUsize>,
}

async fn portal() -> Portal {
    let research = serve(answering("research", 120)).await;
    let writer = serve(answering("writer", 10)).await;

    let broken_hits = Arc::new(AtomicUsize::new(0));
    let broken = serve(Router::new().route(
        "/ask",
        post({
            let hits = broken_hits.clone();
            move || async move {
                hits.fetch_add(1, Ordering::SeqCst);
                StatusCode::BAD_GATEWAY
            }
        }),
    ))
    .await;

    let agents = json!([
        { "alias": "research", "baseUrl": research, "displayOrder": 1 },
        { "alias": "writer", "baseUrl": writer, "displayOrder": 2 },
        { "alias": "broken", "baseUrl": broken, "displayOrder": 3 },
        { "alias": "docs", "baseUrl": "", "domainUrl": "https://docs.example.com", "displayOrder": 0 }
    ]);
    let config_hits = Arc::new(AtomicUsize::new(0));
    let config_service = serve(Router::new().route(
        "/api/agents",
        get({
            let hits = config_hits.clone();
            move || async move {
                hits.fetch_add(1, Ordering::SeqCst);
                Json(json!({ "agents": agents }))
            }
        }),
    ))
    .await;

    let config = ClientConfig {
        timeout: Duration::from_secs(5),
        ..Default::default()
    };
    let source = HttpConfigSource::new(&format!("{}/api/agents", config_service), &config).unwrap();
    let registry = Arc::new(AgentRegistry::new(source));
    let client = AgentClient::new(registry, config).unwrap();

    Portal {
        client,
        config_hits,
        broken_hits,
    }
}

#[tokio::test]
async fn test_multi_agent_turn() {
    let portal = portal().await;
    let payload = AskPayload::new("status?").with_session("s-1").with_user("u-1");

    let answer = portal
        .client
        .turn(&["research", "broken", "writer"], &payload, &Synthesizer::default())
        .await;

    assert_eq!(
        answer.summary,
        "— RESEARCH: research (status?)\n\n— WRITER: writer (status?)"
    );
    let aliases: Vec<&str> = answer.parts.iter().map(|p| p.alias.as_str()).collect();
    assert_eq!(aliases, vec!["research", "writer"]);
    assert_eq!(answer.parts[1].sources, vec![json!({ "title": "writer" })]);
    assert_eq!(answer.meta.best_alias.as_deref(), Some("writer"));
    assert!(answer.meta.latency_ms >= 120);

    // Broken agent was retried once, then dropped from the answer
    assert_eq!(portal.broken_hits.load(Ordering::SeqCst), 2);
    assert_eq!(answer.meta.replies[1].error(), Some("HTTP 502"));

    // One configuration fetch for the whole turn
    assert_eq!(portal.config_hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_single_agent_turn_is_verbatim() {
    let portal = portal().await;
    let answer = portal
        .client
        .turn(&["writer"], &AskPayload::new("hi"), &Synthesizer::default())
        .await;

    assert_eq!(answer.summary, "writer (hi)");
    assert_eq!(answer.meta.best_alias.as_deref(), Some("writer"));
}

#[tokio::test]
async fn test_turn_without_answers() {
    let portal = portal().await;
    let answer = portal
        .client
        .turn(&["broken", "docs", "nobody"], &AskPayload::new("hi"), &Synthesizer::default())
        .await;

    assert_eq!(answer.summary, FAILURE_SUMMARY);
    assert!(answer.parts.is_empty());
    assert_eq!(answer.meta.best_alias, None);
    assert_eq!(
        answer.meta.replies[1].error(),
        Some(agent_portal::NOT_FOUND_ERROR)
    );
}

#[tokio::test]
async fn test_registry_listings_and_health() {
    let portal = portal().await;
    let registry = portal.client.registry();

    let active: Vec<String> = registry
        .active()
        .await
        .unwrap()
        .into_iter()
        .map(|d| d.alias)
        .collect();
    assert_eq!(active, vec!["docs", "research", "writer", "broken"]);
    assert_eq!(registry.applications().await.unwrap()[0].alias, "docs");

    let reports = portal.client.check_all().await.unwrap();
    assert_eq!(reports.len(), 3);
    assert_eq!(portal.client.health("research").await, Health::Healthy);
    assert_eq!(portal.client.health("broken").await, Health::Unhealthy);

    registry.invalidate().await;
    registry.configs().await.unwrap();
    assert_eq!(portal.config_hits.load(Ordering::SeqCst), 2);
}
