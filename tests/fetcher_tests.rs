//! Retry behaviour of the outbound fetcher and the indexer endpoints built on it.

use axum::{http::StatusCode, routing::get, Json, Router};
use mockito::{mock, server_url, Matcher};
use reqwest::header::HeaderMap;
use secrecy::SecretString;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use monad_mcp_server::blockchain::{
    models::FetchError,
    services::{
        fetcher::{ResilientFetcher, RetryPolicy},
        indexer::IndexerClient,
    },
};

const DELAY: Duration = Duration::from_millis(50);

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        delay: DELAY,
    }
}

/// Serves `/flaky`, failing the first `failures` hits with a 503.
async fn spawn_flaky_server(failures: usize) -> (SocketAddr, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let app = Router::new().route(
        "/flaky",
        get(move || {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n < failures {
                    Err(StatusCode::SERVICE_UNAVAILABLE)
                } else {
                    Ok(Json(json!({"ok": true, "hit": n + 1})))
                }
            }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, hits)
}

#[tokio::test]
async fn succeeds_on_third_attempt_after_two_flat_delays() {
    let (addr, hits) = spawn_flaky_server(2).await;
    let fetcher = ResilientFetcher::new(fast_policy());

    let started = Instant::now();
    let body = fetcher
        .get_json(&format!("http://{}/flaky", addr), &HeaderMap::new())
        .await
        .unwrap();

    assert_eq!(body["hit"], 3);
    assert_eq!(hits.load(Ordering::SeqCst), 3);
    assert!(started.elapsed() >= DELAY * 2);
}

#[tokio::test]
async fn first_success_is_not_retried() {
    let (addr, hits) = spawn_flaky_server(0).await;
    let fetcher = ResilientFetcher::new(fast_policy());

    fetcher
        .get(&format!("http://{}/flaky", addr), &HeaderMap::new())
        .await
        .unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn gives_up_after_max_attempts() {
    let endpoint = mock("GET", "/always-down")
        .with_status(500)
        .expect(3)
        .create();
    let fetcher = ResilientFetcher::new(fast_policy());

    let err = fetcher
        .get(&format!("{}/always-down", server_url()), &HeaderMap::new())
        .await
        .unwrap_err();

    match err {
        FetchError::FetchExhausted { attempts, last_error } => {
            assert_eq!(attempts, 3);
            assert!(last_error.contains("500"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    endpoint.assert();
}

#[tokio::test]
async fn client_errors_are_retried_too() {
    let endpoint = mock("GET", "/not-found").with_status(404).expect(3).create();
    let fetcher = ResilientFetcher::new(fast_policy());

    let err = fetcher
        .get(&format!("{}/not-found", server_url()), &HeaderMap::new())
        .await
        .unwrap_err();
    assert!(err.to_string().starts_with("Max retries reached after 3 attempts"));
    endpoint.assert();
}

#[tokio::test]
async fn balances_request_carries_api_key() {
    let address = "0x0000000000000000000000000000000000000abc";
    let endpoint = mock("GET", Matcher::Regex(r"^/v2/monad/account/tokens".to_string()))
        .match_query(Matcher::UrlEncoded("address".into(), address.into()))
        .match_header("x-api-key", "test-key")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"code":0,"message":"OK","result":{"data":[]}}"#)
        .create();

    let indexer = IndexerClient::new(
        ResilientFetcher::new(fast_policy()),
        &server_url(),
        &server_url(),
        SecretString::new("test-key".to_string()),
    );
    let body = indexer.account_tokens(address).await.unwrap();
    assert_eq!(body["message"], "OK");
    endpoint.assert();
}

#[tokio::test]
async fn invalid_json_is_not_retried_as_a_status_failure() {
    let endpoint = mock("GET", "/collections/trending-mints/v2")
        .with_status(200)
        .with_body("not json")
        .expect(1)
        .create();

    let indexer = IndexerClient::new(
        ResilientFetcher::new(fast_policy()),
        &server_url(),
        &server_url(),
        SecretString::new("unused".to_string()),
    );
    let err = indexer.trending_mints().await.unwrap_err();
    assert!(matches!(err, FetchError::InvalidBody { .. }));
    endpoint.assert();
}
