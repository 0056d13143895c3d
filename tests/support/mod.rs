//! Shared fixtures for integration tests.

#![allow(dead_code)]

pub mod socket_guard;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use media_acquire::{
    AcquisitionOrchestrator, ClientSession, HttpQuotaService, HttpTimeouts, ProgressEvent,
    ProgressReporter, QuotaGate, RelayPool, StreamingFetcher,
};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const GUEST: &str = "guest_integration";

pub fn timeouts() -> HttpTimeouts {
    HttpTimeouts::from_secs(5, 5, 5)
}

/// Orchestrator over `{server}{path}` for each relay path, in order.
pub fn orchestrator(server: &MockServer, relay_paths: &[&str]) -> Arc<AcquisitionOrchestrator> {
    let pool = RelayPool::from_urls(relay_paths.iter().map(|p| format!("{}{p}", server.uri())));
    let fetcher = StreamingFetcher::new(timeouts()).unwrap();
    Arc::new(AcquisitionOrchestrator::new(pool, fetcher))
}

/// Gate metering a fresh in-memory guest session against `{server}/quota`.
pub fn guest_gate(server: &MockServer) -> (QuotaGate, Arc<ClientSession>) {
    let session = Arc::new(ClientSession::in_memory(GUEST));
    let service = HttpQuotaService::new(format!("{}/quota", server.uri()), timeouts()).unwrap();
    (QuotaGate::new(Arc::new(service), Arc::clone(&session)), session)
}

/// Answers every check with `allowed`.
pub async fn mount_quota_check(server: &MockServer, allowed: bool) {
    Mock::given(method("POST"))
        .and(path("/quota"))
        .and(body_partial_json(json!({"action": "check"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"allowed": allowed})))
        .mount(server)
        .await;
}

/// Expects exactly `times` consume calls for `count` units by the guest.
pub async fn mount_quota_consume(server: &MockServer, count: u32, times: u64, download_count: u64) {
    Mock::given(method("POST"))
        .and(path("/quota"))
        .and(body_partial_json(json!({
            "action": "consume",
            "type": "download",
            "count": count,
            "guestId": GUEST
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "usage": {"plan": "FREE", "downloadCount": download_count}
        })))
        .expect(times)
        .mount(server)
        .await;
}

/// Relay on a raw socket that answers every request with 200, declares
/// `content_length`, and writes `chunks` with `gap` after each one.
///
/// The connection closes after the last chunk, so chunks adding up to less
/// than `content_length` produce a truncated body. Returns the base URL, or
/// `None` when localhost sockets are unavailable.
pub async fn chunked_relay(
    content_length: usize,
    chunks: Vec<Vec<u8>>,
    gap: Duration,
) -> Option<String> {
    if socket_guard::should_skip_socket_bound_test() {
        return None;
    }
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let chunks = chunks.clone();
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }

                let head = format!(
                    "HTTP/1.1 200 OK\r\ncontent-length: {content_length}\r\n\
                     content-type: application/octet-stream\r\nconnection: close\r\n\r\n"
                );
                if socket.write_all(head.as_bytes()).await.is_err() {
                    return;
                }
                for chunk in chunks {
                    if socket.write_all(&chunk).await.is_err() {
                        return;
                    }
                    let _ = socket.flush().await;
                    tokio::time::sleep(gap).await;
                }
                let _ = socket.shutdown().await;
            });
        }
    });

    Some(format!("http://{addr}"))
}

/// Collects every event it receives.
#[derive(Default)]
pub struct Recorder(Mutex<Vec<ProgressEvent>>);

impl Recorder {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.0.lock().unwrap().clone()
    }

    pub fn percents(&self) -> Vec<u8> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::Transfer { percent } => Some(percent),
                ProgressEvent::Batch { .. } => None,
            })
            .collect()
    }
}

impl ProgressReporter for Recorder {
    fn report(&self, event: ProgressEvent) {
        self.0.lock().unwrap().push(event);
    }
}
