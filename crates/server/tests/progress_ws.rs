//! Progress fan-out over `/ws/progress` while a separation runs.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use futures_util::{SinkExt, StreamExt};
use pretty_assertions::assert_eq;
use stemsplit_core::{
    track_name, Invocation, ProgressEvent, ProgressSender, RunError, Separator, ServiceConfig,
};
use stemsplit_server::{create_app, AppState};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite;
use tower::ServiceExt;

type Client =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Emits whatever values the test pushes; finishes when the test drops
/// its sender.
struct SteppedSeparator {
    steps: Mutex<Option<mpsc::UnboundedReceiver<u8>>>,
}

#[async_trait]
impl Separator for SteppedSeparator {
    async fn separate(
        &self,
        invocation: &Invocation,
        progress: ProgressSender,
    ) -> Result<(), RunError> {
        let mut steps = self.steps.lock().await.take().expect("separator runs once");
        while let Some(value) = steps.recv().await {
            let _ = progress.send(ProgressEvent::new(value).unwrap());
        }
        let dir = invocation
            .output_dir
            .join(track_name(&invocation.input_path).unwrap());
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join(invocation.stem.file_name()), b"RIFF")
            .await
            .unwrap();
        let _ = progress.send(ProgressEvent::COMPLETE);
        Ok(())
    }

    fn name(&self) -> &str {
        "stepped"
    }
}

async fn serve(state: Arc<AppState>) -> std::net::SocketAddr {
    let app = create_app(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn ws_connect(addr: std::net::SocketAddr) -> Client {
    let url = format!("ws://127.0.0.1:{}/ws/progress", addr.port());
    let (ws_stream, _response) = tokio_tungstenite::connect_async(&url).await.unwrap();
    ws_stream
}

async fn wait_for_subscribers(state: &AppState, n: usize) {
    for _ in 0..200 {
        if state.hub.subscriber_count() == n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected {n} subscribers, have {}", state.hub.subscriber_count());
}

/// Next progress value, skipping heartbeat pings.
async fn recv_progress(ws: &mut Client) -> u8 {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for progress")
            .expect("stream ended")
            .expect("websocket error");
        if let tungstenite::Message::Text(text) = msg {
            let value: serde_json::Value = serde_json::from_str(&text).unwrap();
            return value["progress"].as_u64().unwrap() as u8;
        }
    }
}

#[tokio::test]
async fn both_subscribers_see_same_sequence_and_survivor_gets_final_100() {
    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join("track.flac");
    std::fs::write(&input, b"fLaC").unwrap();
    let output_dir = tmp.path().join("out");

    let (steps_tx, steps_rx) = mpsc::unbounded_channel();
    let separator = Arc::new(SteppedSeparator {
        steps: Mutex::new(Some(steps_rx)),
    });
    let state = AppState::with_separator(ServiceConfig::default(), separator);
    let addr = serve(Arc::clone(&state)).await;

    let mut first = ws_connect(addr).await;
    let mut second = ws_connect(addr).await;
    wait_for_subscribers(&state, 2).await;

    let body = serde_json::json!({
        "input_path": input,
        "output_dir": output_dir,
        "stem": "vocals",
    });
    let app = create_app(Arc::clone(&state));
    let request = tokio::spawn(async move {
        app.oneshot(
            Request::builder()
                .method("POST")
                .uri("/separate")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
    });

    for value in [10, 20] {
        steps_tx.send(value).unwrap();
    }
    let mut seen_first = Vec::new();
    let mut seen_second = Vec::new();
    for _ in 0..2 {
        seen_first.push(recv_progress(&mut first).await);
        seen_second.push(recv_progress(&mut second).await);
    }
    assert_eq!(seen_first, vec![10, 20]);
    assert_eq!(seen_second, seen_first);

    first.close(None).await.unwrap();
    drop(first);
    wait_for_subscribers(&state, 1).await;

    steps_tx.send(55).unwrap();
    drop(steps_tx);
    assert_eq!(recv_progress(&mut second).await, 55);
    assert_eq!(recv_progress(&mut second).await, 100);

    let response = request.await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["success"], true);
    assert!(state.jobs.is_empty());
}

#[tokio::test]
async fn failed_job_leaves_subscribers_connected() {
    struct Failing;

    #[async_trait]
    impl Separator for Failing {
        async fn separate(
            &self,
            _invocation: &Invocation,
            progress: ProgressSender,
        ) -> Result<(), RunError> {
            let _ = progress.send(ProgressEvent::new(5).unwrap());
            Err(RunError::ToolFailed {
                code: Some(2),
                output: "bad input".into(),
            })
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join("a.mp3");
    std::fs::write(&input, b"ID3").unwrap();

    let state = AppState::with_separator(ServiceConfig::default(), Arc::new(Failing));
    let addr = serve(Arc::clone(&state)).await;
    let mut ws = ws_connect(addr).await;
    wait_for_subscribers(&state, 1).await;

    let body = serde_json::json!({
        "input_path": input,
        "output_dir": tmp.path().join("out"),
        "track": "bass",
    });
    let response = create_app(Arc::clone(&state))
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/separate")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    assert_eq!(recv_progress(&mut ws).await, 5);
    ws.send(tungstenite::Message::Ping(Vec::new().into()))
        .await
        .unwrap();
    assert_eq!(state.hub.subscriber_count(), 1);
}
