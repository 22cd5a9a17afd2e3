//! Full placeholder session over real sockets: a fake functions host on TCP,
//! a fake placeholder app on the hand-off socket that connects back to the
//! payload bridge.

use assert_matches::assert_matches;
use codec::{read_frame, write_frame};
use net_host::{HostEntrypoint, PayloadFrame};
use relay_core::Handoff;
use std::time::Duration;
use tempfile::tempdir;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream, UnixListener, UnixStream};
use types::{
    FunctionEnvironmentReloadRequest, MessageContent, OpaqueMessage, Status, StreamingMessage,
    WorkerInitRequest,
};
use worker_config::HostSettings;

const MAX: usize = 1 << 20;

async fn next(stream: &mut TcpStream) -> StreamingMessage {
    tokio::time::timeout(Duration::from_secs(5), read_frame(stream, MAX))
        .await
        .expect("host frame in time")
        .unwrap()
        .expect("stream open")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_placeholder_session_specializes_over_sockets() {
    let dir = tempdir().unwrap();
    let app = dir.path().join("app");
    std::fs::create_dir_all(&app).unwrap();
    std::fs::write(
        app.join("worker.config.json"),
        r#"{"description":{"defaultWorkerPath":"{WorkerRoot}run.dll","canUsePlaceholder":true}}"#,
    )
    .unwrap();

    let host = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = host.local_addr().unwrap().port();
    let handoff_socket = dir.path().join("handoff.sock");
    let payload_socket = dir.path().join("payload.sock");
    let handoff_listener = UnixListener::bind(&handoff_socket).unwrap();

    let placeholder_app = {
        let payload_socket = payload_socket.clone();
        tokio::spawn(async move {
            let (stream, _) = handoff_listener.accept().await.unwrap();
            let mut line = String::new();
            BufReader::new(stream).read_line(&mut line).await.unwrap();
            let handoff: Handoff = serde_json::from_str(line.trim_end()).unwrap();

            let mut payload = UnixStream::connect(&payload_socket).await.unwrap();
            write_frame(
                &mut payload,
                &PayloadFrame::Loaded {
                    attempt: handoff.attempt,
                },
            )
            .await
            .unwrap();

            let mut received = Vec::new();
            for _ in 0..2 {
                let frame: PayloadFrame = read_frame(&mut payload, MAX).await.unwrap().unwrap();
                received.push(frame);
            }
            (handoff, received)
        })
    };

    let settings = HostSettings {
        host: "127.0.0.1".to_string(),
        port,
        worker_id: "worker-1".to_string(),
        request_id: "start".to_string(),
        load_timeout_ms: Some(5_000),
        payload_socket,
        handoff_socket,
        ..Default::default()
    };
    let session = tokio::spawn(HostEntrypoint::new(settings).run());

    let (mut stream, _) = host.accept().await.unwrap();
    let start = next(&mut stream).await;
    assert_eq!(start.request_id, "start");
    assert_matches!(start.content, MessageContent::StartStream(ref s) if s.worker_id == "worker-1");

    let init = StreamingMessage::new(
        "init",
        MessageContent::WorkerInitRequest(WorkerInitRequest::default()),
    );
    write_frame(&mut stream, &init).await.unwrap();
    let init_response = next(&mut stream).await;
    assert_eq!(init_response.request_id, "init");
    assert_matches!(init_response.content, MessageContent::WorkerInitResponse(_));

    let reload = StreamingMessage::new(
        "reload",
        MessageContent::FunctionEnvironmentReloadRequest(FunctionEnvironmentReloadRequest {
            function_app_directory: app.display().to_string(),
            environment_variables: [("NET_HOST_SESSION_TEST".to_string(), "1".to_string())]
                .into_iter()
                .collect(),
        }),
    );
    let custom = StreamingMessage::new(
        "custom",
        MessageContent::Opaque(OpaqueMessage {
            kind: "CustomMessageKind".to_string(),
            payload: vec![1, 2, 3],
        }),
    );
    write_frame(&mut stream, &reload).await.unwrap();
    write_frame(&mut stream, &custom).await.unwrap();

    let reload_response = next(&mut stream).await;
    assert_eq!(reload_response.request_id, "reload");
    let result = assert_matches!(
        reload_response.content,
        MessageContent::FunctionEnvironmentReloadResponse(r) => r.result
    );
    assert_eq!(result.status, Status::Success);

    let (handoff, received) = placeholder_app.await.unwrap();
    assert_eq!(handoff.executable_path, app.join("run.dll"));
    assert_eq!(
        handoff.environment.get("NET_HOST_SESSION_TEST").map(String::as_str),
        Some("1")
    );
    assert_eq!(
        received,
        vec![PayloadFrame::Message(reload), PayloadFrame::Message(custom)]
    );
    assert_eq!(std::env::var("NET_HOST_SESSION_TEST").as_deref(), Ok("1"));

    drop(stream);
    tokio::time::timeout(Duration::from_secs(5), session)
        .await
        .expect("session ends with the host stream")
        .unwrap()
        .unwrap();
}
