use http_stat::shared::body::BodySource;
use http_stat::shared::capture::CaptureOutcome;
use http_stat::shared::url::parse_url;
use http_stat::{execute_request, Config, StatRequest};
use hyper::{Method, StatusCode};
use std::io::Write;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// Accepts one connection, reads the request up to `expect_body` body bytes,
/// and answers with a short 201.
async fn recording_server(expect_body: usize) -> (std::net::SocketAddr, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            received.extend_from_slice(&buf[..n]);
            if let Some(end) = find_header_end(&received) {
                if received.len() >= end + expect_body {
                    break;
                }
            }
        }
        socket
            .write_all(b"HTTP/1.1 201 Created\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok")
            .await
            .unwrap();
        let _ = socket.shutdown().await;
        let _ = tx.send(String::from_utf8_lossy(&received).into_owned());
    });

    (addr, rx)
}

fn find_header_end(data: &[u8]) -> Option<usize> {
    data.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4)
}

#[tokio::test]
async fn posts_file_body_with_user_headers() {
    let mut payload = tempfile::NamedTempFile::new().unwrap();
    payload.write_all(b"{\"ready\":true}").unwrap();

    let (addr, received) = recording_server(14).await;
    let url = parse_url(&format!("http://{}/submit?x=1", addr)).unwrap();

    let mut request = StatRequest::new(url);
    request.method = Method::POST;
    request.headers.set("Content-Type: application/json").unwrap();
    request.headers.set("Content-Length: 14").unwrap();
    request.body = Some(BodySource::parse(&format!("@{}", payload.path().display())));

    let report = execute_request(request, &Config::default(), CancellationToken::new())
        .await
        .unwrap();

    let hop = report.final_hop().unwrap();
    assert_eq!(hop.status, StatusCode::CREATED);
    assert_eq!(report.capture.unwrap(), CaptureOutcome::Discarded);

    let wire = received.await.unwrap();
    assert!(wire.starts_with("POST /submit?x=1 HTTP/1.1\r\n"));
    assert!(wire.to_ascii_lowercase().contains(&format!("host: {}\r\n", addr)));
    assert!(wire.to_ascii_lowercase().contains("content-type: application/json\r\n"));
    assert!(wire.ends_with("{\"ready\":true}"));
}

#[tokio::test]
async fn head_request_skips_capture() {
    let (addr, _received) = recording_server(0).await;
    let url = parse_url(&format!("http://{}/", addr)).unwrap();

    let mut request = StatRequest::new(url);
    request.method = Method::HEAD;
    request.capture.save_output = true;

    let report = execute_request(request, &Config::default(), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.capture.unwrap(), CaptureOutcome::Skipped);
}

#[tokio::test]
async fn refused_connection_fails_the_run() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let url = parse_url(&format!("http://{}/", addr)).unwrap();
    let err = execute_request(StatRequest::new(url), &Config::default(), CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "CONNECTION_FAILED");
}
