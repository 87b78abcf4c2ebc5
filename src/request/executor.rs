//! HTTP request execution over our own dialed connections.
//!
//! Each hop dials through the [`DialPolicy`], optionally wraps the stream in
//! TLS, sends one HTTP/1.1 request with hyper and records what came back.
//! Bodies stay on the wire until response capture pulls them, so a body
//! that breaks off midway is a capture failure rather than a failed run.

use super::types::*;
use crate::config::Config;
use crate::error::AppError;
use crate::infra::dialer::DialPolicy;
use crate::infra::dns::DnsResolver;
use crate::infra::tls::{connect_tls, RustlsTlsProvider, TlsProvider};
use crate::shared::body::{empty_body, BodySource, RequestBody};
use crate::error::CaptureError;
use crate::shared::capture::{capture_response, is_redirect, CaptureOptions, CaptureOutcome};
use crate::shared::headers::{canonical_header_key, HeaderLine, HeaderList};
use crate::shared::peer_cert::peer_certificate;
use crate::shared::url::{parse_url, NormalizedUrl};
use futures::TryStreamExt;
use http_body_util::BodyExt;
use hyper::{
    body::Incoming,
    header::{HeaderMap, HeaderName, HeaderValue, HOST, LOCATION},
    Method, Request, Response, StatusCode,
};
use hyper_util::rt::TokioIo;
use std::io;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::io::{StreamReader, SyncIoBridge};
use tokio_util::sync::CancellationToken;

/// Executes `request`, following redirects when asked to.
pub async fn execute_request(
    request: StatRequest,
    config: &Config,
    cancel: CancellationToken,
) -> Result<StatReport, AppError> {
    let policy = DialPolicy::from_config(config, request.network.as_str())?;
    let tls = RustlsTlsProvider::new(request.client_identity.as_ref(), request.insecure)?;
    execute_with(request, config.max_redirects, &policy, &tls, &cancel).await
}

/// Same as [`execute_request`] with the dial policy and TLS provider supplied.
pub async fn execute_with<R: DnsResolver, P: TlsProvider>(
    request: StatRequest,
    max_redirects: usize,
    policy: &DialPolicy<R>,
    tls: &P,
    cancel: &CancellationToken,
) -> Result<StatReport, AppError> {
    let mut url = request.url.clone();
    let mut method = request.method.clone();
    let mut body = request.body.clone();
    let mut hops: Vec<HopReport> = Vec::new();

    loop {
        let exchange = run_hop(&url, &method, &request.headers, body.as_ref(), policy, tls, cancel);
        let (report, response) = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(AppError::Cancelled { url: url.to_string() });
            }
            result = exchange => result?,
        };

        let status = report.status;
        if request.follow_redirects && is_redirect(status) {
            if let Some(location) = response.headers().get(LOCATION) {
                let redirects = hops.len() + 1;
                if redirects > max_redirects {
                    return Err(AppError::TooManyRedirects(max_redirects));
                }

                let location = location
                    .to_str()
                    .map_err(|_| AppError::InvalidLocation {
                        location: String::from_utf8_lossy(location.as_bytes()).into_owned(),
                    })?
                    .to_string();
                let next = url
                    .as_url()
                    .join(&location)
                    .map_err(|_| AppError::InvalidLocation {
                        location: location.clone(),
                    })?;
                tracing::debug!(from = %url, to = %next, status = status.as_u16(), "following redirect");

                url = parse_url(next.as_str())?;
                if switches_to_get(status, &method) {
                    method = Method::GET;
                    body = None;
                }
                hops.push(report);
                continue;
            }
        }

        hops.push(report);

        let capture_request = Request::builder()
            .method(method.clone())
            .uri(url.request_uri())
            .body(())
            .map_err(|e| AppError::InvalidRequest(e.to_string()))?;
        let capture = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(AppError::Cancelled { url: url.to_string() });
            }
            result = capture_body(&request.capture, capture_request, response) => result?,
        };

        return Ok(StatReport { hops, capture });
    }
}

/// Runs response capture on a blocking thread, reading the body straight
/// off the connection. Read errors surface as [`CaptureError::Copy`].
async fn capture_body(
    options: &CaptureOptions,
    request: Request<()>,
    response: Response<Incoming>,
) -> Result<Result<CaptureOutcome, CaptureError>, AppError> {
    let (parts, body) = response.into_parts();
    let chunks = body
        .into_data_stream()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e));
    let reader = SyncIoBridge::new(StreamReader::new(Box::pin(chunks)));
    let response = Response::from_parts(parts, reader);

    let options = options.clone();
    let outcome =
        tokio::task::spawn_blocking(move || capture_response(&options, &request, response)).await?;
    Ok(outcome)
}

/// 303 always becomes GET (HEAD stays HEAD); 301 and 302 turn POST into GET.
fn switches_to_get(status: StatusCode, method: &Method) -> bool {
    match status {
        StatusCode::SEE_OTHER => *method != Method::HEAD && *method != Method::GET,
        StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND => *method == Method::POST,
        _ => false,
    }
}

async fn run_hop<R: DnsResolver, P: TlsProvider>(
    url: &NormalizedUrl,
    method: &Method,
    headers: &HeaderList,
    body: Option<&BodySource>,
    policy: &DialPolicy<R>,
    tls: &P,
    cancel: &CancellationToken,
) -> Result<(HopReport, Response<Incoming>), AppError> {
    let addr = dial_address(url);
    let tcp_stream = policy.dial_context(cancel, "tcp", &addr).await?;
    let remote_addr = tcp_stream.peer_addr().ok();

    let req = build_http_request(method, url, headers, body).await?;
    tracing::debug!(method = %method, url = %url, remote = ?remote_addr, "sending request");

    let (tls_info, response) = if url.is_https() {
        let tls_stream = connect_tls(tls, tcp_stream, url.host_name()).await?;
        let info = peer_certificate(&tls_stream);
        (info, send_request(tls_stream, req).await?)
    } else {
        (None, send_request(tcp_stream, req).await?)
    };

    let report = HopReport {
        url: url.to_string(),
        remote_addr,
        tls: tls_info,
        version: response.version(),
        status: response.status(),
        headers: display_headers(response.headers()),
    };
    Ok((report, response))
}

/// `host:port` for the dialer, bracketing IPv6 literals.
fn dial_address(url: &NormalizedUrl) -> String {
    let host = url.host_name();
    if host.contains(':') {
        format!("[{}]:{}", host, url.port())
    } else {
        format!("{}:{}", host, url.port())
    }
}

/// Builds the request: user headers in order, `Host` from the URL unless
/// overridden, body opened last.
async fn build_http_request(
    method: &Method,
    url: &NormalizedUrl,
    headers: &HeaderList,
    body: Option<&BodySource>,
) -> Result<Request<RequestBody>, AppError> {
    let mut req = Request::builder()
        .method(method.clone())
        .uri(url.request_uri())
        .body(empty_body())
        .map_err(|e| AppError::InvalidRequest(format!("Failed to build request: {}", e)))?;

    for line in headers {
        let name = HeaderName::from_bytes(line.key().as_bytes())
            .map_err(|e| AppError::InvalidRequest(format!("{}: {}", line, e)))?;
        let value = HeaderValue::from_str(line.value())
            .map_err(|e| AppError::InvalidRequest(format!("{}: {}", line, e)))?;
        req.headers_mut().append(name, value);
    }

    if !req.headers().contains_key(HOST) {
        let host = HeaderValue::from_str(url.host())
            .map_err(|e| AppError::InvalidRequest(format!("Host {}: {}", url.host(), e)))?;
        req.headers_mut().insert(HOST, host);
    }

    if let Some(source) = body {
        *req.body_mut() = source.open().await?;
    }

    Ok(req)
}

/// Sends one request over `io`. The response body is left unread.
async fn send_request<T>(io: T, req: Request<RequestBody>) -> Result<Response<Incoming>, AppError>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(io)).await?;

    tokio::spawn(async move {
        if let Err(e) = conn.await {
            tracing::warn!("Connection error: {}", e);
        }
    });

    Ok(sender.send_request(req).await?)
}

/// Response headers as canonical `Key: value` lines in display order.
fn display_headers(headers: &HeaderMap) -> HeaderList {
    let mut list: HeaderList = headers
        .iter()
        .map(|(name, value)| {
            HeaderLine::from_parts(
                &canonical_header_key(name.as_str()),
                &String::from_utf8_lossy(value.as_bytes()),
            )
        })
        .collect();
    list.sort_for_display();
    list
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::capture::{CaptureOptions, CaptureOutcome};
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves each canned response to one connection, in order.
    async fn serve(responses: Vec<Vec<u8>>) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            for response in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = vec![0u8; 8192];
                let _ = socket.read(&mut buf).await;
                socket.write_all(&response).await.unwrap();
                let _ = socket.shutdown().await;
            }
        });
        addr
    }

    fn ok_response(body: &str, extra: &str) -> Vec<u8> {
        format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nServer: canned\r\nConnection: close\r\n{}Content-Length: {}\r\n\r\n{}",
            extra,
            body.len(),
            body
        )
        .into_bytes()
    }

    fn redirect_response(location: &str) -> Vec<u8> {
        format!(
            "HTTP/1.1 302 Found\r\nLocation: {}\r\nConnection: close\r\nContent-Length: 0\r\n\r\n",
            location
        )
        .into_bytes()
    }

    /// Announces 100 bytes, sends 5 and closes.
    fn truncated_response() -> Vec<u8> {
        b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\nhello".to_vec()
    }

    #[tokio::test]
    async fn test_single_request_saves_body() {
        let addr = serve(vec![ok_response("hello", "")]).await;
        let dir = tempfile::tempdir().unwrap();

        let url = parse_url(&format!("http://{}/downloads/file.txt", addr)).unwrap();
        let mut request = StatRequest::new(url);
        request.headers.set("X-Trace: 1").unwrap();
        request.capture = CaptureOptions {
            save_output: true,
            output_file: None,
            output_dir: Some(dir.path().to_path_buf()),
        };

        let report = execute_request(request, &Config::default(), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.hops.len(), 1);
        let hop = report.final_hop().unwrap();
        assert_eq!(hop.status, StatusCode::OK);
        assert_eq!(hop.remote_addr, Some(addr));
        assert!(hop.tls.is_none());

        let keys: Vec<&str> = hop.headers.iter().map(|h| h.key()).collect();
        assert_eq!(
            keys,
            vec!["Server", "Content-Length", "Content-Type", "Connection"]
        );

        let written = dir.path().join("file.txt");
        assert_eq!(
            report.capture.unwrap(),
            CaptureOutcome::Written(written.clone())
        );
        assert_eq!(std::fs::read_to_string(written).unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_follows_redirects() {
        let addr = serve(vec![redirect_response("/final"), ok_response("done", "")]).await;

        let url = parse_url(&format!("http://{}/start", addr)).unwrap();
        let mut request = StatRequest::new(url);
        request.follow_redirects = true;

        let report = execute_request(request, &Config::default(), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.hops.len(), 2);
        assert_eq!(report.hops[0].status, StatusCode::FOUND);
        assert_eq!(report.hops[1].status, StatusCode::OK);
        assert!(report.hops[1].url.ends_with("/final"));
        assert_eq!(report.capture.unwrap(), CaptureOutcome::Discarded);
    }

    #[tokio::test]
    async fn test_redirect_not_followed_skips_capture() {
        let addr = serve(vec![redirect_response("/final")]).await;

        let url = parse_url(&format!("http://{}/start", addr)).unwrap();
        let report = execute_request(
            StatRequest::new(url),
            &Config::default(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(report.hops.len(), 1);
        assert_eq!(report.capture.unwrap(), CaptureOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_too_many_redirects() {
        let addr = serve(vec![redirect_response("/again")]).await;

        let url = parse_url(&format!("http://{}/start", addr)).unwrap();
        let mut request = StatRequest::new(url);
        request.follow_redirects = true;
        let config = Config {
            max_redirects: 0,
            ..Config::default()
        };

        let err = execute_request(request, &config, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::TooManyRedirects(0)));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let url = parse_url("http://127.0.0.1:9/").unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = execute_request(StatRequest::new(url), &Config::default(), cancel)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "CANCELLED");
    }

    #[tokio::test]
    async fn test_truncated_body_is_a_copy_failure() {
        let addr = serve(vec![truncated_response()]).await;
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.bin");

        let url = parse_url(&format!("http://{}/data", addr)).unwrap();
        let mut request = StatRequest::new(url);
        request.capture.output_file = Some(target.clone());

        let report = execute_request(request, &Config::default(), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.final_hop().unwrap().status, StatusCode::OK);
        assert!(matches!(report.capture, Err(CaptureError::Copy { .. })));
        assert!(target.exists());
    }

    #[tokio::test]
    async fn test_truncated_body_discarded_quietly() {
        let addr = serve(vec![truncated_response()]).await;

        let url = parse_url(&format!("http://{}/data", addr)).unwrap();
        let report = execute_request(
            StatRequest::new(url),
            &Config::default(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(report.capture.unwrap(), CaptureOutcome::Discarded);
    }

    #[tokio::test]
    async fn test_non_text_location_is_rejected() {
        let mut response = b"HTTP/1.1 302 Found\r\nLocation: /caf".to_vec();
        response.push(0xff);
        response.extend_from_slice(b"\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        let addr = serve(vec![response]).await;

        let url = parse_url(&format!("http://{}/start", addr)).unwrap();
        let mut request = StatRequest::new(url);
        request.follow_redirects = true;

        let err = execute_request(request, &Config::default(), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidLocation { .. }));
    }

    #[test]
    fn test_switches_to_get() {
        assert!(switches_to_get(StatusCode::SEE_OTHER, &Method::POST));
        assert!(!switches_to_get(StatusCode::SEE_OTHER, &Method::HEAD));
        assert!(switches_to_get(StatusCode::FOUND, &Method::POST));
        assert!(!switches_to_get(StatusCode::FOUND, &Method::PUT));
        assert!(!switches_to_get(StatusCode::TEMPORARY_REDIRECT, &Method::POST));
    }

    #[test]
    fn test_dial_address_brackets_ipv6() {
        let url = parse_url("http://[::1]:8080/").unwrap();
        assert_eq!(dial_address(&url), "[::1]:8080");
        let url = parse_url("example.com").unwrap();
        assert_eq!(dial_address(&url), "example.com:443");
    }

    #[test]
    fn test_display_headers_are_canonical_and_sorted() {
        let mut headers = HeaderMap::new();
        headers.insert("transfer-encoding", HeaderValue::from_static("chunked"));
        headers.insert("date", HeaderValue::from_static("today"));
        headers.insert("server", HeaderValue::from_static("nginx"));

        let lines: Vec<String> = display_headers(&headers)
            .iter()
            .map(|h| h.to_string())
            .collect();
        assert_eq!(
            lines,
            vec!["Server: nginx", "Date: today", "Transfer-Encoding: chunked"]
        );
    }
}
