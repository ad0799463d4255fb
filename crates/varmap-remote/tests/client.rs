//! Client tests against a throwaway local HTTP responder.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::mpsc;
use std::thread;

use serde_json::{Value, json};
use varmap_model::RowKey;
use varmap_remote::{RemoteClient, RemoteConfig, RemoteError};

/// Serve one canned response and hand back the raw request text.
fn serve_once(status: &str, body: &str) -> (String, mpsc::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let request = read_request(&mut stream);
        stream.write_all(response.as_bytes()).unwrap();
        stream.flush().unwrap();
        let _ = sender.send(request);
    });
    (base_url, receiver)
}

fn read_request(stream: &mut impl Read) -> String {
    let mut data = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let read = stream.read(&mut chunk).unwrap();
        if read == 0 {
            break;
        }
        data.extend_from_slice(&chunk[..read]);
        let text = String::from_utf8_lossy(&data).to_string();
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if data.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&data).to_string()
}

fn client(base_url: &str) -> RemoteClient {
    RemoteClient::new(RemoteConfig::new(base_url, "test-token")).unwrap()
}

fn request_body(request: &str) -> Value {
    let (_, body) = request.split_once("\r\n\r\n").unwrap();
    serde_json::from_str(body).unwrap()
}

#[test]
fn health_sends_auth_and_client_headers() {
    let (base_url, request) = serve_once("200 OK", r#"{"status":"ok"}"#);
    let body = client(&base_url).health().unwrap();
    assert_eq!(body, json!({"status": "ok"}));

    let request = request.recv().unwrap().to_lowercase();
    assert!(request.starts_with("get /health "));
    assert!(request.contains("authorization: bearer test-token"));
    assert!(request.contains("x-client-id: varmap-cli"));
    assert!(request.contains("accept: application/json"));
}

#[test]
fn pull_reads_wrapped_rows_and_project_query() {
    let (base_url, request) = serve_once(
        "200 OK",
        r#"{"rows":[{"Variable":"Heart Rate","Organ System":"Cardiology","Group":"Heart","row_key":"00aa11bb22"},{"Variable":"Lactate"}]}"#,
    );
    let rows = client(&base_url).pull("icu study").unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].key.as_ref().map(RowKey::as_str), Some("00aa11bb22"));
    assert!(rows[1].key.is_some());

    let request = request.recv().unwrap();
    assert!(request.starts_with("GET /v1/mappings?project_id=icu+study "));
}

#[test]
fn pull_with_unexpected_shape_has_no_rows() {
    let (base_url, _request) = serve_once("200 OK", r#"{"items":[]}"#);
    assert!(client(&base_url).pull("p1").unwrap().is_empty());
}

#[test]
fn error_status_carries_status_and_body() {
    let (base_url, _request) = serve_once("403 Forbidden", r#"{"detail":"bad token"}"#);
    let err = client(&base_url).pull("p1").unwrap_err();
    assert_eq!(err.status(), Some(403));
    match err {
        RemoteError::Http { body, .. } => assert!(body.contains("bad token")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn empty_success_body_is_an_empty_object() {
    let (base_url, request) = serve_once("200 OK", "");
    let key = RowKey::parse("0123456789").unwrap();
    let result = client(&base_url).delete("p1", &[key]).unwrap();
    assert_eq!(result, json!({}));

    let request = request.recv().unwrap();
    assert!(request.starts_with("POST /v1/mappings:delete "));
    assert_eq!(
        request_body(&request),
        json!({"project_id": "p1", "client_id": "varmap-cli", "row_keys": ["0123456789"]})
    );
}

#[test]
fn upsert_posts_rows_with_dry_run_flag() {
    let (base_url, request) = serve_once("200 OK", r#"{"would_upsert":1}"#);
    let rows = varmap_remote::rows_from_response(&json!([{"Variable": "Lactate", "row_key": "abcabcabca"}]));
    let result = client(&base_url).upsert("p1", &rows, true).unwrap();
    assert_eq!(result["would_upsert"], 1);

    let body = request_body(&request.recv().unwrap());
    assert_eq!(body["dry_run"], true);
    assert_eq!(body["project_id"], "p1");
    assert_eq!(body["rows"][0]["row_key"], "abcabcabca");
    assert_eq!(body["rows"][0]["Variable"], "Lactate");
}

#[test]
fn unreachable_backend_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    let err = client(&base_url).health().unwrap_err();
    assert!(matches!(err, RemoteError::Transport(_)));
    assert!(err.is_retryable());
}
