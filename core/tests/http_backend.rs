//! HTTP scoring backend tests against a one-shot local stub server.

use riskdesk_core::{
    analysis::Provenance,
    backend::{encode_file_part, AcquisitionError, HttpScoringBackend, ScoringBackend},
    config::DeskConfig,
    session::{AcquisitionRequest, Notice, PublishOutcome, Session},
};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Body shaped like the scoring service's analyze response. The first id
/// is numeric, as a dataframe-backed scorer emits for numeric id columns.
const ANALYZE_RESPONSE: &str = r#"{
    "transactions": [
        {"id": 7,      "amount": 100.0, "riskScore": 82, "riskLevel": "Critical", "reasons": ["Large amount"]},
        {"id": "T001", "amount": 5.0,   "riskScore": 12, "riskLevel": "Low",      "reasons": ["Normal transaction"]}
    ],
    "statistics": {"totalTransactions": 2, "suspiciousCount": 1, "fraudRate": 50.0, "totalAtRisk": 100.0},
    "fraudComparison": [{"name": "Analysis", "fraudulent": 1, "normal": 1}]
}"#;

/// Accept one connection, reply with `status` and `body`, and hand back
/// the raw request (head and body) once the client is answered.
fn serve_once(status: &str, body: &str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let status = status.to_string();
    let body = body.to_string();

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let request = read_request(&mut stream);
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).unwrap();
        stream.flush().unwrap();
        request
    });
    (format!("http://{addr}/api"), handle)
}

fn read_request(stream: &mut TcpStream) -> String {
    let mut reader = BufReader::new(stream);
    let mut head = String::new();
    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap();
            }
        }
        head.push_str(&line);
        if line == "\r\n" || line.is_empty() {
            break;
        }
    }
    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).unwrap();
    head + &String::from_utf8(body).unwrap()
}

fn backend(base_url: &str) -> HttpScoringBackend {
    HttpScoringBackend::new(base_url, Duration::from_secs(5))
}

#[test]
fn analyze_posts_a_multipart_file_part() {
    let (base_url, server) = serve_once("200 OK", ANALYZE_RESPONSE);
    let content = "transaction_id,Amount,Time\n7,100,5\n";

    let analysis = backend(&base_url).analyze("batch.csv", content).unwrap();
    let request = server.join().unwrap();

    assert!(request.starts_with("POST /api/analyze "), "Unexpected request line: {request}");
    let lower = request.to_ascii_lowercase();
    let boundary = lower
        .lines()
        .find_map(|l| l.strip_prefix("content-type: multipart/form-data; boundary="))
        .expect("multipart content type with a boundary")
        .trim()
        .to_string();
    assert!(request.contains(&format!("--{boundary}\r\n")));
    assert!(request.contains(r#"Content-Disposition: form-data; name="file"; filename="batch.csv""#));
    assert!(request.contains(content));
    assert!(request.ends_with(&format!("--{boundary}--\r\n")));

    assert_eq!(analysis.transactions.len(), 2);
    assert_eq!(analysis.transactions[0].id, "7");
    assert_eq!(analysis.transactions[0].risk_score, 82);
    assert_eq!(analysis.transactions[1].id, "T001");
    assert_eq!(analysis.fraud_comparison.unwrap()[0].name, "Analysis");
}

#[test]
fn error_body_maps_to_status() {
    let (base_url, server) = serve_once("400 Bad Request", r#"{"error": "'Amount'"}"#);

    let err = backend(&base_url).analyze("batch.csv", "x\n1\n").unwrap_err();
    server.join().unwrap();

    assert_eq!(
        err,
        AcquisitionError::Status {
            status:  400,
            message: "'Amount'".to_string(),
        }
    );
}

#[test]
fn sample_is_a_plain_get() {
    let (base_url, server) = serve_once("200 OK", ANALYZE_RESPONSE);

    let analysis = backend(&base_url).sample().unwrap();
    let request = server.join().unwrap();

    assert!(request.starts_with("GET /api/sample-data "), "Unexpected request line: {request}");
    assert_eq!(analysis.transactions.len(), 2);
}

#[test]
fn non_json_success_body_is_malformed() {
    let (base_url, server) = serve_once("200 OK", "<html>oops</html>");

    let err = backend(&base_url).sample().unwrap_err();
    server.join().unwrap();
    assert!(matches!(err, AcquisitionError::Malformed(_)));
}

#[test]
fn live_upload_through_http_is_published_as_live() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (base_url, server) = serve_once("200 OK", ANALYZE_RESPONSE);
    let config = DeskConfig {
        scoring_url: Some(base_url),
        ..DeskConfig::default()
    };
    let session = Session::from_config(&config).unwrap();

    let outcome = session
        .acquire(AcquisitionRequest::Upload {
            file_name: "batch.csv".to_string(),
            content:   "transaction_id,Amount\n7,100\n".to_string(),
        })
        .unwrap();
    server.join().unwrap();

    match outcome {
        PublishOutcome::Published { analysis, notice } => {
            assert_eq!(notice, Notice::LiveAnalysis);
            assert_eq!(analysis.result.provenance, Provenance::Live);
            assert_eq!(analysis.result.statistics.suspicious_count, 1);
        }
        other => panic!("Expected a published live result, got {other:?}"),
    }
}

#[test]
fn file_part_frames_content_and_sanitises_name() {
    let body = encode_file_part("XYZ", "bad\"name\r\n.csv", "a,b\n1,2\n");

    assert!(body.starts_with("--XYZ\r\n"));
    assert!(body.contains(r#"filename="bad'name.csv""#));
    assert!(body.contains("\r\n\r\na,b\n1,2\n\r\n--XYZ--\r\n"));
}
