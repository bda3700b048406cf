//! The reqwest backend against a loopback HTTP server.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use client::{ClientConfig, ErrorKind, SiteClient, SiteCredential};

struct Captured {
    request_line: String,
    headers: Vec<(String, String)>,
}

fn read_request(stream: &mut TcpStream) -> Captured {
    let mut reader = BufReader::new(stream.try_clone().unwrap());
    let mut request_line = String::new();
    reader.read_line(&mut request_line).unwrap();
    let mut headers = Vec::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_ascii_lowercase(), value.trim().to_owned()));
        }
    }
    let length = headers
        .iter()
        .find(|(name, _)| name == "content-length")
        .and_then(|(_, value)| value.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = vec![0; length];
    reader.read_exact(&mut body).unwrap();
    Captured {
        request_line: request_line.trim_end().to_owned(),
        headers,
    }
}

fn serve_once(response: &'static str) -> (String, mpsc::Receiver<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}/", listener.local_addr().unwrap());
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let captured = read_request(&mut stream);
        sender.send(captured).unwrap();
        stream.write_all(response.as_bytes()).unwrap();
        stream.flush().unwrap();
    });
    (base, receiver)
}

#[test]
fn sends_key_headers_and_parses_json() {
    let (base, requests) = serve_once(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 24\r\nConnection: close\r\n\r\n{\"site_name\":\"Loopback\"}",
    );
    let client = SiteClient::new(&base, "loop-key").unwrap();

    let status = client.get_status().unwrap();

    assert_eq!(status.site_name.as_deref(), Some("Loopback"));
    let captured = requests.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(
        captured
            .request_line
            .starts_with("GET /wp-json/site-agent/v2/status"),
        "{}",
        captured.request_line
    );
    let header = |name: &str| {
        captured
            .headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    };
    assert_eq!(header("x-api-key").as_deref(), Some("loop-key"));
    assert_eq!(header("x-site-agent-key").as_deref(), Some("loop-key"));
    assert!(header("user-agent").is_some());
}

#[test]
fn silent_server_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}/", listener.local_addr().unwrap());
    thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let _ = read_request(&mut stream);
        thread::sleep(Duration::from_secs(5));
    });
    let config = ClientConfig::builder()
        .read_timeout(Duration::from_millis(300))
        .build()
        .unwrap();
    let credential = SiteCredential::new(&base, "loop-key").unwrap();
    let client = SiteClient::with_config(credential, config).unwrap();

    let error = client.get_status().unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Timeout);
    assert!(error.is_timeout_class());
}

#[test]
fn refused_connection_is_a_connection_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}/", listener.local_addr().unwrap());
    drop(listener);

    let error = SiteClient::new(&base, "loop-key")
        .unwrap()
        .get_status()
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::ConnectionFailed);
}
