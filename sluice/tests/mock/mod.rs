//! Minimal in-process stand-in for a database HTTP endpoint.
//!
//! Accepts connections on an ephemeral port, records each request and answers
//! with a fixed status. Uses `std::net::TcpListener` only.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// A request as seen by the mock endpoint.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    /// Path including the query string.
    pub target: String,
    /// Header names are lowercased.
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// How the endpoint answers.
#[derive(Debug, Clone, Copy)]
enum Reply {
    Status(u16, &'static str),
    Silence(Duration),
}

pub struct MockEndpoint {
    pub base_url: String,
    requests: mpsc::Receiver<CapturedRequest>,
}

impl MockEndpoint {
    /// Serves `count` requests, answering each with `status` and `body`.
    pub fn start(status: u16, body: &'static str, count: usize) -> Self {
        Self::spawn(Reply::Status(status, body), count)
    }

    /// Accepts one request and never answers within `hold`.
    pub fn silent(hold: Duration) -> Self {
        Self::spawn(Reply::Silence(hold), 1)
    }

    fn spawn(reply: Reply, count: usize) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            for _ in 0..count {
                let Ok((stream, _)) = listener.accept() else {
                    return;
                };
                let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
                let Ok(request) = read_request(&stream) else {
                    continue;
                };
                let _ = tx.send(request);

                match reply {
                    Reply::Status(status, body) => {
                        let _ = send_response(&stream, status, body);
                    }
                    Reply::Silence(hold) => thread::sleep(hold),
                }
            }
        });

        Self {
            base_url: format!("http://{addr}"),
            requests: rx,
        }
    }

    /// Returns the next recorded request.
    pub fn next_request(&self) -> CapturedRequest {
        self.requests
            .recv_timeout(Duration::from_secs(5))
            .expect("mock endpoint received no request")
    }
}

/// Returns a base URL on which nothing is listening.
pub fn closed_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

fn read_request(stream: &TcpStream) -> std::io::Result<CapturedRequest> {
    let mut reader = BufReader::new(stream);

    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default().to_string();

    let mut headers = HashMap::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line)?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    let length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let mut body = vec![0u8; length];
    reader.read_exact(&mut body)?;

    Ok(CapturedRequest {
        method,
        target,
        headers,
        body,
    })
}

fn send_response(mut stream: &TcpStream, status: u16, body: &str) -> std::io::Result<()> {
    let status_text = match status {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    };

    if status == 204 {
        write!(
            stream,
            "HTTP/1.1 204 {status_text}\r\n\
             Connection: close\r\n\
             \r\n"
        )?;
    } else {
        write!(
            stream,
            "HTTP/1.1 {status} {status_text}\r\n\
             Content-Type: text/plain\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\
             \r\n\
             {body}",
            body.len(),
        )?;
    }
    stream.flush()
}
