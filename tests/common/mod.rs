// tests/common/mod.rs

//! In-process scripted HTTP stub standing in for a package registry.
//!
//! Each scripted entry answers exactly one request, in order, on its own
//! connection (`Connection: close`), so a retry loop shows up as one
//! accepted connection per attempt. Request heads are captured for header
//! assertions.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub struct StubRegistry {
    pub url: String,
    requests: Arc<AtomicUsize>,
    heads: Arc<Mutex<Vec<String>>>,
}

impl StubRegistry {
    /// Start a stub that serves the scripted (status, body) responses in order
    pub fn start(script: Vec<(u16, &'static str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub registry");
        let url = format!("http://{}", listener.local_addr().unwrap());

        let requests = Arc::new(AtomicUsize::new(0));
        let heads = Arc::new(Mutex::new(Vec::new()));

        let thread_requests = Arc::clone(&requests);
        let thread_heads = Arc::clone(&heads);
        std::thread::spawn(move || {
            for (status, body) in script {
                let Ok((stream, _)) = listener.accept() else {
                    return;
                };
                thread_requests.fetch_add(1, Ordering::SeqCst);
                if let Some(head) = serve_one(stream, status, body) {
                    thread_heads.lock().unwrap().push(head);
                }
            }
        });

        Self {
            url,
            requests,
            heads,
        }
    }

    /// Number of requests the stub has answered so far
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Captured request lines + headers, one string per request
    pub fn captured_heads(&self) -> Vec<String> {
        self.heads.lock().unwrap().clone()
    }
}

/// Read one full HTTP request from the stream and answer it
fn serve_one(mut stream: TcpStream, status: u16, body: &str) -> Option<String> {
    // Read until the end of the header block.
    let mut raw = Vec::new();
    let mut buf = [0u8; 1024];
    let header_end = loop {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            return None;
        }
        raw.extend_from_slice(&buf[..n]);
        if let Some(pos) = find_header_end(&raw) {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&raw[..header_end]).into_owned();

    // Drain the request body so the client never sees a reset mid-upload.
    let content_length = head
        .lines()
        .find_map(|l| l.to_ascii_lowercase().strip_prefix("content-length:").map(str::trim).map(String::from))
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut remaining = content_length.saturating_sub(raw.len() - (header_end + 4));
    while remaining > 0 {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            break;
        }
        remaining = remaining.saturating_sub(n);
    }

    let response = format!(
        "HTTP/1.1 {status} Stub\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).ok()?;
    stream.flush().ok()?;

    Some(head)
}

fn find_header_end(raw: &[u8]) -> Option<usize> {
    raw.windows(4).position(|w| w == b"\r\n\r\n")
}
