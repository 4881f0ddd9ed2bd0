//! Shared helpers for integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pingwatch::{ProbeError, ProbeOutcome, Prober, Region, RegionRegistry};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// How the test server answers every request
#[derive(Debug, Clone, Copy)]
pub enum Reply {
    Status(u16),
    Delayed(Duration, u16),
    /// Answers HEAD at once and delays every other method
    SlowContent(Duration, u16),
    RedirectLoop,
}

/// Minimal HTTP/1.1 server recording the method of each request
pub struct TestServer {
    pub addr: SocketAddr,
    methods: Arc<Mutex<Vec<String>>>,
}

impl TestServer {
    pub async fn spawn(reply: Reply) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let methods = Arc::new(Mutex::new(Vec::new()));

        let seen = Arc::clone(&methods);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let seen = Arc::clone(&seen);
                tokio::spawn(async move { handle(stream, reply, seen).await });
            }
        });

        Self { addr, methods }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn methods(&self) -> Vec<String> {
        self.methods.lock().unwrap().clone()
    }
}

async fn handle(mut stream: TcpStream, reply: Reply, seen: Arc<Mutex<Vec<String>>>) {
    let mut request = Vec::new();
    let mut chunk = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => request.extend_from_slice(&chunk[..n]),
        }
    }

    let head = String::from_utf8_lossy(&request).to_string();
    let mut parts = head.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or("/").to_string();
    seen.lock().unwrap().push(method.clone());

    let body = if method == "HEAD" { "" } else { "pong" };
    let response = match reply {
        Reply::RedirectLoop => format!(
            "HTTP/1.1 302 Found\r\nLocation: {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            path
        ),
        Reply::Status(code) | Reply::Delayed(_, code) | Reply::SlowContent(_, code) => {
            match reply {
                Reply::Delayed(delay, _) => tokio::time::sleep(delay).await,
                Reply::SlowContent(delay, _) if method != "HEAD" => tokio::time::sleep(delay).await,
                _ => {}
            }
            format!(
                "HTTP/1.1 {} Test\r\nContent-Length: 4\r\nConnection: close\r\n\r\n{}",
                code, body
            )
        }
    };

    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

/// Address nothing is listening on
pub fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/", addr)
}

/// Prober answering from a script; unknown endpoints fail
#[derive(Default)]
pub struct ScriptedProber {
    latencies: HashMap<String, f64>,
    probed: Mutex<Vec<String>>,
}

impl ScriptedProber {
    pub fn new(script: &[(&str, f64)]) -> Self {
        Self {
            latencies: script.iter().map(|(e, ms)| (e.to_string(), *ms)).collect(),
            probed: Mutex::new(Vec::new()),
        }
    }

    pub fn probed(&self) -> Vec<String> {
        self.probed.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, endpoint: &str, _timeout: Duration) -> ProbeOutcome {
        self.probed.lock().unwrap().push(endpoint.to_string());
        let outcome = ProbeOutcome::new(endpoint);
        match self.latencies.get(endpoint) {
            Some(ms) => outcome.succeeded(*ms, 200),
            None => outcome.failed(ProbeError::ConnectionFailed),
        }
    }
}

pub fn urls(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// NA with three endpoints, EUW with two
pub fn test_registry() -> RegionRegistry {
    RegionRegistry::from_table(
        vec![
            (Region::Na, urls(&["http://na.test/a", "http://na.test/b", "http://na.test/c"])),
            (Region::Euw, urls(&["http://euw.test/a", "http://euw.test/b"])),
        ],
        Region::Na,
    )
    .unwrap()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt::try_init();
}
