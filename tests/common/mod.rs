//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

use mirror_check::manifest::{Geolocation, MirrorDescriptor, ProtocolType};

/// A request as seen by a mock backend.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub headers: Vec<(String, String)>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

pub type RequestLog = Arc<Mutex<Vec<RecordedRequest>>>;

/// Start a programmable mock backend on an ephemeral port.
///
/// `f` receives the request path and decides the status and body; it may
/// sleep to simulate a slow mirror.
pub async fn start_programmable_backend<F, Fut>(f: F) -> (SocketAddr, RequestLog)
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let log: RequestLog = Arc::new(Mutex::new(Vec::new()));
    let f = Arc::new(f);

    let requests = log.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let f = f.clone();
                    let requests = requests.clone();
                    tokio::spawn(async move {
                        let (read_half, mut write_half) = socket.into_split();
                        let mut reader = BufReader::new(read_half);

                        let mut request_line = String::new();
                        if reader.read_line(&mut request_line).await.is_err() {
                            return;
                        }
                        let path = request_line
                            .split_whitespace()
                            .nth(1)
                            .unwrap_or("/")
                            .to_string();

                        let mut headers = Vec::new();
                        loop {
                            let mut line = String::new();
                            match reader.read_line(&mut line).await {
                                Ok(0) | Err(_) => break,
                                Ok(_) => {}
                            }
                            let line = line.trim_end();
                            if line.is_empty() {
                                break;
                            }
                            if let Some((name, value)) = line.split_once(':') {
                                headers.push((name.trim().to_string(), value.trim().to_string()));
                            }
                        }

                        requests.lock().unwrap().push(RecordedRequest {
                            path: path.clone(),
                            headers,
                        });

                        let (status, body) = f(path).await;
                        let status_text = match status {
                            200 => "200 OK",
                            204 => "204 No Content",
                            301 => "301 Moved Permanently",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "500 Internal Server Error",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = write_half.write_all(response_str.as_bytes()).await;
                        let _ = write_half.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, log)
}

/// Start a backend that answers every request with 200 and `body`.
pub async fn start_mock_backend(body: &'static str) -> (SocketAddr, RequestLog) {
    start_programmable_backend(move |_| async move { (200, body.to_string()) }).await
}

/// Log output captured by a scoped subscriber.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    /// A subscriber writing plain-text events into this buffer.
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync {
        let logs = self.clone();
        tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(move || logs.clone())
            .finish()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

pub fn paths(log: &RequestLog) -> Vec<String> {
    log.lock().unwrap().iter().map(|r| r.path.clone()).collect()
}

pub fn mirror(name: &str, urls: &[(ProtocolType, String)]) -> MirrorDescriptor {
    MirrorDescriptor {
        name: name.to_string(),
        update_frequency: "1h".to_string(),
        sponsor_name: "Example".to_string(),
        sponsor_url: "https://example.com".to_string(),
        email: "unknown".to_string(),
        urls: urls.to_vec(),
        subnets: Vec::new(),
        asn: None,
        cloud_type: String::new(),
        cloud_region: String::new(),
        geolocation: Geolocation::default(),
        private: false,
    }
}

pub fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

/// A valid global manifest with one version, two repos and http(s) required.
pub fn manifest_yaml(mirrors_dir: &Path) -> String {
    format!(
        r#"---
allowed_outdate: "12 hours"
mirrors_dir: "{}"
versions:
  - 9
duplicated_versions:
  9: "9.4"
arches:
  - x86_64
  - aarch64
required_protocols:
  - https
  - http
repos:
  - name: baseos
    path: "$basearch/baseos"
  - name: appstream
    path: "$basearch/appstream"
"#,
        mirrors_dir.display()
    )
}

/// A valid mirror descriptor serving `http_url`.
pub fn descriptor_yaml(name: &str, http_url: &str) -> String {
    format!(
        r#"---
name: {}
update_frequency: 3h
sponsor: Example Hosting
sponsor_url: https://hosting.example.com
email: mirrors@example.com
address:
  http: {}
  rsync: rsync://{}/almalinux
geolocation:
  continent: Europe
  country: DE
  city: Berlin
"#,
        name, http_url, name
    )
}
