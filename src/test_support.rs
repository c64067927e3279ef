//! In-process stand-in for the camera's HTTP server, used by the unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;

use crate::config::CameraConfig;

/// A canned answer for one endpoint.
#[derive(Debug, Clone)]
pub enum Reply {
    /// A complete body.
    Body {
        content_type: String,
        body: Vec<u8>,
        delay: Duration,
    },
    /// Sends `prefix`, then aborts the connection.
    Broken { prefix: Vec<u8> },
    /// A bare status code.
    Status(u16),
}

impl Reply {
    pub fn xml(body: &str) -> Self {
        Self::Body {
            content_type: "text/xml".to_string(),
            body: body.as_bytes().to_vec(),
            delay: Duration::ZERO,
        }
    }

    pub fn text(body: &str) -> Self {
        Self::Body {
            content_type: "text/plain".to_string(),
            body: body.as_bytes().to_vec(),
            delay: Duration::ZERO,
        }
    }

    pub fn with_content_type(body: &str, content_type: &str) -> Self {
        Self::Body {
            content_type: content_type.to_string(),
            body: body.as_bytes().to_vec(),
            delay: Duration::ZERO,
        }
    }

    pub fn bytes(body: &[u8]) -> Self {
        Self::Body {
            content_type: "application/octet-stream".to_string(),
            body: body.to_vec(),
            delay: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn delayed(self, by: Duration) -> Self {
        match self {
            Self::Body {
                content_type, body, ..
            } => Self::Body {
                content_type,
                body,
                delay: by,
            },
            other => other,
        }
    }

    async fn respond(self) -> Response {
        match self {
            Self::Body {
                content_type,
                body,
                delay,
            } => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], body).into_response()
            }
            Self::Broken { prefix } => {
                let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
                    Ok(Bytes::from(prefix)),
                    Err(std::io::Error::other("connection cut")),
                ];
                Response::new(Body::from_stream(futures::stream::iter(chunks)))
            }
            Self::Status(code) => StatusCode::from_u16(code)
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
                .into_response(),
        }
    }
}

/// One request as seen by the mock camera.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    /// Path plus query string.
    pub target: String,
    pub user_agent: String,
    pub host: String,
}

#[derive(Default)]
struct MockState {
    caminfo: Mutex<Option<Reply>>,
    connectmode: Mutex<Option<Reply>>,
    imglist: Mutex<Option<Reply>>,
    thumbnail: Mutex<Option<Reply>>,
    /// Raw files keyed by absolute camera path.
    files: Mutex<HashMap<String, Reply>>,
    /// Resized variants keyed by absolute camera path.
    resized: Mutex<HashMap<String, Reply>>,
    seen: Mutex<Vec<SeenRequest>>,
}

fn dir_param(uri: &Uri) -> Option<String> {
    uri.query()?
        .split('&')
        .find_map(|p| p.strip_prefix("DIR="))
        .map(str::to_string)
}

async fn handle(State(state): State<Arc<MockState>>, uri: Uri, headers: HeaderMap) -> Response {
    let header_str = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };
    state.seen.lock().unwrap().push(SeenRequest {
        target: uri
            .path_and_query()
            .map_or_else(|| uri.path().to_string(), ToString::to_string),
        user_agent: header_str(header::USER_AGENT),
        host: header_str(header::HOST),
    });

    let reply = match uri.path() {
        "/get_caminfo.cgi" => state.caminfo.lock().unwrap().clone(),
        "/get_connectmode.cgi" => state.connectmode.lock().unwrap().clone(),
        "/get_imglist.cgi" => state.imglist.lock().unwrap().clone(),
        "/get_thumbnail.cgi" => state.thumbnail.lock().unwrap().clone(),
        "/get_resizeimg.cgi" => dir_param(&uri)
            .and_then(|dir| state.resized.lock().unwrap().get(&dir).cloned()),
        path if path.ends_with(".cgi") => Some(Reply::text("")),
        path => state.files.lock().unwrap().get(path).cloned(),
    };
    reply.unwrap_or(Reply::Status(404)).respond().await
}

/// A running mock camera bound to a random local port.
pub struct MockCamera {
    host: String,
    state: Arc<MockState>,
}

impl MockCamera {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let app = Router::new()
            .fallback(handle)
            .with_state(Arc::clone(&state));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let host = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self { host, state }
    }

    pub fn host(&self) -> String {
        self.host.clone()
    }

    /// Camera configuration pointing at this mock with a short poll interval.
    pub fn config(&self) -> CameraConfig {
        CameraConfig::default()
            .with_host(self.host.clone())
            .with_poll_interval(Duration::from_millis(50))
            .with_reconnect_delay(Duration::from_millis(10))
    }

    pub fn set_caminfo(&self, reply: Reply) {
        *self.state.caminfo.lock().unwrap() = Some(reply);
    }

    pub fn set_model(&self, model: &str) {
        self.set_caminfo(Reply::xml(&format!(
            "<?xml version=\"1.0\"?><caminfo><model>{model}</model></caminfo>"
        )));
    }

    pub fn set_connect_mode(&self, mode: &str) {
        self.set_connect_mode_reply(Reply::xml(&format!(
            "<?xml version=\"1.0\"?><connectmode>{mode}</connectmode>"
        )));
    }

    pub fn set_connect_mode_reply(&self, reply: Reply) {
        *self.state.connectmode.lock().unwrap() = Some(reply);
    }

    pub fn set_listing(&self, reply: Reply) {
        *self.state.imglist.lock().unwrap() = Some(reply);
    }

    pub fn set_thumbnail(&self, body: Vec<u8>) {
        *self.state.thumbnail.lock().unwrap() = Some(Reply::bytes(&body));
    }

    pub fn add_file(&self, camera_path: &str, reply: Reply) {
        self.state
            .files
            .lock()
            .unwrap()
            .insert(camera_path.to_string(), reply);
    }

    pub fn add_resized(&self, camera_path: &str, reply: Reply) {
        self.state
            .resized
            .lock()
            .unwrap()
            .insert(camera_path.to_string(), reply);
    }

    pub fn requests(&self) -> Vec<SeenRequest> {
        self.state.seen.lock().unwrap().clone()
    }

    /// Request targets in arrival order.
    pub fn targets(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.target).collect()
    }

    pub fn saw(&self, target: &str) -> bool {
        self.targets().iter().any(|t| t == target)
    }

    pub fn count(&self, target: &str) -> usize {
        self.targets().iter().filter(|t| *t == target).count()
    }
}

/// Returns a host on which nothing is listening.
pub async fn dead_host() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let host = listener.local_addr().unwrap().to_string();
    drop(listener);
    host
}

/// A mock file system mapping paths to file sizes.
pub struct MockFileSystem {
    files: Mutex<HashMap<std::path::PathBuf, u64>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
        }
    }

    pub fn add_file(&self, path: impl Into<std::path::PathBuf>, size: u64) {
        self.files.lock().unwrap().insert(path.into(), size);
    }
}

#[async_trait::async_trait]
impl crate::fs::FileSystem for MockFileSystem {
    async fn probe(&self, path: &std::path::Path) -> crate::fs::PathKind {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .copied()
            .map_or(crate::fs::PathKind::Missing, crate::fs::PathKind::File)
    }

    async fn create_dir_all(&self, _path: &std::path::Path) -> std::io::Result<()> {
        Ok(())
    }

    async fn create_file(&self, _path: &std::path::Path) -> std::io::Result<tokio::fs::File> {
        Err(std::io::Error::new(std::io::ErrorKind::Unsupported, "mock"))
    }

    async fn remove_file(&self, _path: &std::path::Path) -> std::io::Result<()> {
        Ok(())
    }
}

/// Polls `check` until it holds, failing the test after two seconds.
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 2s");
}
