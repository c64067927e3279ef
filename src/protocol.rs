//! HTTP client for the camera's CGI control interface.

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HOST, USER_AGENT};

use crate::config::CameraConfig;
use crate::error::{Error, Result};

/// User agent the camera firmware expects.
pub const CAMERA_USER_AGENT: &str = "OlympusCameraKit";

/// Endpoint reporting the camera identity; the only one with a short timeout.
pub const IDENTITY_ENDPOINT: &str = "get_caminfo";

/// Endpoint reporting how the camera is connected.
pub const CONNECT_MODE_ENDPOINT: &str = "get_connectmode";

/// How a request path is framed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// A `<endpoint>.cgi` command or query.
    Command,
    /// A literal resource path on the camera.
    File,
}

/// Client for one camera at a fixed address.
#[derive(Debug, Clone)]
pub struct CameraClient {
    http: reqwest::Client,
    host: String,
    probe_timeout: Duration,
}

impl CameraClient {
    /// Creates a client for the camera described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &CameraConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(2)
            .build()?;
        Ok(Self {
            http,
            host: config.host.clone(),
            probe_timeout: config.probe_timeout,
        })
    }

    /// Returns the camera host this client talks to.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Builds the URL for an endpoint.
    fn url(&self, endpoint: &str, params: &[&str], kind: RequestKind) -> String {
        let query = if params.is_empty() {
            String::new()
        } else {
            format!("?{}", params.join("&"))
        };
        match kind {
            RequestKind::Command => format!("http://{}/{endpoint}.cgi{query}", self.host),
            RequestKind::File => format!("http://{}/{endpoint}{query}", self.host),
        }
    }

    /// Issues a GET against the camera and returns the response.
    ///
    /// Only the identity probe is bounded by a timeout; everything else waits
    /// as long as the camera takes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] on transport failure or a non-success status.
    pub async fn query(
        &self,
        endpoint: &str,
        params: &[&str],
        kind: RequestKind,
    ) -> Result<reqwest::Response> {
        let url = self.url(endpoint, params, kind);
        let mut request = self
            .http
            .get(&url)
            .header(USER_AGENT, CAMERA_USER_AGENT)
            .header(HOST, &self.host);
        if kind == RequestKind::Command && endpoint == IDENTITY_ENDPOINT {
            request = request.timeout(self.probe_timeout);
        }

        let response = request.send().await.inspect_err(|e| {
            log::debug!("Request to {url} failed: {e}");
        })?;
        Ok(response.error_for_status()?)
    }

    /// Queries an endpoint and evaluates an absolute element path on the XML body.
    ///
    /// A well-formed body lacking the element yields an empty string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] on transport failure and [`Error::Protocol`]
    /// if the body is not well-formed XML.
    pub async fn query_scalar(&self, endpoint: &str, path: &str) -> Result<String> {
        let body = self
            .query(endpoint, &[], RequestKind::Command)
            .await?
            .text()
            .await?;
        let value = xml_value(&body, path)?;
        log::debug!("{endpoint} {path} = {value:?}");
        Ok(value)
    }

    /// Fires a command and discards the response.
    ///
    /// Failures are logged, never returned.
    pub async fn execute(&self, command: &str, params: &[&str]) {
        match self.query(command, params, RequestKind::Command).await {
            Ok(_) => log::debug!("Executed {command} {params:?}"),
            Err(e) => log::warn!("Command {command} {params:?} failed: {e}"),
        }
    }

    /// Fetches the thumbnail for a file addressed by its camera path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] on transport failure.
    pub async fn fetch_thumbnail(&self, camera_path: &str) -> Result<Bytes> {
        let dir = format!("DIR={camera_path}");
        let response = self
            .query("get_thumbnail", &[&dir], RequestKind::Command)
            .await?;
        Ok(response.bytes().await?)
    }
}

/// Evaluates an absolute element path such as `/caminfo/model` on an XML document.
///
/// Returns the trimmed text content of the first matching element, or an
/// empty string when no element matches.
///
/// # Errors
///
/// Returns [`Error::Protocol`] if the document is not well-formed.
pub fn xml_value(document: &str, path: &str) -> Result<String> {
    let doc = roxmltree::Document::parse(document)
        .map_err(|e| Error::Protocol(format!("malformed XML: {e}")))?;

    let mut segments = path.split('/').filter(|s| !s.is_empty());
    let root = doc.root_element();
    if segments.next() != Some(root.tag_name().name()) {
        return Ok(String::new());
    }

    let mut node = root;
    for segment in segments {
        match node
            .children()
            .find(|n| n.is_element() && n.tag_name().name() == segment)
        {
            Some(child) => node = child,
            None => return Ok(String::new()),
        }
    }

    let text: String = node
        .descendants()
        .filter(roxmltree::Node::is_text)
        .filter_map(|n| n.text())
        .collect();
    Ok(text.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockCamera, Reply, dead_host};

    #[test]
    fn xml_value_finds_nested_element() {
        let doc = "<?xml version=\"1.0\"?><caminfo><model>E-M10MarkII</model></caminfo>";
        assert_eq!(xml_value(doc, "/caminfo/model").unwrap(), "E-M10MarkII");
    }

    #[test]
    fn xml_value_of_root() {
        let doc = "<connectmode>OPC</connectmode>";
        assert_eq!(xml_value(doc, "/connectmode").unwrap(), "OPC");
    }

    #[test]
    fn xml_value_missing_element_is_empty() {
        let doc = "<caminfo><serial>1234</serial></caminfo>";
        assert_eq!(xml_value(doc, "/caminfo/model").unwrap(), "");
        assert_eq!(xml_value(doc, "/other/model").unwrap(), "");
    }

    #[test]
    fn xml_value_rejects_malformed() {
        assert!(matches!(
            xml_value("<caminfo><model>", "/caminfo/model"),
            Err(Error::Protocol(_))
        ));
        assert!(matches!(
            xml_value("not xml at all", "/caminfo/model"),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn urls_are_framed_by_kind() {
        let client = CameraClient::new(&CameraConfig::default()).unwrap();
        assert_eq!(
            client.url("get_imglist", &["DIR=/DCIM/100OLYMP"], RequestKind::Command),
            "http://192.168.0.10/get_imglist.cgi?DIR=/DCIM/100OLYMP"
        );
        assert_eq!(
            client.url("get_caminfo", &[], RequestKind::Command),
            "http://192.168.0.10/get_caminfo.cgi"
        );
        assert_eq!(
            client.url("DCIM/100OLYMP/P1010001.JPG", &[], RequestKind::File),
            "http://192.168.0.10/DCIM/100OLYMP/P1010001.JPG"
        );
        assert_eq!(
            client.url("get_resizeimg", &["DIR=/a/b.JPG", "size=2048"], RequestKind::Command),
            "http://192.168.0.10/get_resizeimg.cgi?DIR=/a/b.JPG&size=2048"
        );
    }

    #[tokio::test]
    async fn query_scalar_reads_model_and_sends_fixed_headers() {
        let camera = MockCamera::start().await;
        camera.set_caminfo(Reply::xml("<caminfo><model>E-M5</model></caminfo>"));

        let client = CameraClient::new(&camera.config()).unwrap();
        let model = client.query_scalar(IDENTITY_ENDPOINT, "/caminfo/model").await.unwrap();
        assert_eq!(model, "E-M5");

        let request = camera.requests().pop().unwrap();
        assert_eq!(request.target, "/get_caminfo.cgi");
        assert_eq!(request.user_agent, CAMERA_USER_AGENT);
        assert_eq!(request.host, camera.host());
    }

    #[tokio::test]
    async fn query_scalar_malformed_body_is_protocol_error() {
        let camera = MockCamera::start().await;
        camera.set_caminfo(Reply::xml("<caminfo><model>"));

        let client = CameraClient::new(&camera.config()).unwrap();
        let result = client.query_scalar(IDENTITY_ENDPOINT, "/caminfo/model").await;
        assert!(matches!(result, Err(Error::Protocol(_))));
    }

    #[tokio::test]
    async fn identity_probe_times_out() {
        let camera = MockCamera::start().await;
        camera.set_caminfo(
            Reply::xml("<caminfo><model>E-M5</model></caminfo>")
                .delayed(Duration::from_secs(5)),
        );

        let config = camera.config().with_probe_timeout(Duration::from_millis(200));
        let client = CameraClient::new(&config).unwrap();
        let started = std::time::Instant::now();
        let result = client.query_scalar(IDENTITY_ENDPOINT, "/caminfo/model").await;
        assert!(matches!(result, Err(Error::Network(_))));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn query_maps_error_status_to_network_error() {
        let camera = MockCamera::start().await;
        let client = CameraClient::new(&camera.config()).unwrap();
        let result = client
            .query("DCIM/100OLYMP/MISSING.JPG", &[], RequestKind::File)
            .await;
        assert!(matches!(result, Err(Error::Network(_))));
    }

    #[tokio::test]
    async fn execute_swallows_transport_errors() {
        let config = CameraConfig::default().with_host(dead_host().await);
        let client = CameraClient::new(&config).unwrap();
        client.execute("exec_pwoff", &[]).await;
    }

    #[tokio::test]
    async fn execute_sends_params() {
        let camera = MockCamera::start().await;
        let client = CameraClient::new(&camera.config()).unwrap();
        client.execute("switch_commpath", &["path=wifi"]).await;
        assert!(camera.saw("/switch_commpath.cgi?path=wifi"));
    }

    #[tokio::test]
    async fn fetch_thumbnail_returns_bytes() {
        let camera = MockCamera::start().await;
        camera.set_thumbnail(b"thumb".to_vec());
        let client = CameraClient::new(&camera.config()).unwrap();
        let bytes = client
            .fetch_thumbnail("/DCIM/100OLYMP/P1010001.JPG")
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"thumb");
        assert!(camera.saw("/get_thumbnail.cgi?DIR=/DCIM/100OLYMP/P1010001.JPG"));
    }
}
