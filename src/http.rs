use crate::catalog::image::normalize_drive_url;
use axum::{
    body::Body,
    http::{HeaderValue, StatusCode, header},
    response::Response,
};
use reqwest::{Client, Url};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

pub fn build_client() -> Client {
    let timeout = std::env::var("HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(15);
    let connect = std::env::var("HTTP_CONNECT_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(5);
    Client::builder()
        .timeout(Duration::from_secs(timeout))
        .connect_timeout(Duration::from_secs(connect))
        .user_agent(concat!("showroom-api/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| Client::new())
}

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("missing u")]
    MissingUrl,
    #[error("invalid image url: {0}")]
    InvalidUrl(String),
    #[error("host not allowed: {0}")]
    HostNotAllowed(String),
    #[error("image fetch error: {0}")]
    Upstream(String),
}

/// Same-origin pass-through for remote product images.
#[derive(Clone)]
pub struct ImageProxy {
    http: Client,
    allowlist: Vec<String>,
}

impl ImageProxy {
    pub fn new(http: Client, allowlist: Vec<String>) -> Self {
        let allowlist = allowlist
            .into_iter()
            .map(|host| host.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|host| !host.is_empty())
            .collect();
        Self { http, allowlist }
    }

    /// Validates the requested URL and rewrites shared-drive links.
    pub fn target(&self, raw: Option<&str>) -> Result<Url, ProxyError> {
        let raw = raw.map(str::trim).filter(|u| !u.is_empty());
        let raw = raw.ok_or(ProxyError::MissingUrl)?;
        let url = Url::parse(&normalize_drive_url(raw))
            .map_err(|err| ProxyError::InvalidUrl(err.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ProxyError::InvalidUrl(format!("unsupported scheme {}", url.scheme())));
        }
        let host = url
            .host_str()
            .ok_or_else(|| ProxyError::InvalidUrl("missing host".into()))?
            .to_ascii_lowercase();
        if !self.allows(&host) {
            return Err(ProxyError::HostNotAllowed(host));
        }
        Ok(url)
    }

    fn allows(&self, host: &str) -> bool {
        self.allowlist.is_empty()
            || self.allowlist.iter().any(|allowed| {
                host == allowed
                    || host
                        .strip_suffix(allowed.as_str())
                        .is_some_and(|prefix| prefix.ends_with('.'))
            })
    }

    /// Streams the upstream body with its content type.
    pub async fn fetch(&self, raw: Option<&str>) -> Result<Response, ProxyError> {
        let url = self.target(raw)?;
        let upstream = self
            .http
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "image/*")
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|err| {
                warn!(target = "showroom.api", url = %url, error = %err, "image proxy upstream failed");
                ProxyError::Upstream(err.to_string())
            })?;

        let content_type = upstream
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| HeaderValue::from_str(v).ok())
            .unwrap_or_else(|| HeaderValue::from_static("image/jpeg"));

        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        *response.status_mut() = StatusCode::OK;
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, content_type);
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proxy(allow: &[&str]) -> ImageProxy {
        ImageProxy::new(
            Client::new(),
            allow.iter().map(|host| host.to_string()).collect(),
        )
    }

    #[test]
    fn missing_and_non_http_urls_are_rejected() {
        let open = proxy(&[]);
        assert!(matches!(open.target(None), Err(ProxyError::MissingUrl)));
        assert!(matches!(open.target(Some("  ")), Err(ProxyError::MissingUrl)));
        assert!(matches!(
            open.target(Some("file:///etc/passwd")),
            Err(ProxyError::InvalidUrl(_))
        ));
        assert!(matches!(
            open.target(Some("not a url")),
            Err(ProxyError::InvalidUrl(_))
        ));
    }

    #[test]
    fn drive_links_are_rewritten() {
        let url = proxy(&[])
            .target(Some("https://drive.google.com/file/d/abc123/view?usp=sharing"))
            .unwrap();
        assert_eq!(url.as_str(), "https://drive.google.com/uc?id=abc123");
    }

    #[test]
    fn allowlist_matches_host_and_subdomains() {
        let limited = proxy(&["google.com", ".cloudinary.com"]);
        assert!(limited.target(Some("https://drive.google.com/uc?id=1")).is_ok());
        assert!(limited.target(Some("https://res.cloudinary.com/x.jpg")).is_ok());
        assert!(matches!(
            limited.target(Some("https://evilgoogle.com/x.jpg")),
            Err(ProxyError::HostNotAllowed(_))
        ));
    }
}
