use crate::catalog::config::{CatalogConfig, CdnConfig};
use crate::catalog::normalize::normalize;
use once_cell::sync::Lazy;
use regex::Regex;

pub const PROXY_PATH: &str = "/img";

static MODEL_UNSAFE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_\-]+").expect("static regex"));

static DRIVE_ID_PATTERNS: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        Regex::new(r"/file/d/([^/?#]+)").expect("static regex"),
        Regex::new(r"/uc\?id=([^&#]+)").expect("static regex"),
        Regex::new(r"[?&]id=([^&#]+)").expect("static regex"),
    ]
});

const EMBEDDED_MARKERS: &[&str] = &["ver mas", "see more"];

/// Picks the image URL shown for a catalog product.
///
/// The CDN convention wins whenever it is configured. Otherwise the sheet
/// cell is used if it holds an absolute URL, rewritten to a direct download
/// for file-share links and routed through the same-origin proxy. Bare
/// integers and "see more" markers are what the sheet shows for pictures
/// embedded as objects, so they fall through to the placeholder.
pub fn resolve_image(model: &str, raw_cell: &str, config: &CatalogConfig) -> String {
    if let Some(cdn) = &config.cdn {
        return cdn_url(cdn, model);
    }

    let raw = raw_cell.trim();
    if raw.is_empty() || is_embedded_marker(raw) {
        return config.placeholder_image.clone();
    }

    let direct = normalize_drive_url(raw);
    if is_absolute_http(&direct) {
        return proxy_path(&direct);
    }
    config.placeholder_image.clone()
}

pub fn sanitize_model(model: &str) -> String {
    MODEL_UNSAFE.replace_all(model.trim(), "_").into_owned()
}

pub fn cdn_url(cdn: &CdnConfig, model: &str) -> String {
    let base = cdn.template.replace("{model}", &sanitize_model(model));
    match &cdn.version {
        Some(version) => append_query(&base, "v", version),
        None => base,
    }
}

/// Rewrites shared-drive links to their direct-content form; anything else is
/// returned trimmed and unchanged.
pub fn normalize_drive_url(url: &str) -> String {
    let trimmed = url.trim();
    if !is_drive_host(trimmed) {
        return trimmed.to_string();
    }
    DRIVE_ID_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(trimmed))
        .and_then(|caps| caps.get(1))
        .map(|id| format!("https://drive.google.com/uc?id={}", id.as_str()))
        .unwrap_or_else(|| trimmed.to_string())
}

pub fn proxy_path(url: &str) -> String {
    format!("{PROXY_PATH}?u={}", urlencoding::encode(url))
}

/// Recovers the upstream URL from a `/img?u=` proxy path.
pub fn proxied_target(path: &str) -> Option<String> {
    let query = path.strip_prefix(PROXY_PATH)?.strip_prefix('?')?;
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix("u="))
        .and_then(|encoded| urlencoding::decode(encoded).ok())
        .map(|decoded| decoded.into_owned())
        .filter(|decoded| !decoded.is_empty())
}

/// Adds the cache-busting version to absolute URLs that do not carry one.
pub fn with_version(url: &str, version: Option<&str>) -> String {
    match version {
        Some(version)
            if is_absolute_http(url) && !url.contains("?v=") && !url.contains("&v=") =>
        {
            append_query(url, "v", version)
        }
        _ => url.to_string(),
    }
}

pub fn is_absolute_http(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn is_embedded_marker(raw: &str) -> bool {
    if raw.chars().all(|ch| ch.is_ascii_digit()) {
        return true;
    }
    let normalized = normalize(raw);
    EMBEDDED_MARKERS.contains(&normalized.as_str())
}

fn is_drive_host(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.contains("drive.google.com") || lower.contains("docs.google.com")
}

fn append_query(url: &str, key: &str, value: &str) -> String {
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{url}{sep}{key}={}", urlencoding::encode(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CatalogConfig {
        CatalogConfig {
            placeholder_image: "https://placeholder.test/none.png".into(),
            ..CatalogConfig::default()
        }
    }

    fn cdn_config(version: Option<&str>) -> CatalogConfig {
        CatalogConfig {
            cdn: Some(CdnConfig {
                template: "https://cdn.test/showroom/{model}".into(),
                version: version.map(str::to_string),
            }),
            ..config()
        }
    }

    #[test]
    fn cdn_takes_precedence_over_sheet_url() {
        let cfg = cdn_config(None);
        let url = resolve_image("LX 100/B", "https://example.com/a.jpg", &cfg);
        assert_eq!(url, "https://cdn.test/showroom/LX_100_B");
    }

    #[test]
    fn cdn_carries_version() {
        let cfg = cdn_config(Some("2025-09-22"));
        assert_eq!(
            resolve_image("SKU-1", "", &cfg),
            "https://cdn.test/showroom/SKU-1?v=2025-09-22"
        );
    }

    #[test]
    fn embedded_object_markers_use_placeholder() {
        let cfg = config();
        assert_eq!(resolve_image("A", "3", &cfg), cfg.placeholder_image);
        assert_eq!(resolve_image("A", "Ver más", &cfg), cfg.placeholder_image);
        assert_eq!(resolve_image("A", "  ", &cfg), cfg.placeholder_image);
        assert_eq!(resolve_image("A", "no picture", &cfg), cfg.placeholder_image);
    }

    #[test]
    fn drive_links_are_rewritten_and_proxied() {
        let cfg = config();
        let url = resolve_image(
            "A",
            "https://drive.google.com/file/d/AbC123/view?usp=sharing",
            &cfg,
        );
        assert_eq!(
            url,
            "/img?u=https%3A%2F%2Fdrive.google.com%2Fuc%3Fid%3DAbC123"
        );
        assert_eq!(
            proxied_target(&url).as_deref(),
            Some("https://drive.google.com/uc?id=AbC123")
        );
    }

    #[test]
    fn drive_id_shapes() {
        let expected = "https://drive.google.com/uc?id=XYZ";
        assert_eq!(
            normalize_drive_url("https://drive.google.com/open?id=XYZ"),
            expected
        );
        assert_eq!(
            normalize_drive_url("https://drive.google.com/uc?id=XYZ&export=download"),
            expected
        );
        assert_eq!(
            normalize_drive_url("https://example.com/pic.jpg?id=XYZ"),
            "https://example.com/pic.jpg?id=XYZ"
        );
    }

    #[test]
    fn plain_urls_are_proxied_unchanged() {
        let cfg = config();
        let url = resolve_image("A", "https://example.com/pic.jpg", &cfg);
        assert_eq!(proxied_target(&url).as_deref(), Some("https://example.com/pic.jpg"));
    }

    #[test]
    fn version_is_added_once() {
        assert_eq!(
            with_version("https://cdn.test/a", Some("7")),
            "https://cdn.test/a?v=7"
        );
        assert_eq!(
            with_version("https://cdn.test/a?v=6", Some("7")),
            "https://cdn.test/a?v=6"
        );
        assert_eq!(with_version("/images/x.png", Some("7")), "/images/x.png");
        assert_eq!(with_version("https://cdn.test/a", None), "https://cdn.test/a");
    }
}
