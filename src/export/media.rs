use crate::catalog::image::{is_absolute_http, normalize_drive_url, proxied_target};
use image::{ImageFormat, RgbImage};
use reqwest::{Client, header::ACCEPT};
use std::{
    io::Cursor,
    path::{Component, Path, PathBuf},
    time::Duration,
};
use tracing::{debug, warn};

const FETCH_TIMEOUT: Duration = Duration::from_secs(8);
const THUMBNAIL_PX: u32 = 480;

/// A fetched image ready for embedding: bytes a spreadsheet can take as-is
/// plus decoded pixels for the PDF.
#[derive(Debug, Clone)]
pub struct Picture {
    pub encoded: Vec<u8>,
    pub pixels: RgbImage,
}

impl Picture {
    /// Decodes arbitrary image bytes. PNG, JPEG, GIF and BMP are kept
    /// verbatim; other formats are re-encoded to PNG.
    pub fn from_bytes(bytes: Vec<u8>) -> Option<Self> {
        let format = image::guess_format(&bytes).ok()?;
        let decoded = image::load_from_memory_with_format(&bytes, format).ok()?;
        let pixels = if decoded.width() > THUMBNAIL_PX || decoded.height() > THUMBNAIL_PX {
            decoded.thumbnail(THUMBNAIL_PX, THUMBNAIL_PX).to_rgb8()
        } else {
            decoded.to_rgb8()
        };
        let encoded = match format {
            ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Gif | ImageFormat::Bmp => bytes,
            _ => {
                let mut png = Vec::new();
                decoded
                    .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
                    .ok()?;
                png
            }
        };
        Some(Self { encoded, pixels })
    }
}

/// Loads images from the three places the UI points at: absolute URLs, the
/// `/img` proxy and locally stored `/images/` files.
#[derive(Clone)]
pub struct ImageFetcher {
    http: Client,
    image_dir: PathBuf,
}

impl ImageFetcher {
    pub fn new(http: Client, image_dir: PathBuf) -> Self {
        Self { http, image_dir }
    }

    pub async fn fetch(&self, url: &str) -> Option<Picture> {
        if url.is_empty() {
            return None;
        }
        let bytes = if is_absolute_http(url) {
            self.download(url).await
        } else if let Some(upstream) = proxied_target(url) {
            self.download(&normalize_drive_url(&upstream)).await
        } else if let Some(file) = url.strip_prefix("/images/") {
            self.read_local(file).await
        } else {
            None
        }?;
        let picture = Picture::from_bytes(bytes);
        if picture.is_none() {
            warn!(target = "showroom.export", url, "image could not be decoded");
        }
        picture
    }

    async fn download(&self, url: &str) -> Option<Vec<u8>> {
        let response = self
            .http
            .get(url)
            .header(ACCEPT, "image/*")
            .timeout(FETCH_TIMEOUT)
            .send()
            .await
            .map_err(|err| warn!(target = "showroom.export", url, error = %err, "image fetch failed"))
            .ok()?;
        if !response.status().is_success() {
            warn!(target = "showroom.export", url, status = %response.status(), "image fetch rejected");
            return None;
        }
        response
            .bytes()
            .await
            .map(|body| body.to_vec())
            .map_err(|err| warn!(target = "showroom.export", url, error = %err, "image body failed"))
            .ok()
    }

    async fn read_local(&self, file: &str) -> Option<Vec<u8>> {
        let relative = Path::new(file);
        if relative
            .components()
            .any(|part| !matches!(part, Component::Normal(_)))
        {
            warn!(target = "showroom.export", file, "rejected local image path");
            return None;
        }
        let path = self.image_dir.join(relative);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                debug!(target = "showroom.export", path = %path.display(), error = %err, "local image missing");
                None
            }
        }
    }
}
