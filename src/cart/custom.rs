use crate::cart::CartError;
use base64::{Engine, engine::general_purpose::STANDARD};
use once_cell::sync::Lazy;
use regex::Regex;
use std::{io::Cursor, path::Path};
use uuid::Uuid;

static DATA_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^data:(image/[^;]+);base64,(.+)$").expect("static regex")
});

/// Formats stored as uploaded; anything else is re-encoded to PNG.
const PASSTHROUGH: &[&str] = &["jpeg", "jpg", "png"];

#[derive(Debug, PartialEq)]
pub struct DecodedImage {
    pub extension: String,
    pub bytes: Vec<u8>,
}

pub fn decode_data_url(data_url: &str) -> Result<DecodedImage, CartError> {
    let caps = DATA_URL
        .captures(data_url.trim())
        .ok_or_else(|| CartError::InvalidImage("expected a base64 image data URL".into()))?;
    let mime = &caps[1];
    let payload: String = caps[2].chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(payload.as_bytes())
        .map_err(|err| CartError::InvalidImage(err.to_string()))?;
    if bytes.is_empty() {
        return Err(CartError::InvalidImage("empty image".into()));
    }

    let subtype = mime
        .split('/')
        .nth(1)
        .unwrap_or_default()
        .to_ascii_lowercase();
    if PASSTHROUGH.contains(&subtype.as_str()) {
        return Ok(DecodedImage {
            extension: subtype,
            bytes,
        });
    }

    let decoded = image::load_from_memory(&bytes)
        .map_err(|err| CartError::InvalidImage(format!("{mime}: {err}")))?;
    let mut png = Vec::new();
    decoded
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|err| CartError::InvalidImage(err.to_string()))?;
    Ok(DecodedImage {
        extension: "png".into(),
        bytes: png,
    })
}

/// Writes the image under `dir` and returns the public `/images/...` path.
pub async fn store_image(dir: &Path, image: DecodedImage) -> Result<String, CartError> {
    tokio::fs::create_dir_all(dir).await?;
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix = Uuid::new_v4().simple().to_string();
    let filename = format!("CUSTOM_{millis}_{}.{}", &suffix[..8], image.extension);
    tokio::fs::write(dir.join(&filename), &image.bytes).await?;
    Ok(format!("/images/{filename}"))
}
