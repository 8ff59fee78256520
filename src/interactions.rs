use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tokio::{io::AsyncWriteExt, sync::Mutex};
use tracing::debug;

const HEADER: &str = "time,buyer,model,action,note,device,price\n";

#[derive(Debug, Error)]
pub enum InteractionError {
    #[error("buyer, model and action are required")]
    MissingField,
    #[error("unable to encode interaction: {0}")]
    Encode(#[from] csv::Error),
    #[error("unable to append interaction: {0}")]
    Io(#[from] std::io::Error),
}

/// A browse/cart event reported by the UI.
#[derive(Debug, Clone, Deserialize)]
pub struct Interaction {
    #[serde(default)]
    pub buyer: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub price: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct Row<'a> {
    time: String,
    buyer: &'a str,
    model: &'a str,
    action: &'a str,
    note: String,
    device: &'a str,
    price: String,
}

/// Append-only CSV log of interactions.
pub struct InteractionLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl InteractionLog {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub async fn append(&self, event: &Interaction) -> Result<(), InteractionError> {
        let buyer = event.buyer.trim();
        let model = event.model.trim();
        let action = event.action.trim();
        if buyer.is_empty() || model.is_empty() || action.is_empty() {
            return Err(InteractionError::MissingField);
        }

        let row = Row {
            time: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            buyer,
            model,
            action,
            note: flatten(event.note.as_deref().unwrap_or_default()),
            device: event.device.as_deref().unwrap_or_default(),
            price: price_text(event.price.as_ref()),
        };
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        writer.serialize(&row)?;
        let line = writer
            .into_inner()
            .map_err(|err| std::io::Error::other(err.to_string()))?;

        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let fresh = !tokio::fs::try_exists(&self.path).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        if fresh {
            file.write_all(HEADER.as_bytes()).await?;
        }
        file.write_all(&line).await?;
        file.flush().await?;
        debug!(target = "showroom.api", buyer, model, action, "interaction logged");
        Ok(())
    }
}

fn flatten(note: &str) -> String {
    note.replace(['\r', '\n'], " ")
}

fn price_text(price: Option<&serde_json::Value>) -> String {
    match price {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(note: &str) -> Interaction {
        serde_json::from_value(json!({
            "buyer": "HEB",
            "model": "SKU-1",
            "action": "add",
            "note": note,
            "device": "ipad",
            "price": 12.5
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn writes_header_once_and_quotes_commas() {
        let dir = std::env::temp_dir().join(format!("showroom-log-{}", uuid::Uuid::new_v4()));
        let log = InteractionLog::new(dir.join("interactions.csv"));
        log.append(&event("red, large\nplease")).await.unwrap();
        log.append(&event("plain")).await.unwrap();

        let body = std::fs::read_to_string(dir.join("interactions.csv")).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], HEADER.trim_end());
        assert!(lines[1].contains(",HEB,SKU-1,add,\"red, large please\",ipad,12.5"));

        let mut reader = csv::Reader::from_path(dir.join("interactions.csv")).unwrap();
        let records: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(&records[0][4], "red, large please");
        assert_eq!(&records[1][4], "plain");
    }

    #[tokio::test]
    async fn rejects_missing_fields() {
        let dir = std::env::temp_dir().join(format!("showroom-log-{}", uuid::Uuid::new_v4()));
        let log = InteractionLog::new(dir.join("interactions.csv"));
        let mut incomplete = event("x");
        incomplete.action = " ".into();
        assert!(matches!(
            log.append(&incomplete).await,
            Err(InteractionError::MissingField)
        ));
        assert!(!dir.join("interactions.csv").exists());
    }

    #[test]
    fn price_text_handles_strings_and_nulls() {
        assert_eq!(price_text(None), "");
        assert_eq!(price_text(Some(&json!(null))), "");
        assert_eq!(price_text(Some(&json!("12.50"))), "12.50");
        assert_eq!(price_text(Some(&json!(7))), "7");
    }
}
