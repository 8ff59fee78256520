use crate::catalog::CatalogError;
use crate::catalog::config::SpreadsheetSource;
use reqwest::Client;
use tracing::debug;

pub async fn fetch_bytes(
    source: Option<&SpreadsheetSource>,
    http: &Client,
) -> Result<Vec<u8>, CatalogError> {
    match source {
        None => Err(CatalogError::Configuration),
        Some(SpreadsheetSource::Url(url)) => {
            debug!(target = "showroom.catalog", %url, "fetching spreadsheet");
            let response = http
                .get(url)
                .send()
                .await
                .map_err(|err| CatalogError::SourceFetch(err.to_string()))?;
            if !response.status().is_success() {
                return Err(CatalogError::SourceFetch(format!(
                    "HTTP {}",
                    response.status()
                )));
            }
            let bytes = response
                .bytes()
                .await
                .map_err(|err| CatalogError::SourceFetch(err.to_string()))?;
            Ok(bytes.to_vec())
        }
        Some(SpreadsheetSource::Path(path)) => {
            debug!(target = "showroom.catalog", path = %path.display(), "reading spreadsheet");
            tokio::fs::read(path)
                .await
                .map_err(|err| CatalogError::SourceFetch(format!("{}: {err}", path.display())))
        }
    }
}
