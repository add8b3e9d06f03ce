//! # Pinata
//!
//! Pins uploaded memes to IPFS. The returned hash is what `submitMeme` stores on chain.
use chrono::{SecondsFormat, Utc};
use reqwest::{
    Client,
    multipart::{Form, Part},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::{error::AppError, utils::pin_name};

pub const PLATFORM: &str = "memefi";

pub struct Upload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PinResponse {
    pub ipfs_hash: Option<String>,
    #[serde(default)]
    pub pin_size: u64,
    #[serde(default)]
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pinned {
    pub success: bool,
    pub ipfs_hash: String,
    pub pin_size: u64,
    pub timestamp: String,
    pub gateway_url: String,
}

pub fn pin_metadata(upload: &Upload, millis: i64, uploaded_at: &str) -> serde_json::Value {
    json!({
        "name": pin_name(millis, &upload.file_name),
        "keyvalues": {
            "platform": PLATFORM,
            "uploadedAt": uploaded_at,
            "fileType": upload.content_type,
            "fileSize": upload.bytes.len().to_string(),
        }
    })
}

pub async fn pin_file(
    client: &Client,
    endpoint: &str,
    jwt: &str,
    gateway: &str,
    upload: Upload,
) -> Result<Pinned, AppError> {
    let now = Utc::now();
    let metadata = pin_metadata(
        &upload,
        now.timestamp_millis(),
        &now.to_rfc3339_opts(SecondsFormat::Millis, true),
    );

    let part = Part::bytes(upload.bytes)
        .file_name(upload.file_name)
        .mime_str(&upload.content_type)
        .map_err(|_| AppError::InvalidFileType(upload.content_type.clone()))?;

    let form = Form::new()
        .part("file", part)
        .text("pinataMetadata", metadata.to_string());

    let response = client
        .post(endpoint)
        .bearer_auth(jwt)
        .multipart(form)
        .send()
        .await
        .map_err(|e| AppError::Upstream(e.to_string()))?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        warn!("Pinata upload failed with {status}: {error_text}");

        return Err(AppError::Upstream(error_text));
    }

    let pinned: PinResponse = response
        .json()
        .await
        .map_err(|e| AppError::Upstream(e.to_string()))?;

    let ipfs_hash = pinned
        .ipfs_hash
        .filter(|hash| !hash.is_empty())
        .ok_or_else(|| AppError::Upstream("upload succeeded but no IPFS hash returned".into()))?;
    info!("Pinned {ipfs_hash} ({} bytes)", pinned.pin_size);

    Ok(Pinned {
        success: true,
        gateway_url: chain::view::gateway_url(gateway, &ipfs_hash),
        ipfs_hash,
        pin_size: pinned.pin_size,
        timestamp: pinned.timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_metadata() {
        let upload = Upload {
            file_name: "cat.png".into(),
            content_type: "image/png".into(),
            bytes: vec![0; 2048],
        };

        let metadata = pin_metadata(&upload, 1_700_000_000_000, "2023-11-14T22:13:20.000Z");
        assert_eq!(metadata["name"], "meme-1700000000000-cat.png");
        assert_eq!(metadata["keyvalues"]["platform"], "memefi");
        assert_eq!(metadata["keyvalues"]["fileType"], "image/png");
        assert_eq!(metadata["keyvalues"]["fileSize"], "2048");
    }

    #[test]
    fn test_pin_response() {
        let pinned: PinResponse = serde_json::from_str(
            r#"{"IpfsHash": "QmCat", "PinSize": 2048, "Timestamp": "2023-11-14T22:13:20.000Z"}"#,
        )
        .unwrap();

        assert_eq!(pinned.ipfs_hash.as_deref(), Some("QmCat"));
        assert_eq!(pinned.pin_size, 2048);
    }
}
