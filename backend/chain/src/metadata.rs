//! Winner NFT metadata behind `tokenURI`.
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    error::{ChainError, Fetch},
    view::gateway_url,
};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub trait_type: String,
    pub value: serde_json::Value,
}

/// `ipfs://` goes through the gateway, plain http(s) is used as is, anything else is unusable.
pub fn resolve_token_uri(uri: &str, gateway: &str) -> Option<String> {
    if let Some(path) = uri.strip_prefix("ipfs://") {
        let path = path.trim_start_matches("ipfs/");
        if path.is_empty() {
            return None;
        }

        return Some(gateway_url(gateway, path));
    }

    if uri.starts_with("https://") || uri.starts_with("http://") {
        return Some(uri.to_string());
    }

    None
}

/// `NotFound` when the URI is unusable or the document is gone.
///
/// A gateway that errors or serves something that is not metadata is `Failed`.
pub async fn fetch_metadata(
    client: &reqwest::Client,
    uri: &str,
    gateway: &str,
) -> Fetch<NftMetadata> {
    let Some(url) = resolve_token_uri(uri, gateway) else {
        return Fetch::NotFound;
    };

    let response = match client.get(&url).send().await {
        Ok(response) if response.status().is_success() => response,
        Ok(response) if response.status() == StatusCode::NOT_FOUND => {
            warn!("No metadata at {url}");
            return Fetch::NotFound;
        }
        Ok(response) => {
            warn!("Metadata request to {url} returned {}", response.status());
            return Fetch::Failed(ChainError::Connection(format!(
                "metadata gateway returned {}",
                response.status()
            )));
        }
        Err(e) => {
            warn!("Metadata request to {url} failed: {e}");
            return Fetch::Failed(e.into());
        }
    };

    match response.json::<NftMetadata>().await {
        Ok(metadata) => Fetch::Found(metadata),
        Err(e) => {
            warn!("Malformed metadata at {url}: {e}");
            Fetch::Failed(ChainError::Decode(format!("malformed metadata: {e}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GATEWAY: &str = "https://ipfs.io/ipfs/";

    #[test]
    fn test_resolve_token_uri() {
        assert_eq!(
            resolve_token_uri("ipfs://QmMeta", GATEWAY).as_deref(),
            Some("https://ipfs.io/ipfs/QmMeta")
        );
        assert_eq!(
            resolve_token_uri("ipfs://ipfs/QmMeta/1.json", GATEWAY).as_deref(),
            Some("https://ipfs.io/ipfs/QmMeta/1.json")
        );
        assert_eq!(
            resolve_token_uri("https://example.com/1.json", GATEWAY).as_deref(),
            Some("https://example.com/1.json")
        );
        assert_eq!(resolve_token_uri("ipfs://", GATEWAY), None);
        assert_eq!(resolve_token_uri("data:application/json,{}", GATEWAY), None);
        assert_eq!(resolve_token_uri("", GATEWAY), None);
    }

    #[test]
    fn test_parse_metadata() {
        let metadata: NftMetadata = serde_json::from_str(
            r#"{
                "name": "MEMEFI Winner #1",
                "image": "ipfs://QmWinner",
                "attributes": [
                    {"trait_type": "Contest", "value": 1},
                    {"trait_type": "Total Staked", "value": "1.7 BNB"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(metadata.name, "MEMEFI Winner #1");
        assert!(metadata.description.is_empty());
        assert_eq!(metadata.attributes.len(), 2);
        assert_eq!(metadata.attributes[0].value, serde_json::json!(1));
    }

    #[tokio::test]
    async fn test_unresolvable_uri_makes_no_request() {
        let client = reqwest::Client::new();

        assert!(matches!(
            fetch_metadata(&client, "ar://nope", GATEWAY).await,
            Fetch::NotFound
        ));
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_failed() {
        let client = reqwest::Client::new();

        // Nothing listens on port 1
        assert!(matches!(
            fetch_metadata(&client, "ipfs://QmMeta", "http://127.0.0.1:1/ipfs/").await,
            Fetch::Failed(_)
        ));
    }
}
