//! Kubo RPC content store.

use async_trait::async_trait;
use reqwest::{
    Client,
    multipart::{Form, Part},
};
use serde::{Deserialize, de::DeserializeOwned};
use tracing::debug;
use vesto_bridge::store::{ContentStore, StoreError};
use vesto_primitives::cid::{self, DAG_CBOR};

pub(crate) struct KuboStore {
    client: Client,
    api_url: String,
}

#[derive(Debug, Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

#[derive(Debug, Deserialize)]
struct DagPutResponse {
    #[serde(rename = "Cid")]
    cid: Link,
}

#[derive(Debug, Deserialize)]
struct Link {
    #[serde(rename = "/")]
    link: String,
}

impl KuboStore {
    pub(crate) fn new(client: Client, api_url: &str) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    async fn upload<T: DeserializeOwned>(&self, path: &str, bytes: Vec<u8>) -> Result<T, StoreError> {
        let form = Form::new().part("file", Part::bytes(bytes).file_name("data"));
        let response = self
            .client
            .post(format!("{}{path}", self.api_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(StoreError::Transport(format!("{path} returned {status}: {text}")));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))
    }
}

#[async_trait]
impl ContentStore for KuboStore {
    async fn add(&self, bytes: Vec<u8>) -> Result<String, StoreError> {
        let added: AddResponse = self
            .upload("/api/v0/add?cid-version=1&raw-leaves=true&pin=true", bytes)
            .await?;
        debug!(cid = %added.hash, "Added file");
        Ok(added.hash)
    }

    async fn dag_put(&self, block: Vec<u8>) -> Result<String, StoreError> {
        let put: DagPutResponse = self
            .upload(
                "/api/v0/dag/put?store-codec=dag-cbor&input-codec=dag-cbor&hash=sha2-256&pin=true",
                block,
            )
            .await?;
        debug!(cid = %put.cid.link, "Put DAG-CBOR block");
        Ok(put.cid.link)
    }

    async fn get(&self, cid: &str) -> Result<Vec<u8>, StoreError> {
        let not_found = |reason: String| StoreError::NotFound {
            cid: cid.to_string(),
            reason,
        };
        // Structured documents are single blocks; files may span several.
        let endpoint = match cid::parse(cid) {
            Ok(parsed) if parsed.codec() == DAG_CBOR => "block/get",
            _ => "cat",
        };
        let response = self
            .client
            .post(format!("{}/api/v0/{endpoint}", self.api_url))
            .query(&[("arg", cid)])
            .send()
            .await
            .map_err(|e| not_found(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(not_found(format!("{endpoint} returned {status}: {text}")));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| not_found(e.without_url().to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kubo_responses() {
        let added: AddResponse = serde_json::from_str(
            r#"{"Name":"data","Hash":"bafkreibm6jg3ux5qumhcn2b3flc3tyu6dmlb4xa7u5bf44yegnrjhc4yeq","Size":"5"}"#,
        )
        .unwrap();
        assert!(added.hash.starts_with("bafk"));

        let put: DagPutResponse =
            serde_json::from_str(r#"{"Cid":{"/":"bafyreib4pff766vhpbxbhjbqqnsh5emeznvujayjj4z2iu533cprgbz23m"}}"#)
                .unwrap();
        assert!(put.cid.link.starts_with("bafyrei"));
    }
}
