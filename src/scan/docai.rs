//! Google Document AI scan provider.
//!
//! Sends the document as base64 content to a passport processor and flattens
//! the returned entity list into a [`RawScanResult`].

use super::token::{ServiceAccountKey, TokenCache};
use super::{RawScanResult, ScanError, ScanInput, ScanProvider};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub struct DocAiProvider {
    client: reqwest::Client,
    token_cache: TokenCache,
    project_id: String,
    location: String,
    processor_id: String,
}

impl DocAiProvider {
    pub fn new(
        client: reqwest::Client,
        sa_key: ServiceAccountKey,
        location: String,
        processor_id: String,
    ) -> Self {
        let project_id = sa_key.project_id.clone();
        Self {
            client,
            token_cache: TokenCache::new(sa_key),
            project_id,
            location,
            processor_id,
        }
    }

    fn process_url(&self) -> String {
        format!(
            "https://{loc}-documentai.googleapis.com/v1/projects/{proj}/locations/{loc}/processors/{proc}:process",
            loc = self.location,
            proj = self.project_id,
            proc = self.processor_id,
        )
    }
}

// ── Document AI request/response types ──────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcessRequest {
    raw_document: RawDocument,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RawDocument {
    content: String,
    mime_type: String,
}

#[derive(Deserialize)]
struct ProcessResponse {
    document: Option<Document>,
}

#[derive(Deserialize)]
struct Document {
    #[serde(default)]
    entities: Vec<Entity>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Entity {
    #[serde(rename = "type", default)]
    entity_type: Option<String>,
    #[serde(default)]
    mention_text: Option<String>,
}

// ── Provider implementation ─────────────────────────────────────────────────

#[async_trait::async_trait]
impl ScanProvider for DocAiProvider {
    fn name(&self) -> &str {
        "document_ai"
    }

    async fn scan(&self, input: &ScanInput) -> Result<RawScanResult, ScanError> {
        let token = self
            .token_cache
            .get(&self.client)
            .await
            .map_err(|e| ScanError::Auth(format!("{:#}", e)))?;

        let body = ProcessRequest {
            raw_document: RawDocument {
                content: BASE64.encode(&input.data),
                mime_type: input.mime_type.clone(),
            },
        };

        info!(
            "DocAiProvider: processing {} ({} bytes, {})",
            input.filename,
            input.data.len(),
            input.mime_type
        );

        let resp = self
            .client
            .post(self.process_url())
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(ScanError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ProcessResponse = resp
            .json()
            .await
            .map_err(|e| ScanError::MalformedResponse(e.to_string()))?;

        let entities = parsed
            .document
            .ok_or_else(|| ScanError::MalformedResponse("response has no document".to_string()))?
            .entities;

        debug!(
            "DocAiProvider: {} entities for {}",
            entities.len(),
            input.filename
        );

        Ok(RawScanResult::from_entities(entities.into_iter().filter_map(
            |e| match (e.entity_type, e.mention_text) {
                (Some(t), Some(m)) => Some((t, m)),
                _ => None,
            },
        )))
    }
}
