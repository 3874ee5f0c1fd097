//! Modular scan provider abstraction.
//!
//! Defines the [`ScanProvider`] trait and unified types so different
//! document-OCR backends can sit behind the batch engine, and so tests can
//! drive the scheduler with a scripted provider.

pub mod docai;
pub mod token;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Input to a scan provider: one uploaded document.
#[derive(Debug, Clone)]
pub struct ScanInput {
    pub filename: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Flat field map extracted from one passport document.
///
/// Known provider entity types are promoted to typed fields; anything else
/// the provider emits lands in `extra`. The enhancement stage may fill the
/// address fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawScanResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_expiry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_issue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_of_birth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
    /// Street name supplied by the enhancement stage (no number).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_address: Option<String>,
    /// Street number supplied by the enhancement stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_number: Option<String>,
    /// Locality/residence country supplied by the enhancement stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locality: Option<String>,
    /// Provider entity types this schema does not know.
    #[serde(flatten)]
    pub extra: HashMap<String, String>,
}

impl RawScanResult {
    /// Build from provider (entity-type, mention-text) pairs.
    ///
    /// Empty mention texts are dropped; repeated entity types keep the first
    /// occurrence (passports carry each field once, repeats are OCR noise).
    pub fn from_entities<I>(entities: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut result = Self::default();
        for (entity_type, text) in entities {
            let text = text.trim().to_string();
            if text.is_empty() {
                continue;
            }
            let slot = match entity_type.as_str() {
                "document_id" => &mut result.document_id,
                "surname" => &mut result.surname,
                "given_name" | "given_names" => &mut result.given_name,
                "nationality" => &mut result.nationality,
                "country" | "issuing_country" => &mut result.country,
                "date_of_birth" | "birth_date" => &mut result.date_of_birth,
                "date_of_expiry" | "expiration_date" => &mut result.date_of_expiry,
                "date_of_issue" | "issue_date" => &mut result.date_of_issue,
                "place_of_birth" | "birth_place" => &mut result.place_of_birth,
                "sex" | "gender" => &mut result.sex,
                _ => {
                    result.extra.entry(entity_type).or_insert(text);
                    continue;
                }
            };
            if slot.is_none() {
                *slot = Some(text);
            }
        }
        result
    }
}

/// Typed failure classification for one scan attempt.
///
/// Every failure path of a provider must resolve to one of these so the
/// scheduler's worker loop can record the item as Error and move on.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("provider error ({status}): {message}")]
    Provider { status: u16, message: String },
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
    #[error("scan timed out after {0}s")]
    Timeout(u64),
}

/// Async trait implemented by each scan backend.
#[async_trait::async_trait]
pub trait ScanProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn scan(&self, input: &ScanInput) -> Result<RawScanResult, ScanError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_entities_promotes_known_fields() {
        let result = RawScanResult::from_entities(vec![
            ("document_id".to_string(), "X123456".to_string()),
            ("surname".to_string(), "SMITH".to_string()),
            ("given_names".to_string(), "JOHN".to_string()),
            ("mrz_line_1".to_string(), "P<USASMITH<<JOHN".to_string()),
        ]);
        assert_eq!(result.document_id.as_deref(), Some("X123456"));
        assert_eq!(result.surname.as_deref(), Some("SMITH"));
        assert_eq!(result.given_name.as_deref(), Some("JOHN"));
        assert_eq!(
            result.extra.get("mrz_line_1").map(String::as_str),
            Some("P<USASMITH<<JOHN")
        );
    }

    #[test]
    fn test_from_entities_keeps_first_and_drops_empty() {
        let result = RawScanResult::from_entities(vec![
            ("surname".to_string(), "GARCIA".to_string()),
            ("surname".to_string(), "GRACIA".to_string()),
            ("sex".to_string(), "   ".to_string()),
        ]);
        assert_eq!(result.surname.as_deref(), Some("GARCIA"));
        assert!(result.sex.is_none());
    }
}
