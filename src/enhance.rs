//! OpenAI client for passport-data enhancement.
//!
//! The enhancement collaborator is treated as unreliable by contract:
//! malformed JSON, missing fields, and outright call failures are expected,
//! and every failure path falls back to the un-enhanced scan result so a
//! batch export never aborts on it.

use crate::scan::RawScanResult;
use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::Arc;
use tracing::{debug, info, warn};

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o";

/// OpenAI chat-completions client.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    /// Try to load from env. Returns `None` when OPENAI_API_KEY is unset;
    /// enhancement is an optional collaborator.
    pub fn from_env(client: Client) -> Option<Self> {
        let api_key = env::var("OPENAI_API_KEY").ok()?;
        let model = env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Some(Self {
            client,
            api_key,
            model,
        })
    }

    /// Enhance one scan result, falling back to the input on any failure.
    pub async fn enhance_or_fallback(&self, raw: &RawScanResult) -> RawScanResult {
        match self.enhance(raw).await {
            Ok(enhanced) => enhanced,
            Err(e) => {
                warn!("Enhancement failed, using raw result: {:#}", e);
                raw.clone()
            }
        }
    }

    async fn enhance(&self, raw: &RawScanResult) -> Result<RawScanResult> {
        let country = raw
            .nationality
            .as_deref()
            .or(raw.country.as_deref())
            .unwrap_or_default();

        let payload =
            serde_json::to_string_pretty(raw).context("Failed to serialize scan result")?;

        let prompt = format!(
            r#"Analiza estos datos de pasaporte y mejóralos:
1. Rellena campos faltantes con valores plausibles basados en el contexto
2. Estandariza formatos de fecha a DD/MM/YYYY
3. Genera una dirección ÚNICA Y REALISTA para una persona que vive en {country}

La dirección debe:
- Incluir una calle real que exista en {country}
- Tener un número de calle aleatorio pero realista
- Ser formateada según las convenciones de direcciones de {country}
- SER COMPLETAMENTE ÚNICA (NO usar direcciones genéricas o muy conocidas)

En el formato final:
- "locality" será siempre el país de residencia ({country}) en CASTELLANO y SIN TILDES.
- "place_of_birth" será ÚNICAMENTE el país de origen, también en CASTELLANO y SIN TILDES.

Datos del pasaporte: {payload}

Devuelve SOLO un objeto JSON válido que incluya los campos originales mejorados y estos campos adicionales:
- "street_address": la calle SIN NÚMERO, solo nombre de la calle
- "address_number": el número de la dirección

NO incluyas explicaciones, código de formato markdown, o cualquier cosa que no sea el objeto JSON."#,
        );

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: "Eres un asistente especializado en procesar datos de pasaportes y \
                              generar direcciones realistas únicas para cada país. Devuelve SOLO \
                              datos en formato JSON sin ningún tipo de formateo adicional."
                        .to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: prompt,
                },
            ],
            temperature: 0.7,
        };

        debug!("Sending enhancement request: model={}", self.model);

        let response = self
            .client
            .post(OPENAI_API_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to OpenAI")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI API error ({}): {}", status, error_text);
        }

        let response: ChatCompletionResponse = response
            .json()
            .await
            .context("Failed to parse OpenAI response")?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        let enhanced = parse_llm_json(&content).context("Failed to parse enhancement JSON")?;
        info!("Enhancement applied for document {:?}", raw.document_id);
        Ok(merge_enhancement(raw, &enhanced))
    }
}

/// Enhance a set of scan results under a concurrency ceiling, preserving
/// input order. Individual failures degrade to the corresponding raw input.
pub async fn enhance_all(
    client: Arc<OpenAiClient>,
    raws: Vec<RawScanResult>,
    concurrency: usize,
) -> Vec<RawScanResult> {
    let semaphore = Arc::new(tokio::sync::Semaphore::new(concurrency.max(1)));
    let mut handles = Vec::with_capacity(raws.len());

    for raw in raws {
        let client = client.clone();
        let semaphore = semaphore.clone();
        let fallback = raw.clone();
        let handle = tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .expect("enhancement semaphore closed");
            client.enhance_or_fallback(&raw).await
        });
        handles.push((handle, fallback));
    }

    let mut results = Vec::with_capacity(handles.len());
    for (handle, fallback) in handles {
        match handle.await {
            Ok(enhanced) => results.push(enhanced),
            Err(e) => {
                // One output per input even if a worker dies.
                warn!("enhancement worker panicked: {}", e);
                results.push(fallback);
            }
        }
    }
    results
}

/// Overlay enhanced string fields on the raw result. Only string values are
/// taken; anything else the model returned for a known key is ignored.
fn merge_enhancement(raw: &RawScanResult, enhanced: &serde_json::Value) -> RawScanResult {
    let field = |key: &str, fallback: &Option<String>| -> Option<String> {
        enhanced
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .or_else(|| fallback.clone())
    };

    RawScanResult {
        document_id: field("document_id", &raw.document_id),
        surname: field("surname", &raw.surname),
        given_name: field("given_name", &raw.given_name),
        nationality: field("nationality", &raw.nationality),
        country: field("country", &raw.country),
        date_of_birth: field("date_of_birth", &raw.date_of_birth),
        date_of_expiry: field("date_of_expiry", &raw.date_of_expiry),
        date_of_issue: field("date_of_issue", &raw.date_of_issue),
        place_of_birth: field("place_of_birth", &raw.place_of_birth),
        sex: field("sex", &raw.sex),
        street_address: field("street_address", &raw.street_address),
        address_number: field("address_number", &raw.address_number),
        locality: field("locality", &raw.locality),
        extra: raw.extra.clone(),
    }
}

/// Parse JSON from an LLM response, stripping markdown code blocks if
/// present.
fn parse_llm_json(response: &str) -> Result<serde_json::Value> {
    let json_str = if response.contains("```json") {
        response
            .split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .unwrap_or(response)
            .trim()
    } else if response.contains("```") {
        response.split("```").nth(1).unwrap_or(response).trim()
    } else {
        response.trim()
    };

    serde_json::from_str(json_str).context(format!(
        "Invalid JSON syntax: {}",
        &json_str.chars().take(200).collect::<String>()
    ))
}

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}
