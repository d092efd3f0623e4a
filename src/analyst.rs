//! Client for the local inference server, with the offline narrative as
//! an unconditional fallback.
use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::error::BackendError;
use crate::narrative;
use crate::selector::Selection;

/// Characters of serialized context included per dataset.
pub const CONTEXT_CHARS: usize = 500;
const STATUS_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySource {
    Model,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub source: ReplySource,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// The analyst prompt: role preamble, the question, a truncated JSON view
/// of each selected dataset and response instructions.
pub fn build_prompt(query: &str, selection: &Selection<'_>) -> String {
    let mut prompt = String::from(
        "You are a Senior Defense Intelligence Analyst for the Indian Armed Forces with \
         20+ years of experience in strategic planning and military analytics.\n\n\
         CLASSIFICATION: FOR OFFICIAL USE ONLY\n\n\
         Your role:\n\
         - Analyze defense data and provide strategic insights\n\
         - Generate actionable intelligence reports\n\
         - Maintain professional military communication standards\n\
         - Focus on operational readiness and strategic implications\n\n",
    );
    prompt.push_str(&format!("User Query: \"{}\"\n\n", query));

    if let serde_json::Value::Object(context) = selection.to_context() {
        if !context.is_empty() {
            prompt.push_str("Available Intelligence Data:\n");
            for (key, value) in &context {
                let rendered = if value.is_null() {
                    "unavailable".to_string()
                } else {
                    let full = value.to_string();
                    let cut = truncate_chars(&full, CONTEXT_CHARS);
                    if cut.len() < full.len() {
                        format!("{cut}...")
                    } else {
                        full
                    }
                };
                prompt.push_str(&format!("- {key}: {rendered}\n"));
            }
            prompt.push('\n');
        }
    }

    prompt.push_str(
        "Instructions:\n\
         1. Respond as a military intelligence professional\n\
         2. Use appropriate military terminology and structure\n\
         3. Provide specific data-driven insights when possible\n\
         4. Include strategic recommendations\n\
         5. Format with clear sections: Assessment, Analysis, Recommendations\n\
         6. Maintain security awareness in communications\n\
         7. Keep responses concise but comprehensive (max 300 words)\n\n\
         Response:",
    );
    prompt
}

pub struct Analyst {
    settings: Settings,
    client: Option<Client>,
}

impl Analyst {
    /// A client that cannot be built (bad TLS setup, etc.) leaves the
    /// analyst permanently offline rather than failing startup.
    pub fn new(settings: Settings) -> Self {
        let client = if settings.offline {
            None
        } else {
            match Client::builder().timeout(settings.timeout()).build() {
                Ok(c) => Some(c),
                Err(e) => {
                    warn!(error = %e, "could not build backend client; running offline");
                    None
                }
            }
        };
        Analyst { settings, client }
    }

    pub fn is_offline(&self) -> bool {
        self.client.is_none()
    }

    fn generate(&self, query: &str, selection: &Selection<'_>) -> Result<String, BackendError> {
        let client = self.client.as_ref().ok_or(BackendError::Offline)?;
        let body = json!({
            "model": self.settings.model,
            "prompt": build_prompt(query, selection),
            "stream": false,
            "options": {
                "temperature": 0.7,
                "top_p": 0.9,
                "num_predict": 1024
            }
        });
        let resp = client.post(self.settings.generate_url()).json(&body).send()?;
        if !resp.status().is_success() {
            return Err(BackendError::Status(resp.status().as_u16()));
        }
        let out: GenerateResponse = resp.json()?;
        let text = out.response.trim();
        if text.is_empty() {
            return Err(BackendError::EmptyResponse);
        }
        Ok(text.to_string())
    }

    /// Answer `query` from `selection`. Any backend problem, including a
    /// timeout or a refused connection, yields the offline brief instead.
    pub fn respond(&self, query: &str, selection: &Selection<'_>) -> Reply {
        let start = Instant::now();
        match self.generate(query, selection) {
            Ok(text) => {
                info!(
                    model = %self.settings.model,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "model completion received"
                );
                Reply {
                    text,
                    source: ReplySource::Model,
                }
            }
            Err(e) => {
                match e {
                    BackendError::Offline => debug!("offline mode; using narrative fallback"),
                    _ => warn!(error = %e, "model backend unavailable; using narrative fallback"),
                }
                Reply {
                    text: narrative::generate(query, selection),
                    source: ReplySource::Fallback,
                }
            }
        }
    }

    fn tags(&self) -> Result<TagsResponse, BackendError> {
        let client = self.client.as_ref().ok_or(BackendError::Offline)?;
        let resp = client
            .get(self.settings.tags_url())
            .timeout(STATUS_TIMEOUT)
            .send()?;
        if !resp.status().is_success() {
            return Err(BackendError::Status(resp.status().as_u16()));
        }
        Ok(resp.json()?)
    }

    /// Whether the inference server answers within a few seconds.
    pub fn check_status(&self) -> bool {
        self.tags().is_ok()
    }

    pub fn available_models(&self) -> Vec<String> {
        match self.tags() {
            Ok(tags) => tags.models.into_iter().map(|m| m.name).collect(),
            Err(e) => {
                debug!(error = %e, "could not list models");
                Vec::new()
            }
        }
    }
}
