use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileCreateRequest {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileEditRequest {
    pub path: String,
    pub original_snippet: String,
    pub new_snippet: String,
}

/// The JSON object the model is instructed to answer with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AssistantResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub assistant_reply: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub files_to_create: Vec<FileCreateRequest>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub files_to_edit: Vec<FileEditRequest>,
}

impl AssistantResponse {
    /// A reply that carries only text, used to surface local failures.
    pub fn synthetic(reply: impl Into<String>) -> Self {
        Self {
            assistant_reply: reply.into(),
            ..Self::default()
        }
    }
}

fn null_as_default<'de, D, T>(de: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}

pub fn parse_response(text: &str) -> Result<AssistantResponse> {
    serde_json::from_str(text.trim()).context("Failed to parse JSON response from assistant")
}
