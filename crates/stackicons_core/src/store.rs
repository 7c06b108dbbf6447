use std::collections::BTreeMap;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::model::Item;

pub const TECH_STACK_ITEMS_FIELD: &str = "techStack.items";

/// Minimal read/write surface of the content store.
pub trait DocumentStore {
    /// Run a query and return the full response document.
    fn read(&mut self, query: &str) -> Result<Value>;
    /// Submit mutations. Non-2xx responses are returned, not raised.
    fn write(&mut self, request: &MutationRequest) -> Result<WriteOutcome>;
    fn request_count(&self) -> usize;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub status: u16,
    pub body: String,
}

impl WriteOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, 200 | 201)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MutationRequest {
    pub mutations: Vec<Mutation>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Mutation {
    pub patch: Patch,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Patch {
    pub id: String,
    pub set: BTreeMap<String, Value>,
}

impl MutationRequest {
    /// A single patch replacing `field` on `document_id`.
    pub fn set_field(document_id: &str, field: &str, value: Value) -> Self {
        Self {
            mutations: vec![Mutation {
                patch: Patch {
                    id: document_id.to_string(),
                    set: BTreeMap::from([(field.to_string(), value)]),
                },
            }],
        }
    }
}

pub fn tech_stack_query(document_type: &str, language: &str) -> String {
    format!(
        "*[_type == '{}' && language == '{}'][0]{{techStack{{items}}}}",
        escape_groq_string(document_type),
        escape_groq_string(language)
    )
}

/// Fetch the tech-stack item list of one language variant.
pub fn fetch_items<S: DocumentStore>(
    store: &mut S,
    document_type: &str,
    language: &str,
) -> Result<Vec<Item>> {
    let query = tech_stack_query(document_type, language);
    debug!(%language, %query, "querying tech stack");
    let payload = store
        .read(&query)
        .with_context(|| format!("failed to query `{language}` tech stack"))?;
    extract_items(&payload, language)
}

pub fn extract_items(payload: &Value, language: &str) -> Result<Vec<Item>> {
    let result = match payload.get("result") {
        Some(Value::Null) | None => {
            bail!("no `{language}` document found in query result")
        }
        Some(result) => result,
    };
    let items = result
        .get("techStack")
        .and_then(|value| value.get("items"))
        .filter(|value| !value.is_null())
        .ok_or_else(|| anyhow::anyhow!("`{language}` document has no techStack.items field"))?;
    serde_json::from_value(items.clone())
        .with_context(|| format!("failed to decode `{language}` techStack.items"))
}

/// Replace the whole tech-stack list of `document_id` in one mutation.
pub fn write_items<S: DocumentStore>(
    store: &mut S,
    document_id: &str,
    items: &[Item],
) -> Result<WriteOutcome> {
    let value = serde_json::to_value(items).context("failed to encode tech stack items")?;
    let request = MutationRequest::set_field(document_id, TECH_STACK_ITEMS_FIELD, value);
    debug!(%document_id, items = items.len(), "submitting tech stack patch");
    store
        .write(&request)
        .with_context(|| format!("failed to submit mutation for {document_id}"))
}

fn escape_groq_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}
