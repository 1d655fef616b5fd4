//! Write-payload partitioning
//!
//! Splits a generic write payload into flat profile columns and
//! questionnaire answers grouped by namespace.

use castdesk_common::models::QuestionnaireDocument;
use castdesk_common::{Error, FieldValue, FlatField, Result};
use serde_json::{Map, Value};
use tracing::warn;

use crate::fieldsets::FieldRegistry;

/// Unseparated write payload as received from the API
pub type Payload = Map<String, Value>;

const NESTED_DOCUMENT_KEY: &str = "questionnaireResponses";
const SUBJECT_KEY: &str = "subjectId";
const TIMESTAMP_KEYS: [&str; 2] = ["createdAt", "updatedAt"];

/// A payload split into its two destinations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    /// Flat columns present in the payload
    pub flat: Vec<(FlatField, String)>,
    /// Questionnaire answers present in the payload, by namespace
    pub questionnaire: QuestionnaireDocument,
    /// Namespace unqualified questionnaire fields were routed to
    pub active_namespace: String,
    /// Keys that matched no known field and went to the fallback namespace
    pub unrouted: Vec<String>,
}

impl Partition {
    pub fn is_empty(&self) -> bool {
        self.flat.is_empty() && self.questionnaire.is_empty()
    }
}

/// Convert a JSON payload body into a [`Payload`]
pub fn into_payload(body: Value) -> Result<Payload> {
    match body {
        Value::Object(map) => Ok(map),
        other => Err(Error::MalformedPayload(format!(
            "payload must be a JSON object, got {}",
            json_type(&other)
        ))),
    }
}

/// Split `payload` for `subject_id`
///
/// `stored_domain` is the talent domain of the existing record, if any. The
/// active namespace is the payload's `talentDomain` when registered, else the
/// stored one when registered, else the registry default. A nested
/// `questionnaireResponses` object is applied first, so top-level keys win
/// when both name the same field.
pub fn partition(
    registry: &FieldRegistry,
    subject_id: &str,
    payload: &Payload,
    stored_domain: Option<&str>,
) -> Result<Partition> {
    let requested_domain = payload.get(FlatField::TalentDomain.key()).and_then(Value::as_str);
    let active = registry
        .active_namespace(&[requested_domain, stored_domain])
        .to_string();

    let mut parts = Partition {
        active_namespace: active,
        ..Default::default()
    };

    if let Some(nested) = payload.get(NESTED_DOCUMENT_KEY) {
        parts.questionnaire.merge(nested_document(nested)?);
    }

    for (key, value) in payload {
        if key == NESTED_DOCUMENT_KEY || TIMESTAMP_KEYS.contains(&key.as_str()) {
            continue;
        }

        if key == SUBJECT_KEY {
            if value.as_str() != Some(subject_id) {
                return Err(Error::MalformedPayload(format!(
                    "payload subjectId {} does not match {}",
                    value, subject_id
                )));
            }
            continue;
        }

        if let Some(field) = FlatField::from_key(key) {
            let text = value.as_str().ok_or_else(|| {
                Error::MalformedPayload(format!(
                    "profile field '{}' must be a string, got {}",
                    key,
                    json_type(value)
                ))
            })?;
            parts.flat.push((field, text.to_string()));
            continue;
        }

        let answer = field_value(key, value)?;
        let namespace = match registry.field_set(&parts.active_namespace) {
            Some(set) if set.contains(key) => parts.active_namespace.clone(),
            _ => match registry.namespace_of(key) {
                Some(owner) => owner.to_string(),
                None => {
                    parts.unrouted.push(key.clone());
                    registry.fallback_namespace().to_string()
                }
            },
        };
        parts.questionnaire.set(&namespace, key, answer);
    }

    if !parts.unrouted.is_empty() {
        warn!(
            subject_id = %subject_id,
            fallback = %registry.fallback_namespace(),
            keys = ?parts.unrouted,
            "Payload keys matched no questionnaire field"
        );
    }

    Ok(parts)
}

fn nested_document(value: &Value) -> Result<QuestionnaireDocument> {
    let namespaces = value.as_object().ok_or_else(|| {
        Error::MalformedPayload(format!(
            "{} must be an object, got {}",
            NESTED_DOCUMENT_KEY,
            json_type(value)
        ))
    })?;

    let mut document = QuestionnaireDocument::new();
    for (namespace, fields) in namespaces {
        let fields = fields.as_object().ok_or_else(|| {
            Error::MalformedPayload(format!(
                "namespace '{}' must be an object, got {}",
                namespace,
                json_type(fields)
            ))
        })?;
        // An empty object still records the namespace
        document.namespace_mut(namespace);
        for (field, value) in fields {
            document.set(namespace, field, field_value(field, value)?);
        }
    }
    Ok(document)
}

fn field_value(key: &str, value: &Value) -> Result<FieldValue> {
    serde_json::from_value(value.clone()).map_err(|_| {
        Error::MalformedPayload(format!(
            "questionnaire field '{}' has unsupported value type {}",
            key,
            json_type(value)
        ))
    })
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
