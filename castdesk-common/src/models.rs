//! Profile record models
//!
//! A profile is one row of flat, domain-agnostic columns plus a nested
//! questionnaire document keyed by namespace (talent domain).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Role assigned to profiles created without an explicit role
pub const DEFAULT_ROLE: &str = "performer";

/// Payload keys that are neither flat columns nor questionnaire fields
pub const RESERVED_KEYS: &[&str] = &[
    "subjectId",
    "questionnaireResponses",
    "createdAt",
    "updatedAt",
];

/// A single questionnaire answer
///
/// Serialized untagged, so the JSON shape is the plain value: `"5"`,
/// `["drama", "comedy"]`, `true` or `12`. JSON `null` and nested objects
/// are not answers and fail to deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
    Flag(bool),
    Number(serde_json::Number),
}

impl FieldValue {
    /// Text value, if this is a text answer
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// List value, if this is a multi-select answer
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::List(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Flag(value)
    }
}

/// Answers within one namespace, field name -> value
pub type NamespaceResponses = BTreeMap<String, FieldValue>;

/// Questionnaire document: namespace -> field name -> value
///
/// Backed by ordered maps so the stored JSON is stable across writes that
/// don't touch a namespace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionnaireDocument(BTreeMap<String, NamespaceResponses>);

impl QuestionnaireDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn namespace(&self, namespace: &str) -> Option<&NamespaceResponses> {
        self.0.get(namespace)
    }

    /// Mutable access to a namespace, creating it empty if absent
    pub fn namespace_mut(&mut self, namespace: &str) -> &mut NamespaceResponses {
        self.0.entry(namespace.to_string()).or_default()
    }

    pub fn get(&self, namespace: &str, field: &str) -> Option<&FieldValue> {
        self.0.get(namespace).and_then(|fields| fields.get(field))
    }

    /// Set one field, creating the namespace if needed
    pub fn set(&mut self, namespace: &str, field: &str, value: FieldValue) {
        self.namespace_mut(namespace).insert(field.to_string(), value);
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Merge `other` into `self` field by field
    ///
    /// Fields present in `other` overwrite, fields absent from `other` keep
    /// their stored value, and namespaces not mentioned in `other` are left
    /// untouched.
    pub fn merge(&mut self, other: QuestionnaireDocument) {
        for (namespace, fields) in other.0 {
            let target = self.0.entry(namespace).or_default();
            for (field, value) in fields {
                target.insert(field, value);
            }
        }
    }
}

impl From<BTreeMap<String, NamespaceResponses>> for QuestionnaireDocument {
    fn from(map: BTreeMap<String, NamespaceResponses>) -> Self {
        Self(map)
    }
}

impl IntoIterator for QuestionnaireDocument {
    type Item = (String, NamespaceResponses);
    type IntoIter = std::collections::btree_map::IntoIter<String, NamespaceResponses>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Flat profile columns, present for every subject regardless of domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlatField {
    Role,
    TalentDomain,
    DisplayName,
    Bio,
    Location,
    ContactEmail,
    Phone,
    Website,
}

impl FlatField {
    pub const ALL: [FlatField; 8] = [
        FlatField::Role,
        FlatField::TalentDomain,
        FlatField::DisplayName,
        FlatField::Bio,
        FlatField::Location,
        FlatField::ContactEmail,
        FlatField::Phone,
        FlatField::Website,
    ];

    /// Payload/JSON key for this column
    pub fn key(self) -> &'static str {
        match self {
            FlatField::Role => "role",
            FlatField::TalentDomain => "talentDomain",
            FlatField::DisplayName => "displayName",
            FlatField::Bio => "bio",
            FlatField::Location => "location",
            FlatField::ContactEmail => "contactEmail",
            FlatField::Phone => "phone",
            FlatField::Website => "website",
        }
    }

    pub fn from_key(key: &str) -> Option<FlatField> {
        FlatField::ALL.into_iter().find(|f| f.key() == key)
    }
}

/// One stored profile row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    pub subject_id: String,
    pub role: String,
    pub talent_domain: String,
    pub display_name: String,
    pub bio: String,
    pub location: String,
    pub contact_email: String,
    pub phone: String,
    pub website: String,
    pub questionnaire_responses: QuestionnaireDocument,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProfileRecord {
    /// New record with safe defaults for every flat column
    pub fn new(subject_id: impl Into<String>, talent_domain: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            subject_id: subject_id.into(),
            role: DEFAULT_ROLE.to_string(),
            talent_domain: talent_domain.into(),
            display_name: String::new(),
            bio: String::new(),
            location: String::new(),
            contact_email: String::new(),
            phone: String::new(),
            website: String::new(),
            questionnaire_responses: QuestionnaireDocument::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn flat(&self, field: FlatField) -> &str {
        match field {
            FlatField::Role => &self.role,
            FlatField::TalentDomain => &self.talent_domain,
            FlatField::DisplayName => &self.display_name,
            FlatField::Bio => &self.bio,
            FlatField::Location => &self.location,
            FlatField::ContactEmail => &self.contact_email,
            FlatField::Phone => &self.phone,
            FlatField::Website => &self.website,
        }
    }

    pub fn set_flat(&mut self, field: FlatField, value: String) {
        let slot = match field {
            FlatField::Role => &mut self.role,
            FlatField::TalentDomain => &mut self.talent_domain,
            FlatField::DisplayName => &mut self.display_name,
            FlatField::Bio => &mut self.bio,
            FlatField::Location => &mut self.location,
            FlatField::ContactEmail => &mut self.contact_email,
            FlatField::Phone => &mut self.phone,
            FlatField::Website => &mut self.website,
        };
        *slot = value;
    }
}
