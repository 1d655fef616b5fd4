//! Questionnaire field sets
//!
//! Each talent domain owns a fixed list of questionnaire fields. The
//! registry of those lists is the allow-list that decides whether an
//! incoming payload key is a flat profile column or a questionnaire answer,
//! and in which namespace the answer belongs.

use castdesk_common::models::{FieldValue, NamespaceResponses, RESERVED_KEYS};
use castdesk_common::{Error, FlatField, Result};
use std::collections::HashMap;

/// Namespace used when neither the payload nor the stored record names a
/// registered talent domain
pub const DEFAULT_NAMESPACE: &str = "acting";

/// Namespace receiving payload keys that match no known field
pub const FALLBACK_NAMESPACE: &str = "additional";

/// Shape of a questionnaire answer, used to pick its empty default
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Single answer, defaults to `""`
    Scalar,
    /// Multi-select answer, defaults to `[]`
    MultiSelect,
}

impl FieldKind {
    pub fn empty_value(self) -> FieldValue {
        match self {
            FieldKind::Scalar => FieldValue::Text(String::new()),
            FieldKind::MultiSelect => FieldValue::List(Vec::new()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

const fn scalar(name: &'static str) -> FieldSpec {
    FieldSpec { name, kind: FieldKind::Scalar }
}

const fn multi(name: &'static str) -> FieldSpec {
    FieldSpec { name, kind: FieldKind::MultiSelect }
}

const ACTING_FIELDS: &[FieldSpec] = &[
    scalar("primarySpecialty"),
    scalar("yearsExperience"),
    scalar("trainingBackground"),
    scalar("actingMethod"),
    scalar("stageCombat"),
    multi("accents"),
    multi("languages"),
    multi("specialSkills"),
    multi("roleTypes"),
    scalar("unionStatus"),
    scalar("availability"),
    scalar("willingToTravel"),
    scalar("representationStatus"),
];

const VOICEOVER_FIELDS: &[FieldSpec] = &[
    scalar("voiceType"),
    scalar("vocalRange"),
    multi("voiceStyles"),
    scalar("homeStudio"),
    scalar("recordingSetup"),
    scalar("turnaroundTime"),
    scalar("demoReelUrl"),
];

const PRODUCTION_FIELDS: &[FieldSpec] = &[
    multi("productionFocus"),
    scalar("creditsCount"),
    scalar("budgetRange"),
    scalar("crewSize"),
    multi("distributionChannels"),
];

/// Fields belonging to one namespace
#[derive(Debug, Clone)]
pub struct FieldSet {
    namespace: String,
    fields: Vec<FieldSpec>,
}

impl FieldSet {
    pub fn new(namespace: impl Into<String>, fields: &[FieldSpec]) -> Self {
        Self {
            namespace: namespace.into(),
            fields: fields.to_vec(),
        }
    }

    pub fn acting() -> Self {
        Self::new("acting", ACTING_FIELDS)
    }

    pub fn voiceover() -> Self {
        Self::new("voiceover", VOICEOVER_FIELDS)
    }

    pub fn production() -> Self {
        Self::new("production", PRODUCTION_FIELDS)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|spec| spec.name == field)
    }

    /// Every field of the set at its empty value
    pub fn defaults(&self) -> NamespaceResponses {
        self.fields
            .iter()
            .map(|spec| (spec.name.to_string(), spec.kind.empty_value()))
            .collect()
    }
}

/// All known field sets plus the default and fallback namespaces
///
/// Construction rejects any field name that is also a flat column or a
/// reserved key, and any field claimed by two namespaces, so routing a
/// payload key never has more than one answer.
#[derive(Debug, Clone)]
pub struct FieldRegistry {
    sets: Vec<FieldSet>,
    owners: HashMap<&'static str, usize>,
    default_namespace: String,
    fallback_namespace: String,
}

impl FieldRegistry {
    pub fn new(
        sets: Vec<FieldSet>,
        default_namespace: impl Into<String>,
        fallback_namespace: impl Into<String>,
    ) -> Result<Self> {
        let default_namespace = default_namespace.into();
        let fallback_namespace = fallback_namespace.into();
        let mut owners = HashMap::new();

        for (index, set) in sets.iter().enumerate() {
            if set.namespace.is_empty() {
                return Err(Error::Config("Field set with empty namespace".to_string()));
            }
            if sets[..index].iter().any(|s| s.namespace == set.namespace) {
                return Err(Error::Config(format!(
                    "Namespace '{}' registered twice",
                    set.namespace
                )));
            }

            for spec in &set.fields {
                if FlatField::from_key(spec.name).is_some() || RESERVED_KEYS.contains(&spec.name) {
                    return Err(Error::Config(format!(
                        "Questionnaire field '{}' in '{}' collides with a profile column",
                        spec.name, set.namespace
                    )));
                }
                if let Some(previous) = owners.insert(spec.name, index) {
                    return Err(Error::Config(format!(
                        "Questionnaire field '{}' claimed by both '{}' and '{}'",
                        spec.name, sets[previous].namespace, set.namespace
                    )));
                }
            }
        }

        if !sets.iter().any(|s| s.namespace == default_namespace) {
            return Err(Error::Config(format!(
                "Default namespace '{}' has no field set",
                default_namespace
            )));
        }
        if fallback_namespace.is_empty() || sets.iter().any(|s| s.namespace == fallback_namespace) {
            return Err(Error::Config(format!(
                "Fallback namespace '{}' must be non-empty and unregistered",
                fallback_namespace
            )));
        }

        Ok(Self {
            sets,
            owners,
            default_namespace,
            fallback_namespace,
        })
    }

    /// Built-in field sets (acting, voiceover, production)
    pub fn builtin(default_namespace: &str) -> Result<Self> {
        Self::new(
            vec![FieldSet::acting(), FieldSet::voiceover(), FieldSet::production()],
            default_namespace,
            FALLBACK_NAMESPACE,
        )
    }

    pub fn default_namespace(&self) -> &str {
        &self.default_namespace
    }

    pub fn fallback_namespace(&self) -> &str {
        &self.fallback_namespace
    }

    pub fn field_set(&self, namespace: &str) -> Option<&FieldSet> {
        self.sets.iter().find(|s| s.namespace == namespace)
    }

    pub fn is_registered(&self, namespace: &str) -> bool {
        self.field_set(namespace).is_some()
    }

    /// Namespace owning `field`, if any
    pub fn namespace_of(&self, field: &str) -> Option<&str> {
        self.owners
            .get(field)
            .map(|&index| self.sets[index].namespace.as_str())
    }

    /// First registered candidate, else the default namespace
    pub fn active_namespace<'a>(&'a self, candidates: &[Option<&'a str>]) -> &'a str {
        candidates
            .iter()
            .flatten()
            .copied()
            .find(|ns| self.is_registered(ns))
            .unwrap_or(self.default_namespace.as_str())
    }
}
