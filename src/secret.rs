//! # Secret Records
//!
//! Value objects describing remote secrets and the requests made for them.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Identity of one remote secret as returned by the list operation
///
/// Identity is the `arn`. Records are never mutated once listed; a refreshed
/// record is a new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRecord {
    pub name: String,
    pub arn: String,
    /// Version id -> staging labels (e.g. `AWSCURRENT`, `AWSPREVIOUS`)
    pub version_stages: BTreeMap<String, Vec<String>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl SecretRecord {
    pub fn new(name: impl Into<String>, arn: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arn: arn.into(),
            version_stages: BTreeMap::new(),
            created_at: None,
        }
    }

    /// Synthetic record for an explicitly accepted ARN
    ///
    /// The name is unknown until the value is fetched, so the ARN stands in.
    pub fn from_arn(arn: impl Into<String>) -> Self {
        let arn = arn.into();
        Self::new(arn.clone(), arn)
    }

    #[must_use]
    pub fn with_version_stage(mut self, version_id: &str, stage: &str) -> Self {
        self.version_stages
            .entry(version_id.to_string())
            .or_default()
            .push(stage.to_string());
        self
    }

    #[must_use]
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

/// A secret after its current value was fetched
#[derive(Debug, Clone)]
pub struct FetchedSecret {
    pub record: SecretRecord,
    /// `None` when the secret has no string payload (skipped, not an error)
    pub raw_value: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Server-side filter applied to every page of the list call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListFilter {
    /// Filter key, e.g. `name`, `tag-key`, `tag-value`, `description`
    pub key: String,
    pub values: Vec<String>,
}

impl ListFilter {
    pub fn new<I, S>(key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key: key.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// One page of the list operation
#[derive(Debug, Clone, Default)]
pub struct SecretPage {
    pub secrets: Vec<SecretRecord>,
    /// Continuation token; `None` (or empty) on the last page
    pub next_token: Option<String>,
}

/// Parameters of a single get-secret-value call
///
/// Callers may pin a version through
/// [`crate::options::ProviderOptions::with_secret_value_request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretValueRequest {
    pub secret_id: String,
    pub version_id: Option<String>,
    pub version_stage: Option<String>,
}

impl SecretValueRequest {
    pub fn new(secret_id: impl Into<String>) -> Self {
        Self {
            secret_id: secret_id.into(),
            version_id: None,
            version_stage: None,
        }
    }
}

/// Response of a get-secret-value call
#[derive(Debug, Clone, Default)]
pub struct SecretValueResponse {
    pub name: Option<String>,
    pub arn: Option<String>,
    pub secret_string: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Context handed to the secret-value request hook
#[derive(Debug, Clone)]
pub struct SecretValueContext {
    pub name: String,
    pub version_stages: BTreeMap<String, Vec<String>>,
}

impl From<&SecretRecord> for SecretValueContext {
    fn from(record: &SecretRecord) -> Self {
        Self {
            name: record.name.clone(),
            version_stages: record.version_stages.clone(),
        }
    }
}
