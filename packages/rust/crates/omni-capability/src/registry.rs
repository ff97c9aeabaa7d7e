//! Capability registry: typed entries, immutable snapshots, and sources.
//!
//! Upstream records arrive loosely typed (database rows, tool manifests).
//! [`parse_capability_records`] is the single adapter that turns them into
//! [`CapabilityEntry`] values; nothing past the registry sees raw JSON.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CapabilityError;

/// One retrievable capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityEntry {
    /// Stable identifier, unique within a registry.
    pub id: String,
    /// Short identifier (primary lexical match target).
    pub name: String,
    /// Single classification label.
    #[serde(default)]
    pub category: String,
    /// Short keyword set.
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Free text, may be empty.
    #[serde(default)]
    pub description: String,
    /// Domain vocabulary, distinct from tags.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Invocation count maintained by telemetry.
    #[serde(default)]
    pub usage_count: u64,
    /// Last invocation time; `None` means never used.
    #[serde(default)]
    pub last_used_at: Option<DateTime<Utc>>,
}

impl CapabilityEntry {
    /// Create an entry with empty optional fields.
    pub fn new(id: impl Into<String>, name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: category.into(),
            tags: BTreeSet::new(),
            description: String::new(),
            keywords: Vec::new(),
            usage_count: 0,
            last_used_at: None,
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the keyword list.
    #[must_use]
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Set the tag set (duplicates collapse).
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Set usage telemetry.
    #[must_use]
    pub fn with_usage(mut self, usage_count: u64, last_used_at: Option<DateTime<Utc>>) -> Self {
        self.usage_count = usage_count;
        self.last_used_at = last_used_at;
        self
    }
}

/// Immutable registry snapshot with id lookup.
#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    entries: Vec<Arc<CapabilityEntry>>,
    by_id: HashMap<String, usize>,
    by_name: HashMap<String, usize>,
}

impl CapabilityRegistry {
    /// Build a registry, rejecting empty or duplicate ids.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::EmptyId`] or [`CapabilityError::DuplicateId`].
    pub fn new(entries: Vec<CapabilityEntry>) -> Result<Self, CapabilityError> {
        let mut by_id = HashMap::with_capacity(entries.len());
        let mut by_name = HashMap::with_capacity(entries.len());
        let mut shared = Vec::with_capacity(entries.len());

        for (idx, entry) in entries.into_iter().enumerate() {
            if entry.id.trim().is_empty() {
                return Err(CapabilityError::EmptyId(entry.name));
            }
            if by_id.insert(entry.id.clone(), idx).is_some() {
                return Err(CapabilityError::DuplicateId(entry.id));
            }
            // First registration wins a name collision.
            by_name.entry(entry.name.clone()).or_insert(idx);
            shared.push(Arc::new(entry));
        }

        Ok(Self {
            entries: shared,
            by_id,
            by_name,
        })
    }

    /// Registry with no entries.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the registry holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in registration order.
    #[must_use]
    pub fn entries(&self) -> &[Arc<CapabilityEntry>] {
        &self.entries
    }

    /// Iterate entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<CapabilityEntry>> {
        self.entries.iter()
    }

    /// Look up an entry by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Arc<CapabilityEntry>> {
        self.by_id.get(id).map(|&idx| &self.entries[idx])
    }

    /// Look up an entry by id, falling back to an exact name match.
    #[must_use]
    pub fn resolve(&self, id_or_name: &str) -> Option<&Arc<CapabilityEntry>> {
        self.get(id_or_name).or_else(|| {
            self.by_name
                .get(id_or_name)
                .map(|&idx| &self.entries[idx])
        })
    }

    /// Sorted, de-duplicated category labels.
    #[must_use]
    pub fn categories(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| e.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Entries whose category equals `category`.
    #[must_use]
    pub fn by_category(&self, category: &str) -> Vec<Arc<CapabilityEntry>> {
        self.entries
            .iter()
            .filter(|e| e.category == category)
            .cloned()
            .collect()
    }
}

/// Read side of the capability data store.
#[async_trait]
pub trait RegistrySource: Send + Sync {
    /// Fetch a full, consistent snapshot of every capability.
    async fn fetch_all_capabilities(&self) -> Result<Vec<CapabilityEntry>, CapabilityError>;
}

/// Source backed by an in-memory list.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistrySource {
    entries: Vec<CapabilityEntry>,
}

impl StaticRegistrySource {
    /// Wrap a fixed list of entries.
    #[must_use]
    pub fn new(entries: Vec<CapabilityEntry>) -> Self {
        Self { entries }
    }
}

#[async_trait]
impl RegistrySource for StaticRegistrySource {
    async fn fetch_all_capabilities(&self) -> Result<Vec<CapabilityEntry>, CapabilityError> {
        Ok(self.entries.clone())
    }
}

/// Source backed by a JSON export of capability records.
#[derive(Debug, Clone)]
pub struct JsonFileRegistrySource {
    path: PathBuf,
}

impl JsonFileRegistrySource {
    /// Read records from `path` on every fetch.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl RegistrySource for JsonFileRegistrySource {
    async fn fetch_all_capabilities(&self) -> Result<Vec<CapabilityEntry>, CapabilityError> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        parse_capability_records(&raw)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCapabilityRecord {
    #[serde(default, alias = "_id")]
    id: Option<Value>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    keywords: Option<Vec<String>>,
    #[serde(default)]
    usage_count: Option<Value>,
    #[serde(default)]
    last_used_at: Option<Value>,
}

impl RawCapabilityRecord {
    fn into_entry(self) -> CapabilityEntry {
        let name = self.name.unwrap_or_default();
        let id = match self.id {
            Some(Value::String(s)) => s,
            Some(Value::Number(n)) => n.to_string(),
            _ => name.clone(),
        };
        let usage_count = match self.usage_count {
            Some(Value::Number(n)) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|v| *v > 0.0).map(|v| v as u64))
                .unwrap_or(0),
            _ => 0,
        };
        let last_used_at = match self.last_used_at {
            Some(Value::String(s)) => DateTime::parse_from_rfc3339(&s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|v| v as i64))
                .and_then(DateTime::from_timestamp_millis),
            _ => None,
        };

        CapabilityEntry {
            id,
            name,
            category: self.category.unwrap_or_default(),
            tags: self.tags.unwrap_or_default().into_iter().collect(),
            description: self.description.unwrap_or_default(),
            keywords: self.keywords.unwrap_or_default(),
            usage_count,
            last_used_at,
        }
    }
}

/// Adapt a JSON export into typed entries.
///
/// Accepts a bare array or an object with a `capabilities` array. Missing
/// optional fields become empty values; `id` falls back to `name`;
/// `lastUsedAt` may be RFC 3339 or epoch milliseconds.
///
/// # Errors
///
/// Returns [`CapabilityError::Serialization`] for malformed JSON.
pub fn parse_capability_records(raw: &str) -> Result<Vec<CapabilityEntry>, CapabilityError> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Envelope {
        List(Vec<RawCapabilityRecord>),
        Wrapped { capabilities: Vec<RawCapabilityRecord> },
    }

    let records = match serde_json::from_str::<Envelope>(raw)? {
        Envelope::List(records) | Envelope::Wrapped { capabilities: records } => records,
    };
    Ok(records
        .into_iter()
        .map(RawCapabilityRecord::into_entry)
        .collect())
}
