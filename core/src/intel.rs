use serde::{Deserialize, Deserializer, Serialize};

/// Verdict the upstream assigns to an IP address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Malicious,
    Suspicious,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Classification {
    pub fn as_str(self) -> &'static str {
        match self {
            Classification::Malicious => "malicious",
            Classification::Suspicious => "suspicious",
            Classification::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
    #[serde(other)]
    Unknown,
}

/// Intent carried by a tag. `none` is a real upstream value, distinct from a missing intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Malicious,
    Suspicious,
    None,
    #[serde(other)]
    Unknown,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Intent::Malicious => "malicious",
            Intent::Suspicious => "suspicious",
            Intent::None => "none",
            Intent::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Activity,
    Tool,
    Actor,
    None,
    #[serde(other)]
    Unknown,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Activity => "activity",
            Category::Tool => "tool",
            Category::Actor => "actor",
            Category::None => "none",
            Category::Unknown => "unknown",
        }
    }
}

/// Autonomous system the address is routed from.
///
/// Upstream sends `{asn, name, countryCode}`; the fields are renamed here once
/// so nothing downstream sees the wire names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asn {
    #[serde(rename(deserialize = "asn"), deserialize_with = "string_or_number")]
    pub number: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename(deserialize = "countryCode"), default)]
    pub country: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Number(number) => format!("AS{number}"),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbuseContact {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// One observed behaviour of an address (scan, brute force, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub timestamp: String,
    pub severity: Severity,
}

/// Result of an IP lookup. Produced per call, never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupResult {
    pub ip: String,
    #[serde(default)]
    pub classification: Classification,
    /// Upstream's own threat grading; may be finer-grained than `classification`
    #[serde(default)]
    pub threat_level: Option<String>,
    #[serde(default)]
    pub confidence: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub first_seen: Option<String>,
    #[serde(default)]
    pub last_seen: Option<String>,
    #[serde(default)]
    pub abuse_contact: Option<AbuseContact>,
    #[serde(default)]
    pub asn: Option<Asn>,
    #[serde(default)]
    pub blocklists: Vec<String>,
    #[serde(default)]
    pub activities: Vec<Activity>,
}

/// A tag as it appears in the tag listing. `name` is unique within one listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSummary {
    pub name: String,
    #[serde(default)]
    pub intent: Option<Intent>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub action: String,
    pub timestamp: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagDetails {
    pub name: String,
    pub intent: Intent,
    pub category: Category,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub confidence: Option<String>,
    #[serde(default)]
    pub references: Vec<String>,
    #[serde(default)]
    pub timeline: Vec<TimelineEntry>,
}

/// One page of addresses carrying a tag.
///
/// `entries` keeps upstream order. `snapshot` is opaque: it is passed back on
/// the next request unchanged and never inspected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagIpsPage {
    pub tag: String,
    #[serde(default)]
    pub entries: Vec<String>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
    #[serde(default)]
    pub last_update: Option<String>,
    #[serde(default)]
    pub snapshot: Option<String>,
}
