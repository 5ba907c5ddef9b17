use chrono::{DateTime, Local, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Project {
    #[serde(deserialize_with = "wire_id")]
    pub project_id: String,
    #[serde(default)]
    pub project_name: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DocumentSummary {
    #[serde(deserialize_with = "wire_id")]
    pub doc_base_id: String,
    #[serde(alias = "original_filename")]
    pub filename: String,
    #[serde(default, alias = "version_number")]
    pub latest_version_number: Option<u32>,
    #[serde(default, deserialize_with = "optional_wire_id")]
    pub version_id: Option<String>,
    #[serde(default)]
    pub status: Option<VersionStatus>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum VersionStatus {
    #[default]
    Processing,
    Ready,
    Error,
}

impl VersionStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Ready => "ready",
            Self::Error => "error",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Version {
    #[serde(deserialize_with = "wire_id")]
    pub version_id: String,
    pub version_number: u32,
    #[serde(deserialize_with = "wire_timestamp")]
    pub upload_time: DateTime<Utc>,
    #[serde(default)]
    pub is_latest: bool,
    #[serde(default, alias = "is_deleted")]
    pub deleted: bool,
    #[serde(default)]
    pub status: VersionStatus,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    System,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub sender: Sender,
    pub text: String,
    #[serde(deserialize_with = "wire_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(
        default,
        rename = "retrieved_chunk_html_ids",
        deserialize_with = "encoded_block_ids"
    )]
    pub source_refs: Vec<String>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
            timestamp: Utc::now(),
            source_refs: Vec::new(),
        }
    }

    pub fn system(text: impl Into<String>, source_refs: Vec<String>) -> Self {
        Self {
            sender: Sender::System,
            text: text.into(),
            timestamp: Utc::now(),
            source_refs,
        }
    }
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Answer {
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<String>,
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UploadReceipt {
    #[serde(deserialize_with = "wire_id")]
    pub version_id: String,
    pub version_number: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(s) => s,
            RawId::Number(n) => n.to_string(),
        }
    }
}

pub(crate) fn wire_id<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    RawId::deserialize(de).map(String::from)
}

fn optional_wire_id<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<RawId>::deserialize(de)?.map(String::from))
}

fn wire_timestamp<'de, D: Deserializer<'de>>(de: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(de)?;
    parse_timestamp(&raw).ok_or_else(|| serde::de::Error::custom(format!("bad timestamp: {raw}")))
}

// Accepts RFC 3339 as well as the naive UTC form the backend stores.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

pub fn local_label(at: &DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

// Stored messages keep their block ids as a JSON string; fresh ones may send a list.
fn encoded_block_ids<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Encoded {
        List(Vec<String>),
        Json(String),
    }

    Ok(match Option::<Encoded>::deserialize(de)? {
        Some(Encoded::List(ids)) => ids,
        Some(Encoded::Json(raw)) => serde_json::from_str(&raw).unwrap_or_else(|err| {
            log::debug!("ignoring malformed block id list {raw:?}: {err}");
            Vec::new()
        }),
        None => Vec::new(),
    })
}
