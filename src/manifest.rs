//! Serde document shapes for the manifest files a dump ships. The handful of
//! genuinely open-ended maps (`basenames`, `options`) stay as loosely-typed
//! JSON maps; everything whose shape is known up front gets a typed struct
//! with `#[serde(default)]` for fields a manifest may simply omit.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct RootManifest {
    #[serde(default)]
    pub schemas: Vec<String>,
    #[serde(default)]
    pub basenames: HashMap<String, String>,
    pub version: Option<String>,
    #[serde(rename = "serverVersion")]
    pub server_version: Option<String>,
    #[serde(rename = "defaultCharacterSet")]
    pub default_character_set: Option<String>,
    #[serde(rename = "gtidExecuted")]
    pub gtid_executed: Option<String>,
    #[serde(rename = "tzUtc", default)]
    pub tz_utc: bool,
    #[serde(rename = "mdsCompatibility", default)]
    pub mds_compatibility: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchemaManifest {
    #[serde(default)]
    pub tables: Vec<String>,
    #[serde(default)]
    pub views: Vec<String>,
    #[serde(default)]
    pub functions: Vec<String>,
    #[serde(default)]
    pub procedures: Vec<String>,
    #[serde(default)]
    pub events: Vec<String>,
    #[serde(default)]
    pub basenames: HashMap<String, String>,
    #[serde(rename = "includesDdl", default = "default_true")]
    pub includes_ddl: bool,
    #[serde(rename = "includesData", default = "default_true")]
    pub includes_data: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Histogram {
    pub column: String,
    pub buckets: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableManifest {
    #[serde(rename = "includesDdl", default = "default_true")]
    pub includes_ddl: bool,
    #[serde(rename = "includesData", default = "default_true")]
    pub includes_data: bool,
    #[serde(default)]
    pub options: HashMap<String, Value>,
    #[serde(default = "default_extension")]
    pub extension: String,
    #[serde(default)]
    pub chunking: bool,
    #[serde(default)]
    pub histograms: Vec<Histogram>,
}

fn default_extension() -> String {
    "tsv".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct TerminatorManifest {
    #[serde(rename = "dataBytes")]
    pub data_bytes: Option<u64>,
    #[serde(rename = "tableDataBytes")]
    pub table_data_bytes: Option<HashMap<String, HashMap<String, u64>>>,
}

/// Normalized per-table options, derived from [`TableManifest::options`]:
/// drop `compression`, rename `defaultCharacterSet` to
/// `characterSet` (or inject the dump's default if absent), and pull
/// `primaryIndex` out into its own field.
#[derive(Debug, Clone, Default)]
pub struct NormalizedOptions {
    pub options: HashMap<String, Value>,
    pub primary_index: String,
}

pub fn normalize_options(
    mut options: HashMap<String, Value>,
    dump_default_charset: Option<&str>,
) -> NormalizedOptions {
    options.remove("compression");

    let primary_index = match options.remove("primaryIndex") {
        Some(Value::String(s)) => s,
        _ => String::new(),
    };

    if let Some(charset) = options.remove("defaultCharacterSet") {
        options.insert("characterSet".to_string(), charset);
    } else if let Some(default_charset) = dump_default_charset {
        options.insert(
            "characterSet".to_string(),
            Value::String(default_charset.to_string()),
        );
    }

    NormalizedOptions {
        options,
        primary_index,
    }
}
