//! Lenient view of a HAR capture: only what the converter reads, with every
//! field optional so partial exports still load.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct HarCapture {
    pub log: HarLog,
}

/// Entries stay untyped here; each one is read on its own so a bad entry
/// only skips itself.
#[derive(Debug, Deserialize)]
pub struct HarLog {
    pub entries: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct HarEntry {
    #[serde(default)]
    pub request: Option<HarRequest>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarRequest {
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub headers: Vec<HarNameValue>,
    #[serde(default)]
    pub query_string: Vec<HarNameValue>,
    #[serde(default)]
    pub post_data: Option<HarPostData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HarNameValue {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

impl HarNameValue {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    pub fn value(&self) -> &str {
        self.value.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarPostData {
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub params: Option<Vec<HarNameValue>>,
}
