//! Collection Data Models - Postman Collection v2.1 shape
//!
//! Items are classified once, when the document is parsed, into folders,
//! requests or malformed nodes. Every struct keeps the fields it does not
//! model in `extra`, and remembers the key order and explicit nulls it was
//! read with, so an unedited document saves back to the same text.

use serde::{de, ser, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

pub const SCHEMA_V2_1: &str = "https://schema.getpostman.com/json/collection/v2.1.0/collection.json";
pub const SCRIPT_TYPE: &str = "text/javascript";
const UNNAMED: &str = "Unnamed";

/// A value that is either a well-formed `T` or kept verbatim for saving
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Lenient<T> {
    Valid(T),
    Malformed(Value),
}

impl<T> Lenient<T> {
    pub fn valid(&self) -> Option<&T> {
        match self {
            Lenient::Valid(value) => Some(value),
            Lenient::Malformed(_) => None,
        }
    }

    pub fn valid_mut(&mut self) -> Option<&mut T> {
        match self {
            Lenient::Valid(value) => Some(value),
            Lenient::Malformed(_) => None,
        }
    }
}

/// Key order and explicit nulls of an object as it was read
#[derive(Debug, Clone, Default)]
pub struct Layout {
    keys: Vec<String>,
    nulls: Vec<String>,
}

/// Documents compare by content; key order only matters when writing.
impl PartialEq for Layout {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl Layout {
    fn read<'de, D>(deserializer: D) -> Result<(Map<String, Value>, Self), D::Error>
    where
        D: Deserializer<'de>,
    {
        let fields = Map::<String, Value>::deserialize(deserializer)?;
        let layout = Layout {
            keys: fields.keys().cloned().collect(),
            nulls: fields
                .iter()
                .filter(|(_, value)| value.is_null())
                .map(|(key, _)| key.clone())
                .collect(),
        };
        Ok((fields, layout))
    }

    /// Put `value`'s keys back in read order and restore nulls that an
    /// `Option` field dropped. Keys added since loading go last.
    fn arrange(&self, value: Value) -> Value {
        let fields = match value {
            Value::Object(fields) if !self.keys.is_empty() => fields,
            other => return other,
        };

        let mut arranged = Map::new();
        for key in &self.keys {
            if fields.contains_key(key) || self.nulls.contains(key) {
                arranged.insert(key.clone(), Value::Null);
            }
        }
        // insert on an existing key keeps its slot
        for (key, value) in fields {
            arranged.insert(key, value);
        }
        Value::Object(arranged)
    }
}

/// Serde impls for the object nodes: the derived (remote = "Self") code maps
/// the fields, these wrap it with the node's `Layout`.
macro_rules! keep_layout {
    ($($node:ident),* $(,)?) => {$(
        impl<'de> Deserialize<'de> for $node {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let (fields, layout) = Layout::read(deserializer)?;
                let mut node = $node::deserialize(Value::Object(fields))
                    .map_err(<D::Error as de::Error>::custom)?;
                node.layout = layout;
                Ok(node)
            }
        }

        impl Serialize for $node {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                let value = $node::serialize(self, serde_json::value::Serializer)
                    .map_err(<S::Error as ser::Error>::custom)?;
                self.layout.arrange(value).serialize(serializer)
            }
        }
    )*};
}

keep_layout!(
    Collection,
    Info,
    Variable,
    Folder,
    RequestItem,
    Request,
    Header,
    StructuredUrl,
    QueryParam,
    Body,
    BodyOptions,
    RawOptions,
    FormParam,
    ScriptBlock,
    Event,
);

// ==================== Document ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(remote = "Self")]
pub struct Collection {
    #[serde(default, skip_serializing_if = "Info::is_empty")]
    pub info: Info,
    pub item: Vec<Item>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<Vec<Lenient<Variable>>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip)]
    pub(crate) layout: Layout,
}

impl Collection {
    /// Empty v2.1 collection with a freshly generated id
    pub fn new(name: &str) -> Self {
        Self {
            info: Info {
                collection_id: Some(uuid::Uuid::new_v4().to_string()),
                name: Some(name.to_string()),
                description: None,
                schema: Some(SCHEMA_V2_1.to_string()),
                extra: Map::new(),
                layout: Layout::default(),
            },
            item: Vec::new(),
            variable: None,
            extra: Map::new(),
            layout: Layout::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(remote = "Self")]
pub struct Info {
    #[serde(rename = "_postman_id", default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Either a plain string or a `{content, type}` object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip)]
    pub(crate) layout: Layout,
}

impl Info {
    pub fn is_empty(&self) -> bool {
        self.collection_id.is_none()
            && self.name.is_none()
            && self.description.is_none()
            && self.schema.is_none()
            && self.extra.is_empty()
    }

    pub fn description_text(&self) -> Option<&str> {
        match self.description.as_ref()? {
            Value::String(text) => Some(text),
            Value::Object(map) => map.get("content").and_then(Value::as_str),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(remote = "Self")]
pub struct Variable {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip)]
    pub(crate) layout: Layout,
}

impl Variable {
    pub fn new(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: Some(Value::String(value.to_string())),
            extra: Map::new(),
            layout: Layout::default(),
        }
    }
}

// ==================== Item tree ====================

/// One node of the item tree.
///
/// A node with a `request` field is a request even when it also carries an
/// `item` field; the stray field is kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Item {
    Folder(Folder),
    Request(RequestItem),
    Malformed(Value),
}

impl Item {
    pub fn classify(value: Value) -> Self {
        let (has_request, has_items) = match &value {
            Value::Object(map) => (map.contains_key("request"), map.contains_key("item")),
            _ => (false, false),
        };

        if has_request {
            match <RequestItem as Deserialize>::deserialize(&value) {
                Ok(request) => Item::Request(request),
                Err(e) => {
                    log::debug!("Keeping unreadable request item verbatim: {}", e);
                    Item::Malformed(value)
                }
            }
        } else if has_items {
            match <Folder as Deserialize>::deserialize(&value) {
                Ok(folder) => Item::Folder(folder),
                Err(e) => {
                    log::debug!("Keeping unreadable folder verbatim: {}", e);
                    Item::Malformed(value)
                }
            }
        } else {
            Item::Malformed(value)
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Item::Folder(folder) => folder.name.as_deref(),
            Item::Request(request) => request.name.as_deref(),
            Item::Malformed(raw) => raw.get("name").and_then(Value::as_str),
        }
    }
}

impl<'de> Deserialize<'de> for Item {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(Item::classify)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(remote = "Self")]
pub struct Folder {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub item: Vec<Item>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip)]
    pub(crate) layout: Layout,
}

impl Folder {
    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            item: Vec::new(),
            extra: Map::new(),
            layout: Layout::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(remote = "Self")]
pub struct RequestItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Scripts attached to the item itself rather than to its request
    #[serde(rename = "event", default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<Lenient<Event>>>,
    pub request: Request,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip)]
    pub(crate) layout: Layout,
}

impl RequestItem {
    pub fn new(name: &str, request: Request) -> Self {
        Self {
            name: Some(name.to_string()),
            events: None,
            request,
            extra: Map::new(),
            layout: Layout::default(),
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(UNNAMED)
    }
}

// ==================== Request ====================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(remote = "Self")]
pub struct Request {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<Vec<Lenient<Header>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Lenient<Body>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<Url>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prerequest: Option<Script>,
    #[serde(rename = "event", default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<Lenient<Event>>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip)]
    pub(crate) layout: Layout,
}

impl Request {
    /// `url.raw` for structured URLs, the string itself otherwise
    pub fn resolved_url(&self) -> &str {
        self.url.as_ref().and_then(Url::raw).unwrap_or("")
    }

    pub fn headers(&self) -> impl Iterator<Item = &Header> {
        self.header.iter().flatten().filter_map(Lenient::valid)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(remote = "Self")]
pub struct Header {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip)]
    pub(crate) layout: Layout,
}

impl Header {
    pub fn text(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: Some(value.to_string()),
            disabled: None,
            kind: Some("text".to_string()),
            extra: Map::new(),
            layout: Layout::default(),
        }
    }

    pub fn matches(&self, lowercase_key: &str) -> bool {
        self.key.to_lowercase() == lowercase_key
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Url {
    Raw(String),
    Structured(StructuredUrl),
    Other(Value),
}

impl Url {
    pub fn raw(&self) -> Option<&str> {
        match self {
            Url::Raw(raw) => Some(raw),
            Url::Structured(url) => url.raw.as_deref(),
            Url::Other(_) => None,
        }
    }

    pub fn raw_mut(&mut self) -> Option<&mut String> {
        match self {
            Url::Raw(raw) => Some(raw),
            Url::Structured(url) => url.raw.as_mut(),
            Url::Other(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(remote = "Self")]
pub struct StructuredUrl {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<Segments>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Segments>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<Vec<Lenient<QueryParam>>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip)]
    pub(crate) layout: Layout,
}

/// Host or path of a structured URL: a joined string or a list of parts.
/// Path parts may be objects (path variables), so parts stay untyped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Segments {
    Joined(String),
    Parts(Vec<Value>),
}

impl Segments {
    pub fn from_parts<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Segments::Parts(parts.into_iter().map(|p| Value::String(p.into())).collect())
    }

    pub fn texts(&self) -> Vec<&str> {
        match self {
            Segments::Joined(joined) => vec![joined.as_str()],
            Segments::Parts(parts) => parts.iter().filter_map(Value::as_str).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(remote = "Self")]
pub struct QueryParam {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip)]
    pub(crate) layout: Layout,
}

impl QueryParam {
    pub fn new(key: &str, value: &str) -> Self {
        Self {
            key: Some(key.to_string()),
            value: Some(value.to_string()),
            disabled: None,
            extra: Map::new(),
            layout: Layout::default(),
        }
    }
}

// ==================== Body ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyMode {
    Raw,
    Urlencoded,
    Formdata,
    File,
    Binary,
    Graphql,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(remote = "Self")]
pub struct Body {
    pub mode: BodyMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urlencoded: Option<Vec<Lenient<FormParam>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<BodyOptions>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip)]
    pub(crate) layout: Layout,
}

impl Body {
    pub fn raw(text: &str, language: Option<&str>) -> Self {
        Self {
            mode: BodyMode::Raw,
            raw: Some(text.to_string()),
            urlencoded: None,
            options: language.map(|language| BodyOptions {
                raw: Some(RawOptions {
                    language: Some(language.to_string()),
                    extra: Map::new(),
                    layout: Layout::default(),
                }),
                extra: Map::new(),
                layout: Layout::default(),
            }),
            extra: Map::new(),
            layout: Layout::default(),
        }
    }

    pub fn urlencoded(fields: Vec<FormParam>) -> Self {
        Self {
            mode: BodyMode::Urlencoded,
            raw: None,
            urlencoded: Some(fields.into_iter().map(Lenient::Valid).collect()),
            options: None,
            extra: Map::new(),
            layout: Layout::default(),
        }
    }

    pub fn raw_language(&self) -> Option<&str> {
        self.options.as_ref()?.raw.as_ref()?.language.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(remote = "Self")]
pub struct BodyOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<RawOptions>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip)]
    pub(crate) layout: Layout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(remote = "Self")]
pub struct RawOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip)]
    pub(crate) layout: Layout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(remote = "Self")]
pub struct FormParam {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip)]
    pub(crate) layout: Layout,
}

impl FormParam {
    pub fn text(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: Some(value.to_string()),
            disabled: None,
            kind: Some("text".to_string()),
            extra: Map::new(),
            layout: Layout::default(),
        }
    }
}

// ==================== Scripts ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Script {
    /// Legacy form: the whole script as one string
    Text(String),
    Block(ScriptBlock),
    Other(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(remote = "Self")]
pub struct ScriptBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exec: Option<Exec>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip)]
    pub(crate) layout: Layout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Exec {
    Lines(Vec<String>),
    Text(String),
}

impl Exec {
    fn lines(&self) -> Vec<&str> {
        match self {
            Exec::Lines(lines) => lines.iter().map(String::as_str).collect(),
            Exec::Text(text) => text.lines().collect(),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Exec::Lines(lines) => lines.is_empty(),
            Exec::Text(text) => text.is_empty(),
        }
    }
}

impl Script {
    /// Canonical cleared script
    pub fn empty() -> Self {
        Script::Block(ScriptBlock {
            exec: Some(Exec::Lines(Vec::new())),
            kind: Some(SCRIPT_TYPE.to_string()),
            extra: Map::new(),
            layout: Layout::default(),
        })
    }

    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Script::Block(ScriptBlock {
            exec: Some(Exec::Lines(lines.into_iter().map(Into::into).collect())),
            kind: Some(SCRIPT_TYPE.to_string()),
            extra: Map::new(),
            layout: Layout::default(),
        })
    }

    pub fn lines(&self) -> Vec<&str> {
        match self {
            Script::Text(text) => text.lines().collect(),
            Script::Block(block) => block.exec.as_ref().map(Exec::lines).unwrap_or_default(),
            Script::Other(_) => Vec::new(),
        }
    }

    /// True when there is nothing to clear. A legacy string of whitespace
    /// counts as empty, a line list only when it has no entries.
    pub fn is_empty(&self) -> bool {
        match self {
            Script::Text(text) => text.trim().is_empty(),
            Script::Block(block) => block.exec.as_ref().map_or(true, Exec::is_empty),
            Script::Other(_) => true,
        }
    }

    /// At least one non-blank line
    pub fn has_code(&self) -> bool {
        self.lines().iter().any(|line| !line.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(remote = "Self")]
pub struct Event {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listen: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<Script>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip)]
    pub(crate) layout: Layout,
}

impl Event {
    pub fn new(listen: &str, script: Script) -> Self {
        Self {
            listen: Some(listen.to_string()),
            script: Some(script),
            extra: Map::new(),
            layout: Layout::default(),
        }
    }

    /// A test or pre-request event whose script has lines to clear
    pub fn carries_script(&self) -> bool {
        matches!(self.listen.as_deref(), Some("test") | Some("prerequest"))
            && self.script.as_ref().is_some_and(|script| !script.is_empty())
    }
}
