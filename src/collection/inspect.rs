use super::model::{Collection, Event, Lenient, RequestItem};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    pub name: String,
    pub method: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ScriptKind {
    PreRequest,
    /// Event script, by its `listen` value
    Event(String),
}

impl fmt::Display for ScriptKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ScriptKind::PreRequest => write!(f, "Pre-request"),
            ScriptKind::Event(listen) => {
                let mut chars = listen.chars();
                match chars.next() {
                    Some(first) => write!(f, "{}{}", first.to_uppercase(), chars.as_str()),
                    None => Ok(()),
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ScriptLevel {
    Request,
    Item,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptFinding {
    pub kind: ScriptKind,
    pub level: ScriptLevel,
    pub lines: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptSummary {
    pub name: String,
    pub scripts: Vec<ScriptFinding>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionInfo {
    pub name: Option<String>,
    pub description: Option<String>,
    pub total_requests: usize,
    /// Size of the file the document was loaded from
    pub file_size_bytes: Option<u64>,
}

impl Collection {
    pub fn list_all_endpoints(&self) -> Vec<Endpoint> {
        self.requests()
            .map(|item| Endpoint {
                name: item.display_name().to_string(),
                method: item
                    .request
                    .method
                    .clone()
                    .unwrap_or_else(|| "UNKNOWN".to_string()),
                url: item.request.resolved_url().to_string(),
            })
            .collect()
    }

    /// Requests carrying at least one script with a non-blank line
    pub fn list_scripts_in_collection(&self) -> Vec<ScriptSummary> {
        self.requests()
            .filter_map(|item| {
                let scripts = find_scripts(item);
                (!scripts.is_empty()).then(|| ScriptSummary {
                    name: item.display_name().to_string(),
                    scripts,
                })
            })
            .collect()
    }

    pub fn collection_info(&self) -> CollectionInfo {
        CollectionInfo {
            name: self.info.name.clone(),
            description: self.info.description_text().map(str::to_string),
            total_requests: self.request_count(),
            file_size_bytes: None,
        }
    }
}

fn find_scripts(item: &RequestItem) -> Vec<ScriptFinding> {
    let mut found = Vec::new();

    if let Some(script) = item.request.prerequest.as_ref().filter(|s| s.has_code()) {
        found.push(ScriptFinding {
            kind: ScriptKind::PreRequest,
            level: ScriptLevel::Request,
            lines: script.lines().len(),
        });
    }
    collect_event_scripts(&item.request.events, ScriptLevel::Request, &mut found);
    collect_event_scripts(&item.events, ScriptLevel::Item, &mut found);

    found
}

fn collect_event_scripts(
    events: &Option<Vec<Lenient<Event>>>,
    level: ScriptLevel,
    found: &mut Vec<ScriptFinding>,
) {
    for event in events.iter().flatten().filter_map(Lenient::valid) {
        let Some(script) = event.script.as_ref().filter(|s| s.has_code()) else {
            continue;
        };
        found.push(ScriptFinding {
            kind: ScriptKind::Event(event.listen.clone().unwrap_or_else(|| "unknown".into())),
            level,
            lines: script.lines().len(),
        });
    }
}
