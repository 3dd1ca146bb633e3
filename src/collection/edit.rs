//! Bulk mutations over every request of a collection.
//!
//! Each operation is a visitor handed to [`walk`](super::walk::walk); the
//! returned [`EditReport`] counts the requests it changed.

use super::model::{
    Collection, Event, Header, Lenient, RequestItem, Script, Segments, Url, Variable,
};
use super::walk::{EditReport, NodeOutcome, SkipReason};
use serde::Serialize;
use serde_json::Value;

/// Result of upserting a collection variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum VariableChange {
    Added,
    Updated,
}

impl Collection {
    /// Add `name: value` to every request. An existing header (matched
    /// case-insensitively) is updated in place when `overwrite` is set and
    /// left alone otherwise.
    pub fn add_header_to_all(&mut self, name: &str, value: &str, overwrite: bool) -> EditReport {
        let wanted = name.to_lowercase();

        let report = self.walk(|item| {
            let RequestItem {
                name: label,
                request,
                ..
            } = item;
            let headers = request.header.get_or_insert_with(Vec::new);
            let existing = headers
                .iter_mut()
                .filter_map(Lenient::valid_mut)
                .find(|header| header.matches(&wanted));

            match existing {
                Some(header) if overwrite => {
                    header.value = Some(value.to_string());
                    log::debug!("Header updated: {} - {}", label_of(label), name);
                    NodeOutcome::Changed
                }
                Some(_) => {
                    log::debug!("Header already present: {} - {}", label_of(label), name);
                    NodeOutcome::Unchanged
                }
                None => {
                    headers.push(Lenient::Valid(Header::text(name, value)));
                    log::debug!("Header added: {} - {}", label_of(label), name);
                    NodeOutcome::Changed
                }
            }
        });

        log::info!("Header '{}' applied to {} requests", name, report.affected);
        report
    }

    pub fn remove_header_from_all(&mut self, name: &str) -> EditReport {
        let wanted = name.to_lowercase();

        let report = self.walk(|item| {
            let Some(headers) = item.request.header.as_mut() else {
                return NodeOutcome::Unchanged;
            };
            let before = headers.len();
            headers.retain(|header| !header.valid().is_some_and(|h| h.matches(&wanted)));

            if headers.len() < before {
                log::debug!("Header removed: {} - {}", item.display_name(), name);
                NodeOutcome::Changed
            } else {
                NodeOutcome::Unchanged
            }
        });

        log::info!("Header '{}' removed from {} requests", name, report.affected);
        report
    }

    /// Clear pre-request scripts and drop test/pre-request events, both on
    /// the request and on the enclosing item.
    pub fn remove_all_scripts(&mut self) -> EditReport {
        let report = self.walk(|item| {
            let mut cleared = Vec::new();

            if let Some(script) = item.request.prerequest.as_mut() {
                if !script.is_empty() {
                    *script = Script::empty();
                    cleared.push("pre-request");
                }
            }
            if strip_script_events(&mut item.request.events) {
                cleared.push("request events");
            }
            if strip_script_events(&mut item.events) {
                cleared.push("item events");
            }

            if cleared.is_empty() {
                NodeOutcome::Unchanged
            } else {
                log::debug!(
                    "Scripts removed: {} - {}",
                    item.display_name(),
                    cleared.join(", ")
                );
                NodeOutcome::Changed
            }
        });

        log::info!("Scripts removed from {} requests", report.affected);
        report
    }

    /// Replace a literal URL prefix. Structured URLs also get their host
    /// (and protocol, when the new prefix names one) recomputed.
    pub fn update_base_url(&mut self, old_prefix: &str, new_prefix: &str) -> EditReport {
        if old_prefix.is_empty() {
            return EditReport::default();
        }

        let host = host_parts(new_prefix);
        let protocol = http_scheme(new_prefix);

        let report = self.walk(|item| {
            let Some(url) = item.request.url.as_mut() else {
                return NodeOutcome::Unchanged;
            };

            let outcome = match url {
                Url::Raw(raw) => replace_prefix(raw, old_prefix, new_prefix),
                Url::Structured(structured) => match structured.raw.as_mut() {
                    None => NodeOutcome::Skipped(SkipReason::MissingRawUrl),
                    Some(raw) => {
                        let outcome = replace_prefix(raw, old_prefix, new_prefix);
                        if outcome == NodeOutcome::Changed {
                            structured.host = Some(Segments::from_parts(host.iter().copied()));
                            if let Some(protocol) = protocol {
                                structured.protocol = Some(protocol.to_string());
                            }
                        }
                        outcome
                    }
                },
                Url::Other(_) => NodeOutcome::Skipped(SkipReason::UnreadableUrl),
            };

            if outcome == NodeOutcome::Changed {
                log::debug!("URL updated: {}", item.display_name());
            }
            outcome
        });

        log::info!(
            "Base URL {} -> {} updated in {} requests",
            old_prefix,
            new_prefix,
            report.affected
        );
        report
    }

    /// Literal replace-all in the URL, header values and raw body
    pub fn replace_text_in_requests(&mut self, old_text: &str, new_text: &str) -> EditReport {
        if old_text.is_empty() {
            return EditReport::default();
        }

        let report = self.walk(|item| {
            let request = &mut item.request;
            let mut changed = false;

            if let Some(raw) = request.url.as_mut().and_then(Url::raw_mut) {
                changed |= replace_all(raw, old_text, new_text);
            }

            for header in request
                .header
                .iter_mut()
                .flatten()
                .filter_map(Lenient::valid_mut)
            {
                if let Some(value) = header.value.as_mut() {
                    changed |= replace_all(value, old_text, new_text);
                }
            }

            if let Some(raw) = request
                .body
                .as_mut()
                .and_then(Lenient::valid_mut)
                .and_then(|body| body.raw.as_mut())
            {
                changed |= replace_all(raw, old_text, new_text);
            }

            if changed {
                NodeOutcome::Changed
            } else {
                NodeOutcome::Unchanged
            }
        });

        log::info!(
            "Replaced '{}' with '{}' in {} requests",
            old_text,
            new_text,
            report.affected
        );
        report
    }

    /// Upsert a collection-level variable, matching keys exactly
    pub fn add_environment_variable(&mut self, name: &str, value: &str) -> VariableChange {
        let variables = self.variable.get_or_insert_with(Vec::new);

        if let Some(existing) = variables
            .iter_mut()
            .filter_map(Lenient::valid_mut)
            .find(|variable| variable.key == name)
        {
            existing.value = Some(Value::String(value.to_string()));
            log::info!("Variable updated: {} = {}", name, value);
            return VariableChange::Updated;
        }

        variables.push(Lenient::Valid(Variable::new(name, value)));
        log::info!("Variable added: {} = {}", name, value);
        VariableChange::Added
    }
}

fn label_of(name: &Option<String>) -> &str {
    name.as_deref().unwrap_or("Unnamed")
}

fn strip_script_events(events: &mut Option<Vec<Lenient<Event>>>) -> bool {
    let Some(events) = events.as_mut() else {
        return false;
    };
    let before = events.len();
    events.retain(|event| !event.valid().is_some_and(Event::carries_script));
    events.len() < before
}

fn replace_prefix(target: &mut String, old_prefix: &str, new_prefix: &str) -> NodeOutcome {
    match target.strip_prefix(old_prefix) {
        Some(rest) => {
            let updated = format!("{}{}", new_prefix, rest);
            *target = updated;
            NodeOutcome::Changed
        }
        None => NodeOutcome::Unchanged,
    }
}

fn replace_all(target: &mut String, old_text: &str, new_text: &str) -> bool {
    if !target.contains(old_text) {
        return false;
    }
    *target = target.replace(old_text, new_text);
    true
}

/// Host labels of a base URL: scheme stripped, cut at the first `/`
fn host_parts(base: &str) -> Vec<&str> {
    let without_scheme = base
        .strip_prefix("https://")
        .or_else(|| base.strip_prefix("http://"))
        .unwrap_or(base);
    let host = without_scheme.split('/').next().unwrap_or("");
    host.split('.').collect()
}

fn http_scheme(base: &str) -> Option<&'static str> {
    if base.starts_with("https://") {
        Some("https")
    } else if base.starts_with("http://") {
        Some("http")
    } else {
        None
    }
}
