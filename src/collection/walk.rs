use super::model::{Collection, Item, RequestItem};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// What a visit did to one request node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeOutcome {
    Changed,
    Unchanged,
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    /// Neither a readable request nor a readable folder
    MalformedItem,
    /// URL value that is neither a string nor a URL object
    UnreadableUrl,
    /// URL object without a `raw` string
    MissingRawUrl,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SkipReason::MalformedItem => write!(f, "malformed item"),
            SkipReason::UnreadableUrl => write!(f, "unreadable url"),
            SkipReason::MissingRawUrl => write!(f, "url without raw value"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedNode {
    pub name: Option<String>,
    pub reason: SkipReason,
}

/// Summary of one walk-based operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditReport {
    /// Request nodes handed to the visitor
    pub visited: usize,
    /// Request nodes the operation changed
    pub affected: usize,
    pub skipped: Vec<SkippedNode>,
}

impl EditReport {
    fn record(&mut self, name: Option<&str>, outcome: NodeOutcome) {
        match outcome {
            NodeOutcome::Changed => self.affected += 1,
            NodeOutcome::Unchanged => {}
            NodeOutcome::Skipped(reason) => {
                log::debug!("Skipped {}: {}", name.unwrap_or("unnamed node"), reason);
                self.skipped.push(SkippedNode {
                    name: name.map(str::to_string),
                    reason,
                });
            }
        }
    }
}

/// Depth-first, pre-order walk over `items`, calling `visit` once for every
/// request node. Folders are descended into, malformed nodes are reported
/// as skipped.
pub fn walk<F>(items: &mut [Item], mut visit: F) -> EditReport
where
    F: FnMut(&mut RequestItem) -> NodeOutcome,
{
    let mut report = EditReport::default();
    walk_items(items, &mut visit, &mut report);
    report
}

fn walk_items<F>(items: &mut [Item], visit: &mut F, report: &mut EditReport)
where
    F: FnMut(&mut RequestItem) -> NodeOutcome,
{
    for item in items.iter_mut() {
        match item {
            Item::Request(request) => {
                report.visited += 1;
                let outcome = visit(request);
                report.record(request.name.as_deref(), outcome);
            }
            Item::Folder(folder) => walk_items(&mut folder.item, visit, report),
            Item::Malformed(raw) => {
                let name = raw.get("name").and_then(Value::as_str);
                report.record(name, NodeOutcome::Skipped(SkipReason::MalformedItem))
            }
        }
    }
}

/// Read-only pre-order iterator over request nodes, same order as `walk`
pub struct Requests<'a> {
    stack: Vec<std::slice::Iter<'a, Item>>,
}

impl<'a> Iterator for Requests<'a> {
    type Item = &'a RequestItem;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(level) = self.stack.last_mut() {
            match level.next() {
                Some(Item::Request(request)) => return Some(request),
                Some(Item::Folder(folder)) => self.stack.push(folder.item.iter()),
                Some(Item::Malformed(_)) => {}
                None => {
                    self.stack.pop();
                }
            }
        }
        None
    }
}

pub fn requests(items: &[Item]) -> Requests<'_> {
    Requests {
        stack: vec![items.iter()],
    }
}

impl Collection {
    pub fn walk<F>(&mut self, visit: F) -> EditReport
    where
        F: FnMut(&mut RequestItem) -> NodeOutcome,
    {
        walk(&mut self.item, visit)
    }

    pub fn requests(&self) -> Requests<'_> {
        requests(&self.item)
    }

    pub fn request_count(&self) -> usize {
        self.requests().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(name: &str) -> Value {
        json!({"name": name, "request": {"method": "GET", "url": format!("https://x.io/{}", name)}})
    }

    fn nested(depth: usize, leaf: Value) -> Value {
        (0..depth).fold(leaf, |inner, level| {
            json!({"name": format!("level-{}", level), "item": [inner]})
        })
    }

    fn collection(items: Value) -> Collection {
        serde_json::from_value(json!({"info": {"name": "t"}, "item": items})).unwrap()
    }

    #[test]
    fn test_walk_is_pre_order() {
        let mut doc = collection(json!([
            request("a"),
            {"name": "f", "item": [request("b"), {"name": "g", "item": [request("c")]}]},
            request("d")
        ]));

        let mut seen = Vec::new();
        let report = doc.walk(|item| {
            seen.push(item.display_name().to_string());
            NodeOutcome::Unchanged
        });

        assert_eq!(seen, vec!["a", "b", "c", "d"]);
        assert_eq!(report.visited, 4);
        assert_eq!(report.affected, 0);

        let names: Vec<&str> = doc.requests().map(RequestItem::display_name).collect();
        assert_eq!(names, seen);
    }

    #[test]
    fn test_walk_reaches_deep_nesting() {
        let mut doc = collection(json!([nested(7, request("deep")), request("top")]));
        let report = doc.walk(|_| NodeOutcome::Changed);
        assert_eq!(report.affected, 2);
        assert_eq!(doc.request_count(), 2);
        assert_eq!(doc.list_all_endpoints().len(), report.visited);

        let names: Vec<String> = doc.list_all_endpoints().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["deep", "top"]);
    }

    #[test]
    fn test_walk_on_empty_collection() {
        let mut doc = collection(json!([]));
        let report = doc.walk(|_| NodeOutcome::Changed);
        assert_eq!(report, EditReport::default());
        assert_eq!(doc.requests().count(), 0);
        assert_eq!(doc.list_all_endpoints().len(), report.visited);
    }

    #[test]
    fn test_malformed_nodes_are_reported_not_visited() {
        let mut doc = collection(json!([
            {"name": "broken", "request": 7},
            42,
            {"name": "f", "item": [request("ok")]}
        ]));

        let report = doc.walk(|_| NodeOutcome::Changed);
        assert_eq!(report.visited, 1);
        assert_eq!(report.affected, 1);
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(report.skipped[0].name.as_deref(), Some("broken"));
        assert_eq!(report.skipped[0].reason, SkipReason::MalformedItem);
        assert_eq!(report.skipped[1].name, None);
    }

    #[test]
    fn test_visitor_skips_are_recorded() {
        let mut doc = collection(json!([request("a"), request("b")]));
        let report = doc.walk(|item| {
            if item.display_name() == "a" {
                NodeOutcome::Skipped(SkipReason::UnreadableUrl)
            } else {
                NodeOutcome::Changed
            }
        });
        assert_eq!(report.affected, 1);
        assert_eq!(
            report.skipped,
            vec![SkippedNode {
                name: Some("a".into()),
                reason: SkipReason::UnreadableUrl
            }]
        );
    }
}
