use super::model::{HarCapture, HarEntry, HarPostData, HarRequest};
use crate::collection::model::{
    Body, Collection, Folder, FormParam, Header, Item, Lenient, QueryParam, Request,
    RequestItem, Segments, StructuredUrl, Url,
};
use crate::common::error::{CollectionError, Result};
use crate::config::ConverterConfig;
use crate::{document, logging};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// What happened to the entries of one capture
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionReport {
    pub total_entries: usize,
    pub converted: usize,
    /// 1-based positions of entries without a usable request
    pub skipped_entries: Vec<usize>,
    pub hosts: usize,
}

#[derive(Debug, Clone)]
pub struct Conversion {
    pub collection: Collection,
    pub report: ConversionReport,
}

/// The pieces of a capture URL the converter needs
#[derive(Debug, Default, PartialEq)]
struct CaptureUrl {
    scheme: String,
    /// `host[:port]`, empty when the URL has no host
    netloc: String,
    path: String,
    query: Vec<(String, String)>,
}

impl CaptureUrl {
    /// Split `raw` by position only, so host case, explicit ports and
    /// non-ASCII path text stay as captured. Query pairs are decoded.
    fn parse(raw: &str) -> Self {
        let without_fragment = raw.split('#').next().unwrap_or(raw);
        let (before_query, query) = without_fragment
            .split_once('?')
            .unwrap_or((without_fragment, ""));

        let (scheme, rest) = match before_query.split_once(':') {
            Some((scheme, rest)) if is_scheme(scheme) => (scheme.to_ascii_lowercase(), rest),
            _ => (String::new(), before_query),
        };
        let (netloc, path) = match rest.strip_prefix("//") {
            Some(authority) => authority.split_at(authority.find('/').unwrap_or(authority.len())),
            None => ("", rest),
        };

        Self {
            scheme,
            netloc: netloc.to_string(),
            path: path.to_string(),
            query: url::form_urlencoded::parse(query.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
        }
    }

    fn last_segment(&self) -> &str {
        match self.path.rsplit('/').next() {
            Some(segment) if !segment.is_empty() => segment,
            _ => &self.netloc,
        }
    }
}

fn is_scheme(text: &str) -> bool {
    let mut chars = text.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Cut `text` to `max` characters, ending in "..." when shortened
fn truncate_name(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}

fn base_name(source: &str) -> String {
    Path::new(source)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.to_string())
}

/// `<input stem>_postman_collection.json` in the input's directory
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{}_postman_collection.json", stem))
}

/// Turns HAR captures into collections with one folder per host
#[derive(Debug, Clone, Default)]
pub struct HarConverter {
    config: ConverterConfig,
}

impl HarConverter {
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Build a collection from a parsed capture. `source_name` is only used
    /// for the description and the default collection name.
    pub fn convert(
        &self,
        capture: &Value,
        source_name: &str,
        collection_name: Option<&str>,
    ) -> Result<Conversion> {
        let capture = HarCapture::deserialize(capture)
            .map_err(|e| CollectionError::Format(format!("invalid HAR capture: {}", e)))?;
        let entries = capture.log.entries;

        let mut report = ConversionReport {
            total_entries: entries.len(),
            ..Default::default()
        };
        let mut folders: Vec<Folder> = Vec::new();
        let mut by_host: HashMap<String, usize> = HashMap::new();

        for (position, raw) in entries.iter().enumerate() {
            let index = position + 1;
            let request = match HarEntry::deserialize(raw) {
                Ok(HarEntry {
                    request: Some(request),
                }) if !request.url.is_empty() => request,
                Ok(_) => {
                    log::debug!("Entry {} has no request URL, skipped", index);
                    report.skipped_entries.push(index);
                    continue;
                }
                Err(e) => {
                    log::debug!("Entry {} is unreadable, skipped: {}", index, e);
                    report.skipped_entries.push(index);
                    continue;
                }
            };

            let url = CaptureUrl::parse(&request.url);
            let item = self.convert_request(&request, &url, index);

            let host = if url.netloc.is_empty() {
                self.config.unknown_host_label.clone()
            } else {
                url.netloc.clone()
            };
            let slot = *by_host.entry(host.clone()).or_insert_with(|| {
                folders.push(Folder::named(&host));
                folders.len() - 1
            });
            folders[slot].item.push(Item::Request(item));
            report.converted += 1;
        }

        if report.total_entries > 0 && report.converted == 0 {
            return Err(CollectionError::conversion(CollectionError::Format(format!(
                "none of the {} entries in {} has a usable request",
                report.total_entries, source_name
            ))));
        }

        let name = collection_name
            .map(str::to_string)
            .unwrap_or_else(|| format!("HAR Import - {}", base_name(source_name)));
        let mut collection = Collection::new(&name);
        collection.info.description = Some(Value::String(format!(
            "Converted from HAR file: {}",
            source_name
        )));

        report.hosts = folders.len();
        collection.item = folders.into_iter().map(Item::Folder).collect();

        log::info!(
            "Converted {} of {} entries into {} host folders",
            report.converted,
            report.total_entries,
            report.hosts
        );
        Ok(Conversion { collection, report })
    }

    fn convert_request(&self, har: &HarRequest, url: &CaptureUrl, index: usize) -> RequestItem {
        let method = har
            .method
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(self.config.default_method.as_str())
            .to_uppercase();

        let headers = har
            .headers
            .iter()
            .filter(|h| !self.config.skips_header(h.name()))
            .map(|h| Lenient::Valid(Header::text(h.name(), h.value())))
            .collect();

        let query: Vec<Lenient<QueryParam>> = url
            .query
            .iter()
            .map(|(k, v)| QueryParam::new(k, v))
            .chain(har.query_string.iter().map(|p| QueryParam::new(p.name(), p.value())))
            .map(Lenient::Valid)
            .collect();

        let host: Vec<&str> = if url.netloc.is_empty() {
            Vec::new()
        } else {
            url.netloc.split('.').collect()
        };

        let request = Request {
            method: Some(method.clone()),
            header: Some(headers),
            body: self.body(har.post_data.as_ref()).map(Lenient::Valid),
            url: Some(Url::Structured(StructuredUrl {
                raw: Some(har.url.clone()),
                protocol: (!url.scheme.is_empty()).then(|| url.scheme.clone()),
                host: Some(Segments::from_parts(host)),
                path: Some(Segments::from_parts(
                    url.path.split('/').filter(|part| !part.is_empty()),
                )),
                query: (!query.is_empty()).then_some(query),
                ..Default::default()
            })),
            ..Default::default()
        };

        let label = truncate_name(
            &format!("{} {}", method, url.last_segment()),
            self.config.max_name_length,
        );
        RequestItem::new(&format!("{:03}. {}", index, label), request)
    }

    /// Pick the body form from the payload's MIME type
    fn body(&self, post: Option<&HarPostData>) -> Option<Body> {
        let post = post?;
        let mime = post.mime_type.as_deref().unwrap_or("").to_lowercase();

        if mime.contains("application/json") {
            post.text.as_deref().map(|text| Body::raw(text, Some("json")))
        } else if mime.contains("application/x-www-form-urlencoded") {
            match (&post.params, &post.text) {
                (Some(params), _) => Some(Body::urlencoded(
                    params
                        .iter()
                        .map(|p| FormParam::text(p.name(), p.value()))
                        .collect(),
                )),
                (None, Some(_)) => Some(Body::urlencoded(Vec::new())),
                (None, None) => None,
            }
        } else {
            post.text.as_deref().map(|text| Body::raw(text, None))
        }
    }

    /// Read a capture file and convert it. A missing file is reported as
    /// such; every other failure is wrapped as a conversion error.
    pub fn convert_file(&self, path: &Path, collection_name: Option<&str>) -> Result<Conversion> {
        let (decoded, _) = document::read_document::<Value>(path).map_err(|e| match e {
            CollectionError::NotFound(_) => e,
            other => CollectionError::conversion(other),
        })?;

        let source = path.display().to_string();
        let conversion = self
            .convert(&decoded.value, &source, collection_name)
            .map_err(CollectionError::conversion)?;

        let _ = logging::write_domain_log(
            "convert",
            &format!(
                "Converted {} ({} of {} entries)",
                source, conversion.report.converted, conversion.report.total_entries
            ),
        );
        Ok(conversion)
    }

    /// Convert a capture file and write the collection, by default next to
    /// the input. Returns the path written.
    pub fn convert_and_save(
        &self,
        path: &Path,
        output: Option<&Path>,
        collection_name: Option<&str>,
    ) -> Result<PathBuf> {
        let conversion = self.convert_file(path, collection_name)?;
        let target = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_output_path(path));

        document::write_document(&target, &conversion.collection)?;
        log::info!("Collection written to {:?}", target);
        let _ = logging::write_domain_log(
            "audit",
            &format!("Saved converted collection to {}", target.display()),
        );
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::CollectionEditor;
    use rstest::rstest;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn capture(entries: Value) -> Value {
        json!({"log": {"version": "1.2", "entries": entries}})
    }

    fn get(url: &str) -> Value {
        json!({"request": {"method": "GET", "url": url, "headers": []}})
    }

    fn folder_names(collection: &Collection) -> Vec<&str> {
        collection.item.iter().filter_map(Item::name).collect()
    }

    fn request_names(collection: &Collection) -> Vec<&str> {
        collection.requests().map(RequestItem::display_name).collect()
    }

    #[test]
    fn test_two_requests_on_one_host() {
        let har = capture(json!([
            get("https://a.example.com/users?x=1"),
            {"request": {
                "method": "POST",
                "url": "https://a.example.com/users",
                "headers": [{"name": "Content-Type", "value": "application/json"}],
                "postData": {"mimeType": "application/json", "text": "{\"id\":1}"}
            }}
        ]));

        let conversion = HarConverter::default()
            .convert(&har, "traffic.har", None)
            .unwrap();
        let doc = &conversion.collection;

        assert_eq!(folder_names(doc), vec!["a.example.com"]);
        assert_eq!(request_names(doc), vec!["001. GET users", "002. POST users"]);

        let requests: Vec<&RequestItem> = doc.requests().collect();
        let first = serde_json::to_value(&requests[0].request.url).unwrap();
        assert_eq!(
            first,
            json!({
                "raw": "https://a.example.com/users?x=1",
                "protocol": "https",
                "host": ["a", "example", "com"],
                "path": ["users"],
                "query": [{"key": "x", "value": "1"}]
            })
        );
        assert!(requests[0].request.body.is_none());

        let body = serde_json::to_value(&requests[1].request.body).unwrap();
        assert_eq!(
            body,
            json!({"mode": "raw", "raw": "{\"id\":1}", "options": {"raw": {"language": "json"}}})
        );

        assert_eq!(doc.info.name.as_deref(), Some("HAR Import - traffic.har"));
        assert_eq!(
            doc.info.description_text(),
            Some("Converted from HAR file: traffic.har")
        );
        assert_eq!(conversion.report.converted, 2);
        assert_eq!(conversion.report.hosts, 1);
    }

    #[test]
    fn test_grouping_keeps_first_seen_order_and_index_gaps() {
        let har = capture(json!([
            get("https://b.io/one"),
            {"response": {"status": 200}},
            {"request": {"method": "GET", "url": ""}},
            get("http://a.io:8080/two/"),
            get("/relative/path?q=1"),
            get("https://b.io/three"),
            {"request": "garbage"}
        ]));

        let conversion = HarConverter::default()
            .convert(&har, "/tmp/x.har", Some("Mine"))
            .unwrap();
        let doc = &conversion.collection;

        assert_eq!(folder_names(doc), vec!["b.io", "a.io:8080", "unknown"]);
        assert_eq!(
            request_names(doc),
            vec!["001. GET one", "006. GET three", "004. GET a.io:8080", "005. GET path"]
        );
        assert_eq!(doc.info.name.as_deref(), Some("Mine"));
        assert_eq!(
            conversion.report,
            ConversionReport {
                total_entries: 7,
                converted: 4,
                skipped_entries: vec![2, 3, 7],
                hosts: 3
            }
        );
    }

    #[test]
    fn test_headers_and_query_string() {
        let har = capture(json!([{"request": {
            "method": "get",
            "url": "https://a.io/s?q=a%20b&q=c",
            "headers": [
                {"name": "Host", "value": "a.io"},
                {"name": "ACCEPT-ENCODING", "value": "gzip"},
                {"name": "Authorization", "value": "Bearer t"}
            ],
            "queryString": [{"name": "extra", "value": "1"}]
        }}]));

        let conversion = HarConverter::default().convert(&har, "x.har", None).unwrap();
        let item = conversion.collection.requests().next().unwrap();

        assert_eq!(item.request.method.as_deref(), Some("GET"));
        let keys: Vec<&str> = item.request.headers().map(|h| h.key.as_str()).collect();
        assert_eq!(keys, vec!["Authorization"]);

        let url = serde_json::to_value(&item.request.url).unwrap();
        assert_eq!(
            url["query"],
            json!([
                {"key": "q", "value": "a b"},
                {"key": "q", "value": "c"},
                {"key": "extra", "value": "1"}
            ])
        );
    }

    #[rstest]
    #[case("application/json; charset=utf-8", Some("[1]"), None,
        Some(json!({"mode": "raw", "raw": "[1]", "options": {"raw": {"language": "json"}}})))]
    #[case("application/json", None, None, None)]
    #[case("Application/X-WWW-Form-Urlencoded", Some("a=1"), Some(json!([{"name": "a", "value": "1"}])),
        Some(json!({"mode": "urlencoded", "urlencoded": [{"key": "a", "value": "1", "type": "text"}]})))]
    #[case("application/x-www-form-urlencoded", Some("a=1"), None,
        Some(json!({"mode": "urlencoded", "urlencoded": []})))]
    #[case("text/plain", Some("hello"), None, Some(json!({"mode": "raw", "raw": "hello"})))]
    #[case("text/plain", None, None, None)]
    fn test_body_classification(
        #[case] mime: &str,
        #[case] text: Option<&str>,
        #[case] params: Option<Value>,
        #[case] expected: Option<Value>,
    ) {
        let mut post = json!({"mimeType": mime});
        if let Some(text) = text {
            post["text"] = json!(text);
        }
        if let Some(params) = params {
            post["params"] = params;
        }
        let har = capture(json!([{"request": {"method": "POST", "url": "https://a.io/f", "postData": post}}]));

        let conversion = HarConverter::default().convert(&har, "x.har", None).unwrap();
        let item = conversion.collection.requests().next().unwrap();
        let body = item
            .request
            .body
            .as_ref()
            .map(|body| serde_json::to_value(body).unwrap());
        assert_eq!(body, expected);
    }

    #[rstest]
    #[case(46, false)]
    #[case(47, true)]
    #[case(80, true)]
    fn test_name_truncation(#[case] segment_len: usize, #[case] truncated: bool) {
        let segment = "a".repeat(segment_len);
        let har = capture(json!([get(&format!("https://a.io/{}", segment))]));

        let conversion = HarConverter::default().convert(&har, "x.har", None).unwrap();
        let name = conversion.collection.requests().next().unwrap().display_name().to_string();
        let label = name.strip_prefix("001. ").unwrap();

        if truncated {
            assert_eq!(label.chars().count(), 50);
            assert!(label.ends_with("..."));
        } else {
            assert_eq!(label, format!("GET {}", segment));
        }
    }

    #[rstest]
    #[case("https://API.Example.com:443/kullanıcılar", "API.Example.com:443", "001. GET kullanıcılar", vec!["kullanıcılar"])]
    #[case("http://Shop.IO:80/Ürünler/Çanta?x=1", "Shop.IO:80", "001. GET Çanta", vec!["Ürünler", "Çanta"])]
    #[case("HTTPS://a.io:8443/v1/", "a.io:8443", "001. GET a.io:8443", vec!["v1"])]
    #[case("https://user@a.io/x#frag", "user@a.io", "001. GET x", vec!["x"])]
    fn test_host_and_path_kept_as_captured(
        #[case] raw: &str,
        #[case] folder: &str,
        #[case] name: &str,
        #[case] path: Vec<&str>,
    ) {
        let har = capture(json!([get(raw)]));

        let conversion = HarConverter::default().convert(&har, "x.har", None).unwrap();
        let doc = &conversion.collection;
        assert_eq!(folder_names(doc), vec![folder]);
        assert_eq!(request_names(doc), vec![name]);

        let url = serde_json::to_value(&doc.requests().next().unwrap().request.url).unwrap();
        assert_eq!(url["raw"], json!(raw));
        assert_eq!(url["path"], json!(path));
        assert_eq!(url["host"], json!(folder.split('.').collect::<Vec<_>>()));
    }

    #[test]
    fn test_hosts_differing_in_case_or_port_get_own_folders() {
        let har = capture(json!([
            get("https://API.Example.com:443/kullanıcılar"),
            get("https://api.example.com/x"),
            get("https://api.example.com:443/y")
        ]));

        let conversion = HarConverter::default().convert(&har, "x.har", None).unwrap();
        let doc = &conversion.collection;
        assert_eq!(
            folder_names(doc),
            vec!["API.Example.com:443", "api.example.com", "api.example.com:443"]
        );
        assert_eq!(
            request_names(doc),
            vec!["001. GET kullanıcılar", "002. GET x", "003. GET y"]
        );
        assert_eq!(conversion.report.hosts, 3);
    }

    #[test]
    fn test_capture_errors() {
        let converter = HarConverter::default();

        assert!(matches!(
            converter.convert(&json!({"log": {}}), "x.har", None),
            Err(CollectionError::Format(_))
        ));

        match converter.convert(&capture(json!([{"request": {"url": ""}}])), "x.har", None) {
            Err(CollectionError::Conversion(inner)) => {
                assert!(matches!(*inner, CollectionError::Format(_)))
            }
            other => panic!("expected conversion error, got {:?}", other.map(|c| c.report)),
        }

        let empty = converter.convert(&capture(json!([])), "x.har", None).unwrap();
        assert!(empty.collection.item.is_empty());
    }

    #[test]
    fn test_convert_file_errors() {
        let dir = TempDir::new().unwrap();
        let converter = HarConverter::default();

        assert!(matches!(
            converter.convert_file(&dir.path().join("missing.har"), None),
            Err(CollectionError::NotFound(_))
        ));

        let broken = dir.path().join("broken.har");
        fs::write(&broken, "{\"log\":").unwrap();
        assert!(matches!(
            converter.convert_file(&broken, None),
            Err(CollectionError::Conversion(_))
        ));

        let shapeless = dir.path().join("shapeless.har");
        fs::write(&shapeless, "{\"entries\": []}").unwrap();
        assert!(matches!(
            converter.convert_file(&shapeless, None),
            Err(CollectionError::Conversion(_))
        ));
    }

    #[test]
    fn test_convert_and_save_next_to_input() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("session.har");
        let har = capture(json!([get("https://api.io/v1/items"), get("https://cdn.io/app.js")]));
        fs::write(&input, serde_json::to_vec(&har).unwrap()).unwrap();

        let written = HarConverter::default()
            .convert_and_save(&input, None, None)
            .unwrap();
        assert_eq!(written, dir.path().join("session_postman_collection.json"));

        let editor = CollectionEditor::load(&written).unwrap();
        let endpoints = editor.collection().list_all_endpoints();
        assert_eq!(endpoints.len(), 2);
        assert_eq!(endpoints[0].name, "001. GET items");
        assert_eq!(endpoints[1].url, "https://cdn.io/app.js");
        assert_eq!(
            editor.collection().info.name.as_deref(),
            Some("HAR Import - session.har")
        );
    }

    #[test]
    fn test_custom_config() {
        let config = ConverterConfig {
            skip_headers: vec!["cookie".into()],
            max_name_length: 10,
            default_method: "post".into(),
            unknown_host_label: "local".into(),
        };
        let har = capture(json!([{"request": {
            "url": "/orders/summary",
            "headers": [{"name": "Cookie", "value": "a"}, {"name": "Host", "value": "x"}]
        }}]));

        let conversion = HarConverter::new(config).convert(&har, "x.har", None).unwrap();
        let doc = &conversion.collection;
        assert_eq!(folder_names(doc), vec!["local"]);

        let item = doc.requests().next().unwrap();
        assert_eq!(item.display_name(), "001. POST su...");
        let keys: Vec<&str> = item.request.headers().map(|h| h.key.as_str()).collect();
        assert_eq!(keys, vec!["Host"]);
    }
}
