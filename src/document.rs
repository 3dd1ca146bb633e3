//! Document I/O shared by the editor and the converter
//!
//! Reading probes a fixed list of text encodings until the bytes decode and
//! parse; writing always produces UTF-8 pretty JSON.

use crate::common::error::{CollectionError, Result};
use chrono::{DateTime, Local};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::borrow::Cow;
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Utf8Bom,
    Windows1254,
    Latin1,
    Windows1252,
}

impl TextEncoding {
    /// Order in which encodings are tried when reading a document
    pub const PROBE_ORDER: [TextEncoding; 5] = [
        TextEncoding::Utf8,
        TextEncoding::Utf8Bom,
        TextEncoding::Windows1254,
        TextEncoding::Latin1,
        TextEncoding::Windows1252,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Utf8Bom => "utf-8-sig",
            TextEncoding::Windows1254 => "windows-1254",
            TextEncoding::Latin1 => "latin-1",
            TextEncoding::Windows1252 => "windows-1252",
        }
    }

    /// Strict decode; `None` when the bytes are not valid in this encoding
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Option<Cow<'a, str>> {
        match self {
            TextEncoding::Utf8 => std::str::from_utf8(bytes).ok().map(Cow::Borrowed),
            TextEncoding::Utf8Bom => {
                let stripped = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
                std::str::from_utf8(stripped).ok().map(Cow::Borrowed)
            }
            TextEncoding::Windows1254 => encoding_rs::WINDOWS_1254
                .decode_without_bom_handling_and_without_replacement(bytes),
            TextEncoding::Latin1 => Some(Cow::Owned(bytes.iter().map(|&b| b as char).collect())),
            TextEncoding::Windows1252 => encoding_rs::WINDOWS_1252
                .decode_without_bom_handling_and_without_replacement(bytes),
        }
    }
}

/// A parsed document and the encoding it was read with
#[derive(Debug, Clone)]
pub struct Decoded<T> {
    pub value: T,
    pub encoding: TextEncoding,
}

/// Try every encoding in probe order, returning the first that both decodes
/// and parses.
pub fn decode_document<T: DeserializeOwned>(bytes: &[u8]) -> Result<Decoded<T>> {
    let mut last_error = String::from("no encoding could decode the document");

    for encoding in TextEncoding::PROBE_ORDER {
        let Some(text) = encoding.decode(bytes) else {
            continue;
        };
        match serde_json::from_str::<T>(&text) {
            Ok(value) => {
                if encoding != TextEncoding::Utf8 {
                    log::debug!("Document decoded as {}", encoding.label());
                }
                return Ok(Decoded { value, encoding });
            }
            Err(e) => last_error = e.to_string(),
        }
    }

    Err(CollectionError::Format(last_error))
}

fn not_found_or_io(path: &Path, err: std::io::Error) -> CollectionError {
    if err.kind() == ErrorKind::NotFound {
        CollectionError::NotFound(path.to_path_buf())
    } else {
        CollectionError::Io(err)
    }
}

/// Read and parse a document, returning it with the raw bytes it came from
pub fn read_document<T: DeserializeOwned>(path: &Path) -> Result<(Decoded<T>, Vec<u8>)> {
    let bytes = fs::read(path).map_err(|e| not_found_or_io(path, e))?;
    let decoded = decode_document(&bytes)?;
    Ok((decoded, bytes))
}

pub async fn read_document_async<T: DeserializeOwned>(
    path: &Path,
) -> Result<(Decoded<T>, Vec<u8>)> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| not_found_or_io(path, e))?;
    let decoded = decode_document(&bytes)?;
    Ok((decoded, bytes))
}

/// Two-space indented JSON with non-ASCII text left unescaped
pub fn to_pretty_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| CollectionError::Format(e.to_string()))
}

pub fn write_document<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = to_pretty_json(value)?;
    fs::write(path, json)?;
    Ok(())
}

pub async fn write_document_async<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = to_pretty_json(value)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}

/// `<path>.backup_<YYYYMMDDHHMMSS>`
pub fn backup_path(path: &Path, at: DateTime<Local>) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(format!(".backup_{}", at.format("%Y%m%d%H%M%S")));
    PathBuf::from(name)
}

/// Copy `bytes` next to `path` under a timestamped backup name
pub fn write_backup(path: &Path, bytes: &[u8]) -> Result<PathBuf> {
    let target = backup_path(path, Local::now());
    fs::write(&target, bytes)?;
    log::info!("Backup written to {:?}", target);
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    #[test]
    fn test_utf8_is_tried_first() {
        let decoded: Decoded<Value> = decode_document("{\"name\": \"çalışma\"}".as_bytes()).unwrap();
        assert_eq!(decoded.encoding, TextEncoding::Utf8);
        assert_eq!(decoded.value["name"], "çalışma");
    }

    #[test]
    fn test_bom_prefixed_document() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(br#"{"item": []}"#);
        let decoded: Decoded<Value> = decode_document(&bytes).unwrap();
        assert_eq!(decoded.encoding, TextEncoding::Utf8Bom);
        assert_eq!(decoded.value, json!({"item": []}));
    }

    #[test]
    fn test_windows_1254_document() {
        // "Şehir" in Windows-1254: 0xDE is 'Ş', invalid as UTF-8
        let bytes = b"{\"name\": \"\xDEehir\"}";
        let decoded: Decoded<Value> = decode_document(bytes).unwrap();
        assert_eq!(decoded.encoding, TextEncoding::Windows1254);
        assert_eq!(decoded.value["name"], "Şehir");
    }

    #[test]
    fn test_unparsable_document_is_format_error() {
        let err = decode_document::<Value>(b"{not json").unwrap_err();
        assert!(matches!(err, CollectionError::Format(_)));
    }

    #[test]
    fn test_read_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.json");
        match read_document::<Value>(&missing) {
            Err(CollectionError::NotFound(path)) => assert_eq!(path, missing),
            other => panic!("expected NotFound, got {:?}", other.map(|(d, _)| d.value)),
        }
    }

    #[test]
    fn test_write_is_pretty_and_unescaped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        write_document(&path, &json!({"name": "Über", "item": []})).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "{\n  \"name\": \"Über\",\n  \"item\": []\n}");
    }

    #[test]
    fn test_backup_path_format() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        let path = backup_path(Path::new("/tmp/api.json"), at);
        assert_eq!(path, PathBuf::from("/tmp/api.json.backup_20240309070501"));
    }

    #[test]
    fn test_write_backup_copies_bytes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("api.json");
        let target = write_backup(&path, b"\xDEraw").unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"\xDEraw");
        assert_eq!(target.parent(), Some(dir.path()));
    }

    #[tokio::test]
    async fn test_async_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.json");
        write_document_async(&path, &json!({"a": [1, 2]})).await.unwrap();

        let (decoded, bytes) = read_document_async::<Value>(&path).await.unwrap();
        assert_eq!(decoded.value, json!({"a": [1, 2]}));
        assert_eq!(bytes, fs::read(&path).unwrap());
    }
}
