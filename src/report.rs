use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{ReportError, Result};

/// Id of the element that carries the report JSON inside an HTML export.
pub const EMBEDDED_DATA_ID: &str = "jsonData";

/// Tolerance used when checking that block size factors sum to one.
const SIZE_FACTOR_TOLERANCE: f64 = 1e-3;

/// The smallest reported memory usage unit inside a file (mesh, image, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataBlock {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub size_bytes: u64,
    /// Share of the owning file's total size, in `[0, 1]`.
    pub size_factor: f64,
}

/// Memory report of a single source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Unique path of the file.
    pub id: String,
    pub name: String,
    pub size_bytes: u64,
    #[serde(default)]
    pub datablocks: Vec<DataBlock>,
}

/// Creation time of a report, either epoch milliseconds or an ISO-8601 string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Millis(f64),
    Text(String),
}

/// The whole exported snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryReport {
    #[serde(default)]
    pub timestamp: Option<Timestamp>,
    pub memory_usage: Vec<FileRecord>,
}

impl MemoryReport {
    /// Load a report from a JSON file or an HTML export with embedded JSON.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;

        if is_html(path, &content) {
            let json = extract_embedded_json(&content).ok_or_else(|| {
                ReportError::MissingEmbeddedData {
                    path: path.to_path_buf(),
                }
            })?;
            Self::from_json_str(&json)
        } else {
            Self::from_json_str(&content)
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Describe records that break the size invariants of the exporter.
    pub fn consistency_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        for file in &self.memory_usage {
            let block_total: u64 = file.datablocks.iter().map(|b| b.size_bytes).sum();
            // Exporters write a size of 1 for all-empty files to avoid dividing by zero.
            if block_total == 0 && file.size_bytes <= 1 {
                continue;
            }
            if block_total != file.size_bytes {
                warnings.push(format!(
                    "{}: size_bytes is {} but its datablocks sum to {}",
                    file.id, file.size_bytes, block_total
                ));
            }

            if file.size_bytes > 0 {
                let factor_total: f64 = file.datablocks.iter().map(|b| b.size_factor).sum();
                if (factor_total - 1.0).abs() > SIZE_FACTOR_TOLERANCE {
                    warnings.push(format!(
                        "{}: datablock size factors sum to {:.4}",
                        file.id, factor_total
                    ));
                }
            }
        }

        warnings
    }
}

fn is_html(path: &Path, content: &str) -> bool {
    let by_extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"))
        .unwrap_or(false);

    by_extension || content.trim_start().starts_with('<')
}

/// Returns the decoded text content of the `jsonData` element, if present.
pub fn extract_embedded_json(html: &str) -> Option<String> {
    let marker_pos = [
        format!("id=\"{}\"", EMBEDDED_DATA_ID),
        format!("id='{}'", EMBEDDED_DATA_ID),
    ]
    .iter()
    .find_map(|marker| html.find(marker.as_str()))?;

    // Tag name of the element owning the id attribute.
    let tag_start = html[..marker_pos].rfind('<')? + 1;
    let tag_name: String = html[tag_start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect();
    if tag_name.is_empty() {
        return None;
    }

    let content_start = marker_pos + html[marker_pos..].find('>')? + 1;
    let closing = format!("</{}", tag_name);
    let content_end = content_start + html[content_start..].find(closing.as_str())?;

    Some(decode_entities(html[content_start..content_end].trim()))
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
