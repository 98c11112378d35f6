//! Saving and sharing encoded documents.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::info;

use autoresearch_shared::{ResearchError, Result};

/// File name offered by download links and used for written documents.
pub const DEFAULT_FILENAME: &str = "ResearchResults.xml";

/// Anchor text of download links.
pub const DEFAULT_LINK_TEXT: &str = "Download XML file";

/// HTML anchor that downloads `xml` as `filename` from a base64 data URI.
pub fn download_link(xml: &[u8], filename: &str, text: &str) -> String {
    let payload = STANDARD.encode(xml);
    format!(
        r#"<a href="data:file/xml;base64,{payload}" download="{}">{}</a>"#,
        escape_html(filename),
        escape_html(text)
    )
}

/// Write an encoded document to `path`.
pub fn write_document(path: &Path, xml: &[u8]) -> Result<()> {
    std::fs::write(path, xml).map_err(|e| ResearchError::io(path, e))?;
    info!(path = %path.display(), bytes = xml.len(), "document written");
    Ok(())
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
