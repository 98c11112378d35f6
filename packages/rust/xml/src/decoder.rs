//! XML document → `DecodedResults`.
//!
//! Streams `quick-xml` events and keeps only three levels under the root:
//! categories, their items, and each item's fields. The root tag and item tags
//! are not checked. Text inside a field is kept verbatim up to the field's first
//! child element; anything nested deeper is dropped.

use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::Event;
use tracing::{debug, instrument};

use autoresearch_shared::{DecodedResults, FieldMap, ResearchError, Result};

/// Parse a document into category → items → fields.
///
/// Fails with [`ResearchError::Parse`] if the input is not UTF-8 or not a
/// well-formed document. Nothing is returned on failure.
#[instrument(skip_all, fields(bytes = input.len()))]
pub fn decode(input: &[u8]) -> Result<DecodedResults> {
    let xml = std::str::from_utf8(input)
        .map_err(|e| ResearchError::parse(format!("document is not valid UTF-8: {e}")))?;
    decode_str(xml)
}

/// [`decode`] from a string slice.
pub fn decode_str(xml: &str) -> Result<DecodedResults> {
    let mut reader = Reader::from_str(xml);
    // Field text must come back byte-for-byte.
    reader.config_mut().trim_text(false);

    let mut tree = TreeBuilder::default();

    loop {
        let event = reader.read_event().map_err(|e| {
            ResearchError::parse(format!("at byte {}: {e}", reader.buffer_position()))
        })?;

        match event {
            Event::Start(e) => tree.open(utf8(e.name().as_ref())?)?,
            Event::Empty(e) => {
                let qname = e.name();
                let name = utf8(qname.as_ref())?;
                tree.open(name)?;
                tree.close(name)?;
            }
            Event::End(e) => tree.close(utf8(e.name().as_ref())?)?,
            Event::Text(e) => {
                let raw = utf8(&e)?;
                let text = unescape(raw).map_err(|err| ResearchError::parse(err.to_string()))?;
                tree.text(&text)?;
            }
            Event::CData(e) => tree.text(utf8(&e)?)?,
            Event::GeneralRef(e) => {
                let reference = format!("&{};", utf8(&e)?);
                let text = unescape(&reference)
                    .map_err(|err| ResearchError::parse(format!("{reference}: {err}")))?;
                tree.text(&text)?;
            }
            // Comments and PIs count as children: field text stops at them.
            Event::Comment(_) | Event::PI(_) => tree.child_node(),
            Event::Eof => break,
            // Declaration, doctype.
            _ => {}
        }
    }

    let results = tree.finish()?;
    debug!(categories = results.len(), "XML document parsed");
    Ok(results)
}

fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes)
        .map_err(|e| ResearchError::parse(format!("invalid UTF-8 in document: {e}")))
}

// ---------------------------------------------------------------------------
// Tree builder
// ---------------------------------------------------------------------------

/// Depths below the root, counted as the number of open ancestors.
const CATEGORY_DEPTH: usize = 1;
const ITEM_DEPTH: usize = 2;
const FIELD_DEPTH: usize = 3;

#[derive(Debug)]
struct OpenField {
    text: Option<String>,
    /// Set once the field gets a child element; later text is not direct text.
    sealed: bool,
}

#[derive(Debug, Default)]
struct TreeBuilder {
    results: DecodedResults,
    stack: Vec<String>,
    seen_root: bool,
    items: Vec<FieldMap>,
    item: FieldMap,
    field: Option<OpenField>,
}

impl TreeBuilder {
    fn open(&mut self, name: &str) -> Result<()> {
        match self.stack.len() {
            0 if self.seen_root => {
                return Err(ResearchError::parse(format!(
                    "unexpected element <{name}> after the root element"
                )));
            }
            0 => self.seen_root = true,
            CATEGORY_DEPTH => self.items.clear(),
            ITEM_DEPTH => self.item = FieldMap::new(),
            FIELD_DEPTH => {
                self.field = Some(OpenField {
                    text: None,
                    sealed: false,
                })
            }
            _ => {
                if let Some(field) = self.field.as_mut() {
                    field.sealed = true;
                }
            }
        }

        self.stack.push(name.to_string());
        Ok(())
    }

    fn close(&mut self, name: &str) -> Result<()> {
        let open = self.stack.pop().ok_or_else(|| {
            ResearchError::parse(format!("closing tag </{name}> has no matching open tag"))
        })?;
        if open != name {
            return Err(ResearchError::parse(format!(
                "mismatched closing tag: expected </{open}>, found </{name}>"
            )));
        }

        match self.stack.len() {
            FIELD_DEPTH => {
                let text = self.field.take().and_then(|f| f.text);
                self.item.insert(open, text);
            }
            ITEM_DEPTH => {
                let item = std::mem::take(&mut self.item);
                self.items.push(item);
            }
            CATEGORY_DEPTH => {
                let items = std::mem::take(&mut self.items);
                self.results.insert(open, items);
            }
            _ => {}
        }
        Ok(())
    }

    /// A non-element child node (comment, PI) ends a field's direct text.
    fn child_node(&mut self) {
        if self.stack.len() == FIELD_DEPTH + 1 {
            if let Some(field) = self.field.as_mut() {
                field.sealed = true;
            }
        }
    }

    fn text(&mut self, text: &str) -> Result<()> {
        match self.stack.len() {
            0 if !text.trim().is_empty() => Err(ResearchError::parse(format!(
                "text outside the root element: {:?}",
                text.trim()
            ))),
            depth if depth == FIELD_DEPTH + 1 => {
                if let Some(field) = self.field.as_mut().filter(|f| !f.sealed) {
                    field.text.get_or_insert_with(String::new).push_str(text);
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn finish(self) -> Result<DecodedResults> {
        if !self.seen_root {
            return Err(ResearchError::parse("document has no root element"));
        }
        if let Some(open) = self.stack.last() {
            return Err(ResearchError::parse(format!(
                "unexpected end of document: <{open}> is not closed"
            )));
        }
        Ok(self.results)
    }
}
