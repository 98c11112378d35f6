//! `ResultSet` → XML document.

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use tracing::{debug, instrument};

use autoresearch_shared::{
    CategoryValue, Entry, ITEM_TAG, ROOT_TAG, ResearchError, Result, ResultSet, Scalar,
};

use crate::names;

/// Indentation width of the pretty-printed document.
const INDENT: usize = 2;

/// Serialize a result set into an indented, UTF-8, XML-declared document.
///
/// Fails with [`ResearchError::Serialization`] when a category or field name is
/// not a legal tag, or when a value contains characters XML cannot carry.
#[instrument(skip_all, fields(categories = results.len()))]
pub fn encode(results: &ResultSet) -> Result<Vec<u8>> {
    let mut doc = DocumentWriter::new();

    doc.declaration()?;
    doc.open(ROOT_TAG)?;

    for (category, value) in results.iter() {
        let context = format!("category '{category}'");
        check_tag(category, &context)?;

        match value {
            CategoryValue::Entries(entries) if entries.is_empty() => doc.empty(category)?,
            CategoryValue::Entries(entries) => {
                doc.open(category)?;
                for (index, entry) in entries.iter().enumerate() {
                    let context = format!("{context}, item {index}");
                    write_entry(&mut doc, entry, &context)?;
                }
                doc.close(category)?;
            }
            CategoryValue::Scalar(scalar) => doc.scalar_element(category, scalar, &context)?,
        }
    }

    doc.close(ROOT_TAG)?;

    let bytes = doc.finish();
    debug!(bytes = bytes.len(), "XML document created");
    Ok(bytes)
}

/// [`encode`] into a `String`.
pub fn encode_to_string(results: &ResultSet) -> Result<String> {
    let bytes = encode(results)?;
    String::from_utf8(bytes).map_err(|e| ResearchError::serialization("document", e.to_string()))
}

fn write_entry(doc: &mut DocumentWriter, entry: &Entry, context: &str) -> Result<()> {
    match entry {
        Entry::Fields(fields) if fields.is_empty() => doc.empty(ITEM_TAG),
        Entry::Fields(fields) => {
            doc.open(ITEM_TAG)?;
            for (field, scalar) in fields {
                let context = format!("{context}, field '{field}'");
                check_tag(field, &context)?;
                doc.scalar_element(field, scalar, &context)?;
            }
            doc.close(ITEM_TAG)
        }
        Entry::Value(scalar) => doc.scalar_element(ITEM_TAG, scalar, context),
    }
}

fn check_tag(name: &str, context: &str) -> Result<()> {
    if names::is_valid_tag(name) {
        Ok(())
    } else {
        Err(ResearchError::serialization(
            context,
            format!("{name:?} is not a valid XML tag name"),
        ))
    }
}

// ---------------------------------------------------------------------------
// Writer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper over `quick_xml::Writer` that maps writer failures into
/// serialization errors carrying the element being written.
struct DocumentWriter {
    writer: Writer<Vec<u8>>,
}

impl DocumentWriter {
    fn new() -> Self {
        Self {
            writer: Writer::new_with_indent(Vec::new(), b' ', INDENT),
        }
    }

    fn write(&mut self, event: Event<'_>, context: &str) -> Result<()> {
        self.writer
            .write_event(event)
            .map_err(|e| ResearchError::serialization(context, e.to_string()))
    }

    fn declaration(&mut self) -> Result<()> {
        self.write(
            Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
            "declaration",
        )
    }

    fn open(&mut self, tag: &str) -> Result<()> {
        self.write(Event::Start(BytesStart::new(tag)), tag)
    }

    fn close(&mut self, tag: &str) -> Result<()> {
        self.write(Event::End(BytesEnd::new(tag)), tag)
    }

    fn empty(&mut self, tag: &str) -> Result<()> {
        self.write(Event::Empty(BytesStart::new(tag)), tag)
    }

    /// `<tag>text</tag>`, or `<tag/>` for an absent scalar.
    fn scalar_element(&mut self, tag: &str, scalar: &Scalar, context: &str) -> Result<()> {
        let Some(text) = scalar.to_text() else {
            return self.empty(tag);
        };

        if let Some(c) = names::first_illegal_char(&text) {
            return Err(ResearchError::serialization(
                context,
                format!("value contains character U+{:04X} which XML cannot represent", c as u32),
            ));
        }

        self.open(tag)?;
        self.write(Event::Text(BytesText::new(&text)), context)?;
        self.close(tag)
    }

    fn finish(self) -> Vec<u8> {
        let mut bytes = self.writer.into_inner();
        bytes.push(b'\n');
        bytes
    }
}
