//! Streaming XML access for SpreadsheetML parts.
//!
//! [`XmlReader`] owns its event buffer so callers can loop with
//! [`match_xml_events!`](crate::match_xml_events) without juggling lifetimes.
use crate::error::SheetOutlineError;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::BytesRef;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::borrow::Cow;
use std::io::BufRead;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum XmlError {
    #[error("Unknown XML entity '&{0};'")]
    UnknownEntityError(String),

    #[error("Invalid character reference '&{0};'")]
    CharacterReferenceError(String),
}

pub(crate) struct XmlReader<R: BufRead> {
    reader: Reader<R>,
    buffer: Vec<u8>,
}

impl<R: BufRead> XmlReader<R> {
    pub(crate) fn new(source: R) -> XmlReader<R> {
        let mut reader = Reader::from_reader(source);
        let config = reader.config_mut();
        config.check_comments = false;
        config.check_end_names = false;
        // `<c r="A1"/>` reports Start and End like `<c r="A1"></c>`
        config.expand_empty_elements = true;
        config.trim_text(false);

        XmlReader {
            reader,
            buffer: Vec::with_capacity(1024),
        }
    }

    /// Next event, or `None` at the end of the document.
    pub(crate) fn next(&'_ mut self) -> Result<Option<Event<'_>>, SheetOutlineError> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer)? {
            Event::Eof => Ok(None),
            event => Ok(Some(event)),
        }
    }
}

pub(crate) trait XmlNodeHelper<'a> {
    /// Unescaped value of the attribute `name`, matched on the local name so
    /// that `r:id` and `id` both answer to `"id"`.
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, SheetOutlineError>;
}

impl<'a> XmlNodeHelper<'a> for BytesStart<'a> {
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, SheetOutlineError> {
        for attribute in self.attributes() {
            let attribute = attribute?;
            if attribute.key.local_name().as_ref() == name.as_bytes() {
                return Ok(Some(attribute.unescape_value()?));
            }
        }
        Ok(None)
    }
}

pub(crate) trait XmlTextContextHelper {
    /// Appends the text of an entity or character reference such as `&amp;` or `&#x41;`.
    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), SheetOutlineError>;
}

impl XmlTextContextHelper for String {
    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), SheetOutlineError> {
        let raw = bytes.xml_content()?;
        if let Some(number) = raw.strip_prefix('#') {
            let code = match number.strip_prefix('x').or_else(|| number.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16)?,
                None => number.parse::<u32>()?,
            };
            let character = char::from_u32(code).ok_or_else(|| XmlError::CharacterReferenceError(raw.to_string()))?;
            self.push(character);
        } else if let Some(entity) = resolve_xml_entity(&raw) {
            self.push_str(entity);
        } else {
            Err(XmlError::UnknownEntityError(raw.to_string()))?;
        }
        Ok(())
    }
}

/// Loops over the events of an [`XmlReader`], ignoring the ones no arm matches.
/// `break` inside an arm stops reading.
#[macro_export]
macro_rules! match_xml_events {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(event) = $reader.next()? {
            match event {
                $($arms)*
                _ => (),
            }
        }
    };
}
