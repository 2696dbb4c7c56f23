//! quick-xml wrapper and helper traits used by the Office Open XML reader.

use crate::error::GradeStatsError;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::BytesRef;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::borrow::Cow;
use std::io::BufRead;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum XmlError {
    #[error("Parse entity '{0}' failed")]
    ParseEntityError(String),
}

/// Pull parser over one part of a package, reusing a single event buffer.
pub(crate) struct XmlReader<R: BufRead> {
    reader: Reader<R>,
    buffer: Vec<u8>,
}

impl<R: BufRead> XmlReader<R> {
    pub(crate) fn new(buf_reader: R) -> XmlReader<R> {
        let mut reader = Reader::from_reader(buf_reader);
        let config = reader.config_mut();
        config.check_comments = false;
        config.check_end_names = false;
        // <c r="A1"/> must produce matching Start/End events
        config.expand_empty_elements = true;
        config.trim_text(false);

        XmlReader { reader, buffer: Vec::with_capacity(1024) }
    }

    /// Next event, or `None` at end of document.
    pub(crate) fn next(&'_ mut self) -> Result<Option<Event<'_>>, GradeStatsError> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer)? {
            Event::Eof => Ok(None),
            event => Ok(Some(event)),
        }
    }
}

pub(crate) trait XmlAttributeHelper<'a> {
    /// Unescaped attribute value
    fn get_value(&self) -> Result<Cow<'a, str>, GradeStatsError>;
}

impl<'a> XmlAttributeHelper<'a> for Attribute<'a> {
    fn get_value(&self) -> Result<Cow<'a, str>, GradeStatsError> {
        Ok(self.unescape_value()?)
    }
}

pub(crate) trait XmlNodeHelper<'a> {
    /// Unescaped value of the attribute called `name`, if present.
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, GradeStatsError>;
}

impl<'a> XmlNodeHelper<'a> for BytesStart<'a> {
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, GradeStatsError> {
        self.try_get_attribute(name)?
            .map(|attribute| attribute.get_value())
            .transpose()
    }
}

pub(crate) trait XmlTextContextHelper {
    /// Appends the text behind an entity or character reference (`&amp;`, `&#233;`).
    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), GradeStatsError>;
}

impl XmlTextContextHelper for String {
    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), GradeStatsError> {
        let raw = bytes.xml_content()?;
        if let Some(number) = raw.strip_prefix('#') {
            let code = match number.strip_prefix('x') {
                Some(hex) => u32::from_str_radix(hex, 16)?,
                None => number.parse::<u32>()?,
            };
            if let Some(character) = char::from_u32(code) {
                self.push(character);
            }
        } else if let Some(entity) = resolve_xml_entity(&raw) {
            self.push_str(entity);
        } else {
            Err(XmlError::ParseEntityError(raw.to_string()))?;
        }
        Ok(())
    }
}

#[macro_export]
macro_rules! match_xml_events {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(result) = $reader.next()? {
            match result {
                Event::Eof => break,
                $($arms)*
                _ => (),
            }
        }
    };
}
