/*
 * Copyright (c) Facebook, Inc. and its affiliates.
 *
 * This software may be used and distributed according to the terms of the
 * GNU General Public License version 2.
 */

//! `log --style xml` output, shared by `log`, `heads`, `parents`, `tip`,
//! `incoming` and `outgoing`.

use chrono::{DateTime, FixedOffset};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::errors::*;

/// One changeset from the log.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Revision {
    /// Local revision number, as printed by the server.
    pub revision_id: String,
    /// 40-character hex node hash.
    pub hash: String,
    pub date: DateTime<FixedOffset>,
    pub author_name: String,
    pub author_email: String,
    pub message: String,
    /// From `<branch>`, falling back to `<extra key="branch">`.
    pub branch: Option<String>,
}

/// Element whose character data is being captured.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Field {
    Author,
    Date,
    Message,
    Branch,
    ExtraBranch,
}

#[derive(Debug, Default)]
struct PartialEntry {
    revision_id: String,
    hash: String,
    date: String,
    author_name: String,
    author_email: String,
    message: String,
    branch: String,
    extra_branch: String,
}

impl PartialEntry {
    fn finish(self) -> Result<Revision> {
        let date = DateTime::parse_from_rfc3339(self.date.trim())
            .map_err(|e| ErrorKind::Parse(format!("bad log date '{}': {}", self.date, e)))?;
        let branch = if !self.branch.is_empty() {
            Some(self.branch)
        } else if !self.extra_branch.is_empty() {
            Some(self.extra_branch)
        } else {
            None
        };
        Ok(Revision {
            revision_id: self.revision_id,
            hash: self.hash,
            date,
            author_name: self.author_name,
            author_email: self.author_email,
            message: self.message,
            branch,
        })
    }
}

fn parse_err(err: quick_xml::Error) -> Error {
    ErrorKind::Parse(format!("malformed log xml: {}", err)).into()
}

fn attr_value(reader: &Reader<&[u8]>, element: &BytesStart<'_>, name: &[u8]) -> Result<String> {
    for attr in element.attributes() {
        let attr = attr.map_err(parse_err)?;
        if attr.key == name {
            return attr.unescape_and_decode_value(reader).map_err(parse_err);
        }
    }
    Ok(String::new())
}

fn attr_value_ignore_case(
    reader: &Reader<&[u8]>,
    element: &BytesStart<'_>,
    name: &[u8],
) -> Result<String> {
    for attr in element.attributes() {
        let attr = attr.map_err(parse_err)?;
        if attr.key.eq_ignore_ascii_case(name) {
            return attr.unescape_and_decode_value(reader).map_err(parse_err);
        }
    }
    Ok(String::new())
}

/// Parse everything from the first `<?xml` marker to the end of input as
/// an XML log document and return its revisions in document order. Output
/// before the marker (`comparing with …` and similar) is skipped; a
/// missing marker is a parse error.
pub fn parse(text: &str) -> Result<Vec<Revision>> {
    let start = text
        .find("<?xml")
        .ok_or_else(|| Error::from(ErrorKind::Parse("no xml declaration in log output".into())))?;

    let mut reader = Reader::from_str(&text[start..]);
    let mut buf = Vec::new();
    let mut revisions = Vec::new();
    let mut entry: Option<PartialEntry> = None;
    let mut field: Option<Field> = None;

    loop {
        match reader.read_event(&mut buf).map_err(parse_err)? {
            Event::Start(ref e) => {
                let (new_entry, new_field) = on_element_start(&reader, e, &mut entry)?;
                if let Some(new_entry) = new_entry {
                    entry = Some(new_entry);
                }
                field = new_field;
            }
            Event::Empty(ref e) => {
                // Self-closing elements carry no text; only the attribute
                // side effects of an open tag apply.
                let (new_entry, _) = on_element_start(&reader, e, &mut entry)?;
                if let Some(new_entry) = new_entry {
                    entry = Some(new_entry);
                }
                field = None;
            }
            Event::Text(ref e) => {
                if let (Some(entry), Some(field)) = (entry.as_mut(), field) {
                    let text = e.unescape_and_decode(&reader).map_err(parse_err)?;
                    entry.capture(field, &text);
                }
            }
            Event::End(ref e) => {
                field = None;
                if e.name() == b"logentry" {
                    if let Some(done) = entry.take() {
                        revisions.push(done.finish()?);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(revisions)
}

/// Handle an opening tag: returns a fresh entry for `<logentry>` and the
/// field (if any) whose text should be captured.
fn on_element_start(
    reader: &Reader<&[u8]>,
    element: &BytesStart<'_>,
    entry: &mut Option<PartialEntry>,
) -> Result<(Option<PartialEntry>, Option<Field>)> {
    match element.name() {
        b"logentry" => {
            let mut new = PartialEntry::default();
            new.revision_id = attr_value(reader, element, b"revision")?;
            new.hash = attr_value(reader, element, b"node")?;
            Ok((Some(new), None))
        }
        b"author" => {
            if let Some(entry) = entry.as_mut() {
                entry.author_email = attr_value(reader, element, b"email")?;
            }
            Ok((None, Some(Field::Author)))
        }
        b"date" => Ok((None, Some(Field::Date))),
        b"msg" => Ok((None, Some(Field::Message))),
        b"branch" => Ok((None, Some(Field::Branch))),
        b"extra" => {
            let key = attr_value_ignore_case(reader, element, b"key")?;
            if key.eq_ignore_ascii_case("branch") {
                Ok((None, Some(Field::ExtraBranch)))
            } else {
                Ok((None, None))
            }
        }
        _ => Ok((None, None)),
    }
}

impl PartialEntry {
    fn capture(&mut self, field: Field, text: &str) {
        let slot = match field {
            Field::Author => &mut self.author_name,
            Field::Date => &mut self.date,
            Field::Message => &mut self.message,
            Field::Branch => &mut self.branch,
            Field::ExtraBranch => &mut self.extra_branch,
        };
        slot.push_str(text);
    }
}
