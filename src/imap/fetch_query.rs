//-
// Copyright (c) 2026, The Mailroom developers
//
// This file is part of Mailroom.
//
// Mailroom is free software: you can  redistribute it and/or modify it under
// the terms of the GNU General Public  License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Mailroom is distributed in the hope that it will be useful, but WITHOUT ANY
// WARRANTY; without  even the implied  warranty of MERCHANTABILITY  or FITNESS
// FOR  A PARTICULAR  PURPOSE.  See the  GNU General  Public  License for  more
// details.
//
// You should have received a copy of the GNU General Public License along with
// Mailroom. If not, see <http://www.gnu.org/licenses/>.

//! The FETCH query language: parsing of fetch attributes into queries, and
//! evaluation of queries against a parsed message.

use std::fmt::Write as _;
use std::sync::Arc;

use chrono::prelude::*;

use super::literal_source::LiteralSource;
use super::parser::Attribute;
use super::response::Value;
use crate::mime::attachments::AttachmentStore;
use crate::mime::fetch::bodystructure::body_structure;
use crate::mime::fetch::envelope::Envelope;
use crate::mime::fetch::section::{get_contents, BodySection};
use crate::mime::length::{get_length, RebuildOptions};
use crate::mime::resolve::Specifier;
use crate::mime::tree::MimeTree;
use crate::support::error::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchItem {
    Uid,
    Flags,
    InternalDate,
    Rfc822Size,
    Envelope,
    /// `BODYSTRUCTURE`, with extension data.
    BodyStructure,
    /// `BODY` without a section: the body structure without extension data.
    Body,
    ModSeq,
    Rfc822,
    Rfc822Header,
    Rfc822Text,
    Section { section: BodySection, peek: bool },
}

/// One requested data item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchQuery {
    pub item: FetchItem,
    /// The item name to use in the response.
    pub name: String,
    /// Whether the value is message content sent as a literal.
    pub is_literal: bool,
}

impl FetchQuery {
    /// A query for an item without a section, such as `UID`.
    pub fn simple(item: FetchItem, name: &str) -> Self {
        let is_literal = matches!(
            item,
            FetchItem::Rfc822 | FetchItem::Rfc822Header | FetchItem::Rfc822Text
        );
        FetchQuery {
            item,
            name: name.to_owned(),
            is_literal,
        }
    }

    fn section(section: BodySection, peek: bool) -> Self {
        FetchQuery {
            name: section_response_name(&section),
            item: FetchItem::Section { section, peek },
            is_literal: true,
        }
    }

    /// Whether fetching this item sets `\Seen` on the message.
    pub fn marks_seen(&self) -> bool {
        match self.item {
            FetchItem::Rfc822 | FetchItem::Rfc822Text => true,
            FetchItem::Section { peek, .. } => !peek,
            _ => false,
        }
    }
}

/// Parse the item argument of FETCH: a macro, a single item, or a list of
/// items.
pub fn parse_items(attr: &Attribute) -> Result<Vec<FetchQuery>, String> {
    if let Attribute::Atom(ref name) = *attr {
        let expanded: Option<&[&str]> = match name.to_ascii_uppercase().as_str()
        {
            "ALL" => Some(&["FLAGS", "INTERNALDATE", "RFC822.SIZE", "ENVELOPE"]),
            "FAST" => Some(&["FLAGS", "INTERNALDATE", "RFC822.SIZE"]),
            "FULL" => Some(&[
                "FLAGS",
                "INTERNALDATE",
                "RFC822.SIZE",
                "ENVELOPE",
                "BODY",
            ]),
            _ => None,
        };

        if let Some(expanded) = expanded {
            return expanded
                .iter()
                .map(|n| parse_item(&Attribute::Atom((*n).to_owned())))
                .collect();
        }
    }

    match *attr {
        Attribute::List(ref items) if !items.is_empty() => {
            items.iter().map(parse_item).collect()
        },
        Attribute::List(_) => Err("Empty fetch item list".to_owned()),
        ref item => Ok(vec![parse_item(item)?]),
    }
}

/// Parse a single fetch item.
pub fn parse_item(attr: &Attribute) -> Result<FetchQuery, String> {
    match *attr {
        Attribute::Atom(ref name) => {
            let upper = name.to_ascii_uppercase();
            let item = match upper.as_str() {
                "UID" => FetchItem::Uid,
                "FLAGS" => FetchItem::Flags,
                "INTERNALDATE" => FetchItem::InternalDate,
                "RFC822.SIZE" => FetchItem::Rfc822Size,
                "ENVELOPE" => FetchItem::Envelope,
                "BODYSTRUCTURE" => FetchItem::BodyStructure,
                "BODY" => FetchItem::Body,
                "MODSEQ" => FetchItem::ModSeq,
                "RFC822" => FetchItem::Rfc822,
                "RFC822.HEADER" => FetchItem::Rfc822Header,
                "RFC822.TEXT" => FetchItem::Rfc822Text,
                _ => return Err(format!("Unknown fetch item {}", name)),
            };
            Ok(FetchQuery::simple(item, &upper))
        },

        Attribute::Section {
            ref name,
            ref section,
            partial,
        } => {
            let peek = match name.to_ascii_uppercase().as_str() {
                "BODY" => false,
                "BODY.PEEK" => true,
                _ => return Err(format!("Unknown fetch item {}[]", name)),
            };

            let mut section = parse_section(section)?;
            section.partial = partial;
            Ok(FetchQuery::section(section, peek))
        },

        _ => Err("Invalid fetch item".to_owned()),
    }
}

/// Parse the bracketed part of `BODY[...]`.
fn parse_section(attrs: &[Attribute]) -> Result<BodySection, String> {
    let Some(first) = attrs.first() else {
        return Ok(BodySection::default());
    };
    let text = first
        .as_text()
        .ok_or_else(|| "Invalid section specifier".to_owned())?;

    let mut subscripts = Vec::new();
    let mut rest = &*text;
    while !rest.is_empty() {
        let (head, tail) = rest.split_once('.').unwrap_or((rest, ""));
        if !head.bytes().all(|b| b.is_ascii_digit()) {
            break;
        }
        match head.parse::<u32>() {
            Ok(n) if n > 0 => subscripts.push(n),
            _ => return Err("Invalid section part number".to_owned()),
        }
        rest = tail;
    }

    let specifier = Specifier::parse(rest)
        .ok_or_else(|| format!("Invalid section specifier {}", rest))?;
    if Specifier::Mime == specifier && subscripts.is_empty() {
        return Err("MIME requires a part number".to_owned());
    }

    let header_filter = match specifier {
        Specifier::HeaderFields | Specifier::HeaderFieldsNot => {
            let names = match attrs.get(1).and_then(Attribute::as_list) {
                Some(names) if !names.is_empty() && 2 == attrs.len() => names,
                _ => {
                    return Err(
                        "HEADER.FIELDS requires a list of header names"
                            .to_owned(),
                    )
                },
            };
            names
                .iter()
                .map(|n| {
                    n.as_text().map(|n| n.into_owned()).ok_or_else(|| {
                        "Invalid header name".to_owned()
                    })
                })
                .collect::<Result<Vec<_>, _>>()?
        },
        _ if attrs.len() > 1 => {
            return Err("Unexpected data in section".to_owned())
        },
        _ => Vec::new(),
    };

    Ok(BodySection {
        subscripts,
        specifier,
        header_filter,
        partial: None,
    })
}

/// `BODY[<section>]<<start>>`, as named in the response.
fn section_response_name(section: &BodySection) -> String {
    let mut name = "BODY[".to_owned();
    for (ix, sub) in section.subscripts.iter().enumerate() {
        if ix > 0 {
            name.push('.');
        }
        let _ = write!(name, "{}", sub);
    }

    let specifier = match section.specifier {
        Specifier::Content => "",
        Specifier::Header => "HEADER",
        Specifier::HeaderFields => "HEADER.FIELDS",
        Specifier::HeaderFieldsNot => "HEADER.FIELDS.NOT",
        Specifier::Text => "TEXT",
        Specifier::Mime => "MIME",
    };
    if !specifier.is_empty() {
        if !section.subscripts.is_empty() {
            name.push('.');
        }
        name.push_str(specifier);
    }

    if !section.header_filter.is_empty() {
        name.push_str(" (");
        for (ix, h) in section.header_filter.iter().enumerate() {
            if ix > 0 {
                name.push(' ');
            }
            name.push_str(&h.to_ascii_uppercase());
        }
        name.push(')');
    }
    name.push(']');

    if let Some((start, _)) = section.partial {
        let _ = write!(name, "<{}>", start);
    }

    name
}

/// What a FETCH needs to know about one message.
pub struct MessageView<'a> {
    pub uid: u32,
    pub flags: &'a [String],
    pub internal_date: DateTime<FixedOffset>,
    pub mod_seq: u64,
    pub tree: &'a MimeTree,
    pub store: Option<Arc<dyn AttachmentStore>>,
}

/// Evaluate `query` against `message`.
///
/// Content items become literals. A section the message does not have is
/// `NIL`.
pub fn fetch_value(
    query: &FetchQuery,
    message: &MessageView<'_>,
) -> Result<Value, Error> {
    let tree = message.tree;
    let root = tree.root();

    let section = match query.item {
        FetchItem::Uid => return Ok(Value::Number(message.uid.into())),
        FetchItem::Flags => {
            return Ok(Value::atoms(message.flags.iter().cloned()))
        },
        FetchItem::InternalDate => {
            return Ok(Value::DateTime(message.internal_date))
        },
        FetchItem::Rfc822Size => {
            return Ok(Value::Number(get_length(
                tree,
                root,
                &RebuildOptions::default(),
            )))
        },
        FetchItem::Envelope => {
            return Ok(Value::envelope(&Envelope::from_header(
                &tree[root].parsed_header,
            )))
        },
        FetchItem::BodyStructure => {
            return Ok(Value::body_structure(&body_structure(tree, root), true))
        },
        FetchItem::Body => {
            return Ok(Value::body_structure(&body_structure(tree, root), false))
        },
        FetchItem::ModSeq => {
            return Ok(Value::List(vec![Value::Number(message.mod_seq)]))
        },
        FetchItem::Rfc822 => BodySection::default(),
        FetchItem::Rfc822Header => BodySection {
            specifier: Specifier::Header,
            ..BodySection::default()
        },
        FetchItem::Rfc822Text => BodySection {
            specifier: Specifier::Text,
            ..BodySection::default()
        },
        FetchItem::Section { ref section, .. } => section.clone(),
    };

    match get_contents(tree, &section, message.store.clone()) {
        Ok(contents) => Ok(Value::Literal(LiteralSource::from(contents))),
        Err(Error::NoSuchSection) => Ok(Value::Nil),
        Err(e) => Err(e),
    }
}
