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

//! Mapping of IMAP section paths (`1.2.TEXT` and friends) onto tree nodes.
//!
//! Numbering follows RFC 3501 §6.4.5: the parts of a multipart are numbered
//! from 1; a non-multipart node has exactly one part, itself; and a
//! `message/rfc822` node is transparently descended into before its parts
//! are numbered or its HEADER/TEXT is taken.

use super::tree::{Content, MimeTree, NodeId};
use crate::support::error::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Specifier {
    /// No suffix: the whole message at the top level, otherwise the
    /// content of the part.
    Content,
    Header,
    HeaderFields,
    HeaderFieldsNot,
    Text,
    Mime,
}

impl Specifier {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "" => Some(Specifier::Content),
            "HEADER" => Some(Specifier::Header),
            "HEADER.FIELDS" => Some(Specifier::HeaderFields),
            "HEADER.FIELDS.NOT" => Some(Specifier::HeaderFieldsNot),
            "TEXT" => Some(Specifier::Text),
            "MIME" => Some(Specifier::Mime),
            _ => None,
        }
    }

    /// Whether this specifier addresses a message rather than a part.
    fn is_message_level(self) -> bool {
        matches!(
            self,
            Specifier::Header
                | Specifier::HeaderFields
                | Specifier::HeaderFieldsNot
                | Specifier::Text
        )
    }
}

/// Follow a numeric part path from the root.
pub fn resolve_path(tree: &MimeTree, path: &[u32]) -> Option<NodeId> {
    let mut node = tree.root();
    for &part in path {
        node = step(tree, node, part)?;
    }
    Some(node)
}

fn step(tree: &MimeTree, node: NodeId, part: u32) -> Option<NodeId> {
    match tree[node].content {
        Content::Multipart(ref mp) => mp
            .parts
            .get((part as usize).checked_sub(1)?)
            .map(|p| p.node),
        Content::Message(message) => step(tree, message, part),
        Content::Leaf(_) => Some(node).filter(|_| 1 == part),
    }
}

/// Resolve a path and specifier to the node the specifier applies to.
///
/// For HEADER, HEADER.FIELDS[.NOT] and TEXT below the top level this is the
/// message embedded in the addressed part. MIME is only meaningful below the
/// top level.
pub fn resolve_section(
    tree: &MimeTree,
    path: &[u32],
    specifier: Specifier,
) -> Result<NodeId, Error> {
    let node = resolve_path(tree, path).ok_or(Error::NoSuchSection)?;
    if path.is_empty() {
        return if Specifier::Mime == specifier {
            Err(Error::NoSuchSection)
        } else {
            Ok(node)
        };
    }

    if specifier.is_message_level() {
        Ok(tree[node].message().unwrap_or(node))
    } else {
        Ok(node)
    }
}

/// Resolve a dotted textual section such as `1.2.TEXT` or `3`.
pub fn resolve_node(
    tree: &MimeTree,
    section: &str,
) -> Result<(NodeId, Specifier), Error> {
    let mut path = Vec::new();
    let mut rest = section;
    while !rest.is_empty() {
        let (head, tail) = rest.split_once('.').unwrap_or((rest, ""));
        match head.parse::<u32>() {
            Ok(n) if n > 0 => {
                path.push(n);
                rest = tail;
            },
            Ok(_) => return Err(Error::NoSuchSection),
            Err(_) => break,
        }
    }

    let specifier = Specifier::parse(rest).ok_or(Error::NoSuchSection)?;
    let node = resolve_section(tree, &path, specifier)?;
    Ok((node, specifier))
}
