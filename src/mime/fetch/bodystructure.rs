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

use super::envelope::Envelope;
use crate::mime::encoded_word::decode_words;
use crate::mime::tree::{Content, MimeTree, NodeId};

/// The RFC 3501 `BODYSTRUCTURE` of one part, sort of.
///
/// The wire form depends on the content type of each part and on whether
/// the client asked for `BODY` or `BODYSTRUCTURE`. This is the union of every
/// field any of those forms needs; the protocol layer picks the fields it
/// sends.
///
/// An embedded `message/rfc822` part is represented with exactly one child,
/// the embedded message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodyStructure {
    /// The content type and subtype of this part, lower-case.
    pub content_type: (String, String),
    pub content_type_parms: Vec<(String, String)>,
    pub content_disposition: Option<String>,
    pub content_disposition_parms: Vec<(String, String)>,
    pub content_language: Option<String>,
    pub content_location: Option<String>,
    pub content_id: Option<String>,
    /// The `Content-Description` header, decoded.
    pub content_description: Option<String>,
    pub content_transfer_encoding: String,
    /// The exact length of the content of this part in encoded form.
    pub size_octets: u64,
    /// The number of lines of the content in encoded form.
    pub size_lines: u64,
    /// The `Content-MD5` header, as sent.
    pub md5: Option<String>,
    /// The envelope from this part's headers.
    pub envelope: Envelope,
    pub children: Vec<BodyStructure>,
}

impl BodyStructure {
    pub fn is_multipart(&self) -> bool {
        "multipart" == self.content_type.0
    }

    pub fn is_message_rfc822(&self) -> bool {
        "message" == self.content_type.0 && "rfc822" == self.content_type.1
    }

    pub fn is_text(&self) -> bool {
        "text" == self.content_type.0
    }
}

/// Compute the body structure of the subtree at `node`.
pub fn body_structure(tree: &MimeTree, node: NodeId) -> BodyStructure {
    let n = &tree[node];
    let header = &n.parsed_header;
    let ct = &header.content_type;

    let children = match n.content {
        Content::Multipart(_) => n
            .children()
            .into_iter()
            .map(|child| body_structure(tree, child))
            .collect(),
        Content::Message(message) => vec![body_structure(tree, message)],
        Content::Leaf(_) => Vec::new(),
    };

    let (content_disposition, content_disposition_parms) =
        match header.content_disposition {
            Some(ref d) if !d.value.is_empty() => (
                Some(d.value.clone()),
                d.params.clone().into_iter().collect(),
            ),
            _ => (None, Vec::new()),
        };

    BodyStructure {
        content_type: (ct.kind.clone(), ct.subtype.clone()),
        content_type_parms: ct.params.clone().into_iter().collect(),
        content_disposition,
        content_disposition_parms,
        content_language: header.content_language.clone(),
        content_location: header.content_location.clone(),
        content_id: header.content_id.clone(),
        content_description: header
            .content_description
            .as_deref()
            .map(|d| decode_words(d).into_owned()),
        content_transfer_encoding: header.transfer_encoding().to_owned(),
        size_octets: n.size,
        size_lines: n.line_count,
        md5: header
            .fields
            .get("content-md5")
            .and_then(|values| values.first())
            .cloned(),
        envelope: Envelope::from_header(header),
        children,
    }
}
