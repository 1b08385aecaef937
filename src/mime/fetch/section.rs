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

//! Fetching of `BODY[...]` sections.
//!
//! Each part of a multipart is numbered from 1 and parts are addressed by
//! dotted subscripts, so `2.3` is the third sub-part of the second part.
//! After the subscripts comes an optional specifier:
//!
//! - Nothing. At top level, the whole message. Anywhere else, the content of
//!   the part.
//!
//! - `HEADER` and `HEADER.FIELDS[.NOT] (...)`. At top level, the message
//!   header. Anywhere else, the header of the message embedded in a
//!   `message/rfc822` part.
//!
//! - `MIME`. Invalid at top level. Anywhere else, the header of the part
//!   itself.
//!
//! - `TEXT`. At top level, the message content. Anywhere else, the content of
//!   the embedded message.
//!
//! Header sections are small and are produced as a buffer. Everything else
//! goes through the rebuilder, which is what allows content that lives in
//! external attachment storage to be streamed out with partial ranges
//! honoured without loading the whole attachment.

use std::sync::Arc;

use crate::mime::attachments::AttachmentStore;
use crate::mime::header::line_header_name;
use crate::mime::length::{get_length, RebuildOptions};
use crate::mime::rebuild::{rebuild, RebuildStream};
use crate::mime::resolve::{resolve_section, Specifier};
use crate::mime::tree::{MimeTree, NodeId};
use crate::support::error::Error;

/// Identifies a particular portion of the body to fetch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BodySection {
    /// Which subscripts to traverse to find the part in question.
    pub subscripts: Vec<u32>,
    pub specifier: Specifier,
    /// Header names for `HEADER.FIELDS` and `HEADER.FIELDS.NOT`.
    pub header_filter: Vec<String>,
    /// If set, slice the section to at most `.1` bytes starting at `.0`,
    /// clamping each endpoint.
    pub partial: Option<(u64, u64)>,
}

impl Default for BodySection {
    fn default() -> Self {
        BodySection {
            subscripts: vec![],
            specifier: Specifier::Content,
            header_filter: vec![],
            partial: None,
        }
    }
}

/// The fetched content of a `BodySection`, already windowed.
#[derive(Debug)]
pub enum FetchedBodySection {
    Buffer(Vec<u8>),
    Stream(RebuildStream),
}

impl FetchedBodySection {
    pub fn len(&self) -> u64 {
        match *self {
            FetchedBodySection::Buffer(ref b) => b.len() as u64,
            FetchedBodySection::Stream(ref s) => s.len,
        }
    }

    pub fn is_empty(&self) -> bool {
        0 == self.len()
    }
}

impl BodySection {
    fn rebuild_options(&self, text_only: bool) -> RebuildOptions {
        RebuildOptions {
            text_only,
            start_from: self.partial.map_or(0, |(start, _)| start),
            max_length: self.partial.map(|(_, len)| len),
        }
    }

    fn target(&self, tree: &MimeTree) -> Result<NodeId, Error> {
        resolve_section(tree, &self.subscripts, self.specifier)
    }

    /// The length `get_contents` would produce, without producing it.
    pub fn len(&self, tree: &MimeTree) -> Result<u64, Error> {
        let node = self.target(tree)?;
        match self.specifier {
            Specifier::Content | Specifier::Text => Ok(get_length(
                tree,
                node,
                &self.rebuild_options(self.text_only()),
            )),
            _ => Ok(self.window(self.header_block(tree, node)).len() as u64),
        }
    }

    fn text_only(&self) -> bool {
        match self.specifier {
            Specifier::Text => true,
            _ => !self.subscripts.is_empty(),
        }
    }

    fn header_block(&self, tree: &MimeTree, node: NodeId) -> Vec<u8> {
        let filter = match self.specifier {
            Specifier::HeaderFields => Some(true),
            Specifier::HeaderFieldsNot => Some(false),
            _ => None,
        };

        let mut out = Vec::new();
        let mut keep = true;
        for line in &tree[node].header {
            let continuation = line.starts_with(b" ") || line.starts_with(b"\t");
            if !continuation {
                keep = match (filter, line_header_name(line)) {
                    (None, _) => true,
                    (Some(_), None) => false,
                    (Some(wanted), Some(name)) => {
                        wanted
                            == self.header_filter.iter().any(|h| {
                                h.as_bytes().eq_ignore_ascii_case(name)
                            })
                    },
                };
            }

            if keep {
                out.extend_from_slice(line);
                out.extend_from_slice(b"\r\n");
            }
        }
        out.extend_from_slice(b"\r\n");
        out
    }

    fn window(&self, mut data: Vec<u8>) -> Vec<u8> {
        let (start, end) = self.rebuild_options(false).window(data.len() as u64);
        data.truncate(end as usize);
        data.drain(..start as usize);
        data
    }
}

/// Fetch `section` from `tree`.
///
/// `store` is only consulted once the returned stream reaches an extracted
/// attachment.
pub fn get_contents(
    tree: &MimeTree,
    section: &BodySection,
    store: Option<Arc<dyn AttachmentStore>>,
) -> Result<FetchedBodySection, Error> {
    let node = section.target(tree)?;
    match section.specifier {
        Specifier::Content | Specifier::Text => {
            Ok(FetchedBodySection::Stream(rebuild(
                tree,
                node,
                &section.rebuild_options(section.text_only()),
                store,
            )))
        },
        Specifier::Header
        | Specifier::HeaderFields
        | Specifier::HeaderFieldsNot
        | Specifier::Mime => Ok(FetchedBodySection::Buffer(
            section.window(section.header_block(tree, node)),
        )),
    }
}
