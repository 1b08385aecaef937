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

//! The in-memory representation of a parsed message.
//!
//! A message is held as an arena of nodes addressed by `NodeId`. Node 0 is
//! always the root. Children are listed by index and the parent link is a
//! plain index, so the tree can be cloned, serialised or walked without any
//! shared ownership.
//!
//! The tree is lossless: walking it reproduces the original message exactly,
//! except that every line ending becomes CRLF. To make that possible each
//! node remembers its raw header lines, whether a blank separator line
//! followed them, and for multiparts the raw delimiter lines along with the
//! preamble and epilogue.

use std::ops::Index;

use super::header::ParsedHeader;

pub type NodeId = usize;

/// Nesting beyond this depth is treated as an opaque leaf.
pub const MAX_DEPTH: usize = 64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MimeTree {
    nodes: Vec<MimeNode>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MimeNode {
    /// Raw header lines, without line endings, folding preserved.
    pub header: Vec<Vec<u8>>,
    /// Whether a blank line followed the header.
    pub has_separator: bool,
    pub parsed_header: ParsedHeader,
    pub parent: Option<NodeId>,
    /// The length in bytes of everything after the separator, as rebuilt.
    pub size: u64,
    /// The number of line breaks in everything after the separator.
    pub line_count: u64,
    pub content: Content,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Content {
    Leaf(Body),
    Multipart(Multipart),
    /// A `message/rfc822` part whose content was parsed as a message.
    Message(NodeId),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Body {
    /// The body is held inline. `None` means there were no body lines at
    /// all, as distinct from a single empty line.
    Inline(Option<Vec<u8>>),
    /// The body was extracted to external storage. Its length is the node's
    /// `size`.
    External { attachment_id: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Multipart {
    /// Lower-case subtype, e.g. `mixed`.
    pub subtype: String,
    pub boundary: String,
    pub preamble: Option<Vec<u8>>,
    pub parts: Vec<Part>,
    /// The raw closing delimiter line, if the multipart was terminated.
    pub close: Option<Vec<u8>>,
    pub epilogue: Option<Vec<u8>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Part {
    /// The raw delimiter line introducing this part.
    pub delimiter: Vec<u8>,
    pub node: NodeId,
}

impl Index<NodeId> for MimeTree {
    type Output = MimeNode;

    fn index(&self, id: NodeId) -> &MimeNode {
        &self.nodes[id]
    }
}

impl MimeTree {
    /// Parse a raw RFC 822 message.
    ///
    /// This never fails. Anything that does not parse as structure is kept
    /// as opaque content.
    pub fn parse(data: &[u8]) -> Self {
        let lines = split_lines(data);
        let mut tree = MimeTree { nodes: Vec::new() };
        tree.parse_node(&lines, None, true, 0);
        tree
    }

    pub fn root(&self) -> NodeId {
        0
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&MimeNode> {
        self.nodes.get(id)
    }

    pub(super) fn node_mut(&mut self, id: NodeId) -> &mut MimeNode {
        &mut self.nodes[id]
    }

    /// All node ids in document order.
    pub fn document_order(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        self.collect_order(self.root(), &mut out);
        out
    }

    fn collect_order(&self, id: NodeId, out: &mut Vec<NodeId>) {
        out.push(id);
        match self[id].content {
            Content::Leaf(_) => {},
            Content::Message(child) => self.collect_order(child, out),
            Content::Multipart(ref mp) => {
                for part in &mp.parts {
                    self.collect_order(part.node, out);
                }
            },
        }
    }

    fn parse_node(
        &mut self,
        lines: &[&[u8]],
        parent: Option<NodeId>,
        message_root: bool,
        depth: usize,
    ) -> NodeId {
        let (header, body, has_separator) =
            match lines.iter().position(|l| l.is_empty()) {
                Some(sep) => (&lines[..sep], &lines[sep + 1..], true),
                None => (lines, &[][..], false),
            };

        let header = header.iter().map(|l| l.to_vec()).collect::<Vec<_>>();
        let parsed_header = ParsedHeader::parse(&header, message_root);
        let (size, line_count) = measure(body);

        let id = self.nodes.len();
        self.nodes.push(MimeNode {
            header,
            has_separator,
            parsed_header,
            parent,
            size,
            line_count,
            content: Content::Leaf(Body::Inline(None)),
        });

        let content = if depth < MAX_DEPTH {
            self.parse_multipart(id, body, depth)
                .or_else(|| self.parse_message(id, body, depth))
        } else {
            None
        };
        self.nodes[id].content =
            content.unwrap_or_else(|| Content::Leaf(Body::Inline(join(body))));

        id
    }

    fn parse_multipart(
        &mut self,
        id: NodeId,
        body: &[&[u8]],
        depth: usize,
    ) -> Option<Content> {
        let content_type = &self.nodes[id].parsed_header.content_type;
        if !content_type.is_multipart() {
            return None;
        }
        let subtype = content_type.subtype.clone();
        let boundary = content_type.boundary()?.to_owned();

        let open = format!("--{}", boundary);
        let close = format!("--{}--", boundary);
        let mut delimiters = Vec::<usize>::new();
        let mut close_ix = None::<usize>;
        for (ix, line) in body.iter().enumerate() {
            let trimmed = trim_end(line);
            if trimmed == close.as_bytes() {
                close_ix = Some(ix);
                break;
            } else if trimmed == open.as_bytes() {
                delimiters.push(ix);
            }
        }

        let first = *delimiters.first()?;
        let end = close_ix.unwrap_or(body.len());

        let mut parts = Vec::with_capacity(delimiters.len());
        for (n, &start) in delimiters.iter().enumerate() {
            let part_end = delimiters.get(n + 1).copied().unwrap_or(end);
            let node =
                self.parse_node(&body[start + 1..part_end], Some(id), false, depth + 1);
            parts.push(Part {
                delimiter: body[start].to_vec(),
                node,
            });
        }

        Some(Content::Multipart(Multipart {
            subtype,
            boundary,
            preamble: join(&body[..first]),
            parts,
            close: close_ix.map(|ix| body[ix].to_vec()),
            epilogue: close_ix.and_then(|ix| join(&body[ix + 1..])),
        }))
    }

    fn parse_message(
        &mut self,
        id: NodeId,
        body: &[&[u8]],
        depth: usize,
    ) -> Option<Content> {
        let header = &self.nodes[id].parsed_header;
        if !header.content_type.is_message_rfc822()
            || !matches!(header.transfer_encoding(), "7bit" | "8bit" | "binary")
            || body.is_empty()
        {
            return None;
        }

        let child = self.parse_node(body, Some(id), true, depth + 1);
        Some(Content::Message(child))
    }
}

impl MimeNode {
    pub fn is_multipart(&self) -> bool {
        matches!(self.content, Content::Multipart(_))
    }

    /// The direct children of a multipart node, in order.
    pub fn children(&self) -> Vec<NodeId> {
        match self.content {
            Content::Multipart(ref mp) => mp.parts.iter().map(|p| p.node).collect(),
            _ => Vec::new(),
        }
    }

    /// The embedded message of a `message/rfc822` node.
    pub fn message(&self) -> Option<NodeId> {
        match self.content {
            Content::Message(child) => Some(child),
            _ => None,
        }
    }

    /// The inline body of a leaf, if it has one.
    pub fn inline_body(&self) -> Option<&[u8]> {
        match self.content {
            Content::Leaf(Body::Inline(Some(ref body))) => Some(body),
            _ => None,
        }
    }

    pub fn attachment_id(&self) -> Option<&str> {
        match self.content {
            Content::Leaf(Body::External { ref attachment_id }) => {
                Some(attachment_id)
            },
            _ => None,
        }
    }
}

/// Split raw data into lines on LF, dropping one CR before each LF.
///
/// The final remainder is always kept, even if empty, so that joining the
/// result with CRLF reproduces the input.
pub fn split_lines(data: &[u8]) -> Vec<&[u8]> {
    data.split(|&b| b'\n' == b)
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .collect()
}

fn join(lines: &[&[u8]]) -> Option<Vec<u8>> {
    if lines.is_empty() {
        return None;
    }

    let (size, _) = measure(lines);
    let mut out = Vec::with_capacity(size as usize);
    for (ix, line) in lines.iter().enumerate() {
        if ix > 0 {
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(line);
    }
    Some(out)
}

fn measure(lines: &[&[u8]]) -> (u64, u64) {
    let breaks = lines.len().saturating_sub(1) as u64;
    let bytes = lines.iter().map(|l| l.len() as u64).sum::<u64>();
    (bytes + 2 * breaks, breaks)
}

fn trim_end(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |ix| ix + 1);
    &line[..end]
}
