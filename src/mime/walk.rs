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

//! Serialisation of a `MimeTree` back into the byte sequence it came from.
//!
//! The walk itself does not produce bytes; it describes the output to a
//! `Sink` as a sequence of inline data and external attachment segments. The
//! length calculator and the rebuilder are both sinks over the same walk,
//! which is what keeps their results consistent with each other.

use super::tree::{Body, Content, MimeTree, NodeId};

pub trait Sink {
    /// Append inline bytes to the output.
    fn data(&mut self, data: &[u8]);
    /// Append the full content of an external attachment of known length.
    fn external(&mut self, attachment_id: &str, len: u64);
}

/// Joins emitted lines with CRLF.
///
/// Each line is preceded by a line break except the first, so that a walk
/// over N lines produces N-1 line breaks, matching how `split_lines`
/// divided the input.
struct LineWriter<'s, S: ?Sized> {
    sink: &'s mut S,
    first: bool,
}

impl<S: Sink + ?Sized> LineWriter<'_, S> {
    fn start_line(&mut self) {
        if !self.first {
            self.sink.data(b"\r\n");
        }
        self.first = false;
    }

    fn line(&mut self, data: &[u8]) {
        self.start_line();
        self.sink.data(data);
    }

    fn external(&mut self, attachment_id: &str, len: u64) {
        self.start_line();
        self.sink.external(attachment_id, len);
    }
}

/// Walk the subtree rooted at `node`.
///
/// With `text_only`, the header and separator of `node` itself are skipped
/// and only its content is produced. Descendants are always produced in
/// full.
pub fn walk<S: Sink + ?Sized>(
    tree: &MimeTree,
    node: NodeId,
    text_only: bool,
    sink: &mut S,
) {
    let mut writer = LineWriter { sink, first: true };
    walk_node(tree, node, text_only, &mut writer);
}

fn walk_node<S: Sink + ?Sized>(
    tree: &MimeTree,
    id: NodeId,
    text_only: bool,
    w: &mut LineWriter<'_, S>,
) {
    let node = &tree[id];
    if !text_only {
        for line in &node.header {
            w.line(line);
        }
        if node.has_separator {
            w.line(b"");
        }
    }

    match node.content {
        Content::Leaf(Body::Inline(None)) => {},
        Content::Leaf(Body::Inline(Some(ref body))) => w.line(body),
        Content::Leaf(Body::External { ref attachment_id }) => {
            w.external(attachment_id, node.size)
        },
        Content::Message(child) => walk_node(tree, child, false, w),
        Content::Multipart(ref mp) => {
            if let Some(ref preamble) = mp.preamble {
                w.line(preamble);
            }
            for part in &mp.parts {
                w.line(&part.delimiter);
                walk_node(tree, part.node, false, w);
            }
            if let Some(ref close) = mp.close {
                w.line(close);
            }
            if let Some(ref epilogue) = mp.epilogue {
                w.line(epilogue);
            }
        },
    }
}
