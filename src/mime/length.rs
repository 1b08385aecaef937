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

use super::tree::{MimeTree, NodeId};
use super::walk::{walk, Sink};

/// What to rebuild and how much of it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RebuildOptions {
    /// Skip the header of the starting node.
    pub text_only: bool,
    /// Byte offset of the first byte to produce.
    pub start_from: u64,
    /// Maximum number of bytes to produce after `start_from`.
    pub max_length: Option<u64>,
}

impl RebuildOptions {
    /// The part of `[0, total)` selected by these options.
    pub fn window(&self, total: u64) -> (u64, u64) {
        let start = self.start_from.min(total);
        let end = match self.max_length {
            Some(max) => start.saturating_add(max).min(total),
            None => total,
        };
        (start, end)
    }
}

#[derive(Default)]
struct LengthSink(u64);

impl Sink for LengthSink {
    fn data(&mut self, data: &[u8]) {
        self.0 += data.len() as u64;
    }

    fn external(&mut self, _: &str, len: u64) {
        self.0 += len;
    }
}

/// The exact number of bytes `rebuild` produces for the same arguments,
/// computed without touching any attachment.
pub fn get_length(
    tree: &MimeTree,
    node: NodeId,
    options: &RebuildOptions,
) -> u64 {
    let mut sink = LengthSink::default();
    walk(tree, node, options.text_only, &mut sink);
    let (start, end) = options.window(sink.0);
    end - start
}
