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

use std::fmt;

use futures::stream::{AbortHandle, BoxStream};

use crate::mime::fetch::section::FetchedBodySection;
use crate::support::error::Error;

pub enum LiteralData {
    Buffer(Vec<u8>),
    /// A live stream. The writer skips `skip` bytes before forwarding
    /// anything.
    Stream {
        stream: BoxStream<'static, Result<Vec<u8>, Error>>,
        skip: u64,
        abort: Option<AbortHandle>,
    },
}

/// A data source for a literal in a response.
///
/// `len` is what gets announced to the client in the `{len}` prefix. A
/// stream which produces fewer bytes is a fatal error for the connection;
/// surplus bytes are discarded.
///
/// `PartialEq` only compares the lengths so that responses holding literals
/// can still be compared in tests.
pub struct LiteralSource {
    pub data: LiteralData,
    pub len: u64,
}

impl PartialEq for LiteralSource {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len
    }
}

impl Eq for LiteralSource {}

impl fmt::Debug for LiteralData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            LiteralData::Buffer(ref b) => write!(f, "<{} byte buffer>", b.len()),
            LiteralData::Stream { skip, .. } => {
                write!(f, "<stream skipping {}>", skip)
            },
        }
    }
}

impl fmt::Debug for LiteralSource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("LiteralSource")
            .field("data", &self.data)
            .field("len", &self.len)
            .finish()
    }
}

impl LiteralSource {
    pub fn of_data(data: impl Into<Vec<u8>>) -> Self {
        let data = data.into();
        LiteralSource {
            len: data.len() as u64,
            data: LiteralData::Buffer(data),
        }
    }

    pub fn of_stream(
        stream: BoxStream<'static, Result<Vec<u8>, Error>>,
        len: u64,
        abort: Option<AbortHandle>,
    ) -> Self {
        LiteralSource {
            data: LiteralData::Stream {
                stream,
                skip: 0,
                abort,
            },
            len,
        }
    }

    /// Restrict the literal to at most `max_length` bytes starting at
    /// `start`, clamping both ends to the data.
    pub fn with_window(mut self, start: u64, max_length: Option<u64>) -> Self {
        let start = start.min(self.len);
        let len = max_length.map_or(self.len - start, |max| {
            max.min(self.len - start)
        });

        match self.data {
            LiteralData::Buffer(ref mut data) => {
                data.truncate((start + len) as usize);
                data.drain(..start as usize);
            },
            LiteralData::Stream { ref mut skip, .. } => *skip += start,
        }
        self.len = len;
        self
    }

    /// The number of bytes this literal occupies on the wire, including the
    /// `{len}\r\n` prefix.
    pub fn wire_len(&self) -> u64 {
        self.len + format!("{{{}}}\r\n", self.len).len() as u64
    }

    /// Cancel any underlying stream.
    pub fn abort(&self) {
        if let LiteralData::Stream {
            abort: Some(ref abort),
            ..
        } = self.data
        {
            abort.abort();
        }
    }
}

impl From<FetchedBodySection> for LiteralSource {
    fn from(section: FetchedBodySection) -> Self {
        match section {
            FetchedBodySection::Buffer(data) => LiteralSource::of_data(data),
            FetchedBodySection::Stream(rebuilt) => LiteralSource::of_stream(
                rebuilt.stream,
                rebuilt.len,
                Some(rebuilt.abort),
            ),
        }
    }
}
