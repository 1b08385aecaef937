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

//! Turning `Response` values into wire text.
//!
//! There are two forms. `compile` produces the complete text of a response
//! synchronously and refuses responses holding live streams.
//! `compile_streaming` produces the text with the positions of each literal
//! recorded, so that `CompiledResponse::write_to` can pipe the literal data
//! into the output as it becomes available.

use std::io::{self, Write};
use std::mem;

use futures::prelude::*;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::lex::{LexOutput, LexWriter};
use super::literal_source::{LiteralData, LiteralSource};
use super::response::Response;
use crate::support::error::Error;

/// Compile a response with no streamed literals, including the final CRLF.
pub fn compile(response: Response) -> Result<Vec<u8>, Error> {
    let mut w = LexWriter::new(Vec::<u8>::new());
    response.write_to(&mut w)?;
    let mut text = w.into_inner();
    text.extend_from_slice(b"\r\n");
    Ok(text)
}

/// Compile any response, leaving its literals to be spliced in later.
pub fn compile_streaming(response: Response) -> io::Result<CompiledResponse> {
    let mut w = LexWriter::new(CompiledResponse::default());
    response.write_to(&mut w)?;
    let mut compiled = w.into_inner();
    compiled.text.extend_from_slice(b"\r\n");
    Ok(compiled)
}

/// Wire text with literals to be spliced in at recorded offsets.
#[derive(Debug, Default)]
pub struct CompiledResponse {
    pub text: Vec<u8>,
    /// Literals to be spliced into `text`, sorted ascending by offset.
    pub splices: Vec<LiteralSplice>,
}

#[derive(Debug)]
pub struct LiteralSplice {
    /// The offset within `text` of this splice.
    pub offset: usize,
    pub source: LiteralSource,
}

impl CompiledResponse {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.splices.is_empty()
    }

    /// The number of bytes held in memory for this response.
    pub fn buffered_len(&self) -> usize {
        self.text.len()
            + self
                .splices
                .iter()
                .map(|s| match s.source.data {
                    LiteralData::Buffer(ref b) => b.len(),
                    LiteralData::Stream { .. } => 0,
                })
                .sum::<usize>()
    }

    /// Move everything in `other` onto the end of this response.
    pub fn append(&mut self, other: CompiledResponse) {
        let base = self.text.len();
        self.text.extend_from_slice(&other.text);
        self.splices
            .extend(other.splices.into_iter().map(|s| LiteralSplice {
                offset: s.offset + base,
                source: s.source,
            }));
    }

    /// Abort every stream this response holds.
    pub fn abort(&self) {
        self.splices.iter().for_each(|s| s.source.abort());
    }

    /// Write the whole response to `io`, consuming it.
    ///
    /// Streams are read only as fast as `io` accepts data. If a stream fails
    /// or ends short of its declared length, the remaining streams are
    /// aborted and an error is returned; the output is then out of sync with
    /// what the client expects and the connection must be closed.
    pub async fn write_to<W: AsyncWrite + Unpin>(
        &mut self,
        io: &mut W,
    ) -> Result<(), Error> {
        let mut offset = 0usize;
        let splices = mem::take(&mut self.splices);
        let mut splices = splices.into_iter();

        while let Some(splice) = splices.next() {
            if splice.offset > offset {
                io.write_all(&self.text[offset..splice.offset]).await?;
                offset = splice.offset;
            }

            if let Err(e) = write_literal(io, splice.source).await {
                splices.for_each(|s| s.source.abort());
                return Err(e);
            }
        }

        if offset < self.text.len() {
            io.write_all(&self.text[offset..]).await?;
        }

        self.text.clear();
        Ok(())
    }
}

impl Write for CompiledResponse {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.text.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LexOutput for CompiledResponse {
    fn splice(&mut self, source: LiteralSource) -> io::Result<()> {
        self.splices.push(LiteralSplice {
            offset: self.text.len(),
            source,
        });
        Ok(())
    }
}

/// Write exactly `source.len` bytes of `source` to `io`.
async fn write_literal<W: AsyncWrite + Unpin>(
    io: &mut W,
    source: LiteralSource,
) -> Result<(), Error> {
    let expected = source.len;
    let (mut stream, mut skip, abort) = match source.data {
        LiteralData::Buffer(data) => {
            io.write_all(&data[..(expected as usize).min(data.len())])
                .await?;
            return if (data.len() as u64) < expected {
                Err(Error::LiteralLengthMismatch {
                    expected,
                    actual: data.len() as u64,
                })
            } else {
                Ok(())
            };
        },
        LiteralData::Stream {
            stream,
            skip,
            abort,
        } => (stream, skip, abort),
    };

    let do_abort = || {
        if let Some(ref abort) = abort {
            abort.abort();
        }
    };

    let mut written = 0u64;
    while written < expected {
        let chunk = match stream.next().await {
            Some(Ok(chunk)) => chunk,
            Some(Err(e)) => {
                do_abort();
                return Err(e);
            },
            None => break,
        };

        let mut chunk = &chunk[..];
        if skip > 0 {
            let n = skip.min(chunk.len() as u64);
            chunk = &chunk[n as usize..];
            skip -= n;
        }

        let n = (expected - written).min(chunk.len() as u64) as usize;
        if n > 0 {
            if let Err(e) = io.write_all(&chunk[..n]).await {
                do_abort();
                return Err(e.into());
            }
            written += n as u64;
        }
    }

    // Surplus data is never read.
    do_abort();

    if written < expected {
        Err(Error::LiteralLengthMismatch {
            expected,
            actual: written,
        })
    } else {
        Ok(())
    }
}
