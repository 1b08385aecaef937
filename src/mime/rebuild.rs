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

//! Streaming reconstruction of a message, or a window of it, from its tree
//! and its externally stored attachments.

use std::ops::Range;
use std::sync::Arc;

use futures::future;
use futures::prelude::*;
use futures::stream::{self, AbortHandle, BoxStream};

use super::attachments::AttachmentStore;
use super::length::RebuildOptions;
use super::tree::{MimeTree, NodeId};
use super::walk::{walk, Sink};
use crate::support::error::Error;

/// A rebuild in progress.
///
/// `stream` produces exactly `len` bytes unless an attachment read fails or
/// `abort` is triggered, in which case it errors or ends early.
pub struct RebuildStream {
    pub stream: BoxStream<'static, Result<Vec<u8>, Error>>,
    pub abort: AbortHandle,
    pub len: u64,
}

impl std::fmt::Debug for RebuildStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RebuildStream")
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

impl RebuildStream {
    /// Drain the whole stream into memory.
    pub async fn into_bytes(self) -> Result<Vec<u8>, Error> {
        let mut out = Vec::with_capacity(self.len as usize);
        let mut stream = self.stream;
        while let Some(chunk) = stream.next().await {
            out.extend_from_slice(&chunk?);
        }
        Ok(out)
    }
}

#[derive(Debug)]
enum Segment {
    Data(Vec<u8>),
    External {
        attachment_id: String,
        range: Range<u64>,
    },
}

impl Segment {
    fn len(&self) -> u64 {
        match *self {
            Segment::Data(ref data) => data.len() as u64,
            Segment::External { ref range, .. } => range.end - range.start,
        }
    }
}

#[derive(Default)]
struct SegmentSink(Vec<Segment>);

impl Sink for SegmentSink {
    fn data(&mut self, data: &[u8]) {
        if let Some(Segment::Data(ref mut last)) = self.0.last_mut() {
            last.extend_from_slice(data);
        } else {
            self.0.push(Segment::Data(data.to_vec()));
        }
    }

    fn external(&mut self, attachment_id: &str, len: u64) {
        self.0.push(Segment::External {
            attachment_id: attachment_id.to_owned(),
            range: 0..len,
        });
    }
}

/// Rebuild the subtree at `node`.
///
/// `store` is required if the selected window touches any extracted
/// attachment; if it is absent the stream fails with
/// `MissingAttachmentStore` when it reaches that point.
pub fn rebuild(
    tree: &MimeTree,
    node: NodeId,
    options: &RebuildOptions,
    store: Option<Arc<dyn AttachmentStore>>,
) -> RebuildStream {
    let mut sink = SegmentSink::default();
    walk(tree, node, options.text_only, &mut sink);

    let total = sink.0.iter().map(Segment::len).sum::<u64>();
    let (start, end) = options.window(total);
    let segments = window(sink.0, start, end);

    let stream = stream::iter(segments).flat_map(move |segment| {
        match segment {
            Segment::Data(data) => {
                stream::once(future::ok::<_, Error>(data)).boxed()
            },
            Segment::External {
                attachment_id,
                range,
            } => {
                stream::once(read_external(store.clone(), attachment_id, range))
                    .try_flatten()
                    .boxed()
            },
        }
    });

    let (stream, abort) = stream::abortable(stream);
    RebuildStream {
        stream: stream.boxed(),
        abort,
        len: end - start,
    }
}

async fn read_external(
    store: Option<Arc<dyn AttachmentStore>>,
    attachment_id: String,
    range: Range<u64>,
) -> Result<BoxStream<'static, Result<Vec<u8>, Error>>, Error> {
    let store = store
        .ok_or_else(|| Error::MissingAttachmentStore(attachment_id.clone()))?;
    let handle = store
        .get_attachment(&attachment_id)
        .await?
        .ok_or_else(|| Error::AttachmentNotFound(attachment_id.clone()))?;
    let stream = store
        .create_read_stream(&attachment_id, handle, Some(range))
        .await?;
    Ok(stream.map_err(Error::from).boxed())
}

/// Restrict `segments`, which cover `[0, total)`, to `[start, end)`.
fn window(segments: Vec<Segment>, start: u64, end: u64) -> Vec<Segment> {
    let mut out = Vec::new();
    let mut offset = 0u64;
    for segment in segments {
        let len = segment.len();
        let lo = start.max(offset);
        let hi = end.min(offset + len);
        if lo < hi {
            let (lo, hi) = (lo - offset, hi - offset);
            out.push(match segment {
                Segment::Data(data) => {
                    Segment::Data(data[lo as usize..hi as usize].to_vec())
                },
                Segment::External {
                    attachment_id,
                    range,
                } => Segment::External {
                    attachment_id,
                    range: range.start + lo..range.start + hi,
                },
            });
        }
        offset += len;
    }
    out
}
