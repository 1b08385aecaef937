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

//! The interface through which rebuilt messages read attachment bodies that
//! were extracted to external storage.

use std::any::Any;
use std::io;
use std::ops::Range;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::support::error::Error;

/// An opaque reference to a stored attachment, produced by
/// `get_attachment` and handed back to `create_read_stream`.
pub type AttachmentHandle = Arc<dyn Any + Send + Sync>;

pub type ByteStream = BoxStream<'static, io::Result<Vec<u8>>>;

#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// Look up the attachment with the given id, returning `None` if it
    /// does not exist.
    async fn get_attachment(
        &self,
        attachment_id: &str,
    ) -> Result<Option<AttachmentHandle>, Error>;

    /// Open a stream over the attachment's stored bytes, restricted to
    /// `range` if given.
    async fn create_read_stream(
        &self,
        attachment_id: &str,
        handle: AttachmentHandle,
        range: Option<Range<u64>>,
    ) -> Result<ByteStream, Error>;
}
