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

use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Message references attachment {0} but no attachment store is configured")]
    MissingAttachmentStore(String),
    #[error("Attachment {0} not found")]
    AttachmentNotFound(String),
    #[error("Literal produced {actual} bytes but {expected} were declared")]
    LiteralLengthMismatch { expected: u64, actual: u64 },
    #[error("No such MIME section")]
    NoSuchSection,
    #[error("No such user")]
    NoSuchUser,
    #[error("No such mailbox")]
    NoSuchMailbox,
    #[error("Service failure: {0}")]
    ServiceFailure(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Ssl(#[from] openssl::error::ErrorStack),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Io(e) => e,
            e => io::Error::new(io::ErrorKind::Other, e),
        }
    }
}
