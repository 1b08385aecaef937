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

//! Utilities for *writing* values under IMAP's "lexical rules".
//!
//! This is write-only since IMAP's lexical syntax is not separable from its
//! grammar.
//!
//! The code here is primarily responsible for two things:
//!
//! - Deciding which form to use to encode certain strings (i.e. atom, quoted
//!   string, or literal).
//!
//! - Repairing non-ASCII text where the protocol doesn't allow it.
//!
//! # Encoding Decisions
//!
//! We're generally pretty conservative here.
//!
//! Given the choice between encoding a string as an atom-like value or some
//! other form, we only use atom if all characters are in the set
//! `a-zA-Z0-9?=+/_.-` (this set is specifically chosen to also include encoded
//! words) and the string is not "NIL".
//!
//! Given the choice between encoding a string as a quoted string or a literal,
//! we only choose the quoted string if it only contains characters other than
//! controls, backslash, double-quote and non-ASCII characters, and is less
//! than 100 bytes long.
//!
//! # Repair strategies
//!
//! 1. Decoded header text (subjects, display names) containing Unicode is
//!    re-encoded into RFC 2047 encoded words.
//!
//! 2. Mailbox names use modified UTF-7 (RFC 3501 §5.1.3).
//!
//! 3. Raw message content is never altered. 8-bit headers and binary bodies
//!    are sent as-is inside literals.

use std::borrow::Cow;
use std::io::{self, Write};

use chrono::prelude::*;

use super::literal_source::{LiteralData, LiteralSource};
use crate::mime::utf7;

#[derive(Clone, Copy, Debug)]
pub struct LexWriter<W> {
    writer: W,
}

impl<W: LexOutput> LexWriter<W> {
    pub fn new(writer: W) -> Self {
        LexWriter { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    pub fn verbatim(&mut self, s: &str) -> io::Result<()> {
        self.writer.write_all(s.as_bytes())?;
        Ok(())
    }

    pub fn nil(&mut self) -> io::Result<()> {
        self.verbatim("NIL")
    }

    pub fn censored_string(&mut self, s: &str) -> io::Result<()> {
        self.string(&censor(s))
    }

    pub fn encoded_string(&mut self, s: &str) -> io::Result<()> {
        self.string(&encode(s))
    }

    pub fn mailbox(&mut self, name: &str) -> io::Result<()> {
        let wire = utf7::encode(name);
        if is_conservative_atom(&wire) {
            // Nothing to encode if it can just be an atom
            write!(self.writer, "{}", wire)
        } else {
            self.string(&wire)
        }
    }

    pub fn literal(&mut self, source: LiteralSource) -> io::Result<()> {
        write!(self.writer, "{{{}}}\r\n", source.len)?;
        self.writer.splice(source)
    }

    pub fn datetime(
        &mut self,
        datetime: &DateTime<FixedOffset>,
    ) -> io::Result<()> {
        write!(
            self.writer,
            "\"{}\"",
            datetime.format("%_d-%b-%Y %H:%M:%S %z")
        )
    }

    pub fn num(&mut self, value: u64) -> io::Result<()> {
        write!(self.writer, "{}", value)
    }

    pub fn astring(&mut self, s: &str) -> io::Result<()> {
        if is_conservative_atom(s) {
            write!(self.writer, "{}", s)?;
        } else {
            self.string(s)?;
        }

        Ok(())
    }

    /// Write `s` as a quoted string if it is short and printable, escaping
    /// `"` and `\`, or as a literal otherwise.
    pub fn string(&mut self, s: &str) -> io::Result<()> {
        if is_quotable(s) {
            write!(self.writer, "\"")?;
            for c in s.chars() {
                if '"' == c || '\\' == c {
                    write!(self.writer, "\\")?;
                }
                write!(self.writer, "{}", c)?;
            }
            write!(self.writer, "\"")?;
        } else {
            self.literal(LiteralSource::of_data(s.as_bytes()))?;
        }

        Ok(())
    }
}

fn censor(s: &str) -> Cow<'_, str> {
    if s.is_ascii() {
        Cow::Borrowed(s)
    } else {
        Cow::Owned(s.replace(|ch| ch > '\u{7f}', "X"))
    }
}

fn encode(s: &str) -> Cow<'_, str> {
    if s.is_ascii() {
        return Cow::Borrowed(s);
    }

    let mut total_accum = String::new();
    let mut part_accum = String::new();
    let mut first = true;
    // Copy whole characters one at a time, breaking into separate EWs when
    // they start getting too long.
    //
    // We're not allowed to split multi-byte characters, so this more complex
    // algorithm (as opposed to calling s.as_bytes.windows(40)) is required.
    for c in s.chars() {
        part_accum.push(c);

        // Max length of encoded word is 76.
        // =?utf-8?b??= is 12 characters, giving us space for 64 bytes after
        // encoding. That comes out to 48 bytes raw. UTF-8 can be up to 4
        // bytes/char, so we could set the cut-off at 45, but to be
        // conservative, we break at anything over 40.
        if part_accum.len() > 40 {
            encode_part(&mut total_accum, &part_accum, first);
            part_accum.clear();
            first = false;
        }
    }

    encode_part(&mut total_accum, &part_accum, first);
    Cow::Owned(total_accum)
}

fn encode_part(dst: &mut String, src: &str, first: bool) {
    if src.is_empty() {
        return;
    }

    if !first {
        dst.push(' ');
    }

    dst.push_str("=?utf-8?b?");
    dst.push_str(&base64::encode_config(src, base64::STANDARD_NO_PAD));
    dst.push_str("?=");
}

fn is_conservative_atom(s: &str) -> bool {
    !"nil".eq_ignore_ascii_case(s)
        && !s.is_empty()
        && s.as_bytes().iter().copied().all(|b| {
            matches!(
            b,
            b'a'..=b'z'
            | b'A'..=b'Z'
            | b'0'..=b'9'
            | b'='
            | b'?'
            | b'/'
            | b'+'
            | b'_'
            | b'.'
                | b'-')
        })
}

fn is_quotable(s: &str) -> bool {
    s.len() < 100
        && s.as_bytes().iter().copied().all(|b| {
            !matches!(b, 0..=31 | 127..=255)
        })
}

pub trait LexOutput: Write {
    /// Splice `data` into the stream at the current position.
    ///
    /// `data` is potentially very large. In async contexts, it is not read
    /// within this call, but is stored with the current position so that it
    /// can be written when needed.
    fn splice(&mut self, data: LiteralSource) -> io::Result<()>;
}

/// Synchronous output only accepts buffered literals.
impl LexOutput for Vec<u8> {
    fn splice(&mut self, data: LiteralSource) -> io::Result<()> {
        match data.data {
            LiteralData::Buffer(buf) => {
                self.extend_from_slice(&buf);
                Ok(())
            },
            LiteralData::Stream { .. } => {
                data.abort();
                Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "streamed literal in synchronous output",
                ))
            },
        }
    }
}
