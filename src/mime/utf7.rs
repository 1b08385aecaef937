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

//! IMAP's "modified UTF-7" mailbox name encoding (RFC 3501 §5.1.3).
//!
//! Printable ASCII other than `&` stands for itself; `&-` stands for `&`;
//! anything else is UTF-16BE encoded with a base64 variant using `,` in place
//! of `/`, wrapped in `&` ... `-`.

use std::borrow::Cow;

/// Decode a mailbox name from modified UTF-7.
///
/// Decoding is permissive: malformed shift sequences are passed through
/// verbatim rather than rejected, since the name may simply not have been
/// encoded by the client.
pub fn decode(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let Some(dash) = after.find('-') else {
            out.push_str(&rest[amp..]);
            return Cow::Owned(out);
        };

        let encoded = &after[..dash];
        if encoded.is_empty() {
            out.push('&');
        } else if let Some(decoded) = decode_group(encoded) {
            out.push_str(&decoded);
        } else {
            out.push_str(&rest[amp..amp + 1 + dash + 1]);
        }
        rest = &after[dash + 1..];
    }
    out.push_str(rest);

    Cow::Owned(out)
}

fn decode_group(encoded: &str) -> Option<String> {
    let bytes = base64::decode_config(encoded, base64::IMAP_MUTF7).ok()?;
    if bytes.len() % 2 != 0 {
        return None;
    }

    let units = bytes
        .chunks(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect::<Vec<_>>();
    String::from_utf16(&units).ok()
}

/// Encode a mailbox name into modified UTF-7.
pub fn encode(s: &str) -> Cow<'_, str> {
    if s.chars().all(|c| is_direct(c) && c != '&') {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len() + 8);
    let mut pending = Vec::<u16>::new();
    for c in s.chars() {
        if is_direct(c) {
            flush_group(&mut out, &mut pending);
            if '&' == c {
                out.push_str("&-");
            } else {
                out.push(c);
            }
        } else {
            let mut buf = [0u16; 2];
            pending.extend_from_slice(c.encode_utf16(&mut buf));
        }
    }
    flush_group(&mut out, &mut pending);

    Cow::Owned(out)
}

fn flush_group(out: &mut String, pending: &mut Vec<u16>) {
    if pending.is_empty() {
        return;
    }

    let bytes = pending
        .drain(..)
        .flat_map(|unit| unit.to_be_bytes())
        .collect::<Vec<u8>>();
    out.push('&');
    out.push_str(&base64::encode_config(&bytes, base64::IMAP_MUTF7));
    out.push('-');
}

fn is_direct(c: char) -> bool {
    (' '..='~').contains(&c)
}
