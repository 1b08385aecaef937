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

/// Decodes quoted-printable content (RFC 2045 §6.7).
///
/// Soft line breaks (`=` at end of line, with either line ending) are
/// removed. Invalid escapes are passed through untransformed, as is any
/// 8-bit data, so this never fails.
pub fn qp_decode(s: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    let mut ix = 0;
    while ix < s.len() {
        let b = s[ix];
        if b'=' != b {
            out.push(b);
            ix += 1;
            continue;
        }

        let rest = &s[ix + 1..];
        if rest.starts_with(b"\r\n") {
            ix += 3;
        } else if rest.starts_with(b"\n") {
            ix += 2;
        } else if let Some(decoded) =
            rest.get(..2).and_then(|hex| hex_byte(hex[0], hex[1]))
        {
            out.push(decoded);
            ix += 3;
        } else {
            out.push(b'=');
            ix += 1;
        }
    }

    out
}

fn hex_byte(hi: u8, lo: u8) -> Option<u8> {
    fn nybble(b: u8) -> Option<u8> {
        match b {
            b'0'..=b'9' => Some(b - b'0'),
            b'a'..=b'f' => Some(b - b'a' + 10),
            b'A'..=b'F' => Some(b - b'A' + 10),
            _ => None,
        }
    }

    Some(nybble(hi)? << 4 | nybble(lo)?)
}
