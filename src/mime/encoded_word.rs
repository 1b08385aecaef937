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

//! RFC 2047 encoded words and charset decoding.

use std::borrow::Cow;

use encoding_rs::Encoding;
use lazy_static::lazy_static;
use regex::Regex;

use super::quoted_printable::qp_decode;

lazy_static! {
    // Longer-than-75-character words are accepted since real agents produce
    // them.
    static ref ENCODED_WORD: Regex =
        Regex::new(r"=\?([^?\s]+)\?([bBqQ])\?([^?\s]*)\?=").unwrap();
}

/// Decode a single encoded word, which must be the entirety of `word`.
///
/// Returns `None` if `word` is not an encoded word or cannot be decoded.
pub fn ew_decode(word: &str) -> Option<String> {
    let captures = ENCODED_WORD.captures(word)?;
    let whole = captures.get(0)?;
    if whole.start() != 0 || whole.end() != word.len() {
        return None;
    }

    decode_captures(&captures)
}

fn decode_captures(captures: &regex::Captures<'_>) -> Option<String> {
    let charset = captures.get(1)?.as_str();
    let content = captures.get(3)?.as_str().as_bytes();
    let raw = match captures.get(2)?.as_str() {
        "q" | "Q" => {
            // _ stands for ASCII space regardless of charset
            let spaced = content
                .iter()
                .map(|&b| if b'_' == b { b' ' } else { b })
                .collect::<Vec<u8>>();
            qp_decode(&spaced)
        },
        _ => base64::decode(content).ok()?,
    };

    // RFC 2231 allows a language suffix on the charset
    let charset = charset.split('*').next().unwrap_or(charset);
    Some(decode_charset(charset, &raw)?.into_owned())
}

/// Decode every encoded word found in `text`.
///
/// Whitespace between two adjacent encoded words is removed; everything else
/// is passed through unchanged.
pub fn decode_words(text: &str) -> Cow<'_, str> {
    if !text.contains("=?") {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut last_end = 0;
    let mut last_was_word = false;
    for captures in ENCODED_WORD.captures_iter(text) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        let Some(decoded) = decode_captures(&captures) else {
            continue;
        };

        let between = &text[last_end..whole.start()];
        if !(last_was_word && between.trim().is_empty()) {
            out.push_str(between);
        }
        out.push_str(&decoded);
        last_end = whole.end();
        last_was_word = true;
    }
    out.push_str(&text[last_end..]);

    Cow::Owned(out)
}

/// Decode `content` from the named charset.
///
/// Returns `None` if the charset is unknown.
pub fn decode_charset<'a>(
    charset: &str,
    content: &'a [u8],
) -> Option<Cow<'a, str>> {
    let encoding = Encoding::for_label_no_replacement(charset.trim().as_bytes())?;
    Some(encoding.decode_with_bom_removal(content).0)
}

/// Decode `content` from the named charset, falling back to UTF-8 and then
/// Windows-1252 when the charset is unknown or absent.
pub fn decode_charset_lossy<'a>(
    charset: Option<&str>,
    content: &'a [u8],
) -> Cow<'a, str> {
    if let Some(decoded) = charset.and_then(|cs| decode_charset(cs, content)) {
        return decoded;
    }

    match std::str::from_utf8(content) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => encoding_rs::WINDOWS_1252.decode_without_bom_handling(content).0,
    }
}
