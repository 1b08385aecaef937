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

//! Parsing of MIME part headers into the structured map kept on each tree
//! node.
//!
//! Nothing here is strict. Real-world mail violates RFC 2822 and RFC 2045 in
//! every conceivable way, and a header we cannot make sense of must never
//! prevent the rest of the message from being served, so every parser falls
//! back to something reasonable instead of failing.

use std::collections::BTreeMap;

use nom::{
    bytes::complete::{take_till, take_while1},
    character::complete::{char, space0},
    sequence::{delimited, preceded, separated_pair},
    IResult,
};

use super::encoded_word::{decode_charset_lossy, decode_words};

/// A `value; name=param; ...` header such as `Content-Type`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StructuredValue {
    /// The main value, lower-cased and trimmed.
    pub value: String,
    /// Parameters keyed by lower-case name, with RFC 2231 continuations and
    /// charsets already folded and decoded.
    pub params: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentType {
    /// The primary type, e.g. `text`.
    pub kind: String,
    /// The subtype, e.g. `plain`.
    pub subtype: String,
    pub params: BTreeMap<String, String>,
    /// Whether the part had no usable `Content-Type` header and this is the
    /// default for its position.
    pub defaulted: bool,
}

impl ContentType {
    fn default_for(message_root: bool) -> Self {
        let (kind, subtype) = if message_root {
            ("text", "plain")
        } else {
            ("application", "octet-stream")
        };

        ContentType {
            kind: kind.to_owned(),
            subtype: subtype.to_owned(),
            params: BTreeMap::new(),
            defaulted: true,
        }
    }

    /// The `type/subtype` form.
    pub fn value(&self) -> String {
        format!("{}/{}", self.kind, self.subtype)
    }

    pub fn is(&self, kind: &str, subtype: &str) -> bool {
        self.kind == kind && self.subtype == subtype
    }

    pub fn is_multipart(&self) -> bool {
        "multipart" == self.kind
    }

    pub fn is_message_rfc822(&self) -> bool {
        self.is("message", "rfc822")
    }

    pub fn boundary(&self) -> Option<&str> {
        self.params
            .get("boundary")
            .map(String::as_str)
            .filter(|b| !b.is_empty())
    }

    pub fn charset(&self) -> Option<&str> {
        self.params.get("charset").map(String::as_str)
    }
}

/// A single mailbox or group from an address list header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Address {
    Mailbox(Mailbox),
    Group { name: String, members: Vec<Mailbox> },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Mailbox {
    /// The display name, still in its raw (possibly encoded-word) form.
    pub name: Option<String>,
    pub local: String,
    pub domain: Option<String>,
}

/// Headers whose values are address lists.
pub const ADDRESS_HEADERS: &[&str] =
    &["from", "sender", "reply-to", "to", "cc", "bcc"];

/// The parsed form of a node's header block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedHeader {
    pub content_type: ContentType,
    pub content_disposition: Option<StructuredValue>,
    /// Lower-cased and trimmed.
    pub content_transfer_encoding: Option<String>,
    pub content_id: Option<String>,
    pub content_description: Option<String>,
    pub content_language: Option<String>,
    pub content_location: Option<String>,
    /// Address list headers, keyed by lower-case name.
    pub addresses: BTreeMap<String, Vec<Address>>,
    /// Every header by lower-case name, in order of appearance, with the
    /// value unfolded and trimmed but otherwise raw.
    pub fields: BTreeMap<String, Vec<String>>,
}

impl ParsedHeader {
    /// Parse the raw header lines of a node.
    ///
    /// `message_root` selects the default content type when there is no
    /// usable `Content-Type` header.
    pub fn parse(lines: &[Vec<u8>], message_root: bool) -> Self {
        let mut parsed = ParsedHeader {
            content_type: ContentType::default_for(message_root),
            content_disposition: None,
            content_transfer_encoding: None,
            content_id: None,
            content_description: None,
            content_language: None,
            content_location: None,
            addresses: BTreeMap::new(),
            fields: BTreeMap::new(),
        };

        for (name, value) in unfold(lines) {
            let name = name.to_ascii_lowercase();
            match name.as_str() {
                "content-type" => {
                    if let Some(ct) = parse_content_type(&value) {
                        parsed.content_type = ct;
                    }
                },
                "content-disposition" => {
                    parsed.content_disposition =
                        Some(parse_structured(&value));
                },
                "content-transfer-encoding" => {
                    parsed.content_transfer_encoding =
                        Some(value.trim().to_ascii_lowercase());
                },
                "content-id" => parsed.content_id = Some(value.clone()),
                "content-description" => {
                    parsed.content_description = Some(value.clone())
                },
                "content-language" => {
                    parsed.content_language = Some(value.clone())
                },
                "content-location" => {
                    parsed.content_location = Some(value.clone())
                },
                _ => {},
            }

            if ADDRESS_HEADERS.contains(&name.as_str()) {
                parsed
                    .addresses
                    .entry(name.clone())
                    .or_default()
                    .extend(parse_address_list(&value));
            }

            parsed.fields.entry(name).or_default().push(value);
        }

        parsed
    }

    /// The first value of the named header, if any.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.fields
            .get(&name.to_ascii_lowercase())
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    pub fn addresses(&self, name: &str) -> &[Address] {
        self.addresses
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The transfer encoding, defaulting to `7bit`.
    pub fn transfer_encoding(&self) -> &str {
        self.content_transfer_encoding.as_deref().unwrap_or("7bit")
    }

    pub fn disposition(&self) -> Option<&str> {
        self.content_disposition
            .as_ref()
            .map(|d| d.value.as_str())
            .filter(|d| !d.is_empty())
    }
}

/// Unfold raw header lines into `(name, value)` pairs.
///
/// Continuation lines (starting with whitespace) are appended to the previous
/// header. Lines which are neither headers nor continuations are skipped.
pub fn unfold(lines: &[Vec<u8>]) -> Vec<(String, String)> {
    let mut headers = Vec::<(String, String)>::new();
    for line in lines {
        let line = String::from_utf8_lossy(line);
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(last) = headers.last_mut() {
                last.1.push_str(&line);
            }
            continue;
        }

        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim_end();
            if !name.is_empty() && !name.contains(char::is_whitespace) {
                headers.push((name.to_owned(), value.to_owned()));
            }
        }
    }

    for header in &mut headers {
        header.1 = header.1.trim().to_owned();
    }
    headers
}

/// Header name of a raw header line, if it has one.
pub fn line_header_name(line: &[u8]) -> Option<&[u8]> {
    let colon = memchr::memchr(b':', line)?;
    let name = &line[..colon];
    let name = match name.iter().rposition(|b| !b.is_ascii_whitespace()) {
        Some(end) => &name[..=end],
        None => return None,
    };
    if name.iter().any(|b| b.is_ascii_whitespace()) {
        None
    } else {
        Some(name)
    }
}

fn parse_content_type(value: &str) -> Option<ContentType> {
    let structured = parse_structured(value);
    let (kind, subtype) = structured.value.split_once('/')?;
    let (kind, subtype) = (kind.trim(), subtype.trim());
    if kind.is_empty() || subtype.is_empty() {
        return None;
    }

    Some(ContentType {
        kind: kind.to_owned(),
        subtype: subtype.to_owned(),
        params: structured.params,
        defaulted: false,
    })
}

// RFC 2045 token, plus `*` which RFC 2231 uses in parameter names.
fn token(i: &str) -> IResult<&str, &str> {
    take_while1(|c: char| {
        !c.is_ascii_whitespace()
            && !c.is_ascii_control()
            && !"()<>@,;:\\\"/[]?=".contains(c)
    })(i)
}

fn quoted_string(i: &str) -> IResult<&str, String> {
    let (mut rest, _) = char('"')(i)?;
    let mut out = String::new();
    loop {
        let mut chars = rest.chars();
        match chars.next() {
            None => return Ok(("", out)),
            Some('"') => return Ok((chars.as_str(), out)),
            Some('\\') => {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            },
            Some(c) => out.push(c),
        }
        rest = chars.as_str();
    }
}

fn param_value(i: &str) -> IResult<&str, String> {
    if i.starts_with('"') {
        quoted_string(i)
    } else {
        let (rest, raw) = take_till(|c| ';' == c)(i)?;
        Ok((rest, raw.trim().to_owned()))
    }
}

fn param(i: &str) -> IResult<&str, (&str, String)> {
    preceded(
        space0,
        separated_pair(token, delimited(space0, char('='), space0), param_value),
    )(i)
}

/// Parse a structured header value with parameters.
pub fn parse_structured(value: &str) -> StructuredValue {
    let (main, mut rest) = match value.find(';') {
        Some(semi) => (&value[..semi], &value[semi..]),
        None => (value, ""),
    };

    let mut raw_params = Vec::<(String, String)>::new();
    while let Some(after_semi) = rest.strip_prefix(';') {
        match param(after_semi) {
            Ok((after, (name, value))) => {
                raw_params.push((name.to_ascii_lowercase(), value));
                rest = after.trim_start();
                if !rest.starts_with(';') {
                    // Garbage after the value; resynchronise on the next
                    // separator.
                    rest = rest.find(';').map(|ix| &rest[ix..]).unwrap_or("");
                }
            },
            Err(_) => {
                rest = after_semi
                    .find(';')
                    .map(|ix| &after_semi[ix..])
                    .unwrap_or("");
            },
        }
    }

    StructuredValue {
        value: main.trim().to_ascii_lowercase(),
        params: fold_rfc2231(raw_params),
    }
}

/// Combine RFC 2231 continuations (`name*0`, `name*1*`, ...) and decode
/// extended values (`name*=charset'lang'%xx`).
///
/// Plain values additionally have RFC 2047 encoded words decoded, since many
/// agents encode file names that way.
fn fold_rfc2231(raw: Vec<(String, String)>) -> BTreeMap<String, String> {
    struct Segment {
        index: u32,
        extended: bool,
        value: String,
    }

    let mut plain = BTreeMap::<String, String>::new();
    let mut segmented = BTreeMap::<String, Vec<Segment>>::new();

    for (name, value) in raw {
        let (base, extended) = match name.strip_suffix('*') {
            Some(base) => (base, true),
            None => (name.as_str(), false),
        };

        match base.split_once('*') {
            Some((base, index)) => {
                if let Ok(index) = index.parse::<u32>() {
                    segmented.entry(base.to_owned()).or_default().push(
                        Segment {
                            index,
                            extended,
                            value,
                        },
                    );
                }
            },
            None if extended => {
                segmented.entry(base.to_owned()).or_default().push(Segment {
                    index: 0,
                    extended: true,
                    value,
                });
            },
            None if "boundary" == base => {
                plain.insert(base.to_owned(), value);
            },
            None => {
                plain.insert(base.to_owned(), decode_words(&value).into_owned());
            },
        }
    }

    for (name, mut segments) in segmented {
        segments.sort_by_key(|s| s.index);
        let mut charset = None::<String>;
        let mut bytes = Vec::<u8>::new();
        for (ix, segment) in segments.iter().enumerate() {
            if !segment.extended {
                bytes.extend_from_slice(segment.value.as_bytes());
                continue;
            }

            let mut encoded = segment.value.as_str();
            if 0 == ix {
                let mut parts = encoded.splitn(3, '\'');
                if let (Some(cs), Some(_lang), Some(data)) =
                    (parts.next(), parts.next(), parts.next())
                {
                    if !cs.is_empty() {
                        charset = Some(cs.to_owned());
                    }
                    encoded = data;
                }
            }
            bytes.extend(percent_decode(encoded));
        }

        let value = decode_charset_lossy(charset.as_deref(), &bytes);
        // A complete extended value takes precedence over a plain fallback
        plain.insert(name, value.into_owned());
    }

    plain
}

fn percent_decode(s: &str) -> Vec<u8> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut ix = 0;
    while ix < bytes.len() {
        if b'%' == bytes[ix] && ix + 2 < bytes.len() {
            if let Some(b) = std::str::from_utf8(&bytes[ix + 1..ix + 3])
                .ok()
                .and_then(|h| u8::from_str_radix(h, 16).ok())
            {
                out.push(b);
                ix += 3;
                continue;
            }
        }
        out.push(bytes[ix]);
        ix += 1;
    }
    out
}

/// Parse an RFC 2822 address list.
///
/// Comments are dropped except that a trailing comment on a bare address is
/// used as the display name, matching old `user@host (Full Name)` usage.
pub fn parse_address_list(value: &str) -> Vec<Address> {
    let mut result = Vec::new();
    let mut group: Option<(String, Vec<Mailbox>)> = None;
    let mut current = String::new();
    let mut in_quote = false;
    let mut escaped = false;
    let mut angle = 0u32;
    let mut comment = 0u32;

    fn finish(
        current: &mut String,
        group: &mut Option<(String, Vec<Mailbox>)>,
        result: &mut Vec<Address>,
    ) {
        let text = std::mem::take(current);
        if let Some(mailbox) = parse_mailbox(&text) {
            match group {
                Some((_, members)) => members.push(mailbox),
                None => result.push(Address::Mailbox(mailbox)),
            }
        }
    }

    for c in value.chars() {
        if escaped {
            escaped = false;
            current.push(c);
            continue;
        }

        match c {
            '\\' if in_quote || comment > 0 => {
                escaped = true;
                current.push(c);
            },
            '"' if 0 == comment => {
                in_quote = !in_quote;
                current.push(c);
            },
            '(' if !in_quote => {
                comment += 1;
                current.push(c);
            },
            ')' if !in_quote && comment > 0 => {
                comment -= 1;
                current.push(c);
            },
            '<' if !in_quote && 0 == comment => {
                angle += 1;
                current.push(c);
            },
            '>' if !in_quote && 0 == comment && angle > 0 => {
                angle -= 1;
                current.push(c);
            },
            ',' if !in_quote && 0 == comment && 0 == angle => {
                finish(&mut current, &mut group, &mut result);
            },
            ':' if !in_quote
                && 0 == comment
                && 0 == angle
                && group.is_none() =>
            {
                let name = unquote(strip_comments(&current).trim());
                current.clear();
                group = Some((name, Vec::new()));
            },
            ';' if !in_quote && 0 == comment && 0 == angle => {
                finish(&mut current, &mut group, &mut result);
                if let Some((name, members)) = group.take() {
                    result.push(Address::Group { name, members });
                }
            },
            c => current.push(c),
        }
    }

    finish(&mut current, &mut group, &mut result);
    if let Some((name, members)) = group.take() {
        result.push(Address::Group { name, members });
    }

    result
}

fn parse_mailbox(text: &str) -> Option<Mailbox> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let (name, addr) = match (text.find('<'), text.rfind('>')) {
        (Some(open), Some(close)) if open < close => {
            let name = unquote(strip_comments(&text[..open]).trim());
            (
                Some(name).filter(|n| !n.is_empty()),
                strip_comments(&text[open + 1..close]),
            )
        },
        _ => {
            let comment_name = text
                .find('(')
                .zip(text.rfind(')'))
                .filter(|&(open, close)| open < close)
                .map(|(open, close)| text[open + 1..close].trim().to_owned())
                .filter(|n| !n.is_empty());
            (comment_name, strip_comments(text))
        },
    };

    // Strip any source route
    let addr = addr.trim();
    let addr = match addr.rfind(':') {
        Some(colon) if addr.starts_with('@') => &addr[colon + 1..],
        _ => addr,
    };

    let (local, domain) = match addr.rfind('@') {
        Some(at) => (&addr[..at], Some(addr[at + 1..].trim().to_owned())),
        None => (addr, None),
    };
    let local = unquote(local.trim());
    if local.is_empty() && name.is_none() {
        return None;
    }

    Some(Mailbox {
        name,
        local,
        domain: domain.filter(|d| !d.is_empty()),
    })
}

fn strip_comments(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut depth = 0u32;
    let mut in_quote = false;
    for c in s.chars() {
        match c {
            '"' if 0 == depth => {
                in_quote = !in_quote;
                out.push(c);
            },
            '(' if !in_quote => depth += 1,
            ')' if !in_quote && depth > 0 => depth -= 1,
            c if 0 == depth => out.push(c),
            _ => {},
        }
    }
    out
}

fn unquote(s: &str) -> String {
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        let mut out = String::with_capacity(s.len());
        let mut escaped = false;
        for c in s[1..s.len() - 1].chars() {
            if escaped || '\\' != c {
                out.push(c);
                escaped = false;
            } else {
                escaped = true;
            }
        }
        out
    } else {
        s.to_owned()
    }
}
