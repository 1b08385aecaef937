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

//! The command object the request reader accumulates lines into.

use nom::{
    bytes::complete::{tag, take_while1},
    combinator::opt,
    sequence::preceded,
    IResult,
};

use super::response::Response;

/// One logical command as received from the client.
///
/// `payload` holds everything after the verb, with continuation lines
/// joined by CRLF. Each literal appears in `payload` only as its `{N}`
/// marker at the end of a line; the data itself is in `literals`, in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Command {
    pub tag: String,
    /// The upper-cased verb. `UID` commands include their sub-command, e.g.
    /// `UID FETCH`.
    pub verb: String,
    pub payload: Vec<u8>,
    pub literals: Vec<Vec<u8>>,
}

impl Command {
    /// Start a command from its first line.
    ///
    /// On failure, returns the `BAD` response to send.
    pub fn start(line: &[u8]) -> Result<Self, Response> {
        let (rest, tag) = match command_tag(line) {
            Ok(r) => r,
            Err(_) => return Err(Response::bad(None, "Missing command tag")),
        };
        let tag = String::from_utf8_lossy(tag).into_owned();

        let (rest, verb) = match command_verb(rest) {
            Ok(r) => r,
            Err(_) => {
                return Err(Response::bad(Some(&tag), "Missing command name"))
            },
        };

        let payload = match rest {
            [] => &[][..],
            [b' ', payload @ ..] => payload,
            _ => {
                return Err(Response::bad(Some(&tag), "Invalid command name"))
            },
        };

        Ok(Command {
            tag,
            verb,
            payload: payload.to_vec(),
            literals: Vec::new(),
        })
    }

    /// Add a line which continues the command after a literal.
    pub fn push_line(&mut self, line: &[u8]) {
        self.payload.extend_from_slice(b"\r\n");
        self.payload.extend_from_slice(line);
    }

    pub fn push_literal(&mut self, data: Vec<u8>) {
        self.literals.push(data);
    }

    /// The total size of all literals received so far.
    pub fn literal_bytes(&self) -> u64 {
        self.literals.iter().map(|l| l.len() as u64).sum()
    }
}

/// Try to find the tag of a line too malformed or long to process.
pub fn recover_tag(line: &[u8]) -> Option<String> {
    command_tag(line)
        .ok()
        .filter(|(rest, _)| rest.starts_with(b" "))
        .map(|(_, tag)| String::from_utf8_lossy(tag).into_owned())
}

fn is_tag_char(b: u8) -> bool {
    !matches!(
        b,
        0..=b' ' | 127..=255 | b'(' | b')' | b'{' | b'%' | b'*' | b'"'
            | b'\\' | b'+'
    )
}

fn command_tag(i: &[u8]) -> IResult<&[u8], &[u8]> {
    take_while1(is_tag_char)(i)
}

fn command_verb(i: &[u8]) -> IResult<&[u8], String> {
    let (i, verb) = preceded(tag(" "), take_while1(is_verb_char))(i)?;
    let mut verb = String::from_utf8_lossy(verb).to_ascii_uppercase();

    if "UID" == verb {
        let (i, sub) = opt(preceded(tag(" "), take_while1(is_verb_char)))(i)?;
        if let Some(sub) = sub {
            verb.push(' ');
            verb.push_str(&String::from_utf8_lossy(sub).to_ascii_uppercase());
        }
        return Ok((i, verb));
    }

    Ok((i, verb))
}

fn is_verb_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b'-' == b
}
