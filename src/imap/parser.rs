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

//! Parsing of command payloads into attribute trees.
//!
//! This follows IMAP's basic lexical grammar only (atoms, numbers, quoted
//! strings, literals and parenthesised lists, plus the `NAME[...]<a.b>` form
//! used by FETCH). What the attributes mean is up to each command.

use std::borrow::Cow;
use std::fmt;
use std::str;

use nom::{
    bytes::complete::{tag, take_while1},
    character::complete::digit1,
    combinator::{map_res, opt},
    sequence::{delimited, pair, preceded},
    IResult,
};

use super::command::Command;

/// One element of a parsed command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Attribute {
    Atom(String),
    Number(u64),
    /// A quoted string or a literal.
    String(Vec<u8>),
    List(Vec<Attribute>),
    /// An atom immediately followed by a bracketed section and an optional
    /// `<start.length>` partial, such as `BODY.PEEK[1.MIME]<0.100>`.
    Section {
        name: String,
        section: Vec<Attribute>,
        partial: Option<(u64, u64)>,
    },
}

impl Attribute {
    /// The value of any leaf as text.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match *self {
            Attribute::Atom(ref s) => Some(Cow::Borrowed(s)),
            Attribute::Number(n) => Some(Cow::Owned(n.to_string())),
            Attribute::String(ref s) => Some(String::from_utf8_lossy(s)),
            Attribute::List(_) | Attribute::Section { .. } => None,
        }
    }

    /// Whether this is the atom `name`, ignoring case.
    pub fn is_atom(&self, name: &str) -> bool {
        matches!(*self, Attribute::Atom(ref s) if s.eq_ignore_ascii_case(name))
    }

    pub fn as_list(&self) -> Option<&[Attribute]> {
        match *self {
            Attribute::List(ref items) => Some(items),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<u64> {
        match *self {
            Attribute::Number(n) => Some(n),
            _ => None,
        }
    }
}

/// Formats the attribute roughly as the client wrote it, for use in error
/// messages. Strings are always shown quoted, with control characters
/// replaced by `?`.
impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Attribute::Atom(ref s) => write!(f, "{}", s),
            Attribute::Number(n) => write!(f, "{}", n),
            Attribute::String(ref s) => {
                write!(f, "\"")?;
                for c in String::from_utf8_lossy(s).chars() {
                    match c {
                        '"' | '\\' => write!(f, "\\{}", c)?,
                        c if c.is_control() => write!(f, "?")?,
                        c => write!(f, "{}", c)?,
                    }
                }
                write!(f, "\"")
            },
            Attribute::List(ref items) => {
                write!(f, "(")?;
                write_joined(f, items)?;
                write!(f, ")")
            },
            Attribute::Section {
                ref name,
                ref section,
                partial,
            } => {
                write!(f, "{}[", name)?;
                write_joined(f, section)?;
                write!(f, "]")?;
                if let Some((start, length)) = partial {
                    write!(f, "<{}.{}>", start, length)?;
                }
                Ok(())
            },
        }
    }
}

fn write_joined(f: &mut fmt::Formatter, items: &[Attribute]) -> fmt::Result {
    for (ix, item) in items.iter().enumerate() {
        if ix > 0 {
            write!(f, " ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedCommand {
    pub tag: String,
    pub verb: String,
    pub attributes: Vec<Attribute>,
}

/// Parse the payload of `command`.
///
/// On failure, returns a message suitable to send to the client.
pub fn parse_command(command: Command) -> Result<ParsedCommand, String> {
    let Command {
        tag,
        verb,
        payload,
        literals,
    } = command;

    let mut parser = Parser {
        input: &payload,
        literals: literals.into_iter(),
    };
    let attributes = parser.items(None)?;

    if parser.literals.next().is_some() {
        return Err("Unexpected literal".to_owned());
    }

    Ok(ParsedCommand {
        tag,
        verb,
        attributes,
    })
}

struct Parser<'a> {
    input: &'a [u8],
    literals: std::vec::IntoIter<Vec<u8>>,
}

impl Parser<'_> {
    /// Parse items until `close` or the end of input.
    fn items(&mut self, close: Option<u8>) -> Result<Vec<Attribute>, String> {
        let mut items = Vec::new();
        loop {
            while let [b' ', rest @ ..] = self.input {
                self.input = rest;
            }

            let Some(&next) = self.input.first() else {
                return match close {
                    None => Ok(items),
                    Some(c) => Err(format!("Missing '{}'", c as char)),
                };
            };

            if Some(next) == close {
                self.input = &self.input[1..];
                return Ok(items);
            }

            let item = match next {
                b'(' => {
                    self.input = &self.input[1..];
                    Attribute::List(self.items(Some(b')'))?)
                },
                b'"' => self.quoted()?,
                b'{' => self.literal()?,
                b')' | b']' | b'[' | b'<' | b'>' => {
                    return Err(format!("Unexpected '{}'", next as char))
                },
                0..=31 | 127 => {
                    return Err("Unexpected control character".to_owned())
                },
                _ => self.atom()?,
            };
            items.push(item);
        }
    }

    fn quoted(&mut self) -> Result<Attribute, String> {
        let mut out = Vec::new();
        let mut ix = 1;
        loop {
            match self.input.get(ix).copied() {
                None | Some(b'\r') | Some(b'\n') => {
                    return Err("Unterminated quoted string".to_owned())
                },
                Some(b'"') => break,
                Some(b'\\') => match self.input.get(ix + 1).copied() {
                    Some(c @ (b'"' | b'\\')) => {
                        out.push(c);
                        ix += 2;
                    },
                    _ => return Err("Bad escape in quoted string".to_owned()),
                },
                Some(c) => {
                    out.push(c);
                    ix += 1;
                },
            }
        }

        self.input = &self.input[ix + 1..];
        Ok(Attribute::String(out))
    }

    fn literal(&mut self) -> Result<Attribute, String> {
        let (rest, len) = literal_marker(self.input)
            .map_err(|_| "Malformed literal".to_owned())?;
        let data = self
            .literals
            .next()
            .ok_or_else(|| "Missing literal data".to_owned())?;
        if data.len() as u64 != len {
            return Err("Literal length mismatch".to_owned());
        }

        self.input = rest;
        Ok(Attribute::String(data))
    }

    fn atom(&mut self) -> Result<Attribute, String> {
        let (rest, name) = atom(self.input)
            .map_err(|_| "Expected atom".to_owned())?;
        self.input = rest;
        let name = String::from_utf8_lossy(name).into_owned();

        if let [b'[', rest @ ..] = self.input {
            self.input = rest;
            let section = self.items(Some(b']'))?;
            let (rest, partial) = opt(partial)(self.input)
                .map_err(|_| "Malformed partial".to_owned())?;
            self.input = rest;
            return Ok(Attribute::Section {
                name,
                section,
                partial,
            });
        }

        if name.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = name.parse::<u64>() {
                return Ok(Attribute::Number(n));
            }
        }

        Ok(Attribute::Atom(name))
    }
}

fn is_atom_char(b: u8) -> bool {
    !matches!(
        b,
        0..=b' ' | 127 | b'(' | b')' | b'"' | b'[' | b']' | b'{' | b'<'
    )
}

fn atom(i: &[u8]) -> IResult<&[u8], &[u8]> {
    take_while1(is_atom_char)(i)
}

fn number(i: &[u8]) -> IResult<&[u8], u64> {
    map_res(map_res(digit1, str::from_utf8), str::parse::<u64>)(i)
}

/// `{N}\r\n` or `{N+}\r\n`.
fn literal_marker(i: &[u8]) -> IResult<&[u8], u64> {
    let (i, len) = delimited(tag("{"), number, pair(opt(tag("+")), tag("}")))(i)?;
    let (i, _) = tag("\r\n")(i)?;
    Ok((i, len))
}

/// `<start.length>`
fn partial(i: &[u8]) -> IResult<&[u8], (u64, u64)> {
    delimited(
        tag("<"),
        pair(number, preceded(tag("."), number)),
        tag(">"),
    )(i)
}
