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

//! The model of responses sent to the client.
//!
//! Handlers build `Response` values; the compiler turns them into wire text.
//! Anything whose size is not known to be small, such as message content,
//! travels as a `Value::Literal` so that it can be streamed.

use std::borrow::Cow;
use std::fmt;
use std::io;

use chrono::prelude::*;
use lazy_static::lazy_static;
use regex::Regex;

use super::lex::{LexOutput, LexWriter};
use super::literal_source::LiteralSource;
use crate::mime::fetch::bodystructure::BodyStructure;
use crate::mime::fetch::envelope::{Envelope, EnvelopeAddress};

#[derive(Debug, PartialEq)]
pub enum Value {
    Nil,
    /// Written exactly as given. Also used for flags and fetch item names.
    Atom(String),
    Number(u64),
    /// A string, written as a quoted string or a literal as needed.
    String(String),
    /// Human-readable text which may be re-encoded into encoded words.
    Text(String),
    /// A mailbox name, in UTF-8.
    Mailbox(String),
    DateTime(DateTime<FixedOffset>),
    List(Vec<Value>),
    /// Values written back to back with no separator, as the parts of a
    /// multipart body structure are.
    Adjacent(Vec<Value>),
    Literal(LiteralSource),
}

impl Value {
    pub fn atom(s: impl Into<String>) -> Self {
        Value::Atom(s.into())
    }

    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn nstring(s: Option<impl Into<String>>) -> Self {
        s.map_or(Value::Nil, |s| Value::String(s.into()))
    }

    pub fn ntext(s: Option<impl Into<String>>) -> Self {
        s.map_or(Value::Nil, |s| Value::Text(s.into()))
    }

    pub fn atoms<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Value::List(items.into_iter().map(|s| Value::Atom(s.into())).collect())
    }

    /// Whether writing this value requires splicing in a literal.
    pub fn has_literal(&self) -> bool {
        match *self {
            Value::Literal(_) => true,
            Value::List(ref items) | Value::Adjacent(ref items) => {
                items.iter().any(Value::has_literal)
            },
            _ => false,
        }
    }

    /// Abort any streams held by this value.
    pub fn abort(&self) {
        match *self {
            Value::Literal(ref lit) => lit.abort(),
            Value::List(ref items) | Value::Adjacent(ref items) => {
                items.iter().for_each(Value::abort)
            },
            _ => (),
        }
    }

    pub fn write_to(
        self,
        w: &mut LexWriter<impl LexOutput>,
    ) -> io::Result<()> {
        match self {
            Value::Nil => w.nil(),
            Value::Atom(s) => w.verbatim(&s),
            Value::Number(n) => w.num(n),
            Value::String(s) => w.string(&s),
            Value::Text(s) => w.encoded_string(&s),
            Value::Mailbox(s) => w.mailbox(&s),
            Value::DateTime(dt) => w.datetime(&dt),
            Value::Literal(lit) => w.literal(lit),
            Value::List(items) => {
                w.verbatim("(")?;
                write_spaced(w, items)?;
                w.verbatim(")")
            },
            Value::Adjacent(items) => {
                for item in items {
                    item.write_to(w)?;
                }
                Ok(())
            },
        }
    }

    /// The `ENVELOPE` form of `envelope`.
    pub fn envelope(envelope: &Envelope) -> Self {
        fn addresses(addrs: &[EnvelopeAddress]) -> Value {
            if addrs.is_empty() {
                return Value::Nil;
            }

            Value::List(
                addrs
                    .iter()
                    .map(|a| {
                        Value::List(vec![
                            Value::ntext(a.name.clone()),
                            // Source route, obsolete
                            Value::Nil,
                            Value::nstring(a.local.clone()),
                            Value::nstring(a.domain.clone()),
                        ])
                    })
                    .collect(),
            )
        }

        Value::List(vec![
            Value::nstring(envelope.date.clone()),
            Value::ntext(envelope.subject.clone()),
            addresses(&envelope.from),
            addresses(&envelope.sender),
            addresses(&envelope.reply_to),
            addresses(&envelope.to),
            addresses(&envelope.cc),
            addresses(&envelope.bcc),
            Value::nstring(envelope.in_reply_to.clone()),
            Value::nstring(envelope.message_id.clone()),
        ])
    }

    /// The `BODY` (`extended == false`) or `BODYSTRUCTURE` form of `bs`.
    pub fn body_structure(bs: &BodyStructure, extended: bool) -> Self {
        fn params(params: &[(String, String)]) -> Value {
            if params.is_empty() {
                Value::Nil
            } else {
                Value::List(
                    params
                        .iter()
                        .flat_map(|(k, v)| {
                            vec![
                                Value::string(k.to_ascii_uppercase()),
                                Value::string(v.clone()),
                            ]
                        })
                        .collect(),
                )
            }
        }

        let disposition = || match bs.content_disposition {
            None => Value::Nil,
            Some(ref d) => Value::List(vec![
                Value::string(d.to_ascii_uppercase()),
                params(&bs.content_disposition_parms),
            ]),
        };

        let mut out = Vec::new();
        if bs.is_multipart() {
            out.push(Value::Adjacent(
                bs.children
                    .iter()
                    .map(|child| Value::body_structure(child, extended))
                    .collect(),
            ));
            out.push(Value::string(bs.content_type.1.to_ascii_uppercase()));

            if extended {
                out.push(params(&bs.content_type_parms));
                out.push(disposition());
                out.push(Value::nstring(bs.content_language.clone()));
                out.push(Value::nstring(bs.content_location.clone()));
            }

            return Value::List(out);
        }

        out.push(Value::string(bs.content_type.0.to_ascii_uppercase()));
        out.push(Value::string(bs.content_type.1.to_ascii_uppercase()));
        out.push(params(&bs.content_type_parms));
        out.push(Value::nstring(bs.content_id.clone()));
        out.push(Value::ntext(bs.content_description.clone()));
        out.push(Value::string(bs.content_transfer_encoding.to_ascii_uppercase()));
        out.push(Value::Number(bs.size_octets));

        if let (true, Some(message)) =
            (bs.is_message_rfc822(), bs.children.first())
        {
            out.push(Value::envelope(&message.envelope));
            out.push(Value::body_structure(message, extended));
            out.push(Value::Number(bs.size_lines));
        } else if bs.is_text() {
            out.push(Value::Number(bs.size_lines));
        }

        if extended {
            out.push(Value::nstring(bs.md5.clone()));
            out.push(disposition());
            out.push(Value::nstring(bs.content_language.clone()));
            out.push(Value::nstring(bs.content_location.clone()));
        }

        Value::List(out)
    }
}

fn write_spaced(
    w: &mut LexWriter<impl LexOutput>,
    items: Vec<Value>,
) -> io::Result<()> {
    for (ix, item) in items.into_iter().enumerate() {
        if ix > 0 {
            w.verbatim(" ")?;
        }
        item.write_to(w)?;
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Condition {
    Ok,
    No,
    Bad,
    Bye,
    Preauth,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            Condition::Ok => "OK",
            Condition::No => "NO",
            Condition::Bad => "BAD",
            Condition::Bye => "BYE",
            Condition::Preauth => "PREAUTH",
        })
    }
}

/// A bracketed response code, e.g. `[UIDVALIDITY 42]`.
#[derive(Debug, PartialEq)]
pub struct ResponseCode {
    pub name: &'static str,
    pub args: Vec<Value>,
}

impl ResponseCode {
    pub fn new(name: &'static str) -> Self {
        ResponseCode {
            name,
            args: Vec::new(),
        }
    }

    pub fn with(name: &'static str, arg: Value) -> Self {
        ResponseCode {
            name,
            args: vec![arg],
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum Response {
    /// A status response. Untagged if `tag` is `None`.
    Status {
        tag: Option<String>,
        cond: Condition,
        code: Option<ResponseCode>,
        text: String,
    },
    /// Untagged data, `* <values>`.
    Data(Vec<Value>),
    /// A continuation request, `+ <text>`.
    Continuation(String),
}

impl Response {
    pub fn status(
        tag: Option<&str>,
        cond: Condition,
        code: Option<ResponseCode>,
        text: impl Into<String>,
    ) -> Self {
        Response::Status {
            tag: tag.map(str::to_owned),
            cond,
            code,
            text: text.into(),
        }
    }

    pub fn ok(tag: &str, text: impl Into<String>) -> Self {
        Response::status(Some(tag), Condition::Ok, None, text)
    }

    pub fn no(tag: &str, text: impl Into<String>) -> Self {
        Response::status(Some(tag), Condition::No, None, text)
    }

    pub fn bad(tag: Option<&str>, text: impl Into<String>) -> Self {
        Response::status(tag, Condition::Bad, None, text)
    }

    /// An untagged `OK` carrying a response code.
    pub fn untagged_ok(code: ResponseCode, text: impl Into<String>) -> Self {
        Response::status(None, Condition::Ok, Some(code), text)
    }

    pub fn bye(text: impl Into<String>) -> Self {
        Response::status(None, Condition::Bye, None, text)
    }

    pub fn data(values: Vec<Value>) -> Self {
        Response::Data(values)
    }

    /// Whether this is a tagged status response.
    pub fn is_tagged(&self) -> bool {
        matches!(*self, Response::Status { tag: Some(_), .. })
    }

    pub fn cond(&self) -> Option<Condition> {
        match *self {
            Response::Status { cond, .. } => Some(cond),
            _ => None,
        }
    }

    /// Replace the tag of a status response.
    pub fn tagged(mut self, new_tag: &str) -> Self {
        if let Response::Status { ref mut tag, .. } = self {
            *tag = Some(new_tag.to_owned());
        }
        self
    }

    pub fn has_literal(&self) -> bool {
        match *self {
            Response::Data(ref values) => values.iter().any(Value::has_literal),
            _ => false,
        }
    }

    /// Abort any streams held by this response without writing it.
    pub fn abort(&self) {
        if let Response::Data(ref values) = *self {
            values.iter().for_each(Value::abort);
        }
    }

    /// Write the response, excluding the final line ending.
    pub fn write_to(
        self,
        w: &mut LexWriter<impl LexOutput>,
    ) -> io::Result<()> {
        match self {
            Response::Status {
                tag,
                cond,
                code,
                text,
            } => {
                w.verbatim(tag.as_deref().unwrap_or("*"))?;
                w.verbatim(" ")?;
                w.verbatim(&cond.to_string())?;
                if let Some(code) = code {
                    w.verbatim(" [")?;
                    w.verbatim(code.name)?;
                    for arg in code.args {
                        w.verbatim(" ")?;
                        arg.write_to(w)?;
                    }
                    w.verbatim("]")?;
                }
                if !text.is_empty() {
                    w.verbatim(" ")?;
                    w.verbatim(&single_line(&text))?;
                }
                Ok(())
            },

            Response::Data(values) => {
                w.verbatim("* ")?;
                write_spaced(w, values)
            },

            Response::Continuation(text) => {
                w.verbatim("+ ")?;
                w.verbatim(&text)
            },
        }
    }
}

/// Fold every run of line-break characters in status text into one space.
/// A bare line break would desynchronise the client.
fn single_line(text: &str) -> Cow<'_, str> {
    lazy_static! {
        static ref LINE_BREAKS: Regex = Regex::new(r"[\r\n]+").unwrap();
    }
    LINE_BREAKS.replace_all(text, " ")
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::imap::compiler::compile;
    use crate::mime::fetch::bodystructure::body_structure;
    use crate::mime::tree::MimeTree;
    use crate::test_data::*;

    fn text(r: Response) -> String {
        String::from_utf8(compile(r).unwrap()).unwrap()
    }

    #[test]
    fn status_lines() {
        assert_eq!(
            "a1 OK LOGIN completed\r\n",
            text(Response::ok("a1", "LOGIN completed"))
        );
        assert_eq!(
            "* OK [UIDVALIDITY 42] UIDs valid\r\n",
            text(Response::untagged_ok(
                ResponseCode::with("UIDVALIDITY", Value::Number(42)),
                "UIDs valid"
            ))
        );
        assert_eq!(
            "* OK [PERMANENTFLAGS (\\Seen \\*)] Flags permitted\r\n",
            text(Response::untagged_ok(
                ResponseCode::with(
                    "PERMANENTFLAGS",
                    Value::atoms(vec!["\\Seen", "\\*"])
                ),
                "Flags permitted"
            ))
        );
        assert_eq!(
            "* BAD two lines\r\n",
            text(Response::bad(None, "two\r\nlines"))
        );
        assert_eq!(
            "a NO one two three\r\n",
            text(Response::no("a", "one\ntwo\r\r\n\nthree"))
        );
    }

    #[test]
    fn data_lines() {
        assert_eq!(
            "* LIST (\\HasNoChildren) \"/\" \"Lost &- Found\"\r\n",
            text(Response::data(vec![
                Value::atom("LIST"),
                Value::atoms(vec!["\\HasNoChildren"]),
                Value::string("/"),
                Value::Mailbox("Lost & Found".to_owned()),
            ]))
        );
        assert_eq!(
            "* 3 FETCH (UID 9 FLAGS () X NIL)\r\n",
            text(Response::data(vec![
                Value::Number(3),
                Value::atom("FETCH"),
                Value::List(vec![
                    Value::atom("UID"),
                    Value::Number(9),
                    Value::atom("FLAGS"),
                    Value::List(vec![]),
                    Value::atom("X"),
                    Value::Nil,
                ]),
            ]))
        );
    }

    #[test]
    fn envelope_value() {
        let tree = MimeTree::parse(SIMPLE);
        let bs = body_structure(&tree, 0);
        let line = text(Response::data(vec![Value::envelope(&bs.envelope)]));
        assert_eq!(
            "* (\"Mon, 7 Feb 1994 21:52:25 -0800\" \"Hello\" \
             ((\"Alice\" NIL \"alice\" \"example.com\")) \
             ((\"Alice\" NIL \"alice\" \"example.com\")) \
             ((\"Alice\" NIL \"alice\" \"example.com\")) \
             ((NIL NIL \"bob\" \"example.org\")) NIL NIL NIL \
             \"<simple@example.com>\")\r\n",
            line
        );
    }

    #[test]
    fn body_structure_values() {
        let tree = MimeTree::parse(MULTIPART_MIXED);
        let bs = body_structure(&tree, 0);

        let line = text(Response::data(vec![Value::body_structure(&bs, false)]));
        assert_eq!(
            "* ((\"TEXT\" \"PLAIN\" NIL NIL NIL \"7BIT\" 13 1)\
             (\"APPLICATION\" \"OCTET-STREAM\" (\"NAME\" \"data.bin\") \
             NIL NIL \"BASE64\" 130) \"MIXED\")\r\n",
            line
        );

        let line = text(Response::data(vec![Value::body_structure(&bs, true)]));
        assert!(line.starts_with(
            "* ((\"TEXT\" \"PLAIN\" NIL NIL NIL \"7BIT\" 13 1 NIL NIL NIL NIL)"
        ));
        assert!(line.contains("(\"ATTACHMENT\" (\"FILENAME\" \"data.bin\"))"));
        assert!(line.ends_with("\"MIXED\" (\"BOUNDARY\" \"=-=-=\") NIL NIL NIL)\r\n"));
    }

    #[test]
    fn embedded_message_structure() {
        let tree = MimeTree::parse(NESTED_MESSAGE);
        let bs = body_structure(&tree, 0);
        let line = text(Response::data(vec![Value::body_structure(&bs, false)]));
        assert!(line.contains("\"MESSAGE\" \"RFC822\""));
        assert!(line.contains("\"Inner\""));
    }
}
