//-
// Copyright (c) 2026, The Mailroom developers
//
// This file is part of Mailroom.
//
// Mailroom is free software: you can  redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free
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

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task;

use lazy_static::lazy_static;
use log::debug;
use regex::bytes::Regex;
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};
use tokio::sync::mpsc;

use super::command::{recover_tag, Command};
use super::response::{Condition, Response, ResponseCode};
use super::response_writer::OutputEvent;

lazy_static! {
    static ref LITERAL_AT_END: Regex = Regex::new(r#"\{([^{}]*)\}$"#).unwrap();
}

/// Below this, skipping an overlong line could not keep enough context to
/// find a literal marker split across reads.
const MIN_CMDLINE: usize = 1024;
/// How much of an overlong line is kept when skipping it.
const SKIP_OVERLAP: usize = 32;

/// Manages the state of the network input.
///
/// Commands are framed one at a time. Lines are accumulated in a fixed-size
/// buffer whose size is the maximum line length; literals are read straight
/// from the stream into their own buffers, so their ceiling is independent of
/// the line limit.
pub struct RequestReader<R> {
    io: R,
    /// The text buffer. The `Vec` itself is used as a fixed-size array; the
    /// size currently in use is given by `text_len`.
    text: Vec<u8>,
    /// The number of initialised bytes in `text`.
    text_len: usize,
    /// The number of bytes in `text` that have been consumed by reading.
    text_consumed: usize,
    max_literal_size: u64,
    max_append_size: u64,
}

/// Possible outcomes of trying to read a command.
#[derive(Debug)]
pub enum ReadOutcome {
    /// A complete command with all its literals was received.
    Command(Command),
    /// The command was rejected while it was being framed. The response is
    /// to be sent to the client and the connection continues.
    Rejected(Response),
    /// The command was rejected, and the client is already sending literal
    /// data that cannot be skipped without reading an unbounded amount. The
    /// response is sent and the connection is then closed.
    Unframed(Response),
    /// The reader wanted to send a continuation line, but the output channel
    /// was disconnected.
    OutputDisconnected,
}

/// A literal marker found at the end of a line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct LiteralMarker {
    /// The declared size, or `None` if it isn't a valid size.
    size: Option<u64>,
    /// Whether this is a non-synchronising (`{N+}`) literal, which the
    /// client sends without waiting for a continuation line.
    plus: bool,
}

impl<R: AsyncRead + Unpin> RequestReader<R> {
    pub fn new(
        io: R,
        max_line_length: usize,
        max_literal_size: u64,
        max_append_size: u64,
    ) -> Self {
        Self {
            io,
            text: vec![0u8; max_line_length.max(MIN_CMDLINE)],
            text_len: 0,
            text_consumed: 0,
            max_literal_size,
            max_append_size,
        }
    }

    /// Reads the next command from the stream.
    ///
    /// `precheck` is run once the first line has been framed and may reject
    /// the command before its literals are looked at, so a command refused
    /// for its verb or state never gets a literal-size error.
    /// `output` is used to send continuation lines for synchronising
    /// literals.
    ///
    /// Errors are only returned for failures of the underlying stream.
    pub async fn read_command(
        &mut self,
        precheck: impl FnOnce(&Command) -> Option<Response>,
        output: &mpsc::Sender<OutputEvent>,
    ) -> io::Result<ReadOutcome> {
        let line = loop {
            self.drop_consumed();
            match self.consume_line().await? {
                None => {
                    let tag = recover_tag(&self.text[..self.text_len]);
                    return self.reject_overlong(tag).await;
                },
                // Blank lines between commands are tolerated.
                Some(b"") => continue,
                Some(line) => break line.to_vec(),
            }
        };

        let mut marker = check_literal(&line);
        let mut command = match Command::start(&line) {
            Ok(command) => command,
            Err(response) => return Ok(reject(marker, response)),
        };

        // A verb that cannot run here is refused as such, whatever literal
        // it carries.
        if let Some(response) = precheck(&command) {
            return Ok(reject(marker, response));
        }

        let ceiling = if "APPEND" == command.verb {
            self.max_append_size
        } else {
            self.max_literal_size
        };

        loop {
            let Some(lit) = marker else {
                return Ok(ReadOutcome::Command(command));
            };

            if lit.plus {
                debug!("Refusing {} non-synchronising literal", command.verb);
                return Ok(ReadOutcome::Unframed(Response::bad(
                    Some(&command.tag),
                    "Non-synchronising literals are not supported",
                )));
            }

            let Some(size) = admit(&command, lit, ceiling) else {
                debug!(
                    "Rejecting {} literal of {:?} bytes",
                    command.verb, lit.size
                );
                return Ok(ReadOutcome::Rejected(Response::status(
                    Some(&command.tag),
                    Condition::No,
                    Some(ResponseCode::new("TOOBIG")),
                    "Literal too big",
                )));
            };

            if output
                .send(OutputEvent::ContinuationLine { prompt: "go ahead" })
                .await
                .is_err()
            {
                return Ok(ReadOutcome::OutputDisconnected);
            }

            command.push_literal(self.read_literal(size).await?);

            self.drop_consumed();
            match self.consume_line().await? {
                None => return self.reject_overlong(Some(command.tag)).await,
                Some(line) => {
                    marker = check_literal(line);
                    command.push_line(line);
                },
            }
        }
    }

    /// Read exactly `size` bytes of literal data.
    async fn read_literal(&mut self, size: u64) -> io::Result<Vec<u8>> {
        let mut data = Vec::with_capacity(size.min(65536) as usize);
        (&mut *self).take(size).read_to_end(&mut data).await?;
        if (data.len() as u64) < size {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        Ok(data)
    }

    async fn reject_overlong(
        &mut self,
        tag: Option<String>,
    ) -> io::Result<ReadOutcome> {
        debug!("Skipping overlong command line (tag {:?})", tag);
        let response = Response::bad(tag.as_deref(), "Command line too long");
        if self.skip_line().await? {
            Ok(ReadOutcome::Unframed(response))
        } else {
            Ok(ReadOutcome::Rejected(response))
        }
    }

    /// Skip the rest of an overlong line, which currently fills `text`.
    ///
    /// Returns whether the line ended with a non-synchronising literal
    /// marker, in which case the literal data is already on its way.
    async fn skip_line(&mut self) -> io::Result<bool> {
        loop {
            // Keep the last few bytes so a literal marker split across reads
            // is still found.
            self.text_consumed = self.text_len - SKIP_OVERLAP;
            self.drop_consumed();
            if let Some(line) = self.consume_line().await? {
                return Ok(check_literal(line).map_or(false, |lit| lit.plus));
            }
        }
    }

    /// Advances `text_consumed` to one byte past the next line boundary.
    ///
    /// If no IO error occurs, this returns the line (excluding the line-ending
    /// character(s)), or `None` if the buffer filled without finding a line
    /// feed. In the latter case, `text_consumed` is not advanced.
    async fn consume_line(&mut self) -> io::Result<Option<&[u8]>> {
        let start = self.text_consumed;
        let mut cursor = start;

        loop {
            if let Some(lf) =
                memchr::memchr(b'\n', &self.text[cursor..self.text_len])
            {
                let end = cursor + lf + 1;
                self.text_consumed = end;

                let mut before_line_end = end - 1;
                if before_line_end > start
                    && self.text[before_line_end - 1] == b'\r'
                {
                    before_line_end -= 1;
                }
                return Ok(Some(&self.text[start..before_line_end]));
            }

            cursor = self.text_len;
            if self.text_len == self.text.len() {
                return Ok(None);
            }

            self.grow_text().await?;
        }
    }

    /// Removes all text marked as consumed from the text buffer.
    fn drop_consumed(&mut self) {
        if self.text_consumed < self.text_len {
            self.text.copy_within(self.text_consumed..self.text_len, 0);
        }

        self.text_len -= self.text_consumed;
        self.text_consumed = 0;
    }

    /// Perform a non-empty read into `text`.
    fn grow_text(&mut self) -> impl Future<Output = io::Result<()>> + '_ {
        struct GrowText<'a, R> {
            this: &'a mut RequestReader<R>,
        }

        impl<R: AsyncRead + Unpin> Future for GrowText<'_, R> {
            type Output = io::Result<()>;

            fn poll(
                mut self: Pin<&mut Self>,
                ctx: &mut task::Context<'_>,
            ) -> task::Poll<io::Result<()>> {
                let this = &mut *self.this;
                let mut buf = ReadBuf::new(&mut this.text[this.text_len..]);
                futures::ready!(Pin::new(&mut this.io).poll_read(ctx, &mut buf))?;

                let nread = buf.filled().len();
                if 0 == nread {
                    return task::Poll::Ready(Err(
                        io::ErrorKind::UnexpectedEof.into(),
                    ));
                }

                this.text_len += nread;
                task::Poll::Ready(Ok(()))
            }
        }

        GrowText { this: self }
    }
}

/// The `AsyncRead` implementation directly reads from the logical byte stream
/// of the request reader.
impl<R: AsyncRead + Unpin> AsyncRead for RequestReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        ctx: &mut task::Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> task::Poll<io::Result<()>> {
        let this = self.get_mut();

        if this.text_consumed < this.text_len {
            // Data we've already buffered comes first.
            let len = buf.remaining().min(this.text_len - this.text_consumed);
            buf.put_slice(&this.text[this.text_consumed..][..len]);
            this.text_consumed += len;
            task::Poll::Ready(Ok(()))
        } else {
            Pin::new(&mut this.io).poll_read(ctx, buf)
        }
    }
}

/// Turn a refusal of the command whose first line ended in `marker` into an
/// outcome. Only a non-synchronising literal is sent without waiting for us.
fn reject(marker: Option<LiteralMarker>, response: Response) -> ReadOutcome {
    if marker.map_or(false, |lit| lit.plus) {
        ReadOutcome::Unframed(response)
    } else {
        ReadOutcome::Rejected(response)
    }
}

/// The size of the literal `lit` if it fits in `ceiling` along with the
/// literals `command` already has.
fn admit(command: &Command, lit: LiteralMarker, ceiling: u64) -> Option<u64> {
    lit.size
        .filter(|&size| command.literal_bytes().saturating_add(size) <= ceiling)
}

/// Check whether `line` ends with a literal marker.
fn check_literal(line: &[u8]) -> Option<LiteralMarker> {
    let inner = LITERAL_AT_END.captures(line)?.get(1)?.as_bytes();
    let (digits, plus) = match inner {
        [digits @ .., b'+'] => (digits, true),
        digits => (digits, false),
    };

    let size = Some(digits)
        .filter(|d| !d.is_empty() && d.iter().all(u8::is_ascii_digit))
        .and_then(|d| std::str::from_utf8(d).ok())
        .and_then(|s| s.parse::<u64>().ok());
    Some(LiteralMarker { size, plus })
}

#[cfg(test)]
mod test {
    use std::fmt::Write as _;

    use super::*;
    use crate::imap::compiler::compile;

    /// Frame every command in `input`, describing each outcome on its own
    /// line. Continuation lines requested are shown as `+`.
    fn run(input: &str, max_line: usize, max_literal: u64) -> String {
        run_checked(input, max_line, max_literal, |_| None)
    }

    /// Like `run()`, with `precheck` applied to every command. An unframed
    /// rejection ends the run with `closed`.
    fn run_checked(
        input: &str,
        max_line: usize,
        max_literal: u64,
        precheck: impl Fn(&Command) -> Option<Response>,
    ) -> String {
        let (sender, mut receiver) = mpsc::channel(999);
        let mut reader =
            RequestReader::new(input.as_bytes(), max_line, max_literal, 100);
        let mut output = String::new();

        loop {
            let outcome = match futures::executor::block_on(
                reader.read_command(|cmd| precheck(cmd), &sender),
            ) {
                Err(e) if io::ErrorKind::UnexpectedEof == e.kind() => break,
                Err(e) => panic!("unexpected error: {e}"),
                Ok(outcome) => outcome,
            };

            while receiver.try_recv().is_ok() {
                output.push_str("+\n");
            }

            match outcome {
                ReadOutcome::Command(cmd) => {
                    write!(
                        output,
                        "{} {} [{}]",
                        cmd.tag,
                        cmd.verb,
                        String::from_utf8_lossy(&cmd.payload)
                            .replace("\r\n", "|"),
                    )
                    .unwrap();
                    for lit in &cmd.literals {
                        write!(output, " <{}>", String::from_utf8_lossy(lit))
                            .unwrap();
                    }
                    output.push('\n');
                },
                ReadOutcome::Rejected(response) => {
                    output.push_str(
                        &String::from_utf8(compile(response).unwrap())
                            .unwrap()
                            .replace("\r\n", "\n"),
                    );
                },
                ReadOutcome::Unframed(response) => {
                    output.push_str(
                        &String::from_utf8(compile(response).unwrap())
                            .unwrap()
                            .replace("\r\n", "\n"),
                    );
                    output.push_str("closed\n");
                    break;
                },
                ReadOutcome::OutputDisconnected => {
                    output.push_str("disconnected\n");
                    break;
                },
            }
        }

        output
    }

    const NO_SYNC: &str = "BAD Non-synchronising literals are not supported";

    #[test]
    fn simple_commands() {
        assert_eq!(
            "a NOOP []\nb LOGIN [azure hunter2]\n",
            run("a NOOP\r\n\r\nb login azure hunter2\n", 1024, 1024)
        );
    }

    #[test]
    fn synchronising_literals() {
        assert_eq!(
            "+\n+\na LOGIN [{5}| {7}|] <azure> <hunter2>\nb NOOP []\n",
            run(
                "a LOGIN {5}\r\nazure {7}\r\nhunter2\r\nb NOOP\r\n",
                1024,
                1024
            )
        );
    }

    #[test]
    fn non_synchronising_literals_end_the_connection() {
        assert_eq!(
            format!("a {NO_SYNC}\nclosed\n"),
            run("a LOGIN {5+}\r\nazure x\r\nb NOOP\r\n", 1024, 1024)
        );
        // Also after a synchronising literal.
        assert_eq!(
            format!("+\na {NO_SYNC}\nclosed\n"),
            run("a LOGIN {5}\r\nazure {7+}\r\nhunter2\r\n", 1024, 1024)
        );
    }

    #[test]
    fn non_synchronising_literal_data_is_never_read() {
        let (sender, _receiver) = mpsc::channel(999);
        let mut input = b"a APPEND INBOX {5000+}\r\n".to_vec();
        input.extend(std::iter::repeat(b'x').take(5000));
        input.extend_from_slice(b"\r\n");

        let mut reader = RequestReader::new(&input[..], 1024, 10, 10);
        let outcome = futures::executor::block_on(
            reader.read_command(|_| None, &sender),
        )
        .unwrap();
        assert_matches!(ReadOutcome::Unframed(_), outcome);
        // At most one buffer's worth was taken from the stream.
        assert!(reader.io.len() >= input.len() - 1024);
    }

    #[test]
    fn literal_data_is_not_a_line() {
        assert_eq!(
            "+\na X [{4}|] <\r\n\r\n>\n",
            run("a X {4}\r\n\r\n\r\n\r\n", 1024, 1024)
        );
    }

    #[test]
    fn oversized_literals() {
        // The synchronising literal is never sent by the client.
        assert_eq!(
            "a NO [TOOBIG] Literal too big\nb NOOP []\n",
            run("a LOGIN {50}\r\nb NOOP\r\n", 1024, 10)
        );
        // A non-synchronising one is refused whatever its size.
        assert_eq!(
            format!("a {NO_SYNC}\nclosed\n"),
            run("a LOGIN {12+}\r\n0123456789ab x\r\nb NOOP\r\n", 1024, 10)
        );
        // Cumulative size counts.
        assert_eq!(
            "+\na NO [TOOBIG] Literal too big\nb NOOP []\n",
            run("a LOGIN {6}\r\nazure1 {6}\r\nb NOOP\r\n", 1024, 10)
        );
    }

    #[test]
    fn malformed_literal_sizes() {
        assert_eq!(
            "a NO [TOOBIG] Literal too big\nb NOOP []\n",
            run("a LOGIN {-5}\r\nb NOOP\r\n", 1024, 10)
        );
        assert_eq!(
            "a NO [TOOBIG] Literal too big\nb NOOP []\n",
            run("a LOGIN {99999999999999999999999}\r\nb NOOP\r\n", 1024, 10)
        );
    }

    #[test]
    fn append_has_larger_ceiling() {
        assert_eq!(
            "+\na APPEND [INBOX {50}|] <01234567890123456789012345678901234567890123456789>\n",
            run(
                "a APPEND INBOX {50}\r\n\
                 01234567890123456789012345678901234567890123456789\r\n",
                1024,
                10
            )
        );
        assert_eq!(
            "a NO [TOOBIG] Literal too big\nb NOOP []\n",
            run("a APPEND INBOX {101}\r\nb NOOP\r\n", 1024, 10)
        );
    }

    #[test]
    fn overlong_lines() {
        let long = "x".repeat(3000);
        assert_eq!(
            "a BAD Command line too long\nb NOOP []\n",
            run(&format!("a FETCH {long}\r\nb NOOP\r\n"), 1024, 10)
        );
        assert_eq!(
            "* BAD Command line too long\nb NOOP []\n",
            run(&format!("{long}\r\nb NOOP\r\n"), 1024, 10)
        );
        // The data of a non-synchronising literal at the end of an overlong
        // line cannot be told apart from commands.
        assert_eq!(
            "a BAD Command line too long\nclosed\n",
            run(
                &format!("a FETCH {long} {{3+}}\r\nxyz\r\nb NOOP\r\n"),
                1024,
                10
            )
        );
    }

    #[test]
    fn bad_command_starts() {
        assert_eq!(
            "* BAD Missing command tag\nb NOOP []\n",
            run(" NOOP\r\nb NOOP\r\n", 1024, 10)
        );
        assert_eq!(
            "a BAD Missing command name\nb NOOP []\n",
            run("a {3}\r\nb NOOP\r\n", 1024, 10)
        );
        assert_eq!(
            "a BAD Missing command name\nclosed\n",
            run("a {3+}\r\nxyz\r\nb NOOP\r\n", 1024, 10)
        );
    }

    #[test]
    fn precheck_comes_before_literal_ceiling() {
        let refuse_select = |cmd: &Command| {
            ("SELECT" == cmd.verb).then(|| {
                Response::bad(
                    Some(&cmd.tag),
                    "Command not allowed in this state",
                )
            })
        };
        assert_eq!(
            "a BAD Command not allowed in this state\nb NOOP []\n",
            run_checked("a SELECT {50}\r\nb NOOP\r\n", 1024, 10, refuse_select)
        );
        assert_eq!(
            "a BAD Command not allowed in this state\nb NOOP []\n",
            run_checked("a SELECT {-1}\r\nb NOOP\r\n", 1024, 10, refuse_select)
        );
        // Commands that pass still get the ceiling.
        assert_eq!(
            "a NO [TOOBIG] Literal too big\n",
            run_checked("a STATUS {50}\r\n", 1024, 10, refuse_select)
        );
    }

    #[test]
    fn precheck_prevents_continuation() {
        let (sender, mut receiver) = mpsc::channel(999);
        let input = b"a APPEND INBOX {5}\r\nb NOOP\r\n";
        let mut reader = RequestReader::new(&input[..], 1024, 10, 100);

        let outcome = futures::executor::block_on(reader.read_command(
            |cmd| Some(Response::bad(Some(&cmd.tag), "Not implemented")),
            &sender,
        ))
        .unwrap();
        assert_matches!(ReadOutcome::Rejected(_), outcome);
        assert!(receiver.try_recv().is_err());

        let outcome = futures::executor::block_on(
            reader.read_command(|_| None, &sender),
        )
        .unwrap();
        assert_matches!(ReadOutcome::Command(_), outcome);
    }

    #[test]
    fn continuation_to_closed_output() {
        let (sender, receiver) = mpsc::channel(1);
        drop(receiver);
        assert_eq!(
            "disconnected\n",
            run_with_sender("a LOGIN {5}\r\nazure x\r\n", sender)
        );
    }

    fn run_with_sender(input: &str, sender: mpsc::Sender<OutputEvent>) -> String {
        let mut reader = RequestReader::new(input.as_bytes(), 1024, 10, 100);
        match futures::executor::block_on(reader.read_command(|_| None, &sender))
        {
            Ok(ReadOutcome::OutputDisconnected) => "disconnected\n".to_owned(),
            Ok(other) => format!("{other:?}\n"),
            Err(e) => format!("error: {e}\n"),
        }
    }

    #[test]
    fn literal_markers() {
        assert_eq!(
            Some(LiteralMarker {
                size: Some(5),
                plus: false
            }),
            check_literal(b"a LOGIN {5}")
        );
        assert_eq!(
            Some(LiteralMarker {
                size: Some(5),
                plus: true
            }),
            check_literal(b"a LOGIN {5+}")
        );
        assert_eq!(
            Some(LiteralMarker {
                size: None,
                plus: false
            }),
            check_literal(b"a LOGIN {x}")
        );
        assert_eq!(None, check_literal(b"a LOGIN {5} x"));
    }
}
