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

use std::time::{Duration, Instant};

use log::warn;
use tokio::io::{AsyncWrite, AsyncWriteExt as _};

use super::compiler::{compile_streaming, CompiledResponse};
use super::response::Response;
use crate::support::error::Error;

/// An event to be sent to the client.
#[derive(Debug)]
pub enum OutputEvent {
    /// A full response line.
    ResponseLine {
        /// The content to write.
        response: Response,
        /// Any special handling for this line.
        ctl: OutputControl,
    },
    /// A continuation line (i.e. "+ {message}\r\n").
    ContinuationLine {
        /// The prompt to send.
        prompt: &'static str,
    },
    /// Flush the buffers immediately if non-empty.
    Flush,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputControl {
    /// No special handling. Written responses may continue to be buffered.
    Buffer,
    /// Flush all internal buffers after writing this response.
    Flush,
    /// Flush all internal buffers and disconnect immediately after writing
    /// this response.
    Disconnect,
}

/// The reason `write_responses` terminated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputDisconnect {
    /// The disconnect was initiated by `OutputControl::Disconnect`.
    ByControl,
    /// The `OutputEvent` receiver was closed.
    InputClosed,
}

/// Actor for writing responses to the client.
///
/// The actor runs until one of the following:
/// - An error occurs. Anything still buffered is aborted.
/// - `outputs` is disconnected. The actor returns no error.
/// - `OutputControl::Disconnect` is processed. The actor returns no error.
///
/// In every case the output is then shut down, waiting at most
/// `grace_period` for the peer to acknowledge before the stream is dropped.
pub async fn write_responses<W: AsyncWrite + Unpin>(
    mut io: W,
    mut outputs: tokio::sync::mpsc::Receiver<OutputEvent>,
    grace_period: Duration,
) -> Result<OutputDisconnect, Error> {
    let mut state = State::new();
    let result = run(&mut io, &mut outputs, &mut state).await;

    state.pending.abort();
    // Anything still queued will never be written.
    outputs.close();
    while let Ok(evt) = outputs.try_recv() {
        if let OutputEvent::ResponseLine { response, .. } = evt {
            response.abort();
        }
    }

    match tokio::time::timeout(grace_period, io.shutdown()).await {
        Ok(Ok(())) => (),
        Ok(Err(e)) => {
            if result.is_ok() {
                warn!("Error shutting down connection: {}", e);
            }
        },
        Err(_) => warn!("Peer did not acknowledge shutdown in time"),
    }

    result
}

async fn run<W: AsyncWrite + Unpin>(
    io: &mut W,
    outputs: &mut tokio::sync::mpsc::Receiver<OutputEvent>,
    state: &mut State,
) -> Result<OutputDisconnect, Error> {
    while let Some(evt) = outputs.recv().await {
        // Reset last_flush if there's not actually anything pending.
        if state.pending.is_empty() {
            state.last_flush = Instant::now();
        }

        let ctl = match evt {
            OutputEvent::ResponseLine { response, ctl } => {
                // Never let live streams sit in the buffer.
                let ctl = if response.has_literal()
                    && OutputControl::Buffer == ctl
                {
                    OutputControl::Flush
                } else {
                    ctl
                };
                state.pending.append(compile_streaming(response)?);
                ctl
            },

            OutputEvent::ContinuationLine { prompt } => {
                state.pending.text.extend_from_slice(b"+ ");
                state.pending.text.extend_from_slice(prompt.as_bytes());
                state.pending.text.extend_from_slice(b"\r\n");
                OutputControl::Flush
            },

            OutputEvent::Flush => OutputControl::Flush,
        };

        match ctl {
            OutputControl::Buffer => {
                let flush_due_to_size =
                    state.pending.buffered_len() >= TEXT_FLUSH_THRESH
                        || state.pending.splices.len() >= SPLICE_FLUSH_THRESH;

                // Handlers can take a long time between responses, so force
                // a flush implicitly if we've had data sitting around for a
                // while.
                let flush_due_to_time =
                    state.last_flush.elapsed() >= Duration::from_secs(3);

                if flush_due_to_size || flush_due_to_time {
                    state.flush(io).await?;
                }
            },

            OutputControl::Flush => {
                state.flush(io).await?;
            },

            OutputControl::Disconnect => {
                state.flush(io).await?;
                return Ok(OutputDisconnect::ByControl);
            },
        }
    }

    state.flush(io).await?;

    Ok(OutputDisconnect::InputClosed)
}

const TEXT_FLUSH_THRESH: usize = 4096;
const SPLICE_FLUSH_THRESH: usize = 4;

struct State {
    /// Everything written but not yet flushed.
    pending: CompiledResponse,
    /// The last time a flush was completed.
    last_flush: Instant,
}

impl State {
    fn new() -> Self {
        Self {
            pending: CompiledResponse {
                text: Vec::with_capacity(TEXT_FLUSH_THRESH * 5 / 4),
                splices: Vec::with_capacity(SPLICE_FLUSH_THRESH * 2),
            },
            last_flush: Instant::now(),
        }
    }

    async fn flush<W: AsyncWrite + Unpin>(
        &mut self,
        io: &mut W,
    ) -> Result<(), Error> {
        if !self.pending.is_empty() {
            self.pending.write_to(io).await?;
        }
        io.flush().await?;
        self.last_flush = Instant::now();
        Ok(())
    }
}
