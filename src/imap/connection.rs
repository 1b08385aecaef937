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

//! Drives one client connection from greeting to close.

use std::io;
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;

use super::command_processor::{CommandProcessor, ServerContext};
use super::command_table;
use super::request_reader::{ReadOutcome, RequestReader};
use super::response::Response;
use super::response_writer::{
    write_responses, OutputControl, OutputDisconnect, OutputEvent,
};
use crate::support::log_prefix::LogPrefix;

/// How many responses may be queued ahead of the writer before the command
/// processor is made to wait.
const OUTPUT_QUEUE: usize = 16;

/// Serve the IMAP protocol on `io` until either side closes it.
///
/// Commands are handled strictly one at a time: the next command is not read
/// until every response of the previous one has been queued.
pub async fn run_connection<S>(
    io: S,
    context: Arc<ServerContext>,
    peer: String,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let config = &context.config.imap;
    let (id, notifications) = context
        .registry
        .register(peer.clone(), config.notification_queue);
    let log_prefix = LogPrefix::new(format!("imaps:{}:{}", peer, id));
    info!("{} Connection established", log_prefix);

    let (read, write) = tokio::io::split(io);
    let (tx, rx) = mpsc::channel(OUTPUT_QUEUE);
    let writer = tokio::spawn(write_responses(
        write,
        rx,
        config.close_grace_period(),
    ));

    let mut reader = RequestReader::new(
        read,
        config.max_line_length,
        config.max_literal_size,
        config.max_append_size,
    );
    let mut processor = CommandProcessor::new(
        log_prefix.clone(),
        Arc::clone(&context),
        id,
        tx.clone(),
        notifications,
    );

    if !queue(&tx, processor.greet(), OutputControl::Flush).await {
        warn!("{} Output closed before greeting", log_prefix);
    }

    let idle_timeout = config.idle_timeout();
    let availability = context.availability;
    loop {
        let state = processor.state_kind();
        let next = reader.read_command(
            |command| {
                command_table::precheck(command, state, availability).err()
            },
            &tx,
        );

        let outcome = match tokio::time::timeout(idle_timeout, next).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) if io::ErrorKind::UnexpectedEof == e.kind() => {
                debug!("{} Client closed the connection", log_prefix);
                break;
            },
            Ok(Err(e)) => {
                warn!("{} Read error: {}", log_prefix, e);
                break;
            },
            Err(_) => {
                info!("{} Idle timeout", log_prefix);
                queue(
                    &tx,
                    Response::bye("Idle timeout, closing connection"),
                    OutputControl::Disconnect,
                )
                .await;
                break;
            },
        };

        match outcome {
            ReadOutcome::Command(command) => {
                processor.handle_command(command).await;
            },
            ReadOutcome::Rejected(response) => {
                debug!("{} Rejected command", log_prefix);
                queue(&tx, response, OutputControl::Flush).await;
            },
            ReadOutcome::Unframed(response) => {
                info!("{} Lost command framing, closing", log_prefix);
                queue(&tx, response, OutputControl::Buffer).await;
                queue(
                    &tx,
                    Response::bye("Cannot continue after unsupported literal"),
                    OutputControl::Disconnect,
                )
                .await;
                break;
            },
            ReadOutcome::OutputDisconnected => break,
        }

        if processor.logged_out() || tx.is_closed() {
            break;
        }
    }

    // The processor holds a sender too; the writer finishes once both are
    // gone and the queue is drained.
    drop(processor);
    drop(tx);
    match writer.await {
        Ok(Ok(OutputDisconnect::ByControl)) => (),
        Ok(Ok(OutputDisconnect::InputClosed)) => {
            debug!("{} Output drained", log_prefix)
        },
        Ok(Err(e)) => warn!("{} Write error: {}", log_prefix, e),
        Err(e) => warn!("{} Writer task failed: {}", log_prefix, e),
    }

    context.registry.remove(id);
    info!("{} Connection closed", log_prefix);
}

/// Queue `response` for output, returning whether the writer is still there
/// to take it.
async fn queue(
    tx: &mpsc::Sender<OutputEvent>,
    response: Response,
    ctl: OutputControl,
) -> bool {
    match tx.send(OutputEvent::ResponseLine { response, ctl }).await {
        Ok(()) => true,
        Err(mpsc::error::SendError(OutputEvent::ResponseLine {
            response,
            ..
        })) => {
            response.abort();
            false
        },
        Err(_) => false,
    }
}
