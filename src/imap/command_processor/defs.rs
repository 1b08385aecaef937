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

use std::sync::Arc;

use log::{error, warn};
use tokio::sync::mpsc;

use crate::imap::command_table::StateKind;
use crate::imap::response::{Condition, Response, ResponseCode, Value};
use crate::imap::response_writer::{OutputControl, OutputEvent};
use crate::imap::server::Registry;
use crate::imap::services::{Availability, Services, Session};
use crate::support::{
    error::Error, log_prefix::LogPrefix, system_config::SystemConfig,
};

pub(super) static TAGLINE: &str = concat!(
    "Mailroom ",
    env!("CARGO_PKG_VERSION_MAJOR"),
    ".",
    env!("CARGO_PKG_VERSION_MINOR"),
    ".",
    env!("CARGO_PKG_VERSION_PATCH"),
    " ready"
);

static PRE_AUTH_CAPABILITIES: &[&str] = &["IMAP4rev1", "ID"];

static POST_AUTH_CAPABILITIES: &[&str] =
    &["UNSELECT", "CONDSTORE", "ENABLE", "SPECIAL-USE"];

/// An event pushed to a connection from outside.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification {
    /// A message was added to a mailbox of the connection's user.
    NewMessage { mailbox: String, uid: u32 },
}

/// The mailbox a connection has selected.
#[derive(Clone, Debug)]
pub struct SelectedMailbox {
    /// The normalised name, as given to the select service.
    pub name: String,
    pub read_only: bool,
    pub condstore: bool,
    /// The session returned with the selection, used for calls made while
    /// this mailbox is selected.
    pub session: Session,
    /// The UID of each message in sequence number order.
    pub uids: Vec<u32>,
}

/// The protocol state of a connection.
///
/// Each transition replaces the whole value, so a failed `SELECT` can never
/// leave a half-selected mailbox behind.
#[derive(Clone, Debug)]
pub enum ProtocolState {
    NotAuthenticated,
    Authenticated(Session),
    Selected(Session, SelectedMailbox),
    Logout,
}

impl ProtocolState {
    pub fn kind(&self) -> StateKind {
        match *self {
            ProtocolState::NotAuthenticated => StateKind::NotAuthenticated,
            ProtocolState::Authenticated(..) => StateKind::Authenticated,
            ProtocolState::Selected(..) => StateKind::Selected,
            ProtocolState::Logout => StateKind::Logout,
        }
    }

    /// The session to pass to the services.
    pub fn session(&self) -> Option<&Session> {
        match *self {
            ProtocolState::Authenticated(ref session) => Some(session),
            ProtocolState::Selected(_, ref selected) => Some(&selected.session),
            _ => None,
        }
    }

    /// The session established by `LOGIN`.
    pub fn login_session(&self) -> Option<&Session> {
        match *self {
            ProtocolState::Authenticated(ref session)
            | ProtocolState::Selected(ref session, _) => Some(session),
            _ => None,
        }
    }

    pub fn selected(&self) -> Option<&SelectedMailbox> {
        match *self {
            ProtocolState::Selected(_, ref selected) => Some(selected),
            _ => None,
        }
    }

    /// Drop any selected mailbox, returning to the authenticated state.
    pub fn deselect(&mut self) {
        if let ProtocolState::Selected(ref session, _) = *self {
            *self = ProtocolState::Authenticated(session.clone());
        }
    }
}

/// Used just for the convenient `?` operator. We mostly don't distinguish
/// `Ok` from `Err` --- the contained value is sent down the wire with the
/// command's tag.
pub(super) type CmdResult = Result<Response, Response>;

/// Return value from an operation that can either succeed with a value, or
/// fail with an IMAP response.
pub(super) type PartialResult<T> = Result<T, Response>;

/// Channel used to send untagged responses as they become available.
pub(super) type SendResponse = mpsc::Sender<OutputEvent>;

/// Everything a connection shares with the rest of the server.
pub struct ServerContext {
    pub config: Arc<SystemConfig>,
    pub services: Services,
    pub availability: Availability,
    pub registry: Arc<Registry>,
}

/// Receives parsed commands and turns them into responses.
///
/// Besides translating between the wire model and the services, it owns the
/// protocol state of the connection and the queue of notifications pushed to
/// it.
pub struct CommandProcessor {
    pub(super) log_prefix: LogPrefix,
    pub(super) context: Arc<ServerContext>,
    pub(super) connection_id: u64,

    pub(super) state: ProtocolState,
    pub(super) condstore_enabled: bool,

    pub(super) output: SendResponse,
    pub(super) notifications: mpsc::Receiver<Notification>,
}

impl CommandProcessor {
    pub fn new(
        log_prefix: LogPrefix,
        context: Arc<ServerContext>,
        connection_id: u64,
        output: SendResponse,
        notifications: mpsc::Receiver<Notification>,
    ) -> Self {
        CommandProcessor {
            log_prefix,
            context,
            connection_id,

            state: ProtocolState::NotAuthenticated,
            condstore_enabled: false,

            output,
            notifications,
        }
    }

    pub fn state_kind(&self) -> StateKind {
        self.state.kind()
    }

    pub fn logged_out(&self) -> bool {
        matches!(self.state, ProtocolState::Logout)
    }

    pub fn log_prefix(&self) -> &LogPrefix {
        &self.log_prefix
    }

    /// The capabilities to advertise in the current state.
    pub fn capabilities(&self) -> Vec<String> {
        let mut caps = PRE_AUTH_CAPABILITIES
            .iter()
            .map(|&c| c.to_owned())
            .collect::<Vec<_>>();

        if self.state.login_session().is_some() {
            caps.extend(POST_AUTH_CAPABILITIES.iter().map(|&c| c.to_owned()));
            caps.push(format!(
                "APPENDLIMIT={}",
                self.context.config.imap.max_append_size
            ));
        }

        caps
    }

    pub(super) fn capability_code(&self) -> ResponseCode {
        ResponseCode {
            name: "CAPABILITY",
            args: self.capabilities().into_iter().map(Value::Atom).collect(),
        }
    }

    /// Return the greeting line to send to the client.
    pub fn greet(&self) -> Response {
        Response::untagged_ok(self.capability_code(), TAGLINE)
    }

    /// Send an untagged response, ignoring errors.
    ///
    /// A closed channel means the connection is going away, which the main
    /// loop notices on its own.
    pub(super) async fn send(&self, response: Response) {
        send_response(&self.output, response, OutputControl::Buffer).await;
    }

    /// Deliver queued notifications which concern the client.
    ///
    /// If the registry cut this connection off because it fell too far
    /// behind, the session ends here after what was queued is delivered.
    pub(super) async fn poll_notifications(&mut self) {
        let mut grew = false;
        let mut cut_off = false;
        loop {
            let notification = match self.notifications.try_recv() {
                Ok(notification) => notification,
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    cut_off = true;
                    break;
                },
            };

            match notification {
                Notification::NewMessage { mailbox, uid } => {
                    if let ProtocolState::Selected(_, ref mut selected) =
                        self.state
                    {
                        if selected.name == mailbox
                            && insert_uid(&mut selected.uids, uid)
                        {
                            grew = true;
                        }
                    }
                },
            }
        }

        if let (true, Some(selected)) = (grew, self.state.selected()) {
            let exists = selected.uids.len() as u64;
            self.send(Response::data(vec![
                Value::Number(exists),
                Value::atom("EXISTS"),
            ]))
            .await;
        }

        if cut_off {
            warn!("{} Missed mailbox updates, closing", self.log_prefix);
            self.state = ProtocolState::Logout;
            self.send(Response::bye("Too many missed mailbox updates"))
                .await;
        }
    }
}

/// Insert `uid` into the sorted `uids`, returning whether it was new.
fn insert_uid(uids: &mut Vec<u32>, uid: u32) -> bool {
    match uids.binary_search(&uid) {
        Ok(_) => false,
        Err(ix) => {
            uids.insert(ix, uid);
            true
        },
    }
}

/// Send a response through `sender`, ignoring errors.
pub(super) async fn send_response(
    sender: &SendResponse,
    response: Response,
    ctl: OutputControl,
) {
    if let Err(mpsc::error::SendError(OutputEvent::ResponseLine {
        response, ..
    })) = sender
        .send(OutputEvent::ResponseLine { response, ctl })
        .await
    {
        response.abort();
    }
}

pub(super) fn success(text: &str) -> CmdResult {
    Ok(Response::status(None, Condition::Ok, None, text))
}

pub(super) fn success_with(code: ResponseCode, text: &str) -> CmdResult {
    Ok(Response::status(None, Condition::Ok, Some(code), text))
}

pub(super) fn bad(text: impl Into<String>) -> Response {
    Response::bad(None, text)
}

pub(super) fn nonexistent() -> Response {
    Response::status(
        None,
        Condition::No,
        Some(ResponseCode::new("NONEXISTENT")),
        "No such mailbox",
    )
}

pub(super) fn catch_all_error_handling(
    log_prefix: &LogPrefix,
    e: Error,
) -> Response {
    error!("{} Unhandled internal error: {}", log_prefix, e);
    Response::status(
        None,
        Condition::No,
        Some(ResponseCode::new("SERVERBUG")),
        "Unexpected error; check server logs for details",
    )
}
