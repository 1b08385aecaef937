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

//! The services through which the protocol engine reaches storage and
//! authentication.
//!
//! Each service is optional. A verb whose service is absent answers
//! `BAD Not implemented`; which services exist is fixed when the server is
//! constructed.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;

use super::fetch_query::FetchQuery;
use super::response::Value;
use crate::support::error::Error;

/// The identity of an authenticated user, as defined by the login service.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub user: String,
    /// Anything else the services want to carry between calls.
    pub properties: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectResult {
    /// Replaces the connection's session if set.
    pub session: Option<Session>,
    pub flags: Vec<String>,
    pub permanent_flags: Vec<String>,
    pub uid_validity: u32,
    pub uid_next: u32,
    pub unseen: Option<u32>,
    pub recent: Option<u32>,
    pub highest_mod_seq: Option<u64>,
    pub read_only: bool,
    /// The UIDs of the messages in the mailbox, ascending. Sequence numbers
    /// are positions in this list and `EXISTS` is its length.
    pub uids: Vec<u32>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatusResult {
    pub messages: u32,
    pub recent: u32,
    pub uid_next: u32,
    pub uid_validity: u32,
    pub unseen: u32,
    pub highest_mod_seq: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub reference: String,
    /// The mailbox pattern, which may contain `*` and `%`.
    pub mailbox: String,
    /// Upper-cased selection options.
    pub selection: Vec<String>,
    /// Upper-cased return options.
    pub returns: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MailboxInfo {
    pub path: String,
    /// E.g. `\Sent`.
    pub special_use: Option<String>,
    pub attributes: Vec<String>,
}

pub struct FetchRequest {
    pub mailbox: String,
    pub queries: Vec<FetchQuery>,
    pub mark_as_seen: bool,
    pub message_uids: Vec<u32>,
    pub changed_since: Option<u64>,
}

/// The values of one message, one per query in request order.
#[derive(Debug)]
pub struct FetchedMessage {
    pub uid: u32,
    pub values: Vec<Value>,
}

pub type FetchStream = BoxStream<'static, Result<FetchedMessage, Error>>;

#[async_trait]
pub trait LoginService: Send + Sync {
    /// Returns `None` if the credentials are not accepted.
    async fn on_login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<Session>, Error>;
}

#[async_trait]
pub trait SelectService: Send + Sync {
    /// Returns `None` if the mailbox does not exist.
    async fn on_select(
        &self,
        session: &Session,
        mailbox: &str,
    ) -> Result<Option<SelectResult>, Error>;
}

#[async_trait]
pub trait StatusService: Send + Sync {
    /// Returns `None` if the mailbox does not exist.
    async fn on_status(
        &self,
        session: &Session,
        mailbox: &str,
    ) -> Result<Option<StatusResult>, Error>;
}

#[async_trait]
pub trait ListService: Send + Sync {
    async fn on_list(
        &self,
        session: &Session,
        query: &ListQuery,
    ) -> Result<Vec<MailboxInfo>, Error>;
}

#[async_trait]
pub trait FetchService: Send + Sync {
    /// Produce the requested values for every message in
    /// `request.message_uids` which still exists.
    ///
    /// The stream is consumed as the responses are written, so it should
    /// produce messages lazily.
    async fn on_fetch(
        &self,
        session: &Session,
        request: FetchRequest,
    ) -> Result<FetchStream, Error>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceKind {
    Login,
    Select,
    Status,
    List,
    Fetch,
}

/// The set of services a server was built with.
#[derive(Clone, Default)]
pub struct Services {
    pub login: Option<Arc<dyn LoginService>>,
    pub select: Option<Arc<dyn SelectService>>,
    pub status: Option<Arc<dyn StatusService>>,
    pub list: Option<Arc<dyn ListService>>,
    pub fetch: Option<Arc<dyn FetchService>>,
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Services({:?})", self.availability())
    }
}

impl Services {
    /// Use `backend` for every service.
    pub fn all<
        T: LoginService
            + SelectService
            + StatusService
            + ListService
            + FetchService
            + 'static,
    >(
        backend: Arc<T>,
    ) -> Self {
        Services {
            login: Some(backend.clone()),
            select: Some(backend.clone()),
            status: Some(backend.clone()),
            list: Some(backend.clone()),
            fetch: Some(backend),
        }
    }

    pub fn availability(&self) -> Availability {
        Availability {
            login: self.login.is_some(),
            select: self.select.is_some(),
            status: self.status.is_some(),
            list: self.list.is_some(),
            fetch: self.fetch.is_some(),
        }
    }
}

/// Which services exist, computed once when the server is built.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Availability {
    login: bool,
    select: bool,
    status: bool,
    list: bool,
    fetch: bool,
}

impl Availability {
    pub fn has(&self, kind: ServiceKind) -> bool {
        match kind {
            ServiceKind::Login => self.login,
            ServiceKind::Select => self.select,
            ServiceKind::Status => self.status,
            ServiceKind::List => self.list,
            ServiceKind::Fetch => self.fetch,
        }
    }
}
