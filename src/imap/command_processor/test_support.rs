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

use async_trait::async_trait;
use chrono::prelude::*;
use tokio::sync::mpsc;

use super::defs::*;
use crate::account::memory::MemoryStore;
use crate::imap::command::Command;
use crate::imap::compiler::compile_streaming;
use crate::imap::response_writer::OutputEvent;
use crate::imap::server::Registry;
use crate::imap::services::{LoginService, Services, Session};
use crate::support::{
    error::Error, log_prefix::LogPrefix, system_config::SystemConfig,
};
use crate::test_data::*;

/// A command processor wired to an in-memory store.
///
/// The store has the user `azure` (password `hunter2`) with three messages in
/// `INBOX`: `SIMPLE` (seen), `MULTIPART_MIXED` and `NESTED_MESSAGE`.
pub struct Fixture {
    pub processor: CommandProcessor,
    pub store: Arc<MemoryStore>,
    output: mpsc::Receiver<OutputEvent>,
}

struct FailingLogin;

#[async_trait]
impl LoginService for FailingLogin {
    async fn on_login(
        &self,
        _username: &str,
        _password: &str,
    ) -> Result<Option<Session>, Error> {
        Err(Error::ServiceFailure("user database unavailable".to_owned()))
    }
}

impl Fixture {
    pub fn new() -> Self {
        let store = populated_store();
        Self::with_services(Services::all(Arc::clone(&store)), store)
    }

    pub fn with_failing_login() -> Self {
        let store = populated_store();
        let services = Services {
            login: Some(Arc::new(FailingLogin)),
            ..Services::all(Arc::clone(&store))
        };
        Self::with_services(services, store)
    }

    pub fn with_services(services: Services, store: Arc<MemoryStore>) -> Self {
        let availability = services.availability();
        let registry = Arc::new(Registry::new());
        let (connection_id, notifications) =
            registry.register("test".to_owned(), 8);
        let context = Arc::new(ServerContext {
            config: Arc::new(SystemConfig::default()),
            services,
            availability,
            registry,
        });

        let (tx, rx) = mpsc::channel(256);
        let processor = CommandProcessor::new(
            LogPrefix::new("test".to_owned()),
            context,
            connection_id,
            tx,
            notifications,
        );

        Fixture {
            processor,
            store,
            output: rx,
        }
    }

    /// Run one command line (without CRLF) and return every line written in
    /// response, without line endings.
    pub async fn run(&mut self, line: &str) -> Vec<String> {
        let command = Command::start(line.as_bytes()).unwrap();
        self.processor.handle_command(command).await;

        let mut lines = Vec::new();
        while let Ok(event) = self.output.try_recv() {
            if let OutputEvent::ResponseLine { response, .. } = event {
                let mut text = Vec::<u8>::new();
                compile_streaming(response)
                    .unwrap()
                    .write_to(&mut text)
                    .await
                    .unwrap();
                let text = String::from_utf8(text).unwrap();
                lines.extend(text.split("\r\n").map(str::to_owned));
                lines.pop();
            }
        }
        lines
    }

    pub async fn login(&mut self) {
        let lines = self.run("login LOGIN azure hunter2").await;
        assert!(lines.last().unwrap().starts_with("login OK"));
    }

    pub async fn select(&mut self, mailbox: &str) -> Vec<String> {
        self.login().await;
        self.run(&format!("sel SELECT {}", mailbox)).await
    }
}

fn populated_store() -> Arc<MemoryStore> {
    let store = MemoryStore::new();
    store.add_user("azure", "hunter2").unwrap();

    let date = FixedOffset::east_opt(0)
        .unwrap()
        .with_ymd_and_hms(2020, 1, 2, 3, 4, 5)
        .unwrap();
    store
        .deliver("azure", "INBOX", SIMPLE, date, &["\\Seen"])
        .unwrap();
    store
        .deliver("azure", "INBOX", MULTIPART_MIXED, date, &[])
        .unwrap();
    store
        .deliver("azure", "INBOX", NESTED_MESSAGE, date, &[])
        .unwrap();
    Arc::new(store)
}
