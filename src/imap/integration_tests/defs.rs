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
use std::time::Duration;

use chrono::prelude::*;
use lazy_static::lazy_static;
use regex::Regex;
use tokio::io::{
    AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, DuplexStream,
    ReadHalf, WriteHalf,
};

use crate::account::memory::MemoryStore;
use crate::imap::connection::run_connection;
use crate::imap::server::Server;
use crate::imap::services::Services;
use crate::support::system_config::SystemConfig;
use crate::test_data::*;

/// How long a test waits for the server before giving up.
const PATIENCE: Duration = Duration::from_secs(10);

pub struct Setup {
    pub server: Server,
    pub store: Arc<MemoryStore>,
}

/// Create a server whose store has the user `azure` (password `hunter2`),
/// with `SIMPLE` (seen), `MULTIPART_MIXED` and `ALTERNATIVE` in `INBOX`.
pub fn set_up() -> Setup {
    set_up_with(SystemConfig::default())
}

pub fn set_up_with(config: SystemConfig) -> Setup {
    crate::init_test_log();

    let store = Arc::new(MemoryStore::new());
    store.add_user("azure", "hunter2").unwrap();
    deliver(&store, SIMPLE, &["\\Seen"]);
    deliver(&store, MULTIPART_MIXED, &[]);
    deliver(&store, ALTERNATIVE, &[]);

    let server = Server::new(
        Arc::new(config),
        Services::all(Arc::clone(&store)),
    );
    store.set_notifier(server.notifier());

    Setup { server, store }
}

pub fn deliver(store: &MemoryStore, message: &[u8], flags: &[&str]) -> u32 {
    let date = FixedOffset::east_opt(3600)
        .unwrap()
        .with_ymd_and_hms(2020, 7, 4, 16, 31, 0)
        .unwrap();
    store.deliver("azure", "INBOX", message, date, flags).unwrap()
}

impl Setup {
    pub fn connect(&self, name: &str) -> TestClient {
        let (client, server) = tokio::io::duplex(65536);
        tokio::spawn(run_connection(
            server,
            self.server.context(),
            name.to_owned(),
        ));

        let (read, write) = tokio::io::split(client);
        TestClient {
            read: BufReader::new(read),
            write,
        }
    }
}

pub struct TestClient {
    read: BufReader<ReadHalf<DuplexStream>>,
    write: WriteHalf<DuplexStream>,
}

impl TestClient {
    pub async fn write_raw(&mut self, data: &[u8]) {
        self.write.write_all(data).await.unwrap();
    }

    /// Read one physical line, without the line ending.
    pub async fn read_line(&mut self) -> String {
        let mut line = Vec::new();
        let n = tokio::time::timeout(
            PATIENCE,
            self.read.read_until(b'\n', &mut line),
        )
        .await
        .expect("Timed out waiting for the server")
        .unwrap();
        assert!(n > 0, "Unexpected EOF");

        while matches!(line.last(), Some(b'\r' | b'\n')) {
            line.pop();
        }
        String::from_utf8_lossy(&line).into_owned()
    }

    /// Read one response, with the data of any literals inline.
    pub async fn read_logical_line(&mut self) -> String {
        lazy_static! {
            static ref LITERAL: Regex = Regex::new(r"\{([0-9]+)\}$").unwrap();
        }

        let mut logical = String::new();
        loop {
            let line = self.read_line().await;
            logical.push_str(&line);

            let Some(len) = LITERAL
                .captures(&line)
                .and_then(|c| c[1].parse::<usize>().ok())
            else {
                return logical;
            };

            let mut data = vec![0u8; len];
            tokio::time::timeout(PATIENCE, self.read.read_exact(&mut data))
                .await
                .expect("Timed out waiting for literal")
                .unwrap();
            logical.push_str("\r\n");
            logical.push_str(&String::from_utf8_lossy(&data));
        }
    }

    /// Read responses up to and including the one tagged `tag`.
    pub async fn read_until_tagged(&mut self, tag: &str) -> Vec<String> {
        let prefix = format!("{} ", tag);
        let mut responses = Vec::new();
        loop {
            let line = self.read_logical_line().await;
            let done = line.starts_with(&prefix);
            responses.push(line);
            if done {
                return responses;
            }
        }
    }

    /// Send `line` as a command and collect its responses. The tag is the
    /// first word of `line`.
    pub async fn command(&mut self, line: &str) -> Vec<String> {
        let tag = line.split(' ').next().unwrap().to_owned();
        self.write_raw(format!("{}\r\n", line).as_bytes()).await;
        self.read_until_tagged(&tag).await
    }

    /// Like `command()`, but assert that the command succeeded and return
    /// only the untagged responses.
    pub async fn ok_command(&mut self, line: &str) -> Vec<String> {
        let mut responses = self.command(line).await;
        let tagged = responses.pop().unwrap();
        let tag = line.split(' ').next().unwrap();
        assert!(
            tagged.starts_with(&format!("{} OK ", tag)),
            "Command {:?} failed: {:?}",
            line,
            tagged
        );
        responses
    }

    pub async fn receive_line_like(&mut self, pat: &str) {
        let line = self.read_logical_line().await;
        assert!(
            Regex::new(pat).unwrap().is_match(&line),
            "Expected\n\
             match: {:?}\n\
             Got:   {:?}\n",
            pat,
            line
        );
    }

    pub async fn skip_greeting(&mut self) {
        let greeting = self.read_line().await;
        assert!(greeting.starts_with("* OK "), "{:?}", greeting);
    }

    pub async fn quick_log_in(&mut self) {
        self.skip_greeting().await;
        self.ok_command("login LOGIN azure hunter2").await;
    }

    pub async fn quick_select(&mut self, mailbox: &str) -> Vec<String> {
        self.ok_command(&format!("select SELECT {}", mailbox)).await
    }

    /// Assert that the server closes the connection without sending anything
    /// more.
    pub async fn assert_closed(&mut self) {
        let mut rest = Vec::new();
        tokio::time::timeout(PATIENCE, self.read.read_to_end(&mut rest))
            .await
            .expect("Timed out waiting for close")
            .unwrap();
        assert!(
            rest.is_empty(),
            "Unexpected data: {:?}",
            String::from_utf8_lossy(&rest)
        );
    }
}
