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

use log::info;

use super::defs::*;
use crate::imap::command::Command;
use crate::imap::command_table::{lookup, validate};
use crate::imap::parser::{parse_command, Attribute, ParsedCommand};
use crate::imap::response::{Condition, Response, Value};
use crate::imap::response_writer::OutputControl;

impl CommandProcessor {
    /// Handles a command which the request reader has already admitted.
    ///
    /// Untagged responses are sent as they become available; the tagged
    /// response is always sent last. If the command was `LOGOUT`, the
    /// connection will be closed after sending it.
    pub async fn handle_command(&mut self, command: Command) {
        let tag = command.tag.clone();
        let response = self.run_command(command).await;
        let response = match response {
            Ok(r) | Err(r) => r.tagged(&tag),
        };

        // Notifications are only delivered between commands, right before
        // the tagged response.
        if !self.logged_out() {
            self.poll_notifications().await;
        }

        let ctl = if self.logged_out() {
            OutputControl::Disconnect
        } else {
            OutputControl::Flush
        };
        send_response(&self.output, response, ctl).await;
    }

    async fn run_command(&mut self, command: Command) -> CmdResult {
        let meta = lookup(&command.verb).ok_or_else(|| bad("Unknown command"))?;
        let command = parse_command(command).map_err(|message| {
            Response::status(None, Condition::No, None, message)
        })?;
        validate(meta, &command.attributes)?;

        match meta.verb {
            "CAPABILITY" => self.cmd_capability().await,
            "NOOP" => success("NOOP completed"),
            "CHECK" => success("CHECK completed"),
            "LOGOUT" => self.cmd_log_out().await,
            "ID" => self.cmd_id(&command).await,
            "LOGIN" => self.cmd_log_in(&command).await,
            "ENABLE" => self.cmd_enable(&command).await,
            "SELECT" => self.cmd_select(&command, false).await,
            "EXAMINE" => self.cmd_select(&command, true).await,
            "STATUS" => self.cmd_status(&command).await,
            "LIST" => self.cmd_list(&command).await,
            "UNSELECT" => self.cmd_unselect("UNSELECT completed"),
            "CLOSE" => self.cmd_unselect("CLOSE completed"),
            "FETCH" => self.cmd_fetch(&command, false).await,
            "UID FETCH" => self.cmd_fetch(&command, true).await,
            _ => Err(bad("Not implemented")),
        }
    }

    async fn cmd_capability(&mut self) -> CmdResult {
        let mut values = vec![Value::atom("CAPABILITY")];
        values.extend(self.capabilities().into_iter().map(Value::Atom));
        self.send(Response::data(values)).await;
        success("CAPABILITY completed")
    }

    async fn cmd_log_out(&mut self) -> CmdResult {
        self.state = ProtocolState::Logout;
        self.send(Response::bye("Logging out")).await;
        success("LOGOUT completed")
    }

    async fn cmd_id(&mut self, command: &ParsedCommand) -> CmdResult {
        if let Some(params) = command.attributes.first().and_then(Attribute::as_list)
        {
            let mut name = None;
            let mut version = None;
            for pair in params.chunks(2) {
                if let [key, value] = pair {
                    let key = key.as_text().unwrap_or_default();
                    let value = value.as_text().map(|v| v.into_owned());
                    if key.eq_ignore_ascii_case("name") {
                        name = value;
                    } else if key.eq_ignore_ascii_case("version") {
                        version = value;
                    }
                }
            }

            info!(
                "{} Client identified as {}/{}",
                self.log_prefix,
                name.as_deref().unwrap_or("?"),
                version.as_deref().unwrap_or("?")
            );
            self.log_prefix.set_user_agent(name, version);
        } else if !command
            .attributes
            .first()
            .map_or(false, |a| a.is_atom("NIL"))
        {
            return Err(bad("Invalid ID parameters"));
        }

        let mut pairs = vec![
            Value::string("name"),
            Value::string("Mailroom"),
            Value::string("version"),
            Value::string(env!("CARGO_PKG_VERSION")),
        ];
        for (key, value) in &self.context.config.identification {
            pairs.push(Value::string(key.clone()));
            pairs.push(Value::string(value.clone()));
        }

        self.send(Response::data(vec![Value::atom("ID"), Value::List(pairs)]))
            .await;
        success("ID completed")
    }

    async fn cmd_enable(&mut self, command: &ParsedCommand) -> CmdResult {
        let mut enabled = Vec::new();
        for extension in &command.attributes {
            if extension.is_atom("CONDSTORE") {
                if !self.condstore_enabled {
                    enabled.push(Value::atom("CONDSTORE"));
                }
                self.enable_condstore();
            } else {
                info!(
                    "{} Ignoring request to enable {:?}",
                    self.log_prefix, extension
                );
            }
        }

        let mut values = vec![Value::atom("ENABLED")];
        values.extend(enabled);
        self.send(Response::data(values)).await;
        success("ENABLE completed")
    }

    fn cmd_unselect(&mut self, text: &str) -> CmdResult {
        selected!(self)?;
        self.state.deselect();
        self.log_prefix.set_mailbox(None);
        success(text)
    }

    pub(super) fn enable_condstore(&mut self) {
        self.condstore_enabled = true;
        if let ProtocolState::Selected(_, ref mut selected) = self.state {
            selected.condstore = true;
        }
    }
}
