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

use super::defs::*;
use crate::imap::mailbox_name::{MailboxName, DELIMITER};
use crate::imap::parser::{Attribute, ParsedCommand};
use crate::imap::response::{Condition, Response, ResponseCode, Value};
use crate::imap::services::{ListQuery, MailboxInfo, StatusResult};
use crate::support::error::Error;

/// The STATUS data items we know how to answer.
static STATUS_ITEMS: &[&str] = &[
    "MESSAGES",
    "RECENT",
    "UIDNEXT",
    "UIDVALIDITY",
    "UNSEEN",
    "HIGHESTMODSEQ",
];

impl CommandProcessor {
    pub(super) async fn cmd_select(
        &mut self,
        command: &ParsedCommand,
        examine: bool,
    ) -> CmdResult {
        let name = mailbox_arg(command.attributes.first())?;

        let mut condstore = self.condstore_enabled;
        if let Some(params) =
            command.attributes.get(1).and_then(Attribute::as_list)
        {
            for param in params {
                if param.is_atom("CONDSTORE") {
                    condstore = true;
                } else {
                    return Err(bad("Unknown SELECT parameter"));
                }
            }
        }

        // Whatever happens next, the old selection is gone.
        self.state.deselect();
        self.log_prefix.set_mailbox(None);
        let session = session!(self)?.clone();

        let service = self
            .context
            .services
            .select
            .clone()
            .ok_or_else(|| bad("Not implemented"))?;
        let result = service
            .on_select(&session, &name)
            .await
            .map_err(map_error! {
                self,
                NoSuchMailbox => (No, Some(ResponseCode::new("NONEXISTENT"))),
            })?
            .ok_or_else(nonexistent)?;

        if condstore {
            self.condstore_enabled = true;
        }

        let read_only = examine || result.read_only;
        let exists = result.uids.len() as u64;

        self.send(Response::data(vec![
            Value::atom("FLAGS"),
            Value::atoms(result.flags.iter().cloned()),
        ]))
        .await;
        self.send(Response::untagged_ok(
            ResponseCode::with(
                "PERMANENTFLAGS",
                Value::atoms(result.permanent_flags.iter().cloned()),
            ),
            "Flags permitted",
        ))
        .await;
        self.send(Response::untagged_ok(
            ResponseCode::with(
                "UIDVALIDITY",
                Value::Number(result.uid_validity.into()),
            ),
            "UIDs valid",
        ))
        .await;
        self.send(Response::untagged_ok(
            ResponseCode::with("UIDNEXT", Value::Number(result.uid_next.into())),
            "Predicted next UID",
        ))
        .await;
        self.send(Response::data(vec![
            Value::Number(exists),
            Value::atom("EXISTS"),
        ]))
        .await;
        if let Some(unseen) = result.unseen {
            self.send(Response::untagged_ok(
                ResponseCode::with("UNSEEN", Value::Number(unseen.into())),
                "First unseen message",
            ))
            .await;
        }
        self.send(Response::data(vec![
            Value::Number(result.recent.unwrap_or(0).into()),
            Value::atom("RECENT"),
        ]))
        .await;
        match result.highest_mod_seq {
            Some(modseq) => {
                self.send(Response::untagged_ok(
                    ResponseCode::with("HIGHESTMODSEQ", Value::Number(modseq)),
                    "Highest",
                ))
                .await
            },
            None if condstore => {
                self.send(Response::untagged_ok(
                    ResponseCode::new("NOMODSEQ"),
                    "No permanent modification sequences",
                ))
                .await
            },
            None => (),
        }

        self.log_prefix.set_mailbox(Some(name.clone()));
        self.state = ProtocolState::Selected(
            session.clone(),
            SelectedMailbox {
                name,
                read_only,
                condstore,
                session: result.session.unwrap_or(session),
                uids: result.uids,
            },
        );

        let text = if examine {
            "EXAMINE completed"
        } else {
            "SELECT completed"
        };
        let code = if read_only { "READ-ONLY" } else { "READ-WRITE" };
        success_with(ResponseCode::new(code), text)
    }

    pub(super) async fn cmd_status(
        &mut self,
        command: &ParsedCommand,
    ) -> CmdResult {
        let name = mailbox_arg(command.attributes.first())?;

        let mut items = Vec::new();
        for item in command
            .attributes
            .get(1)
            .and_then(Attribute::as_list)
            .unwrap_or(&[])
        {
            let item = item
                .as_text()
                .map(|s| s.to_ascii_uppercase())
                .filter(|s| STATUS_ITEMS.contains(&s.as_str()))
                .ok_or_else(|| {
                    bad(format!("Unknown status item {}", item))
                })?;
            items.push(item);
        }

        if items.iter().any(|item| "HIGHESTMODSEQ" == item) {
            self.enable_condstore();
        }

        let session = session!(self)?.clone();
        let service = self
            .context
            .services
            .status
            .clone()
            .ok_or_else(|| bad("Not implemented"))?;
        let status = service
            .on_status(&session, &name)
            .await
            .map_err(map_error! {
                self,
                NoSuchMailbox => (No, Some(ResponseCode::new("NONEXISTENT"))),
            })?
            .ok_or_else(nonexistent)?;

        let mut values = Vec::with_capacity(items.len() * 2);
        for item in items {
            let value = status_value(&status, &item);
            values.push(Value::Atom(item));
            values.push(Value::Number(value));
        }

        self.send(Response::data(vec![
            Value::atom("STATUS"),
            Value::Mailbox(name),
            Value::List(values),
        ]))
        .await;
        success("STATUS completed")
    }

    pub(super) async fn cmd_list(
        &mut self,
        command: &ParsedCommand,
    ) -> CmdResult {
        let mut args = command.attributes.iter().peekable();

        let selection = match args.peek() {
            Some(Attribute::List(options)) => {
                args.next();
                list_options(options)?
            },
            _ => Vec::new(),
        };

        let reference = args.next().and_then(Attribute::as_text);
        let pattern = args.next().and_then(Attribute::as_text);
        let (reference, pattern) = match (reference, pattern) {
            (Some(r), Some(p)) => (
                MailboxName::of_wire(r).get_utf8().into_owned(),
                MailboxName::of_wire(p).get_utf8().into_owned(),
            ),
            _ => return Err(bad("Invalid arguments for LIST")),
        };

        let returns = match (args.next(), args.next()) {
            (None, None) => Vec::new(),
            (Some(ret), Some(Attribute::List(options)))
                if ret.is_atom("RETURN") =>
            {
                list_options(options)?
            },
            _ => return Err(bad("Invalid LIST return options")),
        };

        if pattern.is_empty() {
            // RFC 3501 asks for the hierarchy delimiter and the root of the
            // reference name.
            self.send(list_response(&MailboxInfo {
                path: String::new(),
                special_use: None,
                attributes: vec!["\\Noselect".to_owned()],
            }))
            .await;
            return success("LIST completed");
        }

        let session = session!(self)?.clone();
        let service = self
            .context
            .services
            .list
            .clone()
            .ok_or_else(|| bad("Not implemented"))?;
        let only_special_use = selection.iter().any(|s| "SPECIAL-USE" == s);
        let query = ListQuery {
            reference,
            mailbox: pattern,
            selection,
            returns,
        };
        let mailboxes = service
            .on_list(&session, &query)
            .await
            .map_err(map_error!(self))?;

        for mailbox in mailboxes {
            if only_special_use && mailbox.special_use.is_none() {
                continue;
            }
            self.send(list_response(&mailbox)).await;
        }

        success("LIST completed")
    }
}

/// Extract and normalise a mailbox name argument.
fn mailbox_arg(attr: Option<&Attribute>) -> PartialResult<String> {
    attr.and_then(Attribute::as_text)
        .map(|raw| MailboxName::of_wire(raw).normalized())
        .ok_or_else(|| bad("Missing mailbox name"))
}

/// LIST-EXTENDED options. Only SPECIAL-USE is supported.
fn list_options(options: &[Attribute]) -> PartialResult<Vec<String>> {
    options
        .iter()
        .map(|option| {
            if option.is_atom("SPECIAL-USE") {
                Ok("SPECIAL-USE".to_owned())
            } else {
                Err(bad(format!("Unsupported LIST option {}", option)))
            }
        })
        .collect()
}

fn list_response(mailbox: &MailboxInfo) -> Response {
    let attributes = mailbox
        .attributes
        .iter()
        .chain(mailbox.special_use.iter())
        .cloned();

    Response::data(vec![
        Value::atom("LIST"),
        Value::atoms(attributes),
        Value::string(DELIMITER.to_string()),
        Value::Mailbox(mailbox.path.clone()),
    ])
}

fn status_value(status: &StatusResult, item: &str) -> u64 {
    match item {
        "MESSAGES" => status.messages.into(),
        "RECENT" => status.recent.into(),
        "UIDNEXT" => status.uid_next.into(),
        "UIDVALIDITY" => status.uid_validity.into(),
        "UNSEEN" => status.unseen.into(),
        _ => status.highest_mod_seq,
    }
}
