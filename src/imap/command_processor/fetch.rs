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

use std::collections::HashMap;

use futures::stream::StreamExt;
use log::warn;

use super::defs::*;
use crate::imap::fetch_query::{parse_items, FetchItem, FetchQuery};
use crate::imap::parser::{Attribute, ParsedCommand};
use crate::imap::response::{Response, Value};
use crate::imap::sequence;
use crate::imap::services::{FetchRequest, FetchedMessage};
use crate::support::error::Error;

impl CommandProcessor {
    pub(super) async fn cmd_fetch(
        &mut self,
        command: &ParsedCommand,
        by_uid: bool,
    ) -> CmdResult {
        let (sequence_set, items, modifiers) = match command.attributes[..] {
            [ref seq, ref items] => (seq, items, None),
            [ref seq, ref items, Attribute::List(ref modifiers)] => {
                (seq, items, Some(&modifiers[..]))
            },
            _ => return Err(bad("Invalid arguments for FETCH")),
        };

        let sequence_set = sequence_set
            .as_text()
            .filter(|raw| sequence::is_valid(raw))
            .ok_or_else(|| bad("Invalid sequence set"))?;
        let mut queries = parse_items(items).map_err(bad)?;
        let changed_since =
            modifiers.map(parse_modifiers).transpose()?.flatten();

        if changed_since.is_some() {
            self.enable_condstore();
        }

        let selected = selected!(self)?;
        let mark_as_seen =
            !selected.read_only && queries.iter().any(FetchQuery::marks_seen);

        // Items the client must see even if it did not ask for them.
        if mark_as_seen {
            require(&mut queries, FetchItem::Flags, "FLAGS");
        }
        if by_uid {
            require(&mut queries, FetchItem::Uid, "UID");
        }
        if changed_since.is_some() {
            require(&mut queries, FetchItem::ModSeq, "MODSEQ");
        }

        let messages = sequence::get_messages(
            &sequence_set,
            &selected.uids,
            by_uid,
        )
        .ok_or_else(|| bad("Invalid sequence set"))?;
        if messages.is_empty() {
            return success("FETCH completed");
        }

        let seqnums = messages
            .iter()
            .map(|&(seqnum, uid)| (uid, seqnum))
            .collect::<HashMap<_, _>>();
        let request = FetchRequest {
            mailbox: selected.name.clone(),
            queries: queries.clone(),
            mark_as_seen,
            message_uids: messages.iter().map(|&(_, uid)| uid).collect(),
            changed_since,
        };
        let session = selected.session.clone();

        let service = self
            .context
            .services
            .fetch
            .clone()
            .ok_or_else(|| bad("Not implemented"))?;
        let mut results = service
            .on_fetch(&session, request)
            .await
            .map_err(map_error!(self))?;

        while let Some(result) = results.next().await {
            let message = result.map_err(map_error!(self))?;
            let Some(&seqnum) = seqnums.get(&message.uid) else {
                warn!(
                    "{} Fetch service returned unrequested UID {}",
                    self.log_prefix, message.uid
                );
                message.values.iter().for_each(Value::abort);
                continue;
            };

            let response = fetch_response(seqnum, &queries, message)
                .map_err(|msg| {
                    catch_all_error_handling(
                        &self.log_prefix,
                        Error::ServiceFailure(msg),
                    )
                })?;

            if self.output.is_closed() {
                response.abort();
                break;
            }
            self.send(response).await;
        }

        success("FETCH completed")
    }
}

/// Parse the FETCH modifier list, returning the CHANGEDSINCE value if
/// present.
fn parse_modifiers(modifiers: &[Attribute]) -> PartialResult<Option<u64>> {
    let mut changed_since = None;
    let mut modifiers = modifiers.iter();
    while let Some(modifier) = modifiers.next() {
        if modifier.is_atom("CHANGEDSINCE") {
            changed_since = Some(
                modifiers
                    .next()
                    .and_then(Attribute::as_number)
                    .ok_or_else(|| bad("CHANGEDSINCE needs a number"))?,
            );
        } else {
            return Err(bad(format!("Unknown FETCH modifier {}", modifier)));
        }
    }

    Ok(changed_since)
}

/// Add `item` unless the client asked for it.
///
/// Responses list the requested items in request order, followed by the
/// forced ones in the order FLAGS, UID, MODSEQ.
fn require(queries: &mut Vec<FetchQuery>, item: FetchItem, name: &str) {
    if !queries.iter().any(|q| q.item == item) {
        queries.push(FetchQuery::simple(item, name));
    }
}

/// Build `* seqnum FETCH (name value ...)`.
fn fetch_response(
    seqnum: u32,
    queries: &[FetchQuery],
    message: FetchedMessage,
) -> Result<Response, String> {
    if message.values.len() != queries.len() {
        let msg = format!(
            "Fetch service returned {} values for {} items of UID {}",
            message.values.len(),
            queries.len(),
            message.uid
        );
        message.values.iter().for_each(Value::abort);
        return Err(msg);
    }

    let mut pairs = Vec::with_capacity(queries.len() * 2);
    for (query, value) in queries.iter().zip(message.values) {
        pairs.push(Value::Atom(query.name.clone()));
        pairs.push(value);
    }

    Ok(Response::data(vec![
        Value::Number(seqnum.into()),
        Value::atom("FETCH"),
        Value::List(pairs),
    ]))
}
