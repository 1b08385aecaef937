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

use crate::mime::encoded_word::decode_words;
use crate::mime::header::{Address, Mailbox, ParsedHeader};

/// The `ENVELOPE` structure defined by RFC 3501, in the order the fields are
/// to be sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Envelope {
    /// The `Date` header, verbatim.
    pub date: Option<String>,
    /// The `Subject` header, decoded.
    pub subject: Option<String>,
    /// The `From` header.
    ///
    /// RFC 3501 says this can never be NIL, but messages without an
    /// intelligible `From` exist, and for them it is.
    pub from: Vec<EnvelopeAddress>,
    /// The `Sender` header, or a copy of `from` if absent.
    pub sender: Vec<EnvelopeAddress>,
    /// The `Reply-To` header, or a copy of `from` if absent.
    pub reply_to: Vec<EnvelopeAddress>,
    pub to: Vec<EnvelopeAddress>,
    pub cc: Vec<EnvelopeAddress>,
    pub bcc: Vec<EnvelopeAddress>,
    pub in_reply_to: Option<String>,
    pub message_id: Option<String>,
}

/// An address, or a group delimiter, in an `ENVELOPE`.
///
/// RFC 3501 flattens groups: a group is opened by an entry whose `local`
/// is the group name and whose `domain` is `None`, and closed by an entry
/// with neither.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvelopeAddress {
    /// The display name, decoded.
    pub name: Option<String>,
    pub local: Option<String>,
    pub domain: Option<String>,
}

impl Envelope {
    pub fn from_header(header: &ParsedHeader) -> Self {
        let nonempty = |name: &str| {
            header
                .first(name)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
        };
        let addresses = |name: &str| flatten(header.addresses(name));

        let from = addresses("from");
        let mut sender = addresses("sender");
        if sender.is_empty() {
            sender = from.clone();
        }
        let mut reply_to = addresses("reply-to");
        if reply_to.is_empty() {
            reply_to = from.clone();
        }

        Envelope {
            date: nonempty("date"),
            subject: nonempty("subject").map(|s| decode_words(&s).into_owned()),
            from,
            sender,
            reply_to,
            to: addresses("to"),
            cc: addresses("cc"),
            bcc: addresses("bcc"),
            in_reply_to: nonempty("in-reply-to"),
            message_id: nonempty("message-id"),
        }
    }
}

fn flatten(addresses: &[Address]) -> Vec<EnvelopeAddress> {
    let mut out = Vec::new();
    for address in addresses {
        match *address {
            Address::Mailbox(ref mailbox) => out.push(convert(mailbox)),
            Address::Group {
                ref name,
                ref members,
            } => {
                out.push(EnvelopeAddress {
                    name: None,
                    local: Some(decode_words(name).into_owned()),
                    domain: None,
                });
                out.extend(members.iter().map(convert));
                out.push(EnvelopeAddress::default());
            },
        }
    }
    out
}

fn convert(mailbox: &Mailbox) -> EnvelopeAddress {
    EnvelopeAddress {
        name: mailbox
            .name
            .as_deref()
            .map(|n| decode_words(n).into_owned()),
        local: Some(mailbox.local.clone()),
        // A bare local part still needs a non-NIL host so that clients do
        // not read it as a group delimiter.
        domain: Some(mailbox.domain.clone().unwrap_or_default()),
    }
}
