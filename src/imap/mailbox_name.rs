//-
// Copyright (c) 2026, The Mailroom developers
//
// This file is part of Mailroom.
//
// Mailroom is free software: you can  redistribute it and/or modify it under the
// terms of  the GNU General Public  License as published by  the Free Software
// Foundation, either version  3 of the License, or (at  your option) any later
// version.
//
// Mailroom is distributed  in the hope that  it will be useful,  but WITHOUT ANY
// WARRANTY; without  even the implied  warranty of MERCHANTABILITY  or FITNESS
// FOR  A PARTICULAR  PURPOSE.  See the  GNU General  Public  License for  more
// details.
//
// You should have received a copy of the GNU General Public License along with
// Mailroom. If not, see <http://www.gnu.org/licenses/>.

use std::borrow::Cow;

use crate::mime::utf7;

/// The hierarchy delimiter of mailbox names.
pub const DELIMITER: char = '/';

/// A mailbox name as received on the wire.
///
/// Clients encode non-ASCII names in modified UTF-7 (RFC 3501 §5.1.3), so
/// the wire form and the name the services see can differ.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct MailboxName<'a> {
    /// The possibly M-UTF7 string representation of this name.
    pub raw: Cow<'a, str>,
}

impl<'a> MailboxName<'a> {
    /// Construct a new `MailboxName` in wire format.
    pub fn of_wire(wire_name: Cow<'a, str>) -> Self {
        MailboxName { raw: wire_name }
    }

    /// Return the UTF-8 representation of this `MailboxName`.
    pub fn get_utf8(&self) -> Cow<'_, str> {
        utf7::decode(&self.raw)
    }

    /// Return the name the services know the mailbox by.
    ///
    /// This is the UTF-8 name, with a leading `INBOX` segment in any case
    /// spelled `INBOX`. Other segments keep their case, so `inbox/Foo`
    /// becomes `INBOX/Foo`.
    pub fn normalized(&self) -> String {
        normalize(&self.get_utf8())
    }
}

/// Case-fold a leading `INBOX` segment of `name`.
pub fn normalize(name: &str) -> String {
    let (first, rest) = match name.find(DELIMITER) {
        Some(ix) => name.split_at(ix),
        None => (name, ""),
    };

    if first.eq_ignore_ascii_case("INBOX") {
        format!("INBOX{}", rest)
    } else {
        name.to_owned()
    }
}
