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

use std::fmt;
use std::sync::{Arc, Mutex};

/// The text put at the start of every log statement about one connection.
///
/// It starts out as just the protocol and peer, and picks up the user, the
/// selected mailbox and the client's self-identification as the session
/// learns them. Clones share the same underlying data, so the command
/// processor and the connection driver always log the same prefix.
#[derive(Clone)]
pub struct LogPrefix {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    connection: String,
    user: Option<String>,
    mailbox: Option<String>,
    client: Option<(String, String)>,
}

impl LogPrefix {
    pub fn new(connection: String) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                connection,
                ..Inner::default()
            })),
        }
    }

    pub fn set_user(&self, user: String) {
        self.update(|inner| inner.user = Some(sanitise(user)));
    }

    /// Record the selected mailbox, or `None` when nothing is selected.
    pub fn set_mailbox(&self, mailbox: Option<String>) {
        self.update(|inner| inner.mailbox = mailbox.map(sanitise));
    }

    /// Record what the client said about itself in `ID`.
    pub fn set_user_agent(
        &self,
        name: Option<String>,
        version: Option<String>,
    ) {
        self.update(|inner| {
            inner.client = if name.is_none() && version.is_none() {
                None
            } else {
                Some((
                    name.map_or_else(|| "?".to_owned(), sanitise),
                    version.map_or_else(|| "?".to_owned(), sanitise),
                ))
            };
        });
    }

    fn update(&self, f: impl FnOnce(&mut Inner)) {
        if let Ok(mut inner) = self.inner.lock() {
            f(&mut inner);
        }
    }
}

impl fmt::Display for LogPrefix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let inner = match self.inner.lock() {
            Ok(inner) => inner,
            Err(_) => return write!(f, "<poisoned>"),
        };

        write!(f, "{}", inner.connection)?;

        let mut parts = Vec::with_capacity(3);
        if let Some(ref user) = inner.user {
            parts.push(user.clone());
        }
        if let Some(ref mailbox) = inner.mailbox {
            parts.push(format!("mbox={}", mailbox));
        }
        if let Some((ref name, ref version)) = inner.client {
            parts.push(format!("client={}/{}", name, version));
        }

        if !parts.is_empty() {
            write!(f, "[{}]", parts.join(" "))?;
        }
        Ok(())
    }
}

/// Strip control characters and cap the length of a client-supplied value
/// so it cannot forge or flood log lines.
fn sanitise(mut s: String) -> String {
    s.retain(|c| !c.is_control());
    if let Some((end, _)) = s.char_indices().nth(64) {
        s.truncate(end);
    }
    s
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn prefix_accumulates_session_facts() {
        let prefix = LogPrefix::new("imaps:127.0.0.1:1".to_owned());
        assert_eq!("imaps:127.0.0.1:1", prefix.to_string());

        prefix.set_user("azure\r\n".to_owned());
        assert_eq!("imaps:127.0.0.1:1[azure]", prefix.to_string());

        let clone = prefix.clone();
        clone.set_mailbox(Some("INBOX".to_owned()));
        clone.set_user_agent(Some("Thunderbird".to_owned()), None);
        assert_eq!(
            "imaps:127.0.0.1:1[azure mbox=INBOX client=Thunderbird/?]",
            prefix.to_string()
        );

        prefix.set_mailbox(None);
        prefix.set_user_agent(None, None);
        assert_eq!("imaps:127.0.0.1:1[azure]", clone.to_string());
    }

    #[test]
    fn long_values_are_truncated() {
        let prefix = LogPrefix::new("imaps".to_owned());
        prefix.set_mailbox(Some("x".repeat(100)));
        assert_eq!(
            format!("imaps[mbox={}]", "x".repeat(64)),
            prefix.to_string()
        );
    }
}
