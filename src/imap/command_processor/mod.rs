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

//! Executes parsed commands against the protocol state and the services.

macro_rules! map_error {
    ($this:expr) => {{
        let log_prefix = &$this.log_prefix;
        move |e| catch_all_error_handling(log_prefix, e)
    }};

    ($this:expr, $($($kind:ident)|+ => ($cond:ident, $code:expr),)+) => {{
        let log_prefix = &$this.log_prefix;
        move |e| match e {
            $($(Error::$kind)|* => Response::status(
                None,
                Condition::$cond,
                $code,
                e.to_string(),
            ),)*
            e => catch_all_error_handling(log_prefix, e),
        }
    }};
}

// session! and selected! are macros instead of methods on CommandProcessor
// since there is no way to express that they borrow only one field --- as a
// method, the returned value is considered to borrow the whole
// `CommandProcessor`.
macro_rules! session {
    ($this:expr) => {
        $this
            .state
            .session()
            .ok_or_else(|| Response::bad(None, "Not logged in"))
    };
}

macro_rules! selected {
    ($this:expr) => {
        $this
            .state
            .selected()
            .ok_or_else(|| Response::bad(None, "No mailbox selected"))
    };
}

mod auth;
mod commands;
mod defs;
mod fetch;
mod mailboxes;
#[cfg(test)]
mod test_support;

pub use self::defs::{CommandProcessor, Notification, ServerContext};
