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

use log::{info, warn};

use super::defs::*;
use crate::imap::parser::ParsedCommand;
use crate::imap::response::{Condition, Response, ResponseCode};

impl CommandProcessor {
    pub(super) async fn cmd_log_in(
        &mut self,
        command: &ParsedCommand,
    ) -> CmdResult {
        if self.state.login_session().is_some() {
            return Err(bad("Already logged in"));
        }

        let (userid, password) = match command.attributes[..] {
            [ref userid, ref password] => (
                userid.as_text().unwrap_or_default().into_owned(),
                password.as_text().unwrap_or_default().into_owned(),
            ),
            _ => return Err(bad("Invalid arguments for LOGIN")),
        };

        let service = self
            .context
            .services
            .login
            .clone()
            .ok_or_else(|| bad("Not implemented"))?;
        let session = service
            .on_login(&userid, &password)
            .await
            .map_err(map_error!(self))?
            .ok_or_else(|| {
                // Logins with an empty password, or with the password typed
                // into the username field, are not remarkable.
                if !password.is_empty() && password != userid {
                    warn!(
                        "{} Rejected login for user '{}'",
                        self.log_prefix, userid
                    );
                }

                Response::status(
                    None,
                    Condition::No,
                    Some(ResponseCode::new("AUTHENTICATIONFAILED")),
                    "Bad user id or password",
                )
            })?;

        self.log_prefix.set_user(session.user.clone());
        info!("{} Login successful", self.log_prefix);

        self.context
            .registry
            .attach_user(self.connection_id, &session.user);
        self.state = ProtocolState::Authenticated(session);

        success_with(self.capability_code(), "User login")
    }
}
