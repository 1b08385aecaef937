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

#[tokio::test]
async fn unselect() {
    let setup = set_up();
    let mut client = setup.connect("3691unun");
    client.quick_log_in().await;

    assert_eq!(
        vec!["1 BAD Command not allowed in this state"],
        client.command("1 UNSELECT").await
    );

    client.quick_select("INBOX").await;
    assert!(client.ok_command("2 UNSELECT").await.is_empty());
    assert_eq!(
        vec!["3 BAD Command not allowed in this state"],
        client.command("3 FETCH 1 FLAGS").await
    );

    // The login session survives
    assert_eq!(1, client.ok_command("4 STATUS INBOX (MESSAGES)").await.len());
}
