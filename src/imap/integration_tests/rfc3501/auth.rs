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

use super::super::defs::*;

#[tokio::test]
async fn login_and_state_changes() {
    let setup = set_up();
    let mut client = setup.connect("3501auls");
    client.skip_greeting().await;

    assert_eq!(
        vec!["1 BAD Command not allowed in this state"],
        client.command("1 SELECT INBOX").await
    );

    client
        .write_raw(b"2 LOGIN azure hunter2\r\n")
        .await;
    client
        .receive_line_like(r#"^2 OK \[CAPABILITY IMAP4rev1 .*\] User login$"#)
        .await;

    assert_eq!(
        vec!["3 BAD Command not allowed in this state"],
        client.command("3 LOGIN azure hunter2").await
    );
    assert_eq!(
        vec!["4 BAD Command not allowed in this state"],
        client.command("4 FETCH 1 FLAGS").await
    );
}

#[tokio::test]
async fn bad_credentials() {
    let setup = set_up();
    let mut client = setup.connect("3501aubc");
    client.skip_greeting().await;

    assert_eq!(
        vec!["1 NO [AUTHENTICATIONFAILED] Bad user id or password"],
        client.command("1 LOGIN azure hunter3").await
    );
    assert_eq!(
        vec!["2 NO [AUTHENTICATIONFAILED] Bad user id or password"],
        client.command("2 LOGIN \"\" \"\"").await
    );

    // Still not logged in
    assert_eq!(
        vec!["3 BAD Command not allowed in this state"],
        client.command("3 LIST \"\" *").await
    );

    client.ok_command("4 LOGIN \"azure\" \"hunter2\"").await;
    assert!(!client.ok_command("5 LIST \"\" *").await.is_empty());
}
