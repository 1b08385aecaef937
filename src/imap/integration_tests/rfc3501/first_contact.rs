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
async fn greeting_goodbye() {
    let setup = set_up();
    let mut client = setup.connect("3501fcgg");

    client
        .receive_line_like(
            r#"^\* OK \[CAPABILITY IMAP4rev1 ID\] Mailroom [0-9]+\.[0-9]+\.[0-9]+ ready$"#,
        )
        .await;

    assert_eq!(
        vec!["* BYE Logging out", "1 OK LOGOUT completed"],
        client.command("1 LOGOUT").await
    );
    client.assert_closed().await;
}

#[tokio::test]
async fn request_capabilities() {
    let setup = set_up();
    let mut client = setup.connect("3501fcrc");
    client.skip_greeting().await;

    assert_eq!(
        vec!["* CAPABILITY IMAP4rev1 ID"],
        client.ok_command("1 CAPABILITY").await
    );

    client.ok_command("2 LOGIN azure hunter2").await;
    let responses = client.ok_command("3 CAPABILITY").await;
    assert_eq!(1, responses.len());
    assert!(responses[0].starts_with("* CAPABILITY IMAP4rev1 ID "));
    assert!(responses[0].contains(" CONDSTORE "));
    assert!(responses[0].ends_with(" APPENDLIMIT=67108864"));
}

#[tokio::test]
async fn noop_and_check() {
    let setup = set_up();
    let mut client = setup.connect("3501fcnc");
    client.quick_log_in().await;

    assert!(client.ok_command("1 NOOP").await.is_empty());
    client.quick_select("INBOX").await;
    assert!(client.ok_command("2 CHECK").await.is_empty());
}

#[tokio::test]
async fn logout_while_selected() {
    let setup = set_up();
    let mut client = setup.connect("3501fcls");
    client.quick_log_in().await;
    client.quick_select("INBOX").await;

    assert_eq!(
        vec!["* BYE Logging out", "1 OK LOGOUT completed"],
        client.command("1 LOGOUT").await
    );
    client.assert_closed().await;
}

#[tokio::test]
async fn blank_lines_are_ignored() {
    let setup = set_up();
    let mut client = setup.connect("3501fcbl");
    client.skip_greeting().await;

    client.write_raw(b"\r\n\r\n").await;
    assert!(client.ok_command("1 NOOP").await.is_empty());
}
