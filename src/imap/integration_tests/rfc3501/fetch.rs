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
use crate::test_data::*;

#[tokio::test]
async fn fetch_attributes() {
    let setup = set_up();
    let mut client = setup.connect("3501fefa");
    client.quick_log_in().await;
    client.quick_select("INBOX").await;

    assert_eq!(
        vec![format!(
            "* 1 FETCH (FLAGS (\\Seen) INTERNALDATE \" 4-Jul-2020 16:31:00 \
             +0100\" RFC822.SIZE {})",
            SIMPLE.len()
        )],
        client.ok_command("1 FETCH 1 FAST").await
    );

    let responses = client.ok_command("2 FETCH 1 ENVELOPE").await;
    assert_eq!(1, responses.len());
    assert!(responses[0].starts_with("* 1 FETCH (ENVELOPE ("));
    assert!(responses[0].contains("\"Hello\""));
    assert!(responses[0].contains("<simple@example.com>"));

    let responses = client.ok_command("3 FETCH 2 BODYSTRUCTURE").await;
    assert!(
        responses[0].to_ascii_uppercase().contains("\"MIXED\""),
        "{:?}",
        responses
    );
}

#[tokio::test]
async fn fetch_body_content() {
    let setup = set_up();
    let mut client = setup.connect("3501febc");
    client.quick_log_in().await;
    client.quick_select("INBOX").await;

    assert_eq!(
        vec![format!(
            "* 1 FETCH (BODY[] {{{}}}\r\n{} UID 1)",
            SIMPLE.len(),
            String::from_utf8_lossy(SIMPLE)
        )],
        client.ok_command("1 UID FETCH 1 BODY.PEEK[]").await
    );

    let responses = client.ok_command("2 FETCH 2 BODY.PEEK[1]").await;
    assert!(responses[0].starts_with("* 2 FETCH (BODY[1] {"));
    assert!(responses[0].contains("Hello world"));

    let responses = client
        .ok_command("3 FETCH 2 BODY.PEEK[HEADER.FIELDS (SUBJECT)]")
        .await;
    assert!(
        responses[0].contains("Subject: =?utf-8?Q?Caf=C3=A9?= report"),
        "{:?}",
        responses
    );

    let responses = client.ok_command("4 FETCH 1 BODY.PEEK[]<0.4>").await;
    assert_eq!(vec!["* 1 FETCH (BODY[]<0> {4}\r\nFrom)"], responses);
}

#[tokio::test]
async fn fetch_sets_seen() {
    let setup = set_up();
    let mut client = setup.connect("3501fess");
    client.quick_log_in().await;
    client.quick_select("INBOX").await;

    let responses = client.ok_command("1 FETCH 3 RFC822.TEXT").await;
    assert_eq!(1, responses.len());
    assert!(responses[0].starts_with("* 3 FETCH (RFC822.TEXT {"));
    assert!(responses[0].ends_with(" FLAGS (\\Seen))"));

    assert_eq!(
        vec![
            "* 1 FETCH (FLAGS (\\Seen))",
            "* 2 FETCH (FLAGS ())",
            "* 3 FETCH (FLAGS (\\Seen))",
        ],
        client.ok_command("2 FETCH 1:* FLAGS").await
    );
}

#[tokio::test]
async fn fetch_invalid() {
    let setup = set_up();
    let mut client = setup.connect("3501fefi");
    client.quick_log_in().await;
    client.quick_select("INBOX").await;

    assert_eq!(
        vec!["1 BAD Invalid sequence set"],
        client.command("1 FETCH 1:x FLAGS").await
    );
    assert_eq!(
        vec!["2 BAD Unknown fetch item FROB"],
        client.command("2 FETCH 1 (FLAGS FROB)").await
    );

    // Out of range is just nothing
    assert!(client.ok_command("3 FETCH 99 FLAGS").await.is_empty());
}
