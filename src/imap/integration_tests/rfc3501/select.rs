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
async fn select_and_examine() {
    let setup = set_up();
    let mut client = setup.connect("3501sese");
    client.quick_log_in().await;

    let responses = client.quick_select("inbox").await;
    assert_eq!(
        "* FLAGS (\\Answered \\Flagged \\Deleted \\Seen \\Draft)",
        responses[0]
    );
    assert!(responses.contains(&"* 3 EXISTS".to_owned()));
    assert!(responses.contains(&"* 3 RECENT".to_owned()));
    assert!(responses
        .contains(&"* OK [UNSEEN 2] First unseen message".to_owned()));
    assert!(responses
        .contains(&"* OK [UIDNEXT 4] Predicted next UID".to_owned()));

    let mut responses = client.command("1 EXAMINE INBOX").await;
    assert_eq!(
        "1 OK [READ-ONLY] EXAMINE completed",
        responses.pop().unwrap()
    );
    assert!(responses.contains(&"* 0 RECENT".to_owned()));
}

#[tokio::test]
async fn select_nonexistent() {
    let setup = set_up();
    let mut client = setup.connect("3501sene");
    client.quick_log_in().await;
    client.quick_select("INBOX").await;

    assert_eq!(
        vec!["1 NO [NONEXISTENT] No such mailbox"],
        client.command("1 SELECT Nowhere").await
    );

    // The failed SELECT left the selected state
    assert_eq!(
        vec!["2 BAD Command not allowed in this state"],
        client.command("2 FETCH 1 FLAGS").await
    );
}

#[tokio::test]
async fn close_returns_to_authenticated() {
    let setup = set_up();
    let mut client = setup.connect("3501secl");
    client.quick_log_in().await;
    client.quick_select("INBOX").await;

    assert!(client.ok_command("1 CLOSE").await.is_empty());
    assert_eq!(
        vec!["2 BAD Command not allowed in this state"],
        client.command("2 CLOSE").await
    );
}

#[tokio::test]
async fn utf7_mailbox_names() {
    let setup = set_up();
    setup
        .store
        .create_mailbox("azure", "Caf\u{e9}", None)
        .unwrap();
    let mut client = setup.connect("3501seu7");
    client.quick_log_in().await;

    let responses = client.ok_command("1 LIST \"\" Caf*").await;
    assert_eq!(vec!["* LIST (\\HasNoChildren) \"/\" \"Caf&AOk-\""], responses);

    client.quick_select("Caf&AOk-").await;
}
