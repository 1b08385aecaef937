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
async fn list_wildcards() {
    let setup = set_up();
    for mailbox in ["Archive/2020", "Archive/2020/Q1"] {
        setup.store.create_mailbox("azure", mailbox, None).unwrap();
    }
    let mut client = setup.connect("3501mblw");
    client.quick_log_in().await;

    assert_eq!(
        vec!["* LIST (\\Noselect) \"/\" \"\""],
        client.ok_command("1 LIST \"\" \"\"").await
    );

    assert_eq!(
        vec![
            "* LIST (\\HasChildren) \"/\" Archive/2020",
            "* LIST (\\HasNoChildren) \"/\" Archive/2020/Q1",
        ],
        client.ok_command("2 LIST Archive/ 2020*").await
    );

    assert_eq!(
        vec!["* LIST (\\HasChildren) \"/\" Archive/2020"],
        client.ok_command("3 LIST \"\" Archive/%").await
    );

    assert!(client.ok_command("4 LIST \"\" Nothing*").await.is_empty());
}

#[tokio::test]
async fn status() {
    let setup = set_up();
    let mut client = setup.connect("3501mbst");
    client.quick_log_in().await;

    assert_eq!(
        vec!["* STATUS INBOX (MESSAGES 3 RECENT 3 UIDNEXT 4 UNSEEN 2)"],
        client
            .ok_command("1 STATUS INBOX (MESSAGES RECENT UIDNEXT UNSEEN)")
            .await
    );

    let responses = client.ok_command("2 STATUS Trash (UIDVALIDITY)").await;
    assert_eq!(1, responses.len());
    assert!(responses[0].starts_with("* STATUS Trash (UIDVALIDITY "));

    assert_eq!(
        vec!["3 NO [NONEXISTENT] No such mailbox"],
        client.command("3 STATUS Nowhere (MESSAGES)").await
    );
}
