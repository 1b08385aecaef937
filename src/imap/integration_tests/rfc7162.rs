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
use crate::test_data::*;

#[tokio::test]
async fn condstore_select_and_fetch() {
    let setup = set_up();
    let mut client = setup.connect("7162csfs");
    client.quick_log_in().await;

    let responses = client.ok_command("1 SELECT INBOX (CONDSTORE)").await;
    assert!(responses.contains(&"* OK [HIGHESTMODSEQ 4] Highest".to_owned()));

    assert_eq!(
        vec![
            "* 1 FETCH (FLAGS (\\Seen) MODSEQ (2))",
            "* 2 FETCH (FLAGS () MODSEQ (3))",
            "* 3 FETCH (FLAGS () MODSEQ (4))",
        ],
        client.ok_command("2 FETCH 1:* (FLAGS MODSEQ)").await
    );

    // Marking a message seen bumps its modseq
    client.ok_command("3 FETCH 2 BODY[TEXT]").await;
    assert_eq!(
        vec!["* 2 FETCH (UID 2 MODSEQ (5))"],
        client.ok_command("4 UID FETCH 1:* (UID) (CHANGEDSINCE 4)").await
    );

    assert_eq!(
        vec!["* STATUS INBOX (HIGHESTMODSEQ 5)"],
        client.ok_command("5 STATUS INBOX (HIGHESTMODSEQ)").await
    );
}

#[tokio::test]
async fn changedsince_enables_condstore() {
    let setup = set_up();
    let mut client = setup.connect("7162csce");
    client.quick_log_in().await;
    client.quick_select("INBOX").await;

    deliver(&setup.store, SIMPLE, &[]);
    // The new message only becomes addressable once EXISTS is sent, at the
    // end of the command.
    assert_eq!(
        vec!["* 4 EXISTS"],
        client.ok_command("1 FETCH 1:* (FLAGS) (CHANGEDSINCE 4)").await
    );
    assert_eq!(
        vec!["* 4 FETCH (FLAGS () MODSEQ (5))"],
        client.ok_command("2 FETCH 1:* (FLAGS) (CHANGEDSINCE 4)").await
    );

    assert_eq!(
        vec!["3 BAD Unknown FETCH modifier VANISHED"],
        client.command("3 FETCH 1:* (FLAGS) (VANISHED)").await
    );
}
