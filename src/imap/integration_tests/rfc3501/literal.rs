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
async fn command_synchronising_literals() {
    let setup = set_up();
    let mut client = setup.connect("3501lics");
    client.skip_greeting().await;

    client.write_raw(b"A1 LOGIN {5}\r\n").await;
    assert_eq!("+ go ahead", client.read_line().await);

    client.write_raw(b"azure {7}\r\n").await;
    assert_eq!("+ go ahead", client.read_line().await);

    client.write_raw(b"hunter2\r\n").await;
    client
        .receive_line_like(r"^A1 OK \[CAPABILITY .*\] User login$")
        .await;

    // The server must not get confused by literal text itself ending with
    // something that looks like a literal.
    client.write_raw(b"A2 STATUS {5}\r\n").await;
    assert_eq!("+ go ahead", client.read_line().await);
    client.write_raw(b"INBOX (MESSAGES)\r\n").await;
    assert_eq!(
        vec!["* STATUS INBOX (MESSAGES 3)", "A2 OK STATUS completed"],
        client.read_until_tagged("A2").await
    );

    assert!(client.ok_command("A3 NOOP").await.is_empty());
}

#[tokio::test]
async fn non_synchronising_literals_close_the_connection() {
    let setup = set_up();
    let mut client = setup.connect("3501lins");
    client.skip_greeting().await;

    // The data that follows can't be told apart from commands, and reading
    // it all could take any amount of input.
    client.write_raw(b"A1 LOGIN {2000000+}\r\n").await;
    assert_eq!(
        "A1 BAD Non-synchronising literals are not supported",
        client.read_line().await
    );
    client.receive_line_like(r"^\* BYE ").await;
    client.assert_closed().await;
}

#[tokio::test]
async fn oversized_literal_is_rejected() {
    let setup = set_up();
    let mut client = setup.connect("3501lior");
    client.skip_greeting().await;

    client.write_raw(b"A1 LOGIN {99999999}\r\n").await;
    assert_eq!("A1 NO [TOOBIG] Literal too big", client.read_line().await);

    // Cumulative across the literals of one command
    client.write_raw(b"A2 LOGIN {600000}\r\n").await;
    assert_eq!("+ go ahead", client.read_line().await);
    client.write_raw(&vec![b'x'; 600_000]).await;
    client.write_raw(b" {600000}\r\n").await;
    assert_eq!("A2 NO [TOOBIG] Literal too big", client.read_line().await);

    assert!(client.ok_command("A3 NOOP").await.is_empty());
}

#[tokio::test]
async fn literal_refused_in_wrong_state() {
    let setup = set_up();
    let mut client = setup.connect("3501lirw");
    client.skip_greeting().await;

    // The command is rejected without the client being asked for the data.
    client.write_raw(b"A1 SELECT {5}\r\n").await;
    assert_eq!(
        "A1 BAD Command not allowed in this state",
        client.read_line().await
    );

    // The state is checked before the size, so an oversized literal does
    // not change the answer.
    client.write_raw(b"A2 SELECT {99999999}\r\n").await;
    assert_eq!(
        "A2 BAD Command not allowed in this state",
        client.read_line().await
    );
    client.write_raw(b"A3 XYZZY {99999999}\r\n").await;
    assert_eq!("A3 BAD Unknown command", client.read_line().await);

    assert!(client.ok_command("A4 NOOP").await.is_empty());
}
