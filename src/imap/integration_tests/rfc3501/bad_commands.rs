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
async fn unknown_and_unimplemented_commands() {
    let setup = set_up();
    let mut client = setup.connect("3501bcuu");
    client.quick_log_in().await;

    assert_eq!(
        vec!["1 BAD Unknown command"],
        client.command("1 XYZZY").await
    );
    assert_eq!(
        vec!["2 BAD Not implemented"],
        client.command("2 IDLE").await
    );
    assert_eq!(
        vec!["3 BAD Missing command name"],
        client.command("3").await
    );

    assert!(client.ok_command("4 NOOP").await.is_empty());
}

#[tokio::test]
async fn malformed_arguments() {
    let setup = set_up();
    let mut client = setup.connect("3501bcma");
    client.quick_log_in().await;

    let responses = client.command("1 SELECT").await;
    assert_eq!(1, responses.len());
    assert!(responses[0].starts_with("1 BAD "), "{:?}", responses);

    let responses = client.command("2 STATUS INBOX MESSAGES").await;
    assert!(responses[0].starts_with("2 BAD "), "{:?}", responses);

    // Depending on where the grammar gives up this is either a parse
    // failure or a schema mismatch, but never success.
    let responses = client.command("3 LIST \"\" (unbalanced").await;
    assert_matches!(
        Some("NO" | "BAD"),
        responses.last().unwrap().split(' ').nth(1)
    );

    assert!(client.ok_command("4 NOOP").await.is_empty());
}

#[tokio::test]
async fn overlong_line() {
    let setup = set_up();
    let mut client = setup.connect("3501bcol");
    client.skip_greeting().await;

    let mut line = b"1 NOOP ".to_vec();
    line.extend(std::iter::repeat(b'x').take(100_000));
    line.extend_from_slice(b"\r\n");
    client.write_raw(&line).await;

    assert_eq!("1 BAD Command line too long", client.read_line().await);
    assert!(client.ok_command("2 NOOP").await.is_empty());
}
