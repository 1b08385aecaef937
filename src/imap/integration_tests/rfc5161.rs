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
async fn enable_condstore() {
    let setup = set_up();
    let mut client = setup.connect("5161encs");
    client.quick_log_in().await;

    assert_eq!(
        vec!["* ENABLED CONDSTORE"],
        client.ok_command("1 ENABLE CONDSTORE X-UNKNOWN").await
    );
    // Already enabled, so nothing new to report
    assert_eq!(
        vec!["* ENABLED"],
        client.ok_command("2 ENABLE CONDSTORE").await
    );

    let responses = client.quick_select("INBOX").await;
    assert!(responses.contains(&"* OK [HIGHESTMODSEQ 4] Highest".to_owned()));
}

#[tokio::test]
async fn enable_requires_login() {
    let setup = set_up();
    let mut client = setup.connect("5161enrl");
    client.skip_greeting().await;

    assert_eq!(
        vec!["1 BAD Command not allowed in this state"],
        client.command("1 ENABLE CONDSTORE").await
    );
}
