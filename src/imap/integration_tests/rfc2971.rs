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
use crate::support::system_config::SystemConfig;

#[tokio::test]
async fn id_exchange() {
    let mut config = SystemConfig::default();
    config
        .identification
        .insert("support-url".to_owned(), "mailto:help@example.com".to_owned());
    let setup = set_up_with(config);
    let mut client = setup.connect("2971idex");
    client.skip_greeting().await;

    assert_eq!(
        vec![format!(
            "* ID (\"name\" \"Mailroom\" \"version\" \"{}\" \"support-url\" \
             \"mailto:help@example.com\")",
            env!("CARGO_PKG_VERSION")
        )],
        client
            .ok_command("1 ID (\"name\" \"Thunderbird\" \"version\" \"78\")")
            .await
    );

    assert_eq!(1, client.ok_command("2 ID NIL").await.len());
    assert_eq!(
        vec!["3 BAD Invalid ID parameters"],
        client.command("3 ID foo").await
    );
}
