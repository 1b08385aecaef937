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

use std::time::Duration;

use super::defs::*;
use crate::support::system_config::SystemConfig;
use crate::test_data::*;

#[tokio::test]
async fn new_messages_reach_selecting_sessions() {
    let setup = set_up();
    let mut watcher = setup.connect("ntfynmwa");
    let mut bystander = setup.connect("ntfynmby");
    watcher.quick_log_in().await;
    watcher.quick_select("INBOX").await;
    bystander.quick_log_in().await;
    bystander.quick_select("Trash").await;

    deliver(&setup.store, NESTED_MESSAGE, &[]);
    deliver(&setup.store, SIMPLE, &[]);

    assert_eq!(vec!["* 5 EXISTS"], watcher.ok_command("1 NOOP").await);
    // Already reported
    assert!(watcher.ok_command("2 NOOP").await.is_empty());
    assert!(bystander.ok_command("1 NOOP").await.is_empty());

    assert_eq!(
        vec!["* 5 FETCH (UID 5)"],
        watcher.ok_command("3 FETCH 5 UID").await
    );
}

#[tokio::test]
async fn notifications_are_per_user() {
    let setup = set_up();
    setup.store.add_user("cyan", "password").unwrap();
    let mut azure = setup.connect("ntfypuaz");
    let mut cyan = setup.connect("ntfypucy");
    azure.quick_log_in().await;
    azure.quick_select("INBOX").await;
    cyan.skip_greeting().await;
    cyan.ok_command("1 LOGIN cyan password").await;
    cyan.quick_select("INBOX").await;

    deliver(&setup.store, SIMPLE, &[]);
    assert!(cyan.ok_command("2 NOOP").await.is_empty());
    assert_eq!(vec!["* 4 EXISTS"], azure.ok_command("1 NOOP").await);
}

#[tokio::test]
async fn idle_connections_are_closed() {
    let mut config = SystemConfig::default();
    config.imap.idle_timeout_secs = 1;
    let setup = set_up_with(config);
    let mut client = setup.connect("ntfyicac");
    client.quick_log_in().await;

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(client.ok_command("1 NOOP").await.is_empty());

    assert_eq!(
        "* BYE Idle timeout, closing connection",
        client.read_line().await
    );
    client.assert_closed().await;
}

#[tokio::test]
async fn lagging_sessions_are_closed() {
    let mut config = SystemConfig::default();
    config.imap.notification_queue = 2;
    let setup = set_up_with(config);
    let mut client = setup.connect("ntfylsac");
    client.quick_log_in().await;
    client.quick_select("INBOX").await;

    for _ in 0..3 {
        deliver(&setup.store, SIMPLE, &[]);
    }

    assert_eq!(
        vec!["* 5 EXISTS", "* BYE Too many missed mailbox updates"],
        client.ok_command("1 NOOP").await
    );
    client.assert_closed().await;
}
