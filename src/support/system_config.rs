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

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The system-wide configuration for Mailroom.
///
/// This is stored in a file named `mailroom.toml` under the Mailroom system
/// root, which is typically `/usr/local/etc/mailroom` or `/etc/mailroom`.
#[derive(Clone, Debug, Deserialize, Serialize, Default)]
pub struct SystemConfig {
    /// Limits and timeouts of the IMAP server.
    ///
    /// The defaults are reasonable for most installations.
    #[serde(default)]
    pub imap: ImapConfig,

    /// Configuration for TLS.
    pub tls: TlsConfig,

    /// Extra values to report in the ID command.
    /// The main useful value here is `support-url`.
    #[serde(default)]
    pub identification: BTreeMap<String, String>,

    /// Configuration for the bundled in-memory message store.
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ImapConfig {
    /// The address to listen on.
    pub bind: String,

    /// The longest command line accepted, in bytes, excluding literals.
    ///
    /// Longer lines are rejected with `BAD` and skipped.
    pub max_line_length: usize,

    /// The largest literal accepted for any command other than `APPEND`.
    pub max_literal_size: u64,

    /// The largest literal accepted for `APPEND`. This is also the value
    /// advertised in the `APPENDLIMIT` capability.
    pub max_append_size: u64,

    /// Connections which send nothing for this many seconds are closed.
    pub idle_timeout_secs: u64,

    /// How long a closing connection waits for the peer to acknowledge
    /// shutdown before the socket is dropped.
    pub close_grace_period_ms: u64,

    /// The number of undelivered notifications each connection buffers.
    /// Notifications beyond this are dropped.
    pub notification_queue: usize,
}

impl Default for ImapConfig {
    fn default() -> Self {
        ImapConfig {
            bind: "0.0.0.0:993".to_owned(),
            max_line_length: 65536,
            max_literal_size: 1024 * 1024,
            max_append_size: 64 * 1024 * 1024,
            idle_timeout_secs: 30 * 60,
            close_grace_period_ms: 1500,
            notification_queue: 32,
        }
    }
}

impl ImapConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn close_grace_period(&self) -> Duration {
        Duration::from_millis(self.close_grace_period_ms)
    }
}

// The Default implementation of TlsConfig is not useful in the real world, but
// is helpful for tests.
#[derive(Clone, Debug, Deserialize, Serialize, Default)]
pub struct TlsConfig {
    /// The path to the TLS private key, which must be in PEM format.
    pub private_key: PathBuf,
    /// The path to the TLS certificate chain, which must be in PEM format.
    pub certificate_chain: PathBuf,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// The users that may log in.
    pub users: Vec<UserConfig>,

    /// A directory of messages loaded at startup.
    ///
    /// Each sub-directory is named after a user and contains one directory
    /// per mailbox, which in turn holds one `.eml` file per message.
    /// Relative paths are resolved against the system root.
    pub spool: Option<PathBuf>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct UserConfig {
    pub name: String,
    pub password: String,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let config: SystemConfig = toml::from_str(
            r#"
[tls]
private_key = "key.pem"
certificate_chain = "cert.pem"
"#,
        )
        .unwrap();

        assert_eq!("0.0.0.0:993", config.imap.bind);
        assert_eq!(1800, config.imap.idle_timeout_secs);
        assert_eq!(64 * 1024 * 1024, config.imap.max_append_size);
        assert!(config.store.users.is_empty());
        assert!(config.identification.is_empty());
    }

    #[test]
    fn full_config() {
        let config: SystemConfig = toml::from_str(
            r#"
[imap]
bind = "127.0.0.1:1993"
max_literal_size = 4096

[tls]
private_key = "key.pem"
certificate_chain = "cert.pem"

[identification]
support-url = "mailto:postmaster@example.com"

[store]
spool = "spool"

[[store.users]]
name = "jsmith"
password = "hunter2"
"#,
        )
        .unwrap();

        assert_eq!("127.0.0.1:1993", config.imap.bind);
        assert_eq!(4096, config.imap.max_literal_size);
        assert_eq!(65536, config.imap.max_line_length);
        assert_eq!(
            Some("mailto:postmaster@example.com"),
            config.identification.get("support-url").map(String::as_str)
        );
        assert_eq!(1, config.store.users.len());
        assert_eq!("jsmith", config.store.users[0].name);
        assert_eq!(Some(PathBuf::from("spool")), config.store.spool);
    }
}
