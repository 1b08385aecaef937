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

//! Loading of the message spool into a `MemoryStore`.
//!
//! The spool is a directory with one sub-directory per user, which in turn
//! holds one directory per mailbox. Every `*.eml` file in a mailbox
//! directory is delivered to that mailbox in file name order.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::prelude::*;
use log::{info, warn};

use super::memory::MemoryStore;
use crate::support::error::Error;
use crate::support::system_config::StoreConfig;

impl MemoryStore {
    /// Build a store with the users of `config` and the contents of its
    /// spool, resolving a relative spool path against `root`.
    pub fn from_config(
        config: &StoreConfig,
        root: &Path,
    ) -> Result<Self, Error> {
        let store = MemoryStore::new();
        for user in &config.users {
            store.add_user(&user.name, &user.password)?;
        }

        if let Some(ref spool) = config.spool {
            let loaded = load_spool(&store, &root.join(spool))?;
            info!("Loaded {} messages from the spool", loaded);
        }

        Ok(store)
    }
}

/// Deliver everything in the spool at `path` to `store`, returning the
/// number of messages delivered.
///
/// Users the store does not know about are skipped.
pub fn load_spool(store: &MemoryStore, path: &Path) -> Result<usize, Error> {
    let mut loaded = 0;
    for user_dir in sorted_entries(path)? {
        if !user_dir.is_dir() {
            continue;
        }

        let Some(user) = file_name(&user_dir) else {
            continue;
        };

        for mailbox_dir in sorted_entries(&user_dir)? {
            if !mailbox_dir.is_dir() {
                continue;
            }

            let Some(mailbox) = file_name(&mailbox_dir) else {
                continue;
            };

            match store.create_mailbox(&user, &mailbox, None) {
                Ok(()) => (),
                Err(Error::NoSuchUser) => {
                    warn!("Spool contains unknown user '{}'", user);
                    break;
                },
                Err(e) => return Err(e),
            }

            for message in sorted_entries(&mailbox_dir)? {
                if message.extension().map_or(true, |ext| "eml" != ext) {
                    continue;
                }

                let data = fs::read(&message)?;
                let internal_date: DateTime<FixedOffset> =
                    fs::metadata(&message)
                        .and_then(|md| md.modified())
                        .map(|mtime| DateTime::<Local>::from(mtime).into())
                        .unwrap_or_else(|_| Local::now().into());
                store.deliver(&user, &mailbox, &data, internal_date, &[])?;
                loaded += 1;
            }
        }
    }

    Ok(loaded)
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?;
    entries.sort();
    Ok(entries)
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.starts_with('.'))
        .map(str::to_owned)
}
