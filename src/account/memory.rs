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

//! A message store held entirely in memory.
//!
//! This is the bundled implementation of the five services. It is fed from a
//! spool directory at startup and through `deliver()` afterwards; nothing is
//! ever written back.

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::ops::Range;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::prelude::*;
use futures::stream::{self, StreamExt};
use lazy_static::lazy_static;
use log::info;
use regex::Regex;

use crate::imap::command_processor::Notification;
use crate::imap::fetch_query::{fetch_value, MessageView};
use crate::imap::mailbox_name::{normalize, DELIMITER};
use crate::imap::server::Notifier;
use crate::imap::services::*;
use crate::mime::attachments::{AttachmentHandle, AttachmentStore, ByteStream};
use crate::mime::extract::extract_with;
use crate::mime::tree::MimeTree;
use crate::support::error::Error;

/// The size of the chunks attachment streams are cut into.
const CHUNK_SIZE: usize = 65536;

static SYSTEM_FLAGS: &[&str] =
    &["\\Answered", "\\Flagged", "\\Deleted", "\\Seen", "\\Draft"];

static DEFAULT_MAILBOXES: &[(&str, Option<&str>)] = &[
    ("INBOX", None),
    ("Drafts", Some("\\Drafts")),
    ("Sent", Some("\\Sent")),
    ("Junk", Some("\\Junk")),
    ("Trash", Some("\\Trash")),
];

#[derive(Default)]
pub struct MemoryStore {
    accounts: Mutex<HashMap<String, AccountData>>,
    blobs: Arc<BlobStore>,
    notifier: Mutex<Option<Notifier>>,
}

struct AccountData {
    password: String,
    mailboxes: BTreeMap<String, MailboxData>,
}

struct MailboxData {
    special_use: Option<String>,
    uid_validity: u32,
    uid_next: u32,
    highest_mod_seq: u64,
    messages: Vec<StoredMessage>,
}

#[derive(Clone)]
struct StoredMessage {
    uid: u32,
    flags: Vec<String>,
    /// Whether no session has seen this message yet.
    recent: bool,
    internal_date: DateTime<FixedOffset>,
    mod_seq: u64,
    tree: Arc<MimeTree>,
}

impl StoredMessage {
    fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f.eq_ignore_ascii_case(flag))
    }
}

impl MailboxData {
    fn new(special_use: Option<&str>) -> Self {
        MailboxData {
            special_use: special_use.map(str::to_owned),
            uid_validity: Utc::now().timestamp() as u32,
            uid_next: 1,
            highest_mod_seq: 1,
            messages: Vec::new(),
        }
    }

    fn unseen_count(&self) -> u32 {
        self.messages.iter().filter(|m| !m.has_flag("\\Seen")).count() as u32
    }

    fn recent_count(&self) -> u32 {
        self.messages.iter().filter(|m| m.recent).count() as u32
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user with the standard set of mailboxes.
    pub fn add_user(&self, name: &str, password: &str) -> Result<(), Error> {
        let mailboxes = DEFAULT_MAILBOXES
            .iter()
            .map(|&(name, special_use)| {
                (name.to_owned(), MailboxData::new(special_use))
            })
            .collect();

        self.accounts()?.insert(
            name.to_owned(),
            AccountData {
                password: password.to_owned(),
                mailboxes,
            },
        );
        Ok(())
    }

    /// Create `mailbox` for `user` unless it already exists.
    pub fn create_mailbox(
        &self,
        user: &str,
        mailbox: &str,
        special_use: Option<&str>,
    ) -> Result<(), Error> {
        let mut accounts = self.accounts()?;
        let account = accounts.get_mut(user).ok_or(Error::NoSuchUser)?;
        account
            .mailboxes
            .entry(normalize(mailbox))
            .or_insert_with(|| MailboxData::new(special_use));
        Ok(())
    }

    /// Arrange for deliveries to be announced through `notifier`.
    pub fn set_notifier(&self, notifier: Notifier) {
        if let Ok(mut slot) = self.notifier.lock() {
            *slot = Some(notifier);
        }
    }

    /// Add a message to a mailbox, returning its UID.
    ///
    /// Large bodies are moved out of the parsed tree into the attachment
    /// store, so they are only read back when a FETCH needs them.
    pub fn deliver(
        &self,
        user: &str,
        mailbox: &str,
        data: &[u8],
        internal_date: DateTime<FixedOffset>,
        flags: &[&str],
    ) -> Result<u32, Error> {
        let mut tree = MimeTree::parse(data);
        let extracted = extract_with(&mut tree, BlobStore::new_id);
        let tree = Arc::new(tree);

        let mailbox = normalize(mailbox);
        let uid = {
            let mut accounts = self.accounts()?;
            let account = accounts.get_mut(user).ok_or(Error::NoSuchUser)?;
            let mbox = account
                .mailboxes
                .get_mut(&mailbox)
                .ok_or(Error::NoSuchMailbox)?;

            // Once the message is in the mailbox a FETCH may go looking for
            // its bodies, so they must already be there.
            for node in extracted.nodes {
                self.blobs.insert(node.attachment_id, node.body)?;
            }

            let uid = mbox.uid_next;
            mbox.uid_next += 1;
            mbox.highest_mod_seq += 1;
            mbox.messages.push(StoredMessage {
                uid,
                flags: flags.iter().map(|&f| f.to_owned()).collect(),
                recent: true,
                internal_date,
                mod_seq: mbox.highest_mod_seq,
                tree,
            });
            uid
        };

        info!("Delivered UID {} to {}:{}", uid, user, mailbox);

        let notifier = self.notifier.lock().ok().and_then(|n| n.clone());
        if let Some(notifier) = notifier {
            notifier.notify(user, Notification::NewMessage { mailbox, uid });
        }

        Ok(uid)
    }

    /// The attachment store holding the bodies extracted by `deliver()`.
    pub fn attachments(&self) -> Arc<dyn AttachmentStore> {
        self.blobs.clone()
    }

    fn accounts(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<String, AccountData>>, Error> {
        self.accounts.lock().map_err(|_| poisoned())
    }

    fn with_mailbox<T>(
        &self,
        session: &Session,
        mailbox: &str,
        f: impl FnOnce(&mut MailboxData) -> T,
    ) -> Result<Option<T>, Error> {
        let mut accounts = self.accounts()?;
        let account =
            accounts.get_mut(&session.user).ok_or(Error::NoSuchUser)?;
        Ok(account.mailboxes.get_mut(mailbox).map(f))
    }
}

fn poisoned() -> Error {
    Error::ServiceFailure("Message store lock poisoned".to_owned())
}

#[async_trait]
impl LoginService for MemoryStore {
    async fn on_login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<Session>, Error> {
        let accounts = self.accounts()?;
        let valid = accounts
            .get(username)
            .map_or(false, |account| account.password == password);

        Ok(valid.then(|| Session {
            id: format!("{:016x}", rand::random::<u64>()),
            user: username.to_owned(),
            properties: BTreeMap::new(),
        }))
    }
}

#[async_trait]
impl SelectService for MemoryStore {
    async fn on_select(
        &self,
        session: &Session,
        mailbox: &str,
    ) -> Result<Option<SelectResult>, Error> {
        self.with_mailbox(session, mailbox, |mbox| {
            let mut flags = SYSTEM_FLAGS
                .iter()
                .map(|&f| f.to_owned())
                .collect::<Vec<_>>();
            for message in &mbox.messages {
                for flag in &message.flags {
                    if !flags.iter().any(|f| f.eq_ignore_ascii_case(flag)) {
                        flags.push(flag.clone());
                    }
                }
            }

            let mut permanent_flags = flags.clone();
            permanent_flags.push("\\*".to_owned());

            let result = SelectResult {
                session: None,
                flags,
                permanent_flags,
                uid_validity: mbox.uid_validity,
                uid_next: mbox.uid_next,
                unseen: mbox
                    .messages
                    .iter()
                    .position(|m| !m.has_flag("\\Seen"))
                    .map(|ix| ix as u32 + 1),
                recent: Some(mbox.recent_count()),
                highest_mod_seq: Some(mbox.highest_mod_seq),
                read_only: false,
                uids: mbox.messages.iter().map(|m| m.uid).collect(),
            };

            // Only the first session to see a message gets \Recent.
            for message in &mut mbox.messages {
                message.recent = false;
            }

            result
        })
    }
}

#[async_trait]
impl StatusService for MemoryStore {
    async fn on_status(
        &self,
        session: &Session,
        mailbox: &str,
    ) -> Result<Option<StatusResult>, Error> {
        self.with_mailbox(session, mailbox, |mbox| StatusResult {
            messages: mbox.messages.len() as u32,
            recent: mbox.recent_count(),
            uid_next: mbox.uid_next,
            uid_validity: mbox.uid_validity,
            unseen: mbox.unseen_count(),
            highest_mod_seq: mbox.highest_mod_seq,
        })
    }
}

#[async_trait]
impl ListService for MemoryStore {
    async fn on_list(
        &self,
        session: &Session,
        query: &ListQuery,
    ) -> Result<Vec<MailboxInfo>, Error> {
        let pattern =
            list_pattern(&format!("{}{}", query.reference, query.mailbox))?;
        let accounts = self.accounts()?;
        let account = accounts.get(&session.user).ok_or(Error::NoSuchUser)?;

        Ok(account
            .mailboxes
            .iter()
            .filter(|&(name, _)| pattern.is_match(name))
            .map(|(name, mbox)| {
                let prefix = format!("{}{}", name, DELIMITER);
                let has_children =
                    account.mailboxes.keys().any(|k| k.starts_with(&prefix));
                MailboxInfo {
                    path: name.clone(),
                    special_use: mbox.special_use.clone(),
                    attributes: vec![if has_children {
                        "\\HasChildren".to_owned()
                    } else {
                        "\\HasNoChildren".to_owned()
                    }],
                }
            })
            .collect())
    }
}

#[async_trait]
impl FetchService for MemoryStore {
    async fn on_fetch(
        &self,
        session: &Session,
        request: FetchRequest,
    ) -> Result<FetchStream, Error> {
        let messages = self
            .with_mailbox(session, &request.mailbox, |mbox| {
                let mut snapshot =
                    Vec::with_capacity(request.message_uids.len());
                for message in &mut mbox.messages {
                    if request.message_uids.binary_search(&message.uid).is_err()
                    {
                        continue;
                    }

                    if request.mark_as_seen && !message.has_flag("\\Seen") {
                        message.flags.push("\\Seen".to_owned());
                        mbox.highest_mod_seq += 1;
                        message.mod_seq = mbox.highest_mod_seq;
                    }

                    if request
                        .changed_since
                        .map_or(true, |since| message.mod_seq > since)
                    {
                        snapshot.push(message.clone());
                    }
                }
                snapshot
            })?
            .ok_or(Error::NoSuchMailbox)?;

        let store = self.attachments();
        let queries = request.queries;
        Ok(stream::iter(messages)
            .map(move |message| -> Result<FetchedMessage, Error> {
                let view = MessageView {
                    uid: message.uid,
                    flags: &message.flags,
                    internal_date: message.internal_date,
                    mod_seq: message.mod_seq,
                    tree: &message.tree,
                    store: Some(Arc::clone(&store)),
                };
                let values = queries
                    .iter()
                    .map(|query| fetch_value(query, &view))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(FetchedMessage {
                    uid: message.uid,
                    values,
                })
            })
            .boxed())
    }
}

/// Translate a LIST pattern into a regex over normalised mailbox names.
///
/// `*` matches anything and `%` anything but the hierarchy delimiter.
fn list_pattern(pattern: &str) -> Result<Regex, Error> {
    lazy_static! {
        static ref WILDCARD: Regex = Regex::new(r"[*%]").unwrap();
    }

    let pattern = normalize(pattern);
    let mut re = String::from("^");
    let mut last = 0;
    for m in WILDCARD.find_iter(&pattern) {
        re.push_str(&regex::escape(&pattern[last..m.start()]));
        re.push_str(if "*" == m.as_str() { ".*" } else { "[^/]*" });
        last = m.end();
    }
    re.push_str(&regex::escape(&pattern[last..]));
    re.push('$');

    Regex::new(&re).map_err(|e| Error::ServiceFailure(e.to_string()))
}

/// The extracted bodies, keyed by attachment id.
///
/// Bodies are kept in their transfer-encoded form so that byte ranges map
/// directly onto offsets in the rebuilt message.
#[derive(Default)]
pub struct BlobStore {
    blobs: Mutex<HashMap<String, Arc<Vec<u8>>>>,
}

impl BlobStore {
    fn new_id() -> String {
        format!("{:032x}", rand::random::<u128>())
    }

    fn insert(&self, id: String, body: Vec<u8>) -> Result<(), Error> {
        self.blobs
            .lock()
            .map_err(|_| poisoned())?
            .insert(id, Arc::new(body));
        Ok(())
    }
}

#[async_trait]
impl AttachmentStore for BlobStore {
    async fn get_attachment(
        &self,
        attachment_id: &str,
    ) -> Result<Option<AttachmentHandle>, Error> {
        let blobs = self.blobs.lock().map_err(|_| poisoned())?;
        Ok(blobs
            .get(attachment_id)
            .map(|blob| Arc::clone(blob) as AttachmentHandle))
    }

    async fn create_read_stream(
        &self,
        attachment_id: &str,
        handle: AttachmentHandle,
        range: Option<Range<u64>>,
    ) -> Result<ByteStream, Error> {
        let blob = handle
            .downcast::<Vec<u8>>()
            .map_err(|_| Error::AttachmentNotFound(attachment_id.to_owned()))?;

        let len = blob.len();
        let (start, end) = match range {
            Some(range) => (
                (range.start as usize).min(len),
                (range.end as usize).min(len),
            ),
            None => (0, len),
        };

        Ok(stream::iter((start..end.max(start)).step_by(CHUNK_SIZE))
            .map(move |offset| {
                Ok::<_, io::Error>(
                    blob[offset..(offset + CHUNK_SIZE).min(end)].to_vec(),
                )
            })
            .boxed())
    }
}
