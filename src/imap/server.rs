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

//! The TLS accept loop and the registry of live connections.

use std::collections::{HashMap, HashSet};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use log::{error, info, warn};
use openssl::ssl::{Ssl, SslAcceptor};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_openssl::SslStream;

use super::command_processor::{Notification, ServerContext};
use super::connection::run_connection;
use super::services::Services;
use crate::support::{error::Error, system_config::SystemConfig};

/// Tracks the live connections and which user each one is logged in as.
///
/// This is the only state connections share. It exists so that events about
/// a user's mailboxes can be pushed to every session of that user.
#[derive(Default)]
pub struct Registry {
    inner: Mutex<RegistryInner>,
    next_id: AtomicU64,
}

#[derive(Default)]
struct RegistryInner {
    connections: HashMap<u64, ConnectionEntry>,
    users: HashMap<String, HashSet<u64>>,
}

struct ConnectionEntry {
    peer: String,
    user: Option<String>,
    /// `None` once the connection has been cut off for falling behind.
    notifications: Option<mpsc::Sender<Notification>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new connection from `peer`.
    ///
    /// Returns the connection id and the receiving end of its notification
    /// queue, which holds at most `queue` undelivered notifications.
    pub fn register(
        &self,
        peer: String,
        queue: usize,
    ) -> (u64, mpsc::Receiver<Notification>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = mpsc::channel(queue.max(1));
        if let Ok(mut inner) = self.inner.lock() {
            inner.connections.insert(
                id,
                ConnectionEntry {
                    peer,
                    user: None,
                    notifications: Some(tx),
                },
            );
        }
        (id, rx)
    }

    /// Record that connection `id` is now logged in as `user`.
    pub fn attach_user(&self, id: u64, user: &str) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        let Some(entry) = inner.connections.get_mut(&id) else {
            return;
        };

        entry.user = Some(user.to_owned());
        inner.users.entry(user.to_owned()).or_default().insert(id);
    }

    pub fn remove(&self, id: u64) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        let Some(entry) = inner.connections.remove(&id) else {
            return;
        };

        if let Some(user) = entry.user {
            let now_empty = inner.users.get_mut(&user).map_or(false, |ids| {
                ids.remove(&id);
                ids.is_empty()
            });
            if now_empty {
                inner.users.remove(&user);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map_or(0, |inner| inner.connections.len())
    }

    pub fn is_empty(&self) -> bool {
        0 == self.len()
    }

    /// The ids of the connections logged in as `user`, ascending.
    pub fn connections_of(&self, user: &str) -> Vec<u64> {
        let mut ids = self
            .inner
            .lock()
            .ok()
            .and_then(|inner| {
                inner.users.get(user).map(|ids| ids.iter().copied().collect())
            })
            .unwrap_or_else(Vec::new);
        ids.sort_unstable();
        ids
    }

    /// Queue `notification` on every connection of `user`, returning how
    /// many connections it reached.
    ///
    /// A connection whose queue is full loses its sender. Its session sees
    /// the queue close after the notifications already in it and ends, so
    /// no update is silently skipped.
    fn notify(&self, user: &str, notification: &Notification) -> usize {
        let Ok(mut guard) = self.inner.lock() else {
            return 0;
        };
        let inner = &mut *guard;
        let Some(ids) = inner.users.get(user) else {
            return 0;
        };

        let mut reached = 0;
        for id in ids {
            let Some(entry) = inner.connections.get_mut(id) else {
                continue;
            };
            let Some(ref sender) = entry.notifications else {
                continue;
            };

            match sender.try_send(notification.clone()) {
                Ok(()) => reached += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(
                        "Notification queue of connection {} ({}) is full, \
                         cutting it off",
                        id, entry.peer
                    );
                    entry.notifications = None;
                },
                Err(mpsc::error::TrySendError::Closed(_)) => (),
            }
        }
        reached
    }
}

/// A handle used by the message store to announce changes to connected
/// clients.
#[derive(Clone)]
pub struct Notifier {
    registry: Arc<Registry>,
}

impl Notifier {
    pub fn notify(&self, user: &str, notification: Notification) -> usize {
        self.registry.notify(user, &notification)
    }
}

/// An IMAP server: the shared context plus the accept loop.
///
/// Which services are available is fixed here, once, so that commands whose
/// service is missing can be answered without consulting anything else.
pub struct Server {
    context: Arc<ServerContext>,
}

impl Server {
    pub fn new(config: Arc<SystemConfig>, services: Services) -> Self {
        let availability = services.availability();
        info!("Services available: {:?}", availability);
        Server {
            context: Arc::new(ServerContext {
                config,
                services,
                availability,
                registry: Arc::new(Registry::new()),
            }),
        }
    }

    pub fn notifier(&self) -> Notifier {
        Notifier {
            registry: Arc::clone(&self.context.registry),
        }
    }

    pub fn context(&self) -> Arc<ServerContext> {
        Arc::clone(&self.context)
    }

    /// Accept connections on `listener` forever, handling each one on its
    /// own task.
    pub async fn serve_tls(
        &self,
        listener: TcpListener,
        acceptor: Arc<SslAcceptor>,
    ) -> Result<(), Error> {
        info!("Listening on {}", listener.local_addr()?);
        loop {
            let (tcp, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    // Usually a transient resource shortage such as running
                    // out of file descriptors.
                    error!("Failed to accept connection: {}", e);
                    tokio::time::sleep(std::time::Duration::from_millis(100))
                        .await;
                    continue;
                },
            };

            let context = Arc::clone(&self.context);
            let acceptor = Arc::clone(&acceptor);
            tokio::spawn(async move {
                handle_tls(context, acceptor, tcp, peer.to_string()).await;
            });
        }
    }
}

async fn handle_tls(
    context: Arc<ServerContext>,
    acceptor: Arc<SslAcceptor>,
    tcp: TcpStream,
    peer: String,
) {
    let ssl = match Ssl::new(acceptor.context()) {
        Ok(ssl) => ssl,
        Err(e) => {
            error!("{} Failed to set up TLS session: {}", peer, e);
            return;
        },
    };
    let mut stream = match SslStream::new(ssl, tcp) {
        Ok(stream) => stream,
        Err(e) => {
            error!("{} Failed to set up TLS session: {}", peer, e);
            return;
        },
    };

    if let Err(e) = Pin::new(&mut stream).accept().await {
        warn!("{} TLS handshake failed: {}", peer, e);
        return;
    }

    info!(
        "{} TLS handshake succeeded ({})",
        peer,
        stream.ssl().version_str()
    );
    run_connection(stream, context, peer).await;
}
