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

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{error, info};
use openssl::ssl::{SslAcceptor, SslFiletype, SslMethod};
use tokio::net::TcpListener;

use crate::account::memory::MemoryStore;
use crate::imap::server::Server;
use crate::imap::services::Services;
use crate::support::system_config::SystemConfig;

macro_rules! fatal {
    ($ex:ident, $($stuff:tt)*) => {{
        error!($($stuff)*);
        crate::support::sysexits::$ex.exit()
    }}
}

pub fn imaps(system_config: SystemConfig, system_root: PathBuf) {
    let system_config = Arc::new(system_config);
    let acceptor = Arc::new(create_ssl_acceptor(&system_config, &system_root));

    let store =
        match MemoryStore::from_config(&system_config.store, &system_root) {
            Ok(store) => Arc::new(store),
            Err(e) => {
                fatal!(EX_CONFIG, "Unable to load the message store: {}", e)
            },
        };

    let server =
        Server::new(Arc::clone(&system_config), Services::all(Arc::clone(&store)));
    store.set_notifier(server.notifier());

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => fatal!(EX_OSERR, "Unable to start the runtime: {}", e),
    };

    let result = runtime.block_on(async {
        let listener = match TcpListener::bind(system_config.imap.bind.as_str()).await
        {
            Ok(listener) => listener,
            Err(e) => fatal!(
                EX_CONFIG,
                "Unable to listen on '{}': {}",
                system_config.imap.bind,
                e
            ),
        };

        server.serve_tls(listener, acceptor).await
    });

    match result {
        Ok(()) => info!("Server stopped"),
        Err(e) => fatal!(EX_IOERR, "Server failed: {}", e),
    }
}

fn create_ssl_acceptor(
    system_config: &SystemConfig,
    system_root: &Path,
) -> SslAcceptor {
    let mut acceptor =
        match SslAcceptor::mozilla_intermediate_v5(SslMethod::tls_server()) {
            Ok(a) => a,
            Err(e) => fatal!(
                EX_SOFTWARE,
                "Failed to initialise OpenSSL acceptor: {}",
                e
            ),
        };

    let private_key_path = system_root.join(&system_config.tls.private_key);
    if let Err(e) =
        acceptor.set_private_key_file(&private_key_path, SslFiletype::PEM)
    {
        fatal!(
            EX_CONFIG,
            "Unable to load TLS private key from '{}': {}",
            private_key_path.display(),
            e
        );
    }

    let certificate_path =
        system_root.join(&system_config.tls.certificate_chain);
    if let Err(e) = acceptor.set_certificate_chain_file(&certificate_path) {
        fatal!(
            EX_CONFIG,
            "Unable to load TLS certificate chain from '{}': {}",
            certificate_path.display(),
            e
        );
    }

    if let Err(e) = acceptor.check_private_key() {
        fatal!(EX_CONFIG, "TLS key seems to be invalid: {}", e);
    }

    acceptor.build()
}
