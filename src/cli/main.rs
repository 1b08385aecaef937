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

use std::fs;
use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};

use structopt::StructOpt;

use crate::support::sysexits::*;
use crate::support::system_config::SystemConfig;

#[derive(StructOpt)]
#[structopt(max_term_width = 80)]
enum Command {
    /// Commands to be run on the Mailroom server system.
    Server(ServerSubcommand),
}

#[derive(StructOpt, Default)]
pub(super) struct ServerCommonOptions {
    /// The directory containing `mailroom.toml` etc
    /// [default: /etc/mailroom or /usr/local/etc/mailroom]
    #[structopt(long, parse(from_os_str))]
    root: Option<PathBuf>,
}

#[derive(StructOpt)]
enum ServerSubcommand {
    /// Listen for IMAPS connections.
    ///
    /// The address comes from the `[imap]` section of `mailroom.toml`. Every
    /// connection is served by the same process.
    ServeImaps(ServerCommonOptions),
    /// Parse a message file and describe its MIME structure.
    ///
    /// This shows how a message in the spool will be understood, without
    /// needing a configuration. The exit status is EX_DATAERR if the message
    /// cannot be rebuilt at its original size.
    CheckMessage(CheckMessageSubcommand),
}

#[derive(StructOpt)]
struct CheckMessageSubcommand {
    /// The RFC 822 message file to check.
    #[structopt(parse(from_os_str))]
    file: PathBuf,
}

pub fn main() {
    // Clap exits with status 1 instead of EX_USAGE if we use the more concise
    // API
    let cmd = Command::from_clap(&match Command::clap().get_matches_safe() {
        Ok(matches) => matches,
        Err(
            e @ clap::Error {
                kind: clap::ErrorKind::HelpDisplayed,
                ..
            },
        )
        | Err(
            e @ clap::Error {
                kind: clap::ErrorKind::VersionDisplayed,
                ..
            },
        ) => {
            println!("{}", e.message);
            return;
        },
        Err(e) => {
            eprintln!("{}", e.message);
            EX_USAGE.exit()
        },
    });

    match cmd {
        Command::Server(ServerSubcommand::CheckMessage(cmd)) => {
            super::check::check_message(&cmd.file)
        },
        Command::Server(ServerSubcommand::ServeImaps(common)) => {
            let root = find_root(common.root);
            let system_config = load_config(&root);
            init_logging(&root);
            super::serve::imaps(system_config, root);
        },
    }
}

fn find_root(root: Option<PathBuf>) -> PathBuf {
    root.unwrap_or_else(|| {
        if Path::new("/etc/mailroom/mailroom.toml").is_file() {
            "/etc/mailroom".to_owned().into()
        } else if Path::new("/usr/local/etc/mailroom/mailroom.toml").is_file() {
            "/usr/local/etc/mailroom".to_owned().into()
        } else {
            eprintln!(
                "Neither /etc/mailroom nor /usr/local/etc/mailroom looks like\n\
                 the Mailroom root; use --root=/path/to/mailroom if your\n\
                 installation is elsewhere."
            );
            EX_CONFIG.exit()
        }
    })
}

fn load_config(root: &Path) -> SystemConfig {
    let system_config_path = root.join("mailroom.toml");
    let mut system_config_toml = Vec::new();
    if let Err(e) = fs::File::open(&system_config_path)
        .and_then(|mut f| f.read_to_end(&mut system_config_toml))
    {
        eprintln!("Error reading '{}': {}", system_config_path.display(), e);
        EX_CONFIG.exit();
    }

    match toml::from_slice(&system_config_toml) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Error in config file at '{}': {}",
                system_config_path.display(),
                e
            );
            EX_CONFIG.exit()
        },
    }
}

fn init_logging(root: &Path) {
    if std::io::stderr().is_terminal() {
        // Running interactively; ignore logging configuration and just write
        // to stderr.
        crate::init_simple_log();
        return;
    }

    // Right now we have this awkward situation where you can use log4rs *or*
    // syslog, because log4rs-syslog hasn't been updated in quite a while.
    let log_config_file = root.join("logging.toml");
    if log_config_file.is_file() {
        if let Err(e) = log4rs::init_file(
            &log_config_file,
            log4rs::file::Deserializers::new(),
        ) {
            eprintln!(
                "Failed to initialise logging from '{}': {}",
                log_config_file.display(),
                e
            );
            EX_CONFIG.exit();
        }
        return;
    }

    let formatter = syslog::Formatter3164 {
        facility: syslog::Facility::LOG_MAIL,
        hostname: None,
        process: env!("CARGO_PKG_NAME").to_owned(),
        pid: std::process::id() as i32,
    };

    match syslog::unix(formatter) {
        Ok(logger) => {
            if log::set_boxed_logger(Box::new(syslog::BasicLogger::new(logger)))
                .is_ok()
            {
                log::set_max_level(log::LevelFilter::Info);
            }
        },
        Err(e) => {
            eprintln!("Failed to connect to syslog: {}", e);
            EX_OSERR.exit();
        },
    }
}
