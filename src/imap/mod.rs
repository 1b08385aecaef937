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

//! The IMAP4rev1 server core.
//!
//! Bytes from the client pass through `request_reader` (framing and
//! literals), `command_table` (admission) and `parser` before reaching the
//! `command_processor`, which calls out to the pluggable `services`.
//! Responses travel back through `compiler` and `response_writer`.

pub mod command;
pub mod command_processor;
pub mod command_table;
pub mod compiler;
pub mod connection;
pub mod fetch_query;
pub mod lex;
pub mod literal_source;
pub mod mailbox_name;
pub mod parser;
pub mod request_reader;
pub mod response;
pub mod response_writer;
pub mod sequence;
pub mod server;
pub mod services;

#[cfg(test)]
mod integration_tests;
