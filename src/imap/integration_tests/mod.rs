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

//! The integration tests are near "full-stack" tests which run the actual
//! connection code, without test-specific modifications and with as little
//! "reaching under the covers" as possible.
//!
//! Each "connection" is a `run_connection` task talking to the test over an
//! in-memory duplex pipe, which presents a reasonable approximation of a real
//! network connection without the tests needing to worry about port numbers
//! or certificates. TLS is the only layer skipped.
//!
//! Every test gets its own in-memory store, so tests are free to change
//! flags or deliver messages.

mod defs;

mod notifications;
mod rfc2971;
mod rfc3501;
mod rfc3691;
mod rfc5161;
mod rfc6154;
mod rfc7162;
