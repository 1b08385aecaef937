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

//! The static contract of every verb: where it is legal, what arguments it
//! takes, and which service it needs.

use super::command::Command;
use super::parser::Attribute;
use super::response::Response;
use super::services::{Availability, ServiceKind};

/// The protocol states, without their data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateKind {
    NotAuthenticated,
    Authenticated,
    Selected,
    Logout,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgType {
    Atom,
    /// An atom, number or string.
    AString,
    Number,
    List,
    /// A sequence set, checked further by the handler.
    Sequence,
    Any,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Arg {
    pub name: &'static str,
    pub kind: ArgType,
    pub optional: bool,
    /// Whether the argument may be given any number of times (at least once
    /// unless also optional).
    pub repeated: bool,
}

const fn arg(name: &'static str, kind: ArgType) -> Arg {
    Arg {
        name,
        kind,
        optional: false,
        repeated: false,
    }
}

const fn opt(name: &'static str, kind: ArgType) -> Arg {
    Arg {
        name,
        kind,
        optional: true,
        repeated: false,
    }
}

const fn many(name: &'static str, kind: ArgType) -> Arg {
    Arg {
        name,
        kind,
        optional: false,
        repeated: true,
    }
}

#[derive(Debug)]
pub struct CommandMeta {
    pub verb: &'static str,
    pub states: &'static [StateKind],
    /// `None` if the command has a free-form grammar only its handler can
    /// check.
    pub schema: Option<&'static [Arg]>,
    /// The service the command cannot work without.
    pub service: Option<ServiceKind>,
    pub implemented: bool,
}

use ArgType::*;
use StateKind::*;

const ANY: &[StateKind] = &[NotAuthenticated, Authenticated, Selected];
const UNAUTH: &[StateKind] = &[NotAuthenticated];
const AUTH: &[StateKind] = &[Authenticated, Selected];
const SELECTED: &[StateKind] = &[Selected];

const NONE: &[Arg] = &[];
const SELECT_ARGS: &[Arg] = &[arg("mailbox", AString), opt("parameters", List)];
const COPY_ARGS: &[Arg] = &[arg("sequence", Sequence), arg("mailbox", AString)];
const STORE_ARGS: &[Arg] = &[
    arg("sequence", Sequence),
    opt("modifiers", List),
    arg("item", Atom),
    arg("value", Any),
];

macro_rules! command {
    ($verb:expr, $states:expr, $schema:expr) => {
        command!($verb, $states, $schema, None, true)
    };
    ($verb:expr, $states:expr, $schema:expr, $service:expr) => {
        command!($verb, $states, $schema, Some($service), true)
    };
    ($verb:expr, $states:expr, $schema:expr, $service:expr, $implemented:expr) => {
        CommandMeta {
            verb: $verb,
            states: $states,
            schema: $schema,
            service: $service,
            implemented: $implemented,
        }
    };
}

macro_rules! placeholder {
    ($verb:expr, $states:expr, $schema:expr) => {
        command!($verb, $states, $schema, None, false)
    };
}

static COMMANDS: &[CommandMeta] = &[
    command!("CAPABILITY", ANY, Some(NONE)),
    command!("NOOP", ANY, Some(NONE)),
    command!("LOGOUT", ANY, Some(NONE)),
    command!("ID", ANY, Some(&[arg("parameters", Any)])),
    command!(
        "LOGIN",
        UNAUTH,
        Some(&[arg("username", AString), arg("password", AString)]),
        ServiceKind::Login
    ),
    command!("ENABLE", AUTH, Some(&[many("capability", Atom)])),
    command!("SELECT", AUTH, Some(SELECT_ARGS), ServiceKind::Select),
    command!("EXAMINE", AUTH, Some(SELECT_ARGS), ServiceKind::Select),
    command!(
        "STATUS",
        AUTH,
        Some(&[arg("mailbox", AString), arg("items", List)]),
        ServiceKind::Status
    ),
    // The list service is only needed for a non-empty pattern.
    command!(
        "LIST",
        AUTH,
        Some(&[
            opt("selection", List),
            arg("reference", AString),
            arg("mailbox", AString),
            opt("return", Atom),
            opt("options", List),
        ])
    ),
    command!("CHECK", SELECTED, Some(NONE)),
    command!("UNSELECT", SELECTED, Some(NONE)),
    command!("CLOSE", SELECTED, Some(NONE)),
    command!(
        "FETCH",
        SELECTED,
        Some(&[
            arg("sequence", Sequence),
            arg("items", Any),
            opt("modifiers", List),
        ]),
        ServiceKind::Fetch
    ),
    command!(
        "UID FETCH",
        SELECTED,
        Some(&[
            arg("sequence", Sequence),
            arg("items", Any),
            opt("modifiers", List),
        ]),
        ServiceKind::Fetch
    ),
    placeholder!("IDLE", AUTH, Some(NONE)),
    placeholder!("APPEND", AUTH, None),
    placeholder!("SEARCH", SELECTED, None),
    placeholder!("UID SEARCH", SELECTED, None),
    placeholder!("COPY", SELECTED, Some(COPY_ARGS)),
    placeholder!("UID COPY", SELECTED, Some(COPY_ARGS)),
    placeholder!("MOVE", SELECTED, Some(COPY_ARGS)),
    placeholder!("UID MOVE", SELECTED, Some(COPY_ARGS)),
    placeholder!("STORE", SELECTED, Some(STORE_ARGS)),
    placeholder!("UID STORE", SELECTED, Some(STORE_ARGS)),
    placeholder!("EXPUNGE", SELECTED, Some(NONE)),
    placeholder!("UID EXPUNGE", SELECTED, Some(&[arg("sequence", Sequence)])),
];

pub fn lookup(verb: &str) -> Option<&'static CommandMeta> {
    COMMANDS.iter().find(|c| c.verb == verb)
}

/// Decide whether `command` may run at all in `state`, given the available
/// services.
///
/// This only looks at the tag and verb, so it can run before the rest of
/// the command has arrived.
pub fn precheck(
    command: &Command,
    state: StateKind,
    availability: Availability,
) -> Result<&'static CommandMeta, Response> {
    let tag = Some(command.tag.as_str());
    let meta = lookup(&command.verb)
        .ok_or_else(|| Response::bad(tag, "Unknown command"))?;

    if !meta.states.contains(&state) {
        return Err(Response::bad(tag, "Command not allowed in this state"));
    }

    if !meta.implemented
        || meta.service.map_or(false, |s| !availability.has(s))
    {
        return Err(Response::bad(tag, "Not implemented"));
    }

    Ok(meta)
}

/// Check `args` against the schema of `meta`.
///
/// Matching is greedy: an optional argument is taken whenever the next
/// attribute has its type.
pub fn validate(meta: &CommandMeta, args: &[Attribute]) -> Result<(), Response> {
    let Some(schema) = meta.schema else {
        return Ok(());
    };

    let mut args = args.iter().peekable();
    for spec in schema {
        let mut matched = 0;
        while let Some(next) = args.peek() {
            if !matches(spec.kind, next) {
                break;
            }
            args.next();
            matched += 1;
            if !spec.repeated {
                break;
            }
        }

        if 0 == matched && !spec.optional {
            return Err(invalid(meta));
        }
    }

    if args.next().is_some() {
        return Err(invalid(meta));
    }

    Ok(())
}

fn invalid(meta: &CommandMeta) -> Response {
    Response::bad(None, format!("Invalid arguments for {}", meta.verb))
}

fn matches(kind: ArgType, attr: &Attribute) -> bool {
    match (kind, attr) {
        (Any, _) => true,
        (Atom, &Attribute::Atom(_)) => true,
        (
            AString,
            &(Attribute::Atom(_) | Attribute::Number(_) | Attribute::String(_)),
        ) => true,
        (Number, &Attribute::Number(_)) => true,
        (List, &Attribute::List(_)) => true,
        (Sequence, &(Attribute::Atom(_) | Attribute::Number(_))) => true,
        _ => false,
    }
}
