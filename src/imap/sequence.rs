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

//! Sequence sets (`1,3:5,7:*`) and their resolution against the message
//! list of a selected mailbox.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Bound::{Excluded, Included, Unbounded};

/// A set of message numbers or UIDs, held as disjoint inclusive ranges.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SeqRange {
    parts: BTreeMap<u32, u32>,
}

impl SeqRange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the given inclusive range, which may overlap or touch
    /// existing ranges.
    pub fn insert(&mut self, start_incl: u32, mut end_incl: u32) {
        debug_assert!(end_incl >= start_incl);

        // If this range overlaps any later ranges, fuse them.
        loop {
            let following = self
                .parts
                .range((Excluded(start_incl), Unbounded))
                .next()
                .map(|(&start, &end)| (start, end));

            if let Some((following_start, following_end)) = following {
                if following_start - 1 <= end_incl {
                    end_incl = end_incl.max(following_end);
                    self.parts.remove(&following_start);
                    continue;
                }
            }

            break;
        }

        let preceding = self
            .parts
            .range((Unbounded, Included(end_incl)))
            .next_back()
            .map(|(&start, &end)| (start, end));
        if let Some((preceding_start, preceding_end)) = preceding {
            if preceding_end.saturating_add(1) >= start_incl {
                if start_incl < preceding_start {
                    self.parts.remove(&preceding_start);
                    self.parts.insert(start_incl, end_incl.max(preceding_end));
                } else {
                    self.parts
                        .insert(preceding_start, end_incl.max(preceding_end));
                }
                return;
            }
        }

        self.parts.insert(start_incl, end_incl);
    }

    pub fn contains(&self, v: u32) -> bool {
        self.parts
            .range(..=v)
            .next_back()
            .filter(|&(_, &end)| end >= v)
            .is_some()
    }

    /// The items in this set not greater than `max`, ascending.
    pub fn items(&self, max: u32) -> impl Iterator<Item = u32> + '_ {
        self.parts
            .iter()
            .map(|(&start, &end)| (start, end))
            .filter(move |&(start, _)| start <= max)
            .flat_map(move |(start, end)| start..=end.min(max))
    }

    /// Parse the IMAP form of a sequence set.
    ///
    /// `splat` is used as the value of elements which specify `*`. Zero is
    /// not a valid element, and neither is an empty set.
    pub fn parse(raw: &str, splat: u32) -> Option<Self> {
        fn element(r: &str, splat: u32) -> Option<u32> {
            if "*" == r {
                Some(splat)
            } else if !r.is_empty() && r.bytes().all(|b| b.is_ascii_digit()) {
                r.parse().ok().filter(|&n| n > 0)
            } else {
                None
            }
        }

        let mut this = Self::new();
        for part in raw.split(',') {
            let mut subs = part.split(':');
            match (subs.next(), subs.next(), subs.next()) {
                (Some(only), None, None) => {
                    let only = element(only, splat)?;
                    this.insert(only, only);
                },
                (Some(start), Some(end), None) => {
                    let start = element(start, splat)?;
                    let end = element(end, splat)?;
                    // The endpoints may come in either order.
                    this.insert(start.min(end), end.max(start));
                },
                _ => return None,
            }
        }

        Some(this)
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl fmt::Display for SeqRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (ix, (&start, &end)) in self.parts.iter().enumerate() {
            let delim = if 0 == ix { "" } else { "," };

            if start == end {
                write!(f, "{}{}", delim, start)?;
            } else {
                write!(f, "{}{}:{}", delim, start, end)?;
            }
        }

        Ok(())
    }
}

impl fmt::Debug for SeqRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}]", self)
    }
}

/// Whether `raw` is syntactically a sequence set.
pub fn is_valid(raw: &str) -> bool {
    SeqRange::parse(raw, 1).is_some()
}

/// Resolve `raw` against the ordered UID list of a mailbox.
///
/// If `by_uid` the set names UIDs and `*` is the greatest UID; otherwise it
/// names 1-based positions in `uids` and `*` is the last one. Returns
/// `(sequence number, uid)` pairs in mailbox order, or `None` if `raw` is
/// not a valid sequence set. Elements naming no message are ignored.
pub fn get_messages(
    raw: &str,
    uids: &[u32],
    by_uid: bool,
) -> Option<Vec<(u32, u32)>> {
    if by_uid {
        let max_uid = uids.last().copied().unwrap_or(0);
        // An empty mailbox still validates the syntax.
        let set = SeqRange::parse(raw, max_uid.max(1))?;
        Some(
            uids.iter()
                .enumerate()
                .filter(|&(_, &uid)| set.contains(uid))
                .map(|(ix, &uid)| (ix as u32 + 1, uid))
                .collect(),
        )
    } else {
        let count = uids.len() as u32;
        let set = SeqRange::parse(raw, count.max(1))?;
        Some(
            set.items(count)
                .map(|seqnum| (seqnum, uids[seqnum as usize - 1]))
                .collect(),
        )
    }
}
