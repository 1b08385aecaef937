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

//! `server check-message`: show how a message file is understood.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::mime::extract::{extract, MailData};
use crate::mime::length::{get_length, RebuildOptions};
use crate::mime::tree::{Content, MimeTree, NodeId};
use crate::support::sysexits::*;

pub fn check_message(path: &Path) {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("Error reading '{}': {}", path.display(), e);
            EX_NOINPUT.exit()
        },
    };

    let (report, lossless) = describe(&data);
    print!("{}", report);
    if !lossless {
        EX_DATAERR.exit();
    }
}

/// Describe the structure of `data` and what extraction would do with it.
///
/// Also returns whether the message would be rebuilt at its original size.
fn describe(data: &[u8]) -> (String, bool) {
    let mut tree = MimeTree::parse(data);
    let mut out = String::new();

    let root = tree.root();
    describe_node(&tree, root, 0, "1", &mut out);

    let rebuilt = get_length(&tree, root, &RebuildOptions::default());
    let lossless = rebuilt == data.len() as u64;
    let _ = writeln!(
        out,
        "\nRebuilt size: {} bytes (original {} bytes){}",
        rebuilt,
        data.len(),
        if lossless { "" } else { " MISMATCH" }
    );

    describe_extraction(&extract(&mut tree), &mut out);
    (out, lossless)
}

fn describe_node(
    tree: &MimeTree,
    id: NodeId,
    depth: usize,
    path: &str,
    out: &mut String,
) {
    let node = &tree[id];
    let _ = writeln!(
        out,
        "{:indent$}{} {} ({} bytes, {} lines)",
        "",
        path,
        node.parsed_header.content_type.value(),
        node.size,
        node.line_count,
        indent = depth * 2
    );

    match node.content {
        Content::Multipart(ref mp) => {
            for (ix, part) in mp.parts.iter().enumerate() {
                let child_path = format!("{}.{}", path, ix + 1);
                describe_node(tree, part.node, depth + 1, &child_path, out);
            }
        },
        Content::Message(child) => {
            describe_node(tree, child, depth + 1, path, out)
        },
        Content::Leaf(_) => (),
    }
}

fn describe_extraction(data: &MailData, out: &mut String) {
    let _ = writeln!(
        out,
        "Text: {} characters; HTML: {} characters",
        data.text.chars().count(),
        data.html.chars().count()
    );

    if data.attachments.is_empty() {
        let _ = writeln!(out, "No attachments");
    }
    for attachment in &data.attachments {
        let _ = writeln!(
            out,
            "Attachment {}: {} {:?} (~{} bytes{})",
            attachment.id,
            attachment.content_type,
            attachment.filename.as_deref().unwrap_or("<unnamed>"),
            attachment.size_hint,
            if attachment.related { ", related" } else { "" }
        );
    }
    let _ = writeln!(out, "Bodies moved to storage: {}", data.nodes.len());
}
