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

//! Splitting a parsed message into its readable text and its attachments.
//!
//! Extraction walks every leaf in document order. Inline text parts are
//! decoded into the plain-text and HTML renditions of the message. Every
//! leaf which is not inline text, or which is too large to keep with the
//! tree, has its body moved out into a `DetachedNode` and replaced in the
//! tree by a reference to the attachment id. The detached body is kept in
//! its transfer-encoded form so that the tree can still rebuild the exact
//! original bytes, and byte ranges of the rebuilt message map directly onto
//! ranges of the stored attachment.

use lazy_static::lazy_static;
use regex::Regex;

use super::encoded_word::decode_charset_lossy;
use super::quoted_printable::qp_decode;
use super::tree::{Body, Content, MimeNode, MimeTree, NodeId};

/// Leaf bodies larger than this are always detached.
pub const MAX_INLINE_BODY: u64 = 300 * 1024;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MailData {
    pub nodes: Vec<DetachedNode>,
    pub attachments: Vec<AttachmentInfo>,
    /// All inline plain text, in document order.
    pub text: String,
    /// All inline HTML, in document order.
    pub html: String,
}

/// A body removed from the tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DetachedNode {
    pub attachment_id: String,
    pub content_type: String,
    pub transfer_encoding: String,
    pub line_count: u64,
    /// The body exactly as it appeared in the message.
    pub body: Vec<u8>,
}

/// Metadata about an attachment suitable for showing to a user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttachmentInfo {
    pub id: String,
    pub filename: Option<String>,
    pub content_type: String,
    pub disposition: Option<String>,
    pub transfer_encoding: String,
    pub content_id: Option<String>,
    /// Whether the part is inside a `multipart/related`, i.e. probably an
    /// inline image for the HTML body.
    pub related: bool,
    /// Approximate decoded size in bytes.
    pub size_hint: u64,
}

impl MimeTree {
    /// Replace the inline body of leaf `id` with a reference to
    /// `attachment_id`, returning the removed body.
    ///
    /// Returns `None` and changes nothing if the node does not have an
    /// inline body, which makes detaching idempotent.
    pub fn detach(
        &mut self,
        id: NodeId,
        attachment_id: String,
    ) -> Option<Vec<u8>> {
        let node = self.node_mut(id);
        if !matches!(node.content, Content::Leaf(Body::Inline(Some(_)))) {
            return None;
        }

        match std::mem::replace(
            &mut node.content,
            Content::Leaf(Body::External { attachment_id }),
        ) {
            Content::Leaf(Body::Inline(body)) => body,
            _ => None,
        }
    }
}

/// Extract with sequential ids `ATT00001`, `ATT00002`, ...
pub fn extract(tree: &mut MimeTree) -> MailData {
    let mut next = 0u32;
    extract_with(tree, || {
        next += 1;
        format!("ATT{:05}", next)
    })
}

/// Extract, obtaining attachment ids from `new_id`.
pub fn extract_with(
    tree: &mut MimeTree,
    mut new_id: impl FnMut() -> String,
) -> MailData {
    let mut data = MailData::default();
    let mut pieces = Vec::<TextPiece>::new();

    for id in tree.document_order() {
        let node = &tree[id];
        let Some(body) = node.inline_body() else {
            continue;
        };

        let related = multipart_ancestor(tree, id, "related").is_some();
        let content_type = &node.parsed_header.content_type;
        let inline_text = is_inline_text(node);

        if inline_text {
            pieces.push(TextPiece {
                group: multipart_ancestor(tree, id, "alternative"),
                html: content_type.is("text", "html"),
                content: decode_text(node, body),
            });
        }

        if inline_text && node.size <= MAX_INLINE_BODY {
            continue;
        }

        let attachment_id = new_id();
        let header = &node.parsed_header;
        let info = AttachmentInfo {
            id: attachment_id.clone(),
            filename: filename(node),
            content_type: content_type.value(),
            disposition: header.disposition().map(str::to_owned),
            transfer_encoding: header.transfer_encoding().to_owned(),
            content_id: header.content_id.clone(),
            related,
            size_hint: decoded_size_hint(node),
        };
        let content_type = info.content_type.clone();
        let transfer_encoding = info.transfer_encoding.clone();
        let line_count = node.line_count;

        if let Some(body) = tree.detach(id, attachment_id.clone()) {
            data.nodes.push(DetachedNode {
                attachment_id,
                content_type,
                transfer_encoding,
                line_count,
                body,
            });
            data.attachments.push(info);
        }
    }

    let (text, html) = render_pieces(&pieces);
    data.text = text;
    data.html = html;
    data
}

/// One decoded inline text part.
struct TextPiece {
    /// The nearest enclosing `multipart/alternative`, if any.
    group: Option<NodeId>,
    html: bool,
    content: String,
}

/// Build the text and HTML renditions from the inline parts.
///
/// A part outside any alternative group contributes its own content to one
/// rendition and a conversion of it to the other. Inside an alternative
/// group a part only contributes a conversion if the group has no part of
/// the other kind at all.
fn render_pieces(pieces: &[TextPiece]) -> (String, String) {
    let group_has = |group: NodeId, html: bool| {
        pieces
            .iter()
            .any(|p| Some(group) == p.group && html == p.html)
    };

    let mut text = Vec::<String>::new();
    let mut html = Vec::<String>::new();
    for piece in pieces {
        let convert = piece.group.map_or(true, |g| !group_has(g, !piece.html));
        if piece.html {
            if convert {
                text.push(html_to_text(&piece.content));
            }
            html.push(piece.content.clone());
        } else {
            if convert {
                html.push(text_to_html(&piece.content));
            }
            text.push(piece.content.clone());
        }
    }

    (text.join("\n"), html.join("\n"))
}

fn multipart_ancestor(
    tree: &MimeTree,
    id: NodeId,
    subtype: &str,
) -> Option<NodeId> {
    let mut cursor = tree[id].parent;
    while let Some(parent) = cursor {
        if let Content::Multipart(ref mp) = tree[parent].content {
            if mp.subtype == subtype {
                return Some(parent);
            }
        }
        cursor = tree[parent].parent;
    }
    None
}

fn is_inline_text(node: &MimeNode) -> bool {
    let ct = &node.parsed_header.content_type;
    let texty = ct.is("text", "plain")
        || ct.is("text", "html")
        || ct.is("text", "rfc822-headers")
        || ct.is("message", "delivery-status");
    texty && Some("attachment") != node.parsed_header.disposition()
}

/// Decode a text body to a string with LF line endings.
fn decode_text(node: &MimeNode, body: &[u8]) -> String {
    let header = &node.parsed_header;
    let raw = decode_transfer(header.transfer_encoding(), body);
    let text = decode_charset_lossy(header.content_type.charset(), &raw)
        .replace("\r\n", "\n");

    let params = &header.content_type.params;
    if params
        .get("format")
        .map_or(false, |f| f.eq_ignore_ascii_case("flowed"))
    {
        let delsp = params
            .get("delsp")
            .map_or(false, |d| d.eq_ignore_ascii_case("yes"));
        decode_flowed(&text, delsp)
    } else {
        text
    }
}

/// Undo a content transfer encoding. Unknown encodings are treated as
/// identity.
pub fn decode_transfer(encoding: &str, body: &[u8]) -> Vec<u8> {
    match encoding {
        "base64" => {
            let compact = body
                .iter()
                .copied()
                .filter(|b| !b.is_ascii_whitespace())
                .collect::<Vec<u8>>();
            base64::decode(&compact).unwrap_or(compact)
        },
        "quoted-printable" => qp_decode(body),
        _ => body.to_vec(),
    }
}

fn filename(node: &MimeNode) -> Option<String> {
    let header = &node.parsed_header;
    header
        .content_disposition
        .as_ref()
        .and_then(|d| d.params.get("filename"))
        .or_else(|| header.content_type.params.get("name"))
        .filter(|f| !f.is_empty())
        .cloned()
}

fn decoded_size_hint(node: &MimeNode) -> u64 {
    match node.parsed_header.transfer_encoding() {
        "base64" => (node.size - 2 * node.line_count) / 4 * 3,
        _ => node.size,
    }
}

/// Decode `format=flowed` text (RFC 3676).
pub fn decode_flowed(text: &str, delsp: bool) -> String {
    let mut out = String::with_capacity(text.len());
    let mut joining = false;
    for line in text.split('\n') {
        let line = line.strip_prefix(' ').unwrap_or(line);
        if "-- " != line && line.ends_with(' ') {
            let line = if delsp { &line[..line.len() - 1] } else { line };
            out.push_str(line);
            joining = true;
        } else {
            out.push_str(line);
            out.push('\n');
            joining = false;
        }
    }

    if !joining && out.ends_with('\n') {
        out.pop();
    }
    out
}

/// Render plain text as simple HTML paragraphs.
pub fn text_to_html(text: &str) -> String {
    let escaped = text
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;");

    escaped
        .split("\n\n")
        .map(|p| p.trim_matches('\n'))
        .filter(|p| !p.trim().is_empty())
        .map(|p| format!("<p>{}</p>", p.replace('\n', "<br/>\n")))
        .collect::<Vec<_>>()
        .join("\n")
}

lazy_static! {
    static ref INVISIBLE_BLOCK: Regex =
        Regex::new(r"(?is)<(style|script|head)\b.*?</(style|script|head)\s*>")
            .unwrap();
    static ref LINE_BREAK_TAG: Regex =
        Regex::new(r"(?i)<br\s*/?>|</(p|div|li|tr|h[1-6])\s*>").unwrap();
    static ref ANY_TAG: Regex = Regex::new(r"(?s)<[^>]*>").unwrap();
    static ref NUMERIC_ENTITY: Regex =
        Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").unwrap();
    static ref EXCESS_BLANK_LINES: Regex = Regex::new(r"\n{3,}").unwrap();
}

/// Reduce HTML to readable plain text.
pub fn html_to_text(html: &str) -> String {
    let text = INVISIBLE_BLOCK.replace_all(html, "");
    let text = LINE_BREAK_TAG.replace_all(&text, "\n");
    let text = ANY_TAG.replace_all(&text, "");
    let text = NUMERIC_ENTITY.replace_all(&text, |c: &regex::Captures| {
        let n = &c[1];
        let code = match n.strip_prefix('x').or_else(|| n.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => n.parse::<u32>().ok(),
        };
        code.and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_default()
    });
    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&");

    EXCESS_BLANK_LINES
        .replace_all(text.trim(), "\n\n")
        .into_owned()
}
