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

//! Sample messages shared by the MIME and IMAP tests.

/// A minimal single-part message.
pub static SIMPLE: &[u8] = b"From: Alice <alice@example.com>\r\n\
To: bob@example.org\r\n\
Subject: Hello\r\n\
Date: Mon, 7 Feb 1994 21:52:25 -0800\r\n\
Message-ID: <simple@example.com>\r\n\
\r\n\
Hi Bob,\r\n\
\r\n\
How are you?\r\n";

/// A multipart/mixed message with a text part and a base64 attachment.
pub static MULTIPART_MIXED: &[u8] = b"From: Alice <alice@example.com>\r\n\
To: bob@example.org\r\n\
Subject: =?utf-8?Q?Caf=C3=A9?= report\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/mixed; boundary=\"=-=-=\"\r\n\
\r\n\
This is a multi-part message.\r\n\
--=-=-=\r\n\
Content-Type: text/plain\r\n\
\r\n\
Hello world\r\n\
\r\n\
--=-=-=\r\n\
Content-Type: application/octet-stream; name=\"data.bin\"\r\n\
Content-Disposition: attachment; filename=\"data.bin\"\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
AAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwdHh8gISIjJCUmJygpKissLS4v\r\n\
MDEyMzQ1Njc4OTo7PD0+P0BBQkNERUZHSElKS0xNTk9QUVJTVFVWV1hZWltcXV5f\r\n\
--=-=-=--\r\n\
epilogue\r\n";

/// A multipart/mixed message forwarding another message as its second part.
pub static NESTED_MESSAGE: &[u8] = b"From: Carol <carol@example.net>\r\n\
To: Alice <alice@example.com>\r\n\
Subject: Fwd: Inner\r\n\
Content-Type: multipart/mixed; boundary=outer\r\n\
\r\n\
--outer\r\n\
Content-Type: text/plain; charset=us-ascii\r\n\
\r\n\
See below.\r\n\
--outer\r\n\
Content-Type: message/rfc822\r\n\
\r\n\
From: Dave <dave@example.net>\r\n\
Subject: Inner\r\n\
\r\n\
Inner body\r\n\
--outer--\r\n";

/// A message whose first part is itself a multipart containing a forwarded
/// message as its second child, so that section `1.2` is the forward.
pub static FORWARD_IN_ALTERNATIVE: &[u8] = b"Subject: Deep\r\n\
Content-Type: multipart/mixed; boundary=a\r\n\
\r\n\
--a\r\n\
Content-Type: multipart/mixed; boundary=b\r\n\
\r\n\
--b\r\n\
Content-Type: text/plain\r\n\
\r\n\
first\r\n\
--b\r\n\
Content-Type: message/rfc822\r\n\
\r\n\
Subject: Forwarded\r\n\
\r\n\
forwarded text\r\n\
--b--\r\n\
--a\r\n\
Content-Type: text/html\r\n\
\r\n\
<p>second</p>\r\n\
--a--\r\n";

/// A multipart/alternative message with plain and HTML bodies.
pub static ALTERNATIVE: &[u8] = b"From: Alice <alice@example.com>\r\n\
Subject: Alternatives\r\n\
Content-Type: multipart/alternative; boundary=alt\r\n\
\r\n\
--alt\r\n\
Content-Type: text/plain; charset=iso-8859-1\r\n\
Content-Transfer-Encoding: quoted-printable\r\n\
\r\n\
Caf=E9 time\r\n\
--alt\r\n\
Content-Type: text/html; charset=utf-8\r\n\
\r\n\
<p>Caf\xc3\xa9 <b>time</b></p>\r\n\
--alt--\r\n";
