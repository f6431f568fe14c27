// src/email/mime.rs

use std::{
    fmt,
    io::{self, Write},
};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use uuid::Uuid;

use super::MailError;

/// Headers that describe an entity's content rather than the message as a whole. They move
/// into the first part when a single-part message is promoted to multipart.
const CONTENT_HEADERS: &[&str] = &[
    "Content-Type",
    "Content-Transfer-Encoding",
    "Content-Disposition",
    "Content-ID",
    "Content-Description",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    /// Raw value; folded continuation lines are kept with their leading whitespace.
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<Header>);

impl Headers {
    /// Unfolded value of the first header called `name` (case-insensitive).
    pub fn get(&self, name: &str) -> Option<String> {
        self.0
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| {
                h.value
                    .split('\n')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push(Header {
            name: name.into(),
            value: value.into(),
        });
    }

    /// Remove every header called `name`, returning them in order.
    pub fn remove(&mut self, name: &str) -> Vec<Header> {
        let (removed, kept): (Vec<Header>, Vec<Header>) = std::mem::take(&mut self.0)
            .into_iter()
            .partition(|h| h.name.eq_ignore_ascii_case(name));
        self.0 = kept;
        removed
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.remove(name);
        self.push(name, value);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Header> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for h in &self.0 {
            writeln!(f, "{}: {}", h.name, h.value)?;
        }
        Ok(())
    }
}

/// A top-level body part: its headers and its still-encoded body bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl Part {
    pub fn parse(raw: &[u8]) -> Self {
        let (headers, body) = split_entity(raw);
        Self {
            headers,
            body: body.to_vec(),
        }
    }

    /// Lower-cased `type/subtype`, `text/plain` when absent.
    pub fn content_type(&self) -> String {
        self.headers
            .get("Content-Type")
            .map(|v| split_params(&v).0.to_ascii_lowercase())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "text/plain".to_string())
    }

    /// `filename` from Content-Disposition, falling back to the Content-Type `name`.
    pub fn filename(&self) -> Option<String> {
        let lookup = |header: &str, key: &str| {
            self.headers
                .get(header)
                .and_then(|v| param(&v, key))
                .filter(|s| !s.is_empty())
        };
        lookup("Content-Disposition", "filename").or_else(|| lookup("Content-Type", "name"))
    }

    /// Body bytes with the Content-Transfer-Encoding undone.
    pub fn decoded_body(&self) -> Result<Vec<u8>, base64::DecodeError> {
        let encoding = self
            .headers
            .get("Content-Transfer-Encoding")
            .map(|v| v.trim().to_ascii_lowercase());
        match encoding.as_deref() {
            Some("base64") => {
                let compact: Vec<u8> = self
                    .body
                    .iter()
                    .copied()
                    .filter(|b| !b.is_ascii_whitespace())
                    .collect();
                STANDARD.decode(compact)
            }
            Some("quoted-printable") => Ok(decode_quoted_printable(&self.body)),
            _ => Ok(self.body.clone()),
        }
    }

    /// A base64 `application/octet-stream` attachment.
    pub fn attachment(filename: &str, data: &[u8]) -> Self {
        let mut headers = Headers::default();
        headers.push(
            "Content-Type",
            format!("application/octet-stream; name=\"{}\"", filename),
        );
        headers.push("MIME-Version", "1.0");
        headers.push("Content-Transfer-Encoding", "base64");
        headers.push(
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", filename),
        );
        Self {
            headers,
            body: wrap_base64(data).into_bytes(),
        }
    }

    pub fn html(markup: &str) -> Self {
        let mut headers = Headers::default();
        headers.push("Content-Type", "text/html; charset=\"utf-8\"");
        headers.push("MIME-Version", "1.0");
        headers.push("Content-Transfer-Encoding", "7bit");
        Self {
            headers,
            body: markup.as_bytes().to_vec(),
        }
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "{}", self.headers)?;
        out.write_all(&self.body)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Single(Vec<u8>),
    Multipart {
        boundary: String,
        preamble: Vec<Vec<u8>>,
        parts: Vec<Part>,
        epilogue: Vec<Vec<u8>>,
    },
}

/// A parsed message. Only the top level is split; nested multiparts stay inside their part
/// untouched. Bodies are kept as raw bytes so an 8bit part in any charset survives parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub headers: Headers,
    pub body: Body,
}

impl Message {
    /// Parse an RFC 822 message. Line endings are normalised to `\n`.
    pub fn parse(raw: &[u8]) -> Result<Self, MailError> {
        // 1) Normalise CRLF so every later step splits on `\n` alone
        let raw = normalise_newlines(raw);

        // 2) Top-level header block
        let (headers, body) = split_entity(&raw);
        if headers.is_empty() {
            return Err(MailError::Malformed("no headers found".into()));
        }

        let content_type = headers.get("Content-Type").unwrap_or_default();
        let (mime_type, _) = split_params(&content_type);
        if !mime_type.to_ascii_lowercase().starts_with("multipart/") {
            return Ok(Self {
                headers,
                body: Body::Single(body.to_vec()),
            });
        }

        // 3) Split the body at the boundary lines
        let boundary = param(&content_type, "boundary")
            .filter(|b| !b.is_empty())
            .ok_or_else(|| MailError::Malformed(format!("{} without a boundary", mime_type)))?;
        let (preamble, parts, epilogue) = split_multipart(body, &boundary);
        Ok(Self {
            headers,
            body: Body::Multipart {
                boundary,
                preamble,
                parts,
                epilogue,
            },
        })
    }

    /// The top-level parts, or the message itself viewed as one part when it is not
    /// multipart.
    pub fn payloads(&self) -> Vec<Part> {
        match &self.body {
            Body::Multipart { parts, .. } => parts.clone(),
            Body::Single(body) => vec![Part {
                headers: self.headers.clone(),
                body: body.clone(),
            }],
        }
    }

    /// Append a part, first promoting a single-part message to `multipart/mixed` with its
    /// original content as the first part.
    pub fn attach(&mut self, part: Part) {
        if let Body::Single(body) = &mut self.body {
            // 1) Move the body and its content headers into a part of their own
            let mut original = Part {
                headers: Headers::default(),
                body: std::mem::take(body),
            };
            for name in CONTENT_HEADERS {
                original.headers.0.extend(self.headers.remove(name));
            }

            // 2) Re-type the message as multipart/mixed under a fresh boundary
            let boundary = format!("==============={}==", Uuid::new_v4().simple());
            self.headers.set(
                "Content-Type",
                format!("multipart/mixed; boundary=\"{}\"", boundary),
            );
            if self.headers.get("MIME-Version").is_none() {
                self.headers.push("MIME-Version", "1.0");
            }
            self.body = Body::Multipart {
                boundary,
                preamble: Vec::new(),
                parts: vec![original],
                epilogue: Vec::new(),
            };
        }

        if let Body::Multipart { parts, .. } = &mut self.body {
            parts.push(part);
        }
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "{}", self.headers)?;
        match &self.body {
            Body::Single(body) => out.write_all(body),
            Body::Multipart {
                boundary,
                preamble,
                parts,
                epilogue,
            } => {
                for line in preamble {
                    out.write_all(line)?;
                    out.write_all(b"\n")?;
                }
                for part in parts {
                    writeln!(out, "--{}", boundary)?;
                    part.write_to(out)?;
                    out.write_all(b"\n")?;
                }
                write!(out, "--{}--", boundary)?;
                if !epilogue.is_empty() {
                    out.write_all(b"\n")?;
                    out.write_all(&epilogue.join(&b'\n'))?;
                }
                Ok(())
            }
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        // writing into a Vec cannot fail
        let _ = self.write_to(&mut out);
        out
    }
}

fn is_header_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_graphic() && b != b':')
}

fn normalise_newlines(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut bytes = raw.iter().peekable();
    while let Some(&b) = bytes.next() {
        if b == b'\r' && bytes.peek() == Some(&&b'\n') {
            continue;
        }
        out.push(b);
    }
    out
}

fn split_line(bytes: &[u8]) -> (&[u8], &[u8]) {
    match bytes.iter().position(|&b| b == b'\n') {
        Some(i) => (&bytes[..i], &bytes[i + 1..]),
        None => (bytes, &bytes[bytes.len()..]),
    }
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|b| !matches!(b, b' ' | b'\t' | b'\r'))
        .map_or(0, |i| i + 1);
    &line[..end]
}

/// Split an entity into its header block and body. The body starts after the first blank
/// line, or at the first line that cannot be a header. Header lines are read as UTF-8, with
/// invalid bytes replaced.
fn split_entity(raw: &[u8]) -> (Headers, &[u8]) {
    let mut headers: Vec<Header> = Vec::new();
    let mut rest = raw;

    while !rest.is_empty() {
        let (line, remainder) = split_line(rest);

        if line.is_empty() {
            rest = remainder;
            break;
        }
        let line = String::from_utf8_lossy(line);
        if line.starts_with(' ') || line.starts_with('\t') {
            match headers.last_mut() {
                Some(last) => {
                    last.value.push('\n');
                    last.value.push_str(&line);
                }
                None => break,
            }
        } else {
            match line.split_once(':') {
                Some((name, value)) if is_header_name(name) => headers.push(Header {
                    name: name.to_string(),
                    value: value.strip_prefix(' ').unwrap_or(value).to_string(),
                }),
                _ => break,
            }
        }
        rest = remainder;
    }

    (Headers(headers), rest)
}

fn split_multipart(body: &[u8], boundary: &str) -> (Vec<Vec<u8>>, Vec<Part>, Vec<Vec<u8>>) {
    let delimiter = format!("--{}", boundary);
    let close = format!("--{}--", boundary);

    let mut preamble = Vec::new();
    let mut parts = Vec::new();
    let mut epilogue = Vec::new();
    let mut current: Option<Vec<&[u8]>> = None;
    let mut closed = false;

    for line in body.split(|&b| b == b'\n') {
        if closed {
            epilogue.push(line.to_vec());
            continue;
        }
        let trimmed = trim_line_end(line);
        if trimmed == close.as_bytes() || trimmed == delimiter.as_bytes() {
            if let Some(lines) = current.take() {
                parts.push(Part::parse(&lines.join(&b'\n')));
            }
            if trimmed == close.as_bytes() {
                closed = true;
            } else {
                current = Some(Vec::new());
            }
        } else if let Some(lines) = current.as_mut() {
            lines.push(line);
        } else {
            preamble.push(line.to_vec());
        }
    }
    // unterminated multipart: keep what was read
    if let Some(lines) = current.take() {
        parts.push(Part::parse(&lines.join(&b'\n')));
    }

    (preamble, parts, epilogue)
}

/// Split `type/subtype; key=value; ...` at semicolons outside quotes.
fn split_params(value: &str) -> (String, Vec<(String, String)>) {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;
    for c in value.chars() {
        match c {
            _ if escaped => {
                current.push(c);
                escaped = false;
            }
            '\\' if in_quotes => {
                current.push(c);
                escaped = true;
            }
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ';' if !in_quotes => pieces.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    pieces.push(current);

    let mut iter = pieces.into_iter();
    let mime_type = iter.next().unwrap_or_default().trim().to_string();
    let params = iter
        .filter_map(|p| {
            let (key, val) = p.split_once('=')?;
            Some((key.trim().to_ascii_lowercase(), unquote(val.trim())))
        })
        .collect();
    (mime_type, params)
}

fn unquote(value: &str) -> String {
    match value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
    {
        Some(inner) => inner.replace("\\\"", "\"").replace("\\\\", "\\"),
        None => value.to_string(),
    }
}

/// Value of parameter `key`. Besides the plain `key=value` form this understands the
/// RFC 2231 forms: `key*=charset'lang'%XX` and numbered `key*0=` / `key*1*=` segments.
fn param(header_value: &str, key: &str) -> Option<String> {
    let params = split_params(header_value).1;
    if let Some((_, v)) = params.iter().find(|(k, _)| k == key) {
        return Some(v.clone());
    }

    let extended = format!("{}*", key);
    if let Some((_, v)) = params.iter().find(|(k, _)| *k == extended) {
        let (charset, encoded) = split_charset(v);
        return Some(decode_charset(charset, percent_decode(encoded)));
    }

    let mut segments: Vec<(usize, bool, &str)> = params
        .iter()
        .filter_map(|(k, v)| {
            let rest = k.strip_prefix(key)?.strip_prefix('*')?;
            let (index, encoded) = match rest.strip_suffix('*') {
                Some(index) => (index, true),
                None => (rest, false),
            };
            Some((index.parse().ok()?, encoded, v.as_str()))
        })
        .collect();
    if segments.is_empty() {
        return None;
    }
    segments.sort_by_key(|(index, _, _)| *index);

    let mut charset = None;
    let mut bytes = Vec::new();
    for (index, encoded, value) in segments {
        if !encoded {
            bytes.extend_from_slice(value.as_bytes());
            continue;
        }
        // only the first segment carries the charset
        let value = if index == 0 {
            let (cs, rest) = split_charset(value);
            charset = cs;
            rest
        } else {
            value
        };
        bytes.extend(percent_decode(value));
    }
    Some(decode_charset(charset, bytes))
}

/// `utf-8'en'caf%C3%A9` → (`Some("utf-8")`, `caf%C3%A9`).
fn split_charset(value: &str) -> (Option<&str>, &str) {
    let mut pieces = value.splitn(3, '\'');
    match (pieces.next(), pieces.next(), pieces.next()) {
        (Some(charset), Some(_language), Some(rest)) => (Some(charset), rest),
        _ => (None, value),
    }
}

fn decode_charset(charset: Option<&str>, bytes: Vec<u8>) -> String {
    match charset.map(str::to_ascii_lowercase).as_deref() {
        Some("iso-8859-1" | "latin1" | "latin-1") => bytes.iter().map(|&b| char::from(b)).collect(),
        _ => String::from_utf8_lossy(&bytes).into_owned(),
    }
}

fn percent_decode(value: &str) -> Vec<u8> {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    out
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

fn decode_quoted_printable(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len());
    let lines: Vec<&[u8]> = body.split(|&b| b == b'\n').collect();

    for (i, line) in lines.iter().enumerate() {
        let line = trim_line_end(line);
        let (content, soft_break) = match line.strip_suffix(b"=") {
            Some(content) => (content, true),
            None => (line, false),
        };

        let mut j = 0;
        while j < content.len() {
            if content[j] == b'=' && j + 2 < content.len() {
                if let (Some(hi), Some(lo)) = (hex_value(content[j + 1]), hex_value(content[j + 2]))
                {
                    out.push(hi << 4 | lo);
                    j += 3;
                    continue;
                }
            }
            out.push(content[j]);
            j += 1;
        }

        if !soft_break && i + 1 < lines.len() {
            out.push(b'\n');
        }
    }
    out
}

fn wrap_base64(data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    encoded
        .as_bytes()
        .chunks(76)
        .map(String::from_utf8_lossy)
        .collect::<Vec<_>>()
        .join("\n")
}
