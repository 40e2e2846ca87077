//! STOMP 1.2 frame codec.
//!
//! A frame is a command line, `key:value` header lines, a blank line, a body
//! and a terminating NUL. Bare EOLs between frames are heart-beats.

use std::fmt;
use std::str::FromStr;

use crate::error::{BoardError, BoardResult};

/// Frame commands understood by the board transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    // Client frames
    Connect,
    Stomp,
    Send,
    Subscribe,
    Unsubscribe,
    Ack,
    Nack,
    Begin,
    Commit,
    Abort,
    Disconnect,
    // Server frames
    Connected,
    Message,
    Receipt,
    Error,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Stomp => "STOMP",
            Self::Send => "SEND",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Ack => "ACK",
            Self::Nack => "NACK",
            Self::Begin => "BEGIN",
            Self::Commit => "COMMIT",
            Self::Abort => "ABORT",
            Self::Disconnect => "DISCONNECT",
            Self::Connected => "CONNECTED",
            Self::Message => "MESSAGE",
            Self::Receipt => "RECEIPT",
            Self::Error => "ERROR",
        }
    }

    /// CONNECT, STOMP and CONNECTED headers are sent without escaping.
    fn escapes_headers(&self) -> bool {
        !matches!(self, Self::Connect | Self::Stomp | Self::Connected)
    }
}

impl FromStr for Command {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "CONNECT" => Self::Connect,
            "STOMP" => Self::Stomp,
            "SEND" => Self::Send,
            "SUBSCRIBE" => Self::Subscribe,
            "UNSUBSCRIBE" => Self::Unsubscribe,
            "ACK" => Self::Ack,
            "NACK" => Self::Nack,
            "BEGIN" => Self::Begin,
            "COMMIT" => Self::Commit,
            "ABORT" => Self::Abort,
            "DISCONNECT" => Self::Disconnect,
            "CONNECTED" => Self::Connected,
            "MESSAGE" => Self::Message,
            "RECEIPT" => Self::Receipt,
            "ERROR" => Self::Error,
            other => return Err(BoardError::frame(format!("unknown command {other:?}"))),
        })
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single STOMP frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: Command,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Frame {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// Append a header.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Value of the first header named `key`. Repeated headers keep the first value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Serialize to wire text, including the trailing NUL.
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(64 + self.body.len());
        out.push_str(self.command.as_str());
        out.push('\n');
        for (key, value) in &self.headers {
            if self.command.escapes_headers() {
                escape_into(&mut out, key);
                out.push(':');
                escape_into(&mut out, value);
            } else {
                out.push_str(key);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }

    /// Parse exactly one frame. Heart-beat-only input yields `Ok(None)`.
    pub fn parse(raw: &str) -> BoardResult<Option<Self>> {
        let mut frames = Self::parse_all(raw)?;
        match frames.len() {
            0 => Ok(None),
            1 => Ok(frames.pop()),
            n => Err(BoardError::frame(format!("expected one frame, found {n}"))),
        }
    }

    /// Parse every frame in `raw`, skipping heart-beats between them.
    pub fn parse_all(raw: &str) -> BoardResult<Vec<Self>> {
        let mut frames = Vec::new();
        let mut rest = raw;
        loop {
            rest = skip_eols(rest);
            if rest.is_empty() {
                return Ok(frames);
            }
            let (frame, remaining) = Self::parse_one(rest)?;
            frames.push(frame);
            rest = remaining;
        }
    }

    fn parse_one(input: &str) -> BoardResult<(Self, &str)> {
        let (command_line, mut rest) =
            split_line(input).ok_or_else(|| BoardError::frame("missing command line"))?;
        let command: Command = command_line.parse()?;

        let mut headers = Vec::new();
        loop {
            let (line, remaining) =
                split_line(rest).ok_or_else(|| BoardError::frame("unterminated headers"))?;
            rest = remaining;
            if line.is_empty() {
                break;
            }
            let (key, value) = line
                .split_once(':')
                .ok_or_else(|| BoardError::frame(format!("header without ':' {line:?}")))?;
            if command.escapes_headers() {
                headers.push((unescape(key)?, unescape(value)?));
            } else {
                headers.push((key.to_string(), value.to_string()));
            }
        }

        let content_length = headers
            .iter()
            .find(|(k, _)| k == "content-length")
            .map(|(_, v)| {
                v.trim()
                    .parse::<usize>()
                    .map_err(|_| BoardError::frame(format!("bad content-length {v:?}")))
            })
            .transpose()?;

        let body_len = match content_length {
            Some(len) => {
                if rest.len() <= len || !rest.is_char_boundary(len) || rest.as_bytes()[len] != 0 {
                    return Err(BoardError::frame("body does not match content-length"));
                }
                len
            }
            None => rest
                .find('\0')
                .ok_or_else(|| BoardError::frame("frame is not NUL-terminated"))?,
        };

        let frame = Self {
            command,
            headers,
            body: rest[..body_len].to_string(),
        };
        Ok((frame, &rest[body_len + 1..]))
    }
}

/// Split off one line, accepting both `\n` and `\r\n`.
fn split_line(input: &str) -> Option<(&str, &str)> {
    let (line, rest) = input.split_once('\n')?;
    Some((line.strip_suffix('\r').unwrap_or(line), rest))
}

fn skip_eols(mut input: &str) -> &str {
    loop {
        if let Some(rest) = input.strip_prefix('\n') {
            input = rest;
        } else if let Some(rest) = input.strip_prefix("\r\n") {
            input = rest;
        } else {
            return input;
        }
    }
}

fn escape_into(out: &mut String, value: &str) {
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
}

fn unescape(value: &str) -> BoardResult<String> {
    if !value.contains('\\') {
        return Ok(value.to_string());
    }
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            other => {
                return Err(BoardError::frame(format!(
                    "undefined escape sequence \\{}",
                    other.map(String::from).unwrap_or_default()
                )))
            }
        }
    }
    Ok(out)
}
