//! STOMP 1.2 frame encoding and decoding.
//!
//! A frame is `COMMAND\n`, zero or more `name:value\n` headers, a blank
//! line, the body and a NUL byte. Bare EOLs between frames are heart-beats.

use std::time::Duration;

use crate::{MarketSyncError, Result};

/// STOMP commands this client sends or understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Connect,
    Connected,
    Subscribe,
    Unsubscribe,
    Disconnect,
    Message,
    Receipt,
    Error,
}

impl Command {
    /// Returns the wire-format command name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Connect => "CONNECT",
            Command::Connected => "CONNECTED",
            Command::Subscribe => "SUBSCRIBE",
            Command::Unsubscribe => "UNSUBSCRIBE",
            Command::Disconnect => "DISCONNECT",
            Command::Message => "MESSAGE",
            Command::Receipt => "RECEIPT",
            Command::Error => "ERROR",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        Some(match raw {
            "CONNECT" | "STOMP" => Command::Connect,
            "CONNECTED" => Command::Connected,
            "SUBSCRIBE" => Command::Subscribe,
            "UNSUBSCRIBE" => Command::Unsubscribe,
            "DISCONNECT" => Command::Disconnect,
            "MESSAGE" => Command::Message,
            "RECEIPT" => Command::Receipt,
            "ERROR" => Command::Error,
            _ => return None,
        })
    }

    /// CONNECT and CONNECTED headers are never escaped.
    fn escapes_headers(&self) -> bool {
        !matches!(self, Command::Connect | Command::Connected)
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

    /// Appends a header.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    /// Returns the first value of `name`; repeated headers keep the first.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// CONNECT frame offering STOMP 1.2 and the given heart-beat period.
    pub fn connect(host: &str, heartbeat: Duration, auth_token: Option<&str>) -> Self {
        let millis = heartbeat.as_millis();
        let mut frame = Frame::new(Command::Connect)
            .with_header("accept-version", "1.2")
            .with_header("host", host)
            .with_header("heart-beat", format!("{millis},{millis}"));
        if let Some(token) = auth_token {
            frame = frame.with_header("Authorization", format!("Bearer {token}"));
        }
        frame
    }

    pub fn subscribe(id: &str, destination: &str) -> Self {
        Frame::new(Command::Subscribe)
            .with_header("id", id)
            .with_header("destination", destination)
            .with_header("ack", "auto")
    }

    pub fn unsubscribe(id: &str) -> Self {
        Frame::new(Command::Unsubscribe).with_header("id", id)
    }

    pub fn disconnect() -> Self {
        Frame::new(Command::Disconnect)
    }

    /// Serializes the frame, NUL terminator included.
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(64 + self.body.len());
        out.push_str(self.command.as_str());
        out.push('\n');
        for (name, value) in &self.headers {
            if self.command.escapes_headers() {
                out.push_str(&escape(name));
                out.push(':');
                out.push_str(&escape(value));
            } else {
                out.push_str(name);
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

    /// Decodes every frame in `raw`, skipping heart-beat EOLs.
    ///
    /// # Errors
    ///
    /// Returns [`MarketSyncError::Frame`] if any frame is truncated, has an
    /// unknown command, or carries a malformed header.
    pub fn decode_all(raw: &str) -> Result<Vec<Frame>> {
        Self::decode_each(raw).collect()
    }

    /// Decodes the frames in `raw` one by one. A malformed frame yields an
    /// error in its place without affecting its neighbours; a trailing frame
    /// without a NUL terminator ends the sequence with an error.
    pub fn decode_each(raw: &str) -> impl Iterator<Item = Result<Frame>> + '_ {
        let mut rest = raw;
        std::iter::from_fn(move || {
            rest = rest.trim_start_matches(['\r', '\n']);
            if rest.is_empty() {
                return None;
            }
            let Some(end) = rest.find('\0') else {
                rest = "";
                return Some(Err(MarketSyncError::Frame(
                    "missing NUL terminator".to_string(),
                )));
            };
            let chunk = &rest[..end];
            rest = &rest[end + 1..];
            Some(Self::decode_one(chunk))
        })
    }

    fn decode_one(raw: &str) -> Result<Frame> {
        let mut rest = raw;

        let command_line = next_line(&mut rest)?;
        let command = Command::parse(command_line)
            .ok_or_else(|| MarketSyncError::Frame(format!("unknown command {command_line:?}")))?;

        let mut headers = Vec::new();
        loop {
            let line = next_line(&mut rest)?;
            if line.is_empty() {
                break;
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| MarketSyncError::Frame(format!("malformed header {line:?}")))?;
            if command.escapes_headers() {
                headers.push((unescape(name)?, unescape(value)?));
            } else {
                headers.push((name.to_string(), value.to_string()));
            }
        }

        Ok(Frame {
            command,
            headers,
            body: rest.to_string(),
        })
    }
}

/// Splits the next EOL-terminated line off `rest`, dropping a trailing CR.
fn next_line<'a>(rest: &mut &'a str) -> Result<&'a str> {
    let current = *rest;
    let idx = current
        .find('\n')
        .ok_or_else(|| MarketSyncError::Frame("missing header terminator".to_string()))?;
    *rest = &current[idx + 1..];
    let line = &current[..idx];
    Ok(line.strip_suffix('\r').unwrap_or(line))
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
    out
}

fn unescape(raw: &str) -> Result<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            other => {
                return Err(MarketSyncError::Frame(format!(
                    "invalid header escape \\{}",
                    other.map(String::from).unwrap_or_default()
                )));
            }
        }
    }
    Ok(out)
}

/// Heart-beat periods agreed with the broker; `None` disables a direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Heartbeat {
    /// How often we must send an EOL.
    pub outgoing: Option<Duration>,
    /// How often the broker promises to send something.
    pub incoming: Option<Duration>,
}

impl Heartbeat {
    /// Negotiates from our offer (`cx == cy == offered`) and the broker's
    /// `heart-beat: sx,sy` header.
    pub fn negotiate(offered: Duration, header: Option<&str>) -> Self {
        let Some((sx, sy)) = header.and_then(|h| {
            let (sx, sy) = h.split_once(',')?;
            Some((sx.trim().parse::<u64>().ok()?, sy.trim().parse::<u64>().ok()?))
        }) else {
            return Self::default();
        };

        let ours = offered.as_millis() as u64;
        let agree = |theirs: u64| {
            (ours != 0 && theirs != 0).then(|| Duration::from_millis(ours.max(theirs)))
        };

        Self {
            outgoing: agree(sy),
            incoming: agree(sx),
        }
    }
}
