//! STOMP 1.2 frame codec
//!
//! Frames travel as WebSocket text messages: a command line, `name:value`
//! header lines, a blank line, the body, and a NUL terminator. Bare EOLs
//! between frames are heart-beats.

use crate::error::AppError;

const NUL: char = '\0';

/// A single STOMP frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Frame {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            headers: Vec::new(),
            body: String::new(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// First value of a header; repeated headers keep the first occurrence
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn connect(host: &str) -> Self {
        Frame::new("CONNECT")
            .with_header("accept-version", "1.1,1.2")
            .with_header("host", host)
            .with_header("heart-beat", "0,0")
    }

    pub fn subscribe(id: &str, destination: &str) -> Self {
        Frame::new("SUBSCRIBE")
            .with_header("id", id)
            .with_header("destination", destination)
    }

    pub fn send(destination: &str, body: impl Into<String>) -> Self {
        Frame::new("SEND")
            .with_header("destination", destination)
            .with_header("content-type", "application/json")
            .with_body(body)
    }

    pub fn disconnect() -> Self {
        Frame::new("DISCONNECT")
    }

    pub fn encode(&self) -> String {
        // CONNECT/CONNECTED headers are never escaped
        let escaped = !matches!(self.command.as_str(), "CONNECT" | "CONNECTED");

        let mut out = String::with_capacity(self.command.len() + self.body.len() + 64);
        out.push_str(&self.command);
        out.push('\n');
        for (name, value) in &self.headers {
            if escaped {
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
        if !self.body.is_empty() && self.header("content-length").is_none() {
            out.push_str(&format!("content-length:{}\n", self.body.len()));
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push(NUL);
        out
    }

    /// Decode every frame in a text message, skipping heart-beats
    pub fn decode_all(text: &str) -> Result<Vec<Frame>, AppError> {
        let mut segments: Vec<&str> = text.split(NUL).collect();
        let remainder = segments.pop().unwrap_or_default();
        if !is_blank(remainder) {
            return Err(AppError::Frame("missing NUL terminator".to_string()));
        }

        segments
            .into_iter()
            .filter(|segment| !is_blank(segment))
            .map(Frame::parse)
            .collect()
    }

    fn parse(segment: &str) -> Result<Frame, AppError> {
        let segment = segment.trim_start_matches(['\r', '\n']);
        let (head, body) = split_head(segment)
            .ok_or_else(|| AppError::Frame("missing blank line after headers".to_string()))?;

        let mut lines = head.lines().map(|line| line.trim_end_matches('\r'));
        let command = lines
            .next()
            .filter(|command| !command.is_empty())
            .ok_or_else(|| AppError::Frame("missing command".to_string()))?;
        let escaped = command != "CONNECTED" && command != "CONNECT";

        let mut headers = Vec::new();
        for line in lines {
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| AppError::Frame(format!("malformed header line '{}'", line)))?;
            if escaped {
                headers.push((unescape(name)?, unescape(value)?));
            } else {
                headers.push((name.to_string(), value.to_string()));
            }
        }

        Ok(Frame {
            command: command.to_string(),
            headers,
            body: body.to_string(),
        })
    }
}

fn is_blank(text: &str) -> bool {
    text.chars().all(|c| c == '\n' || c == '\r')
}

fn split_head(segment: &str) -> Option<(&str, &str)> {
    if let Some(index) = segment.find("\r\n\r\n") {
        if segment.find("\n\n").map_or(true, |lf| lf > index) {
            return Some((&segment[..index], &segment[index + 4..]));
        }
    }
    segment
        .find("\n\n")
        .map(|index| (&segment[..index], &segment[index + 2..]))
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            c => out.push(c),
        }
    }
    out
}

fn unescape(raw: &str) -> Result<String, AppError> {
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
                return Err(AppError::Frame(format!(
                    "invalid header escape '\\{}'",
                    other.map(String::from).unwrap_or_default()
                )))
            }
        }
    }
    Ok(out)
}
