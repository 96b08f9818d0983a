//! STOMP 1.2 frame codec.
//!
//! A frame is a command line, zero or more `name:value` header lines, a
//! blank line, then a body terminated by NUL. Header names and values in
//! frames other than CONNECT/CONNECTED use backslash escaping for colon,
//! newline, carriage return, and backslash itself. A `content-length`
//! header, when present, takes precedence over NUL scanning so binary
//! bodies survive.

use crate::errors::{StompError, StompResult};

/// STOMP frame commands used by the snapshot handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    // Client frames
    Connect,
    Subscribe,
    Unsubscribe,
    Send,
    Disconnect,
    // Server frames
    Connected,
    Message,
    Receipt,
    Error,
}

impl Command {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Command::Connect => "CONNECT",
            Command::Subscribe => "SUBSCRIBE",
            Command::Unsubscribe => "UNSUBSCRIBE",
            Command::Send => "SEND",
            Command::Disconnect => "DISCONNECT",
            Command::Connected => "CONNECTED",
            Command::Message => "MESSAGE",
            Command::Receipt => "RECEIPT",
            Command::Error => "ERROR",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "CONNECT" | "STOMP" => Some(Command::Connect),
            "SUBSCRIBE" => Some(Command::Subscribe),
            "UNSUBSCRIBE" => Some(Command::Unsubscribe),
            "SEND" => Some(Command::Send),
            "DISCONNECT" => Some(Command::Disconnect),
            "CONNECTED" => Some(Command::Connected),
            "MESSAGE" => Some(Command::Message),
            "RECEIPT" => Some(Command::Receipt),
            "ERROR" => Some(Command::Error),
            _ => None,
        }
    }
}

/// One STOMP frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: Command,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Frame {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// First value of a header, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Serialize to wire bytes. Always emits `content-length` so the body
    /// survives embedded NULs.
    pub fn to_bytes(&self) -> Vec<u8> {
        let escaping = self.command != Command::Connect
            && self.command != Command::Connected;

        let mut out = Vec::with_capacity(self.body.len() + 64);
        out.extend_from_slice(self.command.as_str().as_bytes());
        out.push(b'\n');
        for (name, value) in &self.headers {
            if escaping {
                out.extend_from_slice(escape(name).as_bytes());
                out.push(b':');
                out.extend_from_slice(escape(value).as_bytes());
            } else {
                out.extend_from_slice(name.as_bytes());
                out.push(b':');
                out.extend_from_slice(value.as_bytes());
            }
            out.push(b'\n');
        }
        if !self.body.is_empty() {
            out.extend_from_slice(
                format!("content-length:{}\n", self.body.len()).as_bytes(),
            );
        }
        out.push(b'\n');
        out.extend_from_slice(&self.body);
        out.push(0);
        out
    }

    /// Parse one frame from wire bytes.
    ///
    /// Leading EOLs (heartbeats) are skipped. Returns `Ok(None)` when the
    /// input holds nothing but heartbeat newlines.
    pub fn parse(input: &[u8]) -> StompResult<Option<Frame>> {
        let mut pos = 0;

        while pos < input.len()
            && (input[pos] == b'\n' || input[pos] == b'\r')
        {
            pos += 1;
        }
        if pos >= input.len() {
            return Ok(None);
        }

        let command_line = read_line(input, &mut pos)?;
        let command = Command::from_str(&command_line).ok_or_else(|| {
            StompError::Frame {
                details: format!("unknown command {:?}", command_line).into(),
            }
        })?;
        let escaping =
            command != Command::Connect && command != Command::Connected;

        let mut headers = Vec::new();
        let mut content_length: Option<usize> = None;
        loop {
            let line = read_line(input, &mut pos)?;
            if line.is_empty() {
                break;
            }
            let (name, value) = line.split_once(':').ok_or_else(|| {
                StompError::Frame {
                    details: format!("malformed header {:?}", line).into(),
                }
            })?;
            let (name, value) = if escaping {
                (unescape(name)?, unescape(value)?)
            } else {
                (name.to_string(), value.to_string())
            };
            if name == "content-length" && content_length.is_none() {
                content_length = value.parse().ok();
            }
            headers.push((name, value));
        }

        let body = match content_length {
            Some(len) => {
                if pos + len > input.len() {
                    return Err(StompError::Frame {
                        details: "body shorter than content-length".into(),
                    });
                }
                input[pos..pos + len].to_vec()
            }
            None => {
                let end = input[pos..]
                    .iter()
                    .position(|&b| b == 0)
                    .map(|i| pos + i)
                    .unwrap_or(input.len());
                input[pos..end].to_vec()
            }
        };

        Ok(Some(Frame {
            command,
            headers,
            body,
        }))
    }
}

fn read_line(input: &[u8], pos: &mut usize) -> StompResult<String> {
    let start = *pos;
    while *pos < input.len() && input[*pos] != b'\n' {
        *pos += 1;
    }
    if *pos >= input.len() {
        return Err(StompError::Frame {
            details: "truncated frame".into(),
        });
    }
    let mut end = *pos;
    if end > start && input[end - 1] == b'\r' {
        end -= 1;
    }
    let line = std::str::from_utf8(&input[start..end])
        .map_err(|_| StompError::Frame {
            details: "non-utf8 header line".into(),
        })?
        .to_string();
    *pos += 1;
    Ok(line)
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
    out
}

fn unescape(s: &str) -> StompResult<String> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some('c') => out.push(':'),
            other => {
                return Err(StompError::Frame {
                    details: format!("bad escape \\{:?}", other).into(),
                })
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_send_frame() {
        let frame = Frame::new(Command::Send)
            .header("destination", "/topic/prices")
            .body("START");
        let bytes = frame.to_bytes();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.starts_with("SEND\ndestination:/topic/prices\n"));
        assert!(text.contains("content-length:5\n"));
        assert!(bytes.ends_with(b"START\0"));
    }

    #[test]
    fn round_trips_message_frame() {
        let frame = Frame::new(Command::Message)
            .header("destination", "/topic/prices")
            .header("subscription", "sub-0")
            .body(r#"{"rows":[{"id":1}]}"#);

        let parsed = Frame::parse(&frame.to_bytes()).unwrap().unwrap();
        assert_eq!(parsed.command, Command::Message);
        assert_eq!(parsed.get("destination"), Some("/topic/prices"));
        assert_eq!(parsed.body, frame.body);
    }

    #[test]
    fn round_trips_escaped_headers() {
        let frame = Frame::new(Command::Send)
            .header("destination", "/queue/a:b")
            .header("note", "line1\nline2\\tail");

        let parsed = Frame::parse(&frame.to_bytes()).unwrap().unwrap();
        assert_eq!(parsed.get("destination"), Some("/queue/a:b"));
        assert_eq!(parsed.get("note"), Some("line1\nline2\\tail"));
    }

    #[test]
    fn connect_headers_are_not_escaped() {
        let frame = Frame::new(Command::Connect)
            .header("accept-version", "1.2")
            .header("host", "broker");
        let text = String::from_utf8(frame.to_bytes()).unwrap();
        assert!(text.contains("accept-version:1.2\n"));
    }

    #[test]
    fn content_length_preserves_nul_in_body() {
        let frame = Frame::new(Command::Send)
            .header("destination", "/queue/bin")
            .body(vec![1u8, 0, 2]);
        let parsed = Frame::parse(&frame.to_bytes()).unwrap().unwrap();
        assert_eq!(parsed.body, vec![1u8, 0, 2]);
    }

    #[test]
    fn parses_frame_without_content_length() {
        let raw = b"MESSAGE\ndestination:/topic/x\n\nhello\0";
        let parsed = Frame::parse(raw).unwrap().unwrap();
        assert_eq!(parsed.command, Command::Message);
        assert_eq!(parsed.body, b"hello");
    }

    #[test]
    fn heartbeat_only_input_is_none() {
        assert!(Frame::parse(b"\n").unwrap().is_none());
        assert!(Frame::parse(b"\r\n\r\n").unwrap().is_none());
    }

    #[test]
    fn leading_heartbeats_are_skipped() {
        let raw = b"\n\nRECEIPT\nreceipt-id:77\n\n\0";
        let parsed = Frame::parse(raw).unwrap().unwrap();
        assert_eq!(parsed.command, Command::Receipt);
        assert_eq!(parsed.get("receipt-id"), Some("77"));
    }

    #[test]
    fn unknown_command_is_an_error() {
        let err = Frame::parse(b"NOPE\n\n\0").unwrap_err();
        assert!(err.to_string().contains("unknown command"));
    }

    #[test]
    fn truncated_frame_is_an_error() {
        assert!(Frame::parse(b"MESSAGE\ndest").is_err());
    }

    #[test]
    fn stomp_alias_maps_to_connect() {
        let parsed = Frame::parse(b"STOMP\naccept-version:1.2\n\n\0")
            .unwrap()
            .unwrap();
        assert_eq!(parsed.command, Command::Connect);
    }
}
