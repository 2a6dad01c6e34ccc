use std::fmt;

use log::debug;

/// Numeric chunk tags as handed out by Particle-style modem transports.
pub mod code {
    pub const UNKNOWN: u32 = 0x00_0000;
    pub const OK: u32 = 0x11_0000;
    pub const ERROR: u32 = 0x12_0000;
    pub const RING: u32 = 0x21_0000;
    pub const CONNECT: u32 = 0x22_0000;
    pub const NO_CARRIER: u32 = 0x23_0000;
    pub const NO_DIALTONE: u32 = 0x24_0000;
    pub const BUSY: u32 = 0x25_0000;
    pub const NO_ANSWER: u32 = 0x26_0000;
    pub const PROMPT: u32 = 0x30_0000;
    pub const PLUS: u32 = 0x40_0000;
    pub const TEXT: u32 = 0x50_0000;
    pub const ABORTED: u32 = 0x60_0000;
}

/// The kind of a single response fragment delivered by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkKind {
    /// Text that matched no other category (identity strings, survey lines).
    Unknown,
    Ok,
    Error,
    Ring,
    Connect,
    NoCarrier,
    NoDialtone,
    Busy,
    NoAnswer,
    /// The `>` data prompt.
    Prompt,
    /// A `+COMMAND: ...` line, solicited or not.
    Plus,
    Text,
    Aborted,
}

impl ChunkKind {
    /// Map a numeric transport tag to a kind. Returns `None` for tags this
    /// crate does not know about.
    pub fn from_code(value: u32) -> Option<Self> {
        let kind = match value {
            code::UNKNOWN => Self::Unknown,
            code::OK => Self::Ok,
            code::ERROR => Self::Error,
            code::RING => Self::Ring,
            code::CONNECT => Self::Connect,
            code::NO_CARRIER => Self::NoCarrier,
            code::NO_DIALTONE => Self::NoDialtone,
            code::BUSY => Self::Busy,
            code::NO_ANSWER => Self::NoAnswer,
            code::PROMPT => Self::Prompt,
            code::PLUS => Self::Plus,
            code::TEXT => Self::Text,
            code::ABORTED => Self::Aborted,
            _ => return None,
        };
        Some(kind)
    }

    /// Classify one modem line (without its line terminators).
    ///
    /// Used by transports that read raw lines off a serial port rather than
    /// receiving pre-tagged fragments.
    pub fn classify(line: &str) -> Self {
        let line = line.trim_end_matches(['\r', '\n']);
        match line {
            "OK" => Self::Ok,
            "ERROR" => Self::Error,
            "RING" => Self::Ring,
            "NO CARRIER" => Self::NoCarrier,
            "NO DIALTONE" => Self::NoDialtone,
            "BUSY" => Self::Busy,
            "NO ANSWER" => Self::NoAnswer,
            "ABORTED" => Self::Aborted,
            _ if line.starts_with("+CME ERROR") || line.starts_with("+CMS ERROR") => Self::Error,
            _ if line.starts_with("CONNECT") => Self::Connect,
            _ if line.starts_with('>') => Self::Prompt,
            _ if line.starts_with('+') => Self::Plus,
            _ => Self::Unknown,
        }
    }

    /// Returns `true` for kinds that terminate a command.
    pub fn is_final(self) -> bool {
        matches!(
            self,
            Self::Ok
                | Self::Error
                | Self::NoCarrier
                | Self::NoDialtone
                | Self::Busy
                | Self::NoAnswer
                | Self::Aborted
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Unknown => "TYPE_UNKNOWN",
            Self::Ok => "TYPE_OK",
            Self::Error => "TYPE_ERROR",
            Self::Ring => "TYPE_RING",
            Self::Connect => "TYPE_CONNECT",
            Self::NoCarrier => "TYPE_NOCARRIER",
            Self::NoDialtone => "TYPE_NODIALTONE",
            Self::Busy => "TYPE_BUSY",
            Self::NoAnswer => "TYPE_NOANSWER",
            Self::Prompt => "TYPE_PROMPT",
            Self::Plus => "TYPE_PLUS",
            Self::Text => "TYPE_TEXT",
            Self::Aborted => "TYPE_ABORTED",
        }
    }
}

impl fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Log a received chunk at debug level, one log line per modem line.
///
/// Line terminators are shown as `\r` / `\n` and other non-printable bytes as
/// `0xNN`.
pub fn trace_chunk(kind: ChunkKind, bytes: &[u8]) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }
    debug!("cellular response type={} len={}", kind, bytes.len());
    for line in escape_lines(bytes) {
        debug!("{line}");
    }
}

fn escape_lines(bytes: &[u8]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut out = String::new();
    for &b in bytes {
        match b {
            b'\n' => {
                out.push_str("\\n");
                lines.push(std::mem::take(&mut out));
            }
            b'\r' => out.push_str("\\r"),
            b' '..=b'~' => out.push(b as char),
            _ => out.push_str(&format!("0x{b:02x}")),
        }
    }
    if !out.is_empty() {
        lines.push(out);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_final_codes() {
        assert_eq!(ChunkKind::classify("OK"), ChunkKind::Ok);
        assert_eq!(ChunkKind::classify("OK\r\n"), ChunkKind::Ok);
        assert_eq!(ChunkKind::classify("ERROR"), ChunkKind::Error);
        assert_eq!(ChunkKind::classify("+CME ERROR: 10"), ChunkKind::Error);
        assert_eq!(ChunkKind::classify("NO CARRIER"), ChunkKind::NoCarrier);
        assert!(ChunkKind::classify("BUSY").is_final());
    }

    #[test]
    fn test_classify_text() {
        assert_eq!(ChunkKind::classify("+CSQ: 20,99"), ChunkKind::Plus);
        assert_eq!(ChunkKind::classify("u-blox"), ChunkKind::Unknown);
        assert_eq!(ChunkKind::classify("MCC:234, MNC:10"), ChunkKind::Unknown);
        assert_eq!(ChunkKind::classify("CONNECT 115200"), ChunkKind::Connect);
        assert_eq!(ChunkKind::classify("> "), ChunkKind::Prompt);
        assert!(!ChunkKind::classify("+CSQ: 20,99").is_final());
    }

    #[test]
    fn test_from_code() {
        assert_eq!(ChunkKind::from_code(code::PLUS), Some(ChunkKind::Plus));
        assert_eq!(ChunkKind::from_code(code::UNKNOWN), Some(ChunkKind::Unknown));
        assert_eq!(ChunkKind::from_code(code::ABORTED), Some(ChunkKind::Aborted));
        assert_eq!(ChunkKind::from_code(0x42), None);
    }

    #[test]
    fn test_from_code_tag_values() {
        assert_eq!(ChunkKind::from_code(0x00_0000), Some(ChunkKind::Unknown));
        assert_eq!(ChunkKind::from_code(0x11_0000), Some(ChunkKind::Ok));
        assert_eq!(ChunkKind::from_code(0x12_0000), Some(ChunkKind::Error));
        assert_eq!(ChunkKind::from_code(0x21_0000), Some(ChunkKind::Ring));
        assert_eq!(ChunkKind::from_code(0x22_0000), Some(ChunkKind::Connect));
        assert_eq!(ChunkKind::from_code(0x23_0000), Some(ChunkKind::NoCarrier));
        assert_eq!(ChunkKind::from_code(0x24_0000), Some(ChunkKind::NoDialtone));
        assert_eq!(ChunkKind::from_code(0x25_0000), Some(ChunkKind::Busy));
        assert_eq!(ChunkKind::from_code(0x26_0000), Some(ChunkKind::NoAnswer));
        assert_eq!(ChunkKind::from_code(0x30_0000), Some(ChunkKind::Prompt));
        assert_eq!(ChunkKind::from_code(0x40_0000), Some(ChunkKind::Plus));
        assert_eq!(ChunkKind::from_code(0x50_0000), Some(ChunkKind::Text));
        assert_eq!(ChunkKind::from_code(0x60_0000), Some(ChunkKind::Aborted));
        assert_eq!(ChunkKind::from_code(0x1B_0000), None);
    }

    #[test]
    fn test_display_names() {
        assert_eq!(ChunkKind::Ring.to_string(), "TYPE_RING");
        assert_eq!(ChunkKind::Text.to_string(), "TYPE_TEXT");
    }

    #[test]
    fn test_escape_lines() {
        let lines = escape_lines(b"\r\n+CSQ: 20,99\r\n\x01tail");
        assert_eq!(lines, vec!["\\r\\n", "+CSQ: 20,99\\r\\n", "0x01tail"]);
    }
}
