use crate::chunk::ChunkKind;
use crate::decoder::{Completion, Continuation};
use crate::error::DecodeError;
use crate::metrics;
use crate::scan;

/// Accumulates plain (unknown-kind) response text verbatim, line
/// terminators included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextResponse {
    pub text: String,
    pub completion: Completion,
}

impl TextResponse {
    pub fn feed(&mut self, kind: ChunkKind, bytes: &[u8]) -> Continuation {
        if kind == ChunkKind::Unknown {
            self.text.push_str(&String::from_utf8_lossy(bytes));
        }
        Continuation::Wait
    }
}

/// Collects the payload of `+<COMMAND>: ...` lines for one command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlusResponse {
    /// Response key without the leading `+`, e.g. `CSQ`.
    pub command: String,
    /// Payloads of every matching line, concatenated.
    pub text: String,
    pub completion: Completion,
}

impl PlusResponse {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    pub fn feed(&mut self, kind: ChunkKind, bytes: &[u8]) -> Continuation {
        if kind == ChunkKind::Plus {
            self.append_payload(bytes);
        }
        Continuation::Wait
    }

    /// Copy everything after `\n+<COMMAND>: ` up to the next carriage return.
    /// Chunks without the marker contribute nothing.
    fn append_payload(&mut self, bytes: &[u8]) {
        let chunk = String::from_utf8_lossy(bytes);
        let marker = format!("\n+{}: ", self.command);
        if let Some(pos) = chunk.find(&marker) {
            let rest = &chunk[pos + marker.len()..];
            let end = rest.find('\r').unwrap_or(rest.len());
            self.text.push_str(&rest[..end]);
        }
    }

    /// Extract double-quoted content from the accumulated text.
    pub fn quoted_part(&self, only_first: bool) -> String {
        quoted_part(&self.text, only_first)
    }
}

/// Collect the characters that sit between double quotes.
///
/// With `only_first` extraction stops at the first closing quote. An
/// unterminated quote runs to the end of the text.
pub fn quoted_part(text: &str, only_first: bool) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_quotes = false;
    for ch in text.chars() {
        if ch == '"' {
            in_quotes = !in_quotes;
            if !in_quotes && only_first {
                break;
            }
        } else if in_quotes {
            result.push(ch);
        }
    }
    result
}

/// `+CSQ: <rssi>,<qual>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalQuality {
    pub raw: PlusResponse,
    /// Received signal strength in dBm, 0 when the modem reports 99 (unknown).
    pub rssi: i32,
    /// Raw quality value; 99 means not available.
    pub qual: i32,
    pub valid: bool,
}

impl Default for SignalQuality {
    fn default() -> Self {
        Self {
            raw: PlusResponse::new("CSQ"),
            rssi: 0,
            qual: 0,
            valid: false,
        }
    }
}

impl SignalQuality {
    pub fn finalize(&mut self) -> Result<(), DecodeError> {
        let mut fields = self.raw.text.split(',');
        let rssi = fields.next().and_then(scan::int_field);
        let qual = fields
            .next()
            .and_then(|f| scan::leading_int(f, 10))
            .map(|(v, _)| v as i32);

        match (rssi, qual) {
            (Some(rssi), Some(qual)) => {
                self.rssi = metrics::csq_to_dbm(rssi);
                self.qual = qual;
                self.valid = true;
                Ok(())
            }
            _ => {
                self.valid = false;
                Err(DecodeError::grammar(&self.raw.command, &self.raw.text))
            }
        }
    }

    /// Signal bars (0–5) for the reported RSSI.
    pub fn bars(&self) -> u8 {
        metrics::rssi_to_bars(self.rssi)
    }
}
