use std::fmt;

use crate::chunk::{self, ChunkKind};
use crate::error::DecodeError;
use crate::location::LocationFix;
use crate::psm::PsmStatus;
use crate::registration::Registration;
use crate::response::{PlusResponse, SignalQuality, TextResponse};
use crate::survey::EnvironmentSurvey;

/// How a command finished, as reported by the transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Completion {
    Ok,
    Error,
    Timeout,
    /// Not issued yet, or the transport reported something else.
    #[default]
    Unknown,
}

impl Completion {
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

impl fmt::Display for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::Error => write!(f, "ERROR"),
            Self::Timeout => write!(f, "TIMEOUT"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Returned from every chunk callback to tell the transport whether to keep
/// collecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    Wait,
    Done,
}

/// The decoder attached to one in-flight command.
///
/// Each variant borrows the response it fills in; the caller keeps ownership
/// and reads the typed fields once the command returns.
#[derive(Debug)]
pub enum Decoder<'a> {
    /// The response text is not needed.
    Discard,
    Text(&'a mut TextResponse),
    Plus(&'a mut PlusResponse),
    SignalQuality(&'a mut SignalQuality),
    Survey(&'a mut EnvironmentSurvey),
    Location(&'a mut LocationFix),
    Registration(&'a mut Registration),
    PsmStatus(&'a mut PsmStatus),
}

impl Decoder<'_> {
    /// Hand one response fragment to the decoder.
    ///
    /// May be called any number of times per command; state accumulates.
    pub fn feed(&mut self, kind: ChunkKind, bytes: &[u8]) -> Continuation {
        chunk::trace_chunk(kind, bytes);
        match self {
            Self::Discard => Continuation::Wait,
            Self::Text(r) => r.feed(kind, bytes),
            Self::Plus(r) => r.feed(kind, bytes),
            Self::SignalQuality(r) => r.raw.feed(kind, bytes),
            Self::Survey(r) => r.feed(kind, bytes),
            Self::Location(r) => r.raw.feed(kind, bytes),
            Self::Registration(r) => r.raw.feed(kind, bytes),
            Self::PsmStatus(r) => r.raw.feed(kind, bytes),
        }
    }

    /// Record the completion code the transport returned.
    pub fn complete(&mut self, completion: Completion) {
        match self {
            Self::Discard => {}
            Self::Text(r) => r.completion = completion,
            Self::Plus(r) => r.completion = completion,
            Self::SignalQuality(r) => r.raw.completion = completion,
            Self::Survey(r) => r.completion = completion,
            Self::Location(r) => r.raw.completion = completion,
            Self::Registration(r) => r.raw.completion = completion,
            Self::PsmStatus(r) => r.raw.completion = completion,
        }
    }

    /// Convert the accumulated text into typed fields.
    pub fn finalize(&mut self) -> Result<(), DecodeError> {
        match self {
            Self::Discard | Self::Text(_) | Self::Plus(_) | Self::Survey(_) => Ok(()),
            Self::SignalQuality(r) => r.finalize(),
            Self::Location(r) => r.finalize(),
            Self::Registration(r) => r.finalize(),
            Self::PsmStatus(r) => r.finalize(),
        }
    }
}

macro_rules! decoder_from {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl<'a> From<&'a mut $ty> for Decoder<'a> {
                fn from(response: &'a mut $ty) -> Self {
                    Decoder::$variant(response)
                }
            }
        )*
    };
}

decoder_from! {
    Text => TextResponse,
    Plus => PlusResponse,
    SignalQuality => SignalQuality,
    Survey => EnvironmentSurvey,
    Location => LocationFix,
    Registration => Registration,
    PsmStatus => PsmStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_display() {
        assert_eq!(Completion::Ok.to_string(), "OK");
        assert_eq!(Completion::Timeout.to_string(), "TIMEOUT");
        assert_eq!(Completion::default(), Completion::Unknown);
    }

    #[test]
    fn test_text_variant_accumulates_across_chunks() {
        let mut resp = TextResponse::default();
        {
            let mut decoder = Decoder::from(&mut resp);
            assert_eq!(decoder.feed(ChunkKind::Unknown, b"\r\nu-bl"), Continuation::Wait);
            decoder.feed(ChunkKind::Unknown, b"ox\r\n");
            decoder.feed(ChunkKind::Ok, b"\r\nOK\r\n");
            decoder.complete(Completion::Ok);
            decoder.finalize().unwrap();
        }
        assert_eq!(resp.text, "\r\nu-blox\r\n");
        assert_eq!(resp.completion, Completion::Ok);
    }

    #[test]
    fn test_signal_quality_variant() {
        let mut resp = SignalQuality::default();
        {
            let mut decoder = Decoder::from(&mut resp);
            decoder.feed(ChunkKind::Plus, b"\r\n+CSQ: 20,99\r\n");
            decoder.complete(Completion::Ok);
            decoder.finalize().unwrap();
        }
        assert!(resp.valid);
        assert_eq!(resp.rssi, -73);
        assert_eq!(resp.qual, 99);
    }

    #[test]
    fn test_discard_ignores_everything() {
        let mut decoder = Decoder::Discard;
        assert_eq!(decoder.feed(ChunkKind::Plus, b"\r\n+CSQ: 20,99\r\n"), Continuation::Wait);
        decoder.complete(Completion::Error);
        assert!(decoder.finalize().is_ok());
    }
}
