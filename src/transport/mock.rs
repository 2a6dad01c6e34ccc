use std::collections::VecDeque;
use std::time::Duration;

use super::{ChunkHandler, Transport};
use crate::chunk::ChunkKind;
use crate::decoder::{Completion, Continuation};
use crate::error::Result;

struct Exchange {
    command: String,
    chunks: Vec<(ChunkKind, Vec<u8>)>,
    completion: Completion,
}

/// Replays scripted modem answers in order.
///
/// Empty probe commands that have no scripted answer time out silently; any
/// other unscripted command panics.
#[derive(Default)]
pub(crate) struct MockTransport {
    script: VecDeque<Exchange>,
    pub(crate) sent: Vec<String>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Answer `command` with `chunks`, then `completion`.
    pub(crate) fn reply(
        mut self,
        command: &str,
        chunks: &[(ChunkKind, &str)],
        completion: Completion,
    ) -> Self {
        self.script.push_back(Exchange {
            command: command.to_string(),
            chunks: chunks
                .iter()
                .map(|(kind, text)| (*kind, text.as_bytes().to_vec()))
                .collect(),
            completion,
        });
        self
    }

    /// Answer `command` with a bare OK.
    pub(crate) fn ok(self, command: &str) -> Self {
        self.reply(command, &[], Completion::Ok)
    }

    pub(crate) fn is_exhausted(&self) -> bool {
        self.script.is_empty()
    }
}

impl Transport for MockTransport {
    fn command(
        &mut self,
        command: &str,
        _timeout: Duration,
        on_chunk: &mut ChunkHandler<'_>,
    ) -> Result<Completion> {
        self.sent.push(command.to_string());

        let matches = self
            .script
            .front()
            .is_some_and(|exchange| exchange.command == command);
        if !matches {
            assert!(
                command.is_empty(),
                "unscripted command {command:?}, next expected {:?}",
                self.script.front().map(|e| e.command.as_str())
            );
            return Ok(Completion::Timeout);
        }

        let Some(exchange) = self.script.pop_front() else {
            return Ok(Completion::Timeout);
        };
        for (kind, bytes) in &exchange.chunks {
            if on_chunk(*kind, bytes) == Continuation::Done {
                break;
            }
        }
        Ok(exchange.completion)
    }
}
