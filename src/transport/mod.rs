use std::time::Duration;

use crate::chunk::ChunkKind;
use crate::decoder::{Completion, Continuation};
use crate::error::Result;

#[cfg(feature = "serial")]
pub mod serial;

#[cfg(test)]
pub(crate) mod mock;

/// Callback invoked once per response fragment.
pub type ChunkHandler<'a> = dyn FnMut(ChunkKind, &[u8]) -> Continuation + 'a;

/// An AT command channel to the modem.
///
/// Implementors send one command, hand every response fragment to `on_chunk`
/// as it arrives, and return how the command finished. The call blocks until
/// a final result code or the timeout. Echo suppression and framing are the
/// transport's business.
pub trait Transport {
    /// Issue `command` (without line terminator). An empty command sends
    /// nothing and only collects whatever the modem emits before `timeout`.
    fn command(
        &mut self,
        command: &str,
        timeout: Duration,
        on_chunk: &mut ChunkHandler<'_>,
    ) -> Result<Completion>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn command(
        &mut self,
        command: &str,
        timeout: Duration,
        on_chunk: &mut ChunkHandler<'_>,
    ) -> Result<Completion> {
        (**self).command(command, timeout, on_chunk)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn command(
        &mut self,
        command: &str,
        timeout: Duration,
        on_chunk: &mut ChunkHandler<'_>,
    ) -> Result<Completion> {
        (**self).command(command, timeout, on_chunk)
    }
}
