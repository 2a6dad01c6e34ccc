use thiserror::Error;

use crate::decoder::Completion;

pub type Result<T> = std::result::Result<T, CellularError>;

#[derive(Debug, Error)]
pub enum CellularError {
    #[cfg(feature = "serial")]
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no serial port found for {0}")]
    PortNotFound(String),

    #[error("modem answered {completion} to {command:?}")]
    Command {
        command: String,
        completion: Completion,
    },

    #[error("could not drive the modem power line")]
    Pin,
}

/// A response that did not match any grammar known for its command.
///
/// These never abort a command: the decoder keeps `valid == false` and the
/// caller treats the result as "no data".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unrecognized {command} response: {text:?}")]
    Grammar { command: String, text: String },

    #[error("{command} response ended after {fields} field(s)")]
    Truncated { command: String, fields: usize },
}

impl DecodeError {
    pub(crate) fn grammar(command: &str, text: &str) -> Self {
        Self::Grammar {
            command: command.to_string(),
            text: text.to_string(),
        }
    }
}
