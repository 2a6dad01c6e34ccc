pub mod chunk;
pub mod decoder;
pub mod error;
pub mod location;
pub mod metrics;
pub mod modem;
pub mod poll;
pub mod psm;
pub mod registration;
pub mod response;
mod scan;
pub mod survey;
pub mod transport;

pub use chunk::ChunkKind;
pub use decoder::{Completion, Continuation, Decoder};
pub use error::{CellularError, DecodeError, Result};
pub use location::LocationFix;
pub use metrics::{Band, rssi_to_bars};
pub use modem::{Modem, ModemConfig};
pub use psm::PsmStatus;
pub use registration::{Registration, RegistrationGrammar};
pub use response::{PlusResponse, SignalQuality, TextResponse};
pub use survey::{CellData, EnvironmentSurvey};
pub use transport::Transport;
