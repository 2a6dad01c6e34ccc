use std::fmt;

use crate::error::DecodeError;
use crate::response::PlusResponse;

/// Power save mode indication, `+UUPSMR: <stat>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PsmStatus {
    pub raw: PlusResponse,
    /// 1 when the modem entered PSM, 0 when it left.
    pub stat: i32,
    pub valid: bool,
}

impl Default for PsmStatus {
    fn default() -> Self {
        Self {
            raw: PlusResponse::new("UUPSMR"),
            stat: 0,
            valid: false,
        }
    }
}

impl PsmStatus {
    /// Look only at the last character of the accumulated text, then clear
    /// it so the next poll starts fresh.
    pub fn finalize(&mut self) -> Result<(), DecodeError> {
        let text = std::mem::take(&mut self.raw.text);
        let (valid, stat) = if text.ends_with('0') {
            (true, 0)
        } else if text.ends_with('1') {
            (true, 1)
        } else {
            (false, 0)
        };
        self.valid = valid;
        self.stat = stat;

        if valid || text.is_empty() {
            Ok(())
        } else {
            Err(DecodeError::grammar(&self.raw.command, &text))
        }
    }

    pub fn entered(&self) -> bool {
        self.valid && self.stat == 1
    }

    pub fn exited(&self) -> bool {
        self.valid && self.stat == 0
    }
}

impl fmt::Display for PsmStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.valid {
            write!(f, "psm status={}", self.stat)
        } else {
            f.write_str("valid=false")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkKind;

    #[test]
    fn test_entered() {
        let mut psm = PsmStatus::default();
        psm.raw.feed(ChunkKind::Plus, b"\r\n+UUPSMR: 1\r\n");
        psm.finalize().unwrap();
        assert!(psm.entered());
        assert_eq!(psm.to_string(), "psm status=1");
        assert!(psm.raw.text.is_empty());
    }

    #[test]
    fn test_exited() {
        let mut psm = PsmStatus::default();
        psm.raw.text = "0".to_string();
        psm.finalize().unwrap();
        assert!(psm.exited());
        assert!(!psm.entered());
    }

    #[test]
    fn test_empty_is_invalid_but_not_an_error() {
        let mut psm = PsmStatus::default();
        psm.raw.text = "1".to_string();
        psm.finalize().unwrap();
        assert!(psm.entered());

        // Nothing arrived on the next poll: the previous indication is gone.
        psm.finalize().unwrap();
        assert!(!psm.valid);
        assert_eq!(psm.stat, 0);
    }

    #[test]
    fn test_unrecognized_trailing_character() {
        let mut psm = PsmStatus::default();
        psm.raw.text = "2".to_string();
        assert!(psm.finalize().is_err());
        assert!(!psm.valid);
        assert!(psm.raw.text.is_empty());
    }
}
