use std::fmt;

use crate::error::DecodeError;
use crate::response::PlusResponse;
use crate::scan;

/// Which registration command produced the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationGrammar {
    /// `+CREG` (circuit-switched).
    Creg,
    /// `+CEREG` (EPS). Also accepts the bare `<n>,<stat>` form.
    Cereg,
}

impl RegistrationGrammar {
    pub fn command(self) -> &'static str {
        match self {
            Self::Creg => "CREG",
            Self::Cereg => "CEREG",
        }
    }
}

/// Network registration status from `+CREG` / `+CEREG`.
///
/// Examples of accepted payloads:
/// - `2,1,"FFFE","C45C010",8` (SARA-R4, with the leading `<n>`)
/// - `1,"FFFE","C45C010",8` (SARA-U / SARA-G)
/// - `0,1` (CEREG only, when location reporting is off)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub grammar: RegistrationGrammar,
    pub raw: PlusResponse,
    /// Unsolicited result mode, only present in some forms.
    pub n: i32,
    /// Registration state; 1 is home network, 5 is roaming.
    pub stat: i32,
    pub lac: u32,
    pub ci: u32,
    /// Access technology.
    pub rat: i32,
    pub valid: bool,
}

struct Fields {
    n: Option<i32>,
    stat: i32,
    location: Option<(u32, u32, i32)>,
}

impl Registration {
    pub fn new(grammar: RegistrationGrammar) -> Self {
        Self {
            grammar,
            raw: PlusResponse::new(grammar.command()),
            n: 0,
            stat: 0,
            lac: 0,
            ci: 0,
            rat: 0,
            valid: false,
        }
    }

    pub fn creg() -> Self {
        Self::new(RegistrationGrammar::Creg)
    }

    pub fn cereg() -> Self {
        Self::new(RegistrationGrammar::Cereg)
    }

    /// Returns `true` when registered on the home network or roaming.
    pub fn is_registered(&self) -> bool {
        self.stat == 1 || self.stat == 5
    }

    /// Try the known forms in priority order and keep the first that matches.
    /// Fields absent from the matched form keep their previous value.
    pub fn finalize(&mut self) -> Result<(), DecodeError> {
        let fields: Vec<&str> = self.raw.text.split(',').collect();

        let parsed = parse_with_count(&fields)
            .or_else(|| parse_without_count(&fields))
            .or_else(|| match self.grammar {
                RegistrationGrammar::Cereg => parse_count_only(&fields),
                RegistrationGrammar::Creg => None,
            });

        let Some(parsed) = parsed else {
            return Err(DecodeError::grammar(&self.raw.command, &self.raw.text));
        };

        if let Some(n) = parsed.n {
            self.n = n;
        }
        self.stat = parsed.stat;
        if let Some((lac, ci, rat)) = parsed.location {
            self.lac = lac;
            self.ci = ci;
            self.rat = rat;
        }
        self.valid = true;
        Ok(())
    }
}

/// `<n>,<stat>,"<lac>","<ci>",<rat>`
fn parse_with_count(fields: &[&str]) -> Option<Fields> {
    let [n, stat, lac, ci, rat, ..] = fields else {
        return None;
    };
    Some(Fields {
        n: Some(scan::int_field(n)?),
        stat: scan::int_field(stat)?,
        location: Some(location(lac, ci, rat)?),
    })
}

/// `<stat>,"<lac>","<ci>",<rat>`
fn parse_without_count(fields: &[&str]) -> Option<Fields> {
    let [stat, lac, ci, rat, ..] = fields else {
        return None;
    };
    Some(Fields {
        n: None,
        stat: scan::int_field(stat)?,
        location: Some(location(lac, ci, rat)?),
    })
}

/// `<n>,<stat>`
fn parse_count_only(fields: &[&str]) -> Option<Fields> {
    let [n, stat, ..] = fields else {
        return None;
    };
    Some(Fields {
        n: Some(scan::int_field(n)?),
        stat: scan::leading_int(stat, 10)?.0 as i32,
        location: None,
    })
}

fn location(lac: &str, ci: &str, rat: &str) -> Option<(u32, u32, i32)> {
    Some((
        scan::quoted_hex_field(lac)?,
        scan::quoted_hex_field(ci)?,
        scan::leading_int(rat, 10)?.0 as i32,
    ))
}

impl fmt::Display for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.valid {
            return f.write_str("valid=false");
        }
        if self.grammar == RegistrationGrammar::Cereg {
            write!(f, "n={} ", self.n)?;
        }
        write!(
            f,
            "stat={} lac=0x{:x} ci=0x{:x} rat={}",
            self.stat, self.lac, self.ci, self.rat
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finalize(mut reg: Registration, text: &str) -> Registration {
        reg.raw.text = text.to_string();
        let _ = reg.finalize();
        reg
    }

    #[test]
    fn test_creg_five_fields() {
        let reg = finalize(Registration::creg(), "2,1,\"FFFE\",\"C45C010\",8");
        assert!(reg.valid);
        assert_eq!(reg.n, 2);
        assert_eq!(reg.stat, 1);
        assert_eq!(reg.lac, 0xFFFE);
        assert_eq!(reg.ci, 0xC45C010);
        assert_eq!(reg.rat, 8);
    }

    #[test]
    fn test_creg_both_grammars_agree() {
        let five = finalize(Registration::creg(), "2,1,\"FFFE\",\"C45C010\",8");
        let four = finalize(Registration::creg(), "1,\"FFFE\",\"C45C010\",8");
        assert!(five.valid && four.valid);
        assert_eq!(
            (five.stat, five.lac, five.ci, five.rat),
            (four.stat, four.lac, four.ci, four.rat)
        );
        assert_eq!(four.n, 0);
    }

    #[test]
    fn test_creg_rejects_count_only() {
        let mut reg = Registration::creg();
        reg.raw.text = "0,1".to_string();
        assert!(reg.finalize().is_err());
        assert!(!reg.valid);
    }

    #[test]
    fn test_cereg_count_only() {
        let reg = finalize(Registration::cereg(), "0,1");
        assert!(reg.valid);
        assert_eq!(reg.n, 0);
        assert_eq!(reg.stat, 1);
        assert_eq!(reg.lac, 0);
        assert!(reg.is_registered());
    }

    #[test]
    fn test_cereg_lowercase_hex() {
        let reg = finalize(Registration::cereg(), "2,1,\"3a9b\",\"0000c33d\",7");
        assert_eq!(reg.lac, 0x3a9b);
        assert_eq!(reg.ci, 0xc33d);
        assert_eq!(reg.rat, 7);
        assert_eq!(reg.to_string(), "n=2 stat=1 lac=0x3a9b ci=0xc33d rat=7");
    }

    #[test]
    fn test_cereg_extra_trailing_fields() {
        let reg = finalize(
            Registration::cereg(),
            "4,5,\"3a9b\",\"0000c33d\",7,,,\"00000000\",\"00000101\"",
        );
        assert!(reg.valid);
        assert_eq!(reg.stat, 5);
    }

    #[test]
    fn test_garbage() {
        let reg = finalize(Registration::cereg(), "busy");
        assert!(!reg.valid);
        assert_eq!(reg.to_string(), "valid=false");
    }

    #[test]
    fn test_creg_display() {
        let reg = finalize(Registration::creg(), "1,\"FFFE\",\"C45C010\",8");
        assert_eq!(reg.to_string(), "stat=1 lac=0xfffe ci=0xc45c010 rat=8");
    }
}
