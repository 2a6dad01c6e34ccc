use std::fmt;

use crate::error::DecodeError;
use crate::response::PlusResponse;
use crate::scan;

/// Cell-based location fix from `+UULOC: <date>,<time>,<lat>,<lon>,<alt>,<uncertainty>`.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationFix {
    pub raw: PlusResponse,
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lon: f64,
    /// Altitude in meters.
    pub alt: i32,
    /// Estimated accuracy radius in meters.
    pub uncertainty: i32,
    pub valid: bool,
}

impl Default for LocationFix {
    fn default() -> Self {
        Self {
            // AT+ULOC answers with +UULOC.
            raw: PlusResponse::new("UULOC"),
            lat: 0.0,
            lon: 0.0,
            alt: 0,
            uncertainty: 0,
            valid: false,
        }
    }
}

impl LocationFix {
    /// Parse the accumulated text. Fields are assigned left to right; a
    /// missing or malformed field stops parsing and leaves the rest untouched.
    pub fn finalize(&mut self) -> Result<(), DecodeError> {
        let truncated = |fields| DecodeError::Truncated {
            command: self.raw.command.clone(),
            fields,
        };

        let text = self.raw.text.clone();
        let mut fields = text.split(',').filter(|f| !f.is_empty());

        // date, time
        if fields.next().is_none() {
            return Err(truncated(0));
        }
        if fields.next().is_none() {
            return Err(truncated(1));
        }

        match fields.next().and_then(|f| f.trim().parse::<f64>().ok()) {
            Some(lat) => self.lat = lat,
            None => return Err(truncated(2)),
        }
        match fields.next().and_then(|f| f.trim().parse::<f64>().ok()) {
            Some(lon) => self.lon = lon,
            None => return Err(truncated(3)),
        }
        match fields.next().and_then(|f| scan::leading_int(f, 10)) {
            Some((alt, _)) => self.alt = alt as i32,
            None => return Err(truncated(4)),
        }
        match fields.next().and_then(|f| scan::leading_int(f, 10)) {
            Some((uncertainty, _)) => self.uncertainty = uncertainty as i32,
            None => return Err(truncated(5)),
        }

        self.valid = true;
        Ok(())
    }
}

impl fmt::Display for LocationFix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.valid {
            write!(
                f,
                "lat={:.6} lon={:.6} alt={} uncertainty={}",
                self.lat, self.lon, self.alt, self.uncertainty
            )
        } else {
            f.write_str("valid=false")
        }
    }
}
