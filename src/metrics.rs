//! Values derived from raw survey and CSQ fields.

use std::fmt;

use crate::survey::CellData;

/// An inclusive channel-number range and the band it belongs to, in MHz.
struct BandRange {
    first: i32,
    last: i32,
    mhz: u16,
}

const fn range(first: i32, last: i32, mhz: u16) -> BandRange {
    BandRange { first, last, mhz }
}

/// UMTS uplink frequency numbers (ULF). First match wins.
const UMTS_BANDS: &[BandRange] = &[
    range(0, 124, 900),
    range(128, 251, 850),
    range(512, 885, 1800),
    range(975, 1023, 900),
    range(1312, 1513, 1700),
    range(2712, 2863, 900),
    range(4132, 4233, 850),
    range(4162, 4188, 800),
    range(20312, 20363, 800),
    range(9262, 9538, 1900),
    range(9612, 9888, 2100),
];

/// GSM ARFCNs. First match wins.
const GSM_BANDS: &[BandRange] = &[
    range(0, 124, 900),
    range(128, 251, 850),
    range(512, 885, 1800),
    range(975, 1023, 900),
];

fn lookup(table: &[BandRange], channel: i32) -> Band {
    table
        .iter()
        .find(|r| (r.first..=r.last).contains(&channel))
        .map_or(Band::Unknown, |r| Band::Mhz(r.mhz))
}

/// Frequency band of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Mhz(u16),
    Unknown,
}

impl Band {
    /// The band in MHz, 0 when unknown.
    pub fn mhz(self) -> u16 {
        match self {
            Self::Mhz(mhz) => mhz,
            Self::Unknown => 0,
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mhz(mhz) => write!(f, "{mhz}"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

/// Classify a cell by ULF (UMTS) or ARFCN (GSM).
pub fn band(cell: &CellData) -> Band {
    if cell.is_umts {
        lookup(UMTS_BANDS, cell.ulf)
    } else {
        lookup(GSM_BANDS, cell.arfcn)
    }
}

/// Human-readable band name, e.g. `UMTS 2100`, `DCS 1800` or `3G unknown`.
pub fn band_name(cell: &CellData) -> String {
    let band = band(cell);
    if cell.is_umts {
        let ulf = cell.ulf;
        match band {
            _ if (0..=124).contains(&ulf) || (128..=251).contains(&ulf) => format!("GSM {band}"),
            _ if (512..=885).contains(&ulf) => "DCS 1800".to_string(),
            _ if (975..=1023).contains(&ulf) => "ESGM 900".to_string(),
            Band::Mhz(mhz) => format!("UMTS {mhz}"),
            Band::Unknown => "3G unknown".to_string(),
        }
    } else {
        let arfcn = cell.arfcn;
        match band {
            _ if (512..=885).contains(&arfcn) => "DCS 1800 or 1900".to_string(),
            _ if (975..=1024).contains(&arfcn) => "EGSM 900".to_string(),
            Band::Mhz(mhz) => format!("GSM {mhz}"),
            Band::Unknown => "2G unknown".to_string(),
        }
    }
}

/// Signal strength in dBm from RSCP (UMTS) or RxLev (GSM); 0 when not reported.
pub fn rssi_dbm(cell: &CellData) -> i32 {
    let level = if cell.is_umts {
        cell.rscp_lev
    } else {
        cell.rxlev
    };
    if level <= 96 { -121 + level } else { 0 }
}

/// Convert a raw `+CSQ` RSSI index to dBm.
///
/// 0 is -113 dBm or less, 31 is -51 dBm or more, 99 means unknown and maps to 0.
pub fn csq_to_dbm(raw: i32) -> i32 {
    if raw < 99 { -113 + raw * 2 } else { 0 }
}

/// Signal bars (0–5) for an RSSI in dBm. Non-negative values mean "unknown".
pub fn rssi_to_bars(rssi: i32) -> u8 {
    match rssi {
        r if r >= 0 => 0,
        r if r >= -57 => 5,
        r if r > -68 => 4,
        r if r > -80 => 3,
        r if r > -92 => 2,
        r if r > -104 => 1,
        _ => 0,
    }
}
