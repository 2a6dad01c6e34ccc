use std::fmt;

use log::info;

use crate::chunk::ChunkKind;
use crate::decoder::{Completion, Continuation};
use crate::metrics::{self, Band};
use crate::scan;

/// Longest survey key the tokenizer accepts.
const MAX_KEY_LEN: usize = 15;

/// CI ceiling for UMTS cells (28-bit cell identity).
const UMTS_CI_LIMIT: u32 = 0xFFF_FFFF;
/// CI ceiling for GSM cells (16-bit cell identity).
const GSM_CI_LIMIT: u32 = 0xFFFF;

/// One serving or neighbor cell from a `+CGED` survey.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellData {
    /// Mobile country code.
    pub mcc: i32,
    /// Mobile network code.
    pub mnc: i32,
    /// Location area code.
    pub lac: u32,
    /// Cell identity.
    pub ci: u32,
    /// Base station identity code (GSM).
    pub bsic: u32,
    /// Absolute radio frequency channel number (GSM).
    pub arfcn: i32,
    /// Received level (GSM), 0–63.
    pub rxlev: i32,
    /// Received signal code power level (UMTS).
    pub rscp_lev: i32,
    /// Downlink frequency number (UMTS).
    pub dlf: i32,
    /// Uplink frequency number (UMTS).
    pub ulf: i32,
    pub is_umts: bool,
}

impl Default for CellData {
    fn default() -> Self {
        Self {
            mcc: 0xFFFF,
            mnc: 0xFFFF,
            lac: 0xFFFF,
            ci: u32::MAX,
            bsic: 0xFF,
            arfcn: 0xFFFF,
            rxlev: 0xFF,
            rscp_lev: 0xFF,
            dlf: 0xFFFF,
            ulf: 0xFFFF,
            is_umts: false,
        }
    }
}

impl CellData {
    /// Tokenize one survey line (`KEY:value, KEY:value, ...`) into this cell.
    ///
    /// Tokens without a colon and unknown keys are skipped; nothing already
    /// set is ever reset.
    pub fn parse(&mut self, line: &str) {
        for pair in line.split(',') {
            let pair = pair.trim_start_matches(' ');
            if let Some((key, value)) = pair.split_once(':') {
                self.add_key_value(key, value);
            }
        }
    }

    /// Apply a single key/value pair. Keys are case-insensitive.
    pub fn add_key_value(&mut self, key: &str, value: &str) {
        if key.len() > MAX_KEY_LEN {
            info!("key too long key={key} value={value}");
            return;
        }

        match key.to_ascii_uppercase().as_str() {
            "RAT" => self.is_umts = value.contains("UMTS"),
            "MCC" => self.mcc = scan::dec_or_zero(value),
            "MNC" => self.mnc = scan::dec_or_zero(value),
            "LAC" => self.lac = scan::hex_or_zero(value) as u32,
            "CI" => self.ci = scan::hex_or_zero(value) as u32,
            "BSIC" => self.bsic = scan::hex_or_zero(value) as u32,
            // Documented as hex, but modems send it in decimal.
            "ARFCN" => self.arfcn = scan::dec_or_zero(value),
            "RXLEV" => self.rxlev = scan::hex_or_zero(value) as i32,
            "DLF" => self.dlf = scan::dec_or_zero(value),
            "ULF" => {
                self.ulf = scan::dec_or_zero(value);
                // Only UMTS cells report ULF; AT+CGED=5 omits RAT.
                self.is_umts = true;
            }
            "RSCP LEV" => self.rscp_lev = scan::dec_or_zero(value),
            "ARFCN_DED" | "RXLEVSUB" | "T_ADV" | "RAC" | "SC" | "ECN0 LEV" => {}
            _ => info!("unknown key={key} value={value}"),
        }
    }

    /// MCC must be at most 999 and, unless `ignore_ci`, CI must be below the
    /// ceiling for the cell's radio access technology.
    pub fn is_valid(&self, ignore_ci: bool) -> bool {
        if self.mcc > 999 {
            return false;
        }
        if ignore_ci {
            return true;
        }
        let limit = if self.is_umts {
            UMTS_CI_LIMIT
        } else {
            GSM_CI_LIMIT
        };
        self.ci < limit
    }

    pub fn band(&self) -> Band {
        metrics::band(self)
    }

    pub fn band_name(&self) -> String {
        metrics::band_name(self)
    }

    pub fn rssi(&self) -> i32 {
        metrics::rssi_dbm(self)
    }

    pub fn bars(&self) -> u8 {
        metrics::rssi_to_bars(self.rssi())
    }
}

impl fmt::Display for CellData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rat = if self.is_umts { "UMTS" } else { "GSM" };
        write!(
            f,
            "rat={rat} mcc={}, mnc={}, lac={:x} ci={:x} band={} rssi={}",
            self.mcc,
            self.mnc,
            self.lac,
            self.ci,
            self.band_name(),
            self.rssi()
        )?;
        if self.is_umts {
            write!(f, " dlf={} ulf={}", self.dlf, self.ulf)
        } else {
            write!(f, " bsic={:x} arfcn={} rxlev={}", self.bsic, self.arfcn, self.rxlev)
        }
    }
}

/// Serving cell plus a fixed number of neighbor slots, filled from `+CGED`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentSurvey {
    /// Response key, `CGED`.
    pub command: String,
    pub completion: Completion,
    pub serving: CellData,
    neighbors: Vec<CellData>,
    /// `None` until the serving cell's MCC line arrives, then the number of
    /// neighbor slots written so far.
    filled: Option<usize>,
}

impl Default for EnvironmentSurvey {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl EnvironmentSurvey {
    /// A survey with room for `neighbors` neighbor cells. Extra neighbor lines
    /// are dropped.
    pub fn with_capacity(neighbors: usize) -> Self {
        Self {
            command: "CGED".to_string(),
            completion: Completion::Unknown,
            serving: CellData::default(),
            neighbors: vec![CellData::default(); neighbors],
            filled: None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.neighbors.len()
    }

    /// Reset for reuse; keeps the neighbor capacity.
    pub fn clear(&mut self) {
        self.completion = Completion::Unknown;
        self.serving = CellData::default();
        self.neighbors.fill(CellData::default());
        self.filled = None;
    }

    pub fn feed(&mut self, kind: ChunkKind, bytes: &[u8]) -> Continuation {
        if kind != ChunkKind::Unknown && kind != ChunkKind::Plus {
            return Continuation::Wait;
        }

        let text = String::from_utf8_lossy(bytes);
        let prefix = format!("+{}: ", self.command);
        for line in text.split(['\r', '\n']).filter(|l| !l.is_empty()) {
            let line = match kind {
                ChunkKind::Plus => line.strip_prefix(prefix.as_str()).unwrap_or(line),
                _ => line,
            };
            self.parse_line(line);
        }
        Continuation::Wait
    }

    fn parse_line(&mut self, line: &str) {
        if line.starts_with("MCC:") {
            match self.filled {
                None => {
                    self.serving.parse(line);
                    self.filled = Some(0);
                }
                Some(n) if n < self.neighbors.len() => {
                    self.neighbors[n].parse(line);
                    self.filled = Some(n + 1);
                }
                Some(_) => {}
            }
        } else if line.starts_with("RAT:") {
            // Sent ahead of the MCC line to say whether the serving cell is 2G or 3G.
            self.serving.parse(line);
        }
    }

    /// Number of usable neighbors: stops at the first written slot that is not
    /// valid.
    pub fn num_neighbors(&self) -> usize {
        match self.filled {
            None => 0,
            Some(n) => self.neighbors[..n]
                .iter()
                .position(|cell| !cell.is_valid(false))
                .unwrap_or(n),
        }
    }

    /// The usable neighbors, see [`num_neighbors`](Self::num_neighbors).
    pub fn neighbors(&self) -> &[CellData] {
        &self.neighbors[..self.num_neighbors()]
    }

    /// Every neighbor slot, written or not.
    pub fn neighbor_slots(&self) -> &[CellData] {
        &self.neighbors
    }

    pub fn log_summary(&self) {
        info!("service {}", self.serving);
        for (i, cell) in self.neighbors.iter().enumerate() {
            if cell.is_valid(true) {
                info!("neighbor {i} {cell}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_gsm_line() {
        let mut cell = CellData::default();
        cell.parse("MCC:234, MNC:10, LAC:1234, CI:5678, Arfcn:52, RxLev:1c");
        assert_eq!(cell.mcc, 234);
        assert_eq!(cell.mnc, 10);
        assert_eq!(cell.lac, 0x1234);
        assert_eq!(cell.ci, 0x5678);
        assert_eq!(cell.arfcn, 52);
        assert_eq!(cell.rxlev, 0x1c);
        assert!(!cell.is_umts);
        assert!(cell.is_valid(false));
    }

    #[test]
    fn test_tokenize_umts_line() {
        let mut cell = CellData::default();
        cell.parse("RAT:\"UMTS\"");
        cell.parse(
            "MCC:310, MNC:410, LAC:a67d, CI:c7af4d0, DLF:9812, ULF:9362, RSCP LEV:40, ECN0 LEV:30",
        );
        assert!(cell.is_umts);
        assert_eq!(cell.lac, 0xa67d);
        assert_eq!(cell.ci, 0xc7af4d0);
        assert_eq!(cell.dlf, 9812);
        assert_eq!(cell.ulf, 9362);
        assert_eq!(cell.rscp_lev, 40);
        assert_eq!(cell.rssi(), -81);
        assert_eq!(cell.band(), Band::Mhz(1900));
        assert!(cell.is_valid(false));
    }

    #[test]
    fn test_ulf_forces_umts() {
        let mut cell = CellData::default();
        cell.parse("MCC:310, MNC:410, ULF:9762");
        assert!(cell.is_umts);
    }

    #[test]
    fn test_ignored_and_unknown_keys() {
        let mut cell = CellData::default();
        cell.parse("MCC:234, Arfcn_ded:65535, RxLevSub:255, t_adv:255, Bogus:1, nocolon");
        assert_eq!(cell.mcc, 234);
        assert_eq!(cell.arfcn, 0xFFFF);
    }

    #[test]
    fn test_oversized_key_rejected() {
        let mut cell = CellData::default();
        cell.add_key_value("MCCMCCMCCMCCMCCM", "234");
        assert_eq!(cell.mcc, 0xFFFF);
        cell.add_key_value("mcc", "234");
        assert_eq!(cell.mcc, 234);
    }

    #[test]
    fn test_ci_ceiling_depends_on_rat() {
        let mut cell = CellData {
            mcc: 234,
            ci: 0x12345,
            ..CellData::default()
        };
        assert!(!cell.is_valid(false));
        assert!(cell.is_valid(true));
        cell.is_umts = true;
        assert!(cell.is_valid(false));
        cell.ci = 0xFFF_FFFF;
        assert!(!cell.is_valid(false));
    }

    #[test]
    fn test_default_cell_is_invalid() {
        assert!(!CellData::default().is_valid(true));
    }

    #[test]
    fn test_display_gsm() {
        let mut cell = CellData::default();
        cell.parse("MCC:234, MNC:10, LAC:1234, CI:5678, BSIC:3f, Arfcn:52, RxLev:1c");
        assert_eq!(
            cell.to_string(),
            "rat=GSM mcc=234, mnc=10, lac=1234 ci=5678 band=GSM 900 rssi=-93 bsic=3f arfcn=52 rxlev=28"
        );
    }

    #[test]
    fn test_survey_serving_and_neighbors() {
        let mut survey = EnvironmentSurvey::with_capacity(4);
        survey.feed(
            ChunkKind::Unknown,
            b"\r\nMCC:234, MNC:10, LAC:1234, CI:5678, BSIC:3f, Arfcn:52, RxLev:1c\r\n\
              MCC:234, MNC:10, LAC:1234, CI:5679, BSIC:3a, Arfcn:60, RxLev:10\r\n",
        );
        survey.feed(
            ChunkKind::Unknown,
            b"\r\nMCC:234, MNC:10, LAC:1234, CI:567a, BSIC:31, Arfcn:70, RxLev:0a\r\n",
        );
        assert_eq!(survey.serving.ci, 0x5678);
        assert_eq!(survey.num_neighbors(), 2);
        assert_eq!(survey.neighbors()[1].arfcn, 70);
    }

    #[test]
    fn test_survey_plus_prefix_and_rat_line() {
        let mut survey = EnvironmentSurvey::with_capacity(2);
        survey.feed(
            ChunkKind::Plus,
            b"\r\n+CGED: RAT:\"UMTS\",\r\n\r\n+CGED: MCC:310, MNC:410, LAC:a67d, CI:c7af4d0, DLF:9812, ULF:9362, RSCP LEV:40\r\n",
        );
        assert!(survey.serving.is_umts);
        assert_eq!(survey.serving.mcc, 310);
        assert_eq!(survey.num_neighbors(), 0);
    }

    #[test]
    fn test_survey_rat_line_after_neighbors() {
        let mut survey = EnvironmentSurvey::with_capacity(2);
        survey.feed(
            ChunkKind::Unknown,
            b"MCC:234, CI:1\r\nMCC:234, CI:2\r\nRAT:\"UMTS\"\r\n",
        );
        assert!(survey.serving.is_umts);
        assert_eq!(survey.serving.ci, 1);
        assert!(!survey.neighbor_slots()[0].is_umts);
        assert_eq!(survey.neighbor_slots()[0].ci, 2);
        assert_eq!(survey.num_neighbors(), 1);
    }

    #[test]
    fn test_survey_ignores_other_kinds() {
        let mut survey = EnvironmentSurvey::with_capacity(2);
        survey.feed(ChunkKind::Ok, b"\r\nMCC:234, MNC:10\r\n");
        assert_eq!(survey.serving.mcc, 0xFFFF);
        assert_eq!(survey.num_neighbors(), 0);
    }

    #[test]
    fn test_survey_drops_neighbors_past_capacity() {
        let mut survey = EnvironmentSurvey::with_capacity(1);
        survey.feed(
            ChunkKind::Unknown,
            b"MCC:234, CI:1\r\nMCC:234, CI:2\r\nMCC:234, CI:3\r\n",
        );
        assert_eq!(survey.num_neighbors(), 1);
        assert_eq!(survey.neighbor_slots()[0].ci, 2);
    }

    #[test]
    fn test_neighbor_count_stops_at_first_invalid() {
        let mut survey = EnvironmentSurvey::with_capacity(4);
        survey.feed(
            ChunkKind::Unknown,
            b"MCC:234, CI:1\r\nMCC:234, CI:2\r\nMCC:234, CI:ffff\r\nMCC:234, CI:4\r\n",
        );
        assert_eq!(survey.num_neighbors(), 1);
        assert_eq!(survey.neighbors().len(), 1);
    }

    #[test]
    fn test_clear_resets_index() {
        let mut survey = EnvironmentSurvey::with_capacity(2);
        survey.feed(ChunkKind::Unknown, b"MCC:234, CI:1\r\nMCC:234, CI:2\r\n");
        assert_eq!(survey.num_neighbors(), 1);
        survey.clear();
        assert_eq!(survey.num_neighbors(), 0);
        assert_eq!(survey.capacity(), 2);
        assert!(!survey.serving.is_valid(true));
    }
}
