//! LZMA probability models.
//!
//! LZMA uses context-dependent probability models for:
//! - Literal decoding (context = previous byte + position)
//! - Match length decoding
//! - Distance decoding
//! - State machine transitions

use crate::range_coder::PROB_INIT;

/// Largest properties byte accepted: `(4 * 5 + 4) * 9 + 8`.
pub const PROPERTIES_MAX: u8 = 9 * 5 * 5 - 1;

/// Maximum number of position states.
pub const POS_STATES_MAX: usize = 1 << 4;

/// Number of states in the LZMA state machine.
pub const NUM_STATES: usize = 12;

/// Number of bits for low length coding.
pub const LEN_LOW_BITS: u32 = 3;
/// Number of bits for mid length coding.
pub const LEN_MID_BITS: u32 = 3;
/// Number of bits for high length coding.
pub const LEN_HIGH_BITS: u32 = 8;

/// Number of low length symbols.
pub const LEN_LOW_SYMBOLS: usize = 1 << LEN_LOW_BITS;
/// Number of mid length symbols.
pub const LEN_MID_SYMBOLS: usize = 1 << LEN_MID_BITS;
/// Number of high length symbols.
pub const LEN_HIGH_SYMBOLS: usize = 1 << LEN_HIGH_BITS;

/// Minimum match length.
pub const MATCH_LEN_MIN: usize = 2;

/// Number of distance slots.
pub const DIST_SLOTS: usize = 64;

/// Number of length states used to pick a distance slot table.
pub const DIST_LEN_STATES: usize = 4;

/// Number of alignment bits for distance encoding.
pub const DIST_ALIGN_BITS: u32 = 4;
/// Size of alignment table.
pub const DIST_ALIGN_SIZE: usize = 1 << DIST_ALIGN_BITS;

/// Number of full distance symbols.
pub const FULL_DISTANCES: usize = 128;

/// First slot whose low bits are coded directly instead of by model.
pub const END_POS_MODEL_INDEX: usize = 14;

/// LZMA state machine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct State(u8);

impl State {
    /// Initial state.
    pub const fn new() -> Self {
        Self(0)
    }

    /// Get state value.
    pub fn value(self) -> usize {
        self.0 as usize
    }

    /// Whether the previous packet was a literal.
    pub fn is_literal(self) -> bool {
        self.0 < 7
    }

    /// Update state after literal.
    pub fn update_literal(&mut self) {
        self.0 = match self.0 {
            0..=3 => 0,
            4..=9 => self.0 - 3,
            _ => self.0 - 6,
        };
    }

    /// Update state after match.
    pub fn update_match(&mut self) {
        self.0 = if self.0 < 7 { 7 } else { 10 };
    }

    /// Update state after short rep.
    pub fn update_short_rep(&mut self) {
        self.0 = if self.0 < 7 { 9 } else { 11 };
    }

    /// Update state after long rep.
    pub fn update_long_rep(&mut self) {
        self.0 = if self.0 < 7 { 8 } else { 11 };
    }
}

/// LZMA properties (lc, lp, pb).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LzmaProperties {
    /// Literal context bits.
    pub lc: u32,
    /// Literal position bits.
    pub lp: u32,
    /// Position bits.
    pub pb: u32,
}

impl LzmaProperties {
    /// Create new properties.
    pub fn new(lc: u32, lp: u32, pb: u32) -> Self {
        Self { lc, lp, pb }
    }

    /// Parse from property byte. Bytes above [`PROPERTIES_MAX`] are invalid.
    pub fn from_byte(byte: u8) -> Option<Self> {
        if byte > PROPERTIES_MAX {
            return None;
        }
        let byte = byte as u32;
        let pb = byte / 45;
        let remaining = byte - pb * 45;
        let lp = remaining / 9;
        let lc = remaining - lp * 9;

        Some(Self { lc, lp, pb })
    }

    /// Encode to property byte.
    pub fn to_byte(&self) -> u8 {
        ((self.pb * 45) + (self.lp * 9) + self.lc) as u8
    }

    /// Get number of literal states.
    pub fn num_lit_states(&self) -> usize {
        1 << (self.lc + self.lp)
    }

    /// Get number of position states.
    pub fn num_pos_states(&self) -> usize {
        1 << self.pb
    }
}

impl Default for LzmaProperties {
    fn default() -> Self {
        Self { lc: 3, lp: 0, pb: 2 }
    }
}

/// Length decoder model.
#[derive(Debug, Clone)]
pub struct LengthModel {
    /// Choice bit (low vs mid+high).
    pub choice: u16,
    /// Choice2 bit (mid vs high).
    pub choice2: u16,
    /// Low length probabilities (per position state).
    pub low: Vec<[u16; LEN_LOW_SYMBOLS]>,
    /// Mid length probabilities (per position state).
    pub mid: Vec<[u16; LEN_MID_SYMBOLS]>,
    /// High length probabilities (shared).
    pub high: [u16; LEN_HIGH_SYMBOLS],
}

impl LengthModel {
    /// Create a new length model.
    pub fn new(num_pos_states: usize) -> Self {
        Self {
            choice: PROB_INIT,
            choice2: PROB_INIT,
            low: vec![[PROB_INIT; LEN_LOW_SYMBOLS]; num_pos_states],
            mid: vec![[PROB_INIT; LEN_MID_SYMBOLS]; num_pos_states],
            high: [PROB_INIT; LEN_HIGH_SYMBOLS],
        }
    }
}

/// Literal decoder model.
#[derive(Debug, Clone)]
pub struct LiteralModel {
    /// Probability table for each literal state: 0x100 entries for a plain
    /// literal followed by 0x200 for the matched-literal contexts.
    pub probs: Vec<[u16; 0x300]>,
}

impl LiteralModel {
    /// Create a new literal model.
    pub fn new(num_lit_states: usize) -> Self {
        Self {
            probs: vec![[PROB_INIT; 0x300]; num_lit_states],
        }
    }

    /// Get the literal state index.
    pub fn get_state(&self, pos: u64, prev_byte: u8, lc: u32, lp: u32) -> usize {
        let lit_pos = (pos & ((1u64 << lp) - 1)) as usize;
        let prev_bits = (prev_byte as usize) >> (8 - lc as usize);
        (lit_pos << lc as usize) + prev_bits
    }
}

/// Distance model.
#[derive(Debug, Clone)]
pub struct DistanceModel {
    /// Distance slot probabilities (per length state).
    pub slot: [[u16; DIST_SLOTS]; DIST_LEN_STATES],
    /// Reverse bit-tree probabilities for slots 4..14, laid out flat.
    pub special: [u16; FULL_DISTANCES - END_POS_MODEL_INDEX],
    /// Alignment probabilities.
    pub align: [u16; DIST_ALIGN_SIZE],
}

impl DistanceModel {
    /// Create a new distance model.
    pub fn new() -> Self {
        Self {
            slot: [[PROB_INIT; DIST_SLOTS]; DIST_LEN_STATES],
            special: [PROB_INIT; FULL_DISTANCES - END_POS_MODEL_INDEX],
            align: [PROB_INIT; DIST_ALIGN_SIZE],
        }
    }
}

impl Default for DistanceModel {
    fn default() -> Self {
        Self::new()
    }
}

/// Complete LZMA model containing all probability tables.
#[derive(Debug, Clone)]
pub struct LzmaModel {
    /// LZMA properties.
    pub props: LzmaProperties,

    /// Is-match probabilities.
    pub is_match: [[u16; POS_STATES_MAX]; NUM_STATES],
    /// Is-rep probabilities.
    pub is_rep: [u16; NUM_STATES],
    /// Is-rep0 probabilities.
    pub is_rep0: [u16; NUM_STATES],
    /// Is-rep1 probabilities.
    pub is_rep1: [u16; NUM_STATES],
    /// Is-rep2 probabilities.
    pub is_rep2: [u16; NUM_STATES],
    /// Is-rep0-long probabilities.
    pub is_rep0_long: [[u16; POS_STATES_MAX]; NUM_STATES],

    /// Match length model.
    pub match_len: LengthModel,
    /// Rep match length model.
    pub rep_len: LengthModel,

    /// Literal model.
    pub literal: LiteralModel,

    /// Distance model.
    pub distance: DistanceModel,
}

impl LzmaModel {
    /// Create a new LZMA model with the given properties.
    pub fn new(props: LzmaProperties) -> Self {
        let num_pos_states = props.num_pos_states();
        let num_lit_states = props.num_lit_states();

        Self {
            props,
            is_match: [[PROB_INIT; POS_STATES_MAX]; NUM_STATES],
            is_rep: [PROB_INIT; NUM_STATES],
            is_rep0: [PROB_INIT; NUM_STATES],
            is_rep1: [PROB_INIT; NUM_STATES],
            is_rep2: [PROB_INIT; NUM_STATES],
            is_rep0_long: [[PROB_INIT; POS_STATES_MAX]; NUM_STATES],
            match_len: LengthModel::new(num_pos_states),
            rep_len: LengthModel::new(num_pos_states),
            literal: LiteralModel::new(num_lit_states),
            distance: DistanceModel::new(),
        }
    }

    /// Number of probability cells held by this model.
    pub fn num_probs(&self) -> usize {
        let len_model =
            |m: &LengthModel| 2 + m.low.len() * LEN_LOW_SYMBOLS + m.mid.len() * LEN_MID_SYMBOLS + LEN_HIGH_SYMBOLS;
        NUM_STATES * POS_STATES_MAX * 2
            + NUM_STATES * 4
            + len_model(&self.match_len)
            + len_model(&self.rep_len)
            + self.literal.probs.len() * 0x300
            + DIST_LEN_STATES * DIST_SLOTS
            + (FULL_DISTANCES - END_POS_MODEL_INDEX)
            + DIST_ALIGN_SIZE
    }
}
