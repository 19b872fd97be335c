//! Streaming LZMA decompression.
//!
//! [`LzmaDecoder`] produces output on demand: each [`LzmaDecoder::read`] call
//! decodes just enough packets to fill the caller's buffer, carrying any
//! unfinished match over to the next call. The dictionary is a circular
//! buffer sized from the container header.

use crate::header::LzmaHeader;
use crate::model::{
    DIST_ALIGN_BITS, DIST_LEN_STATES, END_POS_MODEL_INDEX, LEN_HIGH_BITS, LEN_LOW_BITS,
    LEN_MID_BITS, LengthModel, LzmaModel, MATCH_LEN_MIN, State,
};
use crate::range_coder::{ChunkedInput, RangeDecoder};
use std::io::Read;
use untgz_core::error::{Result, UntgzError};

/// Smallest dictionary ever allocated.
pub const DICT_SIZE_MIN: u32 = 1 << 12;

/// Distance value that encodes the end-of-stream marker.
const END_MARKER_DISTANCE: u32 = 0xFFFF_FFFF;

/// Decode a length.
fn decode_length<R: Read>(
    rc: &mut RangeDecoder<R>,
    len_model: &mut LengthModel,
    pos_state: usize,
) -> Result<usize> {
    let len = if rc.decode_bit(&mut len_model.choice)? == 0 {
        rc.decode_bit_tree(&mut len_model.low[pos_state], LEN_LOW_BITS)?
    } else if rc.decode_bit(&mut len_model.choice2)? == 0 {
        rc.decode_bit_tree(&mut len_model.mid[pos_state], LEN_MID_BITS)? + (1 << LEN_LOW_BITS)
    } else {
        rc.decode_bit_tree(&mut len_model.high, LEN_HIGH_BITS)?
            + (1 << LEN_LOW_BITS)
            + (1 << LEN_MID_BITS)
    };
    Ok(len as usize + MATCH_LEN_MIN)
}

/// Circular history window. Grows up to its capacity, then wraps.
struct Dictionary {
    buf: Vec<u8>,
    capacity: usize,
    pos: usize,
    total: u64,
}

impl Dictionary {
    fn new(capacity: usize) -> Result<Self> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(capacity)
            .map_err(|_| UntgzError::AllocationFailed { bytes: capacity })?;
        Ok(Self {
            buf,
            capacity,
            pos: 0,
            total: 0,
        })
    }

    fn put(&mut self, byte: u8) {
        if self.buf.len() < self.capacity {
            self.buf.push(byte);
        } else {
            self.buf[self.pos] = byte;
        }
        self.pos += 1;
        if self.pos == self.capacity {
            self.pos = 0;
        }
        self.total += 1;
    }

    /// Byte `dist + 1` positions back.
    fn get(&self, dist: usize) -> Result<u8> {
        if dist >= self.buf.len() {
            return Err(UntgzError::corrupted(
                self.total,
                format!("match distance {dist} outside history"),
            ));
        }
        let index = if dist < self.pos {
            self.pos - dist - 1
        } else {
            self.buf.len() + self.pos - dist - 1
        };
        Ok(self.buf[index])
    }

    fn last_byte(&self) -> u8 {
        self.get(0).unwrap_or(0)
    }

    fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// What one decoded packet asks the output loop to do.
enum Packet {
    Literal(u8),
    Match(usize),
    EndMarker,
}

/// Streaming LZMA decoder over a `.lzma` (LZMA_alone) stream.
pub struct LzmaDecoder<R: Read> {
    header: LzmaHeader,
    rc: RangeDecoder<R>,
    model: LzmaModel,
    dict: Dictionary,
    state: State,
    rep: [u32; 4],
    pending_len: usize,
    end_marker: bool,
}

impl<R: Read> LzmaDecoder<R> {
    /// Read the 13-byte container header and prepare to decode.
    ///
    /// Fails if the header is truncated, the properties byte is invalid, or the
    /// dictionary cannot be allocated.
    pub fn new(reader: R) -> Result<Self> {
        let mut input = ChunkedInput::new(reader);
        let header = LzmaHeader::read(&mut input)?;
        let rc = RangeDecoder::new(input)?;
        let dict = Dictionary::new(header.dictionary_capacity())?;

        tracing::debug!(
            lc = header.props.lc,
            lp = header.props.lp,
            pb = header.props.pb,
            dict_size = header.dict_size,
            uncompressed_size = ?header.uncompressed_size,
            "lzma stream opened"
        );

        Ok(Self {
            model: LzmaModel::new(header.props),
            header,
            rc,
            dict,
            state: State::new(),
            rep: [0; 4],
            pending_len: 0,
            end_marker: false,
        })
    }

    /// The container header.
    pub fn header(&self) -> &LzmaHeader {
        &self.header
    }

    /// Total bytes produced so far.
    pub fn total_out(&self) -> u64 {
        self.dict.total
    }

    /// Whether the end-of-stream marker has been decoded.
    pub fn saw_end_marker(&self) -> bool {
        self.end_marker
    }

    /// Decode up to `out.len()` bytes.
    ///
    /// Returns fewer bytes than requested only after the end-of-stream marker;
    /// `Ok(0)` once the marker has been reached and all output delivered. The
    /// decoder does not stop by itself at a declared size: callers bound
    /// `out` by the bytes they still expect.
    pub fn read(&mut self, out: &mut [u8]) -> Result<usize> {
        let mut written = 0;

        while written < out.len() {
            if self.pending_len > 0 {
                let byte = self.dict.get(self.rep[0] as usize)?;
                self.dict.put(byte);
                out[written] = byte;
                written += 1;
                self.pending_len -= 1;
                continue;
            }

            if self.end_marker {
                break;
            }

            match self.decode_packet()? {
                Packet::Literal(byte) => {
                    self.dict.put(byte);
                    out[written] = byte;
                    written += 1;
                }
                Packet::Match(len) => self.pending_len = len,
                Packet::EndMarker => {
                    self.end_marker = true;
                    if !self.rc.is_finished_ok() {
                        tracing::warn!(
                            total_out = self.dict.total,
                            "lzma end marker reached with non-zero range code"
                        );
                    }
                }
            }
        }

        Ok(written)
    }

    fn decode_packet(&mut self) -> Result<Packet> {
        let pos_state = (self.dict.total as usize) & (self.model.props.num_pos_states() - 1);
        let state_idx = self.state.value();

        if self
            .rc
            .decode_bit(&mut self.model.is_match[state_idx][pos_state])?
            == 0
        {
            let byte = self.decode_literal()?;
            self.state.update_literal();
            return Ok(Packet::Literal(byte));
        }

        let len = if self.rc.decode_bit(&mut self.model.is_rep[state_idx])? == 0 {
            let len = decode_length(&mut self.rc, &mut self.model.match_len, pos_state)?;
            self.state.update_match();
            let dist = self.decode_distance(len)?;

            if dist == END_MARKER_DISTANCE {
                return Ok(Packet::EndMarker);
            }

            self.rep = [dist, self.rep[0], self.rep[1], self.rep[2]];
            len
        } else {
            if self.dict.is_empty() {
                return Err(UntgzError::corrupted(0, "rep match before any literal"));
            }

            if self.rc.decode_bit(&mut self.model.is_rep0[state_idx])? == 0 {
                if self
                    .rc
                    .decode_bit(&mut self.model.is_rep0_long[state_idx][pos_state])?
                    == 0
                {
                    self.state.update_short_rep();
                    self.check_distance()?;
                    return Ok(Packet::Match(1));
                }
            } else {
                let dist = if self.rc.decode_bit(&mut self.model.is_rep1[state_idx])? == 0 {
                    let d = self.rep[1];
                    self.rep[1] = self.rep[0];
                    d
                } else {
                    let d = if self.rc.decode_bit(&mut self.model.is_rep2[state_idx])? == 0 {
                        self.rep[2]
                    } else {
                        let d = self.rep[3];
                        self.rep[3] = self.rep[2];
                        d
                    };
                    self.rep[2] = self.rep[1];
                    self.rep[1] = self.rep[0];
                    d
                };
                self.rep[0] = dist;
            }

            let len = decode_length(&mut self.rc, &mut self.model.rep_len, pos_state)?;
            self.state.update_long_rep();
            len
        };

        self.check_distance()?;
        Ok(Packet::Match(len))
    }

    fn check_distance(&self) -> Result<()> {
        let dist = self.rep[0] as u64;
        if dist >= self.dict.total || dist >= self.dict.capacity as u64 {
            return Err(UntgzError::corrupted(
                self.dict.total,
                format!("invalid match distance {dist}"),
            ));
        }
        Ok(())
    }

    fn decode_literal(&mut self) -> Result<u8> {
        let props = self.model.props;
        let lit_state =
            self.model
                .literal
                .get_state(self.dict.total, self.dict.last_byte(), props.lc, props.lp);
        let probs = &mut self.model.literal.probs[lit_state];
        let mut symbol = 1usize;

        if !self.state.is_literal() {
            let mut match_byte = self.dict.get(self.rep[0] as usize)? as usize;
            while symbol < 0x100 {
                let match_bit = (match_byte >> 7) & 1;
                match_byte <<= 1;
                let bit = self
                    .rc
                    .decode_bit(&mut probs[0x100 + (match_bit << 8) + symbol])?
                    as usize;
                symbol = (symbol << 1) | bit;
                if bit != match_bit {
                    break;
                }
            }
        }

        while symbol < 0x100 {
            let bit = self.rc.decode_bit(&mut probs[symbol])?;
            symbol = (symbol << 1) | bit as usize;
        }

        Ok((symbol - 0x100) as u8)
    }

    fn decode_distance(&mut self, len: usize) -> Result<u32> {
        let len_state = (len - MATCH_LEN_MIN).min(DIST_LEN_STATES - 1);
        let slot = self
            .rc
            .decode_bit_tree(&mut self.model.distance.slot[len_state], 6)?;

        if slot < 4 {
            return Ok(slot);
        }

        let num_direct_bits = (slot >> 1) - 1;
        let base = (2 | (slot & 1)) << num_direct_bits;

        if (slot as usize) < END_POS_MODEL_INDEX {
            // Reverse bit tree whose cells start at `base - slot - 1`, 1-based.
            let offset = base as usize - slot as usize;
            let mut m = 1usize;
            let mut result = 0u32;
            for i in 0..num_direct_bits {
                let bit = self
                    .rc
                    .decode_bit(&mut self.model.distance.special[offset + m - 1])?;
                m = (m << 1) | bit as usize;
                result |= bit << i;
            }
            Ok(base + result)
        } else {
            let direct = self
                .rc
                .decode_direct_bits(num_direct_bits - DIST_ALIGN_BITS)?;
            let align = self
                .rc
                .decode_bit_tree_reverse(&mut self.model.distance.align, DIST_ALIGN_BITS)?;
            Ok(base
                .wrapping_add(direct << DIST_ALIGN_BITS)
                .wrapping_add(align))
        }
    }
}
