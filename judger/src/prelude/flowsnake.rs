//! Short, roughly time-ordered identifiers for judging calls.
//!
//! A `FlowSnake` packs a timestamp, a per-thread worker id and a sequence
//! number into 64 bits and renders as 13 base32 characters. They only label
//! log spans, so uniqueness is best-effort.

use serde::{Serialize, Serializer};
use std::{
    cell::{Cell, OnceCell},
    fmt::{Debug, Display, Formatter},
};

#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct FlowSnake(pub u64);

thread_local! {
    static LAST_GENERATION_TIME: Cell<u64> = Cell::new(0);
    static SEQ_NUMBER: Cell<u64> = Cell::new(0);
    static WORKER_ID: OnceCell<u64> = OnceCell::new();
}

pub const TIMESTAMP_BITS: u32 = 34;
pub const WORKER_ID_BITS: u32 = 12;
pub const SEQUENCE_BITS: u32 = 18;

const BASE32: &[u8; 32] = b"0123456789abcdefghjkmnpqrstvwxyz";

impl FlowSnake {
    pub fn new_parts(timestamp: u64, worker_id: u64, seq: u64) -> FlowSnake {
        let n = ((timestamp & ((1 << TIMESTAMP_BITS) - 1)) << (WORKER_ID_BITS + SEQUENCE_BITS))
            | ((worker_id & ((1 << WORKER_ID_BITS) - 1)) << SEQUENCE_BITS)
            | (seq & ((1 << SEQUENCE_BITS) - 1));
        FlowSnake(n)
    }

    pub fn generate() -> FlowSnake {
        let time = std::time::SystemTime::now()
            .duration_since(std::time::SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let worker_id = WORKER_ID.with(|id| *id.get_or_init(rand::random::<u64>));
        let seq = if LAST_GENERATION_TIME.with(|t| time <= t.get()) {
            SEQ_NUMBER.with(|s| {
                let seq = s.get();
                s.set(seq + 1);
                seq
            })
        } else {
            LAST_GENERATION_TIME.with(|t| t.set(time));
            let rnd = rand::random::<u64>() % ((1 << SEQUENCE_BITS) - (1 << (SEQUENCE_BITS - 2)));
            SEQ_NUMBER.with(|s| s.set(rnd + 1));
            rnd
        };

        FlowSnake::new_parts(time, worker_id, seq)
    }

    pub fn parse(s: &str) -> Option<FlowSnake> {
        if s.len() != 13 {
            return None;
        }
        let mut n = 0u64;
        for ch in s.bytes() {
            let five_bit = BASE32.iter().position(|&c| c == ch.to_ascii_lowercase())? as u64;
            n = (n << 5) | five_bit;
        }
        Some(FlowSnake(n))
    }

    fn encode(&self) -> [u8; 13] {
        let mut buf = [0u8; 13];
        for (i, slot) in buf.iter_mut().enumerate() {
            let five_bit = (self.0 >> (5 * (12 - i))) & 0x1f;
            *slot = BASE32[five_bit as usize];
        }
        buf
    }
}

impl Display for FlowSnake {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let buf = self.encode();
        // every byte comes from BASE32
        f.write_str(std::str::from_utf8(&buf).map_err(|_| std::fmt::Error)?)
    }
}

impl Debug for FlowSnake {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

impl Serialize for FlowSnake {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}
