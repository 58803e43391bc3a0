use crate::{Encoding, RegisterSpec, WordOrder};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("expected {expected} registers, got {got}")]
    WordCount { expected: usize, got: usize },
}

/// Decode the raw register words read for `spec` into its engineering value.
pub fn decode(spec: &RegisterSpec, words: &[u16]) -> Result<f64, DecodeError> {
    match spec.encoding {
        Encoding::Float32 => decode_f32(words, spec.word_order).map(f64::from),
    }
}

pub fn decode_f32(words: &[u16], order: WordOrder) -> Result<f32, DecodeError> {
    let [a, b] = words else {
        return Err(DecodeError::WordCount {
            expected: 2,
            got: words.len(),
        });
    };
    let (hi, lo) = match order {
        WordOrder::BigEndian => (*a, *b),
        WordOrder::LittleEndian => (*b, *a),
    };
    Ok(f32::from_bits(u32::from(hi) << 16 | u32::from(lo)))
}
