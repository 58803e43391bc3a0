use crate::WordOrder;

/// Split a float into the two register words a meter would expose for it.
pub fn encode_f32(value: f32, order: WordOrder) -> [u16; 2] {
    let bits = value.to_bits();
    let hi = (bits >> 16) as u16;
    let lo = (bits & 0xFFFF) as u16;
    match order {
        WordOrder::BigEndian => [hi, lo],
        WordOrder::LittleEndian => [lo, hi],
    }
}
