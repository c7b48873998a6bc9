/// Sign-extends the low `bits` bits of `value` to a full 32-bit word.
pub fn sign_extend(value: u32, bits: u32) -> u32 {
    debug_assert!((1..=32).contains(&bits));
    let shift = 32 - bits;
    (((value << shift) as i32) >> shift) as u32
}

/// Zero-extends the low `bits` bits of `value` to a full 32-bit word.
pub fn zero_extend(value: u32, bits: u32) -> u32 {
    if bits >= 32 {
        value
    } else {
        value & ((1u32 << bits) - 1)
    }
}

/// Returns `value[hi:lo]`, inclusive on both ends.
pub fn field(value: u32, hi: u32, lo: u32) -> u32 {
    debug_assert!(hi >= lo && hi < 32);
    zero_extend(value >> lo, hi - lo + 1)
}
