//! The 16-function ALU.
//!
//! Every function is computed as a 17-bit addition so carry is always
//! "bit 16 of the result" — subtractions are folded into additions via
//! two's-complement, matching how the real ALU chip (a 74181-style slice)
//! actually produces its carry-out.

/// Result of one ALU evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AluResult {
    pub value: u16,
    pub carry: bool,
    /// Set only by `BUS_AND_T_WB`: forces a T load from `bus` (rather than
    /// from this result) regardless of the microcode's `LOAD_T` bit.
    pub requests_t_writeback: bool,
    /// False for an ALUF code outside the 14 defined functions (14, 15);
    /// the real hardware latches `error` in this case.
    pub valid: bool,
}

/// Evaluate ALU function `aluf` over `bus` and `t`. `skip` feeds the
/// "BUS + skip" function (aluf 11). An undefined `aluf` (14 or 15) returns
/// `valid: false`; `value`/`carry` are then meaningless and must not be used.
#[must_use]
pub fn compute_alu(aluf: u8, bus: u16, t: u16, skip: bool) -> AluResult {
    let bus32 = u32::from(bus);
    let t32 = u32::from(t);
    let not_t32 = u32::from(!t);

    let (sum, requests_t_writeback, valid) = match aluf {
        0 => (bus32, false, true),
        1 => (t32, false, true),
        2 => (bus32 | t32, false, true),
        3 => (bus32 & t32, false, true),
        4 => (bus32 ^ t32, false, true),
        5 => (bus32 + 1, false, true),
        6 => (bus32 + 0xFFFF, false, true),
        7 => (bus32 + t32, false, true),
        8 => (bus32 + not_t32 + 1, false, true),
        9 => (bus32 + not_t32, false, true),
        10 => (bus32 + t32 + 1, false, true),
        11 => (bus32 + u32::from(skip), false, true),
        12 => (bus32 & u32::from(!t), false, true),
        13 => (bus32 & t32, true, true),
        _ => (bus32, false, false),
    };

    AluResult {
        value: (sum & 0xFFFF) as u16,
        carry: sum & 0x1_0000 != 0,
        requests_t_writeback,
        valid,
    }
}
