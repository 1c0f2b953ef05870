//! Hardware variant configuration.
//!
//! Mirrors how `machine-c64::config::TimingMode` selects PAL/NTSC timing
//! constants: a small `const fn`-friendly enum picked once at construction,
//! not a runtime config file.

/// Which physical Alto variant is being emulated.
///
/// The two CPU generations differ in how a simultaneous MAR load and memory
/// data access are handled, and whether the extra S-register bank (giving a
/// 3rd 8-word file) is wired in at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemType {
    /// Original Alto ("Alto I"): a simultaneous `LOAD_MAR` + `STORE_MD` is illegal.
    AltoI,
    /// Alto II: the same combination is defined to suppress the store.
    AltoII,
    /// Alto II with the 3K RAM expansion: adds the extra S-register bank select.
    AltoIIWithRam3K,
}

impl SystemType {
    /// Whether this variant has more than one S-register bank per task.
    #[must_use]
    pub const fn has_banked_s_registers(self) -> bool {
        matches!(self, SystemType::AltoIIWithRam3K)
    }

    /// Whether a simultaneous MAR load + memory store is a hard error (Alto I)
    /// or a silently suppressed store (Alto II and later).
    #[must_use]
    pub const fn simultaneous_mar_store_is_fatal(self) -> bool {
        matches!(self, SystemType::AltoI)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_3k_variant_banks_s_registers() {
        assert!(!SystemType::AltoI.has_banked_s_registers());
        assert!(!SystemType::AltoII.has_banked_s_registers());
        assert!(SystemType::AltoIIWithRam3K.has_banked_s_registers());
    }

    #[test]
    fn only_alto_i_treats_simultaneous_access_as_fatal() {
        assert!(SystemType::AltoI.simultaneous_mar_store_is_fatal());
        assert!(!SystemType::AltoII.simultaneous_mar_store_is_fatal());
    }
}
