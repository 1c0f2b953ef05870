//! Breakpoint matcher used by an interactive debugger front-end (the `psim`
//! REPL described in the external-interfaces contract). This crate only
//! supplies the matching logic and the register/disassembly accessors the
//! REPL needs; it has no idea stdin/stdout exist.

/// One breakpoint. Every field is a "don't care" by default; a breakpoint
/// fires only when every field that was explicitly set matches.
#[derive(Debug, Clone, Copy, Default)]
pub struct Breakpoint {
    pub task: Option<u8>,
    pub ntask: Option<u8>,
    pub on_task_switch: bool,
    pub mpc: Option<u16>,
    pub mir_fmt: u32,
    pub mir_mask: u32,
    pub enabled: bool,
}

impl Breakpoint {
    #[must_use]
    pub fn new() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    /// Check whether this breakpoint fires for the state observed just
    /// before executing the microinstruction at `mpc` on `ctask`, about to
    /// switch to `ntask` (equal to `ctask` when no switch occurs this cycle).
    #[must_use]
    pub fn matches(&self, ctask: u8, ntask: u8, mpc: u16, mir: u32) -> bool {
        if !self.enabled {
            return false;
        }
        if let Some(t) = self.task {
            if t != ctask {
                return false;
            }
        }
        if let Some(nt) = self.ntask {
            if nt != ntask {
                return false;
            }
        }
        if self.on_task_switch && ctask == ntask {
            return false;
        }
        if let Some(addr) = self.mpc {
            if addr != mpc {
                return false;
            }
        }
        if self.mir_mask != 0 && (mir & self.mir_mask) as u32 != self.mir_fmt {
            return false;
        }
        true
    }
}
