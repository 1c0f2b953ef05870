//! Splits a 32-bit microinstruction into its named fields.
//!
//! Microword layout (MSB to LSB): RSEL(5) ALUF(4) BS(3) F1(4) F2(4) T(1) L(1) NEXT(10).
//! BS/F1/F2 are overloaded per task — the raw 3/4-bit codes mean different
//! things depending which task is running. This module only resolves the
//! overload into a named variant; it leaves field values that depend on
//! runtime state (the IR-derived "modified RSEL", the memory-cycle state)
//! to the engine itself.

use crate::task::{TASK_EMULATOR, is_ram_related};

const RSEL_SHIFT: u32 = 27;
const ALUF_SHIFT: u32 = 23;
const BS_SHIFT: u32 = 20;
const F1_SHIFT: u32 = 16;
const F2_SHIFT: u32 = 12;
const LOAD_T_SHIFT: u32 = 11;
const LOAD_L_SHIFT: u32 = 10;
const NEXT_MASK: u32 = 0x3FF;

/// Bus source, resolved from the raw 3-bit BS field for the running task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BsSource {
    /// Drive the bus from `R[rsel]`.
    ReadR,
    /// "Load R" — this cycle loads R rather than reading it; the bus is driven 0.
    LoadR,
    /// Drive the bus from the memory data register (one half of the current word pair).
    ReadMd,
    /// Drive the bus from the mouse position/buttons.
    ReadMouse,
    /// Drive the bus from an IR-derived literal (used by the emulator task's dispatch).
    ReadDisp,
    /// Drive the bus from `S[bank, rsel]` (rsel 0 aliases to `M` instead).
    RamReadS,
    /// This cycle loads `S[bank, rsel]` from `M`; the bus carries a fixed sentinel pattern.
    RamLoadS,
    /// Meaning depends on the running task's device (disk/ethernet read FIFO).
    TaskSpecific,
}

/// F1 side-effect function, resolved from the raw 4-bit F1 field for the running task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum F1Effect {
    None,
    LoadMar,
    Task,
    Block,
    LLsh1,
    LRsh1,
    LLcy8,
    Constant,
    /// Shared code: switches EMULATOR to BitBlt mode, or (any RAM-related task) writes microcode RAM.
    SwModeOrWrtRam,
    RdRam,
    LoadSrb,
    LoadEsrb,
    LoadRmr,
    Rsnf,
    StartF,
    Unknown(u8),
}

/// F2 side-effect function, resolved from the raw 4-bit F2 field for the running task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum F2Effect {
    None,
    BusEq0,
    ShLt0,
    ShEq0,
    Bus,
    AluCy,
    StoreMd,
    LoadIr,
    BusOdd,
    LoadDns,
    Idisp,
    AcSource,
    AcDest,
    Magic,
    Unknown(u8),
}

/// A fully predecoded microinstruction.
#[derive(Debug, Clone, Copy)]
pub struct Microcode {
    pub raw: u32,
    pub rsel: u8,
    pub aluf: u8,
    pub bs: BsSource,
    pub f1: F1Effect,
    pub f2: F2Effect,
    pub load_t: bool,
    pub load_l: bool,
    pub next: u16,
    /// Set when BS or F1 selects the constant ROM as (one source of) the bus.
    pub use_constant: bool,
    /// Set for tasks that may address banked S registers / RAM-resident microcode.
    pub ram_task: bool,
    /// Set when the bus source itself is the constant ROM (`BS_RAM_READ_S` ANDs with it too).
    pub bs_use_crom: bool,
    /// `(rsel << 3) | raw_bs`, valid only when `use_constant`.
    pub const_addr: u8,
}

fn decode_bs(raw_bs: u8) -> BsSource {
    match raw_bs {
        0 => BsSource::ReadR,
        1 => BsSource::LoadR,
        2 => BsSource::ReadMd,
        3 => BsSource::ReadMouse,
        4 => BsSource::ReadDisp,
        5 => BsSource::RamReadS,
        6 => BsSource::RamLoadS,
        _ => BsSource::TaskSpecific,
    }
}

fn decode_f1(raw_f1: u8, task: u8) -> F1Effect {
    match raw_f1 {
        0 => F1Effect::None,
        1 => F1Effect::LoadMar,
        2 => F1Effect::Task,
        3 => F1Effect::Block,
        4 => F1Effect::LLsh1,
        5 => F1Effect::LRsh1,
        6 => F1Effect::LLcy8,
        7 => F1Effect::Constant,
        13 => F1Effect::SwModeOrWrtRam,
        14 if task == TASK_EMULATOR => F1Effect::LoadRmr,
        14 => F1Effect::RdRam,
        15 if task == TASK_EMULATOR => F1Effect::Rsnf,
        15 if is_ram_related(task) => F1Effect::LoadSrb,
        12 if task == TASK_EMULATOR => F1Effect::StartF,
        12 if is_ram_related(task) => F1Effect::LoadEsrb,
        other => F1Effect::Unknown(other),
    }
}

fn decode_f2(raw_f2: u8, task: u8) -> F2Effect {
    match raw_f2 {
        0 => F2Effect::None,
        1 => F2Effect::BusEq0,
        2 => F2Effect::ShLt0,
        3 => F2Effect::ShEq0,
        4 => F2Effect::Bus,
        5 => F2Effect::AluCy,
        6 => F2Effect::StoreMd,
        8 if task == TASK_EMULATOR => F2Effect::LoadIr,
        9 if task == TASK_EMULATOR => F2Effect::Idisp,
        9 => F2Effect::BusOdd,
        10 if task == TASK_EMULATOR => F2Effect::AcDest,
        11 if task == TASK_EMULATOR => F2Effect::AcSource,
        12 if task == TASK_EMULATOR => F2Effect::LoadDns,
        13 if task == TASK_EMULATOR => F2Effect::Magic,
        other => F2Effect::Unknown(other),
    }
}

/// Predecode a raw 32-bit microinstruction for the given task.
#[must_use]
pub fn predecode(raw: u32, task: u8) -> Microcode {
    let rsel = ((raw >> RSEL_SHIFT) & 0x1F) as u8;
    let aluf = ((raw >> ALUF_SHIFT) & 0x0F) as u8;
    let raw_bs = ((raw >> BS_SHIFT) & 0x07) as u8;
    let raw_f1 = ((raw >> F1_SHIFT) & 0x0F) as u8;
    let raw_f2 = ((raw >> F2_SHIFT) & 0x0F) as u8;
    let load_t = (raw >> LOAD_T_SHIFT) & 1 != 0;
    let load_l = (raw >> LOAD_L_SHIFT) & 1 != 0;
    let next = (raw & NEXT_MASK) as u16;

    let bs = decode_bs(raw_bs);
    let f1 = decode_f1(raw_f1, task);
    let f2 = decode_f2(raw_f2, task);

    let bs_use_crom = matches!(bs, BsSource::ReadDisp) || raw_bs >= 4;
    let use_constant = bs_use_crom || matches!(f1, F1Effect::Constant);
    let const_addr = (rsel << 3) | raw_bs;

    Microcode {
        raw,
        rsel,
        aluf,
        bs,
        f1,
        f2,
        load_t,
        load_l,
        next,
        use_constant,
        ram_task: is_ram_related(task),
        bs_use_crom,
        const_addr,
    }
}
