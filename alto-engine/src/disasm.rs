//! Renders a predecoded microinstruction (and, separately, the register
//! file) as text. The actual symbol tables — constant names, R/S register
//! mnemonics, goto labels — are supplied by the caller through
//! [`DisasmCallbacks`] rather than hardcoded, since they depend on which
//! microcode listing is loaded; callers with no symbol table get plain
//! numeric output.

use crate::predecode::{BsSource, F1Effect, F2Effect, Microcode};

/// Symbol lookups used while rendering a microinstruction.
pub trait DisasmCallbacks {
    /// Human name for the constant at ROM address `addr` (already `rsel<<3|bs`).
    fn constant_name(&self, _addr: u8, _value: u16) -> Option<String> {
        None
    }
    /// Human name for `R[rsel]` or `S[bank, rsel]`.
    fn register_name(&self, _rsel: u8) -> Option<String> {
        None
    }
    /// Human label for a microcode address (goto target).
    fn goto_label(&self, _mpc: u16) -> Option<String> {
        None
    }
}

/// The default callback set: every lookup falls back to numeric rendering.
pub struct NoSymbols;
impl DisasmCallbacks for NoSymbols {}

fn bs_mnemonic(bs: BsSource) -> &'static str {
    match bs {
        BsSource::ReadR => "R",
        BsSource::LoadR => "<-R",
        BsSource::ReadMd => "MD",
        BsSource::ReadMouse => "MOUSE",
        BsSource::ReadDisp => "DISP",
        BsSource::RamReadS => "S",
        BsSource::RamLoadS => "<-S",
        BsSource::TaskSpecific => "DEV",
    }
}

fn f1_mnemonic(f1: F1Effect) -> String {
    match f1 {
        F1Effect::None => "-".to_string(),
        F1Effect::LoadMar => "L MAR".to_string(),
        F1Effect::Task => "TASK".to_string(),
        F1Effect::Block => "BLOCK".to_string(),
        F1Effect::LLsh1 => "L LSH 1".to_string(),
        F1Effect::LRsh1 => "L RSH 1".to_string(),
        F1Effect::LLcy8 => "L LCY 8".to_string(),
        F1Effect::Constant => "CONST".to_string(),
        F1Effect::SwModeOrWrtRam => "SWMODE/WRTRAM".to_string(),
        F1Effect::RdRam => "RDRAM".to_string(),
        F1Effect::LoadSrb => "L SRB".to_string(),
        F1Effect::LoadEsrb => "L ESRB".to_string(),
        F1Effect::LoadRmr => "L RMR".to_string(),
        F1Effect::Rsnf => "RSNF".to_string(),
        F1Effect::StartF => "STARTF".to_string(),
        F1Effect::Unknown(code) => format!("F1?{code:#04o}"),
    }
}

fn f2_mnemonic(f2: F2Effect) -> String {
    match f2 {
        F2Effect::None => "-".to_string(),
        F2Effect::BusEq0 => "BUS=0".to_string(),
        F2Effect::ShLt0 => "SH<0".to_string(),
        F2Effect::ShEq0 => "SH=0".to_string(),
        F2Effect::Bus => "BUS".to_string(),
        F2Effect::AluCy => "ALUCY".to_string(),
        F2Effect::StoreMd => "MD<-".to_string(),
        F2Effect::LoadIr => "L IR".to_string(),
        F2Effect::BusOdd => "BUSODD".to_string(),
        F2Effect::LoadDns => "L DNS".to_string(),
        F2Effect::Idisp => "IDISP".to_string(),
        F2Effect::AcSource => "ACSOURCE".to_string(),
        F2Effect::AcDest => "ACDEST".to_string(),
        F2Effect::Magic => "MAGIC".to_string(),
        F2Effect::Unknown(code) => format!("F2?{code:#04o}"),
    }
}

/// Render one predecoded microinstruction as a single line of text.
#[must_use]
pub fn disassemble(mc: &Microcode, mpc: u16, cb: &dyn DisasmCallbacks) -> String {
    let bs = match cb.register_name(mc.rsel) {
        Some(name) if matches!(mc.bs, BsSource::ReadR | BsSource::RamReadS) => name,
        _ => bs_mnemonic(mc.bs).to_string(),
    };

    let goto = cb
        .goto_label(mc.next)
        .unwrap_or_else(|| format!("{:#06o}", mc.next));

    let mut line = format!(
        "{mpc:#06o}: RSEL={rsel:#04o} ALUF={aluf:#04o} BS={bs} F1={f1} F2={f2} GOTO={goto}",
        mpc = mpc,
        rsel = mc.rsel,
        aluf = mc.aluf,
        f1 = f1_mnemonic(mc.f1),
        f2 = f2_mnemonic(mc.f2),
    );

    if mc.use_constant {
        let name = cb
            .constant_name(mc.const_addr, 0)
            .unwrap_or_else(|| format!("#{:#04o}", mc.const_addr));
        line.push_str(&format!(" CROM={name}"));
    }
    if mc.load_t {
        line.push_str(" ;T<-");
    }
    if mc.load_l {
        line.push_str(" ;L<-");
    }
    line
}

/// Render the full visible register set as the original `print_registers`
/// did: one line of core registers, octal throughout.
#[must_use]
pub fn register_dump(
    r: &[u16; 32],
    l: u16,
    m: u16,
    t: u16,
    mar: u16,
    ir: u16,
    ctask: u8,
    mpc: u16,
) -> String {
    let mut out = format!(
        "TASK={ctask:#04o} MPC={mpc:#06o} L={l:#06o} M={m:#06o} T={t:#06o} MAR={mar:#06o} IR={ir:#06o}\n"
    );
    for (i, chunk) in r.chunks(8).enumerate() {
        out.push_str(&format!("R{:02}: ", i * 8));
        for v in chunk {
            out.push_str(&format!("{v:06o} "));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predecode::predecode;
    use crate::task::TASK_EMULATOR;

    #[test]
    fn disassemble_renders_numeric_fallback_without_symbols() {
        let raw = (0o17u32 << 27) | (0o1u32 << 16) | 0o100;
        let mc = predecode(raw, TASK_EMULATOR);
        let line = disassemble(&mc, 0, &NoSymbols);
        assert!(line.contains("RSEL=017"));
        assert!(line.contains("F1=L MAR"));
        assert!(line.contains("GOTO=0000100"));
    }

    #[test]
    fn register_dump_includes_all_core_registers() {
        let r = [0u16; 32];
        let dump = register_dump(&r, 1, 2, 3, 4, 5, 0, 0);
        assert!(dump.contains("L=000001"));
        assert!(dump.contains("R00:"));
        assert!(dump.contains("R24:"));
    }
}
