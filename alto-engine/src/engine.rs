//! The microengine core: register file, per-task micro-PCs, and the
//! `step()` loop that ties predecode, ALU, shifter, F1/F2, and memory
//! together into one executed microinstruction.
//!
//! `step()` reproduces the original simulator's overlapped fetch/execute
//! pipeline: the microword it executes (`self.mir`) was already fetched at
//! the *end* of the previous `step()` call (see the bottom of this file),
//! not freshly indexed at the top of this one. `reset()` primes that
//! pipeline so the very first `step()` call still executes `microcode[0]`.

use crate::alu::compute_alu;
use crate::error::Error;
use crate::memory::Memory;
use crate::peripherals::{NullPeripherals, Peripherals};
use crate::predecode::{BsSource, F1Effect, F2Effect, Microcode, predecode};
use crate::rom::{CONSTANT_SIZE, MICROCODE_SIZE, NUM_MICROCODE_BANKS, load_constant_rom, load_microcode_bank};
use crate::shifter::do_shift;
use crate::system::SystemType;
use crate::task::{NUM_TASKS, TASK_EMULATOR, is_ram_related};

const NEXT_MASK: u16 = 0x3FF;
/// Bank bits of the *current* `mpc`, preserved across `advance_pc` into the
/// next `task_mpc` entry — `NEXT`/`next_extra` never carry them.
const MPC_BANK_MASK: u16 = 0xC00;

/// Sentinel bus value `BS_RAM_LOAD_S` drives while the cycle is actually
/// writing `S`, not reading it. Not architectural; chosen for determinism.
const RAM_LOAD_S_GARBAGE: u16 = 0xBEEF;

/// The Alto microengine: register file, ROMs, memory, and the per-cycle
/// `step()` loop. Generic over its device collaborators so a front-end can
/// supply real disk/ethernet/mouse backing without this crate depending on
/// any of them.
pub struct MicroEngine<P: Peripherals = NullPeripherals> {
    r: [u16; 32],
    s: [[u16; 32]; 8],
    l: u16,
    m: u16,
    t: u16,
    mar: u16,
    ir: u16,

    mir: u32,
    mpc: u16,
    task_mpc: [u16; NUM_TASKS],
    ctask: u8,
    ntask: u8,
    pending: u16,

    alu_c0: bool,
    nova_carry: bool,
    skip: bool,
    dns: bool,
    rmr: u16,
    srb: [u8; NUM_TASKS],

    ucode_bank: usize,
    constant_rom: [u16; CONSTANT_SIZE],
    microcode: [[u32; MICROCODE_SIZE]; NUM_MICROCODE_BANKS],

    memory: Memory,
    peripherals: P,

    system: SystemType,
    cycle: u64,
    error: bool,
    last_error: Option<Error>,
}

impl MicroEngine<NullPeripherals> {
    /// Build an engine with no device collaborators wired in. Useful for
    /// testing the microengine core in isolation.
    #[must_use]
    pub fn new(system: SystemType) -> Self {
        Self::with_peripherals(system, NullPeripherals)
    }
}

impl<P: Peripherals> MicroEngine<P> {
    #[must_use]
    pub fn with_peripherals(system: SystemType, peripherals: P) -> Self {
        let mut engine = Self {
            r: [0; 32],
            s: [[0; 32]; 8],
            l: 0,
            m: 0,
            t: 0,
            mar: 0,
            ir: 0,
            mir: 0,
            mpc: 0,
            task_mpc: [0; NUM_TASKS],
            ctask: TASK_EMULATOR,
            ntask: TASK_EMULATOR,
            pending: 1 << TASK_EMULATOR,
            alu_c0: false,
            nova_carry: false,
            skip: false,
            dns: false,
            rmr: 0xFFFF,
            srb: [0; NUM_TASKS],
            ucode_bank: 0,
            constant_rom: [0; CONSTANT_SIZE],
            microcode: [[0; MICROCODE_SIZE]; NUM_MICROCODE_BANKS],
            memory: Memory::new(system),
            peripherals,
            system,
            cycle: 0,
            error: false,
            last_error: None,
        };
        engine.prime_pipeline();
        engine
    }

    pub fn load_constant_rom(&mut self, data: &[u8]) -> Result<(), Error> {
        self.constant_rom = load_constant_rom(data)?;
        Ok(())
    }

    pub fn load_microcode_rom(&mut self, bank: usize, data: &[u8]) -> Result<(), Error> {
        self.microcode[bank] = load_microcode_bank(data)?;
        self.prime_pipeline();
        Ok(())
    }

    /// Reset to the state the hardware RESET line produces: `RMR` all ones,
    /// every task's micro-PC back to zero, EMULATOR runnable, pipeline primed.
    pub fn reset(&mut self) {
        self.task_mpc = [0; NUM_TASKS];
        self.ctask = TASK_EMULATOR;
        self.ntask = TASK_EMULATOR;
        self.pending = 1 << TASK_EMULATOR;
        self.rmr = 0xFFFF;
        self.ucode_bank = 0;
        self.cycle = 0;
        self.error = false;
        self.last_error = None;
        self.prime_pipeline();
    }

    fn prime_pipeline(&mut self) {
        self.mpc = self.task_mpc[self.ctask as usize];
        self.mir = self.microcode[self.ucode_bank][self.mpc as usize];
    }

    #[must_use]
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    #[must_use]
    pub fn ctask(&self) -> u8 {
        self.ctask
    }

    #[must_use]
    pub fn has_error(&self) -> bool {
        self.error
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    #[must_use]
    pub fn registers(&self) -> (&[u16; 32], u16, u16, u16, u16, u16) {
        (&self.r, self.l, self.m, self.t, self.mar, self.ir)
    }

    #[must_use]
    pub fn mpc(&self) -> u16 {
        self.mpc
    }

    #[must_use]
    pub fn mir(&self) -> u32 {
        self.mir
    }

    /// Mark `task` runnable. Called by a front-end when a device collaborator
    /// (e.g. a UDP frame arriving for the ethernet task) needs to wake it.
    pub fn wake(&mut self, task: u8) {
        self.pending |= 1 << task;
    }

    /// Set the Nova "skip" latch consumed by `ALUF = BUS_PLUS_SKIP`. Real
    /// hardware derives this combinationally from the dispatched Nova opcode
    /// during EMULATOR's instruction-fetch microcode; callers that model that
    /// dispatch externally set it explicitly here.
    pub fn set_skip(&mut self, value: bool) {
        self.skip = value;
    }

    fn modified_rsel(&self, mc: &Microcode) -> u8 {
        if self.ctask != TASK_EMULATOR {
            return mc.rsel;
        }
        match mc.f2 {
            F2Effect::AcSource => (mc.rsel & !3) | (!(self.ir >> 13) & 3) as u8,
            F2Effect::AcDest | F2Effect::LoadDns => (mc.rsel & !3) | (!(self.ir >> 11) & 3) as u8,
            _ => mc.rsel,
        }
    }

    fn s_bank(&self, task: u8) -> usize {
        if self.system.has_banked_s_registers() {
            usize::from(self.srb[task as usize] & 7)
        } else {
            0
        }
    }

    fn read_s(&self, task: u8, rsel: u8) -> u16 {
        if rsel == 0 {
            self.m
        } else {
            self.s[self.s_bank(task)][usize::from(rsel)]
        }
    }

    fn write_s(&mut self, task: u8, rsel: u8, value: u16) {
        let bank = self.s_bank(task);
        self.s[bank][usize::from(rsel)] = value;
    }

    fn read_bus(&mut self, mc: &Microcode, modified_rsel: u8) -> u16 {
        let device_value = match mc.bs {
            BsSource::ReadR => self.r[usize::from(modified_rsel)],
            BsSource::LoadR => 0,
            BsSource::ReadMd => self.memory.read_md(),
            BsSource::ReadMouse => self.peripherals.mouse_poll_bits() & 0xFFF0,
            BsSource::ReadDisp => self.read_disp(),
            BsSource::RamReadS => self.read_s(self.ctask, modified_rsel),
            BsSource::RamLoadS => RAM_LOAD_S_GARBAGE,
            BsSource::TaskSpecific => self.read_task_specific(),
        };
        if mc.bs_use_crom {
            device_value & self.constant_rom[usize::from(mc.const_addr)]
        } else if mc.use_constant {
            self.constant_rom[usize::from(mc.const_addr)]
        } else {
            device_value
        }
    }

    fn read_disp(&self) -> u16 {
        if self.ctask == TASK_EMULATOR {
            u16::from((self.ir >> 8) & 0xFF)
        } else {
            0xFFFF
        }
    }

    fn read_task_specific(&mut self) -> u16 {
        match self.ctask {
            crate::task::TASK_ETHERNET => self.peripherals.ethernet_input_word().unwrap_or(0xFFFF),
            crate::task::TASK_DISK_SECTOR | crate::task::TASK_DISK_WORD => self.peripherals.disk_kdata(),
            _ => 0xFFFF,
        }
    }

    /// Execute exactly one microinstruction. No-op once [`Self::has_error`] is set.
    pub fn step(&mut self) -> Result<(), Error> {
        if self.error {
            return Ok(());
        }
        if let Err(e) = self.step_inner() {
            self.error = true;
            self.last_error = Some(e.clone());
            return Err(e);
        }
        Ok(())
    }

    fn step_inner(&mut self) -> Result<(), Error> {
        let task = self.ctask;
        let mc = predecode(self.mir, task);
        let modified_rsel = self.modified_rsel(&mc);

        let bus = self.read_bus(&mc, modified_rsel);
        let alu = compute_alu(mc.aluf, bus, self.t, self.skip);
        if !alu.valid {
            return Err(Error::MicrocodeFatal("invalid ALUF"));
        }

        let magic = matches!(mc.f2, F2Effect::Magic);
        let (shifted, nova_carry_out) = do_shift(mc.f1, magic, self.l, self.t, self.dns, self.nova_carry);

        let mut loaded_mar_this_cycle = false;
        self.run_f1(&mc, task, alu.value, &mut loaded_mar_this_cycle)?;

        let mut next_extra: u16 = 0;
        self.run_f2(&mc, bus, alu, shifted, loaded_mar_this_cycle, &mut next_extra)?;

        if mc.bs == BsSource::LoadR {
            self.r[usize::from(modified_rsel)] = shifted;
        }
        if mc.ram_task && mc.bs == BsSource::RamLoadS {
            self.write_s(task, modified_rsel, self.m);
        }
        if mc.load_l {
            self.l = alu.value;
            if task == TASK_EMULATOR {
                self.m = alu.value;
            }
            self.alu_c0 = alu.carry;
        }
        if mc.load_t || alu.requests_t_writeback {
            self.t = if alu.requests_t_writeback { bus } else { alu.value };
        }
        if self.dns {
            self.nova_carry = nova_carry_out;
        }

        self.advance_pc(&mc, next_extra);
        self.memory.tick();
        self.cycle += 1;
        Ok(())
    }

    fn run_f1(&mut self, mc: &Microcode, task: u8, alu_value: u16, loaded_mar: &mut bool) -> Result<(), Error> {
        match mc.f1 {
            F1Effect::LoadMar => {
                let extended = task != TASK_EMULATOR;
                self.memory.load_mar(alu_value, task, extended);
                self.mar = alu_value;
                *loaded_mar = true;
            }
            F1Effect::Task => {
                if let Some(next) = self.highest_priority_pending() {
                    self.ntask = next;
                }
            }
            F1Effect::Block => {
                if task == TASK_EMULATOR {
                    return Err(Error::MicrocodeFatal("EMULATOR task executed BLOCK"));
                }
                self.pending &= !(1 << task);
            }
            F1Effect::LoadSrb => {
                self.srb[usize::from(task)] = ((alu_value >> 1) & 7) as u8;
            }
            F1Effect::LoadEsrb if is_ram_related(task) => {
                self.srb[usize::from(task)] = ((alu_value >> 1) & 7) as u8;
            }
            F1Effect::LoadRmr if task == TASK_EMULATOR => {
                self.rmr = alu_value;
            }
            F1Effect::SwModeOrWrtRam if task == TASK_EMULATOR => {
                // BitBlt mode switch: toggles which microcode bank EMULATOR fetches from.
                self.ucode_bank = usize::from(alu_value & 1 != 0);
            }
            F1Effect::Unknown(_) if task == TASK_EMULATOR => {
                return Err(Error::InvalidOpcode { task, mpc: self.mpc });
            }
            _ => {}
        }
        Ok(())
    }

    fn run_f2(
        &mut self,
        mc: &Microcode,
        bus: u16,
        alu: crate::alu::AluResult,
        shifted: u16,
        loaded_mar_this_cycle: bool,
        next_extra: &mut u16,
    ) -> Result<(), Error> {
        match mc.f2 {
            F2Effect::BusEq0 => *next_extra |= u16::from(bus == 0),
            F2Effect::ShLt0 => *next_extra |= u16::from(shifted & 0x8000 != 0),
            F2Effect::ShEq0 => *next_extra |= u16::from(shifted == 0),
            F2Effect::Bus => *next_extra |= bus & NEXT_MASK,
            F2Effect::AluCy => *next_extra |= u16::from(alu.carry),
            F2Effect::StoreMd => {
                self.memory.store_md(bus, loaded_mar_this_cycle)?;
            }
            F2Effect::LoadIr => {
                self.ir = bus;
                self.skip = false;
                *next_extra |= u16::from((bus >> 8) & 7) | if bus & 0x8000 != 0 { 8 } else { 0 };
            }
            F2Effect::BusOdd => *next_extra |= bus & 1,
            F2Effect::LoadDns => self.dns = bus & 1 != 0,
            _ => {}
        }
        Ok(())
    }

    fn highest_priority_pending(&self) -> Option<u8> {
        (0..NUM_TASKS as u8).rev().find(|&t| self.pending & (1 << t) != 0)
    }

    fn advance_pc(&mut self, mc: &Microcode, next_extra: u16) {
        let next = (self.mpc & MPC_BANK_MASK) | ((mc.next | next_extra) & NEXT_MASK);
        self.task_mpc[usize::from(self.ctask)] = next;
        self.mpc = self.task_mpc[usize::from(self.ntask)];
        self.mir = self.microcode[self.ucode_bank][usize::from(self.mpc)];
        self.ctask = self.ntask;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(rsel: u8, aluf: u8, bs: u8, f1: u8, f2: u8, t: bool, l: bool, next: u16) -> u32 {
        (u32::from(rsel) << 27)
            | (u32::from(aluf) << 23)
            | (u32::from(bs) << 20)
            | (u32::from(f1) << 16)
            | (u32::from(f2) << 12)
            | (u32::from(t) << 11)
            | (u32::from(l) << 10)
            | u32::from(next)
    }

    fn rom_bytes(words: &[u32]) -> Vec<u8> {
        let mut data = vec![0u8; MICROCODE_SIZE * 4];
        for (i, w) in words.iter().enumerate() {
            data[i * 4..i * 4 + 4].copy_from_slice(&w.to_le_bytes());
        }
        data
    }

    #[test]
    fn reset_primes_pipeline_from_address_zero() {
        let mut engine = MicroEngine::new(SystemType::AltoII);
        let program = [word(0, 5, 1, 0, 0, false, true, 0)]; // ALUF=5: BUS+1, L<-
        engine.load_microcode_rom(0, &rom_bytes(&program)).unwrap();
        engine.reset();
        assert_eq!(engine.mpc(), 0);
    }

    #[test]
    fn step_loads_l_from_alu_result() {
        let mut engine = MicroEngine::new(SystemType::AltoII);
        // BS=LoadR(1) drives bus 0; ALUF=5 is BUS+1; L<-
        let program = [word(0, 5, 1, 0, 0, false, true, 0)];
        engine.load_microcode_rom(0, &rom_bytes(&program)).unwrap();
        engine.reset();
        engine.step().unwrap();
        let (_, l, m, ..) = engine.registers();
        assert_eq!(l, 1);
        assert_eq!(m, 1); // EMULATOR task mirrors L into M
    }

    #[test]
    fn block_in_emulator_task_is_fatal() {
        let mut engine = MicroEngine::new(SystemType::AltoII);
        let program = [word(0, 0, 0, 3, 0, false, false, 0)]; // F1=BLOCK
        engine.load_microcode_rom(0, &rom_bytes(&program)).unwrap();
        engine.reset();
        assert!(engine.step().is_err());
        assert!(engine.has_error());
    }

    #[test]
    fn load_mar_then_read_md_returns_pair() {
        let mut engine = MicroEngine::new(SystemType::AltoII);
        let program = [
            word(0, 0, 1, 1, 0, false, true, 1), // L<-0 (BS=LoadR,ALUF=BUS); F1=LoadMar
            word(0, 0, 2, 0, 0, false, true, 0), // BS=ReadMd; L<-
        ];
        engine.load_microcode_rom(0, &rom_bytes(&program)).unwrap();
        engine.reset();
        engine.step().unwrap(); // mar <- 0, cycle starts
        engine.step().unwrap(); // l <- md (low half)
        let (_, l, ..) = engine.registers();
        assert_eq!(l, 0); // memory starts zeroed
    }

    #[test]
    fn undefined_aluf_is_fatal() {
        let mut engine = MicroEngine::new(SystemType::AltoII);
        let program = [word(0, 14, 0, 0, 0, false, false, 0)]; // ALUF=14: undefined
        engine.load_microcode_rom(0, &rom_bytes(&program)).unwrap();
        engine.reset();
        assert!(engine.step().is_err());
        assert!(engine.has_error());
    }

    #[test]
    fn bus_and_t_wb_forces_t_from_bus() {
        let mut engine = MicroEngine::new(SystemType::AltoII);
        // BS=LoadR(1), ALUF=13 (BUS_AND_T_WB), T<-, L<- not set
        let program = [word(0, 13, 1, 0, 0, true, false, 0)];
        engine.load_microcode_rom(0, &rom_bytes(&program)).unwrap();
        engine.reset();
        engine.step().unwrap();
        let (_, _, _, t, ..) = engine.registers();
        assert_eq!(t, 0); // bus == 0 here (LoadR with rsel 0 drives r[0] == 0)
    }

    #[test]
    fn cycle_counter_advances_once_per_step() {
        let mut engine = MicroEngine::new(SystemType::AltoII);
        let program = [word(0, 0, 0, 0, 0, false, false, 0)];
        engine.load_microcode_rom(0, &rom_bytes(&program)).unwrap();
        engine.reset();
        engine.step().unwrap();
        engine.step().unwrap();
        assert_eq!(engine.cycle(), 2);
    }
}
