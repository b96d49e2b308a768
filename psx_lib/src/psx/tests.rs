//! Machine-level tests driving a real bus built from a synthesized BIOS image.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crate::error::PsxError;
use crate::psx::bios::{Bios, BIOS_SIZE};
use crate::psx::bus::Bus;
use crate::psx::gpu::commands::{Color, Position, Vertex};
use crate::psx::gpu::link::{link, GpuMsg, Output};
use crate::psx::gpu;
use crate::psx::processor::cop0;
use crate::psx::processor::cpu::run_next_instruction;
use crate::psx::processor::RegisterIndex;

/// Build a bus whose BIOS starts with the given instructions (the rest is zeroed, i.e. NOPs)
fn bus_with_program(words: &[u32]) -> (Bus, Output) {
    let mut blob = vec![0u8; BIOS_SIZE];

    for (i, w) in words.iter().enumerate() {
        blob[i * 4..i * 4 + 4].copy_from_slice(&w.to_le_bytes());
    }

    let (tx, rx) = link();
    let bus = Bus::new(Bios::new(&blob).unwrap(), tx);

    (bus, rx)
}

fn steps(bus: &mut Bus, n: usize) {
    for _ in 0..n {
        run_next_instruction(bus).unwrap();
    }
}

fn reg(bus: &Bus, r: u8) -> u32 {
    bus.cpu.reg(RegisterIndex(r))
}

/// Run `f` against the bus while a helper thread drains the GPU message slot, and return the
/// messages in emission order. Needed because the producer blocks on every message until it's
/// consumed.
fn with_drain(bus: &mut Bus, rx: &Output, f: impl FnOnce(&mut Bus)) -> Vec<GpuMsg> {
    let done = AtomicBool::new(false);
    let mut msgs = Vec::new();

    thread::scope(|s| {
        let consumer = s.spawn(|| {
            let mut v = Vec::new();

            loop {
                if let Some(m) = rx.consume() {
                    v.push(m);
                    continue;
                }

                if done.load(Ordering::SeqCst) {
                    break;
                }

                thread::yield_now();
            }

            v
        });

        f(bus);
        done.store(true, Ordering::SeqCst);

        msgs = consumer.join().unwrap();
    });

    msgs
}

// Instruction encoding helpers

fn ori(t: u32, s: u32, imm: u32) -> u32 {
    (0x0d << 26) | (s << 21) | (t << 16) | (imm & 0xffff)
}

fn lui(t: u32, imm: u32) -> u32 {
    (0x0f << 26) | (t << 16) | (imm & 0xffff)
}

fn lw(t: u32, s: u32, imm: u32) -> u32 {
    (0x23 << 26) | (s << 21) | (t << 16) | (imm & 0xffff)
}

fn sw(t: u32, s: u32, imm: u32) -> u32 {
    (0x2b << 26) | (s << 21) | (t << 16) | (imm & 0xffff)
}

fn lwl(t: u32, s: u32, imm: u32) -> u32 {
    (0x22 << 26) | (s << 21) | (t << 16) | (imm & 0xffff)
}

fn lwr(t: u32, s: u32, imm: u32) -> u32 {
    (0x26 << 26) | (s << 21) | (t << 16) | (imm & 0xffff)
}

fn swl(t: u32, s: u32, imm: u32) -> u32 {
    (0x2a << 26) | (s << 21) | (t << 16) | (imm & 0xffff)
}

fn swr(t: u32, s: u32, imm: u32) -> u32 {
    (0x2e << 26) | (s << 21) | (t << 16) | (imm & 0xffff)
}

fn addu(d: u32, s: u32, t: u32) -> u32 {
    (s << 21) | (t << 16) | (d << 11) | 0x21
}

fn add(d: u32, s: u32, t: u32) -> u32 {
    (s << 21) | (t << 16) | (d << 11) | 0x20
}

fn sub(d: u32, s: u32, t: u32) -> u32 {
    (s << 21) | (t << 16) | (d << 11) | 0x22
}

fn div(s: u32, t: u32) -> u32 {
    (s << 21) | (t << 16) | 0x1a
}

fn divu(s: u32, t: u32) -> u32 {
    (s << 21) | (t << 16) | 0x1b
}

fn j(target: u32) -> u32 {
    (0x02 << 26) | ((target >> 2) & 0x3ff_ffff)
}

fn bltzal(s: u32, off: u32) -> u32 {
    (0x01 << 26) | (s << 21) | (0x10 << 16) | (off & 0xffff)
}

fn syscall() -> u32 {
    0x0c
}

fn mtc0(t: u32, d: u32) -> u32 {
    (0x10 << 26) | (0x04 << 21) | (t << 16) | (d << 11)
}

fn rfe() -> u32 {
    (0x10 << 26) | (0x10 << 21) | 0x10
}

fn cop0_reg(bus: &mut Bus, r: u8) -> u32 {
    cop0::mfc0(bus, RegisterIndex(r)).unwrap()
}

#[test]
fn boot_fetch() {
    // lui r8, 0x13
    let (mut bus, _rx) = bus_with_program(&[0x3c08_0013]);

    steps(&mut bus, 1);

    assert_eq!(bus.cpu.pc, 0xbfc0_0004);
    assert_eq!(bus.cpu.next_pc, 0xbfc0_0008);
    assert_eq!(reg(&bus, 8), 0x0013_0000);
    // R0 still reads 0
    assert_eq!(reg(&bus, 0), 0);
}

#[test]
fn load_delay_slot() {
    let (mut bus, _rx) = bus_with_program(&[
        ori(1, 0, 0x100),
        ori(2, 0, 0xbeef),
        lw(2, 1, 0),
        // Delay slot of the load: must still see the old value of R2
        addu(3, 2, 0),
        // One instruction later the loaded value is visible
        addu(4, 2, 0),
    ]);

    bus.ram.store::<u32>(0x100, 0xabcd_1234);

    steps(&mut bus, 5);

    assert_eq!(reg(&bus, 3), 0xbeef);
    assert_eq!(reg(&bus, 4), 0xabcd_1234);
}

#[test]
fn branch_delay_slot() {
    let mut program = vec![
        j(0xbfc0_0020),
        // Delay slot: executes before the jump target
        ori(8, 0, 0xbeef),
    ];

    program.resize(8, 0);
    // 0xbfc00020
    program.push(ori(9, 0, 0x1234));

    let (mut bus, _rx) = bus_with_program(&program);

    steps(&mut bus, 3);

    assert_eq!(reg(&bus, 8), 0xbeef);
    assert_eq!(reg(&bus, 9), 0x1234);
    assert_eq!(bus.cpu.current_pc(), 0xbfc0_0020);
}

#[test]
fn exception_in_delay_slot() {
    let (mut bus, _rx) = bus_with_program(&[j(0xbfc0_0100), syscall()]);

    steps(&mut bus, 2);

    // EPC points at the branch, not the delay slot, and bit 31 of CAUSE is set
    assert_eq!(cop0_reg(&mut bus, 14), 0xbfc0_0000);

    let cause = cop0_reg(&mut bus, 13);
    assert_eq!(cause & (1 << 31), 1 << 31);
    assert_eq!((cause >> 2) & 0x1f, 0x8);

    // BEV is 0 so we use the RAM vector
    assert_eq!(bus.cpu.pc, 0x8000_0080);
}

#[test]
fn syscall_and_rfe() {
    let (mut bus, _rx) = bus_with_program(&[
        ori(1, 0, 1),
        // SR = 1: interrupts enabled, user mode stack empty
        mtc0(1, 12),
        syscall(),
    ]);

    // Exception handler: return right away
    bus.ram.store::<u32>(0x80, rfe());

    steps(&mut bus, 3);

    // Entering the exception pushed a pair of zeroes on the mode stack
    assert_eq!(cop0_reg(&mut bus, 12) & 0x3f, 0b000100);
    assert_eq!((cop0_reg(&mut bus, 13) >> 2) & 0x1f, 0x8);
    assert_eq!(cop0_reg(&mut bus, 14), 0xbfc0_0008);
    assert_eq!(bus.cpu.pc, 0x8000_0080);

    // RFE pops the stack back
    steps(&mut bus, 1);
    assert_eq!(cop0_reg(&mut bus, 12) & 0x3f, 0b000001);
}

#[test]
fn add_overflow() {
    let (mut bus, _rx) = bus_with_program(&[
        lui(1, 0x7fff),
        ori(1, 1, 0xffff),
        ori(2, 0, 1),
        // addu wraps
        addu(3, 1, 2),
        // add traps
        add(4, 1, 2),
    ]);

    steps(&mut bus, 5);

    assert_eq!(reg(&bus, 3), 0x8000_0000);
    // The trapping add never wrote its destination
    assert_eq!(reg(&bus, 4), 0);
    assert_eq!((cop0_reg(&mut bus, 13) >> 2) & 0x1f, 0xc);
    assert_eq!(bus.cpu.pc, 0x8000_0080);
}

#[test]
fn sub_subtracts_rt_from_rs() {
    let (mut bus, _rx) = bus_with_program(&[
        ori(1, 0, 10),
        ori(2, 0, 3),
        sub(3, 1, 2),
    ]);

    steps(&mut bus, 3);

    assert_eq!(reg(&bus, 3), 7);
}

#[test]
fn division_by_zero() {
    let (mut bus, _rx) = bus_with_program(&[
        ori(1, 0, 5),
        div(1, 0),
    ]);

    steps(&mut bus, 2);

    assert_eq!(bus.cpu.lo, 0xffff_ffff);
    assert_eq!(bus.cpu.hi, 5);
}

#[test]
fn division_of_negative_by_zero() {
    let (mut bus, _rx) = bus_with_program(&[
        // r1 = -5
        lui(1, 0xffff),
        ori(1, 1, 0xfffb),
        div(1, 0),
    ]);

    steps(&mut bus, 3);

    assert_eq!(bus.cpu.lo, 1);
    assert_eq!(bus.cpu.hi, (-5i32) as u32);
}

#[test]
fn division_overflow() {
    let (mut bus, _rx) = bus_with_program(&[
        // r1 = i32::MIN, r2 = -1
        lui(1, 0x8000),
        lui(2, 0xffff),
        ori(2, 2, 0xffff),
        div(1, 2),
    ]);

    steps(&mut bus, 4);

    assert_eq!(bus.cpu.lo, 0x8000_0000);
    assert_eq!(bus.cpu.hi, 0);
}

#[test]
fn unsigned_division_by_zero() {
    let (mut bus, _rx) = bus_with_program(&[
        ori(1, 0, 42),
        divu(1, 0),
    ]);

    steps(&mut bus, 2);

    assert_eq!(bus.cpu.lo, 0xffff_ffff);
    assert_eq!(bus.cpu.hi, 42);
}

#[test]
fn unaligned_load_raises_exception() {
    let (mut bus, _rx) = bus_with_program(&[
        ori(1, 0, 0x102),
        lw(2, 1, 0),
    ]);

    steps(&mut bus, 2);

    assert_eq!((cop0_reg(&mut bus, 13) >> 2) & 0x1f, 0x4);
    assert_eq!(cop0_reg(&mut bus, 14), 0xbfc0_0004);
    assert_eq!(reg(&bus, 2), 0);
}

#[test]
fn bxx_link_is_unconditional() {
    let (mut bus, _rx) = bus_with_program(&[
        ori(1, 0, 1),
        // R1 is positive so BLTZAL doesn't branch, but RA is written anyway
        bltzal(1, 0x10),
        ori(2, 0, 0xaaaa),
    ]);

    steps(&mut bus, 3);

    // Branch not taken: the instruction after the delay slot ran
    assert_eq!(reg(&bus, 2), 0xaaaa);
    // Link register points after the delay slot
    assert_eq!(reg(&bus, 31), 0xbfc0_000c);
}

#[test]
fn unaligned_word_access_via_lwl_lwr() {
    let (mut bus, _rx) = bus_with_program(&[
        ori(1, 0, 0x101),
        lui(2, 0xdead),
        ori(2, 2, 0xbeef),
        // Store the unaligned word at 0x101
        swr(2, 1, 0),
        swl(2, 1, 3),
        // Read it back
        lwr(3, 1, 0),
        lwl(3, 1, 3),
        // Let the load delay expire
        0,
        0,
    ]);

    // Sentinel bytes around the target word
    bus.ram.store::<u32>(0x100, 0x11223344);
    bus.ram.store::<u32>(0x104, 0x55667788);

    steps(&mut bus, 9);

    assert_eq!(reg(&bus, 3), 0xdead_beef);

    // The bytes below and above the unaligned word must be intact
    assert_eq!(bus.ram.load::<u8>(0x100), 0x44);
    assert_eq!(bus.ram.load::<u8>(0x105), 0x77);

    // And the word itself landed at 0x101
    assert_eq!(bus.ram.load::<u8>(0x101), 0xef);
    assert_eq!(bus.ram.load::<u8>(0x102), 0xbe);
    assert_eq!(bus.ram.load::<u8>(0x103), 0xad);
    assert_eq!(bus.ram.load::<u8>(0x104), 0xde);
}

#[test]
fn isolated_cache_gates_cpu_accesses() {
    let (mut bus, _rx) = bus_with_program(&[
        lui(1, 0x1),
        // Set the isolate-cache bit in SR
        mtc0(1, 12),
        ori(2, 0, 0xabcd),
        // Both of these must not touch the RAM
        sw(2, 0, 0x200),
        lw(3, 0, 0x200),
        0,
        // Un-isolate and read back
        mtc0(0, 12),
        lw(4, 0, 0x200),
        0,
    ]);

    bus.ram.store::<u32>(0x200, 0x1234_5678);

    steps(&mut bus, 9);

    assert_eq!(bus.ram.load::<u32>(0x200), 0x1234_5678);
    assert_eq!(reg(&bus, 3), 0);
    assert_eq!(reg(&bus, 4), 0x1234_5678);
}

#[test]
fn store_to_unmapped_address_is_fatal() {
    let (mut bus, _rx) = bus_with_program(&[
        lui(1, 0x1f80),
        ori(1, 1, 0x1050),
        sw(0, 1, 0),
    ]);

    steps(&mut bus, 2);

    match run_next_instruction(&mut bus) {
        Err(PsxError::OutOfRange { addr }) => assert_eq!(addr, 0x1f80_1050),
        r => panic!("Unexpected result: {:?}", r.map(|_| ())),
    }
}

#[test]
fn otc_dma_fill() {
    let (mut bus, _rx) = bus_with_program(&[]);

    // OTC channel: base 0x1000, block size 4, manual sync, backwards, to RAM
    bus.store::<u32>(0x1f80_10e0, 0x1000).unwrap();
    bus.store::<u32>(0x1f80_10e4, (1 << 16) | 4).unwrap();
    bus.store::<u32>(0x1f80_10e8, (1 << 24) | (1 << 28) | 2).unwrap();

    assert_eq!(bus.ram.load::<u32>(0x1000), 0x00ff_ffff);
    assert_eq!(bus.ram.load::<u32>(0x0ffc), 0x0000_0ffc);
    assert_eq!(bus.ram.load::<u32>(0x0ff8), 0x0000_0ff8);
    assert_eq!(bus.ram.load::<u32>(0x0ff4), 0x0000_0ff4);

    // The channel deactivated itself: enable and trigger are clear
    let ctrl = bus.load::<u32>(0x1f80_10e8).unwrap();
    assert_eq!(ctrl & (1 << 24), 0);
    assert_eq!(ctrl & (1 << 28), 0);
}

#[test]
fn linked_list_dma_to_gpu() {
    let (mut bus, _rx) = bus_with_program(&[]);

    // Make the draw mode observable: set the texture page X base to 1 first
    gpu::gp0(&mut bus, 0xe100_0001).unwrap();
    assert_eq!(bus.gpu.status() & 0xf, 1);

    // Node at 0x100: one command word (draw mode reset), next node at 0x108
    bus.ram.store::<u32>(0x100, 0x0200_0108);
    bus.ram.store::<u32>(0x104, 0xe100_0000);
    // Terminator node with an empty payload
    bus.ram.store::<u32>(0x108, 0x8000_00fc);
    // Never reached
    bus.ram.store::<u32>(0x10c, 0x28ff_ffff);

    // GPU channel: linked list from RAM, base 0x100
    bus.store::<u32>(0x1f80_10a0, 0x100).unwrap();
    bus.store::<u32>(0x1f80_10a8, (1 << 24) | (2 << 9) | 1).unwrap();

    // The draw mode word went through GP0
    assert_eq!(bus.gpu.status() & 0xf, 0);
    // No command is left in flight
    assert_eq!(bus.gpu.gp0_words_remaining, 0);

    // The channel deactivated itself
    let ctrl = bus.load::<u32>(0x1f80_10a8).unwrap();
    assert_eq!(ctrl & (1 << 24), 0);
    assert_eq!(ctrl & (1 << 28), 0);
}

#[test]
fn dma_interrupt_acknowledge() {
    let (mut bus, _rx) = bus_with_program(&[]);

    bus.store::<u32>(0x1f80_10f4, 0x0100_0000).unwrap();

    let irq = bus.load::<u32>(0x1f80_10f4).unwrap();

    // Flags cleared, no signal
    assert_eq!(irq & 0x7f00_0000, 0);
    assert_eq!(irq & (1 << 31), 0);
    // Reserved bits read as zero
    assert_eq!(irq & 0x7fc0, 0);
}

#[test]
fn dma_register_readback() {
    let (mut bus, _rx) = bus_with_program(&[]);

    // Base addresses are masked to 24 bits
    bus.store::<u32>(0x1f80_10a0, 0xff12_3456).unwrap();
    assert_eq!(bus.load::<u32>(0x1f80_10a0).unwrap(), 0x12_3456);

    bus.store::<u32>(0x1f80_10a4, 0x0004_0010).unwrap();
    assert_eq!(bus.load::<u32>(0x1f80_10a4).unwrap(), 0x0004_0010);

    // Reserved control bits read back as zero (the write doesn't activate the channel)
    bus.store::<u32>(0x1f80_10a8, 0x0000_02ff).unwrap();
    assert_eq!(bus.load::<u32>(0x1f80_10a8).unwrap(), 0x0000_0203);

    // The control register reset value
    assert_eq!(bus.load::<u32>(0x1f80_10f0).unwrap(), 0x0765_4321);
}

#[test]
fn bad_dma_register_is_fatal() {
    let (mut bus, _rx) = bus_with_program(&[]);

    match bus.store::<u32>(0x1f80_108c, 0) {
        Err(PsxError::OutOfRange { addr }) => assert_eq!(addr, 0x1f80_108c),
        r => panic!("Unexpected result: {:?}", r),
    }
}

#[test]
fn gp0_monochrome_quad() {
    let (mut bus, rx) = bus_with_program(&[]);

    let msgs = with_drain(&mut bus, &rx, |bus| {
        for &w in &[
            0x2880_0000,
            0x0000_0000,
            0x0000_00ff,
            0x00ff_0000,
            0x00ff_00ff,
        ] {
            gpu::gp0(bus, w).unwrap();
        }
    });

    let color = Color { r: 0x80, g: 0, b: 0 };

    assert_eq!(
        msgs,
        vec![GpuMsg::Quad([
            Vertex { position: Position { x: 0, y: 0 }, color },
            Vertex { position: Position { x: 255, y: 0 }, color },
            Vertex { position: Position { x: 0, y: 255 }, color },
            Vertex { position: Position { x: 255, y: 255 }, color },
        ])]
    );
}

#[test]
fn gp0_shaded_triangle() {
    let (mut bus, rx) = bus_with_program(&[]);

    let msgs = with_drain(&mut bus, &rx, |bus| {
        for &w in &[
            0x30ff_0000,
            0x0000_0000,
            0x0000_ff00,
            0x0010_0020,
            0x0000_00ff,
            0x0020_0010,
        ] {
            gpu::gp0(bus, w).unwrap();
        }
    });

    assert_eq!(
        msgs,
        vec![GpuMsg::Triangle([
            Vertex {
                position: Position { x: 0, y: 0 },
                color: Color { r: 0xff, g: 0, b: 0 },
            },
            Vertex {
                position: Position { x: 0x20, y: 0x10 },
                color: Color { r: 0, g: 0xff, b: 0 },
            },
            Vertex {
                position: Position { x: 0x10, y: 0x20 },
                color: Color { r: 0, g: 0, b: 0xff },
            },
        ])]
    );
}

#[test]
fn gp0_textured_quad_uses_solid_color() {
    let (mut bus, rx) = bus_with_program(&[]);

    let msgs = with_drain(&mut bus, &rx, |bus| {
        for &w in &[
            0x2c12_3456,
            0x0000_0000,
            0xdead_beef,
            0x0000_0040,
            0xdead_beef,
            0x0040_0000,
            0xdead_beef,
            0x0040_0040,
            0xdead_beef,
        ] {
            gpu::gp0(bus, w).unwrap();
        }
    });

    let color = Color { r: 0x80, g: 0, b: 0 };

    assert_eq!(
        msgs,
        vec![GpuMsg::Quad([
            Vertex { position: Position { x: 0, y: 0 }, color },
            Vertex { position: Position { x: 0x40, y: 0 }, color },
            Vertex { position: Position { x: 0, y: 0x40 }, color },
            Vertex { position: Position { x: 0x40, y: 0x40 }, color },
        ])]
    );
}

#[test]
fn gp0_drawing_offset_emits_offset_then_draw() {
    let (mut bus, rx) = bus_with_program(&[]);

    // x = -2, y = 3, both 11 bit two's complement
    let x = 0x7fe;
    let y = 3 << 11;

    let msgs = with_drain(&mut bus, &rx, |bus| {
        gpu::gp0(bus, 0xe500_0000 | y | x).unwrap();
    });

    assert_eq!(msgs, vec![GpuMsg::Offset { x: -2, y: 3 }, GpuMsg::Draw]);
    assert_eq!(bus.gpu.drawing_x_offset, -2);
    assert_eq!(bus.gpu.drawing_y_offset, 3);
}

#[test]
fn gp0_image_load_drains_pixel_words() {
    let (mut bus, _rx) = bus_with_program(&[]);

    // 2x2 image: 4 pixels, 2 words of data
    gpu::gp0(&mut bus, 0xa000_0000).unwrap();
    gpu::gp0(&mut bus, 0x0000_0000).unwrap();
    gpu::gp0(&mut bus, 0x0002_0002).unwrap();

    assert_eq!(bus.gpu.gp0_words_remaining, 2);

    gpu::gp0(&mut bus, 0x1111_1111).unwrap();
    gpu::gp0(&mut bus, 0x2222_2222).unwrap();

    assert_eq!(bus.gpu.gp0_words_remaining, 0);

    // Back in command mode: a draw mode write works again
    gpu::gp0(&mut bus, 0xe100_0001).unwrap();
    assert_eq!(bus.gpu.status() & 0xf, 1);
}

#[test]
fn unknown_gp0_opcode_is_fatal() {
    let (mut bus, _rx) = bus_with_program(&[]);

    assert!(matches!(
        gpu::gp0(&mut bus, 0xff00_0000),
        Err(PsxError::Unimplemented(_))
    ));
}

#[test]
fn unknown_gp1_opcode_is_fatal() {
    let (mut bus, _rx) = bus_with_program(&[]);

    assert!(matches!(
        gpu::gp1(&mut bus, 0x2000_0000),
        Err(PsxError::Unimplemented(_))
    ));
}

#[test]
fn gpu_status_reset_value() {
    let (mut bus, _rx) = bus_with_program(&[]);

    assert_eq!(bus.load::<u32>(0x1f80_1814).unwrap(), 0x1480_2000);

    // Mess with the state, then soft reset through GP1
    gpu::gp0(&mut bus, 0xe100_060f).unwrap();
    gpu::gp1(&mut bus, 0x0300_0000).unwrap();
    assert_ne!(bus.load::<u32>(0x1f80_1814).unwrap(), 0x1480_2000);

    gpu::gp1(&mut bus, 0x0000_0000).unwrap();
    assert_eq!(bus.load::<u32>(0x1f80_1814).unwrap(), 0x1480_2000);
}

#[test]
fn gp1_display_mode_pins_vertical_resolution() {
    let (mut bus, _rx) = bus_with_program(&[]);

    // Request 480 lines: bit 2 of the display mode
    gpu::gp1(&mut bus, 0x0800_0004).unwrap();

    // Status bit 19 stays low: the output is pinned to 240 lines
    assert_eq!(bus.gpu.status() & (1 << 19), 0);
}

#[test]
fn gpuread_is_a_placeholder() {
    let (mut bus, _rx) = bus_with_program(&[]);

    assert_eq!(bus.load::<u32>(0x1f80_1810).unwrap(), 0);
}

#[test]
fn quiet_regions() {
    let (mut bus, _rx) = bus_with_program(&[]);

    // SPU reads as zero, writes are dropped
    assert_eq!(bus.load::<u16>(0x1f80_1c00).unwrap(), 0);
    bus.store::<u16>(0x1f80_1c00, 0xffff).unwrap();
    assert_eq!(bus.load::<u16>(0x1f80_1c00).unwrap(), 0);

    // Expansion 1 reads all ones (per byte)
    assert_eq!(bus.load::<u8>(0x1f00_0000).unwrap(), 0xff);

    // Interrupt controller and timers are placeholders
    assert_eq!(bus.load::<u32>(0x1f80_1070).unwrap(), 0);
    bus.store::<u32>(0x1f80_1070, 0xffff_ffff).unwrap();
    assert_eq!(bus.load::<u32>(0x1f80_1104).unwrap(), 0);
    bus.store::<u32>(0x1f80_1104, 0xffff_ffff).unwrap();

    // Memory control, RAM size and cache control swallow writes but refuse reads
    bus.store::<u32>(0x1f80_1000, 0x1f00_0000).unwrap();
    bus.store::<u32>(0x1f80_1060, 0x0000_0b88).unwrap();
    bus.store::<u32>(0xfffe_0130, 0x0001_e988).unwrap();
    assert!(bus.load::<u32>(0x1f80_1000).is_err());

    // The BIOS is read-only
    assert!(bus.store::<u32>(0xbfc0_0000, 0).is_err());
}

#[test]
fn scratch_pad_roundtrip() {
    let (mut bus, _rx) = bus_with_program(&[]);

    bus.store::<u32>(0x1f80_0000, 0xcafe_babe).unwrap();
    assert_eq!(bus.load::<u32>(0x1f80_0000).unwrap(), 0xcafe_babe);
    // Also reachable through KSEG0
    assert_eq!(bus.load::<u32>(0x9f80_0000).unwrap(), 0xcafe_babe);
}
