use std::cell::RefCell;
use std::rc::Rc;

use devices::{GuestMemory, GuestMemoryExt, IrqLine};
use edma::{tcd, Edma, EDMA_CHANNELS, TCD_SIZE};
use interrupts::{PlatformInterrupts, PlatformIrqLine};
use memory::GuestAddressSpace;

const EDMA_CSR_RESET: u32 = 0x0030_0000;

fn new_edma() -> (Edma, Rc<RefCell<PlatformInterrupts>>, Rc<RefCell<GuestAddressSpace>>) {
    let interrupts = Rc::new(RefCell::new(PlatformInterrupts::new()));
    let mem: Rc<RefCell<GuestAddressSpace>> = Rc::new(RefCell::new(GuestAddressSpace::new()));
    mem.borrow_mut().add_ram(0x2000_0000, 0x1_0000);
    let irqs: Vec<Box<dyn IrqLine>> = (0..EDMA_CHANNELS)
        .map(|i| Box::new(PlatformIrqLine::new(interrupts.clone(), i)) as Box<dyn IrqLine>)
        .collect();
    let mem_dyn: Rc<RefCell<dyn GuestMemory>> = mem.clone();
    (Edma::new(irqs, mem_dyn), interrupts, mem)
}

#[test]
fn reset_state_matches_hardware() {
    let (edma, _irqs, _mem) = new_edma();
    let mut w0 = edma.window0();
    assert_eq!(w0.read(0x00, 4), EDMA_CSR_RESET);
    assert_eq!(w0.read(0x04, 4), 0);
    // TCD0's CH_SBR (offset 0x0C within the TCD, at window offset 0x4000+0x0C).
    assert_eq!(w0.read(TCD_SIZE + 0x0C, 4), 0x0000_8002);
}

#[test]
fn global_ro_registers_reject_writes() {
    let (edma, _irqs, _mem) = new_edma();
    let mut w0 = edma.window0();
    w0.write(0x04, 0xffff_ffff, 4);
    assert_eq!(w0.read(0x04, 4), 0);
}

#[test]
fn simple_memcpy_via_edma() {
    use devices::MmioDevice;
    let (edma, interrupts, mem) = new_edma();
    let mut w0 = edma.window0();

    for i in 0..24u8 {
        mem.borrow_mut().write_u8(0x2000_1000 + i as u64, i);
    }

    let base = TCD_SIZE; // TCD0
    w0.write(base + 0x20, 0x2000_1000, 4); // SADDR = A
    w0.write(base + 0x30, 0x2000_2000, 4); // DADDR = B
    w0.write(base + 0x24, 1, 2); // SOFF = 1
    w0.write(base + 0x34, 1, 2); // DOFF = 1
    w0.write(base + 0x26, 0, 2); // ATTR: SSIZE=0, DSIZE=0
    w0.write(base + 0x28, 24, 4); // NBYTES = 24
    w0.write(base + 0x3E, 1, 2); // BITER = 1
    w0.write(base + 0x36, 1, 2); // CITER = 1
    w0.write(base + 0x3C, 0b10, 2); // TCD_CSR: INTMAJOR = 1
    w0.write(base + 0x3C, 0b11, 2); // ...then START = 1 (triggers arbitration)

    for i in 0..24u8 {
        assert_eq!(mem.borrow().read_u8(0x2000_2000 + i as u64), i);
    }
    assert_eq!(tcd::ChCsr::Done.extract(w0.read(base + 0x00, 4)), 1);
    assert_eq!(tcd::ChInt::Int.extract(w0.read(base + 0x08, 4)), 1);
    assert_eq!(w0.read(0x08, 4) & 1, 1, "global INT bit 0 must mirror CH_INT.INT");
    assert!(interrupts.borrow().level(0));
}

#[test]
fn strided_two_byte_copy() {
    use devices::MmioDevice;
    let (edma, _interrupts, mem) = new_edma();
    let mut w0 = edma.window0();

    let src = 0x2000_3000u64;
    let dst = 0x2000_4000u64;
    let values: Vec<u8> = (0..24u8).rev().collect();
    for (i, v) in values.iter().enumerate() {
        mem.borrow_mut().write_u8(src + i as u64, *v);
    }

    let base = TCD_SIZE * 2; // TCD1, standing in for the spec's "TCD2"
    w0.write(base + 0x20, src as u32, 4);
    w0.write(base + 0x30, dst as u32, 4);
    w0.write(base + 0x24, 2, 2); // SOFF = 2
    w0.write(base + 0x34, 2, 2); // DOFF = 2
    w0.write(base + 0x26, (1 << 8) | 1, 2); // SSIZE=1 (2 bytes), DSIZE=1 (2 bytes)
    w0.write(base + 0x28, 24, 4);
    w0.write(base + 0x3E, 1, 2);
    w0.write(base + 0x36, 1, 2);
    w0.write(base + 0x3C, 1, 2); // START

    for (i, v) in values.iter().enumerate() {
        assert_eq!(mem.borrow().read_u8(dst + i as u64), *v);
    }
}

#[test]
fn scatter_gather_three_element_chain() {
    use devices::MmioDevice;
    let (edma, interrupts, mem) = new_edma();
    let mut w0 = edma.window0();

    let (s0, d0, s1, d1, s2, d2) = (
        0x2000_5000u64,
        0x2000_5100u64,
        0x2000_5200u64,
        0x2000_5300u64,
        0x2000_5400u64,
        0x2000_5500u64,
    );
    for i in 0..16u8 {
        mem.borrow_mut().write_u8(s0 + i as u64, i);
    }
    for i in 0..32u8 {
        mem.borrow_mut().write_u8(s1 + i as u64, i.wrapping_add(1));
    }
    for i in 0..64u8 {
        mem.borrow_mut().write_u8(s2 + i as u64, i.wrapping_add(2));
    }

    let desc1 = 0x2000_6000u64;
    let desc2 = 0x2000_6100u64;
    write_descriptor(&mem, desc1, s1, d1, 32, true, desc2);
    write_descriptor(&mem, desc2, s2, d2, 64, false, 0);

    // Load element 0 directly into channel 1's TCD, with ESG pointing at desc1.
    // No INTMAJOR here: only element 2 (the final, non-ESG leg) raises the
    // completion interrupt.
    let base = TCD_SIZE * 2; // TCD1
    w0.write(base + 0x20, s0 as u32, 4);
    w0.write(base + 0x30, d0 as u32, 4);
    w0.write(base + 0x24, 1, 2);
    w0.write(base + 0x34, 1, 2);
    w0.write(base + 0x26, 0, 2);
    w0.write(base + 0x28, 16, 4);
    w0.write(base + 0x38, desc1 as u32, 4); // DLAST_SGA
    w0.write(base + 0x3E, 1, 2);
    w0.write(base + 0x36, 1, 2);
    w0.write(base + 0x3C, (1 << 4) | 1, 2); // ESG=1, START=1 -> runs element 0

    for i in 0..16u8 {
        assert_eq!(mem.borrow().read_u8(d0 + i as u64), i);
    }
    assert!(
        !interrupts.borrow().level(1),
        "no interrupt until the final, non-ESG leg completes"
    );

    // Scatter-gather reload prepared element 1's parameters but, like the real
    // engine, does not re-arm START on its own: each leg still needs an
    // explicit software-initiated start, driven here the way firmware polling
    // DONE would.
    let csr = w0.read(base + 0x3C, 2);
    w0.write(base + 0x3C, csr | 1, 2); // runs element 1
    for i in 0..32u8 {
        assert_eq!(mem.borrow().read_u8(d1 + i as u64), i.wrapping_add(1));
    }
    assert!(!interrupts.borrow().level(1));

    let csr = w0.read(base + 0x3C, 2);
    w0.write(base + 0x3C, csr | 1, 2); // runs element 2
    for i in 0..64u8 {
        assert_eq!(mem.borrow().read_u8(d2 + i as u64), i.wrapping_add(2));
    }
    assert_eq!(tcd::ChInt::Int.extract(w0.read(base + 0x08, 4)), 1);
    assert!(interrupts.borrow().level(1), "element 2's INTMAJOR must raise the IRQ");
}

fn write_descriptor(
    mem: &Rc<RefCell<GuestAddressSpace>>,
    at: u64,
    saddr: u64,
    daddr: u64,
    nbytes: u32,
    esg: bool,
    next: u64,
) {
    let mut m = mem.borrow_mut();
    m.write_u32(at, saddr as u32);
    m.write_u16(at + 0x04, 1); // SOFF
    m.write_u16(at + 0x06, 0); // ATTR
    m.write_u32(at + 0x08, nbytes);
    m.write_u32(at + 0x0C, 0); // SLAST_SDA
    m.write_u32(at + 0x10, daddr as u32);
    m.write_u16(at + 0x14, 1); // DOFF
    m.write_u16(at + 0x16, 1); // CITER
    m.write_u32(at + 0x18, next as u32); // DLAST_SGA
    let csr: u16 = if esg { 1 << 4 } else { 1 << 1 }; // ESG, or INTMAJOR on the final leg
    m.write_u16(at + 0x1C, csr);
    m.write_u16(at + 0x1E, 1); // BITER
}

#[test]
#[should_panic(expected = "CITER must be written equal to BITER")]
fn citer_biter_mismatch_asserts_through_mmio() {
    use devices::MmioDevice;
    let (edma, _interrupts, _mem) = new_edma();
    let mut w0 = edma.window0();
    let base = TCD_SIZE;
    w0.write(base + 0x3E, 1, 2); // BITER = 1
    w0.write(base + 0x36, 2, 2); // CITER = 2
}
