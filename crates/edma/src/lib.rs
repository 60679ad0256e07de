//! The eDMA engine: 32 channels (`tcd`) plus the small set of global
//! registers that sit in front of them, arbitrating software-initiated
//! transfers round-robin across channels and moving bytes between arbitrary
//! guest physical addresses.
//!
//! The engine's MMIO surface is split across two windows exactly as the
//! hardware is on this part: the first window interleaves the global
//! registers with TCDs 0..11, the second window holds TCDs 12..31 alone.
//! Both windows are thin [`devices::MmioDevice`] adapters sharing one
//! [`EdmaState`] through an `Rc<RefCell<_>>` — the TCD array and global
//! registers are one piece of state, mapped at two base addresses.

pub mod tcd;

use std::cell::RefCell;
use std::rc::Rc;

use devices::{guest_error, regfield, GuestMemory, IrqLine, MmioDevice};

pub use tcd::{Tcd, TcdWireLayout, EDMA_CHANNELS, TCD_RELOAD_LEN};

const EDMA_CSR_RESET: u32 = 0x0030_0000;
const CSR_WR_MASK: u32 = 0x0000_03f6;
const GRPRI_WR_MASK: u32 = 0x0000_001f;
const GRPRI_BASE: u64 = 0x100;

/// The byte size of one eDMA MMIO window's TCD slot; `TCD_SIZE * 13` is the
/// first window (global registers + TCD0..11), `TCD_SIZE * 20` the second
/// (TCD12..31).
pub const TCD_SIZE: u64 = 0x4000;

pub struct GlobalEs;
regfield!(GlobalEs, Ecx, 8, 1);
regfield!(GlobalEs, Errchn, 24, 5);
regfield!(GlobalEs, Vld, 31, 1);

pub struct GlobalCsr;
regfield!(GlobalCsr, Edbg, 1, 1);
regfield!(GlobalCsr, Erca, 2, 1);
regfield!(GlobalCsr, Halt, 5, 1);
regfield!(GlobalCsr, Ecx, 8, 1);
regfield!(GlobalCsr, Cx, 9, 1);
regfield!(GlobalCsr, ActiveId, 24, 5);
regfield!(GlobalCsr, Active, 31, 1);

struct EdmaState {
    edma_csr: u32,
    edma_es: u32,
    edma_int: u32,
    edma_hrs: u32,
    edma_chn_grpri: [u32; EDMA_CHANNELS],
    tcd: Vec<Tcd>,
    memory: Rc<RefCell<dyn GuestMemory>>,
    next_channel: usize,
}

impl EdmaState {
    fn new(irqs: Vec<Box<dyn IrqLine>>, memory: Rc<RefCell<dyn GuestMemory>>) -> Self {
        assert_eq!(irqs.len(), EDMA_CHANNELS, "eDMA needs exactly 32 channel IRQ lines");
        let tcd = irqs.into_iter().map(Tcd::new).collect();
        let mut state = EdmaState {
            edma_csr: 0,
            edma_es: 0,
            edma_int: 0,
            edma_hrs: 0,
            edma_chn_grpri: [0; EDMA_CHANNELS],
            tcd,
            memory,
            next_channel: 0,
        };
        state.reset();
        state
    }

    fn reset(&mut self) {
        self.edma_csr = EDMA_CSR_RESET;
        self.edma_es = 0;
        self.edma_int = 0;
        self.edma_hrs = 0;
        for i in 0..EDMA_CHANNELS {
            self.edma_chn_grpri[i] = 0;
            self.tcd[i].reset();
            self.update_irq(i);
        }
    }

    fn update_irq(&mut self, c: usize) {
        let asserted = self.tcd[c].update_irq();
        if asserted {
            self.edma_int |= 1 << c;
        } else {
            self.edma_int &= !(1u32 << c);
        }
    }

    fn transmit(&mut self, c: usize) {
        let mem = self.memory.clone();
        let mut mem = mem.borrow_mut();
        let ran = self.tcd[c].run_minor_loop(&mut *mem);
        if ran {
            self.update_irq(c);
        }
        self.tcd[c].complete_major_loop(&mut *mem);
    }

    /// Round-robin arbitration: scans all 32 channels once, starting from
    /// `next_channel`, and services the first with `TCD_CSR.START` set.
    fn arbitrate(&mut self) {
        for i in 0..EDMA_CHANNELS {
            let j = (i + self.next_channel) % EDMA_CHANNELS;
            let started = tcd::TcdCsr::Start.extract(self.tcd[j].csr as u32) != 0;
            if started {
                self.tcd[j].ch_csr = tcd::ChCsr::Done.deposit(self.tcd[j].ch_csr, 0);
                self.tcd[j].csr = tcd::TcdCsr::Start.deposit(self.tcd[j].csr as u32, 0) as u16;
                self.tcd[j].ch_csr = tcd::ChCsr::Active.deposit(self.tcd[j].ch_csr, 1);
                self.transmit(j);
                self.next_channel = (j + 1) % EDMA_CHANNELS;
                return;
            }
        }
    }

    fn global_read(&self, offset: u64) -> u32 {
        match offset {
            0x00 => self.edma_csr,
            0x04 => self.edma_es,
            0x08 => self.edma_int,
            0x0C => self.edma_hrs,
            _ if offset >= GRPRI_BASE && offset < GRPRI_BASE + 4 * EDMA_CHANNELS as u64 => {
                let n = ((offset - GRPRI_BASE) / 4) as usize;
                self.edma_chn_grpri[n]
            }
            _ => {
                guest_error!(offset, "edma: bad global offset on read");
                0
            }
        }
    }

    fn global_write(&mut self, offset: u64, value: u32) {
        match offset {
            0x00 => {
                self.edma_csr &= !CSR_WR_MASK;
                self.edma_csr |= value & CSR_WR_MASK;
            }
            0x04 | 0x08 | 0x0C => {
                // ES/INT/HRS are read-only; writes are dropped.
            }
            _ if offset >= GRPRI_BASE && offset < GRPRI_BASE + 4 * EDMA_CHANNELS as u64 => {
                let n = ((offset - GRPRI_BASE) / 4) as usize;
                self.edma_chn_grpri[n] &= !GRPRI_WR_MASK;
                self.edma_chn_grpri[n] |= value & GRPRI_WR_MASK;
            }
            _ => guest_error!(offset, "edma: bad global offset on write"),
        }
    }

    fn tcd_read(&self, tcd_offset: u64, c: usize) -> u32 {
        self.tcd[c].read(tcd_offset)
    }

    fn tcd_write(&mut self, tcd_offset: u64, value: u32, c: usize) {
        let start_requested = self.tcd[c].write(tcd_offset, value);
        if start_requested {
            self.arbitrate();
        }
    }
}

/// Shared handle to the eDMA engine. Cloning shares the same underlying
/// state (the two MMIO windows below are views onto one engine, not two
/// independent devices).
#[derive(Clone)]
pub struct Edma {
    state: Rc<RefCell<EdmaState>>,
}

impl Edma {
    /// `irqs` must contain exactly 32 lines, one per channel, in channel
    /// order. `memory` is the guest physical address space the transfer
    /// engine reads and writes through — a weak capability handle, not
    /// ownership: the SoC (or a test) retains its own handle to inspect or
    /// pre-populate guest memory.
    pub fn new(irqs: Vec<Box<dyn IrqLine>>, memory: Rc<RefCell<dyn GuestMemory>>) -> Self {
        Edma {
            state: Rc::new(RefCell::new(EdmaState::new(irqs, memory))),
        }
    }

    /// The first MMIO window: global registers (offset < 0x4000) followed by
    /// TCD0..11.
    pub fn window0(&self) -> EdmaWindow0 {
        EdmaWindow0(self.state.clone())
    }

    /// The second MMIO window: TCD12..31, with no global registers at all.
    pub fn window12(&self) -> EdmaWindow12 {
        EdmaWindow12(self.state.clone())
    }
}

pub struct EdmaWindow0(Rc<RefCell<EdmaState>>);

impl MmioDevice for EdmaWindow0 {
    fn read(&mut self, offset: u64, _size: u8) -> u32 {
        let state = self.0.borrow();
        if offset >= TCD_SIZE {
            let tcd_offset = offset % TCD_SIZE;
            let tcd_num = ((offset - TCD_SIZE) / TCD_SIZE) as usize;
            state.tcd_read(tcd_offset, tcd_num)
        } else {
            state.global_read(offset)
        }
    }

    fn write(&mut self, offset: u64, value: u32, _size: u8) {
        let mut state = self.0.borrow_mut();
        if offset >= TCD_SIZE {
            let tcd_offset = offset % TCD_SIZE;
            let tcd_num = ((offset - TCD_SIZE) / TCD_SIZE) as usize;
            state.tcd_write(tcd_offset, value, tcd_num);
        } else {
            state.global_write(offset, value);
        }
    }

    fn reset(&mut self) {
        self.0.borrow_mut().reset();
    }
}

pub struct EdmaWindow12(Rc<RefCell<EdmaState>>);

impl MmioDevice for EdmaWindow12 {
    fn read(&mut self, offset: u64, _size: u8) -> u32 {
        let tcd_offset = offset % TCD_SIZE;
        let tcd_num = (offset / TCD_SIZE) as usize + 12;
        self.0.borrow().tcd_read(tcd_offset, tcd_num)
    }

    fn write(&mut self, offset: u64, value: u32, _size: u8) {
        let tcd_offset = offset % TCD_SIZE;
        let tcd_num = (offset / TCD_SIZE) as usize + 12;
        self.0.borrow_mut().tcd_write(tcd_offset, value, tcd_num);
    }

    fn reset(&mut self) {
        // Shares state with window0; resetting twice on a full bus reset is
        // harmless since reset is idempotent.
        self.0.borrow_mut().reset();
    }
}
