//! The Transfer Control Descriptor: one eDMA channel's transfer parameters
//! and runtime status, plus the minor/major-loop transfer mechanics that act
//! on it. A TCD never reaches outside itself except through the `GuestMemory`
//! handle passed into `run_minor_loop`/`complete_major_loop` and the `IrqLine`
//! it owns — it has no notion of the engine that arbitrates between channels.

use devices::regfield;
use devices::{guest_error, GuestMemory, GuestMemoryExt, IrqLine};

pub const EDMA_CHANNELS: usize = 32;
const MAX_BEAT_BUF: usize = 64;

pub struct ChCsr;
regfield!(ChCsr, Eei, 2, 1);
regfield!(ChCsr, Done, 30, 1);
regfield!(ChCsr, Active, 31, 1);

pub struct ChEs;
regfield!(ChEs, Err, 31, 1);

pub struct ChInt;
regfield!(ChInt, Int, 0, 1);

pub struct TcdAttr;
regfield!(TcdAttr, Dsize, 0, 3);
regfield!(TcdAttr, Ssize, 8, 3);

pub struct TcdNbytesMloff;
regfield!(TcdNbytesMloff, Nbytes, 0, 30);
regfield!(TcdNbytesMloff, Dmloe, 30, 1);
regfield!(TcdNbytesMloff, Smloe, 31, 1);

pub struct TcdCiter;
regfield!(TcdCiter, Citer, 0, 15);
regfield!(TcdCiter, Elink, 15, 1);

pub struct TcdCsr;
regfield!(TcdCsr, Start, 0, 1);
regfield!(TcdCsr, Intmajor, 1, 1);
regfield!(TcdCsr, Inthalf, 2, 1);
regfield!(TcdCsr, Esg, 4, 1);
regfield!(TcdCsr, Majorelink, 5, 1);
regfield!(TcdCsr, Esda, 7, 1);

pub struct TcdBiter;
regfield!(TcdBiter, Biter, 0, 15);
regfield!(TcdBiter, Elink, 15, 1);

/// The 32 bytes SADDR..BITER (inclusive) reloaded verbatim from guest memory
/// on scatter-gather reload. Spelled out explicitly rather than relying on
/// struct packing/`memcpy`, per the design note on TCD self-modification.
pub const TCD_RELOAD_LEN: usize = 32;

pub struct TcdWireLayout {
    pub saddr: u32,
    pub soff: u16,
    pub attr: u16,
    pub nbytes_mloff: u32,
    pub slast_sda: u32,
    pub daddr: u32,
    pub doff: u16,
    pub citer: u16,
    pub dlast_sga: u32,
    pub csr: u16,
    pub biter: u16,
}

impl TcdWireLayout {
    pub fn from_bytes(b: &[u8; TCD_RELOAD_LEN]) -> Self {
        TcdWireLayout {
            saddr: u32::from_le_bytes(b[0..4].try_into().unwrap()),
            soff: u16::from_le_bytes(b[4..6].try_into().unwrap()),
            attr: u16::from_le_bytes(b[6..8].try_into().unwrap()),
            nbytes_mloff: u32::from_le_bytes(b[8..12].try_into().unwrap()),
            slast_sda: u32::from_le_bytes(b[12..16].try_into().unwrap()),
            daddr: u32::from_le_bytes(b[16..20].try_into().unwrap()),
            doff: u16::from_le_bytes(b[20..22].try_into().unwrap()),
            citer: u16::from_le_bytes(b[22..24].try_into().unwrap()),
            dlast_sga: u32::from_le_bytes(b[24..28].try_into().unwrap()),
            csr: u16::from_le_bytes(b[28..30].try_into().unwrap()),
            biter: u16::from_le_bytes(b[30..32].try_into().unwrap()),
        }
    }

    fn apply(self, tcd: &mut Tcd) {
        tcd.saddr = self.saddr;
        tcd.soff = self.soff;
        tcd.attr = self.attr;
        tcd.nbytes_mloff = self.nbytes_mloff;
        tcd.slast_sda = self.slast_sda;
        tcd.daddr = self.daddr;
        tcd.doff = self.doff;
        tcd.citer = self.citer;
        tcd.dlast_sga = self.dlast_sga;
        tcd.csr = self.csr;
        tcd.biter = self.biter;
    }
}

pub struct Tcd {
    pub ch_csr: u32,
    pub ch_es: u32,
    pub ch_int: u32,
    pub ch_sbr: u32,
    pub ch_pri: u32,
    pub saddr: u32,
    pub soff: u16,
    pub attr: u16,
    pub nbytes_mloff: u32,
    pub slast_sda: u32,
    pub daddr: u32,
    pub doff: u16,
    pub citer: u16,
    pub dlast_sga: u32,
    pub csr: u16,
    pub biter: u16,
    irq: Box<dyn IrqLine>,
}

impl Tcd {
    pub fn new(irq: Box<dyn IrqLine>) -> Self {
        Tcd {
            ch_csr: 0,
            ch_es: 0,
            ch_int: 0,
            ch_sbr: 0x0000_8002,
            ch_pri: 0,
            saddr: 0,
            soff: 0,
            attr: 0,
            nbytes_mloff: 0,
            slast_sda: 0,
            daddr: 0,
            doff: 0,
            citer: 0,
            dlast_sga: 0,
            csr: 0,
            biter: 0,
            irq,
        }
    }

    pub fn reset(&mut self) {
        self.ch_csr = 0;
        self.ch_es = 0;
        self.ch_int = 0;
        self.ch_sbr = 0x0000_8002;
        self.ch_pri = 0;
        self.saddr = 0;
        self.soff = 0;
        self.attr = 0;
        self.nbytes_mloff = 0;
        self.slast_sda = 0;
        self.daddr = 0;
        self.doff = 0;
        self.citer = 0;
        self.dlast_sga = 0;
        self.csr = 0;
        self.biter = 0;
    }

    /// Recomputes `CH_INT.INT` from `INTHALF`/`INTMAJOR` against the current
    /// iteration counters, drives the channel's IRQ line to match, and
    /// returns whether it ended up asserted (the caller mirrors this into the
    /// aggregated `EDMA_INT` register — error-interrupt generation is out of
    /// scope, so `EEI` never contributes here).
    pub fn update_irq(&mut self) -> bool {
        let citer = TcdCiter::Citer.extract(self.citer as u32);
        let biter = TcdBiter::Biter.extract(self.biter as u32);

        if TcdCsr::Inthalf.extract(self.csr as u32) != 0 && citer >= biter / 2 {
            self.ch_int = ChInt::Int.deposit(self.ch_int, 1);
        }
        if TcdCsr::Intmajor.extract(self.csr as u32) != 0 && citer == 0 {
            self.ch_int = ChInt::Int.deposit(self.ch_int, 1);
        }

        let asserted = ChInt::Int.extract(self.ch_int) != 0;
        self.irq.set_level(asserted);
        asserted
    }

    /// Runs one minor loop if `CITER > 0`. Returns whether it ran, so the
    /// caller knows whether to recompute the IRQ line (the engine only does
    /// so immediately after a minor loop executes, not after the major-loop
    /// completion housekeeping below).
    pub fn run_minor_loop(&mut self, mem: &mut dyn GuestMemory) -> bool {
        let ssize_field = TcdAttr::Ssize.extract(self.attr as u32);
        let dsize_field = TcdAttr::Dsize.extract(self.attr as u32);
        assert!(ssize_field != 0b111, "SSIZE = 7 is reserved");
        assert!(dsize_field != 0b111, "DSIZE = 7 is reserved");
        let ssize = 1u32 << ssize_field;
        let dsize = 1u32 << dsize_field;
        let max_size = ssize.max(dsize);
        let nbytes = TcdNbytesMloff::Nbytes.extract(self.nbytes_mloff);

        if TcdCiter::Citer.extract(self.citer as u32) == 0 {
            return false;
        }

        let mut saddr = self.saddr;
        let mut daddr = self.daddr;
        let soff = self.soff as i16 as i64;
        let doff = self.doff as i16 as i64;
        let mut buf = [0u8; MAX_BEAT_BUF];

        for _ in 0..(nbytes / max_size) {
            for _ in 0..(max_size / ssize) {
                mem.read_phys(saddr as u64, &mut buf[..ssize as usize]);
                saddr = (saddr as i64 + soff) as u32;
            }
            for _ in 0..(max_size / dsize) {
                mem.write_phys(daddr as u64, &buf[..dsize as usize]);
                daddr = (daddr as i64 + doff) as u32;
            }
        }

        self.saddr = saddr;
        self.daddr = daddr;

        let next_citer = TcdCiter::Citer.extract(self.citer as u32) - 1;
        self.citer = TcdCiter::Citer.deposit(self.citer as u32, next_citer) as u16;
        self.ch_csr = ChCsr::Active.deposit(self.ch_csr, 0);
        true
    }

    /// Runs the major-loop completion housekeeping (SLAST_SDA/DLAST_SGA
    /// application, scatter-gather reload, DONE/INT) once `CITER` has
    /// reached zero. Idempotent to call when `CITER` is still nonzero — it
    /// simply does nothing in that case.
    pub fn complete_major_loop(&mut self, mem: &mut dyn GuestMemory) {
        if TcdCiter::Citer.extract(self.citer as u32) != 0 {
            return;
        }

        if TcdCsr::Esda.extract(self.csr as u32) != 0 {
            mem.write_u32(self.slast_sda as u64, self.daddr);
        } else {
            self.saddr = (self.saddr as i64 + self.slast_sda as i32 as i64) as u32;
        }

        if TcdCsr::Esg.extract(self.csr as u32) != 0 {
            let mut next = [0u8; TCD_RELOAD_LEN];
            mem.read_phys(self.dlast_sga as u64, &mut next);
            TcdWireLayout::from_bytes(&next).apply(self);
        } else {
            self.daddr = (self.daddr as i64 + self.dlast_sga as i32 as i64) as u32;
        }

        let biter = TcdBiter::Biter.extract(self.biter as u32);
        self.citer = TcdCiter::Citer.deposit(self.citer as u32, biter) as u16;

        self.ch_csr = ChCsr::Done.deposit(self.ch_csr, 1);
        self.ch_int = ChInt::Int.deposit(self.ch_int, 1);
    }

    pub fn read(&self, tcd_offset: u64) -> u32 {
        match tcd_offset {
            0x00 => self.ch_csr,
            0x04 => self.ch_es,
            0x08 => self.ch_int,
            0x0C => self.ch_sbr,
            0x10 => self.ch_pri,
            0x20 => self.saddr,
            0x24 => self.soff as u32,
            0x26 => self.attr as u32,
            0x28 => self.nbytes_mloff,
            0x2C => self.slast_sda,
            0x30 => self.daddr,
            0x34 => self.doff as u32,
            0x36 => self.citer as u32,
            0x38 => self.dlast_sga,
            0x3C => self.csr as u32,
            0x3E => self.biter as u32,
            _ => {
                guest_error!(offset = tcd_offset, "edma: bad TCD offset on read");
                0
            }
        }
    }

    /// Returns `true` if the write requested arbitration (`TCD_CSR.START`
    /// was set), leaving the actual arbitration call to the caller, which
    /// has visibility into the other 31 channels that this TCD does not.
    pub fn write(&mut self, tcd_offset: u64, value: u32) -> bool {
        match tcd_offset {
            0x00 => self.ch_csr = ChCsr::Done.deposit(self.ch_csr, ChCsr::Done.extract(value)),
            0x04 => self.ch_es = ChEs::Err.deposit(self.ch_es, ChEs::Err.extract(value)),
            0x08 => {
                if ChInt::Int.extract(value) != 0 {
                    self.ch_int = ChInt::Int.deposit(self.ch_int, 0);
                }
                self.update_irq();
            }
            0x0C | 0x10 => {
                guest_error!(offset = tcd_offset, "edma: CH_SBR/CH_PRI are not writable");
            }
            0x20 => self.saddr = value,
            0x24 => self.soff = value as u16,
            0x26 => self.attr = value as u16,
            0x28 => {
                assert!(TcdNbytesMloff::Smloe.extract(value) == 0, "SMLOE is not supported");
                assert!(TcdNbytesMloff::Dmloe.extract(value) == 0, "DMLOE is not supported");
                self.nbytes_mloff = value;
            }
            0x2C => self.slast_sda = value,
            0x30 => self.daddr = value,
            0x34 => self.doff = value as u16,
            0x36 => {
                assert!(TcdCiter::Elink.extract(value) == 0, "channel linking is not supported");
                let biter = TcdBiter::Biter.extract(self.biter as u32);
                assert_eq!(
                    TcdCiter::Citer.extract(value),
                    biter,
                    "CITER must be written equal to BITER"
                );
                self.citer = value as u16;
            }
            0x38 => self.dlast_sga = value,
            0x3C => {
                assert!(
                    TcdCsr::Majorelink.extract(value) == 0,
                    "channel linking is not supported"
                );
                self.csr = value as u16;
                if TcdCsr::Start.extract(value) != 0 {
                    return true;
                }
            }
            0x3E => {
                assert!(TcdBiter::Elink.extract(value) == 0, "channel linking is not supported");
                assert!(TcdBiter::Biter.extract(value) <= 1, "BITER > 1 is not supported");
                self.biter = value as u16;
            }
            _ => guest_error!(offset = tcd_offset, "edma: bad TCD offset on write"),
        }
        false
    }
}
