//! SoC composition: wires one CPU handle, the flash/SRAM/TCM memory map, 16
//! LPUART ports, one eDMA engine, and the mode-entry firmware-readiness stub
//! into a single [`Soc`], the way `nxps32k358_soc_realize` wires up
//! `NXPS32K358State` in the original source. The SoC owns every device;
//! devices only ever hold capability handles (clocks, IRQ lines, a guest
//! memory handle) back into the platform, never a pointer to the SoC itself.

pub mod memmap;
mod stub;

use std::cell::RefCell;
use std::rc::Rc;

use devices::{GuestMemory, GuestMemoryExt, IrqLine};
use edma::{Edma, EDMA_CHANNELS, TCD_SIZE};
use interrupts::{PlatformInterrupts, PlatformIrqLine};
use lpuart::{CharBackend, Lpuart, LPUART_PORTS};
use memory::{Bus, GuestAddressSpace};
use platform::Clock;

pub use stub::{UnimplementedDevice, UNIMPLEMENTED_REGIONS};

const LPUART_WINDOW_SIZE: u64 = 0x4000;

/// The subset of CPU configuration the SoC needs to hand off to whatever
/// concrete core model the host provides. Mirrors the `qdev_prop_set_*`
/// calls the original source makes on the `armv7m` child device; `soc` only
/// ever reads `num_irq` (to size the interrupt sink) and `reset_vector`
/// (there's no CPU model in this workspace), the rest are forwarded as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuConfig {
    pub num_irq: u32,
    pub num_prio_bits: u8,
    pub cpu_type: &'static str,
    pub enable_bitband: bool,
    pub reset_vector: u32,
}

/// A narrow capability handle onto the CPU model the SoC is realized
/// against. The SoC never owns or steps the CPU; it only configures it and
/// wires its two clock inputs, the same division of labor `nxps32k358_soc.c`
/// keeps between `armv7m` and the rest of the SoC.
pub trait CpuHandle {
    fn configure(&mut self, config: &CpuConfig);
    fn connect_cpuclk(&mut self, clk: &Clock);
    fn connect_refclk(&mut self, clk: &Clock);
}

/// A `CpuHandle` that only records what it was told, for tests that want to
/// assert on the SoC's wiring without a real CPU model.
#[derive(Default)]
pub struct RecordingCpuHandle {
    pub config: Option<CpuConfig>,
    pub cpuclk_hz: Option<u64>,
    pub refclk_hz: Option<u64>,
}

impl CpuHandle for RecordingCpuHandle {
    fn configure(&mut self, config: &CpuConfig) {
        self.config = Some(config.clone());
    }

    fn connect_cpuclk(&mut self, clk: &Clock) {
        self.cpuclk_hz = Some(clk.get_hz());
    }

    fn connect_refclk(&mut self, clk: &Clock) {
        self.refclk_hz = Some(clk.get_hz());
    }
}

/// Realize-time configuration failures, matching the original source's
/// `error_setg` calls in `nxps32k358_soc_realize` — these abort SoC bring-up
/// rather than being absorbed the way guest-programming errors are.
#[derive(Debug, thiserror::Error)]
pub enum RealizeError {
    #[error("sysclk clock must be wired up by the board code")]
    SysclkUnsourced,
    #[error("refclk clock must not be wired up by the board code")]
    RefclkPreSourced,
    #[error("expected {expected} LPUART character back-ends, got {got}")]
    WrongCharBackendCount { expected: usize, got: usize },
}

/// The realized SoC: owns the guest address space, the MMIO bus every
/// peripheral is mapped onto, and the shared interrupt sink every device's
/// `IrqLine` handle feeds into.
pub struct Soc {
    memory: Rc<RefCell<GuestAddressSpace>>,
    ram_rom_ranges: Vec<(u64, u64)>,
    bus: Bus,
    interrupts: Rc<RefCell<PlatformInterrupts>>,
    sysclk: Clock,
    refclk: Clock,
    aips_plat_clk: Clock,
    aips_slow_clk: Clock,
}

impl Soc {
    /// Realizes the SoC against `cpu`, given a `sysclk` already wired to an
    /// external source by the board, a fresh unsourced `refclk` input (the
    /// board must leave this alone — the SoC derives it internally), and
    /// exactly [`LPUART_PORTS`] character back-ends, one per LPUART instance
    /// in port order.
    pub fn realize(
        cpu: &mut dyn CpuHandle,
        sysclk: Clock,
        refclk: Clock,
        char_backends: Vec<Box<dyn CharBackend>>,
    ) -> Result<Soc, RealizeError> {
        if char_backends.len() != LPUART_PORTS {
            return Err(RealizeError::WrongCharBackendCount {
                expected: LPUART_PORTS,
                got: char_backends.len(),
            });
        }

        // refclk is an internal derivation: the board must not have sourced
        // it, and must already have sourced sysclk, before we touch either.
        if refclk.has_source() {
            return Err(RealizeError::RefclkPreSourced);
        }
        if !sysclk.has_source() {
            return Err(RealizeError::SysclkUnsourced);
        }

        // The refclk always runs at frequency HCLK / 8.
        refclk.set_mul_div(1, 8);
        refclk.set_source(&sysclk);

        let aips_plat_clk = Clock::new();
        aips_plat_clk.set_hz(80_000_000);
        let aips_slow_clk = Clock::new();
        aips_slow_clk.set_hz(40_000_000);

        let reset_vector = memmap::CODE_FLASH_BASE_ADDRESS as u32 + 2048;
        let cpu_config = CpuConfig {
            num_irq: interrupts::NUM_EXTERNAL_IRQS as u32,
            num_prio_bits: 4,
            cpu_type: "cortex-m7",
            enable_bitband: true,
            reset_vector,
        };
        cpu.configure(&cpu_config);
        cpu.connect_cpuclk(&sysclk);
        cpu.connect_refclk(&refclk);

        let memory = Rc::new(RefCell::new(GuestAddressSpace::new()));
        let mut ram_rom_ranges = Vec::new();
        {
            let mut mem = memory.borrow_mut();
            for i in 0..4u64 {
                let base = memmap::CODE_FLASH_BASE_ADDRESS + i * memmap::CODE_FLASH_BLOCK_SIZE;
                mem.add_rom(base, vec![0u8; memmap::CODE_FLASH_BLOCK_SIZE as usize]);
                ram_rom_ranges.push((base, memmap::CODE_FLASH_BLOCK_SIZE));
            }

            mem.add_rom(
                memmap::DATA_FLASH_BASE_ADDRESS,
                vec![0u8; memmap::DATA_FLASH_SIZE as usize],
            );
            ram_rom_ranges.push((memmap::DATA_FLASH_BASE_ADDRESS, memmap::DATA_FLASH_SIZE));

            for i in 0..3u64 {
                let base = memmap::SRAM_BASE_ADDRESS + i * memmap::SRAM_BLOCK_SIZE;
                mem.add_ram(base, memmap::SRAM_BLOCK_SIZE);
                ram_rom_ranges.push((base, memmap::SRAM_BLOCK_SIZE));
            }

            mem.add_ram(memmap::DTCM_BASE_ADDRESS, memmap::DTCM_SIZE);
            ram_rom_ranges.push((memmap::DTCM_BASE_ADDRESS, memmap::DTCM_SIZE));

            mem.add_ram(memmap::ITCM_BASE_ADDRESS, memmap::ITCM_SIZE);
            ram_rom_ranges.push((memmap::ITCM_BASE_ADDRESS, memmap::ITCM_SIZE));
        }

        let interrupts = Rc::new(RefCell::new(PlatformInterrupts::new()));
        let mut bus = Bus::new();

        bus.map(
            memmap::MC_ME_BASE_ADDRESS,
            memmap::MC_ME_SIZE,
            Box::new(stub::ModeEntryStub),
        );

        for (i, chr) in char_backends.into_iter().enumerate() {
            // LPUART 0, 1 and 8 use AIPS_PLAT_CLK; the rest use AIPS_SLOW_CLK.
            let clk = if i < 2 || i == 8 {
                aips_plat_clk.clone()
            } else {
                aips_slow_clk.clone()
            };
            let irq: Box<dyn IrqLine> = Box::new(PlatformIrqLine::new(interrupts.clone(), memmap::lpuart_irq(i)));
            let port = Lpuart::new(i, clk, chr, irq);
            bus.map(memmap::lpuart_addr(i), LPUART_WINDOW_SIZE, Box::new(port));
        }

        let edma_irqs: Vec<Box<dyn IrqLine>> = (0..EDMA_CHANNELS)
            .map(|c| Box::new(PlatformIrqLine::new(interrupts.clone(), memmap::edma_irq(c))) as Box<dyn IrqLine>)
            .collect();
        let mem_dyn: Rc<RefCell<dyn GuestMemory>> = memory.clone();
        let edma = Edma::new(edma_irqs, mem_dyn);
        let window0_size = TCD_SIZE * 13;
        bus.map(memmap::EDMA_BASE_ADDRESS, window0_size, Box::new(edma.window0()));
        bus.map(
            memmap::EDMA_BASE_ADDRESS + window0_size,
            TCD_SIZE * 20,
            Box::new(edma.window12()),
        );

        // Implemented devices have higher priority than unimplemented ones
        // so we don't care if they overlap; register the stubs last.
        for region in UNIMPLEMENTED_REGIONS {
            bus.map(
                region.base,
                region.size,
                Box::new(UnimplementedDevice::new(region.name)),
            );
        }

        Ok(Soc {
            memory,
            ram_rom_ranges,
            bus,
            interrupts,
            sysclk,
            refclk,
            aips_plat_clk,
            aips_slow_clk,
        })
    }

    /// A shared handle onto guest physical memory, for a test harness to
    /// pre-populate flash/RAM before driving the SoC through MMIO.
    pub fn memory(&self) -> Rc<RefCell<GuestAddressSpace>> {
        self.memory.clone()
    }

    /// A unified guest physical read spanning both RAM/ROM and the MMIO bus,
    /// standing in for the host framework's single system address space.
    pub fn read(&mut self, addr: u64, size: u8) -> u32 {
        if self.in_ram_or_rom(addr) {
            self.read_memory(addr, size)
        } else {
            self.bus.read(addr, size)
        }
    }

    pub fn write(&mut self, addr: u64, value: u32, size: u8) {
        if self.in_ram_or_rom(addr) {
            self.write_memory(addr, value, size);
        } else {
            self.bus.write(addr, value, size);
        }
    }

    fn in_ram_or_rom(&self, addr: u64) -> bool {
        self.ram_rom_ranges.iter().any(|(base, size)| addr >= *base && addr < base + size)
    }

    fn read_memory(&self, addr: u64, size: u8) -> u32 {
        let mem = self.memory.borrow();
        match size {
            1 => mem.read_u8(addr) as u32,
            2 => mem.read_u16(addr) as u32,
            _ => mem.read_u32(addr),
        }
    }

    fn write_memory(&self, addr: u64, value: u32, size: u8) {
        let mut mem = self.memory.borrow_mut();
        match size {
            1 => mem.write_u8(addr, value as u8),
            2 => mem.write_u16(addr, value as u16),
            _ => mem.write_u32(addr, value),
        }
    }

    /// Resets every mapped device, mirroring a board-level reset line.
    pub fn reset(&mut self) {
        self.bus.reset_all();
    }

    pub fn irq_asserted(&self, line: usize) -> bool {
        self.interrupts.borrow().level(line)
    }

    pub fn sysclk(&self) -> &Clock {
        &self.sysclk
    }

    pub fn refclk(&self) -> &Clock {
        &self.refclk
    }

    pub fn aips_plat_clk(&self) -> &Clock {
        &self.aips_plat_clk
    }

    pub fn aips_slow_clk(&self) -> &Clock {
        &self.aips_slow_clk
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lpuart::InMemoryCharBackend;

    fn new_char_backends() -> Vec<Box<dyn CharBackend>> {
        (0..LPUART_PORTS)
            .map(|_| Box::new(InMemoryCharBackend::new()) as Box<dyn CharBackend>)
            .collect()
    }

    fn sourced_sysclk(hz: u64) -> Clock {
        let board_clk = Clock::new();
        board_clk.set_hz(hz);
        let sysclk = Clock::new();
        sysclk.set_source(&board_clk);
        sysclk
    }

    #[test]
    fn realize_rejects_an_unsourced_sysclk() {
        let mut cpu = RecordingCpuHandle::default();
        let err = Soc::realize(&mut cpu, Clock::new(), Clock::new(), new_char_backends()).unwrap_err();
        assert!(matches!(err, RealizeError::SysclkUnsourced));
    }

    #[test]
    fn realize_rejects_a_pre_sourced_refclk() {
        let mut cpu = RecordingCpuHandle::default();
        let sysclk = sourced_sysclk(160_000_000);
        let refclk = Clock::new();
        refclk.set_source(&sysclk);
        let err = Soc::realize(&mut cpu, sysclk, refclk, new_char_backends()).unwrap_err();
        assert!(matches!(err, RealizeError::RefclkPreSourced));
    }

    #[test]
    fn refclk_runs_at_sysclk_over_eight() {
        let mut cpu = RecordingCpuHandle::default();
        let sysclk = sourced_sysclk(160_000_000);
        let soc = Soc::realize(&mut cpu, sysclk, Clock::new(), new_char_backends()).unwrap();
        assert_eq!(soc.refclk().get_hz(), 20_000_000);
    }

    #[test]
    fn cpu_handle_receives_reset_vector_and_irq_count() {
        let mut cpu = RecordingCpuHandle::default();
        let sysclk = sourced_sysclk(160_000_000);
        let _soc = Soc::realize(&mut cpu, sysclk, Clock::new(), new_char_backends()).unwrap();

        let config = cpu.config.expect("configure must be called");
        assert_eq!(config.reset_vector, memmap::CODE_FLASH_BASE_ADDRESS as u32 + 2048);
        assert_eq!(config.num_irq, interrupts::NUM_EXTERNAL_IRQS as u32);
        assert_eq!(config.cpu_type, "cortex-m7");
        assert_eq!(cpu.cpuclk_hz, Some(160_000_000));
        assert_eq!(cpu.refclk_hz, Some(20_000_000));
    }

    #[test]
    fn mode_entry_stub_answers_the_magic_offset_and_nothing_else() {
        let mut cpu = RecordingCpuHandle::default();
        let sysclk = sourced_sysclk(160_000_000);
        let mut soc = Soc::realize(&mut cpu, sysclk, Clock::new(), new_char_backends()).unwrap();

        assert_eq!(soc.read(memmap::MC_ME_BASE_ADDRESS + 0x310, 4), 0x0100_0000);
        assert_eq!(soc.read(memmap::MC_ME_BASE_ADDRESS + 0x000, 4), 0);
        assert_eq!(soc.read(memmap::MC_ME_BASE_ADDRESS + 0x314, 4), 0);
    }

    #[test]
    fn lpuart_ports_route_to_the_right_clock_and_answer_at_their_base() {
        let mut cpu = RecordingCpuHandle::default();
        let sysclk = sourced_sysclk(160_000_000);
        let mut soc = Soc::realize(&mut cpu, sysclk, Clock::new(), new_char_backends()).unwrap();

        // Port 0's reset VERID (port < 2) should answer at its own base.
        assert_eq!(soc.read(memmap::lpuart_addr(0), 4), 0x0404_0007);
        // Port 3's reset VERID (port >= 2) should answer at its own base.
        assert_eq!(soc.read(memmap::lpuart_addr(3), 4), 0x0404_0003);
    }

    #[test]
    fn unimplemented_region_is_readable_as_zero_and_drops_writes() {
        let mut cpu = RecordingCpuHandle::default();
        let sysclk = sourced_sysclk(160_000_000);
        let mut soc = Soc::realize(&mut cpu, sysclk, Clock::new(), new_char_backends()).unwrap();

        // "rtc" is unimplemented and far from any real device's range.
        assert_eq!(soc.read(0x4028_8000, 4), 0);
        soc.write(0x4028_8000, 0xdead_beef, 4);
        assert_eq!(soc.read(0x4028_8000, 4), 0);
    }

    #[test]
    fn edma_second_window_is_mapped_directly_after_the_first() {
        let mut cpu = RecordingCpuHandle::default();
        let sysclk = sourced_sysclk(160_000_000);
        let mut soc = Soc::realize(&mut cpu, sysclk, Clock::new(), new_char_backends()).unwrap();

        // TCD12's CH_SBR (offset 0x0C within the TCD) lives at window12's
        // base, which must be contiguous with window0's end.
        let window0_size = TCD_SIZE * 13;
        let tcd12_ch_sbr = memmap::EDMA_BASE_ADDRESS + window0_size + 0x0C;
        assert_eq!(soc.read(tcd12_ch_sbr, 4), 0x0000_8002);
    }

    #[test]
    fn flash_reads_as_zero_before_any_program_is_loaded() {
        let mut cpu = RecordingCpuHandle::default();
        let sysclk = sourced_sysclk(160_000_000);
        let mut soc = Soc::realize(&mut cpu, sysclk, Clock::new(), new_char_backends()).unwrap();

        assert_eq!(soc.read(memmap::CODE_FLASH_BASE_ADDRESS, 4), 0);
    }

    #[test]
    fn wrong_char_backend_count_is_rejected() {
        let mut cpu = RecordingCpuHandle::default();
        let sysclk = sourced_sysclk(160_000_000);
        let err = Soc::realize(&mut cpu, sysclk, Clock::new(), Vec::new()).unwrap_err();
        assert!(matches!(err, RealizeError::WrongCharBackendCount { expected: 16, got: 0 }));
    }
}
