//! Physical memory map constants, lifted verbatim from
//! `hw/arm/nxps32k358_soc.h`.

pub const CODE_FLASH_BASE_ADDRESS: u64 = 0x0040_0000;
pub const CODE_FLASH_BLOCK_SIZE: u64 = 2 * 1024 * 1024;

pub const DATA_FLASH_BASE_ADDRESS: u64 = 0x1000_0000;
pub const DATA_FLASH_SIZE: u64 = 128 * 1024;

pub const SRAM_BASE_ADDRESS: u64 = 0x2040_0000;
pub const SRAM_BLOCK_SIZE: u64 = 256 * 1024;

pub const DTCM_BASE_ADDRESS: u64 = 0x2000_0000;
/// The header defines this as `(128 * 1024) + 1`; carried over verbatim
/// rather than rounded down to a power of two.
pub const DTCM_SIZE: u64 = 128 * 1024 + 1;

pub const ITCM_BASE_ADDRESS: u64 = 0x0000_0000;
pub const ITCM_SIZE: u64 = 64 * 1024;

pub const MC_ME_BASE_ADDRESS: u64 = 0x402D_C000;
pub const MC_ME_SIZE: u64 = 1340;

pub const EDMA_BASE_ADDRESS: u64 = 0x4020_C000;

pub fn lpuart_addr(i: usize) -> u64 {
    0x4032_8000 + 0x4000 * i as u64
}

pub fn lpuart_irq(i: usize) -> usize {
    141 + i
}

pub fn edma_irq(c: usize) -> usize {
    4 + c
}
