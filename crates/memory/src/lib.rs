//! A minimal stand-in for the host's guest physical address space and MMIO
//! routing. Real emulators own this in the framework layer; this workspace
//! needs just enough of it to let `soc` wire real devices together and be
//! exercised end to end by tests, the same way the teacher's `memory` crate
//! underlies `aero-pc-platform`'s address space without itself knowing about
//! any specific device.

use devices::{GuestMemory, MmioDevice};

enum Backing {
    Ram(Vec<u8>),
    /// Read-only; writes are silently dropped, matching `memory_region_init_rom`.
    Rom(Vec<u8>),
}

struct Region {
    base: u64,
    backing: Backing,
}

impl Region {
    fn size(&self) -> u64 {
        match &self.backing {
            Backing::Ram(v) | Backing::Rom(v) => v.len() as u64,
        }
    }

    fn contains(&self, addr: u64) -> bool {
        addr >= self.base && addr < self.base + self.size()
    }
}

/// Flat guest physical address space made of RAM/ROM regions. Implements
/// `devices::GuestMemory` so `edma`'s transfer engine can read and write it
/// directly, exactly as `cpu_physical_memory_read`/`_write` do in the
/// original source. Addresses outside every mapped region behave as open
/// bus: reads as zero, writes dropped.
#[derive(Default)]
pub struct GuestAddressSpace {
    regions: Vec<Region>,
}

impl GuestAddressSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_ram(&mut self, base: u64, size: u64) {
        self.regions.push(Region {
            base,
            backing: Backing::Ram(vec![0u8; size as usize]),
        });
    }

    pub fn add_rom(&mut self, base: u64, data: Vec<u8>) {
        self.regions.push(Region {
            base,
            backing: Backing::Rom(data),
        });
    }

    fn find(&self, addr: u64) -> Option<&Region> {
        self.regions.iter().find(|r| r.contains(addr))
    }

    fn find_mut(&mut self, addr: u64) -> Option<&mut Region> {
        self.regions.iter_mut().find(|r| r.contains(addr))
    }
}

impl GuestMemory for GuestAddressSpace {
    fn read_phys(&self, addr: u64, buf: &mut [u8]) {
        for (i, byte) in buf.iter_mut().enumerate() {
            let a = addr + i as u64;
            *byte = match self.find(a) {
                Some(region) => match &region.backing {
                    Backing::Ram(v) | Backing::Rom(v) => v[(a - region.base) as usize],
                },
                None => 0,
            };
        }
    }

    fn write_phys(&mut self, addr: u64, buf: &[u8]) {
        for (i, byte) in buf.iter().enumerate() {
            let a = addr + i as u64;
            if let Some(region) = self.find_mut(a) {
                if let Backing::Ram(v) = &mut region.backing {
                    v[(a - region.base) as usize] = *byte;
                }
            }
        }
    }
}

struct MmioMapping {
    base: u64,
    size: u64,
    device: Box<dyn MmioDevice>,
}

/// Routes guest MMIO accesses to the owning device by address. Mappings are
/// matched in registration order, so registering implemented devices before
/// unimplemented stubs gives implemented devices precedence on overlap,
/// matching the original SoC's registration-order comment ("Implemented
/// devices have higher priority than unimplemented ones so we don't care if
/// they overlap").
#[derive(Default)]
pub struct Bus {
    mappings: Vec<MmioMapping>,
}

impl Bus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map(&mut self, base: u64, size: u64, device: Box<dyn MmioDevice>) {
        self.mappings.push(MmioMapping { base, size, device });
    }

    fn find_mut(&mut self, addr: u64) -> Option<(u64, &mut Box<dyn MmioDevice>)> {
        self.mappings
            .iter_mut()
            .find(|m| addr >= m.base && addr < m.base + m.size)
            .map(|m| (m.base, &mut m.device))
    }

    pub fn read(&mut self, addr: u64, size: u8) -> u32 {
        match self.find_mut(addr) {
            Some((base, device)) => device.read(addr - base, size),
            None => 0,
        }
    }

    pub fn write(&mut self, addr: u64, value: u32, size: u8) {
        if let Some((base, device)) = self.find_mut(addr) {
            device.write(addr - base, value, size);
        }
    }

    pub fn reset_all(&mut self) {
        for mapping in &mut self.mappings {
            mapping.device.reset();
        }
    }
}
