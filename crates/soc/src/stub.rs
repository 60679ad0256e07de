//! The two kinds of placeholder MMIO device the SoC maps: the mode-entry
//! bring-up stub (`mc_me_read`/`mc_me_write` in the original source) and the
//! generic unimplemented-peripheral stub `create_unimplemented_devices()`
//! installs over every address window this workspace doesn't model.

use devices::{guest_error, MmioDevice};

use crate::memmap;

/// Answers firmware's "has the mode controller finished transitioning"
/// poll with a fixed magic value; every other offset reads as zero and
/// writes are dropped. Nothing else about mode entry is modeled.
pub struct ModeEntryStub;

impl MmioDevice for ModeEntryStub {
    fn read(&mut self, offset: u64, _size: u8) -> u32 {
        match offset {
            0x310 => 0x0100_0000,
            _ => 0,
        }
    }

    fn write(&mut self, _offset: u64, _value: u32, _size: u8) {}

    fn reset(&mut self) {}
}

/// A named placeholder for a peripheral address window with no device
/// model: reads log a guest error and return 0, writes log and are dropped.
/// One generic type stands in for the ~190 `create_unimplemented_device`
/// calls in the original source, parameterized by name at construction.
pub struct UnimplementedDevice {
    name: &'static str,
}

impl UnimplementedDevice {
    pub fn new(name: &'static str) -> Self {
        UnimplementedDevice { name }
    }
}

impl MmioDevice for UnimplementedDevice {
    fn read(&mut self, offset: u64, _size: u8) -> u32 {
        guest_error!(name = self.name, offset, "read from unimplemented peripheral");
        0
    }

    fn write(&mut self, offset: u64, value: u32, _size: u8) {
        guest_error!(name = self.name, offset, value, "write to unimplemented peripheral");
    }

    fn reset(&mut self) {}
}

pub struct UnimplementedRegion {
    pub name: &'static str,
    pub base: u64,
    pub size: u64,
}

/// Every `create_unimplemented_device` call from
/// `hw/arm/nxps32k358_soc.c`'s `create_unimplemented_devices()`, carried
/// over verbatim (duplicate names and all — the original registers a
/// handful of names twice at different bases). Registered by
/// [`crate::Soc::realize`] after every implemented device, so overlaps with
/// `mc_me`, the LPUART bases, and the eDMA windows are harmless: those
/// addresses are already claimed by real devices by the time these stubs
/// are mapped.
pub static UNIMPLEMENTED_REGIONS: &[UnimplementedRegion] = {
    const fn r(name: &'static str, base: u64, size: u64) -> UnimplementedRegion {
        UnimplementedRegion { name, base, size }
    }
    &[
        r("hse_xbic", 0x4000_8000, 0x4000),
        r("erm1", 0x4000_c000, 0x4000),
        r("pfc1", 0x4006_8000, 0x4000),
        r("pfc1_alt", 0x4006_c000, 0x4000),
        r("swt_3", 0x4007_0000, 0x4000),
        r("trgmux", 0x4008_0000, 0x4000),
        r("bctu", 0x4008_4000, 0x4000),
        r("emios0", 0x4008_8000, 0x4000),
        r("emios1", 0x4008_c000, 0x4000),
        r("emios2", 0x4009_0000, 0x4000),
        r("lcu0", 0x4009_8000, 0x4000),
        r("lcu1", 0x4009_c000, 0x4000),
        r("adc_0", 0x400a_0000, 0x4000),
        r("adc_1", 0x400a_4000, 0x4000),
        r("adc_2", 0x400a_8000, 0x4000),
        r("pit0", 0x400b_0000, 0x4000),
        r("pit1", 0x400b_4000, 0x4000),
        r("mu_2", 0x400b_8000, 0x4000),
        r("mu_2", 0x400b_c000, 0x4000),
        r("mu_3", 0x400c_4000, 0x4000),
        r("mu_3", 0x400c_8000, 0x4000),
        r("mu_4", 0x400c_c000, 0x4000),
        r("mu_4", 0x400d_0000, 0x4000),
        r("axbs", 0x4020_0000, 0x4000),
        r("system_xbic", 0x4020_4000, 0x4000),
        r("periph_xbic", 0x4020_8000, 0x4000),
        r("edma", 0x4020_c000, 0x4000),
        r("edma_tcd_0", 0x4021_0000, 0x4000),
        r("edma_tcd_1", 0x4021_4000, 0x4000),
        r("edma_tcd_2", 0x4021_8000, 0x4000),
        r("edma_tcd_3", 0x4021_c000, 0x4000),
        r("edma_tcd_4", 0x4022_0000, 0x4000),
        r("edma_tcd_5", 0x4022_4000, 0x4000),
        r("edma_tcd_6", 0x4022_8000, 0x4000),
        r("edma_tcd_7", 0x4022_c000, 0x4000),
        r("edma_tcd_8", 0x4023_0000, 0x4000),
        r("edma_tcd_9", 0x4023_4000, 0x4000),
        r("edma_tcd_10", 0x4023_8000, 0x4000),
        r("edma_tcd_11", 0x4023_c000, 0x4000),
        r("debug_apb_page0", 0x4024_0000, 0x4000),
        r("debug_apb_page1", 0x4024_4000, 0x4000),
        r("debug_apb_page2", 0x4024_8000, 0x4000),
        r("debug_apb_page3", 0x4024_c000, 0x4000),
        r("debug_apb_paged_area", 0x4025_0000, 0x4000),
        r("sda-ap", 0x4025_4000, 0x4000),
        r("eim0", 0x4025_8000, 0x4000),
        r("erm0", 0x4025_c000, 0x4000),
        r("mscm", 0x4026_0000, 0x4000),
        r("pram_0", 0x4026_4000, 0x4000),
        r("pfc", 0x4026_8000, 0x4000),
        r("pfc_alt", 0x4026_c000, 0x4000),
        r("swt_0", 0x4027_0000, 0x4000),
        r("stm_0", 0x4027_4000, 0x4000),
        r("xrdc", 0x4027_8000, 0x4000),
        r("intm", 0x4027_c000, 0x4000),
        r("dmamux_0", 0x4028_0000, 0x4000),
        r("dmamux_1", 0x4028_4000, 0x4000),
        r("rtc", 0x4028_8000, 0x4000),
        r("mc_rgm", 0x4028_c000, 0x4000),
        r("siul_virtwrapper_pdac0_hse", 0x4029_0000, 0x4000),
        r("siul_virtwrapper_pdac0_hse", 0x4029_4000, 0x4000),
        r("siul_virtwrapper_pdac1_m7_0", 0x4029_8000, 0x4000),
        r("siul_virtwrapper_pdac1_m7_0", 0x4029_c000, 0x4000),
        r("siul_virtwrapper_pdac2_m7_1", 0x402a_0000, 0x4000),
        r("siul_virtwrapper_pdac2_m7_1", 0x402a_4000, 0x4000),
        r("siul_virtwrapper_pdac3", 0x402a_8000, 0x4000),
        r("dcm", 0x402a_c000, 0x4000),
        r("wkpu", 0x402b_4000, 0x4000),
        r("cmu", 0x402b_c000, 0x4000),
        r("tspc", 0x402c_4000, 0x4000),
        r("sirc", 0x402c_8000, 0x4000),
        r("sxosc", 0x402c_c000, 0x4000),
        r("firc", 0x402d_0000, 0x4000),
        r("fxosc", 0x402d_4000, 0x4000),
        r("mc_cgm", 0x402d_8000, 0x4000),
        r("mc_me", 0x402d_c000, 0x4000),
        r("pll", 0x402e_0000, 0x4000),
        r("pll2", 0x402e_4000, 0x4000),
        r("pmc", 0x402e_8000, 0x4000),
        r("fmu", 0x402e_c000, 0x4000),
        r("fmu_alt", 0x402f_0000, 0x4000),
        r("siul_virtwrapper_pdac4_m7_2", 0x402f_4000, 0x4000),
        r("siul_virtwrapper_pdac4_m7_2", 0x402f_8000, 0x4000),
        r("pit2", 0x402f_c000, 0x4000),
        r("pit3", 0x4030_0000, 0x4000),
        r("flexcan_0", 0x4030_4000, 0x4000),
        r("flexcan_1", 0x4030_8000, 0x4000),
        r("flexcan_2", 0x4030_c000, 0x4000),
        r("flexcan_3", 0x4031_0000, 0x4000),
        r("flexcan_4", 0x4031_4000, 0x4000),
        r("flexcan_5", 0x4031_8000, 0x4000),
        r("flexcan_6", 0x4031_c000, 0x4000),
        r("flexcan_7", 0x4032_0000, 0x4000),
        r("flexio", 0x4032_4000, 0x4000),
        r("lpuart_0", 0x4032_8000, 0x4000),
        r("lpuart_1", 0x4032_c000, 0x4000),
        r("lpuart_2", 0x4033_0000, 0x4000),
        r("lpuart_3", 0x4033_4000, 0x4000),
        r("lpuart_4", 0x4033_8000, 0x4000),
        r("lpuart_5", 0x4033_c000, 0x4000),
        r("lpuart_6", 0x4034_0000, 0x4000),
        r("lpuart_7", 0x4034_4000, 0x4000),
        r("siul_virtwrapper_pdac5_m7_3", 0x4034_8000, 0x4000),
        r("siul_virtwrapper_pdac5_m7_3", 0x4034_c000, 0x4000),
        r("lpi2c_0", 0x4035_0000, 0x4000),
        r("lpi2c_1", 0x4035_4000, 0x4000),
        r("lpspi_0", 0x4035_8000, 0x4000),
        r("lpspi_1", 0x4035_c000, 0x4000),
        r("lpspi_2", 0x4036_0000, 0x4000),
        r("lpspi_3", 0x4036_4000, 0x4000),
        r("sai0", 0x4036_c000, 0x4000),
        r("lpcmp_0", 0x4037_0000, 0x4000),
        r("lpcmp_1", 0x4037_4000, 0x4000),
        r("tmu", 0x4037_c000, 0x4000),
        r("crc", 0x4038_0000, 0x4000),
        r("fccu_", 0x4038_4000, 0x4000),
        r("mu_0", 0x4038_c000, 0x4000),
        r("mu_1", 0x4039_0000, 0x4000),
        r("jdc", 0x4039_4000, 0x4000),
        r("configuration_gpr", 0x4039_c000, 0x4000),
        r("stcu", 0x403a_0000, 0x4000),
        r("selftest_gpr", 0x403b_0000, 0x4000),
        r("aes_accel", 0x403c_0000, 0x1_0000),
        r("aes_app0", 0x403d_0000, 0x1_0000),
        r("aes_app1", 0x403e_0000, 0x1_0000),
        r("aes_app2", 0x403f_0000, 0x1_0000),
        r("tcm_xbic", 0x4040_0000, 0x4000),
        r("edma_xbic", 0x4040_4000, 0x4000),
        r("pram2_tcm_xbic", 0x4040_8000, 0x4000),
        r("aes_mux_xbic", 0x4040_c000, 0x4000),
        r("edma_tcd_12", 0x4041_0000, 0x4000),
        r("edma_tcd_13", 0x4041_4000, 0x4000),
        r("edma_tcd_14", 0x4041_8000, 0x4000),
        r("edma_tcd_15", 0x4041_c000, 0x4000),
        r("edma_tcd_16", 0x4042_0000, 0x4000),
        r("edma_tcd_17", 0x4042_4000, 0x4000),
        r("edma_tcd_18", 0x4042_8000, 0x4000),
        r("edma_tcd_19", 0x4042_c000, 0x4000),
        r("edma_tcd_20", 0x4043_0000, 0x4000),
        r("edma_tcd_21", 0x4043_4000, 0x4000),
        r("edma_tcd_22", 0x4043_8000, 0x4000),
        r("edma_tcd_23", 0x4043_c000, 0x4000),
        r("edma_tcd_24", 0x4044_0000, 0x4000),
        r("edma_tcd_25", 0x4044_4000, 0x4000),
        r("edma_tcd_26", 0x4044_8000, 0x4000),
        r("edma_tcd_27", 0x4044_c000, 0x4000),
        r("edma_tcd_28", 0x4045_0000, 0x4000),
        r("edma_tcd_29", 0x4045_4000, 0x4000),
        r("edma_tcd_30", 0x4045_8000, 0x4000),
        r("edma_tcd_31", 0x4045_c000, 0x4000),
        r("sema42", 0x4046_0000, 0x4000),
        r("pram_1", 0x4046_4000, 0x4000),
        r("pram_2", 0x4046_8000, 0x4000),
        r("swt_1", 0x4046_c000, 0x4000),
        r("swt_2", 0x4047_0000, 0x4000),
        r("stm_1", 0x4047_4000, 0x4000),
        r("stm_2", 0x4047_8000, 0x4000),
        r("stm_3", 0x4047_c000, 0x4000),
        r("emac", 0x4048_0000, 0x4000),
        r("gmac0", 0x4048_4000, 0x4000),
        r("gmac1", 0x4048_8000, 0x4000),
        r("lpuart_8", 0x4048_c000, 0x4000),
        r("lpuart_9", 0x4049_0000, 0x4000),
        r("lpuart_10", 0x4049_4000, 0x4000),
        r("lpuart_11", 0x4049_8000, 0x4000),
        r("lpuart_12", 0x4049_c000, 0x4000),
        r("lpuart_13", 0x404a_0000, 0x4000),
        r("lpuart_14", 0x404a_4000, 0x4000),
        r("lpuart_15", 0x404a_8000, 0x4000),
        r("lpspi_4", 0x404b_c000, 0x4000),
        r("lpspi_5", 0x404c_0000, 0x4000),
        r("quadspi", 0x404c_c000, 0x4000),
        r("sai1", 0x404d_c000, 0x4000),
        r("usdhc", 0x404e_4000, 0x4000),
        r("lpcmp_2", 0x404e_8000, 0x4000),
        r("mu_1", 0x404e_c000, 0x4000),
        r("eim0", 0x4050_c000, 0x4000),
        r("eim1", 0x4051_0000, 0x4000),
        r("eim2", 0x4051_4000, 0x4000),
        r("eim3", 0x4051_8000, 0x4000),
        r("aes_app3", 0x4052_0000, 0x1_0000),
        r("aes_app4", 0x4053_0000, 0x1_0000),
        r("aes_app5", 0x4054_0000, 0x1_0000),
        r("aes_app6", 0x4055_0000, 0x1_0000),
        r("aes_app7", 0x4056_0000, 0x1_0000),
        r("flexcan_8", 0x4057_0000, 0x4000),
        r("flexcan_9", 0x4057_4000, 0x4000),
        r("flexcan_10", 0x4057_8000, 0x4000),
        r("flexcan_11", 0x4057_c000, 0x4000),
        r("fmu1", 0x4058_0000, 0x4000),
        r("fmu1_alt", 0x4058_4000, 0x4000),
        r("pram_3", 0x4058_8000, 0x4000),
    ]
};
