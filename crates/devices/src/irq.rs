//! The capability a device model holds to signal its platform, never a
//! back-pointer to anything that owns the device.

/// A level-triggered interrupt line. `set_level(true)` asserts, `set_level(false)`
/// deasserts; devices call this every time their internal pending state changes,
/// even if the level does not actually change, mirroring `qemu_set_irq`.
pub trait IrqLine {
    fn set_level(&mut self, asserted: bool);
}

/// An `IrqLine` that does nothing, for devices under test that don't care about
/// interrupt delivery.
#[derive(Default)]
pub struct NullIrqLine;

impl IrqLine for NullIrqLine {
    fn set_level(&mut self, _asserted: bool) {}
}

/// Records every level transition, for tests that want to assert on the exact
/// sequence of asserts/deasserts rather than just the final level.
#[derive(Default)]
pub struct RecordingIrqLine {
    pub level: bool,
    pub history: Vec<bool>,
}

impl IrqLine for RecordingIrqLine {
    fn set_level(&mut self, asserted: bool) {
        self.level = asserted;
        self.history.push(asserted);
    }
}
