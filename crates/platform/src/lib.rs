//! Stand-in for the host framework's clock tree: a `Clock` either carries its
//! own frequency or is derived from another `Clock` by a multiply/divide
//! ratio, the same two shapes `qdev_init_clock_in`/`clock_set_source`/
//! `clock_set_mul_div` expose in the original source.

use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Ratio {
    mul: u64,
    div: u64,
}

impl Default for Ratio {
    fn default() -> Self {
        Ratio { mul: 1, div: 1 }
    }
}

struct Inner {
    hz: u64,
    source: Option<Clock>,
    ratio: Ratio,
}

/// A named clock input/output. Cheap to clone — clones share the same
/// underlying state, so wiring `a.set_source(&b)` is visible through every
/// handle to `a`.
#[derive(Clone)]
pub struct Clock {
    inner: Rc<RefCell<Inner>>,
}

impl Clock {
    /// A clock with no source and zero frequency, as produced by
    /// `qdev_init_clock_in(dev, name, NULL, NULL, 0)`.
    pub fn new() -> Self {
        Clock {
            inner: Rc::new(RefCell::new(Inner {
                hz: 0,
                source: None,
                ratio: Ratio::default(),
            })),
        }
    }

    /// Sets this clock's own frequency directly. Has no effect on the value
    /// returned by `get_hz` if a source is wired — the source always wins,
    /// matching `clock_set_hz` being overridden by `clock_set_source`.
    pub fn set_hz(&self, hz: u64) {
        self.inner.borrow_mut().hz = hz;
    }

    /// True once `set_source` has been called, i.e. this clock is an
    /// internal derivation rather than something the board must wire up.
    pub fn has_source(&self) -> bool {
        self.inner.borrow().source.is_some()
    }

    /// Wires this clock's frequency to track `source * mul / div`. Call
    /// `set_mul_div` first if the ratio is not 1:1.
    pub fn set_source(&self, source: &Clock) {
        self.inner.borrow_mut().source = Some(source.clone());
    }

    pub fn set_mul_div(&self, mul: u64, div: u64) {
        assert!(div > 0, "clock divisor must be non-zero");
        self.inner.borrow_mut().ratio = Ratio { mul, div };
    }

    /// The clock's current frequency in Hz: its own value if unsourced,
    /// otherwise the source's frequency scaled by the configured ratio.
    pub fn get_hz(&self) -> u64 {
        let inner = self.inner.borrow();
        match &inner.source {
            Some(source) => source.get_hz() * inner.ratio.mul / inner.ratio.div,
            None => inner.hz,
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsourced_clock_reports_its_own_frequency() {
        let clk = Clock::new();
        clk.set_hz(40_000_000);
        assert_eq!(clk.get_hz(), 40_000_000);
    }

    #[test]
    fn sourced_clock_tracks_and_scales_its_source() {
        let sysclk = Clock::new();
        sysclk.set_hz(160_000_000);

        let refclk = Clock::new();
        refclk.set_mul_div(1, 8);
        refclk.set_source(&sysclk);

        assert!(refclk.has_source());
        assert_eq!(refclk.get_hz(), 20_000_000);

        sysclk.set_hz(80_000_000);
        assert_eq!(refclk.get_hz(), 10_000_000);
    }
}
