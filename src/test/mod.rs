//! Simulated IEC bus for the unit tests.
//!
//! [`SimBus`] implements [`BusPort`] over a virtual microsecond clock.  The
//! open-collector medium is modelled as two drive sets - controller and
//! device - with a line reading low whenever either side pulls it.  Every
//! delay and poll advances virtual time one microsecond at a time, ticking
//! the scripted partner device so it reacts to line edges and deadlines
//! exactly as a real peripheral would, just deterministically.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html


use crate::bus::{BusPort, Lines};
use self::device::SimDevice;

/// A simulated bus with one attached device.
pub struct SimBus {
    /// Virtual clock, microseconds
    now: u64,
    /// Lines the controller is driving low
    ctl: Lines,
    /// Count of controller drive/release calls, to detect touched lines
    ops: usize,
    /// The scripted partner
    pub device: SimDevice,
}

impl SimBus {
    pub fn new(device: SimDevice) -> Self {
        Self::with_start(device, 0)
    }

    /// Start the virtual clock at an arbitrary point, e.g. just below the
    /// u32 wrap.
    pub fn with_start(device: SimDevice, start: u64) -> Self {
        Self {
            now: start,
            ctl: Lines::empty(),
            ops: 0,
            device,
        }
    }

    /// Lines the controller is currently driving low.
    pub fn controller_driven(&self) -> Lines {
        self.ctl
    }

    /// Number of drive/release calls the controller has made.
    pub fn line_ops(&self) -> usize {
        self.ops
    }

    /// Virtual clock reading.
    pub fn now(&self) -> u64 {
        self.now
    }

    fn levels(&self) -> Lines {
        self.ctl | self.device.driven()
    }

    /// Let the device observe the bus at the current instant (zero-time
    /// edge, after a controller drive/release).
    fn settle(&mut self) {
        let levels = self.levels();
        self.device.tick(self.now, levels);
    }

    /// Advance virtual time, ticking the device each microsecond.
    fn step(&mut self, us: u32) {
        for _ in 0..us {
            self.now += 1;
            let levels = self.levels();
            self.device.tick(self.now, levels);
        }
    }
}

impl BusPort for SimBus {
    fn drive(&mut self, lines: Lines) {
        self.ctl |= lines;
        self.ops += 1;
        self.settle();
    }

    fn release(&mut self, lines: Lines) {
        self.ctl -= lines;
        self.ops += 1;
        self.settle();
    }

    fn poll(&mut self) -> Lines {
        // Each poll costs a microsecond, so busy-poll loops make progress
        // against the virtual clock.
        self.step(1);
        self.levels()
    }

    fn delay_us(&mut self, us: u32) {
        self.step(us);
    }

    fn micros(&mut self) -> u32 {
        self.now as u32
    }
}
