//! This file implements the IEC bus line abstraction: the set of bus lines,
//! the hardware port capability the platform must inject, and the line
//! driver wrapper with its assert/release level semantics.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use bitflags::bitflags;

bitflags! {
    /// The five IEC bus signal lines.
    ///
    /// Each line is open-collector: a device drives it low (asserted) or
    /// floats it, in which case the external pull-up brings it high
    /// (released).
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Lines: u8 {
        /// Bidirectional data line, also carries handshake signalling
        const DATA  = 0x01;
        /// Clock line - its release edge is each bit's sample point
        const CLOCK = 0x02;
        /// Attention line, claimed by the controller for command phases
        const ATN   = 0x04;
        /// Out-of-band hard reset for all attached devices
        const RESET = 0x08;
        /// Service request line - only released at init/reset here
        const SRQ   = 0x10;
    }
}

/// The hardware capability the platform injects under the driver.
///
/// `drive` and `release` act on a whole line set at once.  `poll` returns a
/// single snapshot of the lines currently reading low, from which both level
/// queries are answered.  `delay_us` must busy-wait: the bus handshake
/// depends on sub-100us response windows, so implementations must not yield
/// to a scheduler.
pub trait BusPort {
    /// Drive the given lines low (output-low).
    fn drive(&mut self, lines: Lines);

    /// Stop driving the given lines; the external pull-up raises them.
    fn release(&mut self, lines: Lines);

    /// Snapshot of the lines currently reading low.
    fn poll(&mut self) -> Lines;

    /// Busy-wait for the given number of microseconds.
    fn delay_us(&mut self, us: u32);

    /// Monotonic microsecond clock.  Wraps at 2^32; elapsed times are
    /// computed with wrapping subtraction so the wrap is harmless.
    fn micros(&mut self) -> u32;
}

/// A free-running microsecond counter, used by [`crate::PinPort`] to source
/// its clock.  Platforms with a native flex-pin port implement
/// [`BusPort::micros`] directly instead.
pub trait Micros {
    /// Current counter value in microseconds.  Wraps at 2^32.
    fn micros(&mut self) -> u32;
}

/// The IEC bus line driver.
///
/// Wraps a [`BusPort`] with the logical assert/release vocabulary of the
/// bus.  Construction releases every line, as does [`IecBus::release_all`]
/// on teardown and error paths.
pub struct IecBus<P: BusPort> {
    port: P,
}

impl<P: BusPort> IecBus<P> {
    /// Create a new bus over the given port, releasing all lines.
    pub fn new(port: P) -> Self {
        let mut bus = Self { port };
        bus.release_all();
        bus
    }

    /// Drive the given lines low.
    pub fn assert(&mut self, lines: Lines) {
        self.port.drive(lines);
    }

    /// Release the given lines to the external pull-up.
    pub fn release(&mut self, lines: Lines) {
        self.port.release(lines);
    }

    /// Release every managed line.
    pub fn release_all(&mut self) {
        self.port.release(Lines::all());
    }

    /// True only if **all** of the queried lines read low.
    ///
    /// AND semantics: "has everyone pulled this down".  The complement of
    /// [`IecBus::is_released`] - the asymmetry between the two queries is
    /// what the bus handshake is built on.
    pub fn is_asserted(&mut self, lines: Lines) -> bool {
        self.port.poll().contains(lines)
    }

    /// True if **any** of the queried lines reads high.
    ///
    /// OR semantics: "has at least one gone high".
    pub fn is_released(&mut self, lines: Lines) -> bool {
        !self.port.poll().contains(lines)
    }

    /// Busy-wait for the given number of microseconds.
    pub fn delay_us(&mut self, us: u32) {
        self.port.delay_us(us);
    }

    /// Current microsecond clock reading.
    pub fn micros(&mut self) -> u32 {
        self.port.micros()
    }

    /// Access the underlying port.
    pub fn port(&self) -> &P {
        &self.port
    }

    /// Mutable access to the underlying port.
    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    /// Consume the bus, returning the port.
    pub fn into_port(self) -> P {
        self.port
    }
}
