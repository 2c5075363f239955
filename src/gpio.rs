//! Generic GPIO binding for the bus port.
//!
//! For hardware that drives each IEC line through a separate input pin and
//! an inverting open-collector driver on an output pin (the usual
//! transceiver arrangement, since plain MCU pins cannot float and read at
//! the same time).  [`PinPort`] implements [`BusPort`] over any
//! `embedded-hal` 1.0 pins plus a delay and a microsecond counter.
//! Platforms with native flex pins implement [`BusPort`] directly instead.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::bus::{BusPort, Lines, Micros};

/// A single bus line: an input pin reading the bus level and an output pin
/// feeding an inverting driver, so output-high pulls the bus low.
pub struct PortLine<I, O> {
    input: I,
    output: O,
}

impl<I: InputPin, O: OutputPin> PortLine<I, O> {
    /// Create a line, initially released (output low through the inverting
    /// driver, so the bus line floats high).
    pub fn new(input: I, output: O) -> Self {
        let mut line = Self { input, output };
        line.release();
        line
    }

    /// Pull the bus line low.
    fn drive(&mut self) {
        // Inverted driver, so high output pulls the line low.  Pin errors
        // are not recoverable mid-handshake; they surface as levels that
        // never change and trip the protocol timeouts.
        let _ = self.output.set_high();
    }

    /// Let the bus line float high.
    fn release(&mut self) {
        let _ = self.output.set_low();
    }

    /// Read the bus level; a read error counts as released.
    fn is_low(&mut self) -> bool {
        self.input.is_low().unwrap_or(false)
    }
}

// Array index order for the five lines.
const LINE_ORDER: [Lines; 5] = [
    Lines::DATA,
    Lines::CLOCK,
    Lines::ATN,
    Lines::RESET,
    Lines::SRQ,
];

/// A [`BusPort`] over five [`PortLine`]s, a busy-delay and a microsecond
/// counter.
pub struct PinPort<I, O, D, M> {
    lines: [PortLine<I, O>; 5],
    delay: D,
    time: M,
}

impl<I, O, D, M> PinPort<I, O, D, M>
where
    I: InputPin,
    O: OutputPin,
    D: DelayNs,
    M: Micros,
{
    /// Create a port from its five lines, delay and clock.
    pub fn new(
        data: PortLine<I, O>,
        clock: PortLine<I, O>,
        atn: PortLine<I, O>,
        reset: PortLine<I, O>,
        srq: PortLine<I, O>,
        delay: D,
        time: M,
    ) -> Self {
        Self {
            lines: [data, clock, atn, reset, srq],
            delay,
            time,
        }
    }
}

impl<I, O, D, M> BusPort for PinPort<I, O, D, M>
where
    I: InputPin,
    O: OutputPin,
    D: DelayNs,
    M: Micros,
{
    fn drive(&mut self, lines: Lines) {
        for (line, mask) in self.lines.iter_mut().zip(LINE_ORDER) {
            if lines.contains(mask) {
                line.drive();
            }
        }
    }

    fn release(&mut self, lines: Lines) {
        for (line, mask) in self.lines.iter_mut().zip(LINE_ORDER) {
            if lines.contains(mask) {
                line.release();
            }
        }
    }

    fn poll(&mut self) -> Lines {
        let mut low = Lines::empty();
        for (line, mask) in self.lines.iter_mut().zip(LINE_ORDER) {
            if line.is_low() {
                low |= mask;
            }
        }
        low
    }

    fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }

    fn micros(&mut self) -> u32 {
        self.time.micros()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use std::cell::Cell;
    use std::rc::Rc;

    /// A shared bus wire; true means pulled low.
    #[derive(Clone)]
    struct Wire(Rc<Cell<bool>>);

    struct In(Wire);
    struct Out(Wire);

    impl embedded_hal::digital::ErrorType for In {
        type Error = Infallible;
    }

    impl InputPin for In {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            Ok(!self.0.0.get())
        }

        fn is_low(&mut self) -> Result<bool, Infallible> {
            Ok(self.0.0.get())
        }
    }

    impl embedded_hal::digital::ErrorType for Out {
        type Error = Infallible;
    }

    impl OutputPin for Out {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.0.0.set(false);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.0.0.set(true);
            Ok(())
        }
    }

    struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    struct Counter(u32);

    impl Micros for Counter {
        fn micros(&mut self) -> u32 {
            self.0 = self.0.wrapping_add(1);
            self.0
        }
    }

    fn port() -> (PinPort<In, Out, NoDelay, Counter>, [Wire; 5]) {
        let wires: [Wire; 5] = core::array::from_fn(|_| Wire(Rc::new(Cell::new(true))));
        let [d, c, a, r, s] = wires.clone();
        let line = |w: Wire| PortLine::new(In(w.clone()), Out(w));
        let port = PinPort::new(
            line(d),
            line(c),
            line(a),
            line(r),
            line(s),
            NoDelay,
            Counter(0),
        );
        (port, wires)
    }

    #[test]
    fn lines_start_released() {
        // Wires start pulled low above; constructing the lines releases them
        let (mut port, _wires) = port();
        assert_eq!(port.poll(), Lines::empty());
    }

    #[test]
    fn drive_and_release_map_to_the_right_pins() {
        let (mut port, wires) = port();
        port.drive(Lines::CLOCK | Lines::ATN);
        assert!(!wires[0].0.get());
        assert!(wires[1].0.get());
        assert!(wires[2].0.get());
        assert_eq!(port.poll(), Lines::CLOCK | Lines::ATN);

        port.release(Lines::CLOCK);
        assert_eq!(port.poll(), Lines::ATN);
    }

    #[test]
    fn micros_comes_from_the_injected_clock() {
        let (mut port, _wires) = port();
        let first = port.micros();
        assert!(port.micros() > first);
    }
}
