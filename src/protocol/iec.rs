//! This file implements the Commodore IEC protocol driver: the byte
//! transmission and reception engines, the timing-bounded wait primitives
//! and the command/turnaround transaction logic.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

#[allow(unused_imports)]
use log::{debug, trace, warn};

use crate::bus::{BusPort, IecBus, Lines};
use crate::driver::{DriverError, Status};
use crate::protocol::{
    CMD_CLOSE, CMD_LISTEN, CMD_OPEN, CMD_SECONDARY, CMD_TALK, CMD_UNLISTEN, CMD_UNTALK, channel,
    primary, secondary,
};
use crate::time::{
    IEC_T_AT, IEC_T_BB, IEC_T_DA, IEC_T_DC, IEC_T_EI, IEC_T_F, IEC_T_FR, IEC_T_NE, IEC_T_R,
    IEC_T_RY, IEC_T_S, IEC_T_TK, IEC_T_V, IEC_T_YE, READ_BIT_START_TIMEOUT, READ_CLK_START_TIMEOUT,
    READ_CLK_TIMEOUT, READ_INTER_BYTE, RESET_HOLD, TURNAROUND_CLK_TIMEOUT,
};

/// Carriage return, the line terminator on device text channels.
const CR: u8 = 0x0D;

/// The IEC protocol driver - the bus controller.
///
/// The driver assumes it is the sole controller on the bus.  Every
/// top-level operation overwrites the status, so check [`IecDriver::status`]
/// (or the returned `Result`) before issuing the next call.
pub struct IecDriver<P: BusPort> {
    bus: IecBus<P>,
    status: Status,
}

impl<P: BusPort> IecDriver<P> {
    /// Create a new driver.  The bus was released when it was constructed;
    /// status starts as Ok.
    pub fn new(bus: IecBus<P>) -> Self {
        Self {
            bus,
            status: Status::Ok,
        }
    }

    /// The outcome of the most recent top-level operation.
    pub fn status(&self) -> Status {
        self.status
    }

    /// True if the most recent top-level operation completed normally.
    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }

    /// Access the bus line driver.
    pub fn bus(&self) -> &IecBus<P> {
        &self.bus
    }

    /// Mutable access to the bus line driver.
    pub fn bus_mut(&mut self) -> &mut IecBus<P> {
        &mut self.bus
    }

    /// Send a command byte under attention.
    pub fn command(&mut self, cmd: u8) -> Result<(), DriverError> {
        self.command_bytes(&[cmd])
    }

    /// Send a command byte sequence under attention.
    ///
    /// Claims the bus by asserting ATN and CLOCK, waits for any device to
    /// acknowledge by asserting DATA, then streams the bytes with the
    /// normal per-byte handshake.  If no device responds within the
    /// attention window, all lines are released and the call fails with
    /// [`DriverError::NoDevice`].
    pub fn command_bytes(&mut self, cmds: &[u8]) -> Result<(), DriverError> {
        self.status = Status::Ok;

        debug!("command: {cmds:02x?}");
        self.bus.release(Lines::DATA);
        self.bus.assert(Lines::ATN);
        self.bus.assert(Lines::CLOCK);

        // Wait for a device to respond to attention on the DATA line
        if self.wait_assert_timeout(Lines::DATA, IEC_T_AT).is_err() {
            debug!("command: no devices present on the bus");
            self.status = Status::NoDevice;
            self.bus.release_all();
            return Err(DriverError::NoDevice);
        }

        // A device is present - stream the command bytes to it.  On failure
        // the attention line still has to be released below, so the result
        // is picked up from the status afterwards.
        let _ = self.send(cmds, false);

        // End of the command phase
        self.bus.delay_us(IEC_T_R);
        self.bus.release(Lines::ATN);
        self.bus.delay_us(IEC_T_TK);

        self.check()
    }

    /// Command a device to TALK.
    ///
    /// On success the turnaround maneuver hands transmission control to the
    /// device; from then on the device drives the clock.
    pub fn talk(&mut self, pad: u8) -> Result<(), DriverError> {
        self.command(CMD_TALK | primary(pad))?;
        self.turnaround()
    }

    /// Command a device to TALK on a secondary address.
    ///
    /// Both command bytes go out in a single attention window; turnaround
    /// is performed only if both were accepted.
    pub fn talk_sa(&mut self, pad: u8, sad: u8) -> Result<(), DriverError> {
        self.command_bytes(&[CMD_TALK | primary(pad), CMD_SECONDARY | secondary(sad)])?;
        self.turnaround()
    }

    /// Command a device to LISTEN.  The controller remains the talker.
    pub fn listen(&mut self, pad: u8) -> Result<(), DriverError> {
        self.command(CMD_LISTEN | primary(pad))
    }

    /// Command a device to LISTEN on a secondary address.
    pub fn listen_sa(&mut self, pad: u8, sad: u8) -> Result<(), DriverError> {
        self.command_bytes(&[CMD_LISTEN | primary(pad), CMD_SECONDARY | secondary(sad)])
    }

    /// Command all devices to stop talking.
    ///
    /// All lines are released afterwards even if the command itself failed;
    /// the final status is still reported.
    pub fn untalk(&mut self) -> Result<(), DriverError> {
        let _ = self.command(CMD_UNTALK);
        self.bus.release_all();
        self.check()
    }

    /// Command all devices to stop listening.
    ///
    /// All lines are released afterwards even if the command itself failed.
    pub fn unlisten(&mut self) -> Result<(), DriverError> {
        let _ = self.command(CMD_UNLISTEN);
        self.bus.release_all();
        self.check()
    }

    /// Hard-reset all devices with a pulse on the RESET line.
    ///
    /// Out-of-band: does not touch the status.
    pub fn reset(&mut self) {
        debug!("bus reset");
        self.bus.release_all();
        self.bus.assert(Lines::RESET);
        self.bus.delay_us(RESET_HOLD);
        self.bus.release(Lines::RESET);
    }

    /// Open a channel on a device, sending the name/command string.
    ///
    /// Convenience composition: LISTEN + OPEN secondary, the name bytes
    /// with EOI, then UNLISTEN.
    pub fn open(&mut self, pad: u8, ch: u8, name: &str) -> Result<(), DriverError> {
        self.command_bytes(&[CMD_LISTEN | primary(pad), CMD_OPEN | channel(ch)])?;
        let sent = self.send_str(name, true);
        let done = self.unlisten();
        sent.and(done)
    }

    /// Close a channel on a device.
    pub fn close(&mut self, pad: u8, ch: u8) -> Result<(), DriverError> {
        self.command_bytes(&[CMD_LISTEN | primary(pad), CMD_CLOSE | channel(ch)])?;
        self.unlisten()
    }

    /// Send a byte to the current listening device.
    ///
    /// `eoi` marks this as the final byte of the message, signalled through
    /// the extended two-phase handshake rather than a dedicated line.
    ///
    /// On entering and exiting, CLOCK is held by the controller and DATA by
    /// the listener.
    pub fn send_byte(&mut self, data: u8, eoi: bool) -> Result<(), DriverError> {
        self.status = Status::Ok;

        // Talker ready to send
        self.bus.release(Lines::CLOCK);
        // Wait for the listener to release DATA - ready for data.  No
        // timeout: listener hold-off is unbounded in the protocol.
        self.wait_release(Lines::DATA);

        if eoi {
            // Hold off past the EOI threshold and let the listener
            // acknowledge: DATA asserted, then released again.  A listener
            // that never acknowledges leaves a Timeout recorded, but the
            // byte is still transmitted - only the frame handshake below
            // can declare a framing error.
            let _ = self.wait_assert_timeout(Lines::DATA, IEC_T_YE);
            let _ = self.wait_release_timeout(Lines::DATA, IEC_T_EI);
            self.bus.delay_us(IEC_T_RY);
        } else {
            self.bus.delay_us(IEC_T_NE);
        }

        // CLOCK and DATA are both released - ready for the bit stream
        self.send_bits(data);

        // Wait for the listener's data-accepted handshake
        if self.wait_assert_timeout(Lines::DATA, IEC_T_F).is_err() {
            warn!("send: frame not acknowledged");
            self.status = Status::FramingError;
        }
        self.bus.delay_us(IEC_T_BB);

        self.check()
    }

    /// Send a byte slice to the current listening device.
    ///
    /// With `eoi` set, only the final byte carries the EOI handshake.  The
    /// first failing byte aborts the remainder, leaving its status.  An
    /// empty slice is a no-op that succeeds without touching any line.
    pub fn send(&mut self, data: &[u8], eoi: bool) -> Result<(), DriverError> {
        self.status = Status::Ok;
        for (i, &byte) in data.iter().enumerate() {
            let last = eoi && i == data.len() - 1;
            if self.send_byte(byte, last).is_err() {
                break;
            }
            trace!("sent byte #{i}");
        }
        self.check()
    }

    /// Send a string to the current listening device.
    pub fn send_str(&mut self, s: &str, eoi: bool) -> Result<(), DriverError> {
        self.send(s.as_bytes(), eoi)
    }

    /// Receive bytes from the current talking device until EOI or the
    /// buffer is full.
    ///
    /// Returns the number of bytes stored.  On failure, the count received
    /// up to that point accompanies the error.
    pub fn get(&mut self, buf: &mut [u8]) -> Result<usize, (DriverError, usize)> {
        self.status = Status::Ok;
        let mut count = 0;
        while count < buf.len() {
            let (byte, eoi) = self.get_byte().map_err(|e| (e, count))?;
            buf[count] = byte;
            count += 1;
            if eoi {
                debug!("get: EOI at {count} bytes");
                break;
            }
        }
        Ok(count)
    }

    /// Receive text from the current talking device until carriage return,
    /// EOI or the vector is full.  Used for reading device status channels.
    pub fn get_line<const N: usize>(
        &mut self,
        out: &mut heapless::Vec<u8, N>,
    ) -> Result<usize, (DriverError, usize)> {
        self.status = Status::Ok;
        let mut count = 0;
        while !out.is_full() {
            let (byte, eoi) = self.get_byte().map_err(|e| (e, count))?;
            // Capacity was checked above
            let _ = out.push(byte);
            count += 1;
            if eoi || byte == CR {
                break;
            }
        }
        Ok(count)
    }
}

// Byte-level engines and wait primitives
impl<P: BusPort> IecDriver<P> {
    /// Send an 8-bit stream on the DATA line, no handshake, LSB first.
    ///
    /// CLOCK and DATA must be released on entry.  Each bit is prepared
    /// under an asserted clock and becomes valid on the clock release edge;
    /// timing alone enforces correctness, no per-bit acknowledgment.
    fn send_bits(&mut self, data: u8) {
        let mut data = data;
        for _ in 0..8 {
            // Bit being prepared - blocks premature sampling
            self.bus.assert(Lines::CLOCK);
            self.bus.delay_us(IEC_T_S / 2);
            if data & 1 != 0 {
                // bit=1 -> release DATA (high)
                self.bus.release(Lines::DATA);
            } else {
                // bit=0 -> assert DATA (low)
                self.bus.assert(Lines::DATA);
            }
            data >>= 1;
            self.bus.delay_us(IEC_T_S / 2);
            // Bit valid on this release edge
            self.bus.release(Lines::CLOCK);
            self.bus.delay_us(IEC_T_V);
        }
        // End of the byte
        self.bus.release(Lines::DATA);
        self.bus.assert(Lines::CLOCK);
    }

    /// Receive an 8-bit stream from the DATA line, no handshake, LSB first.
    ///
    /// Sampling happens on each clock release edge.  The waits are
    /// unbounded: within a byte the talker's clocking is guaranteed by the
    /// surrounding transaction's timing budget.
    fn get_bits(&mut self) -> u8 {
        let mut data = 0u8;
        for _ in 0..8 {
            data >>= 1;
            // Talker preparing the bit
            self.wait_assert(Lines::CLOCK);
            // Sample at clock release
            self.wait_release(Lines::CLOCK);
            if self.bus.is_released(Lines::DATA) {
                data |= 0x80;
            }
        }
        data
    }

    /// Receive one byte from the current talking device, detecting EOI
    /// signalling.  Returns the byte and whether it ended the message.
    ///
    /// Mirror of the send handshake from the listener's side: wait for the
    /// talker's ready-to-send, release DATA as ready-for-data, and treat a
    /// clock hold-off past the EOI threshold as end-of-message signalling
    /// to be acknowledged with a DATA pulse.  The byte is acknowledged by
    /// asserting DATA, which the listener keeps holding between bytes.
    fn get_byte(&mut self) -> Result<(u8, bool), DriverError> {
        // Talker signals ready-to-send by releasing the clock
        self.wait_release_timeout(Lines::CLOCK, READ_CLK_START_TIMEOUT)?;

        // Ready for data
        self.bus.release(Lines::DATA);

        // If the talker holds the clock released past the EOI threshold it
        // is signalling end-of-message, not timing out - acknowledge with a
        // DATA pulse and clear the recorded timeout.
        let mut eoi = false;
        if self.wait_assert_timeout(Lines::CLOCK, READ_CLK_TIMEOUT).is_err() {
            trace!("get: clock held off - EOI");
            eoi = true;
            self.status = Status::Ok;
            self.bus.assert(Lines::DATA);
            self.bus.delay_us(IEC_T_FR);
            self.bus.release(Lines::DATA);
            self.wait_assert_timeout(Lines::CLOCK, READ_BIT_START_TIMEOUT)?;
        }

        let byte = self.get_bits();

        // Byte accepted - the listener holds DATA until the next byte
        self.bus.assert(Lines::DATA);
        self.bus.delay_us(READ_INTER_BYTE);

        Ok((byte, eoi))
    }

    /// Turnaround maneuver, needed immediately after a TALK command:
    /// transfers the clock-source role to the addressed device.
    ///
    /// On entry the device holds DATA and the controller holds CLOCK.  The
    /// controller takes DATA, releases CLOCK, and the device must respond
    /// by asserting CLOCK within the turnaround window.
    fn turnaround(&mut self) -> Result<(), DriverError> {
        self.bus.delay_us(IEC_T_TK);
        self.bus.assert(Lines::DATA);
        self.bus.release(Lines::CLOCK);
        self.bus.delay_us(IEC_T_DC);
        // The device takes over as clock source
        self.wait_assert_timeout(Lines::CLOCK, TURNAROUND_CLK_TIMEOUT)?;
        self.bus.delay_us(IEC_T_DA);
        trace!("turnaround complete");
        Ok(())
    }

    /// Busy-poll until all of `lines` are asserted, or the deadline passes.
    ///
    /// Elapsed time uses wrapping subtraction, so the microsecond clock
    /// wrapping at 2^32 mid-wait is harmless.  On expiry, records
    /// Status::Timeout.
    fn wait_assert_timeout(&mut self, lines: Lines, timeout_us: u32) -> Result<(), DriverError> {
        let start = self.bus.micros();
        while self.bus.is_released(lines) {
            if self.bus.micros().wrapping_sub(start) > timeout_us {
                self.status = Status::Timeout;
                return Err(DriverError::Timeout);
            }
        }
        Ok(())
    }

    /// Busy-poll until any of `lines` is released, or the deadline passes.
    fn wait_release_timeout(&mut self, lines: Lines, timeout_us: u32) -> Result<(), DriverError> {
        let start = self.bus.micros();
        while self.bus.is_asserted(lines) {
            if self.bus.micros().wrapping_sub(start) > timeout_us {
                self.status = Status::Timeout;
                return Err(DriverError::Timeout);
            }
        }
        Ok(())
    }

    /// Busy-poll until all of `lines` are asserted.  No timeout.
    fn wait_assert(&mut self, lines: Lines) {
        while self.bus.is_released(lines) {}
    }

    /// Busy-poll until any of `lines` is released.  No timeout.
    fn wait_release(&mut self, lines: Lines) {
        while self.bus.is_asserted(lines) {}
    }

    /// The current status as a result.
    fn check(&self) -> Result<(), DriverError> {
        match self.status.err() {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }
}

impl<P: BusPort> Drop for IecDriver<P> {
    /// Leave the bus lines released on teardown.
    fn drop(&mut self) {
        self.bus.release_all();
    }
}
