//! This module implements the Commodore IEC serial bus protocol: the wire
//! command encoding here, and the transaction engine in [`iec`].
//!
//! Bus commands:
//!   0x20 + pad  = LISTEN
//!   0x3F        = UNLISTEN
//!   0x40 + pad  = TALK
//!   0x5F        = UNTALK
//!   0x60 + sad  = SECONDARY
//!   0xE0 + ch   = CLOSE
//!   0xF0 + ch   = OPEN
//! where pad is a primary address (0-30), sad a secondary address (0-31)
//! and ch a channel (0-15).

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

pub mod iec;

/// LISTEN command base - OR in the primary address
pub const CMD_LISTEN: u8 = 0x20;
/// UNLISTEN command - all devices stop listening
pub const CMD_UNLISTEN: u8 = 0x3F;
/// TALK command base - OR in the primary address
pub const CMD_TALK: u8 = 0x40;
/// UNTALK command - all devices stop talking
pub const CMD_UNTALK: u8 = 0x5F;
/// SECONDARY address command base - OR in the secondary address
pub const CMD_SECONDARY: u8 = 0x60;
/// CLOSE channel command base - OR in the channel
pub const CMD_CLOSE: u8 = 0xE0;
/// OPEN channel command base - OR in the channel
pub const CMD_OPEN: u8 = 0xF0;

/// Highest valid primary address - 31 is taken by UNLISTEN/UNTALK
pub const MAX_PRIMARY_ADDRESS: u8 = 30;
/// Highest valid secondary address
pub const MAX_SECONDARY_ADDRESS: u8 = 31;
/// Highest valid channel for OPEN/CLOSE
pub const MAX_CHANNEL: u8 = 15;

/// Mask a primary address to its wire field width.
pub(crate) fn primary(pad: u8) -> u8 {
    debug_assert!(pad <= MAX_PRIMARY_ADDRESS, "primary address out of range");
    pad & 0x1F
}

/// Mask a secondary address to its wire field width.
pub(crate) fn secondary(sad: u8) -> u8 {
    debug_assert!(sad <= MAX_SECONDARY_ADDRESS, "secondary address out of range");
    sad & 0x1F
}

/// Mask a channel to its wire field width.
pub(crate) fn channel(ch: u8) -> u8 {
    debug_assert!(ch <= MAX_CHANNEL, "channel out of range");
    ch & 0x0F
}
