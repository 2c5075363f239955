//! IEC protocol timers.
//!
//! All values are in microseconds and come from the bus's published
//! electrical timing tables ("IEC disected", J. Derogee, 2008).  They are
//! the driver's entire configuration surface: named here so each interval
//! stays independently tunable and testable, never inlined as magic numbers
//! in the protocol engine.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use static_assertions::const_assert;

/// Max ATN response time.  If exceeded, no device is present.
pub const IEC_T_AT: u32 = 1000;

/// Typical non-EOI response to ready-for-data (max 200)
pub const IEC_T_NE: u32 = 40;

/// Talker bit setup time, split evenly around the data edge (min 20)
pub const IEC_T_S: u32 = 70;

/// Min data valid time after the clock release edge
pub const IEC_T_V: u32 = 20;

/// Max frame handshake time (20 typical).  If exceeded, frame error.
pub const IEC_T_F: u32 = 1000;

/// Min frame to release of ATN time
pub const IEC_T_R: u32 = 20;

/// Min time between bytes
pub const IEC_T_BB: u32 = 100;

/// EOI response time (min 200, 250 typical)
pub const IEC_T_YE: u32 = 250;

/// EOI response hold time (min 60, 80 for external listeners)
pub const IEC_T_EI: u32 = 500;

/// Talker response limit after the EOI dance (0 to 60, 30 typical)
pub const IEC_T_RY: u32 = 30;

/// Talk-attention release time (20 to 100, 30 typical)
pub const IEC_T_TK: u32 = 30;

/// Talk-attention acknowledge time
pub const IEC_T_DC: u32 = 30;

/// Min talk-attention acknowledge hold time (min 80)
pub const IEC_T_DA: u32 = 100;

/// EOI acknowledge hold when receiving - how long the listener pulls DATA
/// to show it spotted the talker's EOI hold-off (min 60)
pub const IEC_T_FR: u32 = 70;

/// How long the turnaround maneuver waits for the addressed talker to take
/// over the clock line
pub const TURNAROUND_CLK_TIMEOUT: u32 = 1000;

/// How long to wait for the talker to signal ready-to-send (clock release)
/// at the start of each received byte.  Generous: a drive may be seeking.
pub const READ_CLK_START_TIMEOUT: u32 = 1_000_000;

/// How long after ready-for-data the talker has to pull the clock before
/// the hold-off is taken as EOI signalling
pub const READ_CLK_TIMEOUT: u32 = 400;

/// How long to wait for the bit stream to start after acknowledging EOI
pub const READ_BIT_START_TIMEOUT: u32 = 2000;

/// Pause after acknowledging a received byte, before the next one
pub const READ_INTER_BYTE: u32 = 50;

/// How long the RESET line is held asserted by a bus reset
pub const RESET_HOLD: u32 = 1000;

// The bit setup interval is spent half before and half after driving the
// data line, so it must split evenly.
const_assert!(IEC_T_S % 2 == 0);

// A talker holding the clock released for 200us past ready-for-data is
// signalling EOI; the detection window must sit above that and inside the
// listener's own EOI response budget.
const_assert!(READ_CLK_TIMEOUT > 200);
const_assert!(IEC_T_YE >= 200);
