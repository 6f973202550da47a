//! Poll protocol of the digital I/O controller.
//!
//! Each poll cycle sends one combined command, "set outputs, then report
//! inputs", and gets back a fixed two-byte answer:
//!
//! ```text
//! TX  [0xBA, out_lo, out_hi, 0xB9]
//! RX  [in_lo, in_hi]
//! ```
//!
//! Both 16-bit masks travel little-endian. There is no checksum, length
//! prefix or delimiter: any reply that is not exactly two bytes is a
//! protocol error.
//!
//! This module separates the concerns the same way for both directions:
//! - `encode`: mask → wire bytes (pure, no I/O)
//! - `decode`: wire bytes → mask (pure, no I/O)
//! - `session`: own the serial connection, drive timing and I/O

use std::time::Duration;

pub mod decode;
pub mod encode;
pub mod session;

pub use decode::{decode, decode_frame};
pub use encode::{encode, encode_response};
pub use session::PollSession;

/// Opcode asking the device to latch new output levels.
pub const CMD_WRITE_OUTPUT: u8 = 0xBA;

/// Opcode asking the device to report its input levels.
pub const CMD_READ_INPUT: u8 = 0xB9;

/// Outbound frame length: opcode, two mask bytes, opcode.
pub const FRAME_LEN: usize = 4;

/// Inbound response length: one 16-bit input mask.
pub const RESPONSE_LEN: usize = 2;

/// Bound on write completion and on the first response byte.
pub const TIME_LIMIT: Duration = Duration::from_millis(100);

/// Quiet period that ends the trailing-byte drain.
pub const DRAIN_WINDOW: Duration = Duration::from_millis(10);
