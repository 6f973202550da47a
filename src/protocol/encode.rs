//! Pure encoding: masks → wire bytes.
//!
//! No I/O, no side effects. `encode` builds what the panel sends;
//! `encode_response` builds what the device answers and is used by the
//! simulated device.

use crate::domain::{InputMask, OutputMask};

use super::{CMD_READ_INPUT, CMD_WRITE_OUTPUT, FRAME_LEN, RESPONSE_LEN};

/// Encode an output mask into the combined write-output / read-input frame.
pub fn encode(output: OutputMask) -> [u8; FRAME_LEN] {
    let [lo, hi] = output.to_le_bytes();
    [CMD_WRITE_OUTPUT, lo, hi, CMD_READ_INPUT]
}

/// Encode an input mask the way the device puts it on the wire.
pub fn encode_response(input: InputMask) -> [u8; RESPONSE_LEN] {
    input.to_le_bytes()
}
