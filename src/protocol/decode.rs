//! Pure decoding: wire bytes → masks.
//!
//! No I/O, no side effects.

use crate::domain::{InputMask, OutputMask, PanelError, PanelResult};

use super::{CMD_READ_INPUT, CMD_WRITE_OUTPUT, FRAME_LEN, RESPONSE_LEN};

/// Decode the accumulated device reply into an input mask.
///
/// Returns `SizeMismatch` carrying the observed length unless the reply is
/// exactly two bytes.
pub fn decode(response: &[u8]) -> PanelResult<InputMask> {
    let bytes: [u8; RESPONSE_LEN] = response
        .try_into()
        .map_err(|_| PanelError::SizeMismatch {
            len: response.len(),
        })?;
    Ok(InputMask::from_le_bytes(bytes))
}

/// Device side: pull the output mask out of a received frame.
///
/// `None` if the frame has the wrong length or the wrong opcodes.
pub fn decode_frame(frame: &[u8]) -> Option<OutputMask> {
    match *frame {
        [CMD_WRITE_OUTPUT, lo, hi, CMD_READ_INPUT] => Some(OutputMask::from_le_bytes([lo, hi])),
        _ => {
            log::trace!("decode_frame: rejected {frame:02X?} ({} of {FRAME_LEN} bytes)", frame.len());
            None
        }
    }
}
