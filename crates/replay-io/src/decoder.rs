//! Binary frame decoding
//!
//! A frame file is a dense array of little-endian `f32` values, three per
//! vertex. Length is not enforced: frames from other mesh versions still play.

use replay_core::{MeshFrame, EXPECTED_FLOATS};
use std::fmt;
use tracing::{debug, warn};

const F32_SIZE: usize = std::mem::size_of::<f32>();

/// Decoded float count differs from the SMPL layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexCountMismatch {
    /// Floats the SMPL layout expects
    pub expected: usize,
    /// Floats actually decoded
    pub actual: usize,
}

impl fmt::Display for VertexCountMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unexpected vertex count: {} floats (expected {})",
            self.actual, self.expected
        )
    }
}

/// Decode a frame, logging a warning on a length mismatch
pub fn decode(bytes: &[u8]) -> MeshFrame {
    let (frame, mismatch) = decode_checked(bytes);
    if let Some(mismatch) = mismatch {
        warn!("{}", mismatch);
    }
    frame
}

/// Decode a frame and report a length mismatch to the caller instead of logging it
///
/// Trailing bytes that do not form a whole `f32` are dropped.
pub fn decode_checked(bytes: &[u8]) -> (MeshFrame, Option<VertexCountMismatch>) {
    let chunks = bytes.chunks_exact(F32_SIZE);
    let remainder = chunks.remainder().len();
    if remainder != 0 {
        debug!("Dropping {} trailing bytes of a frame buffer", remainder);
    }

    let data: Vec<f32> = chunks
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();

    let mismatch = (data.len() != EXPECTED_FLOATS).then_some(VertexCountMismatch {
        expected: EXPECTED_FLOATS,
        actual: data.len(),
    });

    (MeshFrame::new(data), mismatch)
}
