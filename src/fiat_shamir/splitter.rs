//! Out-of-circuit transcript splitting.
//!
//! Walks the IO pattern over the raw transcript bytes. Absorbed bytes are
//! concatenated into the truncated buffer that becomes the circuit's public
//! input; hint payloads (u32 little-endian length prefix, then the payload)
//! are parsed by label into typed pools. Squeeze operations carry no bytes.

use super::{
    errors::FiatShamirError,
    pattern::{IoPattern, OpKind, POW_NONCE_LABEL},
};
use crate::{errors::VerifierError, proof::HintPool};

/// A transcript split into its absorbed stream and parsed hints.
#[derive(Debug, Clone, Default)]
pub struct SplitTranscript {
    /// Concatenation of all absorbed bytes, in order; the public input the
    /// in-circuit sponge replays.
    pub absorb_stream: Vec<u8>,
    pub hints: HintPool,
}

/// Scalar width on the wire.
pub const SCALAR_BYTES: usize = 32;

pub fn split_transcript(
    pattern: &IoPattern,
    transcript: &[u8],
) -> Result<SplitTranscript, VerifierError> {
    let mut pointer = 0usize;
    let mut out = SplitTranscript::default();

    for op in &pattern.ops {
        match op.kind {
            OpKind::Absorb => {
                let width = if op.label == POW_NONCE_LABEL {
                    op.size
                } else {
                    op.size * SCALAR_BYTES
                };
                let chunk = take(transcript, &mut pointer, width)?;
                out.absorb_stream.extend_from_slice(chunk);
            }
            OpKind::Hint => {
                let prefix = take(transcript, &mut pointer, 4)?;
                let len = u32::from_le_bytes(prefix.try_into().expect("4 bytes")) as usize;
                let payload = take(transcript, &mut pointer, len)?;
                out.hints.absorb_hint(&op.label, payload)?;
            }
            OpKind::Squeeze => {}
        }
    }

    Ok(out)
}

fn take<'a>(
    transcript: &'a [u8],
    pointer: &mut usize,
    n: usize,
) -> Result<&'a [u8], FiatShamirError> {
    let available = transcript.len().saturating_sub(*pointer);
    if n > available {
        return Err(FiatShamirError::TranscriptUnderflow {
            needed: n,
            available,
        });
    }
    let out = &transcript[*pointer..*pointer + n];
    *pointer += n;
    Ok(out)
}
