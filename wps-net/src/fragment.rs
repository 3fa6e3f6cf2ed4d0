//! Reassembly of WSC messages split across several EAP-WSC frames.
//!
//! The first fragment of a split message carries the LF flag and the total
//! message length; every fragment except the last carries MF. Any
//! violation drops the partial message so the next frame starts clean.

use thiserror::Error;
use tracing::debug;

use crate::wsc::{WscFrame, WscOpcode};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FragmentError {
    #[error("length field received while a {pending:?} message is still being reassembled")]
    AlreadyPending { pending: WscOpcode },
    #[error("more-fragments flag set without a length field")]
    MissingLength,
    #[error("fragment op-code {got:?} does not match pending {expected:?}")]
    OpcodeMismatch { expected: WscOpcode, got: WscOpcode },
    #[error("fragment overflows declared length {total} (would reach {would_be})")]
    Overflow { total: usize, would_be: usize },
    #[error("message ended after {got} of {total} bytes")]
    Truncated { got: usize, total: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reassembly {
    NeedMore,
    Complete { opcode: WscOpcode, message: Vec<u8> },
}

#[derive(Debug)]
struct FragmentBuffer {
    opcode: WscOpcode,
    total_length: usize,
    data: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct Reassembler {
    pending: Option<FragmentBuffer>,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Bytes accumulated so far for the pending message.
    pub fn accumulated(&self) -> usize {
        self.pending.as_ref().map_or(0, |p| p.data.len())
    }

    pub fn push(&mut self, frame: &WscFrame<'_>) -> Result<Reassembly, FragmentError> {
        if let Some(declared) = frame.message_length {
            if let Some(buf) = self.pending.take() {
                return Err(FragmentError::AlreadyPending { pending: buf.opcode });
            }
            let total = declared as usize;
            if frame.data.len() > total {
                return Err(FragmentError::Overflow {
                    total,
                    would_be: frame.data.len(),
                });
            }
            if !frame.flags.more_fragments() {
                if frame.data.len() != total {
                    return Err(FragmentError::Truncated {
                        got: frame.data.len(),
                        total,
                    });
                }
                return Ok(Reassembly::Complete {
                    opcode: frame.opcode,
                    message: frame.data.to_vec(),
                });
            }
            let mut data = Vec::with_capacity(total);
            data.extend_from_slice(frame.data);
            debug!("Started {:?} reassembly: {} of {} bytes", frame.opcode, data.len(), total);
            self.pending = Some(FragmentBuffer {
                opcode: frame.opcode,
                total_length: total,
                data,
            });
            return Ok(Reassembly::NeedMore);
        }

        match self.pending.take() {
            Some(mut buf) => {
                if buf.opcode != frame.opcode {
                    return Err(FragmentError::OpcodeMismatch {
                        expected: buf.opcode,
                        got: frame.opcode,
                    });
                }
                let would_be = buf.data.len() + frame.data.len();
                if would_be > buf.total_length {
                    return Err(FragmentError::Overflow {
                        total: buf.total_length,
                        would_be,
                    });
                }
                buf.data.extend_from_slice(frame.data);
                if frame.flags.more_fragments() {
                    self.pending = Some(buf);
                    return Ok(Reassembly::NeedMore);
                }
                if buf.data.len() != buf.total_length {
                    return Err(FragmentError::Truncated {
                        got: buf.data.len(),
                        total: buf.total_length,
                    });
                }
                Ok(Reassembly::Complete {
                    opcode: buf.opcode,
                    message: buf.data,
                })
            }
            None if frame.flags.more_fragments() => Err(FragmentError::MissingLength),
            None => Ok(Reassembly::Complete {
                opcode: frame.opcode,
                message: frame.data.to_vec(),
            }),
        }
    }
}
