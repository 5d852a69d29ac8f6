//! Repositories — transactional read/modify/write over a [`FormTx`].
//!
//! Functions here take the caller's transaction and never commit it; the
//! service decides where a logical operation begins and ends.
//!
//! [`FormTx`]: crate::ports::FormTx

pub mod definition;
pub mod metadata;
pub mod versions;

use uuid::Uuid;

use crate::error::{FormsError, Result};

/// A write expected to hit exactly one existing document. Zero means the
/// document is gone; more than one means the match was ambiguous.
pub(crate) fn ensure_single(affected: u64, kind: &str, id: Uuid) -> Result<()> {
    match affected {
        1 => Ok(()),
        0 => Err(FormsError::not_found(kind, id)),
        n => Err(FormsError::Conflict(format!(
            "expected to modify one {kind} '{id}', modified {n}"
        ))),
    }
}
