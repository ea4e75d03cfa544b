//! Decomposed indices.
//!
//! A composed grammar numbers every symbol, production and state once,
//! globally. After partitioning, each of those numbers belongs to exactly one
//! fragment and is renumbered within it. [`Decomposed`] records which
//! fragment owns a number together with its local value.
//!
//! The signed wire form (`h >= 0` for host indices, `-(e + 1)` for extension
//! indices) is kept for interchange with tools that store decomposed indices
//! as plain integers.

use crate::error::CompositionError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Decomposed {
    Host(u32),
    Extension(u32),
}

impl Decomposed {
    pub fn host(index: usize) -> Result<Self, CompositionError> {
        Ok(Decomposed::Host(narrow(index)?))
    }

    pub fn extension(index: usize) -> Result<Self, CompositionError> {
        Ok(Decomposed::Extension(narrow(index)?))
    }

    /// Local index within the owning fragment.
    #[inline]
    pub fn local(self) -> usize {
        match self {
            Decomposed::Host(i) | Decomposed::Extension(i) => i as usize,
        }
    }

    #[inline]
    pub fn is_extension(self) -> bool {
        matches!(self, Decomposed::Extension(_))
    }

    /// Signed wire form.
    pub fn to_raw(self) -> i64 {
        match self {
            Decomposed::Host(h) => i64::from(h),
            Decomposed::Extension(e) => encode_extension_index(e),
        }
    }

    pub fn from_raw(value: i64) -> Option<Self> {
        if value >= 0 {
            u32::try_from(value).ok().map(Decomposed::Host)
        } else {
            decode_extension_index(value).map(Decomposed::Extension)
        }
    }
}

fn narrow(index: usize) -> Result<u32, CompositionError> {
    u32::try_from(index).map_err(|_| CompositionError::IndexOverflow { index })
}

/// `-(e + 1)`; always strictly negative.
#[inline]
pub fn encode_extension_index(index: u32) -> i64 {
    -i64::from(index) - 1
}

/// Inverse of [`encode_extension_index`]; `None` for non-negative values.
#[inline]
pub fn decode_extension_index(value: i64) -> Option<u32> {
    if value >= 0 {
        return None;
    }
    u32::try_from(-(value + 1)).ok()
}

/// One past the highest member, i.e. the length of a dense array indexed by
/// the set.
#[inline]
pub fn bit_length(set: &BTreeSet<usize>) -> usize {
    set.last().map_or(0, |&max| max + 1)
}
