//! # Container Codecs
//!
//! Strings, ordered sequences and sorted sets are ordinary composites: each
//! implements [`Serializable`] on top of the archive's length prefix and
//! field operator.
//!
//! ## Wire Format
//! ```text
//! String       [len: u32] [utf-8 bytes]
//! Vec<T>       [count: u32] [T] [T] ...        (original order)
//! BTreeSet<T>  [count: u32] [T] [T] ...        (ascending order)
//! ```
//!
//! Loading clears the destination first. Counts are checked against the
//! archive's length limit before anything is allocated.

use crate::core::archive::Archive;
use crate::core::kind::{Archived, Serializable};
use crate::error::{ProtocolError, Result};
use std::collections::BTreeSet;

/// Elements reserved up front when loading a sequence
const PREALLOCATE_LIMIT: usize = 4096;

impl Serializable for String {
    fn serialize<A: Archive>(&mut self, ar: &mut A, _version: u32) -> Result<()> {
        let len = ar.length(self.len())?;

        let mut raw = std::mem::take(self).into_bytes();
        let moved = ar.bytes(&mut raw, len);

        match String::from_utf8(raw) {
            Ok(text) => {
                *self = text;
                moved
            }
            Err(err) => {
                moved?;
                Err(ProtocolError::InvalidUtf8(err.utf8_error()))
            }
        }
    }
}

impl<T: Archived + Default> Serializable for Vec<T> {
    fn serialize<A: Archive>(&mut self, ar: &mut A, _version: u32) -> Result<()> {
        let count = ar.length(self.len())?;

        if A::LOADING {
            // Grow as elements arrive so a lying count cannot force a huge allocation
            self.clear();
            self.reserve(count.min(PREALLOCATE_LIMIT));
            for _ in 0..count {
                let mut item = T::default();
                ar.field(&mut item)?;
                self.push(item);
            }
            return Ok(());
        }

        for item in self.iter_mut() {
            ar.field(item)?;
        }
        Ok(())
    }
}

impl<T: Archived + Ord + Default> Serializable for BTreeSet<T> {
    fn serialize<A: Archive>(&mut self, ar: &mut A, _version: u32) -> Result<()> {
        let count = ar.length(self.len())?;

        if A::LOADING {
            self.clear();
            for _ in 0..count {
                let mut item = T::default();
                ar.field(&mut item)?;
                self.insert(item);
            }
            return Ok(());
        }

        // Elements are saved in ascending order; the set is rebuilt even when
        // an element fails so the caller keeps its data.
        let mut items: Vec<T> = std::mem::take(self).into_iter().collect();
        let saved = items
            .iter_mut()
            .try_for_each(|item| ar.field(item).map(|_| ()));
        *self = items.into_iter().collect();
        saved
    }
}
