//! # Archive
//!
//! The save/load engine. An [`Archive`] has a fixed direction: a saving
//! archive turns values into bytes, a loading archive overwrites values with
//! what it reads. Both directions share one field operator, so a single
//! [`Serializable::serialize`](crate::core::kind::Serializable::serialize)
//! body describes the record for writing and for reading:
//!
//! ```rust
//! use peerlink::core::archive::Archive;
//! use peerlink::core::buffer::{BufferReader, BufferWriter};
//!
//! let mut writer = BufferWriter::new();
//! let (mut id, mut label) = (7u32, String::from("north gate"));
//! writer.field(&mut id)?.field(&mut label)?;
//!
//! let bytes = writer.into_bytes();
//! let mut reader = BufferReader::new(bytes);
//! let (mut id_back, mut label_back) = (0u32, String::new());
//! reader.field(&mut id_back)?.field(&mut label_back)?;
//!
//! assert_eq!((id_back, label_back.as_str()), (7, "north gate"));
//! # Ok::<(), peerlink::error::ProtocolError>(())
//! ```
//!
//! Implementors provide the raw moves (`primitive`, `bytes`) plus the
//! direction, version and length limit; everything else is shared.

use crate::core::kind::Archived;
use crate::core::primitive::Primitive;
use crate::error::{constants, ProtocolError, Result};

/// A directional archive over some byte sink or source
pub trait Archive: Sized {
    /// `true` for archives that read values, `false` for archives that write them
    const LOADING: bool;

    /// Protocol version passed to every composite `serialize` call
    fn version(&self) -> u32;

    /// Largest length prefix this archive accepts when loading
    fn max_length(&self) -> usize;

    /// Move one primitive value.
    ///
    /// Saving appends `P::SIZE` native-layout bytes. Loading reads `P::SIZE`
    /// bytes, swapping byte order when the source has the other endianness.
    fn primitive<P: Primitive>(&mut self, value: &mut P) -> Result<()>;

    /// Move a run of raw bytes.
    ///
    /// Saving writes all of `data` (`len` equals `data.len()`). Loading
    /// replaces the contents of `data` with exactly `len` bytes.
    fn bytes(&mut self, data: &mut Vec<u8>, len: usize) -> Result<()>;

    /// Direction of this archive
    #[inline]
    fn is_loading(&self) -> bool {
        Self::LOADING
    }

    /// The symmetric field operator; chain it to describe a record
    #[inline]
    fn field<T: Archived>(&mut self, value: &mut T) -> Result<&mut Self> {
        value.archive(self)?;
        Ok(self)
    }

    /// Save a value; fails on a loading archive
    fn save<T: Archived>(&mut self, value: &mut T) -> Result<()> {
        if Self::LOADING {
            return Err(ProtocolError::WrongDirection(constants::ERR_SAVE_ON_READER));
        }
        value.archive(self)
    }

    /// Load a value in place; fails on a saving archive
    fn load<T: Archived>(&mut self, value: &mut T) -> Result<()> {
        if !Self::LOADING {
            return Err(ProtocolError::WrongDirection(constants::ERR_LOAD_ON_WRITER));
        }
        value.archive(self)
    }

    /// Move a `u32` length prefix.
    ///
    /// Saving writes `len` and returns it; lengths above `u32::MAX` cannot be
    /// represented and are rejected. Loading ignores `len`, reads the prefix
    /// and rejects anything above [`Archive::max_length`] before the caller
    /// allocates.
    fn length(&mut self, len: usize) -> Result<usize> {
        if Self::LOADING {
            let mut wire = 0u32;
            self.primitive(&mut wire)?;
            let length = wire as usize;
            let limit = self.max_length();
            if length > limit {
                return Err(ProtocolError::OversizedLength { length, limit });
            }
            Ok(length)
        } else {
            let mut wire = u32::try_from(len).map_err(|_| ProtocolError::OversizedLength {
                length: len,
                limit: u32::MAX as usize,
            })?;
            self.primitive(&mut wire)?;
            Ok(len)
        }
    }
}
