//! # Primitive Values
//!
//! Fixed-size, bitwise-copyable values that cross the wire as their raw
//! native-layout bytes: numeric scalars, `bool`, `char`, fieldless enums
//! declared with [`primitive_enum!`](crate::primitive_enum) and fixed-size
//! arrays of any of these.
//!
//! No tag or length is written. Decoding takes a `swap` flag: when the peer
//! runs with the other byte order, every multi-byte scalar is reversed before
//! it is reinterpreted. Values whose bytes cannot form a valid instance
//! (`bool` other than 0/1, surrogate `char`, unknown enum discriminant) are
//! rejected with [`ProtocolError::InvalidValue`].

use crate::error::{ProtocolError, Result};
use bytes::BufMut;

/// A fixed-size value transferred as raw bytes
pub trait Primitive: Copy + 'static {
    /// Encoded size in bytes, always `size_of::<Self>()` for scalars
    const SIZE: usize;

    /// Append the native-layout bytes of `self`
    fn put<B: BufMut>(&self, out: &mut B);

    /// Rebuild a value from the first `SIZE` bytes of `src`
    ///
    /// # Errors
    /// `ProtocolError::UnexpectedEof` if `src` is shorter than `SIZE`, or
    /// `ProtocolError::InvalidValue` if the bytes do not form a valid value
    fn get(src: &[u8], swap: bool) -> Result<Self>;
}

/// The first `size` bytes of `src`
#[inline]
fn head(src: &[u8], size: usize) -> Result<&[u8]> {
    src.get(..size).ok_or(ProtocolError::UnexpectedEof {
        needed: size,
        remaining: src.len(),
    })
}

macro_rules! impl_numeric_primitive {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Primitive for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                #[inline]
                fn put<B: BufMut>(&self, out: &mut B) {
                    out.put_slice(&self.to_ne_bytes());
                }

                #[inline]
                fn get(src: &[u8], swap: bool) -> Result<Self> {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(head(src, Self::SIZE)?);
                    if swap {
                        raw.reverse();
                    }
                    Ok(<$ty>::from_ne_bytes(raw))
                }
            }
        )*
    };
}

impl_numeric_primitive!(u8, i8, u16, i16, u32, i32, u64, i64, u128, i128, f32, f64);

impl Primitive for bool {
    const SIZE: usize = 1;

    #[inline]
    fn put<B: BufMut>(&self, out: &mut B) {
        out.put_u8(u8::from(*self));
    }

    #[inline]
    fn get(src: &[u8], _swap: bool) -> Result<Self> {
        match head(src, 1)?[0] {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(ProtocolError::InvalidValue {
                type_name: "bool",
                raw: u128::from(other),
            }),
        }
    }
}

impl Primitive for char {
    const SIZE: usize = 4;

    #[inline]
    fn put<B: BufMut>(&self, out: &mut B) {
        u32::from(*self).put(out);
    }

    #[inline]
    fn get(src: &[u8], swap: bool) -> Result<Self> {
        let scalar = u32::get(src, swap)?;
        char::from_u32(scalar).ok_or(ProtocolError::InvalidValue {
            type_name: "char",
            raw: u128::from(scalar),
        })
    }
}

impl<T: Primitive, const N: usize> Primitive for [T; N] {
    const SIZE: usize = T::SIZE * N;

    fn put<B: BufMut>(&self, out: &mut B) {
        for item in self {
            item.put(out);
        }
    }

    fn get(src: &[u8], swap: bool) -> Result<Self> {
        let src = head(src, Self::SIZE)?;
        let items = (0..N)
            .map(|index| T::get(&src[index * T::SIZE..], swap))
            .collect::<Result<Vec<T>>>()?;

        items.try_into().map_err(|items: Vec<T>| {
            ProtocolError::Custom(format!(
                "array decode produced {} of {N} elements",
                items.len()
            ))
        })
    }
}

/// Declare a fieldless enum that travels as its integer representation.
///
/// The enum gets `#[repr($repr)]`, a [`Primitive`] impl and an
/// [`Archived`](crate::core::kind::Archived) impl classifying it as primitive.
/// Loading an unknown discriminant fails with
/// [`ProtocolError::InvalidValue`](crate::error::ProtocolError::InvalidValue).
///
/// ```rust
/// use peerlink::core::kind::{Archived, SerializationKind};
/// use peerlink::primitive_enum;
///
/// primitive_enum! {
///     #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
///     pub enum Side: u8 {
///         #[default]
///         Attacker = 0,
///         Defender = 1,
///     }
/// }
///
/// assert_eq!(<Side as Archived>::KIND, SerializationKind::Primitive);
/// ```
#[macro_export]
macro_rules! primitive_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident : $repr:ty {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident = $value:expr
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr($repr)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant = $value,
            )+
        }

        impl $crate::core::primitive::Primitive for $name {
            const SIZE: usize = ::std::mem::size_of::<$repr>();

            fn put<B: $crate::bytes::BufMut>(&self, out: &mut B) {
                <$repr as $crate::core::primitive::Primitive>::put(&(*self as $repr), out);
            }

            fn get(src: &[u8], swap: bool) -> $crate::error::Result<Self> {
                let raw = <$repr as $crate::core::primitive::Primitive>::get(src, swap)?;
                $(
                    if raw == $value {
                        return Ok($name::$variant);
                    }
                )+
                Err($crate::error::ProtocolError::InvalidValue {
                    type_name: stringify!($name),
                    raw: raw as u128,
                })
            }
        }

        impl $crate::core::kind::Archived for $name {
            const KIND: $crate::core::kind::SerializationKind =
                $crate::core::kind::SerializationKind::Primitive;

            fn archive<A: $crate::core::archive::Archive>(
                &mut self,
                ar: &mut A,
            ) -> $crate::error::Result<()> {
                ar.primitive(self)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    fn encode<P: Primitive>(value: P) -> Vec<u8> {
        let mut out = BytesMut::new();
        value.put(&mut out);
        out.to_vec()
    }

    #[test]
    fn test_sizes_match_layout() {
        assert_eq!(<u8 as Primitive>::SIZE, 1);
        assert_eq!(<i16 as Primitive>::SIZE, 2);
        assert_eq!(<f64 as Primitive>::SIZE, 8);
        assert_eq!(<u128 as Primitive>::SIZE, 16);
        assert_eq!(<[u32; 5] as Primitive>::SIZE, 20);
        assert_eq!(<[[u16; 2]; 3] as Primitive>::SIZE, 12);
    }

    #[test]
    fn test_native_layout() {
        assert_eq!(encode(0x0102_0304u32), 0x0102_0304u32.to_ne_bytes().to_vec());
        assert_eq!(encode(-2i64), (-2i64).to_ne_bytes().to_vec());
        assert_eq!(encode(true), vec![1]);
    }

    #[test]
    fn test_swap_reverses_each_scalar() {
        let bytes = encode(0x0102_0304u32);
        let swapped = u32::get(&bytes, true).unwrap();
        assert_eq!(swapped, 0x0403_0201);

        let pair = encode([0x0102u16, 0x0304u16]);
        let swapped = <[u16; 2]>::get(&pair, true).unwrap();
        assert_eq!(swapped, [0x0201, 0x0403]);
    }

    #[test]
    fn test_swap_is_noop_for_single_bytes() {
        assert_eq!(u8::get(&[0xAB], true).unwrap(), 0xAB);
        assert!(bool::get(&[1], true).unwrap());
    }

    #[test]
    fn test_float_bits_preserved() {
        let value = f32::from_bits(0x7FC0_0001);
        let decoded = f32::get(&encode(value), false).unwrap();
        assert_eq!(decoded.to_bits(), value.to_bits());
    }

    #[test]
    fn test_invalid_bool_rejected() {
        let err = bool::get(&[2], false).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::InvalidValue {
                type_name: "bool",
                raw: 2
            }
        ));
    }

    #[test]
    fn test_surrogate_char_rejected() {
        let bytes = encode(0xD800u32);
        assert!(matches!(
            char::get(&bytes, false),
            Err(ProtocolError::InvalidValue { type_name: "char", .. })
        ));
        assert_eq!(char::get(&encode('ß'), false).unwrap(), 'ß');
    }

    #[test]
    fn test_short_input_is_an_error() {
        assert!(matches!(
            u32::get(&[1, 2, 3], false),
            Err(ProtocolError::UnexpectedEof {
                needed: 4,
                remaining: 3
            })
        ));
        assert!(matches!(
            bool::get(&[], false),
            Err(ProtocolError::UnexpectedEof { needed: 1, .. })
        ));
        assert!(matches!(
            <[u16; 3]>::get(&encode([1u16, 2]), false),
            Err(ProtocolError::UnexpectedEof {
                needed: 6,
                remaining: 4
            })
        ));
    }

    #[test]
    fn test_empty_array() {
        assert_eq!(<[u64; 0] as Primitive>::SIZE, 0);
        let decoded = <[u64; 0]>::get(&[], false).unwrap();
        assert_eq!(decoded, [0u64; 0]);
    }
}
