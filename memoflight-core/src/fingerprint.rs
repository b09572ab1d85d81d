//! Argument fingerprinting.
//!
//! A [`Fingerprint`] is the cache key derived from a call's argument tuple.
//! Two calls share a cache slot exactly when their fingerprints are equal,
//! so the encoding has to be collision-free across values, types, and
//! argument boundaries:
//!
//! - every value is encoded as a **type tag byte** followed by its payload,
//!   so `1u32` and `1u64` (or `1` and `"1"`) never alias;
//! - variable-length payloads (strings, sequences) are **length-prefixed**,
//!   so `("ab", "c")` and `("a", "bc")` never alias;
//! - the engine prefixes every fingerprint with a **namespace** identifying
//!   the wrapped function, so two functions sharing one cache never alias.
//!
//! The encoding is structural identity, not semantic equality: `0.0f64` and
//! `-0.0f64` are distinct keys (they encode different bit patterns), and a
//! `Vec<u32>` and a `[u32; N]` with the same contents are the same key (both
//! encode as a sequence of their elements).

use std::fmt;

// ═══════════════════════════════════════════════════════════════════════════════
// TYPE TAGS
// ═══════════════════════════════════════════════════════════════════════════════
// One tag per primitive type. Payload widths are fixed per tag (or carried
// in a length prefix), which is what makes the concatenated encoding
// self-delimiting.

const TAG_BOOL: u8 = 0x01;
const TAG_CHAR: u8 = 0x02;

const TAG_U8: u8 = 0x10;
const TAG_U16: u8 = 0x11;
const TAG_U32: u8 = 0x12;
const TAG_U64: u8 = 0x13;
const TAG_U128: u8 = 0x14;
const TAG_USIZE: u8 = 0x15;

const TAG_I8: u8 = 0x20;
const TAG_I16: u8 = 0x21;
const TAG_I32: u8 = 0x22;
const TAG_I64: u8 = 0x23;
const TAG_I128: u8 = 0x24;
const TAG_ISIZE: u8 = 0x25;

const TAG_F32: u8 = 0x30;
const TAG_F64: u8 = 0x31;

const TAG_STR: u8 = 0x40;
const TAG_NONE: u8 = 0x50;
const TAG_SOME: u8 = 0x51;
const TAG_SEQ: u8 = 0x60;

/// Writes a length prefix as a fixed-width little-endian u64.
fn write_len(buf: &mut Vec<u8>, len: usize) {
    buf.extend_from_slice(&(len as u64).to_le_bytes());
}

// ═══════════════════════════════════════════════════════════════════════════════
// FINGERPRINT KEY
// ═══════════════════════════════════════════════════════════════════════════════

/// A stable cache key derived from an argument tuple.
///
/// Fingerprints are plain byte strings; equal bytes mean the same cache
/// slot. They are cheap to clone and hash, and display as lowercase hex
/// for logging.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(Vec<u8>);

impl Fingerprint {
    /// Builds the fingerprint for `args` under the given namespace.
    ///
    /// The namespace identifies the wrapped function the key belongs to and
    /// is encoded ahead of the arguments, so functions sharing one cache
    /// can never read each other's slots.
    pub fn scoped<A: CacheArgs + ?Sized>(namespace: u64, args: &A) -> Self {
        let mut buf = Vec::with_capacity(40);
        buf.extend_from_slice(&namespace.to_le_bytes());
        args.write_fingerprint(&mut buf);
        Fingerprint(buf)
    }

    /// Returns the raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", hex::encode(&self.0))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PER-VALUE ENCODING
// ═══════════════════════════════════════════════════════════════════════════════

/// A value that can contribute to a cache fingerprint.
///
/// Implementations append a self-delimiting, type-tagged encoding of the
/// value to `buf`. Equal values of the same type must produce equal bytes;
/// values of different implementing types must never produce equal bytes.
pub trait FingerprintArg {
    /// Appends this value's tagged encoding to the buffer.
    fn write_arg(&self, buf: &mut Vec<u8>);
}

macro_rules! impl_int_arg {
    ($($ty:ty => $tag:ident),* $(,)?) => {
        $(
            impl FingerprintArg for $ty {
                fn write_arg(&self, buf: &mut Vec<u8>) {
                    buf.push($tag);
                    buf.extend_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

impl_int_arg!(
    u8 => TAG_U8,
    u16 => TAG_U16,
    u32 => TAG_U32,
    u64 => TAG_U64,
    u128 => TAG_U128,
    i8 => TAG_I8,
    i16 => TAG_I16,
    i32 => TAG_I32,
    i64 => TAG_I64,
    i128 => TAG_I128,
);

// usize/isize are widened to 64 bits so fingerprints do not depend on the
// platform's pointer width.
impl FingerprintArg for usize {
    fn write_arg(&self, buf: &mut Vec<u8>) {
        buf.push(TAG_USIZE);
        buf.extend_from_slice(&(*self as u64).to_le_bytes());
    }
}

impl FingerprintArg for isize {
    fn write_arg(&self, buf: &mut Vec<u8>) {
        buf.push(TAG_ISIZE);
        buf.extend_from_slice(&(*self as i64).to_le_bytes());
    }
}

impl FingerprintArg for bool {
    fn write_arg(&self, buf: &mut Vec<u8>) {
        buf.push(TAG_BOOL);
        buf.push(u8::from(*self));
    }
}

impl FingerprintArg for char {
    fn write_arg(&self, buf: &mut Vec<u8>) {
        buf.push(TAG_CHAR);
        buf.extend_from_slice(&u32::from(*self).to_le_bytes());
    }
}

// Floats key on their bit pattern. NaN payloads are preserved, so distinct
// NaN encodings are distinct keys.
impl FingerprintArg for f32 {
    fn write_arg(&self, buf: &mut Vec<u8>) {
        buf.push(TAG_F32);
        buf.extend_from_slice(&self.to_bits().to_le_bytes());
    }
}

impl FingerprintArg for f64 {
    fn write_arg(&self, buf: &mut Vec<u8>) {
        buf.push(TAG_F64);
        buf.extend_from_slice(&self.to_bits().to_le_bytes());
    }
}

impl FingerprintArg for str {
    fn write_arg(&self, buf: &mut Vec<u8>) {
        buf.push(TAG_STR);
        write_len(buf, self.len());
        buf.extend_from_slice(self.as_bytes());
    }
}

impl FingerprintArg for String {
    fn write_arg(&self, buf: &mut Vec<u8>) {
        self.as_str().write_arg(buf);
    }
}

impl<T: FingerprintArg> FingerprintArg for Option<T> {
    fn write_arg(&self, buf: &mut Vec<u8>) {
        match self {
            None => buf.push(TAG_NONE),
            Some(value) => {
                buf.push(TAG_SOME);
                value.write_arg(buf);
            }
        }
    }
}

impl<T: FingerprintArg> FingerprintArg for [T] {
    fn write_arg(&self, buf: &mut Vec<u8>) {
        buf.push(TAG_SEQ);
        write_len(buf, self.len());
        for item in self {
            item.write_arg(buf);
        }
    }
}

impl<T: FingerprintArg> FingerprintArg for Vec<T> {
    fn write_arg(&self, buf: &mut Vec<u8>) {
        self.as_slice().write_arg(buf);
    }
}

impl<T: FingerprintArg, const N: usize> FingerprintArg for [T; N] {
    fn write_arg(&self, buf: &mut Vec<u8>) {
        self.as_slice().write_arg(buf);
    }
}

impl<T: FingerprintArg + ?Sized> FingerprintArg for &T {
    fn write_arg(&self, buf: &mut Vec<u8>) {
        (**self).write_arg(buf);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ARGUMENT TUPLES
// ═══════════════════════════════════════════════════════════════════════════════

/// An argument tuple a wrapped function can be keyed on.
///
/// Implemented for tuples of [`FingerprintArg`] values up to arity 8, and
/// for `()` so nullary functions can be memoized on their namespace alone.
pub trait CacheArgs {
    /// Appends the tuple's encoding to the buffer, element by element.
    fn write_fingerprint(&self, buf: &mut Vec<u8>);

    /// Builds the unscoped fingerprint for this tuple.
    ///
    /// The cache engine uses [`Fingerprint::scoped`] instead; this form is
    /// useful for inspecting the encoding itself.
    fn fingerprint(&self) -> Fingerprint {
        let mut buf = Vec::with_capacity(32);
        self.write_fingerprint(&mut buf);
        Fingerprint(buf)
    }
}

impl CacheArgs for () {
    fn write_fingerprint(&self, _buf: &mut Vec<u8>) {}
}

macro_rules! impl_cache_args {
    ($($ty:ident => $idx:tt),+) => {
        impl<$($ty: FingerprintArg),+> CacheArgs for ($($ty,)+) {
            fn write_fingerprint(&self, buf: &mut Vec<u8>) {
                $(self.$idx.write_arg(buf);)+
            }
        }
    };
}

impl_cache_args!(A0 => 0);
impl_cache_args!(A0 => 0, A1 => 1);
impl_cache_args!(A0 => 0, A1 => 1, A2 => 2);
impl_cache_args!(A0 => 0, A1 => 1, A2 => 2, A3 => 3);
impl_cache_args!(A0 => 0, A1 => 1, A2 => 2, A3 => 3, A4 => 4);
impl_cache_args!(A0 => 0, A1 => 1, A2 => 2, A3 => 3, A4 => 4, A5 => 5);
impl_cache_args!(A0 => 0, A1 => 1, A2 => 2, A3 => 3, A4 => 4, A5 => 5, A6 => 6);
impl_cache_args!(A0 => 0, A1 => 1, A2 => 2, A3 => 3, A4 => 4, A5 => 5, A6 => 6, A7 => 7);
