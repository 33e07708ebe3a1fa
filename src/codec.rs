//! Generic fixed-layout record codec
//!
//! Every ELF structure this crate touches is a flat sequence of fixed-width
//! unsigned integers. A record type declares its layout as an ordered list of
//! [`FieldKind`]s and converts to/from a flat field list; decoding and
//! encoding are then shared here, dispatched onto the `byteorder` crate for
//! the image's endianness. This module is pure and performs no I/O.

use byteorder::BigEndian;
use byteorder::ByteOrder;
use byteorder::LittleEndian;

use crate::error::ElfError;

/// Byte order of an ELF image, derived from the identification bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Little,
    Big,
}

/// Width of one record field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    U16,
    U32,
}

impl FieldKind {
    pub fn size(self) -> usize {
        match self {
            FieldKind::U16 => 2,
            FieldKind::U32 => 4,
        }
    }
}

/// A record with a compiled-in flat field layout
///
/// Fields travel as `u32` regardless of their wire width; `U16` fields are
/// truncated on encode and zero-extended on decode.
pub trait FixedRecord: Sized {
    const LAYOUT: &'static [FieldKind];

    /// Build the record from decoded fields, in layout order.
    /// `fields.len()` always equals `LAYOUT.len()`.
    fn from_fields(fields: &[u32]) -> Self;

    /// Flatten the record into fields, in layout order.
    fn to_fields(&self) -> Vec<u32>;
}

/// Byte length of one encoded record, computed from its layout
pub fn record_size<T: FixedRecord>() -> usize {
    T::LAYOUT.iter().map(|kind| kind.size()).sum()
}

/// Decode a record from a buffer of exactly `record_size::<T>()` bytes
///
/// A wrong-length buffer means the advertised entry size disagrees with the
/// compiled-in layout, so it is reported as a layout mismatch.
pub fn decode<T: FixedRecord>(buf: &[u8], encoding: Encoding) -> Result<T, ElfError> {
    let expected = record_size::<T>();
    if buf.len() != expected {
        return Err(ElfError::LayoutMismatch {
            advertised: buf.len(),
            expected,
        });
    }
    Ok(match encoding {
        Encoding::Little => decode_with::<LittleEndian, T>(buf),
        Encoding::Big => decode_with::<BigEndian, T>(buf),
    })
}

/// Encode a record into exactly `record_size::<T>()` bytes
pub fn encode<T: FixedRecord>(record: &T, encoding: Encoding) -> Vec<u8> {
    match encoding {
        Encoding::Little => encode_with::<LittleEndian, T>(record),
        Encoding::Big => encode_with::<BigEndian, T>(record),
    }
}

fn decode_with<E: ByteOrder, T: FixedRecord>(buf: &[u8]) -> T {
    let mut fields = Vec::with_capacity(T::LAYOUT.len());
    let mut pos = 0;
    for kind in T::LAYOUT {
        let value = match kind {
            FieldKind::U16 => u32::from(E::read_u16(&buf[pos..pos + 2])),
            FieldKind::U32 => E::read_u32(&buf[pos..pos + 4]),
        };
        fields.push(value);
        pos += kind.size();
    }
    T::from_fields(&fields)
}

fn encode_with<E: ByteOrder, T: FixedRecord>(record: &T) -> Vec<u8> {
    let fields = record.to_fields();
    let mut buf = vec![0u8; record_size::<T>()];
    let mut pos = 0;
    for (kind, value) in T::LAYOUT.iter().zip(fields) {
        match kind {
            FieldKind::U16 => E::write_u16(&mut buf[pos..pos + 2], value as u16),
            FieldKind::U32 => E::write_u32(&mut buf[pos..pos + 4], value),
        }
        pos += kind.size();
    }
    buf
}
