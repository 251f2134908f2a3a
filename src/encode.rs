//! Serialize data into the bytecode protocol.
//!
//! [`ToByte`] renders primitives onto any [`BufMut`]; [`RequestBuffer`] is the
//! write cursor request builders use. It adds string length limits, the
//! flexible (KIP-482) encodings and deferred i32 fields that are patched once
//! their value is known.
use bytes::{BufMut, Bytes, BytesMut};

use crate::constants::{MAX_STRING_SIZE, NULL_LENGTH};
use crate::error::{Error, Result};

pub trait ToByte {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()>;
}

impl<'a, T: ToByte + 'a + ?Sized> ToByte for &'a T {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        (*self).encode(buffer)
    }
}

impl ToByte for bool {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()> {
        buffer.put_i8(*self as i8);
        Ok(())
    }
}

impl ToByte for i8 {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()> {
        buffer.put_i8(*self);
        Ok(())
    }
}

impl ToByte for i16 {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()> {
        buffer.put_i16(*self);
        Ok(())
    }
}

impl ToByte for i32 {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()> {
        buffer.put_i32(*self);
        Ok(())
    }
}

impl ToByte for i64 {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()> {
        buffer.put_i64(*self);
        Ok(())
    }
}

impl ToByte for str {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()> {
        if self.len() > MAX_STRING_SIZE {
            return Err(Error::MalformedField(format!(
                "string of {} bytes exceeds maximum of {}",
                self.len(),
                MAX_STRING_SIZE
            )));
        }
        buffer.put_i16(self.len() as i16);
        buffer.put(self.as_bytes());
        Ok(())
    }
}

impl ToByte for [u8] {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()> {
        if self.len() > i32::MAX as usize {
            return Err(Error::MalformedField(format!(
                "byte field of {} bytes is too large",
                self.len()
            )));
        }
        buffer.put_i32(self.len() as i32);
        buffer.put(self);
        Ok(())
    }
}

impl ToByte for Option<&str> {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        match *self {
            Some(xs) => xs.encode(buffer),
            None => (-1i16).encode(buffer), // NULLABLE_STRING uses i16 length prefix
        }
    }
}

impl ToByte for Option<&[u8]> {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        match *self {
            Some(xs) => xs.encode(buffer),
            None => NULL_LENGTH.encode(buffer),
        }
    }
}

/// Encode an unsigned varint (variable-length integer) to the buffer.
/// Used by flexible encoding formats (KIP-482).
pub fn encode_unsigned_varint<W: BufMut>(buffer: &mut W, mut value: u32) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        buffer.put_u8(byte);
        if value == 0 {
            break;
        }
    }
}

/// Position of an i32 reserved in a [`RequestBuffer`], patched later with
/// [`RequestBuffer::patch_i32`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchOffset(usize);

impl PatchOffset {
    /// Byte position of the reserved field.
    pub const fn position(self) -> usize {
        self.0
    }
}

/// Growable write cursor for request payloads.
#[derive(Debug, Clone)]
pub struct RequestBuffer {
    buf: BytesMut,
    max_string_size: usize,
}

impl Default for RequestBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestBuffer {
    pub fn new() -> Self {
        Self::with_max_string_size(MAX_STRING_SIZE)
    }

    /// Create a buffer that rejects strings longer than `max_string_size`.
    ///
    /// The limit is clamped to the protocol maximum.
    pub fn with_max_string_size(max_string_size: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(256),
            max_string_size: max_string_size.min(MAX_STRING_SIZE),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Finish writing and hand out the payload.
    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }

    pub fn write_i8(&mut self, value: i8) {
        self.buf.put_i8(value);
    }

    pub fn write_i16(&mut self, value: i16) {
        self.buf.put_i16(value);
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buf.put_i32(value);
    }

    pub fn write_i64(&mut self, value: i64) {
        self.buf.put_i64(value);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buf.put_i8(value as i8);
    }

    fn check_string(&self, s: &str) -> Result<()> {
        if s.len() > self.max_string_size {
            return Err(Error::MalformedField(format!(
                "string of {} bytes exceeds maximum of {}",
                s.len(),
                self.max_string_size
            )));
        }
        Ok(())
    }

    /// STRING: i16 length followed by UTF-8 bytes.
    pub fn write_string(&mut self, s: &str) -> Result<()> {
        self.check_string(s)?;
        s.encode(&mut self.buf)
    }

    /// NULLABLE_STRING: like [`write_string`](Self::write_string), `-1` for null.
    pub fn write_nullable_string(&mut self, s: Option<&str>) -> Result<()> {
        if let Some(s) = s {
            self.check_string(s)?;
        }
        s.encode(&mut self.buf)
    }

    /// BYTES: i32 length followed by raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        bytes.encode(&mut self.buf)
    }

    pub fn write_nullable_bytes(&mut self, bytes: Option<&[u8]>) -> Result<()> {
        bytes.encode(&mut self.buf)
    }

    /// ARRAY: i32 count, then each element rendered by `f`.
    pub fn write_array<T, F>(&mut self, items: &[T], mut f: F) -> Result<()>
    where
        F: FnMut(&mut Self, &T) -> Result<()>,
    {
        self.write_i32(array_len(items.len())?);
        for item in items {
            f(self, item)?;
        }
        Ok(())
    }

    /// Nullable ARRAY: `-1` for null.
    pub fn write_nullable_array<T, F>(&mut self, items: Option<&[T]>, f: F) -> Result<()>
    where
        F: FnMut(&mut Self, &T) -> Result<()>,
    {
        match items {
            Some(items) => self.write_array(items, f),
            None => {
                self.write_i32(NULL_LENGTH);
                Ok(())
            }
        }
    }

    pub fn write_unsigned_varint(&mut self, value: u32) {
        encode_unsigned_varint(&mut self.buf, value);
    }

    /// COMPACT_STRING: varint (length + 1) followed by UTF-8 bytes.
    pub fn write_compact_string(&mut self, s: &str) -> Result<()> {
        self.check_string(s)?;
        self.write_unsigned_varint(s.len() as u32 + 1);
        self.buf.put(s.as_bytes());
        Ok(())
    }

    /// COMPACT_NULLABLE_STRING: `0` encodes null.
    pub fn write_compact_nullable_string(&mut self, s: Option<&str>) -> Result<()> {
        match s {
            Some(s) => self.write_compact_string(s),
            None => {
                self.write_unsigned_varint(0);
                Ok(())
            }
        }
    }

    /// COMPACT_BYTES: varint (length + 1) followed by raw bytes.
    pub fn write_compact_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let len = u32::try_from(bytes.len())
            .ok()
            .and_then(|l| l.checked_add(1))
            .ok_or_else(|| {
                Error::MalformedField(format!("byte field of {} bytes is too large", bytes.len()))
            })?;
        self.write_unsigned_varint(len);
        self.buf.put(bytes);
        Ok(())
    }

    /// COMPACT_ARRAY: varint (count + 1), then each element rendered by `f`.
    pub fn write_compact_array<T, F>(&mut self, items: &[T], mut f: F) -> Result<()>
    where
        F: FnMut(&mut Self, &T) -> Result<()>,
    {
        self.write_unsigned_varint(array_len(items.len())? as u32 + 1);
        for item in items {
            f(self, item)?;
        }
        Ok(())
    }

    /// COMPACT_NULLABLE_ARRAY: `0` encodes null.
    pub fn write_compact_nullable_array<T, F>(&mut self, items: Option<&[T]>, f: F) -> Result<()>
    where
        F: FnMut(&mut Self, &T) -> Result<()>,
    {
        match items {
            Some(items) => self.write_compact_array(items, f),
            None => {
                self.write_unsigned_varint(0);
                Ok(())
            }
        }
    }

    /// An empty tagged field section is a single varint 0.
    pub fn write_empty_tagged_fields(&mut self) {
        self.buf.put_u8(0);
    }

    /// Reserve an i32 whose value is written later.
    pub fn reserve_i32(&mut self) -> PatchOffset {
        let at = PatchOffset(self.buf.len());
        self.buf.put_i32(0);
        at
    }

    /// Overwrite a previously reserved i32.
    pub fn patch_i32(&mut self, at: PatchOffset, value: i32) -> Result<()> {
        let slot = self
            .buf
            .get_mut(at.0..at.0 + 4)
            .ok_or_else(|| Error::MalformedField(format!("patch offset {} out of range", at.0)))?;
        slot.copy_from_slice(&value.to_be_bytes());
        Ok(())
    }
}

fn array_len(len: usize) -> Result<i32> {
    i32::try_from(len)
        .ok()
        .filter(|l| *l <= crate::constants::MAX_PROTOCOL_ARRAY_SIZE)
        .ok_or_else(|| Error::MalformedField(format!("array of {} elements is too large", len)))
}
