//! Primitive protocol codec.
//!
//! Pure, reentrant encode/decode functions over a minimal byte-reader
//! capability (`ByteDecoder`) and byte-writer capability (`ByteEncoder`).
//! All multi-byte integers are big-endian, per the Kafka wire format.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use uuid::Uuid;

use crate::error::{DecodeError, DecodeResult};

/// Positioned read of a byte buffer. Wraps `bytes::Bytes` so slicing a
/// bounded sub-buffer (for batch/record length prefixes) is a cheap
/// refcount bump, not a copy.
pub struct ByteDecoder {
    buf: Bytes,
}

impl ByteDecoder {
    pub fn new(buf: Bytes) -> Self {
        Self { buf }
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Cheap (refcount-bump) snapshot of everything still unread, for
    /// callers that need to re-derive the raw bytes of a structure
    /// after decoding it field by field (e.g. RecordBatch, which Fetch
    /// re-emits byte-for-byte).
    pub fn peek_remaining(&self) -> Bytes {
        self.buf.clone()
    }

    fn require(&self, n: usize) -> DecodeResult<()> {
        if self.buf.remaining() < n {
            Err(DecodeError::Truncated {
                needed: n,
                available: self.buf.remaining(),
            })
        } else {
            Ok(())
        }
    }

    /// Slices off the next `n` bytes into their own decoder, bounding
    /// any nested decode to exactly that sub-buffer.
    pub fn read_bounded(&mut self, n: usize) -> DecodeResult<ByteDecoder> {
        self.require(n)?;
        Ok(ByteDecoder::new(self.buf.split_to(n)))
    }

    pub fn read_bytes(&mut self, n: usize) -> DecodeResult<Bytes> {
        self.require(n)?;
        Ok(self.buf.split_to(n))
    }

    pub fn get_i8(&mut self) -> DecodeResult<i8> {
        self.require(1)?;
        Ok(self.buf.get_i8())
    }

    pub fn get_u8(&mut self) -> DecodeResult<u8> {
        self.require(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn get_bool(&mut self) -> DecodeResult<bool> {
        Ok(self.get_u8()? != 0)
    }

    pub fn get_i16(&mut self) -> DecodeResult<i16> {
        self.require(2)?;
        Ok(self.buf.get_i16())
    }

    pub fn get_i32(&mut self) -> DecodeResult<i32> {
        self.require(4)?;
        Ok(self.buf.get_i32())
    }

    pub fn get_u32(&mut self) -> DecodeResult<u32> {
        self.require(4)?;
        Ok(self.buf.get_u32())
    }

    pub fn get_i64(&mut self) -> DecodeResult<i64> {
        self.require(8)?;
        Ok(self.buf.get_i64())
    }

    pub fn get_uuid(&mut self) -> DecodeResult<Uuid> {
        self.require(16)?;
        let mut bytes = [0u8; 16];
        self.buf.copy_to_slice(&mut bytes);
        Ok(Uuid::from_bytes(bytes))
    }

    /// LEB128 unsigned varint, at most 5 bytes (32-bit range).
    pub fn get_unsigned_varint(&mut self) -> DecodeResult<u32> {
        let mut value: u32 = 0;
        for i in 0..5 {
            let byte = self.get_u8()?;
            value |= u32::from(byte & 0x7f) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(DecodeError::MalformedVarint)
    }

    /// Zigzag-encoded signed varint over a 32-bit value.
    pub fn get_varint(&mut self) -> DecodeResult<i32> {
        let encoded = self.get_unsigned_varlong_raw(5)?;
        Ok(((encoded >> 1) as i32) ^ -((encoded & 1) as i32))
    }

    /// Zigzag-encoded signed varint over a 64-bit value.
    pub fn get_varlong(&mut self) -> DecodeResult<i64> {
        let encoded = self.get_unsigned_varlong_raw(10)?;
        Ok(((encoded >> 1) as i64) ^ -((encoded & 1) as i64))
    }

    fn get_unsigned_varlong_raw(&mut self, max_bytes: usize) -> DecodeResult<u64> {
        let mut value: u64 = 0;
        for i in 0..max_bytes {
            let byte = self.get_u8()?;
            value |= u64::from(byte & 0x7f) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(DecodeError::MalformedVarint)
    }

    /// COMPACT_STRING: length is `uvarint - 1`; a zero uvarint is a
    /// protocol violation for a field documented as non-nullable.
    pub fn get_compact_string(&mut self) -> DecodeResult<String> {
        match self.get_compact_nullable_string()? {
            Some(s) => Ok(s),
            None => Err(DecodeError::UnexpectedNullString),
        }
    }

    /// COMPACT_NULLABLE_STRING: zero uvarint means null.
    pub fn get_compact_nullable_string(&mut self) -> DecodeResult<Option<String>> {
        let len = self.get_unsigned_varint()?;
        if len == 0 {
            return Ok(None);
        }
        let bytes = self.read_bytes(len as usize - 1)?;
        Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// NULLABLE_STRING: INT16 length, -1 means null.
    pub fn get_nullable_string(&mut self) -> DecodeResult<Option<String>> {
        let len = self.get_i16()?;
        if len < 0 {
            return Ok(None);
        }
        let bytes = self.read_bytes(len as usize)?;
        Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// COMPACT_BYTES / COMPACT_NULLABLE_BYTES: uvarint `len + 1`, 0 is null.
    pub fn get_compact_nullable_bytes(&mut self) -> DecodeResult<Option<Bytes>> {
        let len = self.get_unsigned_varint()?;
        if len == 0 {
            return Ok(None);
        }
        Ok(Some(self.read_bytes(len as usize - 1)?))
    }

    /// TAGGED_FIELDS: exactly one 0x00 byte in this server, since no
    /// tags are ever sent or expected.
    pub fn get_tagged_fields(&mut self) -> DecodeResult<()> {
        let byte = self.get_u8()?;
        if byte != 0 {
            return Err(DecodeError::UnsupportedTaggedFields(byte));
        }
        Ok(())
    }

    /// COMPACT_ARRAY[T]: uvarint `N`; `N == 0` is null/empty, else
    /// decode `N - 1` elements with the given per-element decoder.
    pub fn get_compact_array<T>(
        &mut self,
        mut decode_elem: impl FnMut(&mut ByteDecoder) -> DecodeResult<T>,
    ) -> DecodeResult<Vec<T>> {
        let len = self.get_unsigned_varint()?;
        if len == 0 {
            return Ok(Vec::new());
        }
        let n = len as usize - 1;
        let mut items = Vec::with_capacity(n);
        for _ in 0..n {
            items.push(decode_elem(self)?);
        }
        Ok(items)
    }

    /// ARRAY(INT32 length, -1 = null).
    pub fn get_array<T>(
        &mut self,
        mut decode_elem: impl FnMut(&mut ByteDecoder) -> DecodeResult<T>,
    ) -> DecodeResult<Vec<T>> {
        let len = self.get_i32()?;
        if len < 0 {
            return Ok(Vec::new());
        }
        let n = len as usize;
        let mut items = Vec::with_capacity(n);
        for _ in 0..n {
            items.push(decode_elem(self)?);
        }
        Ok(items)
    }
}

/// Append-only byte writer capability.
pub struct ByteEncoder {
    buf: BytesMut,
}

impl Default for ByteEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteEncoder {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::new(),
        }
    }

    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn put_i8(&mut self, v: i8) {
        self.buf.put_i8(v);
    }

    pub fn put_u8(&mut self, v: u8) {
        self.buf.put_u8(v);
    }

    pub fn put_bool(&mut self, v: bool) {
        self.buf.put_u8(v as u8);
    }

    pub fn put_i16(&mut self, v: i16) {
        self.buf.put_i16(v);
    }

    pub fn put_i32(&mut self, v: i32) {
        self.buf.put_i32(v);
    }

    pub fn put_u32(&mut self, v: u32) {
        self.buf.put_u32(v);
    }

    pub fn put_i64(&mut self, v: i64) {
        self.buf.put_i64(v);
    }

    pub fn put_uuid(&mut self, v: &Uuid) {
        self.buf.extend_from_slice(v.as_bytes());
    }

    pub fn put_unsigned_varint(&mut self, mut v: u32) {
        loop {
            let byte = (v & 0x7f) as u8;
            v >>= 7;
            if v == 0 {
                self.buf.put_u8(byte);
                break;
            }
            self.buf.put_u8(byte | 0x80);
        }
    }

    pub fn put_compact_string(&mut self, s: &str) {
        self.put_unsigned_varint(s.len() as u32 + 1);
        self.buf.extend_from_slice(s.as_bytes());
    }

    pub fn put_nullable_string(&mut self, s: Option<&str>) {
        match s {
            None => self.put_i16(-1),
            Some(s) => {
                self.put_i16(s.len() as i16);
                self.buf.extend_from_slice(s.as_bytes());
            }
        }
    }

    pub fn put_compact_nullable_bytes(&mut self, bytes: Option<&[u8]>) {
        match bytes {
            None => self.put_unsigned_varint(0),
            Some(b) => {
                self.put_unsigned_varint(b.len() as u32 + 1);
                self.buf.extend_from_slice(b);
            }
        }
    }

    /// Raw byte-length-prefixed payload: uvarint byte count followed by
    /// the bytes verbatim (used for Fetch's COMPACT_RECORDS encoding,
    /// which is length-in-bytes, not length-in-elements).
    pub fn put_compact_raw_bytes(&mut self, bytes: &[u8]) {
        self.put_unsigned_varint(bytes.len() as u32);
        self.buf.extend_from_slice(bytes);
    }

    pub fn put_tagged_fields(&mut self) {
        self.buf.put_u8(0);
    }

    pub fn put_compact_array<T>(&mut self, items: &[T], mut encode_elem: impl FnMut(&mut Self, &T)) {
        self.put_unsigned_varint(items.len() as u32 + 1);
        for item in items {
            encode_elem(self, item);
        }
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }
}
