/*!
A positional reader over a record buffer.

All multi-byte reads are big-endian, as everything in the record framing
is. The buffer can be swapped mid-parse ([`Cursor::replace`]) when the
compressed remainder of a record is inflated; extracted fields must
therefore be copied out before the swap, which the record parser does.
*/

use crate::error::Error;
use std::borrow::Cow;

pub struct Cursor<'a> {
    data: Cow<'a, [u8]>,
    offset: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data: Cow::Borrowed(data),
            offset: 0,
        }
    }

    fn take(&mut self, len: usize) -> Result<&[u8], Error> {
        let have = self.remaining();
        if len > have {
            return Err(Error::Truncated { need: len, have });
        }
        let start = self.offset;
        self.offset += len;
        Ok(&self.data[start..self.offset])
    }

    pub fn read_u8(&mut self) -> Result<u8, Error> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u32(&mut self) -> Result<u32, Error> {
        Ok(u32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }

    /// One byte: zero is `false`, anything else is `true`.
    pub fn read_bool(&mut self) -> Result<bool, Error> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&[u8], Error> {
        self.take(len)
    }

    /// Reads a `u32` length prefix followed by that many bytes.
    pub fn read_blob(&mut self) -> Result<&[u8], Error> {
        let len = self.read_u32()? as usize;
        self.take(len)
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// The bytes from the current offset to the end, without advancing.
    pub fn tail(&self) -> &[u8] {
        &self.data[self.offset..]
    }

    /// Swaps the underlying buffer and rewinds to its start.
    pub fn replace(&mut self, data: Vec<u8>) {
        self.data = Cow::Owned(data);
        self.offset = 0;
    }
}
