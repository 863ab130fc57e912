/*!
The decoded replication record and its parser.

A record blob carries, in order: an empty-queue marker, a delete flag (and
tombstone clock), a CRC over everything that follows it, a compression
flag, the bucket type / bucket / key, and then the embedded v1 object —
magic and version bytes, vector clocks, and the sibling loop. When the
compression flag is set, everything from the object magic onwards is a
zlib stream; the CRC is validated over the still-compressed bytes before
inflation.
*/

use crate::{
    cursor::Cursor,
    error::Error,
    vclock::{Format, VectorClocks},
};
use base64::prelude::*;
use flate2::read::ZlibDecoder;
use replsink_eterm::decode as eterm;
use std::io::Read;

/// Sentinel identifying an on-disk Riak object.
const OBJECT_MAGIC: u8 = 53;
/// The only object version this decoder understands.
const OBJECT_VERSION: u8 = 1;

/// CRC-32 with the zlib polynomial, covering every byte after the stored
/// checksum field.
const CRC32: crc::Crc<u32> = crc::Crc::<u32>::new(&crc::CRC_32_ISO_HDLC);

/// A value or metadata payload.
///
/// Each payload opens with a discriminator byte that is counted in the
/// declared length: non-zero means the remaining bytes are opaque,
/// zero means they are an encoded Erlang term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Binary(Box<[u8]>),
    Term(eterm::Term),
}

impl Value {
    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(b) => Some(b),
            _ => None,
        }
    }
}

/// A single decoded replication record.
///
/// Constructed only by [`Record::parse`]; a failed parse exposes no
/// partial record. Fields not reached by a given record shape (an empty
/// marker, or a head-only delete) keep their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    /// `true` for the marker returned when the queue has nothing to
    /// replicate; every other field keeps its default.
    pub empty: bool,
    /// The checksum stored in the record, validated during parsing.
    pub crc: u32,
    pub is_delete: bool,
    /// Tombstone clock accompanying a delete, base64 encoded.
    pub tomb_clock: Option<String>,
    pub compressed: bool,
    pub bucket_type: Option<Box<[u8]>>,
    pub bucket: Option<Box<[u8]>>,
    pub key: Option<Box<[u8]>>,
    pub vector_clocks: Option<VectorClocks>,
    pub siblings_count: u32,
    /// `true` when the value carries nothing beyond its discriminator
    /// byte, as deletes do.
    pub head_only: bool,
    pub value: Option<Value>,
    /// Modification time in the source's textual form: megaseconds and
    /// seconds concatenated, then `.micros`.
    pub last_modified: Option<String>,
    pub vtag: Option<Box<[u8]>>,
    pub key_deleted: bool,
    /// Metadata pairs in record order; keys may repeat.
    pub metadata: Vec<(Value, Value)>,
}

impl Record {
    /// Decodes one record fetched from the replication queue.
    ///
    /// The blob must be fully buffered; a successful parse consumes it
    /// exactly.
    pub fn parse(data: &[u8], format: Format) -> Result<Self, Error> {
        Parser::new(data, format).parse()
    }

    /// `true` when the metadata block contains this exact key/value pair,
    /// with both sides carried as plain bytes.
    pub fn has_metadata(&self, key: &[u8], value: &[u8]) -> bool {
        self.metadata
            .iter()
            .any(|(k, v)| k.as_binary() == Some(key) && v.as_binary() == Some(value))
    }
}

/// The record parse, one method per field.
///
/// Methods run in the fixed order of [`Parser::parse`] and each consumes
/// its bytes from the cursor. Owned copies are taken as fields are
/// extracted, because decompression replaces the cursor's buffer
/// mid-parse.
struct Parser<'a> {
    cursor: Cursor<'a>,
    format: Format,
    record: Record,
}

impl<'a> Parser<'a> {
    fn new(data: &'a [u8], format: Format) -> Self {
        Self {
            cursor: Cursor::new(data),
            format,
            record: Record::default(),
        }
    }

    fn parse(mut self) -> Result<Record, Error> {
        if !self.cursor.read_bool()? {
            self.record.empty = true;
            return Ok(self.record);
        }

        self.record.is_delete = self.cursor.read_bool()?;
        if self.record.is_delete {
            self.tomb_clock()?;
        }

        self.checksum()?;
        self.compression_flag()?;
        self.record.bucket_type = self.field()?;
        self.record.bucket = self.field()?;
        self.record.key = self.field()?;

        if self.record.compressed {
            self.decompress()?;
        }

        self.magic()?;
        self.vector_clocks()?;
        self.siblings()?;
        for _ in 0..self.record.siblings_count {
            self.value()?;
            self.metadata()?;
        }

        match self.cursor.remaining() {
            0 => Ok(self.record),
            extra => Err(Error::TrailingBytes(extra)),
        }
    }

    fn tomb_clock(&mut self) -> Result<(), Error> {
        let clock = self.cursor.read_blob()?;
        if !clock.is_empty() {
            self.record.tomb_clock = Some(BASE64_STANDARD.encode(clock));
        }
        Ok(())
    }

    fn checksum(&mut self) -> Result<(), Error> {
        let stored = self.cursor.read_u32()?;
        // Over the remainder as stored, before any decompression
        let computed = CRC32.checksum(self.cursor.tail());
        if stored != computed {
            return Err(Error::InvalidChecksum { stored, computed });
        }
        self.record.crc = stored;
        Ok(())
    }

    fn compression_flag(&mut self) -> Result<(), Error> {
        self.record.compressed = match self.cursor.read_u8()? {
            16 => false,
            24 => true,
            flag => return Err(Error::InvalidCompressionFlag(flag)),
        };
        Ok(())
    }

    fn field(&mut self) -> Result<Option<Box<[u8]>>, Error> {
        let field = self.cursor.read_blob()?;
        Ok((!field.is_empty()).then(|| field.to_vec().into()))
    }

    fn decompress(&mut self) -> Result<(), Error> {
        let mut inflated = Vec::new();
        ZlibDecoder::new(self.cursor.tail())
            .read_to_end(&mut inflated)
            .map_err(Error::DecompressionFailed)?;
        self.cursor.replace(inflated);
        Ok(())
    }

    fn magic(&mut self) -> Result<(), Error> {
        let magic = self.cursor.read_u8()?;
        if magic != OBJECT_MAGIC {
            return Err(Error::InvalidMagic(magic));
        }
        let version = self.cursor.read_u8()?;
        if version != OBJECT_VERSION {
            return Err(Error::UnsupportedVersion(version));
        }
        Ok(())
    }

    fn vector_clocks(&mut self) -> Result<(), Error> {
        let format = self.format;
        let clocks = self.cursor.read_blob()?;
        if !clocks.is_empty() {
            self.record.vector_clocks = Some(VectorClocks::parse(clocks, format)?);
        }
        Ok(())
    }

    fn siblings(&mut self) -> Result<(), Error> {
        self.record.siblings_count = self.cursor.read_u32()?;
        if self.record.siblings_count != 1 {
            return Err(Error::TooManySiblings(self.record.siblings_count));
        }
        Ok(())
    }

    /// Reads a discriminator byte plus `gross - 1` payload bytes.
    fn maybe_binary(&mut self, gross: usize) -> Result<Value, Error> {
        let Some(len) = gross.checked_sub(1) else {
            // The declared length must cover the discriminator byte
            return Err(Error::Truncated { need: 1, have: 0 });
        };
        let is_binary = self.cursor.read_bool()?;
        let payload = self.cursor.read_bytes(len)?;
        if is_binary {
            Ok(Value::Binary(payload.to_vec().into()))
        } else {
            Ok(Value::Term(eterm::parse(payload)?))
        }
    }

    fn value(&mut self) -> Result<(), Error> {
        let gross = self.cursor.read_u32()? as usize;
        if gross == 1 {
            self.record.head_only = true;
        }
        self.record.value = Some(self.maybe_binary(gross)?);
        Ok(())
    }

    fn metadata(&mut self) -> Result<(), Error> {
        let len = self.cursor.read_u32()? as usize;
        let have = self.cursor.remaining();
        // Remaining-byte watermark where the declared block ends
        let Some(block_end) = have.checked_sub(len) else {
            return Err(Error::Truncated { need: len, have });
        };

        let mega = self.cursor.read_u32()?;
        let secs = self.cursor.read_u32()?;
        let micro = self.cursor.read_u32()?;
        // Textual concatenation, not arithmetic: downstream ordering
        // compares this exact string form
        self.record.last_modified = Some(format!("{mega}{secs}.{micro}"));

        let vtag_len = self.cursor.read_u8()? as usize;
        self.record.vtag = Some(self.cursor.read_bytes(vtag_len)?.to_vec().into());

        self.record.key_deleted = self.cursor.read_bool()?;

        while self.cursor.remaining() > block_end {
            let gross = self.cursor.read_u32()? as usize;
            let key = self.maybe_binary(gross)?;
            let gross = self.cursor.read_u32()? as usize;
            let value = self.maybe_binary(gross)?;
            self.record.metadata.push((key, value));
        }

        if self.cursor.remaining() < block_end {
            return Err(Error::MetadataOverrun(block_end - self.cursor.remaining()));
        }
        Ok(())
    }
}
