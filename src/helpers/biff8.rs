//! BIFF8 record reader for the `Workbook` stream of Excel 97-2003 files.
//!
//! A record is `type: u16, size: u16, data`. Records longer than 8224 bytes
//! spill into `CONTINUE` records, which are stitched together transparently.
use crate::error::SheetOutlineError;
use crate::helpers::bytes::le_u16;
use encoding_rs::UTF_16LE;
use thiserror::Error;

const CONTINUE: u16 = 0x003C;

#[derive(Error, Debug)]
pub enum Biff8Error {
    #[error("Record truncated: fewer than {0} bytes remaining")]
    NoEnoughDataError(usize),
}

pub(crate) struct Biff8Reader {
    buffer: Vec<u8>,
    /// Start of the next record header
    pointer: usize,
    /// `(start, end)` of the current record and its continuations
    chunks: Vec<(usize, usize)>,
    index: usize,
    offset: usize,
}

impl Biff8Reader {
    pub(crate) fn new(buffer: Vec<u8>) -> Biff8Reader {
        Biff8Reader {
            buffer,
            pointer: 0,
            chunks: Vec::new(),
            index: 0,
            offset: 0,
        }
    }

    /// Moves to the next record and returns its type, `None` at the end of the stream.
    pub(crate) fn next(&mut self) -> Result<Option<u16>, SheetOutlineError> {
        let Some((kind, lower, upper)) = self.record_at(self.pointer)? else {
            return Ok(None);
        };
        self.index = 0;
        self.offset = 0;
        self.chunks.clear();
        self.chunks.push((lower, upper));
        self.pointer = upper;
        while let Some((CONTINUE, lower, upper)) = self.record_at(self.pointer)? {
            self.chunks.push((lower, upper));
            self.pointer = upper;
        }
        Ok(Some(kind))
    }

    fn record_at(&self, pointer: usize) -> Result<Option<(u16, usize, usize)>, SheetOutlineError> {
        let (Some(kind), Some(size)) = (le_u16(&self.buffer, pointer), le_u16(&self.buffer, pointer + 2)) else {
            return Ok(None);
        };
        let lower = pointer + 4;
        let upper = lower + size as usize;
        if upper > self.buffer.len() {
            Err(Biff8Error::NoEnoughDataError(size as usize))?
        }
        Ok(Some((kind, lower, upper)))
    }

    /// Positions the reader at a stream offset, such as a sheet's `BOF`.
    pub(crate) fn goto(&mut self, pointer: usize) {
        self.pointer = pointer;
        self.chunks.clear();
    }

    /// Reads up to `length` bytes, never crossing the end of the current chunk.
    fn read(&mut self, length: usize) -> &[u8] {
        while let Some((lower, upper)) = self.chunks.get(self.index).copied() {
            let source = lower + self.offset;
            if source >= upper {
                self.index += 1;
                self.offset = 0;
                continue;
            }
            let target = upper.min(source + length);
            if target == upper {
                self.index += 1;
                self.offset = 0;
            } else {
                self.offset += target - source;
            }
            return &self.buffer[source..target];
        }
        &[]
    }

    /// Reads exactly `N` bytes, crossing into a continuation chunk if needed.
    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], SheetOutlineError> {
        let mut array = [0u8; N];
        let mut filled = 0;
        while filled < N {
            let bytes = self.read(N - filled);
            if bytes.is_empty() {
                Err(Biff8Error::NoEnoughDataError(N))?
            }
            array[filled..filled + bytes.len()].copy_from_slice(bytes);
            filled += bytes.len();
        }
        Ok(array)
    }

    pub(crate) fn skip(&mut self, length: usize) -> Result<(), SheetOutlineError> {
        let mut remaining = length;
        while remaining > 0 {
            let skipped = self.read(remaining).len();
            if skipped == 0 {
                Err(Biff8Error::NoEnoughDataError(length))?
            }
            remaining -= skipped;
        }
        Ok(())
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, SheetOutlineError> {
        self.read_array::<1>().map(|[byte]| byte)
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, SheetOutlineError> {
        self.read_array().map(u16::from_le_bytes)
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, SheetOutlineError> {
        self.read_array().map(u32::from_le_bytes)
    }

    pub(crate) fn read_usize(&mut self) -> Result<usize, SheetOutlineError> {
        self.read_u32().map(|value| value as usize)
    }

    pub(crate) fn read_u64(&mut self) -> Result<u64, SheetOutlineError> {
        self.read_array().map(u64::from_le_bytes)
    }

    pub(crate) fn read_f64(&mut self) -> Result<f64, SheetOutlineError> {
        self.read_array().map(f64::from_le_bytes)
    }

    /// The `u16` ending `offset` bytes before the end of the current record.
    pub(crate) fn get_u16_back(&self, offset: usize) -> Result<u16, SheetOutlineError> {
        let (_, upper) = self.chunks.last().copied().ok_or(Biff8Error::NoEnoughDataError(offset))?;
        upper
            .checked_sub(offset)
            .and_then(|position| le_u16(&self.buffer, position))
            .ok_or_else(|| Biff8Error::NoEnoughDataError(offset).into())
    }

    /// Reads an RK value: a 30-bit integer or the high 30 bits of a double,
    /// optionally divided by 100.
    pub(crate) fn read_rk_number(&mut self) -> Result<String, SheetOutlineError> {
        let value = self.read_u32()?;
        let is_percentage = (value & 0x01) != 0;
        let is_integer = (value & 0x02) != 0;
        let number = if is_integer {
            ((value as i32) >> 2) as f64
        } else {
            f64::from_bits(((value & 0xFFFF_FFFC) as u64) << 32)
        };
        Ok(match (is_integer, is_percentage) {
            (true, false) => ((value as i32) >> 2).to_string(),
            (_, true) => (number / 100.0).to_string(),
            (false, false) => number.to_string(),
        })
    }

    /// `ShortXLUnicodeString`: one byte of character count.
    pub(crate) fn read_short_xl_unicode_string(&mut self) -> Result<String, SheetOutlineError> {
        let chars = self.read_u8()? as usize;
        self.read_string(chars, false)
    }

    /// `XLUnicodeString`: two bytes of character count.
    pub(crate) fn read_xl_unicode_string(&mut self) -> Result<String, SheetOutlineError> {
        let chars = self.read_u16()? as usize;
        self.read_string(chars, false)
    }

    /// `XLUnicodeRichExtendedString` as stored in the shared string table.
    /// Formatting runs and phonetic data are skipped.
    pub(crate) fn read_xl_unicode_rich_extended_string(&mut self) -> Result<String, SheetOutlineError> {
        let chars = self.read_u16()? as usize;
        self.read_string(chars, true)
    }

    fn read_string(&mut self, chars: usize, is_extended: bool) -> Result<String, SheetOutlineError> {
        let flags = self.read_u8()?;
        let runs = if is_extended && (flags & 0x08) != 0 { self.read_u16()? as usize } else { 0 };
        let phonetic_size = if is_extended && (flags & 0x04) != 0 { self.read_usize()? } else { 0 };

        let mut string = String::with_capacity(chars);
        let mut remaining = chars - self.read_characters(chars, (flags & 0x01) != 0, &mut string);
        while remaining > 0 {
            // A string split by CONTINUE restarts with a fresh option byte.
            let flags = self.read_u8()?;
            let read = self.read_characters(remaining, (flags & 0x01) != 0, &mut string);
            if read == 0 {
                Err(Biff8Error::NoEnoughDataError(remaining))?
            }
            remaining -= read;
        }
        self.skip(4 * runs)?;
        self.skip(phonetic_size)?;
        Ok(string)
    }

    /// Appends at most `chars` characters of the current chunk to `content`
    /// and returns how many were read.
    fn read_characters(&mut self, chars: usize, is_high_byte: bool, content: &mut String) -> usize {
        if is_high_byte {
            let bytes = self.read(chars * 2);
            let (text, _) = UTF_16LE.decode_without_bom_handling(bytes);
            content.push_str(&text);
            bytes.len() / 2
        } else {
            // Compressed strings hold the low byte of each UTF-16 unit.
            let bytes = self.read(chars);
            content.extend(bytes.iter().map(|byte| char::from(*byte)));
            bytes.len()
        }
    }
}

/// Loops over the records of a BIFF8 stream until an arm breaks or the stream
/// ends; unmatched record types are skipped.
#[macro_export]
macro_rules! match_biff8_record {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(kind) = $reader.next()? {
            match kind {
                $($arms)*
                _ => (),
            }
        }
    };
}
