//! Record reader for the BIFF8 stream of Excel 97-2003 (.xls) workbooks.
//! CONTINUE records are stitched onto the record they extend, so callers read
//! a logical record as one sequence of bytes.

use crate::error::GradeStatsError;
use crate::helpers::string::to_f64;
use crate::helpers::string::to_u16;
use crate::helpers::string::to_u32;
use crate::helpers::string::to_u64;
use crate::helpers::string::to_usize;
use encoding_rs::UTF_16LE;
use thiserror::Error;

const CONTINUE: u16 = 60;
const RECORD_HEADER_SIZE: usize = 4;

/// Errors specific to BIFF8 record parsing
#[derive(Error, Debug)]
pub enum Biff8Error {
    #[error("Fewer than {0} bytes remaining")]
    NoEnoughDataError(usize),

    #[error("Record at offset {0} runs past the end of the stream")]
    TruncatedRecordError(usize),
}

pub(crate) struct Biff8Reader {
    buffer: Vec<u8>,
    /// Offset of the next record header
    pointer: usize,
    /// Byte ranges of the current record and its CONTINUE records
    chunks: Vec<(usize, usize)>,
    index: usize,
    offset: usize,
}

impl Biff8Reader {
    pub(crate) fn new(data: Vec<u8>) -> Biff8Reader {
        Biff8Reader {
            buffer: data,
            pointer: 0,
            chunks: Vec::new(),
            index: 0,
            offset: 0,
        }
    }

    /// Advances to the next record and returns its type, or `None` at the end
    /// of the stream.
    pub(crate) fn next(&mut self) -> Result<Option<u16>, GradeStatsError> {
        if self.pointer + RECORD_HEADER_SIZE > self.buffer.len() {
            return Ok(None);
        }
        self.index = 0;
        self.offset = 0;
        self.chunks.clear();

        let kind = self.get_u16_at(self.pointer)?;
        self.push_chunk()?;
        while self.pointer + RECORD_HEADER_SIZE <= self.buffer.len() && self.get_u16_at(self.pointer)? == CONTINUE {
            self.push_chunk()?;
        }
        Ok(Some(kind))
    }

    /// Registers the record body at `pointer` and moves past it.
    fn push_chunk(&mut self) -> Result<(), GradeStatsError> {
        let size = self.get_u16_at(self.pointer + 2)? as usize;
        let lower = self.pointer + RECORD_HEADER_SIZE;
        let upper = lower + size;
        if upper > self.buffer.len() {
            Err(Biff8Error::TruncatedRecordError(self.pointer))?;
        }
        self.chunks.push((lower, upper));
        self.pointer = upper;
        Ok(())
    }

    /// Moves the reader to an absolute stream offset (e.g. a worksheet BOF).
    pub(crate) fn goto(&mut self, pointer: usize) {
        self.pointer = pointer;
        self.chunks.clear();
    }

    /// Reads exactly `length` bytes of the current chunk.
    fn read_exact(&mut self, length: usize) -> Result<&[u8], GradeStatsError> {
        let (data, size) = self.read(length);
        if size == length {
            Ok(data)
        } else {
            Err(Biff8Error::NoEnoughDataError(length))?
        }
    }

    /// Reads up to `length` bytes without crossing into the next chunk.
    fn read(&mut self, length: usize) -> (&[u8], usize) {
        let Some((lower, upper)) = self.chunks.get(self.index).copied() else {
            return (&[], 0);
        };
        let source = upper.min(lower + self.offset);
        let target = upper.min(source + length);
        if source >= upper {
            return (&[], 0);
        }
        if target == upper {
            self.index += 1;
            self.offset = 0;
        } else {
            self.offset += target - source;
        }
        (&self.buffer[source..target], target - source)
    }

    pub(crate) fn skip(&mut self, length: usize) -> Result<(), GradeStatsError> {
        if length > 0 {
            self.read_exact(length)?;
        }
        Ok(())
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, GradeStatsError> {
        self.read_exact(1).map(|data| data[0])
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, GradeStatsError> {
        self.read_exact(2).map(to_u16)
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, GradeStatsError> {
        self.read_exact(4).map(to_u32)
    }

    pub(crate) fn read_usize(&mut self) -> Result<usize, GradeStatsError> {
        self.read_exact(4).map(to_usize)
    }

    pub(crate) fn read_u64(&mut self) -> Result<u64, GradeStatsError> {
        self.read_exact(8).map(to_u64)
    }

    pub(crate) fn read_f64(&mut self) -> Result<f64, GradeStatsError> {
        self.read_exact(8).map(to_f64)
    }

    /// Reads the `u16` that ends `offset` bytes before the end of the record.
    pub(crate) fn get_u16_back(&self, offset: usize) -> Result<u16, GradeStatsError> {
        let mut offset = offset;
        for (lower, upper) in self.chunks.iter().rev() {
            if *lower + offset <= *upper {
                return self.get_u16_at(*upper - offset);
            }
            offset -= *upper - *lower;
        }
        Err(Biff8Error::NoEnoughDataError(2))?
    }

    fn get_u16_at(&self, index: usize) -> Result<u16, GradeStatsError> {
        if index + 2 <= self.buffer.len() {
            Ok(to_u16(&self.buffer[index..index + 2]))
        } else {
            Err(Biff8Error::NoEnoughDataError(2))?
        }
    }

    /// Decodes an RK value: a 30-bit integer or the high bits of a double,
    /// optionally divided by 100.
    pub(crate) fn read_rk_number(&mut self) -> Result<f64, GradeStatsError> {
        Ok(decode_rk(self.read_u32()?))
    }

    /// ShortXLUnicodeString: 1 byte length prefix.
    pub(crate) fn read_short_xl_unicode_string(&mut self) -> Result<String, GradeStatsError> {
        let mut string = String::new();
        let chars = self.read_u8()? as usize;
        self.read_string_into(chars, false, &mut string)?;
        Ok(string)
    }

    /// XLUnicodeString: 2 byte length prefix.
    pub(crate) fn read_xl_unicode_string(&mut self) -> Result<String, GradeStatsError> {
        let mut string = String::new();
        let chars = self.read_u16()? as usize;
        self.read_string_into(chars, false, &mut string)?;
        Ok(string)
    }

    /// XLUnicodeRichExtendedString, as stored in the shared string table. The
    /// characters may continue in the next CONTINUE record, which starts with
    /// a fresh option byte.
    pub(crate) fn read_xl_unicode_rich_extended_string(&mut self) -> Result<String, GradeStatsError> {
        let mut string = String::new();
        let mut expected = self.read_u16()? as usize;
        let mut actual = self.read_string_into(expected, true, &mut string)?;
        while actual < expected {
            expected -= actual;
            actual = self.read_string_into(expected, false, &mut string)?;
            if actual == 0 {
                Err(Biff8Error::NoEnoughDataError(expected))?;
            }
        }
        Ok(string)
    }

    /// Appends up to `chars` characters and returns how many were read before
    /// the current chunk ended.
    fn read_string_into(&mut self, chars: usize, is_extended: bool, content: &mut String) -> Result<usize, GradeStatsError> {
        let flag = self.read_u8()?;
        let is_high_byte = (flag & 0x1) > 0;
        let rich_runs = if is_extended && (flag & 0x8) > 0 {
            self.read_u16()? as usize
        } else {
            0
        };
        let phonetic_size = if is_extended && (flag & 0x4) > 0 {
            self.read_usize()?
        } else {
            0
        };
        let expected = if is_high_byte { chars << 1 } else { chars };
        let (bytes, actual) = self.read(expected);
        if is_high_byte {
            let (string, _, _) = UTF_16LE.decode(bytes);
            content.push_str(&string);
        } else {
            // Compressed characters are UTF-16 code units with a zero high byte
            content.extend(bytes.iter().map(|byte| char::from(*byte)));
        }
        self.skip(4 * rich_runs)?;
        self.skip(phonetic_size)?;
        Ok(if is_high_byte { actual >> 1 } else { actual })
    }
}

fn decode_rk(value: u32) -> f64 {
    let is_percentage = (value & 0x01) != 0;
    let is_integer = (value & 0x02) != 0;
    let number = if is_integer {
        ((value as i32) >> 2) as f64
    } else {
        f64::from_bits(((value & 0xFFFF_FFFC) as u64) << 32)
    };
    if is_percentage {
        number / 100.0
    } else {
        number
    }
}

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

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: u16, body: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&kind.to_le_bytes());
        bytes.extend_from_slice(&(body.len() as u16).to_le_bytes());
        bytes.extend_from_slice(body);
        bytes
    }

    #[test]
    fn rk_numbers() {
        // Integer 3, stored shifted with the integer flag
        assert_eq!(decode_rk((3 << 2) | 0x02), 3.0);
        // Integer 1234 divided by 100
        assert_eq!(decode_rk((1234 << 2) | 0x03), 12.34);
        // Negative integer
        assert_eq!(decode_rk(((-5i32 << 2) as u32) | 0x02), -5.0);
        // Double 2.5 keeps its high 30 bits
        let bits = (2.5f64.to_bits() >> 32) as u32;
        assert_eq!(decode_rk(bits & 0xFFFF_FFFC), 2.5);
    }

    #[test]
    fn iterates_records_and_stops_at_end() {
        let mut data = record(0x0809, &[0u8; 4]);
        data.extend(record(0x000A, &[]));
        let mut reader = Biff8Reader::new(data);
        assert_eq!(reader.next().unwrap(), Some(0x0809));
        assert_eq!(reader.next().unwrap(), Some(0x000A));
        assert_eq!(reader.next().unwrap(), None);
    }

    #[test]
    fn continue_records_extend_strings() {
        // "Muito" in the first record, " Bom" (high byte) in a CONTINUE record
        let mut body = Vec::new();
        body.extend_from_slice(&9u16.to_le_bytes());
        body.push(0x00);
        body.extend_from_slice(b"Muito");
        let mut data = record(252, &body);
        let mut tail = vec![0x01];
        for unit in " Bom".encode_utf16() {
            tail.extend_from_slice(&unit.to_le_bytes());
        }
        data.extend(record(CONTINUE, &tail));

        let mut reader = Biff8Reader::new(data);
        assert_eq!(reader.next().unwrap(), Some(252));
        assert_eq!(reader.read_xl_unicode_rich_extended_string().unwrap(), "Muito Bom");
    }

    #[test]
    fn truncated_record_is_an_error() {
        let mut data = record(0x0203, &[0u8; 14]);
        data.truncate(10);
        let mut reader = Biff8Reader::new(data);
        assert!(matches!(
            reader.next(),
            Err(GradeStatsError::Biff8HelperError(Biff8Error::TruncatedRecordError(0)))
        ));
    }

    #[test]
    fn reads_from_the_back_of_a_record() {
        let data = record(189, &[1, 0, 2, 0, 9, 9, 7, 0]);
        let mut reader = Biff8Reader::new(data);
        reader.next().unwrap();
        assert_eq!(reader.get_u16_back(2).unwrap(), 7);
        assert_eq!(reader.read_u16().unwrap(), 1);
    }
}
