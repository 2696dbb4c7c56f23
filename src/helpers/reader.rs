use crate::error::GradeStatsError;
use std::fs::File;
use std::io::BufReader;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use std::path::Path;

/// Seekable byte source behind a workbook: a file on disk or an uploaded
/// buffer already held in memory.
pub(crate) enum SourceReader {
    File(BufReader<File>),
    Memory(Cursor<Vec<u8>>),
}

impl SourceReader {
    pub(crate) fn open(path: &Path) -> Result<SourceReader, GradeStatsError> {
        let file = File::open(path)?;
        Ok(SourceReader::File(BufReader::new(file)))
    }

    pub(crate) fn from_bytes(bytes: Vec<u8>) -> SourceReader {
        SourceReader::Memory(Cursor::new(bytes))
    }
}

impl Read for SourceReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            SourceReader::File(reader) => reader.read(buf),
            SourceReader::Memory(reader) => reader.read(buf),
        }
    }
}

impl Seek for SourceReader {
    fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
        match self {
            SourceReader::File(reader) => reader.seek(pos),
            SourceReader::Memory(reader) => reader.seek(pos),
        }
    }
}
