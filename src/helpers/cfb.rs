//! OLE Compound File Binary (CFB) reader for legacy Excel (.xls) workbooks.
//! The whole container is loaded into memory and streams are rebuilt by
//! following their sector chains.

use crate::error::GradeStatsError;
use crate::helpers::string::to_u16;
use crate::helpers::string::to_u32;
use crate::helpers::string::to_u64;
use crate::helpers::string::to_usize;
use crate::helpers::string::to_usize_iter;
use encoding_rs::UTF_16LE;
use std::collections::HashMap;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use thiserror::Error;
use tracing::debug;

/// Sector ids from this value on are markers (free, end of chain, FAT, DIFAT).
const FIRST_MARKER_SECT: usize = 0xFFFF_FFFB;
const SIGNATURE: u64 = 0xE11A_B1A1_E011_CFD0;
const HEADER_SIZE: usize = 512;
const DIRECTORY_ENTRY_SIZE: usize = 128;
const MINI_SECTOR_SIZE: usize = 64;

/// Errors specific to Compound File Binary parsing
#[derive(Error, Debug)]
pub enum CfbError {
    #[error("The file is corrupted or has an invalid CFB structure")]
    FileFormatError,

    #[error("Invalid OLE signature (not an office document?)")]
    OleSignatureError,

    #[error("Invalid Sector size '2 ^ {1}' for major version '{0}'")]
    SectorSizeError(u16, u16),

    #[error("Sector '{0}' is outside of the file")]
    SectorOutOfRangeError(usize),

    #[error("Sector chain starting at '{0}' never ends")]
    SectorChainLoopError(usize),

    #[error("The number of file allocation table sectors is wrong: expect '{0}', actual '{1}'")]
    FileAllocationTableError(usize, usize),

    #[error("Empty Root directory")]
    RootDirectoryError,
}

/// An OLE container with its allocation tables and stream directory.
pub(crate) struct Cfb {
    directories: HashMap<String, Directory>,
    file_allocation_table: Vec<usize>,
    sectors: Sectors,
    mini_file_allocation_table: Vec<usize>,
    mini_sectors: Sectors,
    /// Streams smaller than this live in the mini stream
    mini_stream_cutoff: usize,
}

impl Cfb {
    /// Loads and indexes the container behind `reader`.
    pub(crate) fn new<RS: Read + Seek>(reader: &mut RS) -> Result<Cfb, GradeStatsError> {
        let size = reader.seek(SeekFrom::End(0))? as usize;
        if size < HEADER_SIZE {
            Err(CfbError::FileFormatError)?;
        }
        reader.seek(SeekFrom::Start(0))?;
        let mut data = vec![0u8; size];
        reader.read_exact(&mut data)?;
        reader.seek(SeekFrom::Start(0))?;

        let header = Header::new(&data[..HEADER_SIZE])?;
        let sectors = Sectors { data, size: header.sector_size()?, skip: 1 };
        let file_allocation_table = Self::load_file_allocation_table(&sectors, &header)?;
        let directories = Self::load_directories(&file_allocation_table, &sectors, &header)?;
        let mini_file_allocation_table = if header.mini_file_allocation_table_count > 0 {
            let bytes = read_chain(&file_allocation_table, &sectors, header.mini_file_allocation_table_start)?;
            to_usize_iter(&bytes).collect()
        } else {
            Vec::new()
        };
        let mini_sectors = match directories.get("Root Entry") {
            Some(root) => {
                let mut data = read_chain(&file_allocation_table, &sectors, root.start)?;
                data.truncate(root.size);
                Sectors { data, size: MINI_SECTOR_SIZE, skip: 0 }
            }
            None => Sectors { data: Vec::new(), size: MINI_SECTOR_SIZE, skip: 0 },
        };
        debug!(streams = directories.len(), "Loaded compound file directory");

        Ok(Cfb {
            directories,
            file_allocation_table,
            sectors,
            mini_file_allocation_table,
            mini_sectors,
            mini_stream_cutoff: header.mini_stream_cutoff,
        })
    }

    /// Checks if a stream exists in the container
    pub(crate) fn exists(&self, name: &str) -> bool {
        self.directories.contains_key(name)
    }

    /// Reads a whole stream, or `None` when the container has no such stream.
    pub(crate) fn read(&self, name: &str) -> Result<Option<Vec<u8>>, GradeStatsError> {
        let Some(directory) = self.directories.get(name) else {
            return Ok(None);
        };
        let mut bytes = if directory.size < self.mini_stream_cutoff {
            read_chain(&self.mini_file_allocation_table, &self.mini_sectors, directory.start)?
        } else {
            read_chain(&self.file_allocation_table, &self.sectors, directory.start)?
        };
        bytes.truncate(directory.size);
        Ok(Some(bytes))
    }

    /// Collects the FAT sector ids from the header DIFAT and the DIFAT sector
    /// chain, then concatenates those sectors.
    fn load_file_allocation_table(sectors: &Sectors, header: &Header) -> Result<Vec<usize>, GradeStatsError> {
        let mut sector_ids: Vec<usize> = to_usize_iter(&sectors.data[76..HEADER_SIZE]).collect();
        let mut index = header.double_indirect_start;
        let mut visited = 0usize;
        while index < FIRST_MARKER_SECT {
            let mut entries: Vec<usize> = to_usize_iter(sectors.get(index)?).collect();
            // The last entry of a DIFAT sector links to the next one
            index = entries.pop().ok_or(CfbError::FileFormatError)?;
            sector_ids.extend(entries);
            visited += 1;
            if visited > sectors.count() {
                Err(CfbError::SectorChainLoopError(header.double_indirect_start))?;
            }
        }

        let mut file_allocation_table = Vec::new();
        let mut count = 0usize;
        for index in sector_ids.into_iter().filter(|index| *index < FIRST_MARKER_SECT) {
            file_allocation_table.extend(to_usize_iter(sectors.get(index)?));
            count += 1;
        }
        if count != header.file_allocation_table_count {
            Err(CfbError::FileAllocationTableError(header.file_allocation_table_count, count))?
        }
        Ok(file_allocation_table)
    }

    fn load_directories(
        file_allocation_table: &[usize],
        sectors: &Sectors,
        header: &Header,
    ) -> Result<HashMap<String, Directory>, GradeStatsError> {
        let bytes = read_chain(file_allocation_table, sectors, header.directory_start)?;
        let directories: HashMap<String, Directory> = bytes
            .chunks_exact(DIRECTORY_ENTRY_SIZE)
            .filter_map(|entry| Directory::new(entry, header.major_version))
            .collect();
        if directories.is_empty() {
            Err(CfbError::RootDirectoryError)?
        }
        Ok(directories)
    }
}

/// Follows a sector chain through `table`, concatenating the sector bytes.
fn read_chain(table: &[usize], sectors: &Sectors, start: usize) -> Result<Vec<u8>, GradeStatsError> {
    let mut content = Vec::new();
    let mut index = start;
    let mut visited = 0usize;
    while index < FIRST_MARKER_SECT {
        content.extend_from_slice(sectors.get(index)?);
        index = *table.get(index).ok_or(CfbError::SectorOutOfRangeError(index))?;
        visited += 1;
        if visited > table.len() {
            Err(CfbError::SectorChainLoopError(start))?;
        }
    }
    Ok(content)
}

/// Raw sector storage. Regular sectors are shifted by one slot because the
/// header occupies the first one; mini sectors are not.
#[derive(Debug)]
struct Sectors {
    data: Vec<u8>,
    size: usize,
    skip: usize,
}

impl Sectors {
    fn get(&self, index: usize) -> Result<&[u8], CfbError> {
        let source = (index + self.skip) * self.size;
        if source >= self.data.len() {
            return Err(CfbError::SectorOutOfRangeError(index));
        }
        let target = self.data.len().min(source + self.size);
        Ok(&self.data[source..target])
    }

    fn count(&self) -> usize {
        self.data.len() / self.size
    }
}

#[derive(Debug)]
struct Header {
    major_version: u16,
    sector_shift: u16,
    file_allocation_table_count: usize,
    directory_start: usize,
    mini_stream_cutoff: usize,
    mini_file_allocation_table_start: usize,
    mini_file_allocation_table_count: usize,
    double_indirect_start: usize,
}

impl Header {
    fn new(data: &[u8]) -> Result<Self, GradeStatsError> {
        if to_u64(&data[0..8]) != SIGNATURE {
            Err(CfbError::OleSignatureError)?;
        }
        Ok(Header {
            major_version: to_u16(&data[26..28]),
            sector_shift: to_u16(&data[30..32]),
            file_allocation_table_count: to_usize(&data[44..48]),
            directory_start: to_usize(&data[48..52]),
            mini_stream_cutoff: to_usize(&data[56..60]),
            mini_file_allocation_table_start: to_usize(&data[60..64]),
            mini_file_allocation_table_count: to_usize(&data[64..68]),
            double_indirect_start: to_usize(&data[68..72]),
        })
    }

    fn sector_size(&self) -> Result<usize, CfbError> {
        match (self.major_version, self.sector_shift) {
            (3, 0x0009) => Ok(512),
            // Version 4 pads the 512 byte header to a full 4096 byte sector
            (4, 0x000C) => Ok(4096),
            (version, shift) => Err(CfbError::SectorSizeError(version, shift)),
        }
    }
}

#[derive(Debug)]
struct Directory {
    start: usize,
    size: usize,
}

impl Directory {
    /// Decodes one 128 byte directory entry; unallocated entries yield `None`.
    fn new(bytes: &[u8], major_version: u16) -> Option<(String, Directory)> {
        if bytes[66] == 0 {
            return None;
        }
        let length = (to_u16(&bytes[64..66]) as usize).min(64);
        let (name, _, _) = UTF_16LE.decode(&bytes[..length]);
        let name = name.trim_end_matches('\0').to_owned();
        let start = to_usize(&bytes[116..120]);
        // Version 3 files may leave garbage in the high half of the size
        let size = if major_version == 3 {
            to_u32(&bytes[120..124]) as usize
        } else {
            to_u64(&bytes[120..128]) as usize
        };
        Some((name, Directory { start, size }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn rejects_short_input() {
        let result = Cfb::new(&mut Cursor::new(vec![0u8; 100]));
        assert!(matches!(result, Err(GradeStatsError::CfbHelperError(CfbError::FileFormatError))));
    }

    #[test]
    fn rejects_zip_signature() {
        let mut data = vec![0u8; 1024];
        data[..4].copy_from_slice(b"PK\x03\x04");
        let result = Cfb::new(&mut Cursor::new(data));
        assert!(matches!(result, Err(GradeStatsError::CfbHelperError(CfbError::OleSignatureError))));
    }

    #[test]
    fn chain_loop_is_detected() {
        let sectors = Sectors { data: vec![0u8; 64 * 4], size: 64, skip: 0 };
        let table = vec![1, 0, 0, 0];
        let result = read_chain(&table, &sectors, 0);
        assert!(matches!(result, Err(GradeStatsError::CfbHelperError(CfbError::SectorChainLoopError(0)))));
    }

    #[test]
    fn chain_stops_at_end_marker() {
        let mut data = vec![0u8; 64 * 3];
        data[64..128].fill(7);
        let sectors = Sectors { data, size: 64, skip: 0 };
        let table = vec![0xFFFF_FFFE, 0xFFFF_FFFE, 1];
        let bytes = read_chain(&table, &sectors, 2).expect("chain");
        assert_eq!(bytes.len(), 128);
        assert!(bytes[64..].iter().all(|byte| *byte == 7));
    }
}
