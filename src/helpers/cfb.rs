//! Compound File Binary (OLE2) container reader, the envelope of `.xls` workbooks.
//!
//! The whole container is loaded into memory; streams are read by following
//! their sector chains through the (mini) file allocation table.
use crate::error::SheetOutlineError;
use crate::helpers::bytes::le_u16;
use crate::helpers::bytes::le_u64;
use crate::helpers::bytes::le_usize;
use crate::helpers::bytes::le_usize_iter;
use encoding_rs::UTF_16LE;
use std::collections::HashMap;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use thiserror::Error;

const SIGNATURE: u64 = 0xE11A_B1A1_E011_CFD0;
const HEADER_SIZE: usize = 512;
const DIRECTORY_ENTRY_SIZE: usize = 128;
const MINI_SECTOR_SIZE: usize = 64;
/// Streams smaller than this live in the mini stream.
const MINI_STREAM_CUTOFF: usize = 4096;
/// Sector ids above this are markers (free, end of chain, FAT, DIFAT).
const MAX_REG_SECT: usize = 0xFFFF_FFFA;
const ROOT_ENTRY: &str = "Root Entry";

#[derive(Error, Debug)]
pub enum CfbError {
    #[error("The file is corrupted or has an invalid compound file structure")]
    FileFormatError,

    #[error("Invalid OLE signature (not an Excel 97-2003 workbook?)")]
    SignatureError,

    #[error("Invalid sector size '2 ^ {1}' for major version '{0}'")]
    SectorSizeError(u16, u16),

    #[error("Expected {0} file allocation table sectors, found {1}")]
    FileAllocationTableError(usize, usize),

    #[error("Sector chain starting at {0} is broken or cyclic")]
    SectorChainError(usize),
}

/// A loaded compound file.
pub(crate) struct Cfb {
    directories: HashMap<String, Directory>,
    file_allocation_table: Vec<usize>,
    sectors: Sectors,
    mini_file_allocation_table: Vec<usize>,
    mini_sectors: Sectors,
}

impl Cfb {
    pub(crate) fn new<RS: Read + Seek>(reader: &mut RS) -> Result<Cfb, SheetOutlineError> {
        let size = reader.seek(SeekFrom::End(0))? as usize;
        if size < HEADER_SIZE {
            Err(CfbError::FileFormatError)?
        }
        reader.seek(SeekFrom::Start(0))?;
        let mut data = Vec::<u8>::with_capacity(size);
        reader.read_to_end(&mut data)?;

        let header = Header::new(&data)?;
        let sectors = Sectors {
            offset: header.sector_size()?,
            size: header.sector_size()?,
            data,
        };
        let file_allocation_table = load_file_allocation_table(&sectors, &header)?;
        let directories = load_directories(&file_allocation_table, &sectors, header.directory_start)?;
        let mini_file_allocation_table = if header.mini_file_allocation_table_count > 0 {
            let bytes = read_chain(&file_allocation_table, &sectors, header.mini_file_allocation_table_start)?;
            le_usize_iter(&bytes).collect()
        } else {
            Vec::new()
        };
        let mini_data = match directories.get(ROOT_ENTRY) {
            Some(root) => {
                let mut data = read_chain(&file_allocation_table, &sectors, root.start)?;
                data.truncate(root.size);
                data
            }
            None => Vec::new(),
        };

        Ok(Cfb {
            directories,
            file_allocation_table,
            sectors,
            mini_file_allocation_table,
            mini_sectors: Sectors { data: mini_data, offset: 0, size: MINI_SECTOR_SIZE },
        })
    }

    /// Content of the stream `name`, `None` when the container has no such stream.
    pub(crate) fn read(&self, name: &str) -> Result<Option<Vec<u8>>, SheetOutlineError> {
        let Some(directory) = self.directories.get(name) else {
            return Ok(None);
        };
        let mut bytes = if directory.size < MINI_STREAM_CUTOFF {
            read_chain(&self.mini_file_allocation_table, &self.mini_sectors, directory.start)?
        } else {
            read_chain(&self.file_allocation_table, &self.sectors, directory.start)?
        };
        bytes.truncate(directory.size);
        Ok(Some(bytes))
    }
}

/// Collects the FAT from the sectors listed in the header's DIFAT array and
/// in any DIFAT sectors chained after it.
fn load_file_allocation_table(sectors: &Sectors, header: &Header) -> Result<Vec<usize>, SheetOutlineError> {
    let mut fat_sectors: Vec<usize> = le_usize_iter(sectors.slice(76, HEADER_SIZE)?).collect();
    let mut next = header.difat_start;
    let mut visited = 0usize;
    while next <= MAX_REG_SECT {
        visited += 1;
        if visited > header.difat_count {
            Err(CfbError::SectorChainError(header.difat_start))?
        }
        let mut entries: Vec<usize> = le_usize_iter(sectors.get(next)?).collect();
        next = entries.pop().ok_or(CfbError::FileFormatError)?;
        fat_sectors.extend(entries);
    }

    let mut file_allocation_table = Vec::<usize>::new();
    let mut count = 0usize;
    for index in fat_sectors.into_iter().filter(|index| *index <= MAX_REG_SECT) {
        file_allocation_table.extend(le_usize_iter(sectors.get(index)?));
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
    start: usize,
) -> Result<HashMap<String, Directory>, SheetOutlineError> {
    let bytes = read_chain(file_allocation_table, sectors, start)?;
    let directories: HashMap<String, Directory> = bytes
        .chunks_exact(DIRECTORY_ENTRY_SIZE)
        .filter_map(Directory::new)
        .collect();
    if directories.is_empty() {
        Err(CfbError::FileFormatError)?
    }
    Ok(directories)
}

/// Concatenates the sectors of the chain starting at `start`.
fn read_chain(table: &[usize], sectors: &Sectors, start: usize) -> Result<Vec<u8>, SheetOutlineError> {
    let mut content = Vec::<u8>::new();
    let mut index = start;
    let mut remaining = table.len();
    while index <= MAX_REG_SECT {
        if remaining == 0 {
            Err(CfbError::SectorChainError(start))?
        }
        remaining -= 1;
        content.extend_from_slice(sectors.get(index)?);
        index = *table.get(index).ok_or(CfbError::SectorChainError(start))?;
    }
    Ok(content)
}

struct Sectors {
    data: Vec<u8>,
    /// Bytes before sector 0 (the header, padded to one sector)
    offset: usize,
    size: usize,
}

impl Sectors {
    fn get(&self, index: usize) -> Result<&[u8], SheetOutlineError> {
        let source = index
            .checked_mul(self.size)
            .and_then(|start| start.checked_add(self.offset))
            .filter(|source| *source < self.data.len())
            .ok_or(CfbError::FileFormatError)?;
        let target = self.data.len().min(source + self.size);
        Ok(&self.data[source..target])
    }

    fn slice(&self, lower: usize, upper: usize) -> Result<&[u8], SheetOutlineError> {
        Ok(self.data.get(lower..upper).ok_or(CfbError::FileFormatError)?)
    }
}

struct Header {
    major_version: u16,
    sector_shift: u16,
    file_allocation_table_count: usize,
    directory_start: usize,
    mini_file_allocation_table_start: usize,
    mini_file_allocation_table_count: usize,
    difat_start: usize,
    difat_count: usize,
}

impl Header {
    fn new(data: &[u8]) -> Result<Header, SheetOutlineError> {
        let field = |offset| le_usize(data, offset).ok_or(CfbError::FileFormatError);
        if le_u64(data, 0) != Some(SIGNATURE) {
            Err(CfbError::SignatureError)?
        }
        Ok(Header {
            major_version: le_u16(data, 26).ok_or(CfbError::FileFormatError)?,
            sector_shift: le_u16(data, 30).ok_or(CfbError::FileFormatError)?,
            file_allocation_table_count: field(44)?,
            directory_start: field(48)?,
            mini_file_allocation_table_start: field(60)?,
            mini_file_allocation_table_count: field(64)?,
            difat_start: field(68)?,
            difat_count: field(72)?,
        })
    }

    fn sector_size(&self) -> Result<usize, SheetOutlineError> {
        match (self.major_version, self.sector_shift) {
            (3, 9) => Ok(512),
            // Version 4 pads the 512-byte header with zeroes to a full sector.
            (4, 12) => Ok(4096),
            (version, shift) => Err(CfbError::SectorSizeError(version, shift))?,
        }
    }
}

struct Directory {
    start: usize,
    size: usize,
}

impl Directory {
    /// Parses one directory entry; unused entries (empty name) are skipped.
    fn new(bytes: &[u8]) -> Option<(String, Directory)> {
        let length = (le_u16(bytes, 64)? as usize).min(64);
        let (name, _, _) = UTF_16LE.decode(&bytes[..length]);
        let name = name.split('\0').next().unwrap_or_default();
        if name.is_empty() {
            return None;
        }
        let start = le_usize(bytes, 116)?;
        let size = le_u64(bytes, 120)? as usize;
        Some((name.to_owned(), Directory { start, size }))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;

    const END_OF_CHAIN: u32 = 0xFFFF_FFFE;
    const FREE_SECT: u32 = 0xFFFF_FFFF;
    const FAT_SECT: u32 = 0xFFFF_FFFD;

    fn directory_entry(name: &str, kind: u8, start: u32, size: u64) -> Vec<u8> {
        let mut entry = vec![0u8; DIRECTORY_ENTRY_SIZE];
        let encoded: Vec<u8> = name.encode_utf16().chain([0]).flat_map(u16::to_le_bytes).collect();
        entry[..encoded.len()].copy_from_slice(&encoded);
        entry[64..66].copy_from_slice(&(encoded.len() as u16).to_le_bytes());
        entry[66] = kind;
        entry[116..120].copy_from_slice(&start.to_le_bytes());
        entry[120..128].copy_from_slice(&size.to_le_bytes());
        entry
    }

    /// Builds a version 3 compound file holding one stream. The stream is
    /// zero-padded to the mini stream cutoff so it lives in regular sectors.
    pub(crate) fn compound_file(stream_name: &str, stream: &[u8]) -> Vec<u8> {
        let mut stream = stream.to_vec();
        stream.resize(stream.len().max(MINI_STREAM_CUTOFF).div_ceil(512) * 512, 0);
        let stream_sectors = stream.len() / 512;

        let mut header = vec![0u8; HEADER_SIZE];
        header[0..8].copy_from_slice(&SIGNATURE.to_le_bytes());
        header[24..26].copy_from_slice(&0x3Eu16.to_le_bytes());
        header[26..28].copy_from_slice(&3u16.to_le_bytes());
        header[28..30].copy_from_slice(&0xFFFEu16.to_le_bytes());
        header[30..32].copy_from_slice(&9u16.to_le_bytes());
        header[32..34].copy_from_slice(&6u16.to_le_bytes());
        header[44..48].copy_from_slice(&1u32.to_le_bytes());
        header[48..52].copy_from_slice(&1u32.to_le_bytes());
        header[56..60].copy_from_slice(&(MINI_STREAM_CUTOFF as u32).to_le_bytes());
        header[60..64].copy_from_slice(&END_OF_CHAIN.to_le_bytes());
        header[68..72].copy_from_slice(&END_OF_CHAIN.to_le_bytes());
        for slot in header[76..].chunks_exact_mut(4) {
            slot.copy_from_slice(&FREE_SECT.to_le_bytes());
        }
        header[76..80].copy_from_slice(&0u32.to_le_bytes());

        // Sector 0 holds the FAT, sector 1 the directory, the stream follows.
        let mut fat = vec![FREE_SECT; 128];
        fat[0] = FAT_SECT;
        fat[1] = END_OF_CHAIN;
        for sector in 2..2 + stream_sectors {
            fat[sector] = if sector + 1 < 2 + stream_sectors { sector as u32 + 1 } else { END_OF_CHAIN };
        }

        let mut directory = directory_entry(ROOT_ENTRY, 5, END_OF_CHAIN, 0);
        directory.extend(directory_entry(stream_name, 2, 2, stream.len() as u64));
        directory.resize(512, 0);

        let mut file = header;
        file.extend(fat.iter().flat_map(|entry| entry.to_le_bytes()));
        file.extend(directory);
        file.extend(stream);
        file
    }

    #[test]
    fn streams_are_read_by_name() {
        let payload: Vec<u8> = (0..5000u32).map(|value| (value % 251) as u8).collect();
        let file = compound_file("Workbook", &payload);

        let cfb = Cfb::new(&mut Cursor::new(file)).unwrap();

        let stream = cfb.read("Workbook").unwrap().unwrap();
        assert_eq!(stream.len(), 5120);
        assert_eq!(&stream[..5000], &payload[..]);
        assert!(cfb.read("Book").unwrap().is_none());
    }

    #[test]
    fn other_files_are_rejected() {
        let error = Cfb::new(&mut Cursor::new(vec![0u8; 1024])).err().unwrap();
        assert!(matches!(error, SheetOutlineError::CfbHelperError(CfbError::SignatureError)));

        let error = Cfb::new(&mut Cursor::new(b"PK\x03\x04".to_vec())).err().unwrap();
        assert!(matches!(error, SheetOutlineError::CfbHelperError(CfbError::FileFormatError)));
    }
}
