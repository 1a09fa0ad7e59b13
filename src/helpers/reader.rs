use crate::error::SheetOutlineError;
use std::fs::File;
use std::io::BufReader;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;

/// Seekable byte source of a workbook: a file on disk or a buffer already in memory.
pub(crate) enum UnifiedReader {
    Local(BufReader<File>),
    Memory(Cursor<Vec<u8>>),
}

impl UnifiedReader {
    pub(crate) fn new(file_name: &str) -> Result<UnifiedReader, SheetOutlineError> {
        let file = File::open(file_name)?;
        Ok(UnifiedReader::Local(BufReader::new(file)))
    }

    pub(crate) fn from_bytes(bytes: Vec<u8>) -> UnifiedReader {
        UnifiedReader::Memory(Cursor::new(bytes))
    }
}

impl Read for UnifiedReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            UnifiedReader::Local(reader) => reader.read(buf),
            UnifiedReader::Memory(reader) => reader.read(buf),
        }
    }
}

impl Seek for UnifiedReader {
    fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
        match self {
            UnifiedReader::Local(reader) => reader.seek(pos),
            UnifiedReader::Memory(reader) => reader.seek(pos),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::SeekFrom;

    #[test]
    fn open_local_file() {
        let mut reader = UnifiedReader::new("Cargo.toml").unwrap();
        let mut head = [0u8; 9];
        reader.read_exact(&mut head).unwrap();
        assert_eq!(&head, b"[package]");

        assert!(UnifiedReader::new("non_existent_file.xlsx").is_err());
    }

    #[test]
    fn memory_reader_seeks() {
        let mut reader = UnifiedReader::from_bytes(b"PK\x03\x04rest".to_vec());
        reader.seek(SeekFrom::Start(4)).unwrap();
        let mut rest = String::new();
        reader.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "rest");
    }
}
