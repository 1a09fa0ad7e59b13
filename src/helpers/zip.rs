//! Lookup of workbook parts inside the OOXML container.
use crate::error::SheetOutlineError;
use crate::helpers::xml::XmlReader;
use std::io::BufReader;
use std::io::Read;
use std::io::Seek;
use zip::read::ZipFile;
use zip::result::ZipError;
use zip::ZipArchive;

pub(crate) trait ZipHelper<RS: Read + Seek> {
    /// Finds a part by name; matching ignores ASCII case and accepts `\` separators.
    fn file(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, SheetOutlineError>;

    /// Opens a part for streaming XML events, `None` when the part is absent.
    fn xml_reader(&'_ mut self, name: &str) -> Result<Option<XmlReader<BufReader<ZipFile<'_, RS>>>>, SheetOutlineError>;
}

impl<RS: Read + Seek> ZipHelper<RS> for ZipArchive<RS> {
    fn file(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, SheetOutlineError> {
        let wanted = name.replace('\\', "/");
        let Some(path) = self
            .file_names()
            .find(|file_name| wanted.eq_ignore_ascii_case(&file_name.replace('\\', "/")))
            .map(str::to_owned)
        else {
            return Ok(None);
        };
        match self.by_name(&path) {
            Ok(file) => Ok(Some(file)),
            Err(ZipError::FileNotFound) => Ok(None),
            Err(error) => Err(error)?,
        }
    }

    fn xml_reader(&'_ mut self, name: &str) -> Result<Option<XmlReader<BufReader<ZipFile<'_, RS>>>>, SheetOutlineError> {
        Ok(self.file(name)?.map(|file| XmlReader::new(BufReader::new(file))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    #[test]
    fn parts_are_found_case_insensitively() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer.start_file("xl/workbook.xml", SimpleFileOptions::default()).unwrap();
        writer.write_all(b"<workbook/>").unwrap();
        let mut zip = ZipArchive::new(Cursor::new(writer.finish().unwrap().into_inner())).unwrap();

        let mut content = String::new();
        zip.file("XL\\Workbook.xml").unwrap().unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "<workbook/>");
        assert!(zip.file("xl/styles.xml").unwrap().is_none());
    }
}
