use crate::error::SheetOutlineError;
use crate::helpers::reader::UnifiedReader;
use crate::helpers::reference::reference_to_index;
use crate::helpers::reference::row_to_index;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::outline::MergeRange;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::cell::DateSystem;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::excel;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::collections::HashMap;
use std::io::BufReader;
use zip::read::ZipFile;
use zip::ZipArchive;

// SpreadsheetML tag names
const TAG_CUSTOM_FORMATS: QName = QName(b"numFmts");
const TAG_CUSTOM_FORMAT: QName = QName(b"numFmt");
const TAG_FORMAT_INDEXES: QName = QName(b"cellXfs");
const TAG_FORMAT_INDEX: QName = QName(b"xf");
const TAG_SHARED_STRING_ITEM: QName = QName(b"si");
const TAG_PHONETIC_TEXT: QName = QName(b"rPh");
const TAG_TEXT: QName = QName(b"t");
const TAG_WORKBOOK_PROPERTIES: QName = QName(b"workbookPr");
const TAG_SHEET: QName = QName(b"sheet");
const TAG_ROW: QName = QName(b"row");
const TAG_CELL: QName = QName(b"c");
const TAG_INLINE_STRING: QName = QName(b"is");
const TAG_VALUE: QName = QName(b"v");
const TAG_MERGE_CELL: QName = QName(b"mergeCell");

/// A SpreadsheetML workbook (`.xlsx`, `.xlsm`, `.xltx`, `.xltm`).
pub(crate) struct XlsxSpreadsheet {
    name: String,
    zip: ZipArchive<UnifiedReader>,
    /// Cell type implied by each cell style, indexed by the `s` attribute
    number_formats: Vec<CellType>,
    /// Worksheets in workbook order as (name, archive path)
    sheets: Vec<(String, String)>,
}

impl XlsxSpreadsheet {
    pub(crate) fn open(file_name: &str) -> Result<XlsxSpreadsheet, SheetOutlineError> {
        Self::from_reader(file_name, UnifiedReader::new(file_name)?)
    }

    pub(crate) fn from_reader(file_name: &str, reader: UnifiedReader) -> Result<XlsxSpreadsheet, SheetOutlineError> {
        let mut zip = ZipArchive::new(reader)?;
        let (sheets, system) = load_workbook(&mut zip, file_name)?;
        if sheets.is_empty() {
            Err(SpreadsheetError::EmptySpreadsheetError(file_name.to_owned()))?
        }
        let number_formats = load_number_formats(&mut zip, system)?;
        Ok(XlsxSpreadsheet {
            name: file_name.to_owned(),
            zip,
            number_formats,
            sheets,
        })
    }
}

impl Spreadsheet for XlsxSpreadsheet {
    fn name(&self) -> &str {
        &self.name
    }

    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.to_owned()).collect()
    }

    fn load_shared_strings(&mut self) -> Result<Vec<String>, SheetOutlineError> {
        let mut shared_strings = Vec::<String>::new();
        let Some(mut reader) = self.zip.xml_reader("xl/sharedStrings.xml")? else {
            return Ok(shared_strings);
        };
        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => {
                shared_strings.push(read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?);
            }
        });
        Ok(shared_strings)
    }

    fn read_sheets(&mut self, criteria: &Criteria) -> Result<Vec<Sheet>, SheetOutlineError> {
        let mut sheets = Vec::<Sheet>::new();
        for (sheet_name, zip_path) in &self.sheets {
            if criteria.sheet_limit.is_some_and(|limit| sheets.len() >= limit) {
                break;
            } else if !criteria.accept(sheet_name) {
                continue;
            }

            let mut sheet = Sheet::new(&self.name, sheet_name);
            let mut reader = self
                .zip
                .xml_reader(zip_path)?
                .ok_or_else(|| SpreadsheetError::MissingPartError(self.name.to_owned(), zip_path.to_owned()))?;
            let mut next_row = 0usize;
            let mut next_col = 0usize;
            let mut row = 0usize;
            let mut col = 0usize;
            let mut kind = CellType::default();
            let mut value = String::new();
            match_xml_events!(reader => {
                Event::Start(event) if event.name() == TAG_ROW => {
                    row = event.get_attribute_value("r")?
                        .and_then(|reference| row_to_index(&reference))
                        .unwrap_or(next_row);
                    next_row = row + 1;
                    next_col = 0;
                }
                Event::Start(event) if event.name() == TAG_CELL => {
                    (row, col) = event.get_attribute_value("r")?
                        .and_then(|reference| reference_to_index(&reference))
                        .unwrap_or((row, next_col));
                    next_col = col + 1;
                    value.clear();
                    kind = CellType::Empty;
                    if criteria.contains(row, col) {
                        kind = match event.get_attribute_value("t")?.as_deref() {
                            Some("s") => CellType::SharedString,
                            Some("inlineStr") | Some("str") => CellType::InlineString,
                            Some("b") => CellType::Boolean,
                            Some("e") => CellType::Error,
                            Some("d") => CellType::IsoDateTime,
                            _ => CellType::Number,
                        };
                        if let Some(style) = event.get_attribute_value("s")?.filter(|style| !style.is_empty()) {
                            if kind == CellType::Number {
                                let index = style.parse::<usize>()?;
                                kind = self.number_formats.get(index).copied().unwrap_or(CellType::Number);
                            }
                        }
                    }
                }
                Event::Start(event) if kind != CellType::Empty && event.name() == TAG_INLINE_STRING => {
                    value = read_string_value(&mut reader, TAG_INLINE_STRING, false)?;
                }
                Event::Start(event) if kind != CellType::Empty && event.name() == TAG_VALUE => {
                    value = read_string_value(&mut reader, TAG_VALUE, true)?;
                }
                Event::End(event) if event.name() == TAG_CELL => {
                    if kind != CellType::Empty && !value.is_empty() {
                        sheet.push(Cell {
                            row,
                            col,
                            kind,
                            value: std::mem::take(&mut value),
                        });
                    }
                    kind = CellType::Empty;
                }
                Event::Start(event) if event.name() == TAG_MERGE_CELL => {
                    let range = event.get_attribute_value("ref")?.and_then(|reference| to_merge_range(&reference));
                    match range {
                        Some(range) if criteria.contains(range.start_row, range.start_col) => sheet.push_merge(range),
                        Some(range) => log::debug!("skip merge {} of sheet '{}' outside the selected range", range, sheet_name),
                        None => (),
                    }
                }
            });
            sheet.finish();
            log::info!(
                "read sheet '{}' of '{}': {} cells, {} merged ranges",
                sheet_name,
                self.name,
                sheet.cells.len(),
                sheet.merges.len()
            );
            sheets.push(sheet);
        }
        Ok(sheets)
    }
}

/// Lists worksheets (name, archive path) in workbook order and detects the date system.
fn load_workbook(
    zip: &mut ZipArchive<UnifiedReader>,
    file_name: &str,
) -> Result<(Vec<(String, String)>, DateSystem), SheetOutlineError> {
    let relationships = excel::load_relationships(zip, file_name, "xl/_rels/workbook.xml.rels")?;
    let mut reader = zip
        .xml_reader("xl/workbook.xml")?
        .ok_or_else(|| SpreadsheetError::MissingPartError(file_name.to_owned(), "xl/workbook.xml".to_owned()))?;
    let mut sheets = Vec::<(String, String)>::new();
    let mut system = DateSystem::V1900;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHEET => {
            let name = event.get_attribute_value("name")?;
            let id = event.get_attribute_value("id")?;
            if let Some((name, id)) = name.zip(id) {
                match relationships.get(&*id) {
                    Some(path) => sheets.push((name.into_owned(), path.to_owned())),
                    None => log::warn!("sheet '{}' of '{}' has no worksheet part", name, file_name),
                }
            }
        }
        Event::Start(event) if event.name() == TAG_WORKBOOK_PROPERTIES => {
            let is_1904 = event.get_attribute_value("date1904")?
                .is_some_and(|value| value == "1" || value.eq_ignore_ascii_case("true"));
            if is_1904 {
                system = DateSystem::V1904;
            }
        }
    });
    Ok((sheets, system))
}

/// Reads `xl/styles.xml` into the cell type of each cell style.
fn load_number_formats(zip: &mut ZipArchive<UnifiedReader>, system: DateSystem) -> Result<Vec<CellType>, SheetOutlineError> {
    let Some(mut reader) = zip.xml_reader("xl/styles.xml")? else {
        return Ok(Vec::new());
    };

    let mut custom_formats_context = false;
    let mut custom_formats = HashMap::<String, CellType>::new();
    let mut format_indexes_context = false;
    let mut format_ids = Vec::<String>::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = true,
        Event::End(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = false,
        Event::Start(event) if custom_formats_context && event.name() == TAG_CUSTOM_FORMAT => {
            let id = event.get_attribute_value("numFmtId")?;
            let code = event.get_attribute_value("formatCode")?;
            if let Some((id, code)) = id.zip(code) {
                custom_formats.insert(id.into_owned(), CellType::from_format_code(&code, system));
            }
        }
        Event::Start(event) if event.name() == TAG_FORMAT_INDEXES => format_indexes_context = true,
        // cellXfs comes after numFmts, nothing else is needed
        Event::End(event) if event.name() == TAG_FORMAT_INDEXES => break,
        Event::Start(event) if format_indexes_context && event.name() == TAG_FORMAT_INDEX => {
            let id = event.get_attribute_value("numFmtId")?;
            format_ids.push(id.map(|id| id.into_owned()).unwrap_or_default());
        }
    });

    Ok(excel::resolve_number_formats(&format_ids, &custom_formats, system))
}

/// Reads the text of a string item or value, skipping phonetic runs.
fn read_string_value(
    reader: &mut XmlReader<BufReader<ZipFile<'_, UnifiedReader>>>,
    end_tag: QName,
    is_text_content: bool,
) -> Result<String, SheetOutlineError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.name() == end_tag => break,
        Event::Start(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
        Event::End(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.name() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.name() == TAG_TEXT => is_text = false,
        Event::Text(event) if is_text => text.push_str(&event.xml_content()?),
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => text.push_bytes_ref(&event)?,
    });
    Ok(text)
}

/// Parses a `<mergeCell ref="A1:D3"/>` reference.
fn to_merge_range(reference: &str) -> Option<MergeRange> {
    let (start, end) = reference.split_once(':')?;
    let (start_row, start_col) = reference_to_index(start)?;
    let (end_row, end_col) = reference_to_index(end)?;
    Some(MergeRange::new(start_row, end_row, start_col, end_col))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::outline::CellSource;
    use crate::spreadsheet::load_sheets;
    use crate::spreadsheet::range::Range;
    use std::io::Cursor;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    const WORKSHEET_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";

    /// Zips the given parts into an in-memory package.
    pub(crate) fn package(parts: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (path, content) in parts {
            writer.start_file(*path, SimpleFileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    /// A workbook whose worksheets are given as (name, sheet xml) pairs.
    pub(crate) fn workbook(sheets: &[(&str, &str)], shared_strings: &str, styles: &str) -> Vec<u8> {
        let mut entries = String::new();
        let mut relationships = String::new();
        let mut parts = Vec::<(String, String)>::new();
        for (index, (name, xml)) in sheets.iter().enumerate() {
            let id = index + 1;
            entries.push_str(&format!(r#"<sheet name="{name}" sheetId="{id}" r:id="rId{id}"/>"#));
            relationships.push_str(&format!(
                r#"<Relationship Id="rId{id}" Type="{WORKSHEET_TYPE}" Target="worksheets/sheet{id}.xml"/>"#
            ));
            parts.push((format!("xl/worksheets/sheet{id}.xml"), xml.to_string()));
        }
        parts.push((
            "xl/workbook.xml".to_owned(),
            format!(
                r#"<workbook xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><workbookPr/><sheets>{entries}</sheets></workbook>"#
            ),
        ));
        parts.push((
            "xl/_rels/workbook.xml.rels".to_owned(),
            format!(
                r#"<Relationships>{relationships}<Relationship Id="rIdS" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#
            ),
        ));
        parts.push(("xl/sharedStrings.xml".to_owned(), shared_strings.to_owned()));
        parts.push(("xl/styles.xml".to_owned(), styles.to_owned()));
        let borrowed: Vec<(&str, &str)> = parts.iter().map(|(path, xml)| (path.as_str(), xml.as_str())).collect();
        package(&borrowed)
    }

    const SHARED_STRINGS: &str = "<sst>\
        <si><t>Bank report</t></si>\
        <si><r><t>Na</t></r><r><t>me</t></r></si>\
        <si><t>Amount</t><rPh><t>kana</t></rPh></si>\
        </sst>";

    const STYLES: &str = r#"<styleSheet>
        <numFmts count="1"><numFmt numFmtId="164" formatCode="dd/mm/yyyy"/></numFmts>
        <cellStyleXfs count="1"><xf numFmtId="22"/></cellStyleXfs>
        <cellXfs count="3"><xf numFmtId="0"/><xf numFmtId="164"/><xf numFmtId="20"/></cellXfs>
        </styleSheet>"#;

    const REPORT: &str = r#"<worksheet><sheetData>
        <row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" s="0"/></row>
        <row r="2"><c r="A2" t="s"><v>1</v></c><c r="B2" t="s"><v>2</v></c><c r="C2" t="inlineStr"><is><t>Due &amp; paid</t></is></c></row>
        <row r="3"><c r="A3" t="str"><f>"A"&amp;"B"</f><v>AB</v></c><c r="B3"><v>1200.5</v></c><c r="C3" s="1"><v>45292</v></c></row>
        <row r="4"><c r="A4" t="b"><v>1</v></c><c r="B4" t="e"><v>#N/A</v></c><c r="C4" s="2"><v>0.75</v></c></row>
        </sheetData><mergeCells count="1"><mergeCell ref="A1:C1"/></mergeCells></worksheet>"#;

    const NOTES: &str = r#"<worksheet><sheetData>
        <row><c><v>7</v></c><c t="inlineStr"><is><t>x</t></is></c></row>
        <row><c><v>8</v></c></row>
        </sheetData></worksheet>"#;

    fn open(bytes: Vec<u8>) -> XlsxSpreadsheet {
        XlsxSpreadsheet::from_reader("book.xlsx", UnifiedReader::from_bytes(bytes)).unwrap()
    }

    fn texts(sheet: &Sheet) -> Vec<Vec<String>> {
        let (rows, cols) = sheet.dimensions();
        (0..rows)
            .map(|row| (0..cols).map(|col| sheet.cell_text(row, col).unwrap_or_default()).collect())
            .collect()
    }

    #[test]
    fn reads_values_merges_and_order() {
        let mut spreadsheet = open(workbook(&[("Report", REPORT), ("Notes", NOTES)], SHARED_STRINGS, STYLES));
        assert_eq!(spreadsheet.sheet_names(), vec!["Report", "Notes"]);

        let sheets = load_sheets(&mut spreadsheet, &Criteria::default()).unwrap();

        assert_eq!(sheets.len(), 2);
        let report = &sheets[0];
        assert_eq!(report.name(), "Report");
        assert_eq!(report.merges(), &[MergeRange::new(0, 0, 0, 2)]);
        assert_eq!(
            texts(report),
            vec![
                vec!["Bank report", "", ""],
                vec!["Name", "Amount", "Due & paid"],
                vec!["AB", "1200.5", "2024-01-01"],
                vec!["TRUE", "#N/A", "18:00:00"],
            ]
        );
        assert_eq!(texts(&sheets[1]), vec![vec!["7", "x"], vec!["8", ""]]);
    }

    #[test]
    fn criteria_select_sheets_and_cells() {
        let mut spreadsheet = open(workbook(&[("Report", REPORT), ("Notes", NOTES)], SHARED_STRINGS, STYLES));
        let criteria = Criteria {
            range: Some(Range::try_from("A2:B3").unwrap()),
            ..Criteria::default()
        }
        .with_sheet_patterns(["Rep*"])
        .unwrap();

        let sheets = load_sheets(&mut spreadsheet, &criteria).unwrap();

        assert_eq!(sheets.len(), 1);
        assert!(sheets[0].merges().is_empty());
        assert_eq!(
            texts(&sheets[0]),
            vec![vec!["", ""], vec!["Name", "Amount"], vec!["AB", "1200.5"]]
        );
    }

    #[test]
    fn sheet_limit_stops_early() {
        let mut spreadsheet = open(workbook(&[("Report", REPORT), ("Notes", NOTES)], SHARED_STRINGS, STYLES));
        let criteria = Criteria {
            sheet_limit: Some(1),
            ..Criteria::default()
        };

        let sheets = spreadsheet.read_sheets(&criteria).unwrap();

        assert_eq!(sheets.len(), 1);
        assert_eq!(sheets[0].name(), "Report");
    }

    #[test]
    fn date_system_1904() {
        let bytes = package(&[
            (
                "xl/workbook.xml",
                r#"<workbook><workbookPr date1904="1"/><sheets><sheet name="S" r:id="rId1"/></sheets></workbook>"#,
            ),
            (
                "xl/_rels/workbook.xml.rels",
                r#"<Relationships><Relationship Id="rId1" Target="/xl/worksheets/s.xml"/></Relationships>"#,
            ),
            ("xl/styles.xml", r#"<styleSheet><cellXfs><xf numFmtId="14"/></cellXfs></styleSheet>"#),
            ("xl/worksheets/s.xml", r#"<worksheet><sheetData><row r="1"><c r="A1" s="0"><v>0</v></c></row></sheetData></worksheet>"#),
        ]);

        let sheets = load_sheets(&mut open(bytes), &Criteria::default()).unwrap();

        assert_eq!(sheets[0].cell_text(0, 0).as_deref(), Some("1904-01-01"));
    }

    #[test]
    fn workbook_without_sheets_is_rejected() {
        let bytes = package(&[
            ("xl/workbook.xml", "<workbook><sheets/></workbook>"),
            ("xl/_rels/workbook.xml.rels", "<Relationships/>"),
        ]);

        let result = XlsxSpreadsheet::from_reader("empty.xlsx", UnifiedReader::from_bytes(bytes));

        assert!(matches!(
            result,
            Err(SheetOutlineError::SpreadsheetError(SpreadsheetError::EmptySpreadsheetError(_)))
        ));
    }

    #[test]
    fn merge_references() {
        assert_eq!(to_merge_range("B2:D5"), Some(MergeRange::new(1, 4, 1, 3)));
        assert_eq!(to_merge_range("B2"), None);
    }
}
