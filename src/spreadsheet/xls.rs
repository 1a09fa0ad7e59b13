use crate::error::SheetOutlineError;
use crate::helpers::biff8::Biff8Reader;
use crate::helpers::cfb::Cfb;
use crate::helpers::reader::UnifiedReader;
use crate::match_biff8_record;
use crate::spreadsheet::cell::to_error_value;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::cell::DateSystem;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::excel;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use either::Either;
use std::collections::HashMap;
use thiserror::Error;

// BIFF8 record types
const FORMULA: u16 = 0x0006;
const EOF: u16 = 0x000A;
const DATE1904: u16 = 0x0022;
const FILE_PASS: u16 = 0x002F;
const BOUND_SHEET8: u16 = 0x0085;
const MUL_RK: u16 = 0x00BD;
const XF: u16 = 0x00E0;
const SST: u16 = 0x00FC;
const LABEL_SST: u16 = 0x00FD;
const NUMBER: u16 = 0x0203;
const LABEL: u16 = 0x0204;
const BOOL_ERR: u16 = 0x0205;
const STRING: u16 = 0x0207;
const ARRAY: u16 = 0x0221;
const TABLE: u16 = 0x0236;
const RK: u16 = 0x027E;
const FORMAT: u16 = 0x041E;
const SHARED_FORMULA: u16 = 0x04BC;
const BOF: u16 = 0x0809;

/// `dt` of a `BoundSheet8` record describing a worksheet (not a chart or macro sheet).
const WORKSHEET: u8 = 0;

#[derive(Error, Debug)]
pub enum XlsError {
    #[error("Invalid formula result '{0:#018x}'")]
    FormulaValueError(u64),

    #[error("Sheet '{0}' does not start with a BOF record")]
    SubstreamError(String),
}

/// Cell type given by the record itself, or the XF index that decides it.
type CellKind = Either<CellType, usize>;

/// An Excel 97-2003 workbook (`.xls`).
///
/// BIFF8 merge records are not read, so its sheets carry no merge metadata and
/// the outline collapses repeated values instead.
pub(crate) struct XlsSpreadsheet {
    name: String,
    reader: Biff8Reader,
    shared_strings: Vec<String>,
    /// Cell type implied by each XF record, by XF index
    number_formats: Vec<CellType>,
    /// Worksheets in workbook order as (name, offset of their BOF record)
    sheets: Vec<(String, usize)>,
}

impl XlsSpreadsheet {
    pub(crate) fn open(file_name: &str) -> Result<XlsSpreadsheet, SheetOutlineError> {
        Self::from_reader(file_name, UnifiedReader::new(file_name)?)
    }

    /// Reads the workbook globals: date system, formats, shared strings and sheets.
    pub(crate) fn from_reader(file_name: &str, mut reader: UnifiedReader) -> Result<XlsSpreadsheet, SheetOutlineError> {
        let cfb = Cfb::new(&mut reader)?;
        let stream = match cfb.read("Workbook")? {
            Some(stream) => stream,
            None => cfb
                .read("Book")?
                .ok_or_else(|| SpreadsheetError::MissingPartError(file_name.to_owned(), "Workbook".to_owned()))?,
        };
        let mut reader = Biff8Reader::new(stream);

        let mut system = DateSystem::V1900;
        let mut shared_strings = Vec::<String>::new();
        let mut format_codes = HashMap::<String, String>::new();
        let mut format_ids = Vec::<String>::new();
        let mut sheets = Vec::<(String, usize)>::new();
        match_biff8_record!(reader => {
            EOF => break,
            FILE_PASS => Err(SpreadsheetError::PasswordProtectedError(file_name.to_owned()))?,
            DATE1904 if reader.read_u16()? == 1 => system = DateSystem::V1904,
            FORMAT => {
                let id = reader.read_u16()?;
                let code = reader.read_xl_unicode_string()?;
                format_codes.insert(id.to_string(), code);
            }
            XF => {
                reader.skip(2)?;
                format_ids.push(reader.read_u16()?.to_string());
            }
            SST => shared_strings = load_shared_strings(&mut reader)?,
            BOUND_SHEET8 => {
                let offset = reader.read_usize()?;
                reader.skip(1)?;
                let kind = reader.read_u8()?;
                let sheet_name = reader.read_short_xl_unicode_string()?;
                if kind == WORKSHEET {
                    sheets.push((sheet_name, offset));
                } else {
                    log::debug!("skip non-worksheet sheet '{}' of '{}'", sheet_name, file_name);
                }
            }
        });
        if sheets.is_empty() {
            Err(SpreadsheetError::EmptySpreadsheetError(file_name.to_owned()))?
        }

        let custom_formats: HashMap<String, CellType> = format_codes
            .into_iter()
            .map(|(id, code)| {
                let kind = CellType::from_format_code(&code, system);
                (id, kind)
            })
            .collect();
        let number_formats = excel::resolve_number_formats(&format_ids, &custom_formats, system);

        Ok(XlsSpreadsheet {
            name: file_name.to_owned(),
            reader,
            shared_strings,
            number_formats,
            sheets,
        })
    }
}

impl Spreadsheet for XlsSpreadsheet {
    fn name(&self) -> &str {
        &self.name
    }

    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.to_owned()).collect()
    }

    /// The table was already read with the workbook globals.
    fn load_shared_strings(&mut self) -> Result<Vec<String>, SheetOutlineError> {
        Ok(self.shared_strings.clone())
    }

    fn read_sheets(&mut self, criteria: &Criteria) -> Result<Vec<Sheet>, SheetOutlineError> {
        let mut sheets = Vec::<Sheet>::new();
        for (sheet_name, offset) in &self.sheets {
            if criteria.sheet_limit.is_some_and(|limit| sheets.len() >= limit) {
                break;
            } else if !criteria.accept(sheet_name) {
                continue;
            }

            self.reader.goto(*offset);
            if self.reader.next()? != Some(BOF) {
                Err(XlsError::SubstreamError(sheet_name.to_owned()))?
            }
            let mut sheet = Sheet::without_merge_metadata(&self.name, sheet_name);
            while let Some(tag) = self.reader.next()? {
                match tag {
                    BOF | EOF => break,
                    MUL_RK => {
                        let row = self.reader.read_u16()? as usize;
                        let first_col = self.reader.read_u16()? as usize;
                        let last_col = self.reader.get_u16_back(2)? as usize;
                        for col in first_col..=last_col {
                            let index = self.reader.read_u16()? as usize;
                            let value = self.reader.read_rk_number()?;
                            if criteria.contains(row, col) {
                                let kind = resolve_kind(&self.number_formats, Either::Right(index));
                                sheet.push(Cell { row, col, kind, value });
                            }
                        }
                    }
                    BOOL_ERR | NUMBER | RK | LABEL_SST | LABEL | FORMULA => {
                        let row = self.reader.read_u16()? as usize;
                        let col = self.reader.read_u16()? as usize;
                        if !criteria.contains(row, col) {
                            continue;
                        }
                        let (kind, value) = match tag {
                            BOOL_ERR => read_bool_or_error_cell(&mut self.reader)?,
                            NUMBER => read_number_cell(&mut self.reader)?,
                            RK => read_rk_cell(&mut self.reader)?,
                            LABEL_SST => read_label_sst_cell(&mut self.reader)?,
                            LABEL => read_label_cell(&mut self.reader)?,
                            _ => read_formula_cell(&mut self.reader)?,
                        };
                        if !value.is_empty() {
                            let kind = resolve_kind(&self.number_formats, kind);
                            sheet.push(Cell { row, col, kind, value });
                        }
                    }
                    _ => (),
                }
            }
            sheet.finish();
            log::info!(
                "read sheet '{}' of '{}': {} cells, no merge records",
                sheet_name,
                self.name,
                sheet.cells.len()
            );
            sheets.push(sheet);
        }
        Ok(sheets)
    }
}

fn resolve_kind(number_formats: &[CellType], kind: CellKind) -> CellType {
    match kind {
        Either::Left(kind) => kind,
        Either::Right(index) => number_formats.get(index).copied().unwrap_or(CellType::Number),
    }
}

/// Reads the SST record: two counts, then the unique strings.
fn load_shared_strings(reader: &mut Biff8Reader) -> Result<Vec<String>, SheetOutlineError> {
    reader.skip(4)?;
    let count = reader.read_usize()?;
    let mut shared_strings = Vec::<String>::with_capacity(count.min(u16::MAX as usize));
    for _ in 0..count {
        shared_strings.push(reader.read_xl_unicode_rich_extended_string()?);
    }
    Ok(shared_strings)
}

fn read_bool_or_error_cell(reader: &mut Biff8Reader) -> Result<(CellKind, String), SheetOutlineError> {
    reader.skip(2)?;
    let value = reader.read_u8()?;
    let is_error = reader.read_u8()? != 0;
    Ok(if is_error {
        (Either::Left(CellType::Error), to_error_value(value).to_owned())
    } else {
        (Either::Left(CellType::Boolean), value.to_string())
    })
}

fn read_number_cell(reader: &mut Biff8Reader) -> Result<(CellKind, String), SheetOutlineError> {
    let index = reader.read_u16()? as usize;
    let value = reader.read_f64()?;
    Ok((Either::Right(index), value.to_string()))
}

fn read_rk_cell(reader: &mut Biff8Reader) -> Result<(CellKind, String), SheetOutlineError> {
    let index = reader.read_u16()? as usize;
    let value = reader.read_rk_number()?;
    Ok((Either::Right(index), value))
}

fn read_label_sst_cell(reader: &mut Biff8Reader) -> Result<(CellKind, String), SheetOutlineError> {
    reader.skip(2)?;
    let index = reader.read_usize()?;
    Ok((Either::Left(CellType::SharedString), index.to_string()))
}

fn read_label_cell(reader: &mut Biff8Reader) -> Result<(CellKind, String), SheetOutlineError> {
    reader.skip(2)?;
    let value = reader.read_xl_unicode_string()?;
    Ok((Either::Left(CellType::InlineString), value))
}

/// Reads the cached result of a formula. A string result lives in the
/// `STRING` record that follows, possibly after the shared formula definition.
fn read_formula_cell(reader: &mut Biff8Reader) -> Result<(CellKind, String), SheetOutlineError> {
    let index = reader.read_u16()? as usize;
    let result = reader.read_u64()?;
    if result & 0xFFFF_0000_0000_0000 != 0xFFFF_0000_0000_0000 {
        return Ok((Either::Right(index), f64::from_bits(result).to_string()));
    }
    let payload = ((result >> 16) & 0xFF) as u8;
    match result & 0xFF {
        0 => loop {
            match reader.next()? {
                Some(STRING) => {
                    let value = reader.read_xl_unicode_string()?;
                    return Ok((Either::Left(CellType::InlineString), value));
                }
                Some(SHARED_FORMULA | ARRAY | TABLE) => (),
                _ => Err(XlsError::FormulaValueError(result))?,
            }
        },
        1 => Ok((Either::Left(CellType::Boolean), if payload != 0 { "1" } else { "0" }.to_owned())),
        2 => Ok((Either::Left(CellType::Error), to_error_value(payload).to_owned())),
        3 => Ok((Either::Left(CellType::InlineString), String::new())),
        _ => Err(XlsError::FormulaValueError(result))?,
    }
}
