use crate::helpers::reference::index_to_reference;
use chrono::Duration;
use chrono::NaiveDate;
use chrono::NaiveDateTime;

/// Epoch of the serial day numbers a workbook stores dates as.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) enum DateSystem {
    /// Day 1 is 1900-01-01, with the Lotus 1-2-3 phantom 1900-02-29 as day 60.
    #[default]
    V1900,
    /// Day 0 is 1904-01-01.
    V1904,
}

/// How the raw value of a cell has to be read.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) enum CellType {
    #[default]
    Empty,
    Boolean,
    Number,
    /// Serial number shown with a date and a time part
    DateTime(DateSystem),
    /// Serial number shown as a date
    Date(DateSystem),
    /// Fraction of a day shown as a time
    Time,
    /// ISO 8601 text from a `t="d"` cell
    IsoDateTime,
    InlineString,
    /// Index into the shared string table
    SharedString,
    Error,
}

impl CellType {
    /// Cell type implied by a built-in number format id.
    pub(crate) fn from_builtin_format_id(id: &str, system: DateSystem) -> Option<Self> {
        match id {
            "22" => Some(Self::DateTime(system)),
            "14" | "15" | "16" | "17" => Some(Self::Date(system)),
            "18" | "19" | "20" | "21" | "45" | "46" | "47" => Some(Self::Time),
            _ => None,
        }
    }

    /// Cell type implied by a custom format code such as `dd/mm/yyyy hh:mm`.
    ///
    /// Quoted literals, `[...]` sections (colors, conditions, elapsed hours are
    /// not dates) and characters escaped by `\` or `_` are ignored. `m` alone
    /// is ambiguous between months and minutes and decides nothing.
    pub(crate) fn from_format_code(format: &str, system: DateSystem) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_section = false;
        let mut is_date = false;
        let mut is_time = false;
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '"' => is_literal = !is_literal,
                _ if is_literal => (),
                '\\' | '_' => is_escaped = true,
                '[' => is_section = true,
                ']' => is_section = false,
                _ if is_section => (),
                'Y' | 'y' | 'D' | 'd' => is_date = true,
                'H' | 'h' | 'S' | 's' => is_time = true,
                _ => (),
            }
        }
        match (is_date, is_time) {
            (true, true) => Self::DateTime(system),
            (true, false) => Self::Date(system),
            (false, true) => Self::Time,
            (false, false) => Self::Number,
        }
    }
}

/// A non-empty cell as read from a worksheet.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Cell {
    /// Row index (0-based)
    pub(crate) row: usize,
    /// Column index (0-based)
    pub(crate) col: usize,
    pub(crate) kind: CellType,
    /// Raw value as stored in the file
    pub(crate) value: String,
}

impl Cell {
    /// Excel-style reference such as `B7`.
    pub(crate) fn reference(&self) -> String {
        index_to_reference(self.row, self.col)
    }

    /// Display text of the cell.
    ///
    /// Dates become `YYYY-MM-DD`, date-times `YYYY-MM-DD HH:MM:SS`, times
    /// `HH:MM:SS` and booleans `TRUE`/`FALSE`. A serial number that cannot be
    /// converted is shown as written.
    pub(crate) fn text(&self) -> String {
        let converted = match self.kind {
            CellType::Boolean => Some(if self.value.trim() == "1" { "TRUE" } else { "FALSE" }.to_owned()),
            CellType::Date(system) => serial_to_datetime(&self.value, system)
                .map(|datetime| datetime.format("%Y-%m-%d").to_string()),
            CellType::DateTime(system) => serial_to_datetime(&self.value, system)
                .map(|datetime| datetime.format("%Y-%m-%d %H:%M:%S").to_string()),
            CellType::Time => serial_to_time(&self.value),
            CellType::IsoDateTime => Some(self.value.replacen('T', " ", 1)),
            _ => None,
        };
        converted.unwrap_or_else(|| self.value.to_owned())
    }
}

/// Converts a serial day number to a timestamp, rounded to the second.
fn serial_to_datetime(value: &str, system: DateSystem) -> Option<NaiveDateTime> {
    let serial = value.trim().parse::<f64>().ok().filter(|serial| serial.is_finite() && *serial >= 0.0)?;
    let mut days = serial.trunc() as i64;
    let seconds = (serial.fract() * 86_400f64).round() as i64;
    match system {
        DateSystem::V1900 if days < 60 => days += 1,
        DateSystem::V1900 => (),
        DateSystem::V1904 => days += 1_462,
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    epoch
        .checked_add_signed(Duration::try_days(days)?)?
        .checked_add_signed(Duration::try_seconds(seconds)?)
}

/// Display text of a BIFF8 error code.
pub(crate) fn to_error_value(code: u8) -> &'static str {
    match code {
        0x00 => "#NULL!",
        0x07 => "#DIV/0!",
        0x0F => "#VALUE!",
        0x17 => "#REF!",
        0x1D => "#NAME?",
        0x24 => "#NUM!",
        0x2A => "#N/A",
        0x2B => "#GETTING_DATA",
        _ => "#ERROR!",
    }
}

/// Formats a day fraction as `HH:MM:SS`; hours keep counting past 24.
fn serial_to_time(value: &str) -> Option<String> {
    let serial = value.trim().parse::<f64>().ok().filter(|serial| serial.is_finite() && *serial >= 0.0)?;
    let total = (serial * 86_400f64).round();
    if total > i64::MAX as f64 {
        return None;
    }
    let total = total as i64;
    Some(format!("{:02}:{:02}:{:02}", total / 3_600, total / 60 % 60, total % 60))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(kind: CellType, value: &str) -> Cell {
        Cell {
            row: 6,
            col: 1,
            kind,
            value: value.to_owned(),
        }
    }

    #[test]
    fn format_codes() {
        let system = DateSystem::V1900;
        assert_eq!(CellType::from_format_code("yyyy-mm-dd", system), CellType::Date(system));
        assert_eq!(CellType::from_format_code("dd/mm/yyyy hh:mm", system), CellType::DateTime(system));
        assert_eq!(CellType::from_format_code("hh:mm:ss", system), CellType::Time);
        assert_eq!(CellType::from_format_code("[Red]#,##0.00", system), CellType::Number);
        assert_eq!(CellType::from_format_code("0.00\" days\"", system), CellType::Number);
        assert_eq!(CellType::from_format_code("#,##0_);(#,##0)", system), CellType::Number);
        assert_eq!(CellType::from_builtin_format_id("14", DateSystem::V1904), Some(CellType::Date(DateSystem::V1904)));
        assert_eq!(CellType::from_builtin_format_id("46", system), Some(CellType::Time));
        assert_eq!(CellType::from_builtin_format_id("2", system), None);
    }

    #[test]
    fn dates_in_both_systems() {
        assert_eq!(cell(CellType::Date(DateSystem::V1900), "1").text(), "1900-01-01");
        assert_eq!(cell(CellType::Date(DateSystem::V1900), "59").text(), "1900-02-28");
        assert_eq!(cell(CellType::Date(DateSystem::V1900), "61").text(), "1900-03-01");
        assert_eq!(cell(CellType::Date(DateSystem::V1900), "45292").text(), "2024-01-01");
        assert_eq!(cell(CellType::Date(DateSystem::V1904), "0").text(), "1904-01-01");
        assert_eq!(
            cell(CellType::DateTime(DateSystem::V1900), "45292.75").text(),
            "2024-01-01 18:00:00"
        );
    }

    #[test]
    fn times_and_scalars() {
        assert_eq!(cell(CellType::Time, "0.5").text(), "12:00:00");
        assert_eq!(cell(CellType::Time, "1.25").text(), "30:00:00");
        assert_eq!(cell(CellType::Boolean, "1").text(), "TRUE");
        assert_eq!(cell(CellType::Boolean, "0").text(), "FALSE");
        assert_eq!(cell(CellType::Number, "1234.50").text(), "1234.50");
        assert_eq!(cell(CellType::Error, "#DIV/0!").text(), "#DIV/0!");
        assert_eq!(cell(CellType::IsoDateTime, "2024-01-01T08:30:00").text(), "2024-01-01 08:30:00");
        assert_eq!(cell(CellType::Date(DateSystem::V1900), "n/a").text(), "n/a");
        assert_eq!(cell(CellType::Date(DateSystem::V1900), "-3").text(), "-3");
        assert_eq!(cell(CellType::Number, "").reference(), "B7");
    }

    #[test]
    fn error_codes() {
        assert_eq!(to_error_value(0x07), "#DIV/0!");
        assert_eq!(to_error_value(0x2A), "#N/A");
        assert_eq!(to_error_value(0xFF), "#ERROR!");
    }
}
