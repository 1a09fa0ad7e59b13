//! Office Open XML package helpers shared by the workbook parts.
use crate::error::SheetOutlineError;
use crate::helpers::reader::UnifiedReader;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::cell::DateSystem;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use std::collections::HashMap;
use zip::ZipArchive;

const TAG_RELATIONSHIP: &[u8] = b"Relationship";

/// Reads a `.rels` part and maps worksheet relationship ids to archive paths.
pub(super) fn load_relationships(
    zip: &mut ZipArchive<UnifiedReader>,
    file_name: &str,
    path: &str,
) -> Result<HashMap<String, String>, SheetOutlineError> {
    let mut reader = zip
        .xml_reader(path)?
        .ok_or_else(|| SpreadsheetError::MissingPartError(file_name.to_owned(), path.to_owned()))?;
    let mut relationships = HashMap::<String, String>::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = event.get_attribute_value("Id")?;
            let target = event.get_attribute_value("Target")?;
            let is_worksheet = event
                .get_attribute_value("Type")?
                .map_or(true, |kind| kind.ends_with("/worksheet"));
            if let Some((id, target)) = id.zip(target).filter(|_| is_worksheet) {
                relationships.insert(id.into_owned(), to_zip_path(&target));
            }
        }
    });
    Ok(relationships)
}

/// Resolves the number format of every cell style (`cellXfs` order) to the
/// cell type it implies; custom codes win over built-in ids.
pub(super) fn resolve_number_formats(
    format_ids: &[String],
    custom_formats: &HashMap<String, CellType>,
    system: DateSystem,
) -> Vec<CellType> {
    format_ids
        .iter()
        .map(|id| {
            custom_formats
                .get(id)
                .copied()
                .or_else(|| CellType::from_builtin_format_id(id, system))
                .unwrap_or(CellType::Number)
        })
        .collect()
}

/// Turns a relationship target into an archive path, relative targets being
/// relative to `xl/`.
pub(super) fn to_zip_path(target: &str) -> String {
    let target = target.replace('\\', "/");
    if let Some(absolute) = target.strip_prefix('/') {
        absolute.to_owned()
    } else if target.starts_with("xl/") {
        target
    } else {
        format!("xl/{}", target.trim_start_matches("./"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zip_paths() {
        assert_eq!(to_zip_path("worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(to_zip_path("/xl/worksheets/sheet2.xml"), "xl/worksheets/sheet2.xml");
        assert_eq!(to_zip_path("xl/worksheets/sheet3.xml"), "xl/worksheets/sheet3.xml");
        assert_eq!(to_zip_path("./worksheets/sheet4.xml"), "xl/worksheets/sheet4.xml");
    }

    #[test]
    fn custom_formats_override_builtin_ids() {
        let system = DateSystem::V1900;
        let custom = HashMap::from([("14".to_owned(), CellType::Number), ("164".to_owned(), CellType::Time)]);
        let ids = ["0", "14", "164", "22"].map(str::to_owned);

        assert_eq!(
            resolve_number_formats(&ids, &custom, system),
            vec![CellType::Number, CellType::Number, CellType::Time, CellType::DateTime(system)]
        );
    }
}
