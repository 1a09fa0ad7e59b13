use crate::outline::classify::RowLabel;

/// Maximal run of consecutive rows sharing one label. Rows are inclusive.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Section {
    pub label: RowLabel,
    pub start_row: usize,
    pub end_row: usize,
}

impl Section {
    pub fn rows(&self) -> std::ops::RangeInclusive<usize> {
        self.start_row..=self.end_row
    }

    pub fn row_count(&self) -> usize {
        self.end_row - self.start_row + 1
    }
}

/// Groups row labels into sections in a single top-to-bottom pass.
///
/// Any label change closes the open section, so blank rows always split
/// sections here; table detection decides later whether a gap is absorbed.
/// The sections cover every row exactly once.
pub fn segment_sections(labels: &[RowLabel]) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current: Option<Section> = None;
    for (row, label) in labels.iter().enumerate() {
        match current.as_mut() {
            Some(section) if section.label == *label => section.end_row = row,
            _ => {
                sections.extend(current.take());
                current = Some(Section { label: *label, start_row: row, end_row: row });
            }
        }
    }
    sections.extend(current);
    sections
}

#[cfg(test)]
mod tests {
    use super::*;
    use RowLabel::*;

    #[test]
    fn runs_of_one_label() {
        let sections = segment_sections(&[Header, Sparse, Sparse, Data, Data, Blank, Data]);

        assert_eq!(
            sections,
            vec![
                Section { label: Header, start_row: 0, end_row: 0 },
                Section { label: Sparse, start_row: 1, end_row: 2 },
                Section { label: Data, start_row: 3, end_row: 4 },
                Section { label: Blank, start_row: 5, end_row: 5 },
                Section { label: Data, start_row: 6, end_row: 6 },
            ]
        );
    }

    #[test]
    fn sections_cover_all_rows_once() {
        let labels = [Blank, Blank, Data, Sparse, Data, Data, Header, Blank];
        let sections = segment_sections(&labels);

        let mut next = 0;
        for section in &sections {
            assert_eq!(section.start_row, next);
            assert!(section.start_row <= section.end_row);
            assert!(section.rows().all(|row| labels[row] == section.label));
            next = section.end_row + 1;
        }
        assert_eq!(next, labels.len());
        assert_eq!(sections.iter().map(Section::row_count).sum::<usize>(), labels.len());
    }

    #[test]
    fn no_rows_no_sections() {
        assert!(segment_sections(&[]).is_empty());
    }
}
