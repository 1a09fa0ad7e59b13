//! Conversions between A1-style cell references and 0-based indexes.

/// Converts column letters (`"A"`, `"AB"`) to a 0-based column index.
pub(crate) fn col_to_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    let mut index = 0usize;
    for letter in letters.bytes() {
        let letter = letter.to_ascii_uppercase();
        if !letter.is_ascii_uppercase() {
            return None;
        }
        index = index.checked_mul(26)?.checked_add((letter - b'A' + 1) as usize)?;
    }
    Some(index - 1)
}

/// Converts a 1-based row number (`"1"`, `"42"`) to a 0-based row index.
pub(crate) fn row_to_index(digits: &str) -> Option<usize> {
    digits.parse::<usize>().ok()?.checked_sub(1)
}

/// Converts a 0-based column index to column letters.
pub(crate) fn index_to_col(mut col: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (col % 26) as u8);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Converts 0-based indexes to an A1-style reference.
pub(crate) fn index_to_reference(row: usize, col: usize) -> String {
    format!("{}{}", index_to_col(col), row + 1)
}

/// Parses an A1-style cell reference (`"C7"`, `"$C$7"`) to 0-based `(row, col)`.
pub(crate) fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    let reference = reference.replace('$', "");
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    Some((row_to_index(digits)?, col_to_index(letters)?))
}
