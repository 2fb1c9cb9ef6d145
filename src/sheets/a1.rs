// src/sheets/a1.rs
//! Minimal A1-notation parsing.
//!
//! Only the shapes the service produces or accepts from registrations are
//! supported: `A1:Z1000`, `A:Z`, `A2:Z`, `Sheet!A1`, an optional `Sheet!` or
//! `'Quoted Sheet'!` prefix, and a bare sheet title meaning the whole sheet.
//! A bare token with neither `!` nor `:` is always a sheet title.

/// Number of columns covered when a range does not bound them (`A..Z`).
pub const DEFAULT_COLUMN_SPAN: u32 = 26;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct A1Range {
    /// Sheet title, unquoted.
    pub sheet: Option<String>,
    /// 0-based first column.
    pub start_col: u32,
    /// 1-based first row, `None` for whole-column ranges.
    pub start_row: Option<u32>,
    /// 0-based last column (inclusive), `None` when unbounded.
    pub end_col: Option<u32>,
    /// 1-based last row (inclusive), `None` when unbounded.
    pub end_row: Option<u32>,
}

impl A1Range {
    /// Parse a range string. Returns `None` for text that is neither a cell
    /// reference nor a usable sheet title.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        let (sheet, cells) = match split_sheet_prefix(input) {
            Some((sheet, cells)) => (Some(sheet), cells),
            None => (None, input),
        };

        if cells.is_empty() {
            return sheet.map(Self::whole_sheet);
        }
        // Without '!' or ':' the text names a sheet, even when it reads like
        // a cell ("Foo1", "AB12")
        if sheet.is_none() && !cells.contains(':') {
            return Some(Self::whole_sheet(cells.to_string()));
        }

        let (first, last) = match cells.split_once(':') {
            Some((a, b)) => (a, Some(b)),
            None => (cells, None),
        };

        let (start_col, start_row) = parse_cell(first)?;
        let start_col = start_col?;

        let (end_col, end_row) = match last {
            Some(last) => {
                let (col, row) = parse_cell(last)?;
                (col, row)
            }
            None => (Some(start_col), start_row),
        };

        Some(Self {
            sheet,
            start_col,
            start_row,
            end_col,
            end_row,
        })
    }

    fn whole_sheet(title: String) -> Self {
        Self {
            sheet: Some(title),
            start_col: 0,
            start_row: None,
            end_col: None,
            end_row: None,
        }
    }

    /// Last column covered, falling back to the default `A..Z` span.
    pub fn last_col(&self) -> u32 {
        self.end_col
            .unwrap_or(self.start_col + DEFAULT_COLUMN_SPAN - 1)
    }

    /// Prefix to put in front of derived ranges, e.g. `'My Sheet'!`.
    pub fn sheet_prefix(&self) -> String {
        self.sheet.as_deref().map(sheet_prefix).unwrap_or_default()
    }
}

/// Format a sheet title as an A1 prefix, quoting when required.
pub fn sheet_prefix(title: &str) -> String {
    let plain = !title.is_empty()
        && title
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        format!("{}!", title)
    } else {
        format!("'{}'!", title.replace('\'', "''"))
    }
}

fn split_sheet_prefix(input: &str) -> Option<(String, &str)> {
    if let Some(rest) = input.strip_prefix('\'') {
        // Quoted title: '' is an escaped quote
        let mut title = String::new();
        let mut chars = rest.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            if c == '\'' {
                if matches!(chars.peek(), Some((_, '\''))) {
                    title.push('\'');
                    chars.next();
                    continue;
                }
                let after = &rest[i + 1..];
                if after.is_empty() {
                    return Some((title, after));
                }
                return after.strip_prefix('!').map(|cells| (title, cells));
            }
            title.push(c);
        }
        return None;
    }

    input
        .split_once('!')
        .map(|(title, cells)| (title.to_string(), cells))
}

/// Parse `AB12`, `AB` or `12` into (0-based column, 1-based row).
fn parse_cell(cell: &str) -> Option<(Option<u32>, Option<u32>)> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    let split = cell
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(cell.len());
    let (letters, digits) = cell.split_at(split);

    let col = if letters.is_empty() {
        None
    } else {
        Some(column_index(letters)?)
    };
    let row = if digits.is_empty() {
        None
    } else {
        let row: u32 = digits.parse().ok()?;
        if row == 0 {
            return None;
        }
        Some(row)
    };

    if col.is_none() && row.is_none() {
        return None;
    }
    Some((col, row))
}

/// `A` -> 0, `Z` -> 25, `AA` -> 26.
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    let mut index: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        index = index * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
    }
    Some(index - 1)
}

/// 0 -> `A`, 25 -> `Z`, 26 -> `AA`.
pub fn column_letters(index: u32) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_round_trip() {
        assert_eq!(column_index("A"), Some(0));
        assert_eq!(column_index("z"), Some(25));
        assert_eq!(column_index("AA"), Some(26));
        assert_eq!(column_letters(0), "A");
        assert_eq!(column_letters(25), "Z");
        assert_eq!(column_letters(27), "AB");
        assert_eq!(column_index("A1"), None);
    }

    #[test]
    fn test_parse_plain_range() {
        let r = A1Range::parse("A1:Z1000").unwrap();
        assert_eq!(r.sheet, None);
        assert_eq!(r.start_col, 0);
        assert_eq!(r.start_row, Some(1));
        assert_eq!(r.end_col, Some(25));
        assert_eq!(r.end_row, Some(1000));
    }

    #[test]
    fn test_parse_prefixed_and_quoted() {
        let r = A1Range::parse("Orders!B2:F").unwrap();
        assert_eq!(r.sheet.as_deref(), Some("Orders"));
        assert_eq!(r.start_col, 1);
        assert_eq!(r.end_row, None);

        let r = A1Range::parse("'Q1 ''24'!A1:C3").unwrap();
        assert_eq!(r.sheet.as_deref(), Some("Q1 '24"));
        assert_eq!(r.sheet_prefix(), "'Q1 ''24'!");
    }

    #[test]
    fn test_parse_whole_sheet_and_columns() {
        let r = A1Range::parse("Sheet1").unwrap();
        assert_eq!(r.sheet.as_deref(), Some("Sheet1"));
        assert_eq!(r.last_col(), 25);

        let r = A1Range::parse("A:D").unwrap();
        assert_eq!(r.start_row, None);
        assert_eq!(r.end_col, Some(3));
    }

    #[test]
    fn test_bare_cell_like_token_is_a_sheet_title() {
        for title in ["Foo1", "AB12", "Q3"] {
            let r = A1Range::parse(title).unwrap();
            assert_eq!(r.sheet.as_deref(), Some(title));
            assert_eq!(r.start_col, 0);
            assert_eq!(r.start_row, None);
            assert_eq!(r.sheet_prefix(), format!("{}!", title));
        }

        // With a prefix the same text is a single cell
        let r = A1Range::parse("Data!AB12").unwrap();
        assert_eq!(r.sheet.as_deref(), Some("Data"));
        assert_eq!(r.start_col, 27);
        assert_eq!(r.start_row, Some(12));
        assert_eq!(r.end_row, Some(12));

        let r = A1Range::parse("'My Sheet'").unwrap();
        assert_eq!(r.sheet.as_deref(), Some("My Sheet"));
        assert_eq!(r.start_row, None);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(A1Range::parse("").is_none());
        assert!(A1Range::parse("Sheet1!A0").is_none());
        assert!(A1Range::parse("Sheet1!A1:??").is_none());
    }
}
