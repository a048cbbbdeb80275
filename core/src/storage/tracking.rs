use std::path::{Path, PathBuf};

use serde::Serialize;
use slog::{warn, Logger};
use umya_spreadsheet::{reader, writer, Spreadsheet, Worksheet};

use crate::Error;

const REFERENCE_COLUMN: &str = "B";
const COUNT_COLUMN: &str = "C";

/// Largest recording key the sheet accepts; keeps row `key + 1` inside the
/// 1,048,576 rows an xlsx worksheet can hold.
pub const MAX_KEY: u32 = 1_048_575;

pub const BAD_DATA: &str = "Bad Data";

/// How far a detected beat count is from the reference count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Band {
    /// More than 10 beats off; the count is replaced by [`BAD_DATA`].
    BadData,
    /// 6 to 10 off.
    Far,
    /// 3 to 5 off.
    Near,
    /// 1 or 2 off.
    Close,
    Exact,
    /// No numeric reference to compare with.
    NotTracked,
}

impl Band {
    pub fn classify(count: i64, reference: i64) -> Band {
        match (count - reference).abs() {
            d if d > 10 => Band::BadData,
            d if d > 5 => Band::Far,
            d if d > 2 => Band::Near,
            d if d > 0 => Band::Close,
            _ => Band::Exact,
        }
    }

    pub fn fill(self) -> Fill {
        match self {
            Band::BadData => Fill::Grey,
            Band::Far => Fill::Red,
            Band::Near => Fill::Orange,
            Band::Close => Fill::Yellow,
            Band::Exact => Fill::Green,
            Band::NotTracked => Fill::White,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Fill {
    Grey,
    Red,
    Orange,
    Yellow,
    Green,
    White,
}

impl Fill {
    pub fn argb(self) -> &'static str {
        match self {
            Fill::Grey => "FFC0C0C0",
            Fill::Red => "FFFF0000",
            Fill::Orange => "FFFF8C00",
            Fill::Yellow => "FFFFFF00",
            Fill::Green => "FF00FF00",
            Fill::White => "FFFFFFFF",
        }
    }
}

fn parse_count(cell: &str) -> Option<i64> {
    let cell = cell.trim();
    cell.parse::<i64>().ok().or_else(|| {
        cell.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(|v| v.trunc() as i64)
    })
}

fn sheet_error(e: impl std::fmt::Display) -> Error {
    Error::Sheet(e.to_string())
}

/// The beat tracking workbook. Recording `key` owns row `key + 1` of the
/// first worksheet: column B holds the reference count, column C receives
/// the detected count, solid-filled by how far apart the two are.
pub struct TrackingSheet {
    path: PathBuf,
    book: Spreadsheet,
}

impl TrackingSheet {
    /// Opens the workbook at `path`, starting a new one when it does not
    /// exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        let book = if path.exists() {
            reader::xlsx::read(&path).map_err(sheet_error)?
        } else {
            umya_spreadsheet::new_file()
        };
        let sheet = TrackingSheet { path, book };
        sheet.worksheet()?;
        Ok(sheet)
    }

    fn worksheet(&self) -> Result<&Worksheet, Error> {
        self.book
            .get_sheet(&0)
            .ok_or_else(|| Error::Sheet("workbook has no worksheet".to_string()))
    }

    fn worksheet_mut(&mut self) -> Option<&mut Worksheet> {
        self.book.get_sheet_mut(&0)
    }

    /// Text of the cell at `coordinate` (`"C2"`), if it holds anything.
    pub fn value(&self, coordinate: &str) -> Option<String> {
        let cell = self.worksheet().ok()?.get_cell(coordinate)?;
        let value = cell.get_value().to_string();
        (!value.is_empty()).then_some(value)
    }

    /// ARGB of the solid fill at `coordinate`.
    pub fn fill_argb(&self, coordinate: &str) -> Option<String> {
        let cell = self.worksheet().ok()?.get_cell(coordinate)?;
        cell.get_style()
            .get_background_color()
            .map(|color| color.get_argb().to_string())
    }

    /// Writes `count` for recording `key` and colors it by its distance
    /// from the reference count in the same row.
    pub fn annotate(&mut self, key: u32, count: usize, log: &Logger) -> Band {
        if key > MAX_KEY {
            warn!(log, "recording key beyond the last worksheet row"; "key" => key);
            return Band::NotTracked;
        }
        let row = key + 1;
        let count_cell = format!("{COUNT_COLUMN}{row}");

        let reference = self
            .value(&format!("{REFERENCE_COLUMN}{row}"))
            .as_deref()
            .and_then(parse_count);
        let band = match reference {
            Some(reference) => Band::classify(count as i64, reference),
            None => {
                warn!(log, "recording has not been tracked"; "key" => key);
                Band::NotTracked
            }
        };

        let Some(sheet) = self.worksheet_mut() else {
            warn!(log, "workbook has no worksheet"; "key" => key);
            return Band::NotTracked;
        };
        if band == Band::BadData {
            sheet.get_cell_mut(count_cell.as_str()).set_value(BAD_DATA);
        } else {
            sheet
                .get_cell_mut(count_cell.as_str())
                .set_value_number(count as f64);
        }
        sheet
            .get_style_mut(count_cell.as_str())
            .set_background_color(band.fill().argb());
        band
    }

    pub fn save(&self) -> Result<(), Error> {
        writer::xlsx::write(&self.book, &self.path).map_err(sheet_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::silent_logger;

    fn workbook_with_references(path: &Path, references: &[(u32, &str)]) {
        let mut book = umya_spreadsheet::new_file();
        let sheet = book.get_sheet_mut(&0).unwrap();
        sheet.get_cell_mut("A1").set_value("file");
        sheet.get_cell_mut("B1").set_value("reference");
        for (key, reference) in references {
            let row = key + 1;
            sheet.get_cell_mut(format!("A{row}").as_str()).set_value(format!("data{key}"));
            sheet.get_cell_mut(format!("B{row}").as_str()).set_value(*reference);
        }
        writer::xlsx::write(&book, path).unwrap();
    }

    #[test]
    fn bands_follow_the_difference() {
        assert_eq!(Band::classify(50, 38), Band::BadData);
        assert_eq!(Band::classify(30, 40), Band::Far);
        assert_eq!(Band::classify(35, 40), Band::Near);
        assert_eq!(Band::classify(42, 40), Band::Close);
        assert_eq!(Band::classify(40, 40), Band::Exact);
        assert_eq!(Band::Far.fill().argb(), "FFFF0000");
    }

    #[test]
    fn annotates_workbook_rows_by_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Beat_Tracking.xlsx");
        workbook_with_references(&path, &[(1, "34"), (2, "20"), (3, ""), (4, "37")]);
        let log = silent_logger();

        let mut sheet = TrackingSheet::open(&path).unwrap();
        assert_eq!(sheet.annotate(1, 34, &log), Band::Exact);
        assert_eq!(sheet.annotate(2, 40, &log), Band::BadData);
        assert_eq!(sheet.annotate(3, 12, &log), Band::NotTracked);
        assert_eq!(sheet.annotate(4, 30, &log), Band::Far);
        sheet.save().unwrap();

        let reopened = TrackingSheet::open(&path).unwrap();
        assert_eq!(reopened.value("A2").as_deref(), Some("data1"));
        assert_eq!(reopened.value("C2").as_deref(), Some("34"));
        assert_eq!(reopened.fill_argb("C2").as_deref(), Some(Fill::Green.argb()));
        assert_eq!(reopened.value("C3").as_deref(), Some(BAD_DATA));
        assert_eq!(reopened.fill_argb("C3").as_deref(), Some(Fill::Grey.argb()));
        assert_eq!(reopened.value("C4").as_deref(), Some("12"));
        assert_eq!(reopened.fill_argb("C4").as_deref(), Some(Fill::White.argb()));
        assert_eq!(reopened.fill_argb("C5").as_deref(), Some(Fill::Red.argb()));
    }

    #[test]
    fn missing_workbook_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.xlsx");
        let mut sheet = TrackingSheet::open(&path).unwrap();

        assert_eq!(sheet.annotate(4, 7, &silent_logger()), Band::NotTracked);
        assert_eq!(sheet.value("C5").as_deref(), Some("7"));
        assert_eq!(sheet.value("C2"), None);
        sheet.save().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn oversized_keys_are_not_tracked() {
        let dir = tempfile::tempdir().unwrap();
        let mut sheet = TrackingSheet::open(dir.path().join("new.xlsx")).unwrap();

        assert_eq!(sheet.annotate(u32::MAX, 7, &silent_logger()), Band::NotTracked);
        assert_eq!(sheet.annotate(MAX_KEY + 1, 7, &silent_logger()), Band::NotTracked);
        assert_eq!(sheet.value(&format!("C{}", MAX_KEY + 2)), None);
    }

    #[test]
    fn float_references_are_truncated() {
        assert_eq!(parse_count(" 34.0 "), Some(34));
        assert_eq!(parse_count("x"), None);
    }
}
