//! Dataset source over per-year CSV exports of the PEDE workbook.
//!
//! Each year lives in `PEDE<year>.csv`. Column names drift between years
//! ("INDE 22", "INDE 2023", ...), so headers are resolved through a versioned
//! `ColumnMap` before any cell is read.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use crate::domain::{Column, Pedra, StudentRecord};
use crate::ports::{DatasetError, DatasetSource};

/// Target of a dataset column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Indicator(Column),
    Pedra,
}

/// Header-to-field mapping.
///
/// Explicit per-year synonyms are tried first, then case-folded generic
/// matches. The first header matching a field wins.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    version: u32,
    year_synonyms: Vec<(u16, &'static str, Field)>,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self::v1()
    }
}

impl ColumnMap {
    /// Naming used by the 2022-2024 exports.
    #[must_use]
    pub fn v1() -> Self {
        Self {
            version: 1,
            year_synonyms: vec![
                (2022, "INDE 22", Field::Indicator(Column::Inde)),
                (2022, "Pedra 22", Field::Pedra),
                (2023, "INDE 2023", Field::Indicator(Column::Inde)),
                (2023, "Pedra 2023", Field::Pedra),
                (2024, "INDE 2024", Field::Indicator(Column::Inde)),
                (2024, "Pedra 2024", Field::Pedra),
            ],
        }
    }

    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    fn generic(header: &str) -> Option<Field> {
        let lower = header.to_lowercase();
        let field = match lower.as_str() {
            "inde" => Field::Indicator(Column::Inde),
            "iaa" => Field::Indicator(Column::Iaa),
            "ieg" => Field::Indicator(Column::Ieg),
            "ips" => Field::Indicator(Column::Ips),
            "ida" => Field::Indicator(Column::Ida),
            "ipv" => Field::Indicator(Column::Ipv),
            "ian" => Field::Indicator(Column::Ian),
            "pedra" => Field::Pedra,
            _ if lower.contains("defas") => Field::Indicator(Column::Defasagem),
            _ => return None,
        };
        Some(field)
    }

    /// Map each recognized field to the index of its column.
    #[must_use]
    pub fn resolve<S: AsRef<str>>(&self, year: u16, headers: &[S]) -> BTreeMap<Field, usize> {
        let mut fields = BTreeMap::new();
        for (idx, header) in headers.iter().enumerate() {
            let header = header.as_ref().trim();
            let explicit = self
                .year_synonyms
                .iter()
                .find(|(y, name, _)| *y == year && name.eq_ignore_ascii_case(header));
            if let Some((_, _, field)) = explicit {
                fields.entry(*field).or_insert(idx);
            }
        }
        for (idx, header) in headers.iter().enumerate() {
            if let Some(field) = Self::generic(header.as_ref().trim()) {
                fields.entry(field).or_insert(idx);
            }
        }
        fields
    }
}

/// Parse a numeric cell. Accepts a decimal comma; anything else is missing.
#[must_use]
pub fn parse_number(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }
    let value = if trimmed.contains(',') && !trimmed.contains('.') {
        trimmed.replace(',', ".").parse::<f64>().ok()
    } else {
        trimmed.parse::<f64>().ok()
    };
    value.filter(|v| v.is_finite())
}

/// Pick `;` or `,` from the header line.
fn detect_delimiter(content: &str) -> u8 {
    let header = content.lines().next().unwrap_or_default();
    if header.matches(';').count() > header.matches(',').count() {
        b';'
    } else {
        b','
    }
}

/// `DatasetSource` reading `PEDE<year>.csv` files from one directory.
#[derive(Debug, Clone)]
pub struct CsvDataset {
    dir: PathBuf,
    years: Vec<u16>,
    map: ColumnMap,
}

impl CsvDataset {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, years: &[u16]) -> Self {
        let mut years = years.to_vec();
        years.sort_unstable();
        years.dedup();
        Self {
            dir: dir.into(),
            years,
            map: ColumnMap::v1(),
        }
    }

    #[must_use]
    pub fn path_for(&self, year: u16) -> PathBuf {
        self.dir.join(format!("PEDE{year}.csv"))
    }

    /// Parse one year's CSV text.
    ///
    /// # Errors
    /// Returns `DatasetError::Malformed` if the CSV structure cannot be read.
    pub fn parse(&self, year: u16, content: &str) -> Result<Vec<StudentRecord>, DatasetError> {
        let malformed = |e: csv::Error| DatasetError::Malformed {
            year,
            reason: e.to_string(),
        };

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(detect_delimiter(content))
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(malformed)?
            .iter()
            .map(str::to_string)
            .collect();
        let fields = self.map.resolve(year, &headers);
        if fields.is_empty() {
            return Err(DatasetError::Malformed {
                year,
                reason: "no recognized columns".to_string(),
            });
        }

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row.map_err(malformed)?;
            if row.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }
            let mut record = StudentRecord::new(year);
            for (field, idx) in &fields {
                let cell = row.get(*idx).unwrap_or_default();
                match field {
                    Field::Indicator(column) => record.set(*column, parse_number(cell)),
                    Field::Pedra => record.pedra = Pedra::parse(cell),
                }
            }
            records.push(record);
        }

        tracing::debug!(
            "Parsed {} records for {} (column map v{})",
            records.len(),
            year,
            self.map.version()
        );
        Ok(records)
    }
}

impl DatasetSource for CsvDataset {
    fn years(&self) -> Vec<u16> {
        self.years.clone()
    }

    fn load_year(&self, year: u16) -> Result<Vec<StudentRecord>, DatasetError> {
        let path = self.path_for(year);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DatasetError::MissingYear(year));
            }
            Err(e) => {
                return Err(DatasetError::Io {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                });
            }
        };
        // Spreadsheet exports often start with a UTF-8 BOM.
        let content = content.trim_start_matches('\u{feff}');
        self.parse(year, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_year_synonyms() {
        let map = ColumnMap::v1();
        let headers = ["RA", "INDE 22", "Pedra 22", "IAA", "Defas"];
        let fields = map.resolve(2022, &headers);
        assert_eq!(fields[&Field::Indicator(Column::Inde)], 1);
        assert_eq!(fields[&Field::Pedra], 2);
        assert_eq!(fields[&Field::Indicator(Column::Iaa)], 3);
        assert_eq!(fields[&Field::Indicator(Column::Defasagem)], 4);

        // 2022 synonyms do not apply to 2023 headers.
        let fields = map.resolve(2023, &["INDE 22", "INDE 2023"]);
        assert_eq!(fields[&Field::Indicator(Column::Inde)], 1);
    }

    #[test]
    fn test_first_match_wins() {
        let fields = ColumnMap::v1().resolve(2024, &["Defasagem", "Defas anterior", "ida"]);
        assert_eq!(fields[&Field::Indicator(Column::Defasagem)], 0);
        assert_eq!(fields[&Field::Indicator(Column::Ida)], 2);
        assert!(!fields.contains_key(&Field::Pedra));
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(" 7,5 "), Some(7.5));
        assert_eq!(parse_number("8.25"), Some(8.25));
        assert_eq!(parse_number("-2"), Some(-2.0));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("#N/A"), None);
        assert_eq!(parse_number("NaN"), None);
    }

    #[test]
    fn test_parse_semicolon_export() {
        let dataset = CsvDataset::new("unused", &[2023]);
        let content = "RA;INDE 2023;Pedra 2023;IDA;IEG;Defasagem\n\
                       RA-1;7,2;Agata;6,5;8;-1\n\
                       ;;;;;\n\
                       RA-2;n/d;Topázio;9;9,5;-2\n";
        let records = dataset.parse(2023, content).expect("parses");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].inde, Some(7.2));
        assert_eq!(records[0].pedra, Some(Pedra::Agata));
        assert_eq!(records[0].ieg, Some(8.0));
        assert_eq!(records[1].inde, None);
        assert_eq!(records[1].pedra, Some(Pedra::Topazio));
        assert_eq!(records[1].lagging(), Some(true));
        assert!(records.iter().all(|r| r.year == 2023));
    }

    #[test]
    fn test_load_year_from_dir() {
        let temp = tempdir().expect("tempdir");
        fs::write(
            temp.path().join("PEDE2024.csv"),
            "\u{feff}INDE 2024,Pedra 2024,IAN\n8.1,Ametista,10\n5.0,Quartzo,5\n",
        )
        .expect("write csv");

        let dataset = CsvDataset::new(temp.path(), &[2024, 2022]);
        assert_eq!(dataset.years(), vec![2022, 2024]);

        let records = dataset.load_year(2024).expect("loads");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].inde, Some(8.1));
        assert_eq!(records[1].ian, Some(5.0));

        assert_eq!(dataset.load_year(2022), Err(DatasetError::MissingYear(2022)));
    }

    #[test]
    fn test_unrecognized_headers() {
        let dataset = CsvDataset::new("unused", &[2024]);
        let err = dataset.parse(2024, "Nome,Turma\nAna,A\n").unwrap_err();
        assert!(matches!(err, DatasetError::Malformed { year: 2024, .. }));
    }
}
