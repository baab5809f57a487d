//! Analytics service: Aggregate statistics over the PEDE dataset.
//!
//! Everything here is descriptive; none of it feeds the risk model.

use std::collections::BTreeMap;

use crate::domain::{Column, Pedra, StudentRecord};
use crate::ports::{DatasetError, DatasetSource};

/// Headline metrics for one evaluation year.
#[derive(Debug, Clone, PartialEq)]
pub struct YearSummary {
    pub year: u16,
    pub students: usize,
    pub mean_inde: Option<f64>,
    pub mean_defasagem: Option<f64>,
    /// Share of students (0..=1) with DEFASAGEM at or below `DEFASAGEM_RISK_CUTOFF`.
    /// Students without a DEFASAGEM value count as not lagging.
    pub lagging_share: Option<f64>,
}

/// Per-year means for the trend table.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendPoint {
    pub year: u16,
    pub students: usize,
    pub mean_inde: Option<f64>,
    pub mean_defasagem: Option<f64>,
}

/// Pairwise Pearson correlations between indicator columns.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub columns: Vec<Column>,
    /// Row-major, `values[i][j]` = corr(columns[i], columns[j]).
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    #[must_use]
    pub fn get(&self, a: Column, b: Column) -> Option<f64> {
        let i = self.columns.iter().position(|c| *c == a)?;
        let j = self.columns.iter().position(|c| *c == b)?;
        self.values[i][j]
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

fn column_mean(records: &[StudentRecord], column: Column) -> Option<f64> {
    mean(records.iter().filter_map(|r| r.get(column)))
}

/// Pearson correlation over complete pairs.
///
/// `None` with fewer than two pairs or when either side has zero variance.
#[must_use]
pub fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mx = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let my = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in pairs {
        let dx = x - mx;
        let dy = y - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some((sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0))
}

/// Service computing dataset statistics on demand.
pub struct AnalyticsService<D>
where
    D: DatasetSource,
{
    source: D,
}

impl<D> AnalyticsService<D>
where
    D: DatasetSource,
{
    /// Create a new analytics service.
    pub fn new(source: D) -> Self {
        Self { source }
    }

    #[must_use]
    pub fn years(&self) -> Vec<u16> {
        self.source.years()
    }

    /// # Errors
    /// Propagates the dataset error for `year`.
    pub fn year_summary(&self, year: u16) -> Result<YearSummary, DatasetError> {
        let records = self.source.load_year(year)?;
        Ok(Self::summarize(year, &records))
    }

    fn summarize(year: u16, records: &[StudentRecord]) -> YearSummary {
        let students = records.len();
        let lagging = records.iter().filter(|r| r.lagging() == Some(true)).count();
        YearSummary {
            year,
            students,
            mean_inde: column_mean(records, Column::Inde),
            mean_defasagem: column_mean(records, Column::Defasagem),
            lagging_share: (students > 0).then(|| lagging as f64 / students as f64),
        }
    }

    /// Mean INDE and DEFASAGEM for every configured year that loads.
    ///
    /// Years without data are skipped.
    #[must_use]
    pub fn trend(&self) -> Vec<TrendPoint> {
        let mut points = Vec::new();
        for year in self.source.years() {
            match self.source.load_year(year) {
                Ok(records) => points.push(TrendPoint {
                    year,
                    students: records.len(),
                    mean_inde: column_mean(&records, Column::Inde),
                    mean_defasagem: column_mean(&records, Column::Defasagem),
                }),
                Err(DatasetError::MissingYear(_)) => {
                    tracing::debug!("No dataset for {}, skipping in trend", year);
                }
                Err(e) => tracing::warn!("Skipping {} in trend: {}", year, e),
            }
        }
        points
    }

    /// Student count per pedra for one year, in ascending pedra order.
    ///
    /// # Errors
    /// Propagates the dataset error for `year`.
    pub fn pedra_distribution(&self, year: u16) -> Result<Vec<(Pedra, usize)>, DatasetError> {
        let records = self.source.load_year(year)?;
        let mut counts: BTreeMap<Pedra, usize> = Pedra::ALL.iter().map(|p| (*p, 0)).collect();
        for pedra in records.iter().filter_map(|r| r.pedra) {
            *counts.entry(pedra).or_default() += 1;
        }
        Ok(counts.into_iter().collect())
    }

    /// Correlations between IDA, IEG, IAA, IPS, IPV, IAN and INDE across all
    /// years that load.
    #[must_use]
    pub fn correlation_matrix(&self) -> CorrelationMatrix {
        let mut records = Vec::new();
        for year in self.source.years() {
            match self.source.load_year(year) {
                Ok(mut year_records) => records.append(&mut year_records),
                Err(e) => tracing::debug!("Correlation skips {}: {}", year, e),
            }
        }
        Self::correlate(&records, &Column::CORRELATED)
    }

    fn correlate(records: &[StudentRecord], columns: &[Column]) -> CorrelationMatrix {
        let values = columns
            .iter()
            .map(|a| {
                columns
                    .iter()
                    .map(|b| {
                        let pairs: Vec<(f64, f64)> = records
                            .iter()
                            .filter_map(|r| Some((r.get(*a)?, r.get(*b)?)))
                            .collect();
                        pearson(&pairs)
                    })
                    .collect()
            })
            .collect();
        CorrelationMatrix {
            columns: columns.to_vec(),
            values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MemoryDataset {
        years: Vec<u16>,
        data: HashMap<u16, Vec<StudentRecord>>,
    }

    impl DatasetSource for MemoryDataset {
        fn years(&self) -> Vec<u16> {
            self.years.clone()
        }

        fn load_year(&self, year: u16) -> Result<Vec<StudentRecord>, DatasetError> {
            self.data
                .get(&year)
                .cloned()
                .ok_or(DatasetError::MissingYear(year))
        }
    }

    fn record(
        year: u16,
        inde: Option<f64>,
        defasagem: Option<f64>,
        pedra: Option<Pedra>,
    ) -> StudentRecord {
        StudentRecord {
            inde,
            defasagem,
            pedra,
            ..StudentRecord::new(year)
        }
    }

    fn create_test_service() -> AnalyticsService<MemoryDataset> {
        let mut data = HashMap::new();
        data.insert(
            2022,
            vec![
                record(2022, Some(6.0), Some(-1.0), Some(Pedra::Agata)),
                record(2022, Some(8.0), Some(0.0), Some(Pedra::Topazio)),
            ],
        );
        data.insert(
            2024,
            vec![
                record(2024, Some(7.0), Some(-2.0), Some(Pedra::Quartzo)),
                record(2024, Some(9.0), Some(-3.0), Some(Pedra::Ametista)),
                record(2024, None, None, Some(Pedra::Ametista)),
                record(2024, Some(8.0), Some(0.0), None),
            ],
        );
        AnalyticsService::new(MemoryDataset {
            years: vec![2022, 2023, 2024],
            data,
        })
    }

    #[test]
    fn test_year_summary() {
        let service = create_test_service();
        let summary = service.year_summary(2024).expect("summary");

        assert_eq!(summary.students, 4);
        assert_eq!(summary.mean_inde, Some(8.0));
        assert!((summary.mean_defasagem.unwrap() - (-5.0 / 3.0)).abs() < 1e-12);
        // Two of four students at or below -2; the missing value counts as not lagging.
        assert_eq!(summary.lagging_share, Some(0.5));
    }

    #[test]
    fn test_missing_year() {
        let service = create_test_service();
        assert_eq!(
            service.year_summary(2023),
            Err(DatasetError::MissingYear(2023))
        );
    }

    #[test]
    fn test_trend_skips_missing_years() {
        let service = create_test_service();
        let trend = service.trend();

        assert_eq!(trend.len(), 2);
        assert_eq!(trend[0].year, 2022);
        assert_eq!(trend[0].mean_inde, Some(7.0));
        assert_eq!(trend[1].year, 2024);
        assert_eq!(trend[1].students, 4);
    }

    #[test]
    fn test_pedra_distribution() {
        let service = create_test_service();
        let dist = service.pedra_distribution(2024).expect("distribution");

        assert_eq!(
            dist,
            vec![
                (Pedra::Quartzo, 1),
                (Pedra::Agata, 0),
                (Pedra::Ametista, 2),
                (Pedra::Topazio, 0)
            ]
        );
    }

    #[test]
    fn test_pearson() {
        let perfect = [(1.0, 2.0), (2.0, 4.0), (3.0, 6.0)];
        assert!((pearson(&perfect).unwrap() - 1.0).abs() < 1e-12);

        let inverse = [(1.0, 3.0), (2.0, 2.0), (3.0, 1.0)];
        assert!((pearson(&inverse).unwrap() + 1.0).abs() < 1e-12);

        // x = [1, 2, 3, 4], y = [2, 1, 4, 3]: r = 0.6
        let partial = [(1.0, 2.0), (2.0, 1.0), (3.0, 4.0), (4.0, 3.0)];
        assert!((pearson(&partial).unwrap() - 0.6).abs() < 1e-12);

        assert_eq!(pearson(&[(1.0, 1.0)]), None);
        assert_eq!(pearson(&[(1.0, 1.0), (1.0, 2.0)]), None);
    }

    #[test]
    fn test_correlation_matrix_pairwise_complete() {
        let mut a = StudentRecord::new(2024);
        a.ida = Some(1.0);
        a.ieg = Some(2.0);
        let mut b = StudentRecord::new(2024);
        b.ida = Some(2.0);
        b.ieg = Some(4.0);
        let mut c = StudentRecord::new(2024);
        c.ida = Some(3.0);
        c.ieg = None;
        let mut d = StudentRecord::new(2024);
        d.ida = Some(4.0);
        d.ieg = Some(8.0);

        let matrix = AnalyticsService::<MemoryDataset>::correlate(
            &[a, b, c, d],
            &Column::CORRELATED,
        );
        assert!((matrix.get(Column::Ida, Column::Ieg).unwrap() - 1.0).abs() < 1e-12);
        assert!((matrix.get(Column::Ida, Column::Ida).unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(matrix.get(Column::Ida, Column::Inde), None);
        assert_eq!(matrix.values.len(), 7);
    }

    #[test]
    fn test_correlation_matrix_across_years() {
        let service = create_test_service();
        let matrix = service.correlation_matrix();
        assert_eq!(matrix.columns, Column::CORRELATED.to_vec());
        // Only INDE is populated in the fixture; INDE against itself varies.
        assert!(matrix.get(Column::Inde, Column::Inde).is_some());
        assert_eq!(matrix.get(Column::Ida, Column::Inde), None);
    }
}
