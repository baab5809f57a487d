//! Student-year observations from the PEDE dataset (analytics only).

use serde::{Deserialize, Serialize};

/// Grade-lag value at or below which a student counts as at risk.
pub const DEFASAGEM_RISK_CUTOFF: f64 = -2.0;

/// PEDE classification stone, by ascending INDE band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Pedra {
    Quartzo,
    Agata,
    Ametista,
    Topazio,
}

impl Pedra {
    pub const ALL: [Pedra; 4] = [Self::Quartzo, Self::Agata, Self::Ametista, Self::Topazio];

    /// Parse a dataset value. Accents and case are optional.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let folded: String = raw
            .trim()
            .chars()
            .map(|c| match c {
                'Á' | 'á' => 'a',
                'Ó' | 'ó' => 'o',
                'Ô' | 'ô' => 'o',
                c => c.to_ascii_lowercase(),
            })
            .collect();
        match folded.as_str() {
            "quartzo" => Some(Self::Quartzo),
            "agata" => Some(Self::Agata),
            "ametista" => Some(Self::Ametista),
            "topazio" => Some(Self::Topazio),
            _ => None,
        }
    }

    /// Display color (RGB).
    #[must_use]
    pub fn color(&self) -> (u8, u8, u8) {
        match self {
            Self::Quartzo => (192, 192, 192),
            Self::Agata => (147, 112, 219),
            Self::Ametista => (139, 0, 139),
            Self::Topazio => (255, 215, 0),
        }
    }
}

impl std::fmt::Display for Pedra {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Quartzo => write!(f, "Quartzo"),
            Self::Agata => write!(f, "Ágata"),
            Self::Ametista => write!(f, "Ametista"),
            Self::Topazio => write!(f, "Topázio"),
        }
    }
}

/// Numeric indicator columns shared by every dataset year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Column {
    Inde,
    Iaa,
    Ieg,
    Ips,
    Ida,
    Ipv,
    Ian,
    Defasagem,
}

impl Column {
    /// Indicators used by the correlation matrix, in display order.
    pub const CORRELATED: [Column; 7] = [
        Self::Ida,
        Self::Ieg,
        Self::Iaa,
        Self::Ips,
        Self::Ipv,
        Self::Ian,
        Self::Inde,
    ];

    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Inde => "INDE",
            Self::Iaa => "IAA",
            Self::Ieg => "IEG",
            Self::Ips => "IPS",
            Self::Ida => "IDA",
            Self::Ipv => "IPV",
            Self::Ian => "IAN",
            Self::Defasagem => "DEFASAGEM",
        }
    }
}

/// One student in one evaluation year. Missing or unparsable cells are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub year: u16,
    pub inde: Option<f64>,
    pub iaa: Option<f64>,
    pub ieg: Option<f64>,
    pub ips: Option<f64>,
    pub ida: Option<f64>,
    pub ipv: Option<f64>,
    pub ian: Option<f64>,
    pub defasagem: Option<f64>,
    pub pedra: Option<Pedra>,
}

impl StudentRecord {
    #[must_use]
    pub fn new(year: u16) -> Self {
        Self {
            year,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn get(&self, column: Column) -> Option<f64> {
        match column {
            Column::Inde => self.inde,
            Column::Iaa => self.iaa,
            Column::Ieg => self.ieg,
            Column::Ips => self.ips,
            Column::Ida => self.ida,
            Column::Ipv => self.ipv,
            Column::Ian => self.ian,
            Column::Defasagem => self.defasagem,
        }
    }

    pub fn set(&mut self, column: Column, value: Option<f64>) {
        let slot = match column {
            Column::Inde => &mut self.inde,
            Column::Iaa => &mut self.iaa,
            Column::Ieg => &mut self.ieg,
            Column::Ips => &mut self.ips,
            Column::Ida => &mut self.ida,
            Column::Ipv => &mut self.ipv,
            Column::Ian => &mut self.ian,
            Column::Defasagem => &mut self.defasagem,
        };
        *slot = value;
    }

    /// `Some(true)` when the grade lag is at or below the risk cutoff.
    #[must_use]
    pub fn lagging(&self) -> Option<bool> {
        self.defasagem.map(|d| d <= DEFASAGEM_RISK_CUTOFF)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pedra_parse_folds_accents() {
        assert_eq!(Pedra::parse("Ágata"), Some(Pedra::Agata));
        assert_eq!(Pedra::parse("Agata"), Some(Pedra::Agata));
        assert_eq!(Pedra::parse(" topázio "), Some(Pedra::Topazio));
        assert_eq!(Pedra::parse("QUARTZO"), Some(Pedra::Quartzo));
        assert_eq!(Pedra::parse("INCLUIR"), None);
        assert_eq!(Pedra::Agata.to_string(), "Ágata");
    }

    #[test]
    fn test_lagging_cutoff_is_inclusive() {
        let mut r = StudentRecord::new(2024);
        assert_eq!(r.lagging(), None);
        r.set(Column::Defasagem, Some(-2.0));
        assert_eq!(r.lagging(), Some(true));
        r.set(Column::Defasagem, Some(-1.0));
        assert_eq!(r.lagging(), Some(false));
        assert_eq!(r.get(Column::Defasagem), Some(-1.0));
    }
}
