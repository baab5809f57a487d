//! Color palette and styles.
//!
//! Colors chosen for:
//! - High contrast on dark terminals
//! - Risk tiers that read from calm (low) to alarming (high)

use ratatui::style::{Color, Modifier, Style};

use crate::domain::Pedra;

/// Application color palette.
pub struct PedeTheme;

impl PedeTheme {
    // === Primary Colors ===

    /// Deep blue - Primary color
    pub const PRIMARY: Color = Color::Rgb(37, 99, 235); // #2563EB

    /// Lighter blue for highlights
    pub const PRIMARY_LIGHT: Color = Color::Rgb(96, 165, 250); // #60A5FA

    // === Secondary Colors ===

    /// Light slate for borders
    pub const SECONDARY_LIGHT: Color = Color::Rgb(148, 163, 184); // #94A3B8

    // === Semantic Colors ===

    /// Emerald - Low risk
    pub const SUCCESS: Color = Color::Rgb(16, 185, 129); // #10B981

    /// Amber - Attention
    pub const WARNING: Color = Color::Rgb(251, 191, 36); // #FBBF24

    /// Orange - Moderate risk
    pub const ALERT: Color = Color::Rgb(249, 115, 22); // #F97316

    /// Rose - High risk / errors
    pub const DANGER: Color = Color::Rgb(244, 63, 94); // #F43F5E

    /// Blue - Info
    pub const INFO: Color = Color::Rgb(59, 130, 246); // #3B82F6

    // === Text Colors ===

    /// Primary text (white)
    pub const TEXT_PRIMARY: Color = Color::Rgb(248, 250, 252); // #F8FAFC

    /// Secondary text (gray)
    pub const TEXT_SECONDARY: Color = Color::Rgb(148, 163, 184); // #94A3B8

    /// Muted text
    pub const TEXT_MUTED: Color = Color::Rgb(100, 116, 139); // #64748B

    // === Preset Styles ===

    /// Style for titles
    #[must_use]
    pub fn title() -> Style {
        Style::default()
            .fg(Self::TEXT_PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    /// Style for subtitles
    #[must_use]
    pub fn subtitle() -> Style {
        Style::default()
            .fg(Self::PRIMARY_LIGHT)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn text() -> Style {
        Style::default().fg(Self::TEXT_PRIMARY)
    }

    #[must_use]
    pub fn text_secondary() -> Style {
        Style::default().fg(Self::TEXT_SECONDARY)
    }

    #[must_use]
    pub fn text_muted() -> Style {
        Style::default().fg(Self::TEXT_MUTED)
    }

    #[must_use]
    pub fn success() -> Style {
        Style::default().fg(Self::SUCCESS)
    }

    #[must_use]
    pub fn warning() -> Style {
        Style::default().fg(Self::WARNING)
    }

    #[must_use]
    pub fn danger() -> Style {
        Style::default().fg(Self::DANGER)
    }

    #[must_use]
    pub fn info() -> Style {
        Style::default().fg(Self::INFO)
    }

    /// Style for focused elements
    #[must_use]
    pub fn focused() -> Style {
        Style::default()
            .fg(Self::PRIMARY_LIGHT)
            .add_modifier(Modifier::BOLD)
    }

    /// Text cursor in form fields
    #[must_use]
    pub fn cursor() -> Style {
        Style::default().fg(Self::PRIMARY_LIGHT)
    }

    #[must_use]
    pub fn border() -> Style {
        Style::default().fg(Self::SECONDARY_LIGHT)
    }

    #[must_use]
    pub fn border_focused() -> Style {
        Style::default().fg(Self::PRIMARY)
    }

    /// Style for key hints
    #[must_use]
    pub fn key_hint() -> Style {
        Style::default()
            .fg(Self::PRIMARY_LIGHT)
            .add_modifier(Modifier::BOLD)
    }

    /// Style for key descriptions
    #[must_use]
    pub fn key_desc() -> Style {
        Style::default().fg(Self::TEXT_SECONDARY)
    }

    /// Style for a tier by its position in a table of `tiers` entries.
    #[must_use]
    pub fn tier(severity: usize, tiers: usize) -> Style {
        let palette = [Self::SUCCESS, Self::WARNING, Self::ALERT, Self::DANGER];
        if tiers <= 1 {
            return Style::default().fg(Self::SUCCESS);
        }
        // Spread the table over the palette so the top tier is always DANGER.
        let idx = severity.min(tiers - 1) * (palette.len() - 1) / (tiers - 1);
        Style::default().fg(palette[idx])
    }

    /// Gauge fill for a share in [0, 1] where higher is worse.
    #[must_use]
    pub fn gauge(share: f64) -> Style {
        if share < 0.25 {
            Self::success()
        } else if share < 0.5 {
            Self::warning()
        } else {
            Self::danger()
        }
    }

    /// Indicator value against the 0-10 scale (higher is better).
    #[must_use]
    pub fn indicator(value: f64) -> Style {
        if value >= 7.0 {
            Self::success()
        } else if value >= 5.0 {
            Self::warning()
        } else {
            Self::danger()
        }
    }

    #[must_use]
    pub fn pedra(pedra: Pedra) -> Style {
        let (r, g, b) = pedra.color();
        Style::default().fg(Color::Rgb(r, g, b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_palette_spans_low_to_high() {
        assert_eq!(PedeTheme::tier(0, 4), PedeTheme::success());
        assert_eq!(PedeTheme::tier(3, 4), PedeTheme::danger());
        assert_eq!(PedeTheme::tier(0, 2), PedeTheme::success());
        assert_eq!(PedeTheme::tier(1, 2), PedeTheme::danger());
        assert_eq!(PedeTheme::tier(9, 3), PedeTheme::danger());
    }
}
