//! Assessment result view.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Frame,
};

use crate::domain::{Assessment, IndicatorVector};
use crate::tui::styles::PedeTheme;

/// Reference line for the indicator profile.
pub const PROFILE_REFERENCE: f64 = 5.0;

/// What the assessment screen shows.
#[derive(Debug, Clone, Default)]
pub enum AssessmentState {
    #[default]
    Idle,
    Complete {
        assessment: Box<Assessment>,
        /// Numeric inputs, kept for the profile panel.
        profile: Vec<(String, f64)>,
        /// Number of tiers in the table, for coloring.
        tiers: usize,
    },
    Error {
        message: String,
    },
}

impl AssessmentState {
    #[must_use]
    pub fn complete(assessment: Assessment, indicators: &IndicatorVector, tiers: usize) -> Self {
        let profile = indicators
            .iter()
            .filter_map(|(name, value)| Some((name.to_string(), value.as_numeric()?)))
            .collect();
        Self::Complete {
            assessment: Box::new(assessment),
            profile,
            tiers,
        }
    }
}

/// Render the assessment view
pub fn render_assessment(f: &mut Frame, area: Rect, state: &AssessmentState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content
            Constraint::Length(3), // Footer
        ])
        .split(area);

    render_assessment_header(f, chunks[0]);
    match state {
        AssessmentState::Idle => render_idle(f, chunks[1]),
        AssessmentState::Complete {
            assessment,
            profile,
            tiers,
        } => render_result(f, chunks[1], assessment, profile, *tiers),
        AssessmentState::Error { message } => render_error(f, chunks[1], message),
    }
    render_assessment_footer(f, chunks[2], state);
}

fn render_assessment_header(f: &mut Frame, area: Rect) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(" ", PedeTheme::text()),
        Span::styled("Resultado", PedeTheme::title()),
        Span::styled(" │ Probabilidade de risco", PedeTheme::text_secondary()),
    ]))
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(PedeTheme::border()),
    );

    f.render_widget(header, area);
}

fn render_idle(f: &mut Frame, area: Rect) {
    let content = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(
            "Nenhuma avaliação em andamento",
            PedeTheme::text_secondary(),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Pressione [N] para preencher os indicadores",
            PedeTheme::text_muted(),
        )),
    ])
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(PedeTheme::border()),
    );

    f.render_widget(content, area);
}

fn render_result(
    f: &mut Frame,
    area: Rect,
    assessment: &Assessment,
    profile: &[(String, f64)],
    tiers: usize,
) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    let block = Block::default()
        .title(Span::styled(" Avaliação ", PedeTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(PedeTheme::border_focused());

    let inner = block.inner(columns[0]);
    f.render_widget(block, columns[0]);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tier
            Constraint::Length(3), // Probability
            Constraint::Length(2), // Class
            Constraint::Min(0),    // Guidance
        ])
        .margin(1)
        .split(inner);

    let tier = &assessment.tier;
    let tier_style = PedeTheme::tier(tier.severity, tiers);

    let tier_display = Paragraph::new(vec![
        Line::from(Span::styled(
            tier.label.to_uppercase(),
            tier_style.add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!(
                "faixa [{:.0}%, {:.0}%{}",
                tier.low * 100.0,
                tier.high * 100.0,
                if tier.closed_high { "]" } else { ")" }
            ),
            PedeTheme::text_muted(),
        )),
    ])
    .alignment(Alignment::Center);
    f.render_widget(tier_display, chunks[0]);

    let p = assessment.prediction.risk_probability;
    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(PedeTheme::border()),
        )
        .gauge_style(tier_style)
        .ratio(p.clamp(0.0, 1.0))
        .label(format!("{:.1}%", p * 100.0));
    f.render_widget(gauge, chunks[1]);

    let class_name = assessment
        .class_label
        .clone()
        .unwrap_or_else(|| assessment.prediction.predicted_class.to_string());
    let mut class_spans = vec![
        Span::styled("Classe prevista: ", PedeTheme::text_secondary()),
        Span::styled(class_name, PedeTheme::text()),
        Span::styled(
            format!(" ({:.1}%)", assessment.prediction.confidence() * 100.0),
            PedeTheme::text_muted(),
        ),
    ];
    if let Some(at_risk) = assessment.prediction.at_risk {
        class_spans.push(Span::styled(
            if at_risk { "  acima do limiar" } else { "  abaixo do limiar" },
            if at_risk { PedeTheme::danger() } else { PedeTheme::success() },
        ));
    }
    f.render_widget(
        Paragraph::new(Line::from(class_spans)).alignment(Alignment::Center),
        chunks[2],
    );

    let mut guidance = vec![Line::from(Span::styled(
        "Recomendações",
        PedeTheme::subtitle(),
    ))];
    guidance.extend(tier.guidance.iter().map(|g| {
        Line::from(vec![
            Span::styled("• ", tier_style),
            Span::styled(g.as_str(), PedeTheme::text()),
        ])
    }));
    f.render_widget(
        Paragraph::new(guidance).wrap(Wrap { trim: true }),
        chunks[3],
    );

    render_profile(f, columns[1], profile);
}

/// Indicator bars against the 0-10 scale with the reference mark.
fn render_profile(f: &mut Frame, area: Rect, profile: &[(String, f64)]) {
    let block = Block::default()
        .title(Span::styled(" Perfil dos indicadores ", PedeTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(PedeTheme::border());

    const WIDTH: usize = 20;
    let mark = (PROFILE_REFERENCE / 10.0 * WIDTH as f64).round() as usize;

    let mut lines: Vec<Line> = profile
        .iter()
        .map(|(name, value)| {
            let filled = ((value / 10.0).clamp(0.0, 1.0) * WIDTH as f64).round() as usize;
            let bar: String = (0..WIDTH)
                .map(|i| match (i < filled, i == mark) {
                    (_, true) => '│',
                    (true, false) => '█',
                    (false, false) => '·',
                })
                .collect();
            Line::from(vec![
                Span::styled(format!("{name:<6}"), PedeTheme::text_secondary()),
                Span::styled(bar, PedeTheme::indicator(*value)),
                Span::styled(format!(" {value:>5.1}"), PedeTheme::text()),
            ])
        })
        .collect();
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!("│ referência {PROFILE_REFERENCE:.1}"),
        PedeTheme::text_muted(),
    )));

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_error(f: &mut Frame, area: Rect, message: &str) {
    let content = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled("! Erro", PedeTheme::danger())),
        Line::from(""),
        Line::from(Span::styled(message, PedeTheme::text())),
    ])
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true })
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(PedeTheme::danger()),
    );

    f.render_widget(content, area);
}

fn render_assessment_footer(f: &mut Frame, area: Rect, state: &AssessmentState) {
    let content = match state {
        AssessmentState::Complete { .. } => Line::from(vec![
            Span::styled("[Enter] ", PedeTheme::key_hint()),
            Span::styled("Painel ", PedeTheme::key_desc()),
            Span::styled("[N] ", PedeTheme::key_hint()),
            Span::styled("Nova avaliação", PedeTheme::key_desc()),
        ]),
        AssessmentState::Error { .. } => Line::from(vec![
            Span::styled("[Enter] ", PedeTheme::key_hint()),
            Span::styled("Corrigir ", PedeTheme::key_desc()),
            Span::styled("[Esc] ", PedeTheme::key_hint()),
            Span::styled("Painel", PedeTheme::key_desc()),
        ]),
        AssessmentState::Idle => Line::from(vec![
            Span::styled("[Esc] ", PedeTheme::key_hint()),
            Span::styled("Painel", PedeTheme::key_desc()),
        ]),
    };

    let footer = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(PedeTheme::border()),
    );

    f.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Prediction, TierTable};

    #[test]
    fn test_profile_keeps_numeric_inputs_only() {
        let indicators = IndicatorVector::new()
            .with("IDA", 6.0)
            .with("INSTITUICAO", "Escola Pública")
            .with("IEG", 8.0);
        let tier = TierTable::default_four_tier().highest().clone();
        let prediction = Prediction {
            predicted_class: 1,
            classes: vec![0, 1],
            probabilities: vec![0.2, 0.8],
            risk_probability: 0.8,
            at_risk: None,
        };

        let state = AssessmentState::complete(Assessment::new(prediction, tier, None), &indicators, 4);
        let AssessmentState::Complete { profile, tiers, .. } = state else {
            panic!("expected a completed assessment");
        };
        assert_eq!(tiers, 4);
        assert_eq!(profile.len(), 2);
        assert!(profile.iter().all(|(name, _)| name != "INSTITUICAO"));
    }
}
