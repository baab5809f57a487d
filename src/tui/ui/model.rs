//! Model information view: training metrics, feature ranking and tiers.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::ports::ModelBundle;
use crate::tui::styles::PedeTheme;

/// Render the model information view.
///
/// `error` is shown when no bundle is loaded.
pub fn render_model_info(
    f: &mut Frame,
    area: Rect,
    bundle: Option<&ModelBundle>,
    error: Option<&str>,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content
            Constraint::Length(3), // Footer
        ])
        .split(area);

    render_model_header(f, chunks[0]);
    match bundle {
        Some(bundle) => render_model_content(f, chunks[1], bundle),
        None => render_unavailable(f, chunks[1], error),
    }
    render_model_footer(f, chunks[2]);
}

fn render_model_header(f: &mut Frame, area: Rect) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(" ", PedeTheme::text()),
        Span::styled("Modelo", PedeTheme::title()),
        Span::styled(" │ Métricas e importância das variáveis", PedeTheme::text_secondary()),
    ]))
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(PedeTheme::border()),
    );

    f.render_widget(header, area);
}

fn render_unavailable(f: &mut Frame, area: Rect, error: Option<&str>) {
    let content = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(
            "Nenhum modelo carregado",
            PedeTheme::warning(),
        )),
        Line::from(""),
        Line::from(Span::styled(
            error.unwrap_or("Verifique o diretório de artefatos."),
            PedeTheme::text_muted(),
        )),
    ])
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true })
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(PedeTheme::border()),
    );

    f.render_widget(content, area);
}

fn metric_line(label: &str, value: Option<f64>) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {label:<12}"), PedeTheme::text_secondary()),
        Span::styled(
            value.map_or_else(|| "-".to_string(), |v| format!("{v:.3}")),
            PedeTheme::text(),
        ),
    ])
}

fn render_model_content(f: &mut Frame, area: Rect, bundle: &ModelBundle) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .margin(1)
        .split(area);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(11), // Metrics
            Constraint::Min(0),     // Tiers
        ])
        .split(columns[0]);

    let meta = bundle.metadata();

    // Metrics
    let cv = match (meta.cv_mean, meta.cv_std) {
        (Some(mean), Some(std)) => format!("{mean:.3} ± {std:.3}"),
        (Some(mean), None) => format!("{mean:.3}"),
        _ => "-".to_string(),
    };
    let metrics = vec![
        Line::from(vec![
            Span::styled("  Classificador ", PedeTheme::text_secondary()),
            Span::styled(
                meta.model_name
                    .clone()
                    .unwrap_or_else(|| bundle.classifier().name().to_string()),
                PedeTheme::text(),
            ),
        ]),
        metric_line("Acurácia", meta.accuracy),
        metric_line("Precisão", meta.precision),
        metric_line("Recall", meta.recall),
        metric_line("F1", meta.f1),
        metric_line("AUC", meta.auc),
        Line::from(vec![
            Span::styled(format!("  {:<12}", "Validação"), PedeTheme::text_secondary()),
            Span::styled(cv, PedeTheme::text()),
        ]),
        Line::from(vec![
            Span::styled(format!("  {:<12}", "Variáveis"), PedeTheme::text_secondary()),
            Span::styled(bundle.schema().len().to_string(), PedeTheme::text()),
        ]),
    ];

    let metrics_block = Block::default()
        .title(Span::styled(" Métricas ", PedeTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(PedeTheme::border());
    f.render_widget(Paragraph::new(metrics).block(metrics_block), left[0]);

    // Tier table
    let tiers = bundle.tiers().tiers();
    let tier_lines: Vec<Line> = tiers
        .iter()
        .map(|t| {
            Line::from(vec![
                Span::styled(
                    format!("  {:<14}", t.label),
                    PedeTheme::tier(t.severity, tiers.len()),
                ),
                Span::styled(
                    format!(
                        "{:>5.1}% - {:>5.1}%",
                        t.low * 100.0,
                        t.high * 100.0
                    ),
                    PedeTheme::text(),
                ),
            ])
        })
        .collect();

    let tiers_block = Block::default()
        .title(Span::styled(" Faixas de risco ", PedeTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(PedeTheme::border());
    f.render_widget(Paragraph::new(tier_lines).block(tiers_block), left[1]);

    // Importance ranking
    let ranking = meta.importance_ranking();
    let top = ranking.first().map_or(0.0, |(_, v)| *v);
    let lines: Vec<Line> = if ranking.is_empty() {
        vec![Line::from(Span::styled(
            "  Importâncias não informadas",
            PedeTheme::text_muted(),
        ))]
    } else {
        ranking
            .iter()
            .map(|(name, value)| {
                let width = if top > 0.0 {
                    ((value / top) * 24.0).round().max(0.0) as usize
                } else {
                    0
                };
                Line::from(vec![
                    Span::styled(format!("  {name:<18}"), PedeTheme::text_secondary()),
                    Span::styled("█".repeat(width), PedeTheme::info()),
                    Span::styled(format!(" {value:.3}"), PedeTheme::text()),
                ])
            })
            .collect()
    };

    let ranking_block = Block::default()
        .title(Span::styled(" Importância das variáveis ", PedeTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(PedeTheme::border());
    f.render_widget(Paragraph::new(lines).block(ranking_block), columns[1]);
}

fn render_model_footer(f: &mut Frame, area: Rect) {
    let footer = Paragraph::new(Line::from(vec![
        Span::styled("[N] ", PedeTheme::key_hint()),
        Span::styled("Nova avaliação ", PedeTheme::key_desc()),
        Span::styled("[Esc] ", PedeTheme::key_hint()),
        Span::styled("Painel", PedeTheme::key_desc()),
    ]))
    .block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(PedeTheme::border()),
    );

    f.render_widget(footer, area);
}
