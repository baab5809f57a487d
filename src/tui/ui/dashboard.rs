//! Dashboard view: Main overview screen.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame,
};

use crate::application::{CorrelationMatrix, TrendPoint, YearSummary};
use crate::domain::{Column, Pedra};
use crate::tui::styles::PedeTheme;

/// Dataset figures shown on the dashboard, refreshed on demand.
#[derive(Debug, Clone, Default)]
pub struct DashboardData {
    pub reference_year: u16,
    pub reference: Option<YearSummary>,
    /// Why the reference year could not be summarized.
    pub reference_error: Option<String>,
    pub trend: Vec<TrendPoint>,
    pub pedras: Vec<(Pedra, usize)>,
    pub correlation: Option<CorrelationMatrix>,
}

/// Engine status line.
#[derive(Debug, Clone, Default)]
pub struct EngineStatus {
    pub available: bool,
    pub model_name: Option<String>,
    pub threshold: Option<f64>,
    /// Load failure, when `available` is false.
    pub error: Option<String>,
}

/// Session assessment count for one tier, lowest severity first.
#[derive(Debug, Clone)]
pub struct TierCount {
    pub label: String,
    pub severity: usize,
    pub count: usize,
}

/// Assessments made in this session, aggregated by tier.
#[derive(Debug, Clone, Default)]
pub struct SessionSummary {
    pub total: usize,
    pub tiers: Vec<TierCount>,
}

/// Render the main dashboard view.
pub fn render_dashboard(
    f: &mut Frame,
    area: Rect,
    engine: &EngineStatus,
    data: &DashboardData,
    session: &SessionSummary,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Main content
        ])
        .split(area);

    render_header(f, chunks[0]);
    render_main_content(f, chunks[1], engine, data, session);
}

fn render_header(f: &mut Frame, area: Rect) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(" ", PedeTheme::text()),
        Span::styled("PEDE Risk", PedeTheme::title()),
        Span::styled(" │ ", PedeTheme::text_muted()),
        Span::styled(
            "Passos Mágicos · Risco educacional",
            PedeTheme::text_secondary(),
        ),
    ]))
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(PedeTheme::border()),
    );

    f.render_widget(header, area);
}

fn render_main_content(
    f: &mut Frame,
    area: Rect,
    engine: &EngineStatus,
    data: &DashboardData,
    session: &SessionSummary,
) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(40), // Status panels
            Constraint::Percentage(60), // Dataset figures
        ])
        .split(area);

    render_status_panels(f, chunks[0], engine, data, session);
    render_dataset_panels(f, chunks[1], data);
}

fn render_status_panels(
    f: &mut Frame,
    area: Rect,
    engine: &EngineStatus,
    data: &DashboardData,
    session: &SessionSummary,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6), // Engine status
            Constraint::Length(5), // Lagging share
            Constraint::Length(session.tiers.len() as u16 + 4), // Session summary
            Constraint::Min(0),    // Quick actions
        ])
        .margin(1)
        .split(area);

    // Engine status
    let mut status_items = vec![format_status_item("Modelo carregado", engine.available)];
    if engine.available {
        status_items.push(Line::from(vec![
            Span::styled("  Modelo: ", PedeTheme::text_secondary()),
            Span::styled(
                engine.model_name.clone().unwrap_or_else(|| "-".to_string()),
                PedeTheme::text(),
            ),
        ]));
        status_items.push(Line::from(vec![
            Span::styled("  Limiar: ", PedeTheme::text_secondary()),
            Span::styled(
                engine
                    .threshold
                    .map_or_else(|| "faixas padrão".to_string(), |t| format!("{t:.2}")),
                PedeTheme::text(),
            ),
        ]));
    } else {
        status_items.push(Line::from(Span::styled(
            "  Predições indisponíveis",
            PedeTheme::warning(),
        )));
        if let Some(err) = &engine.error {
            status_items.push(Line::from(Span::styled(
                format!("  {err}"),
                PedeTheme::text_muted(),
            )));
        }
    }

    let status_block = Block::default()
        .title(Span::styled(" Motor de risco ", PedeTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(PedeTheme::border());
    f.render_widget(Paragraph::new(status_items).block(status_block), chunks[0]);

    // Share of lagging students in the reference year
    let lag_block = Block::default()
        .title(Span::styled(
            format!(" Defasagem ≤ -2 ({}) ", data.reference_year),
            PedeTheme::subtitle(),
        ))
        .borders(Borders::ALL)
        .border_style(PedeTheme::border());

    match data.reference.as_ref().and_then(|s| s.lagging_share) {
        Some(share) => {
            let gauge = Gauge::default()
                .block(lag_block)
                .gauge_style(PedeTheme::gauge(share))
                .ratio(share.clamp(0.0, 1.0))
                .label(format!("{:.1}%", share * 100.0));
            f.render_widget(gauge, chunks[1]);
        }
        None => {
            let p = Paragraph::new(Span::styled(" sem dados", PedeTheme::text_muted()))
                .block(lag_block);
            f.render_widget(p, chunks[1]);
        }
    }

    render_session_summary(f, chunks[2], session);

    // Quick actions
    let actions = vec![
        Line::from(vec![
            Span::styled("[N] ", PedeTheme::key_hint()),
            Span::styled("Nova avaliação", PedeTheme::key_desc()),
        ]),
        Line::from(vec![
            Span::styled("[M] ", PedeTheme::key_hint()),
            Span::styled("Modelo", PedeTheme::key_desc()),
        ]),
        Line::from(vec![
            Span::styled("[R] ", PedeTheme::key_hint()),
            Span::styled("Recarregar dados", PedeTheme::key_desc()),
        ]),
        Line::from(vec![
            Span::styled("[Q] ", PedeTheme::key_hint()),
            Span::styled("Sair", PedeTheme::key_desc()),
        ]),
    ];

    let actions_block = Block::default()
        .title(Span::styled(" Ações ", PedeTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(PedeTheme::border());
    f.render_widget(Paragraph::new(actions).block(actions_block), chunks[3]);
}

fn format_status_item(label: &str, ok: bool) -> Line<'static> {
    let (icon, style) = if ok {
        ("OK", PedeTheme::success())
    } else {
        ("FALHA", PedeTheme::danger())
    };

    Line::from(vec![
        Span::styled(format!("  {icon} "), style),
        Span::styled(label.to_string(), PedeTheme::text()),
    ])
}

fn render_session_summary(f: &mut Frame, area: Rect, session: &SessionSummary) {
    let block = Block::default()
        .title(Span::styled(" Avaliações da sessão ", PedeTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(PedeTheme::border());

    if session.total == 0 {
        let empty = Paragraph::new(Line::from(Span::styled(
            "Nenhuma avaliação. Pressione [N].",
            PedeTheme::text_muted(),
        )))
        .block(block);
        f.render_widget(empty, area);
        return;
    }

    let n_tiers = session.tiers.len();
    let mut lines = vec![Line::from(vec![
        Span::styled("Total: ", PedeTheme::text_secondary()),
        Span::styled(session.total.to_string(), PedeTheme::text()),
    ])];
    lines.extend(session.tiers.iter().map(|t| {
        Line::from(vec![
            Span::styled(format!("{:<14}", t.label), PedeTheme::text_secondary()),
            Span::styled(t.count.to_string(), PedeTheme::tier(t.severity, n_tiers)),
        ])
    }));

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_dataset_panels(f: &mut Frame, area: Rect, data: &DashboardData) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),                            // Reference year
            Constraint::Length(data.trend.len().max(1) as u16 + 3), // Trend
            Constraint::Length(Pedra::ALL.len() as u16 + 2),  // Pedras
            Constraint::Min(0),                               // Correlation
        ])
        .margin(1)
        .split(area);

    render_reference_year(f, chunks[0], data);
    render_trend(f, chunks[1], &data.trend);
    render_pedras(f, chunks[2], data);
    render_correlation(f, chunks[3], data.correlation.as_ref());
}

fn fmt_opt(value: Option<f64>, decimals: usize) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.decimals$}"))
}

fn render_reference_year(f: &mut Frame, area: Rect, data: &DashboardData) {
    let block = Block::default()
        .title(Span::styled(
            format!(" PEDE {} ", data.reference_year),
            PedeTheme::subtitle(),
        ))
        .borders(Borders::ALL)
        .border_style(PedeTheme::border());

    let lines = match (&data.reference, &data.reference_error) {
        (Some(summary), _) => vec![
            Line::from(vec![
                Span::styled("Alunos: ", PedeTheme::text_secondary()),
                Span::styled(summary.students.to_string(), PedeTheme::text()),
                Span::styled("   INDE médio: ", PedeTheme::text_secondary()),
                Span::styled(fmt_opt(summary.mean_inde, 2), PedeTheme::text()),
            ]),
            Line::from(vec![
                Span::styled("Defasagem média: ", PedeTheme::text_secondary()),
                Span::styled(fmt_opt(summary.mean_defasagem, 2), PedeTheme::text()),
            ]),
        ],
        (None, Some(err)) => vec![Line::from(Span::styled(err.clone(), PedeTheme::warning()))],
        (None, None) => vec![Line::from(Span::styled(
            "Dados não carregados. Pressione [R].",
            PedeTheme::text_muted(),
        ))],
    };

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_trend(f: &mut Frame, area: Rect, trend: &[TrendPoint]) {
    let block = Block::default()
        .title(Span::styled(" Evolução anual ", PedeTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(PedeTheme::border());

    let mut lines = vec![Line::from(Span::styled(
        format!("{:<6}{:>8}{:>8}{:>11}", "Ano", "Alunos", "INDE", "Defasagem"),
        PedeTheme::text_muted(),
    ))];
    if trend.is_empty() {
        lines.push(Line::from(Span::styled("sem dados", PedeTheme::text_muted())));
    }
    lines.extend(trend.iter().map(|p| {
        Line::from(Span::styled(
            format!(
                "{:<6}{:>8}{:>8}{:>11}",
                p.year,
                p.students,
                fmt_opt(p.mean_inde, 2),
                fmt_opt(p.mean_defasagem, 2)
            ),
            PedeTheme::text(),
        ))
    }));

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_pedras(f: &mut Frame, area: Rect, data: &DashboardData) {
    let block = Block::default()
        .title(Span::styled(
            format!(" Pedras {} ", data.reference_year),
            PedeTheme::subtitle(),
        ))
        .borders(Borders::ALL)
        .border_style(PedeTheme::border());

    let total: usize = data.pedras.iter().map(|(_, n)| n).sum();
    let lines: Vec<Line> = data
        .pedras
        .iter()
        .map(|(pedra, n)| {
            let share = if total > 0 { *n as f64 / total as f64 } else { 0.0 };
            let bar = "█".repeat((share * 20.0).round() as usize);
            Line::from(vec![
                Span::styled(format!("{:<10}", pedra.to_string()), PedeTheme::pedra(*pedra)),
                Span::styled(format!("{n:>5} "), PedeTheme::text()),
                Span::styled(bar, PedeTheme::pedra(*pedra)),
            ])
        })
        .collect();

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_correlation(f: &mut Frame, area: Rect, matrix: Option<&CorrelationMatrix>) {
    let block = Block::default()
        .title(Span::styled(" Correlação com INDE ", PedeTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(PedeTheme::border());

    let Some(matrix) = matrix else {
        f.render_widget(
            Paragraph::new(Span::styled("sem dados", PedeTheme::text_muted())).block(block),
            area,
        );
        return;
    };

    let spans: Vec<Span> = matrix
        .columns
        .iter()
        .filter(|c| **c != Column::Inde)
        .flat_map(|c| {
            let r = matrix.get(*c, Column::Inde);
            [
                Span::styled(format!("{} ", c.code()), PedeTheme::text_secondary()),
                Span::styled(format!("{:<7}", fmt_opt(r, 2)), PedeTheme::text()),
            ]
        })
        .collect();

    f.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}
