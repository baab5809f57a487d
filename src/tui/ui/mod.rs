//! UI module: View components for the TUI.

pub mod assessment;
pub mod dashboard;
pub mod model;
pub mod student;

use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::tui::styles::PedeTheme;

pub fn render_disclaimer(f: &mut Frame, area: Rect) {
    let text = vec![
        Line::from(vec![Span::styled(
            "AVISO: Estimativa indicativa para apoio pedagógico. Não substitui a avaliação da equipe educacional.",
            PedeTheme::text_muted(),
        )]),
        Line::from(vec![Span::styled(
            "Nenhum dado de aluno é gravado; as avaliações ficam apenas nesta sessão.",
            PedeTheme::text_muted(),
        )]),
    ];

    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(PedeTheme::border());

    let p = Paragraph::new(text).block(block).wrap(Wrap { trim: true });

    f.render_widget(p, area);
}
