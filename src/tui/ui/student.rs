//! Student indicator input form.
//!
//! Fields are built from the inputs the loaded model requires, so the form
//! follows whatever feature list the model directory declares.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use zeroize::Zeroize;

use crate::domain::{nominal_range, IndicatorVector, InputKind, RequiredInput};
use crate::tui::styles::PedeTheme;

/// How a field is edited.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Numeric,
    /// Cycles through the encoder vocabulary.
    Categorical { options: Vec<String>, selected: usize },
}

/// Form field definition
#[derive(Debug, Clone)]
pub struct FormField {
    pub name: String,
    pub hint: String,
    pub value: String,
    pub kind: FieldKind,
}

impl FormField {
    fn numeric(name: &str) -> Self {
        let hint = match nominal_range(name) {
            Some((min, max)) => format!("{min}-{max}"),
            None => "número".to_string(),
        };
        Self {
            name: name.to_string(),
            hint,
            value: String::new(),
            kind: FieldKind::Numeric,
        }
    }

    fn categorical(name: &str, options: &[String]) -> Self {
        Self {
            name: name.to_string(),
            hint: "←/→ para escolher".to_string(),
            value: options.first().cloned().unwrap_or_default(),
            kind: FieldKind::Categorical {
                options: options.to_vec(),
                selected: 0,
            },
        }
    }
}

/// Student form state
#[derive(Debug, Default)]
pub struct StudentFormState {
    pub fields: Vec<FormField>,
    pub selected_field: usize,
    pub error_message: Option<String>,
    /// Set once the range warning was shown; the next submit goes through.
    pub range_warning_shown: bool,
}

impl StudentFormState {
    /// One field per raw input, in feature order.
    #[must_use]
    pub fn from_inputs(inputs: &[RequiredInput<'_>]) -> Self {
        let fields = inputs
            .iter()
            .map(|input| match input.kind {
                InputKind::Numeric => FormField::numeric(input.name),
                InputKind::Categorical(options) => FormField::categorical(input.name, options),
            })
            .collect();
        Self {
            fields,
            ..Self::default()
        }
    }

    fn touched(&mut self) {
        self.error_message = None;
        self.range_warning_shown = false;
    }

    /// Move to the next field
    pub fn next_field(&mut self) {
        if !self.fields.is_empty() {
            self.selected_field = (self.selected_field + 1) % self.fields.len();
        }
    }

    /// Move to the previous field
    pub fn prev_field(&mut self) {
        if self.fields.is_empty() {
            return;
        }
        if self.selected_field == 0 {
            self.selected_field = self.fields.len() - 1;
        } else {
            self.selected_field -= 1;
        }
    }

    /// Add a character to the current numeric field.
    ///
    /// A comma is taken as the decimal separator.
    pub fn input_char(&mut self, c: char) {
        let Some(field) = self.fields.get_mut(self.selected_field) else {
            return;
        };
        if field.kind != FieldKind::Numeric {
            return;
        }
        if c.is_ascii_digit() || c == '.' || c == ',' || c == '-' {
            field.value.push(if c == ',' { '.' } else { c });
            self.touched();
        }
    }

    /// Delete the last character
    pub fn delete_char(&mut self) {
        if let Some(field) = self.fields.get_mut(self.selected_field) {
            if field.kind == FieldKind::Numeric {
                field.value.pop();
                self.touched();
            }
        }
    }

    /// Clear the current field
    pub fn clear_field(&mut self) {
        if let Some(field) = self.fields.get_mut(self.selected_field) {
            if field.kind == FieldKind::Numeric {
                field.value.zeroize();
                self.touched();
            }
        }
    }

    /// Step the current categorical field through its options.
    pub fn cycle_option(&mut self, forward: bool) {
        let Some(field) = self.fields.get_mut(self.selected_field) else {
            return;
        };
        if let FieldKind::Categorical { options, selected } = &mut field.kind {
            if options.is_empty() {
                return;
            }
            *selected = if forward {
                (*selected + 1) % options.len()
            } else {
                (*selected + options.len() - 1) % options.len()
            };
            field.value = options[*selected].clone();
            self.touched();
        }
    }

    /// Wipe all field buffers from memory and reset the form.
    ///
    /// Called right after an assessment is produced so typed values do not
    /// linger in UI state.
    pub fn clear_sensitive(&mut self) {
        for field in &mut self.fields {
            field.value.zeroize();
            if let FieldKind::Categorical { options, selected } = &mut field.kind {
                *selected = 0;
                field.value = options.first().cloned().unwrap_or_default();
            }
        }
        self.error_message = None;
        self.range_warning_shown = false;
        self.selected_field = 0;
    }

    /// Parse every field into an indicator vector.
    ///
    /// # Errors
    /// Names the first empty or unparsable field.
    pub fn to_indicators(&self) -> Result<IndicatorVector, String> {
        let mut indicators = IndicatorVector::new();

        for field in &self.fields {
            match field.kind {
                FieldKind::Numeric => {
                    let raw = field.value.trim();
                    if raw.is_empty() {
                        return Err(format!("{}: campo obrigatório", field.name));
                    }
                    let value: f64 = raw
                        .parse()
                        .map_err(|_| format!("{}: número inválido", field.name))?;
                    if !value.is_finite() {
                        return Err(format!("{}: número inválido", field.name));
                    }
                    indicators.insert(field.name.as_str(), value);
                }
                FieldKind::Categorical { .. } => {
                    indicators.insert(field.name.as_str(), field.value.as_str());
                }
            }
        }

        Ok(indicators)
    }

    /// Fill numeric fields with a plausible mid-range profile.
    pub fn load_sample_data(&mut self) {
        for field in &mut self.fields {
            if field.kind != FieldKind::Numeric {
                continue;
            }
            let sample = match field.name.as_str() {
                "IDA" => 5.8,
                "IEG" => 7.2,
                "IAA" => 8.5,
                "IPS" => 6.3,
                "IPV" => 6.9,
                "IAN" => 5.0,
                "IPP" => 7.0,
                "INDE" => 6.6,
                name => nominal_range(name).map_or(5.0, |(min, max)| ((min + max) / 2.0).round()),
            };
            field.value = sample.to_string();
        }
        self.touched();
    }
}

/// Render the student data input form
pub fn render_student_form(f: &mut Frame, area: Rect, state: &StudentFormState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Form
            Constraint::Length(3), // Footer/error
        ])
        .split(area);

    render_form_header(f, chunks[0]);
    render_form_fields(f, chunks[1], state);
    render_form_footer(f, chunks[2], state);
}

fn render_form_header(f: &mut Frame, area: Rect) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(" ", PedeTheme::text()),
        Span::styled("Nova avaliação", PedeTheme::title()),
        Span::styled(" │ Indicadores PEDE do aluno", PedeTheme::text_secondary()),
    ]))
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(PedeTheme::border()),
    );

    f.render_widget(header, area);
}

fn render_form_fields(f: &mut Frame, area: Rect, state: &StudentFormState) {
    if state.fields.is_empty() {
        let p = Paragraph::new(Span::styled(
            " O modelo não declara entradas.",
            PedeTheme::text_muted(),
        ));
        f.render_widget(p, area);
        return;
    }

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .margin(1)
        .split(area);

    let mid = state.fields.len().div_ceil(2);

    render_field_column(f, columns[0], &state.fields[..mid], 0, state.selected_field);
    render_field_column(
        f,
        columns[1],
        &state.fields[mid..],
        mid,
        state.selected_field,
    );
}

fn render_field_column(
    f: &mut Frame,
    area: Rect,
    fields: &[FormField],
    offset: usize,
    selected: usize,
) {
    let field_height = 3;
    let constraints: Vec<Constraint> = fields
        .iter()
        .map(|_| Constraint::Length(field_height))
        .chain(std::iter::once(Constraint::Min(0)))
        .collect();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    for (i, field) in fields.iter().enumerate() {
        let is_selected = offset + i == selected;
        let border_style = if is_selected {
            PedeTheme::border_focused()
        } else {
            PedeTheme::border()
        };

        let title_style = if is_selected {
            PedeTheme::focused()
        } else {
            PedeTheme::text_secondary()
        };

        let block = Block::default()
            .title(Span::styled(format!(" {} ", field.name), title_style))
            .borders(Borders::ALL)
            .border_style(border_style);

        let mut spans = vec![Span::raw(" ")];
        match &field.kind {
            FieldKind::Categorical { .. } => {
                spans.push(Span::styled("‹ ", PedeTheme::text_muted()));
                spans.push(Span::styled(field.value.as_str(), PedeTheme::text()));
                spans.push(Span::styled(" ›", PedeTheme::text_muted()));
            }
            FieldKind::Numeric if field.value.is_empty() => {
                spans.push(Span::styled(field.hint.as_str(), PedeTheme::text_muted()));
            }
            FieldKind::Numeric => {
                spans.push(Span::styled(field.value.as_str(), PedeTheme::text()));
            }
        }
        if is_selected && field.kind == FieldKind::Numeric {
            spans.push(Span::styled("▌", PedeTheme::cursor()));
        }

        f.render_widget(Paragraph::new(Line::from(spans)).block(block), chunks[i]);
    }
}

fn render_form_footer(f: &mut Frame, area: Rect, state: &StudentFormState) {
    let content = if let Some(err) = &state.error_message {
        let style = if state.range_warning_shown {
            PedeTheme::warning()
        } else {
            PedeTheme::danger()
        };
        Line::from(vec![
            Span::styled("! ", style),
            Span::styled(err.clone(), style),
        ])
    } else {
        Line::from(vec![
            Span::styled("[↑↓] ", PedeTheme::key_hint()),
            Span::styled("Navegar ", PedeTheme::key_desc()),
            Span::styled("[←→] ", PedeTheme::key_hint()),
            Span::styled("Opção ", PedeTheme::key_desc()),
            Span::styled("[Enter] ", PedeTheme::key_hint()),
            Span::styled("Avaliar ", PedeTheme::key_desc()),
            Span::styled("[S] ", PedeTheme::key_hint()),
            Span::styled("Exemplo ", PedeTheme::key_desc()),
            Span::styled("[Esc] ", PedeTheme::key_hint()),
            Span::styled("Voltar", PedeTheme::key_desc()),
        ])
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
    use crate::domain::IndicatorValue;

    fn vocabulary() -> Vec<String> {
        vec!["Escola Pública".to_string(), "Rede Decisão".to_string()]
    }

    fn create_test_form(vocab: &[String]) -> StudentFormState {
        StudentFormState::from_inputs(&[
            RequiredInput {
                name: "IDA",
                kind: InputKind::Numeric,
            },
            RequiredInput {
                name: "IEG",
                kind: InputKind::Numeric,
            },
            RequiredInput {
                name: "INSTITUICAO",
                kind: InputKind::Categorical(vocab),
            },
        ])
    }

    #[test]
    fn test_fields_follow_inputs() {
        let vocab = vocabulary();
        let form = create_test_form(&vocab);

        assert_eq!(form.fields.len(), 3);
        assert_eq!(form.fields[0].name, "IDA");
        assert_eq!(form.fields[0].hint, "0-10");
        assert_eq!(form.fields[2].value, "Escola Pública");
    }

    #[test]
    fn test_to_indicators() {
        let vocab = vocabulary();
        let mut form = create_test_form(&vocab);
        for c in "6,5".chars() {
            form.input_char(c);
        }
        form.next_field();
        form.input_char('7');
        form.next_field();
        form.cycle_option(true);

        let indicators = form.to_indicators().expect("valid form");
        assert_eq!(indicators.numeric("IDA"), Some(6.5));
        assert_eq!(indicators.numeric("IEG"), Some(7.0));
        assert_eq!(
            indicators.get("INSTITUICAO"),
            Some(&IndicatorValue::Category("Rede Decisão".to_string()))
        );
    }

    #[test]
    fn test_missing_value_is_reported() {
        let vocab = vocabulary();
        let mut form = create_test_form(&vocab);
        form.input_char('5');

        let err = form.to_indicators().unwrap_err();
        assert!(err.contains("IEG"));
    }

    #[test]
    fn test_letters_are_ignored() {
        let vocab = vocabulary();
        let mut form = create_test_form(&vocab);
        form.input_char('x');
        form.input_char('8');
        assert_eq!(form.fields[0].value, "8");
    }

    #[test]
    fn test_cycle_option_wraps() {
        let vocab = vocabulary();
        let mut form = create_test_form(&vocab);
        form.selected_field = 2;
        form.cycle_option(false);
        assert_eq!(form.fields[2].value, "Rede Decisão");
        form.cycle_option(true);
        assert_eq!(form.fields[2].value, "Escola Pública");
    }

    #[test]
    fn test_clear_sensitive_wipes_values() {
        let vocab = vocabulary();
        let mut form = create_test_form(&vocab);
        form.load_sample_data();
        form.selected_field = 2;
        form.cycle_option(true);
        form.error_message = Some("x".to_string());

        form.clear_sensitive();

        assert!(form.fields[0].value.is_empty());
        assert!(form.fields[1].value.is_empty());
        assert_eq!(form.fields[2].value, "Escola Pública");
        assert_eq!(form.selected_field, 0);
        assert!(form.error_message.is_none());
    }

    #[test]
    fn test_sample_data_is_in_range() {
        let vocab = vocabulary();
        let mut form = create_test_form(&vocab);
        form.load_sample_data();

        let indicators = form.to_indicators().expect("sample parses");
        assert!(indicators.validate_ranges().is_ok());
    }
}
