//! Log sanitization utilities for student identifier filtering.
//!
//! This module provides string-based sanitization helpers that can be applied
//! to log output (or any other untrusted text), including:
//! - Assessment and student UUIDs
//! - RA / matrícula numbers
//! - CPF numbers
//! - Emails and phone numbers
//!
//! Sanitizing strings is a fallback. Risk assessments are logged by tier and
//! probability only; raw indicator values never reach logging calls.
//!
//! # Performance
//!
//! `sanitize()` enforces a maximum input size (see
//! `PEDE_SANITIZE_MAX_BYTES`) so that huge log lines stay cheap to scan.

use regex::{Regex, RegexSet};
use std::sync::OnceLock;
use tracing_subscriber::fmt::MakeWriter;

/// Compiled patterns for PII detection and sanitization.
static PII_PATTERNS: OnceLock<PiiPatterns> = OnceLock::new();

/// Maximum number of bytes to sanitize per call.
///
/// Defaults to 16 KiB; can be overridden via `PEDE_SANITIZE_MAX_BYTES`.
const DEFAULT_SANITIZE_MAX_BYTES: usize = 16 * 1024;

/// A compiled PII pattern with its replacement text.
struct PiiPattern {
    regex: Regex,
    replacement: &'static str,
}

struct PiiPatterns {
    fast_set: RegexSet,
    fast_patterns: Vec<PiiPattern>,
}

fn truncate_to_char_boundary(input: &str, max_bytes: usize) -> (&str, bool) {
    if input.len() <= max_bytes {
        return (input, false);
    }

    // Ensure we don't panic on UTF-8 boundaries.
    let mut end = max_bytes.min(input.len());
    while end > 0 && !input.is_char_boundary(end) {
        end -= 1;
    }
    (&input[..end], true)
}

pub(crate) fn max_sanitize_bytes() -> usize {
    std::env::var(crate::config::SANITIZE_MAX_BYTES_ENV)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(DEFAULT_SANITIZE_MAX_BYTES)
}

/// Initialize PII patterns (called once at startup).
fn get_patterns() -> &'static PiiPatterns {
    PII_PATTERNS.get_or_init(|| {
        // Order matters: CPF before phone so that the dotted form is not
        // partially consumed.
        let rules: Vec<(&'static str, &'static str)> = vec![
            (
                r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
                "[REDACTED-UUID]",
            ),
            (r"\b\d{3}\.\d{3}\.\d{3}-\d{2}\b", "[REDACTED-CPF]"),
            (r"(?i)\bCPF[:\s]*\d{11}\b", "[REDACTED-CPF]"),
            (r"(?i)\bRA[-:\s]?\d{3,10}\b", "[REDACTED-RA]"),
            (
                r"(?i)\bmatr(?:i|í)cula[:\s#]*\d{4,12}\b",
                "[REDACTED-MATRICULA]",
            ),
            (
                r"(?i)\b[a-z0-9](?:[a-z0-9._%+-]{0,62}[a-z0-9])?@(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,}\b",
                "[REDACTED-EMAIL]",
            ),
            (
                r"(?:\+55\s?)?(?:\(\d{2}\)|\b\d{2})\s?9?\d{4}-\d{4}\b",
                "[REDACTED-PHONE]",
            ),
        ];

        let fast_set = RegexSet::new(rules.iter().map(|(p, _)| *p)).expect("Valid regex set");
        let fast_patterns = rules
            .into_iter()
            .map(|(pattern, replacement)| PiiPattern {
                regex: Regex::new(pattern).expect("Valid regex"),
                replacement,
            })
            .collect();

        PiiPatterns {
            fast_set,
            fast_patterns,
        }
    })
}

/// Sanitize a string by replacing PII patterns.
///
/// This function applies all registered PII patterns to the input string
/// and returns a sanitized version.
#[must_use]
pub fn sanitize(input: &str) -> String {
    sanitize_with_limit(input, max_sanitize_bytes())
}

fn sanitize_with_limit(input: &str, max_bytes: usize) -> String {
    let patterns = get_patterns();

    let (prefix, truncated) = truncate_to_char_boundary(input, max_bytes);

    // Fast path: single scan for "any match".
    if !patterns.fast_set.is_match(prefix) {
        let mut out = prefix.to_string();
        if truncated {
            out.push_str(" [TRUNCATED]");
        }
        return out;
    }

    // Only apply patterns that matched the original prefix.
    let matched: Vec<usize> = patterns.fast_set.matches(prefix).into_iter().collect();
    let mut result = prefix.to_string();
    for idx in matched {
        let pattern = &patterns.fast_patterns[idx];
        result = pattern
            .regex
            .replace_all(&result, pattern.replacement)
            .to_string();
    }

    if truncated {
        result.push_str(" [TRUNCATED]");
    }
    result
}

/// Check if a string contains a student identifier.
#[must_use]
pub fn contains_pii(input: &str) -> bool {
    let (prefix, _truncated) = truncate_to_char_boundary(input, max_sanitize_bytes());
    get_patterns().fast_set.is_match(prefix)
}

/// A `tracing_subscriber` writer wrapper that sanitizes formatted log output
/// before it is written to the underlying sink.
///
/// Sanitization happens line by line, so callsites never call `sanitize()`
/// themselves.
#[derive(Debug)]
pub struct SanitizingMakeWriter<M> {
    inner: M,
}

impl<M> SanitizingMakeWriter<M> {
    #[must_use]
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

impl<M> Clone for SanitizingMakeWriter<M>
where
    M: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

pub struct SanitizingWriter<W> {
    inner: W,
    buffer: Vec<u8>,
}

impl<W> SanitizingWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
        }
    }
}

impl<W> SanitizingWriter<W>
where
    W: std::io::Write,
{
    fn flush_lines(&mut self) -> std::io::Result<()> {
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line = self.buffer.drain(..=pos).collect::<Vec<u8>>();
            let line_str = String::from_utf8_lossy(&line);
            let sanitized = sanitize(&line_str);
            self.inner.write_all(sanitized.as_bytes())?;
        }
        Ok(())
    }
}

impl<W> std::io::Write for SanitizingWriter<W>
where
    W: std::io::Write,
{
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);

        // Prevent unbounded buffering if the formatter writes a huge line with no newlines.
        // We fall back to lossy UTF-8 conversion; `sanitize()` will also cap the output.
        let hard_cap = max_sanitize_bytes().saturating_mul(2);
        if hard_cap > 0 && self.buffer.len() > hard_cap {
            let s = String::from_utf8_lossy(&self.buffer).to_string();
            let sanitized = sanitize(&s);
            self.inner.write_all(sanitized.as_bytes())?;
            self.inner.write_all(b"\n[TRUNCATED]\n")?;
            self.buffer.clear();
            return Ok(buf.len());
        }

        self.flush_lines()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_lines()?;

        if !self.buffer.is_empty() {
            let s = String::from_utf8_lossy(&self.buffer);
            let sanitized = sanitize(&s);
            self.inner.write_all(sanitized.as_bytes())?;
            self.buffer.clear();
        }

        self.inner.flush()
    }
}

impl<'a, M> MakeWriter<'a> for SanitizingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = SanitizingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        SanitizingWriter::new(self.inner.make_writer())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_sanitize_uuid() {
        let input = "Assessment 550e8400-e29b-41d4-a716-446655440000 completed";
        let sanitized = sanitize(input);
        assert!(sanitized.contains("[REDACTED-UUID]"));
        assert!(!sanitized.contains("550e8400"));
    }

    #[test]
    fn test_sanitize_cpf() {
        let sanitized = sanitize("CPF do responsável: 123.456.789-09");
        assert!(sanitized.contains("[REDACTED-CPF]"));
        assert!(!sanitized.contains("789-09"));
        assert!(sanitize("cpf 12345678909").contains("[REDACTED-CPF]"));
    }

    #[test]
    fn test_sanitize_ra_and_matricula() {
        assert!(sanitize("aluno RA-1234 avaliado").contains("[REDACTED-RA]"));
        assert!(sanitize("Matrícula: 20230145").contains("[REDACTED-MATRICULA]"));
        assert!(sanitize("matricula 20230145").contains("[REDACTED-MATRICULA]"));
    }

    #[test]
    fn test_sanitize_email_and_phone() {
        assert!(sanitize("Contato: familia@exemplo.com.br").contains("[REDACTED-EMAIL]"));
        let sanitized = sanitize("Tel (11) 98765-4321");
        assert!(sanitized.contains("[REDACTED-PHONE]"));
        assert!(!sanitized.contains("4321"));
        assert!(sanitize("+55 11 98765-4321").contains("[REDACTED-PHONE]"));
    }

    #[test]
    fn test_year_ranges_and_scores_untouched() {
        let input = "Loaded years 2022-2024, tier=Moderado p=0.8000";
        assert_eq!(sanitize(input), input);
        assert!(!contains_pii(input));
    }

    #[test]
    fn test_contains_pii() {
        assert!(contains_pii("ID: 550e8400-e29b-41d4-a716-446655440000"));
        assert!(contains_pii("RA 98765"));
        assert!(!contains_pii("Just normal log text"));
    }

    #[test]
    fn test_sanitize_truncates_large_inputs() {
        let input = "prefix RA-123456 suffix and a lot more text";
        let sanitized = sanitize_with_limit(input, 16);
        assert!(sanitized.ends_with("[TRUNCATED]"));
        assert!(!sanitized.contains("suffix"));
    }

    #[test]
    fn test_writer_sanitizes_per_line() {
        let mut sink = Vec::new();
        {
            let mut writer = SanitizingWriter::new(&mut sink);
            writer.write_all(b"first RA-").expect("write");
            writer.write_all(b"4321 line\nsecond\n").expect("write");
            writer.flush().expect("flush");
        }
        let out = String::from_utf8(sink).expect("utf8");
        assert_eq!(out, "first [REDACTED-RA] line\nsecond\n");
    }
}
