//! Error rendering using ariadne
//!
//! Engine messages carry their location as `chunk:line: text`. When the
//! source of the failing chunk is at hand, the offending line is shown with
//! the message attached to it; otherwise the classification and message are
//! printed as they are.

use crate::{Error, ErrorKind};
use ariadne::{Color, Label, Report, ReportKind, Source};
use std::io::Write;
use std::ops::Range;

/// Render an error to stderr.
///
/// `source` is the chunk's name and text, if the caller has them.
pub fn render_error(error: &Error, source: Option<(&str, &str)>) {
    render_error_to_writer(error, source, &mut std::io::stderr(), true).ok();
}

/// Render an error to a specific writer
pub fn render_error_to(
    error: &Error,
    source: Option<(&str, &str)>,
    writer: &mut dyn Write,
) -> std::io::Result<()> {
    render_error_to_writer(error, source, writer, true)
}

/// Render an error to a String without color codes (useful for tests)
pub fn render_error_to_string_no_color(error: &Error, source: Option<(&str, &str)>) -> String {
    let mut buf = Vec::new();
    render_error_to_writer(error, source, &mut buf, false).ok();
    String::from_utf8_lossy(&buf).to_string()
}

fn render_error_to_writer(
    error: &Error,
    source: Option<(&str, &str)>,
    writer: &mut dyn Write,
    use_color: bool,
) -> std::io::Result<()> {
    let located = source.and_then(|(name, text)| {
        let (line, detail) = locate(error.message())?;
        let span = line_span(text, line)?;
        Some((name, text, span, detail))
    });

    let Some((name, text, span, detail)) = located else {
        return writeln!(writer, "[{}] {}", title(error.kind()), error.message());
    };

    Report::build(ReportKind::Error, (name, span.clone()))
        .with_message(title(error.kind()))
        .with_config(ariadne::Config::default().with_color(use_color))
        .with_label(
            Label::new((name, span))
                .with_message(detail)
                .with_color(Color::Red),
        )
        .finish()
        .write((name, Source::from(text)), &mut *writer)
}

fn title(kind: ErrorKind) -> String {
    let mut title = kind.to_string();
    if let Some(first) = title.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    title
}

/// Finds the first `:<line>:` marker and returns the line with the text after it.
fn locate(message: &str) -> Option<(usize, String)> {
    let bytes = message.as_bytes();
    let mut start = 0;
    while let Some(offset) = message[start..].find(':') {
        let colon = start + offset;
        let digits = bytes[colon + 1..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        let end = colon + 1 + digits;
        if digits > 0 && bytes.get(end) == Some(&b':') {
            let line = message[colon + 1..end].parse().ok()?;
            let rest = message[end + 1..].lines().next().unwrap_or("").trim();
            return Some((line, rest.to_string()));
        }
        start = colon + 1;
    }
    None
}

/// Character range of the 1-based `line` in `text`, without its newline.
fn line_span(text: &str, line: usize) -> Option<Range<usize>> {
    let mut offset = 0;
    for (number, content) in text.split('\n').enumerate() {
        let width = content.trim_end_matches('\r').chars().count();
        if number + 1 == line {
            return Some(offset..offset + width.max(1));
        }
        offset += content.chars().count() + 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Script;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_locate() {
        assert_eq!(
            locate("[string \"x = 1...\"]:3: unexpected symbol near 'is'"),
            Some((3, "unexpected symbol near 'is'".to_string()))
        );
        assert_eq!(
            locate("runtime error: settings.lua:12: boom\nstack traceback:\n..."),
            Some((12, "boom".to_string()))
        );
        assert_eq!(locate("no location here: at all"), None);
    }

    #[test]
    fn test_line_span() {
        let text = "first\nsecond\r\n\nfourth";
        assert_eq!(line_span(text, 1), Some(0..5));
        assert_eq!(line_span(text, 2), Some(6..12));
        assert_eq!(line_span(text, 3), Some(14..15));
        assert_eq!(line_span(text, 4), Some(15..21));
        assert_eq!(line_span(text, 5), None);
    }

    #[test]
    fn test_render_syntax_error_with_source() {
        let source = "x = 1\nthis is not valid\n";
        let mut script = Script::new();
        let err = script.run_string(source).unwrap_err();

        let output = render_error_to_string_no_color(&err, Some(("chunk", source)));
        assert!(output.contains("Syntax error"), "{}", output);
        assert!(output.contains("this is not valid"), "{}", output);
    }

    #[test]
    fn test_render_without_source() {
        let err = Error::stack("call needs a function and 1 arguments but the stack has 0 values");
        let output = render_error_to_string_no_color(&err, None);
        assert_eq!(
            output,
            "[Stack error] call needs a function and 1 arguments but the stack has 0 values\n"
        );
    }
}
