//! Response grammar parser
//!
//! ```text
//! response   := preamble? block*
//! block      := marker-line body
//! marker     := "===CULTIVAR:" name "==="
//! label-line := ("TAGLINE" | "DESCRIPTION" | "NOTES") ":" text
//! ```
//!
//! Line-oriented. A field runs from its label to the next label line, the
//! next marker line or end of input. Rejected markers come back as
//! `ParsedSegment::Failure` so the caller can count and log them.

use crate::models::generated::ParseFailureReason;
use crate::models::{GeneratedBlock, ParseFailure, ParsedSegment, TargetField};
use std::collections::BTreeSet;

/// Delimiter closing a marker line; must never appear inside a name
pub const BLOCK_DELIMITER: &str = "===";

/// Start of a block marker line
pub const MARKER_PREFIX: &str = "===CULTIVAR:";

/// What continuation lines are currently feeding
enum Capture {
    /// Between marker and first label, or junk
    Nothing,
    Field(TargetField),
    /// Repeated label: drop until the next label or marker
    Discard,
}

struct OpenBlock {
    block: GeneratedBlock,
    seen: BTreeSet<TargetField>,
    capture: Capture,
    buffer: String,
}

impl OpenBlock {
    fn new(name: String) -> Self {
        Self {
            block: GeneratedBlock::new(name),
            seen: BTreeSet::new(),
            capture: Capture::Nothing,
            buffer: String::new(),
        }
    }

    fn close_field(&mut self) {
        if let Capture::Field(field) = self.capture {
            self.block
                .fields
                .insert(field, self.buffer.trim().to_string());
        }
        self.buffer.clear();
        self.capture = Capture::Nothing;
    }

    fn open_field(&mut self, field: TargetField, first_line: &str, line_no: usize) {
        self.close_field();
        if self.seen.insert(field) {
            self.capture = Capture::Field(field);
            self.buffer.push_str(first_line);
        } else {
            tracing::debug!(
                cultivar = %self.block.name,
                field = %field,
                line = line_no,
                "Repeated label ignored"
            );
            self.capture = Capture::Discard;
        }
    }

    fn push_line(&mut self, line: &str) {
        if let Capture::Field(_) = self.capture {
            self.buffer.push('\n');
            self.buffer.push_str(line);
        }
    }

    fn finish(mut self) -> GeneratedBlock {
        self.close_field();
        self.block
    }
}

/// Parse a raw response into blocks and marker failures, in response order
pub fn parse_blocks(text: &str) -> Vec<ParsedSegment> {
    let mut segments = Vec::new();
    let mut open: Option<OpenBlock> = None;

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim();

        if let Some(marker) = parse_marker(line) {
            if let Some(block) = open.take() {
                segments.push(ParsedSegment::Block(block.finish()));
            }
            match marker {
                Ok(name) => open = Some(OpenBlock::new(name)),
                Err(reason) => {
                    tracing::debug!(line = line_no, %reason, "Rejected marker line");
                    segments.push(ParsedSegment::Failure(ParseFailure {
                        line: line_no,
                        marker: line.to_string(),
                        reason,
                    }));
                }
            }
            continue;
        }

        // Preamble, or the body of a rejected marker
        let Some(block) = open.as_mut() else {
            continue;
        };

        match parse_label(line) {
            Some((field, rest)) => block.open_field(field, rest, line_no),
            None => block.push_line(line),
        }
    }

    if let Some(block) = open {
        segments.push(ParsedSegment::Block(block.finish()));
    }

    segments
}

/// Split parser output into accepted blocks and failures
pub fn split_segments(segments: Vec<ParsedSegment>) -> (Vec<GeneratedBlock>, Vec<ParseFailure>) {
    let mut blocks = Vec::new();
    let mut failures = Vec::new();
    for segment in segments {
        match segment {
            ParsedSegment::Block(block) => blocks.push(block),
            ParsedSegment::Failure(failure) => failures.push(failure),
        }
    }
    (blocks, failures)
}

/// `None` when the line is not a marker at all
fn parse_marker(line: &str) -> Option<Result<String, ParseFailureReason>> {
    let inner = line.strip_prefix(MARKER_PREFIX)?.strip_suffix(BLOCK_DELIMITER)?;
    let name = inner.trim();

    Some(if name.is_empty() {
        Err(ParseFailureReason::EmptyName)
    } else if name.contains(BLOCK_DELIMITER) {
        Err(ParseFailureReason::DelimiterInName)
    } else {
        Ok(name.to_string())
    })
}

fn parse_label(line: &str) -> Option<(TargetField, &str)> {
    let (label, rest) = line.split_once(':')?;
    let field = TargetField::from_label(label.trim_end())?;
    Some((field, rest.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(blocks: &[GeneratedBlock]) -> String {
        blocks
            .iter()
            .map(|b| {
                format!(
                    "===CULTIVAR: {}===\nTAGLINE: {}\nDESCRIPTION: {}\nNOTES: {}\n",
                    b.name,
                    b.field(TargetField::Tagline),
                    b.field(TargetField::Description),
                    b.field(TargetField::Notes)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn only_blocks(text: &str) -> Vec<GeneratedBlock> {
        let (blocks, failures) = split_segments(parse_blocks(text));
        assert!(failures.is_empty(), "unexpected failures: {:?}", failures);
        blocks
    }

    #[test]
    fn test_recovers_rendered_blocks() {
        let expected = vec![
            GeneratedBlock::new("Kumasaka")
                .with_field(TargetField::Tagline, "An Edo-period japonica still widely grown.")
                .with_field(TargetField::Description, "Medium pink rose form double.")
                .with_field(
                    TargetField::Notes,
                    "Grown in Japan since 1695.\nSource: International Camellia Register",
                ),
            GeneratedBlock::new("Asakura")
                .with_field(TargetField::Tagline, "A Kurume sasanqua.")
                .with_field(TargetField::Description, "Large white semi-double.")
                .with_field(TargetField::Notes, "Hardy and long flowering."),
        ];

        let text = format!("Here are the rewrites:\n\n{}", render(&expected));
        assert_eq!(only_blocks(&text), expected);
    }

    #[test]
    fn test_zero_markers_is_empty_not_error() {
        assert!(parse_blocks("").is_empty());
        assert!(parse_blocks("I cannot help with that.\nTAGLINE: stray").is_empty());
    }

    #[test]
    fn test_missing_field_parses_empty() {
        let blocks = only_blocks("===CULTIVAR: Asakura===\nTAGLINE: Short.\nNOTES: Long.\n");

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].field(TargetField::Tagline), "Short.");
        assert_eq!(blocks[0].field(TargetField::Description), "");
        assert_eq!(blocks[0].field(TargetField::Notes), "Long.");
    }

    #[test]
    fn test_later_content_does_not_leak_into_earlier_field() {
        let text = "\
===CULTIVAR: One===
NOTES: first notes
TAGLINE: the tagline
===CULTIVAR: Two===
DESCRIPTION: second
";
        let blocks = only_blocks(text);

        assert_eq!(blocks[0].field(TargetField::Notes), "first notes");
        assert_eq!(blocks[0].field(TargetField::Tagline), "the tagline");
        assert_eq!(blocks[0].field(TargetField::Description), "");
        assert_eq!(blocks[1].field(TargetField::Description), "second");
    }

    #[test]
    fn test_multiline_field_trimmed() {
        let text = "===CULTIVAR: Kumasaka===\nNOTES:\n   Line one.\n\n   Line two.   \n\n";
        let blocks = only_blocks(text);

        assert_eq!(blocks[0].field(TargetField::Notes), "Line one.\n\nLine two.");
    }

    #[test]
    fn test_repeated_label_keeps_first_value() {
        let text = "\
===CULTIVAR: Kumasaka===
TAGLINE: first
TAGLINE: second
  more of second
NOTES: notes
";
        let blocks = only_blocks(text);

        assert_eq!(blocks[0].field(TargetField::Tagline), "first");
        assert_eq!(blocks[0].field(TargetField::Notes), "notes");
    }

    #[test]
    fn test_label_must_start_line() {
        let text = "===CULTIVAR: Kumasaka===\nNOTES: Its TAGLINE: is not a label here.\n";
        let blocks = only_blocks(text);

        assert_eq!(
            blocks[0].field(TargetField::Notes),
            "Its TAGLINE: is not a label here."
        );
        assert_eq!(blocks[0].field(TargetField::Tagline), "");
    }

    #[test]
    fn test_empty_name_is_tagged_failure() {
        let text = "intro\n===CULTIVAR: ===\nTAGLINE: orphan\n===CULTIVAR: Asakura===\nTAGLINE: kept\n";
        let segments = parse_blocks(text);

        assert_eq!(segments.len(), 2);
        assert_eq!(
            segments[0],
            ParsedSegment::Failure(ParseFailure {
                line: 2,
                marker: "===CULTIVAR: ===".to_string(),
                reason: ParseFailureReason::EmptyName,
            })
        );
        match &segments[1] {
            ParsedSegment::Block(block) => {
                assert_eq!(block.name, "Asakura");
                assert_eq!(block.field(TargetField::Tagline), "kept");
            }
            other => panic!("expected block, got {:?}", other),
        }
    }

    #[test]
    fn test_delimiter_inside_name_is_tagged_failure() {
        let text = "===CULTIVAR: Odd===Name===\nTAGLINE: would be misattributed\n";
        let (blocks, failures) = split_segments(parse_blocks(text));

        assert!(blocks.is_empty());
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].line, 1);
        assert_eq!(failures[0].reason, ParseFailureReason::DelimiterInName);
    }

    #[test]
    fn test_marker_tolerates_inner_whitespace_and_indent() {
        let blocks = only_blocks("   ===CULTIVAR:   Pink Perfection   ===\nTAGLINE: x\n");
        assert_eq!(blocks[0].name, "Pink Perfection");
    }

    #[test]
    fn test_unclosed_marker_is_plain_text() {
        let text = "===CULTIVAR: One===\nNOTES: a\n===CULTIVAR: not closed\nmore\n";
        let blocks = only_blocks(text);

        assert_eq!(blocks.len(), 1);
        assert_eq!(
            blocks[0].field(TargetField::Notes),
            "a\n===CULTIVAR: not closed\nmore"
        );
    }
}
