use anyhow::{Context, Result};
use search_core::{DocumentStatus, EngineOptions, SearchEngine, StopWords};

use std::io::{BufRead, Write};

/// Line-based session: a stop-words line, a document count line, that many
/// document lines (ids `0..n`), then one query per line until end of input.
/// Query errors are reported inline and the session continues.
pub fn run<R: BufRead, W: Write>(input: R, out: &mut W, options: EngineOptions) -> Result<()> {
    let mut lines = input.lines();
    let mut next_line = |what: &str| -> Result<String> {
        lines
            .next()
            .with_context(|| format!("missing {what} line"))?
            .map_err(Into::into)
    };

    let stop_words = StopWords::from_text(&next_line("stop words")?)?;
    let count: usize = next_line("document count")?
        .trim()
        .parse()
        .context("document count must be a non-negative number")?;

    let mut engine = SearchEngine::with_options(stop_words, options);
    for id in 0..count {
        let text = next_line("document")?;
        let id = i32::try_from(id).context("too many documents")?;
        engine.add_document(id, &text, DocumentStatus::Active, &[])?;
    }
    tracing::info!(documents = engine.document_count(), "console corpus ready");

    for query in lines {
        let query = query?;
        match engine.find_top_documents(&query) {
            Ok(documents) => {
                for document in documents {
                    writeln!(out, "{document}")?;
                }
            }
            Err(err) => {
                tracing::warn!(%err, query = %query, "rejected query");
                writeln!(out, "error: {err}")?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn answers_each_query() {
        let input = "and with\n2\nfunny pet and nasty rat\nfunny pet with curly hair\ncurly\n--bad\nnothing\n";
        let mut out = Vec::new();
        run(Cursor::new(input), &mut out, EngineOptions::default()).unwrap();
        let out = String::from_utf8(out).unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("{ document_id = 1, relevance = "));
        assert!(lines[1].starts_with("error: invalid input"));
    }

    #[test]
    fn missing_documents_fail() {
        let mut out = Vec::new();
        let err = run(Cursor::new("and\n3\nonly one\n"), &mut out, EngineOptions::default()).unwrap_err();
        assert!(err.to_string().contains("missing document line"));
    }

    #[test]
    fn bad_count_fails() {
        let mut out = Vec::new();
        assert!(run(Cursor::new("and\nmany\n"), &mut out, EngineOptions::default()).is_err());
    }
}
