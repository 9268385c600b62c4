//! Discovery rows: `<identifier> <path>` pairs.

use tracing::debug;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::identifier::Identifier;

/// One discovered package together with the proto source that declares it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRow {
    pub identifier: Identifier,
    /// Opaque source path, never interpreted.
    pub path: String,
}

/// Parse raw discovery output into rows, preserving order.
///
/// Trailing blank lines are dropped; every other line must hold exactly two
/// whitespace-separated fields.
pub fn parse_rows(output: &str) -> DomainResult<Vec<PackageRow>> {
    let mut lines: Vec<&str> = output
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect();
    while lines.last().is_some_and(|line| line.trim().is_empty()) {
        lines.pop();
    }
    if lines.is_empty() {
        return Err(DomainError::EmptyDiscovery);
    }

    let rows = lines
        .iter()
        .enumerate()
        .map(|(idx, line)| parse_row(idx + 1, line))
        .collect::<DomainResult<Vec<_>>>()?;

    debug!("parse_rows: parsed {} rows", rows.len());
    Ok(rows)
}

fn parse_row(line_no: usize, line: &str) -> DomainResult<PackageRow> {
    let mut fields = line.split_whitespace();
    match (fields.next(), fields.next(), fields.next()) {
        (Some(identifier), Some(path), None) => Ok(PackageRow {
            identifier: Identifier::parse(identifier)?,
            path: path.to_string(),
        }),
        _ => Err(DomainError::MalformedRow {
            line: line_no,
            row: line.to_string(),
        }),
    }
}

/// Identifiers in row order (duplicates kept).
pub fn collect_identifiers(rows: &[PackageRow]) -> Vec<Identifier> {
    rows.iter().map(|row| row.identifier.clone()).collect()
}

/// Source paths in row order, one per row, independent of exclusion and
/// deduplication.
pub fn collect_paths(rows: &[PackageRow]) -> Vec<String> {
    rows.iter().map(|row| row.path.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_rows_with_trailing_newline_when_parsing_then_keeps_order() {
        let rows = parse_rows("b.x proto/b/x.proto\na.y proto/a/y.proto\n").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].identifier.as_str(), "b.x");
        assert_eq!(rows[0].path, "proto/b/x.proto");
        assert_eq!(rows[1].identifier.as_str(), "a.y");
    }

    #[test]
    fn given_crlf_and_several_trailing_blanks_when_parsing_then_drops_them() {
        let rows = parse_rows("a p1\r\nb p2\r\n\r\n\n").unwrap();
        assert_eq!(collect_paths(&rows), ["p1", "p2"]);
    }

    #[test]
    fn given_row_without_path_when_parsing_then_reports_line() {
        let err = parse_rows("a p1\nb\n").unwrap_err();
        assert_eq!(
            err,
            DomainError::MalformedRow {
                line: 2,
                row: "b".into()
            }
        );
    }

    #[test]
    fn given_row_with_extra_field_when_parsing_then_errors() {
        assert!(matches!(
            parse_rows("a p1 extra\n"),
            Err(DomainError::MalformedRow { line: 1, .. })
        ));
    }

    #[test]
    fn given_interior_blank_line_when_parsing_then_errors() {
        assert!(matches!(
            parse_rows("a p1\n\nb p2\n"),
            Err(DomainError::MalformedRow { line: 2, .. })
        ));
    }

    #[test]
    fn given_empty_output_when_parsing_then_errors() {
        assert_eq!(parse_rows(""), Err(DomainError::EmptyDiscovery));
        assert_eq!(parse_rows("\n\n"), Err(DomainError::EmptyDiscovery));
    }

    #[test]
    fn given_malformed_identifier_when_parsing_then_errors() {
        assert!(matches!(
            parse_rows("a..b p1\n"),
            Err(DomainError::MalformedIdentifier { .. })
        ));
    }

    #[test]
    fn given_duplicate_rows_when_collecting_paths_then_keeps_all() {
        let rows = parse_rows("a p1\na p2\nb p3\n").unwrap();
        assert_eq!(collect_paths(&rows).len(), rows.len());
        assert_eq!(collect_identifiers(&rows).len(), 3);
    }
}
