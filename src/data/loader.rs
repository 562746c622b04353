//! Table Loader Module
//! Parses delimited text into a typed [`Table`] and owns the currently loaded table.

use crate::data::table::{delimiter_byte, Cell, Table};
use crate::error::{AnalyticsError, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Turns raw delimited text into a [`Table`].
#[derive(Debug, Clone)]
pub struct TableParser {
    delimiter: char,
    has_header: bool,
}

impl Default for TableParser {
    fn default() -> Self {
        Self::new()
    }
}

impl TableParser {
    pub fn new() -> Self {
        Self {
            delimiter: ',',
            has_header: true,
        }
    }

    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn has_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    /// Parse text. Blank lines are ignored; every other line must have the header's width.
    /// Quoting is off: a field is exactly the (trimmed) text between two delimiters.
    pub fn parse(&self, input: &str) -> Result<Table> {
        let input = input.strip_prefix('\u{feff}').unwrap_or(input);
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter_byte(self.delimiter)?)
            .has_headers(false)
            .quoting(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(input.as_bytes());

        let mut records: Vec<(usize, StringRecord)> = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| AnalyticsError::MalformedInput {
                line: e.position().map_or(0, |p| p.line() as usize),
                message: e.to_string(),
            })?;
            // whitespace-only lines arrive as one empty field
            if record.len() == 1 && record[0].is_empty() {
                continue;
            }
            let line = record.position().map_or(0, |p| p.line() as usize);
            records.push((line, record));
        }

        let mut records = records.into_iter();
        let Some((first_no, first)) = records.next() else {
            return Err(AnalyticsError::MalformedInput {
                line: 0,
                message: "input contains no rows".to_string(),
            });
        };
        let width = first.len();

        let mut rows: Vec<Vec<Cell>> = Vec::new();
        let header: Vec<String> = if self.has_header {
            first.iter().map(str::to_string).collect()
        } else {
            rows.push(first.iter().map(Cell::parse).collect());
            (1..=width).map(|i| format!("Column {i}")).collect()
        };

        for (line_no, record) in records {
            if record.len() != width {
                return Err(AnalyticsError::MalformedInput {
                    line: line_no,
                    message: format!("expected {width} fields, got {}", record.len()),
                });
            }
            rows.push(record.iter().map(Cell::parse).collect());
        }

        debug!(
            first_line = first_no,
            rows = rows.len(),
            columns = width,
            "parsed table"
        );
        Ok(Table::from_parts(header, rows, self.has_header))
    }
}

/// Optional cap on the number of data rows an operation sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowLimit(Option<usize>);

impl RowLimit {
    pub const ALL: RowLimit = RowLimit(None);

    /// Absent, blank or invalid → all rows; a positive integer → that many rows.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Self::ALL,
            Some(s) => match s.parse::<usize>() {
                Ok(n) if n > 0 => Self(Some(n)),
                _ => {
                    warn!(row_limit = s, "row limit is not a positive integer; using all rows");
                    Self::ALL
                }
            },
        }
    }

    pub fn from_config(limit: Option<usize>) -> Self {
        match limit {
            Some(0) => {
                warn!("configured row limit is zero; using all rows");
                Self::ALL
            }
            other => Self(other),
        }
    }

    pub fn get(&self) -> Option<usize> {
        self.0
    }
}

/// The host-owned "currently loaded table", replaced wholesale on every load or kept pass.
#[derive(Debug, Default)]
pub struct Session {
    parser: TableParser,
    table: Option<Table>,
    source: Option<PathBuf>,
}

impl Session {
    pub fn new(parser: TableParser) -> Self {
        Self {
            parser,
            table: None,
            source: None,
        }
    }

    /// Parse text and replace the current table. On error the previous table is kept.
    pub fn load_str(&mut self, input: &str) -> Result<&Table> {
        let table = self.parser.parse(input)?;
        info!(
            rows = table.row_count(),
            columns = table.column_count(),
            "table loaded"
        );
        self.source = None;
        Ok(self.table.insert(table))
    }

    pub fn load_file(&mut self, path: &Path) -> Result<&Table> {
        let text = std::fs::read_to_string(path)?;
        let table = self.parser.parse(&text)?;
        info!(
            path = %path.display(),
            rows = table.row_count(),
            columns = table.column_count(),
            "table loaded"
        );
        self.source = Some(path.to_path_buf());
        Ok(self.table.insert(table))
    }

    pub fn replace(&mut self, table: Table) {
        debug!(rows = table.row_count(), "session table replaced");
        self.table = Some(table);
    }

    pub fn table(&self) -> Option<&Table> {
        self.table.as_ref()
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// A fresh copy of the (row-limited) table for one operation.
    pub fn snapshot(&self, limit: RowLimit) -> Result<Table> {
        self.table
            .as_ref()
            .map(|t| t.limited(limit.get()))
            .ok_or(AnalyticsError::NoData)
    }

    /// Serialize the current table with the parser's delimiter.
    pub fn export(&self) -> Result<String> {
        self.table
            .as_ref()
            .ok_or(AnalyticsError::NoData)?
            .to_delimited(self.parser.delimiter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_and_typed_cells() {
        let t = TableParser::new().parse("a,b\n1,x\n,2.5\n").unwrap();
        assert_eq!(t.header(), &["a".to_string(), "b".to_string()]);
        assert_eq!(t.row_count(), 2);
        assert_eq!(t.rows()[0], vec![Cell::Number(1.0), Cell::Text("x".into())]);
        assert_eq!(t.rows()[1], vec![Cell::Missing, Cell::Number(2.5)]);
    }

    #[test]
    fn handles_crlf_bom_and_blank_lines() {
        let t = TableParser::new()
            .parse("\u{feff}a,b\r\n1,2\r\n\r\n3,4\r\n")
            .unwrap();
        assert_eq!(t.row_count(), 2);
        assert_eq!(t.rows()[1][1], Cell::Number(4.0));
    }

    #[test]
    fn ragged_row_is_malformed() {
        let err = TableParser::new().parse("a,b\n1,2\n3\n").unwrap_err();
        match err {
            AnalyticsError::MalformedInput { line, .. } => assert_eq!(line, 3),
            other => panic!("expected MalformedInput, got {other:?}"),
        }
    }

    #[test]
    fn quotes_are_plain_text() {
        let t = TableParser::new().parse("name,v\n\"bob\",2").unwrap();
        assert_eq!(t.rows()[0][0], Cell::Text("\"bob\"".into()));

        let err = TableParser::new().parse("a,b\n\"1,2\",3").unwrap_err();
        assert!(matches!(err, AnalyticsError::MalformedInput { line: 2, .. }));
    }

    #[test]
    fn non_ascii_delimiter_is_rejected() {
        assert!(matches!(
            TableParser::new().delimiter('→').parse("a→b\n1→2"),
            Err(AnalyticsError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn empty_input_is_malformed() {
        assert!(matches!(
            TableParser::new().parse("  \n"),
            Err(AnalyticsError::MalformedInput { .. })
        ));
    }

    #[test]
    fn headerless_keeps_first_line_as_data() {
        let t = TableParser::new()
            .has_header(false)
            .delimiter(';')
            .parse("1;2\n3;4")
            .unwrap();
        assert_eq!(t.header(), &["Column 1".to_string(), "Column 2".to_string()]);
        assert_eq!(t.row_count(), 2);
        assert!(!t.has_header());
        assert_eq!(t.to_delimited(';').unwrap(), "1;2\n3;4\n");
    }

    #[test]
    fn row_limit_rules() {
        assert_eq!(RowLimit::parse(None), RowLimit::ALL);
        assert_eq!(RowLimit::parse(Some(" ")), RowLimit::ALL);
        assert_eq!(RowLimit::parse(Some(" 3 ")).get(), Some(3));
        assert_eq!(RowLimit::from_config(Some(5)).get(), Some(5));
    }

    #[test]
    fn invalid_row_limit_falls_back_to_all_rows() {
        for raw in ["0", "-2", "ten", "1.5"] {
            assert_eq!(RowLimit::parse(Some(raw)), RowLimit::ALL, "input {raw:?}");
        }
        assert_eq!(RowLimit::from_config(Some(0)), RowLimit::ALL);

        let mut session = Session::new(TableParser::new());
        session.load_str("a\n1\n2\n3").unwrap();
        let snapshot = session.snapshot(RowLimit::parse(Some("zero"))).unwrap();
        assert_eq!(snapshot.row_count(), 3);
    }

    #[test]
    fn session_replace_on_load_and_failed_load_keeps_table() {
        let mut session = Session::new(TableParser::new());
        assert!(matches!(session.snapshot(RowLimit::ALL), Err(AnalyticsError::NoData)));

        session.load_str("a\n1\n2\n3").unwrap();
        assert_eq!(session.snapshot(RowLimit::parse(Some("2"))).unwrap().row_count(), 2);

        assert!(session.load_str("a,b\n1\n").is_err());
        assert_eq!(session.table().unwrap().row_count(), 3);
        assert_eq!(session.export().unwrap(), "a\n1\n2\n3\n");
    }

    #[test]
    fn load_file_records_source() {
        let path = std::env::temp_dir().join(format!("tabula-source-{}.csv", std::process::id()));
        std::fs::write(&path, "a,b\n1,2\n").unwrap();

        let mut session = Session::new(TableParser::new());
        assert_eq!(session.load_file(&path).unwrap().row_count(), 1);
        assert_eq!(session.source(), Some(path.as_path()));

        session.load_str("a\n1").unwrap();
        assert_eq!(session.source(), None);

        std::fs::remove_file(&path).unwrap();
        assert!(matches!(session.load_file(&path), Err(AnalyticsError::Io(_))));
    }
}
