//! CSV rendering for custom reports. Quoting follows RFC 4180 via the `csv`
//! crate, so commas, quotes and newlines inside a cell keep columns aligned.

use chrono::{DateTime, Utc};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush csv buffer: {0}")]
    Flush(String),
    #[error("csv output is not utf-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Titled table inside a [`CsvReport`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CsvSection {
    pub title: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvSection {
    pub fn new(title: &str, header: &[&str]) -> Self {
        Self {
            title: title.to_string(),
            header: header.iter().map(|cell| cell.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn row<I, S>(mut self, cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
        self
    }
}

/// Several sections rendered one after another, separated by blank lines.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvReport {
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub sections: Vec<CsvSection>,
}

impl CsvReport {
    pub fn new(title: &str, generated_at: DateTime<Utc>) -> Self {
        Self {
            title: title.to_string(),
            generated_at,
            sections: Vec::new(),
        }
    }

    pub fn push(&mut self, section: CsvSection) {
        self.sections.push(section);
    }

    pub fn render(&self) -> Result<String, ExportError> {
        let preamble = vec![
            vec![self.title.clone()],
            vec!["Generated".to_string(), self.generated_at.to_rfc3339()],
        ];
        let mut blocks = vec![write_block(&preamble)?];

        for section in &self.sections {
            let mut records = Vec::with_capacity(section.rows.len() + 2);
            records.push(vec![section.title.clone()]);
            if !section.header.is_empty() {
                records.push(section.header.clone());
            }
            records.extend(section.rows.iter().cloned());
            blocks.push(write_block(&records)?);
        }

        Ok(blocks.join("\n"))
    }
}

fn write_block(records: &[Vec<String>]) -> Result<String, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());
    for record in records {
        writer.write_record(record)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|error| ExportError::Flush(error.to_string()))?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn report() -> CsvReport {
        let generated = Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).single().expect("valid");
        let mut report = CsvReport::new("Custom Report", generated);
        report.push(
            CsvSection::new("Applications by country", &["Country", "Count"])
                .row(["Australia", "4"])
                .row(["Sydney, NSW", "2"]),
        );
        report.push(
            CsvSection::new("Notes", &["Note"]).row([r#"Said "maybe" on the call"#]),
        );
        report
    }

    fn parse(text: &str) -> Vec<Vec<String>> {
        csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes())
            .records()
            .map(|record| {
                record
                    .expect("valid record")
                    .iter()
                    .map(str::to_string)
                    .collect()
            })
            .collect()
    }

    #[test]
    fn embedded_comma_keeps_column_alignment() {
        let rendered = report().render().expect("renders");
        assert!(rendered.contains("\"Sydney, NSW\",2"));

        let rows = parse(&rendered);
        let sydney = rows
            .iter()
            .find(|row| row.first().map(String::as_str) == Some("Sydney, NSW"))
            .expect("row present");
        assert_eq!(sydney.len(), 2);
        assert_eq!(sydney[1], "2");
    }

    #[test]
    fn embedded_quotes_survive() {
        let rows = parse(&report().render().expect("renders"));
        assert!(rows
            .iter()
            .any(|row| row.first().map(String::as_str) == Some(r#"Said "maybe" on the call"#)));
    }

    #[test]
    fn sections_start_with_their_title() {
        let rendered = report().render().expect("renders");
        assert!(rendered.starts_with("Custom Report\nGenerated,2025-05-01T00:00:00+00:00\n"));
        assert!(rendered.contains("\nApplications by country\nCountry,Count\n"));
        assert!(rendered.contains("\n\nNotes\n"));
    }
}
