//! CSV with a header row: one raw entity per row

use super::{ParseResult, ParsedFile};
use crate::resolve::RawRecord;
use tracing::warn;

pub(super) fn parse(bytes: &[u8], source: &str) -> ParseResult<ParsedFile> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader.headers()?.clone();
    let mut parsed = ParsedFile::default();

    for (index, row) in reader.records().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                parsed.malformed += 1;
                warn!(source = source, row = index + 1, error = %e, "skipping undecodable CSV row");
                continue;
            }
        };

        // Blank cells are absent fields, not empty values
        let record = headers
            .iter()
            .zip(row.iter())
            .filter(|(header, cell)| !header.is_empty() && !cell.is_empty())
            .fold(RawRecord::new(), |record, (header, cell)| record.with(header, cell));

        if !record.is_empty() {
            parsed.entities.push(record);
        }
    }

    Ok(parsed)
}
