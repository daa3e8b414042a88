// Primitives for reading ballot CSV files.

use std::io::Read;

use csv::ReaderBuilder;
use log::debug;
use snafu::prelude::*;

use club_voting::{Allocation, BallotDraft};

use crate::app::*;

/// Reads one ballot draft per row: the voter in the first field, then one
/// `ID:POINTS` pair per following field. Each draft is returned with its
/// line number so rejections can be reported precisely; validation itself
/// is up to the caller.
pub fn read_ballot_drafts(path: &str) -> AppResult<Vec<(usize, BallotDraft)>> {
    let rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu {
            path: path.to_string(),
        })?;
    drafts_from_reader(rdr)
}

fn drafts_from_reader<R: Read>(mut rdr: csv::Reader<R>) -> AppResult<Vec<(usize, BallotDraft)>> {
    let mut res: Vec<(usize, BallotDraft)> = Vec::new();
    for (idx, line_r) in rdr.records().enumerate() {
        let lineno = idx + 1;
        let line = line_r.context(CsvLineParseSnafu {})?;
        debug!("{:?} {:?}", lineno, line);
        let voter = line
            .get(0)
            .context(CsvLineTooShortSnafu { lineno })?
            .to_string();
        let mut allocations: Vec<Allocation> = Vec::new();
        for field in line.iter().skip(1) {
            // Spreadsheet exports often pad rows with empty cells.
            if field.trim().is_empty() {
                continue;
            }
            allocations.push(parse_allocation(field)?);
        }
        res.push((lineno, BallotDraft { voter, allocations }));
    }
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;
    use club_voting::BookId;

    fn reader(text: &str) -> csv::Reader<&[u8]> {
        ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes())
    }

    #[test]
    fn one_draft_per_row() {
        let drafts = drafts_from_reader(reader("Gab,0:60,1:40\nPhil,2:100\n")).unwrap();
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].0, 1);
        assert_eq!(drafts[0].1.voter, "Gab");
        assert_eq!(
            drafts[0].1.allocations,
            vec![
                Allocation {
                    book: BookId(0),
                    points: 60
                },
                Allocation {
                    book: BookId(1),
                    points: 40
                },
            ]
        );
        assert_eq!(drafts[1].0, 2);
        assert_eq!(drafts[1].1.allocations.len(), 1);
    }

    #[test]
    fn empty_padding_cells_are_skipped() {
        let drafts = drafts_from_reader(reader("Gab,0:100,,\n")).unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].1.allocations.len(), 1);
    }

    #[test]
    fn malformed_pairs_abort_the_file() {
        assert!(drafts_from_reader(reader("Gab,sixty\n")).is_err());
    }
}
