use log::{debug, info, warn};

use club_voting::*;
use snafu::{prelude::*, Snafu};

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use text_diff::print_diff;

use crate::app::config_reader::*;
use crate::args::{Args, Command};

pub mod config_reader;
pub mod io_csv;

#[derive(Debug, Snafu)]
pub enum AppError {
    #[snafu(display("Error reading data file {path}"))]
    ReadingData {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing data file {path}"))]
    ParsingData {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error writing data file {path}"))]
    WritingData {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error serializing data"))]
    SerializingData { source: serde_json::Error },
    #[snafu(display("Error opening config file {path}"))]
    OpeningConfig {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing config file {path}"))]
    ParsingConfig {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error opening ballot file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading a row in the ballot file"))]
    CsvLineParse { source: csv::Error },
    #[snafu(display("Line {lineno} is too short"))]
    CsvLineTooShort { lineno: usize },
    #[snafu(display("{source}"))]
    Voting { source: VotingError },
    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type AppResult<T> = Result<T, AppError>;

/// One interactive session: the engine state plus where it was loaded from.
pub struct Session {
    pub config: ClubConfig,
    pub data_dir: PathBuf,
    pub app: App,
}

fn load_records<T: serde::de::DeserializeOwned>(path: &Path) -> AppResult<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let p = path.display().to_string();
    let text = fs::read_to_string(path).context(ReadingDataSnafu { path: p.clone() })?;
    serde_json::from_str(&text).context(ParsingDataSnafu { path: p })
}

/// Loads the configuration and both data sequences. Missing data files mean
/// an empty session, not an error.
pub fn load_session(args: &Args) -> AppResult<Session> {
    let config = ClubConfig::load(args.config.as_deref())?;
    let data_dir = PathBuf::from(
        args.data_dir
            .clone()
            .unwrap_or_else(|| config.data_dir().to_string()),
    );
    let books: Vec<Book> = load_records(&data_dir.join("books.json"))?;
    let ballots: Vec<Ballot> = load_records(&data_dir.join("votes.json"))?;
    info!(
        "loaded {} books and {} ballots from {}",
        books.len(),
        ballots.len(),
        data_dir.display()
    );
    Ok(Session {
        app: App::from_parts(config.vote_rules(), books, ballots),
        config,
        data_dir,
    })
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> AppResult<()> {
    let text = serde_json::to_string_pretty(value).context(SerializingDataSnafu {})?;
    fs::write(path, text).context(WritingDataSnafu {
        path: path.display().to_string(),
    })
}

fn write_data_files(session: &Session) -> AppResult<()> {
    fs::create_dir_all(&session.data_dir).context(WritingDataSnafu {
        path: session.data_dir.display().to_string(),
    })?;
    write_json(
        &session.data_dir.join("books.json"),
        &session.app.registry().snapshot(),
    )?;
    write_json(&session.data_dir.join("votes.json"), &session.app.store().all())?;
    debug!("data files written to {}", session.data_dir.display());
    Ok(())
}

/// Mirrors the in-memory state to the data files.
///
/// The in-memory mutation is authoritative: a failed write is reported but
/// never undoes it, and the command still counts as accepted.
pub fn save_session(session: &Session) {
    if let Err(e) = write_data_files(session) {
        warn!("could not save the data files: {}", e);
        eprintln!(
            "warning: the change was applied but could not be saved: {}",
            e
        );
    }
}

/// Parses one `ID:POINTS` pair.
pub fn parse_allocation(s: &str) -> AppResult<Allocation> {
    let (book, points) = match s.split_once(':') {
        Some(p) => p,
        None => whatever!("choice '{}' is not an ID:POINTS pair", s),
    };
    let book = match book.trim().parse::<u32>() {
        Ok(x) => x,
        Err(_) => whatever!("choice '{}' has an invalid book id", s),
    };
    let points = match points.trim().parse::<u32>() {
        Ok(x) => x,
        Err(_) => whatever!("choice '{}' has an invalid point count", s),
    };
    Ok(Allocation {
        book: BookId(book),
        points,
    })
}

fn parse_allocations(choices: &[String]) -> AppResult<Vec<Allocation>> {
    let mut res = Vec::new();
    for c in choices {
        res.push(parse_allocation(c)?);
    }
    Ok(res)
}

fn print_books(session: &Session, submitter: Option<&str>) {
    let books = session.app.registry().list(submitter);
    if books.is_empty() {
        println!("No books submitted yet.");
        return;
    }
    println!("{} active books:", books.len());
    for b in books {
        println!(
            "  {} '{}' by {} (submitted by {})",
            b.id, b.title, b.author, b.submitter
        );
        if let Some(pages) = b.metadata.pages {
            println!("      {} pages", pages);
        }
        if let Some(genres) = &b.metadata.genres {
            println!("      genres: {}", genres);
        }
        if let Some(summary) = &b.metadata.summary {
            println!("      {}", summary);
        }
    }
}

fn print_results(session: &Session) {
    let app = &session.app;
    println!("{}", session.config.club_name());
    println!(
        "Books: {}   Ballots cast: {}",
        app.registry().active_count(),
        app.store().len()
    );
    if app.store().is_empty() {
        println!("No votes have been cast yet.");
        return;
    }
    let tally = app.tally();
    let ranking = rank(&tally);
    let by_id: HashMap<BookId, &TallyEntry> = tally.iter().map(|e| (e.book, e)).collect();
    let top_n = session.config.top_books();

    println!();
    println!("Top {} books:", top_n.min(ranking.ranked.len()));
    for (pos, (id, total)) in ranking.top(top_n).iter().enumerate() {
        if let Some(book) = app.registry().book(*id) {
            println!(
                "  {:>2}. '{}' by {} - {} points",
                pos + 1,
                book.title,
                book.author,
                total
            );
            if let Some(entry) = by_id.get(id) {
                for share in entry.voters_by_points() {
                    println!("        {}: {} points", share.voter, share.points);
                }
            }
        }
    }

    if ranking.ranked.len() > top_n {
        println!();
        println!("Complete ranking:");
        for (pos, (id, total)) in ranking.ranked.iter().enumerate() {
            if let Some(book) = app.registry().book(*id) {
                println!(
                    "  {:>2}. '{}' by {} - {} points",
                    pos + 1,
                    book.title,
                    book.author,
                    total
                );
            }
        }
    }

    if !ranking.unvoted.is_empty() {
        println!();
        println!("Received no votes:");
        for id in &ranking.unvoted {
            if let Some(book) = app.registry().book(*id) {
                println!("  {} '{}' by {}", id, book.title, book.author);
            }
        }
    }
}

/// The books and ballots of a document as normalized JSON text. The export
/// timestamps differ by nature between two exports of the same data, so
/// they stay out of the comparison.
fn comparable_json(doc: &ExportDocument) -> AppResult<String> {
    let js = json!({"books": doc.books, "ballots": doc.ballots});
    serde_json::to_string_pretty(&js).context(SerializingDataSnafu {})
}

fn check_reference(session: &Session, reference: &str) -> AppResult<()> {
    let text = fs::read_to_string(reference).context(ReadingDataSnafu {
        path: reference.to_string(),
    })?;
    let reference_doc: ExportDocument = serde_json::from_str(&text).context(ParsingDataSnafu {
        path: reference.to_string(),
    })?;
    let current_js = comparable_json(&session.app.export_document())?;
    let reference_js = comparable_json(&reference_doc)?;
    if current_js != reference_js {
        warn!("Found differences with the reference document");
        print_diff(reference_js.as_str(), current_js.as_str(), "\n");
        whatever!("Difference detected between the current data and the reference document");
    }
    println!("The current data matches the reference document.");
    Ok(())
}

pub fn run(args: &Args) -> AppResult<()> {
    let mut session = load_session(args)?;

    match &args.command {
        Command::Submit {
            title,
            author,
            member,
            summary,
            genres,
            pages,
            image_url,
        } => {
            if title.trim().is_empty() || author.trim().is_empty() {
                whatever!("the title and the author are both required");
            }
            let metadata = BookMetadata {
                summary: summary.clone(),
                genres: genres.clone(),
                pages: *pages,
                image_url: image_url.clone(),
            };
            let id = session
                .app
                .submit_book(title.trim(), author.trim(), member.trim(), metadata)
                .context(VotingSnafu)?;
            println!("Added {} '{}' by {}", id, title.trim(), author.trim());
            save_session(&session);
            Ok(())
        }
        Command::Remove { book, member } => {
            let id = BookId(*book);
            let is_admin = session.config.is_admin(member);
            session
                .app
                .remove_book(id, member, is_admin)
                .context(VotingSnafu)?;
            println!("Removed book {}", id);
            save_session(&session);
            Ok(())
        }
        Command::Books { submitter } => {
            print_books(&session, submitter.as_deref());
            Ok(())
        }
        Command::Vote { voter, choices } => {
            let draft = BallotDraft {
                voter: voter.clone(),
                allocations: parse_allocations(choices)?,
            };
            session.app.cast_ballot(&draft).context(VotingSnafu)?;
            println!("Ballot from {} recorded.", voter.trim());
            save_session(&session);
            Ok(())
        }
        Command::Results => {
            print_results(&session);
            Ok(())
        }
        Command::ImportVotes { file } => {
            let drafts = io_csv::read_ballot_drafts(file)?;
            let mut accepted = 0;
            for (lineno, draft) in drafts {
                match session.app.cast_ballot(&draft) {
                    Ok(()) => accepted += 1,
                    Err(e) => {
                        eprintln!("line {}: ballot from {} rejected: {}", lineno, draft.voter, e)
                    }
                }
            }
            println!("Accepted {} ballots.", accepted);
            if accepted > 0 {
                save_session(&session);
            }
            Ok(())
        }
        Command::Export { out } => {
            let doc = session.app.export_document();
            let text = serde_json::to_string_pretty(&doc).context(SerializingDataSnafu {})?;
            match out {
                Some(path) => {
                    fs::write(path, text).context(WritingDataSnafu { path: path.clone() })?;
                    println!("Exported to {}", path);
                }
                None => println!("{}", text),
            }
            Ok(())
        }
        Command::Import { file, member } => {
            if !session.config.is_admin(member) {
                return Err(VotingError::PermissionDenied {
                    requester: member.clone(),
                })
                .context(VotingSnafu);
            }
            let text = fs::read_to_string(file).context(ReadingDataSnafu { path: file.clone() })?;
            session.app.import_json(&text).context(VotingSnafu)?;
            println!(
                "Imported {} books and {} ballots.",
                session.app.registry().snapshot().len(),
                session.app.store().len()
            );
            save_session(&session);
            Ok(())
        }
        Command::Clear { member } => {
            let is_admin = session.config.is_admin(member);
            session
                .app
                .clear_ballots(member, is_admin)
                .context(VotingSnafu)?;
            println!("All ballots cleared.");
            save_session(&session);
            Ok(())
        }
        Command::Check { reference } => check_reference(&session, reference),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn allocation_pairs_parse() {
        assert_eq!(
            parse_allocation("3:40").unwrap(),
            Allocation {
                book: BookId(3),
                points: 40
            }
        );
        assert_eq!(
            parse_allocation(" 0 : 100 ").unwrap(),
            Allocation {
                book: BookId(0),
                points: 100
            }
        );
        assert!(parse_allocation("3").is_err());
        assert!(parse_allocation("a:40").is_err());
        assert!(parse_allocation("3:-1").is_err());
        assert!(parse_allocation("3:forty").is_err());
    }

    #[test]
    fn reference_comparison_ignores_the_export_timestamp() {
        let mut app = App::new(VoteRules::DEFAULT_RULES);
        app.submit_book("Dune", "Frank Herbert", "Gab", BookMetadata::default())
            .unwrap();
        let mut first = app.export_document();
        let mut second = app.export_document();
        first.exported_at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        second.exported_at = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(
            comparable_json(&first).unwrap(),
            comparable_json(&second).unwrap()
        );
    }
}
