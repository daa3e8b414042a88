use clap::{Parser, Subcommand};

/// This is a point-voting tabulation program for small book clubs.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The club configuration file in JSON format:
    /// members, administrators, voting rules and display options. Without it,
    /// the built-in defaults apply and there are no administrators.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (directory, optional) Where books.json and votes.json are kept.
    /// Overrides the dataDir entry of the configuration file.
    #[clap(short, long, value_parser)]
    pub data_dir: Option<String>,

    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Nominate a book.
    Submit {
        #[clap(long, value_parser)]
        title: String,
        #[clap(long, value_parser)]
        author: String,
        /// The member making the nomination.
        #[clap(long = "as", value_parser)]
        member: String,
        /// (optional) A short summary shown in listings.
        #[clap(long, value_parser)]
        summary: Option<String>,
        /// (optional) Comma-separated genre tags.
        #[clap(long, value_parser)]
        genres: Option<String>,
        /// (optional) Page count.
        #[clap(long, value_parser)]
        pages: Option<u32>,
        /// (optional) A cover image reference.
        #[clap(long, value_parser)]
        image_url: Option<String>,
    },

    /// Withdraw a nomination. Only the submitter or an administrator may.
    Remove {
        /// The book identifier, as shown by the books listing.
        #[clap(long, value_parser)]
        book: u32,
        #[clap(long = "as", value_parser)]
        member: String,
    },

    /// List the active nominations.
    Books {
        /// (optional) Only the books nominated by this member.
        #[clap(long, value_parser)]
        submitter: Option<String>,
    },

    /// Cast a ballot. Each choice is an ID:POINTS pair; the points must add
    /// up to the budget exactly.
    Vote {
        #[clap(long = "as", value_parser)]
        voter: String,
        #[clap(value_parser, required = true)]
        choices: Vec<String>,
    },

    /// Show the current ranking with per-book voter attribution.
    Results,

    /// Cast ballots in bulk from a CSV file (one `voter,ID:POINTS,...` row
    /// per ballot). Rejected rows are reported and skipped.
    ImportVotes {
        #[clap(long, value_parser)]
        file: String,
    },

    /// Write the full data set (books, ballots, timestamp) as one JSON
    /// document.
    Export {
        /// (file path or empty) Where to write the document. Standard output
        /// if not specified.
        #[clap(short, long, value_parser)]
        out: Option<String>,
    },

    /// Replace the full data set from an export document. Administrators
    /// only; a malformed document changes nothing.
    Import {
        #[clap(long, value_parser)]
        file: String,
        #[clap(long = "as", value_parser)]
        member: String,
    },

    /// Remove every ballot (season rollover). Administrators only.
    Clear {
        #[clap(long = "as", value_parser)]
        member: String,
    },

    /// Compare the current data set against a reference export document and
    /// print a diff on mismatch.
    Check {
        #[clap(long, value_parser)]
        reference: String,
    },
}
