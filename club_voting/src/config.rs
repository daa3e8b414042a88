// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable identifier of a registered book.
///
/// Identifiers are assigned from a monotonic counter at submission time and
/// are never reused, even after the book is removed. Ballots refer to books
/// through this identifier, never through a position in a list.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct BookId(pub u32);

impl Display for BookId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Enrichment fields attached to a book. The engine carries them verbatim
/// and never looks inside: they play no role in validation or scoring.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genres: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

fn default_active() -> bool {
    true
}

/// One nominated book.
///
/// Removal is logical: the book keeps its identifier and stays in the
/// registry snapshot with `active` set to false, so the identifiers of the
/// remaining books are not invalidated.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub submitter: String,
    #[serde(default)]
    pub metadata: BookMetadata,
    pub submitted_at: DateTime<Utc>,
    #[serde(default = "default_active")]
    pub active: bool,
}

/// A (book, points) pair inside a ballot. Points are strictly positive: a
/// zero allocation is rejected at validation, not silently dropped.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Allocation {
    pub book: BookId,
    pub points: u32,
}

/// One voter's accepted ballot. Immutable once stored.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Ballot {
    pub voter: String,
    pub allocations: Vec<Allocation>,
    pub cast_at: DateTime<Utc>,
}

/// A candidate ballot as submitted by a voter, before validation.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct BallotDraft {
    pub voter: String,
    pub allocations: Vec<Allocation>,
}

// ******** Output data structures *********

/// Attribution of one voter's contribution to a book's total.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct VoterShare {
    pub voter: String,
    pub points: u32,
}

/// Aggregate score of one book: exact integer total plus the contributing
/// voters in ballot-processing order. Sorting the voter list for display is
/// a presentation concern, see [TallyEntry::voters_by_points].
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TallyEntry {
    pub book: BookId,
    pub total_points: u32,
    pub voters: Vec<VoterShare>,
}

impl TallyEntry {
    /// The voter list sorted by points, highest first. Voters with equal
    /// points keep their ballot-processing order.
    pub fn voters_by_points(&self) -> Vec<VoterShare> {
        let mut res = self.voters.clone();
        res.sort_by(|a, b| b.points.cmp(&a.points));
        res
    }
}

/// The ranked view over a tally.
///
/// `ranked` holds every book with a nonzero total, highest first. Books with
/// equal totals appear in registration order: the tie-break is the explicit
/// sort key, not an accident of the sorting algorithm. `unvoted` is the
/// complementary set of active books that received no points, in
/// registration order.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Ranking {
    pub ranked: Vec<(BookId, u32)>,
    pub unvoted: Vec<BookId>,
}

impl Ranking {
    /// The first `n` ranked entries. The `unvoted` partition is independent
    /// from this truncation.
    pub fn top(&self, n: usize) -> &[(BookId, u32)] {
        &self.ranked[..self.ranked.len().min(n)]
    }
}

/// The single-document shape used by bulk export and import.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ExportDocument {
    pub books: Vec<Book>,
    pub ballots: Vec<Ballot>,
    pub exported_at: DateTime<Utc>,
}

/// Errors raised by the registry, the validator, the store and the importer.
///
/// Every enumerated condition is recoverable by the caller; none of them is
/// fatal to the process.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum VotingError {
    /// A case-insensitive title+author match already exists among the
    /// active books.
    DuplicateBook { title: String, author: String },
    /// The submitter already has the maximum number of active books.
    QuotaExceeded { submitter: String, quota: u32 },
    /// The requester is neither the submitter of the book nor an
    /// administrator.
    PermissionDenied { requester: String },
    /// The voter identity is empty.
    EmptyVoter,
    /// The voter already has an accepted ballot. First accepted wins.
    AlreadyVoted { voter: String },
    /// An allocation references a book that is not currently registered.
    UnknownBook { book: BookId },
    /// An allocation references a book submitted by the voter.
    SelfVote { book: BookId },
    /// An allocation carries zero points.
    InvalidPoints { book: BookId },
    /// More distinct choices than the rules allow.
    TooManyChoices { given: usize, max: u32 },
    /// The same book appears more than once in one ballot.
    DuplicateChoice { book: BookId },
    /// The points do not add up to the exact budget.
    PointBudgetMismatch { allocated: u32, budget: u32 },
    /// A bulk import document could not be understood. The existing state
    /// is left untouched.
    ImportFormat { detail: String },
}

impl Error for VotingError {}

impl Display for VotingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VotingError::DuplicateBook { title, author } => {
                write!(f, "'{}' by {} has already been submitted", title, author)
            }
            VotingError::QuotaExceeded { submitter, quota } => {
                write!(f, "{} already has {} active submissions", submitter, quota)
            }
            VotingError::PermissionDenied { requester } => {
                write!(f, "{} may not perform this operation", requester)
            }
            VotingError::EmptyVoter => write!(f, "the voter name is empty"),
            VotingError::AlreadyVoted { voter } => {
                write!(f, "{} has already voted", voter)
            }
            VotingError::UnknownBook { book } => {
                write!(f, "book {} is not registered", book)
            }
            VotingError::SelfVote { book } => {
                write!(f, "book {} is the voter's own submission", book)
            }
            VotingError::InvalidPoints { book } => {
                write!(f, "book {} was allocated zero points", book)
            }
            VotingError::TooManyChoices { given, max } => {
                write!(f, "{} choices given, at most {} allowed", given, max)
            }
            VotingError::DuplicateChoice { book } => {
                write!(f, "book {} appears more than once in the ballot", book)
            }
            VotingError::PointBudgetMismatch { allocated, budget } => {
                write!(f, "points add up to {} instead of {}", allocated, budget)
            }
            VotingError::ImportFormat { detail } => {
                write!(f, "import document rejected: {}", detail)
            }
        }
    }
}

// ********* Rules **********

/// The policy constraints applied to submissions and ballots.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct VoteRules {
    /// The fixed point budget every ballot must allocate exactly.
    pub total_points: u32,
    /// Maximum number of distinct books one ballot may allocate points to.
    pub max_choices: u32,
    /// Maximum number of simultaneously active books per submitter.
    pub submission_quota: u32,
}

impl VoteRules {
    pub const DEFAULT_RULES: VoteRules = VoteRules {
        total_points: 100,
        max_choices: 5,
        submission_quota: 5,
    };
}
