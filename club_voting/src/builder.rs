pub use crate::config::*;
use crate::App;

/// A builder for assembling a voting session in memory.
///
/// Convenient for tests and for programs that already hold the nominations
/// and ballots in some other form.
///
/// ```
/// pub use club_voting::builder::Builder;
/// pub use club_voting::VoteRules;
/// # use club_voting::VotingError;
///
/// let mut builder = Builder::new(&VoteRules::DEFAULT_RULES);
/// let dune = builder.add_book("Dune", "Frank Herbert", "Gab")?;
/// let hobbit = builder.add_book("The Hobbit", "J. R. R. Tolkien", "Kathy")?;
/// builder.add_ballot("Phil", &[(dune, 60), (hobbit, 40)])?;
///
/// let app = builder.build();
/// assert_eq!(app.ranking().ranked[0], (dune, 60));
///
/// # Ok::<(), VotingError>(())
/// ```
pub struct Builder {
    app: App,
}

impl Builder {
    pub fn new(rules: &VoteRules) -> Builder {
        Builder {
            app: App::new(*rules),
        }
    }

    /// Registers a nomination and returns its identifier. Quota and
    /// duplicate rules apply exactly as on a live registry.
    pub fn add_book(
        &mut self,
        title: &str,
        author: &str,
        submitter: &str,
    ) -> Result<BookId, VotingError> {
        self.app
            .submit_book(title, author, submitter, BookMetadata::default())
    }

    /// Casts a ballot through the full validation chain.
    pub fn add_ballot(
        &mut self,
        voter: &str,
        allocations: &[(BookId, u32)],
    ) -> Result<(), VotingError> {
        let draft = BallotDraft {
            voter: voter.to_string(),
            allocations: allocations
                .iter()
                .map(|&(book, points)| Allocation { book, points })
                .collect(),
        };
        self.app.cast_ballot(&draft)
    }

    pub fn build(self) -> App {
        self.app
    }
}
