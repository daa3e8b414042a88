mod config;
pub mod builder;
pub mod manual;

use log::{debug, info};

use std::collections::{HashMap, HashSet};

use chrono::Utc;

pub use crate::config::*;

/// Identity comparison used everywhere one member name is matched against
/// another: the self-vote ban, duplicate-vote detection, quotas and removal
/// permissions. Identities are plain names compared case-insensitively.
/// Every check goes through this single function, so replacing the name
/// matching with a real identity system is a one-point change.
pub fn identity_eq(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

// **** Book registry ****

/// The collection of nominated books.
///
/// Owns the id counter. Removal never shifts or renumbers the surviving
/// entries; removed books stay in the snapshot with `active` unset and are
/// filtered out of every read path.
#[derive(Debug, Clone, Default)]
pub struct BookRegistry {
    books: Vec<Book>,
    next_id: u32,
}

impl BookRegistry {
    pub fn new() -> BookRegistry {
        BookRegistry::default()
    }

    /// Rebuilds a registry from a persisted snapshot. The id counter
    /// restarts above the highest identifier ever assigned, so ids of
    /// removed books are not handed out again.
    pub fn from_books(books: Vec<Book>) -> BookRegistry {
        let next_id = books.iter().map(|b| b.id.0 + 1).max().unwrap_or(0);
        BookRegistry { books, next_id }
    }

    /// Registers a nomination.
    ///
    /// Duplicate detection is a case-insensitive exact match on title and
    /// author jointly, over the active books only. The per-submitter quota
    /// counts active books only, so removing a book frees a slot.
    pub fn submit(
        &mut self,
        title: &str,
        author: &str,
        submitter: &str,
        metadata: BookMetadata,
        rules: &VoteRules,
    ) -> Result<BookId, VotingError> {
        let title_key = title.to_lowercase();
        let author_key = author.to_lowercase();
        let duplicate = self.books.iter().any(|b| {
            b.active && b.title.to_lowercase() == title_key && b.author.to_lowercase() == author_key
        });
        if duplicate {
            return Err(VotingError::DuplicateBook {
                title: title.to_string(),
                author: author.to_string(),
            });
        }
        let active_count = self
            .books
            .iter()
            .filter(|b| b.active && identity_eq(&b.submitter, submitter))
            .count();
        if active_count >= rules.submission_quota as usize {
            return Err(VotingError::QuotaExceeded {
                submitter: submitter.to_string(),
                quota: rules.submission_quota,
            });
        }
        let id = BookId(self.next_id);
        self.next_id += 1;
        self.books.push(Book {
            id,
            title: title.to_string(),
            author: author.to_string(),
            submitter: submitter.to_string(),
            metadata,
            submitted_at: Utc::now(),
            active: true,
        });
        info!("registered book {}: '{}' by {}", id, title, author);
        Ok(id)
    }

    /// Marks a book as removed. Only the submitter or an administrator may
    /// do so. Stored ballots keep their allocations to this id; they are
    /// excluded at aggregation time instead.
    pub fn remove(
        &mut self,
        id: BookId,
        requester: &str,
        is_admin: bool,
    ) -> Result<(), VotingError> {
        let book = self
            .books
            .iter_mut()
            .find(|b| b.active && b.id == id)
            .ok_or(VotingError::UnknownBook { book: id })?;
        if !is_admin && !identity_eq(&book.submitter, requester) {
            return Err(VotingError::PermissionDenied {
                requester: requester.to_string(),
            });
        }
        book.active = false;
        info!("removed book {} ('{}')", id, book.title);
        Ok(())
    }

    /// Active books in registration order, optionally filtered by submitter.
    pub fn list(&self, submitter: Option<&str>) -> Vec<&Book> {
        self.books
            .iter()
            .filter(|b| b.active)
            .filter(|b| match submitter {
                Some(s) => identity_eq(&b.submitter, s),
                None => true,
            })
            .collect()
    }

    /// Looks up an active book by id.
    pub fn book(&self, id: BookId) -> Option<&Book> {
        self.books.iter().find(|b| b.active && b.id == id)
    }

    pub fn active_count(&self) -> usize {
        self.books.iter().filter(|b| b.active).count()
    }

    /// The full snapshot including removed books, as persisted.
    pub fn snapshot(&self) -> &[Book] {
        &self.books
    }
}

// **** Vote store ****

/// Append-only collection of accepted ballots.
#[derive(Debug, Clone, Default)]
pub struct VoteStore {
    ballots: Vec<Ballot>,
}

impl VoteStore {
    pub fn new() -> VoteStore {
        VoteStore::default()
    }

    pub fn from_ballots(ballots: Vec<Ballot>) -> VoteStore {
        VoteStore { ballots }
    }

    pub fn has_voted(&self, voter: &str) -> bool {
        self.ballots.iter().any(|b| identity_eq(&b.voter, voter))
    }

    /// Stores an accepted ballot.
    ///
    /// The already-voted invariant is asserted again here, under the same
    /// exclusive borrow as the insert, so a ballot validated against a stale
    /// snapshot cannot slip in as a second vote for the same person.
    pub fn append(&mut self, ballot: ValidBallot) -> Result<(), VotingError> {
        let ballot = ballot.into_ballot();
        if self.has_voted(&ballot.voter) {
            return Err(VotingError::AlreadyVoted { voter: ballot.voter });
        }
        debug!("storing ballot from {}", ballot.voter);
        self.ballots.push(ballot);
        Ok(())
    }

    pub fn all(&self) -> &[Ballot] {
        &self.ballots
    }

    pub fn len(&self) -> usize {
        self.ballots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ballots.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.ballots.clear();
    }
}

// **** Ballot validation ****

/// A ballot that passed every rule in [validate_ballot]. Constructing one
/// outside the validator is not possible, and the wrapped ballot can no
/// longer be altered before storage.
#[derive(Debug, Clone)]
pub struct ValidBallot {
    ballot: Ballot,
}

impl ValidBallot {
    pub fn ballot(&self) -> &Ballot {
        &self.ballot
    }

    pub fn into_ballot(self) -> Ballot {
        self.ballot
    }
}

/// Checks a candidate ballot against snapshots of the registry and the
/// store. Pure function, no side effects.
///
/// The rules run in a fixed order and the first violation wins, so the
/// caller always gets one specific error to render:
/// 1. non-empty voter, 2. not already voted, 3. every choice resolves to an
/// active book, 4. no self-vote, 5. strictly positive points, 6. choice
/// count within bounds, 7. pairwise distinct choices, 8. points add up to
/// the budget exactly.
pub fn validate_ballot(
    draft: &BallotDraft,
    registry: &BookRegistry,
    store: &VoteStore,
    rules: &VoteRules,
) -> Result<ValidBallot, VotingError> {
    let voter = draft.voter.trim();
    if voter.is_empty() {
        return Err(VotingError::EmptyVoter);
    }
    if store.has_voted(voter) {
        return Err(VotingError::AlreadyVoted {
            voter: voter.to_string(),
        });
    }
    for a in &draft.allocations {
        if registry.book(a.book).is_none() {
            return Err(VotingError::UnknownBook { book: a.book });
        }
    }
    for a in &draft.allocations {
        if let Some(book) = registry.book(a.book) {
            if identity_eq(&book.submitter, voter) {
                return Err(VotingError::SelfVote { book: a.book });
            }
        }
    }
    for a in &draft.allocations {
        if a.points == 0 {
            return Err(VotingError::InvalidPoints { book: a.book });
        }
    }
    if draft.allocations.len() > rules.max_choices as usize {
        return Err(VotingError::TooManyChoices {
            given: draft.allocations.len(),
            max: rules.max_choices,
        });
    }
    let mut seen: HashSet<BookId> = HashSet::new();
    for a in &draft.allocations {
        if !seen.insert(a.book) {
            return Err(VotingError::DuplicateChoice { book: a.book });
        }
    }
    let allocated: u32 = draft.allocations.iter().map(|a| a.points).sum();
    if allocated != rules.total_points {
        return Err(VotingError::PointBudgetMismatch {
            allocated,
            budget: rules.total_points,
        });
    }
    debug!("accepted ballot from {}", voter);
    Ok(ValidBallot {
        ballot: Ballot {
            voter: voter.to_string(),
            allocations: draft.allocations.clone(),
            cast_at: Utc::now(),
        },
    })
}

// **** Aggregation and ranking ****

/// Reduces the ballot collection into per-book totals with voter
/// attribution.
///
/// Every active book gets an entry, zero-voted ones included, in
/// registration order. Totals are exact integer sums. The voter list keeps
/// ballot-processing order. Allocations pointing at a removed book are
/// dropped: a removed book's historical votes neither count nor appear.
pub fn tally_votes(registry: &BookRegistry, ballots: &[Ballot]) -> Vec<TallyEntry> {
    let mut entries: Vec<TallyEntry> = registry
        .list(None)
        .iter()
        .map(|b| TallyEntry {
            book: b.id,
            total_points: 0,
            voters: Vec::new(),
        })
        .collect();
    let index: HashMap<BookId, usize> = entries
        .iter()
        .enumerate()
        .map(|(i, e)| (e.book, i))
        .collect();
    for ballot in ballots {
        for a in &ballot.allocations {
            match index.get(&a.book) {
                Some(&i) => {
                    entries[i].total_points += a.points;
                    entries[i].voters.push(VoterShare {
                        voter: ballot.voter.clone(),
                        points: a.points,
                    });
                }
                None => {
                    debug!(
                        "dropping allocation to removed book {} from {}",
                        a.book, ballot.voter
                    );
                }
            }
        }
    }
    debug!(
        "tallied {} ballots over {} active books",
        ballots.len(),
        entries.len()
    );
    entries
}

/// Orders a tally by total points, highest first, and partitions off the
/// books that received no votes.
///
/// Tie-break: among equal totals, the earlier-registered book ranks first.
/// The registration position is part of the sort key, so the outcome does
/// not depend on the stability of the underlying sort.
pub fn rank(tally: &[TallyEntry]) -> Ranking {
    let mut with_pos: Vec<(usize, BookId, u32)> = tally
        .iter()
        .enumerate()
        .filter(|(_, e)| e.total_points > 0)
        .map(|(pos, e)| (pos, e.book, e.total_points))
        .collect();
    with_pos.sort_by_key(|&(pos, _, total)| (std::cmp::Reverse(total), pos));
    let ranked = with_pos.iter().map(|&(_, id, total)| (id, total)).collect();
    let unvoted = tally
        .iter()
        .filter(|e| e.total_points == 0)
        .map(|e| e.book)
        .collect();
    Ranking { ranked, unvoted }
}

// **** Application state ****

/// One registry and one store behind a single handle, with the rules that
/// govern them.
///
/// All mutations take `&mut self`, which makes each of them a critical
/// section on its own: validation and commit of a ballot happen under the
/// same exclusive borrow. A caller serving several simultaneous users wraps
/// the whole `App` in one mutex scoped to the registry+store pair.
#[derive(Debug, Clone)]
pub struct App {
    registry: BookRegistry,
    store: VoteStore,
    rules: VoteRules,
}

impl App {
    pub fn new(rules: VoteRules) -> App {
        App {
            registry: BookRegistry::new(),
            store: VoteStore::new(),
            rules,
        }
    }

    /// Restores a session from persisted sequences.
    pub fn from_parts(rules: VoteRules, books: Vec<Book>, ballots: Vec<Ballot>) -> App {
        App {
            registry: BookRegistry::from_books(books),
            store: VoteStore::from_ballots(ballots),
            rules,
        }
    }

    pub fn registry(&self) -> &BookRegistry {
        &self.registry
    }

    pub fn store(&self) -> &VoteStore {
        &self.store
    }

    pub fn rules(&self) -> &VoteRules {
        &self.rules
    }

    pub fn submit_book(
        &mut self,
        title: &str,
        author: &str,
        submitter: &str,
        metadata: BookMetadata,
    ) -> Result<BookId, VotingError> {
        self.registry
            .submit(title, author, submitter, metadata, &self.rules)
    }

    pub fn remove_book(
        &mut self,
        id: BookId,
        requester: &str,
        is_admin: bool,
    ) -> Result<(), VotingError> {
        self.registry.remove(id, requester, is_admin)
    }

    /// Validates the draft and stores the resulting ballot in one step.
    pub fn cast_ballot(&mut self, draft: &BallotDraft) -> Result<(), VotingError> {
        let valid = validate_ballot(draft, &self.registry, &self.store, &self.rules)?;
        self.store.append(valid)
    }

    /// Removes all ballots. Administrator capability required; there is no
    /// way to remove a single ballot.
    pub fn clear_ballots(&mut self, requester: &str, is_admin: bool) -> Result<(), VotingError> {
        if !is_admin {
            return Err(VotingError::PermissionDenied {
                requester: requester.to_string(),
            });
        }
        info!("clearing all {} ballots", self.store.len());
        self.store.clear();
        Ok(())
    }

    /// Recomputes the aggregate scores from the full ballot collection.
    pub fn tally(&self) -> Vec<TallyEntry> {
        tally_votes(&self.registry, self.store.all())
    }

    pub fn ranking(&self) -> Ranking {
        rank(&self.tally())
    }

    pub fn export_document(&self) -> ExportDocument {
        ExportDocument {
            books: self.registry.snapshot().to_vec(),
            ballots: self.store.all().to_vec(),
            exported_at: Utc::now(),
        }
    }

    /// Replaces both sequences from an export document. All-or-nothing: the
    /// document is checked in full before any state changes, and a rejected
    /// document leaves the existing state untouched.
    pub fn import_document(&mut self, doc: ExportDocument) -> Result<(), VotingError> {
        let mut seen_ids: HashSet<BookId> = HashSet::new();
        for b in &doc.books {
            if !seen_ids.insert(b.id) {
                return Err(VotingError::ImportFormat {
                    detail: format!("book id {} appears twice", b.id),
                });
            }
        }
        let mut seen_voters: Vec<&str> = Vec::new();
        for ballot in &doc.ballots {
            if seen_voters.iter().any(|v| identity_eq(v, &ballot.voter)) {
                return Err(VotingError::ImportFormat {
                    detail: format!("more than one ballot for voter {}", ballot.voter),
                });
            }
            seen_voters.push(&ballot.voter);
        }
        info!(
            "importing {} books and {} ballots",
            doc.books.len(),
            doc.ballots.len()
        );
        self.registry = BookRegistry::from_books(doc.books);
        self.store = VoteStore::from_ballots(doc.ballots);
        Ok(())
    }

    /// Parses and imports an export document from its JSON text. A document
    /// that does not parse is rejected without touching the state.
    pub fn import_json(&mut self, json: &str) -> Result<(), VotingError> {
        let doc: ExportDocument =
            serde_json::from_str(json).map_err(|e| VotingError::ImportFormat {
                detail: e.to_string(),
            })?;
        self.import_document(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> App {
        App::new(VoteRules::DEFAULT_RULES)
    }

    fn add_book(app: &mut App, title: &str, submitter: &str) -> BookId {
        app.submit_book(title, "Author", submitter, BookMetadata::default())
            .unwrap()
    }

    fn draft(voter: &str, allocations: &[(u32, u32)]) -> BallotDraft {
        BallotDraft {
            voter: voter.to_string(),
            allocations: allocations
                .iter()
                .map(|&(id, points)| Allocation {
                    book: BookId(id),
                    points,
                })
                .collect(),
        }
    }

    fn ballot(voter: &str, allocations: &[(u32, u32)]) -> Ballot {
        Ballot {
            voter: voter.to_string(),
            allocations: allocations
                .iter()
                .map(|&(id, points)| Allocation {
                    book: BookId(id),
                    points,
                })
                .collect(),
            cast_at: Utc::now(),
        }
    }

    #[test]
    fn sixth_submission_hits_the_quota() {
        let mut app = app();
        for i in 0..5 {
            add_book(&mut app, &format!("Book {}", i), "Gab");
        }
        let err = app
            .submit_book("Book 5", "Author", "Gab", BookMetadata::default())
            .unwrap_err();
        assert_eq!(
            err,
            VotingError::QuotaExceeded {
                submitter: "Gab".to_string(),
                quota: 5
            }
        );
        // The quota counts active books only: removing one frees a slot.
        app.remove_book(BookId(0), "Gab", false).unwrap();
        add_book(&mut app, "Book 5", "Gab");
    }

    #[test]
    fn duplicate_detection_is_case_insensitive_on_title_and_author() {
        let mut app = app();
        app.submit_book("Dune", "Frank Herbert", "A", BookMetadata::default())
            .unwrap();
        let err = app
            .submit_book("dune", "FRANK HERBERT", "B", BookMetadata::default())
            .unwrap_err();
        assert!(matches!(err, VotingError::DuplicateBook { .. }));
        // Same title under a different author is a different book.
        app.submit_book("Dune", "Someone Else", "B", BookMetadata::default())
            .unwrap();
    }

    #[test]
    fn removing_a_book_clears_the_duplicate_slot() {
        let mut app = app();
        let id = add_book(&mut app, "Dune", "Gab");
        app.remove_book(id, "Gab", false).unwrap();
        // The same nomination can come back once the original is gone.
        add_book(&mut app, "Dune", "Kathy");
    }

    #[test]
    fn point_budget_must_match_exactly() {
        let mut app = app();
        add_book(&mut app, "A", "Gab");
        add_book(&mut app, "B", "Kathy");
        let err = app
            .cast_ballot(&draft("Phil", &[(0, 60), (1, 39)]))
            .unwrap_err();
        assert_eq!(
            err,
            VotingError::PointBudgetMismatch {
                allocated: 99,
                budget: 100
            }
        );
        let err = app
            .cast_ballot(&draft("Phil", &[(0, 60), (1, 41)]))
            .unwrap_err();
        assert_eq!(
            err,
            VotingError::PointBudgetMismatch {
                allocated: 101,
                budget: 100
            }
        );
        app.cast_ballot(&draft("Phil", &[(0, 60), (1, 40)])).unwrap();
    }

    #[test]
    fn self_vote_is_rejected_in_any_case() {
        let mut app = app();
        add_book(&mut app, "X", "Val");
        add_book(&mut app, "Y", "Gab");
        let err = app
            .cast_ballot(&draft("val", &[(0, 60), (1, 40)]))
            .unwrap_err();
        assert_eq!(err, VotingError::SelfVote { book: BookId(0) });
        // The same ballot without the self-vote goes through.
        app.cast_ballot(&draft("val", &[(1, 100)])).unwrap();
    }

    #[test]
    fn one_ballot_per_voter_first_accepted_wins() {
        let mut app = app();
        add_book(&mut app, "A", "Gab");
        add_book(&mut app, "B", "Silvia");
        app.cast_ballot(&draft("Kathy", &[(0, 100)])).unwrap();
        let err = app.cast_ballot(&draft("Kathy", &[(1, 100)])).unwrap_err();
        assert_eq!(
            err,
            VotingError::AlreadyVoted {
                voter: "Kathy".to_string()
            }
        );
        // Case-insensitive: a different spelling is still the same voter.
        let err = app.cast_ballot(&draft("kathy", &[(1, 100)])).unwrap_err();
        assert!(matches!(err, VotingError::AlreadyVoted { .. }));
        let kathy_ballots = app
            .store()
            .all()
            .iter()
            .filter(|b| identity_eq(&b.voter, "Kathy"))
            .count();
        assert_eq!(kathy_ballots, 1);
        assert_eq!(app.store().all()[0].allocations[0].book, BookId(0));
    }

    #[test]
    fn empty_voter_is_rejected_before_anything_else() {
        let app = app();
        let err = validate_ballot(
            &draft("   ", &[(99, 100)]),
            app.registry(),
            app.store(),
            app.rules(),
        )
        .unwrap_err();
        assert_eq!(err, VotingError::EmptyVoter);
    }

    #[test]
    fn unknown_and_malformed_allocations() {
        let mut app = app();
        add_book(&mut app, "A", "Gab");
        add_book(&mut app, "B", "Silvia");
        let err = app.cast_ballot(&draft("Phil", &[(7, 100)])).unwrap_err();
        assert_eq!(err, VotingError::UnknownBook { book: BookId(7) });
        let err = app
            .cast_ballot(&draft("Phil", &[(0, 0), (1, 100)]))
            .unwrap_err();
        assert_eq!(err, VotingError::InvalidPoints { book: BookId(0) });
        let err = app
            .cast_ballot(&draft("Phil", &[(0, 50), (0, 50)]))
            .unwrap_err();
        assert_eq!(err, VotingError::DuplicateChoice { book: BookId(0) });
    }

    #[test]
    fn more_choices_than_allowed() {
        let mut app = app();
        for i in 0..6 {
            app.submit_book(
                &format!("Book {}", i),
                "Author",
                &format!("submitter-{}", i),
                BookMetadata::default(),
            )
            .unwrap();
        }
        let err = app
            .cast_ballot(&draft(
                "Phil",
                &[(0, 17), (1, 17), (2, 17), (3, 17), (4, 16), (5, 16)],
            ))
            .unwrap_err();
        assert_eq!(err, VotingError::TooManyChoices { given: 6, max: 5 });
    }

    #[test]
    fn aggregation_totals_and_attribution() {
        let mut app = app();
        add_book(&mut app, "A", "Silvia");
        add_book(&mut app, "B", "Nonna");
        let ballots = vec![
            ballot("Gab", &[(0, 60), (1, 40)]),
            ballot("Phil", &[(0, 30)]),
        ];
        let tally = tally_votes(app.registry(), &ballots);
        assert_eq!(tally.len(), 2);
        assert_eq!(tally[0].book, BookId(0));
        assert_eq!(tally[0].total_points, 90);
        assert_eq!(
            tally[0].voters,
            vec![
                VoterShare {
                    voter: "Gab".to_string(),
                    points: 60
                },
                VoterShare {
                    voter: "Phil".to_string(),
                    points: 30
                },
            ]
        );
        assert_eq!(tally[1].book, BookId(1));
        assert_eq!(tally[1].total_points, 40);
        assert_eq!(
            tally[1].voters,
            vec![VoterShare {
                voter: "Gab".to_string(),
                points: 40
            }]
        );
    }

    #[test]
    fn removed_book_disappears_from_tally_and_ranking() {
        let mut app = app();
        add_book(&mut app, "A", "Silvia");
        add_book(&mut app, "B", "Nonna");
        let ballots = vec![
            ballot("Gab", &[(0, 60), (1, 40)]),
            ballot("Phil", &[(0, 30)]),
        ];
        app.remove_book(BookId(1), "Nonna", false).unwrap();
        let tally = tally_votes(app.registry(), &ballots);
        // No zero-filled entry and no error: B is simply absent.
        assert_eq!(tally.len(), 1);
        assert_eq!(tally[0].book, BookId(0));
        assert_eq!(tally[0].total_points, 90);
        let ranking = rank(&tally);
        assert_eq!(ranking.ranked, vec![(BookId(0), 90)]);
        assert!(ranking.unvoted.is_empty());
    }

    #[test]
    fn ties_rank_in_registration_order() {
        let mut app = app();
        add_book(&mut app, "X", "Silvia");
        add_book(&mut app, "Y", "Nonna");
        add_book(&mut app, "Z", "Gab");
        let ballots = vec![ballot("A", &[(0, 50), (2, 30)]), ballot("B", &[(1, 50)])];
        for _ in 0..3 {
            let ranking = rank(&tally_votes(app.registry(), &ballots));
            assert_eq!(
                ranking.ranked,
                vec![(BookId(0), 50), (BookId(1), 50), (BookId(2), 30)]
            );
        }
    }

    #[test]
    fn unvoted_books_are_partitioned_not_ranked() {
        let mut app = app();
        add_book(&mut app, "A", "Silvia");
        add_book(&mut app, "B", "Nonna");
        add_book(&mut app, "C", "Gab");
        app.cast_ballot(&draft("Phil", &[(1, 100)])).unwrap();
        let ranking = app.ranking();
        assert_eq!(ranking.ranked, vec![(BookId(1), 100)]);
        assert_eq!(ranking.unvoted, vec![BookId(0), BookId(2)]);
        // top(n) truncates the ranked sequence only.
        assert_eq!(ranking.top(5).len(), 1);
        assert_eq!(ranking.top(0).len(), 0);
    }

    #[test]
    fn voter_breakdown_view_sorts_by_points() {
        let entry = TallyEntry {
            book: BookId(0),
            total_points: 90,
            voters: vec![
                VoterShare {
                    voter: "Phil".to_string(),
                    points: 30,
                },
                VoterShare {
                    voter: "Gab".to_string(),
                    points: 60,
                },
            ],
        };
        let sorted = entry.voters_by_points();
        assert_eq!(sorted[0].voter, "Gab");
        assert_eq!(sorted[1].voter, "Phil");
        // The stored attribution order is untouched.
        assert_eq!(entry.voters[0].voter, "Phil");
    }

    #[test]
    fn removed_ids_are_never_reassigned() {
        let mut app = app();
        let first = add_book(&mut app, "A", "Gab");
        app.remove_book(first, "Gab", false).unwrap();
        let second = add_book(&mut app, "B", "Gab");
        assert_eq!(first, BookId(0));
        assert_eq!(second, BookId(1));
    }

    #[test]
    fn removal_permissions() {
        let mut app = app();
        let id = add_book(&mut app, "A", "Gab");
        let err = app.remove_book(id, "Kathy", false).unwrap_err();
        assert_eq!(
            err,
            VotingError::PermissionDenied {
                requester: "Kathy".to_string()
            }
        );
        // An administrator may remove anyone's book.
        app.remove_book(id, "Phil", true).unwrap();
        assert!(app.registry().book(id).is_none());
    }

    #[test]
    fn clear_requires_admin_and_keeps_the_registry() {
        let mut app = app();
        add_book(&mut app, "A", "Gab");
        add_book(&mut app, "B", "Kathy");
        app.cast_ballot(&draft("Phil", &[(0, 100)])).unwrap();
        let err = app.clear_ballots("Gab", false).unwrap_err();
        assert!(matches!(err, VotingError::PermissionDenied { .. }));
        assert_eq!(app.store().len(), 1);
        app.clear_ballots("Phil", true).unwrap();
        assert!(app.store().is_empty());
        assert_eq!(app.registry().active_count(), 2);
    }

    #[test]
    fn export_import_round_trip() {
        let mut app = app();
        add_book(&mut app, "A", "Gab");
        add_book(&mut app, "B", "Kathy");
        app.cast_ballot(&draft("Phil", &[(0, 60), (1, 40)])).unwrap();
        let doc = app.export_document();

        let mut restored = App::new(VoteRules::DEFAULT_RULES);
        restored.import_document(doc.clone()).unwrap();
        assert_eq!(restored.registry().snapshot(), app.registry().snapshot());
        assert_eq!(restored.store().all(), app.store().all());

        // The same document survives a pass through its JSON text.
        let json = serde_json::to_string(&doc).unwrap();
        let mut from_json = App::new(VoteRules::DEFAULT_RULES);
        from_json.import_json(&json).unwrap();
        assert_eq!(from_json.registry().snapshot(), app.registry().snapshot());
        assert_eq!(from_json.store().all(), app.store().all());
    }

    #[test]
    fn import_keeps_ids_durable() {
        let mut app = app();
        add_book(&mut app, "A", "Gab");
        add_book(&mut app, "B", "Kathy");
        let doc = app.export_document();
        let mut restored = App::new(VoteRules::DEFAULT_RULES);
        restored.import_document(doc).unwrap();
        // New submissions continue above the imported ids.
        let next = restored
            .submit_book("C", "Author", "Silvia", BookMetadata::default())
            .unwrap();
        assert_eq!(next, BookId(2));
    }

    #[test]
    fn malformed_import_leaves_state_untouched() {
        let mut app = app();
        add_book(&mut app, "A", "Gab");
        app.cast_ballot(&draft("Phil", &[(0, 100)])).unwrap();

        let err = app.import_json("{\"books\": 3}").unwrap_err();
        assert!(matches!(err, VotingError::ImportFormat { .. }));
        assert_eq!(app.registry().active_count(), 1);
        assert_eq!(app.store().len(), 1);

        // A well-formed document violating the one-ballot invariant is
        // rejected the same way.
        let mut doc = app.export_document();
        doc.ballots.push(ballot("phil", &[(0, 100)]));
        let err = app.import_document(doc).unwrap_err();
        assert!(matches!(err, VotingError::ImportFormat { .. }));
        assert_eq!(app.store().len(), 1);
    }

    #[test]
    fn validation_does_not_mutate_the_snapshots() {
        let mut app = app();
        add_book(&mut app, "A", "Gab");
        let d = draft("Phil", &[(0, 100)]);
        let v = validate_ballot(&d, app.registry(), app.store(), app.rules()).unwrap();
        assert_eq!(v.ballot().voter, "Phil");
        // Nothing was stored by validation alone.
        assert!(app.store().is_empty());
    }
}
