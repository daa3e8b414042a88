/*!

This is the long-form manual for `club_voting` and `booktally`.

## The voting scheme

Every member may nominate books (5 active nominations at most, no
case-insensitive title+author duplicates). Every member casts at most one
ballot: a set of distinct books with a positive number of points each, adding
up to exactly the point budget (100 by default, across at most 5 books).
Voting for one's own nomination is not allowed, and names are matched
case-insensitively throughout.

Results are recomputed from the full ballot collection on every read: each
book's score is the exact integer sum of the points it received, with the
contributing voters attached. Books are ranked by score, highest first; books
with equal scores keep their nomination order. Books that received no points
are listed separately and are never truncated away. Books that were removed
after votes were cast disappear from the results entirely, together with the
points they had received.

## Data files

The `booktally` program keeps two JSON files in its data directory
(`data` by default):

* `books.json` — every nomination ever made, including removed ones. Removed
  books carry `"active": false` and keep their identifier; identifiers are
  never reused.
* `votes.json` — the accepted ballots.

Both files are rewritten after every accepted mutation. A failed write is
reported but does not undo the mutation: the in-memory state is
authoritative for the session.

## Export and import

`booktally export` produces a single document with both sequences and a
timestamp:

```json
{
  "books": [ ... ],
  "ballots": [ ... ],
  "exported_at": "2026-03-01T18:20:00Z"
}
```

`booktally import` accepts the same shape and replaces both sequences
atomically: a document that does not parse, or that contains a duplicate book
id or a second ballot for the same voter, is rejected in full and the
existing state is untouched.

## Ballot CSV format

`booktally import-votes` reads one ballot per row. The first field is the
voter, every following field is an `ID:POINTS` pair:

```text
Gab,0:60,1:40
Phil,2:100
```

Headers are not expected. Every row goes through the same validation as an
interactive vote; a rejected row is reported with its line number and does
not stop the remaining rows.

## Configuration

The club configuration is one JSON file passed with `--config`. All fields
are optional:

```json
{
  "clubName": "Book Club Voting System",
  "members": ["Gab", "Nonna", "Phil", "Silvia", "Kathy", "Val"],
  "admins": ["Phil"],
  "rules": {
    "totalPoints": 100,
    "maxChoices": 5,
    "submissionQuota": 5
  },
  "topBooks": 6,
  "dataDir": "data"
}
```

Administrator capability (the `admins` list) gates removing someone else's
book, clearing all ballots and bulk import. Without a configuration file
there are no administrators.

 */
