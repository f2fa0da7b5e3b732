/*!

This is the long-form manual for `ballot_tally` and `movnight`.

## Counting rules

Every voter ranks some of the suggested movies. Each ranked movie becomes one ballot entry
`(movie, voter, preference)`, preference 1 being the favourite. The entries of a week are
tallied together, in passes:

1. At pass `p`, the eligible entries are the ones with a preference of `p` or more, for movies
that have not been disqualified yet.
2. Every eligible entry adds one vote to its movie. Votes are never reset between passes.
The percent of a movie is its vote count divided by the number of eligible entries of the
pass. A movie with no eligible entry keeps the percent of the last pass it got one.
3. A top movie and a bottom movie are picked (see below).
4. The tally stops when the top movie is above 50%, or when there have been as many passes as
movies. Otherwise the bottom movie is disqualified and the next pass starts.

If a pass has no eligible entry at all, the tally stops at this pass: no later pass could
change any count.

The leaderboard lists every movie, disqualified or not, by decreasing percent. Movies with
the same percent keep the order in which they first appeared in the ballots.

Since votes accumulate, a percent can go above 100% after the first pass.

### Picking the top and bottom movies

The default scan (`ExtremumScan::BottomAnchored`) walks the movies in the order they first
appeared, starting with both picks on the first movie. A movie with more votes than the
current bottom becomes the top. A movie with fewer votes than the current bottom becomes the
bottom. Disqualified movies are part of the scan.

With three or more different vote counts this does not always pick the movie with the most
votes. For example with counts `4, 1, 2` (in order of appearance), the bottom moves to the
second movie and the third one becomes the top since `2 > 1`.

`ExtremumScan::Independent` picks the true maximum and minimum among the movies still
running, the earliest one on ties. It can be selected with `"extremumScan": "independent"`
in the configuration.

## Input formats

All the formats carry the same five fields per entry:

| field           | description                                   |
|-----------------|-----------------------------------------------|
| `week`          | the voting week, `YYYYWW` (ISO year and week) |
| `suggestion_id` | numeric id of the suggested movie             |
| `movie`         | the title, used for display                   |
| `author`        | who cast the entry                            |
| `preference`    | rank, starting at 1                           |

### `csv`

```text
week,suggestion_id,movie,author,preference
202115,1,Heat,liam,1
202115,2,Ronin,liam,2
```

The first row is a header. Set `firstVoteRowIndex` (1-based) if the entries start elsewhere.
Blank lines count as rows, so line numbers in error messages match a text editor.

### `json`

```text
[
  {"week": "202115", "suggestionId": 1, "movie": "Heat", "author": "liam", "preference": 1}
]
```

### `xlsx`

An Excel workbook laid out like the CSV file, starting in column A. The first worksheet is
read, unless `excelWorksheetName` is set. Rows are numbered as in the spreadsheet.

## Configuration

```text
{
  "outputSettings": {"title": "Movie night", "outputDirectory": "out"},
  "ballotSources": [{"provider": "csv", "filePath": "votes.csv"}],
  "rules": {"extremumScan": "bottomAnchored"},
  "week": "202115"
}
```

`rules` and `week` are optional. Without a week, every week found in the sources is tallied.
Paths are relative to the configuration file.

 */
