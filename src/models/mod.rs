use serde::Serialize;
use std::fmt;

pub const STARTERS: usize = 11;
pub const SUBSTITUTES: usize = 7;
pub const REPORT_FIELDS: usize = 7;

/// Written in place of every report field when a match was awarded by forfeit.
pub const FORFEIT_SENTINEL: &str = "<sus>";

// ── Season ────────────────────────────────────────────────────────────────────

/// A league season, identified by its starting year. Renders as "2005-06".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Season {
    pub start_year: u16,
}

impl Season {
    pub fn new(start_year: u16) -> Self {
        Self { start_year }
    }

    /// Seasons for every start year in `first..=last`.
    pub fn range(first: u16, last: u16) -> Vec<Season> {
        (first..=last).map(Season::new).collect()
    }

    pub fn label(&self) -> String {
        format!("{}-{:02}", self.start_year, (u32::from(self.start_year) + 1) % 100)
    }

    /// Archive path segment shared by the round page and its match reports.
    /// e.g. 2005-06 round 3 → "2005-06/UNICO/UNI/3"
    pub fn round_path(&self, round: u32) -> String {
        format!("{}/UNICO/UNI/{}", self.label(), round)
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

// ── Match URL ─────────────────────────────────────────────────────────────────

/// Match report path relative to the site base, e.g.
/// "match-report/2005-06/UNICO/UNI/1/juventus-chievo".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MatchUrl(String);

impl MatchUrl {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MatchUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A fetched, not yet parsed, match report page.
#[derive(Debug)]
pub struct MatchPage {
    pub url: MatchUrl,
    pub html: String,
}

// ── Match data ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchReport {
    pub date: String,
    pub time: String,
    pub referee: String,
    pub home_team: String,
    pub away_team: String,
    pub home_score: String,
    pub away_score: String,
}

impl MatchReport {
    pub fn fields(&self) -> Vec<String> {
        vec![
            self.date.clone(),
            self.time.clone(),
            self.referee.clone(),
            self.home_team.clone(),
            self.away_team.clone(),
            self.home_score.clone(),
            self.away_score.clone(),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TeamLineup {
    pub coach: String,
    pub starters: Vec<String>,
    pub substitutes: Vec<String>,
}

impl TeamLineup {
    /// Coach, starters, substitutes — as extracted, without padding.
    pub fn names(&self) -> Vec<String> {
        std::iter::once(self.coach.clone())
            .chain(self.starters.iter().cloned())
            .chain(self.substitutes.iter().cloned())
            .collect()
    }

    /// Fixed-width slice of the output row: 1 + STARTERS + SUBSTITUTES fields.
    fn record_fields(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(1 + STARTERS + SUBSTITUTES);
        out.push(self.coach.clone());
        out.extend(padded(&self.starters, STARTERS));
        out.extend(padded(&self.substitutes, SUBSTITUTES));
        out
    }
}

fn padded(names: &[String], width: usize) -> impl Iterator<Item = String> + '_ {
    names
        .iter()
        .cloned()
        .chain(std::iter::repeat(String::new()))
        .take(width)
}

/// One parsed match, before season/round labels are attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MatchRow {
    Played {
        report: MatchReport,
        home: TeamLineup,
        away: TeamLineup,
    },
    Forfeited {
        home_team: String,
        away_team: String,
    },
}

impl MatchRow {
    pub fn is_forfeit(&self) -> bool {
        matches!(self, MatchRow::Forfeited { .. })
    }

    pub fn teams(&self) -> (&str, &str) {
        match self {
            MatchRow::Played { report, .. } => (&report.home_team, &report.away_team),
            MatchRow::Forfeited { home_team, away_team } => (home_team, away_team),
        }
    }

    /// The 7 report fields; all sentinels for a forfeit.
    pub fn report_fields(&self) -> Vec<String> {
        match self {
            MatchRow::Played { report, .. } => report.fields(),
            MatchRow::Forfeited { .. } => vec![FORFEIT_SENTINEL.to_string(); REPORT_FIELDS],
        }
    }

    /// Home lineup then away lineup. Empty for a forfeit.
    pub fn lineup_names(&self) -> Vec<String> {
        match self {
            MatchRow::Played { home, away, .. } => {
                let mut names = home.names();
                names.extend(away.names());
                names
            }
            MatchRow::Forfeited { .. } => Vec::new(),
        }
    }

    /// Row fields after season and round, always `match_columns().len() - 2` wide.
    pub fn record(&self) -> Vec<String> {
        let mut out = self.report_fields();
        match self {
            MatchRow::Played { home, away, .. } => {
                out.extend(home.record_fields());
                out.extend(away.record_fields());
            }
            MatchRow::Forfeited { .. } => {
                out.extend(TeamLineup::default().record_fields());
                out.extend(TeamLineup::default().record_fields());
            }
        }
        out
    }
}

// ── Column schema ─────────────────────────────────────────────────────────────

pub fn match_columns() -> Vec<String> {
    let mut cols: Vec<String> = [
        "season",
        "round",
        "date",
        "time",
        "referee",
        "home_team",
        "away_team",
        "home_team_score",
        "away_team_score",
    ]
    .iter()
    .map(|c| c.to_string())
    .collect();

    for side in ["home", "away"] {
        cols.push(format!("{}_team_coach", side));
        cols.extend((1..=STARTERS).map(|i| format!("{}_player_{}", side, i)));
        cols.extend((1..=SUBSTITUTES).map(|i| format!("{}_substitute_{}", side, i)));
    }
    cols
}
