use thiserror::Error;

/// Failures while fetching or interpreting pages from the archive site.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("request to {url} failed")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} from {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("failed to parse {url}")]
    Parse {
        url: String,
        #[source]
        source: ParseError,
    },

    #[error("fetch task failed: {0}")]
    Task(String),
}

/// Shape mismatches in a match report or archive page.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid selector `{0}`")]
    Selector(&'static str),

    #[error("missing element `{0}`")]
    MissingElement(&'static str),

    #[error("date-time `{0}` has no \" - \" separator")]
    DateTime(String),

    #[error("referee name not found in report block")]
    Referee,

    #[error("expected 6 lineup tables, found {0}")]
    LineupTables(usize),

    #[error("row {row} of lineup table {table} has no name column")]
    PlayerCell { table: usize, row: usize },

    #[error("{section} lists {found} names, the row schema holds {max}")]
    TooManyPlayers {
        section: &'static str,
        found: usize,
        max: usize,
    },
}
