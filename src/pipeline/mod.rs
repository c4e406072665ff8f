//! Pipeline orchestrator: ties source → parser → CSV sink together.
//!
//! For every season × round:
//!   1. Resolve the round's match report URLs (archive page).
//!   2. Fan out one fetch task per URL; each task sends its page (or error)
//!      on a channel that closes once every task is done.
//!   3. Parse pages in completion order and append one row per match.
//!
//! Rows therefore land in the order fetches finish, not fixture order.

use crate::config::PipelineConfig;
use crate::error::ScrapeError;
use crate::models::{MatchPage, MatchUrl, Season};
use crate::scraper::{MatchSource, ReportParser};
use crate::storage::CsvSink;
use anyhow::{Context, Result};
use std::io::Write;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

type Fetched = Result<MatchPage, ScrapeError>;

// ── Dispatcher ────────────────────────────────────────────────────────────────

/// In-flight fetches for one round.
///
/// `recv` yields exactly one item per dispatched URL, then `None`.
/// Dropping a `Dispatch` aborts whatever is still running.
pub struct Dispatch {
    rx: mpsc::UnboundedReceiver<Fetched>,
    tasks: JoinSet<()>,
    expected: usize,
}

impl Dispatch {
    pub async fn recv(&mut self) -> Option<Fetched> {
        self.rx.recv().await
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    /// Wait for every task and surface panics or cancellations.
    pub async fn join(mut self) -> Result<(), ScrapeError> {
        while let Some(res) = self.tasks.join_next().await {
            res.map_err(|e| ScrapeError::Task(e.to_string()))?;
        }
        Ok(())
    }
}

/// Start one fetch task per URL. With `concurrency` set, at most that many
/// fetches run at once; otherwise all start immediately.
pub fn dispatch<S: MatchSource>(
    source: Arc<S>,
    urls: Vec<MatchUrl>,
    concurrency: Option<usize>,
) -> Dispatch {
    let (tx, rx) = mpsc::unbounded_channel();
    let sem = concurrency.map(|n| Arc::new(Semaphore::new(n)));
    let mut tasks = JoinSet::new();
    let expected = urls.len();

    for url in urls {
        let source = Arc::clone(&source);
        let sem = sem.clone();
        let tx = tx.clone();

        tasks.spawn(async move {
            let _permit = match sem {
                Some(sem) => match sem.acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(e) => {
                        let _ = tx.send(Err(ScrapeError::Task(e.to_string())));
                        return;
                    }
                },
                None => None,
            };

            let fetched = source
                .fetch_match_page(&url)
                .await
                .map(|html| MatchPage { url, html });

            // Receiver gone means the driver already bailed out
            let _ = tx.send(fetched);
        });
    }

    // Only task-held senders remain, so the channel closes with the last task
    drop(tx);

    Dispatch {
        rx,
        tasks,
        expected,
    }
}

// ── Driver ────────────────────────────────────────────────────────────────────

pub struct Pipeline<S, P> {
    source: Arc<S>,
    parser: P,
    config: PipelineConfig,
}

impl<S: MatchSource, P: ReportParser> Pipeline<S, P> {
    pub fn new(source: S, parser: P, config: PipelineConfig) -> Self {
        Self {
            source: Arc::new(source),
            parser,
            config,
        }
    }

    pub async fn run<W: Write>(&self, sink: &mut CsvSink<W>) -> Result<PipelineStats> {
        let seasons = Season::range(self.config.first_season, self.config.last_season);
        let mut stats = PipelineStats::default();

        for season in &seasons {
            for round in 1..=self.config.rounds {
                let round_stats = self.scrape_round(season, round, sink).await?;
                stats.add(&round_stats);
            }
            stats.seasons += 1;
        }

        info!(
            "=== Done: {} seasons | {} rounds | {} matches ({} forfeited) | {} errors ===",
            stats.seasons, stats.rounds, stats.matches, stats.forfeits, stats.errors
        );
        Ok(stats)
    }

    pub async fn scrape_round<W: Write>(
        &self,
        season: &Season,
        round: u32,
        sink: &mut CsvSink<W>,
    ) -> Result<RoundStats> {
        info!("Season {} Round {}:", season, round);
        let mut stats = RoundStats::default();

        let urls = match self.source.fetch_round_urls(season, round).await {
            Ok(urls) => urls,
            Err(e) if !self.config.fail_fast => {
                warn!("{} round {}: {:#}", season, round, anyhow::Error::from(e));
                stats.errors += 1;
                return Ok(stats);
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Resolving {} round {}", season, round));
            }
        };

        if urls.is_empty() {
            warn!("{} round {}: nothing to scrape", season, round);
            return Ok(stats);
        }

        let mut inflight = dispatch(Arc::clone(&self.source), urls, self.config.concurrency);
        debug!("{} round {}: {} fetches dispatched", season, round, inflight.expected());

        while let Some(fetched) = inflight.recv().await {
            let parsed = fetched.and_then(|page| {
                self.parser
                    .parse(&page.html)
                    .map_err(|source| ScrapeError::Parse {
                        url: page.url.to_string(),
                        source,
                    })
            });

            match parsed {
                Ok(row) => {
                    let (home, away) = row.teams();
                    debug!("{} vs {}: {} lineup names", home, away, row.lineup_names().len());
                    sink.write_match(season, round, &row)?;
                    stats.matches += 1;
                    if row.is_forfeit() {
                        stats.forfeits += 1;
                    }
                }
                Err(e) if !self.config.fail_fast => {
                    warn!("{} round {}: {:#}", season, round, anyhow::Error::from(e));
                    stats.errors += 1;
                }
                Err(e) => {
                    sink.flush()?;
                    return Err(e).with_context(|| format!("Scraping {} round {}", season, round));
                }
            }
        }

        if let Err(e) = inflight.join().await {
            error!("{} round {}: {}", season, round, e);
            if self.config.fail_fast {
                sink.flush()?;
                return Err(e.into());
            }
            stats.errors += 1;
        }

        sink.flush()?;
        Ok(stats)
    }
}

// ── Stats ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RoundStats {
    pub matches: usize,
    pub forfeits: usize,
    pub errors: usize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PipelineStats {
    pub seasons: usize,
    pub rounds: usize,
    pub matches: usize,
    pub forfeits: usize,
    pub errors: usize,
}

impl PipelineStats {
    fn add(&mut self, round: &RoundStats) {
        self.rounds += 1;
        self.matches += round.matches;
        self.forfeits += round.forfeits;
        self.errors += round.errors;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;
    use crate::models::{MatchReport, MatchRow, TeamLineup};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    /// Serves a fixed URL list for every round; match pages are the URL itself
    /// unless listed in `broken`.
    struct StubSource {
        urls: Vec<MatchUrl>,
        broken: Vec<MatchUrl>,
        delays: HashMap<String, u64>,
    }

    impl StubSource {
        fn with_urls(paths: &[&str]) -> Self {
            Self {
                urls: paths.iter().map(|p| MatchUrl::new(*p)).collect(),
                broken: Vec::new(),
                delays: HashMap::new(),
            }
        }
    }

    #[async_trait]
    impl MatchSource for StubSource {
        async fn fetch_round_urls(&self, _season: &Season, _round: u32) -> Result<Vec<MatchUrl>, ScrapeError> {
            Ok(self.urls.clone())
        }

        async fn fetch_match_page(&self, url: &MatchUrl) -> Result<String, ScrapeError> {
            if let Some(ms) = self.delays.get(url.as_str()) {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
            }
            if self.broken.contains(url) {
                return Err(ScrapeError::Task(format!("stub failure for {}", url)));
            }
            Ok(url.to_string())
        }
    }

    /// Treats the page body as "home-away"; "forfeit" pages become forfeits.
    struct StubParser;

    impl ReportParser for StubParser {
        fn parse(&self, html: &str) -> Result<MatchRow, ParseError> {
            let teams = html.rsplit('/').next().unwrap_or_default();
            if teams.starts_with("forfeit") {
                return Ok(MatchRow::Forfeited {
                    home_team: "Roma".into(),
                    away_team: "Cagliari".into(),
                });
            }
            let (home, away) = teams
                .split_once('-')
                .ok_or(ParseError::MissingElement(".report-squadra"))?;
            Ok(MatchRow::Played {
                report: MatchReport {
                    date: "28/08/2005".into(),
                    time: "15:00".into(),
                    referee: "Stefano Farina".into(),
                    home_team: home.into(),
                    away_team: away.into(),
                    home_score: "2".into(),
                    away_score: "1".into(),
                },
                home: TeamLineup::default(),
                away: TeamLineup::default(),
            })
        }
    }

    fn one_round() -> PipelineConfig {
        PipelineConfig {
            first_season: 2005,
            last_season: 2005,
            rounds: 1,
            concurrency: None,
            fail_fast: true,
        }
    }

    fn output_rows(sink: CsvSink<Vec<u8>>) -> Vec<Vec<String>> {
        let bytes = sink.into_inner().unwrap();
        csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(bytes.as_slice())
            .records()
            .map(|r| r.unwrap().iter().map(String::from).collect())
            .collect()
    }

    #[tokio::test]
    async fn test_two_matches_end_to_end() {
        let source = StubSource::with_urls(&[
            "match-report/2005-06/UNICO/UNI/1/juventus-chievo",
            "match-report/2005-06/UNICO/UNI/1/ascoli-udinese",
        ]);
        let pipeline = Pipeline::new(source, StubParser, one_round());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let mut sink = CsvSink::open_append(&path).unwrap();
        let stats = pipeline.run(&mut sink).await.unwrap();
        drop(sink);

        assert_eq!(stats.matches, 2);
        assert_eq!(stats.rounds, 1);
        assert_eq!(stats.seasons, 1);

        let rows: Vec<Vec<String>> = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(&path)
            .unwrap()
            .records()
            .map(|r| r.unwrap().iter().map(String::from).collect())
            .collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows.iter().filter(|r| r[0] == "season").count(), 1);
        assert_eq!(rows[0][0], "season");
        assert!(rows.iter().all(|r| r.len() == 47));

        let mut matches: Vec<(String, String)> = rows[1..]
            .iter()
            .map(|r| {
                assert_eq!(r[..2], ["2005-06", "1"]);
                (r[5].clone(), r[6].clone())
            })
            .collect();
        matches.sort();
        assert_eq!(
            matches,
            vec![
                ("ascoli".to_string(), "udinese".to_string()),
                ("juventus".to_string(), "chievo".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_short_round_does_not_hang() {
        let source = StubSource::with_urls(&["a/roma-lazio", "a/inter-milan", "a/forfeit"]);
        let pipeline = Pipeline::new(source, StubParser, one_round());
        let mut sink = CsvSink::new(Vec::new());

        let stats = tokio::time::timeout(
            Duration::from_secs(5),
            pipeline.scrape_round(&Season::new(2005), 1, &mut sink),
        )
        .await
        .expect("round with fewer than 10 matches must finish");

        let stats = assert_ok!(stats);
        assert_eq!(
            stats,
            RoundStats {
                matches: 3,
                forfeits: 1,
                errors: 0
            }
        );
        assert_eq!(sink.rows_written(), 3);
    }

    #[tokio::test]
    async fn test_empty_round_writes_nothing() {
        let pipeline = Pipeline::new(StubSource::with_urls(&[]), StubParser, one_round());
        let mut sink = CsvSink::new(Vec::new());

        let stats = assert_ok!(pipeline.scrape_round(&Season::new(2005), 7, &mut sink).await);
        assert_eq!(stats, RoundStats::default());
        assert_eq!(sink.rows_written(), 0);
    }

    #[tokio::test]
    async fn test_rows_follow_completion_order() {
        let mut source = StubSource::with_urls(&["a/slow-team", "a/fast-team"]);
        source.delays.insert("a/slow-team".into(), 200);
        let pipeline = Pipeline::new(source, StubParser, one_round());
        let mut sink = CsvSink::new(Vec::new());

        assert_ok!(pipeline.scrape_round(&Season::new(2005), 1, &mut sink).await);

        let rows = output_rows(sink);
        assert_eq!(rows[0][5], "fast");
        assert_eq!(rows[1][5], "slow");
    }

    #[tokio::test]
    async fn test_fail_fast_propagates_fetch_error() {
        let mut source = StubSource::with_urls(&["a/roma-lazio", "a/inter-milan"]);
        source.broken.push(MatchUrl::new("a/inter-milan"));
        let pipeline = Pipeline::new(source, StubParser, one_round());
        let mut sink = CsvSink::new(Vec::new());

        let err = assert_err!(pipeline.scrape_round(&Season::new(2005), 1, &mut sink).await);
        assert!(format!("{:#}", err).contains("stub failure"));
    }

    #[tokio::test]
    async fn test_continue_on_error_counts_failures() {
        let mut source = StubSource::with_urls(&["a/roma-lazio", "a/inter-milan", "a/garbage"]);
        source.broken.push(MatchUrl::new("a/inter-milan"));
        let mut config = one_round();
        config.fail_fast = false;
        let pipeline = Pipeline::new(source, StubParser, config);
        let mut sink = CsvSink::new(Vec::new());

        let stats = assert_ok!(pipeline.scrape_round(&Season::new(2005), 1, &mut sink).await);
        assert_eq!(stats.matches, 1);
        assert_eq!(stats.errors, 2);
        assert_eq!(sink.rows_written(), 1);
    }

    #[tokio::test]
    async fn test_bounded_dispatch_delivers_every_url() {
        let paths: Vec<String> = (0..12).map(|i| format!("a/home{}-away{}", i, i)).collect();
        let urls: Vec<MatchUrl> = paths.iter().map(MatchUrl::new).collect();
        let source = Arc::new(StubSource {
            urls: urls.clone(),
            broken: Vec::new(),
            delays: HashMap::new(),
        });

        let mut inflight = dispatch(source, urls, Some(2));
        assert_eq!(inflight.expected(), 12);

        let mut received = Vec::new();
        while let Some(fetched) = inflight.recv().await {
            received.push(assert_ok!(fetched).url.to_string());
        }
        assert_ok!(inflight.join().await);

        received.sort();
        let mut expected = paths.clone();
        expected.sort();
        assert_eq!(received, expected);
    }
}
