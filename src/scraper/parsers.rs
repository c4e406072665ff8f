use crate::error::ParseError;
use crate::models::{MatchReport, MatchRow, MatchUrl, Season, STARTERS, SUBSTITUTES, TeamLineup};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};

use super::cleaner::{clean_player_name, is_forfeit, parse_referee, split_date_time};

const HOME_TEAM: &str = ".report-squadra.squadra-a";
const AWAY_TEAM: &str = ".report-squadra.squadra-b";
const HOME_SCORE: &str = ".squadra-risultato.squadra-a";
const AWAY_SCORE: &str = ".squadra-risultato.squadra-b";
const REPORT_DATA: &str = ".report-data";
const LINEUP_TABLE: &str = ".tabella";

/// Lineup tables appear in this order on every report page.
const HOME_STARTERS: usize = 0;
const AWAY_STARTERS: usize = 1;
const HOME_SUBSTITUTES: usize = 2;
const AWAY_SUBSTITUTES: usize = 3;
const HOME_COACH: usize = 4;
const AWAY_COACH: usize = 5;
const LINEUP_TABLE_COUNT: usize = 6;

fn selector(css: &'static str) -> Result<Selector, ParseError> {
    Selector::parse(css).map_err(|_| ParseError::Selector(css))
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>()
}

fn first_text(doc: &Html, css: &'static str) -> Result<String, ParseError> {
    let sel = selector(css)?;
    doc.select(&sel)
        .next()
        .map(|el| element_text(el).trim().to_string())
        .ok_or(ParseError::MissingElement(css))
}

// ── Round archive page ────────────────────────────────────────────────────────

/// Extract the match report links of one round, in document order, with
/// `site_prefix` (e.g. "/it/serie-a/") stripped.
///
/// A link qualifies when its href starts with
/// `{site_prefix}match-report/{season}/UNICO/UNI/{round}` followed by a path
/// boundary, so round 1 does not pick up round 10-19 links.
pub fn parse_round_page(
    html: &str,
    site_prefix: &str,
    season: &Season,
    round: u32,
) -> Result<Vec<MatchUrl>, ParseError> {
    let doc = Html::parse_document(html);
    let a_sel = selector("a[href]")?;
    let report_prefix = format!("{}match-report/{}", site_prefix, season.round_path(round));

    let urls: Vec<MatchUrl> = doc
        .select(&a_sel)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| is_report_link(href, &report_prefix))
        .filter_map(|href| href.strip_prefix(site_prefix))
        .map(MatchUrl::new)
        .collect();

    debug!("{} round {}: {} report links", season, round, urls.len());
    Ok(urls)
}

fn is_report_link(href: &str, report_prefix: &str) -> bool {
    href.strip_prefix(report_prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

// ── Match report page ─────────────────────────────────────────────────────────

pub fn parse_match_page(html: &str) -> Result<MatchRow, ParseError> {
    let doc = Html::parse_document(html);

    let home_team = first_text(&doc, HOME_TEAM)?;
    let away_team = first_text(&doc, AWAY_TEAM)?;
    info!("Scraping {} vs {}...", home_team, away_team);

    let report_sel = selector(REPORT_DATA)?;
    let report_block = doc
        .select(&report_sel)
        .next()
        .ok_or(ParseError::MissingElement(REPORT_DATA))?;
    let report_text = element_text(report_block);

    if is_forfeit(&report_text) {
        debug!("{} vs {}: awarded by forfeit, lineups skipped", home_team, away_team);
        return Ok(MatchRow::Forfeited { home_team, away_team });
    }

    let span_sel = selector("span")?;
    let datetime = report_block
        .select(&span_sel)
        .next()
        .map(element_text)
        .ok_or(ParseError::MissingElement("report-data span"))?;
    let (date, time) = split_date_time(&datetime)?;
    let referee = parse_referee(&report_text)?;

    let report = MatchReport {
        date,
        time,
        referee,
        home_team,
        away_team,
        home_score: first_text(&doc, HOME_SCORE)?,
        away_score: first_text(&doc, AWAY_SCORE)?,
    };

    let mut tables = lineup_tables(&doc)?;
    let home = team_lineup(
        ("home coach", "home starters", "home substitutes"),
        std::mem::take(&mut tables[HOME_COACH]),
        std::mem::take(&mut tables[HOME_STARTERS]),
        std::mem::take(&mut tables[HOME_SUBSTITUTES]),
    )?;
    let away = team_lineup(
        ("away coach", "away starters", "away substitutes"),
        std::mem::take(&mut tables[AWAY_COACH]),
        std::mem::take(&mut tables[AWAY_STARTERS]),
        std::mem::take(&mut tables[AWAY_SUBSTITUTES]),
    )?;

    Ok(MatchRow::Played { report, home, away })
}

/// Names from all six lineup tables, indexed by table position.
fn lineup_tables(doc: &Html) -> Result<Vec<Vec<String>>, ParseError> {
    let table_sel = selector(LINEUP_TABLE)?;
    let tables: Vec<ElementRef<'_>> = doc.select(&table_sel).collect();

    if tables.len() != LINEUP_TABLE_COUNT {
        return Err(ParseError::LineupTables(tables.len()));
    }

    tables
        .into_iter()
        .enumerate()
        .map(|(idx, table)| names_from_table(table, idx))
        .collect()
}

/// Second column of every body row, cleaned down to letters and spaces.
fn names_from_table(table: ElementRef<'_>, index: usize) -> Result<Vec<String>, ParseError> {
    let row_sel = selector("tbody tr")?;
    let td_sel = selector("td")?;

    table
        .select(&row_sel)
        .enumerate()
        .map(|(row, tr)| {
            tr.select(&td_sel)
                .nth(1)
                .map(|td| clean_player_name(&element_text(td)))
                .ok_or(ParseError::PlayerCell { table: index, row })
        })
        .collect()
}

/// Coach table holds a single row; extra rows are an error, not dropped.
fn team_lineup(
    (coach_section, starters_section, substitutes_section): (&'static str, &'static str, &'static str),
    coach: Vec<String>,
    starters: Vec<String>,
    substitutes: Vec<String>,
) -> Result<TeamLineup, ParseError> {
    check_len(coach_section, &coach, 1)?;
    check_len(starters_section, &starters, STARTERS)?;
    check_len(substitutes_section, &substitutes, SUBSTITUTES)?;

    Ok(TeamLineup {
        coach: coach.into_iter().next().unwrap_or_default(),
        starters,
        substitutes,
    })
}

fn check_len(section: &'static str, names: &[String], max: usize) -> Result<(), ParseError> {
    if names.len() > max {
        return Err(ParseError::TooManyPlayers {
            section,
            found: names.len(),
            max,
        });
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
