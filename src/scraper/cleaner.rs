use crate::error::ParseError;

/// Phrase the archive puts in the report block of a match awarded by forfeit.
pub const FORFEIT_MARKER: &str = "Partita sospesa";

// ── Names ─────────────────────────────────────────────────────────────────────

/// Keep ASCII letters and spaces only, then trim.
/// "23 Rossi" → "Rossi" | "M. De Rossi" → "M De Rossi"
pub fn clean_player_name(s: &str) -> String {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_alphabetic() || *c == ' ')
        .collect();
    cleaned.trim().to_string()
}

// ── Report block ──────────────────────────────────────────────────────────────

pub fn is_forfeit(report_text: &str) -> bool {
    report_text.contains(FORFEIT_MARKER)
}

/// "28/08/2005 - 20:30" → ("28/08/2005", "20:30")
pub fn split_date_time(s: &str) -> Result<(String, String), ParseError> {
    let mut parts = s.split(" - ");
    match (parts.next(), parts.next()) {
        (Some(date), Some(time)) => Ok((date.trim().to_string(), time.trim().to_string())),
        _ => Err(ParseError::DateTime(s.trim().to_string())),
    }
}

/// The referee sits after the third colon of the report block text (the
/// kick-off time contributes the first one):
/// "28/08/2005 - 20:30 Stadio: Delle Alpi Arbitro: Pierluigi Collina (Viareggio)"
/// → "Pierluigi Collina".
/// Only the first two single-space separated tokens are kept.
pub fn parse_referee(report_text: &str) -> Result<String, ParseError> {
    let segment = report_text.split(':').nth(3).ok_or(ParseError::Referee)?;
    let mut tokens = segment.split(' ').skip(1);

    match (tokens.next(), tokens.next()) {
        (Some(first), Some(last)) if !first.is_empty() => Ok(format!("{} {}", first, last)),
        _ => Err(ParseError::Referee),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
