use std::time::Instant;
use tracing::info;

/// Logs when a labelled stretch of scraping starts and, on drop, how long it ran.
pub struct Timer {
    label: String,
    start: Instant,
}

impl Timer {
    pub fn start(label: impl Into<String>) -> Self {
        let label = label.into();
        info!("⏱  {}: started", label);
        Self {
            label,
            start: Instant::now(),
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        info!("⏱  {}: done in {:.2?}", self.label, self.start.elapsed());
    }
}

/// Row and match counts with thousands separators: 2280 → "2,280".
pub fn fmt_number(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmt_number_for_match_counts() {
        // one season: 38 rounds x 10 matches
        assert_eq!(fmt_number(380), "380");
        // six seasons
        assert_eq!(fmt_number(2_280), "2,280");
        assert_eq!(fmt_number(0), "0");
        assert_eq!(fmt_number(1_000_000), "1,000,000");
    }
}
