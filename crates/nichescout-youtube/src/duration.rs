use std::sync::LazyLock;

use regex::Regex;

static ISO_DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^P(?:(\d+)W)?(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?)?$")
        .expect("valid ISO-8601 duration regex")
});

/// Parse an ISO-8601 duration such as `PT1H2M3S` or `P1DT2H` into seconds.
///
/// Returns `None` when the text is not a duration the video API emits
/// (bare `P`, `PT`, fractional seconds, year/month components).
#[must_use]
pub fn parse_iso8601_duration(text: &str) -> Option<u64> {
    let text = text.trim();
    if text == "P" || text.ends_with('T') {
        return None;
    }
    let caps = ISO_DURATION.captures(text)?;

    let part = |idx: usize| -> Option<u64> {
        match caps.get(idx) {
            Some(m) => m.as_str().parse::<u64>().ok(),
            None => Some(0),
        }
    };

    let weeks = part(1)?;
    let days = part(2)?;
    let hours = part(3)?;
    let minutes = part(4)?;
    let seconds = part(5)?;

    weeks
        .checked_mul(7 * 86_400)?
        .checked_add(days.checked_mul(86_400)?)?
        .checked_add(hours.checked_mul(3_600)?)?
        .checked_add(minutes.checked_mul(60)?)?
        .checked_add(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_video_durations() {
        assert_eq!(parse_iso8601_duration("PT1H2M3S"), Some(3_723));
        assert_eq!(parse_iso8601_duration("PT45S"), Some(45));
        assert_eq!(parse_iso8601_duration("PT10M"), Some(600));
        assert_eq!(parse_iso8601_duration("P1DT2H"), Some(93_600));
        assert_eq!(parse_iso8601_duration("P0D"), Some(0));
    }

    #[test]
    fn rejects_malformed_durations() {
        assert_eq!(parse_iso8601_duration(""), None);
        assert_eq!(parse_iso8601_duration("P"), None);
        assert_eq!(parse_iso8601_duration("PT"), None);
        assert_eq!(parse_iso8601_duration("1H2M"), None);
        assert_eq!(parse_iso8601_duration("PT1.5S"), None);
        assert_eq!(parse_iso8601_duration("P1Y"), None);
    }
}
