//! Conversion between chrono timestamps and Cypher `datetime` strings.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};

/// Render a timestamp for `datetime($param)` in Cypher.
///
/// Output: `"2024-01-15T10:30:00.000000000Z"` (nanosecond precision, UTC).
pub fn to_cypher_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Parse the output of Cypher `toString(datetime)` back into UTC.
///
/// Neo4j drops zero seconds (`2024-01-15T10:30Z`) and may append a named zone
/// (`2024-01-15T10:30:00+01:00[Europe/Paris]`); both forms are accepted.
pub fn from_cypher_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = match s.find('[') {
        Some(i) => &s[..i],
        None => s,
    }
    .trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    // Minute precision with an offset or `Z`.
    let normalized = s.replacen('Z', "+00:00", 1);
    if let Ok(dt) = DateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M%:z") {
        return Some(dt.with_timezone(&Utc));
    }

    // Local datetimes carry no zone; treat them as UTC.
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|ndt| Utc.from_utc_datetime(&ndt))
}
