use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error;

use crate::backend::types::EpisodeWindow;

// ---------------------------------------------------------------------------
// Time axis normalizer
// ---------------------------------------------------------------------------
//
// The backend reports sample timestamps as strings whose format depends on
// how the recording was captured: live recordings carry bare times of day
// ("08:31:20.500"), miniSD recordings carry date-bearing strings whose date
// part is meaningless ("1900-01-01 00:00:07.390000").  This module converts
// either family into one ordered sequence of absolute instants (epoch ms)
// for the RMS chart, and maps tremor-episode boundaries into the same axis
// so the highlight bands line up with the series.
//
// Everything here is pure and non-throwing: malformed input degrades to a
// renderable value (zeroed fragment, or the series start), never an error.
// The chart staying up matters more than strict correctness of one point.

/// Absolute instant in milliseconds since the Unix epoch (naive local time
/// interpreted as UTC — only differences and formatting matter downstream).
pub type EpochMs = i64;

/// One input data point as received from the backend.
#[derive(Debug, Clone)]
pub struct RawSample {
    pub timestamp: String,
    pub value: f64,
}

/// User-entered wall-clock start of the recording ("the measurement actually
/// began at this time"), taken from an `"HH:MM"` form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorSpec {
    pub hour: u32,
    pub minute: u32,
}

impl AnchorSpec {
    /// Parse an `"HH:MM"` form field. Returns `None` for anything that is
    /// not two `:`-separated in-range numbers.
    pub fn from_hhmm(raw: &str) -> Option<AnchorSpec> {
        let (h, m) = raw.trim().split_once(':')?;
        let hour: u32 = h.parse().ok()?;
        let minute: u32 = m.parse().ok()?;
        if hour > 23 || minute > 59 {
            return None;
        }
        Some(AnchorSpec { hour, minute })
    }
}

/// Episode boundaries mapped into the same absolute-instant space as the
/// series axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpisodeSpan {
    pub start: EpochMs,
    pub end: EpochMs,
}

#[derive(Debug, Clone, Error)]
#[error("unparseable timestamp: {0:?}")]
pub struct ParseFailure(pub String);

// ---------------------------------------------------------------------------
// Format family detection
// ---------------------------------------------------------------------------

/// Which timestamp family a dataset uses. Detected once per series from its
/// first element and applied to every element; a later malformed value is
/// never re-classified.
///
/// The presence test for `-`/`/` is a heuristic inherited from the backend
/// contract, kept as-is until the backend tags the format explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatFamily {
    /// Full calendar timestamp, e.g. `"1900-01-01 00:00:07.390000"`.
    DateBearing,
    /// Bare time of day, e.g. `"08:31:20"` or `"08:31:20.500"`.
    TimeOfDay,
}

impl FormatFamily {
    pub fn detect(raw: &str) -> FormatFamily {
        if raw.contains('-') || raw.contains('/') {
            FormatFamily::DateBearing
        } else {
            FormatFamily::TimeOfDay
        }
    }
}

// ---------------------------------------------------------------------------
// Timestamp parser
// ---------------------------------------------------------------------------

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
];

/// Strict parse of one raw timestamp within a known family.
///
/// Date-bearing results are epoch milliseconds; time-of-day results are
/// milliseconds since local midnight. The two numeric spaces must not be
/// mixed directly — [`derive_elapsed`] is the only sanctioned bridge.
pub fn parse(raw: &str, family: FormatFamily) -> Result<EpochMs, ParseFailure> {
    match family {
        FormatFamily::DateBearing => DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw.trim(), fmt).ok())
            .map(|dt| dt.and_utc().timestamp_millis())
            .ok_or_else(|| ParseFailure(raw.to_string())),
        FormatFamily::TimeOfDay => parse_time_of_day(raw, true).ok_or_else(|| ParseFailure(raw.to_string())),
    }
}

/// `HH:MM:SS` or `HH:MM:SS.mmm` → milliseconds since midnight.
///
/// With `strict` off, malformed fragments read as 0 instead of failing
/// ("08:xx:20" → 08:00:20), so a single bad sample cannot take down the
/// whole series render.
fn parse_time_of_day(raw: &str, strict: bool) -> Option<EpochMs> {
    let mut fields = raw.trim().split(':');
    let (h, m, rest) = (fields.next(), fields.next(), fields.next());
    if strict && (rest.is_none() || fields.next().is_some()) {
        return None;
    }

    let (s, frac) = match rest.unwrap_or("").split_once('.') {
        Some((s, frac)) => (s, frac),
        None => (rest.unwrap_or(""), ""),
    };

    // Fraction is right-padded / truncated to exactly three digits; an
    // absent fraction is 0 ms.
    let mut frac3 = frac.to_string();
    while frac3.len() < 3 {
        frac3.push('0');
    }
    frac3.truncate(3);

    let field = |tok: Option<&str>| -> Option<i64> {
        match tok.unwrap_or("").trim().parse::<i64>() {
            Ok(v) => Some(v),
            Err(_) if !strict => Some(0),
            Err(_) => None,
        }
    };

    let hours = field(h)?;
    let minutes = field(m)?;
    let seconds = field(Some(s))?;
    let millis = field(Some(frac3.as_str()))?;
    Some((hours * 3600 + minutes * 60 + seconds) * 1000 + millis)
}

/// Degraded-but-total parse: time-of-day values zero their bad fragments,
/// date-bearing values fall back to `fallback` (the caller's series start).
fn parse_or(raw: &str, family: FormatFamily, fallback: EpochMs) -> EpochMs {
    match family {
        FormatFamily::DateBearing => parse(raw, family).unwrap_or(fallback),
        FormatFamily::TimeOfDay => parse_time_of_day(raw, false).unwrap_or(fallback),
    }
}

// ---------------------------------------------------------------------------
// Elapsed-time deriver
// ---------------------------------------------------------------------------

/// Milliseconds elapsed since the first sample, one entry per sample.
///
/// `elapsed[0]` is always 0. Samples are assumed non-decreasing in time;
/// out-of-order input passes through unaltered (the chart will show it —
/// a data-quality issue upstream, not a parser error).
pub fn derive_elapsed(series: &[RawSample]) -> Vec<EpochMs> {
    let Some(first) = series.first() else {
        return Vec::new();
    };
    let family = FormatFamily::detect(&first.timestamp);
    let t0 = parse_or(&first.timestamp, family, 0);

    series
        .iter()
        .map(|s| parse_or(&s.timestamp, family, t0) - t0)
        .collect()
}

// ---------------------------------------------------------------------------
// Axis anchor resolver
// ---------------------------------------------------------------------------

fn instant_at(date: NaiveDate, hour: u32, minute: u32) -> EpochMs {
    let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
    date.and_time(time).and_utc().timestamp_millis()
}

/// The instant assigned to `elapsed == 0`, shared by the series axis and the
/// episode mapper so overlays always land on the same scale.
fn axis_base(family: FormatFamily, t0: EpochMs, anchor: Option<AnchorSpec>) -> EpochMs {
    let today = Local::now().date_naive();
    match anchor {
        Some(a) => instant_at(today, a.hour, a.minute),
        // Date-bearing timestamps are already absolute; bare times get
        // pinned to local midnight of today.
        None => match family {
            FormatFamily::DateBearing => t0,
            FormatFamily::TimeOfDay => instant_at(today, 0, 0),
        },
    }
}

/// Convert a raw series into absolute chart instants.
///
/// Output length and order mirror the input, and relative spacing equals
/// [`derive_elapsed`] exactly: the anchor only moves the series, never
/// reshapes it.
pub fn resolve_axis(series: &[RawSample], anchor: Option<AnchorSpec>) -> Vec<EpochMs> {
    let Some(first) = series.first() else {
        return Vec::new();
    };
    let family = FormatFamily::detect(&first.timestamp);
    let t0 = parse_or(&first.timestamp, family, 0);
    let base = axis_base(family, t0, anchor);

    derive_elapsed(series).into_iter().map(|e| base + e).collect()
}

// ---------------------------------------------------------------------------
// Episode mapper
// ---------------------------------------------------------------------------

/// Map one tremor episode's boundaries into the axis produced by
/// [`resolve_axis`] for the same `series` and `anchor`.
///
/// An unparseable bound degrades to the series start rather than aborting
/// the render; overlay placement is best-effort, never fatal.
pub fn map_episode(ep: &EpisodeWindow, series: &[RawSample], anchor: Option<AnchorSpec>) -> EpisodeSpan {
    let family = series
        .first()
        .map(|s| FormatFamily::detect(&s.timestamp))
        .unwrap_or(FormatFamily::TimeOfDay);
    let t0 = series
        .first()
        .map(|s| parse_or(&s.timestamp, family, 0))
        .unwrap_or(0);
    let base = axis_base(family, t0, anchor);

    let map_bound = |raw: &str| -> EpochMs {
        let rel = match parse(raw, family) {
            Ok(t) => t - t0,
            Err(_) => 0,
        };
        base + rel
    };

    EpisodeSpan {
        start: map_bound(&ep.start),
        end: map_bound(&ep.end),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn series(timestamps: &[&str]) -> Vec<RawSample> {
        timestamps
            .iter()
            .map(|t| RawSample {
                timestamp: t.to_string(),
                value: 0.0,
            })
            .collect()
    }

    fn today_at(hour: u32, minute: u32) -> EpochMs {
        instant_at(Local::now().date_naive(), hour, minute)
    }

    #[test]
    fn detects_family_from_separators() {
        assert_eq!(FormatFamily::detect("08:31:20"), FormatFamily::TimeOfDay);
        assert_eq!(
            FormatFamily::detect("1900-01-01 00:00:07.390000"),
            FormatFamily::DateBearing
        );
        assert_eq!(
            FormatFamily::detect("2025/12/14 08:31:20"),
            FormatFamily::DateBearing
        );
    }

    #[test]
    fn parses_bare_time_with_and_without_fraction() {
        let base = ((8 * 3600 + 31 * 60 + 20) * 1000) as EpochMs;
        assert_eq!(parse("08:31:20", FormatFamily::TimeOfDay).unwrap(), base);
        assert_eq!(
            parse("08:31:20.5", FormatFamily::TimeOfDay).unwrap(),
            base + 500
        );
        assert_eq!(
            parse("08:31:20.500", FormatFamily::TimeOfDay).unwrap(),
            base + 500
        );
        // Over-long fractions truncate to milliseconds.
        assert_eq!(
            parse("08:31:20.500999", FormatFamily::TimeOfDay).unwrap(),
            base + 500
        );
    }

    #[test]
    fn strict_parse_rejects_malformed_input() {
        assert!(parse("08:xx:20", FormatFamily::TimeOfDay).is_err());
        assert!(parse("08:31", FormatFamily::TimeOfDay).is_err());
        assert!(parse("not a date", FormatFamily::DateBearing).is_err());
    }

    #[test]
    fn parses_date_bearing_variants() {
        let a = parse("1900-01-01 00:00:07.000", FormatFamily::DateBearing).unwrap();
        let b = parse("1900-01-01T00:00:07", FormatFamily::DateBearing).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn elapsed_starts_at_zero_and_tracks_offsets() {
        let s = series(&["08:31:20", "08:31:21.500", "08:31:23"]);
        assert_eq!(derive_elapsed(&s), vec![0, 1500, 3000]);

        let s = series(&["1900-01-01 00:00:07.000", "1900-01-01 00:00:09.000"]);
        assert_eq!(derive_elapsed(&s), vec![0, 2000]);
    }

    // A malformed sample mid-series must degrade to a finite value and
    // must not disturb its neighbours.
    #[test]
    fn malformed_sample_degrades_without_error() {
        let s = series(&["08:31:20", "08:xx:20"]);
        let elapsed = derive_elapsed(&s);
        assert_eq!(elapsed[0], 0);
        // Bad minute fragment reads as 0 → 08:00:20, 31 minutes before t0.
        assert_eq!(elapsed[1], -(31 * 60 * 1000));
    }

    #[test]
    fn date_axis_without_anchor_is_the_parsed_instants() {
        let s = series(&["1900-01-01 00:00:07.000", "1900-01-01 00:00:09.000"]);
        let axis = resolve_axis(&s, None);
        for (sample, instant) in s.iter().zip(&axis) {
            assert_eq!(
                *instant,
                parse(&sample.timestamp, FormatFamily::DateBearing).unwrap()
            );
        }
        assert_eq!(axis[1] - axis[0], 2000);
    }

    #[test]
    fn bare_time_axis_without_anchor_starts_at_midnight() {
        let s = series(&["00:00:00", "00:00:02"]);
        let axis = resolve_axis(&s, None);
        assert_eq!(axis[0], today_at(0, 0));
        assert_eq!(axis[1], today_at(0, 0) + 2000);
    }

    #[test]
    fn anchored_axis_relocates_without_reshaping() {
        let s = series(&["08:31:20", "08:31:21.500"]);
        let anchor = AnchorSpec { hour: 9, minute: 0 };
        let axis = resolve_axis(&s, Some(anchor));
        assert_eq!(axis[0], today_at(9, 0));
        assert_eq!(axis[1], today_at(9, 0) + 1500);
    }

    #[test]
    fn shape_preservation_holds_for_every_anchor_choice() {
        let s = series(&["08:31:20", "08:31:21.500", "08:31:25"]);
        let elapsed = derive_elapsed(&s);
        for anchor in [None, Some(AnchorSpec { hour: 14, minute: 30 })] {
            let axis = resolve_axis(&s, anchor);
            assert_eq!(axis.len(), s.len());
            for (i, e) in elapsed.iter().enumerate() {
                assert_eq!(axis[i] - axis[0], *e);
            }
        }
    }

    #[test]
    fn resolve_axis_is_pure() {
        let s = series(&["08:31:20", "08:31:21.500"]);
        let anchor = Some(AnchorSpec { hour: 9, minute: 0 });
        assert_eq!(resolve_axis(&s, anchor), resolve_axis(&s, anchor));
    }

    #[test]
    fn episode_at_series_start_lands_on_axis_start() {
        let cases: &[(&[&str], Option<AnchorSpec>)] = &[
            (&["08:31:20", "08:31:50"], None),
            (&["08:31:20", "08:31:50"], Some(AnchorSpec { hour: 9, minute: 0 })),
            (&["1900-01-01 00:00:07.000", "1900-01-01 00:00:09.000"], None),
        ];
        for (timestamps, anchor) in cases {
            let s = series(timestamps);
            let ep = EpisodeWindow {
                start: timestamps[0].to_string(),
                end: timestamps[1].to_string(),
                amplitude: 1.0,
            };
            let axis = resolve_axis(&s, *anchor);
            let span = map_episode(&ep, &s, *anchor);
            assert_eq!(span.start, axis[0]);
            assert_eq!(span.end, axis[1]);
        }
    }

    #[test]
    fn unparseable_episode_bound_degrades_to_series_start() {
        let s = series(&["08:31:20", "08:31:50"]);
        let anchor = Some(AnchorSpec { hour: 9, minute: 0 });
        let ep = EpisodeWindow {
            start: "garbage".to_string(),
            end: "08:31:50".to_string(),
            amplitude: 0.5,
        };
        let axis = resolve_axis(&s, anchor);
        let span = map_episode(&ep, &s, anchor);
        assert_eq!(span.start, axis[0]);
        assert_eq!(span.end, axis[1]);
    }

    #[test]
    fn anchor_spec_parses_form_field() {
        assert_eq!(
            AnchorSpec::from_hhmm("09:05"),
            Some(AnchorSpec { hour: 9, minute: 5 })
        );
        assert_eq!(AnchorSpec::from_hhmm(" 23:59 "), Some(AnchorSpec { hour: 23, minute: 59 }));
        assert_eq!(AnchorSpec::from_hhmm("24:00"), None);
        assert_eq!(AnchorSpec::from_hhmm("9"), None);
        assert_eq!(AnchorSpec::from_hhmm(""), None);
    }
}
