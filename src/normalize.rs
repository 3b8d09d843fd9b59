use crate::config::BackupConfig;
use crate::model::Platform;

/// Prefix of the volatile synchronization line some switches rewrite on
/// every poll
const CLOCK_PERIOD_PREFIX: &str = "ntp clock-period";

/// Normalize a raw device configuration for comparison
///
/// Applies the platform-conditional fixes in a fixed order: clock-period
/// suppression first, then line-feed collapsing. Each fix runs only when
/// its toggle is enabled and the platform is in the corresponding set.
/// The result is used for diffing only; the raw text is what gets stored.
pub fn normalize(raw: &str, platform: &Platform, config: &BackupConfig) -> String {
    let mut text = if config.clock_period_fix_applies(platform) {
        strip_clock_period(raw)
    } else {
        raw.to_string()
    };
    if config.line_feed_fix_applies(platform) {
        text = collapse_line_feeds(&text);
    }
    text
}

/// Remove every clock-period line from a configuration
///
/// Dropped lines take their terminator with them; all remaining bytes,
/// terminators included, are left untouched.
pub fn strip_clock_period(raw: &str) -> String {
    raw.split_inclusive('\n')
        .filter(|line| !line.trim_start().starts_with(CLOCK_PERIOD_PREFIX))
        .collect()
}

/// Collapse each run of consecutive line feeds into a single one
///
/// Text without repeated terminators passes through unchanged. Carriage
/// returns break a run, so CRLF-terminated blank lines are not touched.
pub fn collapse_line_feeds(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_was_newline = false;
    for ch in raw.chars() {
        if ch == '\n' {
            if last_was_newline {
                continue;
            }
            last_was_newline = true;
        } else {
            last_was_newline = false;
        }
        out.push(ch);
    }
    out
}
