//! Accept header parsing and media type selection.

/// One entry of an `Accept` header.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRange {
    pub main: String,
    pub sub: String,
    pub quality: f32,
}

impl MediaRange {
    /// Parse a single range such as `text/html;q=0.8`.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split(';');
        let essence = parts.next()?.trim().to_ascii_lowercase();
        let (main, sub) = essence.split_once('/')?;
        if main.is_empty() || sub.is_empty() {
            return None;
        }

        let mut quality = 1.0;
        for param in parts {
            if let Some((key, value)) = param.split_once('=') {
                if key.trim().eq_ignore_ascii_case("q") {
                    quality = value.trim().parse::<f32>().ok()?.clamp(0.0, 1.0);
                }
            }
        }

        Some(Self {
            main: main.to_string(),
            sub: sub.to_string(),
            quality,
        })
    }

    pub fn is_wildcard(&self) -> bool {
        self.main == "*" && self.sub == "*"
    }

    /// Whether this range admits the concrete media type `offered`.
    pub fn admits(&self, offered: &str) -> bool {
        let Some((main, sub)) = offered.split_once('/') else {
            return false;
        };
        (self.main == "*" || self.main.eq_ignore_ascii_case(main))
            && (self.sub == "*" || self.sub.eq_ignore_ascii_case(sub))
    }
}

/// Parse an `Accept` header into ranges ordered by descending quality.
///
/// Malformed ranges and ranges with `q=0` are dropped; ties keep header order.
pub fn parse_accept(header: &str) -> Vec<MediaRange> {
    let mut ranges: Vec<MediaRange> = header
        .split(',')
        .filter_map(MediaRange::parse)
        .filter(|r| r.quality > 0.0)
        .collect();
    ranges.sort_by(|a, b| b.quality.total_cmp(&a.quality));
    ranges
}

/// Pick the media type to respond with.
///
/// Returns `Some("*/*")` when the client accepts anything (including a missing
/// or empty header), the first admitted offered type otherwise, and `None`
/// when nothing offered is acceptable.
pub fn negotiate<'a>(accept: Option<&str>, offered: &'a [String]) -> Option<&'a str> {
    let header = accept.map(str::trim).unwrap_or("");
    if header.is_empty() {
        return Some(super::WILDCARD);
    }

    for range in parse_accept(header) {
        if range.is_wildcard() {
            return Some(super::WILDCARD);
        }
        if let Some(found) = offered.iter().find(|o| range.admits(o)) {
            return Some(found.as_str());
        }
    }
    None
}
