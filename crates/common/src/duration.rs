//! A duration that deserializes from either a numeric nanosecond count or
//! a textual duration string ("30s", "500ms"), matching the dual-mode
//! encoding the viewer's `SessionConfig` frame uses.

use std::time::Duration as StdDuration;

use serde::de::{self, Deserialize, Deserializer};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Duration(#[serde(skip)] StdDuration);

impl Duration {
    pub fn as_std(self) -> StdDuration {
        self.0
    }
}

impl From<StdDuration> for Duration {
    fn from(d: StdDuration) -> Self {
        Duration(d)
    }
}

impl<'de> Deserialize<'de> for Duration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Nanos(u64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Nanos(ns) => Ok(Duration(StdDuration::from_nanos(ns))),
            Repr::Text(s) => parse_textual(&s)
                .map(Duration)
                .map_err(de::Error::custom),
        }
    }
}

/// Parses strings like "30s", "500ms", "1m", "2h" into a [`StdDuration`].
fn parse_textual(s: &str) -> Result<StdDuration, String> {
    let split_at = s
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .ok_or_else(|| format!("invalid duration: {s:?}"))?;
    let (value, unit) = s.split_at(split_at);
    let value: f64 = value
        .parse()
        .map_err(|_| format!("invalid duration: {s:?}"))?;

    let millis = match unit {
        "ns" => value / 1_000_000.0,
        "us" | "\u{b5}s" => value / 1_000.0,
        "ms" => value,
        "s" => value * 1_000.0,
        "m" => value * 60_000.0,
        "h" => value * 3_600_000.0,
        other => return Err(format!("unknown duration unit: {other:?}")),
    };

    Ok(StdDuration::from_secs_f64(millis / 1_000.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_seconds() {
        assert_eq!(parse_textual("30s").unwrap(), StdDuration::from_secs(30));
    }

    #[test]
    fn parses_millis() {
        assert_eq!(
            parse_textual("500ms").unwrap(),
            StdDuration::from_millis(500)
        );
    }

    #[test]
    fn deserializes_numeric_as_nanos() {
        let d: Duration = serde_json::from_str("1500000000").unwrap();
        assert_eq!(d.as_std(), StdDuration::from_millis(1500));
        let d: Duration = serde_json::from_str("500000000").unwrap();
        assert_eq!(d.as_std(), StdDuration::from_millis(500));
    }

    #[test]
    fn deserializes_textual() {
        let d: Duration = serde_json::from_str("\"10s\"").unwrap();
        assert_eq!(d.as_std(), StdDuration::from_secs(10));
    }
}
