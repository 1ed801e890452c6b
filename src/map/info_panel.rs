/// Content of the info panel attached to each map pin.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::alert::severity::classify;
use crate::alert::stalenesses::{is_stale_at, parse_timestamp};
use crate::model::LocationReading;

/// Title used when a reading carries neither an identifier nor a name.
pub const UNNAMED_PIN_TITLE: &str = "Drainage Point";

#[derive(Debug, Clone, PartialEq)]
pub struct InfoPanel {
    pub title: String,
    pub water_level_cm: f64,
    pub status_label: &'static str,
    pub color: &'static str,
    pub area: Option<String>,
    /// Timestamp formatted for display, or the raw text if it did not parse.
    pub timestamp: Option<String>,
    pub stale: bool,
}

impl InfoPanel {
    /// Builds the panel for `reading`. `stale_after_minutes` of `None`
    /// disables the staleness marker.
    pub fn for_reading(
        reading: &LocationReading,
        stale_after_minutes: Option<u64>,
        now: DateTime<Utc>,
    ) -> Self {
        let class = classify(reading.water_level);
        let title = reading
            .id
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(reading.name.as_deref())
            .unwrap_or(UNNAMED_PIN_TITLE)
            .to_string();

        let stale = match stale_after_minutes {
            // absent or unparseable timestamps are not flagged
            Some(max_age) => is_stale_at(reading, max_age, now).unwrap_or(false),
            None => false,
        };

        InfoPanel {
            title,
            water_level_cm: reading.water_level,
            status_label: class.label,
            color: class.color,
            area: reading.area.clone().filter(|a| !a.is_empty()),
            timestamp: reading.timestamp.as_deref().map(format_timestamp),
            stale,
        }
    }

    /// Panel rows in display order.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            self.title.clone(),
            format!("Water Level: {} cm", self.water_level_cm),
            format!("Status: {}", self.status_label),
        ];
        if let Some(area) = &self.area {
            lines.push(format!("Area: {}", area));
        }
        if let Some(ts) = &self.timestamp {
            if self.stale {
                lines.push(format!("{} (stale)", ts));
            } else {
                lines.push(ts.clone());
            }
        }
        lines
    }
}

impl fmt::Display for InfoPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines().join(" | "))
    }
}

fn format_timestamp(raw: &str) -> String {
    match parse_timestamp(raw) {
        Ok(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap()
    }

    fn reading() -> LocationReading {
        LocationReading {
            id: Some("A".to_string()),
            latitude: 10.0,
            longitude: 20.0,
            water_level: 85.0,
            area: Some("Harbourfront".to_string()),
            timestamp: Some("2024-05-01T12:30:00Z".to_string()),
            name: Some("Harbourfront Drain".to_string()),
        }
    }

    #[test]
    fn test_panel_shows_all_fields() {
        let panel = InfoPanel::for_reading(&reading(), None, now());
        assert_eq!(
            panel.lines(),
            vec![
                "A".to_string(),
                "Water Level: 85 cm".to_string(),
                "Status: Critical".to_string(),
                "Area: Harbourfront".to_string(),
                "2024-05-01 12:30:00 UTC".to_string(),
            ]
        );
        assert_eq!(panel.color, "#ef4444");
    }

    #[test]
    fn test_title_falls_back_to_name_then_placeholder() {
        let mut r = reading();
        r.id = None;
        assert_eq!(InfoPanel::for_reading(&r, None, now()).title, "Harbourfront Drain");
        r.name = None;
        assert_eq!(InfoPanel::for_reading(&r, None, now()).title, UNNAMED_PIN_TITLE);
    }

    #[test]
    fn test_optional_rows_are_omitted() {
        let mut r = reading();
        r.area = None;
        r.timestamp = None;
        assert_eq!(InfoPanel::for_reading(&r, None, now()).lines().len(), 3);
    }

    #[test]
    fn test_unparseable_timestamp_is_shown_verbatim() {
        let mut r = reading();
        r.timestamp = Some("yesterday".to_string());
        let panel = InfoPanel::for_reading(&r, Some(60), now());
        assert_eq!(panel.timestamp.as_deref(), Some("yesterday"));
        assert!(!panel.stale, "unparseable timestamps are never flagged stale");
    }

    #[test]
    fn test_old_reading_is_marked_stale() {
        let mut r = reading();
        r.timestamp = Some("2024-05-01 10:00:00".to_string());
        let panel = InfoPanel::for_reading(&r, Some(60), now());
        assert!(panel.stale);
        assert!(panel.lines().last().unwrap().ends_with("(stale)"));
    }
}
