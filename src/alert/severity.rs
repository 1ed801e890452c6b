//! Water-level severity classification.
//!
//! `SEVERITY_BANDS` is the single table every view reads from: pin colours,
//! the map legend, and dashboard table highlighting all derive from it, so a
//! threshold change here cannot leave the legend contradicting the map.

use std::fmt;

/// Severity levels, in ascending order of severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Normal,
    Moderate,
    Warning,
    HighAlert,
    Critical,
}

impl Severity {
    /// Label shown in pin info panels and legends.
    pub fn label(self) -> &'static str {
        self.band().label
    }

    /// Fill colour used for pins and legend swatches.
    pub fn color(self) -> &'static str {
        self.band().color
    }

    /// High Alert and Critical pins get the pulsing treatment.
    pub fn pulses(self) -> bool {
        self >= Severity::HighAlert
    }

    fn band(self) -> &'static SeverityBand {
        SEVERITY_BANDS
            .iter()
            .find(|b| b.severity == self)
            .unwrap_or(&SEVERITY_BANDS[SEVERITY_BANDS.len() - 1])
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One row of the classification table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeverityBand {
    pub severity: Severity,
    /// Inclusive lower bound in centimeters. `None` for the catch-all band.
    pub lower_bound_cm: Option<f64>,
    pub label: &'static str,
    pub color: &'static str,
}

/// Classification table, highest band first. Bounds are inclusive, so a level
/// sitting exactly on a boundary lands in the higher band.
pub static SEVERITY_BANDS: [SeverityBand; 5] = [
    SeverityBand {
        severity: Severity::Critical,
        lower_bound_cm: Some(80.0),
        label: "Critical",
        color: "#ef4444",
    },
    SeverityBand {
        severity: Severity::HighAlert,
        lower_bound_cm: Some(70.0),
        label: "High Alert",
        color: "#f97316",
    },
    SeverityBand {
        severity: Severity::Warning,
        lower_bound_cm: Some(50.0),
        label: "Warning",
        color: "#fbbf24",
    },
    SeverityBand {
        severity: Severity::Moderate,
        lower_bound_cm: Some(30.0),
        label: "Moderate",
        color: "#3b82f6",
    },
    SeverityBand {
        severity: Severity::Normal,
        lower_bound_cm: None,
        label: "Normal",
        color: "#10b981",
    },
];

/// Result of classifying one water level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub severity: Severity,
    pub color: &'static str,
    pub label: &'static str,
}

/// Classifies a water level (cm) into its severity band.
///
/// Total over every `f64`: values below 30, negative values and NaN all
/// classify as Normal, since no lower bound compares true against them.
pub fn classify(water_level_cm: f64) -> Classification {
    let band = SEVERITY_BANDS
        .iter()
        .find(|b| match b.lower_bound_cm {
            Some(lower) => water_level_cm >= lower,
            None => true,
        })
        .unwrap_or(&SEVERITY_BANDS[SEVERITY_BANDS.len() - 1]);

    Classification {
        severity: band.severity,
        color: band.color,
        label: band.label,
    }
}

// ---------------------------------------------------------------------------
// Legend
// ---------------------------------------------------------------------------

/// One swatch of the map legend.
#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub severity: Severity,
    pub color: &'static str,
    /// Inclusive lower bound of the bucket (0 for the lowest bucket).
    pub from_cm: f64,
    /// Exclusive upper bound, `None` for the open-ended top bucket.
    pub to_cm: Option<f64>,
    /// Text shown next to the swatch, e.g. "30-50cm" or "80+cm".
    pub caption: String,
}

/// Builds the map legend, lowest band first, from `SEVERITY_BANDS`.
pub fn legend() -> Vec<LegendEntry> {
    let mut entries = Vec::with_capacity(SEVERITY_BANDS.len());
    let mut upper: Option<f64> = None;

    for band in SEVERITY_BANDS.iter() {
        let from_cm = band.lower_bound_cm.unwrap_or(0.0);
        let caption = match upper {
            Some(to) => format!("{}-{}cm", from_cm, to),
            None => format!("{}+cm", from_cm),
        };
        entries.push(LegendEntry {
            severity: band.severity,
            color: band.color,
            from_cm,
            to_cm: upper,
            caption,
        });
        upper = Some(from_cm);
    }

    entries.reverse();
    entries
}
