//! Display mapping for mastery and sentiment metrics.
//!
//! Stored values are never clamped; these helpers clamp only what is shown.

/// Qualitative band for a mastery percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasteryBand {
    Starting,
    Beginner,
    Learning,
    Proficient,
    Mastered,
}

impl MasteryBand {
    /// Band for a percentage in `[0, 100]`.
    pub fn from_percent(percent: u8) -> Self {
        match percent {
            80.. => Self::Mastered,
            60.. => Self::Proficient,
            40.. => Self::Learning,
            20.. => Self::Beginner,
            _ => Self::Starting,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Mastered => "Mastered",
            Self::Proficient => "Proficient",
            Self::Learning => "Learning",
            Self::Beginner => "Beginner",
            Self::Starting => "Starting",
        }
    }

    /// RGB accent used by the ring gauge.
    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            Self::Mastered => (63, 185, 80),
            Self::Proficient => (88, 166, 255),
            Self::Learning => (210, 153, 34),
            Self::Beginner => (219, 109, 40),
            Self::Starting => (248, 81, 73),
        }
    }
}

/// `round(score * 100)` clamped to `[0, 100]`; NaN maps to 0.
pub fn mastery_percent(score: f64) -> u8 {
    if score.is_nan() {
        return 0;
    }
    (score.clamp(0.0, 1.0) * 100.0).round() as u8
}

/// Fraction of the ring arc to fill.
pub fn ring_fraction(score: f64) -> f64 {
    f64::from(mastery_percent(score)) / 100.0
}

pub fn mastery_band(score: f64) -> MasteryBand {
    MasteryBand::from_percent(mastery_percent(score))
}

/// `"42%"` style label for any `[0, 1]` metric.
pub fn percent_label(value: f64) -> String {
    format!("{}%", mastery_percent(value))
}

/// Coarse frustration band shown next to the sentiment bar.
pub fn frustration_label(level: f64) -> &'static str {
    let level = if level.is_nan() { 0.0 } else { level };
    if level >= 0.7 {
        "high"
    } else if level >= 0.4 {
        "elevated"
    } else {
        "calm"
    }
}

/// Human label for a backend topic status.
pub fn topic_status_label(status: &str) -> &str {
    match status {
        "not_started" => "Not started",
        "in_progress" => "In progress",
        "mastered" => "Mastered",
        other => other,
    }
}
