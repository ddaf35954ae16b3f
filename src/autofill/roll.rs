use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Section {
    A,
    B,
    C,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::A => "A",
            Section::B => "B",
            Section::C => "C",
        }
    }

    /// Sections are assigned in blocks of roll serials: 1-60, 61-120, 121-181.
    pub fn from_serial(serial: u32) -> Option<Self> {
        match serial {
            0..=60 => Some(Section::A),
            61..=120 => Some(Section::B),
            121..=181 => Some(Section::C),
            _ => None,
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollInfo {
    pub cohort_series: Option<String>,
    pub section: Option<Section>,
}

/// Splits a roll number like `2201059` into its admission series (`22`) and
/// section (`A`, from the serial `059`). Never fails: malformed input just
/// yields `None` parts.
pub fn classify(roll: &str) -> RollInfo {
    let roll = roll.trim();
    let chars: Vec<char> = roll.chars().collect();

    let cohort_series = if chars.len() >= 2 {
        Some(chars[..2].iter().collect())
    } else {
        None
    };

    let section = if chars.len() >= 3 {
        let tail = &chars[chars.len() - 3..];
        if tail.iter().all(|c| c.is_ascii_digit()) {
            tail.iter()
                .collect::<String>()
                .parse::<u32>()
                .ok()
                .and_then(Section::from_serial)
        } else {
            None
        }
    } else {
        None
    };

    RollInfo {
        cohort_series,
        section,
    }
}

pub fn section_from_roll(roll: &str) -> Option<Section> {
    classify(roll).section
}

pub fn series_from_roll(roll: &str) -> Option<String> {
    classify(roll).cohort_series
}
