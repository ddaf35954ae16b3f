#[cfg(test)]
mod tests {
    use crate::autofill::roll::{Section, classify, section_from_roll, series_from_roll};

    #[test]
    fn test_classify_standard_roll() {
        let info = classify("2201059");
        assert_eq!(info.cohort_series.as_deref(), Some("22"));
        assert_eq!(info.section, Some(Section::A));
    }

    #[test]
    fn test_section_boundaries() {
        assert_eq!(section_from_roll("2201001"), Some(Section::A));
        assert_eq!(section_from_roll("2201060"), Some(Section::A));
        assert_eq!(section_from_roll("2201061"), Some(Section::B));
        assert_eq!(section_from_roll("2201120"), Some(Section::B));
        assert_eq!(section_from_roll("2201121"), Some(Section::C));
        assert_eq!(section_from_roll("2201181"), Some(Section::C));
        assert_eq!(section_from_roll("2201182"), None);
        assert_eq!(section_from_roll("2201999"), None);
    }

    #[test]
    fn test_every_serial_in_a_block_gets_that_section() {
        for serial in 1..=181u32 {
            let roll = format!("2201{:03}", serial);
            let expected = match serial {
                1..=60 => Section::A,
                61..=120 => Section::B,
                _ => Section::C,
            };
            assert_eq!(section_from_roll(&roll), Some(expected), "roll {}", roll);
        }
    }

    #[test]
    fn test_short_rolls_yield_nothing() {
        let empty = classify("");
        assert_eq!(empty.cohort_series, None);
        assert_eq!(empty.section, None);

        let one = classify("2");
        assert_eq!(one.cohort_series, None);
        assert_eq!(one.section, None);

        // Two characters give a series but no serial to read a section from.
        let two = classify("22");
        assert_eq!(two.cohort_series.as_deref(), Some("22"));
        assert_eq!(two.section, None);
    }

    #[test]
    fn test_non_numeric_tail_has_no_section() {
        assert_eq!(section_from_roll("22010a9"), None);
        assert_eq!(section_from_roll("EEE-abc"), None);
        assert_eq!(series_from_roll("EEE-abc").as_deref(), Some("EE"));
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        let info = classify("  2201130 ");
        assert_eq!(info.cohort_series.as_deref(), Some("22"));
        assert_eq!(info.section, Some(Section::C));
    }

    #[test]
    fn test_section_display() {
        assert_eq!(Section::B.to_string(), "B");
        assert_eq!(Section::C.as_str(), "C");
    }
}
