use serde::{Deserialize, Serialize};

use stockbook_core::{DomainError, LocationId};

/// A bin location, stored decomposed. The human-readable composite code
/// (`R10-1-11-FRONT`) is derived by [`Location::bin_code`] at read time and
/// never stored redundantly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub row_code: String,
    pub bay_num: String,
    pub level_code: String,
    pub side: String,
}

impl Location {
    /// Derived composite bin code: `{row}-{bay}-{level}-{side}`.
    pub fn bin_code(&self) -> String {
        format!(
            "{}-{}-{}-{}",
            self.row_code, self.bay_num, self.level_code, self.side
        )
    }

    /// Bay number as an integer. `bay_num` is stored as text but validated
    /// numeric at creation, so display ordering can sort it numerically.
    pub fn bay_number(&self) -> u32 {
        self.bay_num.parse().unwrap_or(0)
    }

    /// Display ordering key: `(row_code, bay as integer, level_code, side)`.
    pub fn sort_key(&self) -> (String, u32, String, String) {
        (
            self.row_code.clone(),
            self.bay_number(),
            self.level_code.clone(),
            self.side.clone(),
        )
    }
}

/// Validate the decomposed parts of a bin code.
///
/// Parts must be non-empty and must not contain `-` (the separator of the
/// derived composite code); `bay_num` must be a decimal integer string so
/// numeric ordering is well-defined.
pub fn validate_location_parts(
    row_code: &str,
    bay_num: &str,
    level_code: &str,
    side: &str,
) -> Result<(), DomainError> {
    for (name, part) in [
        ("row_code", row_code),
        ("bay_num", bay_num),
        ("level_code", level_code),
        ("side", side),
    ] {
        if part.trim().is_empty() {
            return Err(DomainError::validation(format!("{name} cannot be empty")));
        }
        if part.contains('-') {
            return Err(DomainError::validation(format!(
                "{name} cannot contain '-': {part}"
            )));
        }
    }
    if bay_num.parse::<u32>().is_err() {
        return Err(DomainError::validation(format!(
            "bay_num must be a decimal integer: {bay_num}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(id: i64, row: &str, bay: &str, level: &str, side: &str) -> Location {
        Location {
            id: LocationId::new(id),
            row_code: row.to_string(),
            bay_num: bay.to_string(),
            level_code: level.to_string(),
            side: side.to_string(),
        }
    }

    #[test]
    fn bin_code_concatenates_parts() {
        assert_eq!(loc(1, "R10", "1", "11", "FRONT").bin_code(), "R10-1-11-FRONT");
    }

    #[test]
    fn bay_sorts_numerically_not_lexically() {
        let mut bins = vec![
            loc(1, "R1", "10", "1", "FRONT"),
            loc(2, "R1", "2", "1", "FRONT"),
        ];
        bins.sort_by_key(|l| l.sort_key());
        assert_eq!(bins[0].bay_num, "2");
        assert_eq!(bins[1].bay_num, "10");
    }

    #[test]
    fn parts_are_validated() {
        assert!(validate_location_parts("R1", "2", "A", "FRONT").is_ok());
        assert!(validate_location_parts("", "2", "A", "FRONT").is_err());
        assert!(validate_location_parts("R1", "2a", "A", "FRONT").is_err());
        assert!(validate_location_parts("R1", "2", "A-B", "FRONT").is_err());
    }
}
