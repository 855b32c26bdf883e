use thiserror::Error;

const EARLIEST_BIRTH_YEAR: i32 = 1900;

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ValidationFailure {
    #[error("client name must not be empty")]
    EmptyClientName,
    #[error("date of birth must be DD/MM/YYYY with a plausible day, month and year")]
    InvalidDateOfBirth,
    #[error("custom amount must not be empty")]
    EmptyCustomAmount,
    #[error("custom term of payment must not be empty")]
    EmptyCustomTerm,
    #[error("notes must not be empty")]
    EmptyNotes,
}

/// Accepts `DD/MM/YYYY`. Day is only checked against 1..=31; there is no per-month or
/// leap-year check.
pub fn validate_date_of_birth(input: &str, current_year: i32) -> Result<(), ValidationFailure> {
    let mut parts = input.split('/');
    let (Some(day), Some(month), Some(year), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(ValidationFailure::InvalidDateOfBirth);
    };

    let day = parse_digits(day, 2)?;
    let month = parse_digits(month, 2)?;
    let year = parse_digits(year, 4)?;

    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return Err(ValidationFailure::InvalidDateOfBirth);
    }
    if !(EARLIEST_BIRTH_YEAR..=current_year).contains(&year) {
        return Err(ValidationFailure::InvalidDateOfBirth);
    }
    Ok(())
}

fn parse_digits(part: &str, width: usize) -> Result<i32, ValidationFailure> {
    if part.len() != width || !part.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(ValidationFailure::InvalidDateOfBirth);
    }
    part.parse::<i32>().map_err(|_| ValidationFailure::InvalidDateOfBirth)
}

/// "tidak" (any case) means no notes and is stored as a dash.
pub fn normalize_notes(input: &str) -> Result<String, ValidationFailure> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationFailure::EmptyNotes);
    }
    if trimmed.eq_ignore_ascii_case("tidak") {
        return Ok("-".to_owned());
    }
    Ok(trimmed.to_owned())
}

#[cfg(test)]
mod tests {
    use super::{normalize_notes, validate_date_of_birth, ValidationFailure};

    const YEAR: i32 = 2025;

    #[test]
    fn accepts_well_formed_dates() {
        assert_eq!(validate_date_of_birth("25/11/1990", YEAR), Ok(()));
        assert_eq!(validate_date_of_birth("01/01/1900", YEAR), Ok(()));
        assert_eq!(validate_date_of_birth("31/12/2025", YEAR), Ok(()));
    }

    #[test]
    fn day_range_is_loose_by_design() {
        assert_eq!(validate_date_of_birth("31/02/2020", YEAR), Ok(()));
        assert_eq!(validate_date_of_birth("30/02/2023", YEAR), Ok(()));
    }

    #[test]
    fn rejects_out_of_range_components() {
        let invalid = Err(ValidationFailure::InvalidDateOfBirth);
        assert_eq!(validate_date_of_birth("13/13/2020", YEAR), invalid);
        assert_eq!(validate_date_of_birth("00/10/2020", YEAR), invalid);
        assert_eq!(validate_date_of_birth("32/01/2020", YEAR), invalid);
        assert_eq!(validate_date_of_birth("01/01/1899", YEAR), invalid);
        assert_eq!(validate_date_of_birth("01/01/2026", YEAR), invalid);
    }

    #[test]
    fn rejects_malformed_shapes() {
        let invalid = Err(ValidationFailure::InvalidDateOfBirth);
        for input in ["1/1/1990", "01-01-1990", "01/01/90", "01/01/1990/1", "aa/bb/cccc", "", "+1/01/1990"] {
            assert_eq!(validate_date_of_birth(input, YEAR), invalid, "{input}");
        }
    }

    #[test]
    fn tidak_is_normalized_to_a_dash() {
        assert_eq!(normalize_notes("tidak"), Ok("-".to_owned()));
        assert_eq!(normalize_notes("  TIDAK "), Ok("-".to_owned()));
        assert_eq!(normalize_notes("tidak ada"), Ok("tidak ada".to_owned()));
        assert_eq!(normalize_notes("Perokok ringan"), Ok("Perokok ringan".to_owned()));
        assert_eq!(normalize_notes("   "), Err(ValidationFailure::EmptyNotes));
    }
}
