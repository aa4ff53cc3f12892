//! Personal names written to directory entries

use lessor_core::{LessorError, Result};

/// A person's name as written to a directory entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Username {
    /// ex. "Becca"
    pub first: String,
    /// ex. "A"
    pub initials: String,
    /// ex. "Petrin"
    pub last: String,
}

impl Username {
    pub fn new(first: impl Into<String>, initials: impl Into<String>, last: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            initials: initials.into(),
            last: last.into(),
        }
    }

    /// Check the name parts are formatted well enough to derive display
    /// fields from them.
    pub fn validate(&self) -> Result<()> {
        if !is_mixed_case(&self.first) {
            return Err(LessorError::InvalidNameFormat(format!(
                "expected first name {} to be mixed case, ex. 'Tien'",
                self.first
            )));
        }
        if !is_valid_initial(&self.initials) {
            return Err(LessorError::InvalidNameFormat(format!(
                "expected initial {} to be capitalized and without a period, ex. 'W'",
                self.initials
            )));
        }
        if !is_mixed_case(&self.last) {
            return Err(LessorError::InvalidNameFormat(format!(
                "expected last name {} to be mixed case, ex. 'Nguyen'",
                self.last
            )));
        }
        Ok(())
    }

    /// `First I. Last`
    pub fn full_name(&self) -> String {
        format!("{} {}. {}", self.first, self.initials, self.last)
    }
}

fn is_mixed_case(s: &str) -> bool {
    s.to_uppercase() != s && s.to_lowercase() != s
}

fn is_valid_initial(s: &str) -> bool {
    let mut chars = s.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if c.is_uppercase())
}
