//! Structural validation for matched pattern spans. Each function takes the
//! raw matched text and returns whether it is plausible for its pattern
//! type; false positives from the regex pass (e.g. a CPT-code-shaped ZIP
//! code) are filtered here rather than by tightening the regex into
//! unreadability.

pub fn validate_icd10(text: &str) -> bool {
    let mut chars = text.chars();
    let first = match chars.next() {
        Some(c) => c,
        None => return false,
    };
    if !first.is_ascii_uppercase() || first == 'U' {
        return false;
    }
    let rest: String = chars.collect();
    let digits: String = rest.chars().take(2).collect();
    digits.len() == 2 && digits.chars().all(|c| c.is_ascii_digit())
}

pub fn validate_cpt(text: &str) -> bool {
    text.len() == 5 && text.chars().all(|c| c.is_ascii_digit()) && !text.starts_with('0')
}

pub fn validate_usc_title(text: &str) -> bool {
    let digits: String = text.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse::<u32>().map(|title| (1..=54).contains(&title) && title != 53).unwrap_or(false)
}

pub fn validate_route(text: &str) -> bool {
    matches!(text.to_ascii_uppercase().as_str(), "PO" | "IV" | "IM" | "SC" | "SL" | "PR")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn icd10_rejects_leading_u() {
        assert!(!validate_icd10("U07.1"));
        assert!(validate_icd10("E11.9"));
    }

    #[test]
    fn cpt_rejects_leading_zero() {
        assert!(!validate_cpt("01234"));
        assert!(validate_cpt("99213"));
    }

    #[test]
    fn usc_title_must_be_in_range() {
        assert!(validate_usc_title("42"));
        assert!(!validate_usc_title("99"));
    }

    #[test]
    fn usc_title_53_is_excluded() {
        assert!(!validate_usc_title("53"));
    }
}
