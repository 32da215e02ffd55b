//! Canonical-form normalization applied to matched pattern text before it
//! becomes an `EntityRecord`'s `normalized_text`.

pub fn normalize_code_upper(text: &str) -> String {
    text.to_ascii_uppercase()
}

pub fn normalize_usc(text: &str) -> String {
    let digits_only: Vec<&str> = text
        .split(|c: char| !c.is_ascii_digit())
        .filter(|s| !s.is_empty())
        .collect();
    match digits_only.as_slice() {
        [title, section, ..] => format!("{title} U.S.C. § {section}"),
        _ => text.trim().to_string(),
    }
}

pub fn normalize_dosage(text: &str) -> String {
    let trimmed = text.trim();
    let split_at = trimmed.find(|c: char| c.is_ascii_alphabetic() || c == '\u{b5}').unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split_at);
    let unit = unit.trim().to_ascii_lowercase();
    let unit = match unit.as_str() {
        "µg" | "ug" => "mcg",
        other => other,
    };
    format!("{} {}", number.trim(), unit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usc_citation_normalizes_to_canonical_form() {
        assert_eq!(normalize_usc("42 USC 1983"), "42 U.S.C. § 1983");
        assert_eq!(normalize_usc("18 U.S.C. §242"), "18 U.S.C. § 242");
    }

    #[test]
    fn dosage_normalizes_unit_case_and_spacing() {
        assert_eq!(normalize_dosage("500MG"), "500 mg");
        assert_eq!(normalize_dosage("2.5 ML"), "2.5 ml");
    }

    #[test]
    fn dosage_unifies_microgram_spellings_to_mcg() {
        assert_eq!(normalize_dosage("50 µg"), "50 mcg");
        assert_eq!(normalize_dosage("50ug"), "50 mcg");
    }
}
