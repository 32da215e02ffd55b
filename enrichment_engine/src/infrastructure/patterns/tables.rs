//! Built-in pattern table (§4.4 ADDED defaults): the five structured-span
//! patterns the reference `PatternMatcher` implementation registers.
//! Hosts may register additional patterns through the same descriptor
//! shape; nothing here is load-bearing for the stage itself, which only
//! depends on the `PatternMatcher` port.

use super::normalization::{normalize_code_upper, normalize_dosage, normalize_usc};
use super::validation::{validate_cpt, validate_icd10, validate_route, validate_usc_title};
use once_cell::sync::Lazy;
use regex::Regex;

pub struct PatternDescriptor {
    pub id: &'static str,
    pub entity_type: &'static str,
    pub regex: &'static Lazy<Regex>,
    pub base_confidence: f64,
    pub supporting_keywords: &'static [&'static str],
    pub negating_keywords: &'static [&'static str],
    pub priority: u8,
    pub validate: fn(&str) -> bool,
    pub normalize: fn(&str) -> String,
}

static ICD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-TV-Z][0-9]{2}(\.[0-9]{1,4})?\b").unwrap());
static CPT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[0-9]{5}\b").unwrap());
static USC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([0-9]{1,2})\s*U\.?S\.?C\.?\s*§?\s*([0-9]+)\b").unwrap());
static DOSAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[0-9]+(\.[0-9]+)?\s?(mg|mcg|g|ml|\x{b5}g|ug)\b").unwrap());
static ROUTE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(PO|IV|IM|SC|SL|PR)\b").unwrap());

pub static PATTERNS: Lazy<Vec<PatternDescriptor>> = Lazy::new(|| {
    vec![
        PatternDescriptor {
            id: "icd10",
            entity_type: "ICD_CODE",
            regex: &ICD_RE,
            base_confidence: 0.8,
            supporting_keywords: &["diagnosis", "dx", "icd"],
            negating_keywords: &["highway", "route"],
            priority: 3,
            validate: validate_icd10,
            normalize: normalize_code_upper,
        },
        PatternDescriptor {
            id: "cpt",
            entity_type: "CPT_CODE",
            regex: &CPT_RE,
            base_confidence: 0.6,
            supporting_keywords: &["procedure", "cpt"],
            negating_keywords: &["zip", "phone"],
            priority: 1,
            validate: validate_cpt,
            normalize: normalize_code_upper,
        },
        PatternDescriptor {
            id: "usc_citation",
            entity_type: "USC_CITATION",
            regex: &USC_RE,
            base_confidence: 0.85,
            supporting_keywords: &["title", "section", "statute"],
            negating_keywords: &[],
            priority: 4,
            validate: validate_usc_title,
            normalize: normalize_usc,
        },
        PatternDescriptor {
            id: "dosage",
            entity_type: "DOSAGE",
            regex: &DOSAGE_RE,
            base_confidence: 0.8,
            supporting_keywords: &["dose", "daily", "po"],
            negating_keywords: &[],
            priority: 2,
            validate: |_| true,
            normalize: normalize_dosage,
        },
        PatternDescriptor {
            id: "route",
            entity_type: "ROUTE",
            regex: &ROUTE_RE,
            base_confidence: 0.85,
            supporting_keywords: &["daily", "dose", "administer"],
            negating_keywords: &[],
            priority: 2,
            validate: validate_route,
            normalize: normalize_code_upper,
        },
    ]
});
