//! Converts between `KbLookupResult` and the closed `CacheValue` shape so a
//! KB answer can cross the multi-tier cache boundary.

use enrichment_domain::repositories::{CacheValue, KbLookupResult};
use std::collections::HashMap;

pub fn to_cache_value(result: &KbLookupResult) -> CacheValue {
    let mut map = HashMap::new();
    map.insert("entity_id".to_string(), CacheValue::String(result.entity_id.clone()));
    map.insert("canonical_name".to_string(), CacheValue::String(result.canonical_name.clone()));
    map.insert(
        "definition".to_string(),
        result.definition.clone().map(CacheValue::String).unwrap_or(CacheValue::Null),
    );
    map.insert(
        "semantic_types".to_string(),
        CacheValue::List(result.semantic_types.iter().cloned().map(CacheValue::String).collect()),
    );
    let relationships = result
        .relationships
        .iter()
        .map(|(k, v)| (k.clone(), CacheValue::List(v.iter().cloned().map(CacheValue::String).collect())))
        .collect();
    map.insert("relationships".to_string(), CacheValue::Map(relationships));
    CacheValue::Map(map)
}

pub fn from_cache_value(value: &CacheValue) -> Option<KbLookupResult> {
    let CacheValue::Map(map) = value else {
        return None;
    };
    let entity_id = match map.get("entity_id") {
        Some(CacheValue::String(s)) => s.clone(),
        _ => return None,
    };
    let canonical_name = match map.get("canonical_name") {
        Some(CacheValue::String(s)) => s.clone(),
        _ => return None,
    };
    let definition = match map.get("definition") {
        Some(CacheValue::String(s)) => Some(s.clone()),
        _ => None,
    };
    let semantic_types = match map.get("semantic_types") {
        Some(CacheValue::List(items)) => items
            .iter()
            .filter_map(|v| if let CacheValue::String(s) = v { Some(s.clone()) } else { None })
            .collect(),
        _ => Default::default(),
    };
    let relationships = match map.get("relationships") {
        Some(CacheValue::Map(m)) => m
            .iter()
            .map(|(k, v)| {
                let list = if let CacheValue::List(items) = v {
                    items
                        .iter()
                        .filter_map(|item| if let CacheValue::String(s) = item { Some(s.clone()) } else { None })
                        .collect()
                } else {
                    Vec::new()
                };
                (k.clone(), list)
            })
            .collect(),
        _ => HashMap::new(),
    };
    Some(KbLookupResult { entity_id, canonical_name, definition, semantic_types, relationships })
}
