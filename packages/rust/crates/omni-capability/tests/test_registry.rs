//! Tests for registry validation, lookup, and the record adapter.

use omni_capability::{CapabilityEntry, CapabilityError, CapabilityRegistry, parse_capability_records};

#[test]
fn test_registry_rejects_duplicate_and_empty_ids() {
    let duplicate = CapabilityRegistry::new(vec![
        CapabilityEntry::new("1", "a", "general"),
        CapabilityEntry::new("1", "b", "general"),
    ]);
    assert!(matches!(duplicate, Err(CapabilityError::DuplicateId(id)) if id == "1"));

    let empty = CapabilityRegistry::new(vec![CapabilityEntry::new("  ", "a", "general")]);
    assert!(matches!(empty, Err(CapabilityError::EmptyId(name)) if name == "a"));
}

#[test]
fn test_registry_lookup_and_categories() {
    let registry = CapabilityRegistry::new(vec![
        CapabilityEntry::new("3", "git_diff", "vcs"),
        CapabilityEntry::new("1", "read_file", "filesystem"),
        CapabilityEntry::new("2", "git_commit", "vcs"),
    ])
    .unwrap();

    assert_eq!(registry.len(), 3);
    assert_eq!(registry.categories(), vec!["filesystem", "vcs"]);
    let vcs: Vec<String> = registry
        .by_category("vcs")
        .iter()
        .map(|e| e.id.clone())
        .collect();
    assert_eq!(vcs, vec!["3", "2"]);
    assert_eq!(registry.resolve("git_commit").map(|e| e.id.as_str()), Some("2"));
    assert_eq!(registry.resolve("1").map(|e| e.name.as_str()), Some("read_file"));
    assert!(registry.get("git_commit").is_none());
}

#[test]
fn test_parse_records_fills_missing_fields() {
    let records = parse_capability_records(
        r#"[
            {"id": "search", "name": "search", "category": "search",
             "keywords": ["find", "lookup"], "lastUsedAt": "2025-05-30T00:00:00Z",
             "usageCount": 12.0},
            {"name": "bare"}
        ]"#,
    )
    .unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].keywords, vec!["find", "lookup"]);
    assert_eq!(records[0].usage_count, 12);
    assert!(records[0].last_used_at.is_some());

    let bare = &records[1];
    assert_eq!(bare.id, "bare");
    assert!(bare.category.is_empty());
    assert!(bare.tags.is_empty());
    assert!(bare.description.is_empty());
    assert_eq!(bare.usage_count, 0);
    assert!(bare.last_used_at.is_none());
}

#[test]
fn test_parse_records_rejects_malformed_json() {
    let err = parse_capability_records("{not json").unwrap_err();
    assert!(matches!(err, CapabilityError::Serialization(_)));
}
