use logsift::error::FilterFileError;
use logsift::filter::{
    FilterDefinition, FilterList, FilterRecord, Rgb, from_json, load_filters, save_filters,
};
use tempfile::TempDir;

#[test]
fn test_saved_filters_reload_identically() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("errors.flt");
    let records = vec![
        FilterRecord::new(FilterDefinition::text("timeout"))
            .with_colors(Some(Rgb(255, 128, 0)), Some(Rgb(0, 0, 0)))
            .with_description("slow upstream"),
        FilterRecord::new(FilterDefinition::logic("db && retry").case_sensitive(true)).disabled(),
        FilterRecord::new(FilterDefinition::marker(3).excluding(true)),
    ];

    save_filters(&path, &records).unwrap();
    let loaded = load_filters(&path).unwrap();
    assert_eq!(loaded, records);

    let mut list = FilterList::new();
    list.extend(loaded).unwrap();
    assert_eq!(list.get(2).unwrap().name(), "c");
    assert!(!list.get(1).unwrap().is_enabled());
}

#[test]
fn test_filter_file_with_partial_fields() {
    let raw = r##"[
        {
            "filterType": "text",
            "filterText": "WARN",
            "isExcluded": false,
            "isCaseSensitive": true,
            "isRegularExpression": false,
            "isLogicOperation": false,
            "foregroundColor": "#FFA500"
        },
        { "filterType": "marker", "marker": 2 }
    ]"##;
    let records = from_json(raw).unwrap();
    assert_eq!(records.len(), 2);
    assert!(records[0].enabled);
    assert!(records[0].definition.case_sensitive);
    assert_eq!(records[0].foreground, Some(Rgb(0xFF, 0xA5, 0x00)));
    assert_eq!(records[0].background, None);
    assert_eq!(records[1].definition, FilterDefinition::marker(2));
}

#[test]
fn test_invalid_entry_names_its_position() {
    let raw = r#"[{"filterText": "ok"}, {"filterText": "(", "isRegularExpression": true}]"#;
    match from_json(raw) {
        Err(FilterFileError::Invalid { position, .. }) => assert_eq!(position, 1),
        other => panic!("expected invalid entry, got {other:?}"),
    }
}

#[test]
fn test_missing_file_is_read_error() {
    let dir = TempDir::new().unwrap();
    let err = load_filters(&dir.path().join("absent.flt")).unwrap_err();
    assert!(matches!(err, FilterFileError::Read { .. }));
}
