use scripref::types::*;

#[test]
fn canonical_segment_display() {
    assert_eq!(CanonicalSegment::verse("John", 3, 16).to_string(), "John 3:16");
    assert_eq!(
        CanonicalSegment::range("1 Corinthians", 13, 4, 8).to_string(),
        "1 Corinthians 13:4-8"
    );
    assert_eq!(
        CanonicalSegment::whole_chapter("Psalm", 23).to_string(),
        "Psalm 23:1-176"
    );
    assert_eq!(
        CanonicalSegment::rest_of_chapter("Matthew", 5, 18).to_string(),
        "Matthew 5:18-176"
    );
}

#[test]
fn range_with_equal_bounds_renders_as_single_verse() {
    let segment = CanonicalSegment::range("2 John", 1, 3, 3);
    assert!(segment.is_single_verse());
    assert_eq!(segment.to_string(), "2 John 1:3");
}

#[test]
fn well_formed_segments() {
    assert!(CanonicalSegment::verse("John", 3, 16).is_well_formed());
    assert!(CanonicalSegment::whole_chapter("John", 3).is_well_formed());
    assert!(!CanonicalSegment::range("John", 11, 35, 30).is_well_formed());
    assert!(!CanonicalSegment::verse("John", 0, 16).is_well_formed());
    assert!(!CanonicalSegment::verse("John", 3, 0).is_well_formed());
}

#[test]
fn sentinel_is_longest_chapter() {
    assert_eq!(CHAPTER_END_SENTINEL, 176);
    assert_eq!(
        CanonicalSegment::whole_chapter("Psalm", 119).end_verse,
        CHAPTER_END_SENTINEL
    );
}

#[test]
fn stats_serialize_to_json() {
    let stats = StoreStats {
        verse_count: 31102,
        book_count: 66,
        chapter_count: 1189,
        translations: vec!["kjv".to_string()],
        db_size_bytes: 4096,
    };
    let json = serde_json::to_value(&stats).expect("serialize stats");
    assert_eq!(json["verse_count"], 31102);
    assert_eq!(json["translations"][0], "kjv");
}
