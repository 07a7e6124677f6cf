use tps_core::{words, CostClass, TokenCategory, Vocabulary, VocabularyError};

#[test]
fn core_words_translate_both_ways() {
    let vocabulary = Vocabulary::with_core_words();

    assert_eq!(vocabulary.translate("distance"), Some(words::DISTANCE));
    assert_eq!(vocabulary.name(words::DISTANCE), Some("distance"));
    assert_eq!(vocabulary.translate("hidespots"), Some(words::HIDESPOTS));
    assert_eq!(
        vocabulary.name(words::REFERENCE_POINT_OFFSET),
        Some("referencePointOffsettedByItsForwardDirection")
    );
    assert_eq!(vocabulary.translate("Distance"), None);
}

#[test]
fn every_glue_synonym_maps_to_glue() {
    let vocabulary = Vocabulary::with_core_words();

    for word in ["glue", "from", "to", "at", "the", "of", "for"] {
        assert_eq!(vocabulary.translate(word), Some(words::GLUE), "{word}");
    }
    assert_eq!(vocabulary.name(words::GLUE), Some("glue"));
}

#[test]
fn core_costs_follow_their_class() {
    let vocabulary = Vocabulary::with_core_words();
    let threshold = tps_core::Cost::CHEAP_THRESHOLD;

    let distance = vocabulary.cost(words::DISTANCE).unwrap();
    assert!(distance.is_cheap(threshold));

    let reachable = vocabulary.cost(words::REACHABLE).unwrap();
    assert!(!reachable.is_cheap(threshold));
    assert!(!reachable.is_deferred());

    let visible = vocabulary.cost(words::VISIBLE).unwrap();
    assert!(visible.is_deferred());

    // Medium words sit on the expensive side of the default threshold.
    let hostiles = vocabulary.cost(words::HOSTILES_DISTANCE).unwrap();
    assert!(!hostiles.is_cheap(threshold));

    assert!(vocabulary.cost(words::GRID).is_none());
    assert!(vocabulary.cost(words::PUPPET).is_none());
}

#[test]
fn costs_within_a_class_are_distinct() {
    let vocabulary = Vocabulary::with_core_words();

    let a = vocabulary.cost(words::COVER_SOFT).unwrap();
    let b = vocabulary.cost(words::COVER_SUPERIOR).unwrap();
    assert_ne!(a, b);
    assert!(a < b);
}

#[test]
fn extension_allocates_above_core_range() {
    let mut vocabulary = Vocabulary::with_core_words();

    let first = vocabulary
        .extend("inShadow", TokenCategory::BoolProperty, Some(CostClass::Cheap))
        .unwrap();
    let second = vocabulary
        .extend("nearWater", TokenCategory::BoolProperty, Some(CostClass::Medium))
        .unwrap();

    assert!(first.is_extension());
    assert_eq!(first.category(), TokenCategory::BoolProperty);
    assert_eq!(second.index(), first.index() + 1);
    assert_eq!(vocabulary.translate("inShadow"), Some(first));
    assert_eq!(vocabulary.name(second), Some("nearWater"));
}

#[test]
fn extension_without_cost_defaults_to_expensive() {
    let mut vocabulary = Vocabulary::with_core_words();

    let token = vocabulary
        .extend("lightLevel", TokenCategory::RealProperty, None)
        .unwrap();
    let cost = vocabulary.cost(token).unwrap();

    assert!(!cost.is_deferred());
    assert!(!cost.is_cheap(tps_core::Cost::CHEAP_THRESHOLD));
}

#[test]
fn extension_rejects_duplicates_and_fixed_categories() {
    let mut vocabulary = Vocabulary::with_core_words();

    assert_eq!(
        vocabulary.extend("distance", TokenCategory::Measure, None),
        Err(VocabularyError::Duplicate("distance".to_owned()))
    );
    assert_eq!(
        vocabulary.extend("atLeast", TokenCategory::Limit, None),
        Err(VocabularyError::NotExtensible(TokenCategory::Limit))
    );
    assert!(matches!(
        vocabulary.extend("two_words", TokenCategory::Object, None),
        Err(VocabularyError::InvalidName(_))
    ));
}

#[test]
fn extension_space_runs_out() {
    let mut vocabulary = Vocabulary::with_core_words();
    let category = TokenCategory::Object;
    let room = category.capacity() - category.extension_start();

    for i in 0..room {
        vocabulary
            .extend(&format!("squadMate{i}"), category, None)
            .unwrap();
    }

    assert_eq!(
        vocabulary.extend("oneTooMany", category, None),
        Err(VocabularyError::Exhausted(category))
    );
}
