use tps_core::{
    parse, unparse, words, Criterion, CriterionValue, Limit, ParseError, TokenCategory,
    Vocabulary,
};

fn vocabulary() -> Vocabulary {
    Vocabulary::with_core_words()
}

#[test]
fn limited_measure_parses_into_all_slots() {
    let parsed = parse(&vocabulary(), "min_distance_from_attentionTarget").unwrap();

    assert_eq!(parsed.limit, Some(Limit::Min));
    assert_eq!(parsed.query, words::DISTANCE);
    assert_eq!(parsed.object, Some(words::ATTENTION_TARGET));
    assert_eq!(parsed.object_aux, None);
}

#[test]
fn property_takes_no_object() {
    let parsed = parse(&vocabulary(), "coverSuperior").unwrap();

    assert_eq!(parsed.query, words::COVER_SUPERIOR);
    assert_eq!(parsed.limit, None);
    assert_eq!(parsed.object, None);
}

#[test]
fn any_glue_synonym_links_the_object() {
    let vocabulary = vocabulary();
    let a = parse(&vocabulary, "visible_from_player").unwrap();
    let b = parse(&vocabulary, "visible_to_player").unwrap();
    let c = parse(&vocabulary, "visible_glue_player").unwrap();

    assert_eq!(a, b);
    assert_eq!(b, c);
}

#[test]
fn generator_with_object_fills_aux_then_primary() {
    let parsed = parse(
        &vocabulary(),
        "hidespots_from_attentionTarget_around_puppet",
    )
    .unwrap();

    assert_eq!(parsed.query, words::HIDESPOTS);
    assert_eq!(parsed.object_aux, Some(words::ATTENTION_TARGET));
    assert_eq!(parsed.object, Some(words::PUPPET));
}

#[test]
fn plain_generator_needs_around() {
    let vocabulary = vocabulary();

    let parsed = parse(&vocabulary, "grid_around_puppet").unwrap();
    assert_eq!(parsed.object, Some(words::PUPPET));

    assert!(matches!(
        parse(&vocabulary, "grid_from_puppet"),
        Err(ParseError::Expected { .. })
    ));
    assert!(matches!(
        parse(&vocabulary, "grid"),
        Err(ParseError::MissingWord { .. })
    ));
}

#[test]
fn malformed_specs_are_rejected() {
    let vocabulary = vocabulary();

    assert_eq!(parse(&vocabulary, ""), Err(ParseError::Empty));
    assert!(matches!(
        parse(&vocabulary, "distance_from_nowhere"),
        Err(ParseError::UnknownWord { .. })
    ));
    assert!(matches!(
        parse(&vocabulary, "distance_from_puppet_around"),
        Err(ParseError::TrailingWords { .. })
    ));
    assert!(matches!(
        parse(&vocabulary, "distance_from_distance"),
        Err(ParseError::Expected { .. })
    ));
    assert!(matches!(
        parse(&vocabulary, "coverSoft__x"),
        Err(ParseError::EmptyWord { .. })
    ));
    assert!(matches!(
        parse(&vocabulary, "a_b_c_d_e_f_g_h_i"),
        Err(ParseError::TooManyWords { count: 9, .. })
    ));
}

#[test]
fn unparse_output_reparses_to_same_tokens() {
    let vocabulary = vocabulary();
    let specs = [
        "min_distance_from_attentionTarget",
        "max_heightRelative_to_player",
        "coverSoft",
        "equal_type",
        "canShoot_glue_attentionTarget",
        "pureGrid_around_puppet",
        "hidespots_from_attentionTarget_around_puppet",
    ];

    for spec in specs {
        let parsed = parse(&vocabulary, spec).unwrap();
        let criterion = Criterion::new(parsed, CriterionValue::Float(3.0));
        let text = unparse(&vocabulary, &criterion).unwrap();
        let reparsed = parse(&vocabulary, &text).unwrap();
        assert_eq!(parsed, reparsed, "{spec} -> {text}");
    }
}

#[test]
fn extension_words_parse_like_core_words() {
    let mut vocabulary = vocabulary();
    let token = vocabulary
        .extend("flankedBy", TokenCategory::Test, None)
        .unwrap();

    let parsed = parse(&vocabulary, "flankedBy_from_attentionTarget").unwrap();
    assert_eq!(parsed.query, token);
    assert_eq!(parsed.object, Some(words::ATTENTION_TARGET));
}
