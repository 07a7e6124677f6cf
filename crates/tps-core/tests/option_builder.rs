use tps_core::{
    BuildError, Limit, Query, QueryOption, RelativeValueSource, Section, Vocabulary,
    MAX_OPTION_INDEX,
};

#[test]
fn generation_accepts_only_generators() {
    let vocabulary = Vocabulary::with_core_words();
    let mut option = QueryOption::new();

    option
        .add_to_generation(&vocabulary, "pureGrid_around_puppet", 10.0)
        .unwrap();
    let err = option
        .add_to_generation(&vocabulary, "distance_from_puppet", 10.0)
        .unwrap_err();

    assert!(matches!(
        err,
        BuildError::WrongCategory {
            section: Section::Generation,
            ..
        }
    ));
    assert_eq!(option.generation().len(), 1);
    assert_eq!(option.generation()[0].value_as_float(), 10.0);
}

#[test]
fn relative_generation_records_its_source() {
    let vocabulary = Vocabulary::with_core_words();
    let mut option = QueryOption::new();

    option
        .add_to_generation_relative(&vocabulary, "currentPos_around_puppet", "objectRadius")
        .unwrap();
    assert_eq!(
        option.generation()[0].relative(),
        Some(RelativeValueSource::ObjectRadius)
    );

    assert!(matches!(
        option.add_to_generation_relative(&vocabulary, "currentPos_around_puppet", "bogus"),
        Err(BuildError::UnknownRelativeSource(_))
    ));
    assert_eq!(option.generation().len(), 1);
}

#[test]
fn real_conditions_need_a_limit() {
    let vocabulary = Vocabulary::with_core_words();
    let mut option = QueryOption::new();

    assert!(matches!(
        option.add_to_conditions(&vocabulary, "distance_from_puppet", 5.0),
        Err(BuildError::MissingLimit { .. })
    ));
    option
        .add_to_conditions(&vocabulary, "max_distance_from_puppet", 5.0)
        .unwrap();

    assert_eq!(option.conditions().len(), 1);
    assert_eq!(option.conditions()[0].limit(), Some(Limit::Max));
}

#[test]
fn condition_value_kind_must_match_category() {
    let vocabulary = Vocabulary::with_core_words();
    let mut option = QueryOption::new();

    assert!(matches!(
        option.add_to_conditions(&vocabulary, "visible_from_attentionTarget", 1.0),
        Err(BuildError::ValueType { .. })
    ));
    assert!(matches!(
        option.add_to_conditions(&vocabulary, "min_distance_from_puppet", true),
        Err(BuildError::ValueType { .. })
    ));
    assert!(matches!(
        option.add_to_conditions(&vocabulary, "grid_around_puppet", true),
        Err(BuildError::WrongCategory { .. })
    ));
    option
        .add_to_conditions(&vocabulary, "visible_from_attentionTarget", false)
        .unwrap();

    assert_eq!(option.conditions().len(), 1);
    assert!(!option.conditions()[0].value_as_bool());
}

#[test]
fn weights_reject_limits_and_deferred_words() {
    let vocabulary = Vocabulary::with_core_words();
    let mut option = QueryOption::new();

    assert!(matches!(
        option.add_to_weights(&vocabulary, "min_distance_from_puppet", 1.0),
        Err(BuildError::UnexpectedLimit { .. })
    ));
    assert!(matches!(
        option.add_to_weights(&vocabulary, "visible_from_attentionTarget", 1.0),
        Err(BuildError::DeferredWeight { .. })
    ));
    option
        .add_to_weights(&vocabulary, "distance_from_puppet", -1.0)
        .unwrap();
    option.add_to_weights(&vocabulary, "coverSoft", 0.5).unwrap();

    assert_eq!(option.weights().len(), 2);
}

#[test]
fn parameters_are_validated_by_name_and_type() {
    let mut option = QueryOption::new();

    option.add_to_parameters("density", 2.5).unwrap();
    option.add_to_parameters("optionLabel", "fallback").unwrap();
    option.add_to_parameters("height", -0.5).unwrap();

    assert!(matches!(
        option.add_to_parameters("weirdness", 1.0),
        Err(BuildError::UnknownParameter(_))
    ));
    assert!(matches!(
        option.add_to_parameters("density", 0.0),
        Err(BuildError::ParameterType { .. })
    ));
    assert!(matches!(
        option.add_to_parameters("optionLabel", 3.0),
        Err(BuildError::ParameterType { .. })
    ));

    let params = option.params();
    assert_eq!(params.density, 2.5);
    assert_eq!(params.option_label, "fallback");
    assert_eq!(params.height, -0.5);
}

#[test]
fn options_are_created_lazily_up_to_the_cap() {
    let vocabulary = Vocabulary::with_core_words();
    let mut query = Query::new("Cover");

    query
        .option_mut(2)
        .unwrap()
        .add_to_generation(&vocabulary, "grid_around_puppet", 5.0)
        .unwrap();
    assert_eq!(query.option_count(), 3);
    assert!(!query.is_runnable());

    for index in 0..2 {
        query
            .option_mut(index)
            .unwrap()
            .add_to_generation(&vocabulary, "grid_around_puppet", 5.0)
            .unwrap();
    }
    assert!(query.is_runnable());

    assert!(query.option_mut(MAX_OPTION_INDEX).is_ok());
    assert!(matches!(
        query.option_mut(MAX_OPTION_INDEX + 1),
        Err(BuildError::OptionOutOfRange { .. })
    ));
}

#[test]
fn editing_a_shared_option_leaves_the_snapshot_alone() {
    let vocabulary = Vocabulary::with_core_words();
    let mut query = Query::new("Cover");
    query
        .option_mut(0)
        .unwrap()
        .add_to_generation(&vocabulary, "grid_around_puppet", 5.0)
        .unwrap();

    let snapshot = query.option(0).unwrap().clone();
    query
        .option_mut(0)
        .unwrap()
        .add_to_weights(&vocabulary, "coverSoft", 1.0)
        .unwrap();

    assert!(snapshot.weights().is_empty());
    assert_eq!(query.option(0).unwrap().weights().len(), 1);
}
