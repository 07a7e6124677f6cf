use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::criterion::{Criterion, CriterionValue, RelativeValueSource};
use crate::error::BuildError;
use crate::parse::{self, ParsedSpec};
use crate::token::Cost;
use crate::vocabulary::Vocabulary;

/// Which list of an option a criterion is added to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Generation,
    Conditions,
    Weights,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Section::Generation => "generation",
            Section::Conditions => "conditions",
            Section::Weights => "weights",
        })
    }
}

/// Named option parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionParam {
    Density,
    ObjectsType,
    Height,
    HorizontalSpacing,
    OptionLabel,
    TagPointPostfix,
    ExtenderStringParameter,
    NavigationAgentType,
}

impl OptionParam {
    pub const ALL: [OptionParam; 8] = [
        OptionParam::Density,
        OptionParam::ObjectsType,
        OptionParam::Height,
        OptionParam::HorizontalSpacing,
        OptionParam::OptionLabel,
        OptionParam::TagPointPostfix,
        OptionParam::ExtenderStringParameter,
        OptionParam::NavigationAgentType,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            OptionParam::Density => "density",
            OptionParam::ObjectsType => "objectsType",
            OptionParam::Height => "height",
            OptionParam::HorizontalSpacing => "horizontalSpacing",
            OptionParam::OptionLabel => "optionLabel",
            OptionParam::TagPointPostfix => "tagPointPostfix",
            OptionParam::ExtenderStringParameter => "extenderStringParameter",
            OptionParam::NavigationAgentType => "navigationAgentType",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Float(f32),
    Bool(bool),
    Text(String),
}

impl From<f32> for ParamValue {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct OptionParams {
    /// Spacing between generated grid points.
    pub density: f32,
    /// Added to the height of every generated point.
    pub height: f32,
    /// Sideways offset of the rays of `canShootTwoRayTest`.
    pub horizontal_spacing: f32,
    pub objects_type: i32,
    pub option_label: String,
    pub tag_point_postfix: String,
    pub extender_string_parameter: String,
    pub navigation_agent_type: String,
}

impl Default for OptionParams {
    fn default() -> Self {
        Self {
            density: 1.0,
            height: 0.0,
            horizontal_spacing: 4.0,
            objects_type: 0,
            option_label: String::new(),
            tag_point_postfix: String::new(),
            extender_string_parameter: String::new(),
            navigation_agent_type: String::new(),
        }
    }
}

impl OptionParams {
    pub fn set(&mut self, param: OptionParam, value: ParamValue) -> Result<(), BuildError> {
        let mismatch = |expected: &'static str| BuildError::ParameterType {
            name: param.name().to_owned(),
            expected,
        };
        match (param, value) {
            (OptionParam::Density, ParamValue::Float(v)) if v > 0.0 => self.density = v,
            (OptionParam::Density, _) => return Err(mismatch("a positive number")),
            (OptionParam::Height, ParamValue::Float(v)) => self.height = v,
            (OptionParam::HorizontalSpacing, ParamValue::Float(v)) if v >= 0.0 => {
                self.horizontal_spacing = v
            }
            (OptionParam::Height | OptionParam::HorizontalSpacing, _) => {
                return Err(mismatch("a number"))
            }
            (OptionParam::ObjectsType, ParamValue::Float(v)) => self.objects_type = v as i32,
            (OptionParam::ObjectsType, _) => return Err(mismatch("a number")),
            (OptionParam::OptionLabel, ParamValue::Text(s)) => self.option_label = s,
            (OptionParam::TagPointPostfix, ParamValue::Text(s)) => self.tag_point_postfix = s,
            (OptionParam::ExtenderStringParameter, ParamValue::Text(s)) => {
                self.extender_string_parameter = s
            }
            (OptionParam::NavigationAgentType, ParamValue::Text(s)) => {
                self.navigation_agent_type = s
            }
            (_, _) => return Err(mismatch("text")),
        }
        Ok(())
    }
}

/// One fallback alternative of a query: how to generate points, which must pass, and how
/// the survivors are ranked.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOption {
    generation: Vec<Criterion>,
    conditions: Vec<Criterion>,
    weights: Vec<Criterion>,
    params: OptionParams,
}

impl QueryOption {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> &[Criterion] {
        &self.generation
    }

    pub fn conditions(&self) -> &[Criterion] {
        &self.conditions
    }

    pub fn weights(&self) -> &[Criterion] {
        &self.weights
    }

    pub fn params(&self) -> &OptionParams {
        &self.params
    }

    /// Adds a generator with a literal search distance.
    pub fn add_to_generation(
        &mut self,
        vocabulary: &Vocabulary,
        spec: &str,
        distance: f32,
    ) -> Result<(), BuildError> {
        let parsed = parse_logged(vocabulary, spec)?;
        check_generation(spec, &parsed)?;
        self.generation
            .push(Criterion::new(parsed, CriterionValue::Float(distance)));
        Ok(())
    }

    /// Adds a generator whose search distance comes from the query context.
    pub fn add_to_generation_relative(
        &mut self,
        vocabulary: &Vocabulary,
        spec: &str,
        source: &str,
    ) -> Result<(), BuildError> {
        let parsed = parse_logged(vocabulary, spec)?;
        check_generation(spec, &parsed)?;
        let source = RelativeValueSource::from_name(source).ok_or_else(|| {
            tracing::warn!(spec, source, "unknown relative value source");
            BuildError::UnknownRelativeSource(source.to_owned())
        })?;
        self.generation.push(
            Criterion::new(parsed, CriterionValue::Float(0.0)).with_relative(source),
        );
        Ok(())
    }

    pub fn add_to_conditions(
        &mut self,
        vocabulary: &Vocabulary,
        spec: &str,
        value: impl Into<CriterionValue>,
    ) -> Result<(), BuildError> {
        let value = value.into();
        let parsed = parse_logged(vocabulary, spec)?;
        let category = parsed.query.category();
        let result = match value {
            CriterionValue::Bool(_) if category.is_boolean() => match parsed.limit {
                Some(_) => Err(BuildError::UnexpectedLimit {
                    spec: spec.to_owned(),
                    section: Section::Conditions,
                }),
                None => Ok(()),
            },
            CriterionValue::Float(_) if category.is_real() => match parsed.limit {
                Some(_) => Ok(()),
                None => Err(BuildError::MissingLimit {
                    spec: spec.to_owned(),
                }),
            },
            CriterionValue::Bool(_) if category.is_real() => Err(BuildError::ValueType {
                spec: spec.to_owned(),
                expected: "number",
            }),
            CriterionValue::Float(_) if category.is_boolean() => Err(BuildError::ValueType {
                spec: spec.to_owned(),
                expected: "boolean",
            }),
            _ => Err(BuildError::WrongCategory {
                spec: spec.to_owned(),
                category,
                section: Section::Conditions,
            }),
        };
        if let Err(err) = result {
            tracing::warn!(spec, error = %err, "condition rejected");
            return Err(err);
        }
        require_cost(vocabulary, spec, &parsed)?;
        self.conditions.push(Criterion::new(parsed, value));
        Ok(())
    }

    pub fn add_to_weights(
        &mut self,
        vocabulary: &Vocabulary,
        spec: &str,
        weight: f32,
    ) -> Result<(), BuildError> {
        let parsed = parse_logged(vocabulary, spec)?;
        let category = parsed.query.category();
        let result = if !category.is_scoring() {
            Err(BuildError::WrongCategory {
                spec: spec.to_owned(),
                category,
                section: Section::Weights,
            })
        } else if parsed.limit.is_some() {
            Err(BuildError::UnexpectedLimit {
                spec: spec.to_owned(),
                section: Section::Weights,
            })
        } else {
            require_cost(vocabulary, spec, &parsed).and_then(|cost| {
                if cost.is_deferred() {
                    Err(BuildError::DeferredWeight {
                        spec: spec.to_owned(),
                    })
                } else {
                    Ok(())
                }
            })
        };
        if let Err(err) = result {
            tracing::warn!(spec, error = %err, "weight rejected");
            return Err(err);
        }
        self.weights
            .push(Criterion::new(parsed, CriterionValue::Float(weight)));
        Ok(())
    }

    pub fn add_to_parameters(
        &mut self,
        name: &str,
        value: impl Into<ParamValue>,
    ) -> Result<(), BuildError> {
        let Some(param) = OptionParam::from_name(name) else {
            tracing::warn!(parameter = name, "unknown option parameter");
            return Err(BuildError::UnknownParameter(name.to_owned()));
        };
        self.params.set(param, value.into()).inspect_err(|err| {
            tracing::warn!(parameter = name, error = %err, "option parameter rejected");
        })
    }

    /// Multi-line listing of every criterion, for diagnostics.
    pub fn describe(&self, vocabulary: &Vocabulary) -> String {
        let mut out = String::new();
        let sections = [
            (Section::Generation, &self.generation),
            (Section::Conditions, &self.conditions),
            (Section::Weights, &self.weights),
        ];
        for (section, criteria) in sections {
            for criterion in criteria.iter() {
                let text = parse::unparse(vocabulary, criterion)
                    .unwrap_or_else(|_| "<unregistered>".to_owned());
                let value = match criterion.relative() {
                    Some(source) => source.name().to_owned(),
                    None => match criterion.value() {
                        CriterionValue::Float(v) => v.to_string(),
                        CriterionValue::Bool(b) => b.to_string(),
                    },
                };
                out.push_str(&format!("{section}: {text} = {value}\n"));
            }
        }
        out
    }
}

fn parse_logged(vocabulary: &Vocabulary, spec: &str) -> Result<ParsedSpec, BuildError> {
    parse::parse(vocabulary, spec).map_err(|err| {
        tracing::warn!(spec, error = %err, "failed to parse criterion");
        BuildError::from(err)
    })
}

fn check_generation(spec: &str, parsed: &ParsedSpec) -> Result<(), BuildError> {
    let category = parsed.query.category();
    let result = if !category.is_generator() {
        Err(BuildError::WrongCategory {
            spec: spec.to_owned(),
            category,
            section: Section::Generation,
        })
    } else if parsed.limit.is_some() {
        Err(BuildError::UnexpectedLimit {
            spec: spec.to_owned(),
            section: Section::Generation,
        })
    } else {
        Ok(())
    };
    result.inspect_err(|err| tracing::warn!(spec, error = %err, "generator rejected"))
}

fn require_cost(
    vocabulary: &Vocabulary,
    spec: &str,
    parsed: &ParsedSpec,
) -> Result<Cost, BuildError> {
    vocabulary.cost(parsed.query).ok_or_else(|| {
        tracing::warn!(spec, "criterion word has no cost");
        BuildError::MissingCost {
            spec: spec.to_owned(),
        }
    })
}
