use std::collections::HashSet;
use std::convert::TryFrom;

use tracing::debug;

use crate::error::{parse_bail, InProduction, ParseError};
use crate::parser;

/// The value types a date list can declare with `VALUE=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Date,
    DateTime,
    Period,
}

impl ValueType {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueType::Date => "DATE",
            ValueType::DateTime => "DATE-TIME",
            ValueType::Period => "PERIOD",
        }
    }
}

/// The parameters understood on recurrence properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parameter {
    /// Purpose: To specify the identifier for the time zone definition for a
    /// time component in the property value.
    ///
    /// Naive date-times in the property are interpreted in this zone before
    /// being normalised to UTC.
    TimeZoneID(String),

    /// Purpose: To explicitly specify the value type format for a property
    /// value.
    ValueDataType(ValueType),

    /// An `X-` parameter. Kept as is so that it can be written back out.
    Extension { name: String, values: Vec<String> },
}

impl TryFrom<parser::Parameter> for Parameter {
    type Error = ParseError;

    fn try_from(p: parser::Parameter) -> Result<Self, Self::Error> {
        let name = p.name.to_ascii_uppercase();

        // The grammar guarantees at least one value.
        let last = |values: Vec<String>| values.into_iter().last().unwrap_or_default();

        let param = match &name as &str {
            "TZID" => Parameter::TimeZoneID(last(p.values)),
            "VALUE" => {
                let value = last(p.values);
                Parameter::ValueDataType(match &value.to_ascii_uppercase() as &str {
                    "DATE" => ValueType::Date,
                    "DATE-TIME" => ValueType::DateTime,
                    "PERIOD" => ValueType::Period,
                    _ => parse_bail!("unsupported value type '{}'", value),
                })
            }
            _ if name.starts_with("X-") => {
                debug!(parameter = %name, "captured extension parameter");
                Parameter::Extension {
                    name,
                    values: p.values,
                }
            }
            _ => parse_bail!("unknown parameter '{}'", p.name),
        };

        Ok(param)
    }
}

impl From<&Parameter> for parser::Parameter {
    fn from(param: &Parameter) -> Self {
        match param {
            Parameter::TimeZoneID(tzid) => parser::Parameter {
                name: "TZID".to_string(),
                values: vec![tzid.clone()],
            },
            Parameter::ValueDataType(value_type) => parser::Parameter {
                name: "VALUE".to_string(),
                values: vec![value_type.as_str().to_string()],
            },
            Parameter::Extension { name, values } => parser::Parameter {
                name: name.clone(),
                values: values.clone(),
            },
        }
    }
}

/// Which parameters a property accepts besides `X-` extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterSchema {
    /// RRULE and EXRULE: extensions only.
    Rule,
    /// RDATE and EXDATE: TZID and VALUE.
    DateList,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSet {
    parameters: Vec<Parameter>,
}

impl ParameterSet {
    pub fn parse<I>(params: I, schema: ParameterSchema) -> Result<ParameterSet, ParseError>
    where
        I: IntoIterator<Item = parser::Parameter>,
    {
        let mut seen = HashSet::new();
        let mut parameters = Vec::new();

        for p in params {
            let name = p.name.to_ascii_uppercase();
            if !seen.insert(name.clone()) {
                parse_bail!("duplicate parameter '{}'", p.name);
            }

            let param = Parameter::try_from(p).in_production(&name)?;

            if schema == ParameterSchema::Rule && !matches!(param, Parameter::Extension { .. }) {
                parse_bail!("parameter '{}' is not allowed here", name);
            }

            parameters.push(param);
        }

        Ok(ParameterSet { parameters })
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn push(&mut self, param: Parameter) {
        self.parameters.push(param);
    }

    pub fn get_value_data_type(&self) -> Option<ValueType> {
        for param in &self.parameters {
            if let Parameter::ValueDataType(data_type) = param {
                return Some(*data_type);
            }
        }

        None
    }

    pub fn get_tzid(&self) -> Option<&str> {
        for param in &self.parameters {
            if let Parameter::TimeZoneID(tzid) = param {
                return Some(tzid);
            }
        }

        None
    }

    pub fn get_extension(&self, name: &str) -> Option<&[String]> {
        for param in &self.parameters {
            if let Parameter::Extension { name: n, values } = param {
                if n.eq_ignore_ascii_case(name) {
                    return Some(values);
                }
            }
        }

        None
    }

    pub fn to_parser_parameters(&self) -> Vec<parser::Parameter> {
        self.parameters.iter().map(parser::Parameter::from).collect()
    }
}
