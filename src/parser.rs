use lazy_static::lazy_static;
use pest::{error::LineColLocation, iterators::Pair, Parser};
use regex::Regex;
use tracing::trace;

use crate::error::{parse_bail, InProduction, ParseError};

lazy_static! {
    static ref FOLD: Regex = Regex::new(r"\r?\n[\t ]").expect("valid fold regex");
    static ref LINE_BREAK: Regex = Regex::new(r"\r?\n").expect("valid line break regex");
}

/// Joins folded lines: a line break followed by one space or tab is removed.
pub fn strip_folds(s: &str) -> String {
    FOLD.replace_all(s, "").into_owned()
}

/// Unfolds the text and splits it into logical lines, dropping blank ones.
pub fn unfold_lines(s: &str) -> Vec<String> {
    LINE_BREAK
        .split(&strip_folds(s))
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Parser)]
#[grammar = "grammar.pest"]
struct ContentLineParser;

/// One unfolded `NAME;PARAM=VALUE:BODY` line, split but not interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentLine {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub value: String,
}

impl ContentLine {
    pub fn parse(line: &str) -> Result<ContentLine, ParseError> {
        let line = strip_folds(line);
        trace!(line = %line, "parsing content line");

        ContentLine::parse_unfolded(&line).in_production("contentline")
    }

    fn parse_unfolded(line: &str) -> Result<ContentLine, ParseError> {
        let mut pairs = ContentLineParser::parse(Rule::content_line, line).map_err(|e| {
            let column = match e.line_col {
                LineColLocation::Pos((_, col)) | LineColLocation::Span((_, col), _) => col,
            };
            ParseError::new(format!("'{}' is not a content line (column {})", line, column))
        })?;

        match pairs.next() {
            Some(pair) => ContentLine::from_pair(pair),
            None => parse_bail!("empty content line"),
        }
    }

    fn from_pair(pair: Pair<Rule>) -> Result<ContentLine, ParseError> {
        let span = pair.as_str().to_string();
        let mut name = None;
        let mut value = None;
        let mut parameters = Vec::new();

        for inner_pair in pair.into_inner() {
            match inner_pair.as_rule() {
                Rule::name => name = Some(inner_pair.as_str().to_string()),
                Rule::property_value => value = Some(inner_pair.as_str().to_string()),
                Rule::param => parameters.push(Parameter::from_pair(inner_pair)?),
                Rule::EOI => {}
                other => parse_bail!("unexpected {:?} in '{}'", other, span),
            }
        }

        if let (Some(name), Some(value)) = (name, value) {
            Ok(ContentLine {
                name,
                parameters,
                value,
            })
        } else {
            parse_bail!("no name for content line '{}'", span)
        }
    }

    pub fn as_string(&self) -> String {
        if self.parameters.is_empty() {
            format!("{}:{}", self.name, self.value)
        } else {
            let params = self
                .parameters
                .iter()
                .map(|v| v.as_string())
                .collect::<Vec<_>>()
                .join(";");

            format!("{};{}:{}", self.name, params, self.value)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub values: Vec<String>,
}

impl Parameter {
    fn from_pair(pair: Pair<Rule>) -> Result<Parameter, ParseError> {
        let span = pair.as_str().to_string();
        let mut name = None;
        let mut values = Vec::new();
        for inner_pair in pair.into_inner() {
            match inner_pair.as_rule() {
                Rule::name => name = Some(inner_pair.as_str().to_string()),
                Rule::param_value => values.push(inner_pair.as_str().trim_matches('"').to_string()),
                other => parse_bail!("unexpected {:?} in parameter '{}'", other, span),
            }
        }

        if values.is_empty() {
            parse_bail!("no values for parameter '{}'", span);
        }

        match name {
            Some(name) => Ok(Parameter { name, values }),
            None => parse_bail!("no name for parameter '{}'", span),
        }
    }

    pub fn as_string(&self) -> String {
        // Values containing separators have to be quoted.
        let values = self
            .values
            .iter()
            .map(|v| {
                if v.is_empty() || v.contains(&[',', ':', ';'] as &[_]) {
                    format!(r#""{}""#, v)
                } else {
                    v.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(",");

        format!("{}={}", self.name, values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_are_joined() {
        assert_eq!(
            strip_folds("RRULE:FREQ=WEEKLY;\r\n BYDAY=MO,\n\tWE"),
            "RRULE:FREQ=WEEKLY;BYDAY=MO,WE"
        );
    }

    #[test]
    fn blank_lines_are_dropped() {
        let lines = unfold_lines("\nRDATE:20060418\r\n\r\n  \nEXDATE:2006\n 0416\n");
        assert_eq!(lines, vec!["RDATE:20060418", "EXDATE:20060416"]);
    }

    #[test]
    fn splits_parameters_and_value() {
        let line = ContentLine::parse(r#"RDATE;TZID="America/New_York";X-FOO=a,b:20060417,20060418"#)
            .unwrap();

        assert_eq!(line.name, "RDATE");
        assert_eq!(line.value, "20060417,20060418");
        assert_eq!(
            line.parameters,
            vec![
                Parameter {
                    name: "TZID".to_string(),
                    values: vec!["America/New_York".to_string()],
                },
                Parameter {
                    name: "X-FOO".to_string(),
                    values: vec!["a".to_string(), "b".to_string()],
                },
            ]
        );
        assert_eq!(
            line.as_string(),
            "RDATE;TZID=America/New_York;X-FOO=a,b:20060417,20060418"
        );
    }

    #[test]
    fn quoted_values_keep_separators() {
        let line = ContentLine::parse(r#"RRULE;X-NOTE="a;b:c":FREQ=DAILY"#).unwrap();
        assert_eq!(line.parameters[0].values, vec!["a;b:c"]);
        assert_eq!(line.as_string(), r#"RRULE;X-NOTE="a;b:c":FREQ=DAILY"#);
    }

    #[test]
    fn rejects_lines_without_a_body() {
        let err = ContentLine::parse("RRULE;FREQ=DAILY").unwrap_err();
        assert_eq!(err.productions, vec!["contentline"]);
        assert!(ContentLine::parse("RR ULE:FREQ=DAILY").is_err());
    }
}
