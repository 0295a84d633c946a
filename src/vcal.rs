//! Rewrites vCalendar 1.0 recurrence rules (`D1 #5`, `W1 MO TH #0`,
//! `MP1 1+ MO #3`, ...) into RFC 2445 RRULE syntax.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::trace;

lazy_static! {
    static ref VCAL_RULE: Regex = Regex::new(
        r"(?ix)^
        (?:(?P<name>RRULE|EXRULE)(?P<params>;[^:]*)?:)?
        \s*(?P<freq>MD|MP|YD|YM|D|W)(?P<interval>\d+)
        (?P<tokens>(?:\s+(?:\d{1,3}[+-]?|LD|SU|MO|TU|WE|TH|FR|SA))*)
        (?:\s+(?P<duration>\#\d+|\d{8}(?:T\d{6}Z?)?))?
        \s*$"
    )
    .expect("valid vcal regex");
}

enum Token {
    Number(i32),
    Weekday(String),
}

fn tokenize(tokens: &str) -> Vec<Token> {
    tokens
        .split_whitespace()
        .map(|token| {
            let upper = token.to_ascii_uppercase();
            if upper == "LD" {
                return Token::Number(-1);
            }
            let (digits, negative) = if let Some(d) = upper.strip_suffix('-') {
                (d, true)
            } else if let Some(d) = upper.strip_suffix('+') {
                (d, false)
            } else {
                (&upper as &str, false)
            };
            match digits.parse::<i32>() {
                Ok(n) if negative => Token::Number(-n),
                Ok(n) => Token::Number(n),
                Err(_) => Token::Weekday(upper),
            }
        })
        .collect()
}

/// Builds the `BYxxx` part for the frequency code, or `None` if the tokens
/// do not fit it.
fn by_part(freq: &str, tokens: &[Token]) -> Option<Option<String>> {
    let numbers = || -> Option<Vec<String>> {
        tokens
            .iter()
            .map(|t| match t {
                Token::Number(n) => Some(n.to_string()),
                Token::Weekday(_) => None,
            })
            .collect()
    };

    if tokens.is_empty() {
        return Some(None);
    }

    let part = match freq {
        "D" => return None,
        "W" => {
            let days = tokens
                .iter()
                .map(|t| match t {
                    Token::Weekday(day) => Some(day.clone()),
                    Token::Number(_) => None,
                })
                .collect::<Option<Vec<_>>>()?;
            format!("BYDAY={}", days.join(","))
        }
        "MD" => format!("BYMONTHDAY={}", numbers()?.join(",")),
        "YD" => format!("BYYEARDAY={}", numbers()?.join(",")),
        "YM" => format!("BYMONTH={}", numbers()?.join(",")),
        "MP" => {
            // Each run of numbers applies to the run of weekdays after it.
            let mut pending: Vec<i32> = Vec::new();
            let mut after_weekday = false;
            let mut days = Vec::new();
            for token in tokens {
                match token {
                    Token::Number(n) => {
                        if after_weekday {
                            pending.clear();
                            after_weekday = false;
                        }
                        pending.push(*n);
                    }
                    Token::Weekday(day) => {
                        if pending.is_empty() {
                            return None;
                        }
                        after_weekday = true;
                        days.extend(pending.iter().map(|n| format!("{}{}", n, day)));
                    }
                }
            }
            if !after_weekday {
                return None;
            }
            format!("BYDAY={}", days.join(","))
        }
        _ => return None,
    };

    Some(Some(part))
}

/// Rewrites a legacy rule. Text that is not a legacy rule is returned as is.
pub fn rewrite(text: &str) -> String {
    let caps = match VCAL_RULE.captures(text.trim()) {
        Some(caps) => caps,
        None => return text.to_string(),
    };

    let freq_code = caps["freq"].to_ascii_uppercase();
    let frequency = match &freq_code as &str {
        "D" => "DAILY",
        "W" => "WEEKLY",
        "MD" | "MP" => "MONTHLY",
        _ => "YEARLY",
    };

    let tokens = tokenize(caps.name("tokens").map_or("", |m| m.as_str()));
    let by = match by_part(&freq_code, &tokens) {
        Some(by) => by,
        None => return text.to_string(),
    };

    let name = caps
        .name("name")
        .map_or_else(|| "RRULE".to_string(), |m| m.as_str().to_ascii_uppercase());
    let params = caps.name("params").map_or("", |m| m.as_str());

    let mut parts = vec![
        format!("FREQ={}", frequency),
        format!("INTERVAL={}", &caps["interval"]),
    ];
    parts.extend(by);

    match caps.name("duration").map(|m| m.as_str().to_ascii_uppercase()) {
        Some(ref d) if d == "#0" => {}
        Some(ref d) if d.starts_with('#') => parts.push(format!("COUNT={}", &d[1..])),
        Some(mut d) => {
            if d.contains('T') && !d.ends_with('Z') {
                d.push('Z');
            }
            parts.push(format!("UNTIL={}", d));
        }
        None => parts.push("COUNT=2".to_string()),
    }

    let rewritten = format!("{}{}:{}", name, params, parts.join(";"));
    trace!(from = %text, to = %rewritten, "rewrote vCalendar rule");
    rewritten
}
