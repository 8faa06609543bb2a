//! Inline expressions, e.g. `ds_${0..1}.t_order_${[0, 1]}`.
//!
//! Each `${...}` (or `$->{...}`) group is a range `a..b` or a list
//! `[a, b]` / `a, b`. A segment expands to the cartesian product of its
//! groups, leftmost group outermost. Top-level commas separate segments.

use super::Error;

/// Expand an inline expression into every name it describes.
pub fn expand(expression: &str) -> Result<Vec<String>, Error> {
    let mut names = vec![];
    for segment in split_segments(expression)? {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        names.extend(expand_segment(segment, expression)?);
    }
    Ok(names)
}

/// Split on commas outside of `${...}` groups.
fn split_segments(expression: &str) -> Result<Vec<&str>, Error> {
    let mut segments = vec![];
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in expression.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| Error::InlineExpression(expression.into()))?;
            }
            ',' if depth == 0 => {
                segments.push(&expression[start..i]);
                start = i + 1;
            }
            _ => (),
        }
    }

    if depth != 0 {
        return Err(Error::InlineExpression(expression.into()));
    }
    segments.push(&expression[start..]);

    Ok(segments)
}

enum Part {
    Text(String),
    Choices(Vec<String>),
}

fn expand_segment(segment: &str, expression: &str) -> Result<Vec<String>, Error> {
    let invalid = || Error::InlineExpression(expression.into());
    let mut parts = vec![];
    let mut rest = segment;

    while let Some(open) = rest.find('$') {
        let after = &rest[open + 1..];
        let body_start = if after.starts_with("->{") {
            open + 4
        } else if after.starts_with('{') {
            open + 2
        } else {
            parts.push(Part::Text(rest[..=open].to_string()));
            rest = &rest[open + 1..];
            continue;
        };

        let close = rest[body_start..].find('}').ok_or_else(invalid)? + body_start;
        parts.push(Part::Text(rest[..open].to_string()));
        parts.push(Part::Choices(choices(&rest[body_start..close]).ok_or_else(invalid)?));
        rest = &rest[close + 1..];
    }
    parts.push(Part::Text(rest.to_string()));

    let mut names = vec![String::new()];
    for part in parts {
        names = match part {
            Part::Text(text) => names.into_iter().map(|name| name + &text).collect(),
            Part::Choices(choices) => names
                .iter()
                .flat_map(|name| choices.iter().map(move |choice| format!("{}{}", name, choice)))
                .collect(),
        };
    }

    Ok(names)
}

fn choices(body: &str) -> Option<Vec<String>> {
    let body = body.trim();

    if let Some((low, high)) = body.split_once("..") {
        let low: i64 = low.trim().parse().ok()?;
        let high: i64 = high.trim().parse().ok()?;
        if low > high {
            return None;
        }
        return Some((low..=high).map(|n| n.to_string()).collect());
    }

    let body = body
        .strip_prefix('[')
        .and_then(|body| body.strip_suffix(']'))
        .unwrap_or(body);
    let choices: Vec<String> = body
        .split(',')
        .map(|choice| choice.trim().trim_matches('\'').trim_matches('"').to_string())
        .filter(|choice| !choice.is_empty())
        .collect();

    if choices.is_empty() {
        None
    } else {
        Some(choices)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_range_and_list() {
        assert_eq!(
            expand("ds_${0..1}.t_order_${[0, 1]}").unwrap(),
            vec![
                "ds_0.t_order_0",
                "ds_0.t_order_1",
                "ds_1.t_order_0",
                "ds_1.t_order_1"
            ]
        );
        assert_eq!(
            expand("ds_$->{['a', 'b']}.t_user").unwrap(),
            vec!["ds_a.t_user", "ds_b.t_user"]
        );
    }

    #[test]
    fn test_segments() {
        assert_eq!(
            expand("ds_0.t_order_${0..1}, ds_1.t_order_${2..3}").unwrap(),
            vec![
                "ds_0.t_order_0",
                "ds_0.t_order_1",
                "ds_1.t_order_2",
                "ds_1.t_order_3"
            ]
        );
        assert_eq!(expand("ds.t_plain").unwrap(), vec!["ds.t_plain"]);
        assert_eq!(expand("price$.t").unwrap(), vec!["price$.t"]);
    }

    #[test]
    fn test_invalid() {
        assert!(expand("ds_${0..1.t").is_err());
        assert!(expand("ds_${1..0}.t").is_err());
        assert!(expand("ds_${}.t").is_err());
        assert!(expand("ds_}.t").is_err());
    }
}
