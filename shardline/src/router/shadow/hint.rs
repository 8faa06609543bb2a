//! `/*shadow:true,key:value*/` comments.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::rules::ShadowHint;
use crate::segment::CommentSegment;

static COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)^\s*(?:/\*(.*)\*/|--(.*))\s*$"#).unwrap());

/// Hint in the first comment that has a `shadow` key.
pub fn parse(comments: &[CommentSegment]) -> Option<ShadowHint> {
    comments.iter().find_map(|comment| parse_comment(&comment.text))
}

fn parse_comment(text: &str) -> Option<ShadowHint> {
    let captures = COMMENT.captures(text)?;
    let body = captures.get(1).or_else(|| captures.get(2))?.as_str();

    let mut shadow = None;
    let mut hint = ShadowHint::default();
    for pair in body.split(',') {
        let Some((key, value)) = pair.split_once(':') else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());
        if key.eq_ignore_ascii_case("shadow") {
            shadow = Some(value.eq_ignore_ascii_case("true"));
        } else if !key.is_empty() {
            hint.props.insert(key.to_string(), value.to_string());
        }
    }

    hint.shadow = shadow?;
    Some(hint)
}
