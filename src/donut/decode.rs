//! Donut output decoding
//!
//! Turns the raw generated text (`<s_receipt><s_total>12.00</s_total>...</s>`)
//! into a JSON mapping. Field tags nest as `<s_key>...</s_key>`, `<sep/>`
//! separates repeated values, and categorical answers are emitted as
//! standalone tokens such as `<yes/>`.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

static START_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<s_(.*?)>").unwrap());

static ANY_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<.*?>").unwrap());

const SEPARATOR: &str = "<sep/>";

/// Strip end-of-sequence and padding tokens, then drop the first tag (the
/// task prompt) and surrounding whitespace.
pub fn clean_sequence(decoded: &str, eos_token: &str, pad_token: &str) -> String {
    let mut text = decoded.to_string();
    if !eos_token.is_empty() {
        text = text.replace(eos_token, "");
    }
    if !pad_token.is_empty() {
        text = text.replace(pad_token, "");
    }
    ANY_TAG_RE.replacen(&text, 1, "").trim().to_string()
}

/// Parse a cleaned token sequence into a JSON object.
///
/// `added_vocab` holds the tokenizer's added tokens; leaves matching one of
/// the `<x/>` categorical tokens are reported as `x`. Input without any field
/// tags comes back as `{"text_sequence": <input>}`.
pub fn token2json(tokens: &str, added_vocab: &HashSet<String>) -> Value {
    parse_tokens(tokens, false, added_vocab)
}

fn parse_tokens(tokens: &str, is_inner_value: bool, added_vocab: &HashSet<String>) -> Value {
    let mut tokens = tokens.to_string();
    let mut output = Map::new();

    while !tokens.is_empty() {
        let Some(captures) = START_TAG_RE.captures(&tokens) else {
            break;
        };
        let start_token = captures[0].to_string();
        let key = captures[1].to_string();
        let end_needle = format!("</s_{}>", key);

        let Some(end_at) = find_ignore_case(&tokens, &end_needle) else {
            tokens = tokens.replace(&start_token, "");
            continue;
        };
        let end_token = tokens[end_at..end_at + end_needle.len()].to_string();

        if let Some(content) = enclosed(&tokens, &start_token, &end_token) {
            let content = content.trim();

            if content.contains("<s_") && content.contains("</s_") {
                if let Value::Array(mut items) = parse_tokens(content, true, added_vocab) {
                    match items.len() {
                        0 => {}
                        1 => {
                            output.insert(key, items.remove(0));
                        }
                        _ => {
                            output.insert(key, Value::Array(items));
                        }
                    }
                }
            } else {
                let mut leaves: Vec<Value> = content
                    .split(SEPARATOR)
                    .map(|leaf| Value::String(categorical_leaf(leaf.trim(), added_vocab)))
                    .collect();
                let value = if leaves.len() == 1 {
                    leaves.remove(0)
                } else {
                    Value::Array(leaves)
                };
                output.insert(key, value);
            }
        }

        let cut = tokens.find(&end_token).unwrap_or(end_at) + end_token.len();
        tokens = tokens[cut..].trim().to_string();

        if let Some(rest) = tokens.strip_prefix(SEPARATOR) {
            let mut siblings = vec![Value::Object(output)];
            if let Value::Array(more) = parse_tokens(rest, true, added_vocab) {
                siblings.extend(more);
            }
            return Value::Array(siblings);
        }
    }

    match (output.is_empty(), is_inner_value) {
        (false, true) => Value::Array(vec![Value::Object(output)]),
        (false, false) => Value::Object(output),
        (true, true) => Value::Array(Vec::new()),
        (true, false) => {
            let mut fallback = Map::new();
            fallback.insert("text_sequence".to_string(), Value::String(tokens));
            Value::Object(fallback)
        }
    }
}

fn categorical_leaf(leaf: &str, added_vocab: &HashSet<String>) -> String {
    if added_vocab.contains(leaf) && leaf.starts_with('<') && leaf.ends_with("/>") && leaf.len() >= 3 {
        leaf[1..leaf.len() - 2].to_string()
    } else {
        leaf.to_string()
    }
}

/// Text between the first `start` and the first `end` after it, matched
/// case-insensitively.
fn enclosed<'a>(haystack: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let open = find_ignore_case(haystack, start)? + start.len();
    let close = find_ignore_case(&haystack[open..], end)?;
    Some(&haystack[open..open + close])
}

/// ASCII case-insensitive `find`. Lowercasing ASCII keeps byte offsets intact.
fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .to_ascii_lowercase()
        .find(&needle.to_ascii_lowercase())
}
