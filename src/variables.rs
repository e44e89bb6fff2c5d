//! `{{Name}}` variable tokens used in template subjects, bodies and routing
//! fields.
//!
//! A token is two literal opening braces, one or more characters other than
//! `}`, and two literal closing braces. Names are case-sensitive and taken
//! verbatim; there is no escaping and no nesting. Unterminated `{{` is plain
//! text.
//!
//! # Example
//!
//! ```
//! use freightmail::variables::{extract_variables, substitute, VariableValues};
//!
//! let text = "Hi {{Name}}, load {{LoadID}} for {{Name}}";
//! assert_eq!(extract_variables(text), vec!["Name", "LoadID"]);
//!
//! let mut values = VariableValues::new();
//! values.insert("LoadID".to_string(), "LD-1".to_string());
//! assert_eq!(substitute(text, &values), "Hi {{Name}}, load LD-1 for {{Name}}");
//! ```

use regex::{Captures, Regex};
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// Mapping from variable name to the value substituted for it.
pub type VariableValues = HashMap<String, String>;

static TOKEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([^}]+)\}\}").expect("valid regex"));

static SINGLE_TOKEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{\{([^}]+)\}\}$").expect("valid regex"));

/// Returns the distinct variable names referenced in `text`, in first-seen order.
pub fn extract_variables(text: &str) -> Vec<String> {
    extract_variables_from([text])
}

/// Returns the ordered union of the variables referenced across `texts`.
///
/// Used to build a template's variable list from its subject then its body.
pub fn extract_variables_from<'a, I>(texts: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen: HashSet<&'a str> = HashSet::new();
    let mut names = Vec::new();

    for text in texts {
        for cap in TOKEN_REGEX.captures_iter(text) {
            let Some(name) = cap.get(1) else { continue };
            if seen.insert(name.as_str()) {
                names.push(name.as_str().to_string());
            }
        }
    }

    names
}

/// Replaces every token that has a value in `values`.
///
/// Tokens without a value are kept verbatim so missing sample data stays
/// visible in previews. Replacement is a single pass: substituted values are
/// never scanned for further tokens.
pub fn substitute(text: &str, values: &VariableValues) -> String {
    TOKEN_REGEX
        .replace_all(text, |caps: &Captures<'_>| match values.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Variables referenced in `text` that have no entry in `values`.
pub fn unresolved_variables(text: &str, values: &VariableValues) -> Vec<String> {
    extract_variables(text)
        .into_iter()
        .filter(|name| !values.contains_key(name))
        .collect()
}

/// Whether `text` contains at least one well-formed token.
pub fn contains_token(text: &str) -> bool {
    TOKEN_REGEX.is_match(text)
}

/// If the whole of `text` is exactly one token, returns its name.
pub fn as_single_token(text: &str) -> Option<&str> {
    SINGLE_TOKEN_REGEX
        .captures(text)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str())
}

/// Builds the `{{name}}` token for a variable.
pub fn variable_token(name: &str) -> String {
    format!("{{{{{}}}}}", name)
}

/// Appends the token for `name` to `text`.
pub fn insert_variable(text: &mut String, name: &str) {
    text.push_str(&variable_token(name));
}
