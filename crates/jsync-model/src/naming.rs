#![forbid(unsafe_code)]

//! Field-name casing for model keys.
//!
//! Relationship callables are exposed under the PascalCase form of the
//! camelCased relationship key (`owner_pets` → `OwnerPets`), and unwound
//! attributes are written back camelCased.
//!
//! Word boundaries: any non-alphanumeric character, a lowercase→uppercase
//! step, the last capital of an acronym followed by lowercase (`XMLHttp` →
//! `XML`, `Http`), and any letter↔digit step.

fn words(input: &str) -> Vec<String> {
    let chars: Vec<char> = input.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let boundary = (prev.is_lowercase() && c.is_uppercase())
                || (prev.is_uppercase() && c.is_uppercase() && next_is_lower)
                || (prev.is_alphabetic() && c.is_numeric())
                || (prev.is_numeric() && c.is_alphabetic());
            if boundary {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn upper_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `available_trims` → `availableTrims`.
#[must_use]
pub fn camel_case(input: &str) -> String {
    words(input)
        .iter()
        .enumerate()
        .map(|(index, word)| {
            let lower = word.to_lowercase();
            if index == 0 { lower } else { upper_first(&lower) }
        })
        .collect()
}

/// `owner_pets` → `OwnerPets`.
#[must_use]
pub fn pascal_case(input: &str) -> String {
    upper_first(&camel_case(input))
}

/// Whether `key` starts with an ASCII lowercase letter (a data field).
pub(crate) fn is_field_name(key: &str) -> bool {
    key.chars().next().is_some_and(|c| c.is_ascii_lowercase())
}

/// Whether `key` starts with an ASCII uppercase letter (a relationship).
pub(crate) fn is_relationship_name(key: &str) -> bool {
    key.chars().next().is_some_and(|c| c.is_ascii_uppercase())
}
