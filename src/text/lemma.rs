//! Rule-based noun lemmatizer.
//!
//! Handles irregular plurals from a fixed table and regular plural suffixes.
//! Words that already look singular pass through unchanged.

const IRREGULAR: &[(&str, &str)] = &[
    ("analyses", "analysis"),
    ("children", "child"),
    ("criteria", "criterion"),
    ("feet", "foot"),
    ("geese", "goose"),
    ("indices", "index"),
    ("lives", "life"),
    ("men", "man"),
    ("mice", "mouse"),
    ("people", "person"),
    ("teeth", "tooth"),
    ("women", "woman"),
];

/// Reduce a lowercase token to its dictionary form.
pub(crate) fn lemmatize(token: &str) -> String {
    if let Some((_, lemma)) = IRREGULAR.iter().find(|(form, _)| *form == token) {
        return (*lemma).to_string();
    }
    if token.len() <= 3 {
        return token.to_string();
    }
    for (suffix, replacement) in [
        ("ies", "y"),
        ("ches", "ch"),
        ("shes", "sh"),
        ("sses", "ss"),
        ("xes", "x"),
        ("zes", "z"),
    ] {
        if let Some(stem) = token.strip_suffix(suffix) {
            return format!("{stem}{replacement}");
        }
    }
    if token.ends_with("ss") || token.ends_with("us") || token.ends_with("is") {
        return token.to_string();
    }
    match token.strip_suffix('s') {
        Some(stem) => stem.to_string(),
        None => token.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regular_plurals_become_singular() {
        assert_eq!(lemmatize("services"), "service");
        assert_eq!(lemmatize("companies"), "company");
        assert_eq!(lemmatize("searches"), "search");
        assert_eq!(lemmatize("boxes"), "box");
    }

    #[test]
    fn irregular_and_singular_forms() {
        assert_eq!(lemmatize("children"), "child");
        assert_eq!(lemmatize("people"), "person");
        assert_eq!(lemmatize("business"), "business");
        assert_eq!(lemmatize("status"), "status");
        assert_eq!(lemmatize("gas"), "gas");
        assert_eq!(lemmatize("price"), "price");
    }
}
