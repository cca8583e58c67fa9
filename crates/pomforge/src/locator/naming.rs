//! Identifier synthesis for generated locator bindings.

use std::collections::HashSet;

/// camelCase identifier from free text, keeping ASCII letters and digits.
///
/// Empty or purely numeric results become `element`; a leading digit is
/// escaped with an underscore.
pub fn camel_case(text: &str) -> String {
    let lowered: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace())
        .collect();

    let mut name = String::with_capacity(lowered.len());
    for (i, word) in lowered.split_whitespace().enumerate() {
        if i == 0 {
            name.push_str(word);
        } else {
            push_capitalized(&mut name, word);
        }
    }
    finish(name)
}

/// camelCase identifier where every non-alphanumeric run separates words.
///
/// Unlike [`camel_case`], punctuation splits words instead of vanishing, so
/// `"Sign-in form"` becomes `signInForm`.
pub fn words_to_identifier(text: &str) -> String {
    let spaced: String = text
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect();

    let mut name = String::with_capacity(spaced.len());
    for (i, word) in spaced.split_whitespace().enumerate() {
        let lower = word.to_ascii_lowercase();
        if i == 0 {
            name.push_str(&lower);
        } else {
            push_capitalized(&mut name, &lower);
        }
    }
    finish(name)
}

fn push_capitalized(out: &mut String, word: &str) {
    let mut chars = word.chars();
    if let Some(first) = chars.next() {
        out.extend(first.to_uppercase());
        out.push_str(chars.as_str());
    }
}

fn finish(name: String) -> String {
    if name.is_empty() || name.chars().all(|c| c.is_ascii_digit()) {
        return "element".to_string();
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return format!("_{name}");
    }
    name
}

/// Names already taken within one generated file.
#[derive(Debug, Default)]
pub struct NameRegistry {
    used: HashSet<String>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `base`, or `base1`, `base2`, ... if it is taken.
    pub fn claim(&mut self, base: &str) -> String {
        let mut candidate = base.to_string();
        let mut counter = 1;
        while self.used.contains(&candidate) {
            candidate = format!("{base}{counter}");
            counter += 1;
        }
        self.used.insert(candidate.clone());
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("Add to cart"), "addToCart");
        assert_eq!(camel_case("  Sign-in   NOW! "), "signinNow");
        assert_eq!(camel_case("Vehículos"), "vehculos");
        assert_eq!(camel_case("2 items"), "_2Items");
        assert_eq!(camel_case("404"), "element");
        assert_eq!(camel_case("¡¿?!"), "element");
    }

    #[test]
    fn test_words_to_identifier() {
        assert_eq!(words_to_identifier("Login button"), "loginButton");
        assert_eq!(words_to_identifier("Sign-in form"), "signInForm");
        assert_eq!(words_to_identifier("#search .result"), "searchResult");
        assert_eq!(words_to_identifier("3rd party"), "_3rdParty");
        assert_eq!(words_to_identifier("***"), "element");
    }

    #[test]
    fn test_registry_suffixes_collisions() {
        let mut reg = NameRegistry::new();
        assert_eq!(reg.claim("saveButton"), "saveButton");
        assert_eq!(reg.claim("saveButton"), "saveButton1");
        assert_eq!(reg.claim("saveButton"), "saveButton2");
        assert_eq!(reg.claim("saveButton1"), "saveButton11");
        assert_eq!(reg.claim("saveButton"), "saveButton3");
    }
}
