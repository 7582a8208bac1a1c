//! English plural/singular forms for navigation field names.
//!
//! Only the trailing word of a `snake_case` identifier is inflected, so
//! `unit_type` becomes `unit_types` and `battle_fields` becomes
//! `battle_field`. The rules cover table-name vocabulary, not English at
//! large.

const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
    ("mouse", "mice"),
    ("datum", "data"),
    ("criterion", "criteria"),
];

const UNCOUNTABLE: &[&str] = &["data", "information", "equipment", "series", "species", "news", "metadata"];

fn split_last_word(word: &str) -> (&str, &str) {
    match word.rfind('_') {
        Some(idx) => word.split_at(idx + 1),
        None => ("", word),
    }
}

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')
}

fn looks_plural(word: &str) -> bool {
    word.ends_with('s') && !word.ends_with("ss") && !word.ends_with("us") && !word.ends_with("is")
}

/// Plural form of the last word. Words that already look plural are kept.
pub fn pluralize(word: &str) -> String {
    let (head, last) = split_last_word(word);
    let lower = last.to_lowercase();

    if last.is_empty() || UNCOUNTABLE.contains(&lower.as_str()) {
        return word.to_string();
    }
    if let Some((_, plural)) = IRREGULAR.iter().find(|(s, _)| *s == lower) {
        return format!("{}{}", head, plural);
    }
    if IRREGULAR.iter().any(|(_, p)| *p == lower) || looks_plural(&lower) {
        return word.to_string();
    }

    let plural = if lower.ends_with("ss")
        || lower.ends_with('x')
        || lower.ends_with('z')
        || lower.ends_with("ch")
        || lower.ends_with("sh")
        || lower.ends_with("us")
    {
        format!("{}es", last)
    } else if lower.ends_with('y') && !lower[..lower.len() - 1].ends_with(is_vowel) {
        format!("{}ies", &last[..last.len() - 1])
    } else {
        format!("{}s", last)
    };
    format!("{}{}", head, plural)
}

/// Singular form of the last word.
pub fn singularize(word: &str) -> String {
    let (head, last) = split_last_word(word);
    let lower = last.to_lowercase();

    if last.is_empty() || UNCOUNTABLE.contains(&lower.as_str()) {
        return word.to_string();
    }
    if let Some((singular, _)) = IRREGULAR.iter().find(|(_, p)| *p == lower) {
        return format!("{}{}", head, singular);
    }
    if !looks_plural(&lower) {
        return word.to_string();
    }

    if lower.ends_with("ies") && lower.len() > 3 {
        return format!("{}{}y", head, &last[..last.len() - 3]);
    }
    let cut = if lower.ends_with("sses")
        || lower.ends_with("xes")
        || lower.ends_with("ches")
        || lower.ends_with("shes")
        || lower.ends_with("tuses")
    {
        2
    } else {
        1
    };
    format!("{}{}", head, &last[..last.len() - cut])
}
