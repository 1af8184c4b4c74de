use crate::types::Category;

/// Uppercase the first character, leaving the rest untouched.
pub fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Capitalize every free-text field of a category. Enum fields are already
/// typed and pass through unchanged.
pub fn normalize(category: Category) -> Category {
    Category {
        sector: capitalize_first(&category.sector),
        discovery_channel: capitalize_first(&category.discovery_channel),
        main_pain_point: capitalize_first(&category.main_pain_point),
        integration_needs: capitalize_first(&category.integration_needs),
        summary: capitalize_first(&category.summary),
        next_steps: capitalize_first(&category.next_steps),
        trigger_words: category
            .trigger_words
            .iter()
            .map(|w| capitalize_first(w))
            .collect(),
        ..category
    }
}
