use pulso_model::KNOWN_MODELS;

use crate::config::Settings;

/// `pulso models [--json]`
pub fn execute(settings: &Settings, json: bool) -> anyhow::Result<()> {
    if json {
        let v = serde_json::json!({ "models": KNOWN_MODELS, "default": settings.model });
        println!("{}", serde_json::to_string_pretty(&v)?);
        return Ok(());
    }
    for m in KNOWN_MODELS {
        let mut marks = Vec::new();
        if m.value == settings.model {
            marks.push("default");
        }
        if m.recommended {
            marks.push("recommended");
        }
        let marks = if marks.is_empty() {
            String::new()
        } else {
            format!(" [{}]", marks.join(", "))
        };
        println!("{:<40} {}{}", m.value, m.label, marks);
        println!("{:<40} {}", "", m.description);
    }
    Ok(())
}
