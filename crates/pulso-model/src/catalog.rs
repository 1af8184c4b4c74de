use serde::Serialize;

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Number of transcripts sent per model request.
pub const DEFAULT_BATCH_SIZE: usize = 8;

/// A model the dashboard offers in its settings.
#[derive(Debug, Clone, Serialize)]
pub struct KnownModel {
    /// Identifier sent to the API.
    pub value: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub recommended: bool,
}

pub const KNOWN_MODELS: &[KnownModel] = &[
    KnownModel {
        value: "llama-3.3-70b-versatile",
        label: "Llama 3.3 70B",
        description: "Equilibrio ideal entre calidad y velocidad",
        recommended: true,
    },
    KnownModel {
        value: "meta-llama/llama-4-maverick-17b-128e-instruct",
        label: "Llama 4 Maverick 17B",
        description: "Llama 4 · MoE 128 expertos · Mayor precisión",
        recommended: false,
    },
    KnownModel {
        value: "meta-llama/llama-4-scout-17b-16e-instruct",
        label: "Llama 4 Scout 17B",
        description: "Llama 4 · MoE 16 expertos · Más rápido",
        recommended: false,
    },
    KnownModel {
        value: "moonshotai/kimi-k2-instruct",
        label: "Kimi K2",
        description: "Moonshot AI · Excelente razonamiento",
        recommended: false,
    },
    KnownModel {
        value: "qwen/qwen3-32b",
        label: "Qwen3 32B",
        description: "Alibaba · Sólido en tareas de análisis",
        recommended: false,
    },
    KnownModel {
        value: "llama-3.1-8b-instant",
        label: "Llama 3.1 8B",
        description: "Más rápido · Menor precisión",
        recommended: false,
    },
];

pub fn find_model(value: &str) -> Option<&'static KnownModel> {
    KNOWN_MODELS.iter().find(|m| m.value == value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_model_is_known_and_recommended() {
        let m = find_model(DEFAULT_MODEL).unwrap();
        assert!(m.recommended);
        assert_eq!(KNOWN_MODELS.iter().filter(|m| m.recommended).count(), 1);
    }

    #[test]
    fn unknown_model_is_none() {
        assert!(find_model("gpt-nonexistent").is_none());
    }
}
