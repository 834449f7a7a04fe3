//! Static catalog of Groq models advertised by `GET /models`.

use serde::Serialize;

/// One advertised model.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct ModelInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

pub const MODEL_CATALOG: &[ModelInfo] = &[
    ModelInfo {
        id: "llama-3.1-8b-instant",
        name: "LLaMA3 8B",
        description: "Fast and efficient model for general conversations",
    },
    ModelInfo {
        id: "llama3-70b-8192",
        name: "LLaMA3 70B",
        description: "More powerful model for complex tasks",
    },
    ModelInfo {
        id: "mixtral-8x7b-32768",
        name: "Mixtral 8x7B",
        description: "High-performance mixture of experts model",
    },
    ModelInfo {
        id: "gemma-7b-it",
        name: "Gemma 7B",
        description: "Google's Gemma model for instruction following",
    },
];

/// Exact, case-sensitive membership check against [`MODEL_CATALOG`].
pub fn is_supported_model(model: &str) -> bool {
    MODEL_CATALOG.iter().any(|m| m.id == model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_models_are_supported() {
        for id in [
            "llama-3.1-8b-instant",
            "llama3-70b-8192",
            "mixtral-8x7b-32768",
            "gemma-7b-it",
        ] {
            assert!(is_supported_model(id), "{id} should be supported");
        }
    }

    #[test]
    fn anything_else_is_rejected() {
        for id in [
            "invalid-model",
            "gpt-4",
            "",
            "llama3-8b-8193",
            "GEMMA-7B-IT",
            " gemma-7b-it",
        ] {
            assert!(!is_supported_model(id), "{id:?} should be rejected");
        }
    }

    #[test]
    fn catalog_ids_are_unique() {
        let mut ids: Vec<_> = MODEL_CATALOG.iter().map(|m| m.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), MODEL_CATALOG.len());
    }
}
