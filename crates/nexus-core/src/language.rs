//! Supported answer languages

use serde::{Deserialize, Serialize};

/// Languages an answer can be requested in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "hi")]
    Hindi,
    #[serde(rename = "es")]
    Spanish,
    #[serde(rename = "fr")]
    French,
    #[serde(rename = "de")]
    German,
}

impl Language {
    /// ISO 639-1 code
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Hindi => "hi",
            Language::Spanish => "es",
            Language::French => "fr",
            Language::German => "de",
        }
    }

    /// English display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Hindi => "Hindi",
            Language::Spanish => "Spanish",
            Language::French => "French",
            Language::German => "German",
        }
    }

    /// Get all supported languages
    pub fn all() -> Vec<Language> {
        vec![
            Language::English,
            Language::Hindi,
            Language::Spanish,
            Language::French,
            Language::German,
        ]
    }

    /// Parse a language code, `None` when unsupported.
    pub fn parse(code: &str) -> Option<Language> {
        match code.trim().to_lowercase().as_str() {
            "en" => Some(Language::English),
            "hi" => Some(Language::Hindi),
            "es" => Some(Language::Spanish),
            "fr" => Some(Language::French),
            "de" => Some(Language::German),
            _ => None,
        }
    }

    /// Resolve a requested code; unsupported codes fall back to English.
    pub fn resolve(code: &str) -> Language {
        Self::parse(code).unwrap_or_default()
    }

    pub fn is_default(&self) -> bool {
        *self == Language::English
    }

    /// Prompt instruction forcing the answer language, `None` for the default language.
    pub fn prompt_instruction(&self) -> Option<String> {
        if self.is_default() {
            return None;
        }
        let name = self.display_name();
        Some(format!(
            "IMPORTANT: Respond ENTIRELY in {name}. Translate your complete response to {name}. Do not use English in your response."
        ))
    }

    /// Answer given when the knowledge base has nothing relevant.
    pub fn no_knowledge_message(&self) -> &'static str {
        match self {
            Language::English => {
                "I couldn't find any relevant information in the knowledge base. Please upload documents first."
            }
            Language::Hindi => {
                "मुझे ज्ञानकोष में कोई प्रासंगिक जानकारी नहीं मिली। कृपया पहले दस्तावेज़ अपलोड करें।"
            }
            Language::Spanish => {
                "No encontré información relevante en la base de conocimientos. Primero sube documentos."
            }
            Language::French => {
                "Je n'ai trouvé aucune information pertinente dans la base de connaissances. Veuillez d'abord téléverser des documents."
            }
            Language::German => {
                "Ich habe in der Wissensbasis keine relevanten Informationen gefunden. Bitte laden Sie zuerst Dokumente hoch."
            }
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
