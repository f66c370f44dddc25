use serde::{Deserialize, Serialize};

/// Dictionary entry block of a lookup response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BasicExplain {
    #[serde(default)]
    pub phonetic: Option<String>,
    #[serde(default, rename = "uk-phonetic")]
    pub uk_phonetic: Option<String>,
    #[serde(default, rename = "us-phonetic")]
    pub us_phonetic: Option<String>,
    #[serde(default)]
    pub explains: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebExplain {
    pub key: String,
    #[serde(default)]
    pub value: Vec<String>,
}

/// A successful lookup as returned by the dictionary service.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LookupResult {
    #[serde(default, rename = "errorCode")]
    pub error_code: i32,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub translation: Vec<String>,
    #[serde(default)]
    pub basic: Option<BasicExplain>,
    #[serde(default)]
    pub web: Vec<WebExplain>,
}

impl LookupResult {
    /// The dictionary explanations when present, otherwise the plain translation.
    pub fn primary_explanations(&self) -> &[String] {
        match &self.basic {
            Some(basic) => &basic.explains,
            None => &self.translation,
        }
    }

    /// Multi-line text shown in the result view.
    pub fn to_display_text(&self) -> String {
        let mut lines: Vec<String> = Vec::new();

        if !self.query.is_empty() {
            lines.push(self.query.clone());
        }

        if let Some(basic) = &self.basic {
            let mut phonetics = Vec::new();
            if let Some(uk) = basic.uk_phonetic.as_deref().filter(|p| !p.is_empty()) {
                phonetics.push(format!("UK [{}]", uk));
            }
            if let Some(us) = basic.us_phonetic.as_deref().filter(|p| !p.is_empty()) {
                phonetics.push(format!("US [{}]", us));
            }
            if phonetics.is_empty() {
                if let Some(p) = basic.phonetic.as_deref().filter(|p| !p.is_empty()) {
                    phonetics.push(format!("[{}]", p));
                }
            }
            if !phonetics.is_empty() {
                lines.push(phonetics.join("  "));
            }
        }

        let explanations = self.primary_explanations();
        if !explanations.is_empty() {
            lines.push(String::new());
            lines.extend(explanations.iter().cloned());
        }

        if self.basic.is_some()
            && !self.translation.is_empty()
            && self.translation != explanations
        {
            lines.push(String::new());
            lines.push("Translation:".to_string());
            lines.extend(self.translation.iter().cloned());
        }

        if !self.web.is_empty() {
            lines.push(String::new());
            lines.push("Web:".to_string());
            for entry in &self.web {
                lines.push(format!("{}: {}", entry.key, entry.value.join("; ")));
            }
        }

        lines.join("\n")
    }
}
