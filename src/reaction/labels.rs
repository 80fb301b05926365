//! Lookup-table translation for the few strings the game core exposes.

/// Resolves display strings by key, substituting `{name}` placeholders.
pub trait Translator: Send + Sync {
    /// Translate `key`, filling in `params`.
    fn translate(&self, key: &str, params: &[(&str, String)]) -> String;
}

/// Built-in English strings. Unknown keys are returned as-is.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnglishLabels;

impl EnglishLabels {
    fn template(key: &str) -> Option<&'static str> {
        let text = match key {
            "phase.idle" => "Click anywhere to start.",
            "phase.armed" => "Wait for green...",
            "phase.premature" => "Too soon! Click to try again.",
            "phase.triggered" => "Click!",
            "phase.measured" => "{latency} ms. Click to keep going.",
            "phase.completed" => "Average: {average} ms. Click to restart.",
            "attempts.progress" => "Attempt {current} of {total}",
            _ => return None,
        };
        Some(text)
    }
}

impl Translator for EnglishLabels {
    fn translate(&self, key: &str, params: &[(&str, String)]) -> String {
        let Some(template) = Self::template(key) else {
            return key.to_string();
        };
        params
            .iter()
            .fold(template.to_string(), |text, (name, value)| {
                text.replace(&format!("{{{name}}}"), value)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_placeholders() {
        let text = EnglishLabels.translate("phase.measured", &[("latency", "231".into())]);
        assert_eq!(text, "231 ms. Click to keep going.");
    }

    #[test]
    fn unknown_key_falls_through() {
        assert_eq!(EnglishLabels.translate("menu.title", &[]), "menu.title");
    }
}
