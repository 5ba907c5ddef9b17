use serde::{Deserialize, Serialize};
use wasm_bindgen::JsValue;

const CONFIG_GLOBAL: &str = "DOCCHAT_CONFIG";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScrollMode {
    #[default]
    Smooth,
    Instant,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub highlight_class: String,
    pub prompt_for_api_key: bool,
    pub scroll_mode: ScrollMode,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000/api".to_string(),
            highlight_class: "source-highlight".to_string(),
            prompt_for_api_key: true,
            scroll_mode: ScrollMode::Smooth,
        }
    }
}

impl ClientConfig {
    #[cfg(test)]
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let mut config: Self = serde_json::from_str(raw)?;
        config.normalize();
        Ok(config)
    }

    pub fn from_window() -> Self {
        let Some(window) = web_sys::window() else {
            return Self::default();
        };
        let value = js_sys::Reflect::get(&window, &JsValue::from_str(CONFIG_GLOBAL))
            .unwrap_or(JsValue::UNDEFINED);
        if value.is_undefined() || value.is_null() {
            return Self::default();
        }
        match serde_wasm_bindgen::from_value::<Self>(value) {
            Ok(mut config) => {
                config.normalize();
                config
            }
            Err(err) => {
                log::warn!("ignoring invalid {CONFIG_GLOBAL}: {err}");
                Self::default()
            }
        }
    }

    fn normalize(&mut self) {
        let trimmed = self.api_base_url.trim().trim_end_matches('/');
        self.api_base_url = trimmed.to_string();
        if self.highlight_class.trim().is_empty() {
            self.highlight_class = Self::default().highlight_class;
        }
    }
}
