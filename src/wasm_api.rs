//! `#[wasm_bindgen]` exports for starting a studio from JavaScript.
//!
//! Only compiled when targeting wasm32.

#![cfg(target_arch = "wasm32")]

use wasm_bindgen::prelude::*;

use crate::config::StudioConfig;
use crate::runtime::run_studio;
use crate::studio::Studio;

#[wasm_bindgen]
pub struct JsStudio {
    config: StudioConfig,
    expressions: Vec<String>,
    canvas_id: String,
}

#[wasm_bindgen]
impl JsStudio {
    /// `config_json` may be empty for defaults. `canvas_id` is the element id without `#`.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str, canvas_id: &str) -> Result<JsStudio, JsValue> {
        let config = if config_json.trim().is_empty() {
            StudioConfig::default()
        } else {
            StudioConfig::from_json_str(config_json)
                .map_err(|e| JsValue::from_str(&format!("{e:?}")))?
        };
        Ok(JsStudio {
            config,
            expressions: Vec::new(),
            canvas_id: canvas_id.to_string(),
        })
    }

    /// Queue an expression for the first frame. Parse errors are returned immediately.
    #[wasm_bindgen]
    pub fn add(&mut self, expression: &str) -> Result<(), JsValue> {
        crate::expr::parse(expression).map_err(|e| JsValue::from_str(&e.to_string()))?;
        self.expressions.push(expression.to_string());
        Ok(())
    }

    /// Start the Bevy render loop. Does not return on the web.
    #[wasm_bindgen]
    pub fn start(self) {
        let mut studio = Studio::new(&self.config.surface);
        for expr in &self.expressions {
            if let Err(err) = studio.submit(expr) {
                tracing::warn!("skipping {expr:?}: {err}");
            }
        }
        run_studio(studio, self.config, &self.canvas_id);
    }
}
