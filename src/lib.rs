pub mod camera;
pub mod config;
pub mod core;
pub mod expr;
pub mod render;
pub mod runtime;
pub mod scene;
pub mod studio;
pub mod surface;
pub mod wasm_api;

use thiserror::Error;

/// Context for library-level failures carried inside an [`error_stack::Report`].
#[derive(Debug, Error)]
pub enum StudioError {
    #[error("configuration could not be loaded")]
    Config,
    #[error("surface could not be attached to the scene")]
    Scene,
}

pub type Result<T> = std::result::Result<T, error_stack::Report<StudioError>>;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
}

pub mod prelude {
    pub use crate::camera::*;
    pub use crate::config::*;
    pub use crate::core::*;
    pub use crate::expr::{ExpressionParser, Function, FunctionParser, ParseError, VariableSource};
    pub use crate::render::*;
    pub use crate::runtime::*;
    pub use crate::scene::*;
    pub use crate::studio::*;
    pub use crate::surface::*;
}
