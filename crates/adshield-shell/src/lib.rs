//! AdShield shell: hosts a streaming site in Chromium behind the adshield
//! request filter and page guard.

pub mod config;
pub mod doctor;
pub mod keyboard;
pub mod navigation;
pub mod renderer;
pub mod repl;

pub use config::ShellConfig;
pub use keyboard::{KeyCommand, KeyboardBridge};
pub use navigation::NavigationController;
pub use renderer::{NavigationResult, NoopRenderer, RenderContext, Renderer};
