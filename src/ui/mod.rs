//! Dear ImGui overlay: context management plus the settings panel that
//! exposes a demo's parameter bus as widgets.

pub mod manager;
pub mod settings_panel;

pub use manager::UiManager;
pub use settings_panel::{settings_panel, transport_panel};
