//! UI-facing state owned by the engine.
//!
//! Nothing here draws; `ofti_tui` reads these types and renders them.

mod input;
mod key;
mod menu;
mod viewer;

pub use input::DraftInput;
pub use key::Key;
pub use menu::{BACK_LABEL, MenuState};
pub use viewer::{SUSPICIOUS_HEADER, VIEWER_HEADER, VIEWER_HELP, ViewerState};
