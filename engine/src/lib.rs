//! Application state machine for ofti.
//!
//! This crate contains the [`App`] state machine without terminal
//! dependencies. `ofti_tui` renders its state and the binary drives it:
//! key presses in, [`App::tick`] once per frame, and external programs run
//! on request.

mod app;
pub mod state;
pub mod ui;

pub use app::{
    App, AppDeps, EnvLookup, MainAction, NO_CASE_MESSAGE, NO_FOAM_REASON, NOT_A_CASE_MESSAGE,
};
pub use state::{
    BrowserLevel, BrowserState, ConfirmState, EditorState, ExternalOutcome, ExternalRequest,
    MenuKind, MenuScreen, Modal, PendingTask, PickerState, PromptState, Screen, SearchHit,
    StatusKind, StatusMessage,
};
pub use ui::{
    BACK_LABEL, DraftInput, Key, MenuState, SUSPICIOUS_HEADER, VIEWER_HEADER, VIEWER_HELP,
    ViewerState,
};
