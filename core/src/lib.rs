//! Case model for ofti.
//!
//! Everything here works on a case directory on disk: discovery of dictionary
//! files and time directories, `foamDictionary` access behind
//! [`DictionaryBackend`], per-entry metadata, case verification and the
//! banner facts. Nothing in this crate touches the terminal.

pub mod case;
pub mod checkmesh;
pub mod compare;
pub mod dictionary;
pub mod doctor;
pub mod edit_log;
pub mod entry;
pub mod log_analysis;
pub mod metadata;
pub mod verify;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use case::{
    CaseFiles, PickerEntry, discover_case_files, format_g, format_significant, has_mesh,
    is_case_dir, latest_time, list_directory, log_files, relative_display, shell_scripts,
    tail_lines, time_directories,
};
pub use checkmesh::{format_checkmesh_summary, last_courant, mesh_stats};
pub use compare::{DictDiff, compare_case_dicts, format_compare_report};
pub use dictionary::{
    DictionaryBackend, DictionaryError, FOAM_DICTIONARY, FoamDictionary, ensure_environment,
};
pub use doctor::{DoctorReport, case_doctor};
pub use edit_log::{edit_log_path, record_edit};
pub use entry::{EntryCache, EntryMeta, UNREADABLE_VALUE};
pub use log_analysis::{
    LogMetrics, RESIDUAL_PLOT_WIDTH, residual_spark_lines, residual_timeline_report, sparkline,
};
pub use metadata::{CaseMetadata, UNKNOWN, detect_solver, number_of_subdomains};
pub use verify::{FileCheck, find_suspicious_lines, verify_case};
