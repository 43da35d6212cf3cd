pub mod executor;
pub mod indexer;
pub mod manager;
pub mod validator;

pub use executor::OperationExecutor;
pub use manager::Organizer;
pub use validator::{validate_config, ConfigValidationError};

use serde::{Deserialize, Serialize};

/// A configuration usable by the organizer.
///
/// `src`, `dst` and `ops` stay optional so that a missing section is a
/// validation outcome with its own error key instead of a parse failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub id: i64,
    pub name: String,
    pub src: Option<ConfigSrc>,
    pub dst: Option<ConfigDst>,
    pub ops: Option<ConfigOps>,
}

/// Source directory options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSrc {
    pub dir: String,
    pub include_subdirs: bool,
    #[serde(default)]
    pub default_op_type: OpType,
}

/// Destination directory options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigDst {
    pub dirs: Vec<DstDir>,
}

/// A destination directory bound to a hotkey.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DstDir {
    pub hotkey: String,
    pub dir: String,
}

/// Operation execution options.
///
/// Both fields are signed so that negative or oversized inputs reach the
/// validator and come back as keyed errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigOps {
    pub num_workers: i64,
    pub max_tries: i64,
}

/// The kind of filesystem operation applied to a file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpType {
    Copy,
    Move,
    /// Catch-all for unrecognized or missing values; never valid.
    #[default]
    #[serde(other)]
    Unknown,
}

impl OpType {
    pub fn is_valid(self) -> bool {
        !matches!(self, OpType::Unknown)
    }
}

/// A regular file managed by the organizer.
///
/// Immutable once indexed; `id` is 1-based in enumeration order and doubles
/// as the id of the operation eventually created for the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    pub id: i64,
    pub name: String,
    pub dir: String,
    pub path: String,
    pub ext: String,
    pub size: u64,
    pub url: String,
}

/// A copy-or-move of one file, created once per accepted hotkey and
/// submitted exactly once to the executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub id: i64,
    pub op: OpType,
    pub src_path: String,
    pub dst_path: String,
    pub max_tries: u32,
}

/// Value snapshot of the organizer, safe to hand to concurrent consumers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizerStatus {
    pub config: Option<Config>,
    pub current_file: Option<File>,
    pub current_file_index: usize,
    pub num_files: usize,
}
