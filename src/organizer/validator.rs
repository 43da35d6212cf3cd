use super::{Config, ConfigDst, ConfigOps, ConfigSrc};
use crate::utils::fsops;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// Error keys. Per-destination keys carry the directory's position in the
// input sequence, e.g. `config.dst.dirs.2.hotkey`.
pub const ERR_KEY_CONFIG: &str = "config";
pub const ERR_KEY_CONFIG_NAME: &str = "config.name";
pub const ERR_KEY_SRC: &str = "config.src";
pub const ERR_KEY_SRC_DIR: &str = "config.src.dir";
pub const ERR_KEY_SRC_DEFAULT_OP_TYPE: &str = "config.src.defaultOpType";
pub const ERR_KEY_DST: &str = "config.dst";
pub const ERR_KEY_DST_DIRS: &str = "config.dst.dirs";
pub const ERR_KEY_OPS: &str = "config.ops";
pub const ERR_KEY_OPS_NUM_WORKERS: &str = "config.ops.numWorkers";
pub const ERR_KEY_OPS_MAX_TRIES: &str = "config.ops.maxTries";

pub fn dst_dir_hotkey_key(index: usize) -> String {
    format!("config.dst.dirs.{index}.hotkey")
}

pub fn dst_dir_path_key(index: usize) -> String {
    format!("config.dst.dirs.{index}.dir")
}

// Error messages.
const ERR_CONFIG_NIL: &str = "no configuration found";
const ERR_CONFIG_NAME_EMPTY: &str = "name is empty";
const ERR_SRC_NIL: &str = "no source configuration found";
const ERR_SRC_DIR_PATH_EMPTY: &str = "path is empty";
const ERR_SRC_DIR_PATH_NOT_VALID: &str = "path is not valid";
const ERR_SRC_DIR_EMPTY: &str = "directory contains no files";
const ERR_SRC_DEFAULT_OP_TYPE_NOT_VALID: &str = "default operation type is not valid";
const ERR_DST_NIL: &str = "no destination configuration found";
const ERR_DST_DIRS_EMPTY: &str = "no destination directories";
const ERR_DST_DIR_HOTKEY_EMPTY: &str = "hotkey is empty";
const ERR_DST_DIR_HOTKEY_NOT_ONE_CHAR: &str = "hotkey is too long";
const ERR_DST_DIR_HOTKEY_DUPLICATE: &str = "hotkey is a duplicate";
const ERR_DST_DIR_PATH_EMPTY: &str = "path is empty";
const ERR_DST_DIR_PATH_NOT_VALID: &str = "path is not valid";
const ERR_DST_DIR_PATH_IS_SRC_DIR: &str = "path points to the source directory";
const ERR_DST_DIR_PATH_INSIDE_SRC_DIR: &str = "path is inside the source directory";
const ERR_OPS_NIL: &str = "no operations configuration found";
const ERR_OPS_NUM_WORKERS_TOO_LOW: &str = "number of workers is less than one";
const ERR_OPS_NUM_WORKERS_TOO_HIGH: &str = "number of workers is more than five";
const ERR_OPS_MAX_TRIES_TOO_LOW: &str = "number of maximum operation tries is less than one";
const ERR_OPS_MAX_TRIES_TOO_HIGH: &str = "number of maximum operation tries is more than one million";

pub const MIN_NUM_WORKERS: i64 = 1;
pub const MAX_NUM_WORKERS: i64 = 5;
pub const MIN_MAX_TRIES: i64 = 1;
pub const MAX_MAX_TRIES: i64 = 1_000_000;

/// The full set of validation failures for one configuration, keyed by
/// field. Every applicable rule contributes its own entry; rules whose
/// parent section is absent are skipped, not failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("invalid configuration: {errors:?}")]
pub struct ConfigValidationError {
    pub errors: BTreeMap<String, String>,
}

impl ConfigValidationError {
    fn add(&mut self, key: impl Into<String>, msg: &str) {
        self.errors.insert(key.into(), msg.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validates a configuration against every rule, accumulating one keyed
/// message per violated rule. Stateless; the only I/O is read-only
/// filesystem probes (existence, emptiness, containment).
pub fn validate_config(config: Option<&Config>) -> Result<(), ConfigValidationError> {
    let mut errs = ConfigValidationError::default();

    let Some(config) = config else {
        errs.add(ERR_KEY_CONFIG, ERR_CONFIG_NIL);
        return Err(errs);
    };

    if is_blank(&config.name) {
        errs.add(ERR_KEY_CONFIG_NAME, ERR_CONFIG_NAME_EMPTY);
    }

    match &config.src {
        None => errs.add(ERR_KEY_SRC, ERR_SRC_NIL),
        Some(src) => validate_src(src, &mut errs),
    }

    match &config.dst {
        None => errs.add(ERR_KEY_DST, ERR_DST_NIL),
        Some(dst) => validate_dst(dst, config.src.as_ref(), &mut errs),
    }

    match &config.ops {
        None => errs.add(ERR_KEY_OPS, ERR_OPS_NIL),
        Some(ops) => validate_ops(ops, &mut errs),
    }

    if errs.is_empty() {
        Ok(())
    } else {
        Err(errs)
    }
}

fn validate_src(src: &ConfigSrc, errs: &mut ConfigValidationError) {
    if is_blank(&src.dir) {
        errs.add(ERR_KEY_SRC_DIR, ERR_SRC_DIR_PATH_EMPTY);
    } else if !fsops::is_dir(&src.dir) {
        errs.add(ERR_KEY_SRC_DIR, ERR_SRC_DIR_PATH_NOT_VALID);
    } else if !fsops::has_any_file(&src.dir, src.include_subdirs) {
        errs.add(ERR_KEY_SRC_DIR, ERR_SRC_DIR_EMPTY);
    }

    if !src.default_op_type.is_valid() {
        errs.add(ERR_KEY_SRC_DEFAULT_OP_TYPE, ERR_SRC_DEFAULT_OP_TYPE_NOT_VALID);
    }
}

fn validate_dst(dst: &ConfigDst, src: Option<&ConfigSrc>, errs: &mut ConfigValidationError) {
    if dst.dirs.is_empty() {
        errs.add(ERR_KEY_DST_DIRS, ERR_DST_DIRS_EMPTY);
        return;
    }

    // Source-containment checks only make sense against a usable source
    // directory; they are skipped (not failed) otherwise.
    let src_dir = src
        .map(|s| s.dir.as_str())
        .filter(|dir| !is_blank(dir) && fsops::is_dir(dir));

    let mut seen_hotkeys = std::collections::BTreeSet::new();
    for (i, dst_dir) in dst.dirs.iter().enumerate() {
        if is_blank(&dst_dir.hotkey) {
            errs.add(dst_dir_hotkey_key(i), ERR_DST_DIR_HOTKEY_EMPTY);
        } else if dst_dir.hotkey.chars().count() != 1 {
            errs.add(dst_dir_hotkey_key(i), ERR_DST_DIR_HOTKEY_NOT_ONE_CHAR);
        } else if !seen_hotkeys.insert(dst_dir.hotkey.clone()) {
            // First occurrence stays unflagged; every repeat is flagged.
            errs.add(dst_dir_hotkey_key(i), ERR_DST_DIR_HOTKEY_DUPLICATE);
        }

        if is_blank(&dst_dir.dir) {
            errs.add(dst_dir_path_key(i), ERR_DST_DIR_PATH_EMPTY);
        } else if !fsops::is_dir(&dst_dir.dir) {
            errs.add(dst_dir_path_key(i), ERR_DST_DIR_PATH_NOT_VALID);
        } else if let Some(src_dir) = src_dir {
            if fsops::same_dir(&dst_dir.dir, src_dir).unwrap_or(false) {
                errs.add(dst_dir_path_key(i), ERR_DST_DIR_PATH_IS_SRC_DIR);
            } else if fsops::is_subdir_of(&dst_dir.dir, src_dir).unwrap_or(false) {
                errs.add(dst_dir_path_key(i), ERR_DST_DIR_PATH_INSIDE_SRC_DIR);
            }
        }
    }
}

fn validate_ops(ops: &ConfigOps, errs: &mut ConfigValidationError) {
    if ops.num_workers < MIN_NUM_WORKERS {
        errs.add(ERR_KEY_OPS_NUM_WORKERS, ERR_OPS_NUM_WORKERS_TOO_LOW);
    } else if ops.num_workers > MAX_NUM_WORKERS {
        errs.add(ERR_KEY_OPS_NUM_WORKERS, ERR_OPS_NUM_WORKERS_TOO_HIGH);
    }

    if ops.max_tries < MIN_MAX_TRIES {
        errs.add(ERR_KEY_OPS_MAX_TRIES, ERR_OPS_MAX_TRIES_TOO_LOW);
    } else if ops.max_tries > MAX_MAX_TRIES {
        errs.add(ERR_KEY_OPS_MAX_TRIES, ERR_OPS_MAX_TRIES_TOO_HIGH);
    }
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}
