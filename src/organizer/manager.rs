use super::executor::OperationExecutor;
use super::indexer::{self, IndexError};
use super::validator::{self, ConfigValidationError};
use super::{Config, File, OpType, Operation, OrganizerStatus};
use crate::utils::fsops;
use crate::web::PreviewServer;
use parking_lot::Mutex;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

/// The hotkey that advances past the current file without acting on it.
pub const SKIP_HOTKEY: &str = " ";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Validation(#[from] ConfigValidationError),
    #[error(transparent)]
    Index(#[from] IndexError),
}

/// The live state for one loaded configuration. Exactly one session
/// exists at a time; loading a new configuration replaces it wholesale.
struct Session {
    config: Config,
    files: Vec<File>,
    cursor: usize,
    default_op_type: OpType,
    max_tries: u32,
    executor: OperationExecutor,
    preview: PreviewServer,
}

/// Walks a working set of files one at a time, turning destination
/// hotkeys into asynchronous copy-or-move operations.
///
/// All session state sits behind a single exclusive lock, so mutating
/// calls and status reads never observe a half-updated cursor or a
/// session mid-swap. Operations are submitted while holding the lock but
/// execute on worker threads outside it.
pub struct Organizer {
    session: Mutex<Option<Session>>,
}

impl Organizer {
    pub fn new() -> Self {
        Self {
            session: Mutex::new(None),
        }
    }

    /// Validates and loads `config`, replacing any existing session.
    ///
    /// The old session is cancel-stopped first: a new load must not block
    /// on stale queued work. On any failure the organizer is left empty.
    pub fn load_config(&self, config: Config) -> Result<OrganizerStatus, LoadError> {
        let mut guard = self.session.lock();
        stop_session(guard.take(), ShutdownMode::Cancel);

        validator::validate_config(Some(&config))?;

        // Validation just guaranteed all three sections.
        let src = config.src.as_ref().expect("validated config has src");
        let ops = config.ops.as_ref().expect("validated config has ops");

        let files = indexer::index_files(&src.dir, src.include_subdirs)?;
        info!(
            "loaded configuration {:?}: {} files under {}",
            config.name,
            files.len(),
            src.dir
        );

        let default_op_type = src.default_op_type;
        let max_tries = ops.max_tries as u32;
        let preview = PreviewServer::start(Path::new(&src.dir));
        let executor = OperationExecutor::new(ops.num_workers as usize);
        *guard = Some(Session {
            config,
            files,
            cursor: 0,
            default_op_type,
            max_tries,
            executor,
            preview,
        });

        Ok(status_of(&guard))
    }

    /// Applies a hotkey to the current file: space skips, a bound hotkey
    /// submits an operation and advances, anything else is a no-op. Also
    /// a no-op when no session is loaded or the session is exhausted.
    pub fn handle_hotkey(&self, hotkey: &str) -> OrganizerStatus {
        let mut guard = self.session.lock();
        if let Some(session) = guard.as_mut() {
            session.handle_hotkey(hotkey);
        }
        status_of(&guard)
    }

    /// Drops the session, draining the executor: every submitted
    /// operation, queued or in flight, completes before this returns.
    pub fn drop_config_wait(&self) -> OrganizerStatus {
        let mut guard = self.session.lock();
        stop_session(guard.take(), ShutdownMode::Drain);
        status_of(&guard)
    }

    /// Drops the session, cancelling the executor: queued operations are
    /// discarded, only in-flight ones finish.
    pub fn drop_config(&self) -> OrganizerStatus {
        let mut guard = self.session.lock();
        stop_session(guard.take(), ShutdownMode::Cancel);
        status_of(&guard)
    }

    /// Value snapshot of the current state; all-absent when no session
    /// is loaded.
    pub fn status(&self) -> OrganizerStatus {
        status_of(&self.session.lock())
    }
}

impl Default for Organizer {
    fn default() -> Self {
        Self::new()
    }
}

enum ShutdownMode {
    Drain,
    Cancel,
}

fn stop_session(session: Option<Session>, mode: ShutdownMode) {
    let Some(session) = session else {
        return;
    };
    session.preview.stop();
    match mode {
        ShutdownMode::Drain => session.executor.stop_wait(),
        ShutdownMode::Cancel => session.executor.stop(),
    }
}

fn status_of(session: &Option<Session>) -> OrganizerStatus {
    match session {
        None => OrganizerStatus::default(),
        Some(session) => OrganizerStatus {
            config: Some(session.config.clone()),
            current_file: session.current_file().cloned(),
            current_file_index: session.cursor,
            num_files: session.files.len(),
        },
    }
}

impl Session {
    fn current_file(&self) -> Option<&File> {
        self.files.get(self.cursor)
    }

    fn handle_hotkey(&mut self, hotkey: &str) {
        let Some(file) = self.files.get(self.cursor) else {
            // Exhausted: every hotkey is a no-op until a new load.
            return;
        };

        if hotkey == SKIP_HOTKEY {
            debug!("skipping {}", file.path);
            self.cursor += 1;
            return;
        }

        let Some(dst_dir) = self.dst_dir_for(hotkey) else {
            debug!("unrecognized hotkey {hotkey:?}");
            return;
        };

        let op = Operation {
            id: file.id,
            op: self.default_op_type,
            src_path: file.path.clone(),
            dst_path: Path::new(&dst_dir)
                .join(&file.name)
                .to_string_lossy()
                .to_string(),
            max_tries: self.max_tries,
        };
        debug!(
            "submitting {:?} #{}: {} -> {}",
            op.op, op.id, op.src_path, op.dst_path
        );

        // Ownership of the path passes to the pending operation; the
        // session never touches this file again.
        self.executor.submit(move || execute_operation(op));
        self.cursor += 1;
    }

    fn dst_dir_for(&self, hotkey: &str) -> Option<String> {
        self.config
            .dst
            .as_ref()?
            .dirs
            .iter()
            .find(|d| d.hotkey == hotkey)
            .map(|d| d.dir.clone())
    }
}

/// Runs one operation on a worker thread. Fire-and-forget by design: the
/// cursor advanced at submission, so a final failure after the retry
/// budget is logged and otherwise dropped.
fn execute_operation(op: Operation) {
    let result = match op.op {
        OpType::Copy => fsops::copy_file(&op.src_path, &op.dst_path, op.max_tries).map(|_| ()),
        OpType::Move => fsops::move_file(&op.src_path, &op.dst_path, op.max_tries),
        OpType::Unknown => return,
    };
    match result {
        Ok(()) => debug!("{:?} #{} done: {}", op.op, op.id, op.dst_path),
        Err(err) => warn!(
            "{:?} #{} failed after {} tries: {} -> {}: {err}",
            op.op, op.id, op.max_tries, op.src_path, op.dst_path
        ),
    }
}
