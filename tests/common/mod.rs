#![allow(dead_code)]

pub use devloop_test_utils::builders::ConfigBuilder;
pub use devloop_test_utils::fake_process::{FakeProcessBackend, ProcessOp};
pub use devloop_test_utils::fake_source::FakeEventSource;
pub use devloop_test_utils::{init_tracing, wait_until, with_timeout};

use std::fs;
use std::path::Path;

/// Create `rel` (and its parents) under `root`.
pub fn mkdirs(root: &Path, rel: &str) {
    fs::create_dir_all(root.join(rel)).expect("create test directory");
}

/// Write `contents` to `rel` under `root`, creating parents.
pub fn write_file(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent directory");
    }
    fs::write(path, contents).expect("write test file");
}
