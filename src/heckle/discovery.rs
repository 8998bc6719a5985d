//! Glob discovery of executable test files.
//!
//! Every file matching the pattern becomes one test case named after its file
//! stem; cases are grouped per directory. A test passes iff its process exits 0.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;
use std::time::Duration;

use log::debug;

use super::engine::{DiscoveryError, TestDiscovery};
use super::suite::{TestContext, TestFault, TestNode};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Discovers command tests under a working directory.
#[derive(Debug, Clone)]
pub struct GlobDiscovery {
    workdir: PathBuf,
}

impl GlobDiscovery {
    /// Tests run with `workdir` as their current directory.
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Bare stem, or the workdir-relative path when another match shares the stem.
fn test_name(path: &Path, workdir: &Path, stem_counts: &HashMap<String, usize>) -> String {
    let stem = file_stem(path);
    if stem_counts.get(&stem).copied().unwrap_or(0) < 2 {
        return stem;
    }
    let workdir = workdir.canonicalize().unwrap_or_else(|_| workdir.to_path_buf());
    let absolute = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    absolute
        .strip_prefix(&workdir)
        .or_else(|_| path.strip_prefix(&workdir))
        .unwrap_or(path)
        .display()
        .to_string()
}

/// Run `program`, killing it if the watchdog cancels the test.
fn run_command(name: &str, program: &Path, workdir: &Path, ctx: &TestContext) -> Result<(), TestFault> {
    let mut child = Command::new(program)
        .current_dir(workdir)
        .stdin(std::process::Stdio::null())
        .stdout(ctx.stdio())
        .stderr(ctx.stdio())
        .spawn()
        .map_err(|err| TestFault::new(name, format!("failed to start {}: {err}", program.display())))?;

    loop {
        match child.try_wait() {
            Ok(Some(status)) if status.success() => return Ok(()),
            Ok(Some(status)) => {
                return Err(TestFault::new(name, format!("exited with {status}")));
            }
            Ok(None) if ctx.is_cancelled() => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(TestFault::new(name, "cancelled"));
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(err) => return Err(TestFault::new(name, format!("wait failed: {err}"))),
        }
    }
}

impl TestDiscovery for GlobDiscovery {
    fn discover(&self, pattern: &str) -> Result<Vec<TestNode>, DiscoveryError> {
        let paths = glob::glob(pattern).map_err(|err| DiscoveryError::InvalidPattern {
            pattern: pattern.to_string(),
            message: err.to_string(),
        })?;

        let mut files = Vec::new();
        for entry in paths {
            let path = entry.map_err(|err| DiscoveryError::Io(err.into_error()))?;
            if path.is_file() {
                files.push(path);
            }
        }

        let mut stem_counts: HashMap<String, usize> = HashMap::new();
        for path in &files {
            *stem_counts.entry(file_stem(path)).or_default() += 1;
        }

        let mut groups: BTreeMap<PathBuf, Vec<TestNode>> = BTreeMap::new();
        for path in files {
            let name = test_name(&path, &self.workdir, &stem_counts);
            debug!("discovered test {name} at {}", path.display());

            let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
            let program = path.canonicalize()?;
            let workdir = self.workdir.clone();
            let case_name = name.clone();
            groups.entry(dir).or_default().push(TestNode::case(name, move |ctx| {
                run_command(&case_name, &program, &workdir, ctx)
            }));
        }

        Ok(groups.into_values().map(TestNode::Group).collect())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    use tempfile::tempdir;

    use super::*;
    use crate::heckle::scheduler::AdaptiveScheduler;

    fn script(dir: &Path, name: &str, body: &str) {
        fs::create_dir_all(dir).expect("test dir should be created");
        let path = dir.join(name);
        fs::write(&path, format!("#!/usr/bin/env sh\n{body}\n")).expect("script should be written");
        fs::set_permissions(&path, PermissionsExt::from_mode(0o755))
            .expect("script should be executable");
    }

    #[test]
    fn discovers_scripts_grouped_by_directory() {
        let tmp = tempdir().expect("tempdir should be created");
        script(&tmp.path().join("test"), "test_add.sh", "exit 0");
        script(&tmp.path().join("test"), "test_sub.sh", "exit 1");
        script(&tmp.path().join("test/unit"), "test_mul.sh", "exit 0");
        fs::write(tmp.path().join("test/helper.txt"), "not a test").expect("file should be written");

        let discovery = GlobDiscovery::new(tmp.path());
        let pattern = tmp.path().join("test/**/test_*.sh");
        let tree = discovery
            .discover(&pattern.to_string_lossy())
            .expect("discovery should work");

        assert_eq!(tree.len(), 2);
        let mut scheduler = AdaptiveScheduler::new(tree);
        assert_eq!(scheduler.test_count(), 3);

        let outcome = scheduler.run(None, None).expect("run should finish");
        assert!(outcome.failure_detected);
        assert_eq!(outcome.fault.map(|f| f.test), Some("test_sub".to_string()));
    }

    #[test]
    fn scripts_run_in_the_workdir() {
        let tmp = tempdir().expect("tempdir should be created");
        fs::write(tmp.path().join("marker"), "x").expect("marker should be written");
        script(&tmp.path().join("test"), "test_marker.sh", "test -f marker");

        let tree = GlobDiscovery::new(tmp.path())
            .discover(&tmp.path().join("test/test_*").to_string_lossy())
            .expect("discovery should work");
        let outcome = AdaptiveScheduler::new(tree)
            .run(None, None)
            .expect("run should finish");
        assert!(outcome.passed());
    }

    #[test]
    fn hung_script_is_killed_on_timeout() {
        let tmp = tempdir().expect("tempdir should be created");
        script(&tmp.path().join("test"), "test_hang.sh", "sleep 30");

        let tree = GlobDiscovery::new(tmp.path())
            .discover(&tmp.path().join("test/test_*").to_string_lossy())
            .expect("discovery should work");
        let err = AdaptiveScheduler::new(tree)
            .run(None, Some(Duration::from_millis(200)))
            .expect_err("hung script should time out");
        assert!(err.to_string().contains("test_hang"));
    }

    #[test]
    fn colliding_stems_are_named_by_relative_path() {
        let tmp = tempdir().expect("tempdir should be created");
        script(&tmp.path().join("test"), "test_add.sh", "exit 0");
        script(&tmp.path().join("test/unit"), "test_add.sh", "exit 0");
        script(&tmp.path().join("test/unit"), "test_sub.sh", "exit 0");

        let tree = GlobDiscovery::new(tmp.path())
            .discover(&tmp.path().join("test/**/test_*.sh").to_string_lossy())
            .expect("discovery should work");
        let mut names: Vec<String> = crate::heckle::suite::flatten(&tree)
            .iter()
            .map(|case| case.name().to_string())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec!["test/test_add.sh", "test/unit/test_add.sh", "test_sub"]
        );

        let mut scheduler = AdaptiveScheduler::new(tree);
        scheduler.run(None, None).expect("run should finish");
        assert_eq!(scheduler.durations().len(), 3);
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let err = GlobDiscovery::new(".")
            .discover("test/[")
            .expect_err("pattern should be rejected");
        assert!(matches!(err, DiscoveryError::InvalidPattern { .. }));
    }
}
