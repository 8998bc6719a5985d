//! Test tree model: leaf test cases, nested groups, and the context a test body runs with.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::io::{self, Write};
use std::panic;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once};

use thiserror::Error;

/// A fault raised by a test body: failed assertion or unexpected error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{test}: {message}")]
pub struct TestFault {
    /// Name of the faulting test.
    pub test: String,
    /// Failure detail.
    pub message: String,
}

impl TestFault {
    /// Build a fault for `test`.
    pub fn new(test: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            test: test.into(),
            message: message.into(),
        }
    }

    pub(crate) fn from_panic(test: &str, payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "test panicked".to_string()
        };
        Self::new(test, message)
    }
}

type TestBody = dyn Fn(&TestContext) -> Result<(), TestFault> + Send + Sync;

/// Leaf executable test unit.
#[derive(Clone)]
pub struct TestCase {
    name: String,
    body: Arc<TestBody>,
}

impl TestCase {
    /// Create a test case from a name and body.
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&TestContext) -> Result<(), TestFault> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            body: Arc::new(body),
        }
    }

    /// Stable test identity.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn body(&self) -> Arc<TestBody> {
        Arc::clone(&self.body)
    }
}

impl fmt::Debug for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase").field("name", &self.name).finish()
    }
}

/// Test tree node.
#[derive(Debug, Clone)]
pub enum TestNode {
    /// Single test case.
    Leaf(TestCase),
    /// Ordered group of nested nodes.
    Group(Vec<TestNode>),
}

impl TestNode {
    /// Convenience constructor for a leaf.
    pub fn case<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&TestContext) -> Result<(), TestFault> + Send + Sync + 'static,
    {
        TestNode::Leaf(TestCase::new(name, body))
    }
}

/// Depth-first flattening that preserves discovery order.
pub fn flatten(nodes: &[TestNode]) -> Vec<&TestCase> {
    fn walk<'a>(nodes: &'a [TestNode], out: &mut Vec<&'a TestCase>) {
        for node in nodes {
            match node {
                TestNode::Leaf(case) => out.push(case),
                TestNode::Group(children) => walk(children, out),
            }
        }
    }

    let mut out = Vec::new();
    walk(nodes, &mut out);
    out
}

/// Shared switch deciding whether test output reaches the terminal.
#[derive(Debug, Clone, Default)]
pub struct OutputGate {
    silenced: Arc<AtomicBool>,
}

impl OutputGate {
    /// True while a [`SilenceGuard`] is alive.
    pub fn is_silenced(&self) -> bool {
        self.silenced.load(Ordering::SeqCst)
    }

    /// Suppress test output until the returned guard is dropped.
    pub fn silence(&self) -> SilenceGuard {
        let previous = self.silenced.swap(true, Ordering::SeqCst);
        SilenceGuard {
            gate: self.clone(),
            previous,
        }
    }
}

thread_local! {
    static WORKER_GATE: RefCell<Option<OutputGate>> = const { RefCell::new(None) };
}

static PANIC_FILTER: Once = Once::new();

/// Wrap the panic hook so panics on a bound worker thread print nothing while
/// its gate is silenced. Installed once per process; other threads and
/// unsilenced runs still reach the previous hook.
pub(crate) fn install_panic_filter() {
    PANIC_FILTER.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if !panic_output_suppressed() {
                previous(info);
            }
        }));
    });
}

fn panic_output_suppressed() -> bool {
    WORKER_GATE
        .try_with(|gate| gate.borrow().as_ref().is_some_and(OutputGate::is_silenced))
        .unwrap_or(false)
}

/// Restores the previous output state on drop.
#[derive(Debug)]
pub struct SilenceGuard {
    gate: OutputGate,
    previous: bool,
}

impl Drop for SilenceGuard {
    fn drop(&mut self) {
        self.gate.silenced.store(self.previous, Ordering::SeqCst);
    }
}

/// Handle given to every test body while it runs.
///
/// Output meant to be silenced must go through [`TestContext::stdout`],
/// [`TestContext::stderr`] or [`TestContext::stdio`]; `println!` and
/// `eprintln!` write to the process streams and are not captured. Panic
/// messages from the test thread are dropped while the run is silenced.
#[derive(Debug, Clone)]
pub struct TestContext {
    gate: OutputGate,
    cancelled: Arc<AtomicBool>,
}

impl TestContext {
    pub(crate) fn new(gate: OutputGate, cancelled: Arc<AtomicBool>) -> Self {
        Self { gate, cancelled }
    }

    /// Route panic output of the current thread through this context's gate.
    pub(crate) fn bind_to_current_thread(&self) {
        let gate = self.gate.clone();
        let _ = WORKER_GATE.try_with(|slot| *slot.borrow_mut() = Some(gate));
    }

    /// True while the running scheduler suppresses test output.
    pub fn is_silenced(&self) -> bool {
        self.gate.is_silenced()
    }

    /// Writer for test stdout; discards while silenced.
    pub fn stdout(&self) -> Box<dyn Write + Send> {
        if self.gate.is_silenced() {
            Box::new(io::sink())
        } else {
            Box::new(io::stdout())
        }
    }

    /// Writer for test stderr; discards while silenced.
    pub fn stderr(&self) -> Box<dyn Write + Send> {
        if self.gate.is_silenced() {
            Box::new(io::sink())
        } else {
            Box::new(io::stderr())
        }
    }

    /// Stdio for child processes spawned by a test.
    pub fn stdio(&self) -> Stdio {
        if self.gate.is_silenced() {
            Stdio::null()
        } else {
            Stdio::inherit()
        }
    }

    /// True once the watchdog gave up on this test; long-running bodies should stop.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
