//! Test runner with per-test fault containment
//!
//! Every test function runs on its own worker thread inside `catch_unwind`.
//! Whatever happens there (a return value, a raised exception, a panic, a hang)
//! comes back to the runner as a [`RawResult`] and the run moves on to the next
//! case. Compilation goes through the same boundary, so a failing, panicking
//! or hanging compile only affects that module.

use std::any::Any;
use std::fs;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tally_core::{CompileError, Raised, Toolchain, Value};
use tracing::{debug, info, warn};

use crate::error::{HarnessError, Result};
use crate::test_discovery::{discover, is_test_entry_point, TestCase, TestModule};
use crate::test_report::RunReport;
use crate::test_result::{classify, Outcome, RawResult};

/// Function name of the synthetic case recorded for a module that fails to compile
pub const COMPILE_CASE: &str = "<compile>";

/// Default bound on a single test invocation
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Name prefix of the threads compiles and test invocations run on
pub const WORKER_THREAD_PREFIX: &str = "tally:";

const WORKER_STACK_SIZE: usize = 64 * 1024 * 1024;

/// Test runner configuration
#[derive(Debug, Clone)]
pub struct TestRunnerConfig {
    /// Per-test time bound; `None` waits forever
    pub timeout: Option<Duration>,

    /// Keep per-test detail in the report
    pub verbose: bool,

    /// Only run test functions whose name contains this
    pub filter: Option<String>,
}

impl Default for TestRunnerConfig {
    fn default() -> Self {
        Self {
            timeout: Some(DEFAULT_TIMEOUT),
            verbose: false,
            filter: None,
        }
    }
}

/// One test case together with its classified outcome
#[derive(Debug, Clone)]
pub struct TestRecord {
    pub case: TestCase,
    pub outcome: Outcome,
    pub duration: Duration,
}

/// Test runner
pub struct TestRunner<T: Toolchain> {
    config: TestRunnerConfig,
    toolchain: Arc<T>,
}

impl<T: Toolchain> TestRunner<T> {
    pub fn new(toolchain: T, config: TestRunnerConfig) -> Self {
        Self {
            config,
            toolchain: Arc::new(toolchain),
        }
    }

    /// Discover, run and aggregate every test under `root`
    pub fn run_suite(&self, root: &Path) -> Result<RunReport> {
        check_root(root)?;

        let modules = discover(root, self.toolchain.source_extension());
        info!("Running {} test module(s) from {}", modules.len(), root.display());

        let records: Vec<TestRecord> = modules.iter().flat_map(|module| self.run_module(module)).collect();

        Ok(RunReport::aggregate(records, self.config.verbose))
    }

    /// Compile `module` and run each of its test functions in order
    pub fn run_module(&self, module: &TestModule) -> Vec<TestRecord> {
        let start = Instant::now();
        let unit = match self.compile(module) {
            Ok(unit) => unit,
            Err(e) => {
                warn!("Failed to compile {}: {}", module.path.display(), e);
                return vec![TestRecord {
                    case: TestCase {
                        module: module.clone(),
                        function_name: COMPILE_CASE.to_string(),
                        arity: 0,
                    },
                    outcome: Outcome::error(
                        Value::tuple([Value::atom("compile_error"), Value::string(e.message)]),
                        module.path.display().to_string(),
                    ),
                    duration: start.elapsed(),
                }];
            }
        };

        let mut records = Vec::new();
        for export in self.toolchain.exports(&unit) {
            if !is_test_entry_point(&export.name, export.arity) {
                debug!("Skipping {}/{}: not a test entry point", export.name, export.arity);
                continue;
            }
            if !self.should_run_test(&export.name) {
                continue;
            }
            let case = TestCase {
                module: module.clone(),
                function_name: export.name,
                arity: export.arity,
            };
            records.push(self.run_case(case, &unit));
        }

        info!(
            "{}: {} test(s) in {:.2}s",
            module.relative_path.display(),
            records.len(),
            start.elapsed().as_secs_f64()
        );
        records
    }

    /// Run one case through the containment boundary and classify it
    pub fn run_case(&self, case: TestCase, unit: &Arc<T::Unit>) -> TestRecord {
        let start = Instant::now();
        let raw = self.execute(&case.function_name, unit);
        let duration = start.elapsed();
        let outcome = classify(raw, &case.function_name);
        debug!("{} ... {}", case.qualified_name(), outcome);
        TestRecord {
            case,
            outcome,
            duration,
        }
    }

    fn should_run_test(&self, name: &str) -> bool {
        match &self.config.filter {
            Some(filter) => name.contains(filter.as_str()),
            None => true,
        }
    }

    /// Compile on a worker so a crashing or hanging compiler only costs this module
    fn compile(&self, module: &TestModule) -> std::result::Result<Arc<T::Unit>, CompileError> {
        let toolchain = Arc::clone(&self.toolchain);
        let path = module.path.clone();
        let label = module.relative_path.display().to_string();

        match self.contain(&label, move || toolchain.compile(&path)) {
            Ok(compiled) => compiled.map(Arc::new),
            Err(Escape::Panicked(message)) => Err(CompileError::new(format!("compiler panicked: {}", message))),
            Err(Escape::TimedOut(limit)) => Err(CompileError::new(format!(
                "compilation did not finish within {}ms",
                limit.as_millis()
            ))),
            Err(Escape::Lost(message)) => Err(CompileError::new(message)),
        }
    }

    /// The containment boundary
    fn execute(&self, function: &str, unit: &Arc<T::Unit>) -> RawResult {
        let toolchain = Arc::clone(&self.toolchain);
        let unit = Arc::clone(unit);
        let name = function.to_string();

        match self.contain(function, move || toolchain.invoke(&unit, &name, &[])) {
            Ok(Ok(value)) => RawResult::Returned(value),
            Ok(Err(Raised(payload))) => RawResult::Raised(payload),
            Err(Escape::Panicked(message)) | Err(Escape::Lost(message)) => RawResult::Crashed(message),
            Err(Escape::TimedOut(limit)) => RawResult::TimedOut(limit),
        }
    }

    /// Run `work` on a fresh worker thread inside `catch_unwind`, waiting at
    /// most the configured timeout
    fn contain<R, F>(&self, label: &str, work: F) -> std::result::Result<R, Escape>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel();

        let spawned = thread::Builder::new()
            .name(format!("{}{}", WORKER_THREAD_PREFIX, label))
            .stack_size(WORKER_STACK_SIZE)
            .spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(work))
                    .map_err(|payload| Escape::Panicked(panic_message(payload.as_ref())));
                // The runner may have stopped waiting
                let _ = sender.send(result);
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => return Err(Escape::Lost(format!("failed to start worker: {}", e))),
        };

        let received = match self.config.timeout {
            Some(limit) => receiver.recv_timeout(limit).map_err(|e| match e {
                RecvTimeoutError::Timeout => Escape::TimedOut(limit),
                RecvTimeoutError::Disconnected => worker_vanished(),
            }),
            None => receiver.recv().map_err(|_| worker_vanished()),
        };

        match received {
            Ok(result) => {
                let _ = handle.join();
                result
            }
            Err(escape) => {
                if matches!(escape, Escape::TimedOut(_)) {
                    warn!("{} did not finish in time; abandoning its worker", label);
                }
                Err(escape)
            }
        }
    }
}

/// How work left the containment boundary without producing a value
#[derive(Debug)]
enum Escape {
    Panicked(String),
    TimedOut(Duration),
    Lost(String),
}

fn worker_vanished() -> Escape {
    Escape::Lost("worker exited without reporting a result".to_string())
}

/// Text of a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn check_root(root: &Path) -> Result<()> {
    let metadata = fs::metadata(root).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => HarnessError::RootNotFound {
            path: root.to_path_buf(),
        },
        _ => HarnessError::RootUnreadable {
            path: root.to_path_buf(),
            source,
        },
    })?;

    if !metadata.is_dir() {
        return Err(HarnessError::RootNotDirectory {
            path: root.to_path_buf(),
        });
    }

    fs::read_dir(root).map_err(|source| HarnessError::RootUnreadable {
        path: root.to_path_buf(),
        source,
    })?;

    Ok(())
}
