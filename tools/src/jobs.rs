//! Background solver runs recorded in `<case>/.ofti/jobs.json`.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use ofti_core::{last_courant, residual_spark_lines, tail_lines};
use ofti_utils::{CommandRunner, Invocation, atomic_write};
use serde::{Deserialize, Serialize};

use crate::ToolError;

pub const JOB_LOG_TAIL_LINES: usize = 100;

const JOB_SPARK_WIDTH: usize = 30;

/// MPI launchers tried for parallel runs, in order.
pub const MPI_LAUNCHERS: [&str; 2] = ["mpirun", "mpiexec"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Finished,
    /// Sent `SIGTERM` from ofti.
    Stopped,
    /// The stop signal could not be delivered.
    Missing,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Running => "running",
            Self::Finished => "finished",
            Self::Stopped => "stopped",
            Self::Missing => "missing",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub name: String,
    pub pid: u32,
    pub command: String,
    pub log: PathBuf,
    pub status: JobStatus,
    /// Unix seconds.
    pub started_at: i64,
    #[serde(default)]
    pub ended_at: Option<i64>,
}

impl JobRecord {
    /// Jobs list row, e.g. `simpleFoam [running] pid 4242`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} [{}] pid {}", self.name, self.status, self.pid)
    }
}

#[derive(Debug, Clone)]
pub struct JobRegistry {
    path: PathBuf,
}

impl JobRegistry {
    #[must_use]
    pub fn for_case(case_dir: &Path) -> Self {
        Self {
            path: case_dir.join(".ofti").join("jobs.json"),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Recorded jobs. A registry that does not exist yet is empty; any other
    /// read failure or malformed JSON is an error.
    pub fn load(&self) -> io::Result<Vec<JobRecord>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };
        serde_json::from_str(&text).map_err(|err| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{} is not a valid job registry: {err}", self.path.display()),
            )
        })
    }

    pub fn save(&self, jobs: &[JobRecord]) -> io::Result<()> {
        let json = serde_json::to_vec_pretty(jobs).map_err(io::Error::other)?;
        atomic_write(&self.path, &json)
    }

    /// Appends a running job. Fails without writing when the existing
    /// registry cannot be loaded.
    pub fn register(
        &self,
        name: &str,
        pid: u32,
        command: &str,
        log: &Path,
    ) -> io::Result<JobRecord> {
        let now = Utc::now().timestamp();
        let record = JobRecord {
            id: format!("{now}-{pid}"),
            name: name.to_string(),
            pid,
            command: command.to_string(),
            log: log.to_path_buf(),
            status: JobStatus::Running,
            started_at: now,
            ended_at: None,
        };
        let mut jobs = self.load()?;
        jobs.push(record.clone());
        self.save(&jobs)?;
        Ok(record)
    }

    /// Marks running jobs whose pid is gone as finished and persists the
    /// change.
    pub fn refresh(&self, is_alive: impl Fn(u32) -> bool) -> io::Result<Vec<JobRecord>> {
        let mut jobs = self.load()?;
        let now = Utc::now().timestamp();
        let mut changed = false;
        for job in &mut jobs {
            if job.status == JobStatus::Running && !is_alive(job.pid) {
                job.status = JobStatus::Finished;
                job.ended_at.get_or_insert(now);
                changed = true;
            }
        }
        if changed {
            self.save(&jobs)?;
        }
        Ok(jobs)
    }

    /// Sets the status of job `id` and stamps its end time.
    pub fn set_status(&self, id: &str, status: JobStatus) -> io::Result<()> {
        let mut jobs = self.load()?;
        let Some(job) = jobs.iter_mut().find(|j| j.id == id) else {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("job {id} is not in the registry"),
            ));
        };
        job.status = status;
        if status != JobStatus::Running {
            job.ended_at.get_or_insert(Utc::now().timestamp());
        }
        self.save(&jobs)
    }
}

/// Starts `invocation` detached with output appended to `log` and records
/// it under `name`.
pub fn start_background(
    runner: &dyn CommandRunner,
    registry: &JobRegistry,
    name: &str,
    invocation: &Invocation,
    log: &Path,
) -> Result<JobRecord, ToolError> {
    let pid = runner
        .spawn_detached(invocation, log)
        .map_err(|source| ToolError::Spawn {
            name: name.to_string(),
            source,
        })?;
    tracing::info!(name, pid, log = %log.display(), "Started background job");
    registry
        .register(name, pid, &invocation.display(), log)
        .map_err(ToolError::Registry)
}

/// Starts `solver` detached with output in `log.<solver>` and records it.
pub fn start_background_solver(
    runner: &dyn CommandRunner,
    registry: &JobRegistry,
    case_dir: &Path,
    solver: &str,
) -> Result<JobRecord, ToolError> {
    let log = case_dir.join(format!("log.{solver}"));
    let invocation = Invocation::new(solver).current_dir(case_dir);
    start_background(runner, registry, solver, &invocation, &log)
}

/// First available launcher from [`MPI_LAUNCHERS`].
pub fn mpi_launcher(available: impl Fn(&str) -> bool) -> Option<&'static str> {
    MPI_LAUNCHERS.into_iter().find(|name| available(name))
}

fn is_decomposed(case_dir: &Path) -> bool {
    fs::read_dir(case_dir).is_ok_and(|entries| {
        entries.filter_map(Result::ok).any(|e| {
            e.file_name().to_string_lossy().starts_with("processor") && e.path().is_dir()
        })
    })
}

/// Runs `decomposePar` unless `processor*` directories exist, then starts
/// `<launcher> -np <subdomains> <solver> -parallel` in the background.
pub fn start_parallel_solver(
    runner: &dyn CommandRunner,
    registry: &JobRegistry,
    case_dir: &Path,
    solver: &str,
    launcher: &str,
    subdomains: u32,
) -> Result<JobRecord, ToolError> {
    if !case_dir.join("system").join("decomposeParDict").is_file() {
        return Err(ToolError::MissingDecomposeParDict);
    }
    if subdomains == 0 {
        return Err(ToolError::InvalidSubdomains);
    }
    if !is_decomposed(case_dir) {
        let decompose = Invocation::new("decomposePar").current_dir(case_dir);
        let output = runner.run(&decompose).map_err(|source| ToolError::Spawn {
            name: "decomposePar".to_string(),
            source,
        })?;
        if !output.success() {
            let detail = [output.stderr.trim(), output.stdout.trim()]
                .into_iter()
                .find_map(|text| text.lines().last())
                .unwrap_or("no output")
                .to_string();
            return Err(ToolError::DecomposeFailed(detail));
        }
        tracing::info!(case = %case_dir.display(), subdomains, "Decomposed case");
    }
    let log = case_dir.join(format!("log.{solver}"));
    let invocation = Invocation::new(launcher)
        .arg("-np")
        .arg(subdomains.to_string())
        .arg(solver)
        .arg("-parallel")
        .current_dir(case_dir);
    start_background(runner, registry, solver, &invocation, &log)
}

/// Sends the stop signal to a running job and records the outcome:
/// `stopped` on delivery, `missing` when the signal fails.
pub fn stop_job(
    registry: &JobRegistry,
    job: &JobRecord,
    terminate: impl Fn(u32) -> io::Result<()>,
) -> Result<(), ToolError> {
    match terminate(job.pid) {
        Ok(()) => {
            tracing::info!(pid = job.pid, name = %job.name, "Sent SIGTERM");
            registry
                .set_status(&job.id, JobStatus::Stopped)
                .map_err(ToolError::Registry)
        }
        Err(source) => {
            tracing::warn!(pid = job.pid, "Failed to stop job: {source}");
            registry
                .set_status(&job.id, JobStatus::Missing)
                .map_err(ToolError::Registry)?;
            Err(ToolError::Stop {
                pid: job.pid,
                source,
            })
        }
    }
}

/// Viewer text for a job: header, last Courant number and the log tail.
#[must_use]
pub fn job_report(job: &JobRecord, log_text: Option<&str>, courant_limit: f64) -> String {
    let mut lines = vec![
        format!("Job: {}", job.name),
        format!("Status: {} (pid {})", job.status, job.pid),
        format!("Command: {}", job.command),
        format!("Log: {}", job.log.display()),
    ];
    let Some(text) = log_text else {
        lines.push(String::new());
        lines.push("Log file not found.".to_string());
        return lines.join("\n");
    };
    if let Some(courant) = last_courant(text) {
        let flag = if courant > courant_limit {
            format!(" (above limit {courant_limit})")
        } else {
            String::new()
        };
        lines.push(format!("Last Courant max: {courant}{flag}"));
    }
    lines.extend(residual_spark_lines(text, JOB_SPARK_WIDTH));
    lines.push(String::new());
    lines.push(format!("Last {JOB_LOG_TAIL_LINES} lines:"));
    lines.push(tail_lines(text, JOB_LOG_TAIL_LINES));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io;
    use std::path::Path;

    use ofti_utils::{CommandOutput, ScriptedRunner};

    use super::{
        JobRegistry, JobStatus, job_report, mpi_launcher, start_background_solver,
        start_parallel_solver, stop_job,
    };
    use crate::ToolError;

    #[test]
    fn register_and_refresh() {
        let dir = tempfile::tempdir().expect("tempdir");
        let registry = JobRegistry::for_case(dir.path());
        assert!(registry.load().expect("load").is_empty());

        let job = registry
            .register("icoFoam", 4242, "icoFoam", &dir.path().join("log.icoFoam"))
            .expect("register");
        assert!(job.id.ends_with("-4242"));
        assert_eq!(job.status, JobStatus::Running);
        assert!(registry.path().is_file());

        let jobs = registry.refresh(|_| true).expect("refresh");
        assert_eq!(jobs[0].status, JobStatus::Running);

        let jobs = registry.refresh(|_| false).expect("refresh");
        assert_eq!(jobs[0].status, JobStatus::Finished);
        assert!(jobs[0].ended_at.is_some());
        assert_eq!(registry.load().expect("load")[0].status, JobStatus::Finished);
    }

    #[test]
    fn registry_json_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        let registry = JobRegistry::for_case(dir.path());
        registry
            .register("simpleFoam", 7, "simpleFoam", Path::new("log.simpleFoam"))
            .expect("register");
        let text = fs::read_to_string(registry.path()).expect("json");
        let value: serde_json::Value = serde_json::from_str(&text).expect("parse");
        let job = &value[0];
        assert_eq!(job["status"], "running");
        assert_eq!(job["pid"], 7);
        assert!(job["ended_at"].is_null());
    }

    #[test]
    fn corrupt_registry_is_never_overwritten() {
        let dir = tempfile::tempdir().expect("tempdir");
        let registry = JobRegistry::for_case(dir.path());
        fs::create_dir_all(registry.path().parent().expect("parent")).expect("mkdir");
        fs::write(registry.path(), "{not json").expect("write");

        let err = registry.load().expect_err("malformed");
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        let err = registry
            .register("icoFoam", 1, "icoFoam", Path::new("log.icoFoam"))
            .expect_err("register must refuse");
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(registry.refresh(|_| false).is_err());
        assert_eq!(fs::read(registry.path()).expect("read"), b"{not json");
    }

    #[test]
    fn corrupt_registry_blocks_background_start() {
        let dir = tempfile::tempdir().expect("tempdir");
        let registry = JobRegistry::for_case(dir.path());
        fs::create_dir_all(registry.path().parent().expect("parent")).expect("mkdir");
        fs::write(registry.path(), "{not json").expect("write");

        let runner = ScriptedRunner::always(CommandOutput::ok("31337\n"));
        let err = start_background_solver(&runner, &registry, dir.path(), "pisoFoam")
            .expect_err("registry error");
        assert!(matches!(err, ToolError::Registry(_)));
        assert_eq!(fs::read(registry.path()).expect("read"), b"{not json");
    }

    #[test]
    fn background_solver_is_detached_and_recorded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let runner = ScriptedRunner::always(CommandOutput::ok("31337\n"));
        let registry = JobRegistry::for_case(dir.path());

        let job = start_background_solver(&runner, &registry, dir.path(), "pisoFoam")
            .expect("started");
        assert_eq!(job.pid, 31337);
        assert_eq!(job.log, dir.path().join("log.pisoFoam"));

        let call = &runner.calls()[0];
        assert_eq!(call.program, "sh");
        assert_eq!(call.args[3], "pisoFoam");
        assert!(
            call.env
                .iter()
                .any(|(k, v)| k == "OFTI_JOB_LOG" && v.ends_with("log.pisoFoam"))
        );
        assert_eq!(registry.load().expect("load").len(), 1);
    }

    #[test]
    fn parallel_run_decomposes_then_launches_mpi() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("system")).expect("mkdir");
        fs::write(dir.path().join("system/decomposeParDict"), "").expect("write");
        let runner = ScriptedRunner::new(|inv| {
            Ok(if inv.program == "sh" {
                CommandOutput::ok("555\n")
            } else {
                CommandOutput::ok("End\n")
            })
        });
        let registry = JobRegistry::for_case(dir.path());

        let job = start_parallel_solver(&runner, &registry, dir.path(), "simpleFoam", "mpirun", 4)
            .expect("started");
        assert_eq!(job.pid, 555);
        assert_eq!(job.name, "simpleFoam");
        assert_eq!(job.command, "mpirun -np 4 simpleFoam -parallel");

        let argv = runner.argv();
        assert_eq!(argv[0], ["decomposePar"]);
        assert_eq!(argv[1][4..], ["mpirun", "-np", "4", "simpleFoam", "-parallel"]);
    }

    #[test]
    fn parallel_run_skips_decompose_when_processor_dirs_exist() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("system")).expect("mkdir");
        fs::create_dir_all(dir.path().join("processor0")).expect("mkdir");
        fs::write(dir.path().join("system/decomposeParDict"), "").expect("write");
        let runner = ScriptedRunner::always(CommandOutput::ok("9\n"));
        let registry = JobRegistry::for_case(dir.path());

        start_parallel_solver(&runner, &registry, dir.path(), "icoFoam", "mpiexec", 2)
            .expect("started");
        let argv = runner.argv();
        assert_eq!(argv.len(), 1);
        assert_eq!(argv[0][4], "mpiexec");
    }

    #[test]
    fn parallel_run_reports_setup_problems() {
        let dir = tempfile::tempdir().expect("tempdir");
        let runner = ScriptedRunner::always(CommandOutput::failed(1, "FOAM FATAL ERROR: bad method\n"));
        let registry = JobRegistry::for_case(dir.path());

        let err = start_parallel_solver(&runner, &registry, dir.path(), "icoFoam", "mpirun", 2)
            .expect_err("no dict");
        assert!(matches!(err, ToolError::MissingDecomposeParDict));

        fs::create_dir_all(dir.path().join("system")).expect("mkdir");
        fs::write(dir.path().join("system/decomposeParDict"), "").expect("write");
        let err = start_parallel_solver(&runner, &registry, dir.path(), "icoFoam", "mpirun", 0)
            .expect_err("zero subdomains");
        assert!(matches!(err, ToolError::InvalidSubdomains));

        let err = start_parallel_solver(&runner, &registry, dir.path(), "icoFoam", "mpirun", 2)
            .expect_err("decompose fails");
        assert_eq!(
            err.to_string(),
            "decomposePar failed: FOAM FATAL ERROR: bad method"
        );
        assert!(registry.load().expect("load").is_empty());
    }

    #[test]
    fn launcher_prefers_mpirun() {
        assert_eq!(mpi_launcher(|_| true), Some("mpirun"));
        assert_eq!(mpi_launcher(|name| name == "mpiexec"), Some("mpiexec"));
        assert_eq!(mpi_launcher(|_| false), None);
    }

    #[test]
    fn stop_marks_stopped_or_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let registry = JobRegistry::for_case(dir.path());
        let first = registry
            .register("icoFoam", 10, "icoFoam", Path::new("log.icoFoam"))
            .expect("register");
        let second = registry
            .register("pisoFoam", 11, "pisoFoam", Path::new("log.pisoFoam"))
            .expect("register");

        stop_job(&registry, &first, |pid| {
            assert_eq!(pid, 10);
            Ok(())
        })
        .expect("stopped");

        let err = stop_job(&registry, &second, |_| {
            Err(io::Error::other("No such process"))
        })
        .expect_err("missing");
        assert_eq!(err.to_string(), "Failed to stop pid 11: No such process");

        let jobs = registry.load().expect("load");
        assert_eq!(jobs[0].status, JobStatus::Stopped);
        assert_eq!(jobs[1].status, JobStatus::Missing);
        assert!(jobs.iter().all(|j| j.ended_at.is_some()));
    }

    #[test]
    fn report_shows_courant_residuals_and_tail() {
        let dir = tempfile::tempdir().expect("tempdir");
        let registry = JobRegistry::for_case(dir.path());
        let job = registry
            .register("icoFoam", 1, "icoFoam", Path::new("log.icoFoam"))
            .expect("register");

        let log = "Time = 0.1\nCourant Number mean: 0.2 max: 1.5\n\
                   DICPCG:  Solving for p, Initial residual = 0.5, Final residual = 1e-07\n\
                   ExecutionTime = 1 s\n";
        let report = job_report(&job, Some(log), 1.0);
        assert!(report.contains("Last Courant max: 1.5 (above limit 1)"));
        assert!(report.contains("\nRes      p "));
        assert!(report.ends_with("ExecutionTime = 1 s"));

        let missing = job_report(&job, None, 1.0);
        assert!(missing.ends_with("Log file not found."));
    }
}
