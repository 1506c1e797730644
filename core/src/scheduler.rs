//! Bounded fan-out of probe tasks.
//!
//! [`run_batch`] runs every task exactly once on at most `workers` blocking
//! threads, records each verdict into the run's [`ResultTable`] and only
//! returns when the whole batch has been joined.

use std::sync::Arc;

use scanr_common::debug;
use scanr_common::error::{Result, ScanError};
use scanr_common::scan::{ProbeTask, Verdict};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

use crate::aggregator::ResultTable;

/// Called with `(done, total)` after every finished task.
pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// What happened to the tasks of one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub executed: usize,
    pub positive: usize,
    pub closed_or_filtered: usize,
    /// Probes that ended without a verdict, timeouts included.
    pub silent: usize,
    /// Tasks whose worker died.
    pub failed: usize,
}

impl BatchSummary {
    fn tally(&mut self, verdict: &Verdict) {
        self.executed += 1;
        match verdict {
            verdict if verdict.is_positive() => self.positive += 1,
            Verdict::PortClosedOrFiltered { .. } => self.closed_or_filtered += 1,
            _ => self.silent += 1,
        }
    }
}

/// Runs `job` over `tasks` with at most `workers` of them in flight.
///
/// A fatal error from any job aborts the tasks not yet started and is
/// returned; recoverable errors (see [`ScanError::is_fatal`]) are recorded as
/// silent probes.
pub async fn run_batch<F>(
    tasks: Vec<ProbeTask>,
    workers: usize,
    job: Arc<F>,
    table: Arc<ResultTable>,
    on_progress: Option<ProgressCallback>,
) -> Result<BatchSummary>
where
    F: Fn(ProbeTask) -> Result<Verdict> + Send + Sync + 'static,
{
    if workers == 0 {
        return Err(ScanError::InvalidConfig("worker pool must hold at least one worker".into()));
    }

    let total = tasks.len();
    let semaphore = Arc::new(Semaphore::new(workers));
    let mut set: JoinSet<Result<Verdict>> = JoinSet::new();
    let mut summary = BatchSummary::default();
    let mut done = 0usize;

    let mut settle = |joined: std::result::Result<Result<Verdict>, JoinError>,
                      set: &mut JoinSet<Result<Verdict>>|
     -> Result<()> {
        done += 1;
        match joined {
            Ok(Ok(verdict)) => summary.tally(&verdict),
            Ok(Err(e)) => {
                set.abort_all();
                return Err(e);
            }
            Err(e) => {
                debug!("Probe worker died: {e}");
                summary.executed += 1;
                summary.failed += 1;
            }
        }
        if let Some(cb) = &on_progress {
            cb(done, total);
        }
        Ok(())
    };

    for task in tasks {
        let permit = Arc::clone(&semaphore)
            .acquire_owned()
            .await
            .map_err(|_| ScanError::Interrupted)?;
        let job = Arc::clone(&job);
        let table = Arc::clone(&table);

        set.spawn_blocking(move || {
            let _permit = permit;
            execute(task, job.as_ref(), &table)
        });

        while let Some(joined) = set.try_join_next() {
            settle(joined, &mut set)?;
        }
    }

    while let Some(joined) = set.join_next().await {
        settle(joined, &mut set)?;
    }

    Ok(summary)
}

fn execute<F>(task: ProbeTask, job: &F, table: &ResultTable) -> Result<Verdict>
where
    F: Fn(ProbeTask) -> Result<Verdict>,
{
    let verdict = match job(task) {
        Ok(verdict) => verdict,
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            debug!("{} of {}: {e}", task.mode, task.target);
            Verdict::NoVerdict
        }
    };

    if verdict != Verdict::NoVerdict {
        debug!("{} of {} -> {verdict:?}", task.mode, task.target);
    }
    table.record(&verdict);
    Ok(verdict)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use scanr_common::scan::PortScanMode;
    use std::collections::HashSet;
    use std::net::Ipv4Addr;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn tasks(n: u16) -> Vec<ProbeTask> {
        (1..=n)
            .map(|port| ProbeTask::port(Ipv4Addr::new(10, 0, 0, 1), port, PortScanMode::Syn))
            .collect()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn every_task_runs_once_within_the_pool_limit() {
        let seen = Arc::new(Mutex::new(HashSet::new()));
        let runs = Arc::new(AtomicUsize::new(0));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let job = {
            let (seen, runs, in_flight, peak) = (seen.clone(), runs.clone(), in_flight.clone(), peak.clone());
            Arc::new(move |task: ProbeTask| -> Result<Verdict> {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(2));
                runs.fetch_add(1, Ordering::SeqCst);
                seen.lock().unwrap().insert(task);
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(Verdict::NoVerdict)
            })
        };

        let summary = run_batch(tasks(1000), 150, job, Arc::new(ResultTable::new()), None)
            .await
            .unwrap();

        assert_eq!(summary.executed, 1000);
        assert_eq!(runs.load(Ordering::SeqCst), 1000);
        assert_eq!(seen.lock().unwrap().len(), 1000);
        assert_eq!(in_flight.load(Ordering::SeqCst), 0);
        assert!(peak.load(Ordering::SeqCst) <= 150);
    }

    #[tokio::test]
    async fn timeouts_become_silent_probes() {
        let job = Arc::new(|task: ProbeTask| -> Result<Verdict> {
            match task.port {
                Some(port) if port % 2 == 0 => Err(ScanError::ProbeTimeout { target: task.target }),
                Some(port) => Ok(Verdict::PortOpen { address: task.target, port }),
                None => Ok(Verdict::NoVerdict),
            }
        });
        let table = Arc::new(ResultTable::new());

        let summary = run_batch(tasks(10), 3, job, table.clone(), None).await.unwrap();

        assert_eq!(summary, BatchSummary { executed: 10, positive: 5, silent: 5, ..Default::default() });
        assert_eq!(table.freeze()[0].ports, vec![1, 3, 5, 7, 9]);
    }

    #[tokio::test]
    async fn collaborator_failure_aborts_the_batch() {
        let job = Arc::new(|task: ProbeTask| -> Result<Verdict> {
            match task.port {
                Some(3) => Err(ScanError::CollaboratorFailure("socket: operation not permitted".into())),
                _ => Ok(Verdict::NoVerdict),
            }
        });

        let err = run_batch(tasks(50), 1, job, Arc::new(ResultTable::new()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::CollaboratorFailure(_)));
    }

    #[test]
    fn execute_folds_only_recoverable_errors() {
        let table = ResultTable::new();
        let task = tasks(1)[0];

        let timeout = |t: ProbeTask| -> Result<Verdict> { Err(ScanError::ProbeTimeout { target: t.target }) };
        assert_eq!(execute(task, &timeout, &table), Ok(Verdict::NoVerdict));
        assert!(table.is_empty());

        let interrupted = |_: ProbeTask| -> Result<Verdict> { Err(ScanError::Interrupted) };
        assert_eq!(execute(task, &interrupted, &table), Err(ScanError::Interrupted));
    }

    #[tokio::test]
    async fn progress_reaches_total() {
        let last = Arc::new(Mutex::new((0, 0)));
        let cb: ProgressCallback = {
            let last = last.clone();
            Arc::new(move |done, total| *last.lock().unwrap() = (done, total))
        };
        let job = Arc::new(|_: ProbeTask| -> Result<Verdict> { Ok(Verdict::NoVerdict) });

        run_batch(tasks(25), 4, job, Arc::new(ResultTable::new()), Some(cb)).await.unwrap();
        assert_eq!(*last.lock().unwrap(), (25, 25));
    }

    #[tokio::test]
    async fn zero_workers_is_rejected() {
        let job = Arc::new(|_: ProbeTask| -> Result<Verdict> { Ok(Verdict::NoVerdict) });
        let err = run_batch(tasks(1), 0, job, Arc::new(ResultTable::new()), None).await.unwrap_err();
        assert!(matches!(err, ScanError::InvalidConfig(_)));
    }
}
