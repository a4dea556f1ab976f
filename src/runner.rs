//! Command dispatcher
//!
//! Drives one Config to completion: connect every host up front, then run
//! the full command list against each host, either one host at a time or
//! with one task per host. Within a host, commands always run strictly in
//! declared order; across hosts nothing is ordered in concurrent mode.
//!
//! A connection failure aborts the entire Config before any host runs. A
//! command failure aborts only that host's remaining sequence; in concurrent
//! mode the other hosts run on to completion, and the failure is reported
//! once every task has finished.

use std::future::Future;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::command::Command;
use crate::config::Config;
use crate::error::{PushError, Result};
use crate::ssh::host::{Connection, Host};

/// Grace delay between a command failure and escalation, so in-flight
/// output reaches the logs first
const FAILURE_GRACE: Duration = Duration::from_secs(1);

/// Process one Config: connect, dispatch, report.
pub async fn run_config(cfg: &Config) -> Result<()> {
    let hosts = connect_all(cfg).await?;
    let commands = cfg.commands.clone();

    dispatch(hosts, cfg.global.concurrent, move |(host, conn)| {
        run_host(host, conn, commands.clone())
    })
    .await
}

/// Establish a connection to every host in the Config.
///
/// Fail-fast at batch granularity: the first unreachable or unauthenticated
/// host aborts the whole Config, and no command runs anywhere.
async fn connect_all(cfg: &Config) -> Result<Vec<(Host, Connection)>> {
    let mut connected = Vec::with_capacity(cfg.hosts.len());
    for host_cfg in &cfg.hosts {
        let host = host_cfg.resolve(&cfg.global);
        let conn = Connection::open(&host).await?;
        connected.push((host, conn));
    }
    Ok(connected)
}

/// Drive one unit of work per host, sequentially or concurrently.
///
/// Sequential mode runs units in list order, one at a time, stopping at the
/// first failure. Concurrent mode spawns one task per unit with no pooling
/// and awaits every task before reporting the first failure — a failing
/// unit never cancels the others. A panicked task counts as a failure.
async fn dispatch<T, F, Fut>(units: Vec<T>, concurrent: bool, run: F) -> Result<()>
where
    T: Send + 'static,
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    if !concurrent {
        for unit in units {
            run(unit).await?;
        }
        return Ok(());
    }

    let tasks: Vec<_> = units
        .into_iter()
        .map(|unit| tokio::spawn(run(unit)))
        .collect();

    let mut outcome = Ok(());
    for task in tasks {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                if outcome.is_ok() {
                    outcome = Err(e);
                }
            }
            Err(e) => {
                error!("host task panicked: {e}");
                if outcome.is_ok() {
                    outcome = Err(PushError::Task(e.to_string()));
                }
            }
        }
    }
    outcome
}

/// Run the full command sequence against one host, then close its
/// connection exactly once.
///
/// The first failing command aborts the remainder of the sequence after the
/// fixed grace delay. Close errors are logged, never escalated.
async fn run_host(host: Host, conn: Connection, commands: Vec<Command>) -> Result<()> {
    info!(host = %host.addr, variables = ?host.variables, "running commands");

    let mut outcome = Ok(());
    for cmd in &commands {
        if let Err(e) = cmd.run(&conn, &host).await {
            error!(host = %host.addr, command = %cmd.describe(), "command failed: {e}");
            tokio::time::sleep(FAILURE_GRACE).await;
            outcome = Err(e.for_host(host.addr.clone()));
            break;
        }
    }

    info!(host = %host.addr, "finished running commands");
    if let Err(e) = conn.close().await {
        warn!(host = %host.addr, "close failed: {e}");
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    #[tokio::test]
    async fn test_empty_config_completes() {
        let cfg = Config::default();
        run_config(&cfg).await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_concurrent_config_completes() {
        let mut cfg = Config::default();
        cfg.global.concurrent = true;
        cfg.commands.push(Command::Bash {
            commands: vec!["echo never-runs".to_string()],
        });
        // No hosts: nothing to connect to, nothing executes.
        run_config(&cfg).await.unwrap();
    }

    #[tokio::test]
    async fn test_sequential_dispatch_runs_units_in_order() {
        let log: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);

        dispatch(vec!["web1", "web2", "db1"], false, move |name| {
            let log = Arc::clone(&sink);
            async move {
                log.lock().unwrap().push(format!("{name} start"));
                tokio::time::sleep(Duration::from_millis(5)).await;
                log.lock().unwrap().push(format!("{name} end"));
                Ok(())
            }
        })
        .await
        .unwrap();

        // One host's full sequence completes before the next host starts.
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "web1 start",
                "web1 end",
                "web2 start",
                "web2 end",
                "db1 start",
                "db1 end"
            ]
        );
    }

    #[tokio::test]
    async fn test_sequential_dispatch_stops_at_first_failure() {
        let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);

        let result = dispatch(vec!["web1", "web2", "db1"], false, move |name| {
            let log = Arc::clone(&sink);
            async move {
                log.lock().unwrap().push(name);
                if name == "web2" {
                    return Err(PushError::connection("refused").for_host(name));
                }
                Ok(())
            }
        })
        .await;

        assert!(result.is_err());
        // The host after the failing one is never started.
        assert_eq!(*log.lock().unwrap(), vec!["web1", "web2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_wall_time_scales_with_host_count() {
        let start = Instant::now();
        dispatch(vec![(); 4], false, |()| async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(())
        })
        .await
        .unwrap();
        assert!(start.elapsed() >= Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_wall_time_independent_of_host_count() {
        let start = Instant::now();
        dispatch(vec![(); 4], true, |()| async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(())
        })
        .await
        .unwrap();
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(100));
        assert!(elapsed < Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_concurrent_failure_does_not_cancel_others() {
        let finished: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&finished);

        let result = dispatch(vec!["web1", "web2", "db1"], true, move |name| {
            let finished = Arc::clone(&sink);
            async move {
                if name == "web1" {
                    return Err(PushError::connection("refused").for_host(name));
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
                finished.lock().unwrap().push(name);
                Ok(())
            }
        })
        .await;

        // The failure is reported, but only after every unit ran to
        // completion.
        assert!(result.is_err());
        let mut done = finished.lock().unwrap().clone();
        done.sort_unstable();
        assert_eq!(done, vec!["db1", "web2"]);
    }

    #[tokio::test]
    async fn test_concurrent_panicked_unit_fails_dispatch() {
        let result = dispatch(vec!["ok", "boom"], true, |name| async move {
            if name == "boom" {
                panic!("unit gave up");
            }
            Ok(())
        })
        .await;

        match result {
            Err(PushError::Task(_)) => {}
            other => panic!("expected a task failure, got {other:?}"),
        }
    }
}
