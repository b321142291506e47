// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

use crate::config::consts::FALLBACK_CONCURRENCY;
use crate::config::RunConfig;
use crate::engine::runner::{run_config, RunReport};
use crate::errors::RunError;
use crate::observability::messages::engine::{BatchCompleted, BatchStarted, RunFailed};
use crate::observability::messages::StructuredLog;

/// Number of CPU cores, or `FALLBACK_CONCURRENCY` when it cannot be detected
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(FALLBACK_CONCURRENCY)
}

/// Runs several configurations concurrently.
///
/// Each relaxation is built and solved on the blocking thread pool; a semaphore
/// bounds how many run at once. Results come back in input order and one failed
/// run never cancels the others.
pub struct BatchRunner {
    max_concurrency: usize,
}

impl Default for BatchRunner {
    fn default() -> Self {
        Self::new(default_concurrency())
    }
}

impl BatchRunner {
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub async fn run(&self, configs: Vec<RunConfig>) -> Vec<(String, Result<RunReport, RunError>)> {
        let started = Instant::now();
        BatchStarted {
            configs: configs.len(),
            max_concurrency: self.max_concurrency,
        }
        .log();

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = Vec::with_capacity(configs.len());
        for cfg in configs {
            let name = cfg.display_name().to_string();
            let semaphore = semaphore.clone();
            let task_name = name.clone();
            let task = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.map_err(|e| RunError::Task {
                    name: task_name.clone(),
                    message: format!("failed to acquire semaphore permit: {}", e),
                })?;
                tokio::task::spawn_blocking(move || run_config(&cfg))
                    .await
                    .map_err(|e| RunError::Task {
                        name: task_name,
                        message: e.to_string(),
                    })?
            });
            tasks.push((name, task));
        }

        let mut results = Vec::with_capacity(tasks.len());
        for (name, task) in tasks {
            let outcome = task.await.unwrap_or_else(|e| {
                Err(RunError::Task {
                    name: name.clone(),
                    message: e.to_string(),
                })
            });
            if let Err(error) = &outcome {
                RunFailed {
                    name: &name,
                    error,
                }
                .log();
            }
            results.push((name, outcome));
        }

        let failed = results.iter().filter(|(_, r)| r.is_err()).count();
        BatchCompleted {
            succeeded: results.len() - failed,
            failed,
            duration: started.elapsed(),
        }
        .log();
        results
    }
}
