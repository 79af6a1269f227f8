// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording independent op streams on worker threads.

use std::num::NonZeroUsize;
use std::sync::{mpsc, Arc, Mutex};

use tessera_encoding::op::{self, CallOp};
use tessera_encoding::Ops;

use crate::{Error, Result};

/// Records each job into its own [`Ops`] on a pool of scoped threads.
///
/// Returns one shared [`CallOp`] per job, in the order of `jobs`, ready to be added to a frame's
/// stream. With `num_threads` unset, a heuristic based on the available parallelism is used.
pub fn record_parallel<F>(jobs: Vec<F>, num_threads: Option<NonZeroUsize>) -> Result<Vec<CallOp>>
where
    F: FnOnce(&mut Ops) + Send,
{
    if jobs.is_empty() {
        return Ok(Vec::new());
    }
    let num_threads = num_threads
        .map(NonZeroUsize::get)
        .unwrap_or_else(|| std::thread::available_parallelism().map_or(2, |it| it.get().max(4) - 2))
        .min(jobs.len());
    log::info!("Recording {} op streams using {num_threads} threads", jobs.len());

    let mut results: Vec<Option<CallOp>> = vec![None; jobs.len()];
    let (tx, rx) = mpsc::channel::<(usize, CallOp)>();
    let work_queue = Mutex::new(jobs.into_iter().enumerate());
    let work_queue = &work_queue;
    std::thread::scope(|scope| -> Result<()> {
        for _ in 0..num_threads {
            let tx = tx.clone();
            std::thread::Builder::new()
                .name("tessera recording worker".into())
                .spawn_scoped(scope, move || {
                    while let Ok(mut guard) = work_queue.lock() {
                        let Some((index, job)) = guard.next() else {
                            break;
                        };
                        drop(guard);
                        let mut ops = Ops::new();
                        let recording = op::record(&mut ops);
                        job(&mut ops);
                        let call = recording.stop(&mut ops).into_shared(Arc::new(ops));
                        // The receiver outlives every worker.
                        let _ = tx.send((index, call));
                    }
                })
                .map_err(Error::Spawn)?;
        }
        // No more senders once every worker has finished.
        drop(tx);
        while let Ok((index, call)) = rx.recv() {
            results[index] = Some(call);
        }
        Ok(())
    })?;
    Ok(results.into_iter().flatten().collect())
}
