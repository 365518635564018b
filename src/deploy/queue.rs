//! Background deploy queue with one sequential lane per bot.
//!
//! `submit` returns immediately. Jobs for the same bot run one after another
//! in submission order; different bots deploy concurrently. A lane lives only
//! while it has queued or running jobs.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};

use super::DeploymentResult;
use super::orchestrator::Deployer;

struct Job {
    bot_id: u64,
    reply: oneshot::Sender<DeploymentResult>,
}

/// Handle to the outcome of a submitted deploy.
pub struct DeployTicket {
    bot_id: u64,
    reply: oneshot::Receiver<DeploymentResult>,
}

impl DeployTicket {
    pub fn bot_id(&self) -> u64 {
        self.bot_id
    }

    /// Wait for the deploy to finish.
    pub async fn wait(self) -> DeploymentResult {
        self.reply.await.unwrap_or_else(|_| {
            DeploymentResult::error(format!("deploy of bot {} was dropped", self.bot_id))
        })
    }
}

pub struct DeployQueue {
    intake: mpsc::UnboundedSender<Job>,
    dispatcher: JoinHandle<()>,
    active_lanes: Arc<AtomicUsize>,
}

impl DeployQueue {
    /// Spawn the dispatcher on the current tokio runtime.
    pub fn start(deployer: Arc<Deployer>) -> Self {
        let (intake, jobs) = mpsc::unbounded_channel();
        let active_lanes = Arc::new(AtomicUsize::new(0));
        let dispatcher = tokio::spawn(dispatch(deployer, jobs, active_lanes.clone()));
        Self {
            intake,
            dispatcher,
            active_lanes,
        }
    }

    pub fn submit(&self, bot_id: u64) -> DeployTicket {
        let (reply, receiver) = oneshot::channel();
        if let Err(mpsc::error::SendError(job)) = self.intake.send(Job { bot_id, reply }) {
            let _ = job
                .reply
                .send(DeploymentResult::error("deploy queue is not running"));
        }
        log::debug!("queued deploy of bot {}", bot_id);
        DeployTicket {
            bot_id,
            reply: receiver,
        }
    }

    /// Number of bots with queued or running deploys.
    pub fn active_lanes(&self) -> usize {
        self.active_lanes.load(Ordering::Relaxed)
    }

    /// Stop accepting work and wait until every queued deploy has finished.
    pub async fn shutdown(self) {
        drop(self.intake);
        if let Err(e) = self.dispatcher.await {
            log::error!("deploy dispatcher failed: {}", e);
        }
    }
}

struct Lane {
    jobs: mpsc::UnboundedSender<Job>,
    pending: usize,
}

async fn dispatch(
    deployer: Arc<Deployer>,
    mut intake: mpsc::UnboundedReceiver<Job>,
    active_lanes: Arc<AtomicUsize>,
) {
    let (done_tx, mut done) = mpsc::unbounded_channel::<u64>();
    let mut lanes: HashMap<u64, Lane> = HashMap::new();
    let mut workers: JoinSet<()> = JoinSet::new();
    let mut accepting = true;

    loop {
        active_lanes.store(lanes.len(), Ordering::Relaxed);
        if !accepting && lanes.is_empty() {
            break;
        }

        tokio::select! {
            job = intake.recv(), if accepting => match job {
                Some(job) => {
                    let bot_id = job.bot_id;
                    let lane = lanes.entry(bot_id).or_insert_with(|| {
                        let (tx, rx) = mpsc::unbounded_channel();
                        workers.spawn(run_lane(deployer.clone(), bot_id, rx, done_tx.clone()));
                        Lane { jobs: tx, pending: 0 }
                    });
                    match lane.jobs.send(job) {
                        Ok(()) => lane.pending += 1,
                        Err(mpsc::error::SendError(job)) => {
                            let _ = job
                                .reply
                                .send(DeploymentResult::error("deploy lane stopped unexpectedly"));
                        }
                    }
                }
                None => accepting = false,
            },
            Some(bot_id) = done.recv() => {
                if let Some(lane) = lanes.get_mut(&bot_id) {
                    lane.pending = lane.pending.saturating_sub(1);
                    if lane.pending == 0 {
                        // Dropping the sender ends the idle worker.
                        lanes.remove(&bot_id);
                    }
                }
            },
            Some(joined) = workers.join_next(), if !workers.is_empty() => {
                if let Err(e) = joined {
                    log::error!("deploy lane failed: {}", e);
                    lanes.retain(|_, lane| !lane.jobs.is_closed());
                }
            },
        }
    }

    while let Some(joined) = workers.join_next().await {
        if let Err(e) = joined {
            log::error!("deploy lane failed: {}", e);
        }
    }
}

async fn run_lane(
    deployer: Arc<Deployer>,
    bot_id: u64,
    mut jobs: mpsc::UnboundedReceiver<Job>,
    done: mpsc::UnboundedSender<u64>,
) {
    log::debug!("deploy lane for bot {} started", bot_id);
    while let Some(job) = jobs.recv().await {
        let result = deployer.deploy(job.bot_id).await;
        if job.reply.send(result).is_err() {
            log::debug!("deploy result for bot {} had no listener", bot_id);
        }
        let _ = done.send(bot_id);
    }
    log::debug!("deploy lane for bot {} released", bot_id);
}
