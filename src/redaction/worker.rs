//! # 后台模糊工作器
//!
//! 把 `BlurSnapshot::compute` 放到 tokio 的阻塞线程池执行，
//! 结果经 mpsc 通道送回会话所属的任务，由它调用 `commit_job` 合并。
//! 工作器不持有会话，也不做取消：过期结果在合并时被丢弃。
//!
//! `PreviewScheduler` 在工作器前加一层防抖：滑块连续变化时只提交静止后的最后一个强度。

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use super::blur::{BlurEngine, BoxBlur};
use super::config::RedactionConfig;
use super::debounce::Debouncer;
use super::error::RedactError;
use super::job::{BlurSnapshot, JobCommit, JobId, JobResult};
use super::session::RedactionSession;

/// 后台模糊工作器。
pub struct BlurWorker<E: BlurEngine + 'static = BoxBlur> {
    engine: Arc<E>,
    results_tx: mpsc::UnboundedSender<JobResult>,
    results_rx: mpsc::UnboundedReceiver<JobResult>,
}

impl BlurWorker<BoxBlur> {
    pub fn new() -> Self {
        Self::with_engine(BoxBlur)
    }
}

impl Default for BlurWorker<BoxBlur> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: BlurEngine + 'static> BlurWorker<E> {
    pub fn with_engine(engine: E) -> Self {
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        Self {
            engine: Arc::new(engine),
            results_tx,
            results_rx,
        }
    }

    /// 提交快照；计算在阻塞线程池中进行，必须在 tokio 运行时内调用。
    pub fn submit(&self, snapshot: BlurSnapshot) {
        let engine = Arc::clone(&self.engine);
        let tx = self.results_tx.clone();
        let id = snapshot.id;

        tokio::task::spawn_blocking(move || {
            let result = snapshot.compute(engine.as_ref());
            if tx.send(result).is_err() {
                log::debug!("结果通道已关闭，丢弃任务 {}", id);
            }
        });
    }

    /// 等待下一个完成的结果（完成顺序不保证与提交顺序一致）。
    pub async fn next_result(&mut self) -> Option<JobResult> {
        self.results_rx.recv().await
    }

    /// 非阻塞地取一个已完成的结果。
    pub fn try_next_result(&mut self) -> Option<JobResult> {
        self.results_rx.try_recv().ok()
    }
}

/// 整图模糊预览调度器：防抖 → 取快照 → 后台计算 → 合并。
pub struct PreviewScheduler<E: BlurEngine + 'static = BoxBlur> {
    worker: BlurWorker<E>,
    debouncer: Debouncer<u32>,
    in_flight: usize,
}

impl PreviewScheduler<BoxBlur> {
    pub fn new(config: &RedactionConfig) -> Self {
        Self::with_worker(config, BlurWorker::new())
    }
}

impl<E: BlurEngine + 'static> PreviewScheduler<E> {
    pub fn with_worker(config: &RedactionConfig, worker: BlurWorker<E>) -> Self {
        Self {
            worker,
            debouncer: Debouncer::from_config(config),
            in_flight: 0,
        }
    }

    pub fn window(&self) -> Duration {
        self.debouncer.window()
    }

    /// 已提交但尚未合并的任务数。
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// 记录滑块的新强度，重新开始计时。
    pub fn request(&mut self, strength: u32, now: Instant) {
        self.debouncer.trigger(strength, now);
    }

    /// 放弃尚未提交的强度（例如重新加载图片）。
    pub fn cancel(&mut self) {
        self.debouncer.cancel();
    }

    /// 窗口期已过则为最后一个强度取快照并提交，返回任务编号。
    pub fn poll<S: BlurEngine>(
        &mut self,
        session: &mut RedactionSession<S>,
        now: Instant,
    ) -> Result<Option<JobId>, RedactError> {
        let Some(strength) = self.debouncer.take_ready(now) else {
            return Ok(None);
        };
        let snapshot = session.snapshot_full_blur(strength)?;
        let id = snapshot.id;
        self.worker.submit(snapshot);
        self.in_flight += 1;
        Ok(Some(id))
    }

    /// 等待下一个结果并合并；没有在途任务时立即返回 `None`。
    pub async fn commit_next<S: BlurEngine>(
        &mut self,
        session: &mut RedactionSession<S>,
    ) -> Result<Option<JobCommit>, RedactError> {
        if self.in_flight == 0 {
            return Ok(None);
        }
        let Some(result) = self.worker.next_result().await else {
            self.in_flight = 0;
            return Ok(None);
        };
        self.in_flight -= 1;
        session.commit_job(result).map(Some)
    }

    /// 等到窗口期结束，提交并合并全部在途任务，返回最后一次合并结果。
    pub async fn settle<S: BlurEngine>(
        &mut self,
        session: &mut RedactionSession<S>,
    ) -> Result<Option<JobCommit>, RedactError> {
        while let Some(wait) = self.debouncer.remaining(Instant::now()) {
            if wait.is_zero() {
                break;
            }
            tokio::time::sleep(wait).await;
        }
        self.poll(session, Instant::now())?;

        let mut last = None;
        while self.in_flight > 0 {
            match self.commit_next(session).await? {
                Some(commit) => last = Some(commit),
                None => break,
            }
        }
        Ok(last)
    }
}
