// 按用户串行的定位处理队列
// 同一用户的行程延伸不可交换，定位必须按到达顺序逐条处理；
// 每个用户一条有界队列和一个 worker 任务，不同用户完全并行

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc, oneshot};

use crate::database::models::location::Fix;
use crate::error::EngineError;

use super::{FixOutcome, JourneyEngine};

/// 单用户队列容量，满时入队等待形成背压
const WORKER_QUEUE_CAPACITY: usize = 256;

struct Job {
    fix: Fix,
    ack: oneshot::Sender<Result<FixOutcome, EngineError>>,
}

/// 定位分发器：userId -> 串行 worker 队列
pub struct JourneyDispatcher {
    engine: Arc<JourneyEngine>,
    workers: Mutex<HashMap<String, mpsc::Sender<Job>>>,
}

impl JourneyDispatcher {
    pub fn new(engine: Arc<JourneyEngine>) -> Self {
        Self {
            engine,
            workers: Mutex::new(HashMap::new()),
        }
    }

    /// 将定位投入该用户的队列，返回处理结果的回执
    ///
    /// 入队完成即确定了该用户内的处理顺序，调用方可以先批量
    /// 入队再统一等待回执。
    pub async fn enqueue(
        &self,
        fix: Fix,
    ) -> Result<oneshot::Receiver<Result<FixOutcome, EngineError>>, EngineError> {
        let user_id = fix.user_id.clone();
        let sender = self.worker_sender(&user_id).await;

        let (ack, receipt) = oneshot::channel();
        if sender.send(Job { fix: fix.clone(), ack }).await.is_err() {
            // worker 意外退出：换一个重新投递一次
            tracing::warn!(user_id = %user_id, "定位 worker 已退出，重建队列");
            let sender = self.respawn_worker(&user_id).await;
            let (ack, receipt) = oneshot::channel();
            sender
                .send(Job { fix, ack })
                .await
                .map_err(|_| EngineError::WorkerUnavailable(user_id))?;
            return Ok(receipt);
        }
        Ok(receipt)
    }

    /// 投递并等待处理完成
    pub async fn process(&self, fix: Fix) -> Result<FixOutcome, EngineError> {
        let user_id = fix.user_id.clone();
        let receipt = self.enqueue(fix).await?;
        receipt
            .await
            .map_err(|_| EngineError::WorkerUnavailable(user_id))?
    }

    async fn worker_sender(&self, user_id: &str) -> mpsc::Sender<Job> {
        let mut workers = self.workers.lock().await;
        workers
            .entry(user_id.to_string())
            .or_insert_with(|| spawn_worker(self.engine.clone(), user_id.to_string()))
            .clone()
    }

    async fn respawn_worker(&self, user_id: &str) -> mpsc::Sender<Job> {
        let mut workers = self.workers.lock().await;
        // 并发触发重建时只保留一个 worker，维持单用户串行
        if let Some(sender) = workers.get(user_id) {
            if !sender.is_closed() {
                return sender.clone();
            }
        }
        let sender = spawn_worker(self.engine.clone(), user_id.to_string());
        workers.insert(user_id.to_string(), sender.clone());
        sender
    }
}

fn spawn_worker(engine: Arc<JourneyEngine>, user_id: String) -> mpsc::Sender<Job> {
    let (tx, mut rx) = mpsc::channel::<Job>(WORKER_QUEUE_CAPACITY);
    tokio::spawn(async move {
        while let Some(Job { fix, ack }) = rx.recv().await {
            let result = engine.process_fix(fix).await;
            if let Err(e) = &result {
                // 队列不因单个定位失败而停止，回执交由投递层决定是否重投
                tracing::error!(user_id = %user_id, error = %e, "处理定位失败");
            }
            let _ = ack.send(result);
        }
        tracing::debug!(user_id = %user_id, "定位 worker 退出");
    });
    tx
}
