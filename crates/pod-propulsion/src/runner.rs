//! 推进主循环（薄驱动层）
//!
//! 每次迭代轮询共享仓库里的吊舱状态，调用一次状态处理器，
//! 并把聚合结果作为模块状态上报：`Init → Ready → CriticalFailure`。

use crate::processor::StateProcessor;
use crate::store::{ModuleStatus, PodStore};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::info;

/// 驱动循环默认周期
const DEFAULT_LOOP_PERIOD: Duration = Duration::from_millis(1);

/// 推进主循环
pub struct Runner {
    processor: StateProcessor,
    store: Arc<dyn PodStore>,
    shutdown: Arc<AtomicBool>,
    period: Duration,
}

impl Runner {
    pub fn new(processor: StateProcessor, store: Arc<dyn PodStore>, shutdown: Arc<AtomicBool>) -> Self {
        Self {
            processor,
            store,
            shutdown,
            period: DEFAULT_LOOP_PERIOD,
        }
    }

    /// 覆盖循环周期（测试用）
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// 运行直到 shutdown 标志置位
    pub fn run(mut self) {
        info!("propulsion loop starting");
        self.store.set_module_status(ModuleStatus::Init);

        while !self.shutdown.load(Ordering::Acquire) {
            self.step();
            spin_sleep::sleep(self.period);
        }

        info!("propulsion loop exiting");
    }

    /// 单次迭代：处理器跑一步，然后上报模块状态
    pub fn step(&mut self) {
        self.processor.run_once();

        let status = if self.processor.is_critical_failure() {
            ModuleStatus::CriticalFailure
        } else if self.processor.is_initialized() {
            ModuleStatus::Ready
        } else {
            ModuleStatus::Init
        };
        self.store.set_module_status(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::MotorController;
    use crate::sim::SimController;
    use crate::store::{MemoryStore, PodState};

    fn runner_with(store: Arc<MemoryStore>) -> Runner {
        let controllers: Vec<Box<dyn MotorController>> =
            vec![Box::new(SimController::new(1))];
        let processor = StateProcessor::new(controllers, store.clone());
        Runner::new(processor, store, Arc::new(AtomicBool::new(false)))
    }

    #[test]
    fn test_status_progression() {
        let store = Arc::new(MemoryStore::new());
        let mut runner = runner_with(store.clone());

        store.set_pod_state(PodState::Idle);
        runner.step();
        assert_eq!(store.module_status(), ModuleStatus::Init);

        store.set_pod_state(PodState::Calibrating);
        runner.step();
        assert_eq!(store.module_status(), ModuleStatus::Ready);
    }

    #[test]
    fn test_failure_is_reported() {
        let store = Arc::new(MemoryStore::new());
        let mut runner = runner_with(store.clone());

        store.set_pod_state_raw(200);
        runner.step();
        assert_eq!(store.module_status(), ModuleStatus::CriticalFailure);
    }

    #[test]
    fn test_run_exits_on_shutdown() {
        let store = Arc::new(MemoryStore::new());
        let controllers: Vec<Box<dyn MotorController>> =
            vec![Box::new(SimController::new(1))];
        let processor = StateProcessor::new(controllers, store.clone());
        let shutdown = Arc::new(AtomicBool::new(false));
        let runner = Runner::new(processor, store, shutdown.clone())
            .with_period(Duration::from_micros(100));

        let handle = std::thread::spawn(move || runner.run());
        std::thread::sleep(Duration::from_millis(20));
        shutdown.store(true, Ordering::Release);
        handle.join().unwrap();
    }
}
