//! 状态处理器
//!
//! 持有全部控制器（真实或模拟）和调节器，把吊舱级状态翻译成
//! 每控制器的操作，并把所有控制器的失效/就绪聚合成一个模块
//! 状态。由推进主循环每次迭代轮询一次。

use crate::controller::MotorController;
use crate::regulator::RpmRegulator;
use crate::store::{PodStore, PodState};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// 调节步节拍：限制 CAN 流量的合作式限速
pub const ACCELERATION_CADENCE: Duration = Duration::from_millis(5);

/// 温度/转矩慢速刷新周期（随加速节拍顺带执行）
const TEMPERATURE_REFRESH: Duration = Duration::from_millis(100);

/// 状态处理器
pub struct StateProcessor {
    controllers: Vec<Box<dyn MotorController>>,
    regulator: RpmRegulator,
    store: Arc<dyn PodStore>,
    initialized: bool,
    critical_failure: bool,
    previous_state: Option<PodState>,
    last_accel_step: Option<Instant>,
    last_temp_refresh: Option<Instant>,
}

impl StateProcessor {
    pub fn new(controllers: Vec<Box<dyn MotorController>>, store: Arc<dyn PodStore>) -> Self {
        Self {
            controllers,
            regulator: RpmRegulator::new(),
            store,
            initialized: false,
            critical_failure: false,
            previous_state: None,
            last_accel_step: None,
            last_temp_refresh: None,
        }
    }

    /// 电机是否已完成注册 + 配置
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// 聚合失效标志：所有控制器失效与调节器失效的 OR
    pub fn is_critical_failure(&self) -> bool {
        self.critical_failure
    }

    /// 驱动循环每次迭代调用一次
    pub fn run_once(&mut self) {
        let pod_state = self.store.pod_state();

        match pod_state {
            PodState::Idle => {},
            PodState::Calibrating => {
                if !self.initialized {
                    self.init_motors();
                }
            },
            PodState::Ready => {
                // 首次观察到进入 Ready 才下发 operational
                if self.previous_state != Some(PodState::Ready) {
                    self.send_operational_command();
                }
            },
            PodState::Accelerating => self.accelerate(),
            PodState::NominalBraking | PodState::EmergencyBraking | PodState::FailureStopped => {
                self.quick_stop_all();
            },
            PodState::Finished => self.shutdown_all(),
            PodState::Invalid => {
                // 失效保护默认分支：未显式处理的状态一律按致命处理
                error!("unhandled pod state reported, treating as critical failure");
                self.critical_failure = true;
            },
        }

        self.previous_state = Some(pod_state);
        self.aggregate_failures();
    }

    /// 注册并配置全部控制器
    ///
    /// 任何控制器或调节器报告失效：置聚合失效标志并停住，
    /// 不标记就绪。
    fn init_motors(&mut self) {
        info!("initializing {} motor controller(s)", self.controllers.len());

        for controller in self.controllers.iter() {
            controller.register();
        }

        for controller in self.controllers.iter() {
            if let Err(e) = controller.configure() {
                error!("node {}: configuration failed: {}", controller.node_id(), e);
                self.critical_failure = true;
                return;
            }
        }

        if self.regulator.is_failed() {
            error!("regulator reports failure during init");
            self.critical_failure = true;
            return;
        }

        self.initialized = true;
        info!("motor controllers initialized");
    }

    /// 进入 Ready：全部控制器转 operational 并启动加速节拍计时
    fn send_operational_command(&mut self) {
        self.prepare_motors();
    }

    fn prepare_motors(&mut self) {
        for controller in self.controllers.iter() {
            if let Err(e) = controller.enter_operational() {
                error!("node {}: enter operational failed: {}", controller.node_id(), e);
                self.critical_failure = true;
            }
        }
        self.last_accel_step = Some(Instant::now());
        debug!("motors prepared, acceleration cadence timer started");
    }

    /// 加速：每迭代调用，但只按固定节拍执行调节步
    fn accelerate(&mut self) {
        if self.controllers.is_empty() {
            return;
        }

        let now = Instant::now();
        if let Some(last) = self.last_accel_step {
            if now.duration_since(last) < ACCELERATION_CADENCE {
                return;
            }
        }
        self.last_accel_step = Some(now);

        // 温度刷新走慢节拍，不抢占每步的速度查询预算
        let refresh_due = self
            .last_temp_refresh
            .map_or(true, |t| now.duration_since(t) >= TEMPERATURE_REFRESH);
        if refresh_due {
            self.last_temp_refresh = Some(now);
            for controller in self.controllers.iter() {
                if let Err(e) = controller.update_motor_temp() {
                    warn!("node {}: motor temp query failed: {}", controller.node_id(), e);
                }
                if let Err(e) = controller.update_controller_temp() {
                    warn!(
                        "node {}: controller temp query failed: {}",
                        controller.node_id(),
                        e
                    );
                }
            }
        }

        // (a) 回读每个控制器的实际速度并求平均
        for controller in self.controllers.iter() {
            if let Err(e) = controller.update_actual_velocity() {
                error!("node {}: velocity query failed: {}", controller.node_id(), e);
                self.critical_failure = true;
                return;
            }
        }
        let rpms: Vec<i32> = self.controllers.iter().map(|c| c.telemetry().velocity_rpm).collect();
        let mean_rpm = (rpms.iter().map(|&r| r as i64).sum::<i64>() / rpms.len() as i64) as i32;

        // (b) 高压电池包最大电流（外部协作者数据，一次快照）
        let max_current = self.store.battery_max_current();

        // (c) 全部控制器的最高电机温度
        let max_temp = self
            .controllers
            .iter()
            .map(|c| c.telemetry().motor_temp_c)
            .max()
            .unwrap_or(0);

        // (d) 调节
        let pod_velocity = self.store.pod_velocity();
        let target = self.regulator.calculate(pod_velocity, mean_rpm, max_current, max_temp);

        // (e) 把新目标速度广播给每个控制器
        for controller in self.controllers.iter() {
            if let Err(e) = controller.send_target_velocity(target) {
                error!("node {}: target velocity send failed: {}", controller.node_id(), e);
                self.critical_failure = true;
            }
        }

        self.store.set_motor_rpms(&rpms);
    }

    /// 全部控制器急停
    fn quick_stop_all(&mut self) {
        for controller in self.controllers.iter() {
            if let Err(e) = controller.quick_stop() {
                error!("node {}: quick stop failed: {}", controller.node_id(), e);
                self.critical_failure = true;
            }
        }
    }

    /// 运行结束：全部控制器退回 pre-operational
    fn shutdown_all(&mut self) {
        for controller in self.controllers.iter() {
            if let Err(e) = controller.enter_pre_operational() {
                warn!("node {}: shutdown failed: {}", controller.node_id(), e);
            }
        }
    }

    fn aggregate_failures(&mut self) {
        if self.controllers.iter().any(|c| c.is_failed()) || self.regulator.is_failed() {
            self.critical_failure = true;
        }
    }
}
