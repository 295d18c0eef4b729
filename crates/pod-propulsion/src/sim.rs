//! 进程内模拟电机控制器
//!
//! 无硬件运行与测试用：遥测即时镜像收到的命令，走同一套
//! 协议状态机，从不失效。状态处理器通过能力接口使用它，
//! 调用点与真实控制器无差别。

use crate::controller::{MotorController, MotorTelemetry};
use crate::error::PropulsionError;
use arc_swap::ArcSwap;
use parking_lot::RwLock;
use pod_protocol::ControllerState;
use std::sync::Arc;
use tracing::debug;

/// 模拟电机的常温遥测
const NOMINAL_TEMP_C: i32 = 25;

/// 模拟电机控制器
pub struct SimController {
    node: u8,
    state: RwLock<ControllerState>,
    telemetry: ArcSwap<MotorTelemetry>,
}

impl SimController {
    pub fn new(node: u8) -> Self {
        Self {
            node,
            state: RwLock::new(ControllerState::default()),
            telemetry: ArcSwap::from_pointee(MotorTelemetry {
                motor_temp_c: NOMINAL_TEMP_C,
                controller_temp_c: NOMINAL_TEMP_C,
                ..MotorTelemetry::default()
            }),
        }
    }

    fn update_telemetry(&self, apply: impl Fn(&mut MotorTelemetry)) {
        self.telemetry.rcu(|current| {
            let mut next = **current;
            apply(&mut next);
            Arc::new(next)
        });
    }
}

impl MotorController for SimController {
    fn node_id(&self) -> u8 {
        self.node
    }

    fn register(&self) {
        debug!("sim node {}: registered", self.node);
    }

    fn configure(&self) -> Result<(), PropulsionError> {
        *self.state.write() = ControllerState::SwitchOnDisabled;
        Ok(())
    }

    fn enter_operational(&self) -> Result<(), PropulsionError> {
        *self.state.write() = ControllerState::OperationEnabled;
        Ok(())
    }

    fn enter_pre_operational(&self) -> Result<(), PropulsionError> {
        *self.state.write() = ControllerState::ReadyToSwitchOn;
        Ok(())
    }

    fn check_state(&self) -> Result<(), PropulsionError> {
        Ok(())
    }

    fn send_target_velocity(&self, rpm: i32) -> Result<(), PropulsionError> {
        // 理想电机：实际转速立即跟随目标
        self.update_telemetry(|t| t.velocity_rpm = rpm);
        Ok(())
    }

    fn send_target_torque(&self, torque: i16) -> Result<(), PropulsionError> {
        self.update_telemetry(|t| t.torque = torque);
        Ok(())
    }

    fn update_actual_velocity(&self) -> Result<(), PropulsionError> {
        Ok(())
    }

    fn update_actual_torque(&self) -> Result<(), PropulsionError> {
        Ok(())
    }

    fn update_motor_temp(&self) -> Result<(), PropulsionError> {
        Ok(())
    }

    fn update_controller_temp(&self) -> Result<(), PropulsionError> {
        Ok(())
    }

    fn quick_stop(&self) -> Result<(), PropulsionError> {
        *self.state.write() = ControllerState::QuickStopActive;
        self.update_telemetry(|t| t.velocity_rpm = 0);
        Ok(())
    }

    fn health_check(&self) -> Result<(), PropulsionError> {
        Ok(())
    }

    fn auto_align(&self) -> Result<(), PropulsionError> {
        Ok(())
    }

    fn state(&self) -> ControllerState {
        *self.state.read()
    }

    fn telemetry(&self) -> MotorTelemetry {
        **self.telemetry.load()
    }

    fn is_failed(&self) -> bool {
        false
    }
}
