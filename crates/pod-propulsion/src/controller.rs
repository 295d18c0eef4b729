//! 控制器协议引擎与状态机
//!
//! 每个物理电机一个控制器。控制线程通过高层操作发出固定命令帧，
//! RX 路径异步解码响应并更新共享单元（遥测缓存、协议状态、
//! 失效标志）。
//!
//! 重试/超时策略集中在 [`CanopenController::request_state_transition`]：
//! 有界重试（3 次）、固定退避（1 s）、耗尽后升级为 critical failure。
//! 失效标志是单调的：一旦置位，本子系统内不再清除。

use crate::error::PropulsionError;
use crate::transceiver::{DEFAULT_SEND_TIMEOUT, ResponseHandler, Transceiver};
use arc_swap::ArcSwap;
use parking_lot::RwLock;
use pod_can::{CanPort, PodFrame};
use pod_protocol::{
    CONFIGURATION_MESSAGES, CONTROLWORD_ENABLE_OPERATION, CONTROLWORD_QUICK_STOP,
    CONTROLWORD_SHUTDOWN, ControllerMessage, ControllerState, EmergencyDiagnosis,
    ENABLE_AUTO_ALIGN_MODE, ENABLE_VELOCITY_MODE, NMT_START_REMOTE_NODE, NodeId,
    QUERY_CONTROLLER_TEMPERATURE, QUERY_ERROR_REGISTER, QUERY_MOTOR_TEMPERATURE,
    QUERY_STATUSWORD, QUERY_TORQUE_ACTUAL, QUERY_VELOCITY_ACTUAL, QUERY_WARNING_REGISTER,
    REG_CONTROLLER_TEMPERATURE, REG_ERROR_REGISTER, REG_MOTOR_TEMPERATURE, REG_STATUSWORD,
    REG_TORQUE_ACTUAL, REG_VELOCITY_ACTUAL, REG_WARNING_REGISTER, Register, SdoResponse,
    SET_TARGET_TORQUE, SET_TARGET_VELOCITY, APPLY_BRAKE, classify_warning, nmt_command,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// 控制器遥测快照
///
/// RX 路径逐字段更新，控制线程整体读取（copy, don't share）。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotorTelemetry {
    /// 实际转速 (rpm)
    pub velocity_rpm: i32,
    /// 实际转矩（原始值）
    pub torque: i16,
    /// 电机温度 (°C)
    pub motor_temp_c: i32,
    /// 控制器温度 (°C)
    pub controller_temp_c: i32,
}

/// 控制器时序参数
///
/// 默认值即协议值；测试用小值压缩时间，不改变语义。
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// 单次发送的响应超时
    pub sdo_timeout: Duration,
    /// 状态转换的发送次数上限
    pub transition_attempts: u32,
    /// 状态转换每次发送后的固定退避
    pub transition_backoff: Duration,
    /// 自动对位前等待 NMT 生效的时间
    pub align_settle: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            sdo_timeout: DEFAULT_SEND_TIMEOUT,
            transition_attempts: 3,
            transition_backoff: Duration::from_secs(1),
            align_settle: Duration::from_millis(100),
        }
    }
}

/// 电机控制器能力接口
///
/// 两个实现：走线协议的 [`CanopenController`] 和进程内的
/// [`crate::sim::SimController`]。状态处理器对这组能力泛化，
/// 调用点不区分真伪。
pub trait MotorController: Send + Sync {
    /// 节点号
    fn node_id(&self) -> u8;

    /// 订阅本节点的入站帧
    fn register(&self);

    /// 按顺序下发完整配置表；任何一条失败即中止
    fn configure(&self) -> Result<(), PropulsionError>;

    /// NMT operational → 速度模式 → 目标速度清零 → 上抱闸 →
    /// ReadyToSwitchOn → OperationEnabled
    fn enter_operational(&self) -> Result<(), PropulsionError>;

    /// 若当前不在 ReadyToSwitchOn，发送 shutdown 命令
    fn enter_pre_operational(&self) -> Result<(), PropulsionError>;

    /// 请求当前状态字
    fn check_state(&self) -> Result<(), PropulsionError>;

    /// 设置目标速度 (rpm)
    fn send_target_velocity(&self, rpm: i32) -> Result<(), PropulsionError>;

    /// 设置目标转矩
    fn send_target_torque(&self, torque: i16) -> Result<(), PropulsionError>;

    /// 请求实际速度寄存器；解码后的值出现在遥测缓存里
    fn update_actual_velocity(&self) -> Result<(), PropulsionError>;

    /// 请求实际转矩寄存器
    fn update_actual_torque(&self) -> Result<(), PropulsionError>;

    /// 请求电机温度寄存器
    fn update_motor_temp(&self) -> Result<(), PropulsionError>;

    /// 请求控制器温度寄存器
    fn update_controller_temp(&self) -> Result<(), PropulsionError>;

    /// 急停
    fn quick_stop(&self) -> Result<(), PropulsionError>;

    /// 依次查询告警与错误寄存器；任何一条失败即中止
    fn health_check(&self) -> Result<(), PropulsionError>;

    /// 标定用自动对位（激活期间速度不可控）
    fn auto_align(&self) -> Result<(), PropulsionError>;

    /// 当前协议状态
    fn state(&self) -> ControllerState;

    /// 遥测缓存快照
    fn telemetry(&self) -> MotorTelemetry;

    /// 失效标志（单调）
    fn is_failed(&self) -> bool;
}

/// 控制线程与 RX 路径共享的控制器单元
pub struct ControllerShared {
    node: NodeId,
    state: RwLock<ControllerState>,
    critical_failure: AtomicBool,
    telemetry: ArcSwap<MotorTelemetry>,
}

impl ControllerShared {
    fn new(node: NodeId) -> Self {
        Self {
            node,
            state: RwLock::new(ControllerState::default()),
            critical_failure: AtomicBool::new(false),
            telemetry: ArcSwap::from_pointee(MotorTelemetry::default()),
        }
    }

    pub fn state(&self) -> ControllerState {
        *self.state.read()
    }

    pub fn telemetry(&self) -> MotorTelemetry {
        **self.telemetry.load()
    }

    pub fn is_failed(&self) -> bool {
        self.critical_failure.load(Ordering::Acquire)
    }

    /// 置位失效标志（单调，只在第一次置位时打日志）
    fn mark_failed(&self, reason: &str) {
        if !self.critical_failure.swap(true, Ordering::AcqRel) {
            error!("{}: critical failure: {}", self.node, reason);
        }
    }

    fn update_telemetry(&self, apply: impl Fn(&mut MotorTelemetry)) {
        self.telemetry.rcu(|current| {
            let mut next = **current;
            apply(&mut next);
            Arc::new(next)
        });
    }

    /// SDO 响应解码：按 (索引, 子索引) 查表分发
    fn decode_sdo(&self, frame: &PodFrame) {
        let response = match SdoResponse::parse(frame) {
            Ok(response) => response,
            Err(e) => {
                warn!("{}: undecodable SDO response: {}", self.node, e);
                return;
            },
        };

        let register: Register = (response.index, response.sub_index);
        match register {
            REG_VELOCITY_ACTUAL => {
                let rpm = response.value_i32();
                self.update_telemetry(|t| t.velocity_rpm = rpm);
                trace!("{}: actual velocity {} rpm", self.node, rpm);
            },
            REG_TORQUE_ACTUAL => {
                let torque = response.value_i16();
                self.update_telemetry(|t| t.torque = torque);
                trace!("{}: actual torque {}", self.node, torque);
            },
            REG_MOTOR_TEMPERATURE => {
                let temp = response.value_i32();
                self.update_telemetry(|t| t.motor_temp_c = temp);
                trace!("{}: motor temperature {} C", self.node, temp);
            },
            REG_CONTROLLER_TEMPERATURE => {
                let temp = response.value_i32();
                self.update_telemetry(|t| t.controller_temp_c = temp);
                trace!("{}: controller temperature {} C", self.node, temp);
            },
            REG_STATUSWORD => {
                let byte = response.value_u8();
                match ControllerState::from_status_byte(byte) {
                    Some(state) => {
                        *self.state.write() = state;
                        debug!("{}: state '{}'", self.node, state);
                    },
                    None => {
                        warn!("{}: unrecognized status byte 0x{:02X}, state unchanged", self.node, byte);
                    },
                }
            },
            REG_WARNING_REGISTER | REG_ERROR_REGISTER => {
                let value = response.value_u32();
                if value != 0 {
                    self.mark_failed("nonzero warning/error register");
                    // 分类仅用于诊断输出，分类失败非致命
                    let conditions = classify_warning(value);
                    warn!(
                        "{}: register 0x{:04X} reports 0x{:08X}: {}",
                        self.node,
                        response.index,
                        value,
                        conditions.join(", ")
                    );
                } else {
                    trace!("{}: register 0x{:04X} clean", self.node, response.index);
                }
            },
            _ if is_command_register(register) => {
                debug!(
                    "{}: configuration acknowledged (0x{:04X}:{:02X})",
                    self.node, response.index, response.sub_index
                );
            },
            _ => {
                trace!(
                    "{}: unrecognized SDO register 0x{:04X}:{:02X}, ignoring",
                    self.node, response.index, response.sub_index
                );
            },
        }
    }

    /// 紧急帧：一律置失效并给出诊断分类
    fn decode_emergency(&self, frame: &PodFrame) {
        let diagnosis = EmergencyDiagnosis::from_frame(frame);
        self.mark_failed("emergency frame");
        error!("{}: emergency {}", self.node, diagnosis);
    }
}

/// 已知可写命令寄存器（配置表 + 运行命令）
fn is_command_register(register: Register) -> bool {
    CONFIGURATION_MESSAGES
        .iter()
        .any(|m| (m.index(), m.sub_index()) == register)
        || [
            ENABLE_VELOCITY_MODE,
            ENABLE_AUTO_ALIGN_MODE,
            SET_TARGET_VELOCITY,
            SET_TARGET_TORQUE,
            APPLY_BRAKE,
            CONTROLWORD_SHUTDOWN,
        ]
        .iter()
        .any(|m| (m.index(), m.sub_index()) == register)
}

impl ResponseHandler for ControllerShared {
    fn handle_response(&self, frame: &PodFrame) {
        if frame.id == self.node.sdo_transmit_id() {
            self.decode_sdo(frame);
        } else if frame.id == self.node.emergency_id() {
            self.decode_emergency(frame);
        } else if frame.id == self.node.nmt_transmit_id() {
            trace!("{}: heartbeat 0x{:02X}", self.node, frame.data[0]);
        } else {
            trace!("{}: unhandled frame ID=0x{:X}", self.node, frame.id);
        }
    }
}

/// 走线协议的电机控制器
pub struct CanopenController {
    node: NodeId,
    config: ControllerConfig,
    shared: Arc<ControllerShared>,
    tx: Transceiver,
}

impl CanopenController {
    /// 创建控制器（推进启动时一次，每电机一个）
    pub fn new(node: NodeId, port: Arc<dyn CanPort>, config: ControllerConfig) -> Self {
        let shared = Arc::new(ControllerShared::new(node));
        let tx = Transceiver::new(node, port, shared.clone(), config.sdo_timeout);
        Self {
            node,
            config,
            shared,
            tx,
        }
    }

    /// 发送一帧；超时等同于解码出的致命故障
    fn send_frame(&self, frame: PodFrame) -> Result<(), PropulsionError> {
        self.tx.request(frame).inspect_err(|_| {
            self.shared.mark_failed("send timeout");
        })
    }

    fn request(&self, message: ControllerMessage) -> Result<(), PropulsionError> {
        self.send_frame(message.to_frame(self.node))
    }

    /// 发送转换命令并等待观察到目标状态
    ///
    /// 有界重试（`transition_attempts` 次），固定退避
    /// （`transition_backoff`），耗尽后升级为 critical failure。
    fn request_state_transition(
        &self,
        message: ControllerMessage,
        target: ControllerState,
    ) -> Result<(), PropulsionError> {
        for attempt in 1..=self.config.transition_attempts {
            self.request(message)?;
            std::thread::sleep(self.config.transition_backoff);
            self.check_state()?;

            let state = self.shared.state();
            if state == target {
                return Ok(());
            }
            warn!(
                "{}: transition attempt {}/{} observed '{}', want '{}'",
                self.node, attempt, self.config.transition_attempts, state, target
            );
        }

        self.shared.mark_failed("state transition retries exhausted");
        Err(PropulsionError::TransitionTimeout {
            node: self.node.raw(),
            target,
            attempts: self.config.transition_attempts,
        })
    }
}

impl MotorController for CanopenController {
    fn node_id(&self) -> u8 {
        self.node.raw()
    }

    fn register(&self) {
        self.tx.register();
        debug!("{}: registered on CAN bus", self.node);
    }

    fn configure(&self) -> Result<(), PropulsionError> {
        for message in CONFIGURATION_MESSAGES.iter() {
            self.request(*message)?;
        }
        info!("{}: configuration complete", self.node);
        Ok(())
    }

    fn enter_operational(&self) -> Result<(), PropulsionError> {
        self.send_frame(nmt_command(NMT_START_REMOTE_NODE, self.node))?;
        self.request(ENABLE_VELOCITY_MODE)?;
        self.request(SET_TARGET_VELOCITY.with_u32(0))?;
        self.request(APPLY_BRAKE)?;
        self.request_state_transition(CONTROLWORD_SHUTDOWN, ControllerState::ReadyToSwitchOn)?;
        self.request_state_transition(
            CONTROLWORD_ENABLE_OPERATION,
            ControllerState::OperationEnabled,
        )?;
        info!("{}: operation enabled", self.node);
        Ok(())
    }

    fn enter_pre_operational(&self) -> Result<(), PropulsionError> {
        if self.shared.state() != ControllerState::ReadyToSwitchOn {
            self.request(CONTROLWORD_SHUTDOWN)?;
        }
        Ok(())
    }

    fn check_state(&self) -> Result<(), PropulsionError> {
        self.request(QUERY_STATUSWORD)
    }

    fn send_target_velocity(&self, rpm: i32) -> Result<(), PropulsionError> {
        self.request(SET_TARGET_VELOCITY.with_u32(rpm as u32))
    }

    fn send_target_torque(&self, torque: i16) -> Result<(), PropulsionError> {
        self.request(SET_TARGET_TORQUE.with_u16(torque as u16))
    }

    fn update_actual_velocity(&self) -> Result<(), PropulsionError> {
        self.request(QUERY_VELOCITY_ACTUAL)
    }

    fn update_actual_torque(&self) -> Result<(), PropulsionError> {
        self.request(QUERY_TORQUE_ACTUAL)
    }

    fn update_motor_temp(&self) -> Result<(), PropulsionError> {
        self.request(QUERY_MOTOR_TEMPERATURE)
    }

    fn update_controller_temp(&self) -> Result<(), PropulsionError> {
        self.request(QUERY_CONTROLLER_TEMPERATURE)
    }

    fn quick_stop(&self) -> Result<(), PropulsionError> {
        self.request(CONTROLWORD_QUICK_STOP)
    }

    fn health_check(&self) -> Result<(), PropulsionError> {
        self.request(QUERY_WARNING_REGISTER)?;
        self.request(QUERY_ERROR_REGISTER)?;
        Ok(())
    }

    fn auto_align(&self) -> Result<(), PropulsionError> {
        self.send_frame(nmt_command(NMT_START_REMOTE_NODE, self.node))?;
        std::thread::sleep(self.config.align_settle);
        self.request(ENABLE_AUTO_ALIGN_MODE)?;
        info!("{}: auto align mode active", self.node);
        Ok(())
    }

    fn state(&self) -> ControllerState {
        self.shared.state()
    }

    fn telemetry(&self) -> MotorTelemetry {
        self.shared.telemetry()
    }

    fn is_failed(&self) -> bool {
        self.shared.is_failed()
    }
}
