//! 对象字典寄存器地址与固定命令表
//!
//! 命令表按用途分组：配置、运行、遥测查询、健康检查。
//! 所有表都是只读常量，发送前可通过 `with_u32`/`with_u16`
//! 覆盖数据区（例如注入目标速度）。

use crate::sdo::{ControllerMessage, SDO_WRITE_1, SDO_WRITE_2, SDO_WRITE_4};

/// 对象字典地址：(索引, 子索引)
pub type Register = (u16, u8);

// ============================================================================
// 对象字典地址
// ============================================================================

// CiA 402 标准寄存器
/// 控制字
pub const REG_CONTROLWORD: Register = (0x6040, 0x00);
/// 状态字
pub const REG_STATUSWORD: Register = (0x6041, 0x00);
/// 运行模式
pub const REG_MODES_OF_OPERATION: Register = (0x6060, 0x00);
/// 实际速度 (rpm)
pub const REG_VELOCITY_ACTUAL: Register = (0x606C, 0x00);
/// 目标转矩
pub const REG_TARGET_TORQUE: Register = (0x6071, 0x00);
/// 实际转矩
pub const REG_TORQUE_ACTUAL: Register = (0x6077, 0x00);
/// 目标速度 (rpm)
pub const REG_TARGET_VELOCITY: Register = (0x60FF, 0x00);

// 错误 / 告警寄存器
/// CANopen 错误寄存器
pub const REG_ERROR_REGISTER: Register = (0x1001, 0x00);
/// 厂商告警寄存器
pub const REG_WARNING_REGISTER: Register = (0x2000, 0x00);

// 厂商配置寄存器
/// 电机极对数
pub const REG_MOTOR_POLES: Register = (0x2030, 0x00);
/// 反馈类型
pub const REG_FEEDBACK_TYPE: Register = (0x2040, 0x01);
/// 反馈方向
pub const REG_FEEDBACK_DIRECTION: Register = (0x2040, 0x02);
/// 反馈分辨率
pub const REG_FEEDBACK_RESOLUTION: Register = (0x2040, 0x03);
/// 过压阈值 (V)
pub const REG_OVER_VOLTAGE_LIMIT: Register = (0x2054, 0x01);
/// 欠压阈值 (V)
pub const REG_UNDER_VOLTAGE_LIMIT: Register = (0x2054, 0x02);
/// 峰值电流限制 (mA)
pub const REG_MAX_CURRENT: Register = (0x2050, 0x00);
/// 持续电流限制 (mA)
pub const REG_RATED_CURRENT: Register = (0x2051, 0x00);
/// 最大速度 (rpm)
pub const REG_MAX_VELOCITY: Register = (0x2052, 0x00);
/// 电流环增益 Kp
pub const REG_CURRENT_GAIN_P: Register = (0x2310, 0x01);
/// 电流环增益 Ki
pub const REG_CURRENT_GAIN_I: Register = (0x2310, 0x02);
/// 速度环增益 Kp
pub const REG_VELOCITY_GAIN_P: Register = (0x2311, 0x01);
/// 速度环增益 Ki
pub const REG_VELOCITY_GAIN_I: Register = (0x2311, 0x02);
/// 编码器系数
pub const REG_ENCODER_FACTOR: Register = (0x2060, 0x00);
/// 抱闸控制
pub const REG_BRAKE_CONTROL: Register = (0x2034, 0x00);
/// 电机温度 (°C)
pub const REG_MOTOR_TEMPERATURE: Register = (0x2025, 0x00);
/// 控制器温度 (°C)
pub const REG_CONTROLLER_TEMPERATURE: Register = (0x2026, 0x00);

// 运行模式值
/// 速度模式
pub const MODE_VELOCITY: u8 = 0x09;
/// 自动对位模式（仅标定使用，激活期间速度不可控）
pub const MODE_AUTO_ALIGN: u8 = 0xFD;

// ============================================================================
// 配置命令表
// ============================================================================

/// 完整的有序配置命令表
///
/// 配置阶段按顺序逐条发送；任何一条发送失败即中止并上报。
pub const CONFIGURATION_MESSAGES: [ControllerMessage; 14] = [
    // 电机极对数：10
    ControllerMessage::write(SDO_WRITE_1, REG_MOTOR_POLES.0, REG_MOTOR_POLES.1, [10, 0, 0, 0]),
    // 反馈类型：增量编码器
    ControllerMessage::write(SDO_WRITE_1, REG_FEEDBACK_TYPE.0, REG_FEEDBACK_TYPE.1, [2, 0, 0, 0]),
    // 反馈方向：正向
    ControllerMessage::write(
        SDO_WRITE_1,
        REG_FEEDBACK_DIRECTION.0,
        REG_FEEDBACK_DIRECTION.1,
        [0, 0, 0, 0],
    ),
    // 反馈分辨率：2048 线
    ControllerMessage::write(
        SDO_WRITE_4,
        REG_FEEDBACK_RESOLUTION.0,
        REG_FEEDBACK_RESOLUTION.1,
        [0x00, 0x08, 0, 0],
    ),
    // 过压阈值：450 V
    ControllerMessage::write(
        SDO_WRITE_2,
        REG_OVER_VOLTAGE_LIMIT.0,
        REG_OVER_VOLTAGE_LIMIT.1,
        [0xC2, 0x01, 0, 0],
    ),
    // 欠压阈值：150 V
    ControllerMessage::write(
        SDO_WRITE_2,
        REG_UNDER_VOLTAGE_LIMIT.0,
        REG_UNDER_VOLTAGE_LIMIT.1,
        [0x96, 0x00, 0, 0],
    ),
    // 峰值电流：300 A = 300_000 mA (0x000493E0)
    ControllerMessage::write(SDO_WRITE_4, REG_MAX_CURRENT.0, REG_MAX_CURRENT.1, [0xE0, 0x93, 0x04, 0]),
    // 持续电流：120 A = 120_000 mA (0x0001D4C0)
    ControllerMessage::write(
        SDO_WRITE_4,
        REG_RATED_CURRENT.0,
        REG_RATED_CURRENT.1,
        [0xC0, 0xD4, 0x01, 0],
    ),
    // 最大速度：7000 rpm (0x1B58)
    ControllerMessage::write(SDO_WRITE_4, REG_MAX_VELOCITY.0, REG_MAX_VELOCITY.1, [0x58, 0x1B, 0, 0]),
    // 电流环增益
    ControllerMessage::write(SDO_WRITE_2, REG_CURRENT_GAIN_P.0, REG_CURRENT_GAIN_P.1, [0x64, 0, 0, 0]),
    ControllerMessage::write(SDO_WRITE_2, REG_CURRENT_GAIN_I.0, REG_CURRENT_GAIN_I.1, [0x0A, 0, 0, 0]),
    // 速度环增益
    ControllerMessage::write(
        SDO_WRITE_2,
        REG_VELOCITY_GAIN_P.0,
        REG_VELOCITY_GAIN_P.1,
        [0xC8, 0, 0, 0],
    ),
    ControllerMessage::write(
        SDO_WRITE_2,
        REG_VELOCITY_GAIN_I.0,
        REG_VELOCITY_GAIN_I.1,
        [0x14, 0, 0, 0],
    ),
    // 编码器系数
    ControllerMessage::write(SDO_WRITE_4, REG_ENCODER_FACTOR.0, REG_ENCODER_FACTOR.1, [0x01, 0, 0, 0]),
];

// ============================================================================
// 运行命令
// ============================================================================

/// 使能速度模式
pub const ENABLE_VELOCITY_MODE: ControllerMessage = ControllerMessage::write(
    SDO_WRITE_1,
    REG_MODES_OF_OPERATION.0,
    REG_MODES_OF_OPERATION.1,
    [MODE_VELOCITY, 0, 0, 0],
);

/// 使能自动对位模式
pub const ENABLE_AUTO_ALIGN_MODE: ControllerMessage = ControllerMessage::write(
    SDO_WRITE_1,
    REG_MODES_OF_OPERATION.0,
    REG_MODES_OF_OPERATION.1,
    [MODE_AUTO_ALIGN, 0, 0, 0],
);

/// 目标速度模板（发送前注入 rpm 值）
pub const SET_TARGET_VELOCITY: ControllerMessage =
    ControllerMessage::write(SDO_WRITE_4, REG_TARGET_VELOCITY.0, REG_TARGET_VELOCITY.1, [0; 4]);

/// 目标转矩模板（发送前注入值）
pub const SET_TARGET_TORQUE: ControllerMessage =
    ControllerMessage::write(SDO_WRITE_2, REG_TARGET_TORQUE.0, REG_TARGET_TORQUE.1, [0; 4]);

/// 上抱闸
pub const APPLY_BRAKE: ControllerMessage =
    ControllerMessage::write(SDO_WRITE_1, REG_BRAKE_CONTROL.0, REG_BRAKE_CONTROL.1, [1, 0, 0, 0]);

// 控制字命令（CiA 402 状态机转换）
/// Shutdown：请求 ReadyToSwitchOn
pub const CONTROLWORD_SHUTDOWN: ControllerMessage =
    ControllerMessage::write(SDO_WRITE_2, REG_CONTROLWORD.0, REG_CONTROLWORD.1, [0x06, 0, 0, 0]);

/// Switch on：请求 SwitchedOn
pub const CONTROLWORD_SWITCH_ON: ControllerMessage =
    ControllerMessage::write(SDO_WRITE_2, REG_CONTROLWORD.0, REG_CONTROLWORD.1, [0x07, 0, 0, 0]);

/// Enable operation：请求 OperationEnabled
pub const CONTROLWORD_ENABLE_OPERATION: ControllerMessage =
    ControllerMessage::write(SDO_WRITE_2, REG_CONTROLWORD.0, REG_CONTROLWORD.1, [0x0F, 0, 0, 0]);

/// Quick stop：立即不受控减速
pub const CONTROLWORD_QUICK_STOP: ControllerMessage =
    ControllerMessage::write(SDO_WRITE_2, REG_CONTROLWORD.0, REG_CONTROLWORD.1, [0x02, 0, 0, 0]);

// ============================================================================
// 查询命令
// ============================================================================

/// 状态字查询
pub const QUERY_STATUSWORD: ControllerMessage =
    ControllerMessage::read(REG_STATUSWORD.0, REG_STATUSWORD.1);

/// 实际速度查询
pub const QUERY_VELOCITY_ACTUAL: ControllerMessage =
    ControllerMessage::read(REG_VELOCITY_ACTUAL.0, REG_VELOCITY_ACTUAL.1);

/// 实际转矩查询
pub const QUERY_TORQUE_ACTUAL: ControllerMessage =
    ControllerMessage::read(REG_TORQUE_ACTUAL.0, REG_TORQUE_ACTUAL.1);

/// 电机温度查询
pub const QUERY_MOTOR_TEMPERATURE: ControllerMessage =
    ControllerMessage::read(REG_MOTOR_TEMPERATURE.0, REG_MOTOR_TEMPERATURE.1);

/// 控制器温度查询
pub const QUERY_CONTROLLER_TEMPERATURE: ControllerMessage =
    ControllerMessage::read(REG_CONTROLLER_TEMPERATURE.0, REG_CONTROLLER_TEMPERATURE.1);

/// 告警寄存器查询
pub const QUERY_WARNING_REGISTER: ControllerMessage =
    ControllerMessage::read(REG_WARNING_REGISTER.0, REG_WARNING_REGISTER.1);

/// 错误寄存器查询
pub const QUERY_ERROR_REGISTER: ControllerMessage =
    ControllerMessage::read(REG_ERROR_REGISTER.0, REG_ERROR_REGISTER.1);
