//! 紧急帧 / 告警寄存器分类
//!
//! 紧急帧携带 16 bit 错误码，按标准错误码页分类；厂商自定义页
//! (0xFFxx) 进一步解码为固定的故障列表。分类仅用于诊断输出，
//! 对控制流的唯一影响是置位 `critical_failure`。
//!
//! 错误码字从帧数据区按高位在前组装：payload `(0xFF, 0x03)`
//! 即错误码 `0xFF03`。

use crate::PodFrame;
use num_enum::TryFromPrimitive;

/// 从紧急帧取出 16 bit 错误码
pub fn emergency_code(frame: &PodFrame) -> u16 {
    u16::from_be_bytes([frame.data[0], frame.data[1]])
}

/// 紧急错误码分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmergencyCategory {
    NoError,
    Generic,
    CurrentGeneric,
    CurrentInput,
    CurrentInside,
    CurrentOutput,
    VoltageGeneric,
    MainsVoltage,
    VoltageInside,
    OutputVoltage,
    TemperatureGeneric,
    AmbientTemperature,
    DeviceTemperature,
    Hardware,
    SoftwareGeneric,
    InternalSoftware,
    UserSoftware,
    DataSet,
    AdditionalModules,
    MonitoringGeneric,
    Communication,
    CanOverrun,
    CanErrorPassive,
    HeartbeatError,
    BusOffRecovered,
    CanIdCollision,
    ProtocolError,
    PdoLengthError,
    PdoLengthExceeded,
    ExternalError,
    AdditionalFunctions,
    DeviceSpecific,
    Unknown,
}

impl EmergencyCategory {
    /// 按错误码页分类
    pub fn classify(code: u16) -> Self {
        match code {
            0x0000 => Self::NoError,
            0x1000..=0x1FFF => Self::Generic,
            0x2100..=0x21FF => Self::CurrentInput,
            0x2200..=0x22FF => Self::CurrentInside,
            0x2300..=0x23FF => Self::CurrentOutput,
            0x2000..=0x2FFF => Self::CurrentGeneric,
            0x3100..=0x31FF => Self::MainsVoltage,
            0x3200..=0x32FF => Self::VoltageInside,
            0x3300..=0x33FF => Self::OutputVoltage,
            0x3000..=0x3FFF => Self::VoltageGeneric,
            0x4100..=0x41FF => Self::AmbientTemperature,
            0x4200..=0x42FF => Self::DeviceTemperature,
            0x4000..=0x4FFF => Self::TemperatureGeneric,
            0x5000..=0x5FFF => Self::Hardware,
            0x6100..=0x61FF => Self::InternalSoftware,
            0x6200..=0x62FF => Self::UserSoftware,
            0x6300..=0x63FF => Self::DataSet,
            0x6000..=0x6FFF => Self::SoftwareGeneric,
            0x7000..=0x7FFF => Self::AdditionalModules,
            0x8110 => Self::CanOverrun,
            0x8120 => Self::CanErrorPassive,
            0x8130 => Self::HeartbeatError,
            0x8140 => Self::BusOffRecovered,
            0x8150 => Self::CanIdCollision,
            0x8210..=0x8217 => Self::PdoLengthError,
            0x8220..=0x822F => Self::PdoLengthExceeded,
            0x8100..=0x81FF => Self::Communication,
            0x8200..=0x82FF => Self::ProtocolError,
            0x8000..=0x8FFF => Self::MonitoringGeneric,
            0x9000..=0x9FFF => Self::ExternalError,
            0xF000..=0xFEFF => Self::AdditionalFunctions,
            0xFF00..=0xFFFF => Self::DeviceSpecific,
            _ => Self::Unknown,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::NoError => "no error",
            Self::Generic => "generic error",
            Self::CurrentGeneric => "current error",
            Self::CurrentInput => "current error, input side",
            Self::CurrentInside => "current error, inside the device",
            Self::CurrentOutput => "current error, output side",
            Self::VoltageGeneric => "voltage error",
            Self::MainsVoltage => "mains voltage error",
            Self::VoltageInside => "voltage error, inside the device",
            Self::OutputVoltage => "output voltage error",
            Self::TemperatureGeneric => "temperature error",
            Self::AmbientTemperature => "ambient temperature error",
            Self::DeviceTemperature => "device temperature error",
            Self::Hardware => "device hardware error",
            Self::SoftwareGeneric => "device software error",
            Self::InternalSoftware => "internal software error",
            Self::UserSoftware => "user software error",
            Self::DataSet => "data set error",
            Self::AdditionalModules => "additional modules error",
            Self::MonitoringGeneric => "monitoring error",
            Self::Communication => "communication error",
            Self::CanOverrun => "CAN overrun, objects lost",
            Self::CanErrorPassive => "CAN in error passive mode",
            Self::HeartbeatError => "life guard or heartbeat error",
            Self::BusOffRecovered => "recovered from bus off",
            Self::CanIdCollision => "CAN-ID collision",
            Self::ProtocolError => "protocol error",
            Self::PdoLengthError => "PDO not processed due to length error",
            Self::PdoLengthExceeded => "PDO length exceeded",
            Self::ExternalError => "external error",
            Self::AdditionalFunctions => "additional functions error",
            Self::DeviceSpecific => "manufacturer specific error",
            Self::Unknown => "unknown error code",
        }
    }
}

/// 厂商自定义故障（错误码页 0xFFxx 的低字节）
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum ManufacturerFault {
    Overcurrent = 0x01,
    ChargePumpUndervoltage = 0x02,
    HighSidePhase1ShortCircuit = 0x03,
    HighSidePhase2ShortCircuit = 0x04,
    HighSidePhase3ShortCircuit = 0x05,
    LowSidePhase1ShortCircuit = 0x06,
    LowSidePhase2ShortCircuit = 0x07,
    LowSidePhase3ShortCircuit = 0x08,
    EncoderFeedbackFault = 0x09,
    SafeTorqueOff = 0x0A,
    HallSensorFault = 0x0B,
    MotorStalled = 0x0C,
}

impl ManufacturerFault {
    pub fn description(&self) -> &'static str {
        match self {
            Self::Overcurrent => "overcurrent",
            Self::ChargePumpUndervoltage => "charge pump undervoltage",
            Self::HighSidePhase1ShortCircuit => "high side phase 1 short circuit",
            Self::HighSidePhase2ShortCircuit => "high side phase 2 short circuit",
            Self::HighSidePhase3ShortCircuit => "high side phase 3 short circuit",
            Self::LowSidePhase1ShortCircuit => "low side phase 1 short circuit",
            Self::LowSidePhase2ShortCircuit => "low side phase 2 short circuit",
            Self::LowSidePhase3ShortCircuit => "low side phase 3 short circuit",
            Self::EncoderFeedbackFault => "encoder feedback fault",
            Self::SafeTorqueOff => "safe torque off active",
            Self::HallSensorFault => "hall sensor fault",
            Self::MotorStalled => "motor stalled",
        }
    }
}

/// 紧急帧的完整诊断结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmergencyDiagnosis {
    pub code: u16,
    pub category: EmergencyCategory,
    /// 仅厂商自定义页携带
    pub fault: Option<ManufacturerFault>,
}

impl EmergencyDiagnosis {
    /// 解码一个紧急帧
    pub fn from_frame(frame: &PodFrame) -> Self {
        let code = emergency_code(frame);
        let category = EmergencyCategory::classify(code);
        let fault = if category == EmergencyCategory::DeviceSpecific {
            ManufacturerFault::try_from((code & 0xFF) as u8).ok()
        } else {
            None
        };
        Self { code, category, fault }
    }
}

impl std::fmt::Display for EmergencyDiagnosis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.fault {
            Some(fault) => write!(f, "0x{:04X}: {}", self.code, fault.description()),
            None => write!(f, "0x{:04X}: {}", self.code, self.category.description()),
        }
    }
}

// ============================================================================
// 告警 / 错误寄存器
// ============================================================================

// 告警寄存器位定义
pub const WARNING_CURRENT: u32 = 1 << 0;
pub const WARNING_VOLTAGE: u32 = 1 << 1;
pub const WARNING_TEMPERATURE: u32 = 1 << 2;
pub const WARNING_STALL: u32 = 1 << 3;
pub const WARNING_COMMUNICATION: u32 = 1 << 4;
pub const WARNING_ENCODER: u32 = 1 << 5;
pub const WARNING_BRAKE: u32 = 1 << 6;
pub const WARNING_SUPPLY: u32 = 1 << 7;

/// 告警/错误寄存器的逐位分类
///
/// 返回置位条件的可读名称；未知位不阻塞（仅诊断用途，
/// 分类失败是非致命的）。
pub fn classify_warning(value: u32) -> Vec<&'static str> {
    let known = [
        (WARNING_CURRENT, "current limit warning"),
        (WARNING_VOLTAGE, "voltage out of range"),
        (WARNING_TEMPERATURE, "temperature limit warning"),
        (WARNING_STALL, "motor stall detected"),
        (WARNING_COMMUNICATION, "communication warning"),
        (WARNING_ENCODER, "encoder warning"),
        (WARNING_BRAKE, "brake warning"),
        (WARNING_SUPPLY, "logic supply warning"),
    ];
    let mut conditions: Vec<&'static str> = known
        .iter()
        .filter(|(bit, _)| value & bit != 0)
        .map(|(_, name)| *name)
        .collect();
    if value & !known.iter().map(|(bit, _)| bit).sum::<u32>() != 0 {
        conditions.push("unrecognized warning bits");
    }
    conditions
}
