//! 状态字 → 控制器状态映射
//!
//! 控制器在状态字寄存器里返回一个 8 bit 状态字节，
//! 通过固定查表映射到协议状态机的状态。

use num_enum::TryFromPrimitive;

/// 控制器协议状态
///
/// 正常路径：`NotReadyToSwitchOn → SwitchOnDisabled → ReadyToSwitchOn →
/// SwitchedOn → OperationEnabled`；`QuickStopActive` 和
/// `FaultReactionActive → Fault` 是任意状态都可进入的侧向失效状态。
/// 没有回到 `NotReadyToSwitchOn` 的建模转换：故障控制器需要外部复位。
///
/// 判别值即状态字节本身。
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum ControllerState {
    /// 初始状态
    NotReadyToSwitchOn = 0x00,
    SwitchOnDisabled = 0x40,
    ReadyToSwitchOn = 0x21,
    SwitchedOn = 0x23,
    OperationEnabled = 0x27,
    /// 急停激活
    QuickStopActive = 0x07,
    /// 故障处理中
    FaultReactionActive = 0x0F,
    /// 故障
    Fault = 0x08,
}

impl ControllerState {
    /// 从状态字节查表
    ///
    /// 未识别的字节返回 `None`，调用方记录日志并保持原状态。
    pub fn from_status_byte(byte: u8) -> Option<Self> {
        Self::try_from(byte).ok()
    }

    /// 是否为失效状态
    pub fn is_fault(&self) -> bool {
        matches!(self, Self::Fault | Self::FaultReactionActive | Self::QuickStopActive)
    }
}

impl Default for ControllerState {
    fn default() -> Self {
        Self::NotReadyToSwitchOn
    }
}

impl std::fmt::Display for ControllerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NotReadyToSwitchOn => "not ready to switch on",
            Self::SwitchOnDisabled => "switch on disabled",
            Self::ReadyToSwitchOn => "ready to switch on",
            Self::SwitchedOn => "switched on",
            Self::OperationEnabled => "operation enabled",
            Self::QuickStopActive => "quick stop active",
            Self::FaultReactionActive => "fault reaction active",
            Self::Fault => "fault",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_byte_lookup() {
        assert_eq!(
            ControllerState::from_status_byte(0x00),
            Some(ControllerState::NotReadyToSwitchOn)
        );
        assert_eq!(
            ControllerState::from_status_byte(0x40),
            Some(ControllerState::SwitchOnDisabled)
        );
        assert_eq!(
            ControllerState::from_status_byte(0x21),
            Some(ControllerState::ReadyToSwitchOn)
        );
        assert_eq!(ControllerState::from_status_byte(0x23), Some(ControllerState::SwitchedOn));
        assert_eq!(
            ControllerState::from_status_byte(0x27),
            Some(ControllerState::OperationEnabled)
        );
        assert_eq!(
            ControllerState::from_status_byte(0x07),
            Some(ControllerState::QuickStopActive)
        );
        assert_eq!(
            ControllerState::from_status_byte(0x0F),
            Some(ControllerState::FaultReactionActive)
        );
        assert_eq!(ControllerState::from_status_byte(0x08), Some(ControllerState::Fault));
    }

    #[test]
    fn test_unrecognized_byte() {
        assert_eq!(ControllerState::from_status_byte(0xFF), None);
        assert_eq!(ControllerState::from_status_byte(0x01), None);
    }

    #[test]
    fn test_default_is_initial_state() {
        assert_eq!(ControllerState::default(), ControllerState::NotReadyToSwitchOn);
    }
}
