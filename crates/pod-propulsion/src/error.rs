//! 推进层错误类型定义

use pod_can::CanError;
use pod_protocol::{ControllerState, ProtocolError};
use std::time::Duration;
use thiserror::Error;

/// 推进层错误类型
///
/// 传输超时、协议故障和状态转换超时最终都汇聚到控制器的
/// `critical_failure` 标志；错误值本身只用于向调用方中止
/// 当前操作序列。
#[derive(Error, Debug)]
pub enum PropulsionError {
    /// CAN 驱动错误
    #[error("CAN driver error: {0}")]
    Can(#[from] CanError),

    /// 协议解析错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 发送后在超时窗口内没有等到相关响应
    #[error("Send timeout: no response from node {node} within {timeout:?}")]
    SendTimeout { node: u8, timeout: Duration },

    /// 有界重试耗尽仍未观察到目标状态
    #[error("Transition timeout: node {node} did not reach '{target}' after {attempts} attempts")]
    TransitionTimeout {
        node: u8,
        target: ControllerState,
        attempts: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_timeout_display() {
        let e = PropulsionError::SendTimeout {
            node: 3,
            timeout: Duration::from_millis(70),
        };
        let msg = format!("{}", e);
        assert!(msg.contains("node 3") && msg.contains("70ms"));
    }

    #[test]
    fn test_transition_timeout_display() {
        let e = PropulsionError::TransitionTimeout {
            node: 1,
            target: ControllerState::OperationEnabled,
            attempts: 3,
        };
        let msg = format!("{}", e);
        assert!(msg.contains("operation enabled") && msg.contains("3 attempts"));
    }

    #[test]
    fn test_from_can_error() {
        let e: PropulsionError = CanError::Timeout.into();
        assert!(matches!(e, PropulsionError::Can(CanError::Timeout)));
    }
}
