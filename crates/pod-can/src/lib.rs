//! # Pod CAN Adapter Layer
//!
//! CAN 硬件抽象层，提供统一的 CAN 接口抽象和接收分发总线。

use std::time::Duration;
use thiserror::Error;

// 重新导出 pod-protocol 中的 PodFrame
pub use pod_protocol::PodFrame;

pub mod bus;
pub use bus::{Bus, CanPort, FrameConsumer};

#[cfg(target_os = "linux")]
pub mod socketcan;

#[cfg(target_os = "linux")]
pub use socketcan::{SocketCanAdapter, SocketCanRxAdapter, SocketCanTxAdapter};

/// CAN 适配层统一错误类型
#[derive(Error, Debug)]
pub enum CanError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Device Error: {0}")]
    Device(#[from] CanDeviceError),
    #[error("Read timeout")]
    Timeout,
    #[error("Buffer overflow")]
    BufferOverflow,
    #[error("Bus off")]
    BusOff,
    #[error("Bus not running")]
    NotRunning,
}

/// 设备/后端错误的结构化分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanDeviceErrorKind {
    Unknown,
    NotFound,
    NoDevice,
    AccessDenied,
    Busy,
    UnsupportedConfig,
    InvalidFrame,
    Backend,
}

/// 结构化设备错误
#[derive(Error, Debug, Clone)]
#[error("{kind:?}: {message}")]
pub struct CanDeviceError {
    pub kind: CanDeviceErrorKind,
    pub message: String,
}

impl CanDeviceError {
    pub fn new(kind: CanDeviceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            CanDeviceErrorKind::NoDevice
                | CanDeviceErrorKind::AccessDenied
                | CanDeviceErrorKind::NotFound
        )
    }
}

impl From<String> for CanDeviceError {
    fn from(message: String) -> Self {
        Self::new(CanDeviceErrorKind::Unknown, message)
    }
}

impl From<&str> for CanDeviceError {
    fn from(message: &str) -> Self {
        Self::new(CanDeviceErrorKind::Unknown, message)
    }
}

/// 统一 CAN 适配器接口
pub trait CanAdapter {
    fn send(&mut self, frame: PodFrame) -> Result<(), CanError>;
    fn receive(&mut self) -> Result<PodFrame, CanError>;
    fn set_receive_timeout(&mut self, _timeout: Duration) {}
}

/// 只读接收端
pub trait RxAdapter {
    fn receive(&mut self) -> Result<PodFrame, CanError>;
}

/// 只写发送端
pub trait TxAdapter {
    fn send(&mut self, frame: PodFrame) -> Result<(), CanError>;
}

/// 可分离为独立 RX/TX 两半的适配器
///
/// 分离后 RX 线程不受发送阻塞影响。
pub trait SplittableAdapter: CanAdapter {
    type RxAdapter: RxAdapter;
    type TxAdapter: TxAdapter;
    fn split(self) -> Result<(Self::RxAdapter, Self::TxAdapter), CanError>;
}
