//! # Pod Protocol
//!
//! 电机控制器 CAN 总线协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `ids`: CAN ID 基址常量定义（功能码 + 节点号）
//! - `sdo`: SDO 命令模板构建与响应解析
//! - `registers`: 对象字典寄存器地址与固定命令表
//! - `state`: 状态字 → 控制器状态映射
//! - `emergency`: 紧急帧 / 告警寄存器分类
//!
//! ## 字节序
//!
//! 协议数据区使用 Intel (LSB) 低位在前（小端字节序）。
//! 紧急帧错误码是唯一的例外，见 [`emergency`]。

pub mod emergency;
pub mod ids;
pub mod registers;
pub mod sdo;
pub mod state;

// 重新导出常用类型
pub use emergency::*;
pub use ids::*;
pub use registers::*;
pub use sdo::*;
pub use state::*;

use thiserror::Error;

/// CAN 2.0 标准帧的统一抽象
///
/// `PodFrame` 是协议层和硬件层之间的中间抽象：
/// - **层次解耦**：协议层不依赖底层 CAN 实现
/// - **统一接口**：上层通过 `CanAdapter` trait 使用统一的帧类型
///
/// # 设计特性
///
/// - **Copy trait**：零成本复制，适合高频 CAN 场景
/// - **固定 8 字节**：避免堆分配
/// - **不变量**：`len <= 8`，由构造器保证
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PodFrame {
    /// CAN ID（标准帧 11 bit 或扩展帧 29 bit）
    pub id: u32,

    /// 帧数据（固定 8 字节，未使用部分为 0）
    pub data: [u8; 8],

    /// 有效数据长度 (0-8)
    pub len: u8,

    /// 是否为扩展帧（29-bit ID）
    pub is_extended: bool,
}

impl PodFrame {
    /// 创建标准帧
    pub fn new_standard(id: u32, data: &[u8]) -> Self {
        Self::new(id, data, false)
    }

    /// 创建扩展帧
    pub fn new_extended(id: u32, data: &[u8]) -> Self {
        Self::new(id, data, true)
    }

    /// 通用构造器
    fn new(id: u32, data: &[u8], is_extended: bool) -> Self {
        let mut fixed_data = [0u8; 8];
        let len = data.len().min(8);
        fixed_data[..len].copy_from_slice(&data[..len]);

        Self {
            id,
            data: fixed_data,
            len: len as u8,
            is_extended,
        }
    }

    /// 获取数据切片（只包含有效数据）
    pub fn data_slice(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }

    /// 获取 CAN ID
    pub fn id(&self) -> u32 {
        self.id
    }
}

/// 协议解析错误类型
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid frame length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Invalid CAN ID: 0x{id:X}")]
    InvalidCanId { id: u32 },

    #[error("Invalid node id: {0} (expected 1..=127)")]
    InvalidNodeId(u8),

    #[error("Invalid value for field {field}: {value}")]
    InvalidValue { field: String, value: u8 },
}

/// 字节序转换工具函数
///
/// 协议数据区使用 Intel (LSB) 低位在前（小端字节序）。
///
/// 小端字节序转 i32
pub fn bytes_to_i32_le(bytes: [u8; 4]) -> i32 {
    i32::from_le_bytes(bytes)
}

/// 小端字节序转 i16
pub fn bytes_to_i16_le(bytes: [u8; 2]) -> i16 {
    i16::from_le_bytes(bytes)
}

/// i32 转小端字节序
pub fn i32_to_bytes_le(value: i32) -> [u8; 4] {
    value.to_le_bytes()
}

/// i16 转小端字节序
pub fn i16_to_bytes_le(value: i16) -> [u8; 2] {
    value.to_le_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_truncates_to_eight_bytes() {
        let frame = PodFrame::new_standard(0x123, &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        assert_eq!(frame.len, 8);
        assert_eq!(frame.data_slice(), &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_frame_short_payload_zero_padded() {
        let frame = PodFrame::new_standard(0x601, &[0x40, 0x41, 0x60]);
        assert_eq!(frame.len, 3);
        assert_eq!(frame.data, [0x40, 0x41, 0x60, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_bytes_to_i32_le_negative() {
        assert_eq!(bytes_to_i32_le([0xFF, 0xFF, 0xFF, 0xFF]), -1);
    }

    #[test]
    fn test_bytes_to_i16_le() {
        assert_eq!(bytes_to_i16_le([0x34, 0x12]), 0x1234);
    }

    #[test]
    fn test_roundtrip_i32() {
        let original = -123_456;
        assert_eq!(bytes_to_i32_le(i32_to_bytes_le(original)), original);
    }
}
