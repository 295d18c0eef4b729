//! SDO 命令模板构建与响应解析
//!
//! SDO（Service Data Object）是读写控制器对象字典单个寄存器的
//! 请求/响应消息对。请求帧布局：
//!
//! ```text
//! byte 0    : 命令码（写 1/2/4 字节或读）
//! byte 1-2  : 对象索引（小端）
//! byte 3    : 子索引
//! byte 4-7  : 数据区（小端，写时携带值，读时为 0）
//! ```

use crate::{NodeId, PodFrame, ProtocolError};

// SDO 请求命令码（expedited transfer）
/// 写 4 字节
pub const SDO_WRITE_4: u8 = 0x23;
/// 写 2 字节
pub const SDO_WRITE_2: u8 = 0x2B;
/// 写 1 字节
pub const SDO_WRITE_1: u8 = 0x2F;
/// 读请求
pub const SDO_READ: u8 = 0x40;

// SDO 响应命令码
/// 写确认
pub const SDO_WRITE_ACK: u8 = 0x60;
/// 读响应（4 字节）
pub const SDO_READ_REPLY_4: u8 = 0x43;
/// 读响应（2 字节）
pub const SDO_READ_REPLY_2: u8 = 0x4B;
/// 读响应（1 字节）
pub const SDO_READ_REPLY_1: u8 = 0x4F;
/// 传输中止
pub const SDO_ABORT: u8 = 0x80;

/// NMT 命令码：进入 operational 模式
pub const NMT_START_REMOTE_NODE: u8 = 0x01;
/// NMT 命令码：进入 pre-operational 模式
pub const NMT_ENTER_PRE_OPERATIONAL: u8 = 0x80;

/// 8 字节命令模板
///
/// 由 (命令码, 对象索引低/高, 子索引) 标识，尾部 4 字节数据区
/// 可在发送前被覆盖（例如注入目标速度）。命令表是只读常量，
/// 全部控制器共享。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerMessage {
    data: [u8; 8],
}

impl ControllerMessage {
    /// 从完整 8 字节构造（编译期常量表使用）
    pub const fn from_bytes(data: [u8; 8]) -> Self {
        Self { data }
    }

    /// 构造 SDO 写命令
    pub const fn write(command: u8, index: u16, sub_index: u8, value: [u8; 4]) -> Self {
        Self {
            data: [
                command,
                (index & 0xFF) as u8,
                (index >> 8) as u8,
                sub_index,
                value[0],
                value[1],
                value[2],
                value[3],
            ],
        }
    }

    /// 构造 SDO 读命令
    pub const fn read(index: u16, sub_index: u8) -> Self {
        Self::write(SDO_READ, index, sub_index, [0; 4])
    }

    /// 命令码
    pub fn command(&self) -> u8 {
        self.data[0]
    }

    /// 对象索引
    pub fn index(&self) -> u16 {
        u16::from_le_bytes([self.data[1], self.data[2]])
    }

    /// 子索引
    pub fn sub_index(&self) -> u8 {
        self.data[3]
    }

    /// 注入 32 位值到数据区 byte 4-7（小端）
    pub fn with_u32(mut self, value: u32) -> Self {
        self.data[4..8].copy_from_slice(&value.to_le_bytes());
        self
    }

    /// 注入 16 位值到数据区 byte 4-5（小端）
    pub fn with_u16(mut self, value: u16) -> Self {
        self.data[4..6].copy_from_slice(&value.to_le_bytes());
        self
    }

    /// 转换为目标节点的 SDO 请求帧
    pub fn to_frame(self, node: NodeId) -> PodFrame {
        PodFrame::new_standard(node.sdo_receive_id(), &self.data)
    }

    /// 原始 8 字节
    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.data
    }
}

/// NMT 命令帧
///
/// ID 为 `NMT_RECEIVE + node`；byte 0 = 命令码（0x01 = operational），
/// byte 1 = 节点号。
pub fn nmt_command(command: u8, node: NodeId) -> PodFrame {
    PodFrame::new_standard(node.nmt_receive_id(), &[command, node.raw()])
}

/// 解码后的 SDO 响应
///
/// 布局与请求相同；byte 4 起携带请求的数据。
#[derive(Debug, Clone, Copy)]
pub struct SdoResponse {
    pub command: u8,
    pub index: u16,
    pub sub_index: u8,
    pub data: [u8; 4],
}

impl SdoResponse {
    /// 从 SDO 响应帧解析
    pub fn parse(frame: &PodFrame) -> Result<Self, ProtocolError> {
        if frame.len < 4 {
            return Err(ProtocolError::InvalidLength {
                expected: 8,
                actual: frame.len as usize,
            });
        }
        Ok(Self {
            command: frame.data[0],
            index: u16::from_le_bytes([frame.data[1], frame.data[2]]),
            sub_index: frame.data[3],
            data: [frame.data[4], frame.data[5], frame.data[6], frame.data[7]],
        })
    }

    /// 数据区解释为 i32（小端）
    pub fn value_i32(&self) -> i32 {
        i32::from_le_bytes(self.data)
    }

    /// 数据区解释为 i16（小端）
    pub fn value_i16(&self) -> i16 {
        i16::from_le_bytes([self.data[0], self.data[1]])
    }

    /// 数据区解释为 u32（小端）
    pub fn value_u32(&self) -> u32 {
        u32::from_le_bytes(self.data)
    }

    /// 数据区第一个字节（状态字等单字节寄存器）
    pub fn value_u8(&self) -> u8 {
        self.data[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_layout() {
        let msg = ControllerMessage::write(SDO_WRITE_4, 0x60FF, 0x00, [0; 4]);
        assert_eq!(msg.command(), 0x23);
        assert_eq!(msg.index(), 0x60FF);
        assert_eq!(msg.sub_index(), 0x00);
        assert_eq!(msg.as_bytes(), &[0x23, 0xFF, 0x60, 0x00, 0, 0, 0, 0]);
    }

    #[test]
    fn test_with_u32_little_endian() {
        let msg = ControllerMessage::write(SDO_WRITE_4, 0x60FF, 0x00, [0; 4]).with_u32(0x1122_3344);
        assert_eq!(&msg.as_bytes()[4..8], &[0x44, 0x33, 0x22, 0x11]);
    }

    #[test]
    fn test_with_u16_leaves_upper_bytes() {
        let msg =
            ControllerMessage::write(SDO_WRITE_2, 0x6071, 0x00, [0xAA, 0xBB, 0xCC, 0xDD]).with_u16(0x0102);
        assert_eq!(&msg.as_bytes()[4..8], &[0x02, 0x01, 0xCC, 0xDD]);
    }

    #[test]
    fn test_to_frame_uses_sdo_receive_id() {
        let node = NodeId::new(2).unwrap();
        let frame = ControllerMessage::read(0x6041, 0x00).to_frame(node);
        assert_eq!(frame.id, 0x602);
        assert_eq!(frame.len, 8);
        assert!(!frame.is_extended);
    }

    #[test]
    fn test_nmt_command_layout() {
        let node = NodeId::new(7).unwrap();
        let frame = nmt_command(NMT_START_REMOTE_NODE, node);
        assert_eq!(frame.id, 0x007);
        assert_eq!(frame.data_slice(), &[0x01, 7]);
    }

    #[test]
    fn test_sdo_response_roundtrip() {
        let node = NodeId::new(1).unwrap();
        let frame = PodFrame::new_standard(
            node.sdo_transmit_id(),
            &[SDO_READ_REPLY_4, 0x6C, 0x60, 0x00, 0x10, 0x27, 0x00, 0x00],
        );
        let response = SdoResponse::parse(&frame).unwrap();
        assert_eq!(response.index, 0x606C);
        assert_eq!(response.sub_index, 0x00);
        assert_eq!(response.value_i32(), 10_000);
    }

    #[test]
    fn test_sdo_response_too_short() {
        let frame = PodFrame::new_standard(0x581, &[0x43, 0x41]);
        assert!(SdoResponse::parse(&frame).is_err());
    }
}
