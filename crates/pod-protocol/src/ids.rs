//! CAN ID 基址常量定义
//!
//! 每类协议消息占用一个功能码基址，节点 N 的具体 ID 为 `base + N`。
//! 节点号为 1..=127 的小正整数，每个物理控制器唯一。

use crate::ProtocolError;

/// NMT 命令（主站 → 控制器），广播基址
pub const NMT_RECEIVE: u32 = 0x000;
/// 紧急帧（控制器 → 主站）
pub const EMERGENCY_TRANSMIT: u32 = 0x080;
/// SDO 响应（控制器 → 主站）
pub const SDO_TRANSMIT: u32 = 0x580;
/// SDO 请求（主站 → 控制器）
pub const SDO_RECEIVE: u32 = 0x600;
/// NMT 心跳/启动帧（控制器 → 主站）
pub const NMT_TRANSMIT: u32 = 0x700;

// PDO 基址：当前协议不使用，保留给未来的过程数据映射
pub const PDO1_TRANSMIT: u32 = 0x180;
pub const PDO1_RECEIVE: u32 = 0x200;
pub const PDO2_TRANSMIT: u32 = 0x280;
pub const PDO2_RECEIVE: u32 = 0x300;

/// 注册接收时需要认领的全部基址
///
/// 控制器的收发器会对每个基址认领 `base + node` 的入站帧。
pub const REGISTERED_BASES: [u32; 5] = [
    NMT_RECEIVE,
    EMERGENCY_TRANSMIT,
    SDO_TRANSMIT,
    SDO_RECEIVE,
    NMT_TRANSMIT,
];

/// 经过校验的控制器节点号 (1..=127)
///
/// 构造后不可变，伴随控制器整个生命周期。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u8);

impl NodeId {
    /// 创建节点号，范围外的值返回错误
    pub fn new(raw: u8) -> Result<Self, ProtocolError> {
        if raw == 0 || raw > 127 {
            return Err(ProtocolError::InvalidNodeId(raw));
        }
        Ok(Self(raw))
    }

    /// 原始节点号
    pub fn raw(&self) -> u8 {
        self.0
    }

    /// 节点的 SDO 请求 ID
    pub fn sdo_receive_id(&self) -> u32 {
        SDO_RECEIVE + self.0 as u32
    }

    /// 节点的 SDO 响应 ID
    pub fn sdo_transmit_id(&self) -> u32 {
        SDO_TRANSMIT + self.0 as u32
    }

    /// 节点的紧急帧 ID
    pub fn emergency_id(&self) -> u32 {
        EMERGENCY_TRANSMIT + self.0 as u32
    }

    /// 节点的 NMT 命令 ID
    pub fn nmt_receive_id(&self) -> u32 {
        NMT_RECEIVE + self.0 as u32
    }

    /// 节点的心跳帧 ID
    pub fn nmt_transmit_id(&self) -> u32 {
        NMT_TRANSMIT + self.0 as u32
    }

    /// 判断某个入站 ID 是否属于此节点
    ///
    /// 扩展帧不属于本协议，一律不认领。
    pub fn claims(&self, id: u32, is_extended: bool) -> bool {
        if is_extended {
            return false;
        }
        REGISTERED_BASES.iter().any(|base| base + self.0 as u32 == id)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node {}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_range() {
        assert!(NodeId::new(0).is_err());
        assert!(NodeId::new(1).is_ok());
        assert!(NodeId::new(127).is_ok());
        assert!(NodeId::new(128).is_err());
    }

    #[test]
    fn test_computed_ids() {
        let node = NodeId::new(3).unwrap();
        assert_eq!(node.sdo_receive_id(), 0x603);
        assert_eq!(node.sdo_transmit_id(), 0x583);
        assert_eq!(node.emergency_id(), 0x083);
        assert_eq!(node.nmt_transmit_id(), 0x703);
    }

    #[test]
    fn test_claims_all_bases() {
        let node = NodeId::new(5).unwrap();
        assert!(node.claims(0x605, false));
        assert!(node.claims(0x585, false));
        assert!(node.claims(0x085, false));
        assert!(node.claims(0x005, false));
        assert!(node.claims(0x705, false));
        // 其他节点的帧不认领
        assert!(!node.claims(0x586, false));
        // 扩展帧不认领
        assert!(!node.claims(0x585, true));
    }
}
