//! SocketCAN 适配器（仅 Linux）
//!
//! 薄封装：打开即启动，接收带超时，`split()` 在同一接口上
//! 打开第二个 socket 作为独立的 TX 半边。TX socket 关闭本地
//! 回环，避免总线消费到自己发出的请求帧。

use crate::{CanAdapter, CanDeviceError, CanDeviceErrorKind, CanError, PodFrame, RxAdapter,
            SplittableAdapter, TxAdapter};
use socketcan::{CanFrame, CanSocket, EmbeddedFrame, ExtendedId, Frame, Socket, SocketOptions,
                StandardId};
use std::time::Duration;
use tracing::trace;

/// 默认接收超时
///
/// RX 循环靠它周期性醒来检查运行标志。
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(2);

/// SocketCAN 适配器
pub struct SocketCanAdapter {
    socket: CanSocket,
    interface: String,
}

impl SocketCanAdapter {
    /// 打开接口（如 "can0"）
    pub fn open(interface: &str) -> Result<Self, CanError> {
        let socket = open_socket(interface)?;
        socket.set_read_timeout(DEFAULT_READ_TIMEOUT).map_err(CanError::Io)?;
        Ok(Self {
            socket,
            interface: interface.to_string(),
        })
    }
}

fn open_socket(interface: &str) -> Result<CanSocket, CanError> {
    CanSocket::open(interface).map_err(|e| {
        CanError::Device(CanDeviceError::new(
            CanDeviceErrorKind::NotFound,
            format!("Failed to open CAN interface {}: {}", interface, e),
        ))
    })
}

/// PodFrame -> socketcan::CanFrame
fn to_can_frame(frame: PodFrame) -> Result<CanFrame, CanError> {
    let can_frame = if frame.is_extended {
        ExtendedId::new(frame.id).and_then(|id| CanFrame::new(id, frame.data_slice()))
    } else {
        StandardId::new(frame.id as u16).and_then(|id| CanFrame::new(id, frame.data_slice()))
    };
    can_frame.ok_or_else(|| {
        CanError::Device(CanDeviceError::new(
            CanDeviceErrorKind::InvalidFrame,
            format!("Failed to create frame with ID 0x{:X}", frame.id),
        ))
    })
}

/// socketcan::CanFrame -> PodFrame
fn from_can_frame(can_frame: &CanFrame) -> PodFrame {
    let mut data = [0u8; 8];
    let payload = can_frame.data();
    let len = payload.len().min(8);
    data[..len].copy_from_slice(&payload[..len]);
    PodFrame {
        id: can_frame.raw_id(),
        data,
        len: len as u8,
        is_extended: can_frame.is_extended(),
    }
}

fn send_on(socket: &CanSocket, frame: PodFrame) -> Result<(), CanError> {
    let can_frame = to_can_frame(frame)?;
    socket.write_frame(&can_frame).map_err(CanError::Io)?;
    trace!("Sent CAN frame: ID=0x{:X}, len={}", frame.id, frame.len);
    Ok(())
}

fn receive_on(socket: &CanSocket) -> Result<PodFrame, CanError> {
    match socket.read_frame() {
        Ok(can_frame) => Ok(from_can_frame(&can_frame)),
        Err(e)
            if e.kind() == std::io::ErrorKind::WouldBlock
                || e.kind() == std::io::ErrorKind::TimedOut =>
        {
            Err(CanError::Timeout)
        },
        Err(e) => Err(CanError::Io(e)),
    }
}

impl CanAdapter for SocketCanAdapter {
    fn send(&mut self, frame: PodFrame) -> Result<(), CanError> {
        send_on(&self.socket, frame)
    }

    fn receive(&mut self) -> Result<PodFrame, CanError> {
        receive_on(&self.socket)
    }

    fn set_receive_timeout(&mut self, timeout: Duration) {
        let _ = self.socket.set_read_timeout(timeout);
    }
}

/// 分离后的 RX 半边
pub struct SocketCanRxAdapter {
    socket: CanSocket,
}

/// 分离后的 TX 半边
pub struct SocketCanTxAdapter {
    socket: CanSocket,
}

impl RxAdapter for SocketCanRxAdapter {
    fn receive(&mut self) -> Result<PodFrame, CanError> {
        receive_on(&self.socket)
    }
}

impl TxAdapter for SocketCanTxAdapter {
    fn send(&mut self, frame: PodFrame) -> Result<(), CanError> {
        send_on(&self.socket, frame)
    }
}

impl SplittableAdapter for SocketCanAdapter {
    type RxAdapter = SocketCanRxAdapter;
    type TxAdapter = SocketCanTxAdapter;

    /// 分离为独立的 RX/TX socket
    ///
    /// TX 半边是同一接口上新开的 socket，并关闭本地回环：
    /// 否则 RX socket 会收到我们自己发出的 SDO 请求
    /// （请求 ID 也在认领的基址集合里）。
    fn split(self) -> Result<(Self::RxAdapter, Self::TxAdapter), CanError> {
        let tx_socket = open_socket(&self.interface)?;
        tx_socket.set_loopback(false).map_err(CanError::Io)?;
        Ok((
            SocketCanRxAdapter {
                socket: self.socket,
            },
            SocketCanTxAdapter {
                socket: tx_socket,
            },
        ))
    }
}
