//! 测试辅助：脚本化假端口
//!
//! 模拟总线另一端的控制器：同步把响应帧回灌给认领它的消费者
//! （等效于 RX 线程路径）。读请求按脚本或默认值应答，写请求
//! 回写确认，NMT 命令回心跳。

use parking_lot::{Mutex, RwLock};
use pod_can::{CanError, CanPort, FrameConsumer, PodFrame};
use pod_protocol::{
    NMT_RECEIVE, SDO_READ, SDO_READ_REPLY_4, SDO_RECEIVE, SDO_TRANSMIT, SDO_WRITE_ACK,
    NMT_TRANSMIT,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

type Register = (u16, u8);

#[derive(Default)]
pub struct FakePort {
    consumers: RwLock<Vec<Arc<dyn FrameConsumer>>>,
    /// 发送记录（按序）
    pub sent: Mutex<Vec<PodFrame>>,
    /// 读请求的脚本应答队列
    scripted_reads: Mutex<HashMap<Register, VecDeque<[u8; 4]>>>,
    /// 永不应答的寄存器（模拟超时）
    muted: Mutex<HashSet<Register>>,
    /// 全部静默（模拟离线控制器）
    mute_all: AtomicBool,
}

impl FakePort {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 给某寄存器的下一次读请求排一个应答
    pub fn push_read(&self, register: Register, data: [u8; 4]) {
        self.scripted_reads.lock().entry(register).or_default().push_back(data);
    }

    /// 让某寄存器不再应答
    pub fn mute(&self, register: Register) {
        self.muted.lock().insert(register);
    }

    /// 整个控制器离线
    pub fn mute_all(&self) {
        self.mute_all.store(true, Ordering::SeqCst);
    }

    /// 发送帧里 SDO 请求的 (索引, 子索引) 序列
    pub fn sent_registers(&self) -> Vec<Register> {
        self.sent
            .lock()
            .iter()
            .filter(|f| (SDO_RECEIVE..SDO_RECEIVE + 0x80).contains(&f.id))
            .map(|f| (u16::from_le_bytes([f.data[1], f.data[2]]), f.data[3]))
            .collect()
    }

    fn dispatch(&self, frame: PodFrame) {
        for consumer in self.consumers.read().iter() {
            if consumer.accepts(frame.id, frame.is_extended) {
                consumer.consume(&frame);
                return;
            }
        }
    }

    fn response_for(&self, request: &PodFrame) -> Option<PodFrame> {
        if (SDO_RECEIVE..SDO_RECEIVE + 0x80).contains(&request.id) {
            let node = request.id - SDO_RECEIVE;
            let register: Register =
                (u16::from_le_bytes([request.data[1], request.data[2]]), request.data[3]);

            if self.muted.lock().contains(&register) {
                return None;
            }

            let mut data = [
                SDO_WRITE_ACK,
                request.data[1],
                request.data[2],
                request.data[3],
                0,
                0,
                0,
                0,
            ];
            if request.data[0] == SDO_READ {
                data[0] = SDO_READ_REPLY_4;
                let payload = self
                    .scripted_reads
                    .lock()
                    .get_mut(&register)
                    .and_then(|queue| queue.pop_front())
                    .unwrap_or([0; 4]);
                data[4..8].copy_from_slice(&payload);
            }
            Some(PodFrame::new_standard(SDO_TRANSMIT + node, &data))
        } else if (NMT_RECEIVE + 1..NMT_RECEIVE + 0x80).contains(&request.id) {
            // NMT 命令：回一个 operational 心跳
            let node = request.id - NMT_RECEIVE;
            Some(PodFrame::new_standard(NMT_TRANSMIT + node, &[0x05]))
        } else {
            None
        }
    }
}

impl CanPort for FakePort {
    fn send(&self, frame: PodFrame) -> Result<(), CanError> {
        self.sent.lock().push(frame);
        if self.mute_all.load(Ordering::SeqCst) {
            return Ok(());
        }
        if let Some(response) = self.response_for(&frame) {
            self.dispatch(response);
        }
        Ok(())
    }

    fn attach(&self, consumer: Arc<dyn FrameConsumer>) {
        self.consumers.write().push(consumer);
    }
}
