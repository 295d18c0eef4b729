//! 帧收发器：发送并阻塞等待相关响应
//!
//! 每个控制器一个收发器。`request` 发送一帧后阻塞调用方
//! （控制线程），直到 RX 路径处理完一个本节点的响应帧，或者
//! 固定超时（默认 70 ms）到期。等待建立在容量为 1 的 ack
//! 通道上，由 RX 路径在解码 **之后** 发信号，因此 `request`
//! 成功返回时相关响应已经处理完毕。
//!
//! 同一控制器同时只有一个在途请求（由阻塞调用本身保证）；
//! 收发器内部不做重试，重试策略在控制器层。

use crate::error::PropulsionError;
use crossbeam_channel::{Receiver, Sender, bounded};
use pod_can::{CanPort, FrameConsumer, PodFrame};
use pod_protocol::NodeId;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, trace};

/// 默认发送/响应超时
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_millis(70);

/// RX 路径解码回调
///
/// 在总线 RX 线程上被同步调用，必须保持短小且不阻塞。
pub trait ResponseHandler: Send + Sync {
    fn handle_response(&self, frame: &PodFrame);
}

struct TransceiverInner {
    node: NodeId,
    port: Arc<dyn CanPort>,
    handler: Arc<dyn ResponseHandler>,
    ack_tx: Sender<()>,
    ack_rx: Receiver<()>,
    timeout: Duration,
}

/// 帧收发器
///
/// 可廉价克隆（内部 `Arc` 共享）；克隆体注册到总线作为
/// 帧消费者，原件留在控制器里用于发送。
#[derive(Clone)]
pub struct Transceiver {
    inner: Arc<TransceiverInner>,
}

impl Transceiver {
    pub fn new(
        node: NodeId,
        port: Arc<dyn CanPort>,
        handler: Arc<dyn ResponseHandler>,
        timeout: Duration,
    ) -> Self {
        let (ack_tx, ack_rx) = bounded(1);
        Self {
            inner: Arc::new(TransceiverInner {
                node,
                port,
                handler,
                ack_tx,
                ack_rx,
                timeout,
            }),
        }
    }

    pub fn node(&self) -> NodeId {
        self.inner.node
    }

    /// 订阅本节点的全部入站帧（所有基址 + 节点号）
    pub fn register(&self) {
        self.inner.port.attach(Arc::new(self.clone()));
    }

    /// 发送一帧并等待相关响应
    ///
    /// 返回 `Ok` 表示超时窗口内处理了一个本节点的响应帧；
    /// 超时返回 `SendTimeout`。调用方负责把超时升级为
    /// `critical_failure`。
    pub fn request(&self, frame: PodFrame) -> Result<(), PropulsionError> {
        let inner = &self.inner;

        // 清掉迟到的旧响应，避免错误关联到本次请求
        while inner.ack_rx.try_recv().is_ok() {}

        if let Err(e) = inner.port.send(frame) {
            error!("{}: failed to send frame ID=0x{:X}: {}", inner.node, frame.id, e);
            return Err(PropulsionError::SendTimeout {
                node: inner.node.raw(),
                timeout: inner.timeout,
            });
        }

        inner
            .ack_rx
            .recv_timeout(inner.timeout)
            .map_err(|_| PropulsionError::SendTimeout {
                node: inner.node.raw(),
                timeout: inner.timeout,
            })
    }
}

impl FrameConsumer for Transceiver {
    fn accepts(&self, id: u32, is_extended: bool) -> bool {
        self.inner.node.claims(id, is_extended)
    }

    fn consume(&self, frame: &PodFrame) {
        trace!("{}: inbound frame ID=0x{:X}", self.inner.node, frame.id);
        // 先解码再发 ack，保证 request 返回时响应已生效
        self.inner.handler.handle_response(frame);
        let _ = self.inner.ack_tx.try_send(());
    }
}
