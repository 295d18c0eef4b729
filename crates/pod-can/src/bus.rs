//! 接收分发总线
//!
//! 持有 CAN 适配器的 TX 半边并运行后台 RX 线程，把每个入站帧
//! 交给认领其 ID 的那一个已注册消费者。

use crate::{CanError, PodFrame, RxAdapter, SplittableAdapter, TxAdapter};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use tracing::{error, trace};

/// 入站帧消费者回调契约
///
/// `accepts` 判断是否认领某个 ID；`consume` 在 **RX 线程**上被
/// 同步调用，必须保持短小且不阻塞。
pub trait FrameConsumer: Send + Sync {
    fn accepts(&self, id: u32, is_extended: bool) -> bool;
    fn consume(&self, frame: &PodFrame);
}

/// 控制路径对总线的依赖面
///
/// 抽象为注入接口而非全局单例，控制路径可以用假端口做单元测试。
pub trait CanPort: Send + Sync {
    /// 发送一帧
    fn send(&self, frame: PodFrame) -> Result<(), CanError>;

    /// 注册一个入站帧消费者
    fn attach(&self, consumer: Arc<dyn FrameConsumer>);
}

/// RX 线程与控制路径共享的总线状态
struct BusShared {
    consumers: RwLock<Vec<Arc<dyn FrameConsumer>>>,
    is_running: AtomicBool,
}

/// CAN 总线
///
/// `start` 分离适配器，TX 半边放在互斥锁后面供控制线程发送，
/// RX 半边移动进后台线程循环接收并分发。
pub struct Bus {
    tx: Mutex<Box<dyn TxAdapter + Send>>,
    shared: Arc<BusShared>,
    rx_thread: Option<JoinHandle<()>>,
}

impl Bus {
    /// 启动总线
    ///
    /// 适配器必须已配置接收超时（RX 循环靠它周期性检查运行标志）。
    pub fn start<A>(adapter: A) -> Result<Self, CanError>
    where
        A: SplittableAdapter,
        A::RxAdapter: Send + 'static,
        A::TxAdapter: Send + 'static,
    {
        let (rx, tx) = adapter.split()?;

        let shared = Arc::new(BusShared {
            consumers: RwLock::new(Vec::new()),
            is_running: AtomicBool::new(true),
        });

        let shared_clone = shared.clone();
        let rx_thread = std::thread::Builder::new()
            .name("pod-can-rx".to_string())
            .spawn(move || rx_loop(rx, shared_clone))
            .map_err(CanError::Io)?;

        Ok(Self {
            tx: Mutex::new(Box::new(tx)),
            shared,
            rx_thread: Some(rx_thread),
        })
    }

    /// RX 线程是否仍在运行
    pub fn is_running(&self) -> bool {
        self.shared.is_running.load(Ordering::Acquire)
    }
}

impl CanPort for Bus {
    fn send(&self, frame: PodFrame) -> Result<(), CanError> {
        if !self.is_running() {
            return Err(CanError::NotRunning);
        }
        self.tx.lock().send(frame)
    }

    fn attach(&self, consumer: Arc<dyn FrameConsumer>) {
        self.shared.consumers.write().push(consumer);
    }
}

impl Drop for Bus {
    fn drop(&mut self) {
        // Release: 让 RX 线程看到停止标志
        self.shared.is_running.store(false, Ordering::Release);
        if let Some(handle) = self.rx_thread.take() {
            if handle.join().is_err() {
                error!("CAN RX thread panicked during shutdown");
            }
        }
    }
}

/// RX 线程主循环
///
/// 超时是正常情况（用于周期性检查运行标志）；致命设备错误
/// 置停运行标志并退出。
fn rx_loop(mut rx: impl RxAdapter, shared: Arc<BusShared>) {
    loop {
        // Acquire: 看到 false 时必须能看到其他线程的清理写入
        if !shared.is_running.load(Ordering::Acquire) {
            trace!("RX thread: is_running flag is false, exiting");
            break;
        }

        let frame = match rx.receive() {
            Ok(frame) => frame,
            Err(CanError::Timeout) => continue,
            Err(e) => {
                error!("RX thread: CAN receive error: {}", e);
                let is_fatal = match &e {
                    CanError::Device(dev) => dev.is_fatal(),
                    CanError::BufferOverflow | CanError::BusOff => true,
                    _ => false,
                };
                if is_fatal {
                    error!("RX thread: fatal error, stopping bus");
                    shared.is_running.store(false, Ordering::Release);
                    break;
                }
                continue;
            },
        };

        dispatch(&frame, &shared);
    }

    trace!("RX thread: loop exited");
}

/// 把一帧交给认领它的那一个消费者
fn dispatch(frame: &PodFrame, shared: &BusShared) {
    let consumers = shared.consumers.read();
    for consumer in consumers.iter() {
        if consumer.accepts(frame.id, frame.is_extended) {
            consumer.consume(frame);
            return;
        }
    }
    trace!("Unclaimed frame ID=0x{:X}, dropping", frame.id);
}
