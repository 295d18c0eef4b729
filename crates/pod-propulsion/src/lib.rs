//! # Pod Propulsion
//!
//! 推进/电机控制子系统：
//! - `transceiver`: 发送一帧并阻塞等待相关响应（带超时）
//! - `controller`: 每电机一个的协议引擎与状态机
//! - `regulator`: 吊舱速度 → 安全目标转速的闭环调节
//! - `processor`: 按吊舱状态驱动全部控制器并聚合失效
//! - `sim`: 进程内模拟电机（无硬件运行 / 测试）
//! - `store`: 共享数据仓库的注入接口与进程内实现
//! - `runner`: 推进主循环（薄驱动层）
//!
//! # 并发模型
//!
//! 两个活动触碰控制器状态：控制线程（发命令、读遥测缓存）和
//! 总线 RX 线程（解码响应、写缓存与状态）。遥测走 `ArcSwap`
//! 快照，状态走 `RwLock`，失效标志是单调的 `AtomicBool`。
//! 发送-等待是子系统里唯一有意的阻塞点。

pub mod controller;
pub mod error;
pub mod processor;
pub mod regulator;
pub mod runner;
pub mod sim;
pub mod store;
pub mod transceiver;

pub use controller::{CanopenController, ControllerConfig, MotorController, MotorTelemetry};
pub use error::PropulsionError;
pub use processor::StateProcessor;
pub use regulator::RpmRegulator;
pub use runner::Runner;
pub use sim::SimController;
pub use store::{MemoryStore, ModuleStatus, PodState, PodStore};
pub use transceiver::{ResponseHandler, Transceiver};
