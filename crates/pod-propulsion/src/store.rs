//! 共享数据仓库的注入接口与进程内实现
//!
//! 真正的共享仓库是外部协作者；推进侧只依赖这里的
//! [`PodStore`] 注入接口（copy, don't share：每个调节步读一次
//! 快照）。[`MemoryStore`] 是测试与 `--sim` 运行用的进程内实现。

use arc_swap::ArcSwap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

/// 吊舱顶层状态（由外部状态机写入）
///
/// 仓库里的未知编码解码为 `Invalid`，状态处理器对它走
/// 失效保护默认分支。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PodState {
    Idle = 0,
    Calibrating = 1,
    Ready = 2,
    Accelerating = 3,
    NominalBraking = 4,
    EmergencyBraking = 5,
    FailureStopped = 6,
    Finished = 7,
    Invalid = 255,
}

impl PodState {
    /// 从仓库编码解码，未知值 → `Invalid`
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Calibrating,
            2 => Self::Ready,
            3 => Self::Accelerating,
            4 => Self::NominalBraking,
            5 => Self::EmergencyBraking,
            6 => Self::FailureStopped,
            7 => Self::Finished,
            _ => Self::Invalid,
        }
    }
}

/// 推进模块对外上报的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ModuleStatus {
    Start = 0,
    Init = 1,
    Ready = 2,
    CriticalFailure = 3,
}

impl ModuleStatus {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Start,
            1 => Self::Init,
            2 => Self::Ready,
            _ => Self::CriticalFailure,
        }
    }
}

/// 共享数据仓库的推进侧依赖面
pub trait PodStore: Send + Sync {
    /// 吊舱顶层状态
    fn pod_state(&self) -> PodState;

    /// 吊舱当前速度 (m/s)，来自导航
    fn pod_velocity(&self) -> f64;

    /// 全部高压电池包的最大电流读数 (A)
    fn battery_max_current(&self) -> i32;

    /// 上报模块状态
    fn set_module_status(&self, status: ModuleStatus);

    /// 当前模块状态
    fn module_status(&self) -> ModuleStatus;

    /// 加速期间发布每电机转速快照
    fn set_motor_rpms(&self, rpms: &[i32]);

    /// 最近一次转速快照
    fn motor_rpms(&self) -> Vec<i32>;
}

/// 进程内仓库实现
///
/// 标量走原子，数组走 `ArcSwap` 快照。
pub struct MemoryStore {
    pod_state: AtomicU8,
    pod_velocity_bits: AtomicU64,
    battery_currents: ArcSwap<Vec<i32>>,
    module_status: AtomicU8,
    motor_rpms: ArcSwap<Vec<i32>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            pod_state: AtomicU8::new(PodState::Idle as u8),
            pod_velocity_bits: AtomicU64::new(0f64.to_bits()),
            battery_currents: ArcSwap::from_pointee(Vec::new()),
            module_status: AtomicU8::new(ModuleStatus::Start as u8),
            motor_rpms: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// 写入吊舱状态（测试 / 模拟运行时由外部驱动）
    pub fn set_pod_state(&self, state: PodState) {
        self.pod_state.store(state as u8, Ordering::Release);
    }

    /// 写入吊舱状态的原始编码（模拟仓库里的坏值）
    pub fn set_pod_state_raw(&self, raw: u8) {
        self.pod_state.store(raw, Ordering::Release);
    }

    pub fn set_pod_velocity(&self, velocity: f64) {
        self.pod_velocity_bits.store(velocity.to_bits(), Ordering::Release);
    }

    pub fn set_battery_currents(&self, currents: &[i32]) {
        self.battery_currents.store(Arc::new(currents.to_vec()));
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PodStore for MemoryStore {
    fn pod_state(&self) -> PodState {
        PodState::from_u8(self.pod_state.load(Ordering::Acquire))
    }

    fn pod_velocity(&self) -> f64 {
        f64::from_bits(self.pod_velocity_bits.load(Ordering::Acquire))
    }

    fn battery_max_current(&self) -> i32 {
        self.battery_currents.load().iter().copied().max().unwrap_or(0)
    }

    fn set_module_status(&self, status: ModuleStatus) {
        self.module_status.store(status as u8, Ordering::Release);
    }

    fn module_status(&self) -> ModuleStatus {
        ModuleStatus::from_u8(self.module_status.load(Ordering::Acquire))
    }

    fn set_motor_rpms(&self, rpms: &[i32]) {
        self.motor_rpms.store(Arc::new(rpms.to_vec()));
    }

    fn motor_rpms(&self) -> Vec<i32> {
        self.motor_rpms.load().as_ref().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pod_state_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.pod_state(), PodState::Idle);

        store.set_pod_state(PodState::Accelerating);
        assert_eq!(store.pod_state(), PodState::Accelerating);
    }

    #[test]
    fn test_unknown_pod_state_decodes_invalid() {
        let store = MemoryStore::new();
        store.set_pod_state_raw(42);
        assert_eq!(store.pod_state(), PodState::Invalid);
    }

    #[test]
    fn test_battery_max_current_over_packs() {
        let store = MemoryStore::new();
        assert_eq!(store.battery_max_current(), 0);

        store.set_battery_currents(&[120, 340, 200]);
        assert_eq!(store.battery_max_current(), 340);
    }

    #[test]
    fn test_velocity_roundtrip() {
        let store = MemoryStore::new();
        store.set_pod_velocity(42.5);
        assert_eq!(store.pod_velocity(), 42.5);
    }

    #[test]
    fn test_module_status_and_rpms() {
        let store = MemoryStore::new();
        assert_eq!(store.module_status(), ModuleStatus::Start);

        store.set_module_status(ModuleStatus::Ready);
        assert_eq!(store.module_status(), ModuleStatus::Ready);

        store.set_motor_rpms(&[100, 200]);
        assert_eq!(store.motor_rpms(), vec![100, 200]);
    }
}
