//! 转速调节器
//!
//! 把吊舱当前速度与电机遥测换算成新的目标转速。每个固定控制
//! 节拍最多调用一次；除常量外没有内部可变状态（失效标志除外），
//! 各自持有独立电机的多个控制循环可以并发使用各自的实例。

use tracing::error;

/// 允许的最大电池电流 (A)
pub const MAX_CURRENT: i32 = 1500;
/// 允许的最大电机温度 (°C)
pub const MAX_TEMPERATURE: i32 = 150;

// 速度 → 最优转速标定多项式（实测拟合曲线，按不透明常量对待）
const POLY_A: f64 = 0.32047;
const POLY_B: f64 = 297.72578;
const POLY_C: f64 = 1024.30824;

/// 上调步长：最优转速的 10%
const STEP_UP_RATIO: f64 = 0.1;
/// 下调步长：最优转速的 5%
const STEP_DOWN_RATIO: f64 = 0.05;

/// 给定吊舱速度 (m/s) 的最优转速
pub fn optimal_rpm(velocity: f64) -> i32 {
    (POLY_A * velocity * velocity + POLY_B * velocity + POLY_C).round() as i32
}

/// 转速调节器
#[derive(Debug, Default)]
pub struct RpmRegulator {
    failed: bool,
}

impl RpmRegulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 调节器自身的失效标志（单调）
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// 计算新的目标转速
    ///
    /// 安全保持（不是错误）：电流或温度越限、或转速已在最优值
    /// 上时，原样返回 `actual_rpm`。否则向最优值步进：上调
    /// 10%、下调 5%（最优值的比例），结果不低于 0。
    ///
    /// 负输入是无效遥测，置位失效标志并保持当前转速。
    pub fn calculate(
        &mut self,
        velocity: f64,
        actual_rpm: i32,
        actual_current: i32,
        actual_temperature: i32,
    ) -> i32 {
        if velocity < 0.0 || actual_rpm < 0 || actual_current < 0 || actual_temperature < 0 {
            if !self.failed {
                error!(
                    "regulator received invalid inputs: v={}, rpm={}, current={}, temp={}",
                    velocity, actual_rpm, actual_current, actual_temperature
                );
            }
            self.failed = true;
            return actual_rpm.max(0);
        }

        let optimal = optimal_rpm(velocity);
        if actual_current > MAX_CURRENT
            || actual_temperature > MAX_TEMPERATURE
            || actual_rpm == optimal
        {
            return actual_rpm;
        }

        let next = if actual_rpm < optimal {
            actual_rpm + (optimal as f64 * STEP_UP_RATIO).round() as i32
        } else {
            actual_rpm - (optimal as f64 * STEP_DOWN_RATIO).round() as i32
        };
        next.max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optimal_rpm_at_standstill() {
        // v = 0 时只剩常数项
        assert_eq!(optimal_rpm(0.0), 1024);
    }

    #[test]
    fn test_optimal_rpm_at_50_mps() {
        // 0.32047*2500 + 297.72578*50 + 1024.30824 = 16711.77
        assert_eq!(optimal_rpm(50.0), 16712);
    }

    #[test]
    fn test_fixed_point_at_optimum() {
        let mut regulator = RpmRegulator::new();
        let optimal = optimal_rpm(20.0);
        assert_eq!(regulator.calculate(20.0, optimal, 100, 40), optimal);
        assert!(!regulator.is_failed());
    }

    #[test]
    fn test_over_current_holds_rpm() {
        let mut regulator = RpmRegulator::new();
        assert_eq!(regulator.calculate(50.0, 100, MAX_CURRENT + 1, 40), 100);
        assert!(!regulator.is_failed());
    }

    #[test]
    fn test_over_temperature_holds_rpm() {
        let mut regulator = RpmRegulator::new();
        assert_eq!(regulator.calculate(50.0, 100, 100, MAX_TEMPERATURE + 1), 100);
    }

    #[test]
    fn test_steps_up_towards_optimal() {
        let mut regulator = RpmRegulator::new();
        let optimal = optimal_rpm(10.0); // 4034
        let next = regulator.calculate(10.0, 1000, 100, 40);
        assert_eq!(next, 1000 + (optimal as f64 * 0.1).round() as i32);
    }

    #[test]
    fn test_steps_down_towards_optimal() {
        let mut regulator = RpmRegulator::new();
        let optimal = optimal_rpm(0.0); // 1024
        let next = regulator.calculate(0.0, 6000, 100, 40);
        assert_eq!(next, 6000 - (optimal as f64 * 0.05).round() as i32);
    }

    #[test]
    fn test_never_returns_negative() {
        let mut regulator = RpmRegulator::new();
        for rpm in [0, 1, 10, 1024, 1025, 5000, 100_000] {
            for v in [0.0, 1.0, 10.0, 80.0] {
                assert!(regulator.calculate(v, rpm, 100, 40) >= 0);
            }
        }
    }

    #[test]
    fn test_invalid_inputs_latch_failure() {
        let mut regulator = RpmRegulator::new();
        assert_eq!(regulator.calculate(-1.0, 500, 100, 40), 500);
        assert!(regulator.is_failed());
        // 后续有效输入也不清除
        regulator.calculate(10.0, 500, 100, 40);
        assert!(regulator.is_failed());
    }
}
