//! 控制器协议流程测试（脚本化假端口）

mod common;

use common::FakePort;
use pod_propulsion::{CanopenController, ControllerConfig, MotorController, PropulsionError};
use pod_protocol::{
    CONFIGURATION_MESSAGES, ControllerState, NodeId, REG_CONTROLWORD, REG_MODES_OF_OPERATION,
    REG_OVER_VOLTAGE_LIMIT, REG_STATUSWORD, REG_TARGET_VELOCITY, REG_WARNING_REGISTER,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 压缩时间的控制器配置：语义不变，只缩短等待
fn fast_config() -> ControllerConfig {
    ControllerConfig {
        sdo_timeout: Duration::from_millis(40),
        transition_attempts: 3,
        transition_backoff: Duration::from_millis(2),
        align_settle: Duration::from_millis(1),
    }
}

fn controller_on(port: &Arc<FakePort>) -> CanopenController {
    let node = NodeId::new(1).unwrap();
    let controller = CanopenController::new(node, port.clone(), fast_config());
    controller.register();
    controller
}

#[test]
fn test_enter_operational_happy_path() {
    let port = FakePort::new();
    let controller = controller_on(&port);

    // 初始状态来自一次状态查询：SwitchOnDisabled
    port.push_read(REG_STATUSWORD, [0x40, 0, 0, 0]);
    controller.check_state().unwrap();
    assert_eq!(controller.state(), ControllerState::SwitchOnDisabled);

    // 两次转换请求的状态查询依次观察到 0x21、0x27
    port.push_read(REG_STATUSWORD, [0x21, 0, 0, 0]);
    port.push_read(REG_STATUSWORD, [0x27, 0, 0, 0]);

    controller.enter_operational().unwrap();

    assert_eq!(controller.state(), ControllerState::OperationEnabled);
    assert!(!controller.is_failed());
}

#[test]
fn test_enter_operational_command_sequence() {
    let port = FakePort::new();
    let controller = controller_on(&port);

    port.push_read(REG_STATUSWORD, [0x21, 0, 0, 0]);
    port.push_read(REG_STATUSWORD, [0x27, 0, 0, 0]);
    controller.enter_operational().unwrap();

    let sent = port.sent.lock().clone();
    // (1) NMT operational：ID 0x000 + node，payload [0x01, node]
    assert_eq!(sent[0].id, 0x001);
    assert_eq!(sent[0].data_slice(), &[0x01, 1]);

    // (2) 速度模式 (3) 目标速度清零 (4) 上抱闸 (5)(6) 控制字转换
    let registers = port.sent_registers();
    assert_eq!(registers[0], REG_MODES_OF_OPERATION);
    assert_eq!(registers[1], REG_TARGET_VELOCITY);
    // 目标速度数据区注入了 0
    assert_eq!(&sent[2].data[4..8], &[0, 0, 0, 0]);
    assert_eq!(registers[2], pod_protocol::REG_BRAKE_CONTROL);
    assert_eq!(registers[3], REG_CONTROLWORD);
    assert_eq!(registers[4], REG_STATUSWORD);
    assert_eq!(registers[5], REG_CONTROLWORD);
    assert_eq!(registers[6], REG_STATUSWORD);
}

#[test]
fn test_transition_retries_exactly_three_times_then_fails() {
    let port = FakePort::new();
    let controller = controller_on(&port);

    // 状态查询永远回初始状态：转换永远观察不到目标
    let result = controller.enter_operational();

    assert!(matches!(
        result,
        Err(PropulsionError::TransitionTimeout { node: 1, attempts: 3, .. })
    ));
    assert!(controller.is_failed());

    // 恰好 3 次 shutdown 控制字发送（0x06），每次跟一个状态查询
    let controlword_sends = port
        .sent
        .lock()
        .iter()
        .filter(|f| {
            u16::from_le_bytes([f.data[1], f.data[2]]) == REG_CONTROLWORD.0 && f.data[4] == 0x06
        })
        .count();
    assert_eq!(controlword_sends, 3);

    let status_queries = port
        .sent_registers()
        .iter()
        .filter(|r| **r == REG_STATUSWORD)
        .count();
    assert_eq!(status_queries, 3);
}

#[test]
fn test_failure_flag_does_not_toggle_back() {
    let port = FakePort::new();
    let controller = controller_on(&port);

    let _ = controller.enter_operational();
    assert!(controller.is_failed());

    // 后续成功的操作不清除失效标志
    controller.check_state().unwrap();
    assert!(controller.is_failed());
}

#[test]
fn test_send_timeout_window() {
    let port = FakePort::new();
    port.mute_all();
    let controller = controller_on(&port);

    let start = Instant::now();
    let result = controller.check_state();
    let elapsed = start.elapsed();

    assert!(matches!(result, Err(PropulsionError::SendTimeout { node: 1, .. })));
    assert!(controller.is_failed());
    // 恰好在配置的超时窗口后报告：不提前，也不无限等
    assert!(elapsed >= Duration::from_millis(40));
    assert!(elapsed < Duration::from_millis(200));
}

#[test]
fn test_configure_sends_full_table_in_order() {
    let port = FakePort::new();
    let controller = controller_on(&port);

    controller.configure().unwrap();

    let registers = port.sent_registers();
    assert_eq!(registers.len(), CONFIGURATION_MESSAGES.len());
    for (sent, message) in registers.iter().zip(CONFIGURATION_MESSAGES.iter()) {
        assert_eq!(*sent, (message.index(), message.sub_index()));
    }
    assert!(!controller.is_failed());
}

#[test]
fn test_configure_aborts_early_on_timeout() {
    let port = FakePort::new();
    // 配置表第 5 条（过压阈值）不应答
    port.mute(REG_OVER_VOLTAGE_LIMIT);
    let controller = controller_on(&port);

    let result = controller.configure();

    assert!(matches!(result, Err(PropulsionError::SendTimeout { .. })));
    assert!(controller.is_failed());
    // 中止在失败条目上，后续条目不再发送
    assert_eq!(port.sent.lock().len(), 5);
}

#[test]
fn test_health_check_flags_nonzero_warning_register() {
    let port = FakePort::new();
    let controller = controller_on(&port);

    port.push_read(REG_WARNING_REGISTER, [0x04, 0, 0, 0]); // temperature warning bit

    controller.health_check().unwrap();
    assert!(controller.is_failed());
}

#[test]
fn test_health_check_clean_registers() {
    let port = FakePort::new();
    let controller = controller_on(&port);

    controller.health_check().unwrap();
    assert!(!controller.is_failed());
}

#[test]
fn test_enter_pre_operational_skips_when_ready() {
    let port = FakePort::new();
    let controller = controller_on(&port);

    port.push_read(REG_STATUSWORD, [0x21, 0, 0, 0]);
    controller.check_state().unwrap();
    assert_eq!(controller.state(), ControllerState::ReadyToSwitchOn);

    let before = port.sent.lock().len();
    controller.enter_pre_operational().unwrap();
    // 已在 ReadyToSwitchOn：不发 shutdown
    assert_eq!(port.sent.lock().len(), before);
}

#[test]
fn test_enter_pre_operational_sends_shutdown_otherwise() {
    let port = FakePort::new();
    let controller = controller_on(&port);

    controller.enter_pre_operational().unwrap();

    let registers = port.sent_registers();
    assert_eq!(registers, vec![REG_CONTROLWORD]);
    assert_eq!(port.sent.lock()[0].data[4], 0x06);
}

#[test]
fn test_auto_align_sequence() {
    let port = FakePort::new();
    let controller = controller_on(&port);

    controller.auto_align().unwrap();

    let sent = port.sent.lock().clone();
    assert_eq!(sent[0].id, 0x001); // NMT operational
    let registers = port.sent_registers();
    assert_eq!(registers, vec![REG_MODES_OF_OPERATION]);
    assert_eq!(sent[1].data[4], 0xFD); // auto-align mode
}

#[test]
fn test_telemetry_updates_visible_after_update_calls() {
    let port = FakePort::new();
    let controller = controller_on(&port);

    port.push_read(pod_protocol::REG_VELOCITY_ACTUAL, 1800i32.to_le_bytes());
    port.push_read(pod_protocol::REG_MOTOR_TEMPERATURE, 62i32.to_le_bytes());

    controller.update_actual_velocity().unwrap();
    controller.update_motor_temp().unwrap();

    let telemetry = controller.telemetry();
    assert_eq!(telemetry.velocity_rpm, 1800);
    assert_eq!(telemetry.motor_temp_c, 62);
}
