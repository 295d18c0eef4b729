//! # propulsiond
//!
//! 推进模块进程：装配 CAN 总线、电机控制器和推进主循环。
//! 吊舱状态与电池数据来自共享仓库（此进程内用 `MemoryStore`
//! 代位；生产部署由仓库适配层替换）。

use anyhow::Result;
use clap::Parser;
use pod_propulsion::{MemoryStore, MotorController, Runner, SimController, StateProcessor};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

mod config;
use config::AppConfig;

/// propulsiond - 推进模块守护进程
#[derive(Parser, Debug)]
#[command(name = "propulsiond")]
#[command(about = "Pod propulsion module daemon", long_about = None)]
#[command(version)]
struct Cli {
    /// CAN 接口名
    #[arg(long, default_value = "can0")]
    interface: String,

    /// 电机控制器节点号（逗号分隔）
    #[arg(long, value_delimiter = ',', default_values_t = vec![1u8, 2, 3, 4])]
    nodes: Vec<u8>,

    /// 用进程内模拟电机运行（无硬件）
    #[arg(long)]
    sim: bool,

    /// TOML 配置文件（给出时覆盖其余命令行参数）
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("propulsiond=info".parse()?)
                .add_directive("pod_propulsion=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = match cli.config {
        Some(path) => AppConfig::load(&path)?,
        None => {
            let config = AppConfig {
                interface: cli.interface,
                nodes: cli.nodes,
                sim: cli.sim,
            };
            config.validate()?;
            config
        },
    };

    // Ctrl-C 置停机标志，循环自行收尾
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_handler = shutdown.clone();
    ctrlc::set_handler(move || {
        info!("shutdown requested");
        shutdown_handler.store(true, Ordering::Release);
    })?;

    let store = Arc::new(MemoryStore::new());
    let controllers = build_controllers(&config)?;
    info!(
        "starting propulsion with {} controller(s) ({})",
        controllers.len(),
        if config.sim { "simulated" } else { config.interface.as_str() }
    );

    let processor = StateProcessor::new(controllers, store.clone());
    Runner::new(processor, store, shutdown).run();
    Ok(())
}

fn build_controllers(config: &AppConfig) -> Result<Vec<Box<dyn MotorController>>> {
    if config.sim {
        return Ok(config
            .nodes
            .iter()
            .map(|&node| Box::new(SimController::new(node)) as Box<dyn MotorController>)
            .collect());
    }

    #[cfg(target_os = "linux")]
    {
        use pod_can::{Bus, CanPort, SocketCanAdapter};
        use pod_propulsion::{CanopenController, ControllerConfig};
        use pod_protocol::NodeId;

        let adapter = SocketCanAdapter::open(&config.interface)?;
        let bus = Bus::start(adapter)?;
        let port: Arc<dyn CanPort> = Arc::new(bus);

        let mut controllers: Vec<Box<dyn MotorController>> = Vec::new();
        for &raw in config.nodes.iter() {
            let node = NodeId::new(raw)?;
            let controller =
                CanopenController::new(node, port.clone(), ControllerConfig::default());
            controllers.push(Box::new(controller));
        }
        Ok(controllers)
    }

    #[cfg(not(target_os = "linux"))]
    {
        anyhow::bail!("hardware CAN requires Linux (SocketCAN); use --sim on this platform")
    }
}
