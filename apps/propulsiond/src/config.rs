//! 进程配置（TOML）

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::Path;

fn default_interface() -> String {
    "can0".to_string()
}

fn default_nodes() -> Vec<u8> {
    vec![1, 2, 3, 4]
}

/// 推进进程配置
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// CAN 接口名
    #[serde(default = "default_interface")]
    pub interface: String,
    /// 电机控制器节点号
    #[serde(default = "default_nodes")]
    pub nodes: Vec<u8>,
    /// 用进程内模拟电机运行
    #[serde(default)]
    pub sim: bool,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            bail!("at least one motor controller node id is required");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config: AppConfig =
            toml::from_str("interface = \"can1\"\nnodes = [1, 2]\nsim = true\n").unwrap();
        assert_eq!(config.interface, "can1");
        assert_eq!(config.nodes, vec![1, 2]);
        assert!(config.sim);
    }

    #[test]
    fn test_defaults_apply() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.interface, "can0");
        assert_eq!(config.nodes, vec![1, 2, 3, 4]);
        assert!(!config.sim);
    }

    #[test]
    fn test_empty_nodes_rejected() {
        let config: AppConfig = toml::from_str("nodes = []\n").unwrap();
        assert!(config.validate().is_err());
    }
}
