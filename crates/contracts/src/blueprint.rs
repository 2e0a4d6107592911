//! TrackerBlueprint - Config Loader 输出
//!
//! 描述完整的追踪配置：活动类型、过滤阈值、信号监测、采集背压、渲染器路由与持久化。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

use crate::{ActivityKind, FilterConfig, MotionConfig, SignalConfig, TrackerConfig};

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的追踪配置蓝图
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct TrackerBlueprint {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 会话设置
    #[serde(default)]
    #[validate(nested)]
    pub tracker: TrackerSection,

    /// 位置过滤阈值
    #[serde(default)]
    #[validate(nested)]
    pub filter: FilterConfig,

    /// 速度估计
    #[serde(default)]
    #[validate(nested)]
    pub motion: MotionConfig,

    /// 信号监测
    #[serde(default)]
    #[validate(nested)]
    pub signal: SignalConfig,

    /// 采集通道与背压
    #[serde(default)]
    #[validate(nested)]
    pub ingestion: IngestionConfig,

    /// 地图渲染器列表
    #[serde(default)]
    #[validate(nested)]
    pub renderers: Vec<RendererConfig>,

    /// 活动摘要持久化 (可选)
    #[serde(default)]
    pub store: Option<StoreConfig>,
}

/// 会话设置：活动类型、体重、显示刷新
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TrackerSection {
    /// 活动类型
    #[serde(default)]
    pub activity_kind: ActivityKind,

    /// 体重 (kg)，用于卡路里估计
    #[serde(default = "default_body_mass")]
    #[validate(range(min = 20.0, max = 400.0))]
    pub body_mass_kg: f64,

    /// 墙钟显示刷新周期 (毫秒)
    #[serde(default = "default_display_tick")]
    #[validate(range(min = 50, max = 60000))]
    pub display_tick_ms: u64,
}

impl Default for TrackerSection {
    fn default() -> Self {
        Self {
            activity_kind: ActivityKind::default(),
            body_mass_kg: default_body_mass(),
            display_tick_ms: default_display_tick(),
        }
    }
}

fn default_body_mass() -> f64 {
    70.0
}

fn default_display_tick() -> u64 {
    1000
}

/// 采集配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IngestionConfig {
    /// 采集通道容量
    #[serde(default = "default_channel_capacity")]
    #[validate(range(min = 1, max = 1_000_000))]
    pub channel_capacity: usize,

    /// 丢包策略
    #[serde(default)]
    pub drop_policy: DropPolicy,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            drop_policy: DropPolicy::default(),
        }
    }
}

fn default_channel_capacity() -> usize {
    256
}

/// 丢包策略 (背压满时)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropPolicy {
    /// 丢弃最旧的包
    #[default]
    DropOldest,
    /// 丢弃最新的包
    DropNewest,
}

/// 渲染器配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RendererConfig {
    /// 渲染器名称
    #[validate(length(min = 1))]
    pub name: String,

    /// 渲染器类型
    pub renderer_type: RendererType,

    /// 队列容量
    #[serde(default = "default_queue_capacity")]
    #[validate(range(min = 1, max = 100_000))]
    pub queue_capacity: usize,

    /// 类型特定参数
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    64
}

/// 渲染器类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RendererType {
    /// 日志输出
    Log,
    /// GeoJSON 文件
    GeoJson,
    /// 网络输出 (UDP)
    Network,
}

/// 持久化配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// 存储类型
    pub store_type: StoreType,

    /// 类型特定参数
    #[serde(default)]
    pub params: HashMap<String, String>,
}

/// 存储类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    /// 每个活动一个 JSON 文件
    JsonFile,
    /// 仅日志
    Log,
}

impl TrackerBlueprint {
    /// Build the engine configuration from the blueprint sections
    pub fn to_tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            activity_kind: self.tracker.activity_kind,
            body_mass_kg: self.tracker.body_mass_kg,
            display_tick_ms: self.tracker.display_tick_ms,
            filter: self.filter.clone(),
            motion: self.motion.clone(),
            signal: self.signal.clone(),
        }
    }
}
