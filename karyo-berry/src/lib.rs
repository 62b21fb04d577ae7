#![warn(missing_docs)] // <= 合适时移除它.
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 核心库. 提供显微图像中细胞核边界角度谱 (closed profile)
//! 的结构化表示, 环形分段与群体共识平均算法.
//!
//! 该 crate 目前仅提供 `safe` 接口. 将来可能为部分高性能场景关键路径提供 `unsafe` 接口.
//!
//! # 注意
//!
//! 1. 像素级的细胞核检测/阈值分割不在本 crate 职责之内: 上游 (ImageJ 侧)
//!    负责提供封闭轮廓点序列与对应的内角谱, 本 crate 只消费这些数组.
//! 2. 在非期望情况下, 程序会直接 panic, 而不会导致内存错误. As what Rust promises.
//!
//! # 开发计划
//!
//! ### 闭合谱与布尔环 ✅
//!
//! 不可变的实值采样环, 索引统一按模回绕; 环形插值、平滑、差分、
//! 极值检测与最优旋转对齐.
//!
//! 实现位于 `karyo-berry/src/profile`.
//!
//! ### 边界分段与分段环 ✅
//!
//! 半开弧段记录 + arena 存储的分段环. 环上的一切修改都走
//! "先完整校验, 后一步提交" 协议, 失败的修改不留下任何部分状态.
//!
//! 实现位于 `karyo-berry/src/segment/{border, ring}.rs`.
//!
//! ### 基于极值的自动分段器 ✅
//!
//! 平滑 -> 阈值极值 -> 二阶差分过滤 -> 最弱者优先合并过近边界.
//! 合并的决胜规则是确定性的, 与迭代顺序无关.
//!
//! 实现位于 `karyo-berry/src/segment/segmenter.rs`.
//!
//! ### 分段规则集 ✅
//!
//! 分段长度下限、检测窗口等参数不再是散落各处的硬编码常量,
//! 统一收拢为按形状 schema 配置的 [`SegmentRuleset`](segment::SegmentRuleset).
//!
//! ### 群体聚合与共识平均 ✅
//!
//! 逐位置分位数聚合 ([`ProfileAggregate`]); 共享 schema 种群的
//! 共识分段谱构建与共识轮廓平均; 种群级阶段可并行 (`rayon` feature).
//!
//! 实现位于 `karyo-berry/src/{profile/aggregate.rs, consensus}`.
//!
//! ### 偏差网格 ✅
//!
//! 参考形状与主体形状之间的界标对应网格, 边长比 + log2 对称配色.
//!
//! 实现位于 `karyo-berry/src/mesh`.
//!
//! ### 完善代码文档 ⌛️
//!
//! 给每个 public API 提供文档, 并视情况给 private API 提供文档.

/// 二维图像质点坐标, 自然平面直角坐标系 `(x, y)`.
pub type Point2d = (f64, f64);

/// 分段的稳定标识符. 在重采样与共识平均过程中保持不变,
/// 用于跨谱追踪同一弧段.
pub type SegmentId = u32;

/// 界标标识符. 由调用方定义, 本 crate 只存储与等比缩放,
/// 从不解释其语义.
pub type LandmarkId = u32;

/// 闭合谱基础数据结构.
mod profile;

pub use profile::{AggregateError, FlagRing, Profile, ProfileAggregate};

pub mod consts;

pub mod segment;

mod segmented;

pub use segmented::{AnyProfile, LandmarkRecord, SegmentRecord, SegmentedProfile};

pub mod consensus;
pub mod mesh;
pub mod prelude;
