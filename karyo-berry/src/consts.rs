//! 通用常量.
//!
//! 分段相关的默认值适用于常见的细胞核形状 schema;
//! 需要按 schema 调整时, 应通过 [`SegmentRuleset`](crate::segment::SegmentRuleset)
//! 配置, 而不是修改这里.

/// 默认最小分段长度 (采样数).
///
/// 提高该值会让分段拟合更稳健, 但会降低分辨率.
pub const DEFAULT_MIN_SEGMENT_LEN: usize = 5;

/// 默认平滑窗口 (两侧各取该数量的采样做滑动平均).
pub const DEFAULT_SMOOTH_WINDOW: usize = 2;

/// 默认极值检测窗口.
pub const DEFAULT_EXTREMUM_WINDOW: usize = 5;

/// 默认差分窗口.
pub const DEFAULT_DELTA_WINDOW: usize = 2;

/// 默认内角阈值 (单位: 度).
///
/// 180° 是平直边界的内角; 高于它的极大值对应凹陷, 低于它的极小值对应凸起.
pub const DEFAULT_ANGLE_THRESHOLD: f64 = 180.0;

/// 有效拐点的二阶差分幅度下限, 以全谱差分范围的比例表示.
pub const DEFAULT_MIN_DELTA_FRACTION: f64 = 0.02;

/// 共识平均使用的默认工作长度 (采样数).
pub const CONSENSUS_WORKING_LEN: usize = 200;

/// 偏差配色默认的 log2 饱和幅度 (1.0 即两倍伸缩处饱和).
pub const DEFAULT_DEVIATION_SATURATION: f64 = 1.0;
