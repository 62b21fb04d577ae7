//! 边界分段与分段环.
//!
//! 一条闭合谱可以被划分为若干首尾相接的弧段 (segment): 它们无缝、
//! 无重叠地铺满整个环, 每个弧段携带稳定标识符以便跨谱追踪.
//! 本模块提供单个分段记录 ([`BorderSegment`]), arena 存储的分段环
//! ([`SegmentRing`]), 分段规则集 ([`SegmentRuleset`]) 与基于极值检测的
//! 自动分段器 ([`Segmenter`]).

mod border;
mod ring;
mod ruleset;
mod segmenter;

pub use border::BorderSegment;
pub use ring::{CommandError, RingCommand, RingError, SegmentRing};
pub use ruleset::{SegmentRuleset, Window, DEFAULT_RULESET};
pub use segmenter::{Segmenter, SegmenterError};

/// 分段端点更新错误.
///
/// 注意与 `Ok(false)` 的区别: 邻居可行性不足 (会把邻居挤到下限之下)
/// 是交互拖拽的预期结果, 以 `Ok(false)` 表达且不改变任何状态;
/// 这里的变体则都是调用方错误, 立即报出.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateError {
    /// 新起点不在 `[0, 环总长)` 内.
    StartOutOfRange(i64),

    /// 新终点不在 `[0, 环总长)` 内.
    EndOutOfRange(i64),

    /// 更新会使终点在前向遍历意义下先于起点 (分段翻转).
    Inverted {
        /// 被拒绝的起点.
        start: i64,
        /// 被拒绝的终点.
        end: i64,
    },
}

impl std::fmt::Display for UpdateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdateError::StartOutOfRange(v) => {
                write!(f, "Start index is outside the profile range: {v}")
            }
            UpdateError::EndOutOfRange(v) => {
                write!(f, "End index is outside the profile range: {v}")
            }
            UpdateError::Inverted { start, end } => {
                write!(f, "Segment would invert ({start} - {end})")
            }
        }
    }
}

impl std::error::Error for UpdateError {}

/// 半开弧 `[start, end)` 在总长 `total` 的环上的前向跨度.
/// `start == end` 时为 0.
#[inline]
pub(crate) fn ring_span(start: usize, end: usize, total: usize) -> usize {
    (end + total - start) % total
}
