//! 单个边界分段.

use num::ToPrimitive;

use super::{ring_span, UpdateError};
use crate::SegmentId;

/// 环上的一个半开弧段 `[start, end)`.
///
/// `total` 是分段所属环的总长; 长度按回绕算术推导.
/// 相邻关系 (`next`/`prev`) 不存储在分段内, 由
/// [`SegmentRing`](super::SegmentRing) 的 arena 索引管理,
/// 避免对象引用成环.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BorderSegment {
    id: SegmentId,
    start: usize,
    end: usize,
    total: usize,
    /// 锁定的分段拒绝一切端点更新 (交互编辑用).
    locked: bool,
}

impl BorderSegment {
    /// 构造分段.
    ///
    /// # Panics
    ///
    /// - `total` 为 0, 或端点不在 `[0, total)` 内;
    /// - `start == end`: 半开表示下该弧要么为空要么覆盖整环, 均不允许
    ///   (环至少由两个分段铺满).
    pub fn new(id: SegmentId, start: usize, end: usize, total: usize) -> Self {
        assert_ne!(total, 0, "环总长至少为 1");
        assert!(
            start < total && end < total,
            "分段端点 ({start}, {end}) 必须位于 [0, {total})"
        );
        assert_ne!(start, end, "分段不能为空, 也不能覆盖整个环");
        Self {
            id,
            start,
            end,
            total,
            locked: false,
        }
    }

    /// 稳定标识符.
    #[inline]
    pub fn id(&self) -> SegmentId {
        self.id
    }

    /// 起点 (含).
    #[inline]
    pub fn start(&self) -> usize {
        self.start
    }

    /// 终点 (不含). 恒等于环序下一个分段的起点.
    #[inline]
    pub fn end(&self) -> usize {
        self.end
    }

    /// 所属环的总长.
    #[inline]
    pub fn total(&self) -> usize {
        self.total
    }

    /// 分段长度 (回绕算术).
    #[inline]
    pub fn len(&self) -> usize {
        ring_span(self.start, self.end, self.total)
    }

    /// 分段永远非空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// 是否被锁定.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// 设置锁定状态. 锁定的分段在环更新协议中一律得到 `Ok(false)`.
    #[inline]
    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    /// 分段是否跨越环缝 (从起点前向走到终点时经过索引 0).
    #[inline]
    pub fn wraps(&self) -> bool {
        self.end < self.start
    }

    /// 判断环位置 `index` 是否落在本分段内 (半开).
    pub fn contains(&self, index: usize) -> bool {
        if index >= self.total {
            return false;
        }
        if self.end < self.start {
            index >= self.start || index < self.end
        } else {
            index >= self.start && index < self.end
        }
    }

    /// 分段中点的环位置.
    #[inline]
    pub fn midpoint(&self) -> usize {
        (self.start + self.len() / 2) % self.total
    }

    /// 分段内分数位置 `d` (`0..=1`) 对应的环位置.
    pub fn index_of_fraction(&self, d: f64) -> usize {
        assert!((0.0..=1.0).contains(&d), "比例必须位于 [0, 1]");
        (self.start + (self.len() as f64 * d).round() as usize) % self.total
    }

    /// 环位置 `index` 相对分段起点的比例. `index` 不在分段内时 panic.
    pub fn fraction_of_index(&self, index: usize) -> f64 {
        assert!(self.contains(index), "分段不包含索引 {index}");
        ring_span(self.start, index, self.total) as f64 / self.len() as f64
    }

    /// 按前向顺序迭代分段覆盖的环位置.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        let (start, total) = (self.start, self.total);
        (0..self.len()).map(move |k| (start + k) % total)
    }

    /// 校验一个待更新端点并换算为环位置.
    pub(super) fn check_bound(
        value: i64,
        total: usize,
        is_start: bool,
    ) -> Result<usize, UpdateError> {
        match value.to_usize() {
            Some(v) if v < total => Ok(v),
            _ if is_start => Err(UpdateError::StartOutOfRange(value)),
            _ => Err(UpdateError::EndOutOfRange(value)),
        }
    }

    /// 独立 (未链入环的) 端点更新.
    ///
    /// 只检查端点范围与翻转: 新端点必须落在分段当前覆盖的弧上,
    /// 且新起点在前向序中严格先于新终点. 未链入环的分段没有邻居
    /// 可以让出空间, 因此只能向内收缩; 增长须经
    /// [`SegmentRing::update`](super::SegmentRing::update) 协调.
    ///
    /// 一个位于 `[0, total)` 内但会让终点先于起点的更新是翻转错误,
    /// 而不是 `Ok(false)`.
    pub fn update(&mut self, new_start: i64, new_end: i64) -> Result<bool, UpdateError> {
        let s = Self::check_bound(new_start, self.total, true)?;
        let e = Self::check_bound(new_end, self.total, false)?;

        if self.locked {
            return Ok(false);
        }
        if s == self.start && e == self.end {
            return Ok(true);
        }

        // 起点可落在 [start, end), 终点可落在 (start, end]; 两者在弧内的
        // 前向偏移必须保持 start < end 的次序.
        let s_off = ring_span(self.start, s, self.total);
        let e_off = if e == self.end {
            self.len()
        } else {
            ring_span(self.start, e, self.total)
        };
        let inverted = !self.contains(s)
            || !(self.contains(e) || e == self.end)
            || e == self.start
            || s_off >= e_off;
        if inverted {
            return Err(UpdateError::Inverted {
                start: new_start,
                end: new_end,
            });
        }

        self.start = s;
        self.end = e;
        Ok(true)
    }

    /// 仅供分段环在完成全部校验后写入新端点.
    pub(super) fn commit_span(&mut self, start: usize, end: usize) {
        debug_assert!(start < self.total && end < self.total && start != end);
        self.start = start;
        self.end = end;
    }
}
