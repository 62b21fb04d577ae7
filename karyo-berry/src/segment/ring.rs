//! 分段环: arena + 显式 `next`/`prev` 索引.

use std::collections::BTreeSet;

use itertools::Itertools;

use super::{ring_span, BorderSegment, UpdateError};
use crate::SegmentId;

/// 分段环构建/校验错误.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RingError {
    /// 分段过少 (环至少需要两个分段).
    TooFewSegments(usize),

    /// 分段长度之和与环总长不一致.
    LengthMismatch {
        /// 期望的总长.
        expected: usize,
        /// 实际的长度之和.
        actual: usize,
    },

    /// 第 `index` 个分段的终点与下一个分段的起点不重合 (有缝隙或重叠).
    BrokenChain {
        /// 环序位置.
        index: usize,
    },

    /// 第 `index` 个分段声明的环总长与其它分段不一致.
    TotalMismatch {
        /// 环序位置.
        index: usize,
    },

    /// 存在短于下限的分段.
    TooShort {
        /// 分段标识符.
        id: SegmentId,
        /// 实际长度.
        len: usize,
        /// 下限.
        min: usize,
    },

    /// 分段标识符重复.
    DuplicateId(SegmentId),

    /// 环序相邻性不满足 (合并操作要求).
    NotAdjacent(SegmentId, SegmentId),

    /// 环中不存在该标识符.
    UnknownId(SegmentId),

    /// 分裂位置不在目标分段内部.
    BadSplitPosition {
        /// 目标分段.
        id: SegmentId,
        /// 被拒绝的环位置.
        at: usize,
    },

    /// 新总长放不下现有分段 (重采样操作).
    CannotRescale {
        /// 分段个数.
        segments: usize,
        /// 被拒绝的新总长.
        new_total: usize,
    },
}

/// 铺满 `[0, total)` 的分段环.
///
/// 分段存储在 arena (`Vec`) 中, 相邻关系通过显式的 `next`/`prev`
/// 索引表达, 避免对象引用成环, 也便于直接导出为朴素数据记录.
///
/// # 不变量
///
/// 1. 全部分段恰好铺满 `[0, total)`: 每个分段的 `end` 等于环序下一个
///    分段的 `start`, 链在访问完所有分段后闭合, 长度之和恰为 `total`;
/// 2. 每个分段的长度不低于 `min_len`;
/// 3. 环上的一切修改都在完整校验通过后一步提交; 被拒绝的修改不会留下
///    任何部分状态.
///
/// 同一个环的并发修改必须串行化; `&mut self` 的独占性在类型层面
/// 保证了这一点.
#[derive(Clone, Debug)]
pub struct SegmentRing {
    arena: Vec<BorderSegment>,
    next: Vec<usize>,
    prev: Vec<usize>,
    /// 环序首个分段的 arena 索引.
    head: usize,
    total: usize,
    min_len: usize,
}

impl SegmentRing {
    /// 由环序分段列表构建环. `min_len` 是分段长度下限.
    ///
    /// 列表必须满足环不变量 (见类型文档), 否则返回对应的 [`RingError`].
    pub fn new(segments: Vec<BorderSegment>, min_len: usize) -> Result<Self, RingError> {
        assert!(min_len >= 1, "最小分段长度至少为 1");
        Self::validate(&segments, min_len)?;
        let n = segments.len();
        let total = segments[0].total();
        Ok(Self {
            arena: segments,
            next: (0..n).map(|i| (i + 1) % n).collect(),
            prev: (0..n).map(|i| (i + n - 1) % n).collect(),
            head: 0,
            total,
            min_len,
        })
    }

    /// 校验环序分段列表的全部不变量.
    fn validate(segments: &[BorderSegment], min_len: usize) -> Result<(), RingError> {
        if segments.len() < 2 {
            return Err(RingError::TooFewSegments(segments.len()));
        }
        let total = segments[0].total();
        let mut sum = 0usize;
        let mut seen = BTreeSet::new();
        for (i, seg) in segments.iter().enumerate() {
            if seg.total() != total {
                return Err(RingError::TotalMismatch { index: i });
            }
            if seg.len() < min_len {
                return Err(RingError::TooShort {
                    id: seg.id(),
                    len: seg.len(),
                    min: min_len,
                });
            }
            if !seen.insert(seg.id()) {
                return Err(RingError::DuplicateId(seg.id()));
            }
            let next = &segments[(i + 1) % segments.len()];
            if seg.end() != next.start() {
                return Err(RingError::BrokenChain { index: i });
            }
            sum += seg.len();
        }
        if sum != total {
            return Err(RingError::LengthMismatch {
                expected: total,
                actual: sum,
            });
        }
        Ok(())
    }

    /// 环总长.
    #[inline]
    pub fn total(&self) -> usize {
        self.total
    }

    /// 分段长度下限.
    #[inline]
    pub fn min_len(&self) -> usize {
        self.min_len
    }

    /// 分段个数.
    #[inline]
    pub fn segment_count(&self) -> usize {
        self.arena.len()
    }

    /// 从环序首个分段开始, 沿 `next` 链访问每个分段.
    pub fn iter(&self) -> impl Iterator<Item = &BorderSegment> + '_ {
        let mut idx = self.head;
        let mut emitted = 0;
        std::iter::from_fn(move || {
            if emitted == self.arena.len() {
                return None;
            }
            let seg = &self.arena[idx];
            idx = self.next[idx];
            emitted += 1;
            Some(seg)
        })
    }

    /// 从包含环位置 `from` 的分段开始按环序访问每个分段.
    pub fn iter_from(&self, from: usize) -> impl Iterator<Item = &BorderSegment> + '_ {
        let mut idx = self.index_containing(from);
        let mut emitted = 0;
        std::iter::from_fn(move || {
            if emitted == self.arena.len() {
                return None;
            }
            let seg = &self.arena[idx];
            idx = self.next[idx];
            emitted += 1;
            Some(seg)
        })
    }

    /// 环序分段标识符.
    pub fn ids(&self) -> Vec<SegmentId> {
        self.iter().map(BorderSegment::id).collect()
    }

    /// 按标识符查找分段.
    pub fn get(&self, id: SegmentId) -> Option<&BorderSegment> {
        self.arena.iter().find(|s| s.id() == id)
    }

    /// 按标识符查找分段的 arena 下标.
    fn index_of(&self, id: SegmentId) -> Option<usize> {
        self.arena.iter().position(|s| s.id() == id)
    }

    /// 包含环位置 `index` 的分段的 arena 下标.
    fn index_containing(&self, index: usize) -> usize {
        let index = index % self.total;
        self.arena
            .iter()
            .position(|s| s.contains(index))
            .expect("分段环铺满整环, 任何位置必有归属")
    }

    /// 包含环位置 `index` 的分段 (索引取模).
    pub fn segment_containing(&self, index: usize) -> &BorderSegment {
        &self.arena[self.index_containing(index)]
    }

    /// 环序下一个分段.
    pub fn next_of(&self, id: SegmentId) -> Option<&BorderSegment> {
        self.index_of(id).map(|i| &self.arena[self.next[i]])
    }

    /// 环序上一个分段.
    pub fn prev_of(&self, id: SegmentId) -> Option<&BorderSegment> {
        self.index_of(id).map(|i| &self.arena[self.prev[i]])
    }

    /// 设置分段锁定状态. 标识符不存在时 panic.
    pub fn set_locked(&mut self, id: SegmentId, locked: bool) {
        let i = self
            .index_of(id)
            .unwrap_or_else(|| panic!("环中不存在分段 {id}"));
        self.arena[i].set_locked(locked);
    }

    /// 按 "先完整校验, 后一步提交" 协议更新分段 `id` 的端点.
    ///
    /// 返回值约定:
    /// - 端点不在 `[0, total)` 内 -> `Err` (指明是哪个端点与其取值);
    /// - 分段被锁定, 或更新会把某个邻居挤到长度下限之下 -> `Ok(false)`,
    ///   状态不变 (交互拖拽把它当作 "停在最后一个合法位置");
    /// - 新端点落在可达弧之外 (终点会先于起点) -> `Err` (翻转);
    /// - 其余情况提交本分段与两侧共享边界, 返回 `Ok(true)`.
    ///
    /// 标识符不存在时 panic (调用方错误).
    pub fn update(
        &mut self,
        id: SegmentId,
        new_start: i64,
        new_end: i64,
    ) -> Result<bool, UpdateError> {
        let i = self
            .index_of(id)
            .unwrap_or_else(|| panic!("环中不存在分段 {id}"));

        // 1. 端点范围.
        let s = BorderSegment::check_bound(new_start, self.total, true)?;
        let e = BorderSegment::check_bound(new_end, self.total, false)?;

        if self.arena[i].is_locked() {
            return Ok(false);
        }
        if s == self.arena[i].start() && e == self.arena[i].end() {
            return Ok(true);
        }

        let pi = self.prev[i];
        let ni = self.next[i];

        // 2. 邻居可行性: 前邻保留 [prev.start, s), 后邻保留 [e, next.end),
        //    自身变为 [s, e); 任何一段跌破下限都是预期中的 no-op.
        let prev_len = ring_span(self.arena[pi].start(), s, self.total);
        let next_len = ring_span(e, self.arena[ni].end(), self.total);
        let self_len = ring_span(s, e, self.total);
        if prev_len < self.min_len || next_len < self.min_len || self_len < self.min_len {
            return Ok(false);
        }

        // 3. 翻转: 新起点必须落在前邻与本分段的联合弧上, 新终点必须落在
        //    本分段与后邻的联合弧上; 两者同落本分段时必须保持前向次序.
        let seg = &self.arena[i];
        let start_ok = self.arena[pi].contains(s) || seg.contains(s);
        let end_ok = seg.contains(e) || self.arena[ni].contains(e);
        let crossed = seg.contains(s)
            && seg.contains(e)
            && ring_span(seg.start(), s, self.total) >= ring_span(seg.start(), e, self.total);
        if !start_ok || !end_ok || crossed {
            return Err(UpdateError::Inverted {
                start: new_start,
                end: new_end,
            });
        }

        // 提交: 本分段与两侧共享边界一步写入.
        self.arena[i].commit_span(s, e);
        let prev_start = self.arena[pi].start();
        self.arena[pi].commit_span(prev_start, s);
        let next_end = self.arena[ni].end();
        self.arena[ni].commit_span(e, next_end);

        debug_assert!(self.check_invariants().is_ok());
        Ok(true)
    }

    /// 将环序相邻的 `first`、`second` 合并为一个标识符为 `new_id` 的分段.
    ///
    /// `first` 的环序后继必须是 `second`; `new_id` 不得与幸存分段冲突.
    /// 整个操作先在副本上校验, 通过后才替换自身.
    pub fn merge(
        &mut self,
        first: SegmentId,
        second: SegmentId,
        new_id: SegmentId,
    ) -> Result<(), RingError> {
        let fi = self.index_of(first).ok_or(RingError::UnknownId(first))?;
        if self.arena[self.next[fi]].id() != second {
            return Err(RingError::NotAdjacent(first, second));
        }

        let merged: Vec<BorderSegment> = self
            .iter()
            .filter(|s| s.id() != second)
            .map(|s| {
                if s.id() == first {
                    let end = self.get(second).unwrap().end();
                    BorderSegment::new(new_id, s.start(), end, self.total)
                } else {
                    s.clone()
                }
            })
            .collect();

        *self = Self::new(merged, self.min_len)?;
        Ok(())
    }

    /// 在环位置 `at` 把分段 `id` 一分为二: `[start, at)` 得到 `left_id`,
    /// `[at, end)` 得到 `right_id`.
    ///
    /// 两半都必须不短于下限; 新标识符不得与幸存分段冲突.
    pub fn split(
        &mut self,
        id: SegmentId,
        at: usize,
        left_id: SegmentId,
        right_id: SegmentId,
    ) -> Result<(), RingError> {
        let seg = self.get(id).ok_or(RingError::UnknownId(id))?.clone();
        if at >= self.total || !seg.contains(at) || at == seg.start() {
            return Err(RingError::BadSplitPosition { id, at });
        }

        let mut replaced: Vec<BorderSegment> = Vec::with_capacity(self.segment_count() + 1);
        for s in self.iter() {
            if s.id() == id {
                replaced.push(BorderSegment::new(left_id, seg.start(), at, self.total));
                replaced.push(BorderSegment::new(right_id, at, seg.end(), self.total));
            } else {
                replaced.push(s.clone());
            }
        }

        *self = Self::new(replaced, self.min_len)?;
        Ok(())
    }

    /// 将环按比例重采样到总长 `new_total`.
    ///
    /// 首边界 (环序首个分段的起点) 锚定为精确映射, 其余边界按
    /// `round(偏移 * new_total / total)` 统一舍入; 舍入后发生碰撞的边界
    /// 依次向前顺延, 保证结果仍精确铺满 `[0, new_total)`, 不产生缝隙,
    /// 也没有舍入造成的一格重叠. 长度下限随环一起等比缩放 (至少为 1).
    pub fn rescale(&self, new_total: usize) -> Result<SegmentRing, RingError> {
        assert_ne!(new_total, 0, "环总长至少为 1");
        let n = self.segment_count();
        let ratio = new_total as f64 / self.total as f64;
        let new_min = ((self.min_len as f64 * ratio).floor() as usize).max(1);
        if n * new_min > new_total {
            return Err(RingError::CannotRescale {
                segments: n,
                new_total,
            });
        }

        let segs: Vec<&BorderSegment> = self.iter().collect();
        let anchor_old = segs[0].start();
        let anchor_new = (anchor_old as f64 * ratio).round() as usize % new_total;

        // 相对锚点的前向偏移, 保持严格递增且为后续边界留足空间.
        let mut offsets = Vec::with_capacity(n);
        offsets.push(0usize);
        let mut prev_off = 0usize;
        for (k, seg) in segs.iter().enumerate().skip(1) {
            let old_off = ring_span(anchor_old, seg.start(), self.total);
            let scaled = (old_off as f64 * ratio).round() as usize;
            let lo = prev_off + new_min;
            let hi = new_total - (n - k) * new_min;
            let clamped = scaled.clamp(lo, hi);
            offsets.push(clamped);
            prev_off = clamped;
        }

        let mut segments = Vec::with_capacity(n);
        for (k, seg) in segs.iter().enumerate() {
            let start = (anchor_new + offsets[k]) % new_total;
            let end = (anchor_new + offsets[(k + 1) % n]) % new_total;
            let mut rescaled = BorderSegment::new(seg.id(), start, end, new_total);
            rescaled.set_locked(seg.is_locked());
            segments.push(rescaled);
        }
        Self::new(segments, new_min)
    }

    /// 全量校验当前环 (调试断言用).
    pub(crate) fn check_invariants(&self) -> Result<(), RingError> {
        let in_order: Vec<BorderSegment> = self.iter().cloned().collect();
        if in_order.len() != self.arena.len() {
            return Err(RingError::BrokenChain { index: 0 });
        }
        Self::validate(&in_order, self.min_len)?;
        // next/prev 互逆.
        for (i, &ni) in self.next.iter().enumerate() {
            if self.prev[ni] != i {
                return Err(RingError::BrokenChain { index: i });
            }
        }
        Ok(())
    }

    /// 环序边界位置 (每个分段的起点).
    pub fn boundaries(&self) -> Vec<usize> {
        self.iter().map(BorderSegment::start).collect()
    }

    /// 边界位置的相邻配对 (环序首尾相接), 供一致性检查使用.
    pub fn boundary_pairs(&self) -> Vec<(usize, usize)> {
        self.boundaries()
            .into_iter()
            .circular_tuple_windows()
            .collect()
    }
}

/// 环修改命令: 显式的 "先校验后提交" 值对象.
///
/// 把交互式编辑 (边界拖拽、整环重建) 表达为命令值,
/// 使 "拒绝时不留下任何修改" 成为结构性保证而非约定;
/// 也便于把 GUI 事件排队后逐一应用.
#[derive(Clone, Debug)]
pub enum RingCommand {
    /// 移动某个分段的两个端点 (边界拖拽).
    MoveBoundary {
        /// 目标分段.
        id: SegmentId,
        /// 新起点.
        new_start: i64,
        /// 新终点.
        new_end: i64,
    },

    /// 以全新的环序分段列表重建整个环.
    Rebuild {
        /// 环序分段列表.
        segments: Vec<BorderSegment>,
    },
}

/// 命令执行错误.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// 边界移动被拒绝.
    Update(UpdateError),
    /// 重建列表未通过环校验.
    Ring(RingError),
}

impl RingCommand {
    /// 应用命令.
    ///
    /// 语义与 [`SegmentRing::update`] / [`SegmentRing::new`] 一致:
    /// 要么完整生效, 要么环保持原样. `Ok(false)` 同样表示
    /// "合法但不可行, 已忽略".
    pub fn apply(&self, ring: &mut SegmentRing) -> Result<bool, CommandError> {
        match self {
            RingCommand::MoveBoundary {
                id,
                new_start,
                new_end,
            } => ring
                .update(*id, *new_start, *new_end)
                .map_err(CommandError::Update),
            RingCommand::Rebuild { segments } => {
                let rebuilt = SegmentRing::new(segments.clone(), ring.min_len())
                    .map_err(CommandError::Ring)?;
                *ring = rebuilt;
                Ok(true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BorderSegment, RingCommand, RingError, SegmentRing, UpdateError};

    /// 四分段环: (90,0) (0,20) (20,30) (30,90), 总长 100, 下限 5.
    fn quad_ring() -> SegmentRing {
        SegmentRing::new(
            vec![
                BorderSegment::new(0, 90, 0, 100),
                BorderSegment::new(1, 0, 20, 100),
                BorderSegment::new(2, 20, 30, 100),
                BorderSegment::new(3, 30, 90, 100),
            ],
            5,
        )
        .unwrap()
    }

    #[test]
    fn test_ring_build_and_invariants() {
        let ring = quad_ring();
        assert_eq!(ring.total(), 100);
        assert_eq!(ring.segment_count(), 4);
        assert_eq!(ring.iter().map(BorderSegment::len).sum::<usize>(), 100);
        assert_eq!(ring.ids(), vec![0, 1, 2, 3]);
        // 环序相邻: end == next.start, 链闭合.
        for (a, b) in ring.boundary_pairs() {
            assert_eq!(ring.segment_containing(a).end(), b % 100);
        }
        assert!(ring.check_invariants().is_ok());
    }

    #[test]
    fn test_ring_rejects_bad_input() {
        // 缝隙.
        let err = SegmentRing::new(
            vec![
                BorderSegment::new(0, 0, 50, 100),
                BorderSegment::new(1, 55, 0, 100),
            ],
            5,
        )
        .unwrap_err();
        assert_eq!(err, RingError::BrokenChain { index: 0 });

        // 重复标识符.
        let err = SegmentRing::new(
            vec![
                BorderSegment::new(7, 0, 50, 100),
                BorderSegment::new(7, 50, 0, 100),
            ],
            5,
        )
        .unwrap_err();
        assert_eq!(err, RingError::DuplicateId(7));

        // 低于下限.
        let err = SegmentRing::new(
            vec![
                BorderSegment::new(0, 0, 3, 100),
                BorderSegment::new(1, 3, 0, 100),
            ],
            5,
        )
        .unwrap_err();
        assert!(matches!(err, RingError::TooShort { id: 0, len: 3, .. }));

        // 单个分段构不成环.
        assert!(matches!(
            SegmentRing::new(vec![BorderSegment::new(0, 0, 50, 100)], 5),
            Err(RingError::TooFewSegments(1))
        ));
    }

    /// 链式更新协议: 邻居可行性不足 -> `Ok(false)`; 可行 -> 提交共享边界.
    #[test]
    fn test_ring_update_chain() {
        let mut ring = quad_ring();

        // 前邻 (90,0) 只剩 4 格 -> no-op.
        assert!(!ring.update(1, 94, 20).unwrap());
        assert_eq!(ring.get(1).map(|s| (s.start(), s.end())), Some((0, 20)));

        // 前邻恰好剩 5 格 -> 提交.
        assert!(ring.update(1, 95, 20).unwrap());
        assert_eq!(ring.get(1).map(|s| (s.start(), s.end())), Some((95, 20)));
        assert_eq!(ring.get(0).map(|s| (s.start(), s.end())), Some((90, 95)));

        // 后邻 (20,30) 收缩到 (25,30), 恰好 5 格 -> 提交.
        assert!(ring.update(1, 0, 25).unwrap());
        assert_eq!(ring.get(1).map(|s| (s.start(), s.end())), Some((0, 25)));
        assert_eq!(ring.get(0).map(|s| (s.start(), s.end())), Some((90, 0)));
        assert_eq!(ring.get(2).map(|s| (s.start(), s.end())), Some((25, 30)));

        // 后邻只剩 4 格 -> no-op.
        assert!(!ring.update(1, 0, 26).unwrap());
        assert_eq!(ring.get(2).map(|s| (s.start(), s.end())), Some((25, 30)));

        // 全程不变量保持.
        assert!(ring.check_invariants().is_ok());
        assert_eq!(ring.iter().map(BorderSegment::len).sum::<usize>(), 100);
    }

    #[test]
    fn test_ring_update_errors() {
        let mut ring = quad_ring();
        assert_eq!(
            ring.update(1, -1, 20).unwrap_err(),
            UpdateError::StartOutOfRange(-1)
        );
        assert_eq!(
            ring.update(1, 0, 101).unwrap_err(),
            UpdateError::EndOutOfRange(101)
        );
        // 起点跳过整个前邻, 落到对面 -> 翻转.
        assert!(matches!(
            ring.update(1, 50, 20),
            Err(UpdateError::Inverted { .. })
        ));
        // 两端同在本分段内但次序颠倒 -> 翻转.
        assert!(matches!(
            ring.update(3, 80, 40),
            Err(UpdateError::Inverted { .. })
        ));
        // 错误路径不留痕迹.
        assert_eq!(ring.get(1).map(|s| (s.start(), s.end())), Some((0, 20)));
        assert!(ring.check_invariants().is_ok());
    }

    #[test]
    fn test_ring_update_locked() {
        let mut ring = quad_ring();
        ring.set_locked(1, true);
        assert!(!ring.update(1, 5, 20).unwrap());
        ring.set_locked(1, false);
        assert!(ring.update(1, 5, 20).unwrap());
    }

    #[test]
    fn test_ring_two_segments_both_bounds() {
        let mut ring = SegmentRing::new(
            vec![
                BorderSegment::new(0, 0, 50, 100),
                BorderSegment::new(1, 50, 0, 100),
            ],
            5,
        )
        .unwrap();
        // 双分段环: 前邻与后邻是同一个分段, 两个共享边界同时移动.
        assert!(ring.update(0, 90, 60).unwrap());
        assert_eq!(ring.get(0).map(|s| (s.start(), s.end())), Some((90, 60)));
        assert_eq!(ring.get(1).map(|s| (s.start(), s.end())), Some((60, 90)));
        assert!(ring.check_invariants().is_ok());
    }

    #[test]
    fn test_ring_iter_from_and_lookup() {
        let ring = quad_ring();
        assert_eq!(ring.segment_containing(95).id(), 0);
        assert_eq!(ring.segment_containing(0).id(), 1);
        assert_eq!(ring.segment_containing(29).id(), 2);
        let order: Vec<_> = ring.iter_from(25).map(BorderSegment::id).collect();
        assert_eq!(order, vec![2, 3, 0, 1]);
        assert_eq!(ring.next_of(3).unwrap().id(), 0);
        assert_eq!(ring.prev_of(0).unwrap().id(), 3);
    }

    #[test]
    fn test_ring_merge_and_split() {
        let mut ring = quad_ring();
        ring.merge(1, 2, 9).unwrap();
        assert_eq!(ring.segment_count(), 3);
        assert_eq!(ring.get(9).map(|s| (s.start(), s.end())), Some((0, 30)));
        assert!(ring.check_invariants().is_ok());

        ring.split(9, 20, 10, 11).unwrap();
        assert_eq!(ring.segment_count(), 4);
        assert_eq!(ring.get(10).map(|s| (s.start(), s.end())), Some((0, 20)));
        assert_eq!(ring.get(11).map(|s| (s.start(), s.end())), Some((20, 30)));
        assert!(ring.check_invariants().is_ok());

        // 分裂出的半段低于下限 -> 拒绝且不留痕迹.
        let before = ring.boundaries();
        assert!(ring.split(11, 22, 12, 13).is_err());
        assert_eq!(ring.boundaries(), before);

        // 非相邻合并 -> 拒绝.
        assert!(matches!(
            ring.merge(10, 0, 14),
            Err(RingError::NotAdjacent(10, 0))
        ));
    }

    #[test]
    fn test_ring_rescale_exact_tiling() {
        let ring = quad_ring();
        for new_total in [50usize, 100, 137, 200, 1000] {
            let scaled = ring.rescale(new_total).unwrap();
            assert_eq!(scaled.total(), new_total);
            assert_eq!(scaled.segment_count(), 4);
            assert_eq!(
                scaled.iter().map(BorderSegment::len).sum::<usize>(),
                new_total
            );
            assert_eq!(scaled.ids(), ring.ids());
            assert!(scaled.check_invariants().is_ok());
        }
        // 放不下四个分段.
        assert!(matches!(
            ring.rescale(3),
            Err(RingError::CannotRescale { .. })
        ));
    }

    #[test]
    fn test_ring_command_atomicity() {
        let mut ring = quad_ring();
        let bad = RingCommand::MoveBoundary {
            id: 1,
            new_start: 50,
            new_end: 20,
        };
        assert!(bad.apply(&mut ring).is_err());
        assert_eq!(ring.get(1).map(|s| (s.start(), s.end())), Some((0, 20)));

        let rebuild = RingCommand::Rebuild {
            segments: vec![
                BorderSegment::new(0, 0, 50, 100),
                BorderSegment::new(1, 50, 0, 100),
            ],
        };
        assert!(rebuild.apply(&mut ring).unwrap());
        assert_eq!(ring.segment_count(), 2);
    }
}
