//! 基于极值检测的自动分段器.

use std::collections::BTreeSet;

use binary_heap_plus::BinaryHeap;
use ordered_float::NotNan;

use super::{BorderSegment, RingError, SegmentRing, SegmentRuleset};
use crate::profile::{FlagRing, Profile};
use crate::SegmentId;

/// 分段器运行时错误.
#[derive(Debug, Clone)]
pub enum SegmenterError {
    /// 谱太短, 放不下两个最小长度的分段.
    ///
    /// 第一个参数是谱长, 第二个参数是所需的最小谱长.
    ProfileTooShort(usize, usize),

    /// 产出的分段未通过环校验.
    Ring(RingError),
}

/// 将一条内角谱划分为以极值为界的分段环.
///
/// 上游检测器保证参考点位于索引 0, 因此索引 0 永远是一条分段边界,
/// 产出的环序也从它开始.
///
/// # 算法
///
/// 1. 平滑谱, 在阈值两侧做窗口化极值检测, 得到候选边界;
/// 2. 以二阶差分幅度过滤掉过于平缓的候选;
/// 3. 合并间距小于下限的候选: 每次移除参与冲突的 **全局最弱** 候选
///    (强度 = 二阶差分幅度, 平局时先移除索引更大的, 参考点 0 永不移除).
///    该决胜规则是确定性的, 与迭代顺序无关;
/// 4. 幸存边界依环序构成分段, 标识符从 0 顺次分配.
pub struct Segmenter<'a> {
    profile: &'a Profile,
    ruleset: SegmentRuleset,
    /// 通过阈值过滤的候选拐点标记.
    inflections: FlagRing,
    /// 二阶差分谱, 兼作拐点强度度量.
    curvature: Profile,
    /// 有效拐点所需的最小二阶差分幅度.
    min_strength: f64,
}

impl<'a> Segmenter<'a> {
    /// 以给定规则集构造分段器并完成极值预计算.
    pub fn new(profile: &'a Profile, ruleset: SegmentRuleset) -> Self {
        let smoothed = profile.smooth(ruleset.smooth_window);
        let window = ruleset.window_for(profile.len());

        // 极大值须高于阈值, 极小值须低于阈值, 两者并为候选拐点.
        let mut inflections = FlagRing::new(profile.len());
        for i in smoothed.local_maxima(window).indices() {
            if smoothed.get(i) > ruleset.angle_threshold {
                inflections.set(i, true);
            }
        }
        for i in smoothed.local_minima(window).indices() {
            if smoothed.get(i) < ruleset.angle_threshold {
                inflections.set(i, true);
            }
        }

        // 二阶差分: 一阶差分平滑后再差分一次.
        let curvature = smoothed
            .deltas(ruleset.delta_window)
            .smooth(ruleset.smooth_window)
            .deltas(ruleset.delta_window);
        let range = curvature.max() - curvature.min();
        let min_strength = range * ruleset.min_delta_fraction;

        Self {
            profile,
            ruleset,
            inflections,
            curvature,
            min_strength,
        }
    }

    /// 执行分段, 返回铺满整环的分段环.
    ///
    /// 幸存边界不足两条时退化为锚定在参考点的两个半环分段.
    pub fn segment(&self) -> Result<SegmentRing, SegmenterError> {
        let n = self.profile.len();
        let min = self.ruleset.min_segment_len;
        if n < min * 2 {
            return Err(SegmenterError::ProfileTooShort(n, min * 2));
        }

        // 候选边界: 参考点 0, 加上所有通过强度过滤的拐点.
        let mut candidates: Vec<usize> = vec![0];
        for i in self.inflections.indices() {
            if i != 0 && self.curvature.get(i).abs() > self.min_strength {
                candidates.push(i);
            }
        }

        let mut boundaries = self.merge_close(candidates);
        log::debug!(
            "谱 ({n} 采样) 合并后剩余 {} 条分段边界",
            boundaries.len()
        );

        if boundaries.len() < 2 {
            boundaries = vec![0, n / 2];
        }

        let mut segments = Vec::with_capacity(boundaries.len());
        for (k, &b) in boundaries.iter().enumerate() {
            let end = boundaries[(k + 1) % boundaries.len()];
            segments.push(BorderSegment::new(k as SegmentId, b, end, n));
            log::debug!("新分段: {k} [{b}, {end})");
        }
        SegmentRing::new(segments, min).map_err(SegmenterError::Ring)
    }

    /// 合并间距小于下限的候选边界.
    ///
    /// 候选按强度升序出堆; 出堆时仍与某个幸存邻居冲突的被移除,
    /// 否则保留. 移除只会扩大间距, 因此一次遍历即收敛.
    fn merge_close(&self, candidates: Vec<usize>) -> Vec<usize> {
        let n = self.profile.len();
        let min = self.ruleset.min_segment_len;
        let mut alive: BTreeSet<usize> = candidates.iter().copied().collect();

        let strength = |i: usize| -> NotNan<f64> {
            // 谱采样在构造时已保证有限.
            NotNan::new(self.curvature.get(i).abs()).unwrap()
        };

        // 堆顶是最弱候选; 等强度时索引大者先出.
        let mut heap = BinaryHeap::new_by(|a: &usize, b: &usize| {
            strength(*b).cmp(&strength(*a)).then(a.cmp(b))
        });
        for &c in &candidates {
            if c != 0 {
                heap.push(c);
            }
        }

        while let Some(i) = heap.pop() {
            if !alive.contains(&i) {
                continue;
            }
            // 与环上两侧最近的幸存候选的间距.
            let next = alive
                .range((i + 1)..)
                .next()
                .or_else(|| alive.iter().next())
                .copied()
                .unwrap();
            let prev = alive
                .range(..i)
                .next_back()
                .or_else(|| alive.iter().next_back())
                .copied()
                .unwrap();
            let fwd = (next + n - i) % n;
            let bwd = (i + n - prev) % n;
            if fwd < min || bwd < min || fwd == 0 || bwd == 0 {
                alive.remove(&i);
            }
        }
        alive.into_iter().collect()
    }
}
