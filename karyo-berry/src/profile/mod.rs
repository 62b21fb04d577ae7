//! 闭合谱 (closed profile) 基础数据结构.
//!
//! 谱是一个首尾相接的实值采样环: 索引 N 与索引 0 重合.
//! 环上没有天然的 "开头" 与 "结尾", 末位采样与首位采样之间的间隔
//! 和任何内部间隔地位相同. 上游检测器保证参考点位于索引 0.

mod aggregate;
mod flags;

pub use aggregate::{AggregateError, ProfileAggregate};
pub(crate) use aggregate::percentile_of_sorted;
pub use flags::FlagRing;

use itertools::izip;
use ndarray::Array1;

/// 一个不可变的闭合实值采样环.
///
/// 值对象: 构造后不再修改, 所有变换 (`add`, `multiply`, `interpolate` 等)
/// 都返回新实例. 索引一律按模 N 回绕, 见 [`Profile::get`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Profile {
    samples: Array1<f64>,
}

impl Profile {
    /// 从原始测量数组构造.
    ///
    /// `values` 为空或含非有限值 (NaN/inf) 时 panic.
    pub fn new(values: Vec<f64>) -> Self {
        assert!(!values.is_empty(), "谱不能为空");
        assert!(values.iter().all(|v| v.is_finite()), "谱采样必须全部有限");
        Self {
            samples: Array1::from_vec(values),
        }
    }

    /// 构造每个位置都为 `value` 的谱. `len` 为 0 时 panic.
    pub fn constant(value: f64, len: usize) -> Self {
        assert_ne!(len, 0, "谱长度至少为 1");
        assert!(value.is_finite(), "谱采样必须有限");
        Self {
            samples: Array1::from_elem(len, value),
        }
    }

    /// 采样点个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// 谱永远非空; 本方法只为满足容器惯例而存在.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// 将任意 (可为负的) 索引回绕到 `[0, N)`.
    ///
    /// 本 crate 统一采用真模运算回绕: 越界索引永远被映射回环上,
    /// 不存在 "越界返回 0" 之类的特殊路径.
    #[inline]
    pub fn wrap(&self, index: i64) -> usize {
        index.rem_euclid(self.len() as i64) as usize
    }

    /// 按环形语义读取位置 `index` 的采样值 (索引取模 N).
    #[inline]
    pub fn get(&self, index: usize) -> f64 {
        self.samples[index % self.len()]
    }

    /// 以切片形式借用全部采样.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        // 一维连续数组, 不会失败.
        self.samples.as_slice().unwrap()
    }

    /// 最小采样值.
    #[inline]
    pub fn min(&self) -> f64 {
        self.samples[self.index_of_min()]
    }

    /// 最大采样值.
    #[inline]
    pub fn max(&self) -> f64 {
        self.samples[self.index_of_max()]
    }

    /// 最小采样值所在位置. 并列时取最小索引, 保证结果可复现.
    pub fn index_of_min(&self) -> usize {
        let mut best = 0;
        for (i, &v) in self.samples.iter().enumerate() {
            if v < self.samples[best] {
                best = i;
            }
        }
        best
    }

    /// 最大采样值所在位置. 并列时取最小索引.
    pub fn index_of_max(&self) -> usize {
        let mut best = 0;
        for (i, &v) in self.samples.iter().enumerate() {
            if v > self.samples[best] {
                best = i;
            }
        }
        best
    }

    /// 每个位置加上常数 `value`. `value` 非有限时 panic.
    pub fn add(&self, value: f64) -> Self {
        assert!(value.is_finite(), "不能加上 NaN 或无穷");
        Self {
            samples: self.samples.mapv(|v| v + value),
        }
    }

    /// 每个位置乘以常数 `factor`. `factor` 非有限时 panic.
    pub fn multiply(&self, factor: f64) -> Self {
        assert!(factor.is_finite(), "不能乘以 NaN 或无穷");
        Self {
            samples: self.samples.mapv(|v| v * factor),
        }
    }

    /// 与另一个谱逐位置相乘. 两谱长度必须一致, 否则 panic.
    pub fn multiply_profile(&self, other: &Profile) -> Self {
        assert_eq!(self.len(), other.len(), "谱长度不一致");
        Self {
            samples: &self.samples * &other.samples,
        }
    }

    /// 以线性插值将谱重采样到 `new_len` 个位置.
    ///
    /// 环被视为拓扑封闭: 结果位置 `i` 读取原谱的分数位置 `i / new_len`,
    /// 末位采样与首位采样之间像任何内部间隔一样参与插值.
    pub fn interpolate(&self, new_len: usize) -> Self {
        assert_ne!(new_len, 0, "目标长度至少为 1");
        let n = self.len();
        let mut out = Vec::with_capacity(new_len);
        for i in 0..new_len {
            let pos = (i as f64 / new_len as f64) * n as f64;
            let lower = pos.floor() as usize % n;
            let frac = pos - pos.floor();
            let a = self.samples[lower];
            let b = self.samples[(lower + 1) % n];
            out.push(a + (b - a) * frac);
        }
        Self {
            samples: Array1::from_vec(out),
        }
    }

    /// 环形滑动平均: 每个位置取自身与两侧各 `window` 个采样的均值.
    pub fn smooth(&self, window: usize) -> Self {
        assert!(window >= 1, "窗口宽度至少为 1");
        let n = self.len() as i64;
        let w = window as i64;
        let mut out = Vec::with_capacity(self.len());
        for i in 0..n {
            let mut acc = 0.0;
            for j in -w..=w {
                acc += self.samples[(i + j).rem_euclid(n) as usize];
            }
            out.push(acc / (2 * window + 1) as f64);
        }
        Self {
            samples: Array1::from_vec(out),
        }
    }

    /// 环形中心差分: 位置 `i` 的结果为 `i + window` 处与 `i - window` 处采样之差.
    ///
    /// 对结果再次调用可得到二阶差分的近似, 分段器以此度量拐点强度.
    pub fn deltas(&self, window: usize) -> Self {
        assert!(window >= 1, "窗口宽度至少为 1");
        let n = self.len() as i64;
        let w = window as i64;
        let mut out = Vec::with_capacity(self.len());
        for i in 0..n {
            out.push(
                self.samples[(i + w).rem_euclid(n) as usize]
                    - self.samples[(i - w).rem_euclid(n) as usize],
            );
        }
        Self {
            samples: Array1::from_vec(out),
        }
    }

    /// 返回将环位置 `k` 旋转到索引 0 的副本.
    pub fn offset(&self, k: i64) -> Self {
        let n = self.len();
        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            out.push(self.samples[self.wrap(i as i64 + k)]);
        }
        Self {
            samples: Array1::from_vec(out),
        }
    }

    /// 返回遍历方向取反的副本.
    pub fn reverse(&self) -> Self {
        let n = self.len();
        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            out.push(self.samples[n - 1 - i]);
        }
        Self {
            samples: Array1::from_vec(out),
        }
    }

    /// 提取半开弧 `[start, end)` 为一个新谱 (跨环缝时照常回绕).
    ///
    /// `start == end` 时视为从 `start` 出发的整环.
    pub fn sub_profile(&self, start: usize, end: usize) -> Self {
        let n = self.len();
        assert!(start < n && end < n, "弧端点必须位于 [0, 谱长)");
        let arc = if start == end {
            n
        } else {
            (end + n - start) % n
        };
        let mut out = Vec::with_capacity(arc);
        for k in 0..arc {
            out.push(self.samples[(start + k) % n]);
        }
        Self {
            samples: Array1::from_vec(out),
        }
    }

    /// 两谱逐位置差的平方和.
    ///
    /// 长度不一致时, 先将较短者环形插值到较长者的长度再比较.
    pub fn absolute_square_difference(&self, other: &Profile) -> f64 {
        if self.len() == other.len() {
            return izip!(self.samples.iter(), other.samples.iter())
                .map(|(a, b)| (a - b).powi(2))
                .sum();
        }
        if self.len() > other.len() {
            self.absolute_square_difference(&other.interpolate(self.len()))
        } else {
            self.interpolate(other.len())
                .absolute_square_difference(other)
        }
    }

    /// 求将 `self` 旋转多少个位置后与 `other` 的平方差最小.
    ///
    /// 并列时取最小偏移, 保证结果可复现. 用于界标/参考点对齐.
    pub fn find_best_fit_offset(&self, other: &Profile) -> i64 {
        let other = if other.len() == self.len() {
            other.clone()
        } else {
            other.interpolate(self.len())
        };
        let mut best = 0i64;
        let mut best_score = f64::INFINITY;
        for k in 0..self.len() as i64 {
            let score = self.offset(k).absolute_square_difference(&other);
            if score < best_score {
                best_score = score;
                best = k;
            }
        }
        best
    }

    /// 求局部极小值位置.
    ///
    /// 位置 `i` 被标记, 当且仅当它在两侧各 `window` 个采样范围内严格最小
    /// (窗口跨越环缝时照常回绕). 平台 (连续相等值) 不会产生标记.
    pub fn local_minima(&self, window: usize) -> FlagRing {
        self.local_extrema(window, |centre, other| centre < other)
    }

    /// 求局部极大值位置. 语义与 [`Profile::local_minima`] 对称.
    pub fn local_maxima(&self, window: usize) -> FlagRing {
        self.local_extrema(window, |centre, other| centre > other)
    }

    fn local_extrema(&self, window: usize, beats: impl Fn(f64, f64) -> bool) -> FlagRing {
        assert!(window >= 1, "窗口宽度至少为 1");
        let n = self.len() as i64;
        let w = window as i64;
        let mut flags = FlagRing::new(self.len());
        for i in 0..n {
            let centre = self.samples[i as usize];
            let mut extremum = true;
            for j in 1..=w {
                let before = self.samples[(i - j).rem_euclid(n) as usize];
                let after = self.samples[(i + j).rem_euclid(n) as usize];
                if !beats(centre, before) || !beats(centre, after) {
                    extremum = false;
                    break;
                }
            }
            if extremum {
                flags.set(i as usize, true);
            }
        }
        flags
    }
}

#[cfg(test)]
mod tests {
    use super::Profile;

    fn f64_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    #[should_panic]
    fn test_profile_empty_panics() {
        let _ = Profile::new(vec![]);
    }

    #[test]
    #[should_panic]
    fn test_profile_nan_panics() {
        let _ = Profile::new(vec![1.0, f64::NAN]);
    }

    /// 从数组构造后逐位置读取应原样还原.
    #[test]
    fn test_profile_round_trip() {
        let values = vec![3.5, 1.0, -2.0, 7.25, 0.0];
        let p = Profile::new(values.clone());
        assert_eq!(p.len(), 5);
        for (i, v) in values.iter().enumerate() {
            assert!(f64_eq(p.get(i), *v));
        }
    }

    /// 索引按模回绕, 负索引通过 `wrap` 回绕.
    #[test]
    fn test_profile_wrap() {
        let p = Profile::new(vec![10.0, 20.0, 30.0]);
        assert!(f64_eq(p.get(3), 10.0));
        assert!(f64_eq(p.get(7), 20.0));
        assert_eq!(p.wrap(-1), 2);
        assert_eq!(p.wrap(-336), p.wrap(-336 + 3 * 112));
        assert_eq!(p.wrap(3), 0);
    }

    #[test]
    fn test_profile_extrema_index() {
        let p = Profile::new(vec![5.0, 1.0, 9.0, 1.0, 9.0]);
        // 并列时取最小索引.
        assert_eq!(p.index_of_min(), 1);
        assert_eq!(p.index_of_max(), 2);
        assert!(f64_eq(p.min(), 1.0));
        assert!(f64_eq(p.max(), 9.0));
    }

    #[test]
    fn test_profile_arithmetic() {
        let p = Profile::new(vec![1.0, 2.0, 3.0]);
        let q = p.add(1.5).multiply(2.0);
        assert!(f64_eq(q.get(0), 5.0));
        assert!(f64_eq(q.get(2), 9.0));
        // 原谱不受影响 (值对象).
        assert!(f64_eq(p.get(0), 1.0));

        let r = p.multiply_profile(&Profile::new(vec![2.0, 0.5, -1.0]));
        assert!(f64_eq(r.get(0), 2.0));
        assert!(f64_eq(r.get(1), 1.0));
        assert!(f64_eq(r.get(2), -3.0));
    }

    #[test]
    #[should_panic]
    fn test_profile_multiply_mismatch_panics() {
        let p = Profile::new(vec![1.0, 2.0]);
        let _ = p.multiply_profile(&Profile::new(vec![1.0, 2.0, 3.0]));
    }

    /// 环形插值: 末位与首位之间的间隔照常参与.
    #[test]
    fn test_profile_interpolate_circular() {
        let p = Profile::new(vec![10.0, 11.0, 12.0, 13.0, 14.0, 15.0]);
        let q = p.interpolate(12);
        let expect = [
            10.0, 10.5, 11.0, 11.5, 12.0, 12.5, 13.0, 13.5, 14.0, 14.5, 15.0, 12.5,
        ];
        assert_eq!(q.len(), 12);
        for (i, e) in expect.iter().enumerate() {
            assert!(f64_eq(q.get(i), *e), "index {i}: {} != {e}", q.get(i));
        }
    }

    #[test]
    fn test_profile_interpolate_identity() {
        let p = Profile::new(vec![1.0, 4.0, 2.0, 8.0]);
        let q = p.interpolate(4);
        assert_eq!(p, q);
    }

    #[test]
    fn test_profile_offset_and_reverse() {
        let p = Profile::new(vec![0.0, 1.0, 2.0, 3.0]);
        let q = p.offset(1);
        assert!(f64_eq(q.get(0), 1.0));
        assert!(f64_eq(q.get(3), 0.0));
        let r = p.offset(-1);
        assert!(f64_eq(r.get(0), 3.0));

        let rev = p.reverse();
        assert!(f64_eq(rev.get(0), 3.0));
        assert!(f64_eq(rev.get(3), 0.0));
    }

    #[test]
    fn test_profile_sub_profile() {
        let p = Profile::new(vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        let a = p.sub_profile(1, 4);
        assert_eq!(a.as_slice(), &[1.0, 2.0, 3.0]);

        // 跨环缝.
        let b = p.sub_profile(3, 1);
        assert_eq!(b.as_slice(), &[3.0, 4.0]);

        // start == end 视为整环.
        let c = p.sub_profile(2, 2);
        assert_eq!(c.as_slice(), &[2.0, 3.0, 4.0, 0.0, 1.0]);
    }

    #[test]
    fn test_profile_smooth_constant_invariant() {
        let p = Profile::constant(7.0, 9);
        let s = p.smooth(2);
        for i in 0..9 {
            assert!(f64_eq(s.get(i), 7.0));
        }
    }

    #[test]
    fn test_profile_deltas() {
        let p = Profile::new(vec![0.0, 1.0, 2.0, 3.0]);
        let d = p.deltas(1);
        // d[i] = p[i+1] - p[i-1], 环上回绕.
        assert!(f64_eq(d.get(0), 1.0 - 3.0));
        assert!(f64_eq(d.get(1), 2.0 - 0.0));
        assert!(f64_eq(d.get(3), 0.0 - 2.0));
    }

    #[test]
    fn test_profile_local_extrema() {
        // 位置 2 是唯一的极大值, 位置 5 是唯一的极小值.
        let p = Profile::new(vec![5.0, 6.0, 9.0, 6.0, 5.0, 1.0, 4.0, 4.5]);
        let maxima = p.local_maxima(2);
        let minima = p.local_minima(2);
        assert_eq!(maxima.indices().collect::<Vec<_>>(), vec![2]);
        assert_eq!(minima.indices().collect::<Vec<_>>(), vec![5]);
    }

    #[test]
    fn test_profile_local_extrema_plateau() {
        // 平台不产生严格极值.
        let p = Profile::new(vec![1.0, 2.0, 2.0, 1.0, 0.0, 0.5]);
        assert_eq!(p.local_maxima(1).count(), 0);
    }

    #[test]
    fn test_profile_square_difference_and_best_offset() {
        let p = Profile::new(vec![0.0, 1.0, 2.0, 3.0]);
        assert!(f64_eq(p.absolute_square_difference(&p), 0.0));

        let shifted = p.offset(1);
        assert!(f64_eq(p.find_best_fit_offset(&shifted) as f64, 1.0));
        // 等长时平方差逐位置累加.
        let q = Profile::new(vec![1.0, 1.0, 2.0, 3.0]);
        assert!(f64_eq(p.absolute_square_difference(&q), 1.0));
    }
}
