//! 群体共识平均与种群级并行阶段.
//!
//! 一组共享分段 schema 的分段谱 (同一 ruleset 分段、同一界标集)
//! 可以被平均为一条代表性的 "共识" 分段谱: 谱取逐位置中位数,
//! 分段边界与界标取成员比例位置的中位数, 尺度元数据原样复制.
//!
//! 种群级阶段 (成员重采样、聚合、逐核网格比较) 彼此数据无关,
//! 在 `rayon` feature 打开时并行执行; 阶段之间是 "屏障" 依赖:
//! 聚合要等全部成员重采样完成, 网格比较要等共识构建完成.

use crate::mesh::Mesh;
use crate::profile::{percentile_of_sorted, Profile, ProfileAggregate};
use crate::segment::{BorderSegment, RingError, SegmentRing};
use crate::segmented::SegmentedProfile;
use crate::{consts, LandmarkId, Point2d, SegmentId};

/// 共识构建错误.
#[derive(Debug, Clone)]
pub enum ConsensusError {
    /// 空种群.
    EmptyPopulation,

    /// 成员的分段 schema、界标集或尺度与种群首成员不一致.
    ///
    /// 参数是首个不一致成员的下标.
    SchemaMismatch(usize),

    /// 重附分段时环校验失败.
    Ring(RingError),
}

/// 共识构建器.
///
/// `working_len` 是平均时的统一工作长度; `min_segment_len` 是共识环的
/// 分段长度下限, 默认放宽到 1, 因为成员分段比例在缩放到工作长度后
/// 可能低于成员自身的下限.
#[derive(Clone, Debug)]
pub struct ConsensusBuilder {
    working_len: usize,
    min_segment_len: usize,
}

impl Default for ConsensusBuilder {
    fn default() -> Self {
        Self {
            working_len: consts::CONSENSUS_WORKING_LEN,
            min_segment_len: 1,
        }
    }
}

impl ConsensusBuilder {
    /// 以工作长度构造. `working_len` 为 0 时 panic.
    pub fn new(working_len: usize) -> Self {
        assert_ne!(working_len, 0, "工作长度至少为 1");
        Self {
            working_len,
            min_segment_len: 1,
        }
    }

    /// 覆盖共识环的分段长度下限.
    pub fn with_min_segment_len(mut self, min: usize) -> Self {
        assert!(min >= 1, "分段长度下限至少为 1");
        self.min_segment_len = min;
        self
    }

    /// 工作长度.
    #[inline]
    pub fn working_len(&self) -> usize {
        self.working_len
    }

    /// 将共享 schema 的种群平均为一条共识分段谱.
    ///
    /// 全部成员必须拥有相同的环序分段标识符序列、相同的界标集与相同的
    /// 尺度元数据 (上游同一 ruleset 保证); 第一个不满足的成员触发
    /// [`ConsensusError::SchemaMismatch`]. 空种群立即报错.
    pub fn build(&self, members: &[SegmentedProfile]) -> Result<SegmentedProfile, ConsensusError> {
        let first = members.first().ok_or(ConsensusError::EmptyPopulation)?;
        let ids = first.segment_ids();
        let landmark_ids: Vec<LandmarkId> = first.landmarks().keys().copied().collect();

        for (k, m) in members.iter().enumerate().skip(1) {
            let same_schema = m.segment_ids() == ids
                && m.landmarks().keys().copied().collect::<Vec<_>>() == landmark_ids
                && m.scale() == first.scale();
            if !same_schema {
                return Err(ConsensusError::SchemaMismatch(k));
            }
        }

        // 阶段 1 (可并行): 成员重采样. 聚合必须等它全部完成.
        let resampled = resample_members(members, self.working_len);
        let mut aggregate = ProfileAggregate::new(self.working_len);
        for p in &resampled {
            aggregate.add(p);
        }
        let median = aggregate
            .median()
            .expect("种群非空, 聚合不可能为空");

        // 阶段 2: 以成员比例中位数重建分段边界.
        let ring = self.median_ring(members, &ids)?;
        let mut consensus =
            SegmentedProfile::new(median, ring).map_err(ConsensusError::Ring)?;

        // 界标取比例位置的中位数.
        for &lid in &landmark_ids {
            let mut fractions: Vec<f64> = members
                .iter()
                .map(|m| {
                    let pos = m.landmark(lid).expect("schema 校验保证界标存在");
                    pos as f64 / m.len() as f64
                })
                .collect();
            fractions.sort_by(f64::total_cmp);
            let fraction = percentile_of_sorted(&fractions, 50.0);
            let pos = (fraction * self.working_len as f64).round() as usize % self.working_len;
            consensus.set_landmark(lid, pos);
        }

        // 尺度元数据原样复制.
        Ok(consensus.with_scale(first.scale()))
    }

    /// 以成员分段长度比例的中位数构建共识分段环, 保留共享标识符.
    fn median_ring(
        &self,
        members: &[SegmentedProfile],
        ids: &[SegmentId],
    ) -> Result<SegmentRing, ConsensusError> {
        let n = ids.len();
        let wl = self.working_len;
        let min = self.min_segment_len;

        // 每个分段的中位长度比例.
        let mut fractions = Vec::with_capacity(n);
        for &id in ids {
            let mut fs: Vec<f64> = members
                .iter()
                .map(|m| {
                    let seg = m.segment(id).expect("schema 校验保证分段存在");
                    seg.len() as f64 / m.len() as f64
                })
                .collect();
            fs.sort_by(f64::total_cmp);
            fractions.push(percentile_of_sorted(&fs, 50.0));
        }
        let total_fraction: f64 = fractions.iter().sum();

        if n * min > wl {
            return Err(ConsensusError::Ring(RingError::CannotRescale {
                segments: n,
                new_total: wl,
            }));
        }

        // 归一化后的累积边界, 参考点锚定在 0; 舍入碰撞向前顺延.
        let mut starts = Vec::with_capacity(n);
        starts.push(0usize);
        let mut cumulative = 0.0;
        let mut prev = 0usize;
        for (k, f) in fractions.iter().enumerate().take(n - 1) {
            cumulative += f / total_fraction;
            let scaled = (cumulative * wl as f64).round() as usize;
            let lo = prev + min;
            let hi = wl - (n - 1 - k) * min;
            let clamped = scaled.clamp(lo, hi);
            starts.push(clamped);
            prev = clamped;
        }

        let mut segments = Vec::with_capacity(n);
        for (k, &id) in ids.iter().enumerate() {
            let start = starts[k];
            let end = starts[(k + 1) % n];
            segments.push(BorderSegment::new(id, start, end, wl));
        }
        SegmentRing::new(segments, min).map_err(ConsensusError::Ring)
    }

    /// 将一组界标对齐的成员轮廓平均为一条共识轮廓.
    ///
    /// 每条轮廓的 x/y 坐标序列被当作两条闭合谱环形重采样到工作长度,
    /// 然后逐环位置取中位数点. 空种群立即报错; 空轮廓是调用方错误 (panic).
    pub fn average_outline(
        &self,
        outlines: &[Vec<Point2d>],
    ) -> Result<Vec<Point2d>, ConsensusError> {
        if outlines.is_empty() {
            return Err(ConsensusError::EmptyPopulation);
        }
        let wl = self.working_len;
        let resampled: Vec<(Profile, Profile)> = outlines
            .iter()
            .map(|outline| {
                assert!(!outline.is_empty(), "轮廓不能为空");
                let xs = Profile::new(outline.iter().map(|p| p.0).collect());
                let ys = Profile::new(outline.iter().map(|p| p.1).collect());
                (xs.interpolate(wl), ys.interpolate(wl))
            })
            .collect();

        let mut consensus = Vec::with_capacity(wl);
        for i in 0..wl {
            let mut xs: Vec<f64> = resampled.iter().map(|(x, _)| x.get(i)).collect();
            let mut ys: Vec<f64> = resampled.iter().map(|(_, y)| y.get(i)).collect();
            xs.sort_by(f64::total_cmp);
            ys.sort_by(f64::total_cmp);
            consensus.push((
                percentile_of_sorted(&xs, 50.0),
                percentile_of_sorted(&ys, 50.0),
            ));
        }
        Ok(consensus)
    }
}

/// 单个主体与共识轮廓的网格比较, 失败时剔除并记录日志.
fn compare_one(k: usize, reference: &[Point2d], subject: &[Point2d]) -> Option<Mesh> {
    match Mesh::compare(reference, subject) {
        Ok(mesh) => Some(mesh),
        Err(e) => {
            log::warn!("剔除第 {k} 个主体, 网格创建失败: {e:?}");
            None
        }
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::prelude::*;

        /// 将每个成员的谱重采样到统一工作长度 (种群阶段, 借助 `rayon` 并行).
        ///
        /// 返回向量与输入对齐; 调用方在此之后才能开始聚合 (屏障依赖).
        pub fn resample_members(members: &[SegmentedProfile], len: usize) -> Vec<Profile> {
            members
                .par_iter()
                .map(|m| m.profile().interpolate(len))
                .collect()
        }

        /// 将种群中每个主体轮廓与共识轮廓逐一做网格比较
        /// (种群阶段, 借助 `rayon` 并行).
        ///
        /// 顶点数不匹配等创建失败 **不会** 中止整个种群任务: 失败的主体
        /// 被剔除, 记录一条警告日志, 对应槽位为 `None`, 其余主体照常比较.
        /// 共识构建完成之前不得调用 (屏障依赖).
        pub fn compare_population(
            reference: &[Point2d],
            subjects: &[Vec<Point2d>],
        ) -> Vec<Option<Mesh>> {
            subjects
                .par_iter()
                .enumerate()
                .map(|(k, subject)| compare_one(k, reference, subject))
                .collect()
        }
    } else {
        /// 将每个成员的谱重采样到统一工作长度 (种群阶段).
        ///
        /// 返回向量与输入对齐; 调用方在此之后才能开始聚合 (屏障依赖).
        pub fn resample_members(members: &[SegmentedProfile], len: usize) -> Vec<Profile> {
            members
                .iter()
                .map(|m| m.profile().interpolate(len))
                .collect()
        }

        /// 将种群中每个主体轮廓与共识轮廓逐一做网格比较 (种群阶段).
        ///
        /// 顶点数不匹配等创建失败 **不会** 中止整个种群任务: 失败的主体
        /// 被剔除, 记录一条警告日志, 对应槽位为 `None`, 其余主体照常比较.
        /// 共识构建完成之前不得调用 (屏障依赖).
        pub fn compare_population(
            reference: &[Point2d],
            subjects: &[Vec<Point2d>],
        ) -> Vec<Option<Mesh>> {
            subjects
                .iter()
                .enumerate()
                .map(|(k, subject)| compare_one(k, reference, subject))
                .collect()
        }
    }
}

/// 辅助: 种群中每个成员谱与共识谱的平方差 (拟合质量诊断).
pub fn population_fit(consensus: &SegmentedProfile, members: &[SegmentedProfile]) -> Vec<f64> {
    members
        .iter()
        .map(|m| consensus.profile().absolute_square_difference(m.profile()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{compare_population, ConsensusBuilder, ConsensusError};
    use crate::profile::Profile;
    use crate::segment::{BorderSegment, SegmentRing, SegmentRuleset, Segmenter};
    use crate::segmented::SegmentedProfile;

    fn member(len: usize, angle: f64, scale: f64) -> SegmentedProfile {
        let ring = SegmentRing::new(
            vec![
                BorderSegment::new(0, 0, len / 4, len),
                BorderSegment::new(1, len / 4, len / 2, len),
                BorderSegment::new(2, len / 2, 0, len),
            ],
            5,
        )
        .unwrap();
        let mut sp = SegmentedProfile::new(Profile::constant(angle, len), ring)
            .unwrap()
            .with_scale(scale);
        sp.set_landmark(11, len / 4);
        sp.set_landmark(12, len / 2);
        sp
    }

    #[test]
    fn test_consensus_empty_population() {
        let builder = ConsensusBuilder::default();
        assert!(matches!(
            builder.build(&[]),
            Err(ConsensusError::EmptyPopulation)
        ));
        assert!(matches!(
            builder.average_outline(&[]),
            Err(ConsensusError::EmptyPopulation)
        ));
    }

    #[test]
    fn test_consensus_schema_mismatch() {
        let builder = ConsensusBuilder::new(100);
        let a = member(100, 180.0, 0.5);
        // 分段标识符不同.
        let ring = SegmentRing::new(
            vec![
                BorderSegment::new(7, 0, 25, 100),
                BorderSegment::new(8, 25, 50, 100),
                BorderSegment::new(9, 50, 0, 100),
            ],
            5,
        )
        .unwrap();
        let mut b = SegmentedProfile::new(Profile::constant(180.0, 100), ring)
            .unwrap()
            .with_scale(0.5);
        b.set_landmark(11, 25);
        b.set_landmark(12, 50);
        assert!(matches!(
            builder.build(&[a.clone(), b]),
            Err(ConsensusError::SchemaMismatch(1))
        ));

        // 尺度不同.
        let c = member(100, 180.0, 0.25);
        assert!(matches!(
            builder.build(&[a, c]),
            Err(ConsensusError::SchemaMismatch(1))
        ));
    }

    /// 共识保留成员的分段标识符与个数、全部界标、以及尺度元数据.
    #[test]
    fn test_consensus_preserves_schema() {
        let builder = ConsensusBuilder::new(100);
        let members = vec![
            member(100, 178.0, 0.5),
            member(120, 180.0, 0.5),
            member(80, 184.0, 0.5),
        ];
        let consensus = builder.build(&members).unwrap();

        assert_eq!(consensus.len(), 100);
        assert_eq!(consensus.segment_ids(), vec![0, 1, 2]);
        assert_eq!(consensus.landmarks().len(), 2);
        assert_eq!(consensus.scale(), 0.5);
        // 分段比例为 1/4, 1/4, 1/2 -> 边界 0, 25, 50.
        assert_eq!(consensus.ring().boundaries(), vec![0, 25, 50]);
        assert_eq!(consensus.landmark(11), Some(25));
        assert_eq!(consensus.landmark(12), Some(50));
        // 常数成员的中位数谱: 180 是 {178, 180, 184} 的中位数.
        for i in 0..100 {
            assert_eq!(consensus.get(i), 180.0);
        }
        assert!(consensus.ring().check_invariants().is_ok());
    }

    /// 自动分段出的种群同样可以平均: 先分段, 后共识 (屏障顺序).
    #[test]
    fn test_consensus_after_segmentation_barrier() {
        use std::sync::mpsc;

        // 种群成员在线程池上并行分段; 全部完成后才构建共识.
        let profiles: Vec<Profile> = (0..6)
            .map(|k| {
                // 每个成员在相同位置有一个三角形凸包与一个凹陷, 高度略有差异.
                let mut values = vec![180.0; 100];
                for d in -4i64..=4 {
                    let fall = 1.0 - d.abs() as f64 / 5.0;
                    values[(30 + d) as usize] += (30.0 + k as f64) * fall;
                    values[(70 + d) as usize] -= (30.0 + k as f64) * fall;
                }
                Profile::new(values)
            })
            .collect();

        let pool = threadpool::ThreadPool::new(num_cpus::get().max(1));
        let (tx, rx) = mpsc::channel();
        for (k, p) in profiles.into_iter().enumerate() {
            let tx = tx.clone();
            pool.execute(move || {
                let ring = Segmenter::new(&p, SegmentRuleset::default())
                    .segment()
                    .unwrap();
                let sp = SegmentedProfile::new(p, ring).unwrap();
                tx.send((k, sp)).unwrap();
            });
        }
        drop(tx);

        // 屏障: 收齐全部成员.
        let mut members: Vec<(usize, SegmentedProfile)> = rx.iter().collect();
        members.sort_by_key(|(k, _)| *k);
        let members: Vec<SegmentedProfile> = members.into_iter().map(|(_, sp)| sp).collect();
        assert_eq!(members.len(), 6);

        // 相同形状的成员分段一致, 可以直接平均.
        let consensus = ConsensusBuilder::new(100).build(&members).unwrap();
        assert_eq!(consensus.segment_ids(), members[0].segment_ids());
        assert_eq!(consensus.len(), 100);
    }

    #[test]
    fn test_average_outline_median_point() {
        let builder = ConsensusBuilder::new(4);
        // 三个同心正方形, 中位数轮廓是中间那个.
        let square = |r: f64| vec![(r, 0.0), (0.0, r), (-r, 0.0), (0.0, -r)];
        let outlines = vec![square(1.0), square(2.0), square(5.0)];
        let avg = builder.average_outline(&outlines).unwrap();
        assert_eq!(avg.len(), 4);
        assert!((avg[0].0 - 2.0).abs() < 1e-9);
        assert!((avg[0].1 - 0.0).abs() < 1e-9);
        assert!((avg[1].1 - 2.0).abs() < 1e-9);
    }

    /// 单个坏主体被剔除并留下 `None`, 不中止其余比较.
    #[test]
    fn test_compare_population_excludes_bad_subject() {
        // 剔除路径会写一条警告日志.
        let _ = simple_logger::SimpleLogger::new()
            .with_level(log::LevelFilter::Debug)
            .init();

        let reference = vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
        let good = vec![(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)];
        let bad = vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]; // 顶点数不符
        let results = compare_population(&reference, &[good, bad.clone(), bad]);
        assert_eq!(results.len(), 3);
        assert!(results[0].is_some());
        assert!(results[1].is_none());
        assert!(results[2].is_none());
        let mesh = results[0].as_ref().unwrap();
        assert_eq!(mesh.vertex_count(), 4);
    }
}
