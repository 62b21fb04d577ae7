//! 带分段环与界标的谱: 单个细胞核的规范形状描述.

use std::collections::BTreeMap;

use crate::profile::Profile;
use crate::segment::{BorderSegment, RingError, SegmentRing, UpdateError};
use crate::{LandmarkId, SegmentId};

/// 谱 + 分段环 + 界标 + 尺度元数据.
///
/// 分段环的总长恒等于谱长. 界标是调用方定义的命名环位置,
/// 本结构只存储与等比缩放它们, 从不解释其语义; 尺度元数据
/// (物理长度每采样) 同样原样随数据传递.
///
/// 环上的就地修改 (见 [`SegmentedProfile::update`]) 需要 `&mut self`,
/// 同一实例的并发修改因此在类型层面被串行化.
#[derive(Clone, Debug)]
pub struct SegmentedProfile {
    profile: Profile,
    ring: SegmentRing,
    landmarks: BTreeMap<LandmarkId, usize>,
    scale: f64,
}

impl SegmentedProfile {
    /// 组合谱与分段环. 环总长必须等于谱长.
    pub fn new(profile: Profile, ring: SegmentRing) -> Result<Self, RingError> {
        if ring.total() != profile.len() {
            return Err(RingError::LengthMismatch {
                expected: profile.len(),
                actual: ring.total(),
            });
        }
        Ok(Self {
            profile,
            ring,
            landmarks: BTreeMap::new(),
            scale: 1.0,
        })
    }

    /// 设置尺度元数据 (物理长度每采样). 非正或非有限时 panic.
    pub fn with_scale(mut self, scale: f64) -> Self {
        assert!(scale.is_finite() && scale > 0.0, "尺度必须为正有限数");
        self.scale = scale;
        self
    }

    /// 底层谱.
    #[inline]
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// 分段环 (只读; 修改须经 [`SegmentedProfile::update`] 等协议入口).
    #[inline]
    pub fn ring(&self) -> &SegmentRing {
        &self.ring
    }

    /// 采样点个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.profile.len()
    }

    /// 谱永远非空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// 尺度元数据.
    #[inline]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// 按环形语义读取采样值.
    #[inline]
    pub fn get(&self, index: usize) -> f64 {
        self.profile.get(index)
    }

    /// 按标识符查找分段.
    #[inline]
    pub fn segment(&self, id: SegmentId) -> Option<&BorderSegment> {
        self.ring.get(id)
    }

    /// 包含环位置 `index` 的分段 (索引取模).
    #[inline]
    pub fn segment_containing(&self, index: usize) -> &BorderSegment {
        self.ring.segment_containing(index)
    }

    /// 从包含 `from` 的分段开始按环序迭代全部分段.
    #[inline]
    pub fn segments_from(&self, from: usize) -> impl Iterator<Item = &BorderSegment> + '_ {
        self.ring.iter_from(from)
    }

    /// 环序分段标识符.
    #[inline]
    pub fn segment_ids(&self) -> Vec<SegmentId> {
        self.ring.ids()
    }

    /// 提取分段覆盖的谱弧 (半开).
    pub fn segment_values(&self, id: SegmentId) -> Option<Profile> {
        self.ring
            .get(id)
            .map(|s| self.profile.sub_profile(s.start(), s.end()))
    }

    /// 移动分段边界. 语义与 [`SegmentRing::update`] 一致.
    pub fn update(
        &mut self,
        id: SegmentId,
        new_start: i64,
        new_end: i64,
    ) -> Result<bool, UpdateError> {
        self.ring.update(id, new_start, new_end)
    }

    /// 合并环序相邻的两个分段. 语义与 [`SegmentRing::merge`] 一致.
    pub fn merge_segments(
        &mut self,
        first: SegmentId,
        second: SegmentId,
        new_id: SegmentId,
    ) -> Result<(), RingError> {
        self.ring.merge(first, second, new_id)
    }

    /// 分裂一个分段. 语义与 [`SegmentRing::split`] 一致.
    pub fn split_segment(
        &mut self,
        id: SegmentId,
        at: usize,
        left_id: SegmentId,
        right_id: SegmentId,
    ) -> Result<(), RingError> {
        self.ring.split(id, at, left_id, right_id)
    }

    /// 插入或移动界标. 位置按模环长回绕.
    pub fn set_landmark(&mut self, id: LandmarkId, position: usize) {
        self.landmarks.insert(id, position % self.len());
    }

    /// 查询界标位置.
    #[inline]
    pub fn landmark(&self, id: LandmarkId) -> Option<usize> {
        self.landmarks.get(&id).copied()
    }

    /// 全部界标 (按标识符升序).
    #[inline]
    pub fn landmarks(&self) -> &BTreeMap<LandmarkId, usize> {
        &self.landmarks
    }

    /// 将谱、分段边界与界标一起等比重采样到 `new_len`.
    ///
    /// 边界舍入方式保证结果仍精确铺满新环, 不产生缝隙, 也没有舍入造成的
    /// 一格重叠 (见 [`SegmentRing::rescale`]); 界标按同一比例舍入;
    /// 尺度元数据原样保留.
    pub fn interpolate(&self, new_len: usize) -> Result<SegmentedProfile, RingError> {
        let ring = self.ring.rescale(new_len)?;
        let profile = self.profile.interpolate(new_len);
        let ratio = new_len as f64 / self.len() as f64;
        let landmarks = self
            .landmarks
            .iter()
            .map(|(&id, &pos)| (id, (pos as f64 * ratio).round() as usize % new_len))
            .collect();
        Ok(SegmentedProfile {
            profile,
            ring,
            landmarks,
            scale: self.scale,
        })
    }

    /// 导出分段数据记录 (环序), 供外部结构化文档序列化器使用.
    pub fn segment_records(&self) -> Vec<SegmentRecord> {
        self.ring
            .iter()
            .map(|s| SegmentRecord {
                id: s.id(),
                start: s.start(),
                end: s.end(),
            })
            .collect()
    }

    /// 导出界标数据记录 (按标识符升序).
    pub fn landmark_records(&self) -> Vec<LandmarkRecord> {
        self.landmarks
            .iter()
            .map(|(&id, &position)| LandmarkRecord { id, position })
            .collect()
    }
}

/// 分段的朴素数据记录. 本 crate 不做 I/O, 只与外部序列化器交换这些三元组.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SegmentRecord {
    /// 分段标识符.
    pub id: SegmentId,
    /// 起点 (含).
    pub start: usize,
    /// 终点 (不含).
    pub end: usize,
}

/// 界标的朴素数据记录.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LandmarkRecord {
    /// 界标标识符.
    pub id: LandmarkId,
    /// 环位置.
    pub position: usize,
}

/// 谱的带标签变体: 普通谱或带分段谱.
///
/// 下游调用方原本需要反复询问 "这条谱分段了吗"; 这里把该分支落实为数据,
/// 共同的只读能力直接在变体上提供.
#[derive(Clone, Debug)]
pub enum AnyProfile {
    /// 未分段的普通谱.
    Plain(Profile),
    /// 带分段环的谱.
    Segmented(SegmentedProfile),
}

impl AnyProfile {
    /// 采样点个数.
    pub fn len(&self) -> usize {
        match self {
            AnyProfile::Plain(p) => p.len(),
            AnyProfile::Segmented(s) => s.len(),
        }
    }

    /// 谱永远非空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// 按环形语义读取采样值.
    pub fn get(&self, index: usize) -> f64 {
        match self {
            AnyProfile::Plain(p) => p.get(index),
            AnyProfile::Segmented(s) => s.get(index),
        }
    }

    /// 是否带分段.
    #[inline]
    pub fn is_segmented(&self) -> bool {
        matches!(self, AnyProfile::Segmented(_))
    }

    /// 借用底层谱.
    pub fn as_profile(&self) -> &Profile {
        match self {
            AnyProfile::Plain(p) => p,
            AnyProfile::Segmented(s) => s.profile(),
        }
    }

    /// 若带分段, 借用分段谱.
    pub fn as_segmented(&self) -> Option<&SegmentedProfile> {
        match self {
            AnyProfile::Plain(_) => None,
            AnyProfile::Segmented(s) => Some(s),
        }
    }

    /// 环形重采样. 分段谱保持分段不变量.
    pub fn interpolate(&self, new_len: usize) -> Result<AnyProfile, RingError> {
        match self {
            AnyProfile::Plain(p) => Ok(AnyProfile::Plain(p.interpolate(new_len))),
            AnyProfile::Segmented(s) => s.interpolate(new_len).map(AnyProfile::Segmented),
        }
    }
}
