//! 分段规则集.

use either::Either;
use once_cell::sync::Lazy;

use crate::consts;

/// 极值检测窗口宽度: 绝对采样数 (`Left`), 或环长的比例 (`Right`).
///
/// 比例形式用于让不同周长的细胞核得到一致的弯曲尺度.
pub type Window = Either<usize, f64>;

/// 控制自动分段与环形不变量的规则集.
///
/// 这些量按形状 schema 配置, 不同细胞类型可以使用不同的规则集;
/// 默认值见 [`crate::consts`].
#[derive(Clone, Debug)]
pub struct SegmentRuleset {
    /// 分段长度下限 (采样数). 提高该值让分段更稳健, 但降低分辨率.
    pub min_segment_len: usize,

    /// 平滑窗口 (两侧各取该数量的采样).
    pub smooth_window: usize,

    /// 极值检测窗口.
    pub window: Window,

    /// 差分窗口 (二阶差分近似用).
    pub delta_window: usize,

    /// 内角阈值 (单位: 度). 极大值须高于它, 极小值须低于它.
    pub angle_threshold: f64,

    /// 有效拐点的二阶差分幅度下限, 以全谱差分范围的比例表示.
    pub min_delta_fraction: f64,
}

impl SegmentRuleset {
    /// 构造并校验规则集. 非法参数 panic.
    pub fn new(
        min_segment_len: usize,
        smooth_window: usize,
        window: Window,
        delta_window: usize,
        angle_threshold: f64,
        min_delta_fraction: f64,
    ) -> Self {
        assert!(min_segment_len >= 1, "分段长度下限至少为 1");
        assert!(smooth_window >= 1, "平滑窗口至少为 1");
        assert!(delta_window >= 1, "差分窗口至少为 1");
        match window {
            Either::Left(w) => assert!(w >= 1, "极值窗口至少为 1"),
            Either::Right(f) => {
                assert!(f > 0.0 && f < 0.5, "比例窗口必须位于 (0, 0.5)")
            }
        }
        assert!(angle_threshold.is_finite(), "内角阈值必须有限");
        assert!(
            min_delta_fraction > 0.0 && min_delta_fraction < 1.0,
            "拐点强度比例必须位于 (0, 1)"
        );
        Self {
            min_segment_len,
            smooth_window,
            window,
            delta_window,
            angle_threshold,
            min_delta_fraction,
        }
    }

    /// 对长度为 `len` 的谱解析出实际极值窗口宽度 (至少为 1).
    pub fn window_for(&self, len: usize) -> usize {
        match self.window {
            Either::Left(w) => w.max(1),
            Either::Right(frac) => ((len as f64 * frac).round() as usize).max(1),
        }
    }
}

impl Default for SegmentRuleset {
    fn default() -> Self {
        Self::new(
            consts::DEFAULT_MIN_SEGMENT_LEN,
            consts::DEFAULT_SMOOTH_WINDOW,
            Either::Left(consts::DEFAULT_EXTREMUM_WINDOW),
            consts::DEFAULT_DELTA_WINDOW,
            consts::DEFAULT_ANGLE_THRESHOLD,
            consts::DEFAULT_MIN_DELTA_FRACTION,
        )
    }
}

/// 共享的默认规则集.
pub static DEFAULT_RULESET: Lazy<SegmentRuleset> = Lazy::new(SegmentRuleset::default);
