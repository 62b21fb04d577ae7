//! 形状偏差网格.
//!
//! 网格把参考形状 (一般是种群共识) 与单个主体形状按界标对应关系
//! 连接起来: 每个对应采样一对顶点, 环上相邻顶点之间一条边.
//! 边存储主体/参考的长度比, 其 log2 形式对收缩与扩张对称,
//! 由 [`DeviationPalette`] 渲染为双色梯度.

use itertools::izip;
use num::ToPrimitive;

use crate::{consts, Point2d};

/// 网格创建错误.
///
/// 种群级调用方按核捕获该错误并剔除对应主体
/// (见 [`compare_population`](crate::consensus::compare_population)),
/// 单个坏核不会中止整个种群任务.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    /// 参考与主体的顶点数不一致.
    VertexCountMismatch {
        /// 参考形状顶点数.
        reference: usize,
        /// 主体形状顶点数.
        subject: usize,
    },

    /// 顶点数过少, 构不成环.
    TooFewVertices(usize),

    /// 参考形状第 `index` 条边长度为 0, 比值无定义.
    DegenerateEdge {
        /// 边序号.
        index: usize,
    },
}

/// 界标对应的一对顶点: 同一环位置上的参考点与主体点.
#[derive(Clone, Copy, Debug)]
pub struct MeshVertex {
    /// 环位置 (即顶点序号).
    pub index: usize,
    /// 参考形状上的位置.
    pub reference: Point2d,
    /// 主体形状上的位置.
    pub subject: Point2d,
}

/// 连接环上相邻顶点的边.
#[derive(Clone, Copy, Debug)]
pub struct MeshEdge {
    /// 第一个顶点序号.
    pub a: usize,
    /// 第二个顶点序号 (恒不等于 `a`).
    pub b: usize,
    /// `len(主体边) / len(参考边)`.
    pub ratio: f64,
}

impl MeshEdge {
    /// 比值的对数形式: 比值 1 映射为 0, 收缩为负, 扩张为正.
    #[inline]
    pub fn log2_ratio(&self) -> f64 {
        self.ratio.log2()
    }
}

/// 参考形状与主体形状之间的偏差网格.
///
/// 边集合镜像一个闭合环, 与分段拓扑一致; 每条边引用两个互异顶点.
#[derive(Clone, Debug)]
pub struct Mesh {
    vertices: Vec<MeshVertex>,
    edges: Vec<MeshEdge>,
}

impl Mesh {
    /// 以界标对应关系比较参考形状与主体形状.
    ///
    /// 两形状的顶点数必须一致且至少为 3, 否则返回专用创建错误;
    /// 参考形状不得含有零长度边.
    pub fn compare(reference: &[Point2d], subject: &[Point2d]) -> Result<Mesh, MeshError> {
        if reference.len() != subject.len() {
            return Err(MeshError::VertexCountMismatch {
                reference: reference.len(),
                subject: subject.len(),
            });
        }
        if reference.len() < 3 {
            return Err(MeshError::TooFewVertices(reference.len()));
        }

        let vertices: Vec<MeshVertex> = izip!(reference.iter(), subject.iter())
            .enumerate()
            .map(|(index, (&r, &s))| MeshVertex {
                index,
                reference: r,
                subject: s,
            })
            .collect();

        let n = vertices.len();
        let mut edges = Vec::with_capacity(n);
        for a in 0..n {
            let b = (a + 1) % n;
            let ref_len = distance(reference[a], reference[b]);
            if ref_len == 0.0 {
                return Err(MeshError::DegenerateEdge { index: a });
            }
            let sub_len = distance(subject[a], subject[b]);
            edges.push(MeshEdge {
                a,
                b,
                ratio: sub_len / ref_len,
            });
        }
        Ok(Mesh { vertices, edges })
    }

    /// 顶点 (环序).
    #[inline]
    pub fn vertices(&self) -> &[MeshVertex] {
        &self.vertices
    }

    /// 边 (环序; 第 `i` 条边连接顶点 `i` 与 `i + 1`).
    #[inline]
    pub fn edges(&self) -> &[MeshEdge] {
        &self.edges
    }

    /// 顶点个数.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// 边个数 (闭合环, 恒等于顶点个数).
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// 全部边比值的 log2 均值, 正值代表主体整体扩张.
    pub fn mean_log2_ratio(&self) -> f64 {
        self.edges.iter().map(MeshEdge::log2_ratio).sum::<f64>() / self.edges.len() as f64
    }

    /// 网格边数据记录 (供外部序列化器使用).
    pub fn edge_records(&self) -> Vec<MeshEdgeRecord> {
        self.edges
            .iter()
            .map(|e| MeshEdgeRecord {
                a: e.a,
                b: e.b,
                ratio: e.ratio,
            })
            .collect()
    }
}

/// 网格边的朴素数据记录.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeshEdgeRecord {
    /// 第一个顶点序号.
    pub a: usize,
    /// 第二个顶点序号.
    pub b: usize,
    /// 主体/参考长度比.
    pub ratio: f64,
}

/// 两点欧氏距离.
#[inline]
fn distance((x1, y1): Point2d, (x2, y2): Point2d) -> f64 {
    ((x1 - x2).powi(2) + (y1 - y2).powi(2)).sqrt()
}

/// 偏差配色: log2 比值的对称双色映射.
///
/// 比值 1 (log2 = 0) 为中性黑; 比值小于 1 向蓝色方向渐变 (收缩),
/// 大于 1 向红色方向渐变 (扩张); 幅度达到 `max_log2` 后饱和到端点色.
#[derive(Clone, Copy, Debug)]
pub struct DeviationPalette {
    max_log2: f64,
}

impl DeviationPalette {
    /// 以饱和幅度构造配色. 非正或非有限时 panic.
    pub fn new(max_log2: f64) -> Self {
        assert!(
            max_log2.is_finite() && max_log2 > 0.0,
            "饱和幅度必须为正有限数"
        );
        Self { max_log2 }
    }

    /// 饱和幅度.
    #[inline]
    pub fn max_log2(&self) -> f64 {
        self.max_log2
    }

    /// 比值 `ratio` 对应的 RGB 颜色.
    #[inline]
    pub fn colour(&self, ratio: f64) -> [u8; 3] {
        self.colour_log2(ratio.log2())
    }

    /// log2 比值对应的 RGB 颜色.
    pub fn colour_log2(&self, log2_ratio: f64) -> [u8; 3] {
        if log2_ratio <= 0.0 {
            [0, 0, self.channel(log2_ratio)]
        } else {
            [self.channel(log2_ratio), 0, 0]
        }
    }

    /// 单通道梯度: 幅度占饱和幅度的比例映射到 `0..=255`.
    fn channel(&self, v: f64) -> u8 {
        let fraction = (v.abs() / self.max_log2).min(1.0);
        (255.0 * fraction).round().to_u8().unwrap_or(u8::MAX)
    }
}

impl Default for DeviationPalette {
    fn default() -> Self {
        Self::new(consts::DEFAULT_DEVIATION_SATURATION)
    }
}
