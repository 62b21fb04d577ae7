//! 布尔标记环.

/// 与 [`Profile`](super::Profile) 等长的布尔标记环, 主要承载极值检测结果.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlagRing {
    flags: Vec<bool>,
}

impl FlagRing {
    /// 构造全 `false` 的标记环. `len` 为 0 时 panic.
    pub fn new(len: usize) -> Self {
        assert_ne!(len, 0, "标记环长度至少为 1");
        Self {
            flags: vec![false; len],
        }
    }

    /// 标记环长度.
    #[inline]
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    /// 标记环永远非空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// 读取位置 `index` 的标记 (索引取模).
    #[inline]
    pub fn get(&self, index: usize) -> bool {
        self.flags[index % self.flags.len()]
    }

    /// 设置位置 `index` 的标记 (索引取模).
    #[inline]
    pub fn set(&mut self, index: usize, value: bool) {
        let n = self.flags.len();
        self.flags[index % n] = value;
    }

    /// 逐位或. 两环长度必须一致, 否则 panic.
    pub fn or(&self, other: &FlagRing) -> FlagRing {
        assert_eq!(self.len(), other.len(), "标记环长度不一致");
        FlagRing {
            flags: self
                .flags
                .iter()
                .zip(&other.flags)
                .map(|(&a, &b)| a || b)
                .collect(),
        }
    }

    /// 逐位与. 两环长度必须一致, 否则 panic.
    pub fn and(&self, other: &FlagRing) -> FlagRing {
        assert_eq!(self.len(), other.len(), "标记环长度不一致");
        FlagRing {
            flags: self
                .flags
                .iter()
                .zip(&other.flags)
                .map(|(&a, &b)| a && b)
                .collect(),
        }
    }

    /// 被标记的位置个数.
    pub fn count(&self) -> usize {
        self.flags.iter().filter(|&&b| b).count()
    }

    /// 按升序迭代被标记的位置.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.flags
            .iter()
            .enumerate()
            .filter(|(_, &b)| b)
            .map(|(i, _)| i)
    }
}
