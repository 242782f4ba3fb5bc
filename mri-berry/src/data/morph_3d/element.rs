//! 三维结构元.

use crate::consts::{DEFAULT_CONNECTIVITY, MAX_CONNECTIVITY};
use crate::{Error, Idx3d, Offset3d};
use itertools::iproduct;

/// 结构元连通性, 取值 `1..=3`.
///
/// 1 为 6-邻域 (共面), 2 为 18-邻域 (再加共棱), 3 为 26-邻域 (再加共顶点).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "u32", into = "u32")
)]
pub struct Connectivity(u8);

impl Connectivity {
    /// 6-邻域.
    pub const FACE: Self = Self(1);

    /// 18-邻域.
    pub const EDGE: Self = Self(2);

    /// 26-邻域.
    pub const CORNER: Self = Self(3);

    /// 创建连通性. `0` 非法; 大于 3 的值等价于 3 (三维空间中的最大邻域).
    pub fn new(c: u32) -> Result<Self, Error> {
        match c {
            0 => Err(Error::InvalidParameter {
                name: "connectivity",
                value: c.to_string(),
                reason: "must be at least 1",
            }),
            c => Ok(Self(c.min(MAX_CONNECTIVITY as u32) as u8)),
        }
    }

    /// 获取数值.
    #[inline]
    pub fn get(&self) -> u8 {
        self.0
    }
}

impl Default for Connectivity {
    #[inline]
    fn default() -> Self {
        Self(DEFAULT_CONNECTIVITY)
    }
}

impl TryFrom<u32> for Connectivity {
    type Error = Error;

    #[inline]
    fn try_from(c: u32) -> Result<Self, Self::Error> {
        Self::new(c)
    }
}

impl From<Connectivity> for u32 {
    #[inline]
    fn from(c: Connectivity) -> Self {
        c.0 as u32
    }
}

/// 3x3x3 二值结构元. 创建后不可变.
///
/// 偏移 `(dz, dh, dw)` 属于结构元当且仅当 `|dz| + |dh| + |dw| <= connectivity`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StructuringElement {
    pattern: [[[bool; 3]; 3]; 3],
    offsets: Vec<Offset3d>,
}

impl StructuringElement {
    /// 按连通性生成结构元.
    pub fn new(connectivity: Connectivity) -> Self {
        let c = connectivity.get() as usize;
        let mut pattern = [[[false; 3]; 3]; 3];
        let mut offsets = Vec::with_capacity(26);
        for (dz, dh, dw) in iproduct!(-1isize..=1, -1isize..=1, -1isize..=1) {
            let dist = dz.unsigned_abs() + dh.unsigned_abs() + dw.unsigned_abs();
            if dist > c {
                continue;
            }
            pattern[(dz + 1) as usize][(dh + 1) as usize][(dw + 1) as usize] = true;
            if dist != 0 {
                offsets.push((dz, dh, dw));
            }
        }
        Self { pattern, offsets }
    }

    /// 以 `[dz + 1][dh + 1][dw + 1]` 访问的 3x3x3 模式.
    #[inline]
    pub fn pattern(&self) -> &[[[bool; 3]; 3]; 3] {
        &self.pattern
    }

    /// 除中心外的所有邻居偏移.
    #[inline]
    pub fn offsets(&self) -> &[Offset3d] {
        &self.offsets
    }

    /// 结构元中为 `true` 的元素个数 (含中心).
    #[inline]
    pub fn len(&self) -> usize {
        self.offsets.len() + 1
    }

    /// 结构元总是至少包含中心.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// 获取 `pos` 在 `shape` 范围内的所有邻居. 越界的邻居被丢弃 (边界外视为背景).
    #[inline]
    pub fn neighbours(&self, pos: Idx3d, shape: Idx3d) -> impl Iterator<Item = Idx3d> + '_ {
        self.offsets
            .iter()
            .filter_map(move |off| shift(pos, *off, shape))
    }
}

/// 计算 `pos + off`, 越界时返回 `None`.
#[inline]
pub(crate) fn shift((z, h, w): Idx3d, (dz, dh, dw): Offset3d, (lz, lh, lw): Idx3d) -> Option<Idx3d> {
    let z = z.checked_add_signed(dz).filter(|v| *v < lz)?;
    let h = h.checked_add_signed(dh).filter(|v| *v < lh)?;
    let w = w.checked_add_signed(dw).filter(|v| *v < lw)?;
    Some((z, h, w))
}
