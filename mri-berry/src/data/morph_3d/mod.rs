//! 3D 二值形态学膨胀.
//!
//! 膨胀的每一轮都作用在上一轮的结果上: 某体素在本轮变为前景,
//! 当且仅当它本身是前景, 或其结构元邻域内存在上一轮的前景体素.
//! 体数据边界之外视为背景, 不会环绕.

use self::frontier::Frontier;
use crate::consts::gray::*;
use crate::consts::DEFAULT_DILATION_ITERATIONS;
use crate::{Error, Idx3d, Result};
use ndarray::{Array, Array3, ArrayBase, ArrayView3, Data, Dimension, Ix3};
use num::Zero;

mod element;
mod frontier;

pub use element::{Connectivity, StructuringElement};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use ndarray::Axis;
        use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
    }
}

/// 膨胀参数.
///
/// `iterations` 是膨胀轮数, 它只是物理膨胀半径的代理 (单位是体素而非毫米,
/// 实际半径还取决于连通性和体素间距).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DilationParams {
    /// 膨胀轮数. 为 0 时仅做二值化.
    pub iterations: u32,

    /// 结构元连通性.
    pub connectivity: Connectivity,
}

impl Default for DilationParams {
    /// 25 轮, 6-邻域.
    fn default() -> Self {
        Self {
            iterations: DEFAULT_DILATION_ITERATIONS,
            connectivity: Connectivity::default(),
        }
    }
}

impl DilationParams {
    /// 创建膨胀参数. `connectivity` 非法时返回 `Err`.
    pub fn new(iterations: u32, connectivity: u32) -> Result<Self> {
        Ok(Self {
            iterations,
            connectivity: Connectivity::new(connectivity)?,
        })
    }
}

/// 膨胀结果.
#[derive(Clone, Debug)]
pub struct Dilated {
    /// 膨胀后的二值掩膜, 只含 0/1.
    pub mask: Array3<u8>,

    /// 二值化后、膨胀前的前景体素个数.
    pub area_before: usize,

    /// 膨胀后的前景体素个数. 总是不小于 `area_before`.
    pub area_after: usize,
}

/// 二值化. 所有大于 0 的值映射为 [`MASK_FOREGROUND`], 其余
/// (包括 0, 负数和 `NaN`) 映射为 [`MASK_BACKGROUND`].
pub fn binarize<S, T, D>(data: &ArrayBase<S, D>) -> Array<u8, D>
where
    S: Data<Elem = T>,
    T: PartialOrd + Zero,
    D: Dimension,
{
    let zero = T::zero();
    data.map(|v| {
        if *v > zero {
            MASK_FOREGROUND
        } else {
            MASK_BACKGROUND
        }
    })
}

/// 统计前景体素个数.
#[inline]
fn count_foreground(data: &Array3<u8>) -> usize {
    data.iter().filter(|p| is_foreground(**p)).count()
}

/// 对任意维数的掩膜进行膨胀. 掩膜不是三维时返回 [`Error::Shape`].
///
/// 输入不要求严格为 0/1, 会先二值化.
pub fn dilate<S, T, D>(mask: &ArrayBase<S, D>, params: &DilationParams) -> Result<Dilated>
where
    S: Data<Elem = T>,
    T: PartialOrd + Zero,
    D: Dimension,
{
    let view = mask
        .view()
        .into_dimensionality::<Ix3>()
        .map_err(|_| Error::shape(mask.shape()))?;
    Ok(dilate_3d(view, params))
}

/// 对三维掩膜进行膨胀.
///
/// 内部只沿前沿扩张: 每一轮仅访问上一轮新变为前景的体素的邻居,
/// 结果与 `params.iterations` 次 [`dilate_step`] 完全一致. 前沿为空时提前结束.
pub fn dilate_3d<T>(mask: ArrayView3<T>, params: &DilationParams) -> Dilated
where
    T: PartialOrd + Zero,
{
    let mut out = binarize(&mask);
    let area_before = count_foreground(&out);
    let element = StructuringElement::new(params.connectivity);
    let shape = out.dim();

    let mut db = Frontier::with_capacity(1024);
    if params.iterations > 0 {
        // 只有邻域内存在背景的前景体素才可能向外扩张.
        for (pos, _) in out.indexed_iter().filter(|(_, p)| is_foreground(**p)) {
            if element
                .neighbours(pos, shape)
                .any(|n| is_background(out[n]))
            {
                db.push_pos(pos);
            }
        }
    }

    let mut area_after = area_before;
    for _ in 0..params.iterations {
        if db.is_exhausted() {
            break;
        }
        for pos in db.take_positions() {
            for n in element.neighbours(pos, shape) {
                if is_background(out[n]) {
                    out[n] = MASK_FOREGROUND;
                    area_after += 1;
                    db.push_pos_next(n);
                }
            }
        }
        db.step();
    }
    debug_assert_eq!(area_after, count_foreground(&out));

    Dilated {
        mask: out,
        area_before,
        area_after,
    }
}

/// 判断 `pos` 在一轮膨胀后是否为前景.
#[inline]
fn dilated_at(mask: &ArrayView3<u8>, element: &StructuringElement, pos: Idx3d) -> u8 {
    let hit = is_foreground(mask[pos])
        || element
            .neighbours(pos, mask.dim())
            .any(|n| is_foreground(mask[n]));
    if hit {
        MASK_FOREGROUND
    } else {
        MASK_BACKGROUND
    }
}

/// 对二值掩膜做一轮完整的膨胀, 返回新数组.
pub fn dilate_step(mask: ArrayView3<u8>, element: &StructuringElement) -> Array3<u8> {
    Array3::from_shape_fn(mask.dim(), |pos| dilated_at(&mask, element, pos))
}

/// 借助 `rayon`, 按 z 方向水平切片并行地执行完整轮次的膨胀.
///
/// 结果与 [`dilate_3d`] 一致. 某一轮结果不再变化时提前结束.
#[cfg(feature = "rayon")]
pub fn par_dilate_3d<T>(mask: ArrayView3<T>, params: &DilationParams) -> Dilated
where
    T: PartialOrd + Zero,
{
    let mut cur = binarize(&mask);
    let area_before = count_foreground(&cur);
    let element = StructuringElement::new(params.connectivity);

    for _ in 0..params.iterations {
        let mut next = Array3::<u8>::zeros(cur.dim());
        let src = cur.view();
        next.axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .for_each(|(z, mut sli)| {
                for ((h, w), p) in sli.indexed_iter_mut() {
                    *p = dilated_at(&src, &element, (z, h, w));
                }
            });
        if next == cur {
            break;
        }
        cur = next;
    }

    let area_after = count_foreground(&cur);
    Dilated {
        mask: cur,
        area_before,
        area_after,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, ArrayD, IxDyn};

    fn params(iterations: u32, connectivity: u32) -> DilationParams {
        DilationParams::new(iterations, connectivity).unwrap()
    }

    /// 一个确定性的、稀疏的 "噪声" 掩膜.
    fn noisy_mask(shape: Idx3d) -> Array3<f32> {
        Array3::from_shape_fn(shape, |(z, h, w)| match (z * 7 + h * 13 + w * 29) % 31 {
            0 => 1.0,
            1 => 0.3,
            2 => -2.0,
            _ => 0.0,
        })
    }

    /// 迭代 0 次等价于二值化.
    #[test]
    fn test_zero_iterations_is_binarize() {
        let m = noisy_mask((6, 7, 8));
        for c in 1..=3 {
            let d = dilate_3d(m.view(), &params(0, c));
            assert_eq!(d.mask, binarize(&m));
            assert_eq!(d.area_before, d.area_after);
        }
    }

    /// 5x5x5 中心单点, 6-邻域膨胀 1 次得到 7 个体素.
    #[test]
    fn test_center_voxel_face() {
        let mut m = Array3::<u8>::zeros((5, 5, 5));
        m[(2, 2, 2)] = 1;
        let d = dilate_3d(m.view(), &params(1, 1));
        assert_eq!(d.area_before, 1);
        assert_eq!(d.area_after, 7);
        for pos in [
            (2, 2, 2),
            (1, 2, 2),
            (3, 2, 2),
            (2, 1, 2),
            (2, 3, 2),
            (2, 2, 1),
            (2, 2, 3),
        ] {
            assert_eq!(d.mask[pos], 1);
        }
    }

    /// 连通性 2, 3 分别得到 19, 27 个体素.
    #[test]
    fn test_center_voxel_edge_and_corner() {
        let mut m = Array3::<u8>::zeros((5, 5, 5));
        m[(2, 2, 2)] = 1;
        assert_eq!(dilate_3d(m.view(), &params(1, 2)).area_after, 19);
        assert_eq!(dilate_3d(m.view(), &params(1, 3)).area_after, 27);
        // 6-邻域膨胀两次得到半径为 2 的菱形: 1 + 6 + 18.
        assert_eq!(dilate_3d(m.view(), &params(2, 1)).area_after, 25);
    }

    /// 角点膨胀不会环绕到另一侧.
    #[test]
    fn test_corner_voxel_no_wrap() {
        let mut m = Array3::<u8>::zeros((3, 3, 3));
        m[(0, 0, 0)] = 1;
        let d = dilate_3d(m.view(), &params(1, 1));
        assert_eq!(d.area_after, 4);
        let mut fg: Vec<Idx3d> = d
            .mask
            .indexed_iter()
            .filter_map(|(pos, p)| (*p == 1).then_some(pos))
            .collect();
        fg.sort();
        assert_eq!(fg, vec![(0, 0, 0), (0, 0, 1), (0, 1, 0), (1, 0, 0)]);
        assert_eq!(d.mask[(2, 2, 2)], 0);
    }

    /// 全零掩膜膨胀后仍是全零.
    #[test]
    fn test_all_zero_mask() {
        let m = Array3::<f32>::zeros((4, 5, 6));
        for c in 1..=3 {
            for n in [0, 1, 25] {
                let d = dilate_3d(m.view(), &params(n, c));
                assert_eq!(d.area_before, 0);
                assert_eq!(d.area_after, 0);
                assert!(d.mask.iter().all(|p| *p == 0));
            }
        }
    }

    /// 全前景掩膜膨胀后不变.
    #[test]
    fn test_all_foreground_mask() {
        let m = Array3::<f32>::from_elem((3, 4, 5), 2.5);
        let d = dilate_3d(m.view(), &params(25, 1));
        assert_eq!(d.area_before, 60);
        assert_eq!(d.area_after, 60);
        assert!(d.mask.iter().all(|p| *p == 1));
    }

    /// 非二值输入: 只有 `-1` 被当作背景.
    #[test]
    fn test_non_binary_values() {
        let mut m = Array3::<f32>::zeros((1, 1, 3));
        m[(0, 0, 0)] = 0.3;
        m[(0, 0, 1)] = 2.7;
        m[(0, 0, 2)] = -1.0;
        let d = dilate_3d(m.view(), &params(0, 1));
        assert_eq!(d.mask.as_slice().unwrap(), &[1, 1, 0]);
        assert_eq!(d.area_before, 2);

        let d = dilate_3d(m.view(), &params(1, 1));
        assert_eq!(d.mask.as_slice().unwrap(), &[1, 1, 1]);
    }

    /// 前沿实现与逐轮完整膨胀一致, 且随迭代次数单调.
    #[test]
    fn test_frontier_matches_full_steps() {
        let m = noisy_mask((9, 8, 7));
        for c in 1..=3 {
            let element = StructuringElement::new(Connectivity::new(c).unwrap());
            let mut oracle = binarize(&m);
            let mut prev_area = count_foreground(&oracle);
            for n in 1..=4 {
                let next = dilate_step(oracle.view(), &element);
                // 单调: 上一轮的前景在本轮仍是前景.
                assert!(oracle
                    .iter()
                    .zip(next.iter())
                    .all(|(a, b)| *a == 0 || *b == 1));
                oracle = next;

                let d = dilate_3d(m.view(), &params(n, c));
                assert_eq!(d.mask, oracle, "connectivity {c}, iterations {n}");
                assert!(d.area_after >= prev_area);
                prev_area = d.area_after;
            }
        }
    }

    /// 每一轮作用在上一轮结果上, 而非每次都作用在原始掩膜上.
    #[test]
    fn test_iterations_accumulate() {
        let mut m = Array3::<u8>::zeros((1, 1, 9));
        m[(0, 0, 4)] = 1;
        let d = dilate_3d(m.view(), &params(3, 1));
        assert_eq!(d.mask.as_slice().unwrap(), &[0, 1, 1, 1, 1, 1, 1, 1, 0]);
    }

    /// 输入不会被修改.
    #[test]
    fn test_input_untouched() {
        let m = noisy_mask((5, 5, 5));
        let before = m.clone();
        let _ = dilate_3d(m.view(), &params(3, 2));
        assert_eq!(m, before);
    }

    /// 非三维掩膜返回 `Error::Shape`.
    #[test]
    fn test_wrong_rank() {
        let m = Array1::<f32>::ones(8);
        let e = dilate(&m, &params(1, 1)).unwrap_err();
        assert!(matches!(e, Error::Shape { ndim: 1, .. }));

        let m = ArrayD::<f32>::zeros(IxDyn(&[2, 2, 2, 2]));
        assert!(matches!(
            dilate(&m, &params(1, 1)),
            Err(Error::Shape { ndim: 4, .. })
        ));

        let m = ArrayD::<f32>::ones(IxDyn(&[2, 3, 4]));
        let d = dilate(&m, &params(1, 1)).unwrap();
        assert_eq!(d.area_after, 24);
    }

    /// 并行实现与前沿实现一致.
    #[cfg(feature = "rayon")]
    #[test]
    fn test_par_dilate_matches() {
        let m = noisy_mask((10, 9, 8));
        for c in 1..=3 {
            for n in [0, 1, 3, 25] {
                let p = params(n, c);
                let a = dilate_3d(m.view(), &p);
                let b = par_dilate_3d(m.view(), &p);
                assert_eq!(a.mask, b.mask);
                assert_eq!(a.area_before, b.area_before);
                assert_eq!(a.area_after, b.area_after);
            }
        }
    }
}
