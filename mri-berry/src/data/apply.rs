//! 将二值掩膜作用于扫描.

use super::check_same_shape;
use crate::{BrainMask, MriVolume, Result};
use ndarray::{Array3, ArrayView3, Zip};

/// 逐体素计算 `volume[i] * mask[i]`, 返回新数组.
///
/// 两者形状不一致时返回 [`crate::Error::DimensionMismatch`].
pub fn apply_mask_array(volume: ArrayView3<f32>, mask: ArrayView3<u8>) -> Result<Array3<f32>> {
    check_same_shape(volume.dim(), mask.dim())?;
    Ok(Zip::from(&volume)
        .and(&mask)
        .map_collect(|v, m| *v * f32::from(*m)))
}

/// 将膨胀后的掩膜作用于原始扫描, 非脑组织体素置零, 脑组织体素原样保留.
///
/// 返回的扫描使用 `volume` 的 header (包括空间变换) 的拷贝; 输入不会被修改,
/// 因此用同一掩膜重复作用的结果不变.
pub fn apply_mask(volume: &MriVolume, mask: &BrainMask) -> Result<MriVolume> {
    let data = apply_mask_array(volume.data(), mask.data())?;
    volume.with_data(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dilate_3d, DilationParams, Error, NiftiHeaderAttr};
    use nifti::NiftiHeader;

    fn header() -> NiftiHeader {
        NiftiHeader {
            sform_code: 2,
            srow_x: [0.9, 0.0, 0.1, -90.0],
            srow_y: [0.0, 1.1, 0.0, -120.5],
            srow_z: [0.0, 0.0, 1.2, -60.25],
            ..Default::default()
        }
    }

    fn ramp(shape: (usize, usize, usize)) -> MriVolume {
        let data = Array3::from_shape_fn(shape, |(z, h, w)| 1.0 + (z * 31 + h * 7 + w) as f32);
        MriVolume::new(header(), data)
    }

    fn mask_with(shape: (usize, usize, usize), fg: &[(usize, usize, usize)]) -> BrainMask {
        let mut raw = Array3::<u8>::zeros(shape);
        for pos in fg {
            raw[*pos] = 1;
        }
        BrainMask::from_array(NiftiHeader::default(), raw.view())
    }

    /// 5x5x5 全 1 扫描, 中心单点膨胀后作用, 恰好 7 个非零体素且都为 1.
    #[test]
    fn test_apply_center_scenario() {
        let vol = MriVolume::new(header(), Array3::ones((5, 5, 5)));
        let mask = mask_with((5, 5, 5), &[(2, 2, 2)]);
        let (mask, areas) = mask.dilated(&DilationParams::new(1, 1).unwrap());
        assert_eq!(areas, (1, 7));
        assert_eq!(mask.area(), 7);

        let out = apply_mask(&vol, &mask).unwrap();
        assert_eq!(out.count_nonzero(), 7);
        assert!(out.data().iter().filter(|v| **v != 0.0).all(|v| *v == 1.0));
        assert_eq!(out[(2, 2, 3)], 1.0);
        assert_eq!(out[(0, 0, 0)], 0.0);
    }

    /// 作用结果逐体素等于 `volume * mask`.
    #[test]
    fn test_apply_values() {
        let vol = ramp((3, 4, 5));
        let mask = mask_with((3, 4, 5), &[(0, 0, 0), (1, 2, 3), (2, 3, 4)]);
        let out = apply_mask(&vol, &mask).unwrap();
        for ((pos, v), m) in out.data().indexed_iter().zip(mask.data().iter()) {
            if *m == 1 {
                assert_eq!(*v, vol[pos]);
            } else {
                assert_eq!(*v, 0.0);
            }
        }
    }

    /// 重复作用结果不变.
    #[test]
    fn test_apply_idempotent() {
        let vol = ramp((4, 4, 4));
        let raw = Array3::from_shape_fn((4, 4, 4), |(z, h, w)| ((z + 2 * h + w) % 3) as f32);
        let mask = BrainMask::from_array(NiftiHeader::default(), raw.view());
        let once = apply_mask(&vol, &mask).unwrap();
        let twice = apply_mask(&once, &mask).unwrap();
        assert_eq!(once.data(), twice.data());
    }

    /// 输出保留输入扫描的空间变换, 而不是掩膜的.
    #[test]
    fn test_apply_preserves_affine() {
        let vol = ramp((2, 3, 4));
        let mask = mask_with((2, 3, 4), &[(1, 1, 1)]);
        let out = apply_mask(&vol, &mask).unwrap();
        assert_eq!(out.affine(), vol.affine());
        assert_ne!(out.affine(), mask.affine());
        assert_eq!(out.header().srow_z, [0.0, 0.0, 1.2, -60.25]);
    }

    /// 形状不一致时报错.
    #[test]
    fn test_apply_dimension_mismatch() {
        let vol = ramp((5, 5, 5));
        let mask = mask_with((4, 4, 4), &[]);
        match apply_mask(&vol, &mask) {
            Err(Error::DimensionMismatch { volume, mask }) => {
                assert_eq!(volume, (5, 5, 5));
                assert_eq!(mask, (4, 4, 4));
            }
            other => panic!("expected DimensionMismatch, got {other:?}"),
        }
    }

    /// 与原始数组接口一致.
    #[test]
    fn test_apply_array_with_dilated() {
        let vol = ramp((6, 6, 6));
        let mut raw = Array3::<f32>::zeros((6, 6, 6));
        raw[(3, 3, 3)] = 0.5;
        let d = dilate_3d(raw.view(), &DilationParams::new(2, 3).unwrap());
        let out = apply_mask_array(vol.data(), d.mask.view()).unwrap();
        assert_eq!(out.iter().filter(|v| **v != 0.0).count(), d.area_after);
        assert_eq!(d.area_after, 125);
    }
}
