//! 体数据的持久化存储.

use crate::{BrainMask, MriVolume, Result};
use std::path::Path;

/// 能够加载扫描/掩膜并保存扫描的存储.
///
/// 流水线只通过该 trait 访问存储, 测试时可以替换为内存实现.
pub trait VolumeStore {
    /// 加载扫描及其空间变换.
    fn load_volume(&self, path: &Path) -> Result<MriVolume>;

    /// 加载掩膜. 返回值已二值化.
    fn load_mask(&self, path: &Path) -> Result<BrainMask>;

    /// 保存扫描. 空间变换取自 `volume` 自身的 header.
    fn save_volume(&self, volume: &MriVolume, path: &Path) -> Result<()>;
}

/// 基于本地文件系统上 `.nii` / `.nii.gz` 文件的存储.
#[derive(Debug, Clone, Copy, Default)]
pub struct NiftiStore;

impl VolumeStore for NiftiStore {
    #[inline]
    fn load_volume(&self, path: &Path) -> Result<MriVolume> {
        MriVolume::open(path)
    }

    #[inline]
    fn load_mask(&self, path: &Path) -> Result<BrainMask> {
        BrainMask::open(path)
    }

    #[inline]
    fn save_volume(&self, volume: &MriVolume, path: &Path) -> Result<()> {
        volume.save(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, NiftiHeaderAttr};
    use ndarray::{Array3, Array4};
    use nifti::writer::WriterOptions;
    use nifti::NiftiHeader;

    /// 经由存储接口保存扫描后, 读回的数据与仿射矩阵一致.
    #[test]
    fn test_nifti_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub-01_defaced.nii.gz");
        let header = NiftiHeader {
            sform_code: 1,
            srow_x: [2.0, 0.0, 0.0, 1.0],
            srow_y: [0.0, 2.0, 0.0, 2.0],
            srow_z: [0.0, 0.0, 2.0, 3.0],
            ..Default::default()
        };
        let data = Array3::from_shape_fn((3, 4, 5), |(z, h, w)| (z + h + w) as f32 * 0.5);
        let vol = MriVolume::new(header, data);

        let store = NiftiStore;
        store.save_volume(&vol, &path).unwrap();
        let back = store.load_volume(&path).unwrap();
        assert_eq!(back.data(), vol.data());
        assert_eq!(back.affine(), vol.affine());
    }

    /// 读取掩膜时按 `> 0` 二值化.
    #[test]
    fn test_nifti_store_mask_is_binarized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.nii");
        let mut raw = Array3::<f32>::zeros((2, 2, 2));
        raw[(0, 0, 0)] = 0.3;
        raw[(0, 0, 1)] = 2.7;
        raw[(1, 1, 1)] = -1.0;
        MriVolume::new(NiftiHeader::default(), raw).save(&path).unwrap();

        let mask = NiftiStore.load_mask(&path).unwrap();
        assert_eq!(mask.area(), 2);
        assert_eq!(mask[(0, 0, 0)], 1);
        assert_eq!(mask[(0, 0, 1)], 1);
        assert_eq!(mask[(1, 1, 1)], 0);
    }

    /// 四维数据不能作为掩膜.
    #[test]
    fn test_nifti_store_rejects_4d() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("series.nii");
        let data = Array4::<f32>::ones((2, 2, 2, 3));
        WriterOptions::new(&path).write_nifti(&data).unwrap();

        assert!(matches!(
            NiftiStore.load_mask(&path),
            Err(Error::Shape { ndim: 4, .. })
        ));
    }

    /// 文件不存在时返回 I/O 类错误.
    #[test]
    fn test_nifti_store_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let e = NiftiStore
            .load_volume(&dir.path().join("nope.nii.gz"))
            .unwrap_err();
        assert!(matches!(e, Error::Nifti(_) | Error::Io(_)));
    }
}
