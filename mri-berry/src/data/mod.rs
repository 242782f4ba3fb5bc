use std::ops::Index;
use std::path::Path;

use ndarray::{Array3, ArrayView, ArrayView3, Ix3};
use nifti::writer::WriterOptions;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};

use crate::consts::gray::*;
use crate::{Error, Idx3d, Result};

pub mod apply;
pub mod morph_3d;

/// `NiftiHeader` 是栈上大对象, 移动该对象的开销很可观.
/// 因此我们将其分配到堆上.
type BoxedHeader = Box<NiftiHeader>;

/// 4x4 仿射矩阵, 行优先. 将 NIfTI 体素索引 `(i, j, k)` (即 `(w, h, z)`)
/// 映射为物理坐标 (毫米).
pub type Affine = [[f64; 4]; 4];

/// 3D nii 文件 header 的共用属性.
///
/// header 是空间变换的载体: 流水线只拷贝它, 从不修改其中的空间信息.
pub trait NiftiHeaderAttr {
    /// 获取 header 部分.
    fn header(&self) -> &NiftiHeader;

    /// 获取单个体素分辨率. 该分辨率以毫米为单位, 分别代表空间 (相邻切片方向),
    /// 高, 宽.
    #[inline]
    fn pix_dim(&self) -> [f64; 3] {
        let [_, w, h, z, ..] = self.header().pixdim;
        [z as f64, h as f64, w as f64]
    }

    /// 获取体素的实际体积值, 以立方毫米为单位.
    #[inline]
    fn voxel(&self) -> f64 {
        self.pix_dim().iter().product()
    }

    /// 获取体素索引到物理坐标的仿射矩阵.
    ///
    /// 优先使用 sform (`sform_code > 0`), 其次 qform (`qform_code > 0`),
    /// 都不可用时退化为按 pixdim 缩放的对角阵.
    fn affine(&self) -> Affine {
        affine_from_header(self.header())
    }
}

/// 见 [`NiftiHeaderAttr::affine`].
pub fn affine_from_header(h: &NiftiHeader) -> Affine {
    if h.sform_code > 0 {
        let row = |r: &[f32; 4]| r.map(f64::from);
        return [
            row(&h.srow_x),
            row(&h.srow_y),
            row(&h.srow_z),
            [0.0, 0.0, 0.0, 1.0],
        ];
    }

    let [qfac, dx, dy, dz, ..] = h.pixdim.map(f64::from);
    if h.qform_code > 0 {
        let (b, c, d) = (
            f64::from(h.quatern_b),
            f64::from(h.quatern_c),
            f64::from(h.quatern_d),
        );
        let a = (1.0 - (b * b + c * c + d * d)).max(0.0).sqrt();
        let qfac = if qfac < 0.0 { -1.0 } else { 1.0 };
        let r = [
            [a * a + b * b - c * c - d * d, 2.0 * (b * c - a * d), 2.0 * (b * d + a * c)],
            [2.0 * (b * c + a * d), a * a + c * c - b * b - d * d, 2.0 * (c * d - a * b)],
            [2.0 * (b * d - a * c), 2.0 * (c * d + a * b), a * a + d * d - b * b - c * c],
        ];
        let scale = [dx, dy, dz * qfac];
        let offset = [h.quatern_x, h.quatern_y, h.quatern_z].map(f64::from);
        let mut ans = [[0.0; 4]; 4];
        for i in 0..3 {
            for j in 0..3 {
                ans[i][j] = r[i][j] * scale[j];
            }
            ans[i][3] = offset[i];
        }
        ans[3][3] = 1.0;
        return ans;
    }

    [
        [dx, 0.0, 0.0, 0.0],
        [0.0, dy, 0.0, 0.0],
        [0.0, 0.0, dz, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]
}

/// 读取 nii 文件并转换为 `(z, H, W)` 组织的 `f32` 数组.
///
/// 非三维数据返回 [`Error::Shape`].
fn read_f32(path: &Path) -> Result<(BoxedHeader, Array3<f32>)> {
    let obj = ReaderOptions::new().read_file(path)?;
    let header = Box::new(obj.header().clone());

    let data = obj.into_volume().into_ndarray::<f32>()?;
    let shape = data.shape().to_vec();
    let data = data
        .into_dimensionality::<Ix3>()
        .map_err(|_| Error::shape(&shape))?;

    // [W, H, z] -> [z, H, W].
    // hint: 原第一维向下增长, 原第二维向右增长.
    let data = data.permuted_axes([2, 1, 0]);
    let data = if data.is_standard_layout() {
        data
    } else {
        data.as_standard_layout().to_owned()
    };
    Ok((header, data))
}

/// 生成写出 nii 文件时使用的参考 header.
///
/// 数据已处于物理单位, 因此缩放参数被重置为 `slope = 1, inter = 0`.
/// 其余字段 (包括空间变换) 原样保留.
fn reference_header(header: &NiftiHeader) -> NiftiHeader {
    let mut ans = header.clone();
    ans.scl_slope = 1.0;
    ans.scl_inter = 0.0;
    ans
}

/// 检查两个形状是否一致, 否则返回 [`Error::DimensionMismatch`].
#[inline]
pub(crate) fn check_same_shape(volume: Idx3d, mask: Idx3d) -> Result<()> {
    if volume == mask {
        Ok(())
    } else {
        Err(Error::DimensionMismatch { volume, mask })
    }
}

/// nii 格式 3D MRI 扫描, 包括 header 和强度值. 强度值以 `f32` 保存.
#[derive(Debug, Clone)]
pub struct MriVolume {
    header: BoxedHeader,
    data: Array3<f32>,
}

impl NiftiHeaderAttr for MriVolume {
    #[inline]
    fn header(&self) -> &NiftiHeader {
        &self.header
    }
}

impl Index<Idx3d> for MriVolume {
    type Output = f32;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl MriVolume {
    /// 由 header 和 `(z, h, w)` 组织的数据直接创建扫描.
    pub fn new(header: NiftiHeader, data: Array3<f32>) -> Self {
        Self {
            header: Box::new(header),
            data,
        }
    }

    /// 打开 nii 文件格式的 3D 扫描. `path` 为 nii 文件的本地路径.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let (header, data) = read_f32(path.as_ref())?;
        Ok(Self { header, data })
    }

    /// 以原 header 为参考保存为 nii 文件 (`float32`). 路径以 `.gz` 结尾时自动压缩.
    ///
    /// 强度值始终以 `f32` 保存: 原始文件为 `float64` 或大整数类型时会损失精度,
    /// 例如 `16777217` 会被写成 `16777216`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let reference = reference_header(&self.header);
        // [z, H, W] -> [W, H, z]
        WriterOptions::new(path.as_ref())
            .reference_header(&reference)
            .write_nifti(&self.data.view().permuted_axes([2, 1, 0]))?;
        Ok(())
    }

    /// 获取数据形状 `(z, h, w)`.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.data.dim()
    }

    /// 获取数据体素个数.
    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, f32, Ix3> {
        self.data.view()
    }

    /// 以相同 header 包装新数据. 形状不一致时返回 [`Error::DimensionMismatch`].
    pub(crate) fn with_data(&self, data: Array3<f32>) -> Result<Self> {
        check_same_shape(self.shape(), data.dim())?;
        Ok(Self {
            header: self.header.clone(),
            data,
        })
    }

    /// 统计非零体素个数.
    pub fn count_nonzero(&self) -> usize {
        self.data.iter().filter(|v| **v != 0.0).count()
    }
}

/// nii 格式 3D 二值脑部掩膜, 包括 header 和掩膜值. 掩膜值以 `u8` 保存,
/// 且只可能是 [`MASK_BACKGROUND`] 或 [`MASK_FOREGROUND`].
#[derive(Debug, Clone)]
pub struct BrainMask {
    header: BoxedHeader,
    data: Array3<u8>,
}

impl NiftiHeaderAttr for BrainMask {
    #[inline]
    fn header(&self) -> &NiftiHeader {
        &self.header
    }
}

impl Index<Idx3d> for BrainMask {
    type Output = u8;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl BrainMask {
    /// 由 header 和任意数值的 `(z, h, w)` 数组创建掩膜. 所有大于 0 的值视为前景.
    pub fn from_array<T>(header: NiftiHeader, data: ArrayView3<T>) -> Self
    where
        T: PartialOrd + num::Zero,
    {
        Self {
            header: Box::new(header),
            data: morph_3d::binarize(&data),
        }
    }

    /// 打开 nii 文件格式的 3D 掩膜. 磁盘上的掩膜按浮点数读取后二值化,
    /// 因此 `0.3`, `2.7` 都是前景, `0`, `-1` 都是背景.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let (header, data) = read_f32(path.as_ref())?;
        Ok(Self {
            header,
            data: morph_3d::binarize(&data),
        })
    }

    /// 以原 header 为参考保存为 nii 文件 (`uint8`). 路径以 `.gz` 结尾时自动压缩.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let reference = reference_header(&self.header);
        WriterOptions::new(path.as_ref())
            .reference_header(&reference)
            .write_nifti(&self.data.view().permuted_axes([2, 1, 0]))?;
        Ok(())
    }

    /// 获取数据形状 `(z, h, w)`.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.data.dim()
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, u8, Ix3> {
        self.data.view()
    }

    /// 获取前景体素个数, 即掩膜 "面积".
    #[inline]
    pub fn area(&self) -> usize {
        self.data.iter().filter(|p| is_foreground(**p)).count()
    }

    /// 收集所有前景体素对应的下标. 结果按行优先存储.
    pub fn foreground_pos(&self) -> Vec<Idx3d> {
        self.data
            .indexed_iter()
            .filter_map(|(pos, p)| is_foreground(*p).then_some(pos))
            .collect()
    }

    /// 返回按 `params` 膨胀后的新掩膜 (header 保持不变), 以及膨胀前后的前景体素个数.
    ///
    /// 两个面积也会记录到日志中.
    pub fn dilated(&self, params: &morph_3d::DilationParams) -> (Self, (usize, usize)) {
        let ans = morph_3d::dilate_3d(self.data.view(), params);
        log::info!("Mask area: {}", ans.area_before);
        log::info!("Dilated mask area: {}", ans.area_after);
        let mask = Self {
            header: self.header.clone(),
            data: ans.mask,
        };
        (mask, (ans.area_before, ans.area_after))
    }
}
