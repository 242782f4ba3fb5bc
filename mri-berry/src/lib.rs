#![warn(missing_docs)] // <= 合适时移除它.

//! 核心库. 对外部分割模型给出的脑部掩膜进行三维形态学膨胀,
//! 再将膨胀后的掩膜作用于原始 MRI 扫描, 得到去颅骨 (去脸) 后的 NIfTI 图像.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 分割模型 (HD-BET) 本身不在该 crate 中实现, 仅通过 [`segment::Segmenter`]
//!   能力接口接入. 测试时可以替换为确定性的假实现.
//! 2. 所有变换 (二值化, 膨胀, 掩膜作用) 都返回新数组, 不会原地修改输入.
//! 3. 空间变换 (仿射矩阵) 由 NIfTI header 携带, 从原始扫描原样拷贝到输出,
//!   流水线不做任何重采样或重定向.
//!
//! # 模块
//!
//! ### 三维二值形态学膨胀 ✅
//!
//! 结构元由连通性参数决定 (1: 6-邻域, 2: 18-邻域, 3: 26-邻域).
//! 边界外视为背景, 不会环绕.
//!
//! 实现位于 `mri-berry/src/data/morph_3d`.
//!
//! ### 掩膜作用 ✅
//!
//! 逐体素相乘, 保留脑组织, 其余置零.
//!
//! 实现位于 `mri-berry/src/data/apply.rs`.
//!
//! ### 逐被试流水线 ✅
//!
//! `Discovered -> Segmented -> MaskLoaded -> Dilated -> VolumeLoaded -> Masked -> Saved`,
//! 任一阶段出错进入 `Failed`, 但不会中断整个批次.
//!
//! 实现位于 `mri-berry/src/pipeline`.

/// 三维索引, 按 `(z, h, w)` 组织.
pub type Idx3d = (usize, usize, usize);

/// 三维偏移量, 按 `(dz, dh, dw)` 组织.
pub type Offset3d = (isize, isize, isize);

/// 3D MRI nii 文件基础数据结构.
pub mod data;

pub use data::{BrainMask, MriVolume, NiftiHeaderAttr};

pub use data::apply::{apply_mask, apply_mask_array};
pub use data::morph_3d::{
    binarize, dilate, dilate_3d, dilate_step, Connectivity, DilationParams, Dilated,
    StructuringElement,
};

#[cfg(feature = "rayon")]
pub use data::morph_3d::par_dilate_3d;

pub mod consts;

pub mod dataset;

mod error;

pub use error::{Error, Result};

pub mod pipeline;
pub mod prelude;
pub mod segment;
pub mod store;
