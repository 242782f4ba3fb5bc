//! 运行时错误.

use crate::Idx3d;
use std::path::PathBuf;
use thiserror::Error;

/// 该 crate 所有操作的错误类型.
#[derive(Error, Debug)]
pub enum Error {
    /// 底层 I/O 错误 (创建目录, 遍历输入目录等).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// 读写 NIfTI 文件错误.
    #[error("NIfTI error: {0}")]
    Nifti(#[from] nifti::NiftiError),

    /// 掩膜或扫描不是三维数组.
    #[error("expected a 3-dimensional array, got {ndim} dimension(s) {shape:?}")]
    Shape {
        /// 实际维数.
        ndim: usize,
        /// 实际形状.
        shape: Vec<usize>,
    },

    /// 掩膜与扫描形状不一致. 形状均按 `(z, h, w)` 给出.
    #[error("volume shape {volume:?} does not match mask shape {mask:?}")]
    DimensionMismatch {
        /// 扫描形状.
        volume: Idx3d,
        /// 掩膜形状.
        mask: Idx3d,
    },

    /// 参数取值非法.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// 参数名.
        name: &'static str,
        /// 参数值.
        value: String,
        /// 原因.
        reason: &'static str,
    },

    /// 外部分割步骤失败.
    #[error("segmentation of `{}` failed: {reason}", .input.display())]
    Segmentation {
        /// 输入扫描路径.
        input: PathBuf,
        /// 失败原因.
        reason: String,
    },

    /// 输入目录不可用.
    #[error("cannot discover inputs in `{}`: {reason}", .dir.display())]
    InputDiscovery {
        /// 输入目录.
        dir: PathBuf,
        /// 失败原因.
        reason: String,
    },
}

impl Error {
    /// 由任意维数组形状构造 [`Error::Shape`].
    pub(crate) fn shape(shape: &[usize]) -> Self {
        Self::Shape {
            ndim: shape.len(),
            shape: shape.to_vec(),
        }
    }
}

/// 该 crate 的 `Result` 别名.
pub type Result<T> = std::result::Result<T, Error>;
