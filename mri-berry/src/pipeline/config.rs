//! 流水线配置.

use crate::consts::{OUTPUT_SUFFIX, SCRATCH_DIR};
use crate::segment::SegmentOptions;
use crate::DilationParams;
use std::path::PathBuf;

/// 整个批次共用的配置.
///
/// 默认值复现固定行为: 膨胀 25 轮 6-邻域, 中间目录 `temp`, 输出目录 `output`,
/// 输出后缀 `_defaced`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DefaceConfig {
    /// 掩膜膨胀参数.
    pub dilation: DilationParams,

    /// 中间产物目录. 多个被试共享, 产物按被试标识区分.
    pub scratch_dir: PathBuf,

    /// 最终输出目录.
    pub output_dir: PathBuf,

    /// 输出文件名后缀.
    pub output_suffix: String,

    /// 传给分割器的配置.
    pub segment: SegmentOptions,
}

impl Default for DefaceConfig {
    fn default() -> Self {
        Self {
            dilation: DilationParams::default(),
            scratch_dir: PathBuf::from(SCRATCH_DIR),
            output_dir: PathBuf::from("output"),
            output_suffix: OUTPUT_SUFFIX.to_owned(),
            segment: SegmentOptions::default(),
        }
    }
}
