//! 外部分割模型 (HD-BET) 的能力接口.
//!
//! 分割模型本身不在该 crate 中实现. 流水线只依赖 [`Segmenter`] trait,
//! 因此测试可以用确定性的假分割器代替真实模型.

use crate::consts::CPU_SENTINEL;
use crate::{Error, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

/// 分割模型运行的设备. 整个批次内固定不变.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Device {
    /// CPU.
    Cpu,

    /// 第 `n` 号 CUDA 设备.
    Cuda(u32),
}

impl Default for Device {
    /// 0 号 CUDA 设备.
    #[inline]
    fn default() -> Self {
        Self::Cuda(0)
    }
}

impl Device {
    /// 从命令行整数解析设备. `-1` 表示 CPU, 非负数表示 CUDA 设备号,
    /// 其余负数非法.
    pub fn from_index(index: i32) -> Result<Self> {
        match index {
            CPU_SENTINEL => Ok(Self::Cpu),
            n if n >= 0 => Ok(Self::Cuda(n as u32)),
            n => Err(Error::InvalidParameter {
                name: "CUDA_VISIBLE_DEVICES",
                value: n.to_string(),
                reason: "expected -1 (CPU) or a device index",
            }),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => f.write_str("cpu"),
            Self::Cuda(n) => write!(f, "{n}"),
        }
    }
}

/// 分割模式.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SegmentMode {
    /// 快速模式 (单模型).
    Fast,

    /// 高精度模式 (模型集成).
    #[default]
    Accurate,
}

impl SegmentMode {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Accurate => "accurate",
        }
    }
}

/// 传给分割器的配置.
///
/// 默认值即流水线使用的固定配置: 高精度模式, 开启测试时增强 (TTA),
/// 关闭模型自带后处理, 保留掩膜, 覆盖已有中间产物.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SegmentOptions {
    /// 分割模式.
    pub mode: SegmentMode,

    /// 运行设备.
    pub device: Device,

    /// 是否开启测试时增强.
    pub tta: bool,

    /// 是否使用模型自带的后处理.
    pub postprocess: bool,

    /// 是否保留掩膜产物.
    pub keep_mask: bool,

    /// 是否覆盖已有产物.
    pub overwrite: bool,

    /// 模型配置文件. 原样转交给分割器, 为 `None` 时使用其内置配置.
    pub config_file: Option<PathBuf>,
}

impl Default for SegmentOptions {
    fn default() -> Self {
        Self {
            mode: SegmentMode::Accurate,
            device: Device::default(),
            tta: true,
            postprocess: false,
            keep_mask: true,
            overwrite: true,
            config_file: None,
        }
    }
}

/// 分割器写入中间目录的产物.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SegmentArtifacts {
    /// 模型自己去颅骨后的扫描. 流水线不会读取它.
    pub stripped: PathBuf,

    /// 脑部掩膜.
    pub mask: PathBuf,
}

/// 分割器能力接口.
pub trait Segmenter {
    /// 对 `input` 做脑部分割, 将去颅骨扫描写到 `stripped_out`,
    /// 并返回实际写出的产物路径.
    fn segment(
        &self,
        input: &Path,
        stripped_out: &Path,
        options: &SegmentOptions,
    ) -> Result<SegmentArtifacts>;
}

/// HD-BET 从输出文件名推导掩膜文件名的规则:
/// 去掉输出文件名最后 7 个字符, 再追加 `_mask.nii.gz`.
///
/// 对于 `{name}_skull_stripped.nii`, 结果为 `{name}_skull_strip_mask.nii.gz`.
pub fn hd_bet_mask_path(stripped_out: &Path) -> PathBuf {
    let s = stripped_out.to_string_lossy();
    let cut = s
        .char_indices()
        .rev()
        .nth(6)
        .map_or(0, |(i, _)| i);
    PathBuf::from(format!("{}_mask.nii.gz", &s[..cut]))
}

/// 通过外部 `hd-bet` 可执行文件运行分割.
#[derive(Clone, Debug)]
pub struct HdBetSegmenter {
    program: PathBuf,
}

impl Default for HdBetSegmenter {
    fn default() -> Self {
        Self::new("hd-bet")
    }
}

impl HdBetSegmenter {
    /// 使用指定的可执行文件路径.
    pub fn new<P: Into<PathBuf>>(program: P) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// 构造命令行参数.
    fn args(input: &Path, stripped_out: &Path, options: &SegmentOptions) -> Vec<String> {
        let flag = |b: bool| String::from(if b { "1" } else { "0" });
        let mut args = vec![
            "-i".into(),
            input.to_string_lossy().into_owned(),
            "-o".into(),
            stripped_out.to_string_lossy().into_owned(),
            "-mode".into(),
            options.mode.as_str().into(),
            "-device".into(),
            options.device.to_string(),
            "-tta".into(),
            flag(options.tta),
            "-pp".into(),
            flag(options.postprocess),
            "-s".into(),
            flag(options.keep_mask),
            "--overwrite_existing".into(),
            flag(options.overwrite),
        ];
        if let Some(config) = &options.config_file {
            args.push("--config_file".into());
            args.push(config.to_string_lossy().into_owned());
        }
        args
    }
}

impl Segmenter for HdBetSegmenter {
    fn segment(
        &self,
        input: &Path,
        stripped_out: &Path,
        options: &SegmentOptions,
    ) -> Result<SegmentArtifacts> {
        let fail = |reason: String| Error::Segmentation {
            input: input.to_owned(),
            reason,
        };

        let args = Self::args(input, stripped_out, options);
        log::debug!("{} {}", self.program.display(), args.join(" "));

        let status = Command::new(&self.program)
            .args(&args)
            .status()
            .map_err(|e| fail(format!("cannot run `{}`: {e}", self.program.display())))?;
        if !status.success() {
            return Err(fail(format!("`{}` exited with {status}", self.program.display())));
        }

        let mask = hd_bet_mask_path(stripped_out);
        if !mask.is_file() {
            return Err(fail(format!("mask `{}` was not written", mask.display())));
        }
        Ok(SegmentArtifacts {
            stripped: stripped_out.to_owned(),
            mask,
        })
    }
}
