//! 逐被试的去脸流水线.
//!
//! 每个被试依次经过
//! `Discovered -> Segmented -> MaskLoaded -> Dilated -> VolumeLoaded -> Masked -> Saved`.
//! 任一阶段出错则进入 `Failed`, 并记录出错前到达的最后阶段. 单个被试失败不会中断批次.

pub mod config;
pub mod report;

pub use config::DefaceConfig;
pub use report::{BatchReport, SubjectFailure, SubjectReport};

use crate::dataset::{Subject, SubjectPaths};
use crate::segment::Segmenter;
use crate::store::VolumeStore;
use crate::{apply_mask, Result};
use std::fs;
use std::path::PathBuf;

/// 单个被试所处的阶段.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SubjectStage {
    /// 已在输入目录中找到.
    Discovered,

    /// 分割器已写出掩膜.
    Segmented,

    /// 掩膜已读入并二值化.
    MaskLoaded,

    /// 掩膜已膨胀.
    Dilated,

    /// 原始扫描已读入.
    VolumeLoaded,

    /// 膨胀后的掩膜已作用于原始扫描.
    Masked,

    /// 结果已保存. 终止状态.
    Saved,

    /// 处理失败. 终止状态.
    Failed,
}

impl SubjectStage {
    /// 成功路径上的下一阶段. 终止状态返回 `None`.
    pub fn next(self) -> Option<Self> {
        use SubjectStage::*;
        match self {
            Discovered => Some(Segmented),
            Segmented => Some(MaskLoaded),
            MaskLoaded => Some(Dilated),
            Dilated => Some(VolumeLoaded),
            VolumeLoaded => Some(Masked),
            Masked => Some(Saved),
            Saved | Failed => None,
        }
    }

    /// 是否为终止状态.
    #[inline]
    pub fn is_terminal(self) -> bool {
        self.next().is_none()
    }
}

/// 单个被试运行过程中的可变记录.
struct Progress {
    stage: SubjectStage,
    areas: Option<(usize, usize)>,
}

impl Progress {
    fn reach(&mut self, stage: SubjectStage) {
        debug_assert_eq!(self.stage.next(), Some(stage));
        self.stage = stage;
    }
}

/// 去脸流水线. 存储和分割器均通过能力接口注入.
#[derive(Debug)]
pub struct Pipeline<S, G> {
    store: S,
    segmenter: G,
    config: DefaceConfig,
}

impl<S: VolumeStore, G: Segmenter> Pipeline<S, G> {
    /// 创建流水线. 不会触碰文件系统.
    pub fn new(store: S, segmenter: G, config: DefaceConfig) -> Self {
        Self {
            store,
            segmenter,
            config,
        }
    }

    /// 获取配置.
    #[inline]
    pub fn config(&self) -> &DefaceConfig {
        &self.config
    }

    /// 创建输出目录和中间目录. 目录已存在时不做任何事.
    pub fn prepare(&self) -> Result<()> {
        fs::create_dir_all(&self.config.output_dir)?;
        fs::create_dir_all(&self.config.scratch_dir)?;
        log::info!("Output directory: {}", self.config.output_dir.display());
        log::info!("Temporary directory: {}", self.config.scratch_dir.display());
        Ok(())
    }

    /// 处理单个被试. 错误被记录在返回的报告中, 不会向上传播.
    pub fn run_subject(&self, subject: &Subject) -> SubjectReport {
        log::info!("Processing: {}", subject.input.display());

        let mut progress = Progress {
            stage: SubjectStage::Discovered,
            areas: None,
        };
        let outcome = match self.drive(subject, &mut progress) {
            Ok(output) => {
                log::info!("Saved brain-extracted image to: {}", output.display());
                Ok(output)
            }
            Err(error) => {
                log::error!(
                    "Error processing {} after {:?}: {error}",
                    subject.input.display(),
                    progress.stage
                );
                Err(SubjectFailure {
                    last_stage: progress.stage,
                    error,
                })
            }
        };

        SubjectReport {
            id: subject.id.clone(),
            stage: if outcome.is_ok() {
                SubjectStage::Saved
            } else {
                SubjectStage::Failed
            },
            areas: progress.areas,
            outcome,
        }
    }

    fn drive(&self, subject: &Subject, progress: &mut Progress) -> Result<PathBuf> {
        let cfg = &self.config;
        let paths = SubjectPaths::new(
            subject,
            &cfg.scratch_dir,
            &cfg.output_dir,
            &cfg.output_suffix,
        );

        let artifacts = self
            .segmenter
            .segment(&subject.input, &paths.stripped, &cfg.segment)?;
        progress.reach(SubjectStage::Segmented);

        let mask = self.store.load_mask(&artifacts.mask)?;
        progress.reach(SubjectStage::MaskLoaded);

        let (dilated, areas) = mask.dilated(&cfg.dilation);
        progress.areas = Some(areas);
        progress.reach(SubjectStage::Dilated);

        // 模型自己去颅骨的结果不使用, 始终以原始扫描为准.
        let volume = self.store.load_volume(&subject.input)?;
        progress.reach(SubjectStage::VolumeLoaded);

        let masked = apply_mask(&volume, &dilated)?;
        progress.reach(SubjectStage::Masked);

        self.store.save_volume(&masked, &paths.output)?;
        progress.reach(SubjectStage::Saved);
        Ok(paths.output)
    }

    /// 按顺序处理所有被试. 某个被试失败后继续处理其余被试.
    pub fn run_batch(&self, subjects: &[Subject]) -> BatchReport {
        subjects.iter().map(|s| self.run_subject(s)).collect()
    }
}
