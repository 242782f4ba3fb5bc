//! 批处理结果.

use super::SubjectStage;
use crate::Error;
use std::io::{self, Write};
use std::path::PathBuf;

/// 单个被试处理失败的原因.
#[derive(Debug)]
pub struct SubjectFailure {
    /// 出错前最后一个成功到达的阶段.
    pub last_stage: SubjectStage,

    /// 具体错误.
    pub error: Error,
}

/// 单个被试的处理结果.
#[derive(Debug)]
pub struct SubjectReport {
    /// 被试标识.
    pub id: String,

    /// 最终阶段. 成功时为 [`SubjectStage::Saved`], 否则为 [`SubjectStage::Failed`].
    pub stage: SubjectStage,

    /// 膨胀前后的掩膜面积. 未到达 `Dilated` 阶段时为 `None`.
    pub areas: Option<(usize, usize)>,

    /// 成功时为输出路径, 失败时为失败原因.
    pub outcome: Result<PathBuf, SubjectFailure>,
}

impl SubjectReport {
    /// 是否成功保存.
    #[inline]
    pub fn is_saved(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// 整个批次的处理结果.
#[derive(Debug, Default)]
pub struct BatchReport {
    subjects: Vec<SubjectReport>,
}

impl FromIterator<SubjectReport> for BatchReport {
    fn from_iter<I: IntoIterator<Item = SubjectReport>>(it: I) -> Self {
        Self {
            subjects: it.into_iter().collect(),
        }
    }
}

impl BatchReport {
    /// 所有被试的结果, 顺序与处理顺序一致.
    #[inline]
    pub fn subjects(&self) -> &[SubjectReport] {
        &self.subjects
    }

    /// 成功个数.
    pub fn saved(&self) -> usize {
        self.subjects.iter().filter(|s| s.is_saved()).count()
    }

    /// 失败个数.
    pub fn failed(&self) -> usize {
        self.subjects.len() - self.saved()
    }

    /// 是否全部成功. 空批次视为成功.
    #[inline]
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// 将结果摘要写进 `w` 中.
    pub fn describe_into<W: Write>(&self, w: &mut W) -> io::Result<()> {
        const S4: &str = "    ";

        writeln!(
            w,
            "Processed {} subject(s): {} saved, {} failed",
            self.subjects.len(),
            self.saved(),
            self.failed()
        )?;
        for s in self.subjects.iter() {
            match &s.outcome {
                Ok(path) => writeln!(w, "{S4}{}: saved to {}", s.id, path.display())?,
                Err(f) => writeln!(
                    w,
                    "{S4}{}: failed after {:?}: {}",
                    s.id, f.last_stage, f.error
                )?,
            }
        }
        Ok(())
    }
}
