//! 输入发现与被试文件命名.

use crate::consts::{INPUT_EXTENSION, STRIPPED_SUFFIX};
use crate::segment::hd_bet_mask_path;
use crate::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// 一个待处理的被试.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct Subject {
    /// 被试标识, 即文件名中第一个 `.` 之前的部分.
    pub id: String,

    /// 原始扫描路径.
    pub input: PathBuf,
}

impl Subject {
    /// 由输入文件路径创建被试. 文件名无法解析为 UTF-8 时返回 `None`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        let path = path.as_ref();
        let name = path.file_name()?.to_str()?;
        let id = name.split('.').next().unwrap_or(name);
        Some(Self {
            id: id.to_owned(),
            input: path.to_owned(),
        })
    }
}

/// 非递归地扫描 `dir`, 收集所有 `*.nii.gz` 文件, 按路径排序.
///
/// 与 shell 通配一致, 以 `.` 开头的隐藏文件被忽略. 没有找到任何文件不算错误,
/// 由调用方决定是否告警; `dir` 不可读时返回 [`Error::InputDiscovery`].
pub fn discover_subjects<P: AsRef<Path>>(dir: P) -> Result<Vec<Subject>> {
    let dir = dir.as_ref();
    let fail = |e: std::io::Error| Error::InputDiscovery {
        dir: dir.to_owned(),
        reason: e.to_string(),
    };

    let mut ans = Vec::new();
    for entry in fs::read_dir(dir).map_err(fail)? {
        let entry = entry.map_err(fail)?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name.starts_with('.') || !name.ends_with(INPUT_EXTENSION) {
            continue;
        }
        if !entry.path().is_file() {
            continue;
        }
        if let Some(s) = Subject::from_path(entry.path()) {
            ans.push(s);
        }
    }
    ans.sort_by(|a, b| a.input.cmp(&b.input));
    Ok(ans)
}

/// 单个被试在中间目录和输出目录下的全部路径.
///
/// 中间产物以被试标识为前缀, 因此不同被试之间不会冲突.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubjectPaths {
    /// `{scratch}/{id}_skull_stripped.nii`.
    pub stripped: PathBuf,

    /// `{scratch}/{id}_skull_strip_mask.nii.gz`.
    pub mask: PathBuf,

    /// `{output}/{id}{suffix}.nii.gz`.
    pub output: PathBuf,
}

impl SubjectPaths {
    /// 计算 `subject` 的各个路径. `suffix` 一般为 `_defaced`.
    pub fn new(subject: &Subject, scratch_dir: &Path, output_dir: &Path, suffix: &str) -> Self {
        let id = subject.id.as_str();
        let stripped = scratch_dir.join(format!("{id}{STRIPPED_SUFFIX}"));
        let mask = hd_bet_mask_path(&stripped);
        let output = output_dir.join(format!("{id}{suffix}{INPUT_EXTENSION}"));
        Self {
            stripped,
            mask,
            output,
        }
    }
}
