//! 通用常量.

/// 掩膜取值.
pub mod gray {
    /// 二值掩膜中, 背景 (非脑组织) 的体素值.
    pub const MASK_BACKGROUND: u8 = 0;

    /// 二值掩膜中, 前景 (脑组织) 的体素值.
    pub const MASK_FOREGROUND: u8 = 1;

    /// 体素是否是前景?
    #[inline]
    pub const fn is_foreground(p: u8) -> bool {
        matches!(p, MASK_FOREGROUND)
    }

    /// 体素是否是背景?
    #[inline]
    pub const fn is_background(p: u8) -> bool {
        matches!(p, MASK_BACKGROUND)
    }
}

/// 默认膨胀迭代次数.
///
/// 相对常见脑部 MRI 体素间距而言这个半径很大: 宁可多保留组织, 也不裁掉脑组织.
pub const DEFAULT_DILATION_ITERATIONS: u32 = 25;

/// 默认结构元连通性 (6-邻域).
pub const DEFAULT_CONNECTIVITY: u8 = 1;

/// 三维结构元支持的最大连通性 (26-邻域).
pub const MAX_CONNECTIVITY: u8 = 3;

/// 输入目录下被处理的文件后缀.
pub const INPUT_EXTENSION: &str = ".nii.gz";

/// 默认中间产物目录名 (相对于工作目录).
pub const SCRATCH_DIR: &str = "temp";

/// 默认输出文件名后缀, 即 `{name}_defaced.nii.gz`.
pub const OUTPUT_SUFFIX: &str = "_defaced";

/// 分割器去颅骨输出的文件名后缀, 即 `{name}_skull_stripped.nii`.
pub const STRIPPED_SUFFIX: &str = "_skull_stripped.nii";

/// 设备选择参数中代表 "使用 CPU" 的保留值.
pub const CPU_SENTINEL: i32 = -1;
