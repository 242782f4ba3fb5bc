//! 🍇欢迎光临🫐
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx3d, Offset3d};

pub use crate::data::{BrainMask, MriVolume, NiftiHeaderAttr};
pub use crate::{apply_mask, binarize, dilate, dilate_3d, Connectivity, DilationParams};

#[cfg(feature = "rayon")]
pub use crate::par_dilate_3d;

pub use crate::consts::gray::{MASK_BACKGROUND, MASK_FOREGROUND};

pub use crate::dataset::{discover_subjects, Subject, SubjectPaths};
pub use crate::pipeline::{BatchReport, DefaceConfig, Pipeline, SubjectStage};
pub use crate::segment::{Device, HdBetSegmenter, SegmentOptions, Segmenter};
pub use crate::store::{NiftiStore, VolumeStore};

pub use crate::{Error, Result};
