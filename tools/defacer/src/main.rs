//! 批量去脸工具.
//!
//! 对输入目录下的每个 `*.nii.gz` 扫描运行 HD-BET 得到脑部掩膜, 膨胀后作用于原始扫描,
//! 结果写入输出目录.
//!
//! 除命令行参数外, 还可以通过环境变量调整:
//!
//! 1. `$DEFACER_ITERATIONS`: 膨胀轮数, 默认 25;
//! 2. `$DEFACER_CONNECTIVITY`: 结构元连通性 (1/2/3), 默认 1;
//! 3. `$HD_BET_BIN`: `hd-bet` 可执行文件路径, 默认从 `$PATH` 中查找;
//! 4. `$HD_BET_CONFIG`: 转交给 `hd-bet` 的模型配置文件, 默认不传.
//!
//! 退出码: 全部成功 (或没有输入) 为 0, 存在失败的被试为 1, 启动失败为 2.

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;
use mri_berry::consts::{DEFAULT_CONNECTIVITY, DEFAULT_DILATION_ITERATIONS};
use mri_berry::prelude::*;
use simple_logger::SimpleLogger;
use std::env;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

#[derive(Parser, Debug)]
#[command(name = "defacer", version, about = "Deface NIfTI scans with HD-BET brain masks")]
struct Cli {
    /// CUDA device index, or -1 for CPU
    #[arg(
        long = "CUDA_VISIBLE_DEVICES",
        default_value_t = 0,
        allow_negative_numbers = true
    )]
    cuda_visible_devices: i32,

    /// Directory containing the input `*.nii.gz` scans
    #[arg(long = "input_dir", default_value = "input_nifti")]
    input_dir: PathBuf,

    /// Directory receiving the defaced scans
    #[arg(long = "output_path", default_value = "output")]
    output_path: PathBuf,
}

/// 解析环境变量 `key` 的取值 `value`. 为空或仅含空白时返回 `default`.
fn parse_or<T>(key: &str, value: Option<&str>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v
            .parse()
            .with_context(|| format!("invalid value `{v}` for ${key}")),
        _ => Ok(default),
    }
}

/// 由膨胀相关的环境变量取值构造膨胀参数.
fn dilation_from(iterations: Option<&str>, connectivity: Option<&str>) -> Result<DilationParams> {
    let iterations = parse_or("DEFACER_ITERATIONS", iterations, DEFAULT_DILATION_ITERATIONS)?;
    let connectivity = parse_or(
        "DEFACER_CONNECTIVITY",
        connectivity,
        u32::from(DEFAULT_CONNECTIVITY),
    )?;
    DilationParams::new(iterations, connectivity).context("invalid dilation parameters")
}

fn config_from(cli: &Cli) -> Result<DefaceConfig> {
    let dilation = dilation_from(
        env::var("DEFACER_ITERATIONS").ok().as_deref(),
        env::var("DEFACER_CONNECTIVITY").ok().as_deref(),
    )?;
    let device = Device::from_index(cli.cuda_visible_devices)?;
    let config_file = env::var_os("HD_BET_CONFIG")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from);

    let defaults = DefaceConfig::default();
    Ok(DefaceConfig {
        dilation,
        output_dir: cli.output_path.clone(),
        segment: SegmentOptions {
            device,
            config_file,
            ..defaults.segment.clone()
        },
        ..defaults
    })
}

/// 返回值表示是否所有被试都处理成功.
fn run(cli: Cli) -> Result<bool> {
    let config = config_from(&cli)?;
    log::info!(
        "Device: {}, dilation: {} iteration(s), connectivity {}",
        config.segment.device,
        config.dilation.iterations,
        config.dilation.connectivity.get()
    );

    let subjects = discover_subjects(&cli.input_dir)
        .with_context(|| format!("cannot scan `{}`", cli.input_dir.display()))?;
    if subjects.is_empty() {
        log::warn!("No `*.nii.gz` files found in {}", cli.input_dir.display());
    }

    let program = env::var_os("HD_BET_BIN").map_or_else(|| PathBuf::from("hd-bet"), PathBuf::from);
    let pipeline = Pipeline::new(NiftiStore, HdBetSegmenter::new(program), config);
    pipeline.prepare().context("cannot create working directories")?;

    let report = pipeline.run_batch(&subjects);
    report.describe_into(&mut io::stdout().lock())?;
    Ok(report.is_success())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .env()
        .init()
    {
        eprintln!("cannot initialize logger: {e}");
    }

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}
