// Licensed under the Apache License, Version 2.0. See LICENSE for details.

//! `watermark-cli`: a thin harness over the library exposing the three
//! operator actions (`sign`, `distribute`, `check`). Owns no
//! watermarking logic of its own -- argument parsing and directory/file
//! bookkeeping only.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use provmark::{
    check_watermark, create_master, mint_distribution, read_image, write_image, Config, Flags,
};

const USAGE: &str = "\
watermark-cli: embed and inspect provenance watermarks

USAGE:
  watermark-cli sign <input-dir> <output-dir> [--config <path>]
  watermark-cli distribute <master-path> <holder-uid> [--config <path>]
  watermark-cli check <path> [--config <path>]

OPTIONS:
  --config <path>   path to the TOML config file (default: config.toml)
  -h, --help        print this message
";

fn main() {
    simple_logger::SimpleLogger::new()
        .env()
        .init()
        .expect("logger should only be initialized once");

    if let Err(e) = run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = pico_args::Arguments::from_env();

    if args.contains(["-h", "--help"]) {
        print!("{USAGE}");
        return Ok(());
    }

    let config_path: PathBuf = args
        .opt_value_from_str("--config")?
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let subcommand = args.subcommand()?.ok_or("expected a subcommand")?;

    match subcommand.as_str() {
        "sign" => {
            let input_dir: PathBuf = args.free_from_str()?;
            let output_dir: PathBuf = args.free_from_str()?;
            cmd_sign(&config_path, &input_dir, &output_dir)
        }
        "distribute" => {
            let master_path: PathBuf = args.free_from_str()?;
            let holder_uid: u128 = args.free_from_str()?;
            cmd_distribute(&config_path, &master_path, holder_uid)
        }
        "check" => {
            let path: PathBuf = args.free_from_str()?;
            cmd_check(&config_path, &path)
        }
        other => {
            print!("{USAGE}");
            Err(format!("unknown subcommand `{other}`").into())
        }
    }
}

fn is_raster_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()).as_deref(),
        Some("png") | Some("jpg") | Some("jpeg") | Some("bmp")
    )
}

/// `sign`: batch-admit every raster file under `input_dir` as a new (or
/// re-admitted) master under the configured owner identity, writing the
/// watermarked copies into `output_dir`. Parallelized across
/// `config.workers` threads with `rayon`; each file is an independent
/// call with no shared mutable state.
fn cmd_sign(config_path: &Path, input_dir: &Path, output_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(config_path)?;
    std::fs::create_dir_all(output_dir)?;

    let entries: Vec<PathBuf> = std::fs::read_dir(input_dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_raster_file(p))
        .collect();

    log::info!("sign: {} candidate files in {}", entries.len(), input_dir.display());

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .build()?;

    let flags = Flags {
        allow_reprint: config.allow_reprint,
        allow_derivative: config.allow_derivative,
    };

    pool.install(|| {
        use rayon::prelude::*;
        entries.par_iter().for_each(|path| {
            match sign_one(&config, flags, path, output_dir) {
                Ok(()) => println!("signed {}", path.display()),
                Err(e) => eprintln!("failed {}: {e}", path.display()),
            }
        });
    });

    Ok(())
}

fn sign_one(
    config: &Config,
    flags: Flags,
    path: &Path,
    output_dir: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let decoded = read_image(path)?;
    let signed = create_master(
        &decoded.raster,
        config.owner_uuid,
        flags,
        &config.watermark_key,
        config.qim_step,
    )?;
    let file_name = path.file_name().ok_or("input path has no file name")?;
    let out_path = output_dir.join(file_name).with_extension("png");
    write_image(out_path, &signed, &decoded.text_metadata)?;
    Ok(())
}

/// `distribute`: mint a per-recipient distribution from a master and
/// write it alongside the master. Naming/placement is a filesystem-layout
/// concern that belongs to the CLI, not the library.
fn cmd_distribute(config_path: &Path, master_path: &Path, holder_uid: u128) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(config_path)?;
    let decoded = read_image(master_path)?;

    let distributed = mint_distribution(
        &decoded.raster,
        holder_uid,
        &config.watermark_key,
        config.qim_step,
    )?;

    std::fs::create_dir_all(&config.dist_dir)?;
    let nonce = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let out_path = Path::new(&config.dist_dir).join(format!("{holder_uid}_{nonce:x}.png"));
    write_image(&out_path, &distributed, &decoded.text_metadata)?;

    println!("distributed {} -> {}", master_path.display(), out_path.display());
    Ok(())
}

/// `check`: read-only inspection, printing the report produced by
/// `check_watermark`.
fn cmd_check(config_path: &Path, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(config_path)?;
    let decoded = read_image(path)?;
    let report = check_watermark(&decoded.raster, &config.watermark_key, config.qim_step);

    println!("file: {}", path.display());
    println!("dimensions: {}x{}", report.width, report.height);
    println!("has_watermark: {}", report.has_watermark);
    println!("confidence: {}%", report.confidence_percent);

    if let Some(payload) = report.payload {
        println!("original_uid: {}", payload.original_uid);
        println!("current_uid: {}", payload.current_uid);
        println!("is_master: {}", payload.is_master());
        println!("allow_reprint: {}", payload.flags.allow_reprint);
        println!("allow_derivative: {}", payload.flags.allow_derivative);
    }

    Ok(())
}
