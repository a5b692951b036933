#![forbid(unsafe_code)]

use afsvol_core::{DecodeOptions, OpenVolume, ScanOptions, ScanReport, parse_error_to_afs};
use afsvol_error::AfsError;
use afsvol_namei::CaseSensitivity;
use afsvol_types::{ByteOrder, ObjectId, VolumeId};
use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, PartialEq, Eq)]
struct Flags {
    json: bool,
    root: Option<PathBuf>,
    decode: DecodeOptions,
}

#[derive(Debug, Serialize)]
struct PathOutput {
    volume_id: VolumeId,
    object_id: ObjectId,
    special: bool,
    path: PathBuf,
}

#[derive(Debug, Serialize)]
struct ResolveOutput {
    volume_id: VolumeId,
    object_id: ObjectId,
    vnode: u64,
    special: bool,
}

fn main() {
    env_logger::init();
    if let Err(error) = run() {
        eprintln!("error: {error:#}");
        std::process::exit(exit_status(&error));
    }
}

/// Exit status of the first [`AfsError`] in the chain, 1 otherwise.
fn exit_status(error: &anyhow::Error) -> i32 {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<AfsError>())
        .map_or(1, |e| i32::from(e.kind().exit_code()))
}

fn usage(message: impl Into<String>) -> anyhow::Error {
    AfsError::Usage(message.into()).into()
}

fn run() -> Result<()> {
    let mut args = env::args().skip(1);
    let Some(command) = args.next() else {
        print_usage();
        return Ok(());
    };
    let (positional, flags) = parse_flags(args)?;

    match command.as_str() {
        "inspect" => {
            let [path] = positional.as_slice() else {
                return Err(usage("inspect requires exactly one header path"));
            };
            inspect(Path::new(path), &flags)
        }
        "scan" => scan(&positional, &flags),
        "path" => {
            let [volume, object] = positional.as_slice() else {
                return Err(usage("path requires <volume-id> <object-id>"));
            };
            let volume = u32::try_from(parse_number(volume)?)
                .map_err(|_| usage(format!("volume id {volume} does not fit in 32 bits")))?;
            namei_path(VolumeId(volume), ObjectId(parse_number(object)?), &flags)
        }
        "resolve" => {
            let [path] = positional.as_slice() else {
                return Err(usage("resolve requires exactly one namei path"));
            };
            resolve(Path::new(path), &flags)
        }
        "--help" | "-h" | "help" => {
            print_usage();
            Ok(())
        }
        _ => {
            print_usage();
            Err(usage(format!("unknown command: {command}")))
        }
    }
}

fn print_usage() {
    println!("afsvol\n");
    println!("USAGE:");
    println!("  afsvol inspect <V*.vol> [--json] [BYTE-ORDER] [--case-insensitive]");
    println!("  afsvol scan [<partition>...] [--root <dir>] [--json] [BYTE-ORDER] [--case-insensitive]");
    println!("  afsvol path <volume-id> <object-id> [--json] [--case-insensitive]");
    println!("  afsvol resolve <namei-path> [--json] [--case-insensitive]");
    println!();
    println!("BYTE-ORDER: --little-endian (default), --big-endian, --native-endian");
    println!("Ids are decimal or 0x-prefixed hex. Set RUST_LOG=debug for tracing output.");
}

/// Split flags out of the argument list; the rest are positional.
fn parse_flags(args: impl IntoIterator<Item = String>) -> Result<(Vec<String>, Flags)> {
    let mut flags = Flags::default();
    let mut positional = Vec::new();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--json" => flags.json = true,
            "--little-endian" => flags.decode.byte_order = ByteOrder::Little,
            "--big-endian" => flags.decode.byte_order = ByteOrder::Big,
            "--native-endian" => flags.decode.byte_order = ByteOrder::Native,
            "--case-insensitive" => flags.decode.case_sensitivity = CaseSensitivity::Insensitive,
            "--root" => {
                let Some(dir) = args.next() else {
                    return Err(usage("--root requires a directory"));
                };
                flags.root = Some(PathBuf::from(dir));
            }
            other if other.starts_with("--") => {
                return Err(usage(format!("unknown flag: {other}")));
            }
            _ => positional.push(arg),
        }
    }
    Ok((positional, flags))
}

fn parse_number(text: &str) -> Result<u64> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|_| usage(format!("not a decimal or 0x-hex number: {text}")))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("serialize output")?
    );
    Ok(())
}

fn inspect(path: &Path, flags: &Flags) -> Result<()> {
    let volume = OpenVolume::open(path, &flags.decode)
        .with_context(|| format!("failed to inspect volume header {}", path.display()))?;
    if flags.json {
        return print_json(&volume);
    }

    let header = &volume.header;
    println!("AFS Volume Inspector");
    println!("header: {}", volume.header_path.display());
    println!("id: {}", header.id);
    println!("parent: {}", header.parent);
    println!("read_write: {}", header.is_read_write());

    println!("\nspecial objects:");
    for special in &volume.specials {
        match &special.path {
            Some(path) => println!(
                "  {:<20} {:#018x} {}",
                special.name,
                special.object_id.0,
                path.display()
            ),
            None => println!("  {:<20} -", special.name),
        }
    }

    println!("\nvolume info ({}):", volume.info_path.display());
    for (name, value) in volume.info.fields() {
        if name.starts_with("reserve") {
            continue;
        }
        println!("  {name}: {value}");
    }
    Ok(())
}

fn scan(partitions: &[String], flags: &Flags) -> Result<()> {
    let options = ScanOptions {
        root: flags.root.clone().unwrap_or_else(|| PathBuf::from("/")),
        partitions: partitions.iter().map(PathBuf::from).collect(),
        decode: flags.decode,
    };
    let report = afsvol_core::scan(&options).context("scan failed")?;

    if flags.json {
        print_json(&report)?;
    } else {
        print_scan(&report);
    }

    if !report.is_clean() {
        bail!(
            "{} of {} volume headers or partitions could not be read",
            report.failures.len(),
            report.failures.len() + report.volumes.len()
        );
    }
    Ok(())
}

fn print_scan(report: &ScanReport) {
    for volume in &report.volumes {
        let mut state = Vec::new();
        if !volume.in_service {
            state.push("offline");
        }
        if !volume.blessed {
            state.push("unblessed");
        }
        if volume.needs_salvaged {
            state.push("needs-salvage");
        }
        println!(
            "{:<10} {} {:<22} {} {}",
            volume.id.0,
            volume.volume_type,
            volume.name,
            volume.partition.display(),
            state.join(",")
        );
    }
    for failure in &report.failures {
        eprintln!("skipped {}: {}", failure.path.display(), failure.error);
    }
}

fn namei_path(volume: VolumeId, object: ObjectId, flags: &Flags) -> Result<()> {
    let path = flags.decode.namei().build_for_volume(volume, object);
    if flags.json {
        return print_json(&PathOutput {
            volume_id: volume,
            object_id: object,
            special: object.is_special(),
            path,
        });
    }
    println!("{}", path.display());
    Ok(())
}

fn resolve(path: &Path, flags: &Flags) -> Result<()> {
    let location = flags
        .decode
        .namei()
        .parse(path)
        .map_err(|e| parse_error_to_afs(&e, path))?;
    let output = ResolveOutput {
        volume_id: location.volume_id,
        object_id: location.object_id,
        vnode: location.object_id.vnode(),
        special: location.is_special(),
    };
    if flags.json {
        return print_json(&output);
    }
    println!("volume_id: {}", output.volume_id);
    println!("object_id: {} ({:#x})", output.object_id, output.object_id.0);
    println!("vnode: {}", output.vnode);
    println!("special: {}", output.special);
    Ok(())
}
