use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{bail, Context};
use colored::Colorize;
use db5_codec::{
    scan, type_tag, update_object_attributes, write_ident, AttributeSet, CrackedObject, Db5Error,
    Dli, ObjectReader, ReadConfig, ScanSummary, IDENTITY_HEADER,
};
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    match &cli.command {
        Command::Check(args) => cmd_check(args, cli.read_config(true), format),
        Command::Ls(args) => cmd_ls(args, cli.read_config(args.all), format),
        Command::Attrs(args) => cmd_attrs(args, cli.read_config(false), format),
        Command::Init(args) => cmd_init(args),
        Command::SetAttr(args) => cmd_set_attr(args, cli.read_config(true)),
    }
}

fn open(path: &Path) -> anyhow::Result<BufReader<File>> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    Ok(BufReader::new(file))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Serialize)]
struct Problem {
    offset: u64,
    name: Option<String>,
    error: String,
}

#[derive(Serialize)]
struct CheckReport {
    file: String,
    summary: ScanSummary,
    problems: Vec<Problem>,
}

fn cmd_check(args: &CheckArgs, config: ReadConfig, format: OutputFormat) -> anyhow::Result<()> {
    let mut problems = Vec::new();
    let summary = scan(open(&args.file)?, config, |offset, obj| {
        if let Err(e) = validate(obj) {
            if !e.is_object_local() {
                return Err(e);
            }
            warn!(offset, error = %e, "object failed validation");
            problems.push(Problem {
                offset,
                name: obj.name_bytes().map(|n| String::from_utf8_lossy(n).into_owned()),
                error: e.to_string(),
            });
        }
        Ok(())
    })
    .with_context(|| format!("{} is not a valid v5 database", args.file.display()))?;

    let report = CheckReport {
        file: args.file.display().to_string(),
        summary,
        problems,
    };
    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => {
            let s = &report.summary;
            println!("{} {}", "Checked".bold(), report.file);
            println!(
                "  Objects: {} ({} application, {} header, {} free)",
                s.objects.to_string().bold(),
                s.application_objects,
                s.header_objects,
                s.free_objects
            );
            println!("  Free bytes: {}", s.free_bytes);
            println!("  Total bytes: {}", s.total_bytes);
            for p in &report.problems {
                println!(
                    "  {} offset {} {}: {}",
                    "✗".red().bold(),
                    p.offset,
                    p.name.as_deref().unwrap_or("<unnamed>").yellow(),
                    p.error
                );
            }
            if report.problems.is_empty() {
                println!("{} No issues.", "✓".green().bold());
            }
        }
    }
    if !report.problems.is_empty() {
        bail!("{} objects failed validation", report.problems.len());
    }
    Ok(())
}

/// Per-object checks beyond framing: name and attribute text.
fn validate(obj: &CrackedObject) -> Result<(), Db5Error> {
    obj.name()?;
    obj.attributes()?;
    Ok(())
}

#[derive(Serialize)]
struct ObjectRow {
    offset: u64,
    length: usize,
    dli: String,
    name: Option<String>,
    kind: String,
    attributes: usize,
    body: usize,
}

impl ObjectRow {
    fn new(offset: u64, obj: &CrackedObject) -> anyhow::Result<Self> {
        let header = obj.header();
        let kind = match type_tag(header.major_type, header.minor_type) {
            Some(tag) => tag.to_string(),
            None => format!("{}/{}", header.major_type.as_byte(), header.minor_type),
        };
        Ok(Self {
            offset,
            length: obj.object_len(),
            dli: header.dli.to_string(),
            name: obj.name()?.map(str::to_owned),
            kind,
            attributes: obj.attributes()?.len(),
            body: obj.body().map_or(0, <[u8]>::len),
        })
    }
}

fn cmd_ls(args: &LsArgs, config: ReadConfig, format: OutputFormat) -> anyhow::Result<()> {
    let mut reader = ObjectReader::new(open(&args.file)?, config);
    let mut rows = Vec::new();
    loop {
        let next = if args.all {
            reader.read_next()?
        } else {
            reader.next_object()?
        };
        let Some((offset, obj)) = next else { break };
        rows.push(ObjectRow::new(offset, &obj)?);
    }

    match format {
        OutputFormat::Json => print_json(&rows)?,
        OutputFormat::Text => {
            println!(
                "{:>10} {:>8} {:<6} {:<10} {:>5} {:>8}  {}",
                "OFFSET", "LENGTH", "DLI", "TYPE", "ATTRS", "BODY", "NAME"
            );
            for r in &rows {
                let dli = match r.dli.as_str() {
                    "app" => r.dli.normal(),
                    "free" => r.dli.dimmed(),
                    _ => r.dli.cyan(),
                };
                println!(
                    "{:>10} {:>8} {:<6} {:<10} {:>5} {:>8}  {}",
                    r.offset,
                    r.length,
                    dli,
                    r.kind,
                    r.attributes,
                    r.body,
                    r.name.as_deref().unwrap_or("-").bold()
                );
            }
        }
    }
    Ok(())
}

fn find_object(file: &Path, config: ReadConfig, name: &str) -> anyhow::Result<CrackedObject> {
    for item in ObjectReader::new(open(file)?, config) {
        let (_, obj) = item?;
        if obj.name()? == Some(name) {
            return Ok(obj);
        }
    }
    bail!("object {name:?} not found in {}", file.display())
}

fn cmd_attrs(args: &AttrsArgs, config: ReadConfig, format: OutputFormat) -> anyhow::Result<()> {
    let obj = find_object(&args.file, config, &args.object)?;
    let avs = obj.attributes()?;
    match format {
        OutputFormat::Json => {
            let map: serde_json::Map<String, serde_json::Value> = avs
                .iter()
                .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
                .collect();
            print_json(&map)?;
        }
        OutputFormat::Text => {
            if avs.is_empty() {
                println!("{} has no attributes.", args.object.yellow());
            }
            for (name, value) in avs.iter() {
                println!("{} = {}", name.bold(), value);
            }
        }
    }
    Ok(())
}

fn cmd_init(args: &InitArgs) -> anyhow::Result<()> {
    if !(args.units_mm.is_finite() && args.units_mm > 0.0) {
        bail!("--units-mm must be a positive number, got {}", args.units_mm);
    }
    let file = File::create_new(&args.file)
        .with_context(|| format!("cannot create {}", args.file.display()))?;
    let mut out = BufWriter::new(file);
    let written = write_ident(&mut out, &args.title, args.units_mm)?;
    out.flush()?;
    println!(
        "{} Initialized v5 database {} ({} bytes)",
        "✓".green().bold(),
        args.file.display().to_string().bold(),
        written
    );
    println!("  Title: {}", args.title.cyan());
    Ok(())
}

fn cmd_set_attr(args: &SetAttrArgs, config: ReadConfig) -> anyhow::Result<()> {
    if args.output == args.file {
        bail!("output must differ from the input file");
    }
    let mut overlay = AttributeSet::new();
    for (name, value) in &args.attributes {
        overlay.insert(name.as_str(), value.as_str())?;
    }

    let require_identity = config.require_identity;
    let mut reader = ObjectReader::new(open(&args.file)?, config);
    // Build the copy beside the destination so it only appears once complete.
    let dir = match args.output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let staged = NamedTempFile::new_in(dir)
        .with_context(|| format!("cannot create a temporary file in {}", dir.display()))?;
    let mut out = BufWriter::new(staged);
    if require_identity {
        reader.read_identity()?;
        out.write_all(&IDENTITY_HEADER)?;
    }

    let mut updated = 0;
    while let Some((offset, obj)) = reader.read_next()? {
        let matches = obj.header().dli == Dli::ApplicationData
            && obj.name()? == Some(args.object.as_str());
        if matches {
            let rewritten = update_object_attributes(obj.as_bytes(), None, overlay.clone())?;
            debug!(offset, old = obj.object_len(), new = rewritten.len(), "object rewritten");
            out.write_all(rewritten.as_bytes())?;
            updated += 1;
        } else {
            out.write_all(obj.as_bytes())?;
        }
    }
    if updated == 0 {
        bail!("object {:?} not found in {}", args.object, args.file.display());
    }
    let staged = out.into_inner().map_err(|e| e.into_error())?;
    staged
        .persist(&args.output)
        .map_err(|e| e.error)
        .with_context(|| format!("cannot write {}", args.output.display()))?;
    println!(
        "{} Set {} attribute(s) on {} → {}",
        "✓".green().bold(),
        overlay.len(),
        args.object.yellow(),
        args.output.display()
    );
    Ok(())
}
