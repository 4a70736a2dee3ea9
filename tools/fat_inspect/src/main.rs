//! Browse a FAT32 disk image from the host.
//!
//! ```text
//! fat_inspect [-v|-vv] <image> ls [-a] [dir]
//! fat_inspect [-v|-vv] <image> cat [--recorded-size] <file>
//! fat_inspect [-v|-vv] <image> tree [dir]
//! ```

mod logger;

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::{env, process};

use fat32_walk::{
    BlockDev, DirectoryHandle, EntryFields, EntryKind, EofPolicy, Fat32, FatDate, FatError, FatTime, FieldMask,
};
use log::LevelFilter;

/// A disk image file addressed in sectors.
struct FileDisk(File);

impl BlockDev for FileDisk {
    fn read(&mut self, lba: u64, buf: &mut [u8]) -> bool {
        let off = lba * buf.len() as u64;
        if self.0.seek(SeekFrom::Start(off)).is_err() {
            return false;
        }
        self.0.read_exact(buf).is_ok()
    }
}

enum Command {
    Ls { all: bool, path: String },
    Cat { policy: EofPolicy, path: String },
    Tree { path: String },
}

struct Args {
    verbosity: u8,
    image: String,
    command: Command,
}

fn usage() -> ! {
    eprintln!("usage: fat_inspect [-v|-vv] <image> ls [-a] [dir]");
    eprintln!("       fat_inspect [-v|-vv] <image> cat [--recorded-size] <file>");
    eprintln!("       fat_inspect [-v|-vv] <image> tree [dir]");
    process::exit(2);
}

fn parse_args() -> Args {
    let mut verbosity = 0;
    let mut flags = Vec::new();
    let mut positional = Vec::new();
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "-v" => verbosity += 1,
            "-vv" => verbosity += 2,
            s if s.starts_with('-') => flags.push(arg),
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.into_iter();
    let (Some(image), Some(cmd)) = (positional.next(), positional.next()) else {
        usage();
    };
    let path = positional.next();
    if positional.next().is_some() {
        usage();
    }
    let has_flag = |f: &str| flags.iter().any(|a| a == f);

    let command = match cmd.as_str() {
        "ls" => Command::Ls { all: has_flag("-a"), path: path.unwrap_or_else(|| "/".into()) },
        "cat" => Command::Cat {
            policy: if has_flag("--recorded-size") { EofPolicy::RecordedSize } else { EofPolicy::ZeroTail },
            path: path.unwrap_or_else(|| usage()),
        },
        "tree" => Command::Tree { path: path.unwrap_or_else(|| "/".into()) },
        _ => usage(),
    };
    Args { verbosity, image, command }
}

fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|c| !c.is_empty())
}

/// Walk `path` from the root, one component at a time.
fn walk<D: BlockDev>(fs: &mut Fat32<D>, path: &str) -> Result<DirectoryHandle, FatError> {
    let mut handle = fs.root();
    for component in components(path) {
        fs.resolve_child(&mut handle, component)?;
    }
    Ok(handle)
}

fn split_parent(path: &str) -> (&str, &str) {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some((dir, name)) => (dir, name),
        None => ("", trimmed),
    }
}

fn format_date(date: FatDate) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day())
}

fn format_time(time: FatTime) -> String {
    format!("{:02}:{:02}", time.hour(), time.minute())
}

fn format_size(size: u32) -> String {
    const UNITS: [&str; 4] = ["B", "K", "M", "G"];
    let mut value = size as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 { format!("{size}B") } else { format!("{value:.1}{}", UNITS[unit]) }
}

fn print_entry(out: &mut impl Write, e: &EntryFields) -> std::io::Result<()> {
    let kind = match e.kind {
        Some(EntryKind::Directory) => 'd',
        _ => '-',
    };
    let modified = e
        .last_modified
        .map(|(d, t)| format!("{} {}", format_date(d), format_time(t)))
        .unwrap_or_default();
    let size = match e.kind {
        Some(EntryKind::Directory) => String::new(),
        _ => e.size.map(format_size).unwrap_or_default(),
    };
    writeln!(
        out,
        "{kind} {modified:16} {size:>8}  {:12}  {}",
        e.short_name.as_deref().unwrap_or(""),
        e.long_name.as_deref().unwrap_or(""),
    )
}

fn ls<D: BlockDev>(fs: &mut Fat32<D>, path: &str, all: bool) -> Result<(), FatError> {
    let dir = walk(fs, path)?;
    let mut mask = FieldMask::LAST_MODIFIED | FieldMask::SIZE | FieldMask::TYPE | FieldMask::SHORT_NAME | FieldMask::LONG_NAME;
    if all {
        mask |= FieldMask::HIDDEN;
    }
    let mut out = std::io::stdout().lock();
    for entry in fs.list(&dir, mask) {
        let entry = entry?;
        if print_entry(&mut out, &entry).is_err() {
            break;
        }
    }
    Ok(())
}

fn cat<D: BlockDev>(fs: &mut Fat32<D>, path: &str) -> Result<(), FatError> {
    let (dir_path, name) = split_parent(path);
    let dir = walk(fs, dir_path)?;
    let mut out = std::io::stdout().lock();
    for chunk in fs.open_file(&dir, name)? {
        if out.write_all(&chunk?).is_err() {
            break;
        }
    }
    Ok(())
}

fn tree<D: BlockDev>(fs: &mut Fat32<D>, path: &str) -> Result<(), FatError> {
    let mut dir = walk(fs, path)?;
    println!("{}", dir.long_path());
    tree_level(fs, &mut dir, 1)
}

fn tree_level<D: BlockDev>(fs: &mut Fat32<D>, dir: &mut DirectoryHandle, depth: usize) -> Result<(), FatError> {
    let mask = FieldMask::TYPE | FieldMask::LONG_NAME;
    let entries: Vec<EntryFields> = fs.list(dir, mask).collect::<Result<_, _>>()?;
    for e in entries {
        let name = e.long_name.unwrap_or_default();
        if name == "." || name == ".." {
            continue;
        }
        println!("{:indent$}{name}", "", indent = depth * 2);
        if e.kind == Some(EntryKind::Directory) {
            fs.resolve_child(dir, &name)?;
            tree_level(fs, dir, depth + 1)?;
            fs.resolve_parent(dir)?;
        }
    }
    Ok(())
}

fn main() {
    let args = parse_args();
    let level = match args.verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if let Err(e) = logger::init(level) {
        eprintln!("fat_inspect: logger: {e}");
    }

    let file = match File::open(&args.image) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("fat_inspect: {}: {e}", args.image);
            process::exit(1);
        }
    };
    let mut fs = match Fat32::mount(FileDisk(file)) {
        Ok(fs) => fs,
        Err(e) => {
            eprintln!("fat_inspect: {}: {e}", args.image);
            process::exit(1);
        }
    };

    let result = match args.command {
        Command::Ls { all, path } => ls(&mut fs, &path, all),
        Command::Cat { policy, path } => {
            let mut fs = fs.with_eof_policy(policy);
            cat(&mut fs, &path)
        }
        Command::Tree { path } => tree(&mut fs, &path),
    };
    if let Err(e) = result {
        eprintln!("fat_inspect: {e}");
        process::exit(1);
    }
}
