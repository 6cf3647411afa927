use clap::{ArgAction, Parser};
use moovtree::{
    Atom, AtomFields, FourCC, ParseOptions, default_registry, find_all_by_path, identify_with,
    known_boxes::KnownBox,
    util::{hex_dump, read_slice},
};
use std::fs::File;
use std::io::BufReader;

#[derive(Parser, Debug)]
#[command(version, about = "MP4/MOV/M4A atom tree explorer")]
struct Args {
    /// MP4/MOV/M4A file path
    path: String,

    /// Only print subtree(s) matching a dotted path (e.g. moov.trak.mdia)
    #[arg(long = "filter")]
    filter: Option<String>,

    /// Hex dump the payload of every atom with this type code (e.g. --raw mdat)
    #[arg(long = "raw")]
    raw: Option<String>,

    /// Bytes to show when dumping raw (0 means the entire payload)
    #[arg(long, default_value_t = 256)]
    bytes: u64,

    /// Deepest branch nesting to follow
    #[arg(long, default_value_t = ParseOptions::DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// Sibling atoms read per level before giving up on that level
    #[arg(long, default_value_t = ParseOptions::DEFAULT_MAX_ATOMS_PER_LEVEL)]
    max_atoms: usize,

    /// Emit JSON instead of a human-readable tree
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let opts = ParseOptions::new()
        .max_depth(args.max_depth)
        .max_atoms_per_level(args.max_atoms);

    let mut f = BufReader::new(File::open(&args.path)?);
    let Some(info) = identify_with(&mut f, &opts, &default_registry())? else {
        eprintln!("{}: not an MP4/MOV/M4A file", args.path);
        std::process::exit(1);
    };

    let targets: Vec<&Atom> = match &args.filter {
        Some(path) => {
            let segs: Vec<&str> = path.split('.').collect();
            find_all_by_path(&info.atoms, &segs)
        }
        None => info.atoms.iter().collect(),
    };

    if args.json {
        if args.filter.is_some() {
            println!("{}", serde_json::to_string_pretty(&targets)?);
        } else {
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        return Ok(());
    }

    println!("brand: {} (major {})", info.brand, info.major_brand);
    let mut out = String::new();
    print_atoms(&targets, &mut out, &mut Vec::new());
    print!("{out}");

    if let Some(sel) = &args.raw {
        let Some(cc) = FourCC::from_code(sel) else {
            anyhow::bail!("--raw expects a four-character type code, got {sel:?}");
        };
        let mut matches = Vec::new();
        collect_by_type(&info.atoms, cc, &mut matches);
        for (i, a) in matches.into_iter().enumerate() {
            dump_raw(&mut f, i, a, args.bytes)?;
        }
    }

    Ok(())
}

// ---------- Human-readable tree ----------

fn print_atoms(atoms: &[&Atom], out: &mut String, lanes: &mut Vec<&'static str>) {
    let n = atoms.len();
    for (i, atom) in atoms.iter().enumerate() {
        let last = i + 1 == n;
        let has_children = atom.children().is_some_and(|c| !c.is_empty());
        let connector = if last { "└" } else { "├" };
        let down = if has_children { "┬" } else { "─" };
        let left = if last { " " } else { "│" };

        out.push_str(&format!(
            "{}{}{}─{}\n",
            lanes.concat(),
            connector,
            down,
            describe(atom)
        ));

        if let Some(fields) = atom.fields() {
            for line in field_lines(fields) {
                out.push_str(&format!("{}{}   {}\n", lanes.concat(), left, line));
            }
        }

        if let Some(children) = atom.children() {
            let kids: Vec<&Atom> = children.iter().collect();
            lanes.push(left);
            print_atoms(&kids, out, lanes);
            lanes.pop();
        }
    }
}

fn describe(atom: &Atom) -> String {
    let path = atom
        .path
        .iter()
        .map(FourCC::as_str_lossy)
        .collect::<Vec<_>>()
        .join(".");
    format!(
        "{} ({}): {} bytes at {:#x} [{}]",
        atom.typ,
        path,
        atom.size,
        atom.offset,
        KnownBox::from(atom.typ).full_name()
    )
}

fn field_lines(fields: &AtomFields) -> Vec<String> {
    match fields {
        AtomFields::Opaque => Vec::new(),
        AtomFields::Failed(e) => vec![format!("decode error: {e}")],
        AtomFields::Decoded(map) => map
            .iter()
            .map(|(name, value)| {
                let rendered =
                    serde_json::to_string(value).unwrap_or_else(|_| format!("{value:?}"));
                format!("{name}: {rendered}")
            })
            .collect(),
    }
}

// ---------- Raw dump ----------

fn collect_by_type<'a>(atoms: &'a [Atom], cc: FourCC, out: &mut Vec<&'a Atom>) {
    for a in atoms {
        if a.typ == cc {
            out.push(a);
        }
        if let Some(kids) = a.children() {
            collect_by_type(kids, cc, out);
        }
    }
}

fn dump_raw(f: &mut BufReader<File>, i: usize, atom: &Atom, limit: u64) -> anyhow::Result<()> {
    let off = atom.offset + moovtree::BoxHeader::SIZE;
    let len = atom.size.saturating_sub(moovtree::BoxHeader::SIZE);
    let to_read = if limit == 0 { len } else { len.min(limit) };
    let data = read_slice(f, off, to_read)?;
    println!(
        "\n== Dump {} ({}) payload: offset={:#x}, len={} ==",
        i,
        atom.typ,
        off,
        data.len()
    );
    print!("{}", hex_dump(&data, off));
    Ok(())
}
