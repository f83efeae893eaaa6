use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use mp4tree::{
    DecodeOptions, FourCC, MdatPolicy, Mp4Atom, Mp4File,
    util::{describe, find_boxes},
};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Inspect and rewrite MP4/ISOBMFF box trees")]
struct Args {
    /// Log every box header as it is read
    #[arg(short, long, global = true, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the box tree
    Info {
        path: String,

        /// Emit JSON instead of the indented tree
        #[arg(long, action = ArgAction::SetTrue)]
        json: bool,

        /// Limit recursion depth of the tree output
        #[arg(long, default_value_t = 64)]
        max_depth: usize,
    },

    /// Decode a file and encode it again
    Copy {
        src: String,
        dst: String,

        /// Stream media data from the source instead of buffering it
        #[arg(long, action = ArgAction::SetTrue)]
        defer_mdat: bool,
    },

    /// Hex dump the payload of every box of a type (e.g. `raw in.mp4 stsd`)
    Raw {
        path: String,
        typ: String,

        /// Bytes to show per box (0 means the whole payload)
        #[arg(long, default_value_t = 0)]
        bytes: usize,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("mp4tree=trace")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Sixteen bytes per row in two groups of eight, each row led by its file
/// offset and followed by the printable characters.
fn write_hex(out: &mut impl Write, bytes: &[u8], offset: u64) -> io::Result<()> {
    for (row_offset, row) in (offset..).step_by(16).zip(bytes.chunks(16)) {
        write!(out, "{row_offset:010x}:")?;
        for (i, b) in row.iter().enumerate() {
            let gap = if i == 8 { "  " } else { " " };
            write!(out, "{gap}{b:02x}")?;
        }
        // short last row: pad so the text column lines up
        let pad = (16 - row.len()) * 3 + usize::from(row.len() <= 8);
        let text: String = row
            .iter()
            .map(|&c| if c.is_ascii_graphic() || c == b' ' { c as char } else { '.' })
            .collect();
        writeln!(out, "{:pad$}   {text}", "")?;
    }
    Ok(())
}

fn open(path: &str, options: DecodeOptions) -> anyhow::Result<Mp4File> {
    let f = File::open(path).with_context(|| format!("opening {path}"))?;
    let mut r = BufReader::new(f);
    Mp4File::decode_with(&mut r, options).with_context(|| format!("decoding {path}"))
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    match args.command {
        Command::Info {
            path,
            json,
            max_depth,
        } => {
            let file = open(&path, DecodeOptions::default())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&file)?);
            } else {
                print!("{}", file.dump_depth(max_depth));
            }
        }

        Command::Copy {
            src,
            dst,
            defer_mdat,
        } => {
            let mdat = if defer_mdat { MdatPolicy::Defer } else { MdatPolicy::Buffer };
            let file = open(&src, DecodeOptions { mdat })?;
            let mut out = BufWriter::new(File::create(&dst).with_context(|| format!("creating {dst}"))?);
            if defer_mdat {
                let mut source = File::open(&src)?;
                file.encode_from(&mut source, &mut out)?;
            } else {
                file.encode(&mut out)?;
            }
            out.flush()?;
        }

        Command::Raw { path, typ, bytes } => {
            let typ = FourCC::padded(&typ);
            let file = open(&path, DecodeOptions::default())?;
            let found = find_boxes(&file.top_level_boxes(), typ);
            if found.is_empty() {
                anyhow::bail!("no {typ} box in {path}");
            }
            for b in found {
                let mut payload = Vec::<u8>::new();
                b.atom.encode_payload(&mut payload)?;
                let header = b.atom.size() - b.atom.payload_size();
                let show = if bytes == 0 { payload.len() } else { bytes.min(payload.len()) };
                let mut out = io::stdout().lock();
                writeln!(
                    out,
                    "{} at {:#x}, {} payload bytes (showing {show})",
                    describe(b.atom, &payload),
                    b.offset,
                    payload.len()
                )?;
                write_hex(&mut out, &payload[..show], b.offset + header)?;
            }
        }
    }
    Ok(())
}
