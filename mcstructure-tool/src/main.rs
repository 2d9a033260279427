use anyhow::{anyhow, ensure, Context, Result};
use itertools::Itertools;
use log::info;
use mcstructure_common::block_storage::{Block, Position};
use mcstructure_common::summary::StructureSummary;
use mcstructure_common::transform::MirrorAxis;
use mcstructure_common::tree_io::Endianness;
use mcstructure_common::{has_suitable_size, DecodeOptions, StructureDocument};
use std::cmp::Reverse;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Clone, Debug)]
enum Command {
    Info { json: bool },
    Rotate { degrees: i32 },
    Mirror { axis: MirrorAxis },
    Fill { from: Position, to: Position, block: Block },
}

#[derive(Clone, Debug)]
struct Config {
    input_file: PathBuf,
    output_file: Option<PathBuf>,
    endianness: Endianness,
    command: Command,
}

fn parse_position(s: &str) -> Result<Position> {
    let (x, y, z) = s
        .split(',')
        .map(|c| c.trim().parse::<i32>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| anyhow!("Parsing position {:?}", s))?
        .into_iter()
        .collect_tuple()
        .ok_or_else(|| anyhow!("Position {:?} must be X,Y,Z", s))?;
    Ok(Position::new(x, y, z))
}

fn parse_args() -> Result<Config> {
    use clap::{App, Arg, ArgMatches};

    let input = || {
        Arg::with_name("INPUT")
            .help("Structure file to read")
            .index(1)
            .required(true)
    };
    let output = || {
        Arg::with_name("OUTPUT")
            .help("Structure file to write")
            .index(2)
            .required(true)
    };

    let matches = App::new("mcstructure tool")
        .version(env!("CARGO_PKG_VERSION"))
        .author(clap::crate_authors!())
        .about("Inspect and reshape bedrock .mcstructure files")
        .arg(
            Arg::with_name("BIG_ENDIAN")
                .long("big-endian")
                .help("Read and write big-endian trees instead of the native little-endian ones")
                .global(true),
        )
        .subcommand(
            App::new("info")
                .about("Print the size, palette and attachments of a structure")
                .arg(input())
                .arg(
                    Arg::with_name("JSON")
                        .long("json")
                        .help("Print a JSON summary to stdout"),
                ),
        )
        .subcommand(
            App::new("rotate")
                .about("Rotate clockwise, seen from above")
                .arg(input())
                .arg(output())
                .arg(
                    Arg::with_name("ANGLE")
                        .long("angle")
                        .value_name("DEGREES")
                        .possible_values(["0", "90", "180", "270"])
                        .required(true),
                ),
        )
        .subcommand(
            App::new("mirror")
                .about("Mirror across an axis")
                .arg(input())
                .arg(output())
                .arg(
                    Arg::with_name("AXIS")
                        .long("axis")
                        .value_name("AXIS")
                        .possible_values(["x", "z"])
                        .required(true),
                ),
        )
        .subcommand(
            App::new("fill")
                .about("Fill a box of the structure with one block")
                .arg(input())
                .arg(output())
                .arg(
                    Arg::with_name("FROM")
                        .long("from")
                        .value_name("X,Y,Z")
                        .allow_hyphen_values(true)
                        .required(true),
                )
                .arg(
                    Arg::with_name("TO")
                        .long("to")
                        .value_name("X,Y,Z")
                        .allow_hyphen_values(true)
                        .required(true),
                )
                .arg(
                    Arg::with_name("BLOCK")
                        .long("block")
                        .value_name("IDENTIFIER")
                        .required(true),
                ),
        )
        .get_matches();

    let value = |m: &ArgMatches, name: &str| -> Result<String> {
        m.value_of(name)
            .map(str::to_owned)
            .ok_or_else(|| anyhow!("Missing argument {}", name))
    };

    let (name, sub) = matches
        .subcommand()
        .ok_or_else(|| anyhow!("No subcommand given"))?;

    let command = match name {
        "info" => Command::Info {
            json: sub.is_present("JSON"),
        },
        "rotate" => Command::Rotate {
            degrees: value(sub, "ANGLE")?
                .parse()
                .with_context(|| anyhow!("Parsing angle argument"))?,
        },
        "mirror" => Command::Mirror {
            axis: value(sub, "AXIS")?.parse()?,
        },
        "fill" => Command::Fill {
            from: parse_position(&value(sub, "FROM")?)?,
            to: parse_position(&value(sub, "TO")?)?,
            block: Block::new(value(sub, "BLOCK")?),
        },
        _ => return Err(anyhow!("Unknown subcommand {}", name)),
    };

    Ok(Config {
        input_file: PathBuf::from(value(sub, "INPUT")?),
        output_file: sub.value_of_os("OUTPUT").map(PathBuf::from),
        endianness: if sub.is_present("BIG_ENDIAN") {
            Endianness::Big
        } else {
            Endianness::Little
        },
        command,
    })
}

fn load(config: &Config) -> Result<StructureDocument> {
    let mut reader = BufReader::new(
        File::open(&config.input_file)
            .with_context(|| anyhow!("Opening {}", config.input_file.display()))?,
    );
    let doc = StructureDocument::load(&mut reader, config.endianness, &DecodeOptions::default())
        .with_context(|| anyhow!("Loading {}", config.input_file.display()))?;
    info!(
        "Loaded {} with size {:?}",
        config.input_file.display(),
        doc.size()
    );
    Ok(doc)
}

fn save(config: &Config, doc: &StructureDocument) -> Result<()> {
    let path: &Path = config
        .output_file
        .as_deref()
        .ok_or_else(|| anyhow!("No output file given"))?;
    let mut writer = BufWriter::new(
        File::create(path).with_context(|| anyhow!("Creating {}", path.display()))?,
    );
    doc.dump(&mut writer, config.endianness)
        .with_context(|| anyhow!("Writing {}", path.display()))?;
    writer.flush()?;
    info!("Wrote {} with size {:?}", path.display(), doc.size());
    Ok(())
}

fn print_info(doc: &StructureDocument, json: bool) -> Result<()> {
    let summary = StructureSummary::new(doc);
    if json {
        println!("{}", summary.to_json(true)?);
        return Ok(());
    }

    info!(
        "Size {:?}, origin {}, format version {}",
        summary.size,
        doc.origin(),
        summary.format_version
    );
    if !has_suitable_size(summary.size) {
        info!("Structure is larger than a structure block can capture");
    }
    for usage in summary
        .palette
        .iter()
        .sorted_by_key(|u| (Reverse(u.count), u.index))
    {
        info!(
            "{:>8} {:>8}  {}",
            usage.count, usage.secondary_count, usage.block
        );
    }
    if summary.no_block_cells > 0 {
        info!(
            "{:>8} {:>8}  {}",
            summary.no_block_cells,
            0,
            Block::new(Block::STRUCTURE_VOID)
        );
    }
    info!(
        "{} entities, {} block entities, {} waterlogged cells",
        summary.entity_count,
        summary.block_entities.len(),
        summary.layered_cells
    );
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = parse_args()?;

    let mut doc = load(&config)?;

    match &config.command {
        Command::Info { json } => return print_info(&doc, *json),
        Command::Rotate { degrees } => {
            info!("Rotating {} degrees clockwise", degrees);
            doc.rotate(*degrees)?;
        }
        Command::Mirror { axis } => {
            info!("Mirroring across {}", axis);
            doc.mirror(*axis)?;
        }
        Command::Fill { from, to, block } => {
            ensure!(
                !block.identifier.is_empty(),
                "Block identifier must not be empty"
            );
            info!("Filling {} to {} with {}", from, to, block);
            doc.fill_region(*from, *to, block)
                .context("Error during fill")?;
        }
    }

    save(&config, &doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_parse_with_negatives() -> Result<()> {
        assert_eq!(parse_position("1, -2,3")?, Position::new(1, -2, 3));
        parse_position("1,2").expect_err("Two components unexpectedly parsed");
        parse_position("1,2,3,4").expect_err("Four components unexpectedly parsed");
        parse_position("a,2,3").expect_err("Letters unexpectedly parsed");
        Ok(())
    }
}
