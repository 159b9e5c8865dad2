use std::path::PathBuf;
use std::time::Instant;

use clap::Command;

fn main() {
    let command = Command::new("sfdlib")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Parse FontForge SFD sources")
        .arg(
            clap::Arg::new("input")
                .help("Path to an .sfd file or SFDir directory")
                .required(true)
                .index(1),
        )
        .arg(
            clap::Arg::new("output")
                .help("Write the parsed font as JSON to this path")
                .index(2),
        )
        .arg(
            clap::Arg::new("verbosity")
                .short('v')
                .long("verbosity")
                .help("Set the level of verbosity")
                .action(clap::ArgAction::Count),
        )
        .arg(
            clap::Arg::new("ignore_uvs")
                .long("ignore-variation-selectors")
                .help("Drop variation-selector alternates instead of failing on them")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            clap::Arg::new("ufo_anchors")
                .long("preserve-ufo-anchors")
                .help("Keep anchor points on glyphs instead of generating mark features")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            clap::Arg::new("features")
                .long("features-out")
                .value_name("PATH")
                .help("Write the generated feature program to this path"),
        );

    let args = command.get_matches();
    env_logger::Builder::new()
        .filter_level(match args.get_count("verbosity") {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        })
        .init();

    let input = PathBuf::from(args.get_one::<String>("input").unwrap());
    let options = sfdlib::SfdOptions {
        ignore_variation_selectors: args.get_flag("ignore_uvs"),
        preserve_ufo_anchors: args.get_flag("ufo_anchors"),
    };

    let started = Instant::now();
    let font = match sfdlib::load_with_options(&input, options) {
        Ok(font) => font,
        Err(error) => {
            log::error!("Could not parse {}: {}", input.display(), error);
            std::process::exit(1);
        }
    };
    log::info!(
        "Parsed {} glyphs from {} in {:?}",
        font.glyph_order.len(),
        input.display(),
        started.elapsed()
    );

    if let Some(path) = args.get_one::<String>("features") {
        if let Err(error) = std::fs::write(path, &font.features) {
            log::error!("Could not write {}: {}", path, error);
            std::process::exit(1);
        }
    }

    if let Some(output) = args.get_one::<String>("output") {
        let file = match std::fs::File::create(output) {
            Ok(file) => file,
            Err(error) => {
                log::error!("Could not create {}: {}", output, error);
                std::process::exit(1);
            }
        };
        if let Err(error) = serde_json::to_writer_pretty(std::io::BufWriter::new(file), &font) {
            log::error!("Could not serialize font: {}", error);
            std::process::exit(1);
        }
    }
}
