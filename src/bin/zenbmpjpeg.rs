use std::path::PathBuf;
use std::process::exit;

use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use log::{Level, error, info};
use zenbmpjpeg::{ConvertError, Converter, Limits, PalettePolicy};

fn io_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("in")
            .short('i')
            .long("input")
            .help("Input file to read data from")
            .value_parser(value_parser!(PathBuf))
            .required(true),
    )
    .arg(
        Arg::new("out")
            .short('o')
            .long("output")
            .help("Output to write the data to")
            .value_parser(value_parser!(PathBuf))
            .required(true),
    )
}

fn create_cmd_args() -> Command {
    Command::new("zenbmpjpeg")
        .about("Convert between uncompressed BMP and baseline JPEG")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(io_args(
            Command::new("bmp2jpeg").about("Compress a 24-bit or 8-bit BMP into a JPEG"),
        ))
        .subcommand(io_args(
            Command::new("jpeg2bmp").about("Decompress a JPEG into an uncompressed BMP"),
        ))
        .subcommand(io_args(
            Command::new("copy-bmp").about("Rewrite a BMP with freshly built headers"),
        ))
        .subcommand(io_args(
            Command::new("copy-jpeg").about("Decode a JPEG and encode it again"),
        ))
        .subcommand(io_args(
            Command::new("convert").about("Convert to the other format, detected from the input"),
        ))
        .arg(
            Arg::new("quality")
                .long("quality")
                .short('q')
                .global(true)
                .help("JPEG quality, 1 to 100")
                .value_parser(value_parser!(u8).range(1..=100))
                .default_value("90"),
        )
        .arg(
            Arg::new("max-width")
                .long("max-width")
                .global(true)
                .help_heading("ADVANCED")
                .help("Refuse images wider than this")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("max-height")
                .long("max-height")
                .global(true)
                .help_heading("ADVANCED")
                .help("Refuse images taller than this")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("strict-palette")
                .long("strict-palette")
                .global(true)
                .action(ArgAction::SetTrue)
                .help_heading("ADVANCED")
                .help("Fail on 8-bit images whose palette is not a grayscale ramp"),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .global(true)
                .action(ArgAction::SetTrue)
                .help_heading("LOGGING")
                .help("Display debug information and higher"),
        )
        .arg(
            Arg::new("trace")
                .long("trace")
                .global(true)
                .action(ArgAction::SetTrue)
                .help_heading("LOGGING")
                .help("Display very verbose information"),
        )
        .arg(
            Arg::new("warn")
                .long("warn")
                .global(true)
                .action(ArgAction::SetTrue)
                .help_heading("LOGGING")
                .help("Display warnings and errors"),
        )
        .arg(
            Arg::new("info")
                .long("info")
                .global(true)
                .action(ArgAction::SetTrue)
                .help_heading("LOGGING")
                .help("Display information about the conversion"),
        )
}

/// Set up logging options
fn setup_logger(options: &ArgMatches) {
    let flag = |name: &str| options.get_flag(name);

    let log_level = if flag("debug") {
        Level::Debug
    } else if flag("trace") {
        Level::Trace
    } else if flag("warn") {
        Level::Warn
    } else if flag("info") {
        Level::Info
    } else {
        Level::Warn
    };

    if let Err(e) = simple_logger::init_with_level(log_level) {
        eprintln!("could not initialize logger: {e}");
    }
    info!("Log level :{}", log_level);
}

fn converter(options: &ArgMatches) -> Converter {
    let limits = Limits {
        max_width: options.get_one::<u64>("max-width").copied(),
        max_height: options.get_one::<u64>("max-height").copied(),
        ..Default::default()
    };
    let policy = if options.get_flag("strict-palette") {
        PalettePolicy::RequireGrayscale
    } else {
        PalettePolicy::Passthrough
    };
    let quality = options.get_one::<u8>("quality").copied().unwrap_or(90);

    Converter::new()
        .with_quality(quality)
        .with_limits(limits)
        .with_palette_policy(policy)
}

fn run(name: &str, options: &ArgMatches) -> Result<(), ConvertError> {
    // both required by clap
    let (Some(input), Some(output)) = (
        options.get_one::<PathBuf>("in"),
        options.get_one::<PathBuf>("out"),
    ) else {
        return Err(ConvertError::InvalidFormat("missing input or output".into()));
    };
    let converter = converter(options);
    info!("{name}: {} -> {}", input.display(), output.display());

    match name {
        "bmp2jpeg" => converter.bmp_to_jpeg(input, output),
        "jpeg2bmp" => converter.jpeg_to_bmp(input, output),
        "copy-bmp" => converter.duplicate_bmp(input, output),
        "copy-jpeg" => converter.duplicate_jpeg(input, output),
        _ => converter.convert(input, output).map(|format| {
            info!("wrote {format:?}");
        }),
    }
}

fn main() {
    let options = create_cmd_args().get_matches();
    let Some((name, sub_options)) = options.subcommand() else {
        exit(2);
    };
    setup_logger(sub_options);

    if let Err(e) = run(name, sub_options) {
        error!("Could not complete {name}, reason {e}");
        eprintln!("zenbmpjpeg {name}: {e}");
        exit(1);
    }
}
