use std::path::PathBuf;

use linkhub::app::{self, AppOptions};

fn main() -> anyhow::Result<()> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    app::run(options)
}

fn parse_args(args: Vec<String>) -> anyhow::Result<AppOptions> {
    let mut out = AppOptions::default();
    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--config" | "-c" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("--config requires a file path");
                };
                if value.trim().is_empty() {
                    anyhow::bail!("--config cannot be empty");
                }
                out.config_path = Some(PathBuf::from(value.trim()));
            }
            "--null-audio" => out.null_audio = true,
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other => anyhow::bail!("unknown argument {other}"),
        }
        index += 1;
    }
    Ok(out)
}

fn print_help() {
    println!("linkhub");
    println!("  -c, --config <file>   Use this config file instead of ~/.config/linkhub/linkhub.json");
    println!("  --null-audio          Run without opening an audio device");
    println!("  -h, --help            Show this help");
}
