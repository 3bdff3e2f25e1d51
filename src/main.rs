use clap::Parser;
use log::{error, info};
use std::process::ExitCode;

use labelme2coco::{config::Args, Converter};

fn main() -> ExitCode {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match args.to_convert_config() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    info!(
        "Converting LabelMe annotations in {} to COCO format...",
        args.input_dir.display()
    );

    match Converter::new(config).convert(&args.input_dir, &args.output_path) {
        Ok(summary) => {
            summary.print_summary();
            info!("COCO conversion completed: {}", args.output_path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Conversion failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
