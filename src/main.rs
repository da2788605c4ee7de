use scorepage::{AnalysisConfig, Page, PageFormat, PmxOptions};
use std::env;
use std::fs;
use std::path::Path;
use std::process;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: scorepage [--config <analysis.yaml>] [--auto] <input> [output]";

/// `.pmx` and `.txt` outputs are written as text, everything else as binary.
fn output_format(path: &str) -> PageFormat {
    match Path::new(path).extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("pmx") || ext.eq_ignore_ascii_case("txt") => PageFormat::Pmx,
        _ => PageFormat::Binary,
    }
}

fn print_summary(page: &mut Page) -> Result<(), scorepage::ScoreError> {
    println!("items: {}", page.len());
    for staff in page.staff_numbers()? {
        let count = page.staff_items(staff)?.len();
        let duration = page.staff_duration(staff)?;
        println!("staff {}: {} items, {} quarter notes", staff, count, duration);
    }
    let systems = page.systems()?.to_vec();
    for (index, system) in systems.iter().enumerate() {
        let measures = page.measures(index)?.len();
        println!("system {}: staves {:?}, {} measures", index, system.staves, measures);
    }
    println!("ties: {}", page.ties()?.len());
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let mut config_path: Option<&String> = None;
    let mut include_auto = false;
    let mut positional: Vec<&String> = Vec::new();

    // Parse flags
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => match iter.next() {
                Some(path) => config_path = Some(path),
                None => {
                    eprintln!("{}", USAGE);
                    process::exit(1);
                }
            },
            "--auto" => include_auto = true,
            _ => positional.push(arg),
        }
    }

    let (input_path, output_path) = match positional.as_slice() {
        [input] => (*input, None),
        [input, output] => (*input, Some(*output)),
        _ => {
            eprintln!("{}", USAGE);
            process::exit(1);
        }
    };

    let config = match config_path {
        Some(path) => {
            let content = match fs::read_to_string(path) {
                Ok(content) => content,
                Err(e) => {
                    eprintln!("Error reading config '{}': {}", path, e);
                    process::exit(1);
                }
            };
            match AnalysisConfig::from_yaml(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Error in config '{}': {}", path, e);
                    process::exit(1);
                }
            }
        }
        None => AnalysisConfig::default(),
    };

    // Read input file
    let bytes = match fs::read(input_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", input_path, e);
            process::exit(1);
        }
    };
    let mut page = Page::with_config(config);
    if let Err(e) = page.load(&bytes) {
        eprintln!("Error in '{}': {}", input_path, e);
        process::exit(1);
    }

    if let Err(e) = page.analyze() {
        eprintln!("Analysis error: {}", e);
        process::exit(1);
    }

    // Output
    match output_path {
        Some(path) => {
            let result = match output_format(path) {
                PageFormat::Pmx => fs::write(path, page.to_pmx(PmxOptions { include_auto })),
                PageFormat::Binary => fs::write(path, page.to_binary()),
            };
            if let Err(e) = result {
                eprintln!("Error writing to '{}': {}", path, e);
                process::exit(1);
            }
            eprintln!("Wrote {} items to {}", page.len(), path);
        }
        None => {
            if let Err(e) = print_summary(&mut page) {
                eprintln!("Analysis error: {}", e);
                process::exit(1);
            }
        }
    }
}
