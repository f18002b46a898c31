use std::path::PathBuf;

use serde::Serialize;
use skylink_codegen::{write_artifact, Generator};
use skylink_schema::{Definitions, Schema};

use crate::cmd::GenerateArgs;
use crate::exit::{definition_error, generation_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

#[derive(Serialize)]
struct GenerateOutput<'a> {
    board: &'a str,
    boards: usize,
    packets: usize,
    artifacts: Vec<String>,
}

pub fn run(args: GenerateArgs, format: OutputFormat) -> CliResult<i32> {
    let progress = format != OutputFormat::Json;

    let schema = load_schema(&args.files, progress)?;

    let artifacts = step(progress, &format!("Planning board {}", args.board), || {
        Generator::new()
            .generate(&schema, &args.board)
            .map_err(|err| generation_error("generation failed", err))
    })?;

    let mut written: Vec<PathBuf> = Vec::with_capacity(artifacts.len());
    for artifact in &artifacts {
        let path = step(progress, &format!("Generating {}", artifact.file_name), || {
            write_artifact(&args.dest, artifact)
                .map_err(|err| generation_error("write failed", err))
        })?;
        written.push(path);
    }

    if !progress {
        let out = GenerateOutput {
            board: &args.board,
            boards: schema.boards().count(),
            packets: schema.packets_by_address().len(),
            artifacts: written.iter().map(|p| p.display().to_string()).collect(),
        };
        println!(
            "{}",
            serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
        );
    }

    Ok(SUCCESS)
}

/// Load and validate every definition file.
pub(crate) fn load_schema(files: &[PathBuf], progress: bool) -> CliResult<Schema> {
    let mut definitions = Definitions::new();
    for file in files {
        step(progress, &format!("Loading {}", file.display()), || {
            definitions
                .load_file(file)
                .map_err(|err| definition_error(&format!("error parsing {}", file.display()), err))
        })?;
    }

    step(progress, "Validating definitions", move || {
        definitions
            .finish()
            .map_err(|err| definition_error("validation failed", err))
    })
}

fn step<T>(progress: bool, label: &str, f: impl FnOnce() -> CliResult<T>) -> CliResult<T> {
    if progress {
        print!("{label}... ");
    }
    let result = f();
    if progress {
        println!("{}", if result.is_ok() { "[OK]" } else { "[FAIL]" });
    }
    result
}
