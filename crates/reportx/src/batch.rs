use std::path::{Path, PathBuf};

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use structure::{SectionType, StructureConfig, StructureSummary};

use crate::prelude::{println, *};

const OUTPUT_SUFFIX: &str = ".structure.json";

#[derive(Debug, clap::Args, Clone)]
pub struct Options {
    /// Directory of input documents (*.json)
    pub dir: PathBuf,

    /// Directory for the per-document results
    #[arg(short, long)]
    pub out: PathBuf,

    /// Number of worker threads (defaults to one per core)
    #[arg(short, long, env = "REPORTX_JOBS")]
    pub jobs: Option<usize>,
}

/// Result of structuring one file of a batch.
#[derive(Debug)]
pub struct Outcome {
    pub name: String,
    pub result: std::result::Result<StructureSummary, String>,
}

pub fn run(options: Options, config: &StructureConfig, verbose: bool) -> Result<()> {
    let inputs = collect_inputs(&options.dir)?;
    std::fs::create_dir_all(&options.out)
        .wrap_err_with(|| f!("Failed to create output directory {}", options.out.display()))?;

    if verbose {
        println!("Structuring {} documents...", inputs.len());
    }

    let progress = ProgressBar::new(inputs.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .map_err(|e| eyre!("Invalid progress template: {}", e))?
            .progress_chars("=> "),
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.jobs.unwrap_or(0))
        .build()
        .map_err(|e| eyre!("Failed to start worker pool: {}", e))?;
    let outcomes = pool.install(|| process_all(&inputs, &options.out, config, &progress));
    progress.finish_and_clear();

    print_outcomes(&outcomes);
    Ok(())
}

/// Every `*.json` file in `dir`, sorted, excluding previous results.
pub fn collect_inputs(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .wrap_err_with(|| f!("Failed to read input directory {}", dir.display()))?;

    let mut inputs = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if path.is_file() && name.ends_with(".json") && !name.ends_with(OUTPUT_SUFFIX) {
            inputs.push(path);
        }
    }
    if inputs.is_empty() {
        return Err(Error::EmptyBatch(dir.display().to_string()).into());
    }
    inputs.sort();
    Ok(inputs)
}

/// `<out>/<stem>.structure.json`
pub fn output_path(input: &Path, out: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    out.join(f!("{}{}", stem, OUTPUT_SUFFIX))
}

/// Structure every input in parallel. A failing document is recorded and
/// the rest continue.
pub fn process_all(
    inputs: &[PathBuf],
    out: &Path,
    config: &StructureConfig,
    progress: &ProgressBar,
) -> Vec<Outcome> {
    inputs
        .par_iter()
        .map(|input| {
            let name = input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let result = process_one(input, out, config).map_err(|e| {
                log::warn!("{}: {}", name, e);
                e.to_string()
            });
            progress.set_message(name.clone());
            progress.inc(1);
            Outcome { name, result }
        })
        .collect()
}

fn process_one(input: &Path, out: &Path, config: &StructureConfig) -> Result<StructureSummary> {
    let doc = crate::input::structure_file(input, config)?;
    let target = output_path(input, out);
    let json = serde_json::to_string_pretty(&doc)?;
    std::fs::write(&target, json).wrap_err_with(|| f!("Failed to write {}", target.display()))?;
    Ok(doc.summary)
}

fn print_outcomes(outcomes: &[Outcome]) {
    let mut table = new_table();
    table.add_row(prettytable::row![
        "Document", "Pages", "Lines", "LETTER", "MD&A", "Headings"
    ]);

    for outcome in outcomes {
        match &outcome.result {
            Ok(summary) => {
                table.add_row(prettytable::row![
                    outcome.name,
                    f!("{}/{}", summary.physical_pages, summary.logical_pages),
                    summary.line_count,
                    section_cell(summary, SectionType::Letter),
                    section_cell(summary, SectionType::Mdna),
                    summary.heading_count
                ]);
            }
            Err(err) => {
                table.add_row(prettytable::row![
                    outcome.name,
                    "-",
                    "-",
                    "error".red(),
                    "error".red(),
                    err
                ]);
            }
        }
    }
    table.printstd();

    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    println!(
        "\n{} documents, {} structured, {} failed",
        outcomes.len().to_string().bold(),
        (outcomes.len() - failed).to_string().green(),
        failed.to_string().red()
    );
}

fn section_cell(summary: &StructureSummary, section_type: SectionType) -> String {
    match summary.sections.iter().find(|s| s.section_type == section_type) {
        Some(s) if s.found => {
            let pages = s.pages.map(|(a, b)| f!("p{}-{}", a, b)).unwrap_or_default();
            f!("{} {:.2} {}", "found".green(), s.confidence, pages)
        }
        _ => "not found".red().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::tests::LETTER_DOC;

    #[test]
    fn test_output_path() {
        assert_eq!(
            output_path(Path::new("/in/acme-2023.json"), Path::new("/out")),
            PathBuf::from("/out/acme-2023.structure.json")
        );
    }

    #[test]
    fn test_collect_inputs_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.json"), "{}").unwrap();
        std::fs::write(dir.path().join("a.json"), "{}").unwrap();
        std::fs::write(dir.path().join("a.structure.json"), "{}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();

        let inputs = collect_inputs(dir.path()).unwrap();
        let names: Vec<_> = inputs
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.json", "b.json"]);
    }

    #[test]
    fn test_collect_inputs_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = collect_inputs(dir.path()).unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::EmptyBatch(_))));
    }

    #[test]
    fn test_process_all_continues_past_failures() {
        let input = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        std::fs::write(input.path().join("good.json"), LETTER_DOC).unwrap();
        std::fs::write(input.path().join("broken.json"), "not json").unwrap();
        std::fs::write(input.path().join("empty.json"), r#"{"pages": []}"#).unwrap();

        let inputs = collect_inputs(input.path()).unwrap();
        let outcomes = process_all(
            &inputs,
            out.path(),
            &StructureConfig::default(),
            &ProgressBar::hidden(),
        );

        assert_eq!(outcomes.len(), 3);
        let good = outcomes.iter().find(|o| o.name == "good.json").unwrap();
        let summary = good.result.as_ref().unwrap();
        assert_eq!(summary.found_count(), 1);
        assert!(out.path().join("good.structure.json").exists());

        for name in ["broken.json", "empty.json"] {
            let outcome = outcomes.iter().find(|o| o.name == name).unwrap();
            assert!(outcome.result.is_err());
        }
        assert!(!out.path().join("broken.structure.json").exists());
    }
}
