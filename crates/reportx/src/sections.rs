use colored::Colorize;
use structure::{SectionDetection, SectionExtract, SectionType, StructureConfig};

use crate::prelude::{println, *};

#[derive(Debug, clap::Args, Clone)]
pub struct Options {
    /// Path to the input document (JSON)
    pub input: std::path::PathBuf,

    /// Print a summary table instead of JSON
    #[arg(long)]
    pub table: bool,

    /// Print the extracted text of every detected section as JSON
    #[arg(long, conflicts_with = "table")]
    pub text: bool,
}

pub fn run(options: Options, config: &StructureConfig) -> Result<()> {
    let doc = crate::input::structure_file(&options.input, config)?;

    if options.text {
        let extracts: Vec<SectionExtract> = SectionType::ALL
            .iter()
            .filter_map(|&t| doc.section_extract(t))
            .collect();
        println!("{}", serde_json::to_string_pretty(&extracts)?);
        return Ok(());
    }

    if !options.table {
        println!("{}", serde_json::to_string_pretty(&doc.sections)?);
        return Ok(());
    }

    let mut table = new_table();
    table.add_row(prettytable::row![
        "Section",
        "Status",
        "Method",
        "Confidence",
        "Pages",
        "Heading"
    ]);
    for detection in &doc.sections {
        table.add_row(detection_row(detection));
    }
    table.printstd();
    Ok(())
}

fn detection_row(detection: &SectionDetection) -> prettytable::Row {
    match detection {
        SectionDetection::Found(candidate) => {
            let status = if candidate.relaxed {
                "found (relaxed)".yellow()
            } else {
                "found".green()
            };
            prettytable::row![
                candidate.section_type.to_string().bold(),
                status,
                candidate.match_method,
                f!("{:.3}", candidate.confidence),
                f!("{}-{}", candidate.start_page, candidate.end_page),
                candidate.heading
            ]
        }
        SectionDetection::NotFound { section_type } => prettytable::row![
            section_type.to_string().bold(),
            "not found".red(),
            "-",
            f!("{:.3}", 0.0),
            "-",
            "-"
        ],
    }
}
