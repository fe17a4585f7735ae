use colored::Colorize;
use structure::{Line, StructureConfig};

use crate::prelude::{println, *};

#[derive(Debug, clap::Args, Clone)]
pub struct Options {
    /// Path to the input document (JSON)
    pub input: std::path::PathBuf,

    /// Print text with page separators instead of JSON
    #[arg(long)]
    pub plain: bool,
}

pub fn run(options: Options, config: &StructureConfig) -> Result<()> {
    let doc = crate::input::structure_file(&options.input, config)?;

    if options.plain {
        println!("{}", format_plain(&doc.lines));
    } else {
        println!("{}", serde_json::to_string_pretty(&doc.lines)?);
    }
    Ok(())
}

/// Lines in reading order, with a separator at the top of each logical page.
fn format_plain(lines: &[Line]) -> String {
    let mut result = String::new();
    let mut current_page = None;
    for line in lines {
        if current_page != Some(line.page_index) {
            if current_page.is_some() {
                result.push('\n');
            }
            result.push_str(&f!(
                "{}\n",
                f!("--- page {} ---", line.page_number()).bright_cyan()
            ));
            current_page = Some(line.page_index);
        }
        result.push_str(&line.text);
        result.push('\n');
    }
    result.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_plain_separates_pages() {
        colored::control::set_override(false);
        let lines = vec![
            Line::new("first", 10.0, 10.0, 0),
            Line::new("second", 20.0, 10.0, 0),
            Line::new("third", 10.0, 10.0, 2),
        ];
        assert_eq!(
            format_plain(&lines),
            "--- page 1 ---\nfirst\nsecond\n\n--- page 3 ---\nthird"
        );
    }
}
