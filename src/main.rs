//! forge – command-line resume → PDF exporter.
//!
//! Usage:
//!   forge <record.json|--sample> [output.pdf] [--template id] [--config file.json]
//!         [--font file.ttf] [--print out.html] [--assignment]
//!
//! If `output.pdf` is omitted the PDF gets the download name derived from the
//! record (e.g. `Matthew_Smith_Resume.pdf`) next to the input file.

use std::{env, fs, path::Path, path::PathBuf, process};

use resume_forge::pipeline::{generate_resume_pdf, paginate_record, print_resume_html, PipelineConfig};
use resume_forge::record::ResumeRecord;
use resume_forge::variant::StyleVariant;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    let mut input_path: Option<PathBuf> = None;
    let mut output_path: Option<PathBuf> = None;
    let mut use_sample = false;
    let mut template: Option<String> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut font_path: Option<PathBuf> = None;
    let mut print_path: Option<PathBuf> = None;
    let mut show_assignment = false;
    let mut positional = 0usize;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--sample" | "-s" => use_sample = true,
            "--assignment" | "-a" => show_assignment = true,
            "--template" | "-t" => template = Some(flag_value(&mut iter, arg, &args[0])),
            "--config" | "-c" => config_path = Some(PathBuf::from(flag_value(&mut iter, arg, &args[0]))),
            "--font" | "-f" => font_path = Some(PathBuf::from(flag_value(&mut iter, arg, &args[0]))),
            "--print" | "-p" => print_path = Some(PathBuf::from(flag_value(&mut iter, arg, &args[0]))),
            "--help" | "-h" => {
                print_usage(&args[0]);
                process::exit(0);
            }
            other if other.starts_with('-') => {
                eprintln!("Unknown flag: {other}");
                print_usage(&args[0]);
                process::exit(1);
            }
            path => {
                if positional == 0 && !use_sample {
                    input_path = Some(PathBuf::from(path));
                } else if output_path.is_none() {
                    output_path = Some(PathBuf::from(path));
                } else {
                    eprintln!("Unexpected argument: {path}");
                    print_usage(&args[0]);
                    process::exit(1);
                }
                positional += 1;
            }
        }
    }

    let record = match (&input_path, use_sample) {
        (_, true) => ResumeRecord::sample(),
        (Some(input), false) => {
            let json = match fs::read_to_string(input) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("Error reading '{}': {e}", input.display());
                    process::exit(1);
                }
            };
            match ResumeRecord::from_json(&json) {
                Ok(r) => r,
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            }
        }
        (None, false) => {
            eprintln!("Error: no record file specified (use --sample for placeholder content).");
            print_usage(&args[0]);
            process::exit(1);
        }
    };

    let mut config = match &config_path {
        Some(path) => match PipelineConfig::from_json_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading '{}': {e}", path.display());
                process::exit(1);
            }
        },
        None => PipelineConfig::default(),
    };
    if font_path.is_some() {
        config.font_path = font_path;
    }
    let full_name = record.full_name();
    if config_path.is_none() && !full_name.is_empty() {
        config.title = format!("{full_name} - Resume");
    }

    let variant = template.as_deref().map(StyleVariant::parse).unwrap_or_default();

    // Default output: download name, next to the input file.
    let output = output_path.unwrap_or_else(|| {
        let dir = input_path
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_default();
        dir.join(record.export_file_name())
    });

    if show_assignment {
        let assignment = config
            .load_fonts()
            .and_then(|fonts| paginate_record(&record, variant, &config, &fonts))
            .and_then(|(_, assignment)| assignment.to_json());
        match assignment {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error paginating: {e}");
                process::exit(1);
            }
        }
    }

    if let Some(path) = &print_path {
        match print_resume_html(&record, variant, &config) {
            Ok(html) => write_output(path, html.as_bytes()),
            Err(e) => {
                eprintln!("Error building print document: {e}");
                process::exit(1);
            }
        }
        eprintln!("Wrote '{}'", path.display());
    }

    match generate_resume_pdf(&record, variant, &config) {
        Ok(artifact) => {
            write_output(&output, &artifact.bytes);
            let pages = artifact.page_count;
            eprintln!(
                "Wrote '{}' ({} bytes, {} page{}, {} template)",
                output.display(),
                artifact.bytes.len(),
                pages,
                if pages == 1 { "" } else { "s" },
                variant.display_name()
            );
        }
        Err(e) => {
            eprintln!("Error generating PDF: {e}");
            process::exit(1);
        }
    }
}

fn flag_value<'a>(iter: &mut impl Iterator<Item = &'a String>, flag: &str, prog: &str) -> String {
    match iter.next() {
        Some(v) => v.clone(),
        None => {
            eprintln!("Missing value for {flag}");
            print_usage(prog);
            process::exit(1);
        }
    }
}

fn write_output(path: &Path, bytes: &[u8]) {
    // Create output directory if necessary.
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(e) = fs::create_dir_all(parent) {
                eprintln!("Error creating output directory: {e}");
                process::exit(1);
            }
        }
    }
    if let Err(e) = fs::write(path, bytes) {
        eprintln!("Error writing '{}': {e}", path.display());
        process::exit(1);
    }
}

fn print_usage(prog: &str) {
    eprintln!("forge – resume to PDF exporter (resume-forge)");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {prog} <record.json|--sample> [output.pdf] [flags]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  <record.json>  Resume record in the editor's JSON shape");
    eprintln!("  [output.pdf]   Output path  (default: <First>_<Last>_Resume.pdf)");
    eprintln!();
    eprintln!("Flags:");
    eprintln!("  --sample, -s      Use the placeholder record instead of a file");
    eprintln!("  --template, -t    Template id (default: professional)");
    eprintln!("  --config, -c      JSON pipeline configuration (page size, margin, title, font)");
    eprintln!("  --font, -f        TTF/OTF file for the sans family");
    eprintln!("  --print, -p       Also write the print document (HTML) to this path");
    eprintln!("  --assignment, -a  Print the page assignment JSON to stdout");
    eprintln!("  --help            Print this message");
    eprintln!();
    eprintln!("Templates:");
    for variant in StyleVariant::ALL {
        eprintln!("  {:<14}{}", variant.id(), variant.description());
    }
}
