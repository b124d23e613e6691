//! xmlflat CLI - Flatten XML record documents to CSV
//!
//! # Main Commands
//!
//! ```bash
//! xmlflat compile schema.csv            # Generate <asset_class>_config.json files
//! xmlflat convert input.xml -o out.csv  # Convert one document
//! xmlflat run input_xml/                # Convert a directory of documents
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! xmlflat show-config equity            # Print a stored configuration
//! xmlflat resolve input.xml "Id/@isin"  # Evaluate a path on every record
//! ```

use clap::{Parser, Subcommand};
use std::io;
use std::path::{Path, PathBuf};
use xmlflat::config::store::DEFAULT_CONFIG_DIR;
use xmlflat::logs::{self, LogCapture};
use xmlflat::config::{DEFAULT_FILE_PATTERN, DEFAULT_RECORD_ELEMENT, DEFAULT_ROOT_ELEMENT};
use xmlflat::{
    compile_to_dir, convert_document, convert_file, run_batch, CompileOptions, ConfigError,
    ConfigStore, Configuration, ConvertOptions, PathExpr, PipelineError, XmlDocument,
};

const DEFAULT_OUTPUT_DIR: &str = "output_csv";

#[derive(Parser)]
#[command(name = "xmlflat")]
#[command(about = "Flatten XML record documents to CSV using field-mapping configurations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one configuration per asset class from a field schema
    Compile {
        /// Schema CSV file
        schema: PathBuf,

        /// Directory to write configurations to
        #[arg(short, long, env = "XMLFLAT_CONFIG_DIR", default_value = DEFAULT_CONFIG_DIR)]
        config_dir: PathBuf,

        /// Document root element name
        #[arg(long, default_value = DEFAULT_ROOT_ELEMENT)]
        root_element: String,

        /// Record element name
        #[arg(long, default_value = DEFAULT_RECORD_ELEMENT)]
        record_element: String,

        /// Output file name pattern
        #[arg(long, default_value = DEFAULT_FILE_PATTERN)]
        file_pattern: String,
    },

    /// Convert one XML document to CSV
    Convert {
        /// Input XML file
        input: PathBuf,

        /// Configuration file (default: matched by asset class in the file name)
        #[arg(short = 'f', long)]
        config: Option<PathBuf>,

        /// Asset class to use from the config directory
        #[arg(short, long, conflicts_with = "config")]
        asset_class: Option<String>,

        /// Directory of stored configurations
        #[arg(long, env = "XMLFLAT_CONFIG_DIR", default_value = DEFAULT_CONFIG_DIR)]
        config_dir: PathBuf,

        /// Output CSV file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output field delimiter
        #[arg(short, long, default_value = ",")]
        delimiter: char,
    },

    /// Convert every XML file of a directory
    Run {
        /// Directory containing XML files
        input_dir: PathBuf,

        /// Directory of stored configurations
        #[arg(short, long, env = "XMLFLAT_CONFIG_DIR", default_value = DEFAULT_CONFIG_DIR)]
        config_dir: PathBuf,

        /// Directory to write CSV files to
        #[arg(short, long, env = "XMLFLAT_OUTPUT_DIR", default_value = DEFAULT_OUTPUT_DIR)]
        output_dir: PathBuf,

        /// Output field delimiter
        #[arg(short, long, default_value = ",")]
        delimiter: char,
    },

    /// Show a stored configuration, or list them all
    ShowConfig {
        /// Asset class (lists all configurations when omitted)
        asset_class: Option<String>,

        /// Directory of stored configurations
        #[arg(short, long, env = "XMLFLAT_CONFIG_DIR", default_value = DEFAULT_CONFIG_DIR)]
        config_dir: PathBuf,
    },

    /// Evaluate a path expression on every record element of a document
    Resolve {
        /// Input XML file
        input: PathBuf,

        /// Path expression, relative to the record element
        expression: String,

        /// Record element name
        #[arg(short, long, default_value = DEFAULT_RECORD_ELEMENT)]
        record_element: String,

        /// Return every match instead of the first
        #[arg(short, long)]
        all: bool,
    },
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Compile {
            schema,
            config_dir,
            root_element,
            record_element,
            file_pattern,
        } => cmd_compile(
            &schema,
            &config_dir,
            CompileOptions {
                root_element,
                record_element,
                file_pattern,
            },
        ),

        Commands::Convert {
            input,
            config,
            asset_class,
            config_dir,
            output,
            delimiter,
        } => cmd_convert(
            &input,
            config.as_deref(),
            asset_class.as_deref(),
            &config_dir,
            output.as_deref(),
            delimiter,
        ),

        Commands::Run {
            input_dir,
            config_dir,
            output_dir,
            delimiter,
        } => cmd_run(&input_dir, &config_dir, &output_dir, delimiter),

        Commands::ShowConfig {
            asset_class,
            config_dir,
        } => cmd_show_config(asset_class.as_deref(), &config_dir),

        Commands::Resolve {
            input,
            expression,
            record_element,
            all,
        } => cmd_resolve(&input, &expression, &record_element, all),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_compile(
    schema: &Path,
    config_dir: &Path,
    options: CompileOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let written = compile_to_dir(schema, config_dir, &options)?;
    eprintln!("✨ Generated {} configuration(s) in {}", written.len(), config_dir.display());
    Ok(())
}

fn cmd_convert(
    input: &Path,
    config_file: Option<&Path>,
    asset_class: Option<&str>,
    config_dir: &Path,
    output: Option<&Path>,
    delimiter: char,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = ConvertOptions {
        delimiter: delimiter_byte(delimiter)?,
    };
    let mut capture = logs::capture();

    let loaded;
    let store;
    let config: &Configuration;
    match (config_file, asset_class) {
        (Some(path), _) => {
            loaded = Configuration::from_file(path)?;
            config = &loaded;
        }
        (None, Some(class)) => {
            store = ConfigStore::with_dir(config_dir);
            config = store.require(class)?;
        }
        (None, None) => {
            store = ConfigStore::with_dir(config_dir);
            config = store
                .find_for_file(input)
                .ok_or_else(|| PipelineError::NoConfigForFile(input.display().to_string()))?;
        }
    }
    eprintln!("📄 Using configuration: {}", config.asset_class);

    match output {
        Some(path) => {
            let report = convert_file(input, config, path, &options)?;
            eprintln!(
                "✨ Done! {} rows, {} records skipped",
                report.rows,
                report.skipped.len()
            );
        }
        None => {
            let doc = XmlDocument::from_file(input)?;
            let conversion = convert_document(&doc, config);
            conversion.output.write_csv(io::stdout().lock(), options.delimiter)?;
            eprintln!("✨ {}", conversion.extract.summary());
        }
    }
    report_warnings(&mut capture);

    Ok(())
}

fn cmd_run(
    input_dir: &Path,
    config_dir: &Path,
    output_dir: &Path,
    delimiter: char,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = ConvertOptions {
        delimiter: delimiter_byte(delimiter)?,
    };
    let mut capture = logs::capture();
    let store = ConfigStore::with_dir(config_dir);
    let report = run_batch(input_dir, &store, output_dir, &options)?;

    for converted in &report.converted {
        eprintln!(
            "   {} → {} ({} rows)",
            converted.input.display(),
            converted.output.display(),
            converted.rows
        );
    }
    eprintln!("\n📊 {}", report.summary());
    report_warnings(&mut capture);

    if !report.is_ok() {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_show_config(
    asset_class: Option<&str>,
    config_dir: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = ConfigStore::with_dir(config_dir);

    match asset_class {
        Some(class) => {
            let config = store.require(class)?;
            println!("{}", config.to_json()?);
        }
        None => {
            let configs = store.list();
            if configs.is_empty() {
                eprintln!("📋 No configurations in {}", config_dir.display());
                eprintln!("   Use 'xmlflat compile <schema>' to generate them.");
                return Err(ConfigError::NotFound(config_dir.display().to_string()).into());
            }

            eprintln!("📋 Stored configurations ({}):\n", configs.len());
            for c in configs {
                println!("  📄 {} ({})", c.asset_class, c.file_name());
                println!("     Record element: <{}>", c.record_element());
                println!("     Fields: {}", c.field_order().join(", "));
                println!();
            }
        }
    }

    Ok(())
}

fn cmd_resolve(
    input: &Path,
    expression: &str,
    record_element: &str,
    all: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = PathExpr::compile(expression)?;
    let doc = XmlDocument::from_file(input)?;

    let records = doc.elements_named(record_element);
    eprintln!("🔎 {} <{}> element(s)", records.len(), record_element);

    for (i, record) in records.iter().enumerate() {
        let values = if all {
            path.all_values(record)
        } else {
            vec![path.first_value(record)]
        };
        let rendered: Vec<String> = values
            .into_iter()
            .map(|v| v.unwrap_or_else(|| "<null>".to_string()))
            .collect();
        println!("{}\t{}", i, rendered.join(" | "));
    }

    Ok(())
}

fn report_warnings(capture: &mut LogCapture) {
    let count = capture.warnings().len();
    if count > 0 {
        eprintln!("⚠️  {} warning(s) logged, see above", count);
    }
}

fn delimiter_byte(delimiter: char) -> Result<u8, String> {
    if delimiter.is_ascii() {
        Ok(delimiter as u8)
    } else {
        Err(format!("Delimiter must be an ASCII character, got '{}'", delimiter))
    }
}
