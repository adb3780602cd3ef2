//! Multiship CLI - Split seller order sheets into Domeme address books
//!
//! ```bash
//! multiship convert orders.xlsx          # Write 도매매_복수배송지주소록.zip
//! multiship convert orders.csv -o out.zip
//! multiship inspect orders.xlsx          # Mapping, groups and first rows
//! multiship schema                       # Print the target template as JSON
//! multiship serve                        # Start HTTP server (port 3000)
//! ```

use clap::{Parser, Subcommand};
use multiship::{convert_file, preview_file, Cell, ConvertOptions, MatchMethod, Resolution, Template};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "multiship")]
#[command(about = "Convert seller order sheets into Domeme multi-destination address books", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full pipeline: order sheet → one workbook per product → zip
    Convert {
        /// Input spreadsheet (xlsx, xls or csv)
        input: PathBuf,

        /// Output archive (default: 도매매_복수배송지주소록.zip)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the column mapping, product groups and first converted rows
    Inspect {
        /// Input spreadsheet (xlsx, xls or csv)
        input: PathBuf,

        /// Number of converted rows to show
        #[arg(long, default_value = "5")]
        rows: usize,
    },

    /// Print the target template as JSON
    Schema,

    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let template = Template::default();

    let result = match cli.command {
        Commands::Convert { input, output } => cmd_convert(&input, output.as_deref(), &template),
        Commands::Inspect { input, rows } => cmd_inspect(&input, rows, &template),
        Commands::Schema => cmd_schema(&template),
        Commands::Serve { port } => cmd_serve(port, template).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_convert(input: &Path, output: Option<&Path>, template: &Template) -> Result<(), Box<dyn std::error::Error>> {
    let result = convert_file(input, template)?;

    let target = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&template.archive_name));
    fs::write(&target, &result.archive)?;

    eprintln!("\n📦 {} file(s):", result.units.len());
    for unit in &result.units {
        eprintln!("   {} ← {} ({} rows)", unit.name, unit.label(), unit.rows);
    }
    eprintln!("💾 Archive written to: {}", target.display());
    eprintln!("\n✨ Done!");
    Ok(())
}

fn cmd_inspect(input: &Path, rows: usize, template: &Template) -> Result<(), Box<dyn std::error::Error>> {
    let preview = preview_file(input, template, &ConvertOptions { preview_rows: rows })?;

    println!("📄 {} ({} rows)", input.display(), preview.source.row_count);
    println!("   Format:  {}", preview.source.format);
    println!("   Columns: {}", preview.source.headers.join(", "));
    println!("   Product column: {}", preview.group_column);

    println!("\n🗺️  Mapping:");
    for entry in &preview.mapping {
        let source = match &entry.resolution {
            Resolution::Resolved { column, method: MatchMethod::Alias } => format!("{} (alias)", column),
            Resolution::Resolved { column, method: MatchMethod::Substring } => format!("{} (name)", column),
            Resolution::Resolved { column, method: MatchMethod::Similarity(score) } => {
                format!("{} (similarity {:.2})", column, score)
            }
            Resolution::Unresolved => "-".to_string(),
        };
        println!("   {:<16} ← {}", entry.field, source);
    }

    println!("\n📋 First {} row(s):", preview.rows.len());
    println!("   {}", preview.columns.join(" | "));
    for row in &preview.rows {
        let cells: Vec<String> = row.iter().map(Cell::to_string).collect();
        println!("   {}", cells.join(" | "));
    }

    println!("\n📦 {} file(s):", preview.units.len());
    for unit in &preview.units {
        println!("   {} ← {} ({} rows)", unit.name, unit.label(), unit.rows);
    }
    Ok(())
}

fn cmd_schema(template: &Template) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(template)?);
    Ok(())
}

async fn cmd_serve(port: u16, template: Template) -> Result<(), Box<dyn std::error::Error>> {
    multiship::server::start_server(port, template).await
}
