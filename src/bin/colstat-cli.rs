use clap::{Arg, ArgMatches, Command};
use colstat_index::key::ColumnIndexId;
use colstat_index::logging::{init_logging, parse_level};
use colstat_index::metadata::SnapshotMetadataIndex;
use colstat_index::{load_transposed_stats, MetadataConfig, TransposedRow, TransposedTable};
use serde::Serialize;

/// Column stats index inspection CLI
///
/// - keys: print the index key prefix of each column
/// - inspect: read and transpose the column stats of a table snapshot
fn main() {
    let matches = create_cli().get_matches();

    if let Err(e) = run_command(matches) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn create_cli() -> Command {
    Command::new("colstat-cli")
        .about("Column stats index inspection CLI")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("log-level")
                .help("Log level")
                .long("log-level")
                .global(true)
                .default_value("warn"),
        )
        .arg(
            Arg::new("json-logs")
                .help("Emit logs as JSON")
                .long("json-logs")
                .global(true)
                .action(clap::ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("keys")
                .about("Print the encoded key prefix of each column")
                .arg(
                    Arg::new("columns")
                        .help("Column names")
                        .required(true)
                        .num_args(1..)
                        .index(1),
                ),
        )
        .subcommand(
            Command::new("inspect")
                .about("Read and transpose column stats of a table")
                .arg(
                    Arg::new("root")
                        .help("Directory the table base paths are resolved under")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("base-path")
                        .help("Table base path, relative to the root")
                        .required(true)
                        .index(2),
                )
                .arg(
                    Arg::new("columns")
                        .help("Comma separated column names")
                        .long("columns")
                        .short('c')
                        .required(true)
                        .value_delimiter(','),
                )
                .arg(
                    Arg::new("config")
                        .help("Metadata config JSON file")
                        .long("config"),
                )
                .arg(
                    Arg::new("metadata-dir")
                        .help("Metadata directory under each table")
                        .long("metadata-dir")
                        .default_value(".metadata"),
                )
                .arg(
                    Arg::new("format")
                        .help("Output format")
                        .long("format")
                        .value_parser(["text", "json"])
                        .default_value("text"),
                ),
        )
}

fn run_command(matches: ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let level = parse_level(required(&matches, "log-level")?)?;
    init_logging(level, matches.get_flag("json-logs"))?;

    match matches.subcommand() {
        Some(("keys", sub_matches)) => cmd_keys(sub_matches),
        Some(("inspect", sub_matches)) => cmd_inspect(sub_matches),
        _ => Err("unknown command".into()),
    }
}

fn required<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a String, Box<dyn std::error::Error>> {
    matches
        .get_one::<String>(name)
        .ok_or_else(|| format!("missing argument: {}", name).into())
}

fn columns(matches: &ArgMatches) -> Vec<String> {
    matches
        .get_many::<String>("columns")
        .map(|values| {
            values
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn cmd_keys(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    for column in columns(matches) {
        println!("{}\t{}", column, ColumnIndexId::new(&column));
    }
    Ok(())
}

fn cmd_inspect(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let root = required(matches, "root")?;
    let base_path = required(matches, "base-path")?;
    let metadata_dir = required(matches, "metadata-dir")?;
    let format = required(matches, "format")?;

    let config = match matches.get_one::<String>("config") {
        Some(path) => MetadataConfig::from_json_file(path)?,
        None => MetadataConfig::default(),
    };

    let index = SnapshotMetadataIndex::open(root).with_metadata_dir(metadata_dir.as_str());
    let mut table = load_transposed_stats(&index, base_path, &config, columns(matches).as_slice())?;
    table.rows.sort_by(|a, b| a.file_name.cmp(&b.file_name));

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&table_view(&table))?),
        _ => print_text(&table),
    }
    Ok(())
}

#[derive(Serialize)]
struct TableView<'a> {
    columns: &'a [String],
    unindexed_columns: &'a [String],
    rows: &'a [TransposedRow],
}

fn table_view(table: &TransposedTable) -> TableView<'_> {
    TableView {
        columns: &table.columns,
        unindexed_columns: &table.unindexed_columns,
        rows: &table.rows,
    }
}

fn print_text(table: &TransposedTable) {
    println!("{}", table.schema().join("\t"));
    for row in &table.rows {
        let mut line = format!("{}\t{}", row.file_name, row.value_count);
        for triplet in &row.stats {
            line.push_str(&format!(
                "\t{}\t{}\t{}",
                triplet.min_value, triplet.max_value, triplet.null_count
            ));
        }
        println!("{}", line);
    }

    if !table.unindexed_columns.is_empty() {
        eprintln!("Not indexed: {}", table.unindexed_columns.join(", "));
    }
    eprintln!("{} file(s), {} column(s)", table.len(), table.columns.len());
}
