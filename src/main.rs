// Internal Modules
mod compiler;
use compiler::LlParser;

// Standard Imports
use clap::Parser;

/// Command Line interface struct
/// Describes possible arguments using the clap library
#[derive(Parser)]
struct ParserCliOptions {
    /// Path of the source file to parse. Remora source files end in .rem
    #[clap(parse(from_os_str))]
    path: std::path::PathBuf,

    /// Path of the LL control table file, default is <path_filename>.llt
    #[clap(short, long, parse(from_os_str))]
    table: Option<std::path::PathBuf>,

    // Flags

    /// Print the emitted IR module before running it
    #[clap(long, action)]
    dump_ir: bool,

    /// Parse and emit only, without running the program
    #[clap(long, action)]
    no_run: bool,
}

impl ParserCliOptions {
    /// Derives default values for empty arguments that cannot be set to
    /// constants. The table path is derived from the input file path.
    /// @return: Returns ParserCliOptions with modified empty arguments
    fn derive_defaults(mut self) -> Self {
        if self.table.is_none() {
            self.table = Some(self.path.with_extension("llt"))
        }

        return self;
    }
}

fn main() {
    // Parse Command line arguments
    let cli_args = ParserCliOptions::parse().derive_defaults();

    let table_path = cli_args.table.clone().unwrap(); // Can unwrap as table is always derived
    let parser = match LlParser::from_table_file(table_path.as_path()) {
        Ok(parser) => parser
            .with_ir_dump(cli_args.dump_ir)
            .with_execution(!cli_args.no_run),
        Err(why) => {
            println!("Couldn't load table {}: {}", table_path.display(), why);
            std::process::exit(exitcode::DATAERR);
        }
    };

    let outcome = match parser.is_valid_file(cli_args.path.as_path()) {
        Ok(outcome) => outcome,
        Err(why) => {
            println!("Couldn't read {}: {}", cli_args.path.display(), why);
            std::process::exit(exitcode::IOERR);
        }
    };

    if outcome.accepted {
        println!("Parse success!");
        std::process::exit(exitcode::OK);
    }

    match outcome.fail_index {
        Some(fail_index) => {
            let position = outcome
                .tokens
                .get(fail_index)
                .map(|token| format!(" at line {}, column {}", token.position.line, token.position.column))
                .unwrap_or_default();
            println!("Parse failed on token {}{}", fail_index, position);
        }
        None => println!("Parse failed before the first token"),
    }
    if !outcome.expected_tokens.is_empty() {
        let expected: Vec<String> = outcome
            .expected_tokens
            .iter()
            .map(|token| token.to_string())
            .collect();
        println!("Expected one of: {}", expected.join(", "));
    }
    std::process::exit(exitcode::DATAERR);
}
