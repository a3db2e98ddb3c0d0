use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use rspec_support::{
    DiffConfig, Differ, Encoding, MethodSignature, MethodSignatureExpectation, SignatureVerifier,
    SupportError, read_encoded,
};

#[derive(Parser)]
#[command(name = "rspec-support")]
#[command(about = "Failure diffs and signature checks for test tooling")]
#[command(version)]
struct Cli {
    /// Log more detail to stderr (-v for debug, -vv for trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the unified diff turning ACTUAL into EXPECTED
    Diff {
        actual: PathBuf,
        expected: PathBuf,
        /// Colour added, removed and header lines
        #[arg(long)]
        color: bool,
        /// Lines of context around each change
        #[arg(long, default_value_t = 3)]
        context: usize,
        #[arg(long, default_value = "UTF-8")]
        actual_encoding: Encoding,
        #[arg(long, default_value = "UTF-8")]
        expected_encoding: Encoding,
    },
    /// Describe a parameter list and check an arity expectation against it
    Signature {
        /// Parameter list, e.g. "a, b = 1, *rest, c:, **opts"
        params: String,
        /// Minimum positional argument count
        #[arg(long)]
        count: Option<usize>,
        /// Maximum positional argument count
        #[arg(long)]
        max_count: Option<usize>,
        /// Keyword argument the caller passes (repeatable)
        #[arg(long = "keyword")]
        keywords: Vec<String>,
        /// Require the signature to accept any number of arguments
        #[arg(long)]
        unlimited: bool,
        /// Require the signature to accept arbitrary keywords
        #[arg(long)]
        arbitrary_keywords: bool,
    },
    /// Generate shell completions
    Completions { shell: Shell },
    /// Generate a man page
    Man,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli.command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(command: Commands) -> Result<ExitCode, SupportError> {
    match command {
        Commands::Diff {
            actual,
            expected,
            color,
            context,
            actual_encoding,
            expected_encoding,
        } => {
            let differ = Differ::new(
                DiffConfig::default()
                    .with_color(color)
                    .with_context_lines(context),
            );
            let actual = read_encoded(&actual, actual_encoding)?;
            let expected = read_encoded(&expected, expected_encoding)?;
            print!("{}", differ.diff_as_string(&actual, &expected));
            Ok(ExitCode::SUCCESS)
        }
        Commands::Signature {
            params,
            count,
            max_count,
            keywords,
            unlimited,
            arbitrary_keywords,
        } => {
            let signature = MethodSignature::parse(&params)?;
            let description = signature.description();
            if description.is_empty() {
                println!("no arguments");
            } else {
                println!("{description}");
            }

            let mut expectation = MethodSignatureExpectation::new().with_keywords(keywords);
            expectation.min_count = count;
            expectation.max_count = max_count;
            expectation.expect_unlimited_arguments = unlimited;
            expectation.expect_arbitrary_keywords = arbitrary_keywords;

            let verifier = SignatureVerifier::strict(&signature, &[]).with_expectation(&expectation);
            match verifier.error_message() {
                Some(message) => {
                    eprintln!("{message}");
                    Ok(ExitCode::from(1))
                }
                None => Ok(ExitCode::SUCCESS),
            }
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "rspec-support", &mut io::stdout());
            Ok(ExitCode::SUCCESS)
        }
        Commands::Man => {
            clap_mangen::Man::new(Cli::command())
                .render(&mut io::stdout())
                .map_err(|e| SupportError::WriteFailed {
                    target: "man page".to_string(),
                    message: e.to_string(),
                })?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
