mod compile;
mod logger;

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use compile::{CompileOptions, Stage, compile};
use lexer::{DEFAULT_MAX_TOKEN_LEN, LexerOptions};
use log::debug;
use model::{CompileError, CompileResult, ErrorKind};

/// Stack for the compiling thread. Every stage recurses over the tree, which
/// the parser keeps within `parser::MAX_NESTING_DEPTH` levels.
const COMPILER_STACK_SIZE: usize = 64 * 1024 * 1024;

#[derive(Parser, Debug)]
#[command(name = "nanoc", version, about, long_about = None)]
struct Args {
    /// Path to the source file
    input: Option<PathBuf>,

    /// Path of the executable to write
    #[arg(short, long, default_value = "a.out")]
    output: PathBuf,

    /// Log more detail to stderr; repeat for more
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Longest identifier or literal the lexer accepts
    #[arg(long, default_value_t = DEFAULT_MAX_TOKEN_LEN)]
    max_token_len: usize,

    /// Print the token stream and stop
    #[arg(long, conflicts_with_all = ["parse", "resolve"])]
    lex: bool,

    /// Print the syntax tree and stop
    #[arg(long, conflicts_with = "resolve")]
    parse: bool,

    /// Print the scope tree and stop
    #[arg(long)]
    resolve: bool,
}

impl Args {
    fn stage(&self) -> Stage {
        if self.lex {
            Stage::Lex
        } else if self.parse {
            Stage::Parse
        } else if self.resolve {
            Stage::Resolve
        } else {
            Stage::Image
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    logger::configure(args.verbose);

    let Some(input) = args.input.clone() else {
        println!("Usage: nanoc <filename>");
        return ExitCode::FAILURE;
    };

    let options = CompileOptions {
        lexer: LexerOptions { max_token_len: args.max_token_len },
        stage: args.stage(),
        output: args.output.clone(),
    };
    debug!("compiling {} with {:?}", input.display(), options);

    let source = match std::fs::read(&input) {
        Ok(source) => source,
        Err(err) => {
            println!("{}", CompileError::from(err));
            return ExitCode::FAILURE;
        }
    };

    let (out, result) = match run_compiler(source, options) {
        Ok(done) => done,
        Err(err) => (String::new(), Err(err)),
    };
    print!("{}", out);
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            println!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn run_compiler(source: Vec<u8>, options: CompileOptions) -> CompileResult<(String, CompileResult<()>)> {
    let worker = std::thread::Builder::new()
        .name("nanoc".to_string())
        .stack_size(COMPILER_STACK_SIZE)
        .spawn(move || {
            let mut out = String::new();
            let result = compile(&source, &options, &mut out);
            (out, result)
        })?;
    worker.join().map_err(|_| {
        CompileError::new(ErrorKind::Internal("compiler thread panicked".to_string()), 0)
    })
}
