use clap::{Args, Parser, Subcommand};
use codetest_judger::config::IsolationKind;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "codetest", about = "Judge JavaScript solutions against problem test cases")]
pub struct Opts {
    #[command(subcommand)]
    pub cmd: SubCmd,

    #[command(flatten)]
    pub opt: GlobalOpts,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalOpts {
    /// Configuration file. Defaults to `<config dir>/codetest/judger.toml`
    #[arg(long, short, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Wall-clock limit of one judging call, in milliseconds
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Where user code runs
    #[arg(long, global = true, value_enum)]
    pub isolation: Option<IsolationKind>,

    /// Folder of extra `*.toml`/`*.json` problem files
    #[arg(long, global = true, value_name = "DIR")]
    pub problem_dir: Option<PathBuf>,

    /// Print results as JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCmd {
    /// Run a solution against a single test case
    Run(RunSubCmd),

    /// Judge a solution against every test case of a problem
    Submit(SubmitSubCmd),

    /// List known problems
    Problems,

    /// Serve one judging request over stdio. Used by process isolation.
    #[command(hide = true)]
    Worker(WorkerSubCmd),
}

#[derive(Args, Debug, Clone)]
pub struct RunSubCmd {
    /// Problem id
    #[arg(long, short)]
    pub problem: String,

    /// Solution file, or `-` for stdin. Defaults to the problem's template
    pub source: Option<PathBuf>,

    /// Index of the case to run
    #[arg(long, default_value_t = 0)]
    pub case: usize,
}

#[derive(Args, Debug, Clone)]
pub struct SubmitSubCmd {
    /// Problem id
    #[arg(long, short)]
    pub problem: String,

    /// Solution file, or `-` for stdin. Defaults to the problem's template
    pub source: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct WorkerSubCmd {
    #[arg(long)]
    pub memory_limit: Option<usize>,

    #[arg(long)]
    pub max_stack_size: Option<usize>,
}
