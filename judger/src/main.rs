use anyhow::Context;
use clap::Parser;
use codetest_judger::{
    catalog::{Catalog, Language, Problem},
    config::JudgeConfig,
    runner::worker::serve_stdio,
    tester::{
        diff::verdict_diff,
        engine::EngineLimits,
        model::{JudgeSummary, Verdict},
        Judge,
    },
};
use std::{io::Read, path::Path, process::exit};
use tracing::info;

mod opt;

fn main() -> anyhow::Result<()> {
    let opt = opt::Opts::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match opt.cmd {
        // The worker never starts an async runtime; it answers one request
        // on the main thread and exits.
        opt::SubCmd::Worker(cmd) => {
            let mut limits = EngineLimits::default();
            if let Some(memory_limit) = cmd.memory_limit {
                limits.memory_limit = memory_limit;
            }
            if let Some(max_stack_size) = cmd.max_stack_size {
                limits.max_stack_size = max_stack_size;
            }
            serve_stdio(&limits)
        }
        cmd => {
            let rt = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            let code = rt.block_on(client(cmd, opt.opt))?;
            exit(code)
        }
    }
}

async fn client(cmd: opt::SubCmd, opt: opt::GlobalOpts) -> anyhow::Result<i32> {
    let cfg = load_config(&opt).await?;
    let catalog = match &cfg.problem_dir {
        Some(dir) => Catalog::load_dir(dir)
            .await
            .with_context(|| format!("Failed to load problems from {}", dir.display()))?,
        None => Catalog::builtin()?,
    };

    match cmd {
        opt::SubCmd::Problems => {
            list_problems(&catalog, opt.json)?;
            Ok(0)
        }
        opt::SubCmd::Run(cmd) => {
            let problem = catalog.get(&cmd.problem)?;
            let case = problem.test_cases.get(cmd.case).with_context(|| {
                format!(
                    "Problem {} has {} cases, no case #{}",
                    problem.id,
                    problem.test_cases.len(),
                    cmd.case
                )
            })?;
            let source = read_source(cmd.source.as_deref(), problem).await?;
            let judge = Judge::new(cfg.make_isolate()?, cfg.timeout());

            let mut verdict = judge.run_single(&source, case).await;
            verdict.index = cmd.case;
            report(&[verdict], opt.json)?;
            Ok(0)
        }
        opt::SubCmd::Submit(cmd) => {
            let problem = catalog.get(&cmd.problem)?;
            let source = read_source(cmd.source.as_deref(), problem).await?;
            let judge = Judge::new(cfg.make_isolate()?, cfg.timeout());

            let verdicts = judge.judge_all(&source, &problem.test_cases).await;
            let summary = report(&verdicts, opt.json)?;
            Ok(if summary.accepted { 0 } else { 1 })
        }
        opt::SubCmd::Worker(_) => anyhow::bail!("the worker is served outside the async runtime"),
    }
}

async fn load_config(opt: &opt::GlobalOpts) -> anyhow::Result<JudgeConfig> {
    let mut cfg = match &opt.config {
        Some(path) => JudgeConfig::load(path)
            .await
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => JudgeConfig::load_default().await?,
    };
    if let Some(timeout_ms) = opt.timeout_ms {
        cfg.timeout_ms = timeout_ms;
    }
    if let Some(isolation) = opt.isolation {
        cfg.isolation = isolation;
    }
    if let Some(dir) = &opt.problem_dir {
        cfg.problem_dir = Some(dir.clone());
    }
    cfg.validate()?;
    info!(
        timeout_ms = cfg.timeout_ms,
        isolation = ?cfg.isolation,
        "Judge configured"
    );
    Ok(cfg)
}

/// The solution text: a file, stdin for `-`, or the problem's starter
/// template when nothing was given.
async fn read_source(path: Option<&Path>, problem: &Problem) -> anyhow::Result<String> {
    match path {
        None => {
            info!(problem = %problem.id, "No source given, judging the starter template");
            Ok(problem.template(Language::Javascript)?.to_owned())
        }
        Some(path) if path == Path::new("-") => {
            let src = tokio::task::spawn_blocking(|| {
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf).map(|_| buf)
            })
            .await??;
            Ok(src)
        }
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display())),
    }
}

fn list_problems(catalog: &Catalog, json: bool) -> anyhow::Result<()> {
    if json {
        let problems: Vec<_> = catalog.iter().collect();
        println!("{}", serde_json::to_string_pretty(&problems)?);
        return Ok(());
    }
    for problem in catalog.iter() {
        println!(
            "{:<20} {:<8} {} ({} cases)",
            problem.id,
            format!("{:?}", problem.difficulty).to_lowercase(),
            problem.title,
            problem.test_cases.len()
        );
    }
    Ok(())
}

fn report(verdicts: &[Verdict], json: bool) -> anyhow::Result<JudgeSummary> {
    let summary = JudgeSummary::from_verdicts(verdicts);
    if json {
        let out = serde_json::json!({ "verdicts": verdicts, "summary": summary });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(summary);
    }

    for v in verdicts {
        let mark = if v.pass { "PASS" } else { "FAIL" };
        println!("[{}] case #{}  input: {:?}", mark, v.index, v.input);
        if let Some(err) = &v.error {
            println!("    {}", err);
        } else if let Some(diff) = verdict_diff(v) {
            println!("    expected {:?}, got:", v.expected);
            for line in diff.lines() {
                println!("    {}", line);
            }
        }
    }
    println!(
        "{}/{} passed{}",
        summary.passed,
        summary.total,
        if summary.accepted { ", accepted" } else { "" }
    );
    Ok(summary)
}
