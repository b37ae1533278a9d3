use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use lexlr::{first_sets::FirstSets, grammar::Grammar, lr1::ParseTable};
use std::{path::PathBuf, time::Instant};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// What to print after the table is generated.
    #[arg(long, value_enum, default_value_t = Show::Table)]
    show: Show,

    /// The path of grammar definition file.
    input: PathBuf,
}

#[derive(Debug, Copy, Clone, PartialEq, ValueEnum)]
enum Show {
    Grammar,
    FirstSets,
    Table,
    All,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    tracing::debug!("parsed CLI args = {:?}", args);

    process_file(&args)
        .with_context(|| anyhow::anyhow!("errored during processing {}", args.input.display()))?;

    Ok(())
}

fn process_file(args: &Args) -> anyhow::Result<()> {
    let s = Instant::now();
    let grammar = Grammar::from_file(&args.input)?;
    tracing::info!("parse_file: {:?} elapsed", s.elapsed());

    let unused: Vec<_> = grammar
        .terminals()
        .filter(|t| !grammar.used_terminals().contains(t.id()))
        .map(|t| t.name())
        .collect();
    if !unused.is_empty() {
        println!(
            "[warning] The following terminals are not used in any production rule: {:?}",
            unused
        );
    }

    if matches!(args.show, Show::Grammar | Show::All) {
        println!("{}", grammar);
    }

    if matches!(args.show, Show::FirstSets | Show::All) {
        let s = Instant::now();
        let first_sets = FirstSets::new(&grammar);
        tracing::info!("first_sets: {:?} elapsed", s.elapsed());
        println!("## first sets:\n{}", first_sets.display(&grammar));
    }

    let s = Instant::now();
    let table = ParseTable::generate(&grammar).context("failed to generate the parse table")?;
    tracing::info!("compute_table: {:?} elapsed", s.elapsed());

    if matches!(args.show, Show::Table | Show::All) {
        println!("{}", table.display(&grammar));
    }

    Ok(())
}
