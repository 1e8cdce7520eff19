//! ip-index: CLI tool for building list indexes and classifying addresses.

use clap::{Args, Parser, Subcommand};
use ip_index::source::load_list;
use ip_index::{
    completion_channel, start_build, IndexConfig, IndexHandle, ListFormat, ListId, Manifest,
    RawList,
};
use serde::Serialize;
use std::error::Error;
use std::fs;
use std::net::Ipv4Addr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ip-index")]
#[command(version)]
#[command(about = "Classify IPv4 addresses against named CIDR lists", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an index and print the lists containing each address
    Lookup {
        #[command(flatten)]
        lists: ListArgs,

        /// Print results as JSON
        #[arg(long)]
        json: bool,

        /// Addresses to classify
        #[arg(required = true)]
        addrs: Vec<Ipv4Addr>,
    },

    /// Build an index and print its size statistics
    Stats {
        #[command(flatten)]
        lists: ListArgs,

        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Convert a text list to the binary record format
    Convert {
        /// Input text list (may be gzip compressed)
        #[arg(short, long)]
        input: PathBuf,

        /// Output binary file
        #[arg(short, long)]
        output: PathBuf,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Args)]
struct ListArgs {
    /// YAML manifest naming the list files
    #[arg(short, long, conflicts_with = "list")]
    manifest: Option<PathBuf>,

    /// List file as NAMESPACE:ID=PATH (repeatable)
    #[arg(short, long, value_parser = parse_list_arg)]
    list: Vec<(ListId, PathBuf)>,

    /// Entries per list from which /32 entries go to a bitmap
    #[arg(short, long)]
    threshold: Option<usize>,
}

impl ListArgs {
    fn load(&self) -> Result<(Vec<RawList>, IndexConfig), Box<dyn Error>> {
        let (lists, mut config) = match &self.manifest {
            Some(path) => {
                let manifest = Manifest::load(path)?;
                (manifest.load_lists()?, manifest.config())
            }
            None => {
                let lists = self
                    .list
                    .iter()
                    .map(|(id, path)| load_list(*id, path, None))
                    .collect::<Result<Vec<_>, _>>()?;
                (lists, IndexConfig::default())
            }
        };

        if lists.is_empty() {
            return Err("no lists given (use --manifest or --list)".into());
        }
        if let Some(threshold) = self.threshold {
            config = config.with_large_list_threshold(threshold);
        }
        Ok((lists, config))
    }
}

fn parse_list_arg(arg: &str) -> Result<(ListId, PathBuf), String> {
    let (id, path) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected NAMESPACE:ID=PATH, got {:?}", arg))?;
    let id = id
        .parse::<ListId>()
        .map_err(|_| format!("invalid list id {:?}", id))?;
    Ok((id, PathBuf::from(path)))
}

#[derive(Serialize)]
struct LookupResult {
    address: Ipv4Addr,
    lists: Vec<String>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Lookup { lists, json, addrs } => lookup(&lists, json, &addrs),
        Commands::Stats { lists, json } => stats(&lists, json),
        Commands::Convert {
            input,
            output,
            verbose,
        } => convert(&input, &output, verbose),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Build on the background worker and wait for its completion.
fn build_index(args: &ListArgs) -> Result<IndexHandle, Box<dyn Error>> {
    let (lists, config) = args.load()?;

    let (tx, mut rx) = completion_channel();
    let (ticket, job) = start_build(lists, config, tx)?;
    log::info!("Waiting for index build {}", ticket);

    let completion = rx
        .blocking_recv()
        .ok_or("build worker exited without reporting")?;
    let handle = completion.result?;
    job.wait()?;
    Ok(handle)
}

fn lookup(args: &ListArgs, json: bool, addrs: &[Ipv4Addr]) -> Result<(), Box<dyn Error>> {
    let index = build_index(args)?;

    let results: Vec<LookupResult> = addrs
        .iter()
        .map(|&address| {
            let mut hits = index.lookup(address);
            hits.sort();
            LookupResult {
                address,
                lists: hits.iter().map(ListId::to_string).collect(),
            }
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for result in &results {
            if result.lists.is_empty() {
                println!("{}: -", result.address);
            } else {
                println!("{}: {}", result.address, result.lists.join(" "));
            }
        }
    }
    Ok(())
}

fn stats(args: &ListArgs, json: bool) -> Result<(), Box<dyn Error>> {
    let index = build_index(args)?;
    let stats = index.index().stats();

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("Lists:            {}", stats.lists);
        println!("Trie entries:     {}", stats.trie_entries);
        println!("Trie nodes:       {}", stats.trie_nodes);
        println!("Trie bytes:       {}", stats.trie_bytes);
        println!("Bitmap lists:     {}", stats.bitmap_lists);
        println!("Bitmap addresses: {}", stats.bitmap_addresses);
        println!("Bitmap runs:      {}", stats.bitmap_runs);
        println!("Bitmap bytes:     {}", stats.bitmap_bytes);
    }
    Ok(())
}

fn convert(input: &PathBuf, output: &PathBuf, verbose: bool) -> Result<(), Box<dyn Error>> {
    if verbose {
        println!("Reading input file: {:?}", input);
    }

    let raw = load_list(ListId::new(0), input, Some(ListFormat::Text))?;

    if verbose {
        println!(
            "Writing output file: {:?} ({} records, {} bytes)",
            output,
            raw.record_count(),
            raw.data.len()
        );
    }

    fs::write(output, &raw.data)?;

    println!("Successfully converted {:?} -> {:?}", input, output);
    Ok(())
}
