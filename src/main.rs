//! Motif organisms CLI - Score stored organisms against FASTA datasets.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use motif_organisms::{
    compute::{Organism, OrganismFactory},
    schema::OrganismsConfig,
};

/// Negative sequences included in the exported binding maps.
const MAX_EXPORTED_NEGATIVES: usize = 50;

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 && args[1] == "--example" {
        print_example_config();
        return;
    }

    if args.len() < 5 {
        eprintln!(
            "Usage: {} <config.json> <organisms.json> <positive.fa> <negative.fa> [genome_length] [results_dir]",
            args[0]
        );
        eprintln!();
        eprintln!("Score organisms on positive and negative sequence sets.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json     Organism, factory, connector and pssm parameters");
        eprintln!("  organisms.json  Exported organisms to evaluate");
        eprintln!("  positive.fa     Sequences containing binding sites");
        eprintln!("  negative.fa     Background sequences");
        eprintln!("  genome_length   Genome size for Boltzmann scaling (default: negative set length)");
        eprintln!("  results_dir     Write binding maps per organism into this directory");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    let config_path = PathBuf::from(&args[1]);
    let organisms_path = PathBuf::from(&args[2]);

    let config = OrganismsConfig::from_path(&config_path).unwrap_or_else(|e| {
        eprintln!("Error loading config: {}", e);
        std::process::exit(1);
    });

    let positives = read_fasta(&args[3]);
    let negatives = read_fasta(&args[4]);
    let negative_length: usize = negatives.iter().map(String::len).sum();
    let genome_length: usize = args
        .get(5)
        .and_then(|s| s.parse().ok())
        .unwrap_or(negative_length);
    let results_dir = args.get(6).map(PathBuf::from);

    let mut factory = OrganismFactory::new(config).unwrap_or_else(|e| {
        eprintln!("Invalid config: {}", e);
        std::process::exit(1);
    });
    let organisms = factory
        .import_organisms_from_path(&organisms_path)
        .unwrap_or_else(|e| {
            eprintln!("Error importing organisms: {}", e);
            std::process::exit(1);
        });

    println!("Motif Organisms");
    println!("===============");
    println!("Organisms: {}", organisms.len());
    println!(
        "Positive: {} sequences, Negative: {} sequences ({} bases)",
        positives.len(),
        negatives.len(),
        negative_length
    );
    println!("Genome length: {}", genome_length);
    println!();

    let start = Instant::now();

    for organism in &organisms {
        let boltzmann = organism.get_boltz_fitness(&positives, &negatives, genome_length);
        let p = organism.get_discriminative_fitness(&positives).score;
        let n = organism.get_discriminative_fitness(&negatives).score;

        println!(
            "Org {} Nodes: {} GiniPSSMs: {:.2} P: {:.2} N: {:.2} DiscrF: {:.2} BoltzF: {:.2}",
            organism.id(),
            organism.count_nodes(),
            boltzmann.avg_gini,
            p,
            n,
            p - n,
            boltzmann.score
        );

        if organism.is_tracked() {
            print!("{}", organism);
        }

        if let Some(dir) = &results_dir {
            if let Err(e) = export_binding_maps(organism, &positives, &negatives, dir) {
                eprintln!("Error writing results for organism {}: {}", organism.id(), e);
                std::process::exit(1);
            }
        }
    }

    println!();
    println!("Time: {:.2}s", start.elapsed().as_secs_f32());
}

/// Write `positive_{id}` and `negative_{id}` binding map files into `dir`.
fn export_binding_maps(
    organism: &Organism,
    positives: &[String],
    negatives: &[String],
    dir: &Path,
) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    organism.export_results(positives, dir.join(format!("positive_{}", organism.id())))?;
    let negatives = &negatives[..negatives.len().min(MAX_EXPORTED_NEGATIVES)];
    organism.export_results(negatives, dir.join(format!("negative_{}", organism.id())))
}

/// Sequences of a FASTA file, lowercased. Header lines are skipped and
/// wrapped sequence lines are joined.
fn read_fasta(path: &str) -> Vec<String> {
    let contents = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading {}: {}", path, e);
        std::process::exit(1);
    });

    let mut sequences = Vec::new();
    let mut current = String::new();
    for line in contents.lines().map(str::trim) {
        if line.starts_with('>') {
            if !current.is_empty() {
                sequences.push(std::mem::take(&mut current));
            }
        } else if !line.is_empty() {
            current.push_str(&line.to_ascii_lowercase());
        }
    }
    if !current.is_empty() {
        sequences.push(current);
    }
    sequences
}

fn print_example_config() {
    let config = OrganismsConfig::default();

    println!("Example configuration (config.json):");
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing config: {}", e),
    }
}
