// Command-line front end: build roots, generate and verify inclusion proofs

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::debug;
use merkle_verifier::digest::canonicalize_hex;
use merkle_verifier::prelude::*;
use merkle_verifier::{Config, IdentifierEncoding, InclusionProof};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Prefix printed by ledger fetch scripts in front of each hash
const TX_LINE_PREFIX: &str = "Transaction hash:";

#[derive(Parser)]
#[command(name = "merkle-verifier")]
#[command(about = "Merkle roots and inclusion proofs over transaction hashes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Hash identifiers as raw UTF-8 text instead of decoding hex
    #[arg(long, global = true)]
    raw: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the leaf digest for one transaction identifier
    Canonicalize {
        /// Transaction identifier
        id: String,
    },

    /// Compute the Merkle root of a list of transaction identifiers
    Root {
        /// File with one identifier per line (stdin if omitted)
        file: Option<PathBuf>,
    },

    /// Generate an inclusion proof for the leaf at INDEX
    Prove {
        /// Leaf index (0-based, in input order)
        index: usize,

        /// File with one identifier per line (stdin if omitted)
        file: Option<PathBuf>,

        /// Print the full proof bundle as JSON
        #[arg(long)]
        json: bool,
    },

    /// Verify a leaf against a root
    Verify {
        /// Leaf digest (hex), or an identifier with --from-id
        #[arg(long, required_unless_present = "bundle")]
        leaf: Option<String>,

        /// Expected root (hex)
        #[arg(long, required_unless_present = "bundle")]
        root: Option<String>,

        /// Comma separated side:digest entries, e.g. "right:0xab..,left:0xcd.."
        #[arg(long, default_value = "")]
        proof: String,

        /// Canonicalize --leaf before verifying
        #[arg(long)]
        from_id: bool,

        /// Leaf count of the committed tree; rejects a proof of the wrong length
        #[arg(long, conflicts_with = "bundle")]
        leaf_count: Option<usize>,

        /// JSON proof bundle produced by `prove --json`
        #[arg(long, conflicts_with_all = ["leaf", "root"])]
        bundle: Option<PathBuf>,
    },

    /// Publish the root of a leaf list to the configured registry as CALLER
    Registry {
        /// File with one identifier per line (stdin if omitted)
        file: Option<PathBuf>,

        /// Principal attempting the replacement
        #[arg(long)]
        caller: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    if cli.raw {
        config.identifier_encoding = IdentifierEncoding::Raw;
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    match cli.command {
        Commands::Canonicalize { id } => {
            println!("{}", canonicalize_identifier(&id, config.identifier_encoding)?);
        }

        Commands::Root { file } => {
            let tree = load_tree(file.as_deref(), config.identifier_encoding)?;
            println!("Root: {}", tree.root());
            println!("Leaves: {}", tree.leaf_count());
            println!("Height: {}", tree.height());
        }

        Commands::Prove { index, file, json } => {
            let tree = load_tree(file.as_deref(), config.identifier_encoding)?;
            let bundle = tree
                .inclusion_proof(index)
                .with_context(|| format!("generating proof for leaf {}", index))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&bundle)?);
            } else {
                println!("Leaf: {}", bundle.leaf);
                println!("Root: {}", bundle.root);
                println!("Proof: {}", bundle.proof.to_entries().join(","));
            }
        }

        Commands::Verify {
            leaf,
            root,
            proof,
            from_id,
            leaf_count,
            bundle,
        } => {
            let included = match bundle {
                Some(path) => {
                    let json = fs::read_to_string(&path)
                        .with_context(|| format!("reading {}", path.display()))?;
                    let bundle: InclusionProof =
                        serde_json::from_str(&json).context("parsing proof bundle")?;
                    bundle.verify()?
                }
                None => {
                    let (leaf, root) = match (leaf, root) {
                        (Some(l), Some(r)) => (l, r),
                        _ => bail!("--leaf and --root are required without --bundle"),
                    };
                    let leaf = if from_id {
                        canonicalize_identifier(&leaf, config.identifier_encoding)?
                    } else {
                        Digest::from_hex(&leaf).context("parsing --leaf")?
                    };
                    let root = Digest::from_hex(&root).context("parsing --root")?;
                    let proof = parse_proof(&proof, leaf_count)?;
                    debug!("Verifying {} against {} with {} steps", leaf, root, proof.len());
                    verify(&leaf, &proof, &root)
                }
            };

            println!("{}", included);
            if !included {
                std::process::exit(1);
            }
        }

        Commands::Registry { file, caller } => {
            let registry = config.build_registry()?;
            let tree = load_tree(file.as_deref(), config.identifier_encoding)?;

            println!("Authorized: {}", registry.authorized());
            match registry.current() {
                Some(root) => println!("Previous root: {}", root),
                None => println!("Previous root: <none>"),
            }

            registry.replace(tree.root(), &Principal::new(caller))?;
            println!("Current root: {}", tree.root());
        }
    }

    Ok(())
}

fn canonicalize_identifier(id: &str, encoding: IdentifierEncoding) -> Result<Digest> {
    Ok(match encoding {
        IdentifierEncoding::Hex => canonicalize_hex(id)?,
        IdentifierEncoding::Raw => canonicalize(id.as_bytes()),
    })
}

/// Comma separated `--proof` entries, length checked when the leaf count is known.
fn parse_proof(entries: &str, leaf_count: Option<usize>) -> Result<Proof> {
    let proof: Proof = entries.parse().context("parsing --proof")?;
    Ok(match leaf_count {
        Some(n) => proof.expect_leaf_count(n).context("checking --leaf-count")?,
        None => proof,
    })
}

fn load_tree(file: Option<&Path>, encoding: IdentifierEncoding) -> Result<MerkleTree> {
    let input = match file {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?
        }
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let leaves = parse_identifiers(&input)
        .iter()
        .enumerate()
        .map(|(i, id)| {
            canonicalize_identifier(id, encoding)
                .with_context(|| format!("identifier #{} ('{}')", i, id))
        })
        .collect::<Result<Vec<_>>>()?;

    MerkleTree::build(&leaves).context("building Merkle tree")
}

/// One identifier per line; blank lines and `#` comments are skipped.
fn parse_identifiers(input: &str) -> Vec<&str> {
    input
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.strip_prefix(TX_LINE_PREFIX).unwrap_or(line).trim())
        .collect()
}
