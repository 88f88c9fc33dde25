use std::{
    fs::File,
    io::{stdout, BufReader, BufWriter, Write},
    path::Path,
};

use clap::Parser;
use cli::{Cli, CliCommands, CreateProfileCommand, GenerateCommand};
use divseq::{
    error::{Error, Result},
    io::FastaSource,
    rank_by_score, Alphabet, ControlGenerator, GenomeProfile, ProfileConfig, ScoredSequence,
    Scorer, SequenceGenerator,
};
use log::{debug, info};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

mod cli;

fn main() {
    let cli = Cli::parse();
    TermLogger::init(
        cli.log_level.into(),
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )
    .unwrap_or_else(|error| eprintln!("Could not initialise logging: {error}"));

    if let Err(error) = match cli.command {
        CliCommands::CreateProfile(create_profile_command) => {
            create_profile(create_profile_command)
        }
        CliCommands::Generate(generate_command) => generate(generate_command),
    } {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

fn create_profile(create_profile_command: CreateProfileCommand) -> Result<()> {
    initialise_threads(create_profile_command.threads)?;
    let config = ProfileConfig::from(&create_profile_command.profile);
    let profile = profile_fasta(
        &create_profile_command.fasta,
        &config,
        create_profile_command.threads,
    )?;

    let mut output = BufWriter::new(File::create(&create_profile_command.output)?);
    ciborium::into_writer(&profile, &mut output)?;
    output.flush()?;
    info!(
        "Wrote profile to {}",
        create_profile_command.output.display()
    );

    Ok(())
}

fn generate(generate_command: GenerateCommand) -> Result<()> {
    initialise_threads(generate_command.threads)?;

    let profile = match (&generate_command.profile, &generate_command.fasta) {
        (Some(profile), _) => {
            info!("Loading profile from {}", profile.display());
            ciborium::from_reader::<GenomeProfile, _>(BufReader::new(File::open(profile)?))?
        }
        (None, Some(fasta)) => profile_fasta(
            fasta,
            &ProfileConfig::from(&generate_command.profile_arguments),
            generate_command.threads,
        )?,
        (None, None) => return Err(Error::MissingInput),
    };
    info!(
        "Profile with k = {}, GC fraction {:.4} and GC weight {}",
        profile.k(),
        profile.gc_fraction(),
        profile.gc_weight()
    );

    let mut rng = Xoshiro256PlusPlus::seed_from_u64(generate_command.seed);
    let sequences = SequenceGenerator::new(&profile)?.generate_parallel(
        generate_command.n_seq,
        generate_command.seq_len,
        &mut rng,
    )?;
    info!("Generated {} sequences", sequences.len());
    let scorer = Scorer::new(&profile);
    let ranked = rank_by_score(scorer.score_generated(sequences)?);

    let mut output: Box<dyn Write> = match &generate_command.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(stdout().lock())),
    };

    if generate_command.comp_seq {
        let controls = ControlGenerator::new(profile.alphabet(), profile.gc_fraction())?
            .generate_parallel(generate_command.n_seq, generate_command.seq_len, &mut rng)?;
        info!("Generated {} control sequences", controls.len());
        // Controls keep their generation order.
        let controls = scorer.score_generated(controls)?;

        write_scored(&mut output, "seq", &ranked)?;
        write_scored(&mut output, "control", &controls)?;
    } else {
        for scored in &ranked {
            writeln!(output, "{}", scored.sequence)?;
        }
    }

    output.flush()?;
    Ok(())
}

fn initialise_threads(threads: Option<usize>) -> Result<()> {
    if let Some(threads) = threads {
        debug!("Using {threads} threads");
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()?;
    }

    Ok(())
}

fn profile_fasta(
    path: &Path,
    config: &ProfileConfig,
    threads: Option<usize>,
) -> Result<GenomeProfile> {
    info!("Profiling {}", path.display());
    let alphabet = Alphabet::dna();
    let mut source = FastaSource::open(path)?;

    if threads == Some(1) {
        GenomeProfile::from_records(source.records(), &alphabet, config, None)
    } else {
        GenomeProfile::from_records_parallel(source.records(), &alphabet, config, None)
    }
}

fn write_scored(output: &mut impl Write, label: &str, scored: &[ScoredSequence]) -> Result<()> {
    for ScoredSequence { sequence, scores } in scored {
        writeln!(
            output,
            "{label} {:.6} {:.6} {sequence}",
            scores.kmer_score, scores.full_score
        )?;
    }

    Ok(())
}
