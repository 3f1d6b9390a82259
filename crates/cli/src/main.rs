use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::io::{self, BufRead, Write};

use cds_core::{
    Answer, AnswerKind, CdsError, CdsResult, EligibilityTable, Method, Recommendation, Symptom,
    TriageSession, ESCALATION_NOTICE,
};

#[derive(Parser)]
#[command(name = "cds")]
#[command(about = "Clinical decision support: UKMEC eligibility and lower GI triage")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List contraceptive methods and category definitions
    Methods,
    /// List every condition key in the eligibility table
    Conditions,
    /// Combine condition keys into a category per method
    Check {
        /// Condition keys, e.g. BMI_GE_35 SMOKE_LT_35
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Walk the lower GI triage tree interactively
    Triage,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Methods) => {
            for method in Method::ALL {
                println!("{:<8} {}", method.code(), method.label());
            }
            println!();
            for value in 1..=4 {
                let category = cds_core::Category::new(value)?;
                println!("{}: {}", category, category.definition());
            }
        }
        Some(Commands::Conditions) => {
            let table = EligibilityTable::ukmec()?;
            for (key, row) in table.iter() {
                println!("{:<36} {}", key, row.description);
            }
        }
        Some(Commands::Check { keys }) => {
            let table = EligibilityTable::ukmec()?;
            for key in keys.iter().filter(|k| !table.contains(k)) {
                eprintln!("Warning: unknown condition key {key:?} ignored");
            }
            let categories = table.combine(&keys);
            for (method, category) in categories.iter() {
                let overlapping = table.overlapping_conditions(&keys, method);
                if overlapping.is_empty() {
                    println!("{:<8} {}", method.code(), category);
                } else {
                    println!(
                        "{:<8} {}  (also: {})",
                        method.code(),
                        category,
                        overlapping.join(", ")
                    );
                }
            }
            println!();
            println!("{ESCALATION_NOTICE}");
        }
        Some(Commands::Triage) => {
            let stdin = io::stdin();
            let stdout = io::stdout();
            let session = run_triage(stdin.lock(), stdout.lock())?;
            for note in session.notes() {
                println!("Note: {}", note.text());
            }
        }
        None => {
            println!("No command given. Try `cds --help`.");
        }
    }

    Ok(())
}

/// Ask each question on `output` and read answers from `input` until a recommendation is
/// reached. Unparsable or out-of-range answers are reported and the question is asked again.
fn run_triage<R: BufRead, W: Write>(
    mut input: R,
    mut output: W,
) -> Result<TriageSession, Box<dyn std::error::Error>> {
    let mut session = TriageSession::new();

    while let Some(question) = session.current_question() {
        writeln!(output, "{}", question.prompt)?;
        match &question.kind {
            AnswerKind::MultiChoice { options } => {
                for option in options {
                    writeln!(output, "  {option}")?;
                }
                write!(output, "Numbers separated by commas, or 'none': ")?;
            }
            AnswerKind::YesNo => write!(output, "[y/n]: ")?,
            AnswerKind::Integer { min, max } => write!(output, "[{min}-{max}]: ")?,
            AnswerKind::Decimal { min, max } => write!(output, "[{min}-{max}]: ")?,
        }
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err("input ended before a recommendation was reached".into());
        }

        let result = parse_answer(&question.kind, &line).and_then(|a| session.answer(a));
        if let Err(e) = result {
            writeln!(output, "Error: {e}")?;
        }
    }

    if let Some(recommendation) = session.recommendation() {
        print_recommendation(&mut output, recommendation)?;
    }

    Ok(session)
}

fn print_recommendation<W: Write>(output: &mut W, recommendation: Recommendation) -> io::Result<()> {
    writeln!(output)?;
    writeln!(output, "Recommendation: {}", recommendation.text())
}

fn parse_answer(kind: &AnswerKind, line: &str) -> CdsResult<Answer> {
    let text = line.trim();
    match kind {
        AnswerKind::MultiChoice { .. } => {
            if text.is_empty() || text.eq_ignore_ascii_case("none") {
                return Ok(Answer::Symptoms(BTreeSet::new()));
            }
            text.split(',')
                .map(str::parse::<Symptom>)
                .collect::<CdsResult<BTreeSet<_>>>()
                .map(Answer::Symptoms)
        }
        AnswerKind::YesNo => match text.to_ascii_lowercase().as_str() {
            "y" | "yes" => Ok(Answer::YesNo(true)),
            "n" | "no" => Ok(Answer::YesNo(false)),
            _ => Err(CdsError::InvalidInput(format!("expected y or n, got {text:?}"))),
        },
        AnswerKind::Integer { .. } => text
            .parse()
            .map(Answer::Integer)
            .map_err(|_| CdsError::InvalidInput(format!("expected a whole number, got {text:?}"))),
        AnswerKind::Decimal { .. } => text
            .parse()
            .map(Answer::Decimal)
            .map_err(|_| CdsError::InvalidInput(format!("expected a number, got {text:?}"))),
    }
}
