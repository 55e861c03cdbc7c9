use clap::{Parser, Subcommand};
use program_core::*;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "coachprog")]
#[command(about = "Training program structure editor", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

/// Cycle/day addressing shared by most commands; defaults to the first of each
#[derive(clap::Args, Clone, Debug, Default)]
struct Target {
    /// Cycle id (defaults to the first cycle)
    #[arg(long)]
    cycle: Option<String>,

    /// Day id (defaults to the first day of the cycle)
    #[arg(long)]
    day: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new program from the default skeleton
    New {
        /// Program name
        #[arg(long)]
        name: String,

        /// Training days per week
        #[arg(long)]
        frequency: Option<u32>,
    },

    /// List saved programs
    List,

    /// Show a program's structure
    Show {
        id: String,

        /// Print the normalized save payload as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the exercise library
    Exercises {
        /// Only show one category
        #[arg(long)]
        category: Option<String>,
    },

    /// Append a cycle
    AddCycle { id: String },

    /// Delete a cycle (the last cycle is kept)
    DeleteCycle {
        id: String,
        #[arg(long)]
        cycle: String,
    },

    /// Change a cycle's repeat count by a delta (never below 1)
    Repeat {
        id: String,
        #[arg(long)]
        cycle: Option<String>,
        #[arg(long, allow_hyphen_values = true)]
        delta: i32,
    },

    /// Set training days per week
    Frequency { id: String, days: u32 },

    /// Append a day to a cycle
    AddDay {
        id: String,
        #[arg(long)]
        cycle: Option<String>,
    },

    /// Duplicate a day with all its exercises
    CopyDay {
        id: String,
        #[command(flatten)]
        target: Target,
    },

    /// Delete a day (the last day of a cycle is kept)
    DeleteDay {
        id: String,
        #[arg(long)]
        cycle: Option<String>,
        #[arg(long)]
        day: String,
    },

    /// Rename the program, a cycle (--cycle) or a day (--cycle and --day)
    Rename {
        id: String,
        name: String,
        #[arg(long)]
        cycle: Option<String>,
        #[arg(long, requires = "cycle")]
        day: Option<String>,
    },

    /// Add an exercise from the library to a day
    AddExercise {
        id: String,
        #[command(flatten)]
        target: Target,

        /// Library exercise id
        #[arg(long)]
        exercise: String,

        /// Superset group id (see `superset`)
        #[arg(long)]
        superset: Option<String>,
    },

    /// Update an exercise entry's prescription
    Set {
        id: String,
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        entry: String,
        #[arg(long)]
        sets: Option<u32>,
        /// Single value ("12") or comma-separated scheme ("10,8,6")
        #[arg(long)]
        reps: Option<String>,
        /// Rest in seconds
        #[arg(long)]
        rest: Option<u32>,
        #[arg(long, conflicts_with = "no_superset")]
        superset: Option<String>,
        /// Remove the entry from its superset
        #[arg(long)]
        no_superset: bool,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Remove an exercise entry
    DeleteExercise {
        id: String,
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        entry: String,
    },

    /// Move an exercise within one day
    Reorder {
        id: String,
        /// Day scope as `cycleId:dayId`
        #[arg(long)]
        key: String,
        #[arg(long)]
        from: usize,
        #[arg(long)]
        to: usize,
    },

    /// Print a fresh superset group id
    Superset,
}

fn main() -> ExitCode {
    // Initialize logging
    program_core::logging::init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let data_dir = cli
        .data_dir
        .unwrap_or_else(|| config.data.data_dir.clone());
    let mut store = JsonFileStore::new(data_dir.join("programs"));
    let settings = EditorSettings::from(&config);

    match cli.command {
        Commands::New { name, frequency } => {
            let mut session = EditSession::open(None, UuidIds, settings);
            let editor = session.editor_mut();
            editor.rename_program(name);
            if let Some(frequency) = frequency {
                editor.set_frequency(frequency);
            }
            let id = session.save(&mut store)?;
            println!("✓ Created program {}", id);
            Ok(())
        }

        Commands::List => cmd_list(&mut store, &settings),

        Commands::Show { id, json } => {
            let session = EditSession::open_persisted(&mut store, &id, UuidIds, settings)?;
            if json {
                let payload = session.payload()?;
                let out = serde_json::to_string_pretty(&payload)?;
                println!("{}", out);
            } else {
                display_program(&id, session.editor().structure());
            }
            Ok(())
        }

        Commands::Exercises { category } => {
            let library = load_library(&config)?;
            let exercises: Vec<&ExerciseReference> = match category.as_deref() {
                Some(cat) => library.by_category(cat).collect(),
                None => library.exercises().iter().collect(),
            };
            for exercise in exercises {
                println!(
                    "  {:<20} {:<28} {}",
                    exercise.id, exercise.name, exercise.category
                );
            }
            Ok(())
        }

        Commands::AddCycle { id } => edit(&mut store, &id, settings, |editor| {
            let cycle_id = editor.add_cycle();
            println!("✓ Added cycle {}", cycle_id);
            Ok(())
        }),

        Commands::DeleteCycle { id, cycle } => edit(&mut store, &id, settings, |editor| {
            if editor.delete_cycle(&cycle)? {
                println!("✓ Deleted cycle {}", cycle);
            } else {
                println!("A program needs at least one cycle - nothing deleted.");
            }
            Ok(())
        }),

        Commands::Repeat { id, cycle, delta } => edit(&mut store, &id, settings, |editor| {
            let cycle_id = resolve_cycle(editor, cycle.as_deref())?;
            let count = editor.set_repeat_count(&cycle_id, delta)?;
            println!("✓ Cycle repeats {}x", count);
            Ok(())
        }),

        Commands::Frequency { id, days } => edit(&mut store, &id, settings, |editor| {
            editor.set_frequency(days);
            println!(
                "✓ Frequency set to {} days/week ({} weeks)",
                editor.structure().frequency,
                editor.duration_weeks()
            );
            Ok(())
        }),

        Commands::AddDay { id, cycle } => edit(&mut store, &id, settings, |editor| {
            let cycle_id = resolve_cycle(editor, cycle.as_deref())?;
            let day_id = editor.add_day(&cycle_id)?;
            println!("✓ Added day {}", day_id);
            Ok(())
        }),

        Commands::CopyDay { id, target } => edit(&mut store, &id, settings, |editor| {
            let key = resolve_day(editor, &target)?;
            let copy_id = editor.copy_day(&key.cycle_id, &key.day_id)?;
            println!("✓ Copied day to {}", copy_id);
            Ok(())
        }),

        Commands::DeleteDay { id, cycle, day } => edit(&mut store, &id, settings, |editor| {
            let cycle_id = resolve_cycle(editor, cycle.as_deref())?;
            if editor.delete_day(&cycle_id, &day)? {
                println!("✓ Deleted day {}", day);
            } else {
                println!("A cycle needs at least one day - nothing deleted.");
            }
            Ok(())
        }),

        Commands::Rename {
            id,
            name,
            cycle,
            day,
        } => edit(&mut store, &id, settings, |editor| {
            match (cycle, day) {
                (Some(cycle), Some(day)) => editor.rename_day(&cycle, &day, name)?,
                (Some(cycle), None) => editor.rename_cycle(&cycle, name)?,
                _ => editor.rename_program(name),
            }
            println!("✓ Renamed");
            Ok(())
        }),

        Commands::AddExercise {
            id,
            target,
            exercise,
            superset,
        } => {
            let library = load_library(&config)?;
            let reference = library.get(&exercise)?.clone();
            edit(&mut store, &id, settings, |editor| {
                let key = resolve_day(editor, &target)?;
                let entry_id = editor.add_exercise(
                    &key.cycle_id,
                    &key.day_id,
                    &reference,
                    superset.as_deref(),
                )?;
                println!("✓ Added {} as {}", reference.name, entry_id);
                Ok(())
            })
        }

        Commands::Set {
            id,
            target,
            entry,
            sets,
            reps,
            rest,
            superset,
            no_superset,
            notes,
        } => {
            let patch = ExercisePatch {
                sets,
                reps: reps.map(Reps::Raw),
                rest,
                superset_id: if no_superset {
                    Some(None)
                } else {
                    superset.map(Some)
                },
                notes: notes.map(|n| Some(n).filter(|n| !n.is_empty())),
                ..Default::default()
            };
            if patch.is_empty() {
                return Err(Error::Other("nothing to update".into()));
            }
            edit(&mut store, &id, settings, |editor| {
                let key = resolve_day(editor, &target)?;
                editor.update_exercise(&key.cycle_id, &key.day_id, &entry, patch)?;
                println!("✓ Updated {}", entry);
                Ok(())
            })
        }

        Commands::DeleteExercise { id, target, entry } => {
            edit(&mut store, &id, settings, |editor| {
                let key = resolve_day(editor, &target)?;
                if editor.delete_exercise(&key.cycle_id, &key.day_id, &entry)? {
                    println!("✓ Deleted {}", entry);
                } else {
                    println!("No exercise {} in that day.", entry);
                }
                Ok(())
            })
        }

        Commands::Reorder { id, key, from, to } => {
            let key: DayKey = key.parse()?;
            edit(&mut store, &id, settings, |editor| {
                editor.reorder_in(&key, from, to)?;
                println!("✓ Moved exercise {} -> {}", from, to);
                Ok(())
            })
        }

        Commands::Superset => {
            let mut mode = SupersetMode::new();
            println!("{}", mode.enter());
            Ok(())
        }
    }
}

/// Load a program, apply one edit, save it back
fn edit<F>(store: &mut JsonFileStore, id: &str, settings: EditorSettings, f: F) -> Result<()>
where
    F: FnOnce(&mut ProgramEditor<UuidIds>) -> Result<()>,
{
    let mut session = EditSession::open_from_store(&*store, id, UuidIds, settings)?;
    f(session.editor_mut())?;
    session.save(store)?;
    tracing::debug!("Saved edit to program {}", id);
    Ok(())
}

fn resolve_cycle(editor: &ProgramEditor<UuidIds>, cycle: Option<&str>) -> Result<String> {
    match cycle {
        Some(id) => editor
            .structure()
            .cycle(id)
            .map(|c| c.id.clone())
            .ok_or_else(|| Error::NotFound {
                kind: "cycle",
                id: id.to_string(),
            }),
        None => Ok(editor.selection().cycle_id.clone()),
    }
}

fn resolve_day(editor: &ProgramEditor<UuidIds>, target: &Target) -> Result<DayKey> {
    let cycle_id = resolve_cycle(editor, target.cycle.as_deref())?;
    let day_id = match &target.day {
        Some(day) => day.clone(),
        None => editor
            .structure()
            .cycle(&cycle_id)
            .and_then(|c| c.days.first())
            .map(|d| d.id.clone())
            .ok_or_else(|| Error::NotFound {
                kind: "cycle",
                id: cycle_id.clone(),
            })?,
    };
    Ok(DayKey::new(cycle_id, day_id))
}

fn load_library(config: &Config) -> Result<ExerciseLibrary> {
    match &config.library.path {
        Some(path) => ExerciseLibrary::load_csv(path),
        None => Ok(get_default_library().clone()),
    }
}

fn cmd_list(store: &mut JsonFileStore, settings: &EditorSettings) -> Result<()> {
    let ids = store.list()?;
    if ids.is_empty() {
        println!("No programs saved yet.");
        return Ok(());
    }

    for id in ids {
        match EditSession::open_persisted(&mut *store, &id, UuidIds, settings.clone()) {
            Ok(session) => {
                let structure = session.editor().structure();
                println!(
                    "  {}  {}  ({} weeks, {} days/week)",
                    id,
                    structure.name,
                    structure.duration_weeks(),
                    structure.frequency
                );
            }
            Err(e) => println!("  {}  <unreadable: {}>", id, e),
        }
    }
    Ok(())
}

fn display_program(id: &str, structure: &ProgramStructure) {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  {}", structure.name);
    println!("╰─────────────────────────────────────────╯");
    println!("  id: {}", id);
    println!(
        "  {} days/week · {} weeks",
        structure.frequency,
        structure.duration_weeks()
    );

    for cycle in &structure.cycles {
        println!();
        println!("  {} ×{}  [{}]", cycle.name, cycle.repeat_count, cycle.id);

        for day in &cycle.days {
            println!("    {}  [{}]", day.name, day.id);
            let slots = superset_groups(day);

            for (entry, slot) in day.exercises.iter().zip(slots) {
                let marker = match (&slot.group_id, slot.is_anchor) {
                    (Some(group), true) => format!("┌ superset {}\n      │ ", group),
                    (Some(_), false) => "│ ".to_string(),
                    (None, _) => String::new(),
                };
                println!(
                    "      {}{} {}x{} rest {}s  [{}]",
                    marker, entry.exercise_name, entry.sets, entry.reps, entry.rest, entry.id
                );
            }
        }
    }
    println!();
}
