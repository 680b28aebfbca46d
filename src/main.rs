use clap::{Args, Parser, Subcommand};
use roster_sync::config::RosterConfig;
use roster_sync::domain::model::{NewClass, NewStudent};
use roster_sync::domain::ports::Gateway;
use roster_sync::utils::error::ErrorSeverity;
use roster_sync::utils::{logger, validation::Validate};
use roster_sync::{ClassStore, RestGateway, RosterError, StudentOrdering, StudentStore};
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "roster")]
#[command(about = "Manage class rosters against the school backend")]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "roster.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON log lines
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Class operations for the configured owner
    Classes {
        #[command(subcommand)]
        action: ClassAction,
    },
    /// Student operations for one class
    Students {
        /// Class id
        #[arg(long = "class")]
        class_id: String,

        /// Keep the list sorted by name after inserts
        #[arg(long)]
        sorted: bool,

        #[command(subcommand)]
        action: StudentAction,
    },
}

#[derive(Subcommand)]
enum ClassAction {
    List,
    Show { id: String },
    Create(CreateClassArgs),
    Delete { id: String },
}

#[derive(Args)]
struct CreateClassArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    grade_level: String,
    #[arg(long)]
    subject: String,
    #[arg(long)]
    academic_year: Option<String>,
}

#[derive(Subcommand)]
enum StudentAction {
    List,
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        email: String,
        #[arg(long, default_value = "")]
        student_id: String,
    },
    /// Import `Name,Email,StudentID` rows; the first line is a header. Use `-` for stdin.
    Import { file: String },
    Delete { id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match RosterConfig::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", cli.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    let verbose = cli.verbose || config.logging.verbose;
    if cli.json_logs || config.logging.json {
        logger::init_json_logger(verbose);
    } else {
        logger::init_cli_logger(verbose);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(1);
    }

    let gateway = Arc::new(RestGateway::new(&config.gateway)?);
    let settings = Settings {
        owner_id: config.owner.user_id.clone(),
        timeout: config.operation_timeout(),
        sorted: config.students.keep_sorted,
    };
    let outcome = execute(gateway, &settings, cli.command).await;

    if let Err(e) = outcome {
        tracing::error!(
            "❌ Operation failed: {} (Kind: {}, Severity: {:?})",
            e,
            e.kind(),
            e.severity()
        );
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

struct Settings {
    owner_id: String,
    timeout: Duration,
    sorted: bool,
}

async fn execute<G: Gateway>(
    gateway: Arc<G>,
    settings: &Settings,
    command: Command,
) -> Result<(), RosterError> {
    match command {
        Command::Classes { action } => {
            let store = ClassStore::new(gateway, settings.owner_id.clone(), settings.timeout);
            run_class_action(&store, action).await
        }
        Command::Students {
            class_id,
            sorted,
            action,
        } => {
            let ordering = if sorted || settings.sorted {
                StudentOrdering::SortedByName
            } else {
                StudentOrdering::Appended
            };
            let store = StudentStore::new(gateway, class_id, settings.timeout).with_ordering(ordering);
            run_student_action(&store, action).await
        }
    }
}

async fn run_class_action<G: Gateway>(
    store: &ClassStore<G>,
    action: ClassAction,
) -> Result<(), RosterError> {
    match action {
        ClassAction::List => {
            let classes = store.fetch().await?;
            if classes.is_empty() {
                println!("No classes yet");
            }
            for class in classes.iter() {
                println!(
                    "{}\t{}\tgrade {}\t{}{}",
                    class.id,
                    class.name,
                    class.grade_level,
                    class.subject,
                    class
                        .academic_year
                        .as_deref()
                        .map(|y| format!("\t{}", y))
                        .unwrap_or_default()
                );
            }
        }
        ClassAction::Show { id } => {
            let class = store.find(&id).await?;
            println!("{}", serde_json::to_string_pretty(&class)?);
        }
        ClassAction::Create(args) => {
            let input = NewClass {
                name: args.name.trim().to_string(),
                grade_level: args.grade_level.trim().to_string(),
                subject: args.subject.trim().to_string(),
                academic_year: args.academic_year.filter(|y| !y.trim().is_empty()),
            };
            input.validate()?;
            let class = store.create(&input).await?;
            println!("✅ Created class {} ({})", class.name, class.id);
        }
        ClassAction::Delete { id } => {
            store.delete(&id).await?;
            println!("🗑️ Deleted class {}", id);
        }
    }
    Ok(())
}

async fn run_student_action<G: Gateway>(
    store: &StudentStore<G>,
    action: StudentAction,
) -> Result<(), RosterError> {
    match action {
        StudentAction::List => {
            let students = store.fetch().await?;
            if students.is_empty() {
                println!("No students yet");
            }
            for student in students.iter() {
                println!(
                    "{}\t{}\t{}\t{}",
                    student.id,
                    student.name,
                    student.email.as_deref().unwrap_or("-"),
                    student.student_id.as_deref().unwrap_or("-")
                );
            }
        }
        StudentAction::Add {
            name,
            email,
            student_id,
        } => {
            let input = NewStudent::from_form(store.class_id(), &name, &email, &student_id);
            input.validate()?;
            let student = store.add_student(&input).await?;
            println!("✅ Added {} ({})", student.name, student.id);
        }
        StudentAction::Import { file } => {
            let text = read_input(&file)?;
            if text.trim().is_empty() {
                return Err(RosterError::ValidationError {
                    field: "csv".to_string(),
                    message: "Please paste CSV data".to_string(),
                });
            }
            let summary = store.import_csv(&text).await?;
            println!("✅ Imported {} students", summary.inserted.len());
            if !summary.skipped_lines.is_empty() {
                println!("⚠️ Skipped lines without a name: {:?}", summary.skipped_lines);
            }
        }
        StudentAction::Delete { id } => {
            store.delete_student(&id).await?;
            println!("🗑️ Removed student {}", id);
        }
    }
    Ok(())
}

fn read_input(file: &str) -> Result<String, RosterError> {
    if file == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }
    Ok(std::fs::read_to_string(file)?)
}
