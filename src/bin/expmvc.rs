//! expmvc CLI
//!
//! Scaffolds Express MVC projects, patches model relationships and keeps
//! npm dependencies in sync with what the code requires.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use expmvc::config::ExpmvcConfig;
use expmvc::deps::{self, FileCheck, NpmInstaller, PackageInstaller};
use expmvc::generate::{self, Generator, GeneratorKind, Registration, WriteStatus};
use expmvc::relationship::{RelationshipKind, RelationshipOptions, RelationshipOutcome, RelationshipResolver};
use expmvc::watch::FileWatcher;
use expmvc::ProjectLayout;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "expmvc")]
#[command(about = "Express MVC scaffolding with relationship-aware models and dependency auto-install")]
#[command(version)]
struct Cli {
    /// Project root
    #[arg(short, long, global = true, default_value = ".")]
    project: PathBuf,

    /// Config file layered over the default locations
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new project in ./<name>
    New {
        name: String,
        /// Skip `npm install`
        #[arg(long)]
        skip_install: bool,
    },

    /// Generate model, controller, route, service, validation, view or scaffold
    #[command(alias = "g")]
    Generate {
        kind: String,
        name: String,
        /// Fields as name[:kind[:Target]]
        fields: Vec<String>,
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },

    /// Declare a relationship between two existing models
    #[command(alias = "rel")]
    Relationship {
        /// belongsTo | hasMany | belongsToMany
        kind: String,
        from: String,
        to: String,
        /// Field name on the declaring model
        #[arg(long)]
        field: Option<String>,
        /// Mark a belongsTo field as required
        #[arg(long)]
        required: bool,
        /// Show the diff without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Like `relationship`, creating missing models and the parent service
    #[command(name = "scaffold-relationship", alias = "sr")]
    ScaffoldRelationship {
        parent: String,
        child: String,
        kind: String,
        #[arg(long)]
        dry_run: bool,
    },

    /// Install packages the code requires but package.json does not declare
    #[command(name = "check-deps", alias = "cd")]
    CheckDeps,

    /// Check dependencies, then start the app
    #[command(name = "fix-deps")]
    FixDeps,

    /// Watch the project and install new dependencies as files change
    Watch,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("❌ Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli.project, cli.config.as_deref())?;
    let layout = ProjectLayout::new(&cli.project);
    let installer = NpmInstaller::new(&config.dependencies.package_manager, &cli.project);

    match cli.command {
        Commands::New { name, skip_install } => {
            println!("🚀 Creating Express project '{}'...", name);
            let project = generate::create_project(&cli.project, &name)?;
            println!("✅ Project structure created in {}", project.root().display());
            config.save(&project.root().join("expmvc.toml").to_string_lossy())?;

            if !skip_install {
                println!("📦 Installing dependencies...");
                let installer = NpmInstaller::new(&config.dependencies.package_manager, project.root());
                if let Err(e) = installer.install(&[], false) {
                    println!("⚠️  {}", e);
                }
            }

            println!();
            println!("👉 Next steps:");
            println!("   cd {}", name);
            println!("   npm run dev");
            std::process::exit(0);
        }

        Commands::Generate { kind, name, fields, force } => {
            let kind: GeneratorKind = kind.parse()?;
            precheck_dependencies(&layout, &config, &installer);

            let report = Generator::new(&layout).force(force).generate(kind, &name, &fields)?;
            for file in &report.files {
                let icon = match file.status {
                    WriteStatus::Created => "✅ Created",
                    WriteStatus::Overwritten => "♻️  Overwrote",
                    WriteStatus::Skipped => "⏭️  Skipped",
                };
                println!("{} {}", icon, file.path.display());
            }
            match report.route_registration {
                Some(Registration::Added) => println!("🔗 Route registered in src/routes/index.js"),
                Some(Registration::AlreadyRegistered) => println!("🔗 Route already registered"),
                Some(Registration::MissingIndex) => println!("⚠️  src/routes/index.js not found, route not registered"),
                None => {}
            }
            if kind == GeneratorKind::Scaffold {
                let plural = expmvc::layout::pluralize(&name.to_lowercase());
                println!();
                println!("👉 Next steps:");
                println!("   Start the server: npm run dev");
                println!("   API available at /{}", plural);
            }
            Ok(())
        }

        Commands::Relationship { kind, from, to, field, required, dry_run } => {
            let kind: RelationshipKind = kind.parse()?;
            precheck_dependencies(&layout, &config, &installer);

            let options = RelationshipOptions { field_name: field, required };
            println!("🔗 {} {} {}", from, kind, to);
            let outcome = RelationshipResolver::new(&layout, &config.scaffold)
                .dry_run(dry_run)
                .relationship(&from, &to, kind, &options)?;
            print_outcome(&outcome);
            Ok(())
        }

        Commands::ScaffoldRelationship { parent, child, kind, dry_run } => {
            let kind: RelationshipKind = kind.parse()?;
            precheck_dependencies(&layout, &config, &installer);

            println!("🏗️  Scaffolding {} {} {}", parent, kind, child);
            let outcome = RelationshipResolver::new(&layout, &config.scaffold)
                .dry_run(dry_run)
                .scaffold_relationship(&parent, &child, kind)?;
            print_outcome(&outcome);
            Ok(())
        }

        Commands::CheckDeps => {
            println!("🔍 Checking dependencies in {}...", layout.root().display());
            let report = deps::check_and_install(&layout, None, &config.dependencies, &installer)?;
            if report.is_satisfied() {
                println!("✅ All required packages are declared");
            } else {
                for name in report.installed.iter().chain(&report.installed_dev) {
                    println!("  📦 {}", name);
                }
                println!("✅ Installed {} missing package(s)", report.missing.len());
            }
            Ok(())
        }

        Commands::FixDeps => {
            println!("🔍 Checking dependencies...");
            let report = deps::check_and_install(&layout, None, &config.dependencies, &installer)?;
            println!("✅ {} missing package(s) installed", report.missing.len());
            println!("🚀 Starting application...");
            installer.run_script("start")?;
            Ok(())
        }

        Commands::Watch => {
            let watcher = FileWatcher::new(layout.root(), config.watch.clone());
            println!("👀 Watching {} for new dependencies (Ctrl+C to stop)", watcher.root().display());

            let deps_config = config.dependencies.clone();
            let project = layout.clone();
            let handle = watcher.spawn(move |event| {
                match deps::check_changed_file(&project, &event.path, &deps_config, &installer)? {
                    FileCheck::Satisfied => {}
                    FileCheck::Installed(report) => println!(
                        "📦 {} → installed {}",
                        event.path.display(),
                        report.missing.iter().cloned().collect::<Vec<_>>().join(", ")
                    ),
                    FileCheck::InstallFailed(e) => eprintln!("❌ {}: {}", event.path.display(), e),
                }
                Ok(())
            })?;
            handle.join();
            Ok(())
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn load_config(project: &Path, explicit: Option<&Path>) -> anyhow::Result<ExpmvcConfig> {
    // a project-local expmvc.toml counts when no file is given explicitly
    let local = project.join("expmvc.toml");
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None if local.is_file() => Some(local),
        None => None,
    };
    let path = path.map(|p| p.to_string_lossy().into_owned());
    ExpmvcConfig::load_from(path.as_deref()).context("Failed to load configuration")
}

/// Install missing packages before generating; failures are reported and generation goes on
fn precheck_dependencies(layout: &ProjectLayout, config: &ExpmvcConfig, installer: &dyn PackageInstaller) {
    if !config.dependencies.auto_install || !layout.manifest_path().exists() {
        return;
    }
    match deps::check_and_install(layout, None, &config.dependencies, installer) {
        Ok(report) if !report.is_satisfied() => {
            println!("📦 Installed missing packages: {}", report.missing.iter().cloned().collect::<Vec<_>>().join(", "));
        }
        Ok(_) => {}
        Err(e) => println!("⚠️  Dependency check failed: {}", e),
    }
}

fn print_outcome(outcome: &RelationshipOutcome) {
    for entity in &outcome.created {
        println!("  ✨ Created model {}", entity);
    }
    for (entity, field) in &outcome.added_fields {
        println!("  ➕ {}.{}", entity, field);
    }
    for (entity, name) in &outcome.added_virtuals {
        println!("  🔗 {}.{} (virtual)", entity, name);
    }
    for note in &outcome.skipped {
        println!("  ⏭️  {}", note);
    }

    if !outcome.applied {
        println!();
        println!("🔍 Dry run, nothing written:");
        for write in &outcome.writes {
            print!("{}", write.diff());
        }
    } else if outcome.is_noop() {
        println!("✅ Already up to date");
    } else {
        for write in &outcome.writes {
            let verb = if write.is_creation() { "Created" } else { "Updated" };
            println!("✅ {} {}", verb, write.path.display());
        }
    }
}
