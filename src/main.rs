use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use std::path::{Path, PathBuf};
use wtr::cd_request::{cd_file_path, write_cd_request};
use wtr::config::Config;
use wtr::{
    CreateRequest, CreateSource, GitCli, Layout, Vcs, WorktreeError, WorktreeManager,
    WorktreeResult,
};

mod list;
mod prompt;
mod select;
mod shell;
mod status;

const HELP_EPILOG: &str = "\
Picker keys:
  type       Filter branches (fuzzy)
  Enter      Switch to worktree, or create it
  Tab        Mark for bulk delete
  Ctrl-N     Create from a chosen branch, commit or tag
  Ctrl-D     Delete highlighted or marked worktrees
  Ctrl-P     Prune stale worktrees
  Ctrl-R     Refresh
  Esc        Quit

Exit codes: 0 = path written for the shell to cd into, 1 = nothing to do, 2 = error.
Run `eval \"$(wtr shell-init bash)\"` to let wtr change your shell's directory.";

#[derive(Parser)]
#[command(name = "wtr")]
#[command(version)]
#[command(about = "Switch between git worktrees kept side by side in one directory")]
#[command(after_help = HELP_EPILOG)]
struct Cli {
    /// Run as if wtr was started in DIR
    #[arg(short = 'C', global = true, value_name = "DIR")]
    directory: Option<PathBuf>,

    /// File to write the target directory to (default: $WTR_CD_FILE)
    #[arg(long, global = true, value_name = "PATH")]
    cd_file: Option<PathBuf>,

    /// Switch to the existing worktree of BRANCH (skips the picker)
    branch: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List existing worktrees as `branch<TAB>path`
    List {
        #[arg(long, help = "Output results as JSON")]
        json: bool,
    },
    /// Create a new worktree
    Add {
        /// Directory and branch name (defaults to the commit's first 7 chars)
        name: Option<String>,

        /// Base branch for a new branch
        #[arg(short = 'b', long, value_name = "BRANCH", conflicts_with = "commit")]
        base: Option<String>,

        /// Check out a commit or tag (detached HEAD unless -B)
        #[arg(short = 'c', long, value_name = "COMMIT")]
        commit: Option<String>,

        /// Create branch NAME at the commit
        #[arg(short = 'B', long = "new-branch", requires = "commit")]
        new_branch: bool,
    },
    /// Delete the worktree of a branch
    Delete {
        branch: String,

        /// Remove even with uncommitted changes
        #[arg(short, long)]
        force: bool,
    },
    /// Remove worktrees whose branch is deleted or merged into the main branch
    Prune {
        /// Don't ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Show status of branches (all local branches by default)
    Status {
        branches: Vec<String>,

        #[arg(long, help = "Output results as JSON")]
        json: bool,
    },
    /// Move the main checkout so its directory is named after the main branch
    Restructure {
        /// Don't ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Generate shell completions
    Completion { shell: Shell },
    /// Print the shell function that applies directory changes
    ShellInit { shell: shell::InitShell },
}

/// How a successful run ends
enum Outcome {
    /// Hand a directory to the shell wrapper (exit 0)
    ChangeDir(PathBuf),
    /// Nothing for the shell to do (exit 1)
    Done,
    /// Diagnostics already printed (exit 2)
    Failed,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let cd_file = cd_file_path(cli.cd_file.as_deref());

    let code = match run(cli) {
        Ok(Outcome::ChangeDir(path)) => match write_cd_request(&cd_file, &path) {
            Ok(()) => {
                println!("{}", path.display());
                0
            }
            Err(e) => {
                eprintln!("Error: cannot write {}: {}", cd_file.path().display(), e);
                2
            }
        },
        Ok(Outcome::Done) => 1,
        Ok(Outcome::Failed) => 2,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            2
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> WorktreeResult<Outcome> {
    let start = match cli.directory {
        Some(dir) => dir,
        None => std::env::current_dir()
            .map_err(|e| WorktreeError::io("cannot read current directory", e))?,
    };

    match cli.command {
        Some(Commands::Completion { shell }) => {
            clap_complete::generate(shell, &mut Cli::command(), "wtr", &mut std::io::stdout());
            return Ok(Outcome::Done);
        }
        Some(Commands::ShellInit { shell }) => {
            print!("{}", shell::init_script(shell));
            return Ok(Outcome::Done);
        }
        _ => {}
    }

    let (manager, config) = open(&start)?;

    match cli.command {
        Some(Commands::List { json }) => {
            list::run_list(&manager, json)?;
            Ok(Outcome::Done)
        }
        Some(Commands::Status { branches, json }) => {
            if status::run_status(&manager, &branches, json)? {
                Ok(Outcome::Done)
            } else {
                Ok(Outcome::Failed)
            }
        }
        Some(Commands::Add {
            name,
            base,
            commit,
            new_branch,
        }) => run_add(&manager, name, base, commit, new_branch),
        Some(Commands::Delete { branch, force }) => {
            manager.delete_worktree(&branch, force)?;
            eprintln!("Deleted worktree: {}", branch);
            Ok(Outcome::Done)
        }
        Some(Commands::Prune { yes }) => run_prune(&manager, yes),
        Some(Commands::Restructure { yes }) => run_restructure(&manager, yes),
        Some(Commands::Completion { .. }) | Some(Commands::ShellInit { .. }) => Ok(Outcome::Done),
        None => {
            if let Layout::NeedsRestructure { .. } = manager.classify()? {
                return run_restructure(&manager, false);
            }
            match cli.branch {
                Some(branch) => switch_to(&manager, &branch),
                None => match select::run_picker(&manager, &config)? {
                    Some(path) => Ok(Outcome::ChangeDir(path)),
                    None => Ok(Outcome::Done),
                },
            }
        }
    }
}

fn open(start: &Path) -> WorktreeResult<(WorktreeManager, Config)> {
    let vcs = GitCli::locate()?;
    let root = vcs.toplevel(start)?;
    let config = Config::load(Some(&root));
    let manager = WorktreeManager::open(root, Box::new(vcs), config.to_engine_options())?;
    Ok((manager, config))
}

fn switch_to(manager: &WorktreeManager, branch: &str) -> WorktreeResult<Outcome> {
    let worktrees = manager.worktree_map()?;
    if let Some(path) = worktrees.get(branch) {
        return Ok(Outcome::ChangeDir(path.clone()));
    }
    if !worktrees.is_empty() {
        let names: Vec<&str> = worktrees.keys().map(String::as_str).collect();
        eprintln!("Available: {}", names.join(", "));
    }
    Err(WorktreeError::NoWorktree {
        branch: branch.to_string(),
    })
}

fn run_add(
    manager: &WorktreeManager,
    name: Option<String>,
    base: Option<String>,
    commit: Option<String>,
    new_branch: bool,
) -> WorktreeResult<Outcome> {
    let name = match (name, &commit) {
        (Some(name), _) => name,
        (None, Some(commit)) => commit.chars().take(7).collect(),
        (None, None) => {
            return Err(WorktreeError::Parse(
                "a worktree name is required (or use --commit)".to_string(),
            ));
        }
    };
    if manager.worktree_path(&name)?.is_some() {
        return Err(WorktreeError::TargetExists {
            path: manager.container().join(&name),
        });
    }

    let source = match commit {
        Some(commit) => CreateSource::Commit { commit, new_branch },
        None => CreateSource::Branch { base },
    };
    let created = manager.create_worktree(CreateRequest { name, source })?;
    for warning in &created.warnings {
        eprintln!("{} {}", "warning:".yellow().bold(), warning);
    }
    Ok(Outcome::ChangeDir(created.path))
}

fn run_prune(manager: &WorktreeManager, yes: bool) -> WorktreeResult<Outcome> {
    let stale = manager.find_stale()?;
    if stale.is_empty() {
        eprintln!("No stale worktrees found");
        return Ok(Outcome::Done);
    }

    eprintln!("Found {} stale worktree(s):", stale.len());
    for s in &stale {
        eprintln!("  {} ({})", s.branch.bright_magenta(), s.reason);
    }
    if !prompt::confirm("Delete all?", yes) {
        eprintln!("Cancelled");
        return Ok(Outcome::Done);
    }

    let branches: Vec<String> = stale.into_iter().map(|s| s.branch).collect();
    let report = manager.prune(&branches)?;
    let pruned = report.succeeded().count();

    if report.is_partial_failure() {
        eprintln!("Pruned {}, errors:", pruned);
        for outcome in report.failed() {
            if let Err(e) = &outcome.result {
                eprintln!("  {}: {}", outcome.branch, e);
            }
        }
        return Ok(Outcome::Failed);
    }

    eprintln!("Pruned {} worktree(s)", pruned);
    Ok(Outcome::Done)
}

fn run_restructure(manager: &WorktreeManager, yes: bool) -> WorktreeResult<Outcome> {
    let expected_main = match manager.classify()? {
        Layout::NeedsRestructure { expected_main } => expected_main,
        Layout::Valid => {
            eprintln!("Already in worktree layout");
            return Ok(Outcome::Done);
        }
        Layout::Invalid { reason } => {
            return Err(WorktreeError::InvalidLayout {
                path: manager.root().to_path_buf(),
                reason,
            });
        }
    };

    eprintln!("Repository is not in worktree layout.");
    let question = format!(
        "Move {} to {}?",
        manager.root().display(),
        expected_main.display()
    );
    if !prompt::confirm(&question, yes) {
        eprintln!("Worktree operations require the worktree layout.");
        return Ok(Outcome::Done);
    }

    let new_main = manager.restructure()?;
    eprintln!("Restructured: {}", new_main.display());
    Ok(Outcome::ChangeDir(new_main))
}
