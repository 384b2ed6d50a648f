//! CLI for the rope-rs refactoring engine.
//!
//! Each subcommand validates, plans, and applies one refactoring against a
//! project rooted at `--project`. `--dry-run` prints a unified diff of
//! every file the refactoring would touch instead of writing to disk.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rope_rs::prelude::*;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rope")]
#[command(author, version, about = "A refactoring engine for Python-like source trees", long_about = None)]
struct Cli {
    /// Project root directory.
    #[arg(short, long, default_value = ".")]
    project: PathBuf,

    /// Preview changes instead of writing them to disk.
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rename the binding at a byte offset in a module.
    Rename {
        module: String,
        offset: usize,
        new_name: String,
    },
    /// Move a module-global definition to another module.
    Move {
        module: String,
        offset: usize,
        destination: String,
    },
    /// Relocate a whole module to another folder, rewriting imports
    /// project-wide to its new dotted path.
    MoveModule {
        module: String,
        destination_folder: String,
    },
    /// Convert a `name.py` module into a `name/__init__.py` package.
    ModuleToPackage { module: String },
    /// Route constructor calls for a class through a factory.
    IntroduceFactory {
        module: String,
        class_offset: usize,
        factory_name: String,
        #[arg(long)]
        global: bool,
    },
    /// Replace direct access to a class attribute with accessor methods.
    EncapsulateField {
        module: String,
        class_offset: usize,
        field_name: String,
    },
    /// Turn a method-local variable into an attribute of `self`.
    ConvertLocalToField { module: String, offset: usize },
    /// Add a parameter to a function, defaulted to an expression already
    /// used in its body.
    IntroduceParameter {
        module: String,
        function_offset: usize,
        expr_text: String,
        param_name: String,
    },
    /// Extract an expression into a local variable.
    ExtractVariable {
        module: String,
        start: usize,
        end: usize,
        name: String,
    },
    /// Extract a statement range into a new top-level function.
    ExtractMethod {
        module: String,
        start: usize,
        end: usize,
        name: String,
    },
    /// Inline a single-assignment local variable into its uses.
    InlineLocal { module: String, offset: usize },
    /// Inline a zero-argument, single-return function into its call sites.
    InlineMethod { module: String, offset: usize },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let project = Project::new(&cli.project).context("failed to open project")?;

    let change = plan_change(&project, &cli.command)?;

    if cli.dry_run {
        print_dry_run(&project, &change)?;
        return Ok(());
    }

    let mut undo = UndoManager::new();
    undo.apply(&project, change).context("failed to apply refactoring")?;
    println!("Applied {}.", command_name(&cli.command));
    Ok(())
}

fn plan_change(project: &Project, command: &Commands) -> Result<Change> {
    let op: Box<dyn RefactoringOperation> = match command {
        Commands::Rename { module, offset, new_name } => {
            Box::new(Rename::new(module.as_str(), *offset, new_name.clone()))
        }
        Commands::Move { module, offset, destination } => Box::new(MoveGlobal {
            module: module.as_str().into(),
            offset: *offset,
            destination: destination.as_str().into(),
        }),
        Commands::MoveModule { module, destination_folder } => Box::new(MoveModule {
            module: module.as_str().into(),
            destination_folder: destination_folder.as_str().into(),
        }),
        Commands::ModuleToPackage { module } => Box::new(ModuleToPackage {
            module: module.as_str().into(),
        }),
        Commands::IntroduceFactory { module, class_offset, factory_name, global } => {
            Box::new(IntroduceFactory {
                module: module.as_str().into(),
                class_offset: *class_offset,
                factory_name: factory_name.clone(),
                global_factory: *global,
            })
        }
        Commands::EncapsulateField { module, class_offset, field_name } => {
            Box::new(EncapsulateField {
                module: module.as_str().into(),
                class_offset: *class_offset,
                field_name: field_name.clone(),
            })
        }
        Commands::ConvertLocalToField { module, offset } => Box::new(ConvertLocalToField {
            module: module.as_str().into(),
            offset: *offset,
        }),
        Commands::IntroduceParameter { module, function_offset, expr_text, param_name } => {
            Box::new(IntroduceParameter {
                module: module.as_str().into(),
                function_offset: *function_offset,
                expr_text: expr_text.clone(),
                param_name: param_name.clone(),
            })
        }
        Commands::ExtractVariable { module, start, end, name } => Box::new(ExtractVariable {
            module: module.as_str().into(),
            start: *start,
            end: *end,
            name: name.clone(),
        }),
        Commands::ExtractMethod { module, start, end, name } => Box::new(ExtractMethod {
            module: module.as_str().into(),
            start: *start,
            end: *end,
            name: name.clone(),
        }),
        Commands::InlineLocal { module, offset } => Box::new(InlineLocal {
            module: module.as_str().into(),
            offset: *offset,
        }),
        Commands::InlineMethod { module, offset } => Box::new(InlineMethod {
            module: module.as_str().into(),
            offset: *offset,
        }),
    };

    let validation = op.validate(project).context("validation failed")?;
    if !validation.is_valid() {
        anyhow::bail!("{}", validation.errors.join("; "));
    }
    for warning in &validation.warnings {
        eprintln!("warning: {warning}");
    }
    op.plan(project).context("planning failed")
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Rename { .. } => "rename",
        Commands::Move { .. } => "move",
        Commands::MoveModule { .. } => "move-module",
        Commands::ModuleToPackage { .. } => "module-to-package",
        Commands::IntroduceFactory { .. } => "introduce-factory",
        Commands::EncapsulateField { .. } => "encapsulate-field",
        Commands::ConvertLocalToField { .. } => "convert-local-to-field",
        Commands::IntroduceParameter { .. } => "introduce-parameter",
        Commands::ExtractVariable { .. } => "extract-variable",
        Commands::ExtractMethod { .. } => "extract-method",
        Commands::InlineLocal { .. } => "inline-local",
        Commands::InlineMethod { .. } => "inline-method",
    }
}

fn print_dry_run(project: &Project, change: &Change) -> Result<()> {
    for (path, old_text) in collect_touched_files(change) {
        let resource = project.get_resource(path.clone())?;
        let current = if resource.exists() { resource.read().unwrap_or_default() } else { String::new() };
        let preview = apply_preview(change, &path, &old_text);
        println!("{}", rope_rs::diff::colorized_diff(&current, &preview, std::path::Path::new(path.as_str())));
    }
    Ok(())
}

/// Collects the (path, old_text) pairs a change set touches, for dry-run
/// reporting. Mirrors `Change::apply`'s traversal without writing to disk.
fn collect_touched_files(change: &Change) -> Vec<(ResourcePath, String)> {
    let mut out = Vec::new();
    collect_touched_files_into(change, &mut out);
    out
}

fn collect_touched_files_into(change: &Change, out: &mut Vec<(ResourcePath, String)>) {
    match change {
        Change::Content { path, old_text, .. } => out.push((path.clone(), old_text.clone())),
        Change::CreateFile { path, .. } => out.push((path.clone(), String::new())),
        Change::Set { children, .. } => {
            for child in children {
                collect_touched_files_into(child, out);
            }
        }
        _ => {}
    }
}

fn apply_preview(change: &Change, path: &ResourcePath, _old_text: &str) -> String {
    match change {
        Change::Content { path: p, new_text, .. } if p == path => new_text.clone(),
        Change::CreateFile { path: p, content } if p == path => content.clone(),
        Change::Set { children, .. } => children
            .iter()
            .find_map(|c| {
                let preview = apply_preview(c, path, _old_text);
                if preview != _old_text {
                    Some(preview)
                } else {
                    None
                }
            })
            .unwrap_or_else(|| _old_text.to_string()),
        _ => _old_text.to_string(),
    }
}
