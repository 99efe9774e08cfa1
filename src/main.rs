//! buildcfg CLI
//!
//! Entry point for the `buildcfg` command-line tool.

use buildcfg::config::{EffectiveSettings, PROJECT_FILE};
use buildcfg::storage::{self, LoadSummary};
use buildcfg::{BuildModel, ConfigId, ResourceId, ToolId, WriteOutcome};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process;
use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "buildcfg")]
#[command(about = "Inspect and edit managed build configurations", version)]
struct Cli {
    /// Manifest document with the extension definitions
    #[arg(long, short = 'm', global = true)]
    manifest: Option<PathBuf>,

    /// Project document with the configurations
    #[arg(long, short = 'p', global = true)]
    project: Option<PathBuf>,

    /// Settings file (default: .buildcfg.toml)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load, resolve and report unresolved references
    Verify,

    /// Effective options of a tool with their values
    Options {
        /// Configuration id (default: first configuration)
        #[arg(long)]
        configuration: Option<String>,

        /// Project-relative path of the resource
        #[arg(long, default_value = "/")]
        path: String,

        /// Tool id, or the id of any tool in its superclass chain
        tool: String,
    },

    /// Effective tools for a path
    Tools {
        #[arg(long)]
        configuration: Option<String>,

        #[arg(default_value = "/")]
        path: String,
    },

    /// Command line building a file
    Command {
        #[arg(long)]
        configuration: Option<String>,

        file: String,
    },

    /// Add and remove tools on a resource
    Modify {
        #[arg(long)]
        configuration: Option<String>,

        #[arg(long, default_value = "/")]
        path: String,

        /// Tools to remove (comma-separated)
        #[arg(long, value_delimiter = ',')]
        remove: Vec<String>,

        /// Extension tools to add (comma-separated)
        #[arg(long, value_delimiter = ',')]
        add: Vec<String>,

        /// Apply the modification instead of only reporting it
        #[arg(long)]
        apply: bool,

        /// Save the project after applying
        #[arg(long, requires = "apply")]
        write: bool,
    },

    /// Set an option value and save the project
    SetOption {
        #[arg(long)]
        configuration: Option<String>,

        #[arg(long, default_value = "/")]
        path: String,

        /// Tool holding the option
        #[arg(long)]
        tool: String,

        /// Option id
        option: String,

        /// Raw value (lists separated by ';')
        value: String,
    },

    /// Create a configuration from an extension tool chain and save the project
    New {
        /// New configuration id
        id: String,

        /// Extension tool chain to start from
        #[arg(long)]
        tool_chain: String,

        #[arg(long)]
        name: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let cli_overrides = cli.log_level.as_ref().map(|level| json!({ "log": { "level": level } }));
    let project_settings = cli.config.clone().unwrap_or_else(|| PathBuf::from(PROJECT_FILE));
    let settings = match EffectiveSettings::build(
        EffectiveSettings::user_path().as_deref(),
        Some(project_settings.as_path()),
        cli_overrides,
    ) {
        Ok(s) => s,
        Err(e) => fail(&format!("Settings error: {}", e)),
    };
    init_tracing(settings.log_level());
    debug!(sources = settings.sources.len(), "settings loaded");

    let Some(manifest) = cli.manifest.clone() else {
        fail("--manifest is required");
    };
    let mut model = BuildModel::with_id_generator(settings.id_generator());
    // A project path that does not exist yet is only a save target.
    let existing_project = cli.project.as_deref().filter(|p| p.exists());
    let summary = match storage::open(&mut model, &manifest, existing_project) {
        Ok(s) => s,
        Err(e) => fail(&format!("Load error: {}", e)),
    };

    match cli.command {
        Commands::Verify => run_verify(&model, &summary, cli.json),
        Commands::Options {
            configuration,
            path,
            tool,
        } => {
            let resource = resolve_resource(&model, configuration.as_deref(), &path);
            let tool = resolve_tool(&model, resource, &tool);
            run_options(&model, tool, cli.json);
        }
        Commands::Tools { configuration, path } => {
            let resource = resolve_resource(&model, configuration.as_deref(), &path);
            run_tools(&model, resource, cli.json);
        }
        Commands::Command { configuration, file } => {
            let cfg = resolve_configuration(&model, configuration.as_deref());
            run_command(&model, cfg, &file, cli.json);
        }
        Commands::Modify {
            configuration,
            path,
            remove,
            add,
            apply,
            write,
        } => {
            let resource = resolve_resource(&model, configuration.as_deref(), &path);
            run_modify(&mut model, resource, &remove, &add, apply, cli.json);
            if write {
                save(&mut model, cli.project.as_deref());
            }
        }
        Commands::SetOption {
            configuration,
            path,
            tool,
            option,
            value,
        } => {
            let resource = resolve_resource(&model, configuration.as_deref(), &path);
            let tool = resolve_tool(&model, resource, &tool);
            run_set_option(&mut model, tool, &option, &value, cli.json);
            save(&mut model, cli.project.as_deref());
        }
        Commands::New { id, tool_chain, name } => {
            run_new(&mut model, &settings, &id, &tool_chain, name.as_deref());
            save(&mut model, cli.project.as_deref());
        }
    }
}

fn init_tracing(level: &str) {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::new(level))
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install logger: {}", e);
    }
}

fn fail(message: &str) -> ! {
    eprintln!("{}", message);
    process::exit(1);
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => fail(&format!("Error serializing output: {}", e)),
    }
}

fn resolve_configuration(model: &BuildModel, id: Option<&str>) -> ConfigId {
    let found = match id {
        Some(id) => model.find_configuration(id),
        None => model.configurations().next(),
    };
    found.unwrap_or_else(|| fail(&format!("No configuration {}", id.unwrap_or("in project"))))
}

fn resolve_resource(model: &BuildModel, configuration: Option<&str>, path: &str) -> ResourceId {
    let cfg = resolve_configuration(model, configuration);
    model
        .resource_for_path(cfg, path)
        .unwrap_or_else(|| fail(&format!("No resource configuration covers '{}'", path)))
}

fn resolve_tool(model: &BuildModel, resource: ResourceId, id: &str) -> ToolId {
    model
        .effective_tools(resource)
        .into_iter()
        .find(|t| model.tool_lineage(*t).any(|l| model.tool(l).meta.id == id))
        .unwrap_or_else(|| fail(&format!("Tool '{}' is not used by {}", id, model.resource(resource).meta.id)))
}

fn tool_ids(model: &BuildModel, tools: &[ToolId]) -> Vec<String> {
    tools.iter().map(|t| model.tool(*t).meta.id.clone()).collect()
}

fn run_verify(model: &BuildModel, summary: &LoadSummary, json: bool) {
    let diagnostics: Vec<String> = model.diagnostics().iter().map(|d| d.to_string()).collect();
    if json {
        print_json(&json!({ "summary": summary, "diagnostics": diagnostics }));
    } else {
        println!(
            "Loaded {} tool chains, {} tools, {} options, {} configurations",
            summary.tool_chains, summary.tools, summary.options, summary.configurations
        );
        if diagnostics.is_empty() {
            println!("All references resolved");
        } else {
            println!();
            for d in &diagnostics {
                println!("  {}", d);
            }
        }
    }
    if !diagnostics.is_empty() {
        process::exit(2);
    }
}

fn run_options(model: &BuildModel, tool: ToolId, json: bool) {
    let options: Vec<_> = model
        .effective_options(tool.into())
        .into_iter()
        .map(|o| {
            let def = model.option(o);
            (
                def.meta.id.clone(),
                model.option_value_type(o).map(|k| k.as_str()),
                model.option_value(o).map(|v| v.to_raw()),
                !def.meta.is_extension,
            )
        })
        .collect();

    if json {
        let list: Vec<_> = options
            .iter()
            .map(|(id, kind, value, local)| json!({ "id": id, "type": kind, "value": value, "project": local }))
            .collect();
        print_json(&json!({ "tool": model.tool(tool).meta.id, "options": list }));
    } else {
        println!("{}", model.tool(tool).meta.id);
        for (id, kind, value, local) in &options {
            println!(
                "  {}{} [{}] = {}",
                id,
                if *local { " *" } else { "" },
                kind.unwrap_or("?"),
                value.as_deref().unwrap_or("")
            );
        }
    }
}

fn run_tools(model: &BuildModel, resource: ResourceId, json: bool) {
    let tools = model.effective_tools(resource);
    if json {
        print_json(&json!({
            "resource": model.resource(resource).meta.id,
            "tools": tool_ids(model, &tools),
        }));
    } else {
        println!("{}", model.resource(resource).display_path());
        for t in tools {
            println!("  {} ({})", model.tool(t).meta.id, model.tool_command(t).unwrap_or("-"));
        }
    }
}

fn run_command(model: &BuildModel, cfg: ConfigId, file: &str, json: bool) {
    let Some(line) = model.command_for_file(cfg, file) else {
        fail(&format!("No tool builds '{}'", file));
    };
    if json {
        print_json(&json!(line));
    } else {
        println!("{}", line);
    }
}

fn lookup_tools(model: &BuildModel, candidates: &[ToolId], ids: &[String]) -> Vec<ToolId> {
    ids.iter()
        .map(|id| {
            candidates
                .iter()
                .copied()
                .find(|t| model.tool_lineage(*t).any(|l| model.tool(l).meta.id == *id))
                .unwrap_or_else(|| fail(&format!("Unknown tool '{}'", id)))
        })
        .collect()
}

fn run_modify(model: &mut BuildModel, resource: ResourceId, remove: &[String], add: &[String], apply: bool, json: bool) {
    let current = model.resource_tools(resource);
    let extension: Vec<ToolId> = model.extension_tools().collect();
    let removed = lookup_tools(model, &current, remove);
    let added = lookup_tools(model, &extension, add);

    let modification = match model.modify_tool_set(resource, &removed, &added) {
        Ok(m) => m,
        Err(e) => fail(&format!("Modification error: {}", e)),
    };
    let conflicts: Vec<Vec<String>> = modification.conflicts.iter().map(|g| tool_ids(model, g)).collect();
    let report = json!({
        "resource": model.resource(resource).meta.id,
        "resulting_tools": tool_ids(model, &modification.resulting_tools),
        "conversions": modification
            .conversions
            .iter()
            .map(|c| json!({ "from": model.tool(c.from).meta.id, "to": model.tool(c.to).meta.id, "rule": c.rule.id }))
            .collect::<Vec<_>>(),
        "conflicts": conflicts,
        "unsupported_required_properties": modification.unsupported_required_properties,
        "unsupported_selected_properties": modification.unsupported_selected_properties,
        "undefined_property_types": modification.undefined_property_types,
        "non_managed_tools": tool_ids(model, &modification.non_managed_tools),
        "clean": modification.is_clean(),
    });

    if json && !apply {
        print_json(&report);
    } else if !json {
        println!("{}", model.resource(resource).display_path());
        println!("  resulting: {}", tool_ids(model, &modification.resulting_tools).join(", "));
        for group in &conflicts {
            println!("  conflict: {}", group.join(", "));
        }
        for p in &modification.unsupported_required_properties {
            println!("  unsupported required property: {}", p);
        }
    }

    if !apply {
        return;
    }
    let applied = match model.apply_tool_set_modification(&modification) {
        Ok(a) => a,
        Err(e) => fail(&format!("Apply error: {}", e)),
    };
    let converted: Vec<_> = applied
        .converted
        .iter()
        .map(|(from, to)| format!("{} -> {}", model.tool(*from).meta.id, model.tool(*to).meta.id))
        .collect();
    if json {
        print_json(&json!({
            "modification": report,
            "applied": {
                "converted": converted,
                "added": tool_ids(model, &applied.added),
                "removed": tool_ids(model, &applied.removed),
                "target_tools": applied.target_tools,
            }
        }));
    } else {
        for c in &converted {
            println!("  converted: {}", c);
        }
        println!("  added: {}", tool_ids(model, &applied.added).join(", "));
    }
}

fn run_set_option(model: &mut BuildModel, tool: ToolId, option: &str, value: &str, json: bool) {
    let outcome = match model.set_option_by_id(tool, option, value) {
        Ok(o) => o,
        Err(e) => fail(&format!("Set error: {}", e)),
    };
    let (status, target) = match &outcome {
        WriteOutcome::Changed(o) => ("changed", Some(model.option(*o).meta.id.clone())),
        WriteOutcome::Unchanged(o) => ("unchanged", Some(model.option(*o).meta.id.clone())),
        WriteOutcome::Aborted(e) => fail(&format!("Set aborted: {}", e)),
    };
    if json {
        print_json(&json!({ "status": status, "option": target }));
    } else {
        println!("{} {}", status, target.unwrap_or_default());
    }
}

fn run_new(model: &mut BuildModel, settings: &EffectiveSettings, id: &str, tool_chain: &str, name: Option<&str>) {
    let Some(template) = model.find_tool_chain(tool_chain) else {
        fail(&format!("Unknown tool chain '{}'", tool_chain));
    };
    let cfg = match model.new_configuration(id, name, template) {
        Ok(c) => c,
        Err(e) => fail(&format!("Create error: {}", e)),
    };
    let c = model.configuration_mut(cfg);
    c.natures = settings.natures();
    c.managed_build = settings.managed_build();
    println!("created {}", id);
}

fn save(model: &mut BuildModel, project: Option<&Path>) {
    let Some(path) = project else {
        fail("--project is required to save");
    };
    if let Err(e) = storage::save_project(model, path) {
        fail(&format!("Save error: {}", e));
    }
}
