//! hpclaunch CLI - MPI launch resolution for batch jobs

use clap::Parser;
use hpclaunch::config::{CliArgs, Commands, ConfigOverlay, OutputFormat};
use hpclaunch::error::{LaunchError, Result};
use hpclaunch::exec::{ExecEnvironment, ExecOptions};
use hpclaunch::system::{BatchJobInfo, Environment, ResourceResolver, SystemRunner};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Parse CLI arguments
    let args = CliArgs::parse();

    // Handle result
    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(if e.is_environment_error() { 2 } else { 1 });
    }
}

fn run(args: CliArgs) -> Result<()> {
    let env = Environment::capture();
    let runner = match &args.bindir {
        Some(bindir) => SystemRunner::with_bindir(bindir),
        None => SystemRunner::new(),
    };

    match &args.command {
        Commands::Batch => cmd_batch(&args, &env, &runner),
        Commands::Resources { list_hosts } => cmd_resources(&args, &env, &runner, *list_hosts),
        Commands::Plan => cmd_plan(&args, &env, &runner),
        Commands::HostsFile => cmd_hostsfile(&args, &env, &runner),
        Commands::Info => cmd_info(&args, &env, &runner),
    }
}

fn exec_options(args: &CliArgs) -> Result<ExecOptions> {
    Ok(ExecOptions {
        mpi_label: args.mpi_type.clone(),
        bindir: args.bindir.clone(),
        wdir: args.wdir.clone(),
        n_procs: args.n_procs,
        n_procs_default: args.default_procs,
        hosts_list: args.hosts_list(),
        overlay: ConfigOverlay::load(&args.config_files)?,
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| LaunchError::config(format!("Cannot serialize output: {}", e)))?;
    println!("{}", json);
    Ok(())
}

fn cmd_batch(args: &CliArgs, env: &Environment, runner: &SystemRunner) -> Result<()> {
    let batch = BatchJobInfo::detect(env);
    let remaining = batch.remaining_time(runner);

    if args.format == OutputFormat::Json {
        #[derive(Serialize)]
        struct BatchReport<'a> {
            #[serde(flatten)]
            batch: &'a BatchJobInfo,
            remaining_time: Option<String>,
        }
        return print_json(&BatchReport {
            batch: &batch,
            remaining_time: remaining,
        });
    }

    println!("=== Batch Job ===\n");
    println!("  Batch system: {}", batch.kind);
    if !batch.is_job() {
        println!("  Not running inside a batch job");
        return Ok(());
    }
    let fields = [
        ("Job ID", batch.job_id.clone()),
        ("Job name", batch.job_name.clone()),
        ("Queue", batch.queue.clone()),
        ("Submit directory", batch.submit_dir.as_ref().map(|p| p.display().to_string())),
        ("Job file", batch.job_file.as_ref().map(|p| p.display().to_string())),
        ("Remaining time", remaining),
    ];
    for (name, value) in fields {
        if let Some(value) = value {
            println!("  {}: {}", name, value);
        }
    }
    Ok(())
}

fn cmd_resources(args: &CliArgs, env: &Environment, runner: &SystemRunner, list_hosts: bool) -> Result<()> {
    let mut resolver = ResourceResolver::new()
        .with_n_procs(args.n_procs)
        .with_default_n_procs(args.default_procs);
    if let Some(hosts) = args.hosts_list() {
        resolver = resolver.with_hosts_list(hosts);
    }
    let resources = resolver.resolve(BatchJobInfo::detect(env), env);
    let hosts = if list_hosts {
        resources.get_hosts_list(runner)
    } else {
        None
    };

    if args.format == OutputFormat::Json {
        #[derive(Serialize)]
        struct ResourcesReport<'a> {
            #[serde(flatten)]
            resources: &'a hpclaunch::ResourceAllocation,
            hosts: Option<Vec<String>>,
        }
        return print_json(&ResourcesReport {
            resources: &resources,
            hosts,
        });
    }

    resources.print_summary();
    if let Some(hosts) = hosts {
        println!("\n=== Hosts ===\n");
        for host in hosts {
            println!("  {}", host);
        }
    }
    Ok(())
}

fn cmd_plan(args: &CliArgs, env: &Environment, runner: &SystemRunner) -> Result<()> {
    let exec = ExecEnvironment::resolve(&exec_options(args)?, env, runner)?;
    let plan = exec.plan();

    match args.format {
        OutputFormat::Json => print_json(&plan),
        OutputFormat::Text => {
            plan.print_summary();
            Ok(())
        }
    }
}

fn cmd_hostsfile(args: &CliArgs, env: &Environment, runner: &SystemRunner) -> Result<()> {
    let options = exec_options(args)?;
    let mut exec = ExecEnvironment::resolve(&options, env, runner)?;
    let path = exec.resources.get_hosts_file(Some(exec.wdir.as_path()), runner)?;

    match (args.format, path) {
        (OutputFormat::Json, path) => print_json(&path),
        (OutputFormat::Text, Some(path)) => {
            println!("{}", path.display());
            Ok(())
        }
        (OutputFormat::Text, None) => {
            eprintln!("No host list available");
            Ok(())
        }
    }
}

fn cmd_info(args: &CliArgs, env: &Environment, runner: &SystemRunner) -> Result<()> {
    let exec = ExecEnvironment::resolve(&exec_options(args)?, env, runner)?;
    let output = exec.mpi.info(runner);

    if args.format == OutputFormat::Json {
        #[derive(Serialize)]
        struct InfoReport<'a> {
            commands: &'a [String],
            output: String,
        }
        return print_json(&InfoReport {
            commands: &exec.mpi.info_cmds,
            output,
        });
    }

    if exec.mpi.info_cmds.is_empty() {
        println!("No information commands known for MPI type '{}'", exec.mpi.label);
    } else {
        print!("{}", output);
    }
    Ok(())
}
