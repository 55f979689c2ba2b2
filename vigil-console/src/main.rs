use std::{collections::HashSet, env, fs, sync::Arc, time::Duration};

use console::{
    ApiClient, CompileWorkflow, DEFAULT_FUZZ_POLL_INTERVAL, DEFAULT_TIMELINE_REFRESH_INTERVAL,
    FuzzWorkflow, LevelFilter, SandboxWorkflow, TimelineFeed, TimelineFilter, init_logging,
    render_campaign, render_compile, render_crash, render_health, render_log_entry,
    render_project, render_resources, render_run, validate_run_request,
};
use contracts::{CreateProjectRequest, FuzzStartRequest, SandboxRunRequest};
use tracing::{info, warn};

const DEFAULT_API_URL: &str = "http://127.0.0.1:3000";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = match parse_cli_args() {
        Ok(CliAction::Run(cli)) => *cli,
        Ok(CliAction::Help) => {
            print_cli_help();
            return Ok(());
        }
        Ok(CliAction::Version) => {
            println!("{}", binary_version_text());
            return Ok(());
        }
        Err(err) => {
            eprintln!("error: {err}\n");
            print_cli_help();
            return Err(err.into());
        }
    };

    init_logging()?;

    let api_url = cli
        .api_url
        .clone()
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let client = Arc::new(ApiClient::new(&api_url));

    run_command(client, cli).await
}

async fn run_command(
    client: Arc<ApiClient>,
    cli: CliArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut words = cli.command.iter().map(String::as_str);
    let Some(command) = words.next() else {
        print_cli_help();
        return Err("missing command".into());
    };

    match command {
        "health" => {
            let health = client.health().await?;
            println!("{}", render_health(&health));
        }
        "compile" => {
            let path = words.next().ok_or("compile requires a source file")?;
            let source = fs::read_to_string(path)?;
            let workflow = CompileWorkflow::new(client);
            workflow.compile(&source).await;
            let snapshot = workflow.snapshot().await;
            if let Some(result) = snapshot.result {
                print!("{}", render_compile(&result));
            }
        }
        "ast" => {
            let ast = client.compile_ast().await?;
            println!("{}", serde_json::to_string_pretty(&ast)?);
        }
        "bytecode" => {
            let bytecode = client.compile_bytecode().await?;
            println!("{}", serde_json::to_string_pretty(&bytecode)?);
        }
        "run" => {
            let code = match words.next() {
                Some(path) => Some(fs::read_to_string(path)?),
                None => None,
            };
            let request = SandboxRunRequest {
                binary_path: cli.binary_path.clone(),
                code,
                memory_limit: cli.memory_limit.clone(),
                timeout: cli.run_timeout.clone(),
                network_enabled: Some(cli.network_enabled),
            };
            validate_run_request(&request)?;

            let workflow = SandboxWorkflow::new(client);
            workflow.run(request).await;
            match workflow.snapshot().await.last_run {
                Some(run) => print!("{}", render_run(&run)),
                None => warn!("sandbox run did not produce a record"),
            }
        }
        "runs" => {
            for run in client.list_sandbox_runs().await? {
                print!("{}", render_run(&run));
            }
        }
        "run-logs" => {
            let id = words.next().ok_or("run-logs requires a run id")?;
            let logs = client.sandbox_logs(id).await?;
            if !logs.stdout.is_empty() {
                println!("stdout:\n{}", logs.stdout);
            }
            if !logs.stderr.is_empty() {
                println!("stderr:\n{}", logs.stderr);
            }
            for entry in &logs.syscall_log {
                let flag = if entry.allowed { "allow" } else { "DENY " };
                println!(
                    "  {flag} {}({}) -> {} @ {}",
                    entry.syscall, entry.args, entry.result, entry.timestamp
                );
            }
        }
        "run-resources" => {
            let id = words.next().ok_or("run-resources requires a run id")?;
            let usage = client.sandbox_resources(id).await?;
            print!("{}", render_resources(&usage));
        }
        "fuzz-start" => {
            let target = words.next().ok_or("fuzz-start requires a target binary")?;
            let request = FuzzStartRequest {
                target_binary: target.to_string(),
                corpus_dir: cli
                    .corpus_dir
                    .clone()
                    .unwrap_or_else(|| "/tmp/corpus".to_string()),
                crash_dir: cli
                    .crash_dir
                    .clone()
                    .unwrap_or_else(|| "/tmp/crashes".to_string()),
                timeout: cli.fuzz_timeout.clone(),
            };
            let workflow = FuzzWorkflow::new(client, fuzz_interval(&cli));
            // Learn about campaigns started elsewhere before attempting ours.
            workflow.poll_once().await;
            let campaign = workflow.start_campaign(request).await?;
            print!("{}", render_campaign(&campaign));
        }
        "fuzz-stop" => {
            let id = words.next().ok_or("fuzz-stop requires a campaign id")?;
            let workflow = FuzzWorkflow::new(client, fuzz_interval(&cli));
            workflow.poll_once().await;
            workflow.stop_campaign(id).await?;
            if let Some(campaign) = workflow.snapshot().await.campaign {
                print!("{}", render_campaign(&campaign));
            }
        }
        "fuzz-status" => {
            let id = words.next().ok_or("fuzz-status requires a campaign id")?;
            let campaign = client.fuzz_status(id).await?;
            print!("{}", render_campaign(&campaign));
        }
        "crashes" => {
            let id = words.next().ok_or("crashes requires a campaign id")?;
            for crash in client.fuzz_crashes(id).await? {
                print!("{}", render_crash(&crash));
            }
        }
        "campaigns" => {
            for campaign in client.list_campaigns().await? {
                print!("{}", render_campaign(&campaign));
            }
        }
        "logs" => {
            for entry in client.logs().await? {
                println!("{}", render_log_entry(&entry));
            }
        }
        "timeline" => {
            let filter = timeline_filter(&cli)?;
            let feed = TimelineFeed::new(client, timeline_interval(&cli));
            feed.refresh().await;
            let snapshot = feed.snapshot().await;
            let shown = feed.filtered(&filter).await;
            for entry in &shown {
                println!("{}", render_log_entry(entry));
            }
            println!("{} of {} events", shown.len(), snapshot.total_count);
        }
        "projects" => {
            for project in client.list_projects().await? {
                println!("{}", render_project(&project));
            }
        }
        "project-create" => {
            let name = words.next().ok_or("project-create requires a name")?;
            let description = words.next().unwrap_or("").to_string();
            let project = client
                .create_project(&CreateProjectRequest {
                    name: name.to_string(),
                    description,
                })
                .await?;
            println!("{}", render_project(&project));
        }
        "watch" => {
            watch(client, &cli).await?;
        }
        other => {
            return Err(format!("unknown command: {other}").into());
        }
    }
    Ok(())
}

/// Live view: runs the fuzz poll loop and timeline refresh loop until
/// Ctrl-C, printing filtered events as they appear and campaign stats as
/// they change.
async fn watch(client: Arc<ApiClient>, cli: &CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    let filter = timeline_filter(cli)?;
    let fuzz = FuzzWorkflow::new(client.clone(), fuzz_interval(cli));
    let feed = TimelineFeed::new(client, timeline_interval(cli));
    fuzz.spawn_poll_loop();
    feed.spawn_refresh_loop();
    info!("watching timeline and campaigns; press Ctrl-C to stop");

    let mut seen: HashSet<String> = HashSet::new();
    let mut last_campaign_line: Option<String> = None;

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                break;
            }
            _ = tokio::time::sleep(Duration::from_secs(1)) => {
                for entry in feed.filtered(&filter).await {
                    if seen.insert(entry.id.clone()) {
                        println!("{}", render_log_entry(&entry));
                    }
                }
                if let Some(campaign) = fuzz.snapshot().await.campaign {
                    let line = render_campaign(&campaign);
                    if last_campaign_line.as_deref() != Some(line.as_str()) {
                        print!("{line}");
                        last_campaign_line = Some(line);
                    }
                }
            }
        }
    }

    feed.shutdown();
    fuzz.shutdown();
    Ok(())
}

fn fuzz_interval(cli: &CliArgs) -> Duration {
    cli.fuzz_poll_interval_ms
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_FUZZ_POLL_INTERVAL)
}

fn timeline_interval(cli: &CliArgs) -> Duration {
    cli.timeline_refresh_interval_ms
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_TIMELINE_REFRESH_INTERVAL)
}

fn timeline_filter(cli: &CliArgs) -> Result<TimelineFilter, String> {
    let level = match &cli.level {
        Some(raw) => LevelFilter::parse(raw).ok_or_else(|| format!("invalid --level: {raw}"))?,
        None => LevelFilter::All,
    };
    Ok(TimelineFilter {
        level,
        search: cli.search.clone().unwrap_or_default(),
    })
}

#[derive(Clone, Debug, Default)]
struct CliArgs {
    api_url: Option<String>,
    fuzz_poll_interval_ms: Option<u64>,
    timeline_refresh_interval_ms: Option<u64>,
    level: Option<String>,
    search: Option<String>,
    memory_limit: Option<String>,
    run_timeout: Option<String>,
    network_enabled: bool,
    binary_path: Option<String>,
    corpus_dir: Option<String>,
    crash_dir: Option<String>,
    fuzz_timeout: Option<String>,
    command: Vec<String>,
}

enum CliAction {
    Run(Box<CliArgs>),
    Help,
    Version,
}

fn parse_cli_args() -> Result<CliAction, String> {
    let mut args = env::args().skip(1).peekable();
    let mut cli = CliArgs::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(CliAction::Help),
            "-V" | "--version" => return Ok(CliAction::Version),
            "--api-url" => {
                cli.api_url = Some(next_arg_value("--api-url", &mut args)?);
            }
            "--fuzz-poll-interval-ms" => {
                let value = next_arg_value("--fuzz-poll-interval-ms", &mut args)?;
                cli.fuzz_poll_interval_ms = Some(
                    value
                        .parse::<u64>()
                        .map_err(|_| format!("invalid --fuzz-poll-interval-ms: {value}"))?,
                );
            }
            "--timeline-refresh-interval-ms" => {
                let value = next_arg_value("--timeline-refresh-interval-ms", &mut args)?;
                cli.timeline_refresh_interval_ms = Some(
                    value
                        .parse::<u64>()
                        .map_err(|_| format!("invalid --timeline-refresh-interval-ms: {value}"))?,
                );
            }
            "--level" => {
                cli.level = Some(next_arg_value("--level", &mut args)?);
            }
            "--search" => {
                cli.search = Some(next_arg_value("--search", &mut args)?);
            }
            "--memory-limit" => {
                cli.memory_limit = Some(next_arg_value("--memory-limit", &mut args)?);
            }
            "--run-timeout" => {
                cli.run_timeout = Some(next_arg_value("--run-timeout", &mut args)?);
            }
            "--network" => {
                cli.network_enabled = true;
            }
            "--binary-path" => {
                cli.binary_path = Some(next_arg_value("--binary-path", &mut args)?);
            }
            "--corpus-dir" => {
                cli.corpus_dir = Some(next_arg_value("--corpus-dir", &mut args)?);
            }
            "--crash-dir" => {
                cli.crash_dir = Some(next_arg_value("--crash-dir", &mut args)?);
            }
            "--fuzz-timeout" => {
                cli.fuzz_timeout = Some(next_arg_value("--fuzz-timeout", &mut args)?);
            }
            other if other.starts_with('-') => {
                return Err(format!("unknown argument: {other}"));
            }
            _ => {
                cli.command.push(arg);
            }
        }
    }
    Ok(CliAction::Run(Box::new(cli)))
}

fn next_arg_value(
    flag: &str,
    args: &mut std::iter::Peekable<impl Iterator<Item = String>>,
) -> Result<String, String> {
    let value = args
        .next()
        .ok_or_else(|| format!("missing value for {flag}"))?;
    if value.trim().is_empty() {
        return Err(format!("value for {flag} cannot be empty"));
    }
    Ok(value)
}

fn print_cli_help() {
    eprintln!(concat!(
        "Usage: vigil-console [options] <command> [args]\n\n",
        "Commands:\n",
        "  health                         Backend health check\n",
        "  compile <file>                 Compile a source file with policy validation\n",
        "  ast | bytecode                 Fetch the last compile's AST or bytecode\n",
        "  run [file]                     Execute a snippet (or --binary-path) in the sandbox\n",
        "  runs                           List sandbox runs\n",
        "  run-logs <id>                  Stdout/stderr/syscall trace of a run\n",
        "  run-resources <id>             Resource usage of a run\n",
        "  fuzz-start <target>            Start a fuzz campaign\n",
        "  fuzz-stop <id>                 Stop the active campaign\n",
        "  fuzz-status <id>               Fetch one campaign\n",
        "  crashes <id>                   Crashes discovered by a campaign\n",
        "  campaigns                      List campaigns\n",
        "  logs | timeline                Event log, raw or filtered timeline\n",
        "  projects                       List projects\n",
        "  project-create <name> [desc]   Create a project\n",
        "  watch                          Live timeline + campaign view (Ctrl-C to stop)\n\n",
        "Options:\n",
        "  --api-url <URL>                       Backend base URL (default: http://127.0.0.1:3000)\n",
        "  --fuzz-poll-interval-ms <MS>          Campaign poll interval (default: 2000)\n",
        "  --timeline-refresh-interval-ms <MS>   Timeline refresh interval (default: 5000)\n",
        "  --level <LEVEL>                       Timeline level filter (all|debug|info|warning|error|critical)\n",
        "  --search <TEXT>                       Timeline free-text filter\n",
        "  --memory-limit <LIMIT>                Sandbox memory limit (50M|100M|256M|512M|1G)\n",
        "  --run-timeout <TIMEOUT>               Sandbox timeout (1s|5s|10s|30s|60s)\n",
        "  --network                             Enable network access for the sandbox run\n",
        "  --binary-path <PATH>                  Run a prebuilt binary instead of code\n",
        "  --corpus-dir <DIR>                    Fuzz corpus directory (default: /tmp/corpus)\n",
        "  --crash-dir <DIR>                     Fuzz crash directory (default: /tmp/crashes)\n",
        "  --fuzz-timeout <TIMEOUT>              Optional campaign timeout\n",
        "  -V, --version                         Show version with git metadata\n",
        "  -h, --help                            Show this help\n"
    ));
}

fn binary_version_text() -> String {
    let binary = env!("CARGO_PKG_NAME");
    let git_tag = option_env!("VG_BUILD_GIT_TAG").unwrap_or("untagged");
    let git_commit = option_env!("VG_BUILD_GIT_COMMIT").unwrap_or("unknown");
    let git_dirty = option_env!("VG_BUILD_GIT_DIRTY").unwrap_or("false");
    let dirty = matches!(git_dirty, "true" | "1" | "yes" | "dirty");

    if dirty {
        format!("{binary} {git_tag} (dirty commit: {git_commit})")
    } else {
        format!("{binary} {git_tag}")
    }
}
