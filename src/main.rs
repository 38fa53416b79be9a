use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::json;

use fakechat::capture::{export_conversation, ExportFormat, ExportRequest, ExportTarget, Region};
use fakechat::config::{
    load_config, resolve_config_path, write_starter_config, Config, ConfigOverrides,
};
use fakechat::editor::{append_message, insert_line_break};
use fakechat::error_codes::{envelope_for, exit_code_for, CodedError, INVALID_CURSOR, INVALID_NOW};
use fakechat::fonts::{load_font, unsupported_chars};
use fakechat::group::{group_messages, MessageGroup};
use fakechat::platform::{Platform, TimeFormat};
use fakechat::preview::render_preview;
use fakechat::raster::RasterCapture;
use fakechat::script::{parse_conversation_with_mode, read_script, Message, ParseMode};
use fakechat::session::{Clock, FixedClock, Session, SystemClock};
use fakechat::logging;

const DEFAULT_PREVIEW_WIDTH: usize = 60;

#[derive(Debug, Parser)]
#[command(name = "fakechat")]
#[command(about = "Render fake WhatsApp/Instagram conversations from a line script")]
struct Cli {
    /// Config file (default: <user config dir>/fakechat/config.yaml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Machine-readable output; errors become a JSON envelope on stderr.
    #[arg(long, global = true)]
    json: bool,
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Parse a script into timestamped messages.
    Parse {
        script: PathBuf,
        #[command(flatten)]
        time: TimeArgs,
    },
    /// Parse and group consecutive same-role messages.
    Group {
        script: PathBuf,
        #[command(flatten)]
        time: TimeArgs,
    },
    /// Print the conversation as a terminal mock-up.
    Preview {
        script: PathBuf,
        #[command(flatten)]
        time: TimeArgs,
        #[command(flatten)]
        look: LookArgs,
        #[arg(long, default_value_t = DEFAULT_PREVIEW_WIDTH)]
        width: usize,
    },
    /// Render the conversation to a PNG or JPEG.
    Export {
        script: PathBuf,
        #[command(flatten)]
        time: TimeArgs,
        #[command(flatten)]
        look: LookArgs,
        #[command(flatten)]
        render: RenderArgs,
    },
    /// Append a message, alternating the marker from the last line.
    Append {
        script: PathBuf,
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Break a line at a char offset and open the next line with the alternated marker.
    Newline {
        script: PathBuf,
        #[arg(long = "at")]
        cursor: usize,
    },
    /// Re-render on every save of the script.
    #[cfg(feature = "watch")]
    Watch {
        script: PathBuf,
        #[command(flatten)]
        look: LookArgs,
        #[command(flatten)]
        render: RenderArgs,
        /// Also export on every change.
        #[arg(long)]
        export: bool,
        #[arg(long, default_value_t = DEFAULT_PREVIEW_WIDTH)]
        width: usize,
    },
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
    Version,
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Write a starter config file.
    Init {
        #[arg(long)]
        force: bool,
    },
    /// Print the resolved config.
    Show,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Carry,
    StampNow,
}

impl From<ModeArg> for ParseMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Carry => ParseMode::Carry,
            ModeArg::StampNow => ParseMode::StampNow,
        }
    }
}

#[derive(Debug, Args)]
struct TimeArgs {
    /// Fallback time as RFC 3339 (default: now, local offset).
    #[arg(long)]
    now: Option<String>,
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,
}

#[derive(Debug, Args)]
struct LookArgs {
    #[arg(long)]
    platform: Option<String>,
    #[arg(long)]
    dark: bool,
    #[arg(long)]
    mobile: bool,
    #[arg(long = "time-format")]
    time_format: Option<String>,
    #[arg(long = "sender-name")]
    sender_name: Option<String>,
    #[arg(long = "receiver-name")]
    receiver_name: Option<String>,
    #[arg(long = "sender-photo")]
    sender_photo: Option<PathBuf>,
    #[arg(long = "receiver-photo")]
    receiver_photo: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct RenderArgs {
    #[arg(short = 'o', long = "output", conflicts_with = "output_dir")]
    output: Option<PathBuf>,
    #[arg(long = "output-dir")]
    output_dir: Option<PathBuf>,
    #[arg(long)]
    scale: Option<f32>,
    #[arg(long)]
    font: Option<PathBuf>,
    /// png or jpeg (default: from the output extension, else png).
    #[arg(long)]
    format: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let json_errors = cli.json;
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            if json_errors {
                match serde_json::to_string(&envelope_for(&error)) {
                    Ok(envelope) => eprintln!("{envelope}"),
                    Err(_) => eprintln!("error: {error:#}"),
                }
            } else {
                eprintln!("error: {error:#}");
            }
            ExitCode::from(exit_code_for(&error))
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let launch_cwd = env::current_dir().context("failed to resolve current directory")?;
    let config_override = cli.config.as_deref();
    let json = cli.json;

    match cli.command {
        Commands::Parse { script, time } => {
            let config = load_config(config_override, &launch_cwd)?;
            run_parse(&script, &time, &config, json)
        }
        Commands::Group { script, time } => {
            let config = load_config(config_override, &launch_cwd)?;
            run_group(&script, &time, &config, json)
        }
        Commands::Preview {
            script,
            time,
            look,
            width,
        } => {
            let config = load_config(config_override, &launch_cwd)?
                .apply(look_overrides(&look, &time)?, &launch_cwd)?;
            run_preview(&script, &time, &config, width, json)
        }
        Commands::Export {
            script,
            time,
            look,
            render,
        } => {
            let mut overrides = look_overrides(&look, &time)?;
            overrides.scale = render.scale;
            overrides.font = render.font.clone();
            let config = load_config(config_override, &launch_cwd)?.apply(overrides, &launch_cwd)?;
            run_export(&script, &time, &render, &config, &launch_cwd, json)
        }
        Commands::Append { script, text } => run_append(&script, &text.join(" "), json),
        Commands::Newline { script, cursor } => run_newline(&script, cursor, json),
        #[cfg(feature = "watch")]
        Commands::Watch {
            script,
            look,
            render,
            export,
            width,
        } => {
            let no_time = TimeArgs {
                now: None,
                mode: None,
            };
            let mut overrides = look_overrides(&look, &no_time)?;
            overrides.scale = render.scale;
            overrides.font = render.font.clone();
            let config = load_config(config_override, &launch_cwd)?.apply(overrides, &launch_cwd)?;
            run_watch(&script, &render, &config, &launch_cwd, export, width)
        }
        Commands::Config { action } => match action {
            ConfigCommand::Init { force } => {
                let path = resolve_config_path(config_override, &launch_cwd)?;
                write_starter_config(&path, force)?;
                if json {
                    print_json(&json!({ "ok": true, "path": path }))
                } else {
                    println!("Wrote starter config to {}", path.display());
                    Ok(())
                }
            }
            ConfigCommand::Show => {
                let config = load_config(config_override, &launch_cwd)?;
                if json {
                    print_json(&config)
                } else {
                    let yaml =
                        serde_yaml::to_string(&config).context("failed to serialize config")?;
                    print!("{yaml}");
                    Ok(())
                }
            }
        },
        Commands::Version => {
            let version = env!("CARGO_PKG_VERSION");
            let git_hash = option_env!("FAKECHAT_GIT_HASH");
            if json {
                print_json(&json!({ "version": version, "git_hash": git_hash }))
            } else {
                match git_hash {
                    Some(hash) => println!("fakechat {version} ({hash})"),
                    None => println!("fakechat {version}"),
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ParseOutput<'a> {
    now: DateTime<FixedOffset>,
    mode: ParseMode,
    messages: &'a [Message],
}

#[derive(Debug, Serialize)]
struct GroupOutput<'a> {
    now: DateTime<FixedOffset>,
    mode: ParseMode,
    groups: &'a [MessageGroup],
}

fn run_parse(script_path: &Path, time: &TimeArgs, config: &Config, json: bool) -> Result<()> {
    let script = read_script(script_path)?;
    let now = resolve_now(time.now.as_deref())?;
    let mode = time.mode.map(ParseMode::from).unwrap_or(config.parse_mode);
    let messages = parse_conversation_with_mode(&script, now, mode);

    if json {
        return print_json(&ParseOutput {
            now,
            mode,
            messages: &messages,
        });
    }
    for message in &messages {
        println!(
            "{} {} {}",
            message.timestamp.format("%H:%M"),
            message.role.marker(),
            message.text
        );
    }
    Ok(())
}

fn run_group(script_path: &Path, time: &TimeArgs, config: &Config, json: bool) -> Result<()> {
    let script = read_script(script_path)?;
    let now = resolve_now(time.now.as_deref())?;
    let mode = time.mode.map(ParseMode::from).unwrap_or(config.parse_mode);
    let groups = group_messages(&parse_conversation_with_mode(&script, now, mode));

    if json {
        return print_json(&GroupOutput {
            now,
            mode,
            groups: &groups,
        });
    }
    for group in &groups {
        let first = group
            .timestamp()
            .map(|ts| ts.format("%H:%M").to_string())
            .unwrap_or_default();
        println!("{} x{} from {}", group.role.as_str(), group.len(), first);
        for message in &group.messages {
            println!("  {} {}", message.role.marker(), message.text);
        }
    }
    Ok(())
}

fn run_preview(
    script_path: &Path,
    time: &TimeArgs,
    config: &Config,
    width: usize,
    json: bool,
) -> Result<()> {
    let session = build_session(script_path, time, config)?;
    let view = session.view();
    if json {
        return print_json(&view);
    }
    print!("{}", render_preview(&view, width));
    Ok(())
}

fn run_export(
    script_path: &Path,
    time: &TimeArgs,
    render: &RenderArgs,
    config: &Config,
    launch_cwd: &Path,
    json: bool,
) -> Result<()> {
    let session = build_session(script_path, time, config)?;
    let view = session.view();
    let mut capture = build_capture(config, session.messages())?;
    let request = export_request(render, config, launch_cwd, Region::for_view(&view))?;

    let summary = export_conversation(&mut capture, &view, &request)?;
    if json {
        return print_json(&summary);
    }
    println!(
        "Wrote {} ({}x{}, {} bytes)",
        summary.path.display(),
        summary.width,
        summary.height,
        summary.bytes
    );
    Ok(())
}

fn run_append(script_path: &Path, body: &str, json: bool) -> Result<()> {
    let current = if script_path.exists() {
        read_script(script_path)?
    } else {
        String::new()
    };
    let next = append_message(&current, body);
    fs::write(script_path, &next)
        .with_context(|| format!("failed to write script {}", script_path.display()))?;

    let line = next.lines().last().unwrap_or_default();
    if json {
        return print_json(&json!({ "path": script_path, "line": line }));
    }
    println!("{line}");
    Ok(())
}

fn run_newline(script_path: &Path, cursor: usize, json: bool) -> Result<()> {
    let current = read_script(script_path)?;
    let len = current.chars().count();
    if cursor > len {
        return Err(CodedError::usage(
            INVALID_CURSOR,
            format!("cursor {cursor} is past the end of the script ({len} chars)"),
        )
        .with_details(json!({ "cursor": cursor, "len": len }))
        .into());
    }

    let edit = insert_line_break(&current, cursor);
    fs::write(script_path, &edit.text)
        .with_context(|| format!("failed to write script {}", script_path.display()))?;
    if json {
        return print_json(&json!({ "path": script_path, "cursor": edit.cursor }));
    }
    println!("cursor {}", edit.cursor);
    Ok(())
}

#[cfg(feature = "watch")]
fn run_watch(
    script_path: &Path,
    render: &RenderArgs,
    config: &Config,
    launch_cwd: &Path,
    export: bool,
    width: usize,
) -> Result<()> {
    use fakechat::capture::Capture;
    use fakechat::watch::{run_watch as watch_script, WatchOptions};

    let session = Session::new(
        SystemClock,
        config.parse_mode,
        config.sender.clone(),
        config.receiver.clone(),
        config.display,
    );
    let region = if config.display.mobile {
        Region::MobileFrame
    } else {
        Region::ChatContainer
    };

    let mut capture = if export {
        Some(build_capture(config, &[])?)
    } else {
        None
    };
    let options = WatchOptions {
        width,
        export: if export {
            Some(export_request(render, config, launch_cwd, region)?)
        } else {
            None
        },
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    watch_script(
        script_path,
        session,
        capture.as_mut().map(|capture| capture as &mut dyn Capture),
        &options,
        &mut out,
    )
}

fn build_session(
    script_path: &Path,
    time: &TimeArgs,
    config: &Config,
) -> Result<Session<FixedClock>> {
    let script = read_script(script_path)?;
    let now = resolve_now(time.now.as_deref())?;
    let mode = time.mode.map(ParseMode::from).unwrap_or(config.parse_mode);
    Ok(Session::new(
        FixedClock(now),
        mode,
        config.sender.clone(),
        config.receiver.clone(),
        config.display,
    )
    .with_script(script))
}

fn build_capture(config: &Config, messages: &[Message]) -> Result<RasterCapture> {
    let font = config
        .font
        .as_deref()
        .map(|path| load_font(path, config.font_sha256.as_deref()))
        .transpose()?;

    if let Some(font) = &font {
        let mut missing = Vec::new();
        for message in messages {
            for ch in unsupported_chars(font, &message.text) {
                if !missing.contains(&ch) {
                    missing.push(ch);
                }
            }
        }
        if !missing.is_empty() {
            let missing = missing.into_iter().collect::<String>();
            tracing::warn!(%missing, "font has no glyphs for some characters; they will be skipped");
        }
    } else {
        tracing::debug!("no font configured, drawing text as skeleton bars");
    }

    RasterCapture::new(config.scale, font)
}

fn export_request(
    render: &RenderArgs,
    config: &Config,
    launch_cwd: &Path,
    region: Region,
) -> Result<ExportRequest> {
    let format = render
        .format
        .as_deref()
        .map(str::parse::<ExportFormat>)
        .transpose()?;
    let target = match (&render.output, &render.output_dir) {
        (Some(path), _) => ExportTarget::File(launch_cwd.join(path)),
        (None, Some(dir)) => ExportTarget::Directory(launch_cwd.join(dir)),
        (None, None) => ExportTarget::Directory(config.output_dir.clone()),
    };
    Ok(ExportRequest {
        target,
        format,
        region,
    })
}

fn look_overrides(look: &LookArgs, time: &TimeArgs) -> Result<ConfigOverrides> {
    Ok(ConfigOverrides {
        sender_name: look.sender_name.clone(),
        receiver_name: look.receiver_name.clone(),
        sender_photo: look.sender_photo.clone(),
        receiver_photo: look.receiver_photo.clone(),
        platform: look
            .platform
            .as_deref()
            .map(str::parse::<Platform>)
            .transpose()?,
        dark_mode: look.dark.then_some(true),
        mobile_mode: look.mobile.then_some(true),
        time_format: look
            .time_format
            .as_deref()
            .map(str::parse::<TimeFormat>)
            .transpose()?,
        parse_mode: time.mode.map(ParseMode::from),
        ..ConfigOverrides::default()
    })
}

fn resolve_now(raw: Option<&str>) -> Result<DateTime<FixedOffset>> {
    match raw {
        Some(raw) => DateTime::parse_from_rfc3339(raw.trim()).map_err(|error| {
            CodedError::usage(
                INVALID_NOW,
                format!("--now must be RFC 3339 (e.g. 2024-05-17T14:03:00+02:00): {error}"),
            )
            .into()
        }),
        None => Ok(SystemClock.now()),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to serialize json output")?;
    println!("{text}");
    Ok(())
}
